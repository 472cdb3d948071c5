use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Hub, HubMessage};

/// Write every hub message to the log until `shutdown` fires.
///
/// The log sink is an ordinary hub subscriber, so it gets cut off when it
/// falls behind. It then registers again and carries on; the messages it
/// missed are lost. Returns how many times that happened.
pub async fn log_messages(hub: Hub, shutdown: CancellationToken) -> u64 {
    let mut subscription = hub.register();
    let mut reconnects = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            message = subscription.recv() => match message.as_deref() {
                Some(message) => log_message(message),
                None => {
                    warn!(sink = %subscription.id(), "Telemetry log fell behind the hub, registering again");
                    subscription = hub.register();
                    reconnects += 1;
                }
            },
        }
    }

    hub.unregister(subscription.id());
    reconnects
}

fn log_message(message: &HubMessage) {
    match message {
        HubMessage::Probe(event) => info!(
            address = %event.address,
            status = %event.state.last_status,
            rtt_ms = event.outcome.rtt_ms,
            failure = event.outcome.failure.map(tracing::field::display),
            "Probe"
        ),
        other => info!(kind = other.kind(), "Hub message"),
    }
}
