use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, get, web};
use echowatch_service::ServiceContext;
use echowatch_service::telemetry::HubMessage;
use futures::StreamExt;
use tracing::{debug, warn};

macros_utils::routes! {
    route telemetry_stream,
}

/// Live hub messages as Server-Sent Events, one JSON `data:` line each.
///
/// The stream ends if this client falls too far behind the hub.
#[get("/api/telemetry")]
pub async fn telemetry_stream(context: web::Data<ServiceContext>) -> HttpResponse {
    let subscription = context.hub.register();
    debug!(sink = %subscription.id(), "Telemetry stream opened");

    let frames = subscription.into_stream().filter_map(|message| async move {
        match sse_frame(&message) {
            Ok(frame) => Some(Ok::<_, actix_web::Error>(frame)),
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "Failed to encode hub message");
                None
            }
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(frames)
}

fn sse_frame(message: &HubMessage) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(message)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_single_data_line() {
        let frame = sse_frame(&HubMessage::MonitorsChanged).unwrap();
        assert_eq!(&frame[..], b"data: {\"type\":\"monitors_changed\"}\n\n");
    }
}
