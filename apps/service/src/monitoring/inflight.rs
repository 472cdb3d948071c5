use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Monitors that currently have an outstanding probe.
///
/// A monitor enters the set when the scheduler claims it and leaves when
/// its [`InFlightGuard`] is released or dropped, so an aborted or panicked
/// worker can never pin a monitor forever.
#[derive(Debug, Default)]
pub struct InFlight {
    monitors: Mutex<HashSet<Uuid>>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `monitor_id`; `None` if a probe for it is already outstanding
    pub fn try_begin(self: &Arc<Self>, monitor_id: Uuid) -> Option<InFlightGuard> {
        let inserted = self.lock().insert(monitor_id);
        inserted.then(|| InFlightGuard { set: Arc::clone(self), monitor_id, released: false })
    }

    pub fn contains(&self, monitor_id: &Uuid) -> bool {
        self.lock().contains(monitor_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn finish(&self, monitor_id: &Uuid) {
        self.lock().remove(monitor_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks one monitor as in flight for as long as it lives
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlight>,
    monitor_id: Uuid,
    released: bool,
}

impl InFlightGuard {
    pub fn monitor_id(&self) -> Uuid {
        self.monitor_id
    }

    /// Clear the in-flight mark now
    pub fn release(mut self) {
        self.set.finish(&self.monitor_id);
        self.released = true;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            self.set.finish(&self.monitor_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_refused() {
        let inflight = InFlight::new();
        let id = Uuid::new_v4();

        let guard = inflight.try_begin(id).unwrap();
        assert!(inflight.try_begin(id).is_none());
        assert!(inflight.contains(&id));

        guard.release();
        assert!(!inflight.contains(&id));
        assert!(inflight.try_begin(id).is_some());
    }

    #[test]
    fn test_dropped_guard_clears_mark() {
        let inflight = InFlight::new();
        let id = Uuid::new_v4();
        {
            let _guard = inflight.try_begin(id).unwrap();
            assert_eq!(inflight.len(), 1);
        }
        assert!(inflight.is_empty());
    }
}
