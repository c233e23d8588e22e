//! Single-slot observation window shared with the caller's thread.
//!
//! The blocking call writes its reply here so the caller can watch progress
//! from another thread. The caller may also heartbeat the window; once it
//! has, the blocking call gives up when heartbeats stop for longer than the
//! configured patience.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Slot {
    text: Option<String>,
    last_heartbeat: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct ObserveWindow {
    slot: Arc<Mutex<Slot>>,
}

impl ObserveWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest text written by the bridge
    pub fn text(&self) -> Option<String> {
        self.slot.lock().text.clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.slot.lock().text = Some(text.into());
    }

    /// Mark the caller as still waiting
    pub fn heartbeat(&self) {
        self.slot.lock().last_heartbeat = Some(Instant::now());
    }

    /// True once the caller has heartbeated and then gone quiet for longer
    /// than `patience`. Never true for a caller that never heartbeats.
    pub fn is_abandoned(&self, patience: Duration) -> bool {
        match self.slot.lock().last_heartbeat {
            Some(at) => at.elapsed() > patience,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_slot_shared_between_clones() {
        let window = ObserveWindow::new();
        let writer = window.clone();
        assert_eq!(window.text(), None);

        std::thread::spawn(move || writer.set_text("done"))
            .join()
            .unwrap();
        assert_eq!(window.text().as_deref(), Some("done"));
    }

    #[test]
    fn test_never_abandoned_without_heartbeat() {
        let window = ObserveWindow::new();
        assert!(!window.is_abandoned(Duration::ZERO));
    }

    #[test]
    fn test_abandoned_after_patience() {
        let window = ObserveWindow::new();
        window.heartbeat();
        assert!(!window.is_abandoned(Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(window.is_abandoned(Duration::from_millis(1)));
    }
}
