use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient message shown after a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    notice: Option<Notice>,
}

/// Single-slot notice holder with an auto-clear timer.
///
/// Showing a notice replaces the current one, aborts the pending clear and
/// schedules a new one; the latest message always gets the full delay.
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct NoticeSlot {
    ttl: Duration,
    slot: Arc<Mutex<Slot>>,
    pending_clear: Option<JoinHandle<()>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NoticeSlot {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Arc::new(Mutex::new(Slot::default())),
            pending_clear: None,
        }
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(NoticeKind::Success, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(NoticeKind::Error, text.into());
    }

    /// The notice currently visible, if any.
    pub fn current(&self) -> Option<Notice> {
        lock(&self.slot).notice.clone()
    }

    /// Clears the notice immediately.
    pub fn dismiss(&mut self) {
        self.cancel_pending();
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.notice = None;
    }

    fn show(&mut self, kind: NoticeKind, text: String) {
        self.cancel_pending();

        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.notice = Some(Notice { kind, text });
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let ttl = self.ttl;
        self.pending_clear = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slot = lock(&slot);
            // A newer notice owns the slot if the generation moved on.
            if slot.generation == generation {
                slot.notice = None;
            }
        }));
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending_clear.take() {
            handle.abort();
        }
    }
}

impl Drop for NoticeSlot {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
