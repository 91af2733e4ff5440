use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{MessageKind, StatusMessage};

pub const DEFAULT_DISPLAY_TIME: Duration = Duration::from_secs(5);

/// Single-slot status banner with auto-dismiss.
///
/// `show` always replaces the current message and restarts the timer; a hide
/// scheduled for an earlier message never fires. Must be used from within a
/// tokio runtime.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    display_time: Duration,
    slot: Mutex<Slot>,
    tx: watch::Sender<Option<StatusMessage>>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    dismissals: u64,
    hide_task: Option<JoinHandle<()>>,
}

impl Notifier {
    pub fn new(display_time: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                display_time,
                slot: Mutex::new(Slot::default()),
                tx,
            }),
        }
    }

    pub fn show(&self, text: impl Into<String>, kind: MessageKind) {
        let visible_until = Instant::now() + self.inner.display_time;
        let message = StatusMessage {
            text: text.into(),
            kind,
            visible_until,
        };
        debug!("notice ({}): {}", kind.as_str(), message.text);

        let mut slot = self.lock();
        if let Some(task) = slot.hide_task.take() {
            task.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        self.inner.tx.send_replace(Some(message));

        let notifier = self.clone();
        slot.hide_task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(visible_until).await;
            notifier.hide(generation);
        }));
    }

    pub fn current(&self) -> Option<StatusMessage> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.inner.tx.subscribe()
    }

    /// Number of messages that have been hidden by their timer.
    pub fn dismissals(&self) -> u64 {
        self.lock().dismissals
    }

    fn hide(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation != generation {
            return;
        }
        slot.hide_task = None;
        slot.dismissals += 1;
        self.inner.tx.send_replace(None);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.inner
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_TIME)
    }
}
