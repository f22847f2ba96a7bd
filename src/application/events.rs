use crate::model::Snapshot;
use crate::types::Command;
use log::warn;
use std::fmt;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Notifications published by the protocol engine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Handshake acknowledged; polling has started
    Connected,
    SnapshotUpdated(Arc<Snapshot>),
    ConfigSaved,
    OverrideApplied { channel: u8, state: bool },
    /// The device rejected the frame sent with this command
    ChecksumFailed(Command),
    /// No acknowledgment arrived for this command within the configured window
    ProtocolTimeout(Command),
    Disconnected(String),
}

type Callback = Box<dyn Fn(&Event) + Send + Sync>;

/// Fans events out to registered callbacks and bounded subscriber queues.
///
/// Callbacks run on the engine's worker thread and must not block or
/// register further callbacks.
#[derive(Default)]
pub struct Notifier {
    callbacks: Mutex<Vec<Callback>>,
    subscribers: Mutex<Vec<SyncSender<Event>>>,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        relock(&self.callbacks).push(Box::new(callback));
    }

    /// A queue of future events holding at most `capacity` undelivered entries
    pub fn subscribe(&self, capacity: usize) -> Receiver<Event> {
        let (tx, rx) = sync_channel(capacity);
        relock(&self.subscribers).push(tx);
        rx
    }

    pub fn publish(&self, event: Event) {
        for callback in relock(&self.callbacks).iter() {
            callback(&event);
        }
        relock(&self.subscribers).retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!("subscriber queue full, dropping {dropped:?}");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        relock(&self.subscribers).len()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("callbacks", &relock(&self.callbacks).len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
