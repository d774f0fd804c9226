//! Completion primitives handed to the engine by callers

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use crate::address::AddressEntry;

type NotifyFn = Box<dyn Fn() + Send + Sync>;

struct EventInner {
    signals: AtomicUsize,
    notify: Option<NotifyFn>,
}

/// Completion notification.
///
/// Clones refer to the same event, and identity is what `cancel` compares.
/// The notify function runs every time the event is signalled. The engine
/// never runs it while holding its own lock, so it may call back into the
/// engine.
#[derive(Clone)]
pub struct Event(Arc<EventInner>);
impl Event {
    pub fn new() -> Self {
        Self(Arc::new(EventInner {
            signals: AtomicUsize::new(0),
            notify: None,
        }))
    }

    pub fn with_notify<F>(f: F) -> Self
    where F: Fn() + Send + Sync + 'static {
        Self(Arc::new(EventInner {
            signals: AtomicUsize::new(0),
            notify: Some(Box::new(f)),
        }))
    }

    pub fn signal(&self) {
        self.0.signals.fetch_add(1, Ordering::SeqCst);
        if let Some(notify) = &self.0.notify {
            notify();
        }
    }

    pub fn signal_count(&self) -> usize {
        self.0.signals.load(Ordering::SeqCst)
    }

    pub fn is_signaled(&self) -> bool {
        self.signal_count() != 0
    }

    pub fn same_as(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("signals", &self.signal_count())
            .field("notify", &self.0.notify.is_some())
            .finish()
    }
}

/// Caller-owned output slot for a resolved hardware address.
///
/// Left untouched when a wait ends without an address (cancel, deny or
/// retry exhaustion), so an empty buffer after the event fired means failure.
#[derive(Debug, Clone, Default)]
pub struct AddressBuffer(Arc<Mutex<Option<AddressEntry>>>);
impl AddressBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<AddressEntry> {
        self.0.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_none()
    }

    pub(crate) fn write(&self, address: AddressEntry) {
        *self.0.lock() = Some(address);
    }
}
