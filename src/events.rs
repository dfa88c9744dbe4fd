//! Event types and the synchronous listener registry they are delivered
//! through.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle returned by a registry when a listener is added; pass it back to
/// remove the listener again.
pub type ListenerId = usize;

/// Raised by an ISR-capable device when one or more input pins changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputsChanged {
    /// Which input bits raised the interrupt condition.
    pub latch: u8,
    /// Full input byte captured when the latch was read.
    pub states: u8,
}

/// Raised by an input pin controller when its debounced state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinChanged {
    pub pin: u8,
    pub state: bool,
}

/// Raised by an input pin group controller on an accepted group transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinGroupChanged {
    /// Pin mask the group watches.
    pub mask: u8,
    /// New combined group state.
    pub state: bool,
    /// Interrupt latch bits restricted to the group mask.
    pub latch: u8,
}

/// What a button controller detected on a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Click,
    DoubleClick,
    Hold,
}

/// Raised by a button controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub pin: u8,
    pub action: ButtonAction,
}

/// Raised by the edge detector once per detected GPIO edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Host GPIO line the edge was observed on.
    pub pin: u8,
}

type Callback<E> = Box<dyn Fn(&E) + Send>;

/// A registry of event callbacks, invoked synchronously in registration
/// order on the emitting thread.
///
/// Callbacks must not add or remove listeners on the registry they are
/// being dispatched from; the registry lock is held for the duration of
/// `emit`.
pub struct ListenerRegistry<E> {
    inner: Mutex<Inner<E>>,
}

struct Inner<E> {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Registers a callback and returns its removal handle.
    pub fn add(&self, callback: Callback<E>) -> ListenerId {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, callback));
        id
    }

    /// Removes a previously registered callback. Returns `false` if the id
    /// was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _)| *lid != id);
        inner.listeners.len() != before
    }

    /// Delivers an event to every listener, in registration order.
    pub fn emit(&self, event: &E) {
        let inner = lock(&self.inner);
        for (_, callback) in &inner.listeners {
            callback(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).listeners.is_empty()
    }
}

impl<E> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &lock(&self.inner).listeners.len())
            .finish()
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn listeners_fire_in_registration_order() {
        let registry = ListenerRegistry::<u8>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in [1usize, 2, 3] {
            let order = Arc::clone(&order);
            registry.add(Box::new(move |_| lock(&order).push(tag)));
        }
        registry.emit(&0);
        assert_eq!(*lock(&order), vec![1, 2, 3]);
    }

    #[test]
    fn removed_listener_no_longer_fires() {
        let registry = ListenerRegistry::<u8>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = {
            let hits = Arc::clone(&hits);
            registry.add(Box::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }))
        };
        registry.emit(&0);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.emit(&0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
