//! Typed, single-threaded publish/subscribe.
//!
//! An [`EventBus`] is parameterised by an event enum implementing [`Event`];
//! listeners subscribe to one kind (the enum's discriminant) and receive the
//! whole payload. Every subscription returns a handle that removes it.
//! One-shot waits with a timeout are modelled by [`Waiter`], which is polled
//! by the owning loop rather than driven by a background timer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};
use std::task::Poll;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// A payload carried on an [`EventBus`].
pub trait Event: Clone + 'static {
    type Kind: Copy + Eq + Hash + Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

type Callback<E> = Rc<dyn Fn(&E)>;

struct Listener<E> {
    id: u64,
    once: bool,
    callback: Callback<E>,
}

struct Registry<E: Event> {
    next_id: u64,
    listeners: HashMap<E::Kind, Vec<Listener<E>>>,
    records: HashMap<E::Kind, E>,
}

impl<E: Event> Registry<E> {
    fn remove(&mut self, kind: E::Kind, id: u64) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else { return false };
        let before = list.len();
        list.retain(|l| l.id != id);
        before != list.len()
    }
}

// ── EventBus ────────────────────────────────────────────────────────────────

/// Cloning a bus yields another handle to the same listeners.
pub struct EventBus<E: Event> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { registry: Rc::clone(&self.registry) }
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: HashMap::new(),
                records: HashMap::new(),
            })),
        }
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: E::Kind, callback: impl Fn(&E) + 'static) -> Subscription<E> {
        self.insert(kind, false, Rc::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe), but the listener is removed
    /// before its first invocation.
    pub fn subscribe_once(&self, kind: E::Kind, callback: impl Fn(&E) + 'static) -> Subscription<E> {
        self.insert(kind, true, Rc::new(callback))
    }

    /// Invoke `callback` immediately with the recorded payload for `kind`
    /// (if any), then subscribe it.
    pub fn listen_now(&self, kind: E::Kind, callback: impl Fn(&E) + 'static) -> Subscription<E> {
        if let Some(recorded) = self.recorded(kind) {
            callback(&recorded);
        }
        self.subscribe(kind, callback)
    }

    fn insert(&self, kind: E::Kind, once: bool, callback: Callback<E>) -> Subscription<E> {
        let mut reg = self.registry.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.entry(kind).or_default().push(Listener { id, once, callback });
        Subscription { registry: Rc::downgrade(&self.registry), kind, id }
    }

    /// Notify every listener of the event's kind. Returns how many ran.
    ///
    /// Listeners are snapshotted first, so callbacks may subscribe,
    /// unsubscribe or emit without affecting this dispatch.
    pub fn emit(&self, event: E) -> usize {
        let kind = event.kind();
        let callbacks: Vec<Callback<E>> = {
            let mut reg = self.registry.borrow_mut();
            let Some(list) = reg.listeners.get_mut(&kind) else { return 0 };
            let callbacks = list.iter().map(|l| Rc::clone(&l.callback)).collect();
            list.retain(|l| !l.once);
            callbacks
        };
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    /// Remember the payload for late subscribers, then emit it.
    pub fn emit_and_record(&self, event: E) -> usize {
        self.registry.borrow_mut().records.insert(event.kind(), event.clone());
        self.emit(event)
    }

    pub fn recorded(&self, kind: E::Kind) -> Option<E> {
        self.registry.borrow().records.get(&kind).cloned()
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.registry.borrow().listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Wait for the next event of `kind`, failing after `timeout` if given.
    /// A zero timeout means no timeout.
    pub fn when(&self, kind: E::Kind, timeout: Option<Duration>) -> Waiter<E> {
        self.when_from(kind, timeout, Instant::now())
    }

    /// [`when`](Self::when) with an explicit start instant.
    pub fn when_from(&self, kind: E::Kind, timeout: Option<Duration>, start: Instant) -> Waiter<E> {
        let slot: Rc<RefCell<Option<E>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        let subscription = self.subscribe_once(kind, move |e| {
            *sink.borrow_mut() = Some(e.clone());
        });
        Waiter {
            kind,
            slot,
            subscription: Some(subscription),
            deadline: timeout.filter(|t| !t.is_zero()).map(|t| (start + t, t)),
            timed_out: false,
        }
    }

    /// Resolve immediately from the recorded payload, otherwise [`when`](Self::when).
    pub fn when_or_recorded(&self, kind: E::Kind, timeout: Option<Duration>) -> Waiter<E> {
        match self.recorded(kind) {
            Some(recorded) => Waiter {
                kind,
                slot: Rc::new(RefCell::new(Some(recorded))),
                subscription: None,
                deadline: None,
                timed_out: false,
            },
            None => self.when(kind, timeout),
        }
    }
}

// ── Subscription ────────────────────────────────────────────────────────────

/// Handle returned by every subscribe call. Dropping it keeps the listener.
pub struct Subscription<E: Event> {
    registry: Weak<RefCell<Registry<E>>>,
    kind: E::Kind,
    id: u64,
}

impl<E: Event> Subscription<E> {
    /// Remove the listener. Returns `false` if it was already gone
    /// (fired once, unsubscribed earlier, or the bus was dropped).
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(reg) => reg.borrow_mut().remove(self.kind, self.id),
            None => false,
        }
    }
}

// ── Waiter ──────────────────────────────────────────────────────────────────

/// A pending one-shot wait created by [`EventBus::when`].
///
/// Poll it from the loop with the current time. A payload that arrived before
/// the poll wins over an expired deadline. On timeout the listener is removed
/// and every later poll reports the same timeout. Dropping the waiter removes
/// its listener.
pub struct Waiter<E: Event> {
    kind: E::Kind,
    slot: Rc<RefCell<Option<E>>>,
    subscription: Option<Subscription<E>>,
    deadline: Option<(Instant, Duration)>,
    timed_out: bool,
}

impl<E: Event> Waiter<E> {
    pub fn poll(&mut self, now: Instant) -> Poll<Result<E>> {
        if let Some(event) = self.slot.borrow().as_ref() {
            return Poll::Ready(Ok(event.clone()));
        }
        let Some((deadline, timeout)) = self.deadline else { return Poll::Pending };
        if self.timed_out || now >= deadline {
            self.timed_out = true;
            self.cancel();
            return Poll::Ready(Err(Error::ListenerTimeout {
                event: format!("{:?}", self.kind),
                timeout,
            }));
        }
        Poll::Pending
    }

    /// Stop waiting and remove the listener.
    pub fn cancel(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl<E: Event> Drop for Waiter<E> {
    fn drop(&mut self) {
        self.cancel();
    }
}
