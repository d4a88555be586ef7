// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous change-notification channel.
//!
//! Every transform owns one [`EventSource`]. Interested parties
//! [`subscribe`](EventSource::subscribe) a callback and receive a synchronous
//! call each time the owner [`notify`](EventSource::notify)s. There is no
//! queueing and no thread hand-off: notification runs the listeners to
//! completion on the caller's stack, which is what lets a chain forward a
//! deeply nested child's change to its own subscribers in one call.
//!
//! Cloning an `EventSource` clones a handle to the *same* registry, so a
//! listener closure can capture a clone of its owner's source and re-fire it
//! without holding a reference cycle through the owner itself.
//! [`ptr_eq`](EventSource::ptr_eq) compares registry identity, which doubles
//! as a cheap identity test for the owning transform.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

type Listener = Rc<dyn Fn()>;

struct Registry {
    next_id: usize,
    listeners: Vec<(usize, Listener)>,
}

/// Identifies one subscription on one [`EventSource`].
///
/// Returned by [`subscribe`](EventSource::subscribe); pass it back to
/// [`unsubscribe`](EventSource::unsubscribe) on the same source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// A callback registry delivering synchronous change notifications.
#[derive(Clone)]
pub struct EventSource {
    inner: Rc<RefCell<Registry>>,
}

impl EventSource {
    /// Creates a source with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers `listener` to be called on every [`notify`](Self::notify).
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> SubscriptionId {
        let mut reg = self.inner.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.push((id, Rc::new(listener)));
        SubscriptionId(id)
    }

    /// Removes a subscription. Returns whether it was present.
    ///
    /// Unsubscribing an id twice is harmless; the second call returns `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut reg = self.inner.borrow_mut();
        let before = reg.listeners.len();
        reg.listeners.retain(|(lid, _)| *lid != id.0);
        reg.listeners.len() != before
    }

    /// Calls every current listener, in subscription order.
    ///
    /// The listener list is snapshotted first, so a listener that subscribes
    /// or unsubscribes during delivery affects the *next* notification, not
    /// this one.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Whether two handles refer to the same registry (same owning transform).
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
