//! Ordered observer registries.
//!
//! Each [`ObserverList`] keeps its callbacks in registration order. A
//! registration is removed only through the [`Subscription`] returned when it
//! was added, so the same closure registered twice needs two unsubscribes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A registered callback.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Handler<T>)>,
}

/// Removes registrations by id. Lets [`Subscription`] stay non-generic.
trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<T: ?Sized + 'static> Detach for Mutex<Registry<T>> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = self.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }
}

/// An ordered list of callbacks for values of type `T`.
pub struct ObserverList<T: ?Sized> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: ?Sized + 'static> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a callback. Keep the returned [`Subscription`] to remove it.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(handler)));

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            registry: weak,
        }
    }

    /// Invoke every callback in registration order.
    ///
    /// Callbacks run on a snapshot taken before the first call, so they may
    /// subscribe or unsubscribe without deadlocking.
    pub fn notify(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self
            .registry()
            .entries
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(value);
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.registry().entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + 'static> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a single observer registration.
///
/// Dropping it leaves the callback registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[must_use = "dropping a Subscription keeps the handler registered forever"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Remove exactly this registration.
    ///
    /// Returns `false` if the list is gone or the entry was already removed.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&i32) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let make = move |tag: &str| -> Box<dyn Fn(&i32) + Send + Sync> {
            let sink = Arc::clone(&sink);
            let tag = tag.to_string();
            Box::new(move |v: &i32| sink.lock().unwrap().push(format!("{tag}{v}")))
        };
        (seen, make)
    }

    #[test]
    fn notify_in_registration_order() {
        let list = ObserverList::<i32>::new();
        let (seen, make) = recorder();
        let _a = list.subscribe(make("a"));
        let _b = list.subscribe(make("b"));

        list.notify(&1);

        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let list = ObserverList::<i32>::new();
        let (seen, make) = recorder();
        let first = list.subscribe(make("x"));
        let _second = list.subscribe(make("x"));
        assert_eq!(list.len(), 2);

        assert!(first.unsubscribe());
        list.notify(&7);

        assert_eq!(list.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["x7"]);
    }

    #[test]
    fn unsubscribe_after_list_dropped() {
        let list = ObserverList::<i32>::new();
        let sub = list.subscribe(|_| {});
        drop(list);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn handler_may_subscribe_during_notify() {
        let list = Arc::new(ObserverList::<i32>::new());
        let inner = Arc::clone(&list);
        let _sub = list.subscribe(move |_| {
            let _nested = inner.subscribe(|_| {});
        });

        list.notify(&0);

        assert_eq!(list.len(), 2);
    }
}
