//! At-most-one resolution per key
//!
//! Populated values live in a [`DashMap`] and are never replaced. A key
//! without a value has at most one resolution in flight; concurrent callers
//! for that key wait for it and share its outcome. Failed outcomes are
//! handed to every waiter but not stored, so the next call resolves again.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::error::ResolveError;

type Outcome<V> = Result<V, ResolveError>;

struct Flight<V> {
    outcome: Mutex<Option<Outcome<V>>>,
    done: Condvar,
}

impl<V: Clone> Flight<V> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Outcome<V> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }

    fn complete(&self, result: Outcome<V>) {
        *self.outcome.lock() = Some(result);
        self.done.notify_all();
    }
}

/// Whether a lookup was served from the map or had to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Resolved,
    Joined,
}

pub struct SingleFlight<K, V> {
    ready: DashMap<K, V>,
    in_flight: Mutex<HashMap<K, Arc<Flight<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            ready: DashMap::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The stored value for `key`, without resolving.
    pub fn get(&self, key: &K) -> Option<V> {
        self.ready.get(key).map(|entry| entry.value().clone())
    }

    /// First stored value matching `predicate`, in unspecified order.
    pub fn find(&self, mut predicate: impl FnMut(&V) -> bool) -> Option<V> {
        self.ready
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Return the stored value for `key`, or run `resolve` exactly once across
    /// all concurrent callers and store its success.
    pub fn get_or_resolve<F>(&self, key: &K, resolve: F) -> (Outcome<V>, Lookup)
    where
        F: FnOnce() -> Outcome<V>,
    {
        if let Some(value) = self.get(key) {
            return (Ok(value), Lookup::Hit);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock();
            // A leader may have published between the fast path and the lock.
            if let Some(value) = self.get(key) {
                return (Ok(value), Lookup::Hit);
            }
            if let Some(flight) = in_flight.get(key) {
                let flight = Arc::clone(flight);
                drop(in_flight);
                return (flight.wait(), Lookup::Joined);
            }
            let flight = Arc::new(Flight::new());
            in_flight.insert(key.clone(), Arc::clone(&flight));
            flight
        };

        let mut guard = FlightGuard {
            owner: self,
            key,
            flight: &*flight,
            finished: false,
        };
        let outcome = resolve();
        guard.finish(outcome.clone());
        (outcome, Lookup::Resolved)
    }
}

/// Publishes the leader's outcome; releases waiters if the resolver unwinds.
struct FlightGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    owner: &'a SingleFlight<K, V>,
    key: &'a K,
    flight: &'a Flight<V>,
    finished: bool,
}

impl<K, V> FlightGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn finish(&mut self, outcome: Outcome<V>) {
        self.finished = true;
        if let Ok(value) = &outcome {
            self.owner
                .ready
                .entry(self.key.clone())
                .or_insert_with(|| value.clone());
        }
        self.owner.in_flight.lock().remove(self.key);
        self.flight.complete(outcome);
    }
}

impl<K, V> Drop for FlightGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Err(ResolveError::unexpected("resolution panicked")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_second_lookup_is_a_hit() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let (first, how) = flights.get_or_resolve(&"a".to_string(), || Ok(1));
        assert_eq!(first.unwrap(), 1);
        assert_eq!(how, Lookup::Resolved);

        let (second, how) = flights.get_or_resolve(&"a".to_string(), || Ok(2));
        assert_eq!(second.unwrap(), 1);
        assert_eq!(how, Lookup::Hit);
        assert_eq!(flights.len(), 1);
    }

    #[test]
    fn test_failures_are_not_stored() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();
        let (failed, _) = flights.get_or_resolve(&"a", || Err(ResolveError::not_found("a")));
        assert_eq!(failed.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(flights.get(&"a").is_none());

        let (retried, how) = flights.get_or_resolve(&"a", || Ok(7));
        assert_eq!(retried.unwrap(), 7);
        assert_eq!(how, Lookup::Resolved);
    }

    #[test]
    fn test_concurrent_callers_share_one_resolution() {
        let flights: Arc<SingleFlight<u8, usize>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flights = Arc::clone(&flights);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    flights
                        .get_or_resolve(&1, || {
                            thread::sleep(Duration::from_millis(50));
                            Ok(calls.fetch_add(1, Ordering::SeqCst) + 100)
                        })
                        .0
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 100);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiters_share_the_leaders_error() {
        let flights: Arc<SingleFlight<u8, usize>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let flights = Arc::clone(&flights);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    flights
                        .get_or_resolve(&1, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(100));
                            Err(ResolveError::not_found("nope"))
                        })
                        .0
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap_err().kind(), ErrorKind::NotFound);
        }
        // Late arrivals may start a fresh flight after the first failure.
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_panicking_resolver_releases_the_key() {
        let flights: SingleFlight<u8, u8> = SingleFlight::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            flights.get_or_resolve(&1, || panic!("host blew up"))
        }));
        assert!(result.is_err());

        let (value, how) = flights.get_or_resolve(&1, || Ok(3));
        assert_eq!(value.unwrap(), 3);
        assert_eq!(how, Lookup::Resolved);
    }
}
