//! In-memory sources
//!
//! Both mocks deliver synchronously on the calling thread to every active
//! listener, and count subscribe/unsubscribe calls so tests can check that
//! streams release what they open. Listeners are invoked outside the
//! registry lock.
//!
//! [`MockValueSource`] serializes every delivery, including the replay of the
//! current value on subscribe, so a listener sees values in the order they
//! were set even when tests push from other threads.

use geoflow_core::{
    Key, Location, MembershipEvent, MembershipListener, MembershipSource, SourceError,
    SourceHandle, ValueAddress, ValueListener, ValueSource,
};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct MembershipRegistry {
    listeners: BTreeMap<u64, MembershipListener>,
    next_id: u64,
    subscribes: usize,
    unsubscribes: usize,
    refusal: Option<SourceError>,
}

/// Membership source driven by test code.
#[derive(Clone, Default)]
pub struct MockMembershipSource {
    registry: Arc<Mutex<MembershipRegistry>>,
}

impl MockMembershipSource {
    /// Source with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every active listener.
    pub fn emit(&self, event: MembershipEvent) {
        let listeners: Vec<_> = self.registry.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener.send(event.clone());
        }
    }

    /// `key` entered at `location`.
    pub fn enter(&self, key: impl Into<Key>, location: Location) {
        self.emit(MembershipEvent::KeyEntered {
            key: key.into(),
            location,
        });
    }

    /// `key` left the region.
    pub fn exit(&self, key: impl Into<Key>) {
        self.emit(MembershipEvent::KeyExited { key: key.into() });
    }

    /// `key` moved to `location`.
    pub fn moved(&self, key: impl Into<Key>, location: Location) {
        self.emit(MembershipEvent::KeyMoved {
            key: key.into(),
            location,
        });
    }

    /// Initial load finished.
    pub fn ready(&self) {
        self.emit(MembershipEvent::Ready);
    }

    /// Report a membership failure to every listener.
    pub fn fail(&self, message: &str) {
        self.emit(MembershipEvent::Error(SourceError::membership(message)));
    }

    /// Make later `subscribe` calls fail with `message`.
    pub fn refuse(&self, message: &str) {
        self.registry.lock().refusal = Some(SourceError::membership(message));
    }

    /// Successful subscriptions so far.
    pub fn subscribe_count(&self) -> usize {
        self.registry.lock().subscribes
    }

    /// Released subscriptions so far.
    pub fn unsubscribe_count(&self) -> usize {
        self.registry.lock().unsubscribes
    }

    /// Subscriptions currently registered.
    pub fn active_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

impl MembershipSource for MockMembershipSource {
    fn subscribe(&self, listener: MembershipListener) -> Result<SourceHandle, SourceError> {
        let mut registry = self.registry.lock();
        if let Some(refusal) = &registry.refusal {
            return Err(refusal.clone());
        }
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribes += 1;
        registry.listeners.insert(id, listener);

        let shared = self.registry.clone();
        Ok(SourceHandle::new(move || {
            let mut registry = shared.lock();
            if registry.listeners.remove(&id).is_some() {
                registry.unsubscribes += 1;
            }
        }))
    }
}

struct AddressState<V> {
    current: Option<V>,
    listeners: BTreeMap<u64, ValueListener<V>>,
    subscribes: usize,
    unsubscribes: usize,
    refusal: Option<SourceError>,
}

impl<V> Default for AddressState<V> {
    fn default() -> Self {
        Self {
            current: None,
            listeners: BTreeMap::new(),
            subscribes: 0,
            unsubscribes: 0,
            refusal: None,
        }
    }
}

struct ValueRegistry<V> {
    addresses: HashMap<String, AddressState<V>>,
    next_id: u64,
}

/// Value source keyed by address, with database semantics: a new listener
/// receives the current value immediately if one is set.
pub struct MockValueSource<V> {
    registry: Arc<Mutex<ValueRegistry<V>>>,
    // Held across store-and-deliver; reentrant so a listener may push back.
    delivery: Arc<ReentrantMutex<()>>,
}

impl<V> Clone for MockValueSource<V> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

impl<V: Clone + Send + 'static> Default for MockValueSource<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> MockValueSource<V> {
    /// Source with no values.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(ValueRegistry {
                addresses: HashMap::new(),
                next_id: 0,
            })),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Store `value` at `address` and deliver it to active listeners.
    pub fn set_current(&self, address: &str, value: V) {
        let _delivery = self.delivery.lock();
        let listeners = {
            let mut registry = self.registry.lock();
            let state = registry.addresses.entry(address.to_owned()).or_default();
            state.current = Some(value.clone());
            state.listeners.values().cloned().collect::<Vec<_>>()
        };
        for listener in listeners {
            listener.on_value(value.clone());
        }
    }

    /// Report a failure at `address` to its active listeners.
    pub fn fail(&self, address: &str, message: &str) {
        let _delivery = self.delivery.lock();
        for listener in self.listeners(address) {
            listener.on_error(SourceError::value(address, message));
        }
    }

    /// Make later `subscribe` calls for `address` fail with `message`.
    pub fn refuse(&self, address: &str, message: &str) {
        let mut registry = self.registry.lock();
        registry.addresses.entry(address.to_owned()).or_default().refusal =
            Some(SourceError::value(address, message));
    }

    /// Successful subscriptions to `address` so far.
    pub fn subscribe_count(&self, address: &str) -> usize {
        self.with_state(address, |state| state.subscribes)
    }

    /// Released subscriptions to `address` so far.
    pub fn unsubscribe_count(&self, address: &str) -> usize {
        self.with_state(address, |state| state.unsubscribes)
    }

    /// Subscriptions to `address` currently registered.
    pub fn active_count(&self, address: &str) -> usize {
        self.with_state(address, |state| state.listeners.len())
    }

    /// Subscriptions currently registered across all addresses.
    pub fn total_active(&self) -> usize {
        self.registry
            .lock()
            .addresses
            .values()
            .map(|state| state.listeners.len())
            .sum()
    }

    fn listeners(&self, address: &str) -> Vec<ValueListener<V>> {
        self.with_state(address, |state| state.listeners.values().cloned().collect())
    }

    fn with_state<R: Default>(&self, address: &str, f: impl FnOnce(&AddressState<V>) -> R) -> R {
        self.registry.lock().addresses.get(address).map(f).unwrap_or_default()
    }
}

impl<V: Clone + Send + 'static> ValueSource for MockValueSource<V> {
    type Value = V;

    fn subscribe(
        &self,
        address: &ValueAddress,
        listener: ValueListener<V>,
    ) -> Result<SourceHandle, SourceError> {
        let delivery = self.delivery.lock();
        let (id, current) = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            let state = registry.addresses.entry(address.as_str().to_owned()).or_default();
            if let Some(refusal) = &state.refusal {
                return Err(refusal.clone());
            }
            state.subscribes += 1;
            state.listeners.insert(id, listener.clone());
            (id, state.current.clone())
        };

        if let Some(value) = current {
            listener.on_value(value);
        }
        drop(delivery);

        let shared = self.registry.clone();
        let address = address.as_str().to_owned();
        Ok(SourceHandle::new(move || {
            let mut registry = shared.lock();
            if let Some(state) = registry.addresses.get_mut(&address) {
                if state.listeners.remove(&id).is_some() {
                    state.unsubscribes += 1;
                }
            }
        }))
    }
}
