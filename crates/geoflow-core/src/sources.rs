//! External source interfaces
//!
//! A membership source (location index) and a value source (database) are
//! push-based: they call a listener until the returned [`SourceHandle`] is
//! released. Implementations may call listeners from any thread.

use crate::errors::SourceError;
use crate::types::{Key, Location};
use std::fmt;
use std::sync::Arc;

/// One event from a membership source.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipEvent {
    /// A key entered the query region
    KeyEntered {
        /// Member key
        key: Key,
        /// Location at entry
        location: Location,
    },
    /// A key left the query region
    KeyExited {
        /// Member key
        key: Key,
    },
    /// A key moved inside the query region
    KeyMoved {
        /// Member key
        key: Key,
        /// New location
        location: Location,
    },
    /// Initial load is complete
    Ready,
    /// The source failed; no further events follow
    Error(SourceError),
}

type EventFn = Arc<dyn Fn(MembershipEvent) + Send + Sync>;

/// Callback sink handed to a [`MembershipSource`].
#[derive(Clone)]
pub struct MembershipListener {
    on_event: EventFn,
}

impl MembershipListener {
    /// Listener receiving every event through one closure.
    pub fn new<F>(on_event: F) -> Self
    where
        F: Fn(MembershipEvent) + Send + Sync + 'static,
    {
        Self {
            on_event: Arc::new(on_event),
        }
    }

    /// Build a listener from per-event callbacks. Unset callbacks ignore
    /// their events.
    pub fn builder() -> MembershipListenerBuilder {
        MembershipListenerBuilder::default()
    }

    /// Deliver a raw event.
    pub fn send(&self, event: MembershipEvent) {
        (self.on_event)(event);
    }

    /// Deliver `KeyEntered`.
    pub fn on_key_entered(&self, key: impl Into<Key>, location: Location) {
        self.send(MembershipEvent::KeyEntered {
            key: key.into(),
            location,
        });
    }

    /// Deliver `KeyExited`.
    pub fn on_key_exited(&self, key: impl Into<Key>) {
        self.send(MembershipEvent::KeyExited { key: key.into() });
    }

    /// Deliver `KeyMoved`.
    pub fn on_key_moved(&self, key: impl Into<Key>, location: Location) {
        self.send(MembershipEvent::KeyMoved {
            key: key.into(),
            location,
        });
    }

    /// Deliver `Ready`.
    pub fn on_ready(&self) {
        self.send(MembershipEvent::Ready);
    }

    /// Deliver `Error`.
    pub fn on_error(&self, error: SourceError) {
        self.send(MembershipEvent::Error(error));
    }
}

impl fmt::Debug for MembershipListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipListener").finish_non_exhaustive()
    }
}

type KeyLocationFn = Box<dyn Fn(Key, Location) + Send + Sync>;
type KeyFn = Box<dyn Fn(Key) + Send + Sync>;
type ReadyFn = Box<dyn Fn() + Send + Sync>;
type ErrorFn = Box<dyn Fn(SourceError) + Send + Sync>;

/// Builder for a [`MembershipListener`] with one closure per event kind.
#[derive(Default)]
pub struct MembershipListenerBuilder {
    on_key_entered: Option<KeyLocationFn>,
    on_key_exited: Option<KeyFn>,
    on_key_moved: Option<KeyLocationFn>,
    on_ready: Option<ReadyFn>,
    on_error: Option<ErrorFn>,
}

impl MembershipListenerBuilder {
    /// Callback for keys entering the region.
    pub fn on_key_entered(mut self, f: impl Fn(Key, Location) + Send + Sync + 'static) -> Self {
        self.on_key_entered = Some(Box::new(f));
        self
    }

    /// Callback for keys leaving the region.
    pub fn on_key_exited(mut self, f: impl Fn(Key) + Send + Sync + 'static) -> Self {
        self.on_key_exited = Some(Box::new(f));
        self
    }

    /// Callback for keys moving inside the region.
    pub fn on_key_moved(mut self, f: impl Fn(Key, Location) + Send + Sync + 'static) -> Self {
        self.on_key_moved = Some(Box::new(f));
        self
    }

    /// Callback for the end of initial load.
    pub fn on_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    /// Callback for source failure.
    pub fn on_error(mut self, f: impl Fn(SourceError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Finish the listener.
    pub fn build(self) -> MembershipListener {
        MembershipListener::new(move |event| match event {
            MembershipEvent::KeyEntered { key, location } => {
                if let Some(f) = &self.on_key_entered {
                    f(key, location);
                }
            }
            MembershipEvent::KeyExited { key } => {
                if let Some(f) = &self.on_key_exited {
                    f(key);
                }
            }
            MembershipEvent::KeyMoved { key, location } => {
                if let Some(f) = &self.on_key_moved {
                    f(key, location);
                }
            }
            MembershipEvent::Ready => {
                if let Some(f) = &self.on_ready {
                    f();
                }
            }
            MembershipEvent::Error(error) => {
                if let Some(f) = &self.on_error {
                    f(error);
                }
            }
        })
    }
}

type ValueFn<V> = Arc<dyn Fn(Result<V, SourceError>) + Send + Sync>;

/// Callback sink handed to a [`ValueSource`].
pub struct ValueListener<V> {
    on_update: ValueFn<V>,
}

impl<V> Clone for ValueListener<V> {
    fn clone(&self) -> Self {
        Self {
            on_update: self.on_update.clone(),
        }
    }
}

impl<V: 'static> ValueListener<V> {
    /// Listener receiving values and errors through one closure.
    pub fn new<F>(on_update: F) -> Self
    where
        F: Fn(Result<V, SourceError>) + Send + Sync + 'static,
    {
        Self {
            on_update: Arc::new(on_update),
        }
    }

    /// Build a listener from separate value and error callbacks.
    pub fn builder() -> ValueListenerBuilder<V> {
        ValueListenerBuilder {
            on_value: None,
            on_error: None,
        }
    }

    /// Deliver a new value.
    pub fn on_value(&self, value: V) {
        (self.on_update)(Ok(value));
    }

    /// Deliver a terminal failure.
    pub fn on_error(&self, error: SourceError) {
        (self.on_update)(Err(error));
    }
}

impl<V> fmt::Debug for ValueListener<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueListener").finish_non_exhaustive()
    }
}

/// Builder for a [`ValueListener`].
pub struct ValueListenerBuilder<V> {
    on_value: Option<Box<dyn Fn(V) + Send + Sync>>,
    on_error: Option<ErrorFn>,
}

impl<V: 'static> ValueListenerBuilder<V> {
    /// Callback for new values.
    pub fn on_value(mut self, f: impl Fn(V) + Send + Sync + 'static) -> Self {
        self.on_value = Some(Box::new(f));
        self
    }

    /// Callback for source failure.
    pub fn on_error(mut self, f: impl Fn(SourceError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Finish the listener.
    pub fn build(self) -> ValueListener<V> {
        ValueListener::new(move |update| match update {
            Ok(value) => {
                if let Some(f) = &self.on_value {
                    f(value);
                }
            }
            Err(error) => {
                if let Some(f) = &self.on_error {
                    f(error);
                }
            }
        })
    }
}

/// Registration returned by a source.
///
/// Releasing it stops further callbacks. `unsubscribe` runs the release at
/// most once; dropping the handle releases it too.
pub struct SourceHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SourceHandle {
    /// Handle running `release` on unsubscribe.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Handle with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Whether the handle has not been released yet.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Release the registration. Later calls do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Producer of enter/exit/move/ready/error events for one region query.
pub trait MembershipSource: Send + Sync {
    /// Register `listener` until the returned handle is released.
    fn subscribe(&self, listener: MembershipListener) -> Result<SourceHandle, SourceError>;
}

impl<S: MembershipSource + ?Sized> MembershipSource for Arc<S> {
    fn subscribe(&self, listener: MembershipListener) -> Result<SourceHandle, SourceError> {
        (**self).subscribe(listener)
    }
}

/// Producer of changing values at logical addresses.
pub trait ValueSource: Send + Sync {
    /// Value delivered for an address
    type Value: Send + 'static;

    /// Register `listener` for `address` until the returned handle is released.
    fn subscribe(
        &self,
        address: &ValueAddress,
        listener: ValueListener<Self::Value>,
    ) -> Result<SourceHandle, SourceError>;
}

impl<S: ValueSource + ?Sized> ValueSource for Arc<S> {
    type Value = S::Value;

    fn subscribe(
        &self,
        address: &ValueAddress,
        listener: ValueListener<Self::Value>,
    ) -> Result<SourceHandle, SourceError> {
        (**self).subscribe(address, listener)
    }
}

/// Logical address of a member's value, `"{prefix}/{key}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueAddress(String);

impl ValueAddress {
    /// Address of `key` under `prefix`, or the bare key without a prefix.
    pub fn resolve(prefix: Option<&str>, key: &Key) -> Self {
        match prefix {
            Some(prefix) => Self(format!("{prefix}/{key}")),
            None => Self(key.as_str().to_owned()),
        }
    }

    /// The address as a path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValueAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValueAddress {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_builder_dispatches_per_event() {
        let entered = Arc::new(Mutex::new(Vec::new()));
        let ready = Arc::new(AtomicUsize::new(0));

        let listener = {
            let entered = entered.clone();
            let ready = ready.clone();
            MembershipListener::builder()
                .on_key_entered(move |key, location| {
                    entered.lock().unwrap().push((key, location));
                })
                .on_ready(move || {
                    ready.fetch_add(1, Ordering::SeqCst);
                })
                .build()
        };

        listener.on_key_entered("a", Location::new(1.0, 2.0));
        // No exit callback registered; must be ignored.
        listener.on_key_exited("a");
        listener.on_ready();

        assert_eq!(
            *entered.lock().unwrap(),
            vec![(Key::from("a"), Location::new(1.0, 2.0))]
        );
        assert_eq!(ready.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_value_listener_builder() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(AtomicUsize::new(0));

        let listener = {
            let values = values.clone();
            let errors = errors.clone();
            ValueListener::<u32>::builder()
                .on_value(move |v| values.lock().unwrap().push(v))
                .on_error(move |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                })
                .build()
        };

        listener.on_value(1);
        listener.on_value(2);
        listener.on_error(SourceError::value("a", "gone"));

        assert_eq!(*values.lock().unwrap(), vec![1, 2]);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut handle = {
            let released = released.clone();
            SourceHandle::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(handle.is_active());
        handle.unsubscribe();
        handle.unsubscribe();
        drop(handle);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_drop_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        {
            let released = released.clone();
            let _handle = SourceHandle::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_address_resolution() {
        let key = Key::from("u1");
        assert_eq!(
            ValueAddress::resolve(Some("profiles"), &key).as_str(),
            "profiles/u1"
        );
        assert_eq!(ValueAddress::resolve(None, &key).as_str(), "u1");
    }
}
