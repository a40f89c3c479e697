use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// An immutable, named occurrence with an opaque payload.
///
/// Cloning is cheap: the name and payload are reference counted. Listeners
/// recover the payload with [`payload`](Event::payload).
#[derive(Clone)]
pub struct Event {
    name: Arc<str>,
    payload: Arc<dyn Any + Send + Sync>,
    timestamp: SystemTime,
}

impl Event {
    /// Create an event stamped with the current wall-clock time.
    pub fn new<T>(name: impl Into<Arc<str>>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self { name: name.into(), payload: Arc::new(payload), timestamp: SystemTime::now() }
    }

    /// An event without a payload.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, ())
    }

    /// Name listeners are registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the payload as `T`, if that is its type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Wall-clock time the event was created.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
