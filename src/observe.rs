use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A shareable observable value. The engine thread writes it, UI or AI
/// collaborators subscribe to it. The write completes before any listener
/// runs, so listeners always observe the value that triggered them.
pub struct Property<T> {
    inner: Arc<PropertyInner<T>>,
}

struct PropertyInner<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                value: RwLock::new(value),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, value: T) {
        {
            let mut guard = self
                .inner
                .value
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = value.clone();
        }
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for listener in listeners.iter() {
            listener(&value);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(listener));
    }
}

impl<T: Clone + Send + Sync + Default> Default for Property<T> {
    fn default() -> Self {
        Property::new(T::default())
    }
}

impl<T: Clone + Send + Sync + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.get()).finish()
    }
}
