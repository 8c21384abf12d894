//! Observable state cells and cancellation handles.
//!
//! Every mutation in the engine funnels through [`StateCell::set`], which
//! compares old and new values and only notifies subscribers on change.
//! Every subscription and stream start returns a [`Disposer`]; disposers
//! are idempotent and safe to call unconditionally on teardown.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An idempotent cancellation handle.
///
/// Calling [`dispose`](Self::dispose) more than once is a no-op. Dropping
/// an undisposed handle disposes it, so storing the handle keeps the
/// underlying work alive and replacing it cancels the old work.
pub struct Disposer {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
    /// Wrap a cancellation action.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Self { action: None }
    }

    /// Run the cancellation action if it has not run yet.
    pub fn dispose(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.action.is_none())
            .finish()
    }
}

/// A shared cancellation flag for cooperative loops.
///
/// Cheap to clone; the worker polls [`is_cancelled`](Self::is_cancelled)
/// and the owner flips it through a [`Disposer`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// A disposer that cancels this flag.
    pub fn disposer(&self) -> Disposer {
        let flag = self.clone();
        Disposer::new(move || flag.cancel())
    }
}

/// A bare event with no payload, e.g. a player's "ended" signal.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<NotifierState>>,
}

#[derive(Default)]
struct NotifierState {
    listeners: Vec<(u64, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every current listener.
    pub fn fire(&self) {
        let listeners: Vec<_> = {
            let state = self.inner.lock();
            state.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener();
        }
    }

    /// Subscribe to the event.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Disposer {
        let id;
        {
            let mut state = self.inner.lock();
            id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, Arc::new(listener)));
        }
        let inner = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.lock().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.inner.lock().listeners.len())
            .finish()
    }
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellState<T> {
    value: T,
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

/// A compare-and-notify observable value.
#[derive(Clone)]
pub struct StateCell<T> {
    inner: Arc<Mutex<CellState<T>>>,
}

impl<T: Clone + PartialEq + Send + 'static> StateCell<T> {
    /// Create a cell holding an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellState {
                value,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Snapshot the current value.
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Set a new value. Subscribers are notified only when the value
    /// actually changed. Returns whether it did.
    pub fn set(&self, value: T) -> bool {
        let listeners: Vec<Listener<T>>;
        {
            let mut state = self.inner.lock();
            if state.value == value {
                return false;
            }
            state.value = value.clone();
            listeners = state.listeners.iter().map(|(_, l)| l.clone()).collect();
        }
        // Listeners run outside the lock so they may freely read the cell.
        for listener in listeners {
            listener(&value);
        }
        true
    }

    /// Apply a mutation to a copy of the value, then [`set`](Self::set) it.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> bool {
        let mut value = self.get();
        mutate(&mut value);
        self.set(value)
    }

    /// Subscribe to changes. The listener runs after each effective change
    /// with the new value.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Disposer {
        let id;
        {
            let mut state = self.inner.lock();
            id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, Arc::new(listener)));
        }
        let inner = Arc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.lock().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl<T: std::fmt::Debug + Clone + PartialEq + Send + 'static> std::fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StateCell").field(&self.get()).finish()
    }
}
