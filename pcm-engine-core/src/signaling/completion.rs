use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Callback invoked when an asynchronous engine operation finishes.
///
/// Runs on the engine's worker thread. Listeners that touch state owned by
/// another thread must hand the event over themselves.
pub type CompletionListener<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

/// Handle returned by [`CompletionRegistry::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Inner<E> {
    listeners: Vec<(ListenerId, CompletionListener<E>)>,
    subscribers: Vec<Sender<E>>,
}

/// Broadcast of completion events to callbacks and channel subscribers.
///
/// Cloning yields another handle to the same registry.
pub struct CompletionRegistry<E> {
    inner: Arc<Mutex<Inner<E>>>,
    next_id: Arc<AtomicU64>,
}

impl<E> Clone for CompletionRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<E: Clone + Send + 'static> CompletionRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                listeners: Vec::new(),
                subscribers: Vec::new(),
            })),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.lock().listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns `true` if the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    /// Receive every future event on a channel. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Deliver `event` to every listener, then to every live subscriber.
    ///
    /// Listeners are called outside the registry lock, so they may register
    /// or remove listeners, or restart the engine that emitted the event.
    pub fn notify(&self, event: &E) {
        let listeners: Vec<CompletionListener<E>> = {
            let inner = self.inner.lock();
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in &listeners {
            listener(event);
        }

        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<E: Clone + Send + 'static> Default for CompletionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
