use std::sync::{Arc, Mutex};

use super::UiDocument;

type Job = Box<dyn FnOnce(&mut UiDocument) + Send>;

/// Cross-thread entry point into the UI thread. Producers append closures
/// under a mutex; the document drains the queue once per frame, before
/// input and layout. This queue is the only cross-thread synchronization
/// in the crate.
#[derive(Default)]
pub struct Dispatcher {
    queue: Arc<Mutex<Vec<Job>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            queue: self.queue.clone(),
        }
    }

    /// Swaps the queue out so jobs can run against `&mut UiDocument`
    /// without holding the lock.
    pub(crate) fn take_jobs(&self) -> Vec<Job> {
        let mut queue = self.queue.lock().expect("dispatcher queue poisoned");
        std::mem::take(&mut *queue)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().expect("dispatcher queue poisoned").len()
    }
}

/// Sendable handle to a document's dispatcher queue.
#[derive(Clone)]
pub struct DispatcherHandle {
    queue: Arc<Mutex<Vec<Job>>>,
}

impl DispatcherHandle {
    pub fn invoke_on_ui_thread(&self, job: impl FnOnce(&mut UiDocument) + Send + 'static) {
        self.queue
            .lock()
            .expect("dispatcher queue poisoned")
            .push(Box::new(job));
    }
}
