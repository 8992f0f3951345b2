use super::{BrowserThread, BrowserThreads};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub type Completion<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Callback handed to request handlers. `true` allows the request.
pub type RequestCallback = ThreadAffineCallback<bool>;

/// A one-shot decision handle whose completion must run on a specific
/// executor.
///
/// Clones share the same completion. The completion runs at most once: the
/// first `continue_with`/`cancel` wins, and `disconnect` discards it without
/// running it. When the last clone is dropped with the completion still
/// stored, it runs with the default outcome on the bound executor.
pub struct ThreadAffineCallback<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    state: Arc<CallbackState<T>>,
}

struct CallbackState<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    threads: BrowserThreads,
    thread: BrowserThread,
    default_outcome: T,
    completion: Mutex<Option<Completion<T>>>,
}

impl<T> ThreadAffineCallback<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    pub fn new<F>(threads: &BrowserThreads, thread: BrowserThread, default_outcome: T, completion: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            state: Arc::new(CallbackState {
                threads: threads.clone(),
                thread,
                default_outcome,
                completion: Mutex::new(Some(Box::new(completion))),
            }),
        }
    }

    pub fn thread(&self) -> BrowserThread {
        self.state.thread
    }

    pub fn default_outcome(&self) -> T {
        self.state.default_outcome
    }

    pub fn is_pending(&self) -> bool {
        self.state.completion.lock().is_some()
    }

    pub fn continue_with(&self, outcome: T) {
        if self.state.threads.currently_on(self.state.thread) {
            self.state.run_now(outcome);
            return;
        }

        let state = Arc::clone(&self.state);
        let thread = self.state.thread;
        self.state
            .threads
            .post_or_run(thread, Box::new(move || state.run_now(outcome)));
    }

    pub fn cancel(&self) {
        self.continue_with(self.state.default_outcome);
    }

    pub fn disconnect(&self) {
        drop(self.detach());
    }

    /// Removes the stored completion without running it, handing it to the
    /// caller. Used when the answer is delivered through another path.
    pub fn detach(&self) -> Option<Completion<T>> {
        self.state.completion.lock().take()
    }
}

impl<T> Clone for ThreadAffineCallback<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for ThreadAffineCallback<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffineCallback")
            .field("thread", &self.state.thread)
            .field("default_outcome", &self.state.default_outcome)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T> CallbackState<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    fn run_now(&self, outcome: T) {
        // Take before running so the lock is not held across the completion.
        let completion = self.completion.lock().take();
        if let Some(completion) = completion {
            completion(outcome);
        }
    }
}

impl<T> Drop for CallbackState<T>
where
    T: Copy + Send + Sync + fmt::Debug + 'static,
{
    fn drop(&mut self) {
        let Some(completion) = self.completion.get_mut().take() else {
            return;
        };

        let outcome = self.default_outcome;
        if self.threads.currently_on(self.thread) {
            completion(outcome);
            return;
        }

        debug!(
            "Pending callback released off the {} thread; answering {:?}",
            self.thread, outcome
        );
        self.threads
            .post_or_run(self.thread, Box::new(move || completion(outcome)));
    }
}

/// Builds an engine completion that forwards its answer into a oneshot
/// channel, for callers that await the decision.
pub fn oneshot_completion<T>() -> (impl FnOnce(T) + Send + 'static, oneshot::Receiver<T>)
where
    T: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let completion = move |value: T| {
        if sender.send(value).is_err() {
            warn!("Decision receiver dropped before the answer arrived");
        }
    };
    (completion, receiver)
}
