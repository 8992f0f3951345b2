pub mod callback;

pub use callback::*;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The named executors embedder callbacks are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserThread {
    Ui,
    Io,
}

impl fmt::Display for BrowserThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserThread::Ui => f.write_str("UI"),
            BrowserThread::Io => f.write_str("IO"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThreadOptions {
    pub ui_name: String,
    pub io_name: String,
    pub strict_checks: bool,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            ui_name: "embedder-ui".to_string(),
            io_name: "embedder-io".to_string(),
            strict_checks: true,
        }
    }
}

enum Envelope {
    Run(Task),
    Quit,
}

struct Executor {
    thread: BrowserThread,
    thread_id: ThreadId,
    sender: Sender<Envelope>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Executor {
    fn spawn(thread: BrowserThread, name: &str) -> Result<Self, ThreadError> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::run_loop(thread, receiver))
            .map_err(|e| ThreadError::Spawn(thread, e.to_string()))?;

        Ok(Self {
            thread,
            thread_id: handle.thread().id(),
            sender,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn run_loop(thread: BrowserThread, receiver: Receiver<Envelope>) {
        debug!("{} executor started", thread);
        while let Ok(envelope) = receiver.recv() {
            match envelope {
                Envelope::Run(task) => {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!("Task panicked on the {} executor", thread);
                    }
                }
                Envelope::Quit => break,
            }
        }

        // Work queued behind the quit request still runs so pending
        // completions are answered.
        let remaining: Vec<Task> = receiver
            .try_iter()
            .filter_map(|envelope| match envelope {
                Envelope::Run(task) => Some(task),
                Envelope::Quit => None,
            })
            .collect();
        drop(receiver);
        for task in remaining {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("Task panicked while draining the {} executor", thread);
            }
        }
        debug!("{} executor stopped", thread);
    }

    fn stop(&self) {
        let _ = self.sender.send(Envelope::Quit);

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if thread::current().id() == self.thread_id {
                // Stopping from the executor itself: the loop exits after this task.
                return;
            }
            if handle.join().is_err() {
                warn!("{} executor terminated abnormally", self.thread);
            }
        }
    }
}

struct ThreadsInner {
    ui: Executor,
    io: Executor,
    strict_checks: bool,
}

impl ThreadsInner {
    fn executor(&self, thread: BrowserThread) -> &Executor {
        match thread {
            BrowserThread::Ui => &self.ui,
            BrowserThread::Io => &self.io,
        }
    }
}

impl Drop for ThreadsInner {
    fn drop(&mut self) {
        self.ui.stop();
        self.io.stop();
    }
}

/// Handle to the UI and IO executors. Cloning is cheap; the executors stop
/// once the last clone is dropped or [`BrowserThreads::shutdown`] is called.
#[derive(Clone)]
pub struct BrowserThreads {
    inner: Arc<ThreadsInner>,
}

impl BrowserThreads {
    pub fn start() -> Result<Self, ThreadError> {
        Self::with_options(ThreadOptions::default())
    }

    pub fn with_options(options: ThreadOptions) -> Result<Self, ThreadError> {
        let ui = Executor::spawn(BrowserThread::Ui, &options.ui_name)?;
        let io = Executor::spawn(BrowserThread::Io, &options.io_name)?;

        Ok(Self {
            inner: Arc::new(ThreadsInner {
                ui,
                io,
                strict_checks: options.strict_checks,
            }),
        })
    }

    pub fn currently_on(&self, thread: BrowserThread) -> bool {
        thread::current().id() == self.inner.executor(thread).thread_id
    }

    /// Checks that the caller runs on `thread`. Strict mode treats a
    /// mismatch as a fatal bug; otherwise it is only logged.
    pub fn require(&self, thread: BrowserThread) {
        if self.currently_on(thread) {
            return;
        }
        if self.inner.strict_checks {
            panic!("must be called on the {} thread", thread);
        }
        warn!("Expected to be called on the {} thread", thread);
    }

    pub fn post_task<F>(&self, thread: BrowserThread, task: F) -> Result<(), ThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_post(thread, Box::new(task))
            .map_err(|_| ThreadError::Stopped(thread))
    }

    /// Posts `task`, or runs it inline when the executor no longer accepts work.
    pub fn post_or_run(&self, thread: BrowserThread, task: Task) {
        if let Err(task) = self.try_post(thread, task) {
            warn!("{} executor has stopped; running task inline", thread);
            task();
        }
    }

    /// Runs `f` on `thread` and waits for its result. Runs inline when the
    /// caller is already on that thread. A panic inside `f` is resumed on
    /// the caller.
    pub fn run_blocking<F, R>(&self, thread: BrowserThread, f: F) -> Result<R, ThreadError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.currently_on(thread) {
            return Ok(f());
        }

        let (sender, receiver) = crossbeam::channel::bounded(1);
        self.post_task(thread, move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f));
            let _ = sender.send(result);
        })?;

        match receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(ThreadError::Stopped(thread)),
        }
    }

    /// Waits until every task posted to `thread` before this call has run.
    pub fn flush(&self, thread: BrowserThread) -> Result<(), ThreadError> {
        self.run_blocking(thread, || ())
    }

    pub fn shutdown(&self) {
        self.inner.ui.stop();
        self.inner.io.stop();
    }

    fn try_post(&self, thread: BrowserThread, task: Task) -> Result<(), Task> {
        self.inner
            .executor(thread)
            .sender
            .send(Envelope::Run(task))
            .map_err(|err| match err.into_inner() {
                Envelope::Run(task) => task,
                Envelope::Quit => unreachable!("only Run envelopes are posted"),
            })
    }
}

impl fmt::Debug for BrowserThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserThreads")
            .field("ui", &self.inner.ui.thread_id)
            .field("io", &self.inner.io.thread_id)
            .field("strict_checks", &self.inner.strict_checks)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error("Failed to spawn the {0} executor: {1}")]
    Spawn(BrowserThread, String),
    #[error("The {0} executor has stopped")]
    Stopped(BrowserThread),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_currently_on_matches_executor() {
        let threads = BrowserThreads::start().unwrap();
        assert!(!threads.currently_on(BrowserThread::Ui));

        let on_ui = threads
            .run_blocking(BrowserThread::Ui, {
                let threads = threads.clone();
                move || {
                    (
                        threads.currently_on(BrowserThread::Ui),
                        threads.currently_on(BrowserThread::Io),
                    )
                }
            })
            .unwrap();
        assert_eq!(on_ui, (true, false));
        threads.shutdown();
    }

    #[test]
    fn test_tasks_run_in_post_order() {
        let threads = BrowserThreads::start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..16 {
            let log = Arc::clone(&log);
            threads
                .post_task(BrowserThread::Io, move || log.lock().push(i))
                .unwrap();
        }
        threads.flush(BrowserThread::Io).unwrap();

        assert_eq!(*log.lock(), (0..16).collect::<Vec<_>>());
        threads.shutdown();
    }

    #[test]
    fn test_post_after_shutdown_fails() {
        let threads = BrowserThreads::start().unwrap();
        threads.shutdown();

        let result = threads.post_task(BrowserThread::Ui, || {});
        assert!(matches!(result, Err(ThreadError::Stopped(BrowserThread::Ui))));

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        threads.post_or_run(
            BrowserThread::Ui,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_task_keeps_executor_alive() {
        let threads = BrowserThreads::start().unwrap();
        threads
            .post_task(BrowserThread::Io, || panic!("handler bug"))
            .unwrap();

        let value = threads.run_blocking(BrowserThread::Io, || 7).unwrap();
        assert_eq!(value, 7);
        threads.shutdown();
    }

    #[test]
    #[should_panic(expected = "must be called on the IO thread")]
    fn test_require_panics_off_thread_in_strict_mode() {
        let threads = BrowserThreads::start().unwrap();
        threads.require(BrowserThread::Io);
    }
}
