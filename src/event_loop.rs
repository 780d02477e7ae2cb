// EventLoop - named single-consumer threads with FIFO task queues
//
// The interface thread and the application thread are both EventLoops. Any thread
// can post work to them through a cloneable EventLoopHandle; the loop thread runs
// tasks one at a time in the order they were posted.

use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};

type Task = Box<dyn FnOnce() + Send>;

enum Message {
    Task(Task),
    Shutdown,
}

/// A dedicated thread draining a task queue.
///
/// The queue is unbounded, so posting never fails while the loop is running.
/// Every task that [`post`](EventLoopHandle::post) accepted runs, including those
/// that raced with [`shutdown`](Self::shutdown). Once the loop has closed its
/// queue, posting is refused with a warning.
///
/// # Example
/// ```ignore
/// let interface = EventLoop::spawn("interface")?;
/// let handle = interface.handle();
///
/// std::thread::spawn(move || {
///     handle.post(|| tracing::info!("running on the interface thread"));
/// });
///
/// interface.shutdown();
/// ```
pub struct EventLoop {
    handle: EventLoopHandle,
    thread: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Start a loop on a new thread called `name`
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let loop_name = name.to_string();
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                tracing::debug!("Event loop '{}' started", loop_name);

                while let Some(message) = rx.blocking_recv() {
                    match message {
                        Message::Task(task) => task(),
                        Message::Shutdown => {
                            // Refuse new posts, then finish what was already accepted
                            rx.close();
                            let mut drained = 0;
                            while let Ok(message) = rx.try_recv() {
                                if let Message::Task(task) = message {
                                    task();
                                    drained += 1;
                                }
                            }
                            if drained > 0 {
                                tracing::debug!(
                                    "Event loop '{}' ran {} tasks posted during shutdown",
                                    loop_name,
                                    drained
                                );
                            }
                            break;
                        }
                    }
                }

                tracing::debug!("Event loop '{}' terminated", loop_name);
            })?;

        let handle = EventLoopHandle {
            name: Arc::from(name),
            thread_id: thread.thread().id(),
            tx,
        };

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Cloneable handle for posting work from other threads
    pub fn handle(&self) -> EventLoopHandle {
        self.handle.clone()
    }

    /// Run the remaining queued tasks, then stop the thread and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.tx.send(Message::Shutdown);
            if thread.join().is_err() {
                tracing::error!("Event loop '{}' panicked", self.handle.name);
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lightweight handle that can be cloned and passed to other threads
#[derive(Clone)]
pub struct EventLoopHandle {
    name: Arc<str>,
    thread_id: ThreadId,
    tx: mpsc::UnboundedSender<Message>,
}

impl EventLoopHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when called from the loop's own thread
    pub fn is_current_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Queue `task` to run on the loop thread.
    ///
    /// Returns false if the loop has closed its queue; an accepted task always runs.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.tx.send(Message::Task(Box::new(task))) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Event loop '{}' has stopped - dropping task", self.name);
                false
            }
        }
    }

    /// Run `f` on the loop thread and wait for its result.
    ///
    /// Runs inline when already on the loop thread. Returns `None` if the loop
    /// stopped before running `f`. Blocks the caller, so it must not be called from
    /// inside an async task.
    pub fn invoke<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current_thread() {
            return Some(f());
        }

        let (result_tx, result_rx) = oneshot::channel();
        if !self.post(move || {
            let _ = result_tx.send(f());
        }) {
            return None;
        }
        result_rx.blocking_recv().ok()
    }

    /// Wait until every task posted before this call has run
    pub fn flush(&self) -> bool {
        self.invoke(|| ()).is_some()
    }
}

impl std::fmt::Debug for EventLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopHandle")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}
