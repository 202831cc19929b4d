//! Poller contract and a thread-backed implementation.

use std::thread::{self, JoinHandle};

/// An in-flight asynchronous operation.
///
/// Callers must only call [`Poller::result`] after [`Poller::done`] has
/// returned `true`.
pub trait Poller {
    type Output;
    type Error;

    /// Whether the operation has reached a terminal state.
    fn done(&mut self) -> bool;

    /// Outcome of a finished operation.
    fn result(self) -> Result<Self::Output, Self::Error>;
}

/// Runs a job on a background thread and reports it through [`Poller`].
pub struct ThreadPoller<T, E> {
    handle: JoinHandle<Result<T, E>>,
}

impl<T, E> ThreadPoller<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        Self {
            handle: thread::spawn(job),
        }
    }
}

impl<T, E> Poller for ThreadPoller<T, E> {
    type Output = T;
    type Error = E;

    fn done(&mut self) -> bool {
        self.handle.is_finished()
    }

    fn result(self) -> Result<T, E> {
        match self.handle.join() {
            Ok(outcome) => outcome,
            // A panicking job panics the waiter, same as a direct call would.
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}
