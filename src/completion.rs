//! Single-assignment completion primitive.
//!
//! Every asynchronous operation in this crate resolves exactly one of a
//! success value or a failure. The [`Completer`]/[`Completion`] pair makes
//! that contract explicit: the completer side is consumed by
//! [`Completer::complete`] or [`Completer::fail`], so resolving twice is a
//! compile error rather than a runtime fault, and the completion side
//! offers two observation modes over one state machine:
//!
//! - **await**: [`Completion`] implements `Future<Output = Result<T>>`;
//! - **continuation**: [`Completion::on_done`] registers callbacks fired
//!   exactly once, immediately if the result is already in.
//!
//! [`Completion::spawn`] bridges any `async` operation into this shape
//! without introducing a second code path for the operation itself.
//!
//! # Examples
//!
//! ```no_run
//! use settee::completion::Completion;
//!
//! # async fn demo() {
//! let completion = Completion::spawn(async { Ok::<_, settee::CouchError>(42) });
//! completion.on_done(
//!     |value| println!("got {value}"),
//!     |err| eprintln!("failed: {err}"),
//! );
//! # }
//! ```

use crate::error::{CouchError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

type Callback<T> = Box<dyn FnOnce(Result<T>) + Send>;

/// Internal state machine: pending → ready (awaited later) or
/// pending → finished (callback dispatched / value taken). Terminal
/// states never transition back.
enum State<T> {
    Pending {
        waker: Option<Waker>,
        callback: Option<Callback<T>>,
    },
    Ready(Result<T>),
    Finished,
}

struct Inner<T> {
    state: Mutex<State<T>>,
}

/// Producer half of a completion. Consumed on resolution.
pub struct Completer<T> {
    inner: Arc<Inner<T>>,
}

/// Consumer half of a completion.
///
/// Await it, or hand it a continuation with [`Completion::on_done`].
pub struct Completion<T> {
    inner: Arc<Inner<T>>,
}

/// Create a connected completer/completion pair.
pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State::Pending {
            waker: None,
            callback: None,
        }),
    });
    (
        Completer {
            inner: inner.clone(),
        },
        Completion { inner },
    )
}

impl<T> Completer<T> {
    /// Resolve the completion with a success value.
    pub fn complete(self, value: T) {
        self.resolve(Ok(value));
    }

    /// Resolve the completion with a failure.
    pub fn fail(self, error: CouchError) {
        self.resolve(Err(error));
    }

    fn resolve(self, result: Result<T>) {
        let pending = {
            let mut state = self.inner.state.lock().expect("completion lock poisoned");
            match std::mem::replace(&mut *state, State::Finished) {
                State::Pending { waker, callback } => {
                    if callback.is_none() {
                        *state = State::Ready(result);
                        return waker.into_iter().for_each(Waker::wake);
                    }
                    Some((callback, result))
                }
                // Unreachable: the completer is consumed on resolution.
                _ => None,
            }
        };
        if let Some((Some(callback), result)) = pending {
            callback(result);
        }
    }
}

impl<T> Completion<T> {
    /// Register continuations fired exactly once with the result.
    ///
    /// If the completion is already resolved, the matching callback fires
    /// immediately on the calling task; otherwise it fires on whichever
    /// task resolves the completer. Registration consumes the completion,
    /// so a second registration is impossible.
    pub fn on_done<S, F>(self, on_value: S, on_error: F)
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(CouchError) + Send + 'static,
        T: Send + 'static,
    {
        let callback: Callback<T> = Box::new(move |result| match result {
            Ok(value) => on_value(value),
            Err(err) => on_error(err),
        });
        let immediate = {
            let mut state = self.inner.state.lock().expect("completion lock poisoned");
            match std::mem::replace(&mut *state, State::Finished) {
                State::Ready(result) => Some(result),
                State::Pending { waker, .. } => {
                    *state = State::Pending {
                        waker,
                        callback: Some(callback),
                    };
                    return;
                }
                State::Finished => return,
            }
        };
        if let Some(result) = immediate {
            callback(result);
        }
    }

    /// Spawn a future on the current tokio runtime and observe it through
    /// a completion.
    ///
    /// This is the continuation-style facade over the crate's `async fn`
    /// operations: the operation itself has exactly one code path.
    pub fn spawn<Fut>(future: Fut) -> Completion<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (completer, completion) = completion();
        tokio::spawn(async move {
            match future.await {
                Ok(value) => completer.complete(value),
                Err(err) => completer.fail(err),
            }
        });
        completion
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock().expect("completion lock poisoned");
        match std::mem::replace(&mut *state, State::Finished) {
            State::Ready(result) => Poll::Ready(result),
            State::Pending { callback, .. } => {
                *state = State::Pending {
                    waker: Some(cx.waker().clone()),
                    callback,
                };
                Poll::Pending
            }
            State::Finished => Poll::Pending,
        }
    }
}
