/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{
    THREAD_FAILED, THREAD_INVALID, THREAD_NOMEMORY, THREAD_NOMORE, THREAD_NONE,
};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Thread library errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ThreadError {
    #[error("Invalid thread identifier or argument")]
    #[diagnostic(
        code(thread::invalid),
        help("The thread may have exited, may be running, or may not be runnable right now.")
    )]
    Invalid,

    #[error("No other thread is ready to run")]
    #[diagnostic(
        code(thread::no_candidate),
        help("Every other thread is blocked or gone. Wake a waiter or create a thread first.")
    )]
    NoCandidate,

    #[error("Thread table is full")]
    #[diagnostic(
        code(thread::no_more),
        help("Join or exit finished threads, or raise max_threads in SchedulerConfig.")
    )]
    NoMore,

    #[error("Thread stack allocation failed")]
    #[diagnostic(
        code(thread::no_memory),
        help("System may be low on memory. Consider a smaller stack_size.")
    )]
    NoMemory,

    #[error("Thread library is not initialized on this OS thread")]
    #[diagnostic(
        code(thread::uninitialized),
        help("Call uthreads::init() on this OS thread before using the scheduler.")
    )]
    Uninitialized,

    #[error("Thread library is already initialized on this OS thread")]
    #[diagnostic(
        code(thread::already_initialized),
        help("Call uthreads::shutdown() before initializing again.")
    )]
    AlreadyInitialized,

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(thread::configuration),
        help("Check SchedulerConfig values and UTHREAD_* environment variables.")
    )]
    Configuration(String),

    #[error("Operation failed: {0}")]
    #[diagnostic(code(thread::failed), help("View logs for details."))]
    Failed(String),
}

impl ThreadError {
    /// Raw status code for collaborators that speak integers
    pub fn code(&self) -> i32 {
        match self {
            ThreadError::Invalid | ThreadError::Configuration(_) => THREAD_INVALID,
            ThreadError::NoCandidate => THREAD_NONE,
            ThreadError::NoMore => THREAD_NOMORE,
            ThreadError::NoMemory => THREAD_NOMEMORY,
            ThreadError::Uninitialized
            | ThreadError::AlreadyInitialized
            | ThreadError::Failed(_) => THREAD_FAILED,
        }
    }
}

impl From<nix::Error> for ThreadError {
    fn from(err: nix::Error) -> Self {
        ThreadError::Failed(err.to_string())
    }
}

/// Result type for thread operations
pub type ThreadResult<T> = Result<T, ThreadError>;

/// Report an unrecoverable invariant violation and abort the process
///
/// Unwinding is not an option here: the scheduler state is corrupt and the
/// current stack may not even belong to a live thread.
#[cold]
pub(crate) fn fatal(message: &str) -> ! {
    log::error!("fatal scheduler invariant violated: {}", message);
    std::process::abort()
}
