/*!
 * Shared test helpers
 */

#![allow(dead_code)]

use uthreads::{SchedulerConfig, ThreadError, Tid};

/// Scheduler initialized for the duration of one test
///
/// Shuts down on drop, so a failed assertion on thread 0 still releases
/// the scheduler of the test's OS thread.
pub struct Session;

impl Session {
    pub fn start() -> Self {
        Self::with(small_config())
    }

    pub fn with(config: SchedulerConfig) -> Self {
        uthreads::init_with(config).expect("scheduler init");
        Session
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = uthreads::shutdown();
    }
}

/// Small table so tests stay cheap
pub fn small_config() -> SchedulerConfig {
    SchedulerConfig {
        max_threads: 64,
        stack_size: 256 * 1024,
        preemption: None,
    }
}

/// Yield until nothing else is ready
pub fn drain() {
    while uthreads::yield_now().is_ok() {}
}

/// Join each thread, treating an already released id as finished
pub fn join_all(tids: &[Tid]) {
    for &tid in tids {
        match uthreads::join(tid) {
            Ok(joined) => assert_eq!(joined, tid),
            Err(ThreadError::Invalid) => {
                assert_eq!(uthreads::state_of(tid).unwrap(), None, "thread {} still live", tid)
            }
            Err(err) => panic!("join({}) failed: {}", tid, err),
        }
    }
}
