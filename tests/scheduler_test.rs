/*!
 * Scheduler Tests
 * Create, yield, exit, kill and lifecycle behavior of the thread scheduler
 */

mod common;

use common::{drain, join_all, small_config, Session};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use uthreads::{
    SchedulerConfig, Target, ThreadError, ThreadState, Tid, THREAD_ANY, THREAD_INVALID,
    THREAD_SELF,
};

fn recorder() -> Rc<RefCell<Vec<Tid>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn test_calls_before_init_are_uninitialized() {
    assert_eq!(uthreads::yield_now(), Err(ThreadError::Uninitialized));
    assert_eq!(uthreads::create(|| {}), Err(ThreadError::Uninitialized));
    assert_eq!(uthreads::kill(1), Err(ThreadError::Uninitialized));
    assert_eq!(uthreads::shutdown(), Err(ThreadError::Uninitialized));
    assert!(uthreads::stats().is_err());
}

#[test]
fn test_init_twice_is_already_initialized() {
    let _session = Session::start();
    assert_eq!(uthreads::init(), Err(ThreadError::AlreadyInitialized));
    assert_eq!(uthreads::current_id(), 0);
}

#[test]
fn test_init_rejects_invalid_config() {
    let config = SchedulerConfig {
        stack_size: 1024,
        ..small_config()
    };
    assert!(matches!(
        uthreads::init_with(config),
        Err(ThreadError::Configuration(_))
    ));
    assert_eq!(uthreads::yield_now(), Err(ThreadError::Uninitialized));
}

#[test]
fn test_reinit_after_shutdown() {
    uthreads::init_with(small_config()).unwrap();
    uthreads::shutdown().unwrap();
    let _session = Session::start();
    assert_eq!(uthreads::current_id(), 0);
}

#[test]
fn test_yield_self_is_noop() {
    let _session = Session::start();
    let tid = uthreads::create(|| {}).unwrap();

    assert_eq!(uthreads::yield_to(Target::Current), Ok(0));
    assert_eq!(uthreads::yield_to(Target::Id(0)), Ok(0));
    assert_eq!(uthreads::state_of(tid).unwrap(), Some(ThreadState::Ready));
    assert_eq!(uthreads::state_of(0).unwrap(), Some(ThreadState::Running));
    drain();
}

#[test]
fn test_yield_any_without_candidates() {
    let _session = Session::start();
    assert_eq!(uthreads::yield_now(), Err(ThreadError::NoCandidate));
    assert_eq!(uthreads::current_id(), 0);
}

#[test]
fn test_create_runs_only_after_yield() {
    let _session = Session::start();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let tid = uthreads::create(move || flag.set(true)).unwrap();

    assert_eq!(tid, 1);
    assert!(!ran.get());
    assert_eq!(uthreads::yield_now(), Ok(tid));
    assert!(ran.get());
    assert_eq!(uthreads::state_of(tid).unwrap(), None);
}

#[test]
fn test_round_robin_order() {
    let _session = Session::start();
    let log = recorder();

    for _ in 0..3 {
        let log = log.clone();
        uthreads::create(move || {
            for _ in 0..3 {
                log.borrow_mut().push(uthreads::current_id());
                uthreads::yield_now().unwrap();
            }
        })
        .unwrap();
    }
    drain();

    assert_eq!(*log.borrow(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_yield_to_specific_thread() {
    let _session = Session::start();
    let log = recorder();

    let tids: Vec<Tid> = (0..3)
        .map(|_| {
            let log = log.clone();
            uthreads::create(move || log.borrow_mut().push(uthreads::current_id())).unwrap()
        })
        .collect();

    let last = tids[2];
    assert_eq!(uthreads::yield_to(last.into()), Ok(3));
    assert_eq!(*log.borrow(), vec![3, 1, 2]);
}

#[test]
fn test_yield_to_invalid_targets() {
    let _session = Session::start();
    uthreads::create(|| {}).unwrap();

    assert_eq!(uthreads::yield_to(Target::Id(5)), Err(ThreadError::Invalid));
    assert_eq!(uthreads::yield_to(Target::Id(63)), Err(ThreadError::Invalid));
    assert_eq!(uthreads::yield_to(Target::Id(5000)), Err(ThreadError::Invalid));
    assert_eq!(Target::from_raw(THREAD_INVALID), Err(ThreadError::Invalid));
    assert_eq!(Target::from_raw(THREAD_ANY), Ok(Target::Any));
    assert_eq!(Target::from_raw(THREAD_SELF), Ok(Target::Current));
    assert_eq!(uthreads::state_of(0).unwrap(), Some(ThreadState::Running));
    drain();
}

#[test]
fn test_yield_to_blocked_thread() {
    let _session = Session::start();
    let park = Rc::new(uthreads::WaitQueue::new());

    let queue = park.clone();
    let sleeper = uthreads::create(move || {
        uthreads::sleep(&queue).unwrap();
    })
    .unwrap();
    uthreads::yield_now().unwrap();
    assert_eq!(uthreads::state_of(sleeper).unwrap(), Some(ThreadState::Wait));

    // Nothing is ready at all
    assert_eq!(
        uthreads::yield_to(Target::Id(sleeper)),
        Err(ThreadError::NoCandidate)
    );

    // Something else is ready, but not the sleeper
    let other = uthreads::create(|| {}).unwrap();
    assert_eq!(
        uthreads::yield_to(Target::Id(sleeper)),
        Err(ThreadError::Invalid)
    );
    assert_eq!(uthreads::state_of(other).unwrap(), Some(ThreadState::Ready));

    assert_eq!(uthreads::wakeup(&park, true), Ok(1));
    drain();
    assert_eq!(uthreads::state_of(sleeper).unwrap(), None);
}

#[test]
fn test_exactly_one_running() {
    let _session = Session::start();
    let observations = Rc::new(RefCell::new(Vec::new()));

    for _ in 0..4 {
        let observations = observations.clone();
        uthreads::create(move || {
            for _ in 0..2 {
                let threads = uthreads::threads().unwrap();
                let running: Vec<Tid> = threads
                    .iter()
                    .filter(|t| t.state == ThreadState::Running)
                    .map(|t| t.id)
                    .collect();
                observations
                    .borrow_mut()
                    .push((uthreads::current_id(), running));
                uthreads::yield_now().unwrap();
            }
        })
        .unwrap();
    }
    drain();

    let observations = observations.borrow();
    assert_eq!(observations.len(), 8);
    for (me, running) in observations.iter() {
        assert_eq!(running, &vec![*me]);
    }
}

#[test]
fn test_ids_reused_after_exit() {
    let _session = Session::start();
    let first = uthreads::create(|| {}).unwrap();
    let second = uthreads::create(|| {}).unwrap();
    assert_eq!((first, second), (1, 2));

    drain();
    assert_eq!(uthreads::state_of(first).unwrap(), None);
    assert_eq!(uthreads::create(|| {}).unwrap(), 1);
    assert_eq!(uthreads::create(|| {}).unwrap(), 2);
    drain();
}

#[test]
fn test_full_table_is_no_more() {
    let _session = Session::with(SchedulerConfig {
        max_threads: 4,
        ..small_config()
    });
    let dropped = Rc::new(Cell::new(0));

    for expected in 1..4 {
        assert_eq!(uthreads::create(|| {}), Ok(expected));
    }
    struct Witness(Rc<Cell<u32>>);
    impl Drop for Witness {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }
    let witness = Witness(dropped.clone());
    assert_eq!(
        uthreads::create(move || drop(witness)),
        Err(ThreadError::NoMore)
    );
    // The rejected closure was dropped, not leaked
    assert_eq!(dropped.get(), 1);
    drain();
    assert_eq!(uthreads::create(|| {}), Ok(1));
    drain();
}

#[test]
fn test_kill_ready_thread_never_runs() {
    let _session = Session::start();
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    let tid = uthreads::create(move || flag.set(true)).unwrap();

    assert_eq!(uthreads::kill(tid), Ok(tid));
    assert_eq!(uthreads::state_of(tid).unwrap(), Some(ThreadState::Killed));
    drain();

    assert!(!ran.get());
    assert_eq!(uthreads::state_of(tid).unwrap(), None);
    let stats = uthreads::stats().unwrap();
    assert_eq!(stats.killed, 1);
    assert_eq!(stats.exited, 1);
}

#[test]
fn test_kill_invalid_targets() {
    let _session = Session::start();
    let tid = uthreads::create(|| {}).unwrap();

    // Running thread
    assert_eq!(uthreads::kill(0), Err(ThreadError::Invalid));
    // Never created
    assert_eq!(uthreads::kill(9), Err(ThreadError::Invalid));
    // Out of range
    assert_eq!(uthreads::kill(10_000), Err(ThreadError::Invalid));
    // Already killed
    assert_eq!(uthreads::kill(tid), Ok(tid));
    assert_eq!(uthreads::kill(tid), Err(ThreadError::Invalid));
    drain();
    // Exited and released
    assert_eq!(uthreads::kill(tid), Err(ThreadError::Invalid));
}

#[test]
fn test_thread_kills_sibling() {
    let _session = Session::start();
    let log = recorder();

    let victim_log = log.clone();
    let victim = uthreads::create(move || victim_log.borrow_mut().push(99)).unwrap();
    let killer_log = log.clone();
    let killer = uthreads::create(move || {
        killer_log.borrow_mut().push(uthreads::kill(victim).unwrap());
    })
    .unwrap();

    assert_eq!(uthreads::yield_to(killer.into()), Ok(killer));
    drain();
    assert_eq!(*log.borrow(), vec![victim]);
}

#[test]
fn test_explicit_exit_skips_rest_of_closure() {
    let _session = Session::start();
    let log = recorder();

    let inner = log.clone();
    let tid = uthreads::create(move || {
        inner.borrow_mut().push(1);
        uthreads::exit();
    })
    .unwrap();
    drain();

    assert_eq!(*log.borrow(), vec![1]);
    assert_eq!(uthreads::state_of(tid).unwrap(), None);
}

#[test]
fn test_panicking_thread_is_contained() {
    let _session = Session::start();
    let after = Rc::new(Cell::new(false));

    uthreads::create(|| panic!("boom")).unwrap();
    let flag = after.clone();
    uthreads::create(move || flag.set(true)).unwrap();
    drain();

    assert!(after.get());
    assert_eq!(uthreads::stats().unwrap().panicked, 1);
}

#[test]
fn test_stats_track_lifecycle() {
    let _session = Session::start();
    for _ in 0..3 {
        uthreads::create(|| {
            uthreads::yield_now().ok();
        })
        .unwrap();
    }
    let before = uthreads::stats().unwrap();
    assert_eq!(before.live_threads, 4);
    assert_eq!(before.ready_threads, 3);
    assert_eq!(before.created, 3);

    drain();
    // A voluntary yield reclaims whatever is still queued for reclaim
    uthreads::create(|| {}).unwrap();
    uthreads::yield_now().unwrap();

    let after = uthreads::stats().unwrap();
    assert_eq!(after.created, 4);
    assert_eq!(after.exited, 4);
    assert_eq!(after.live_threads, 1);
    assert_eq!(after.reclaimed + after.pending_reclaim as u64, 4);
    assert!(after.context_switches >= 8);
    assert_eq!(after.preemptions, 0);
    assert_eq!(after.preemption_interval_us, None);
}

#[test]
fn test_thread_info_snapshot() {
    let _session = Session::start();
    let tid = uthreads::create(|| {}).unwrap();

    let threads = uthreads::threads().unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].id, 0);
    assert_eq!(threads[0].stack_size, 0);
    assert_eq!(threads[1].id, tid);
    assert_eq!(threads[1].state, ThreadState::Ready);
    assert_eq!(threads[1].stack_size, small_config().stack_size);
    drain();
}

#[test]
fn test_shutdown_only_from_thread_zero() {
    let _session = Session::start();
    let outcome = Rc::new(RefCell::new(None));

    let slot = outcome.clone();
    uthreads::create(move || *slot.borrow_mut() = Some(uthreads::shutdown())).unwrap();
    drain();

    assert_eq!(*outcome.borrow(), Some(Err(ThreadError::Invalid)));
}

#[test]
fn test_shutdown_drops_unstarted_closures() {
    let token = Rc::new(());
    uthreads::init_with(small_config()).unwrap();

    let held = token.clone();
    uthreads::create(move || drop(held)).unwrap();
    assert_eq!(Rc::strong_count(&token), 2);

    uthreads::shutdown().unwrap();
    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn test_join_all_helper_handles_finished_threads() {
    let _session = Session::start();
    let tids: Vec<Tid> = (0..3).map(|_| uthreads::create(|| {}).unwrap()).collect();
    join_all(&tids);
    for tid in tids {
        assert_eq!(uthreads::state_of(tid).unwrap(), None);
    }
}
