/*!
 * uthreads demo
 *
 * Runs a bounded producer/consumer pipeline on user-level threads:
 * - Producers and consumers share a ring buffer guarded by a Lock
 * - Two condition variables signal "not full" and "not empty"
 * - A straggler thread is killed before it ever runs
 *
 * Configuration comes from UTHREAD_* environment variables; set
 * UTHREAD_PREEMPT_US to interleave the threads with timer preemption.
 * Final scheduler statistics are printed to stdout as JSON.
 */

use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::rc::Rc;
use tracing::{info, warn};
use uthreads::{monitoring, Condvar, Lock, SchedulerConfig, ThreadError, Tid};

const PRODUCERS: u32 = 3;
const CONSUMERS: u32 = 2;
const ITEMS_PER_PRODUCER: u32 = 50;
const CAPACITY: usize = 4;

struct Pipeline {
    lock: Lock,
    not_full: Condvar,
    not_empty: Condvar,
    buffer: RefCell<VecDeque<u32>>,
    producers_left: RefCell<u32>,
    consumed: RefCell<Vec<u32>>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            lock: Lock::new(),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            buffer: RefCell::new(VecDeque::with_capacity(CAPACITY)),
            producers_left: RefCell::new(PRODUCERS),
            // Sized up front so consumers never allocate while preemptible
            consumed: RefCell::new(Vec::with_capacity((PRODUCERS * ITEMS_PER_PRODUCER) as usize)),
        }
    }

    fn produce(&self, producer: u32) -> uthreads::ThreadResult<()> {
        for n in 0..ITEMS_PER_PRODUCER {
            let guard = self.lock.lock()?;
            while self.buffer.borrow().len() == CAPACITY {
                self.not_full.wait(guard.lock())?;
            }
            self.buffer.borrow_mut().push_back(producer * 1000 + n);
            self.not_empty.signal(guard.lock())?;
            drop(guard);
            uthreads::yield_now().ok();
        }

        let _guard = self.lock.lock()?;
        *self.producers_left.borrow_mut() -= 1;
        self.not_empty.broadcast(&self.lock)?;
        Ok(())
    }

    fn consume(&self) -> uthreads::ThreadResult<usize> {
        let mut taken = 0;
        loop {
            let guard = self.lock.lock()?;
            loop {
                if let Some(item) = self.buffer.borrow_mut().pop_front() {
                    self.consumed.borrow_mut().push(item);
                    taken += 1;
                    break;
                }
                if *self.producers_left.borrow() == 0 {
                    return Ok(taken);
                }
                self.not_empty.wait(guard.lock())?;
            }
            self.not_full.signal(guard.lock())?;
            drop(guard);
            uthreads::yield_now().ok();
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    monitoring::init_tracing();

    let config = SchedulerConfig::from_env()?;
    info!(
        max_threads = config.max_threads,
        stack_size = config.stack_size,
        preemption = ?config.preemption,
        "Starting uthreads demo"
    );
    uthreads::init_with(config)?;

    let pipeline = Rc::new(Pipeline::new());
    let mut workers: Vec<Tid> = Vec::new();

    for producer in 0..PRODUCERS {
        let pipeline = pipeline.clone();
        workers.push(uthreads::create(move || {
            if let Err(err) = pipeline.produce(producer) {
                uthreads::without_preemption(|| warn!(producer, error = %err, "Producer failed"));
            }
        })?);
    }
    for consumer in 0..CONSUMERS {
        let pipeline = pipeline.clone();
        workers.push(uthreads::create(move || {
            let outcome = pipeline.consume();
            uthreads::without_preemption(|| match outcome {
                Ok(taken) => info!(consumer, taken, "Consumer finished"),
                Err(err) => warn!(consumer, error = %err, "Consumer failed"),
            });
        })?);
    }

    let straggler = uthreads::create(|| unreachable!("killed before it was scheduled"))?;
    uthreads::kill(straggler)?;
    info!(tid = straggler, "Straggler killed");

    for tid in workers {
        match uthreads::join(tid) {
            // Already finished and released
            Ok(_) | Err(ThreadError::Invalid) => {}
            Err(err) => return Err(err.into()),
        }
    }

    let consumed = pipeline.consumed.borrow().len();
    info!(
        consumed,
        expected = (PRODUCERS * ITEMS_PER_PRODUCER) as usize,
        "Pipeline drained"
    );

    let stats = uthreads::stats()?;
    monitoring::report_stats(&stats);
    uthreads::uprintln!("{}", serde_json::to_string_pretty(&stats)?);
    uthreads::shutdown()?;
    Ok(())
}
