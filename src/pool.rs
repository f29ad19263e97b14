//! The worker pool and its quiescence detector.
//!
//! Termination is a single `(queue, sleeping_workers, shutting_down)` triple
//! guarded by one mutex and one condition variable: the last worker to find
//! the queue empty with everyone else asleep is the one that flips
//! `shutting_down` and wakes the rest.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::counters::Counters;
use crate::queue::Discipline;
use crate::task::DirectoryTask;
use crate::walker::{Walker, WalkerEnv};

struct State {
    queue: Box<dyn Discipline>,
    sleeping: usize,
    shutting_down: bool,
}

/// Owns the shared queue and coordinates `worker_count` threads pulling
/// from it until the forest is drained.
pub struct WorkerPool {
    state: Mutex<State>,
    condvar: Condvar,
    worker_count: usize,
}

impl WorkerPool {
    #[must_use]
    pub fn new(discipline: Box<dyn Discipline>, worker_count: usize) -> Self {
        Self {
            state: Mutex::new(State {
                queue: discipline,
                sleeping: 0,
                shutting_down: false,
            }),
            condvar: Condvar::new(),
            worker_count: worker_count.max(1),
        }
    }

    /// Seeds the queue with a starting directory before any worker runs.
    pub fn seed(&self, task: DirectoryTask, counters: &Counters) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.queue.push(task, counters);
    }

    /// Pushes a task discovered mid-walk and wakes one sleeping worker.
    fn push(&self, task: DirectoryTask, counters: &Counters) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.queue.push(task, counters);
        self.condvar.notify_one();
    }

    /// Runs `worker_count` threads to completion. Blocks until the forest
    /// is fully drained.
    pub fn run(self: &Arc<Self>, env: Arc<WalkerEnv>) {
        if self.worker_count == 1 {
            // Single worker: run inline on this thread, no thread spawn or
            // synchronisation overhead needed.
            self.worker_loop(&env);
            return;
        }

        thread::scope(|scope| {
            for _ in 0..self.worker_count {
                let pool = Arc::clone(self);
                let env = Arc::clone(&env);
                scope.spawn(move || pool.worker_loop(&env));
            }
        });
    }

    fn worker_loop(&self, env: &WalkerEnv) {
        let walker = Walker::new(env, self);
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if let Some(task) = state.queue.pop() {
                drop(state);
                walker.walk(task);
                state = self.state.lock().unwrap_or_else(|p| p.into_inner());
                continue;
            }

            if state.shutting_down {
                return;
            }

            state.sleeping += 1;
            if state.sleeping == self.worker_count && state.queue.len() == 0 {
                // Quiescence: queue empty, everyone else asleep. We are the
                // last one standing — nothing can produce new work.
                state.shutting_down = true;
                self.condvar.notify_all();
                return;
            }

            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(|p| p.into_inner());
            state.sleeping -= 1;
        }
    }
}

/// The handle a [`Walker`](crate::walker::Walker) uses to hand a discovered
/// subdirectory back to the pool instead of recursing inline.
pub trait Enqueue {
    fn enqueue(&self, task: DirectoryTask, counters: &Counters);
}

impl Enqueue for WorkerPool {
    fn enqueue(&self, task: DirectoryTask, counters: &Counters) {
        self.push(task, counters);
    }
}
