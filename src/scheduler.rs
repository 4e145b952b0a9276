//! Repeating background tasks bound to an owner key.
//!
//! Every periodic activity (game sync, queue polling) registers here under a
//! key such as `game:42` or `queue:blitz`. Tearing down an owner cancels every
//! task bound to its key; dropping the last scheduler handle cancels all.

use actix_rt::task::JoinHandle;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// Returned by a task after each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Stop,
}

#[derive(Default)]
struct Tasks {
    by_key: RefCell<HashMap<String, Vec<JoinHandle<()>>>>,
}

impl Drop for Tasks {
    fn drop(&mut self) {
        for handle in self.by_key.get_mut().values().flatten() {
            handle.abort();
        }
    }
}

/// Single-threaded scheduler on the current actix runtime. Cheap to clone.
#[derive(Clone, Default)]
pub struct Scheduler {
    tasks: Rc<Tasks>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `period` (first run one period from now) until it
    /// returns `TaskControl::Stop` or the key is cancelled. Runs of one task
    /// never overlap: the next period starts when the previous run ends.
    pub fn register<F, Fut>(&self, key: impl Into<String>, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = TaskControl> + 'static,
    {
        let key = key.into();
        debug!("Registering task {} every {:?}", key, period);
        let task_key = key.clone();
        let handle = actix_rt::spawn(async move {
            loop {
                actix_rt::time::sleep(period).await;
                if task().await == TaskControl::Stop {
                    debug!("Task {} stopped itself", task_key);
                    break;
                }
            }
        });

        let mut by_key = self.tasks.by_key.borrow_mut();
        let handles = by_key.entry(key).or_default();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Cancel every task bound to `key`. Returns how many were still running.
    pub fn cancel(&self, key: &str) -> usize {
        let handles = self.tasks.by_key.borrow_mut().remove(key).unwrap_or_default();
        let mut cancelled = 0;
        for handle in handles {
            if !handle.is_finished() {
                cancelled += 1;
            }
            handle.abort();
        }
        if cancelled > 0 {
            debug!("Cancelled {} task(s) for {}", cancelled, key);
        }
        cancelled
    }

    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.tasks.by_key.borrow().keys().cloned().collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.tasks
            .by_key
            .borrow()
            .get(key)
            .map_or(false, |handles| handles.iter().any(|handle| !handle.is_finished()))
    }
}
