//! Cooperative actor scheduling.
//!
//! Each registered [`Actor`] runs on its own tokio task. The task calls
//! [`Actor::do_work`] in a loop. A run that does no work makes the task
//! sleep, doubling the pause on every consecutive idle run up to a limit;
//! any productive run resets it.
//!
//! An actor that returns an error is stopped and logged. Other actors keep
//! running.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// A unit of cooperative work driven by the scheduler.
pub trait Actor: Send + 'static {
    /// Error that stops the actor.
    type Error: std::fmt::Display + Send;

    /// Performs up to `max_cycles` units of work and returns how many were
    /// done. Must not block.
    ///
    /// # Errors
    /// Returns an error if the actor cannot continue.
    fn do_work(&mut self, max_cycles: u32) -> Result<u32, Self::Error>;
}

#[derive(Debug)]
struct ActorState {
    stop: watch::Sender<bool>,
    work_done: AtomicU64,
    finished: AtomicBool,
    failed: AtomicBool,
}

/// Handle to a registered actor.
#[derive(Debug, Clone)]
pub struct ActorHandle {
    name: Arc<str>,
    state: Arc<ActorState>,
}

impl ActorHandle {
    /// Returns the actor's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the actor to stop after its current run.
    pub fn stop(&self) {
        self.state.stop.send_replace(true);
    }

    /// Returns true once the actor's task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    /// Returns true if the actor stopped because of an error.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.state.failed.load(Ordering::Acquire)
    }

    /// Returns the total work units done so far.
    #[must_use]
    pub fn work_done(&self) -> u64 {
        self.state.work_done.load(Ordering::Relaxed)
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Runs actors on the tokio runtime. Cloning yields another handle to the
/// same scheduler.
#[derive(Clone)]
pub struct ActorScheduler {
    inner: Arc<SchedulerInner>,
}

impl ActorScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                shutdown,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Returns true once [`ActorScheduler::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Returns the number of actor tasks that have not been reaped.
    ///
    /// Tasks of finished actors are reaped on the next `register`.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.tasks().len()
    }

    /// Spawns `actor` on the current tokio runtime.
    ///
    /// # Errors
    /// Returns `ShutDown` if the scheduler has been shut down.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn register<A: Actor>(
        &self,
        name: impl Into<String>,
        actor: A,
    ) -> Result<ActorHandle, SchedulerError> {
        if self.is_shut_down() {
            return Err(SchedulerError::ShutDown);
        }

        let name: Arc<str> = Arc::from(name.into());
        let (stop, stop_rx) = watch::channel(false);
        let handle = ActorHandle {
            name: Arc::clone(&name),
            state: Arc::new(ActorState {
                stop,
                work_done: AtomicU64::new(0),
                finished: AtomicBool::new(false),
                failed: AtomicBool::new(false),
            }),
        };

        let task = tokio::spawn(run_actor(
            name,
            actor,
            self.inner.config,
            self.inner.shutdown.subscribe(),
            stop_rx,
            Arc::clone(&handle.state),
        ));
        let mut tasks = self.tasks();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        drop(tasks);

        debug!(actor = handle.name(), "Registered actor");
        Ok(handle)
    }

    /// Stops every actor and waits for their tasks to exit.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks());
        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Actor task did not exit cleanly");
            }
        }

        info!(actors = count, "Scheduler shut down");
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ActorScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorScheduler")
            .field("config", &self.inner.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

async fn run_actor<A: Actor>(
    name: Arc<str>,
    mut actor: A,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
    mut stop: watch::Receiver<bool>,
    state: Arc<ActorState>,
) {
    let mut backoff = config.idle_backoff_min;

    loop {
        if *shutdown.borrow() || *stop.borrow() {
            break;
        }

        match actor.do_work(config.max_cycles_per_run) {
            Ok(0) => {
                tokio::select! {
                    () = tokio::time::sleep(backoff) => {}
                    result = shutdown.changed() => {
                        if result.is_err() {
                            break;
                        }
                    }
                    result = stop.changed() => {
                        if result.is_err() {
                            break;
                        }
                    }
                }
                backoff = next_backoff(backoff, config.idle_backoff_max);
            }
            Ok(work) => {
                state.work_done.fetch_add(u64::from(work), Ordering::Relaxed);
                backoff = config.idle_backoff_min;
                tokio::task::yield_now().await;
            }
            Err(e) => {
                error!(actor = %name, error = %e, "Actor failed, stopping it");
                state.failed.store(true, Ordering::Release);
                break;
            }
        }
    }

    state.finished.store(true, Ordering::Release);
    debug!(actor = %name, work_done = state.work_done.load(Ordering::Relaxed), "Actor stopped");
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
