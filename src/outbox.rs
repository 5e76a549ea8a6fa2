//! An in-process task queue for post-commit side effects.
//!
//! Once a ledger mutation has committed, its reconciliation and audit work is
//! handed to a background worker and the caller is told "success". The worker
//! never reports failures back; instead it logs them and keeps the failed
//! task as a dead letter so an out-of-band repair job can observe and replay
//! what was lost.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use crate::{
    Error,
    audit::AuditRecorder,
    balance::BalanceReconciler,
    goal_progress::GoalProgressUpdater,
    models::{DatabaseID, NewAuditEntry},
    notifier::{ChangeEvent, ChangeKind, ChangeNotifier, EntityKind},
    stores::{AccountStore, AuditStore, GoalStore},
};

/// A unit of post-commit work.
#[derive(Clone, Debug)]
pub enum Task {
    /// Apply a signed delta to an account's balance.
    AdjustBalance {
        /// The account to adjust.
        account_id: DatabaseID,
        /// The signed amount to add to the balance.
        delta: f64,
    },
    /// Apply a signed delta to a goal's progress.
    AdjustGoalProgress {
        /// The goal to adjust.
        goal_id: DatabaseID,
        /// The signed amount to add to the progress.
        delta: f64,
    },
    /// Append an audit entry.
    RecordAudit(NewAuditEntry),
}

/// A task the worker could not complete, kept for out-of-band repair.
#[derive(Debug)]
pub struct DeadLetter {
    /// The task that failed.
    pub task: Task,
    /// Why it failed.
    pub error: Error,
}

enum Job {
    Run(Task),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background worker processing post-commit side effects.
///
/// Cloning the outbox is cheap; all clones feed the same worker.
#[derive(Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<Job>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl Outbox {
    /// Spawn the worker task and return a handle to it.
    ///
    /// Must be called within a Tokio runtime. The worker runs until every
    /// handle to the outbox has been dropped and the queue has drained.
    pub fn spawn<A, G, D>(
        balance: BalanceReconciler<A>,
        goal_progress: GoalProgressUpdater<G>,
        audit: AuditRecorder<D>,
        notifier: ChangeNotifier,
    ) -> Self
    where
        A: AccountStore + Send + 'static,
        G: GoalStore + Send + 'static,
        D: AuditStore + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dead_letters = Arc::new(Mutex::new(Vec::new()));

        let worker = Worker {
            balance,
            goal_progress,
            audit,
            notifier,
            dead_letters: Arc::clone(&dead_letters),
        };
        tokio::spawn(run_worker(receiver, worker));

        Self {
            sender,
            dead_letters,
        }
    }

    /// Queue `task` for the worker.
    ///
    /// Never blocks and never fails from the caller's point of view; if the
    /// worker is gone the task is logged and dropped.
    pub fn enqueue(&self, task: Task) {
        if let Err(error) = self.sender.send(Job::Run(task)) {
            if let Job::Run(task) = error.0 {
                tracing::error!("outbox worker is gone, dropping task: {task:?}");
            }
        }
    }

    /// Wait until every task queued before this call has been processed.
    pub async fn flush(&self) {
        let (acknowledge, done) = oneshot::channel();

        if self.sender.send(Job::Flush(acknowledge)).is_ok() {
            let _ = done.await;
        }
    }

    /// Take the tasks that failed since the last call, leaving the list
    /// empty.
    ///
    /// This is the observation point for the out-of-band repair job; see
    /// also [replay](crate::replay) for rebuilding aggregates wholesale.
    pub fn take_dead_letters(&self) -> Vec<DeadLetter> {
        let mut dead_letters = self
            .dead_letters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        std::mem::take(&mut *dead_letters)
    }
}

struct Worker<A, G, D> {
    balance: BalanceReconciler<A>,
    goal_progress: GoalProgressUpdater<G>,
    audit: AuditRecorder<D>,
    notifier: ChangeNotifier,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl<A, G, D> Worker<A, G, D>
where
    A: AccountStore,
    G: GoalStore,
    D: AuditStore,
{
    fn run_task(&mut self, task: Task) {
        match task {
            Task::AdjustBalance { account_id, delta } => {
                match self.balance.adjust(account_id, delta) {
                    Ok(balance) => {
                        tracing::debug!(account_id, balance, "reconciled account balance");
                        self.notifier.publish(ChangeEvent::new(
                            EntityKind::Account,
                            account_id,
                            ChangeKind::Updated,
                        ));
                    }
                    Err(error) => {
                        self.dead_letter(Task::AdjustBalance { account_id, delta }, error)
                    }
                }
            }
            Task::AdjustGoalProgress { goal_id, delta } => {
                match self.goal_progress.adjust(goal_id, delta) {
                    Ok(goal) => {
                        tracing::debug!(
                            goal_id,
                            current_amount = goal.current_amount,
                            status = %goal.status,
                            "reconciled goal progress"
                        );
                        self.notifier.publish(ChangeEvent::new(
                            EntityKind::Goal,
                            goal_id,
                            ChangeKind::Updated,
                        ));
                    }
                    Err(error) => {
                        self.dead_letter(Task::AdjustGoalProgress { goal_id, delta }, error)
                    }
                }
            }
            Task::RecordAudit(entry) => {
                if let Err(error) = self.audit.record(entry.clone()) {
                    self.dead_letter(Task::RecordAudit(entry), error);
                }
            }
        }
    }

    fn dead_letter(&self, task: Task, error: Error) {
        tracing::error!("post-commit task failed, keeping for repair: {task:?}: {error}");

        self.dead_letters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(DeadLetter { task, error });
    }
}

async fn run_worker<A, G, D>(mut receiver: mpsc::UnboundedReceiver<Job>, mut worker: Worker<A, G, D>)
where
    A: AccountStore,
    G: GoalStore,
    D: AuditStore,
{
    tracing::debug!("outbox worker started");

    while let Some(job) = receiver.recv().await {
        match job {
            Job::Run(task) => worker.run_task(task),
            Job::Flush(acknowledge) => {
                let _ = acknowledge.send(());
            }
        }
    }

    tracing::debug!("outbox worker shutting down");
}
