//! The queue engine: one tokio task owning every task record.
//!
//! All mutation happens here. Handles talk to it over a command channel,
//! finished native invocations report back over an outcome channel, and
//! native completion events arrive on their own channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::native::{DownloadEvent, DownloadRequest, DownloadState, NativeDownloader};
use super::policy::{Confirmation, QueuePolicy};
use super::task::{NativeHandle, Task, TaskEvent, TaskId, TaskStatus};
use crate::error::Result;

pub(crate) enum Command {
    Enqueue(Task),
    Snapshot(oneshot::Sender<Vec<Task>>),
    Get(TaskId, oneshot::Sender<Option<Task>>),
    Clear(TaskId, oneshot::Sender<bool>),
    ClearFailed(oneshot::Sender<usize>),
    WaitIdle(oneshot::Sender<()>),
    Shutdown,
}

/// Result of one native invocation.
struct Outcome {
    id: TaskId,
    result: Result<NativeHandle>,
}

pub(crate) struct Engine<D> {
    native: Arc<D>,
    policy: QueuePolicy,
    tasks: Vec<Task>,
    /// Held from dispatch until the post-settle delay elapsed.
    processing: bool,
    /// Task currently `Downloading`.
    in_flight: Option<TaskId>,
    /// End of the post-settle delay.
    resume_at: Option<Instant>,
    /// Retryable task to put back to `Pending` when the delay ends.
    requeue: Option<TaskId>,
    /// Completion events that beat the native call's own return.
    early_events: HashMap<NativeHandle, DownloadEvent>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    stopping: bool,
}

impl<D: NativeDownloader + 'static> Engine<D> {
    pub(crate) async fn run(
        native: Arc<D>,
        policy: QueuePolicy,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedReceiver<DownloadEvent>,
    ) {
        let (engine, outcomes) = Engine::new(native, policy);
        engine.drive(commands, events, outcomes).await;
    }

    fn new(native: Arc<D>, policy: QueuePolicy) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let engine = Engine {
            native,
            policy,
            tasks: Vec::new(),
            processing: false,
            in_flight: None,
            resume_at: None,
            requeue: None,
            early_events: HashMap::new(),
            idle_waiters: Vec::new(),
            outcome_tx,
            stopping: false,
        };
        (engine, outcomes)
    }

    async fn drive(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<DownloadEvent>,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) {
        let period = self.policy.watchdog_period.max(Duration::from_millis(1));
        let mut watchdog = time::interval_at(Instant::now() + period, period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;
        let mut events_open = true;

        tracing::debug!(policy = ?self.policy, "queue engine started");
        loop {
            let resume_at = self.resume_at;
            tokio::select! {
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        commands_open = false;
                        self.stopping = true;
                    }
                },
                Some(outcome) = outcomes.recv() => self.handle_outcome(outcome),
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event),
                    None => events_open = false,
                },
                _ = time::sleep_until(resume_at.unwrap_or_else(Instant::now)), if resume_at.is_some() => {
                    self.resume_at = None;
                    self.end_cooldown();
                }
                _ = watchdog.tick() => self.watchdog(),
            }
            if self.stopping && self.in_flight.is_none() {
                break;
            }
        }
        tracing::debug!(remaining = self.tasks.len(), "queue engine stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Enqueue(task) => {
                tracing::info!(task_id = %task.id, filename = %task.filename, "task queued");
                self.tasks.push(task);
                self.kick();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.tasks.clone());
            }
            Command::Get(id, reply) => {
                let _ = reply.send(self.tasks.iter().find(|t| t.id == id).cloned());
            }
            Command::Clear(id, reply) => {
                let pos = self
                    .tasks
                    .iter()
                    .position(|t| t.id == id && t.status == TaskStatus::FailedPermanent);
                if let Some(pos) = pos {
                    self.tasks.remove(pos);
                }
                let _ = reply.send(pos.is_some());
            }
            Command::ClearFailed(reply) => {
                let before = self.tasks.len();
                self.tasks.retain(|t| t.status != TaskStatus::FailedPermanent);
                let _ = reply.send(before - self.tasks.len());
            }
            Command::WaitIdle(reply) => {
                if self.is_idle() {
                    let _ = reply.send(());
                } else {
                    self.idle_waiters.push(reply);
                }
            }
            Command::Shutdown => {
                tracing::info!("queue shutdown requested");
                self.stopping = true;
            }
        }
    }

    fn is_idle(&self) -> bool {
        !self.processing
            && !self.tasks.iter().any(|t| {
                matches!(
                    t.status,
                    TaskStatus::Pending | TaskStatus::Downloading | TaskStatus::FailedRetryable
                )
            })
    }

    fn notify_idle(&mut self) {
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn index_of(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    /// Worker pass: dispatches the first pending task unless one is in progress.
    fn kick(&mut self) {
        if self.processing || self.stopping {
            return;
        }
        let Some(idx) = self.tasks.iter().position(|t| t.status == TaskStatus::Pending) else {
            self.notify_idle();
            return;
        };

        self.processing = true;
        let task = &mut self.tasks[idx];
        task.apply(TaskEvent::Dispatched, self.policy.max_retries);
        tracing::info!(
            task_id = %task.id,
            status = %task.status,
            retry_count = task.retry_count,
            "download started"
        );
        self.in_flight = Some(task.id.clone());

        let id = task.id.clone();
        let request = DownloadRequest::new(task.url.clone(), task.filename.clone());
        let native = Arc::clone(&self.native);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = native.download(request).await;
            let _ = outcome_tx.send(Outcome { id, result });
        });
    }

    fn handle_outcome(&mut self, outcome: Outcome) {
        let Some(idx) = self.index_of(&outcome.id) else {
            tracing::debug!(task_id = %outcome.id, "outcome for unknown task ignored");
            return;
        };
        match outcome.result {
            Ok(handle) => {
                self.tasks[idx].apply(TaskEvent::Started(handle), self.policy.max_retries);
                let early = self.early_events.remove(&handle);
                match self.policy.confirmation {
                    Confirmation::OnStart => self.succeed(idx),
                    Confirmation::OnEvent => {
                        if let Some(event) = early {
                            self.handle_event(event);
                        }
                    }
                }
            }
            Err(e) => self.fail(idx, e.to_string()),
        }
    }

    fn handle_event(&mut self, event: DownloadEvent) {
        let idx = self.tasks.iter().position(|t| {
            t.status == TaskStatus::Downloading && t.native_handle == Some(event.handle)
        });
        let Some(idx) = idx else {
            let awaiting_handle = self
                .in_flight
                .as_ref()
                .and_then(|id| self.tasks.iter().find(|t| &t.id == id))
                .is_some_and(|t| t.native_handle.is_none());
            if awaiting_handle && self.policy.confirmation == Confirmation::OnEvent {
                self.early_events.insert(event.handle, event);
            } else {
                tracing::debug!(handle = event.handle, "event for unknown download ignored");
            }
            return;
        };
        if self.policy.confirmation != Confirmation::OnEvent {
            return;
        }
        match event.state {
            DownloadState::Complete => self.succeed(idx),
            DownloadState::Interrupted => {
                let reason = event.error.unwrap_or_else(|| "download interrupted".to_string());
                self.fail(idx, reason);
            }
        }
    }

    fn succeed(&mut self, idx: usize) {
        let mut task = self.tasks.remove(idx);
        task.apply(TaskEvent::Completed, self.policy.max_retries);
        tracing::info!(
            task_id = %task.id,
            status = %task.status,
            retry_count = task.retry_count,
            "download completed"
        );
        self.settle(self.policy.delay_after(task.retry_count, false));
    }

    fn fail(&mut self, idx: usize, reason: String) {
        let max_retries = self.policy.max_retries;
        let task = &mut self.tasks[idx];
        task.apply(TaskEvent::Failed(reason.clone()), max_retries);
        let retried = task.status == TaskStatus::FailedRetryable;
        let delay = self.policy.delay_after(task.retry_count, retried);
        if retried {
            tracing::warn!(
                task_id = %task.id,
                retry_count = task.retry_count,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "download failed, will retry"
            );
            self.requeue = Some(task.id.clone());
        } else {
            tracing::warn!(
                task_id = %task.id,
                status = %task.status,
                retry_count = task.retry_count,
                error = %reason,
                "download failed permanently"
            );
        }
        self.settle(delay);
    }

    fn settle(&mut self, delay: Duration) {
        self.in_flight = None;
        self.early_events.clear();
        self.resume_at = Some(Instant::now() + delay);
    }

    fn end_cooldown(&mut self) {
        if let Some(id) = self.requeue.take() {
            if let Some(idx) = self.index_of(&id) {
                self.tasks[idx].apply(TaskEvent::Requeued, self.policy.max_retries);
            }
        }
        self.processing = false;
        self.kick();
    }

    fn watchdog(&mut self) {
        if self.processing {
            return;
        }
        if self.tasks.iter().any(|t| t.status == TaskStatus::Pending) {
            tracing::debug!("watchdog re-triggering stalled queue");
            self.kick();
        }
    }
}
