use std::collections::HashMap;
use std::mem;
use std::time::Duration;

use ideaflow_actor::{Actor, Message};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::builder::SessionBuilder;
use super::{Activity, SessionSnapshot, SessionStage};
use crate::conversation::{ChatTurn, SessionMetadata, Transcript};
use crate::error::{CompletionFailure, HandoffError};
use crate::handoff::HandoffRecord;
use crate::model_client::ModelClient;
use crate::prompts::APOLOGY;
use crate::reveal::{RevealSchedule, run_ticker};

pub struct SessionState {
    model_client: ModelClient,
    persona: String,
    reveal_interval: Duration,
    snapshot: watch::Sender<SessionSnapshot>,
    has_established_persona: bool,
    pending_request: Option<u64>,
    reveal: Option<ActiveReveal>,
    running_tasks: HashMap<u64, JoinHandle<()>>,
    next_task_id: u64,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

struct ActiveReveal {
    schedule: RevealSchedule,
    ticker_task: u64,
}

impl SessionState {
    pub fn from_builder(
        builder: SessionBuilder,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let (snapshot, snapshot_rx) =
            watch::channel(SessionSnapshot::default());
        let state = Self {
            model_client: builder.model_client,
            persona: builder.persona,
            reveal_interval: builder.reveal_interval,
            snapshot,
            has_established_persona: false,
            pending_request: None,
            reveal: None,
            running_tasks: HashMap::new(),
            next_task_id: 0,
            on_idle: builder.on_idle,
        };
        (state, snapshot_rx)
    }

    #[inline]
    fn stage(&self) -> SessionStage {
        self.snapshot.borrow().stage
    }

    #[inline]
    fn activity(&self) -> Activity {
        self.snapshot.borrow().activity
    }

    fn begin(&mut self) {
        if self.stage() != SessionStage::NotStarted {
            debug!("session has already begun");
            return;
        }
        self.snapshot
            .send_modify(|s| s.stage = SessionStage::AwaitingFirstTurn);
    }

    fn start(&mut self, metadata: SessionMetadata, handle: &Actor<Self>) {
        if !matches!(
            self.stage(),
            SessionStage::NotStarted | SessionStage::AwaitingFirstTurn
        ) {
            debug!("session has already started");
            return;
        }
        if !metadata.is_complete() {
            debug!("ignoring start with a blank app name or idea");
            return;
        }

        info!("starting a session for {:?}", metadata.app_name());
        let opening = ChatTurn::user(metadata.opening_message());
        self.snapshot.send_modify(|s| {
            s.stage = SessionStage::InConversation;
            s.metadata = Some(metadata);
            s.transcript.push(opening);
        });
        self.request_completion(handle);
    }

    fn send_message(&mut self, text: String, handle: &Actor<Self>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.stage() != SessionStage::InConversation {
            debug!("session is not in conversation, ignoring the message");
            return;
        }
        if self.activity() != Activity::Idle {
            // Only one reply at a time. The message is dropped rather
            // than queued.
            debug!("session is busy, ignoring the message");
            return;
        }

        let turn = ChatTurn::user(text);
        self.snapshot.send_modify(|s| s.transcript.push(turn));
        self.request_completion(handle);
    }

    fn request_completion(&mut self, handle: &Actor<Self>) {
        let instruction =
            (!self.has_established_persona).then_some(self.persona.as_str());
        self.has_established_persona = true;

        let fut = self
            .model_client
            .complete(&self.snapshot.borrow().transcript, instruction);
        self.snapshot
            .send_modify(|s| s.activity = Activity::AwaitingCompletion);

        let handle_clone = handle.clone();
        let task_id = self.spawn_task(
            |task_id| async move {
                let result = fut.await;
                handle_clone
                    .send(CompletionFinished { task_id, result })
                    .ok();
            },
            handle,
        );
        self.pending_request = Some(task_id);
    }

    fn finish_completion(
        &mut self,
        task_id: u64,
        result: Result<String, CompletionFailure>,
        handle: &Actor<Self>,
    ) {
        if self.stage() == SessionStage::Ended {
            debug!("discarding a reply that arrived after the session ended");
            return;
        }
        if self.pending_request != Some(task_id) {
            debug!("discarding a stale reply");
            return;
        }
        self.pending_request = None;

        match result {
            Ok(text) => self.start_reveal(&text, handle),
            Err(err) => {
                warn!("completion failed: {err}");
                self.snapshot.send_modify(|s| {
                    s.transcript.push(ChatTurn::assistant(APOLOGY));
                    s.activity = Activity::Idle;
                });
                self.notify_idle();
            }
        }
    }

    fn start_reveal(&mut self, text: &str, handle: &Actor<Self>) {
        let mut schedule = RevealSchedule::new(text);
        let finished = if self.reveal_interval.is_zero() {
            self.snapshot.send_modify(|s| {
                schedule.flush(&mut s.transcript);
            });
            true
        } else {
            let mut finished = false;
            self.snapshot.send_modify(|s| {
                finished = schedule.apply(&mut s.transcript, 0);
                s.activity = Activity::Revealing;
            });
            finished
        };
        if finished {
            self.finish_reveal();
            return;
        }

        let interval = self.reveal_interval;
        let handle_clone = handle.clone();
        let ticker_task = self.spawn_task(
            |task_id| async move {
                run_ticker(interval, || {
                    handle_clone.send(RevealTick(task_id)).is_ok()
                })
                .await;
            },
            handle,
        );
        self.reveal = Some(ActiveReveal {
            schedule,
            ticker_task,
        });
    }

    fn reveal_tick(&mut self, task_id: u64) {
        let Some(reveal) = &mut self.reveal else {
            return;
        };
        if reveal.ticker_task != task_id {
            return;
        }

        let mut finished = false;
        self.snapshot.send_modify(|s| {
            finished = reveal.schedule.apply(&mut s.transcript, 1);
        });
        if finished {
            self.cancel_reveal();
            self.finish_reveal();
        }
    }

    fn finish_reveal(&mut self) {
        self.snapshot.send_modify(|s| s.activity = Activity::Idle);
        self.notify_idle();
    }

    /// Stops the ticker of the current reveal, if any, and returns its
    /// schedule.
    fn cancel_reveal(&mut self) -> Option<RevealSchedule> {
        let reveal = self.reveal.take()?;
        if let Some(task) = self.running_tasks.remove(&reveal.ticker_task) {
            task.abort();
        }
        Some(reveal.schedule)
    }

    pub fn end_brainstorm(&mut self) -> Result<HandoffRecord, HandoffError> {
        if self.stage() == SessionStage::Ended {
            return Err(HandoffError::AlreadyEnded);
        }
        let metadata = match &self.snapshot.borrow().metadata {
            Some(metadata) if metadata.is_complete() => metadata.clone(),
            _ => return Err(HandoffError::IncompleteMetadata),
        };

        let schedule = self.cancel_reveal();
        // The request keeps running; its reply is dropped on arrival.
        self.pending_request = None;

        let mut transcript = Transcript::default();
        self.snapshot.send_modify(|s| {
            if let Some(mut schedule) = schedule {
                schedule.flush(&mut s.transcript);
            }
            transcript = mem::take(&mut s.transcript);
            s.stage = SessionStage::Ended;
            s.activity = Activity::Idle;
        });

        info!("brainstorm ended with {} turns", transcript.len());
        Ok(HandoffRecord::new(transcript, metadata))
    }

    #[inline]
    fn notify_idle(&self) {
        if let Some(on_idle) = &self.on_idle {
            on_idle();
        }
    }

    fn spawn_task<F, Fut>(&mut self, f: F, handle: &Actor<Self>) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = handle.clone();
        let fut = f(task_id);
        let task = tokio::spawn(async move {
            fut.await;
            handle.send(TaskEnded(task_id)).ok();
        });
        self.running_tasks.insert(task_id, task);
        task_id
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        for (_, task) in self.running_tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Debug)]
pub struct Begin;

impl Message<SessionState> for Begin {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.begin();
    }
}

#[derive(Debug)]
pub struct Start(pub SessionMetadata);

impl Message<SessionState> for Start {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.start(self.0, handle);
    }
}

#[derive(Debug)]
pub struct SendMessage(pub String);

impl Message<SessionState> for SendMessage {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.send_message(self.0, handle);
    }
}

#[derive(Debug)]
struct CompletionFinished {
    task_id: u64,
    result: Result<String, CompletionFailure>,
}

impl Message<SessionState> for CompletionFinished {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.finish_completion(self.task_id, self.result, handle);
    }
}

#[derive(Debug)]
struct RevealTick(u64);

impl Message<SessionState> for RevealTick {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.reveal_tick(self.0);
    }
}

#[derive(Debug)]
struct TaskEnded(u64);

impl Message<SessionState> for TaskEnded {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        // Aborted tasks were removed already.
        state.running_tasks.remove(&self.0);
    }
}
