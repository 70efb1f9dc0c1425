//! Async driver around [`TurnController`].
//!
//! Engine adapters and the user interface post [`SessionEvent`]s on an
//! unbounded channel. [`VoiceSession::run`] is the single event loop: it
//! feeds events to the controller, runs backend requests in a `JoinSet`,
//! and owns the one pending capture-restart deadline.

use crate::backend::chat::ChatBackend;
use crate::conversation::Message;
use crate::error::{CloneVoiceError, Result};
use crate::speech::capture::CaptureErrorKind;
use crate::speech::output::UtteranceId;
use crate::speech::permission::MicrophonePermission;
use crate::turn::controller::{ReplyTicket, TurnController};
use crate::turn::sink::SessionSink;
use crate::turn::state::Phase;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Everything that can happen to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User pressed the microphone button while inactive.
    Activate,
    Deactivate,
    /// Activate when inactive, deactivate otherwise.
    Toggle,
    /// Stop the event loop.
    Shutdown,
    Interim(String),
    Final(String),
    CaptureEnded,
    CaptureError(CaptureErrorKind),
    SpeechStarted(UtteranceId),
    SpeechEnded(UtteranceId),
}

type ReplyOutcome = (ReplyTicket, Result<String>);

pub struct VoiceSession {
    controller: TurnController,
    backend: Arc<dyn ChatBackend>,
    permission: Arc<dyn MicrophonePermission>,
    sink: Box<dyn SessionSink>,
    replies: JoinSet<ReplyOutcome>,
    /// Ticket carried by each running reply task.
    in_flight: HashMap<Id, ReplyTicket>,
    restart_at: Option<Instant>,
    reported: usize,
    reported_epoch: u64,
    last_phase: Phase,
}

impl VoiceSession {
    pub fn new(
        controller: TurnController,
        backend: Arc<dyn ChatBackend>,
        permission: Arc<dyn MicrophonePermission>,
        sink: Box<dyn SessionSink>,
    ) -> Self {
        let last_phase = controller.phase();
        Self {
            controller,
            backend,
            permission,
            sink,
            replies: JoinSet::new(),
            in_flight: HashMap::new(),
            restart_at: None,
            reported: 0,
            reported_epoch: 0,
            last_phase,
        }
    }

    /// Run until [`SessionEvent::Shutdown`] or until every sender is dropped.
    ///
    /// Returns the conversation as it stood at shutdown.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> Vec<Message> {
        info!(sink = self.sink.name(), backend = self.backend.name(), "voice session loop started");

        loop {
            let restart_at = self.restart_at;
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("event channel closed");
                        break;
                    };
                    if !self.handle(event).await {
                        break;
                    }
                }
                Some(joined) = self.replies.join_next_with_id(), if !self.replies.is_empty() => {
                    self.on_reply(joined);
                }
                _ = sleep_until(restart_at.unwrap_or_else(Instant::now)), if restart_at.is_some() => {
                    self.restart_at = None;
                    let next = self.controller.restart_capture();
                    self.schedule(next);
                }
            }
            self.flush();
        }

        self.controller.deactivate();
        self.replies.abort_all();
        self.in_flight.clear();
        self.flush();
        if let Some(summary) = self.sink.finish() {
            debug!(chars = summary.len(), "sink finished");
        }
        info!(
            messages = self.controller.conversation().len(),
            "voice session loop stopped"
        );
        self.controller.conversation().all().to_vec()
    }

    async fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Activate => self.activate().await,
            SessionEvent::Deactivate => self.deactivate(),
            SessionEvent::Toggle => {
                if self.controller.is_active() {
                    self.deactivate();
                } else {
                    self.activate().await;
                }
            }
            SessionEvent::Shutdown => return false,
            SessionEvent::Interim(text) => {
                self.controller.on_interim(&text);
                if self.controller.phase() == Phase::Listening {
                    self.sink.interim(&text);
                }
            }
            SessionEvent::Final(text) => {
                if let Some(ticket) = self.controller.on_final_transcript(&text) {
                    self.request(ticket);
                }
            }
            SessionEvent::CaptureEnded => {
                let next = self.controller.on_capture_end();
                self.schedule(next);
            }
            SessionEvent::CaptureError(kind) => {
                let next = self.controller.on_capture_error(kind);
                self.schedule(next);
            }
            SessionEvent::SpeechStarted(id) => {
                if self.controller.current_utterance() == Some(id) {
                    self.controller.on_speech_start();
                } else {
                    debug!(utterance = id, "stale speech start ignored");
                }
            }
            SessionEvent::SpeechEnded(id) => {
                if self.controller.current_utterance() == Some(id) {
                    let next = self.controller.on_speech_end();
                    self.schedule(next);
                } else {
                    debug!(utterance = id, "stale speech end ignored");
                }
            }
        }
        true
    }

    async fn activate(&mut self) {
        if let Err(e) = self.controller.activate(self.permission.as_ref()).await {
            self.sink.notice(&e.to_string());
        }
    }

    fn deactivate(&mut self) {
        self.controller.deactivate();
        self.restart_at = None;
    }

    fn request(&mut self, ticket: ReplyTicket) {
        let backend = Arc::clone(&self.backend);
        let task_ticket = ticket.clone();
        let handle = self.replies.spawn(async move {
            let result = backend.reply(&task_ticket.request).await;
            (task_ticket, result)
        });
        self.in_flight.insert(handle.id(), ticket);
    }

    fn on_reply(&mut self, joined: std::result::Result<(Id, ReplyOutcome), JoinError>) {
        match joined {
            Ok((id, (ticket, result))) => {
                self.in_flight.remove(&id);
                self.controller.complete_reply(ticket, result);
            }
            Err(e) => {
                let ticket = self.in_flight.remove(&e.id());
                if e.is_cancelled() {
                    return;
                }
                warn!(error = %e, "reply task failed");
                if let Some(ticket) = ticket {
                    self.controller
                        .complete_reply(ticket, Err(CloneVoiceError::Other(e.to_string())));
                }
            }
        }
    }

    fn schedule(&mut self, delay: Option<Duration>) {
        if let Some(delay) = delay {
            debug!(?delay, "capture restart scheduled");
            self.restart_at = Some(Instant::now() + delay);
        }
    }

    /// Push new messages, phase changes and notices to the sink.
    fn flush(&mut self) {
        if self.controller.epoch() != self.reported_epoch {
            self.reported_epoch = self.controller.epoch();
            self.reported = 0;
        }

        let messages = self.controller.conversation().all();
        let start = self.reported.min(messages.len());
        for message in &messages[start..] {
            if let Err(e) = self.sink.message(message) {
                warn!(sink = self.sink.name(), error = %e, "sink rejected message");
            }
        }
        self.reported = messages.len();

        let phase = self.controller.phase();
        if phase != self.last_phase {
            self.last_phase = phase;
            self.sink.phase(phase);
        }

        for notice in self.controller.take_notices() {
            self.sink.notice(&notice);
        }
    }
}
