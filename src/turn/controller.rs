//! Drives the listen → send → speak → listen cycle.
//!
//! The controller owns the speech engines and the conversation. Every
//! callback is fed through [`transition`] and the resulting effects are
//! executed here. Work that needs time (restart delays, backend calls) is
//! handed back to the caller as a return value, so the controller itself
//! never blocks and can be unit-tested without a runtime.

use crate::backend::chat::{ChatBackend, ChatRequest};
use crate::config::Config;
use crate::conversation::{ConversationStore, Message, Transcript};
use crate::error::{CloneVoiceError, Result};
use crate::speech::capture::{CaptureErrorKind, CaptureStartError, SpeechCapture};
use crate::speech::output::{SpeechOutput, Utterance, UtteranceId};
use crate::speech::permission::MicrophonePermission;
use crate::turn::state::{Effect, Phase, RestartCause, TurnEvent, TurnState, transition};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Settings the controller needs from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub locale: String,
    pub greeting: String,
    pub apology: String,
    pub not_understood: String,
    pub speech_settle: Duration,
    pub capture_restart: Duration,
    pub history_len: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            locale: config.voice.locale.clone(),
            greeting: config.voice.greeting.clone(),
            apology: config.session.apology.clone(),
            not_understood: config.session.not_understood.clone(),
            speech_settle: config.session.speech_settle(),
            capture_restart: config.session.capture_restart(),
            history_len: config.session.persona_history,
        }
    }
}

/// A backend request the caller must make for the current turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyTicket {
    /// Activation the turn belongs to.
    pub epoch: u64,
    pub turn: u64,
    pub request: ChatRequest,
}

/// Follow-up work produced by an event.
#[derive(Debug, Clone, PartialEq)]
enum Directive {
    RestartAfter(Duration),
    FetchReply(ReplyTicket),
}

pub struct TurnController {
    config: ControllerConfig,
    state: TurnState,
    capture: Box<dyn SpeechCapture>,
    output: Box<dyn SpeechOutput>,
    store: ConversationStore,
    transcript: Transcript,
    epoch: u64,
    turns: u64,
    next_utterance: UtteranceId,
    current_utterance: Option<UtteranceId>,
    notices: Vec<String>,
}

impl TurnController {
    pub fn new(
        config: ControllerConfig,
        capture: Box<dyn SpeechCapture>,
        output: Box<dyn SpeechOutput>,
    ) -> Self {
        Self {
            config,
            state: TurnState::default(),
            capture,
            output,
            store: ConversationStore::new(),
            transcript: Transcript::default(),
            epoch: 0,
            turns: 0,
            next_utterance: 1,
            current_utterance: None,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_active(&self) -> bool {
        self.state.phase.is_active()
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.store
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Incremented on every successful activation.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Utterance currently being spoken, if any.
    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.current_utterance
    }

    /// User-visible notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Start a session: ask for the microphone, greet the user.
    ///
    /// Does nothing if the session is already active.
    pub async fn activate(&mut self, permission: &dyn MicrophonePermission) -> Result<()> {
        if self.is_active() {
            debug!("activate ignored, session already active");
            return Ok(());
        }

        if let Err(e) = permission.request().await {
            warn!(error = %e, "microphone permission refused");
            return Err(match e {
                CloneVoiceError::PermissionDenied { .. } => e,
                other => CloneVoiceError::PermissionDenied {
                    message: other.to_string(),
                },
            });
        }

        self.epoch += 1;
        info!(epoch = self.epoch, "voice session activated");
        self.dispatch(TurnEvent::Activate);
        Ok(())
    }

    /// Stop capture and speech and return to `Inactive`. Idempotent.
    ///
    /// An outstanding backend request is not cancelled; its reply is still
    /// recorded by [`TurnController::complete_reply`] but not spoken.
    pub fn deactivate(&mut self) {
        if self.is_active() {
            info!(epoch = self.epoch, "voice session deactivated");
        }
        self.dispatch(TurnEvent::Deactivate);
        self.transcript = Transcript::default();
    }

    pub fn on_interim(&mut self, text: &str) {
        if self.state.phase == Phase::Listening {
            self.transcript = Transcript::interim(text);
        }
    }

    /// Promote a final transcript to a user message.
    ///
    /// Returns the backend request to make, or `None` when the transcript
    /// is blank or the session is not listening.
    pub fn on_final_transcript(&mut self, text: &str) -> Option<ReplyTicket> {
        if self.state.phase == Phase::Listening {
            self.transcript = Transcript::final_result(text);
        }
        let ticket = self
            .dispatch(TurnEvent::FinalTranscript(text.to_string()))
            .into_iter()
            .find_map(|d| match d {
                Directive::FetchReply(ticket) => Some(ticket),
                Directive::RestartAfter(_) => None,
            });
        if ticket.is_some() {
            self.transcript = Transcript::default();
        } else {
            debug!(phase = self.state.phase.as_str(), "final transcript ignored");
        }
        ticket
    }

    /// Apply the backend outcome for `ticket`.
    ///
    /// Always appends exactly one assistant message for the current
    /// activation: the reply, or a canned text when the reply is empty or
    /// the backend failed.
    pub fn complete_reply(&mut self, ticket: ReplyTicket, result: Result<String>) {
        if ticket.epoch != self.epoch {
            debug!(
                turn = ticket.turn,
                epoch = ticket.epoch,
                "discarding reply from a previous session"
            );
            return;
        }
        let text = self.reply_text(result);
        self.dispatch(TurnEvent::Reply(text));
    }

    /// Run one full turn against `backend`, awaiting the reply inline.
    ///
    /// Returns `false` when the transcript was ignored.
    pub async fn respond(&mut self, text: &str, backend: &dyn ChatBackend) -> bool {
        let Some(ticket) = self.on_final_transcript(text) else {
            return false;
        };
        let result = backend.reply(&ticket.request).await;
        self.complete_reply(ticket, result);
        true
    }

    pub fn on_speech_start(&mut self) {
        self.dispatch(TurnEvent::SpeechStarted);
    }

    /// The current utterance finished. Returns the delay after which
    /// [`TurnController::restart_capture`] must be called.
    pub fn on_speech_end(&mut self) -> Option<Duration> {
        self.current_utterance = None;
        restart_delay(self.dispatch(TurnEvent::SpeechEnded))
    }

    /// The capture engine stopped. Returns the restart delay when the
    /// session still wants to listen.
    pub fn on_capture_end(&mut self) -> Option<Duration> {
        restart_delay(self.dispatch(TurnEvent::CaptureEnded))
    }

    pub fn on_capture_error(&mut self, kind: CaptureErrorKind) -> Option<Duration> {
        if kind.is_fatal() {
            warn!(code = kind.code(), "speech capture failed");
        } else {
            debug!(code = kind.code(), "transient capture error");
        }
        restart_delay(self.dispatch(TurnEvent::CaptureFailed(kind)))
    }

    /// Fire a scheduled restart. Starts capture at most once.
    pub fn restart_capture(&mut self) -> Option<Duration> {
        restart_delay(self.dispatch(TurnEvent::RestartDue))
    }

    fn reply_text(&self, result: Result<String>) -> String {
        match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(CloneVoiceError::EmptyReply) => self.config.not_understood.clone(),
            Err(e) if e.is_backend() => {
                warn!(error = %e, "backend unavailable, using apology");
                self.config.apology.clone()
            }
            Err(e) => {
                error!(error = %e, "reply failed, using apology");
                self.config.apology.clone()
            }
        }
    }

    fn dispatch(&mut self, event: TurnEvent) -> Vec<Directive> {
        let (next, effects) = transition(self.state, &event);
        if next.phase != self.state.phase {
            debug!(
                from = self.state.phase.as_str(),
                to = next.phase.as_str(),
                "phase changed"
            );
        }
        self.state = next;

        let mut directives = Vec::new();
        for effect in effects {
            directives.extend(self.execute(effect));
        }
        directives
    }

    fn execute(&mut self, effect: Effect) -> Vec<Directive> {
        match effect {
            Effect::ResetConversation => {
                self.store.clear();
                self.transcript = Transcript::default();
            }
            Effect::Greet => {
                let greeting = self.config.greeting.clone();
                self.store.append(Message::assistant(greeting.clone()));
                self.speak(&greeting);
            }
            Effect::StartCapture => return self.start_capture(),
            Effect::StopCapture => self.capture.stop(),
            Effect::CancelSpeech => {
                self.output.cancel();
                self.current_utterance = None;
            }
            Effect::AppendUser(text) => self.store.append(Message::user(text)),
            Effect::RequestReply(text) => {
                self.turns += 1;
                let all = self.store.all();
                let prior = &all[..all.len().saturating_sub(1)];
                let start = prior.len().saturating_sub(self.config.history_len);
                let ticket = ReplyTicket {
                    epoch: self.epoch,
                    turn: self.turns,
                    request: ChatRequest {
                        message: text,
                        history: prior[start..].to_vec(),
                    },
                };
                debug!(turn = ticket.turn, "requesting reply");
                return vec![Directive::FetchReply(ticket)];
            }
            Effect::AppendAssistant(text) => self.store.append(Message::assistant(text)),
            Effect::Speak(text) => self.speak(&text),
            Effect::ScheduleRestart(cause) => {
                let delay = match cause {
                    RestartCause::AfterSpeech => self.config.speech_settle,
                    RestartCause::AfterCaptureEnd => self.config.capture_restart,
                };
                return vec![Directive::RestartAfter(delay)];
            }
            Effect::Notify(kind) => {
                let notice = kind
                    .user_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Speech capture failed: {}", kind));
                self.notices.push(notice);
            }
        }
        Vec::new()
    }

    fn start_capture(&mut self) -> Vec<Directive> {
        match self.capture.start() {
            Ok(()) => {
                debug!(engine = self.capture.name(), "capture started");
                Vec::new()
            }
            Err(CaptureStartError::AlreadyRunning) => {
                debug!(engine = self.capture.name(), "capture already running");
                Vec::new()
            }
            Err(CaptureStartError::Engine(kind)) => {
                self.state.capturing = false;
                if kind.is_fatal() {
                    self.dispatch(TurnEvent::CaptureFailed(kind))
                } else {
                    warn!(code = kind.code(), "capture failed to start, retrying");
                    self.dispatch(TurnEvent::CaptureEnded)
                }
            }
        }
    }

    fn speak(&mut self, text: &str) {
        if self.current_utterance.take().is_some() {
            self.output.cancel();
        }
        let id = self.next_utterance;
        self.next_utterance += 1;
        let utterance = Utterance::prepare(id, text, &self.config.locale, &self.output.voices());
        debug!(
            utterance = id,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()),
            "speaking"
        );
        self.current_utterance = Some(id);
        self.output.speak(utterance);
    }
}

fn restart_delay(directives: Vec<Directive>) -> Option<Duration> {
    directives.into_iter().find_map(|d| match d {
        Directive::RestartAfter(delay) => Some(delay),
        Directive::FetchReply(_) => None,
    })
}
