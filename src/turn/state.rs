//! Turn-taking state machine.
//!
//! `transition` is a pure function from the current [`TurnState`] and one
//! [`TurnEvent`] to the next state plus the [`Effect`]s the controller must
//! carry out. Guards that used to be scattered boolean checks live here.

use crate::speech::capture::CaptureErrorKind;

/// What the session is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// The user has not started a session (or stopped it).
    #[default]
    Inactive,
    /// Waiting for the user to speak. Capture is running or about to restart.
    Listening,
    /// A transcript was sent to the backend; waiting for the reply.
    Processing,
    /// Synthesized speech is playing.
    Speaking,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Inactive => "inactive",
            Phase::Listening => "listening",
            Phase::Processing => "processing",
            Phase::Speaking => "speaking",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Inactive)
    }
}

/// Full machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnState {
    pub phase: Phase,
    /// Whether the capture engine is believed to be running.
    pub capturing: bool,
    /// Whether a capture restart has been scheduled and not yet fired.
    pub restart_pending: bool,
}

impl TurnState {
    /// Capture is actually running.
    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Listening && self.capturing
    }

    pub fn is_speaking(&self) -> bool {
        self.phase == Phase::Speaking
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Microphone permission was granted and the user started a session.
    Activate,
    Deactivate,
    FinalTranscript(String),
    /// The reply for the outstanding turn is ready (already mapped to text).
    Reply(String),
    SpeechStarted,
    SpeechEnded,
    CaptureEnded,
    CaptureFailed(CaptureErrorKind),
    /// A scheduled restart is due.
    RestartDue,
}

/// Why a restart was scheduled; selects the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCause {
    /// Our own speech just finished; let the room go quiet first.
    AfterSpeech,
    /// The engine stopped on its own (silence timeout).
    AfterCaptureEnd,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a fresh conversation.
    ResetConversation,
    /// Append and speak the configured greeting.
    Greet,
    StartCapture,
    StopCapture,
    CancelSpeech,
    AppendUser(String),
    /// Send the transcript to the backend.
    RequestReply(String),
    AppendAssistant(String),
    Speak(String),
    ScheduleRestart(RestartCause),
    /// Show a fatal error to the user.
    Notify(CaptureErrorKind),
}

/// Compute the next state and effects.
pub fn transition(state: TurnState, event: &TurnEvent) -> (TurnState, Vec<Effect>) {
    let mut next = state;
    let mut effects = Vec::new();

    match event {
        TurnEvent::Activate => {
            if state.phase.is_active() {
                return (state, effects);
            }
            next = TurnState {
                phase: Phase::Speaking,
                capturing: false,
                restart_pending: false,
            };
            effects.push(Effect::ResetConversation);
            effects.push(Effect::Greet);
        }

        TurnEvent::Deactivate => {
            if !state.phase.is_active() {
                return (state, effects);
            }
            if state.capturing {
                effects.push(Effect::StopCapture);
            }
            effects.push(Effect::CancelSpeech);
            next = TurnState::default();
        }

        TurnEvent::FinalTranscript(text) => {
            if text.trim().is_empty() || state.phase != Phase::Listening {
                return (state, effects);
            }
            if state.capturing {
                effects.push(Effect::StopCapture);
            }
            effects.push(Effect::AppendUser(text.clone()));
            effects.push(Effect::RequestReply(text.clone()));
            next = TurnState {
                phase: Phase::Processing,
                capturing: false,
                restart_pending: false,
            };
        }

        TurnEvent::Reply(text) => match state.phase {
            Phase::Processing => {
                effects.push(Effect::AppendAssistant(text.clone()));
                effects.push(Effect::Speak(text.clone()));
                next.phase = Phase::Speaking;
            }
            // Deactivated while the request was in flight: keep the record,
            // stay silent.
            Phase::Inactive => {
                effects.push(Effect::AppendAssistant(text.clone()));
            }
            Phase::Listening | Phase::Speaking => {}
        },

        TurnEvent::SpeechStarted => {
            if state.phase == Phase::Listening {
                // Never hear ourselves.
                if state.capturing {
                    effects.push(Effect::StopCapture);
                }
                next = TurnState {
                    phase: Phase::Speaking,
                    capturing: false,
                    restart_pending: false,
                };
            }
        }

        TurnEvent::SpeechEnded => {
            if state.phase == Phase::Speaking {
                next.phase = Phase::Listening;
                if !state.restart_pending {
                    next.restart_pending = true;
                    effects.push(Effect::ScheduleRestart(RestartCause::AfterSpeech));
                }
            }
        }

        TurnEvent::CaptureEnded => {
            next.capturing = false;
            if state.phase == Phase::Listening && !state.restart_pending {
                next.restart_pending = true;
                effects.push(Effect::ScheduleRestart(RestartCause::AfterCaptureEnd));
            }
        }

        TurnEvent::CaptureFailed(kind) => {
            if kind.is_fatal() {
                if state.phase.is_active() {
                    if state.capturing {
                        effects.push(Effect::StopCapture);
                    }
                    effects.push(Effect::CancelSpeech);
                    effects.push(Effect::Notify(kind.clone()));
                    next = TurnState::default();
                }
            } else if *kind == CaptureErrorKind::NoSpeech && state.phase == Phase::Listening {
                // The engine is done with this capture even if it has not
                // reported its end yet.
                if state.capturing {
                    effects.push(Effect::StopCapture);
                }
                next.capturing = false;
                if !state.restart_pending {
                    next.restart_pending = true;
                    effects.push(Effect::ScheduleRestart(RestartCause::AfterCaptureEnd));
                }
            }
        }

        TurnEvent::RestartDue => {
            if !state.restart_pending {
                return (state, effects);
            }
            next.restart_pending = false;
            if state.phase == Phase::Listening && !state.capturing {
                next.capturing = true;
                effects.push(Effect::StartCapture);
            }
        }
    }

    (next, effects)
}
