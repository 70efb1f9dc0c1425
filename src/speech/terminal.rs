//! Terminal speech engines.
//!
//! `LineCapture` treats each line typed on stdin as a final transcript and
//! `ConsoleSpeech` simulates playback time so the turn loop behaves as it
//! would with real audio. Replies themselves are printed by the session sink.

use crate::speech::capture::{CaptureStartError, SpeechCapture};
use crate::speech::output::{SpeechOutput, Utterance, Voice};
use crate::turn::session::SessionEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Map one input line to a session event.
///
/// Lines starting with `:` are commands; anything else is speech, accepted
/// only while capture is running.
pub fn parse_line(line: &str, capturing: bool) -> Option<SessionEvent> {
    let line = line.trim();
    match line {
        "" => None,
        ":start" | ":on" => Some(SessionEvent::Activate),
        ":stop" | ":off" => Some(SessionEvent::Deactivate),
        ":toggle" | ":t" => Some(SessionEvent::Toggle),
        ":quit" | ":q" | ":exit" => Some(SessionEvent::Shutdown),
        text if capturing => Some(SessionEvent::Final(text.to_string())),
        _ => None,
    }
}

/// Capture engine fed by lines of text.
#[derive(Debug, Clone)]
pub struct LineCapture {
    running: Arc<AtomicBool>,
    events: UnboundedSender<SessionEvent>,
}

impl LineCapture {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Forward lines from `reader` until EOF or `:quit`, then request shutdown.
    ///
    /// Stops reading after `:quit` so a pending stdin read never holds up
    /// runtime shutdown.
    pub fn spawn_reader<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "input read failed");
                        break;
                    }
                };
                let capturing = running.load(Ordering::SeqCst);
                match parse_line(&line, capturing) {
                    Some(SessionEvent::Shutdown) => break,
                    Some(event) => {
                        if let SessionEvent::Final(_) = event {
                            // one result per capture, like a recognizer in single-shot mode
                            running.store(false, Ordering::SeqCst);
                        }
                        if events.send(event).is_err() {
                            return;
                        }
                    }
                    None if !line.trim().is_empty() => {
                        debug!("not listening, input ignored");
                    }
                    None => {}
                }
            }
            if events.send(SessionEvent::Shutdown).is_err() {
                trace!("session already stopped");
            }
        })
    }
}

impl SpeechCapture for LineCapture {
    fn start(&mut self) -> Result<(), CaptureStartError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CaptureStartError::AlreadyRunning);
        }
        trace!("line capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst)
            && self.events.send(SessionEvent::CaptureEnded).is_err()
        {
            trace!("session already stopped");
        }
    }

    fn name(&self) -> &'static str {
        "line"
    }
}

const PACE_PER_CHAR: Duration = Duration::from_millis(40);
const MIN_DURATION: Duration = Duration::from_millis(300);
const MAX_DURATION: Duration = Duration::from_secs(6);

/// How long `text` takes to "say" at `pace` per character.
pub fn speech_duration(text: &str, pace: Duration) -> Duration {
    let chars = text.chars().count() as u32;
    pace.saturating_mul(chars).clamp(MIN_DURATION, MAX_DURATION)
}

/// Speech engine that only simulates playback time.
pub struct ConsoleSpeech {
    events: UnboundedSender<SessionEvent>,
    pace: Duration,
    playing: Option<JoinHandle<()>>,
    voices: Vec<Voice>,
}

impl ConsoleSpeech {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            pace: PACE_PER_CHAR,
            playing: None,
            voices: vec![
                Voice::new("Console tiếng Việt", "vi-VN"),
                Voice::new("Console English", "en-US"),
            ],
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }
}

impl SpeechOutput for ConsoleSpeech {
    fn speak(&mut self, utterance: Utterance) {
        self.cancel();

        let id = utterance.id;
        let duration = speech_duration(&utterance.text, self.pace.div_f32(utterance.rate.max(0.1)));
        let events = self.events.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.playing = Some(handle.spawn(async move {
                    if events.send(SessionEvent::SpeechStarted(id)).is_err() {
                        return;
                    }
                    tokio::time::sleep(duration).await;
                    if events.send(SessionEvent::SpeechEnded(id)).is_err() {
                        trace!(utterance = id, "session already stopped");
                    }
                }));
            }
            Err(_) => {
                // No runtime: report the utterance as played instantly.
                for event in [SessionEvent::SpeechStarted(id), SessionEvent::SpeechEnded(id)] {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Cancelled utterances produce no end event.
    fn cancel(&mut self) {
        if let Some(playing) = self.playing.take() {
            playing.abort();
        }
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
