//! Behavioural properties of the turn loop, exercised through the public API
//! with in-memory engines and a scripted backend.

use clonevoice::backend::MockBackend;
use clonevoice::conversation::Role;
use clonevoice::defaults;
use clonevoice::speech::CaptureErrorKind;
use clonevoice::speech::mock::{MockCapture, MockOutput, MockPermission};
use clonevoice::turn::{
    ControllerConfig, NullSink, ReplyTicket, SessionEvent, TurnController, VoiceSession,
};
use clonevoice::Phase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Rig {
    controller: TurnController,
    capture: MockCapture,
    output: MockOutput,
}

fn rig() -> Rig {
    let capture = MockCapture::new();
    let output = MockOutput::new();
    let controller = TurnController::new(
        ControllerConfig::default(),
        Box::new(capture.clone()),
        Box::new(output.clone()),
    );
    Rig {
        controller,
        capture,
        output,
    }
}

/// Activate, let the greeting play out and the capture restart.
async fn listening_rig() -> Rig {
    let mut rig = rig();
    rig.controller
        .activate(&MockPermission::granted())
        .await
        .unwrap();
    rig.controller.on_speech_start();
    rig.output.finish_current();
    rig.controller.on_speech_end();
    rig.controller.restart_capture();
    assert!(rig.capture.is_running());
    rig
}

fn contents(rig: &Rig) -> Vec<String> {
    rig.controller
        .conversation()
        .all()
        .iter()
        .map(|m| m.content().to_string())
        .collect()
}

fn assert_never_listening_while_speaking(rig: &Rig, step: usize) {
    let state = rig.controller.state();
    assert!(
        !(state.is_listening() && state.is_speaking()),
        "state listening and speaking at step {step}: {state:?}"
    );
    assert!(
        !(rig.capture.is_running() && rig.output.is_speaking()),
        "engines capturing and speaking at step {step}: {state:?}"
    );
}

#[tokio::test]
async fn never_listening_and_speaking_at_once() {
    for seed in [0x9E37_79B9_7F4A_7C15_u64, 42, 7_777, 123_456_789] {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rig = rig();
        let mut pending: Option<ReplyTicket> = None;

        for step in 0..400 {
            match rng.random_range(0..10) {
                0 => {
                    rig.controller
                        .activate(&MockPermission::granted())
                        .await
                        .unwrap();
                }
                1 => rig.controller.deactivate(),
                2 => {
                    if rig.output.is_speaking() {
                        rig.controller.on_speech_start();
                    }
                }
                3 => {
                    if rig.output.finish_current().is_some() {
                        rig.controller.on_speech_end();
                    }
                }
                4 | 5 => {
                    rig.controller.restart_capture();
                }
                6 => {
                    if rig.capture.is_running() {
                        rig.capture.end_by_engine();
                        rig.controller.on_capture_end();
                    }
                }
                7 => {
                    if let Some(ticket) = rig.controller.on_final_transcript("Xin chào") {
                        pending = Some(ticket);
                    }
                }
                8 => {
                    if let Some(ticket) = pending.take() {
                        rig.controller
                            .complete_reply(ticket, Ok("Chào bạn!".to_string()));
                    }
                }
                _ => {
                    rig.controller.on_capture_error(CaptureErrorKind::NoSpeech);
                }
            }
            assert_never_listening_while_speaking(&rig, step);
        }
    }
}

#[tokio::test]
async fn transient_error_then_engine_end_restarts_capture() {
    for kind in [CaptureErrorKind::Network, CaptureErrorKind::Aborted] {
        let mut rig = listening_rig().await;

        assert_eq!(rig.controller.on_capture_error(kind.clone()), None);
        assert_eq!(rig.controller.phase(), Phase::Listening);
        rig.capture.end_by_engine();
        assert_eq!(
            rig.controller.on_capture_end(),
            Some(Duration::from_millis(300)),
            "no restart scheduled after {kind:?}"
        );
        rig.controller.restart_capture();

        assert!(rig.capture.is_running(), "capture dead after {kind:?}");
        assert_eq!(rig.capture.log().starts, 2);
        assert!(rig.controller.state().is_listening());
    }
}

#[tokio::test]
async fn no_speech_then_engine_end_restarts_capture_once() {
    let mut rig = listening_rig().await;

    assert_eq!(
        rig.controller.on_capture_error(CaptureErrorKind::NoSpeech),
        Some(Duration::from_millis(300))
    );
    rig.capture.end_by_engine();
    assert_eq!(rig.controller.on_capture_end(), None);
    rig.controller.restart_capture();
    rig.controller.restart_capture();

    assert!(rig.capture.is_running());
    assert_eq!(rig.capture.log().starts, 2);
    assert!(rig.controller.state().is_listening());
    assert_eq!(rig.output.log().texts(), vec![defaults::GREETING]);
}

#[tokio::test]
async fn blank_transcripts_are_ignored() {
    let mut rig = listening_rig().await;
    let backend = MockBackend::new().with_reply("không nên gọi");
    let before = contents(&rig);

    assert!(!rig.controller.respond("", &backend).await);
    assert!(!rig.controller.respond("   ", &backend).await);

    assert_eq!(contents(&rig), before);
    assert_eq!(backend.calls(), 0);
    assert_eq!(rig.controller.phase(), Phase::Listening);
}

#[tokio::test]
async fn speech_end_restarts_capture_exactly_once() {
    let mut rig = listening_rig().await;
    let backend = MockBackend::new().with_reply("Chào bạn!");
    assert!(rig.controller.respond("Xin chào", &backend).await);
    let starts_before = rig.capture.log().starts;

    rig.controller.on_speech_start();
    rig.output.finish_current();
    assert_eq!(
        rig.controller.on_speech_end(),
        Some(Duration::from_millis(800))
    );
    // a duplicate end event schedules nothing more
    assert_eq!(rig.controller.on_speech_end(), None);
    rig.controller.restart_capture();
    rig.controller.restart_capture();

    assert_eq!(rig.capture.log().starts, starts_before + 1);
    assert!(rig.controller.state().is_listening());
}

#[tokio::test]
async fn backend_failure_yields_one_spoken_apology() {
    let mut rig = listening_rig().await;
    let backend = MockBackend::new().with_failure();

    assert!(rig.controller.respond("Xin chào", &backend).await);

    let assistant: Vec<String> = rig
        .controller
        .conversation()
        .all()
        .iter()
        .filter(|m| m.role() == Role::Assistant)
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(assistant, vec![defaults::GREETING, defaults::APOLOGY]);
    assert_eq!(rig.output.log().texts().last(), Some(&defaults::APOLOGY));
    assert_eq!(rig.controller.phase(), Phase::Speaking);
}

#[tokio::test]
async fn double_activate_greets_once() {
    let mut rig = rig();
    rig.controller
        .activate(&MockPermission::granted())
        .await
        .unwrap();
    rig.controller
        .activate(&MockPermission::granted())
        .await
        .unwrap();

    assert_eq!(contents(&rig), vec![defaults::GREETING]);
    assert_eq!(rig.output.log().texts(), vec![defaults::GREETING]);
}

#[tokio::test]
async fn greeting_then_exchange_is_recorded_and_spoken() {
    let mut rig = listening_rig().await;
    let backend = MockBackend::new().with_reply("Chào bạn!");

    assert!(rig.controller.respond("Xin chào", &backend).await);

    assert_eq!(
        contents(&rig),
        vec![defaults::GREETING, "Xin chào", "Chào bạn!"]
    );
    let roles: Vec<Role> = rig
        .controller
        .conversation()
        .all()
        .iter()
        .map(|m| m.role())
        .collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(rig.output.log().texts().last(), Some(&"Chào bạn!"));
}

#[tokio::test(start_paused = true)]
async fn session_keeps_late_reply_silent_after_deactivate() {
    let backend = MockBackend::new()
        .with_reply("Trả lời muộn")
        .with_delay(Duration::from_secs(5));
    let capture = MockCapture::new();
    let output = MockOutput::new();
    let controller = TurnController::new(
        ControllerConfig::default(),
        Box::new(capture.clone()),
        Box::new(output.clone()),
    );
    let session = VoiceSession::new(
        controller,
        Arc::new(backend.clone()),
        Arc::new(MockPermission::granted()),
        Box::new(NullSink),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(rx));

    tx.send(SessionEvent::Activate).unwrap();
    tx.send(SessionEvent::SpeechStarted(1)).unwrap();
    tx.send(SessionEvent::SpeechEnded(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(capture.is_running());

    tx.send(SessionEvent::Final("Xin chào".to_string())).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(SessionEvent::Deactivate).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    tx.send(SessionEvent::Shutdown).unwrap();

    let messages = handle.await.unwrap();
    let texts: Vec<&str> = messages.iter().map(|m| m.content()).collect();
    assert_eq!(texts, vec![defaults::GREETING, "Xin chào", "Trả lời muộn"]);
    assert_eq!(output.log().texts(), vec![defaults::GREETING]);
    assert_eq!(backend.calls(), 1);
}
