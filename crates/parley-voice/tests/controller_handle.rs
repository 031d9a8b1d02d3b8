//! Integration tests for the controller task and its `ControllerHandle`.
//!
//! The controller runs as a spawned task with tokio's paused clock, so the
//! polling interval and the silence debounce advance virtually.

mod common;

use std::time::Duration;

use common::Harness;
use parley_core::{SubmitReason, TurnEvent};
use parley_voice::{TurnError, TurnState};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[tokio::test(start_paused = true)]
async fn full_turn_through_the_handle() {
    let h = Harness::ready().await;
    let handle = h.controller.handle();
    let task = tokio::spawn(h.controller.run());

    handle.start_capture().await.unwrap();
    assert!(handle.snapshot().is_capturing());

    for _ in 0..5 {
        h.capture.push(vec![3; 4], 0.7);
        tokio::time::sleep(FRAME_INTERVAL).await;
    }
    assert!(handle.snapshot().has_spoken);

    for _ in 0..125 {
        h.capture.push(vec![0; 4], 0.01);
        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reason, SubmitReason::Silence);
    assert_eq!(handle.snapshot().state, TurnState::Idle);

    // Reply plays, ends, and capture resumes hands-free.
    handle.deliver_reply_audio(vec![0; 2400]).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.snapshot().is_suppressed());
    assert_eq!(h.events.count(TurnEvent::PlaybackStarted), 1);

    h.playback.finish();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.events.count(TurnEvent::PlaybackEnded), 1);
    assert!(handle.snapshot().is_capturing());
    assert_eq!(h.capture.probe().starts, 2);

    handle.shutdown().unwrap();
    task.await.unwrap();
    assert!(!handle.is_running());
    assert_eq!(handle.start_capture().await, Err(TurnError::ControllerStopped));
}

#[tokio::test(start_paused = true)]
async fn cancel_through_the_handle_sends_nothing() {
    let h = Harness::ready().await;
    let handle = h.controller.handle();
    let task = tokio::spawn(h.controller.run());

    handle.start_capture().await.unwrap();
    h.capture.push(vec![1; 4], 0.7);
    tokio::time::sleep(FRAME_INTERVAL * 4).await;

    handle.cancel().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(h.channel.sent().is_empty());
    assert_eq!(handle.snapshot().state, TurnState::Idle);
    assert_eq!(h.events.count(TurnEvent::RecordingEnded), 0);

    handle.shutdown().unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_broadcast() {
    let h = Harness::ready().await;
    let handle = h.controller.handle();
    let mut snapshots = handle.watch_snapshots();
    let task = tokio::spawn(h.controller.run());

    handle.start_capture().await.unwrap();
    snapshots.changed().await.unwrap();
    assert_eq!(snapshots.borrow_and_update().state, TurnState::Capturing);

    handle.set_auto_resume(false).unwrap();
    tokio::time::sleep(FRAME_INTERVAL).await;
    assert!(!handle.snapshot().auto_resume);

    handle.stop_and_send().await.unwrap();
    assert_eq!(handle.stop_and_send().await, Err(TurnError::NotCapturing));

    handle.shutdown().unwrap();
    task.await.unwrap();
}
