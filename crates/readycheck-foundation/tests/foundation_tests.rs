//! Foundation crate tests
//!
//! Tests cover:
//! - Check status transition table (StatusCell)
//! - Clock abstraction (RealClock, TestClock)
//! - Error types and their user-facing messages

use readycheck_foundation::clock::{real_clock, test_clock, Clock, RealClock, TestClock};
use readycheck_foundation::error::{AppError, AudioError, CameraError, NetworkError};
use readycheck_foundation::status::{CheckStatus, StatusCell};
use std::time::{Duration, Instant};

// ─── StatusCell Tests ───────────────────────────────────────────────

#[test]
fn every_legal_transition_is_accepted() {
    let legal = [
        (CheckStatus::Idle, CheckStatus::Testing),
        (CheckStatus::Testing, CheckStatus::Passed),
        (CheckStatus::Testing, CheckStatus::Failed),
        (CheckStatus::Passed, CheckStatus::Testing),
        (CheckStatus::Failed, CheckStatus::Testing),
    ];
    for (from, to) in legal {
        let cell = drive_to(from);
        assert!(
            cell.transition(to).is_ok(),
            "expected {from:?} -> {to:?} to be legal"
        );
        assert_eq!(cell.current(), to);
    }
}

#[test]
fn every_illegal_transition_is_rejected() {
    let illegal = [
        (CheckStatus::Idle, CheckStatus::Passed),
        (CheckStatus::Idle, CheckStatus::Failed),
        (CheckStatus::Idle, CheckStatus::Idle),
        (CheckStatus::Testing, CheckStatus::Idle),
        (CheckStatus::Testing, CheckStatus::Testing),
        (CheckStatus::Passed, CheckStatus::Failed),
        (CheckStatus::Passed, CheckStatus::Idle),
        (CheckStatus::Passed, CheckStatus::Passed),
        (CheckStatus::Failed, CheckStatus::Passed),
        (CheckStatus::Failed, CheckStatus::Idle),
        (CheckStatus::Failed, CheckStatus::Failed),
    ];
    for (from, to) in illegal {
        let cell = drive_to(from);
        let result = cell.transition(to);
        assert!(
            matches!(result, Err(AppError::Fatal(_))),
            "expected {from:?} -> {to:?} to be rejected"
        );
        assert_eq!(cell.current(), from, "rejected transition must not apply");
    }
}

fn drive_to(target: CheckStatus) -> StatusCell {
    let cell = StatusCell::new();
    match target {
        CheckStatus::Idle => {}
        CheckStatus::Testing => {
            cell.transition(CheckStatus::Testing).unwrap();
        }
        CheckStatus::Passed => {
            cell.transition(CheckStatus::Testing).unwrap();
            cell.transition(CheckStatus::Passed).unwrap();
        }
        CheckStatus::Failed => {
            cell.transition(CheckStatus::Testing).unwrap();
            cell.transition(CheckStatus::Failed).unwrap();
        }
    }
    cell
}

#[test]
fn status_displays_lowercase() {
    assert_eq!(CheckStatus::Idle.to_string(), "idle");
    assert_eq!(CheckStatus::Testing.to_string(), "testing");
    assert_eq!(CheckStatus::Passed.to_string(), "passed");
    assert_eq!(CheckStatus::Failed.to_string(), "failed");
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&CheckStatus::Testing).unwrap(),
        "\"testing\""
    );
}

// ─── Clock Tests ────────────────────────────────────────────────────

#[test]
fn real_clock_now_returns_current_time() {
    let clock = RealClock::new();
    let before = Instant::now();
    let clock_time = clock.now();
    let after = Instant::now();
    assert!(clock_time >= before);
    assert!(clock_time <= after);
}

#[test]
fn real_clock_factory_function() {
    let clock = real_clock();
    let t = clock.now();
    assert!(t.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    clock.advance(Duration::from_millis(300));
    assert_eq!(clock.now().duration_since(start), Duration::from_millis(600));
}

#[test]
fn test_clock_sleep_advances_time() {
    let clock = test_clock();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(10));
    assert_eq!(clock.now().duration_since(t0), Duration::from_secs(10));
}

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_open_timeout_has_permission_message() {
    let err = AudioError::OpenTimeout {
        duration: Duration::from_secs(10),
    };
    assert_eq!(
        err.user_message(),
        "Microphone permission prompt timed out. Please allow access."
    );
}

#[test]
fn audio_error_device_not_found_message() {
    let err = AudioError::DeviceNotFound { name: None };
    assert_eq!(err.user_message(), "No microphone device found.");
}

#[test]
fn camera_error_messages_match_failure_classes() {
    assert_eq!(
        CameraError::NoDevice.user_message(),
        "No camera device found."
    );
    assert_eq!(
        CameraError::PermissionDenied("x".into()).user_message(),
        "Permission to access the camera was denied."
    );
    assert_eq!(
        CameraError::Busy("x".into()).user_message(),
        "Camera is already in use by another application."
    );
}

#[test]
fn app_error_fatal_carries_reason() {
    let err = AppError::Fatal("checks incomplete".to_string());
    assert!(format!("{}", err).contains("checks incomplete"));
}

#[test]
fn network_bad_status_displays_code() {
    let err = NetworkError::BadStatus { status: 503 };
    assert!(format!("{}", err).contains("503"));
}
