use std::sync::Once;
use std::time::Duration;

use ingest_core::{update, AppState, Effect, JobSource, JobStatus, Msg};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(ingest_logging::initialize_for_tests);
}

fn local_file() -> JobSource {
    JobSource::LocalFile {
        name: "clip.mp4".to_string(),
        bytes: vec![0, 1, 2, 3],
    }
}

#[test]
fn submit_moves_idle_to_uploading_and_emits_submit() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::SubmitRequested(local_file()));

    let view = state.view();
    assert_eq!(view.status, JobStatus::Uploading);
    assert_eq!(view.job_id, Some(1));
    assert_eq!(view.identifier, None);
    assert_eq!(view.source_label.as_deref(), Some("clip.mp4"));
    assert_eq!(view.progress_percent, 10);
    assert_eq!(view.last_error, None);
    assert!(state.consume_dirty());
    assert_eq!(
        effects,
        vec![Effect::Submit {
            job_id: 1,
            source: local_file(),
        }]
    );
}

#[test]
fn accepted_submission_captures_identifier_and_starts_polling() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SubmitRequested(JobSource::RemoteUrl(
            "https://www.youtube.com/watch?v=abc".to_string(),
        )),
    );
    let (state, effects) = update(
        state,
        Msg::SubmitSucceeded {
            job_id: 1,
            identifier: "1700000000_talk.mp4".to_string(),
        },
    );

    let view = state.view();
    assert_eq!(view.status, JobStatus::Uploading);
    assert_eq!(view.identifier.as_deref(), Some("1700000000_talk.mp4"));
    assert_eq!(view.source_label.as_deref(), Some("www.youtube.com/watch"));
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: 1,
            identifier: "1700000000_talk.mp4".to_string(),
            interval: Duration::from_secs(1),
        }]
    );
}

#[test]
fn failed_submission_is_terminal_with_message() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SubmitRequested(local_file()));
    let (state, effects) = update(
        state,
        Msg::SubmitFailed {
            job_id: 1,
            message: "Download failed: No filename returned.".to_string(),
        },
    );

    let view = state.view();
    assert_eq!(view.status, JobStatus::Error);
    assert_eq!(
        view.last_error.as_deref(),
        Some("Download failed: No filename returned.")
    );
    assert!(effects.is_empty());

    // No retry: a late success for the same attempt changes nothing.
    let (next, effects) = update(
        state.clone(),
        Msg::SubmitSucceeded {
            job_id: 1,
            identifier: "late.mp4".to_string(),
        },
    );
    assert_eq!(next.view().status, JobStatus::Error);
    assert_eq!(next.view().identifier, None);
    assert!(effects.is_empty());
}

#[test]
fn submit_is_ignored_while_a_job_is_in_flight() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SubmitRequested(local_file()));
    let (mut state, effects) = update(
        state,
        Msg::SubmitRequested(JobSource::RemoteUrl("https://example.com/v".to_string())),
    );
    assert!(state.consume_dirty());

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.job_id, Some(1));
    assert_eq!(view.source_label.as_deref(), Some("clip.mp4"));

    let (mut state, effects) = update(
        state,
        Msg::SubmitRequested(JobSource::RemoteUrl("https://example.com/v".to_string())),
    );
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}

#[test]
fn new_job_after_error_gets_fresh_bookkeeping() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SubmitRequested(local_file()));
    let (state, _) = update(
        state,
        Msg::SubmitFailed {
            job_id: 1,
            message: "boom".to_string(),
        },
    );

    let (state, effects) = update(
        state,
        Msg::SubmitRequested(JobSource::RemoteUrl("https://example.com/v".to_string())),
    );
    let view = state.view();
    assert_eq!(view.status, JobStatus::Uploading);
    assert_eq!(view.job_id, Some(2));
    assert_eq!(view.last_error, None);
    assert_eq!(view.consecutive_poll_failures, 0);
    assert_eq!(
        effects,
        vec![Effect::Submit {
            job_id: 2,
            source: JobSource::RemoteUrl("https://example.com/v".to_string()),
        }]
    );
}

#[test]
fn reset_after_terminal_returns_to_idle() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SubmitRequested(local_file()));
    let (state, _) = update(
        state,
        Msg::SubmitFailed {
            job_id: 1,
            message: "boom".to_string(),
        },
    );
    let (mut state, effects) = update(state, Msg::ResetRequested);

    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    let view = state.view();
    assert_eq!(view.status, JobStatus::Idle);
    assert_eq!(view.job_id, None);
    assert_eq!(view.last_error, None);
    assert_eq!(view.progress_percent, 0);
}

#[test]
fn reset_is_ignored_while_in_flight() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::SubmitRequested(local_file()));
    let (state, effects) = update(state, Msg::ResetRequested);

    assert!(effects.is_empty());
    assert_eq!(state.view().status, JobStatus::Uploading);
}
