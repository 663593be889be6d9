use crate::{AppState, Effect, JobFailure, JobId, JobSource, JobStatus, Msg, ProgressReport};

/// Pure update function: applies a message to state and returns any effects.
///
/// This is the only place the tracked job is mutated. Messages tagged with a
/// `job_id` that is no longer current are dropped; poll results for such a job
/// additionally ask the runtime to disarm its timer.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitRequested(source) => submit_requested(&mut state, source),
        Msg::SubmitSucceeded { job_id, identifier } => {
            submit_succeeded(&mut state, job_id, identifier)
        }
        Msg::SubmitFailed { job_id, message } => submit_failed(&mut state, job_id, message),
        Msg::PollSucceeded { job_id, report } => poll_succeeded(&mut state, job_id, report),
        Msg::PollFailed { job_id } => poll_failed(&mut state, job_id),
        Msg::CancelRequested => {
            if state.status().is_active() {
                cancel_job(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::CleanupFinished { job_id, .. } => {
            let cancelled = state
                .job_mut(job_id)
                .is_some_and(|job| job.status == JobStatus::Cancelled);
            if cancelled {
                state.clear_job();
            }
            Vec::new()
        }
        Msg::ResetRequested => {
            if state.status().is_terminal() {
                let effects = stop_polling(&mut state).into_iter().collect();
                state.clear_job();
                effects
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn submit_requested(state: &mut AppState, source: JobSource) -> Vec<Effect> {
    // One job at a time; a finished one is simply replaced.
    if state.status().is_active() {
        return Vec::new();
    }

    let mut effects = Vec::with_capacity(2);
    effects.extend(stop_polling(state));
    let job_id = state.begin_job(source.label());
    effects.push(Effect::Submit { job_id, source });
    effects
}

fn submit_succeeded(state: &mut AppState, job_id: JobId, identifier: String) -> Vec<Effect> {
    let abandoned = state.take_abandoned(job_id);
    let interval = state.config().poll_interval;

    let Some(job) = state.job_mut(job_id) else {
        // Cancelled and superseded before the service answered.
        return if abandoned {
            vec![Effect::RequestCleanup { job_id, identifier }]
        } else {
            Vec::new()
        };
    };

    let status = job.status;
    match status {
        JobStatus::Uploading => {
            job.identifier = Some(identifier.clone());
            job.polling = true;
            state.mark_dirty();
            vec![Effect::StartPolling {
                job_id,
                identifier,
                interval,
            }]
        }
        JobStatus::Cancelled if abandoned => {
            job.identifier = Some(identifier.clone());
            state.mark_dirty();
            vec![Effect::RequestCleanup { job_id, identifier }]
        }
        _ => Vec::new(),
    }
}

fn submit_failed(state: &mut AppState, job_id: JobId, message: String) -> Vec<Effect> {
    let abandoned = state.take_abandoned(job_id);
    let Some(job) = state.job_mut(job_id) else {
        return Vec::new();
    };

    let status = job.status;
    match status {
        JobStatus::Uploading => {
            job.status = JobStatus::Error;
            job.last_error = Some(JobFailure::Submission(message));
            state.mark_dirty();
        }
        // Nothing was created remotely, so there is nothing to clean up.
        JobStatus::Cancelled if abandoned => state.clear_job(),
        _ => {}
    }
    Vec::new()
}

fn poll_succeeded(state: &mut AppState, job_id: JobId, report: ProgressReport) -> Vec<Effect> {
    let floor = state.config().progress_floor;
    let cancel_sentinel = state.config().cancel_sentinel.clone();

    let Some(job) = state.job_mut(job_id) else {
        return vec![Effect::StopPolling { job_id }];
    };
    if !job.status.is_active() {
        return Vec::new();
    }

    job.consecutive_poll_failures = 0;
    job.remote_status = Some(report.status.trim().to_string());

    // Checked first: the service reports worker-side cancellation with percent -1.
    if is_cancel_sentinel(&report.status, &cancel_sentinel) {
        return cancel_job(state);
    }

    if report.percent < 0 || is_failure_status(&report.status) {
        let message = match report.status.trim() {
            "" => "remote processing failed".to_string(),
            status => status.to_string(),
        };
        return fail_job(state, JobFailure::RemoteReported(message));
    }

    let reported = report.percent.clamp(0, 100) as u8;
    job.raise_progress(reported.max(floor));
    job.status = JobStatus::Processing;

    if report.percent >= 100 {
        job.status = JobStatus::Success;
        job.polling = false;
        job.raise_progress(100);
        let identifier = job.identifier.clone().unwrap_or_default();
        state.mark_dirty();
        return vec![
            Effect::StopPolling { job_id },
            Effect::NotifyCompleted { job_id, identifier },
        ];
    }

    state.mark_dirty();
    Vec::new()
}

fn poll_failed(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    let tolerance = state.config().max_consecutive_poll_failures;

    let Some(job) = state.job_mut(job_id) else {
        return vec![Effect::StopPolling { job_id }];
    };
    if !job.status.is_active() {
        return Vec::new();
    }

    job.consecutive_poll_failures = job.consecutive_poll_failures.saturating_add(1);
    let exhausted = job.consecutive_poll_failures >= tolerance;
    state.mark_dirty();

    if exhausted {
        fail_job(state, JobFailure::ConnectionLost)
    } else {
        Vec::new()
    }
}

/// Local half of a cancellation: stop the timer and go terminal right away.
/// The cleanup request is either emitted now or, if the service has not
/// assigned an identifier yet, once the submission call returns.
fn cancel_job(state: &mut AppState) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    effects.extend(stop_polling(state));

    let Some(job) = state.current_mut() else {
        return effects;
    };
    job.status = JobStatus::Cancelled;
    let job_id = job.id;
    match job.identifier.clone() {
        Some(identifier) => effects.push(Effect::RequestCleanup { job_id, identifier }),
        None => state.abandon_submission(job_id),
    }
    state.mark_dirty();
    effects
}

fn fail_job(state: &mut AppState, failure: JobFailure) -> Vec<Effect> {
    let effects = stop_polling(state).into_iter().collect();
    if let Some(job) = state.current_mut() {
        job.status = JobStatus::Error;
        job.last_error = Some(failure);
    }
    state.mark_dirty();
    effects
}

fn stop_polling(state: &mut AppState) -> Option<Effect> {
    let job = state.current_mut()?;
    if !job.polling {
        return None;
    }
    job.polling = false;
    Some(Effect::StopPolling { job_id: job.id })
}

fn is_cancel_sentinel(status: &str, sentinel: &str) -> bool {
    let sentinel = sentinel.trim();
    !sentinel.is_empty()
        && status
            .to_ascii_lowercase()
            .contains(&sentinel.to_ascii_lowercase())
}

fn is_failure_status(status: &str) -> bool {
    let status = status.trim().to_ascii_lowercase();
    status == "failed" || status.starts_with("error")
}
