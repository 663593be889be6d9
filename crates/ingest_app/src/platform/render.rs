use chrono::Local;
use ingest_core::{JobStatus, StatusView};

pub(crate) fn status_line(view: &StatusView) -> String {
    format!("[{}] {}", Local::now().format("%H:%M:%S"), describe(view))
}

pub(crate) fn describe(view: &StatusView) -> String {
    let label = view.source_label.as_deref().unwrap_or("job");
    match view.status {
        JobStatus::Idle => "idle".to_string(),
        JobStatus::Uploading => format!("uploading {label} ({}%)", view.progress_percent),
        JobStatus::Processing => {
            let mut line = format!("processing {label}: {}%", view.progress_percent);
            if let Some(remote) = view.remote_status.as_deref().filter(|s| !s.is_empty()) {
                line.push_str(&format!(" - {remote}"));
            }
            if view.consecutive_poll_failures > 0 {
                line.push_str(&format!(
                    " (status check failed {}x, retrying)",
                    view.consecutive_poll_failures
                ));
            }
            line
        }
        JobStatus::Success => match view.identifier.as_deref() {
            Some(identifier) => format!("ingested {label} as {identifier}"),
            None => format!("ingested {label}"),
        },
        JobStatus::Error => format!(
            "failed {label}: {}",
            view.last_error.as_deref().unwrap_or("unknown error")
        ),
        JobStatus::Cancelled => format!("cancelled {label}, cleaning up"),
    }
}
