//! Human-readable lines for upload events.

use std::collections::HashMap;

use rapidupload_queue::{RoundOutcome, UploadEvent, format_bytes, format_eta};

/// Turns queue events into terminal output.
///
/// Progress lines are only produced when the whole-percent overall value
/// changes, so chatty transfers do not flood the terminal.
pub struct Reporter {
    names: HashMap<String, String>,
    last_percent: Option<u64>,
}

impl Reporter {
    /// `names` maps item ids to file names.
    pub fn new(names: HashMap<String, String>) -> Self {
        Self {
            names,
            last_percent: None,
        }
    }

    fn name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.names.get(item_id).map_or(item_id, String::as_str)
    }

    pub fn line(&mut self, event: &UploadEvent) -> Option<String> {
        match event {
            UploadEvent::RoundStarted { items, .. } => Some(format!("uploading {items} file(s)")),
            UploadEvent::ItemStarted { item_id } => {
                Some(format!("  started   {}", self.name(item_id)))
            }
            UploadEvent::ItemProgress { overall, .. } => {
                let percent = overall.overall_progress.floor() as u64;
                if self.last_percent == Some(percent) {
                    return None;
                }
                self.last_percent = Some(percent);

                let mut line = format!(
                    "  {percent:>3}%  {} of {}",
                    format_bytes(overall.completed_bytes),
                    format_bytes(overall.total_bytes)
                );
                if let Some(eta) = overall.eta_secs {
                    line.push_str(&format!(", {} left", format_eta(eta)));
                }
                Some(line)
            }
            UploadEvent::ItemCompleted { item_id } => {
                Some(format!("  done      {}", self.name(item_id)))
            }
            UploadEvent::ItemFailed { item_id, error } => {
                Some(format!("  failed    {}: {error}", self.name(item_id)))
            }
            UploadEvent::RoundSettled { outcome } => Some(summary(outcome)),
        }
    }
}

pub fn summary(outcome: &RoundOutcome) -> String {
    if outcome.promoted {
        format!("{} file(s) uploaded", outcome.succeeded)
    } else {
        format!(
            "{} of {} file(s) uploaded, {} failed",
            outcome.succeeded, outcome.attempted, outcome.failed
        )
    }
}
