//! Console line formatting for pipeline events.

use crate::types::Event;

/// How store completions are reported
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `Progress <P>% / 100% | Storing '<path>'...`
    #[default]
    Percentage,
    /// `<path>: OK`
    Compact,
}

impl LogFormat {
    /// Map the `compact-logging` switch to a format
    pub fn from_compact(compact: bool) -> Self {
        if compact {
            LogFormat::Compact
        } else {
            LogFormat::Percentage
        }
    }
}

/// `floor(completed / total * 100)`, or 100 for an empty batch
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = completed.min(total) * 100 / total;
    value as u8
}

/// Line for one store completion
pub fn store_line(format: LogFormat, path: Option<&str>, percent: u8) -> String {
    match (path, format) {
        (None, _) => "??: FAIL".to_string(),
        (Some(path), LogFormat::Compact) => format!("{path}: OK"),
        (Some(path), LogFormat::Percentage) => {
            format!("Progress {percent}% / 100% | Storing '{path}'...")
        }
    }
}

/// Console line for an event, if it has one
pub fn console_line(event: &Event, format: LogFormat) -> Option<String> {
    let line = match event {
        Event::Skipped { .. } => return None,
        Event::DestinationFailed { path, .. } => format!("Cannot create a {path}. Ignoring."),
        Event::LengthMismatch { path, .. } => {
            format!("File {path} have different length than expected!")
        }
        Event::HashMissing { path } => format!("File {path} do not have hashsum in file map."),
        Event::HashMismatch { path } => {
            format!("File {path} not match hash sum with original file.")
        }
        Event::Stored { path, percent, .. } => store_line(format, path.as_deref(), *percent),
        Event::StageFailed { path, stage, error } => format!("{path}: {stage} failed: {error}"),
        Event::BatchComplete { report } if report.failed == 0 => "Success!".to_string(),
        Event::BatchComplete { report } => {
            format!("Finished with {} failed file(s).", report.failed)
        }
    };
    Some(line)
}
