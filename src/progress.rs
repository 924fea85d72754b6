//! Scan progress reporting.
//!
//! The scan engine reports per-file completion counts and occasional
//! human-readable notices (matches found, partial top results, warnings)
//! through a [`ScanProgress`] sink. Sinks must return quickly: the engine
//! calls them from its collection loop and never waits on delivery.
//!
//! CLI sinks write to **stderr** so stdout stays parseable for scripts;
//! the MCP bridge forwards events to the connected client.

use std::io::Write;

/// Severity of a textual notice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A single event emitted while a request runs.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// `processed` of `total` files finished (successfully or not).
    Files { processed: u64, total: u64 },
    /// Free-form status text.
    Notice { level: NoticeLevel, message: String },
}

/// Receives progress events. Implementations must not block.
pub trait ScanProgress: Send + Sync {
    fn report(&self, event: ProgressEvent);

    fn info(&self, message: String) {
        self.report(ProgressEvent::Notice {
            level: NoticeLevel::Info,
            message,
        });
    }

    fn warning(&self, message: String) {
        self.report(ProgressEvent::Notice {
            level: NoticeLevel::Warning,
            message,
        });
    }

    fn error(&self, message: String) {
        self.report(ProgressEvent::Notice {
            level: NoticeLevel::Error,
            message,
        });
    }
}

/// Human-friendly progress on stderr: "scan  12 / 40 files".
pub struct StderrProgress;

impl ScanProgress for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Files { processed, total } => {
                format!("scan  {} / {} files\n", processed, total)
            }
            ProgressEvent::Notice { level, message } => match level {
                NoticeLevel::Info => format!("{}\n", message),
                other => format!("{}: {}\n", other.as_str(), message),
            },
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgress for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Files { processed, total } => serde_json::json!({
                "event": "progress",
                "processed": processed,
                "total": total
            }),
            ProgressEvent::Notice { level, message } => serde_json::json!({
                "event": "notice",
                "level": level.as_str(),
                "message": message
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// Routes progress into the tracing log (used by the HTTP server).
pub struct LogProgress;

impl ScanProgress for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Files { processed, total } => {
                tracing::debug!(processed, total, "scan progress");
            }
            ProgressEvent::Notice { level, message } => match level {
                NoticeLevel::Info => tracing::debug!("{}", message),
                NoticeLevel::Warning => tracing::warn!("{}", message),
                NoticeLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ScanProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ScanProgress for Recorder {
        fn report(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn helpers_tag_levels() {
        let rec = Recorder::default();
        rec.info("a".into());
        rec.warning("b".into());
        let events = rec.0.lock().unwrap();
        assert_eq!(
            events[1],
            ProgressEvent::Notice {
                level: NoticeLevel::Warning,
                message: "b".into()
            }
        );
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
