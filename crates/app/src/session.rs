use crate::probes::{CheckError, CheckReport};
use readycheck_foundation::{AppError, CheckStatus, StatusCell};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Camera,
    Microphone,
    Network,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [
        CheckKind::Camera,
        CheckKind::Microphone,
        CheckKind::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Camera => "camera",
            CheckKind::Microphone => "microphone",
            CheckKind::Network => "network",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates the three checks into one gating decision.
///
/// The only path to `Passed` is `complete()` with a passing report, so a
/// status can never outrun its threshold check.
pub struct ReadinessSession {
    camera: StatusCell,
    microphone: StatusCell,
    network: StatusCell,
    reports: HashMap<CheckKind, CheckReport>,
    messages: HashMap<CheckKind, String>,
}

impl Default for ReadinessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSession {
    pub fn new() -> Self {
        Self {
            camera: StatusCell::new(),
            microphone: StatusCell::new(),
            network: StatusCell::new(),
            reports: HashMap::new(),
            messages: HashMap::new(),
        }
    }

    fn cell(&self, kind: CheckKind) -> &StatusCell {
        match kind {
            CheckKind::Camera => &self.camera,
            CheckKind::Microphone => &self.microphone,
            CheckKind::Network => &self.network,
        }
    }

    pub fn status(&self, kind: CheckKind) -> CheckStatus {
        self.cell(kind).current()
    }

    /// Mark a check as running. Re-triggering while already Testing is
    /// rejected, which makes double-starts a no-op for callers that ignore
    /// the error.
    pub fn begin(&mut self, kind: CheckKind) -> Result<(), AppError> {
        self.messages.remove(&kind);
        self.cell(kind).transition(CheckStatus::Testing)
    }

    pub fn complete(&mut self, kind: CheckKind, report: &CheckReport) -> Result<(), AppError> {
        let status = if report.pass {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };
        self.cell(kind).transition(status)?;
        if let Some(notes) = &report.notes {
            self.messages.insert(kind, notes.clone());
        }
        self.reports.insert(kind, report.clone());
        Ok(())
    }

    pub fn fail(&mut self, kind: CheckKind, error: &CheckError) -> Result<(), AppError> {
        self.cell(kind).transition(CheckStatus::Failed)?;
        self.messages.insert(kind, error.message.clone());
        self.reports.remove(&kind);
        Ok(())
    }

    pub fn report(&self, kind: CheckKind) -> Option<&CheckReport> {
        self.reports.get(&kind)
    }

    /// Last failure message for a check, if any.
    pub fn message(&self, kind: CheckKind) -> Option<&str> {
        self.messages.get(&kind).map(String::as_str)
    }

    pub fn is_ready(&self) -> bool {
        CheckKind::ALL
            .iter()
            .all(|&kind| self.status(kind) == CheckStatus::Passed)
    }

    /// One-line guidance shown next to the start button.
    pub fn status_message(&self) -> String {
        if self.status(CheckKind::Camera) != CheckStatus::Passed {
            return "Camera must be turned on and tested".to_string();
        }
        if self.status(CheckKind::Microphone) != CheckStatus::Passed {
            return "Microphone must be tested".to_string();
        }
        match self.status(CheckKind::Network) {
            CheckStatus::Passed => "All systems ready".to_string(),
            CheckStatus::Failed => self
                .message(CheckKind::Network)
                .unwrap_or("Run the network test")
                .to_string(),
            _ => "Run the network test".to_string(),
        }
    }

    /// The gated start action. A stub: the session only decides whether the
    /// launch may happen.
    pub fn launch_interview(&self) -> Result<(), AppError> {
        if !self.is_ready() {
            return Err(AppError::Fatal(format!(
                "Cannot start interview: {}",
                self.status_message()
            )));
        }
        tracing::info!("Interview starting...");
        Ok(())
    }
}
