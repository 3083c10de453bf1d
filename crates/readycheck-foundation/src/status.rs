use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a single device/network check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Idle,
    Testing,
    Passed,
    Failed,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckStatus::Idle => "idle",
            CheckStatus::Testing => "testing",
            CheckStatus::Passed => "passed",
            CheckStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Shared holder for one check's status with validated transitions.
///
/// Completion callbacks are the only writers; subscribers observe every
/// transition through the broadcast channel.
pub struct StatusCell {
    status: Arc<RwLock<CheckStatus>>,
    status_tx: Sender<CheckStatus>,
    status_rx: Receiver<CheckStatus>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub fn new() -> Self {
        let (status_tx, status_rx) = crossbeam_channel::unbounded();
        Self {
            status: Arc::new(RwLock::new(CheckStatus::Idle)),
            status_tx,
            status_rx,
        }
    }

    pub fn transition(&self, new_status: CheckStatus) -> Result<(), AppError> {
        let mut current = self.status.write();

        // Idle -> Testing, Testing -> Passed/Failed, and a manual re-trigger
        // from either terminal state back to Testing.
        let valid = matches!(
            (*current, new_status),
            (CheckStatus::Idle, CheckStatus::Testing)
                | (CheckStatus::Testing, CheckStatus::Passed)
                | (CheckStatus::Testing, CheckStatus::Failed)
                | (CheckStatus::Passed, CheckStatus::Testing)
                | (CheckStatus::Failed, CheckStatus::Testing)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid status transition: {:?} -> {:?}",
                *current, new_status
            )));
        }

        tracing::debug!("Status transition: {:?} -> {:?}", *current, new_status);
        *current = new_status;
        let _ = self.status_tx.send(new_status);
        Ok(())
    }

    pub fn current(&self) -> CheckStatus {
        *self.status.read()
    }

    pub fn subscribe(&self) -> Receiver<CheckStatus> {
        self.status_rx.clone()
    }
}
