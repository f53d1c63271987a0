//! System-extension activation outcomes.
//!
//! Installation and approval of the privileged agent is driven by the host
//! application, not by this process. What the daemon needs is to understand
//! the outcome it is handed: proceed when activation completed, and tell
//! the operator what to do otherwise.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Outcome of the host's activation request for the privileged agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    /// The agent is installed and may connect to the event source.
    Completed,
    /// Installed, but the system will only load it after a reboot.
    WillCompleteAfterReboot,
    /// The user has to approve the agent in system settings first.
    NeedsUserApproval,
    /// Activation failed outright.
    Failed(String),
}

impl ActivationStatus {
    /// Whether the agent can proceed to connect to the event source.
    pub fn is_operational(&self) -> bool {
        matches!(self, ActivationStatus::Completed)
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStatus::Completed => f.write_str("completed"),
            ActivationStatus::WillCompleteAfterReboot => f.write_str("will_complete_after_reboot"),
            ActivationStatus::NeedsUserApproval => f.write_str("needs_user_approval"),
            ActivationStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// The host reported an activation outcome this daemon does not know.
#[derive(Debug, Error)]
#[error("unknown activation status: {0:?}")]
pub struct ParseActivationError(String);

impl FromStr for ActivationStatus {
    type Err = ParseActivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ActivationStatus::Completed),
            "will_complete_after_reboot" => Ok(ActivationStatus::WillCompleteAfterReboot),
            "needs_user_approval" => Ok(ActivationStatus::NeedsUserApproval),
            other => {
                if let Some(reason) = other.strip_prefix("failed:") {
                    Ok(ActivationStatus::Failed(reason.trim().to_string()))
                } else if other == "failed" {
                    Ok(ActivationStatus::Failed(String::new()))
                } else {
                    Err(ParseActivationError(other.to_string()))
                }
            }
        }
    }
}

/// Steps the operator must take when the agent is waiting on approval.
pub fn approval_instructions() -> String {
    "The monitoring agent requires user approval before it can observe \
     filesystem events.\n\
     \n\
     To approve the agent:\n\
     1. Open System Settings\n\
     2. Go to Privacy & Security\n\
     3. Allow the filesentry system extension\n\
     4. Grant Full Disk Access if prompted\n\
     5. Restart filesentry"
        .to_string()
}
