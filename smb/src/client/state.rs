use tokio_util::sync::CancellationToken;

use smb_core::error::{SMBError, StateError};
use smb_core::SMBResult;

/// Lifecycle of an [`SMBSession`](crate::client::SMBSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBSessionState {
    /// Transport up, nothing negotiated yet.
    Disconnected,
    Negotiated,
    Authenticated,
    /// Logged off, or the connection failed.
    Closed,
}

impl SMBSessionState {
    pub(crate) fn require(self, expected: Self, operation: &str) -> SMBResult<()> {
        if self == Self::Closed {
            return Err(StateError::SessionTerminated.into());
        }
        if self != expected {
            return Err(SMBError::invalid_order(format!(
                "{} needs a {:?} session, this one is {:?}",
                operation, expected, self
            )));
        }
        Ok(())
    }
}

/// Checks a tree or handle before use. A handle whose session went away
/// reports the termination; one released on its own is an ordering error.
pub(crate) fn require_live(session: &CancellationToken, own: &CancellationToken, what: &str) -> SMBResult<()> {
    if session.is_cancelled() {
        return Err(StateError::SessionTerminated.into());
    }
    if own.is_cancelled() {
        return Err(SMBError::invalid_order(format!("{} is already closed", what)));
    }
    Ok(())
}
