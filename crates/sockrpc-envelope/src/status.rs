use std::fmt;

use crate::envelope::ErrorReason;

/// Outcome record for a single call.
///
/// A fresh `Status` is created per call and mutated by the stages that run
/// it. The first failure recorded sticks: later calls to [`fail`] or
/// [`set_failed`] are ignored.
///
/// [`fail`]: Status::fail
/// [`set_failed`]: Status::set_failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    failed: bool,
    message: Option<String>,
    reason: Option<ErrorReason>,
}

impl Status {
    /// A status that has not failed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a failure has been recorded.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Failure message, if failed.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Failure reason, if one was given.
    ///
    /// An application failure recorded with [`set_failed`](Self::set_failed)
    /// has no specific reason.
    pub fn reason(&self) -> Option<ErrorReason> {
        self.reason
    }

    /// Record a failure with an explicit reason.
    ///
    /// Returns `false` without changing anything if already failed.
    pub fn fail(&mut self, reason: ErrorReason, message: impl Into<String>) -> bool {
        self.record(Some(reason), message.into())
    }

    /// Record an application-level failure without a specific reason.
    ///
    /// Returns `false` without changing anything if already failed.
    pub fn set_failed(&mut self, message: impl Into<String>) -> bool {
        self.record(None, message.into())
    }

    fn record(&mut self, reason: Option<ErrorReason>, message: String) -> bool {
        if self.failed {
            return false;
        }
        self.failed = true;
        self.reason = reason;
        self.message = Some(message);
        true
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.failed {
            return f.write_str("ok");
        }
        let message = self.message.as_deref().unwrap_or("");
        match self.reason {
            Some(reason) => write!(f, "failed ({reason}): {message}"),
            None => write!(f, "failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_status_is_not_failed() {
        let status = Status::new();
        assert!(!status.is_failed());
        assert_eq!(status.message(), None);
        assert_eq!(status.reason(), None);
        assert_eq!(status.to_string(), "ok");
    }

    #[test]
    fn first_failure_wins() {
        let mut status = Status::new();
        assert!(status.fail(ErrorReason::UnknownHost, "could not find host nowhere"));
        assert!(!status.fail(ErrorReason::IoError, "later"));
        assert!(!status.set_failed("later still"));

        assert!(status.is_failed());
        assert_eq!(status.reason(), Some(ErrorReason::UnknownHost));
        assert_eq!(status.message(), Some("could not find host nowhere"));
    }

    #[test]
    fn set_failed_has_no_reason() {
        let mut status = Status::new();
        status.set_failed("soggy chips");
        assert_eq!(status.reason(), None);
        assert_eq!(status.to_string(), "failed: soggy chips");
    }
}
