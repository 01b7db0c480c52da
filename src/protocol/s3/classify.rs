//! Failure classification for commit-time errors
//!
//! Maps a backend failure (plus, when needed, the result of an existence
//! probe) onto the outcome the caller sees. The functions here are pure so
//! the decision table can be tested without a backend.
//!
//! A *precondition rejection* is either an HTTP 412 or an HTTP 200 whose
//! error code is `PreconditionFailed`. The second form is how
//! `CompleteMultipartUpload` reports failures after it has already started
//! streaming a success status.

use super::error::{ErrorOrigin, S3Error};

/// HTTP status for a failed `If-None-Match` precondition
pub const PRECONDITION_FAILED_STATUS: u16 = 412;

/// Error code carried by precondition failures
pub const PRECONDITION_FAILED_CODE: &str = "PreconditionFailed";

/// The parts of a backend failure that drive classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureSignal<'a> {
    pub status: Option<u16>,
    pub code: Option<&'a str>,
    pub origin: Option<ErrorOrigin>,
}

impl<'a> FailureSignal<'a> {
    pub fn from_error(err: &'a S3Error) -> Self {
        Self {
            status: err.status(),
            code: err.code(),
            origin: err.origin(),
        }
    }

    /// Whether the backend rejected the `If-None-Match` precondition
    pub fn is_precondition_rejection(&self) -> bool {
        match self.status {
            Some(PRECONDITION_FAILED_STATUS) => true,
            Some(200) => self.code == Some(PRECONDITION_FAILED_CODE),
            _ => false,
        }
    }

    /// Retriability by origin: rejected requests are final, everything else
    /// (service faults, transport failures) may be retried
    pub fn is_retriable(&self) -> bool {
        !matches!(self.origin, Some(ErrorOrigin::Client))
    }
}

/// Result of asking the backend whether the target object exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Exists,
    Absent,
    /// The probe itself failed
    Unavailable,
}

/// What the caller is told about a failed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Surface as a recoverable I/O failure
    Recoverable { retriable: bool },

    /// Another writer already produced the object
    TargetExists,

    /// Backend claimed the object exists but it cannot be found
    ConsistencyFault,
}

/// Whether classification of `signal` needs an existence probe first
pub fn requires_existence_probe(signal: &FailureSignal<'_>, conditional_writes: bool) -> bool {
    conditional_writes && signal.is_precondition_rejection()
}

/// Classify a failure from a commit-path call.
///
/// `probe` is consulted only when [`requires_existence_probe`] is true. A
/// missing or failed probe falls back to a retriable recoverable error,
/// since the outcome of the write is unknown.
pub fn classify(
    signal: &FailureSignal<'_>,
    conditional_writes: bool,
    probe: Option<ProbeOutcome>,
) -> FailureKind {
    if requires_existence_probe(signal, conditional_writes) {
        return match probe {
            Some(ProbeOutcome::Exists) => FailureKind::TargetExists,
            Some(ProbeOutcome::Absent) => FailureKind::ConsistencyFault,
            Some(ProbeOutcome::Unavailable) | None => FailureKind::Recoverable { retriable: true },
        };
    }

    FailureKind::Recoverable {
        retriable: signal.is_retriable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(status: u16, code: &str) -> FailureSignal<'_> {
        FailureSignal {
            status: Some(status),
            code: Some(code),
            origin: Some(ErrorOrigin::from_response(status, code)),
        }
    }

    #[test]
    fn test_precondition_rejection_forms() {
        assert!(signal(412, "PreconditionFailed").is_precondition_rejection());
        assert!(signal(412, "Whatever").is_precondition_rejection());
        assert!(signal(200, "PreconditionFailed").is_precondition_rejection());

        assert!(!signal(200, "InternalError").is_precondition_rejection());
        assert!(!signal(422, "PreconditionFailed").is_precondition_rejection());
        assert!(!signal(409, "ConditionalRequestConflict").is_precondition_rejection());
    }

    #[test]
    fn test_probe_only_with_conditional_writes() {
        let s = signal(412, "PreconditionFailed");
        assert!(requires_existence_probe(&s, true));
        assert!(!requires_existence_probe(&s, false));
    }

    #[test]
    fn test_classify_conditional_rejection() {
        let s = signal(412, "PreconditionFailed");
        assert_eq!(
            classify(&s, true, Some(ProbeOutcome::Exists)),
            FailureKind::TargetExists
        );
        assert_eq!(
            classify(&s, true, Some(ProbeOutcome::Absent)),
            FailureKind::ConsistencyFault
        );
        assert_eq!(
            classify(&s, true, Some(ProbeOutcome::Unavailable)),
            FailureKind::Recoverable { retriable: true }
        );

        let quirk = signal(200, "PreconditionFailed");
        assert_eq!(
            classify(&quirk, true, Some(ProbeOutcome::Exists)),
            FailureKind::TargetExists
        );
    }

    #[test]
    fn test_classify_without_conditional_policy() {
        let s = signal(412, "PreconditionFailed");
        assert_eq!(
            classify(&s, false, Some(ProbeOutcome::Exists)),
            FailureKind::Recoverable { retriable: false }
        );
    }

    #[test]
    fn test_classify_by_origin() {
        assert_eq!(
            classify(&signal(422, "Unprocessable"), true, None),
            FailureKind::Recoverable { retriable: false }
        );
        assert_eq!(
            classify(&signal(503, "SlowDown"), true, None),
            FailureKind::Recoverable { retriable: true }
        );

        let transport = FailureSignal {
            status: None,
            code: None,
            origin: None,
        };
        assert_eq!(
            classify(&transport, true, None),
            FailureKind::Recoverable { retriable: true }
        );
    }

    #[test]
    fn test_signal_from_error() {
        let err = S3Error::client(412, PRECONDITION_FAILED_CODE, "At least one precondition failed")
            .context("Failed to complete multipart upload");
        let s = FailureSignal::from_error(&err);
        assert_eq!(s.status, Some(412));
        assert_eq!(s.code, Some(PRECONDITION_FAILED_CODE));
        assert_eq!(s.origin, Some(ErrorOrigin::Client));
    }
}
