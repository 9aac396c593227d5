//! Request data model: one [`WriteRequest`] per append, consumed entirely by
//! a single orchestrated retry loop.

use crate::error::WriteError;
use std::fmt;
use std::time::Duration;

/// Credentials for authenticating against the share host.
#[derive(Clone, Default)]
pub struct Credentials {
    pub principal: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Where the envelope key comes from. Exactly one variant is active.
#[derive(Debug, Clone)]
pub enum EncryptionSpec {
    /// A key bound to `alias` in a platform-managed secure store; raw key
    /// material never leaves the store abstraction. Envelope version 1.
    DeviceKey { alias: String },
    /// A key derived from the passphrase with a per-call random salt that is
    /// embedded in the envelope header. Envelope version 2.
    PassphraseKey { passphrase: String },
}

/// Options for spreadsheet targets.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetSpec {
    /// Protect the rewritten worksheet even when no password is given.
    pub protect: bool,
    /// Serialize into a password-protected container.
    pub password: Option<String>,
}

/// The two mutually exclusive payload-building strategies.
///
/// The envelope only exists in line mode; a spreadsheet's own password
/// protection is never combined with the generic envelope, and that rule is
/// enforced here by construction rather than checked at run time.
#[derive(Debug, Clone)]
pub enum PayloadFormat {
    /// Plain or enveloped line-oriented text.
    Line { encryption: Option<EncryptionSpec> },
    /// Full workbook rewrite.
    Spreadsheet(SpreadsheetSpec),
}

impl Default for PayloadFormat {
    fn default() -> Self {
        PayloadFormat::Line { encryption: None }
    }
}

/// Bounded retry with a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Sleep between attempts. There is no trailing delay after the final
    /// failed attempt.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, clamping `max_attempts` to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

/// One append operation against one remote target.
///
/// Created per invocation, consumed within one retry loop, then discarded;
/// it holds no state beyond the single operation.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// `scheme://host/share[/path...]`
    pub target_url: String,
    pub credentials: Credentials,
    /// Raw record, comma-separated fields. Embedded commas in a field are
    /// not supported; the spreadsheet builder splits on every comma.
    pub line: String,
    pub retry: RetryPolicy,
    /// Write via temp sibling and swap (default) instead of appending in
    /// place.
    pub atomic: bool,
    pub format: PayloadFormat,
}

impl WriteRequest {
    /// A request with the standard defaults: three attempts one second
    /// apart, atomic write, plain line mode, empty credentials.
    pub fn new(target_url: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            credentials: Credentials::default(),
            line: line.into(),
            retry: RetryPolicy::default(),
            atomic: true,
            format: PayloadFormat::default(),
        }
    }

    /// Reject requests with no target or no record before any worker is
    /// spawned or any attempt consumed.
    pub fn validate(&self) -> Result<(), WriteError> {
        if self.target_url.is_empty() || self.line.is_empty() {
            return Err(WriteError::MissingUrlOrLine);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_inbound_contract() {
        let req = WriteRequest::new("smb://h/s/f.csv", "a,b");
        assert_eq!(req.retry.max_attempts, 3);
        assert_eq!(req.retry.delay, Duration::from_millis(1000));
        assert!(req.atomic);
        assert!(matches!(req.format, PayloadFormat::Line { encryption: None }));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_url_or_line_is_rejected() {
        let req = WriteRequest::new("", "a,b");
        assert!(matches!(req.validate(), Err(WriteError::MissingUrlOrLine)));
        let req = WriteRequest::new("smb://h/s/f.csv", "");
        assert!(matches!(req.validate(), Err(WriteError::MissingUrlOrLine)));
    }

    #[test]
    fn retry_policy_clamps_to_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(5));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials::new("svc", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));
    }
}
