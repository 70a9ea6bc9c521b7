use std::sync::Mutex;

use tracing::{info, warn};

use crate::error::Result;

/// A single outbound notification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutboundEmail {
    pub fn welcome(to: &str, user_id: &str) -> Self {
        let link = format!("http://localhost:3000/verify?token={}", user_id);
        Self {
            to: to.to_string(),
            subject: "Welcome to Event Manager!".to_string(),
            html: format!(
                "<h1>Welcome to Event Manager</h1>\
                 <p>Your account has been created successfully.</p>\
                 <p><a href=\"{link}\">Verify your email</a></p>"
            ),
        }
    }

    pub fn event_approved(to: &str, event_title: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("Your event \"{}\" has been approved!", event_title),
            html: format!(
                "<h1>Event Approved</h1>\
                 <p>Your event <strong>{event_title}</strong> has been approved \
                 and is now visible to attendees.</p>"
            ),
        }
    }
}

/// Outbound email transport.
///
/// Implementations must be cheap to call from a request handler; anything slow
/// belongs on a background task inside the implementation.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Mailer that records deliveries in the log instead of talking SMTP.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    fn send(&self, email: &OutboundEmail) -> Result<()> {
        info!(from = %self.from, to = %email.to, subject = %email.subject, "[mock] email sent");
        Ok(())
    }
}

/// Mailer that keeps every message in memory. Used by tests across the workspace.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: &OutboundEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Fire-and-forget delivery: failures are logged and swallowed so they can
/// never fail the mutation that triggered them.
pub fn deliver(mailer: &dyn Mailer, email: OutboundEmail) {
    if let Err(e) = mailer.send(&email) {
        warn!(to = %email.to, subject = %email.subject, error = %e, "email delivery failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventHubError;

    struct FailingMailer;

    impl Mailer for FailingMailer {
        fn send(&self, _email: &OutboundEmail) -> Result<()> {
            Err(EventHubError::Mail("smtp down".into()))
        }
    }

    #[test]
    fn approval_subject_names_the_event() {
        let email = OutboundEmail::event_approved("o@x.io", "Rust Night");
        assert_eq!(email.subject, "Your event \"Rust Night\" has been approved!");
    }

    #[test]
    fn deliver_swallows_failures() {
        deliver(&FailingMailer, OutboundEmail::welcome("a@x.io", "u1"));
    }

    #[test]
    fn memory_mailer_records() {
        let m = MemoryMailer::default();
        deliver(&m, OutboundEmail::welcome("a@x.io", "u1"));
        assert_eq!(m.sent().len(), 1);
        assert_eq!(m.sent()[0].to, "a@x.io");
    }
}
