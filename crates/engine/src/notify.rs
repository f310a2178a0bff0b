//! Notifications sent to a dispatch creator when the workflow treats their
//! dispatch.
//!
//! Two channels are used:
//!
//! - a live event pushed through a [`LiveChannel`], best effort, skipped when
//!   the recipient has no open connection;
//! - an email through a [`Mailer`], the durable channel. Delivery runs on its
//!   own task and is retried according to [`RetryPolicy`]; failures are
//!   logged and never reach the workflow caller.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Name of the live event emitted when a dispatch is approved or rejected.
pub const DISPATCH_TREATED: &str = "dispatch-treated";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail rejected: {0}")]
    Rejected(String),
}

/// Event pushed to a user's live connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LiveEvent {
    pub event: String,
    pub data: LivePayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LivePayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl LiveEvent {
    pub fn dispatch_treated(message: String, otp: Option<String>) -> Self {
        Self {
            event: DISPATCH_TREATED.to_string(),
            data: LivePayload { message, otp },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &Mail) -> Result<(), NotifyError>;
}

/// Capability to reach a user over their live connection.
///
/// The transport layer owns the connections; the engine only pushes.
pub trait LiveChannel: Send + Sync {
    /// Returns `false` when the user has no open connection.
    fn push(&self, user_id: &str, event: &LiveEvent) -> bool;
}

/// Mailer that only logs. Used when no mail relay is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &Mail) -> Result<(), NotifyError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "mail (not sent, no relay configured)");
        Ok(())
    }
}

/// Live channel with nobody connected.
#[derive(Clone, Copy, Debug, Default)]
pub struct Offline;

impl LiveChannel for Offline {
    fn push(&self, _user_id: &str, _event: &LiveEvent) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling each time.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// What to tell the creator of a dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchNotice {
    pub dispatch_id: Uuid,
    pub recipient_id: String,
    pub recipient_email: Option<String>,
    pub subject: String,
    pub message: String,
    pub otp: Option<String>,
}

impl DispatchNotice {
    fn mail_body(&self) -> String {
        match &self.otp {
            Some(otp) => format!("{}\n\nOne-time passcode: {otp}", self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    live: Arc<dyn LiveChannel>,
    retry: RetryPolicy,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(LogMailer), Arc::new(Offline))
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, live: Arc<dyn LiveChannel>) -> Self {
        Self {
            mailer,
            live,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pushes the live event right away and hands the email to a background
    /// task. The returned handle resolves to whether the email went out; it
    /// is `None` when the recipient has no address.
    pub fn deliver(&self, notice: DispatchNotice) -> Option<JoinHandle<bool>> {
        let event = LiveEvent::dispatch_treated(notice.message.clone(), notice.otp.clone());
        if !self.live.push(&notice.recipient_id, &event) {
            tracing::debug!(
                user = %notice.recipient_id,
                dispatch = %notice.dispatch_id,
                "no live connection, skipping live notification"
            );
        }

        let Some(to) = notice.recipient_email.clone() else {
            tracing::warn!(
                user = %notice.recipient_id,
                dispatch = %notice.dispatch_id,
                "recipient has no email address"
            );
            return None;
        };

        let mail = Mail {
            to,
            subject: notice.subject.clone(),
            body: notice.mail_body(),
        };
        let mailer = Arc::clone(&self.mailer);
        let retry = self.retry.clone();
        let dispatch_id = notice.dispatch_id;
        Some(tokio::spawn(async move {
            send_with_retry(mailer.as_ref(), &mail, &retry, dispatch_id).await
        }))
    }
}

async fn send_with_retry(
    mailer: &dyn Mailer,
    mail: &Mail,
    retry: &RetryPolicy,
    dispatch_id: Uuid,
) -> bool {
    let max_attempts = retry.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match mailer.send(mail).await {
            Ok(()) => return true,
            Err(err) if attempt < max_attempts => {
                tracing::warn!(dispatch = %dispatch_id, attempt, "mail delivery failed: {err}");
                tokio::time::sleep(retry.backoff(attempt)).await;
            }
            Err(err) => {
                tracing::error!(
                    dispatch = %dispatch_id,
                    attempts = max_attempts,
                    "giving up on mail delivery: {err}"
                );
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    struct FlakyMailer {
        failures: u32,
        calls: AtomicU32,
        sent: Mutex<Vec<Mail>>,
    }

    impl FlakyMailer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, mail: &Mail) -> Result<(), NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(NotifyError::Transport("connection reset".to_string()));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, LiveEvent)>>);

    impl LiveChannel for Recorder {
        fn push(&self, user_id: &str, event: &LiveEvent) -> bool {
            self.0
                .lock()
                .unwrap()
                .push((user_id.to_string(), event.clone()));
            true
        }
    }

    fn notice(email: Option<&str>) -> DispatchNotice {
        DispatchNotice {
            dispatch_id: Uuid::new_v4(),
            recipient_id: "manager".to_string(),
            recipient_email: email.map(ToString::to_string),
            subject: "Dispatch approved".to_string(),
            message: "Dispatch to Nakuru approved".to_string(),
            otp: Some("4821".to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_mail_goes_out() {
        let mailer = Arc::new(FlakyMailer::new(2));
        let notifier = Notifier::new(mailer.clone(), Arc::new(Offline));

        let handle = notifier.deliver(notice(Some("m@example.com"))).unwrap();
        assert!(handle.await.unwrap());
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].to, "m@example.com");
        assert!(sent[0].body.contains("One-time passcode: 4821"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mailer = Arc::new(FlakyMailer::new(u32::MAX));
        let notifier = Notifier::new(mailer.clone(), Arc::new(Offline)).retry(RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(10),
        });

        let handle = notifier.deliver(notice(Some("m@example.com"))).unwrap();
        assert!(!handle.await.unwrap());
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn live_event_is_pushed_even_without_email() {
        let live = Arc::new(Recorder::default());
        let notifier = Notifier::new(Arc::new(LogMailer), live.clone());

        assert!(notifier.deliver(notice(None)).is_none());

        let pushed = live.0.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].0, "manager");
        assert_eq!(pushed[0].1.event, DISPATCH_TREATED);
        assert_eq!(pushed[0].1.data.otp.as_deref(), Some("4821"));
    }

    #[test]
    fn backoff_doubles() {
        let retry = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn live_event_serializes_without_missing_otp() {
        let event = LiveEvent::dispatch_treated("rejected".to_string(), None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "dispatch-treated", "data": {"message": "rejected"}})
        );
    }
}
