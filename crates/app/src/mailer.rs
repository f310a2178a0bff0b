//! Email delivery through an HTTP mail relay.

use async_trait::async_trait;
use engine::{Mail, Mailer, NotifyError};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpMailer {
    client: Client,
    relay_url: String,
    from: String,
}

impl HttpMailer {
    pub fn new(client: Client, relay_url: String, from: String) -> Self {
        Self {
            client,
            relay_url,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &Mail) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.relay_url)
            .json(&RelayMessage {
                from: &self.from,
                to: &mail.to,
                subject: &mail.subject,
                text: &mail.body,
            })
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected(format!("{status}: {body}")))
    }
}
