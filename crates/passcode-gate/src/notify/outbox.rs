//! Redis outbox sender.
//!
//! Mail jobs are pushed onto a Redis list; an external mailer pops them and
//! renders the template. The push succeeding is what counts as "dispatched".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passcode_common::{Identity, OtpError, OtpMail};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

use super::Notifier;

/// Job payload as read by the mailer
#[derive(Debug, Serialize)]
struct MailJob<'a> {
    to: &'a str,
    subject: &'a str,
    template: &'a str,
    variables: &'a OtpMail,
    queued_at: DateTime<Utc>,
}

/// Pushes mail jobs onto a Redis list
#[derive(Clone)]
pub struct OutboxNotifier {
    conn: ConnectionManager,
    queue: String,
}

impl OutboxNotifier {
    pub fn new(conn: ConnectionManager, queue: impl Into<String>) -> Self {
        Self {
            conn,
            queue: queue.into(),
        }
    }
}

fn encode_job(
    identity: &Identity,
    subject: &str,
    template_id: &str,
    mail: &OtpMail,
) -> Result<String, OtpError> {
    let job = MailJob {
        to: identity.as_str(),
        subject,
        template: template_id,
        variables: mail,
        queued_at: Utc::now(),
    };
    serde_json::to_string(&job).map_err(|e| OtpError::NotificationFailed(e.to_string()))
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(
        &self,
        identity: &Identity,
        subject: &str,
        template_id: &str,
        mail: &OtpMail,
    ) -> Result<(), OtpError> {
        let payload = encode_job(identity, subject, template_id, mail)?;

        let mut conn = self.conn.clone();
        let depth: u64 = conn
            .rpush(&self.queue, payload)
            .await
            .map_err(|e| OtpError::NotificationFailed(format!("outbox push failed: {e}")))?;

        tracing::info!(
            identity = %identity.masked(),
            template = template_id,
            queue = %self.queue,
            depth,
            "OTP mail queued"
        );

        Ok(())
    }
}
