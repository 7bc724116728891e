//! Outgoing mail. Jobs arrive on a channel and are rendered and delivered by
//! [`run_worker`], off the request path.

mod post_liked;

pub use post_liked::{MailQueue, MailRenderer, PostLikedMail};

use likeboard_common::model::user::EmailAddress;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Rendering mail failed: {0}")]
    Render(#[from] tera::Error),
    #[error("Delivering mail to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Email {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync + 'static {
    fn deliver(&self, email: &Email) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Writes every message to the log instead of sending it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    #[must_use]
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

impl Mailer for LogMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = email.to.get(),
            subject = %email.subject,
            body = %email.body,
            "Mail delivered to log"
        );
        Ok(())
    }
}

/// Drains `queue` until every [`MailQueue`] handle is dropped. Failures are
/// logged and the job is dropped; nothing is retried.
#[instrument(skip_all)]
pub async fn run_worker<M: Mailer>(
    mut queue: UnboundedReceiver<PostLikedMail>,
    renderer: MailRenderer,
    mailer: M,
) {
    while let Some(mail) = queue.recv().await {
        let email = match renderer.render(&mail) {
            Ok(email) => email,
            Err(err) => {
                error!(error = %err, post = %mail.post_id, "Could not render mail");
                continue;
            }
        };

        if let Err(err) = mailer.deliver(&email).await {
            error!(error = %err, post = %mail.post_id, "Could not deliver mail");
        }
    }

    info!("Mail queue closed");
}
