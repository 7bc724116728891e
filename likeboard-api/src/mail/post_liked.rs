use crate::{
    likes::PostLikedNotifier,
    mail::{Email, MailError},
};
use likeboard_common::{
    model::{
        Id,
        post::{Post, PostMarker},
        user::{EmailAddress, User},
    },
    util::truncate_with_ellipsis,
};
use tera::{Context, Tera};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

pub const SUBJECT: &str = "Post Liked Notification";
pub const PREVIEW_LEN: usize = 120;

const TEMPLATE_NAME: &str = "post_liked.md";
const TEMPLATE: &str = r#"# 👍 {{ liker }} liked your post!

Hi {{ owner | default(value="there") }},

Your post received a like from **{{ liker }}**:

> "{{ preview }}"

View all posts: {{ posts_url }}

Thanks,
{{ app_name }}
"#;

/// Everything needed to tell a post owner about a new like.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostLikedMail {
    pub recipient: EmailAddress,
    pub owner_name: Option<String>,
    pub liker_name: String,
    pub post_id: Id<PostMarker>,
    pub post_content: String,
}

impl PostLikedMail {
    /// `None` if the post owner cannot be mailed.
    #[must_use]
    pub fn new(post: &Post, liker: &User) -> Option<Self> {
        let recipient = post.author.email.clone()?;
        let owner_name = Some(post.author.handle.get())
            .filter(|handle| !handle.is_empty())
            .map(str::to_owned);

        Some(Self {
            recipient,
            owner_name,
            liker_name: liker.handle.get().to_owned(),
            post_id: post.id,
            post_content: post.content.get().to_owned(),
        })
    }
}

pub struct MailRenderer {
    tera: Tera,
    app_name: String,
    posts_url: String,
}

impl MailRenderer {
    pub fn new(app_name: &str, app_url: &str) -> Result<Self, MailError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;

        Ok(Self {
            tera,
            app_name: app_name.to_owned(),
            posts_url: format!("{}/posts", app_url.trim_end_matches('/')),
        })
    }

    pub fn render(&self, mail: &PostLikedMail) -> Result<Email, MailError> {
        let mut context = Context::new();
        context.insert("liker", &mail.liker_name);
        if let Some(owner) = &mail.owner_name {
            context.insert("owner", owner);
        }
        context.insert(
            "preview",
            &truncate_with_ellipsis(&mail.post_content, PREVIEW_LEN),
        );
        context.insert("posts_url", &self.posts_url);
        context.insert("app_name", &self.app_name);

        Ok(Email {
            to: mail.recipient.clone(),
            subject: SUBJECT.to_owned(),
            body: self.tera.render(TEMPLATE_NAME, &context)?,
        })
    }
}

/// Hands "post liked" mails to the worker without waiting for delivery.
#[derive(Clone, Debug)]
pub struct MailQueue {
    sender: UnboundedSender<PostLikedMail>,
}

impl MailQueue {
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<PostLikedMail>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PostLikedNotifier for MailQueue {
    fn notify_post_liked(&self, post: &Post, liker: &User) {
        let Some(mail) = PostLikedMail::new(post, liker) else {
            debug!(post = %post.id, "Post owner has no email address");
            return;
        };

        if self.sender.send(mail).is_err() {
            warn!(post = %post.id, "Mail queue is closed, dropping notification");
        }
    }
}
