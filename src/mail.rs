use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::users::account::mask_account_number;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeEmail {
    pub to: String,
    pub full_name: String,
    pub masked_account_number: String,
    pub login_url: String,
}

impl WelcomeEmail {
    pub fn new(to: &str, full_name: &str, account_number: &str, login_url: &str) -> Self {
        Self {
            to: to.to_owned(),
            full_name: full_name.to_owned(),
            masked_account_number: mask_account_number(account_number),
            login_url: login_url.to_owned(),
        }
    }

    pub fn subject(&self) -> &'static str {
        "Welcome to the Finance Platform! Your Account is Ready"
    }

    pub fn html_body(&self) -> String {
        format!(
            "<h1>Welcome, {name}!</h1>\
             <p>You have successfully registered for our Finance Platform.</p>\
             <p>Your new account number is: <strong>{account}</strong></p>\
             <p>Please log in to start managing your savings and credit.</p>\
             <p><a href=\"{url}\">Click here to Log In</a></p>",
            name = escape_html(&self.full_name),
            account = escape_html(&self.masked_account_number),
            url = escape_html(&self.login_url),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, email: &WelcomeEmail) -> anyhow::Result<()>;
}

/// Emits rendered messages through tracing instead of a mail transport.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, email: &WelcomeEmail) -> anyhow::Result<()> {
        info!(
            to = %email.to,
            subject = email.subject(),
            body = %email.html_body(),
            "welcome email sent"
        );
        Ok(())
    }
}

/// Sends on a detached task. Failures are logged and never reach the caller.
pub fn spawn_welcome(mailer: Arc<dyn Mailer>, email: WelcomeEmail) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send_welcome(&email).await {
            warn!(error = %e, to = %email.to, "failed to send welcome email");
        }
    });
}
