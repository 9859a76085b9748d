use std::sync::Mutex;

use tracing::info;

use crate::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub link: String,
}

/// Outgoing account mail (confirmation and password-reset links).
pub trait Mailer: Send + Sync {
    fn send(&self, mail: Mail) -> AppResult<()>;
}

/// Writes mail to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, Mail { to, subject, link }: Mail) -> AppResult<()> {
        info!(%to, %subject, %link, "mail");
        Ok(())
    }
}

/// Keeps every mail in memory so tests can follow the links.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn last_link_to(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find(|mail| mail.to == to).map(|mail| mail.link)
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: Mail) -> AppResult<()> {
        self.sent
            .lock()
            .map_err(|_| "mailer lock poisoned")?
            .push(mail);
        Ok(())
    }
}
