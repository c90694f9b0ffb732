//! `email-alert`: send one email outside of a monitoring cycle

use anyhow::{Context, Result};
use monitor_lib::alert::{EmailNotifier, Notifier};
use monitor_lib::config::EmailConfig;

use crate::output::print_success;

pub async fn run(config: EmailConfig, subject: &str, message: &str) -> Result<()> {
    let recipient = config.recipient.clone();
    EmailNotifier::new(config)
        .send(subject, message)
        .await
        .context("Failed to send email alert")?;

    print_success(&format!("Email alert sent to {}", recipient));
    Ok(())
}
