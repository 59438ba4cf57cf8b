//! Notifier that writes to the log instead of a messaging service.

use sunhash_app::ports::Notifier;
use sunhash_domain::error::SunHashError;
use sunhash_domain::id::NotifierId;
use sunhash_domain::notification::{Notification, Severity};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        notifier: NotifierId,
        notification: Notification,
    ) -> Result<(), SunHashError> {
        let Notification {
            title,
            message,
            severity,
            timestamp,
        } = notification;
        match severity {
            Severity::Info => {
                tracing::info!(%notifier, %timestamp, %title, "{message}");
            }
            Severity::Warning => {
                tracing::warn!(%notifier, %timestamp, %title, "{message}");
            }
            Severity::Error => {
                tracing::error!(%notifier, %timestamp, %title, "{message}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sunhash_domain::time::now;

    #[tokio::test]
    async fn should_accept_every_severity() {
        let notifier = TracingNotifier;
        for severity in [Severity::Info, Severity::Warning, Severity::Error] {
            let notification = Notification::new(severity, "Miner started", "S19 is hashing", now());
            assert!(notifier.notify(NotifierId::new(), notification).await.is_ok());
        }
    }
}
