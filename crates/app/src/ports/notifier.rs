//! Operator-facing messages.

use std::future::Future;

use sunhash_domain::error::SunHashError;
use sunhash_domain::id::NotifierId;
use sunhash_domain::notification::Notification;

/// Delivers [`Notification`]s to the channel registered under a notifier id.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        notifier: NotifierId,
        notification: Notification,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send;
}

impl<T: Notifier> Notifier for std::sync::Arc<T> {
    fn notify(
        &self,
        notifier: NotifierId,
        notification: Notification,
    ) -> impl Future<Output = Result<(), SunHashError>> + Send {
        (**self).notify(notifier, notification)
    }
}
