use async_trait::async_trait;

use super::ProjectEvent;

/// Receives every dispatched [`ProjectEvent`].
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use gatehouse::events::{Listener, ProjectEvent};
///
/// struct InviteMailer;
///
/// #[async_trait]
/// impl Listener for InviteMailer {
///     async fn handle(&self, event: &ProjectEvent) {
///         if let ProjectEvent::InviteCreated { email, .. } = event {
///             // queue the email
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn handle(&self, event: &ProjectEvent);
}
