use crate::domain::order::OrderRecord;
use crate::domain::ports::Notifier;
use crate::domain::sponsorship::SponsorshipApplication;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Records confirmation dispatches as structured log events.
///
/// Template rendering and actual mail delivery live behind an external
/// collaborator; this keeps the dispatch seam (and its contained-failure
/// contract) without binding the service to a mail provider.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_completed(&self, order: &OrderRecord) -> Result<()> {
        info!(
            order_id = %order.order_id,
            recipient = %order.customer.email,
            "dispatching payment confirmation"
        );
        Ok(())
    }

    async fn application_received(&self, application: &SponsorshipApplication) -> Result<()> {
        info!(
            application_id = %application.id,
            recipient = %application.email,
            "dispatching submission confirmation"
        );
        Ok(())
    }
}
