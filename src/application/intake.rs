use crate::domain::ports::{NotifierRef, SponsorshipStoreRef};
use crate::domain::sponsorship::{
    ListFilter, ReviewUpdate, SponsorshipApplication, SponsorshipSubmission,
};
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::{info, warn};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Sponsorship application intake and review surface.
pub struct IntakeService {
    store: SponsorshipStoreRef,
    notifier: NotifierRef,
}

impl IntakeService {
    pub fn new(store: SponsorshipStoreRef, notifier: NotifierRef) -> Self {
        Self { store, notifier }
    }

    /// Structural validation, then the uniqueness precondition, then insert.
    ///
    /// The precondition is check-then-insert without a transaction spanning
    /// both; two near-simultaneous identical submissions can both pass the
    /// check. That narrow window is an accepted limitation of the store
    /// contract.
    pub async fn submit(
        &self,
        submission: SponsorshipSubmission,
    ) -> Result<SponsorshipApplication> {
        submission.validate().map_err(Error::Validation)?;

        let email = submission.email.to_lowercase();
        if let Some(existing) = self
            .store
            .find_active_duplicate(&email, &submission.company_name)
            .await?
        {
            return Err(Error::Conflict {
                existing_id: existing.id,
            });
        }

        let application = SponsorshipApplication::from_submission(submission);
        self.store.insert(application.clone()).await?;
        info!(
            application_id = %application.id,
            company = %application.company_name,
            "sponsorship application received"
        );

        if let Err(err) = self.notifier.application_received(&application).await {
            warn!(
                application_id = %application.id,
                error = %err,
                "submission confirmation failed, application is unaffected"
            );
        }
        Ok(application)
    }

    pub async fn get(&self, id: &str) -> Result<Option<SponsorshipApplication>> {
        self.store.get(id).await
    }

    /// Offset-paginated listing, newest first.
    pub async fn list(
        &self,
        filter: ListFilter,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Result<(Vec<SponsorshipApplication>, PaginationMeta)> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let skip = (page - 1) * limit;

        let (records, total_count) = self.store.list(&filter, skip, limit).await?;
        let total_pages = total_count.div_ceil(limit);
        let meta = PaginationMeta {
            current_page: page,
            total_pages,
            total_count,
            has_next: page < total_pages,
            has_prev: page > 1,
        };
        Ok((records, meta))
    }

    /// Reviewer update. Only the whitelisted fields can change; anything else
    /// in the request is ignored, not rejected.
    pub async fn update_review(
        &self,
        id: &str,
        update: ReviewUpdate,
    ) -> Result<Option<SponsorshipApplication>> {
        self.store.update_review(id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }
}
