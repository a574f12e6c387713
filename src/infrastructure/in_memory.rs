use crate::domain::order::{CompletionDetails, CompletionOutcome, OrderRecord, OrderStatus};
use crate::domain::ports::{OrderStore, SponsorshipStore};
use crate::domain::sponsorship::{ListFilter, ReviewUpdate, SponsorshipApplication};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for order records.
///
/// The conditional completion update runs entirely inside one write lock, so
/// two racing reconciliation paths serialize on the status check.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, OrderRecord>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: OrderRecord) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).cloned())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| order.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn attach_session(
        &self,
        order_id: &str,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(order_id).map(|order| {
            order.gateway_order_id = Some(gateway_order_id.to_string());
            order.clone()
        }))
    }

    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: CompletionDetails,
    ) -> Result<Option<CompletionOutcome>> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(order_id).map(|order| {
            if order.status == OrderStatus::Completed {
                CompletionOutcome::AlreadyCompleted(order.clone())
            } else {
                order.complete(details);
                CompletionOutcome::Applied(order.clone())
            }
        }))
    }

    async fn mark_failed(&self, order_id: &str, reason: &str) -> Result<Option<OrderRecord>> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(order_id).map(|order| {
            order.fail(reason);
            order.clone()
        }))
    }
}

/// A thread-safe in-memory store for sponsorship applications.
#[derive(Default, Clone)]
pub struct InMemorySponsorshipStore {
    applications: Arc<RwLock<HashMap<String, SponsorshipApplication>>>,
}

impl InMemorySponsorshipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SponsorshipStore for InMemorySponsorshipStore {
    async fn insert(&self, application: SponsorshipApplication) -> Result<()> {
        let mut applications = self.applications.write().await;
        applications.insert(application.id.clone(), application);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SponsorshipApplication>> {
        let applications = self.applications.read().await;
        Ok(applications.get(id).cloned())
    }

    async fn find_active_duplicate(
        &self,
        email: &str,
        company_name: &str,
    ) -> Result<Option<SponsorshipApplication>> {
        let applications = self.applications.read().await;
        Ok(applications
            .values()
            .find(|application| {
                application.status.is_active()
                    && application.email == email
                    && application.company_name == company_name
            })
            .cloned())
    }

    async fn list(
        &self,
        filter: &ListFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<SponsorshipApplication>, usize)> {
        let applications = self.applications.read().await;
        let mut matching: Vec<SponsorshipApplication> = applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len();
        let page = matching.into_iter().skip(skip).take(limit).collect();
        Ok((page, total))
    }

    async fn update_review(
        &self,
        id: &str,
        update: ReviewUpdate,
    ) -> Result<Option<SponsorshipApplication>> {
        let mut applications = self.applications.write().await;
        Ok(applications.get_mut(id).map(|application| {
            application.apply_review(update);
            application.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut applications = self.applications.write().await;
        Ok(applications.remove(id).is_some())
    }
}
