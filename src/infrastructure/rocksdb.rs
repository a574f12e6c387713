use crate::domain::order::{CompletionDetails, CompletionOutcome, OrderRecord, OrderStatus};
use crate::domain::ports::{OrderStore, SponsorshipStore};
use crate::domain::sponsorship::{ListFilter, ReviewUpdate, SponsorshipApplication};
use crate::error::{Error, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for order records.
pub const CF_ORDERS: &str = "orders";
/// Column Family for sponsorship applications.
pub const CF_SPONSORSHIPS: &str = "sponsorships";

/// Persistent store backed by RocksDB, one Column Family per entity, values
/// as JSON documents.
///
/// RocksDB gives no multi-key transactions here, so read-modify-write
/// operations (conditional completion, review updates) serialize on a mutex;
/// `Clone` shares the underlying handle and the mutex.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates the database, ensuring both column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_sponsorships = ColumnFamilyDescriptor::new(CF_SPONSORSHIPS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_sponsorships])
            .map_err(|err| Error::Store(err.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Store(format!("column family {name} not found")))
    }

    fn put_json<T: serde::Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes =
            serde_json::to_vec(value).map_err(|err| Error::Store(err.to_string()))?;
        self.db
            .put_cf(&cf, key.as_bytes(), bytes)
            .map_err(|err| Error::Store(err.to_string()))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &str,
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let bytes = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|err| Error::Store(err.to_string()))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| Error::Store(err.to_string())),
            None => Ok(None),
        }
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|err| Error::Store(err.to_string()))?;
            let parsed =
                serde_json::from_slice(&value).map_err(|err| Error::Store(err.to_string()))?;
            values.push(parsed);
        }
        Ok(values)
    }
}

#[async_trait]
impl OrderStore for RocksDbStore {
    async fn insert(&self, order: OrderRecord) -> Result<()> {
        self.put_json(CF_ORDERS, &order.order_id, &order)
    }

    async fn get(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        self.get_json(CF_ORDERS, order_id)
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let orders: Vec<OrderRecord> = self.scan(CF_ORDERS)?;
        Ok(orders
            .into_iter()
            .find(|order| order.gateway_order_id.as_deref() == Some(gateway_order_id)))
    }

    async fn attach_session(
        &self,
        order_id: &str,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let _guard = self.write_guard.lock().await;
        let Some(mut order) = self.get_json::<OrderRecord>(CF_ORDERS, order_id)? else {
            return Ok(None);
        };
        order.gateway_order_id = Some(gateway_order_id.to_string());
        self.put_json(CF_ORDERS, order_id, &order)?;
        Ok(Some(order))
    }

    async fn complete_if_pending(
        &self,
        order_id: &str,
        details: CompletionDetails,
    ) -> Result<Option<CompletionOutcome>> {
        let _guard = self.write_guard.lock().await;
        let Some(mut order) = self.get_json::<OrderRecord>(CF_ORDERS, order_id)? else {
            return Ok(None);
        };
        if order.status == OrderStatus::Completed {
            return Ok(Some(CompletionOutcome::AlreadyCompleted(order)));
        }
        order.complete(details);
        self.put_json(CF_ORDERS, order_id, &order)?;
        Ok(Some(CompletionOutcome::Applied(order)))
    }

    async fn mark_failed(&self, order_id: &str, reason: &str) -> Result<Option<OrderRecord>> {
        let _guard = self.write_guard.lock().await;
        let Some(mut order) = self.get_json::<OrderRecord>(CF_ORDERS, order_id)? else {
            return Ok(None);
        };
        if order.fail(reason) {
            self.put_json(CF_ORDERS, order_id, &order)?;
        }
        Ok(Some(order))
    }
}

#[async_trait]
impl SponsorshipStore for RocksDbStore {
    async fn insert(&self, application: SponsorshipApplication) -> Result<()> {
        self.put_json(CF_SPONSORSHIPS, &application.id, &application)
    }

    async fn get(&self, id: &str) -> Result<Option<SponsorshipApplication>> {
        self.get_json(CF_SPONSORSHIPS, id)
    }

    async fn find_active_duplicate(
        &self,
        email: &str,
        company_name: &str,
    ) -> Result<Option<SponsorshipApplication>> {
        let applications: Vec<SponsorshipApplication> = self.scan(CF_SPONSORSHIPS)?;
        Ok(applications.into_iter().find(|application| {
            application.status.is_active()
                && application.email == email
                && application.company_name == company_name
        }))
    }

    async fn list(
        &self,
        filter: &ListFilter,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<SponsorshipApplication>, usize)> {
        let applications: Vec<SponsorshipApplication> = self.scan(CF_SPONSORSHIPS)?;
        let mut matching: Vec<SponsorshipApplication> = applications
            .into_iter()
            .filter(|application| filter.matches(application))
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
        let _guard = self.write_guard.lock().await;
        let Some(mut application) = self.get_json::<SponsorshipApplication>(CF_SPONSORSHIPS, id)?
        else {
            return Ok(None);
        };
        application.apply_review(update);
        self.put_json(CF_SPONSORSHIPS, id, &application)?;
        Ok(Some(application))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let existing = self.get_json::<SponsorshipApplication>(CF_SPONSORSHIPS, id)?;
        if existing.is_none() {
            return Ok(false);
        }
        let cf = self.cf(CF_SPONSORSHIPS)?;
        self.db
            .delete_cf(&cf, id.as_bytes())
            .map_err(|err| Error::Store(err.to_string()))?;
        Ok(true)
    }
}
