//! Middleware layer for cross-cutting concerns around the production store.
//!
//! Every store call is timed, logged at debug level and recorded in the
//! `productix_store_operation_seconds` histogram.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use productix_core::observability;
use productix_core::{
    AnalysisKind, AnalysisRecord, Batch, BatchId, BatchUpdate, NewAnalysisRecord, NewBatch,
    NewProduct, NewShift, OrgId, Product, ProductId, ProductUpdate, ProductionStore,
    ProductixError, ShiftId, ShiftRecord, ShiftUpdate,
};
use tracing::debug;

/// Store wrapper that adds timing, logging and metrics.
#[derive(Clone)]
pub struct LoggingMiddleware<S: ProductionStore> {
    inner: Arc<S>,
}

impl<S: ProductionStore> LoggingMiddleware<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Execute a fallible store operation with logging.
    async fn with_logging<F, Fut, T>(
        &self,
        operation: F,
        name: &'static str,
        org: OrgId,
    ) -> Result<T, ProductixError>
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ProductixError>>,
    {
        let start = Instant::now();
        let result = operation(self.inner.clone()).await;
        let duration = start.elapsed();
        observability::record_store_operation(name, duration);

        match &result {
            Ok(_) => debug!(op = name, org, ?duration, "store operation completed"),
            Err(e) => debug!(op = name, org, ?duration, error = %e, "store operation failed"),
        }
        result
    }
}

#[async_trait::async_trait]
impl<S: ProductionStore> ProductionStore for LoggingMiddleware<S> {
    async fn list_products(&self, org: OrgId) -> Result<Vec<Product>, ProductixError> {
        self.with_logging(
            |store| async move { store.list_products(org).await },
            "list_products",
            org,
        )
        .await
    }

    async fn get_product(&self, org: OrgId, id: ProductId) -> Result<Product, ProductixError> {
        self.with_logging(
            |store| async move { store.get_product(org, id).await },
            "get_product",
            org,
        )
        .await
    }

    async fn create_product(
        &self,
        org: OrgId,
        product: NewProduct,
    ) -> Result<Product, ProductixError> {
        self.with_logging(
            |store| async move { store.create_product(org, product).await },
            "create_product",
            org,
        )
        .await
    }

    async fn update_product(
        &self,
        org: OrgId,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ProductixError> {
        self.with_logging(
            |store| async move { store.update_product(org, id, update).await },
            "update_product",
            org,
        )
        .await
    }

    async fn delete_product(&self, org: OrgId, id: ProductId) -> Result<(), ProductixError> {
        self.with_logging(
            |store| async move { store.delete_product(org, id).await },
            "delete_product",
            org,
        )
        .await
    }

    async fn list_batches(
        &self,
        org: OrgId,
        product: Option<ProductId>,
    ) -> Result<Vec<Batch>, ProductixError> {
        self.with_logging(
            |store| async move { store.list_batches(org, product).await },
            "list_batches",
            org,
        )
        .await
    }

    async fn get_batch(&self, org: OrgId, id: BatchId) -> Result<Batch, ProductixError> {
        self.with_logging(
            |store| async move { store.get_batch(org, id).await },
            "get_batch",
            org,
        )
        .await
    }

    async fn create_batch(&self, org: OrgId, batch: NewBatch) -> Result<Batch, ProductixError> {
        self.with_logging(
            |store| async move { store.create_batch(org, batch).await },
            "create_batch",
            org,
        )
        .await
    }

    async fn close_batch(
        &self,
        org: OrgId,
        id: BatchId,
        today: NaiveDate,
    ) -> Result<Batch, ProductixError> {
        self.with_logging(
            |store| async move { store.close_batch(org, id, today).await },
            "close_batch",
            org,
        )
        .await
    }

    async fn update_batch(
        &self,
        org: OrgId,
        id: BatchId,
        update: BatchUpdate,
    ) -> Result<Batch, ProductixError> {
        self.with_logging(
            |store| async move { store.update_batch(org, id, update).await },
            "update_batch",
            org,
        )
        .await
    }

    async fn delete_batch(&self, org: OrgId, id: BatchId) -> Result<(), ProductixError> {
        self.with_logging(
            |store| async move { store.delete_batch(org, id).await },
            "delete_batch",
            org,
        )
        .await
    }

    async fn list_shifts(
        &self,
        org: OrgId,
        batch: BatchId,
    ) -> Result<Vec<ShiftRecord>, ProductixError> {
        self.with_logging(
            |store| async move { store.list_shifts(org, batch).await },
            "list_shifts",
            org,
        )
        .await
    }

    async fn list_org_shifts(&self, org: OrgId) -> Result<Vec<ShiftRecord>, ProductixError> {
        self.with_logging(
            |store| async move { store.list_org_shifts(org).await },
            "list_org_shifts",
            org,
        )
        .await
    }

    async fn record_shift(
        &self,
        org: OrgId,
        shift: NewShift,
    ) -> Result<ShiftRecord, ProductixError> {
        self.with_logging(
            |store| async move { store.record_shift(org, shift).await },
            "record_shift",
            org,
        )
        .await
    }

    async fn get_shift(&self, org: OrgId, id: ShiftId) -> Result<ShiftRecord, ProductixError> {
        self.with_logging(
            |store| async move { store.get_shift(org, id).await },
            "get_shift",
            org,
        )
        .await
    }

    async fn update_shift(
        &self,
        org: OrgId,
        id: ShiftId,
        update: ShiftUpdate,
    ) -> Result<ShiftRecord, ProductixError> {
        self.with_logging(
            |store| async move { store.update_shift(org, id, update).await },
            "update_shift",
            org,
        )
        .await
    }

    async fn delete_shift(&self, org: OrgId, id: ShiftId) -> Result<(), ProductixError> {
        self.with_logging(
            |store| async move { store.delete_shift(org, id).await },
            "delete_shift",
            org,
        )
        .await
    }

    async fn save_analysis(
        &self,
        org: OrgId,
        record: NewAnalysisRecord,
    ) -> Result<AnalysisRecord, ProductixError> {
        self.with_logging(
            |store| async move { store.save_analysis(org, record).await },
            "save_analysis",
            org,
        )
        .await
    }

    async fn list_analyses(
        &self,
        org: OrgId,
        kind: Option<AnalysisKind>,
    ) -> Result<Vec<AnalysisRecord>, ProductixError> {
        self.with_logging(
            |store| async move { store.list_analyses(org, kind).await },
            "list_analyses",
            org,
        )
        .await
    }
}
