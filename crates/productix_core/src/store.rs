//! Tenant-scoped access to products, batches and shift records.
//!
//! Every method takes the caller's organization. A row owned by another
//! organization is indistinguishable from a missing one. Deletes cascade:
//! a product takes its batches with it, a batch takes its shifts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::ProductixError;
use crate::model::{
    AnalysisId, AnalysisKind, AnalysisRecord, Batch, BatchId, BatchStatus, BatchUpdate,
    NewAnalysisRecord, NewBatch, NewProduct, NewShift, OrgId, Product, ProductId, ProductUpdate,
    ShiftId, ShiftRecord, ShiftUpdate,
};

#[async_trait]
pub trait ProductionStore: Send + Sync + 'static {
    async fn list_products(&self, org: OrgId) -> Result<Vec<Product>, ProductixError>;
    async fn get_product(&self, org: OrgId, id: ProductId) -> Result<Product, ProductixError>;
    async fn create_product(
        &self,
        org: OrgId,
        product: NewProduct,
    ) -> Result<Product, ProductixError>;
    async fn update_product(
        &self,
        org: OrgId,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ProductixError>;
    async fn delete_product(&self, org: OrgId, id: ProductId) -> Result<(), ProductixError>;

    /// All batches of the organization, or of one of its products.
    async fn list_batches(
        &self,
        org: OrgId,
        product: Option<ProductId>,
    ) -> Result<Vec<Batch>, ProductixError>;
    async fn get_batch(&self, org: OrgId, id: BatchId) -> Result<Batch, ProductixError>;
    /// Assigns the next `BATCH-NNN` number for the product.
    async fn create_batch(&self, org: OrgId, batch: NewBatch) -> Result<Batch, ProductixError>;
    /// Fails with `Conflict` when the batch is already closed.
    async fn close_batch(
        &self,
        org: OrgId,
        id: BatchId,
        today: NaiveDate,
    ) -> Result<Batch, ProductixError>;
    /// Fails with `Conflict` when the new number is taken by another batch of
    /// the same product.
    async fn update_batch(
        &self,
        org: OrgId,
        id: BatchId,
        update: BatchUpdate,
    ) -> Result<Batch, ProductixError>;
    async fn delete_batch(&self, org: OrgId, id: BatchId) -> Result<(), ProductixError>;

    async fn list_shifts(
        &self,
        org: OrgId,
        batch: BatchId,
    ) -> Result<Vec<ShiftRecord>, ProductixError>;
    async fn list_org_shifts(&self, org: OrgId) -> Result<Vec<ShiftRecord>, ProductixError>;
    /// Fails with `Conflict` when the target batch is closed.
    async fn record_shift(
        &self,
        org: OrgId,
        shift: NewShift,
    ) -> Result<ShiftRecord, ProductixError>;
    async fn get_shift(&self, org: OrgId, id: ShiftId) -> Result<ShiftRecord, ProductixError>;
    /// Shifts of closed batches are read-only (`Conflict`).
    async fn update_shift(
        &self,
        org: OrgId,
        id: ShiftId,
        update: ShiftUpdate,
    ) -> Result<ShiftRecord, ProductixError>;
    async fn delete_shift(&self, org: OrgId, id: ShiftId) -> Result<(), ProductixError>;

    async fn save_analysis(
        &self,
        org: OrgId,
        record: NewAnalysisRecord,
    ) -> Result<AnalysisRecord, ProductixError>;
    /// Newest first.
    async fn list_analyses(
        &self,
        org: OrgId,
        kind: Option<AnalysisKind>,
    ) -> Result<Vec<AnalysisRecord>, ProductixError>;
}

/// Next sequence label after the highest numeric suffix among `existing`.
pub fn next_batch_number<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let last = existing
        .into_iter()
        .filter_map(|n| n.rsplit('-').next())
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("BATCH-{:03}", last + 1)
}

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    batches: BTreeMap<BatchId, Batch>,
    shifts: BTreeMap<ShiftId, ShiftRecord>,
    analyses: BTreeMap<AnalysisId, AnalysisRecord>,
    next_product: ProductId,
    next_batch: BatchId,
    next_shift: ShiftId,
    next_analysis: AnalysisId,
}

impl Tables {
    fn product(&self, org: OrgId, id: ProductId) -> Result<&Product, ProductixError> {
        self.products
            .get(&id)
            .filter(|p| p.organization_id == org)
            .ok_or_else(|| ProductixError::not_found("product", id))
    }

    fn batch(&self, org: OrgId, id: BatchId) -> Result<&Batch, ProductixError> {
        self.batches
            .get(&id)
            .filter(|b| b.organization_id == org)
            .ok_or_else(|| ProductixError::not_found("batch", id))
    }

    fn shift(&self, org: OrgId, id: ShiftId) -> Result<&ShiftRecord, ProductixError> {
        self.shifts
            .get(&id)
            .filter(|s| s.organization_id == org)
            .ok_or_else(|| ProductixError::not_found("shift", id))
    }

    /// The shift's batch, which must still accept changes.
    fn open_batch_of(&self, org: OrgId, shift: ShiftId) -> Result<&Batch, ProductixError> {
        let batch = self.batch(org, self.shift(org, shift)?.batch_id)?;
        if !batch.is_open() {
            return Err(ProductixError::Conflict(format!(
                "batch {} is closed",
                batch.batch_number
            )));
        }
        Ok(batch)
    }
}

fn non_blank(value: &str, what: &str) -> Result<String, ProductixError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProductixError::InvalidInput(format!(
            "{what} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Process-local store guarded by a tokio `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductionStore for InMemoryStore {
    async fn list_products(&self, org: OrgId) -> Result<Vec<Product>, ProductixError> {
        let t = self.tables.read().await;
        Ok(t.products
            .values()
            .filter(|p| p.organization_id == org)
            .cloned()
            .collect())
    }

    async fn get_product(&self, org: OrgId, id: ProductId) -> Result<Product, ProductixError> {
        self.tables.read().await.product(org, id).cloned()
    }

    async fn create_product(
        &self,
        org: OrgId,
        product: NewProduct,
    ) -> Result<Product, ProductixError> {
        let name = non_blank(&product.name, "product name")?;
        let mut t = self.tables.write().await;
        t.next_product += 1;
        let created = Product {
            id: t.next_product,
            organization_id: org,
            name,
            description: product.description,
            input_fields: product.input_fields,
            output_fields: product.output_fields,
        };
        t.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        org: OrgId,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ProductixError> {
        let name = update
            .name
            .as_deref()
            .map(|n| non_blank(n, "product name"))
            .transpose()?;
        let mut t = self.tables.write().await;
        t.product(org, id)?;
        let product = t
            .products
            .get_mut(&id)
            .ok_or_else(|| ProductixError::not_found("product", id))?;
        if let Some(name) = name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        if let Some(fields) = update.input_fields {
            product.input_fields = fields;
        }
        if let Some(fields) = update.output_fields {
            product.output_fields = fields;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, org: OrgId, id: ProductId) -> Result<(), ProductixError> {
        let mut t = self.tables.write().await;
        t.product(org, id)?;
        let batch_ids: Vec<BatchId> = t
            .batches
            .values()
            .filter(|b| b.organization_id == org && b.product_id == id)
            .map(|b| b.id)
            .collect();
        t.shifts.retain(|_, s| !batch_ids.contains(&s.batch_id));
        t.batches.retain(|_, b| !batch_ids.contains(&b.id));
        t.products.remove(&id);
        Ok(())
    }

    async fn list_batches(
        &self,
        org: OrgId,
        product: Option<ProductId>,
    ) -> Result<Vec<Batch>, ProductixError> {
        let t = self.tables.read().await;
        if let Some(product_id) = product {
            t.product(org, product_id)?;
        }
        Ok(t.batches
            .values()
            .filter(|b| b.organization_id == org)
            .filter(|b| product.is_none_or(|p| b.product_id == p))
            .cloned()
            .collect())
    }

    async fn get_batch(&self, org: OrgId, id: BatchId) -> Result<Batch, ProductixError> {
        self.tables.read().await.batch(org, id).cloned()
    }

    async fn create_batch(&self, org: OrgId, batch: NewBatch) -> Result<Batch, ProductixError> {
        if batch.end_date.is_some_and(|end| end < batch.start_date) {
            return Err(ProductixError::InvalidInput(
                "end_date precedes start_date".into(),
            ));
        }
        let mut t = self.tables.write().await;
        t.product(org, batch.product_id)?;
        let batch_number = next_batch_number(
            t.batches
                .values()
                .filter(|b| b.organization_id == org && b.product_id == batch.product_id)
                .map(|b| b.batch_number.as_str()),
        );
        t.next_batch += 1;
        let created = Batch {
            id: t.next_batch,
            organization_id: org,
            product_id: batch.product_id,
            batch_number,
            start_date: batch.start_date,
            end_date: batch.end_date,
            status: BatchStatus::Open,
        };
        t.batches.insert(created.id, created.clone());
        Ok(created)
    }

    async fn close_batch(
        &self,
        org: OrgId,
        id: BatchId,
        today: NaiveDate,
    ) -> Result<Batch, ProductixError> {
        let mut t = self.tables.write().await;
        t.batch(org, id)?;
        let batch = t
            .batches
            .get_mut(&id)
            .ok_or_else(|| ProductixError::not_found("batch", id))?;
        if batch.status == BatchStatus::Closed {
            return Err(ProductixError::Conflict(format!(
                "batch {} already closed",
                batch.batch_number
            )));
        }
        batch.status = BatchStatus::Closed;
        batch.end_date = Some(today);
        Ok(batch.clone())
    }

    async fn update_batch(
        &self,
        org: OrgId,
        id: BatchId,
        update: BatchUpdate,
    ) -> Result<Batch, ProductixError> {
        let number = update
            .batch_number
            .as_deref()
            .map(|n| non_blank(n, "batch number"))
            .transpose()?;
        let mut t = self.tables.write().await;
        let current = t.batch(org, id)?;
        let start = update.start_date.unwrap_or(current.start_date);
        let end = update.end_date.or(current.end_date);
        if end.is_some_and(|end| end < start) {
            return Err(ProductixError::InvalidInput(
                "end_date precedes start_date".into(),
            ));
        }
        if let Some(number) = &number {
            let product_id = current.product_id;
            let taken = t.batches.values().any(|b| {
                b.id != id
                    && b.organization_id == org
                    && b.product_id == product_id
                    && &b.batch_number == number
            });
            if taken {
                return Err(ProductixError::Conflict(format!(
                    "batch number {number} already in use"
                )));
            }
        }
        let batch = t
            .batches
            .get_mut(&id)
            .ok_or_else(|| ProductixError::not_found("batch", id))?;
        if let Some(number) = number {
            batch.batch_number = number;
        }
        batch.start_date = start;
        batch.end_date = end;
        if let Some(status) = update.status {
            batch.status = status;
        }
        Ok(batch.clone())
    }

    async fn delete_batch(&self, org: OrgId, id: BatchId) -> Result<(), ProductixError> {
        let mut t = self.tables.write().await;
        t.batch(org, id)?;
        t.shifts.retain(|_, s| s.batch_id != id);
        t.batches.remove(&id);
        Ok(())
    }

    async fn list_shifts(
        &self,
        org: OrgId,
        batch: BatchId,
    ) -> Result<Vec<ShiftRecord>, ProductixError> {
        let t = self.tables.read().await;
        t.batch(org, batch)?;
        let mut shifts: Vec<ShiftRecord> = t
            .shifts
            .values()
            .filter(|s| s.batch_id == batch && s.organization_id == org)
            .cloned()
            .collect();
        shifts.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(shifts)
    }

    async fn list_org_shifts(&self, org: OrgId) -> Result<Vec<ShiftRecord>, ProductixError> {
        let t = self.tables.read().await;
        let mut shifts: Vec<ShiftRecord> = t
            .shifts
            .values()
            .filter(|s| s.organization_id == org)
            .cloned()
            .collect();
        shifts.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(shifts)
    }

    async fn record_shift(
        &self,
        org: OrgId,
        shift: NewShift,
    ) -> Result<ShiftRecord, ProductixError> {
        let label = non_blank(&shift.shift_label, "shift label")?;
        let mut t = self.tables.write().await;
        let batch = t.batch(org, shift.batch_id)?;
        if !batch.is_open() {
            return Err(ProductixError::Conflict(format!(
                "batch {} is closed",
                batch.batch_number
            )));
        }
        t.next_shift += 1;
        let created = ShiftRecord {
            id: t.next_shift,
            organization_id: org,
            batch_id: shift.batch_id,
            date: shift.date,
            shift_label: label,
            input_materials: shift.input_materials,
            output_products: shift.output_products,
            notes: shift.notes,
        };
        t.shifts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_shift(&self, org: OrgId, id: ShiftId) -> Result<ShiftRecord, ProductixError> {
        self.tables.read().await.shift(org, id).cloned()
    }

    async fn update_shift(
        &self,
        org: OrgId,
        id: ShiftId,
        update: ShiftUpdate,
    ) -> Result<ShiftRecord, ProductixError> {
        let label = update
            .shift_label
            .as_deref()
            .map(|l| non_blank(l, "shift label"))
            .transpose()?;
        let mut t = self.tables.write().await;
        t.open_batch_of(org, id)?;
        let shift = t
            .shifts
            .get_mut(&id)
            .ok_or_else(|| ProductixError::not_found("shift", id))?;
        if let Some(date) = update.date {
            shift.date = date;
        }
        if let Some(label) = label {
            shift.shift_label = label;
        }
        if let Some(inputs) = update.input_materials {
            shift.input_materials = inputs;
        }
        if let Some(outputs) = update.output_products {
            shift.output_products = outputs;
        }
        if let Some(notes) = update.notes {
            shift.notes = Some(notes);
        }
        Ok(shift.clone())
    }

    async fn delete_shift(&self, org: OrgId, id: ShiftId) -> Result<(), ProductixError> {
        let mut t = self.tables.write().await;
        t.open_batch_of(org, id)?;
        t.shifts.remove(&id);
        Ok(())
    }

    async fn save_analysis(
        &self,
        org: OrgId,
        record: NewAnalysisRecord,
    ) -> Result<AnalysisRecord, ProductixError> {
        let mut t = self.tables.write().await;
        t.next_analysis += 1;
        let saved = AnalysisRecord {
            id: t.next_analysis,
            organization_id: org,
            kind: record.kind,
            batch_id: record.batch_id,
            created_at: Utc::now(),
            payload: record.payload,
        };
        t.analyses.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn list_analyses(
        &self,
        org: OrgId,
        kind: Option<AnalysisKind>,
    ) -> Result<Vec<AnalysisRecord>, ProductixError> {
        let t = self.tables.read().await;
        Ok(t.analyses
            .values()
            .rev()
            .filter(|a| a.organization_id == org)
            .filter(|a| kind.is_none_or(|k| a.kind == k))
            .cloned()
            .collect())
    }
}
