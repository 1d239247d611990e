//! Bulk import of parsed transaction records and whole-company export
//!
//! The import collaborator hands over records already parsed from whatever
//! encoding it speaks (CSV, XML, JSON); only the transaction content
//! matters here. Rows are upserted keyed on (company, voucher number,
//! type), each row individually atomic, and failures are tallied without
//! aborting the batch.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{info, warn};

use std::sync::Arc;

use crate::traits::BooksStorage;
use crate::types::*;
use crate::voucher::store::{Channel, VoucherStore};
use crate::voucher::validate::PostingValidator;

/// A ledger or stock item referenced by name or by id
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NameOrId {
    Name(String),
    Id(i64),
}

/// One ledger leg of an import record
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImportLedgerLeg {
    pub ledger: NameOrId,
    /// Signed amount (negative = debit)
    pub amount: BigDecimal,
}

/// One inventory leg of an import record
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImportInventoryLeg {
    pub item: NameOrId,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
}

/// One parsed transaction record from the import collaborator
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImportRecord {
    pub voucher_type: VoucherType,
    /// Upsert key together with the company and type; `None` creates with
    /// a sequencer-assigned number
    pub voucher_no: Option<i64>,
    pub date: NaiveDate,
    pub narration: String,
    pub entries: Vec<ImportLedgerLeg>,
    pub inventory_entries: Vec<ImportInventoryLeg>,
}

/// Success/failure tally of one import run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    /// (record index, reason) per failed record
    pub errors: Vec<(usize, String)>,
}

/// Read-only, point-in-time-consistent company dump for the export
/// collaborator
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompanySnapshot {
    pub company: Company,
    pub groups: Vec<Group>,
    pub ledgers: Vec<Ledger>,
    pub stock_items: Vec<StockItem>,
    pub vouchers: Vec<Voucher>,
}

/// Trusted bulk-import path over a storage backend
pub struct BulkImporter<S: BooksStorage + Clone> {
    storage: S,
    store: VoucherStore<S>,
}

impl<S: BooksStorage + Clone> BulkImporter<S> {
    pub fn new(storage: S) -> Self {
        Self {
            store: VoucherStore::new(storage.clone()),
            storage,
        }
    }

    /// Importer posting through a custom validator instead of the standard
    /// per-voucher-type rules
    pub fn with_validator(storage: S, validator: Arc<dyn PostingValidator>) -> Self {
        Self {
            store: VoucherStore::with_validator(storage.clone(), validator),
            storage,
        }
    }

    /// Import a batch of records for one company
    ///
    /// Vouchers created here are posted as Approved (the import path is
    /// trusted and skips the checker). An existing (company, number, type)
    /// voucher has its entries replaced instead.
    pub async fn import(
        &mut self,
        company_id: i64,
        records: Vec<ImportRecord>,
        user_id: i64,
    ) -> BooksResult<ImportSummary> {
        if self.storage.get_company(company_id).await?.is_none() {
            return Err(BooksError::NotFound(format!("company {}", company_id)));
        }

        let mut summary = ImportSummary::default();
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            match self.import_one(company_id, record, user_id).await {
                Ok(()) => summary.imported += 1,
                Err(err) => {
                    warn!(company = company_id, row = index, %err, "import row failed");
                    summary.failed += 1;
                    summary.errors.push((index, err.to_string()));
                }
            }
        }

        info!(
            company = company_id,
            total,
            imported = summary.imported,
            failed = summary.failed,
            "bulk import finished"
        );
        Ok(summary)
    }

    async fn import_one(
        &mut self,
        company_id: i64,
        record: ImportRecord,
        user_id: i64,
    ) -> BooksResult<()> {
        let entries = self.resolve_ledger_legs(company_id, &record.entries).await?;
        let inventory_entries = self
            .resolve_inventory_legs(company_id, &record.inventory_entries)
            .await?;

        let existing = match record.voucher_no {
            Some(no) => {
                self.storage
                    .find_voucher_by_number(company_id, record.voucher_type, no)
                    .await?
            }
            None => None,
        };

        match existing {
            Some(voucher) => {
                self.store
                    .replace_for_import(voucher.id, company_id, entries, inventory_entries, user_id)
                    .await?;
            }
            None => {
                self.store
                    .create(
                        VoucherDraft {
                            company_id,
                            voucher_type: record.voucher_type,
                            voucher_no: record.voucher_no,
                            date: record.date,
                            narration: record.narration,
                            entries,
                            inventory_entries,
                        },
                        user_id,
                        Channel::BulkImport,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn resolve_ledger_legs(
        &self,
        company_id: i64,
        legs: &[ImportLedgerLeg],
    ) -> BooksResult<Vec<VoucherEntry>> {
        let mut entries = Vec::with_capacity(legs.len());
        for leg in legs {
            let ledger = match &leg.ledger {
                NameOrId::Id(id) => self.storage.get_ledger(*id).await?.filter(|l| l.company_id == company_id),
                NameOrId::Name(name) => self.storage.find_ledger_by_name(company_id, name).await?,
            }
            .ok_or_else(|| match &leg.ledger {
                NameOrId::Id(id) => BooksError::NotFound(format!("ledger {}", id)),
                NameOrId::Name(name) => BooksError::NotFound(format!("ledger '{}'", name)),
            })?;
            entries.push(VoucherEntry {
                ledger_id: ledger.id,
                amount: leg.amount.clone(),
            });
        }
        Ok(entries)
    }

    async fn resolve_inventory_legs(
        &self,
        company_id: i64,
        legs: &[ImportInventoryLeg],
    ) -> BooksResult<Vec<InventoryEntry>> {
        let mut entries = Vec::with_capacity(legs.len());
        for leg in legs {
            let item = match &leg.item {
                NameOrId::Id(id) => self
                    .storage
                    .get_stock_item(*id)
                    .await?
                    .filter(|i| i.company_id == company_id),
                NameOrId::Name(name) => {
                    self.storage.find_stock_item_by_name(company_id, name).await?
                }
            }
            .ok_or_else(|| match &leg.item {
                NameOrId::Id(id) => BooksError::NotFound(format!("stock item {}", id)),
                NameOrId::Name(name) => BooksError::NotFound(format!("stock item '{}'", name)),
            })?;
            entries.push(InventoryEntry {
                stock_item_id: item.id,
                quantity: leg.quantity.clone(),
                rate: leg.rate.clone(),
                amount: leg.amount.clone(),
            });
        }
        Ok(entries)
    }

    /// Full company dump for the export collaborator
    pub async fn export_company(&self, company_id: i64) -> BooksResult<CompanySnapshot> {
        let company = self
            .storage
            .get_company(company_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("company {}", company_id)))?;

        Ok(CompanySnapshot {
            company,
            groups: self.storage.list_groups(company_id).await?,
            ledgers: self.storage.list_ledgers(company_id).await?,
            stock_items: self.storage.list_stock_items(company_id).await?,
            vouchers: self.storage.list_vouchers(company_id, None).await?,
        })
    }
}
