//! Main engine orchestrator coordinating accounts, vouchers, verification
//! and reports

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::accounts::AccountsManager;
use crate::import::{BulkImporter, CompanySnapshot, ImportRecord, ImportSummary};
use crate::reports::{
    BalanceReporter, CashBook, LedgerBalance, LedgerStatement, StockReporter, StockSummaryRow,
    StockValuation, TrialBalance,
};
use crate::traits::BooksStorage;
use crate::types::*;
use crate::voucher::{
    BulkDeleteOutcome, Channel, PostingValidator, VerificationQueue, VoucherBuilder, VoucherStore,
};

/// The bookkeeping engine over one storage backend
///
/// Owns one manager per concern, every one holding a clone of the shared
/// storage handle, and re-exposes their operations as inherent methods.
pub struct Books<S: BooksStorage + Clone> {
    accounts: AccountsManager<S>,
    store: VoucherStore<S>,
    queue: VerificationQueue<S>,
    balances: BalanceReporter<S>,
    stock: StockReporter<S>,
    importer: BulkImporter<S>,
}

impl<S: BooksStorage + Clone> Books<S> {
    pub fn new(storage: S) -> Self {
        Self {
            accounts: AccountsManager::new(storage.clone()),
            store: VoucherStore::new(storage.clone()),
            queue: VerificationQueue::new(storage.clone()),
            balances: BalanceReporter::new(storage.clone()),
            stock: StockReporter::new(storage.clone()),
            importer: BulkImporter::new(storage),
        }
    }

    /// Engine with a custom posting validator in place of the standard
    /// per-voucher-type rules. Both the interactive store and the bulk
    /// importer post through it.
    pub fn with_validator(storage: S, validator: Arc<dyn PostingValidator>) -> Self {
        Self {
            accounts: AccountsManager::new(storage.clone()),
            store: VoucherStore::with_validator(storage.clone(), validator.clone()),
            queue: VerificationQueue::new(storage.clone()),
            balances: BalanceReporter::new(storage.clone()),
            stock: StockReporter::new(storage.clone()),
            importer: BulkImporter::with_validator(storage, validator),
        }
    }

    // -- chart of accounts -------------------------------------------------

    pub async fn create_company(
        &mut self,
        name: &str,
        fy_start: NaiveDate,
        books_begin: NaiveDate,
    ) -> BooksResult<Company> {
        self.accounts.create_company(name, fy_start, books_begin).await
    }

    pub async fn delete_company(&mut self, company_id: i64) -> BooksResult<()> {
        self.accounts.delete_company(company_id).await
    }

    pub async fn create_group(
        &mut self,
        company_id: i64,
        name: &str,
        nature: AccountNature,
        parent_id: Option<i64>,
        special: Option<String>,
    ) -> BooksResult<Group> {
        self.accounts
            .create_group(company_id, name, nature, parent_id, special)
            .await
    }

    pub async fn create_ledger(
        &mut self,
        company_id: i64,
        name: &str,
        group_id: i64,
        opening_balance: BigDecimal,
    ) -> BooksResult<Ledger> {
        self.accounts
            .create_ledger(company_id, name, group_id, opening_balance)
            .await
    }

    pub async fn delete_ledger(&mut self, ledger_id: i64) -> BooksResult<()> {
        self.accounts.delete_ledger(ledger_id).await
    }

    pub async fn list_ledgers(&self, company_id: i64) -> BooksResult<Vec<Ledger>> {
        self.accounts.list_ledgers(company_id).await
    }

    pub async fn list_groups(&self, company_id: i64) -> BooksResult<Vec<Group>> {
        self.accounts.list_groups(company_id).await
    }

    pub async fn create_stock_item(
        &mut self,
        company_id: i64,
        name: &str,
        unit: &str,
        opening_qty: BigDecimal,
        opening_value: BigDecimal,
        min_stock: Option<BigDecimal>,
    ) -> BooksResult<StockItem> {
        self.accounts
            .create_stock_item(company_id, name, unit, opening_qty, opening_value, min_stock)
            .await
    }

    pub async fn create_bom(
        &mut self,
        company_id: i64,
        name: &str,
        finished_item_id: i64,
        target_qty: BigDecimal,
        components: Vec<BomComponent>,
    ) -> BooksResult<Bom> {
        self.accounts
            .create_bom(company_id, name, finished_item_id, target_qty, components)
            .await
    }

    /// Create the standard groups a fresh company needs, keyed by handle
    pub async fn setup_standard_groups(
        &mut self,
        company_id: i64,
    ) -> BooksResult<std::collections::HashMap<String, Group>> {
        crate::accounts::utils::create_standard_groups(&mut self.accounts, company_id).await
    }

    // -- vouchers ----------------------------------------------------------

    /// Post a maker-created voucher; it starts Pending
    pub async fn create_voucher(
        &mut self,
        draft: VoucherDraft,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        self.store.create(draft, user_id, Channel::Interactive).await
    }

    /// Replace the entries of a pending voucher
    pub async fn update_voucher(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        entries: Vec<VoucherEntry>,
        inventory_entries: Vec<InventoryEntry>,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        self.store
            .update(voucher_id, company_id, entries, inventory_entries, user_id)
            .await
    }

    /// Delete a batch of vouchers, tallying per-id failures
    pub async fn delete_vouchers(
        &mut self,
        ids: &[i64],
        company_id: i64,
        user_id: i64,
    ) -> BooksResult<BulkDeleteOutcome> {
        self.store.delete(ids, company_id, user_id).await
    }

    pub async fn voucher(&self, voucher_id: i64) -> BooksResult<Option<Voucher>> {
        self.store.get(voucher_id).await
    }

    pub async fn vouchers(
        &self,
        company_id: i64,
        status: Option<VoucherStatus>,
    ) -> BooksResult<Vec<Voucher>> {
        self.store.list(company_id, status).await
    }

    pub async fn audit_trail(&self, voucher_id: i64) -> BooksResult<Vec<AuditRecord>> {
        self.store.audit_trail(voucher_id).await
    }

    /// Build and post a BOM-driven production stock journal
    ///
    /// Components are issued at their current weighted-average rate and the
    /// finished good comes inward at total component cost. The voucher
    /// walks the ordinary maker-checker path.
    pub async fn produce(
        &mut self,
        company_id: i64,
        bom_id: i64,
        scale: BigDecimal,
        date: NaiveDate,
        narration: &str,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        let bom = self
            .accounts
            .get_bom(bom_id)
            .await?
            .filter(|b| b.company_id == company_id)
            .ok_or_else(|| BooksError::NotFound(format!("bill of materials {}", bom_id)))?;

        let entries = self.stock.production_entries(&bom, scale).await?;
        let mut builder =
            VoucherBuilder::new(company_id, VoucherType::StockJournal, date, narration);
        for entry in entries {
            builder = builder.inventory(entry);
        }
        self.create_voucher(builder.build()?, user_id).await
    }

    // -- verification ------------------------------------------------------

    pub async fn pending_vouchers(&self, company_id: i64) -> BooksResult<Vec<Voucher>> {
        self.queue.pending(company_id).await
    }

    pub async fn verify_voucher(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        self.queue.verify(voucher_id, company_id, user_id).await
    }

    pub async fn reject_voucher(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        user_id: i64,
        reason: &str,
    ) -> BooksResult<()> {
        self.queue.reject(voucher_id, company_id, user_id, reason).await
    }

    // -- reports -----------------------------------------------------------

    pub async fn closing_balance(
        &self,
        ledger_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<LedgerBalance> {
        self.balances.closing_balance(ledger_id, as_of).await
    }

    pub async fn ledger_statement(
        &self,
        ledger_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BooksResult<LedgerStatement> {
        self.balances.ledger_statement(ledger_id, from, to).await
    }

    pub async fn cash_book(
        &self,
        company_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BooksResult<CashBook> {
        self.balances.cash_book(company_id, from, to).await
    }

    pub async fn trial_balance(
        &self,
        company_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<TrialBalance> {
        self.balances.trial_balance(company_id, as_of).await
    }

    pub async fn closing_stock(&self, stock_item_id: i64) -> BooksResult<StockValuation> {
        self.stock.closing_stock(stock_item_id).await
    }

    pub async fn stock_summary(&self, company_id: i64) -> BooksResult<Vec<StockSummaryRow>> {
        self.stock.stock_summary(company_id).await
    }

    /// Rebuild a stock item's materialized running quantity from the entry
    /// history
    pub async fn recompute_running_qty(&mut self, stock_item_id: i64) -> BooksResult<BigDecimal> {
        self.stock.recompute_running_qty(stock_item_id).await
    }

    // -- import / export ---------------------------------------------------

    pub async fn import_records(
        &mut self,
        company_id: i64,
        records: Vec<ImportRecord>,
        user_id: i64,
    ) -> BooksResult<ImportSummary> {
        self.importer.import(company_id, records, user_id).await
    }

    pub async fn export_company(&self, company_id: i64) -> BooksResult<CompanySnapshot> {
        self.importer.export_company(company_id).await
    }

    // -- integrity ---------------------------------------------------------

    /// Cross-check the books and report every violation found
    pub async fn check_integrity(
        &self,
        company_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<IntegrityReport> {
        let mut issues = Vec::new();

        let trial = self.balances.trial_balance(company_id, as_of).await?;
        if !trial.is_balanced {
            issues.push(format!(
                "trial balance does not zero: debits = {}, credits = {}",
                trial.total_debit, trial.total_credit
            ));
        }

        for voucher in self
            .store
            .list(company_id, Some(VoucherStatus::Approved))
            .await?
        {
            if !voucher.is_balanced() {
                issues.push(format!(
                    "approved {} voucher {} is unbalanced: net = {}",
                    voucher.voucher_type.label(),
                    voucher.voucher_no,
                    voucher.entry_total()
                ));
            }
        }

        for item in self.accounts.list_stock_items(company_id).await? {
            let valuation = self.stock.closing_stock(item.id).await?;
            if valuation.qty != item.running_qty {
                issues.push(format!(
                    "stock item '{}': running quantity {} drifted from entry history {}",
                    item.name, item.running_qty, valuation.qty
                ));
            }
        }

        Ok(IntegrityReport {
            as_of,
            is_valid: issues.is_empty(),
            issues,
            total_debit: trial.total_debit,
            total_credit: trial.total_credit,
            difference: trial.difference,
        })
    }

    /// Erroring form of the trial-balance check for callers that treat an
    /// imbalance as a blocking condition
    pub async fn assert_books_balanced(
        &self,
        company_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<()> {
        let trial = self.balances.trial_balance(company_id, as_of).await?;
        if trial.is_balanced {
            Ok(())
        } else {
            Err(BooksError::Integrity(format!(
                "trial balance does not zero: debits = {}, credits = {}, difference = {}",
                trial.total_debit, trial.total_credit, trial.difference
            )))
        }
    }
}

/// Outcome of [`Books::check_integrity`]
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    pub as_of: Option<NaiveDate>,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub difference: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    async fn seeded_books() -> (Books<MemoryStorage>, Company, std::collections::HashMap<String, Ledger>)
    {
        let mut books = Books::new(MemoryStorage::new());
        let company = books
            .create_company(
                "Seed Traders",
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            )
            .await
            .unwrap();

        let groups = books.setup_standard_groups(company.id).await.unwrap();

        let mut ledgers = std::collections::HashMap::new();
        for (handle, group_handle, name) in [
            ("cash", "cash", "Cash"),
            ("bank", "bank", "HDFC Bank"),
            ("rent", "expenses", "Office Rent"),
        ] {
            let ledger = books
                .create_ledger(company.id, name, groups[group_handle].id, BigDecimal::from(0))
                .await
                .unwrap();
            ledgers.insert(handle.to_string(), ledger);
        }
        (books, company, ledgers)
    }

    #[tokio::test]
    async fn end_to_end_payment_flow() {
        let (mut books, company, ledgers) = seeded_books().await;

        let draft = VoucherBuilder::new(
            company.id,
            VoucherType::Payment,
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            "May rent",
        )
        .debit(ledgers["rent"].id, BigDecimal::from(15000))
        .credit(ledgers["cash"].id, BigDecimal::from(15000))
        .build()
        .unwrap();

        let voucher = books.create_voucher(draft, 7).await.unwrap();
        assert_eq!(voucher.status, VoucherStatus::Pending);

        // pending vouchers do not move balances
        let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
        assert_eq!(cash.amount, BigDecimal::from(0));

        books.verify_voucher(voucher.id, company.id, 9).await.unwrap();

        let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
        assert_eq!(cash.amount, BigDecimal::from(15000));
        assert_eq!(cash.side, BalanceSide::Credit);
        let rent = books.closing_balance(ledgers["rent"].id, None).await.unwrap();
        assert_eq!(rent.amount, BigDecimal::from(-15000));
        assert_eq!(rent.side, BalanceSide::Debit);

        let report = books.check_integrity(company.id, None).await.unwrap();
        assert!(report.is_valid, "issues: {:?}", report.issues);
    }

    #[tokio::test]
    async fn company_with_vouchers_cannot_be_deleted() {
        let (mut books, company, ledgers) = seeded_books().await;
        let draft = VoucherBuilder::new(
            company.id,
            VoucherType::Contra,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            "Cash to bank",
        )
        .debit(ledgers["bank"].id, BigDecimal::from(2000))
        .credit(ledgers["cash"].id, BigDecimal::from(2000))
        .build()
        .unwrap();
        books.create_voucher(draft, 1).await.unwrap();

        let err = books.delete_company(company.id).await.unwrap_err();
        assert!(matches!(err, BooksError::Integrity(_)));
    }
}
