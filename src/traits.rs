//! Storage abstraction for the bookkeeping engine
//!
//! The engine works against any backend (PostgreSQL, MySQL, SQLite,
//! in-memory, ...) that implements [`BooksStorage`]. Composite methods
//! (`insert_voucher`, `replace_voucher_entries`, `delete_voucher`,
//! `transition_status`, `next_voucher_number`) carry an atomicity contract:
//! an implementation must apply the whole operation or none of it, and must
//! isolate it from concurrent writers touching the same voucher or sequence
//! row.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

#[async_trait]
pub trait BooksStorage: Send + Sync {
    // -- companies ---------------------------------------------------------

    /// Insert a company, assigning its id
    async fn insert_company(&mut self, company: Company) -> BooksResult<Company>;

    async fn get_company(&self, company_id: i64) -> BooksResult<Option<Company>>;

    /// Delete a company row. The engine guards against deleting a company
    /// that still owns vouchers before calling this.
    async fn delete_company(&mut self, company_id: i64) -> BooksResult<()>;

    // -- chart of accounts -------------------------------------------------

    /// Insert a group, assigning its id
    async fn insert_group(&mut self, group: Group) -> BooksResult<Group>;

    async fn get_group(&self, group_id: i64) -> BooksResult<Option<Group>>;

    async fn list_groups(&self, company_id: i64) -> BooksResult<Vec<Group>>;

    async fn update_group(&mut self, group: &Group) -> BooksResult<()>;

    async fn delete_group(&mut self, group_id: i64) -> BooksResult<()>;

    /// Insert a ledger, assigning its id
    async fn insert_ledger(&mut self, ledger: Ledger) -> BooksResult<Ledger>;

    async fn get_ledger(&self, ledger_id: i64) -> BooksResult<Option<Ledger>>;

    async fn find_ledger_by_name(
        &self,
        company_id: i64,
        name: &str,
    ) -> BooksResult<Option<Ledger>>;

    async fn list_ledgers(&self, company_id: i64) -> BooksResult<Vec<Ledger>>;

    async fn update_ledger(&mut self, ledger: &Ledger) -> BooksResult<()>;

    async fn delete_ledger(&mut self, ledger_id: i64) -> BooksResult<()>;

    /// Number of voucher entries referencing this ledger, any status
    async fn count_entries_for_ledger(&self, ledger_id: i64) -> BooksResult<u64>;

    // -- stock items and recipes -------------------------------------------

    /// Insert a stock item, assigning its id
    async fn insert_stock_item(&mut self, item: StockItem) -> BooksResult<StockItem>;

    async fn get_stock_item(&self, item_id: i64) -> BooksResult<Option<StockItem>>;

    async fn find_stock_item_by_name(
        &self,
        company_id: i64,
        name: &str,
    ) -> BooksResult<Option<StockItem>>;

    async fn list_stock_items(&self, company_id: i64) -> BooksResult<Vec<StockItem>>;

    async fn update_stock_item(&mut self, item: &StockItem) -> BooksResult<()>;

    /// Add `delta` to the materialized running quantity of a stock item.
    /// Called inside the same logical unit as the voucher write that makes
    /// the movement visible or invisible.
    async fn adjust_running_qty(&mut self, item_id: i64, delta: &BigDecimal) -> BooksResult<()>;

    /// Insert a bill of materials, assigning its id
    async fn insert_bom(&mut self, bom: Bom) -> BooksResult<Bom>;

    async fn get_bom(&self, bom_id: i64) -> BooksResult<Option<Bom>>;

    async fn list_boms(&self, company_id: i64) -> BooksResult<Vec<Bom>>;

    // -- voucher numbering -------------------------------------------------

    /// Atomically read-and-increment the (company, type) counter, creating
    /// it at 1 when absent. Two concurrent callers must never receive the
    /// same number.
    async fn next_voucher_number(
        &mut self,
        company_id: i64,
        voucher_type: VoucherType,
    ) -> BooksResult<i64>;

    /// Raise the (company, type) counter to at least `voucher_no`. Called
    /// when a voucher is persisted with an explicitly supplied number, so
    /// later auto-numbered vouchers continue past it instead of colliding.
    async fn record_voucher_number(
        &mut self,
        company_id: i64,
        voucher_type: VoucherType,
        voucher_no: i64,
    ) -> BooksResult<()>;

    // -- vouchers ----------------------------------------------------------

    /// Persist a voucher with all of its entries as one unit, assigning its
    /// id. Fails with `Conflict` on a duplicate (company, type, number) or
    /// transaction code.
    async fn insert_voucher(&mut self, voucher: Voucher) -> BooksResult<Voucher>;

    async fn get_voucher(&self, voucher_id: i64) -> BooksResult<Option<Voucher>>;

    async fn find_voucher_by_number(
        &self,
        company_id: i64,
        voucher_type: VoucherType,
        voucher_no: i64,
    ) -> BooksResult<Option<Voucher>>;

    async fn transaction_code_exists(&self, code: &str) -> BooksResult<bool>;

    /// Replace both entry sets of a voucher (destructive rewrite) and its
    /// total, as one unit. Compare-and-set on the status: returns `false`
    /// without writing when the current status is not `expected`, so an
    /// edit that lost a race against a verify cannot rewrite an approved
    /// voucher.
    async fn replace_voucher_entries(
        &mut self,
        voucher_id: i64,
        expected: VoucherStatus,
        entries: Vec<VoucherEntry>,
        inventory_entries: Vec<InventoryEntry>,
        total_amount: BigDecimal,
    ) -> BooksResult<bool>;

    /// Delete a voucher header and all of its entries as one unit
    async fn delete_voucher(&mut self, voucher_id: i64) -> BooksResult<()>;

    /// Compare-and-set the voucher status. Returns `false` without writing
    /// when the current status is not `from` (lost race or already
    /// terminal).
    async fn transition_status(
        &mut self,
        voucher_id: i64,
        from: VoucherStatus,
        to: VoucherStatus,
    ) -> BooksResult<bool>;

    async fn list_vouchers(
        &self,
        company_id: i64,
        status: Option<VoucherStatus>,
    ) -> BooksResult<Vec<Voucher>>;

    /// Vouchers (any status) carrying an entry for this ledger, optionally
    /// windowed by date. Reports filter to approved themselves.
    async fn vouchers_for_ledger(
        &self,
        ledger_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>>;

    /// Vouchers (any status) carrying an inventory entry for this item
    async fn vouchers_for_stock_item(&self, item_id: i64) -> BooksResult<Vec<Voucher>>;

    async fn company_has_vouchers(&self, company_id: i64) -> BooksResult<bool>;

    // -- audit trail -------------------------------------------------------

    /// Append an audit row. The trail is append-only; there is no update or
    /// delete counterpart.
    async fn append_audit(&mut self, record: AuditRecord) -> BooksResult<()>;

    async fn audit_for_voucher(&self, voucher_id: i64) -> BooksResult<Vec<AuditRecord>>;
}
