//! Core types and data structures for the bookkeeping engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accounting nature of a chart-of-accounts group
///
/// Fixed when a root group is created; descendants inherit it conceptually
/// through their root, and reports rely on the root nature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountNature {
    /// What the business owns (Cash, Bank, Inventory, Receivables, ...)
    Asset,
    /// What the business owes (Payables, Loans, Duties, ...)
    Liability,
    /// Money earned by the business
    Income,
    /// Costs incurred by the business
    Expense,
}

/// Placement class of a ledger, derived from its owning group
///
/// The posting rules for Contra/Payment/Receipt/Journal vouchers are
/// expressed entirely in terms of this classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerClass {
    Cash,
    Bank,
    Other,
}

/// The six transaction kinds plus the inventory-only stock journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    /// Cash/bank to cash/bank movement
    Contra,
    /// Money going out; the credit side must be cash or bank
    Payment,
    /// Money coming in; the debit side must be cash or bank
    Receipt,
    /// Adjustment entry; no cash or bank ledger may appear
    Journal,
    Sales,
    Purchase,
    /// Inventory movement (including BOM-driven production) with optional
    /// ledger legs
    StockJournal,
}

impl VoucherType {
    /// All voucher types, in display order
    pub const ALL: [VoucherType; 7] = [
        VoucherType::Contra,
        VoucherType::Payment,
        VoucherType::Receipt,
        VoucherType::Journal,
        VoucherType::Sales,
        VoucherType::Purchase,
        VoucherType::StockJournal,
    ];

    /// Human-readable label used in error messages and audit details
    pub fn label(&self) -> &'static str {
        match self {
            VoucherType::Contra => "contra",
            VoucherType::Payment => "payment",
            VoucherType::Receipt => "receipt",
            VoucherType::Journal => "journal",
            VoucherType::Sales => "sales",
            VoucherType::Purchase => "purchase",
            VoucherType::StockJournal => "stock journal",
        }
    }

    /// Whether this type must carry at least one inventory entry
    pub fn requires_inventory(&self) -> bool {
        matches!(
            self,
            VoucherType::Sales | VoucherType::Purchase | VoucherType::StockJournal
        )
    }
}

/// Maker-checker state of a voucher
///
/// `Pending` is the maker-created initial state. `Approved` and `Rejected`
/// are terminal. Rejected vouchers are retained with their audit trail but
/// are permanently invisible to every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    Pending,
    Approved,
    Rejected,
}

/// Which side of the books a balance sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceSide {
    Debit,
    Credit,
}

/// A company: the tenant boundary that owns all other records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    /// First day of the financial year
    pub fy_start: NaiveDate,
    /// Date from which books are maintained
    pub books_begin: NaiveDate,
}

/// A node in the chart-of-accounts tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub nature: AccountNature,
    /// Parent group within the same company; `None` for root groups
    pub parent_id: Option<i64>,
    /// Optional marker overriding name-based classification:
    /// "Cash", "Bank" or "Party"
    pub special: Option<String>,
}

impl Group {
    /// Resolve the placement class this group gives its ledgers
    pub fn classify(&self) -> LedgerClass {
        if self.name == "Cash-in-hand" || self.special.as_deref() == Some("Cash") {
            LedgerClass::Cash
        } else if self.name == "Bank Accounts" || self.special.as_deref() == Some("Bank") {
            LedgerClass::Bank
        } else {
            LedgerClass::Other
        }
    }

    /// Whether ledgers under this group are party (debtor/creditor) ledgers
    pub fn is_party(&self) -> bool {
        self.name == "Sundry Debtors"
            || self.name == "Sundry Creditors"
            || self.special.as_deref() == Some("Party")
    }
}

/// A leaf account holding an opening balance and entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub id: i64,
    pub company_id: i64,
    /// Unique per company
    pub name: String,
    pub group_id: i64,
    /// Signed opening balance under the canonical convention
    /// (negative = debit, positive = credit)
    pub opening_balance: BigDecimal,
    pub gstin: Option<String>,
    pub state: Option<String>,
    /// Stored GST rate; the engine performs no tax computation with it
    pub gst_rate: Option<BigDecimal>,
}

/// One ledger leg of a voucher
///
/// Canonical sign convention: **negative = Debit, positive = Credit**.
/// Every report and aggregation in the crate uses this one convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherEntry {
    pub ledger_id: i64,
    pub amount: BigDecimal,
}

impl VoucherEntry {
    /// Create a debit leg from a positive magnitude
    pub fn debit(ledger_id: i64, magnitude: BigDecimal) -> Self {
        Self {
            ledger_id,
            amount: -magnitude,
        }
    }

    /// Create a credit leg from a positive magnitude
    pub fn credit(ledger_id: i64, magnitude: BigDecimal) -> Self {
        Self {
            ledger_id,
            amount: magnitude,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.amount < BigDecimal::from(0)
    }

    pub fn is_credit(&self) -> bool {
        !self.is_debit()
    }

    /// Unsigned size of the leg
    pub fn magnitude(&self) -> BigDecimal {
        self.amount.abs()
    }
}

/// One stock leg of a voucher
///
/// Quantity is signed: positive = inward, negative = outward. The amount is
/// the historical cost frozen at entry time and is never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub stock_item_id: i64,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
}

impl InventoryEntry {
    /// Inward movement of `quantity` units at `rate`
    pub fn inward(stock_item_id: i64, quantity: BigDecimal, rate: BigDecimal) -> Self {
        let amount = &quantity * &rate;
        Self {
            stock_item_id,
            quantity,
            rate,
            amount,
        }
    }

    /// Outward movement of `quantity` (positive) units at `rate`
    pub fn outward(stock_item_id: i64, quantity: BigDecimal, rate: BigDecimal) -> Self {
        let amount = &quantity * &rate;
        Self {
            stock_item_id,
            quantity: -quantity,
            rate,
            amount: -amount,
        }
    }

    pub fn is_inward(&self) -> bool {
        self.quantity > BigDecimal::from(0)
    }
}

/// A complete financial transaction: header plus its ledger and inventory
/// legs, persisted atomically as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    pub company_id: i64,
    pub voucher_type: VoucherType,
    /// Unique per (company, type); sequencer-assigned when not supplied
    pub voucher_no: i64,
    /// Globally unique short human-facing code
    pub transaction_code: String,
    pub date: NaiveDate,
    pub narration: String,
    /// Total of the debit side, kept for display
    pub total_amount: BigDecimal,
    pub status: VoucherStatus,
    pub created_by: i64,
    pub entries: Vec<VoucherEntry>,
    pub inventory_entries: Vec<InventoryEntry>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Voucher {
    /// Signed sum of the ledger legs; zero for a balanced voucher
    pub fn entry_total(&self) -> BigDecimal {
        self.entries.iter().map(|e| &e.amount).sum()
    }

    /// Total of the debit side (sum of debit-leg magnitudes)
    pub fn debit_total(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.is_debit())
            .map(|e| e.magnitude())
            .sum()
    }

    /// Whether debits equal credits within [`balance_epsilon`]
    pub fn is_balanced(&self) -> bool {
        self.entry_total().abs() <= balance_epsilon()
    }
}

/// Caller-supplied voucher content, before the store assigns numbering,
/// code, status and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub company_id: i64,
    pub voucher_type: VoucherType,
    /// `None` asks the sequencer for the next number
    pub voucher_no: Option<i64>,
    pub date: NaiveDate,
    pub narration: String,
    pub entries: Vec<VoucherEntry>,
    pub inventory_entries: Vec<InventoryEntry>,
}

/// A stock item in the inventory sub-ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub company_id: i64,
    /// Unique per company
    pub name: String,
    pub unit: String,
    pub group: Option<String>,
    pub opening_qty: BigDecimal,
    pub opening_value: BigDecimal,
    /// Materialized projection: must always equal opening quantity plus the
    /// sum of approved inventory-entry quantities. The entry history is the
    /// ground truth; this field is adjusted alongside approvals and deletes.
    pub running_qty: BigDecimal,
    /// Reorder threshold
    pub min_stock: Option<BigDecimal>,
}

/// Audit trail action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Created,
    Edited,
    Verified,
    Rejected,
}

/// One append-only audit trail row; never mutated or deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub voucher_id: i64,
    pub voucher_type: VoucherType,
    pub user_id: i64,
    pub action: AuditAction,
    pub details: String,
    pub at: NaiveDateTime,
}

impl AuditRecord {
    pub fn new(
        voucher_id: i64,
        voucher_type: VoucherType,
        user_id: i64,
        action: AuditAction,
        details: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            voucher_id,
            voucher_type,
            user_id,
            action,
            details,
            at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// One component line of a bill of materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    pub stock_item_id: i64,
    /// Quantity consumed per `target_qty` of finished goods
    pub quantity: BigDecimal,
}

/// Bill of materials: the recipe a production stock journal consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bom {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub finished_item_id: i64,
    /// Finished quantity yielded by one application of the recipe
    pub target_qty: BigDecimal,
    pub components: Vec<BomComponent>,
}

/// Rounding tolerance for the debit = credit invariant
pub fn balance_epsilon() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Errors that can occur in the bookkeeping engine
#[derive(Debug, thiserror::Error)]
pub enum BooksError {
    /// Voucher-type rule or balance-mismatch violation; nothing was written
    #[error("validation error: {0}")]
    Validation(String),
    /// A referenced company, ledger, stock item or voucher does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Concurrent modification or duplicate number/code; retry after
    /// re-fetching
    #[error("conflict: {0}")]
    Conflict(String),
    /// Post-hoc integrity violation, e.g. an unbalanced trial balance or a
    /// delete attempted on a record that still owns dependents
    #[error("integrity error: {0}")]
    Integrity(String),
    /// The storage backend could not commit; never partially applied
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations
pub type BooksResult<T> = Result<T, BooksError>;
