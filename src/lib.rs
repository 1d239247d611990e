//! # Books Core
//!
//! A double-entry bookkeeping and inventory valuation library built around
//! vouchers with maker-checker verification.
//!
//! ## Features
//!
//! - **Chart of accounts**: Hierarchical groups with nature classification and ledgers
//! - **Vouchers**: Seven voucher types with per-type posting rules and gapless numbering
//! - **Maker-checker**: Vouchers start pending and only move balances once approved
//! - **Reporting**: Ledger statements, cash/bank books, and trial balance generation
//! - **Stock valuation**: Weighted-average-cost closing stock and BOM-driven production
//! - **Bulk import/export**: Idempotent upsert import keyed by voucher number
//! - **Storage abstraction**: Database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use books_core::{Books, MemoryStorage, VoucherBuilder, VoucherType};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! // let storage = MemoryStorage::new();
//! // let mut books = Books::new(storage);
//! ```

pub mod accounts;
pub mod books;
pub mod import;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;
pub mod voucher;

// Re-export commonly used types
pub use accounts::AccountsManager;
pub use books::{Books, IntegrityReport};
pub use import::{
    BulkImporter, CompanySnapshot, ImportInventoryLeg, ImportLedgerLeg, ImportRecord,
    ImportSummary, NameOrId,
};
pub use reports::*;
pub use traits::BooksStorage;
pub use types::*;
pub use utils::MemoryStorage;
pub use voucher::*;
