//! Posting-time validation of voucher entries
//!
//! Rules run against ledger legs already resolved to their placement class,
//! so the validator itself never touches storage and stays trivially
//! testable.

use bigdecimal::BigDecimal;

use crate::types::*;

/// A ledger leg joined with the classification of its ledger
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub entry: VoucherEntry,
    pub class: LedgerClass,
    /// Whether the ledger sits under a party (debtor/creditor) group
    pub party: bool,
}

impl ResolvedEntry {
    pub fn new(entry: VoucherEntry, class: LedgerClass, party: bool) -> Self {
        Self {
            entry,
            class,
            party,
        }
    }

    fn is_cash_or_bank(&self) -> bool {
        matches!(self.class, LedgerClass::Cash | LedgerClass::Bank)
    }
}

/// Validation seam for posting rules, replaceable per deployment
pub trait PostingValidator: Send + Sync {
    /// Check a full entry set against the rules for `voucher_type`.
    /// Nothing may be written when this fails.
    fn validate(
        &self,
        voucher_type: VoucherType,
        entries: &[ResolvedEntry],
        inventory_entries: &[InventoryEntry],
    ) -> BooksResult<()>;
}

/// The standard per-voucher-type rule set
pub struct StandardPostingValidator;

impl StandardPostingValidator {
    fn check_balance(entries: &[ResolvedEntry]) -> BooksResult<()> {
        if entries.len() < 2 {
            return Err(BooksError::Validation(
                "a voucher needs at least two ledger entries".to_string(),
            ));
        }
        for resolved in entries {
            if resolved.entry.amount == BigDecimal::from(0) {
                return Err(BooksError::Validation(
                    "entry amounts must be non-zero".to_string(),
                ));
            }
        }
        let total: BigDecimal = entries.iter().map(|r| &r.entry.amount).sum();
        if total.abs() > balance_epsilon() {
            let debits: BigDecimal = entries
                .iter()
                .filter(|r| r.entry.is_debit())
                .map(|r| r.entry.magnitude())
                .sum();
            let credits: BigDecimal = entries
                .iter()
                .filter(|r| r.entry.is_credit())
                .map(|r| r.entry.magnitude())
                .sum();
            return Err(BooksError::Validation(format!(
                "voucher is not balanced: debits = {}, credits = {}",
                debits, credits
            )));
        }
        Ok(())
    }
}

impl PostingValidator for StandardPostingValidator {
    fn validate(
        &self,
        voucher_type: VoucherType,
        entries: &[ResolvedEntry],
        inventory_entries: &[InventoryEntry],
    ) -> BooksResult<()> {
        // A stock journal may be a pure inventory move; ledger rules apply
        // only when ledger legs are present.
        if voucher_type != VoucherType::StockJournal || !entries.is_empty() {
            Self::check_balance(entries)?;
        }

        match voucher_type {
            VoucherType::Contra => {
                if entries.iter().any(|r| !r.is_cash_or_bank()) {
                    return Err(BooksError::Validation(
                        "contra voucher: every ledger must be cash or bank".to_string(),
                    ));
                }
            }
            VoucherType::Payment => {
                if entries
                    .iter()
                    .any(|r| r.entry.is_credit() && !r.is_cash_or_bank())
                {
                    return Err(BooksError::Validation(
                        "payment voucher: credit side must be cash or bank".to_string(),
                    ));
                }
            }
            VoucherType::Receipt => {
                if entries
                    .iter()
                    .any(|r| r.entry.is_debit() && !r.is_cash_or_bank())
                {
                    return Err(BooksError::Validation(
                        "receipt voucher: debit side must be cash or bank".to_string(),
                    ));
                }
            }
            VoucherType::Journal => {
                if entries.iter().any(|r| r.is_cash_or_bank()) {
                    return Err(BooksError::Validation(
                        "journal voucher: cash or bank ledgers are not allowed".to_string(),
                    ));
                }
            }
            VoucherType::Sales | VoucherType::Purchase => {
                if !entries.iter().any(|r| r.party) {
                    return Err(BooksError::Validation(format!(
                        "{} voucher: a party ledger entry is required",
                        voucher_type.label()
                    )));
                }
            }
            VoucherType::StockJournal => {}
        }

        if voucher_type.requires_inventory() && inventory_entries.is_empty() {
            return Err(BooksError::Validation(format!(
                "{} voucher: at least one inventory entry is required",
                voucher_type.label()
            )));
        }

        Ok(())
    }
}
