//! Builder for assembling voucher drafts leg by leg

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Fluent builder for a [`VoucherDraft`]
///
/// `build` runs only the shape checks that need no storage (arity and the
/// debit = credit invariant); placement rules run in the store, where
/// ledgers can be resolved to their classes.
#[derive(Debug)]
pub struct VoucherBuilder {
    draft: VoucherDraft,
}

impl VoucherBuilder {
    pub fn new(
        company_id: i64,
        voucher_type: VoucherType,
        date: NaiveDate,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            draft: VoucherDraft {
                company_id,
                voucher_type,
                voucher_no: None,
                date,
                narration: narration.into(),
                entries: Vec::new(),
                inventory_entries: Vec::new(),
            },
        }
    }

    /// Pin the voucher number instead of asking the sequencer
    pub fn voucher_no(mut self, no: i64) -> Self {
        self.draft.voucher_no = Some(no);
        self
    }

    /// Add a debit leg of `magnitude` against `ledger_id`
    pub fn debit(mut self, ledger_id: i64, magnitude: BigDecimal) -> Self {
        self.draft.entries.push(VoucherEntry::debit(ledger_id, magnitude));
        self
    }

    /// Add a credit leg of `magnitude` against `ledger_id`
    pub fn credit(mut self, ledger_id: i64, magnitude: BigDecimal) -> Self {
        self.draft.entries.push(VoucherEntry::credit(ledger_id, magnitude));
        self
    }

    /// Add a raw signed entry
    pub fn entry(mut self, entry: VoucherEntry) -> Self {
        self.draft.entries.push(entry);
        self
    }

    /// Add an inward inventory movement
    pub fn inward(mut self, stock_item_id: i64, quantity: BigDecimal, rate: BigDecimal) -> Self {
        self.draft
            .inventory_entries
            .push(InventoryEntry::inward(stock_item_id, quantity, rate));
        self
    }

    /// Add an outward inventory movement
    pub fn outward(mut self, stock_item_id: i64, quantity: BigDecimal, rate: BigDecimal) -> Self {
        self.draft
            .inventory_entries
            .push(InventoryEntry::outward(stock_item_id, quantity, rate));
        self
    }

    /// Add a raw inventory entry (e.g. a frozen historical cost)
    pub fn inventory(mut self, entry: InventoryEntry) -> Self {
        self.draft.inventory_entries.push(entry);
        self
    }

    pub fn build(self) -> BooksResult<VoucherDraft> {
        let draft = self.draft;
        if draft.entries.is_empty() && draft.inventory_entries.is_empty() {
            return Err(BooksError::Validation(
                "voucher has no entries".to_string(),
            ));
        }
        if !draft.entries.is_empty() {
            if draft.entries.len() < 2 && draft.voucher_type != VoucherType::StockJournal {
                return Err(BooksError::Validation(
                    "a voucher needs at least two ledger entries".to_string(),
                ));
            }
            let total: BigDecimal = draft.entries.iter().map(|e| &e.amount).sum();
            if total.abs() > balance_epsilon() {
                return Err(BooksError::Validation(format!(
                    "voucher is not balanced: net amount = {}",
                    total
                )));
            }
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn builds_balanced_draft() {
        let draft = VoucherBuilder::new(1, VoucherType::Payment, date(), "Office rent")
            .debit(10, BigDecimal::from(12000))
            .credit(11, BigDecimal::from(12000))
            .build()
            .unwrap();
        assert_eq!(draft.entries.len(), 2);
        assert!(draft.voucher_no.is_none());
    }

    #[test]
    fn rejects_unbalanced_draft() {
        let err = VoucherBuilder::new(1, VoucherType::Payment, date(), "Broken")
            .debit(10, BigDecimal::from(100))
            .credit(11, BigDecimal::from(90))
            .build()
            .unwrap_err();
        assert!(matches!(err, BooksError::Validation(_)));
    }

    #[test]
    fn stock_journal_without_ledger_legs_builds() {
        let draft = VoucherBuilder::new(1, VoucherType::StockJournal, date(), "Assembly")
            .outward(1, BigDecimal::from(4), BigDecimal::from(25))
            .inward(2, BigDecimal::from(1), BigDecimal::from(100))
            .build()
            .unwrap();
        assert!(draft.entries.is_empty());
        assert_eq!(draft.inventory_entries.len(), 2);
    }
}
