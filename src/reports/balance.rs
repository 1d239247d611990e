//! Balance aggregation: closing balances, ledger statements, cash book and
//! trial balance
//!
//! Every figure here is a fold over approved vouchers only; pending and
//! rejected vouchers never contribute. Under the canonical sign convention
//! a negative net balance sits on the Debit side, a non-negative one on the
//! Credit side.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::traits::BooksStorage;
use crate::types::*;

/// Net balance of a ledger with its side
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerBalance {
    /// Signed net amount (negative = debit)
    pub amount: BigDecimal,
    pub side: BalanceSide,
}

impl LedgerBalance {
    fn from_net(amount: BigDecimal) -> Self {
        let side = if amount < BigDecimal::from(0) {
            BalanceSide::Debit
        } else {
            BalanceSide::Credit
        };
        Self { amount, side }
    }

    /// Unsigned size of the balance
    pub fn magnitude(&self) -> BigDecimal {
        self.amount.abs()
    }
}

/// One movement line of a ledger statement
#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub voucher_id: i64,
    pub voucher_type: VoucherType,
    pub voucher_no: i64,
    pub narration: String,
    /// Signed entry amount (negative = debit)
    pub amount: BigDecimal,
    /// Running net balance after this line
    pub running: BigDecimal,
}

/// Period statement of one ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStatement {
    pub ledger_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Net balance carried into the window
    pub opening: BigDecimal,
    pub lines: Vec<StatementLine>,
    pub closing: LedgerBalance,
}

/// Cash book row for one cash or bank ledger
#[derive(Debug, Clone, PartialEq)]
pub struct CashBookRow {
    pub ledger: Ledger,
    pub class: LedgerClass,
    pub opening: BigDecimal,
    /// Total of debit legs in the window (money in)
    pub receipts: BigDecimal,
    /// Total of credit legs in the window (money out)
    pub payments: BigDecimal,
    pub closing: BigDecimal,
}

/// Cash book across all cash and bank ledgers of a company
#[derive(Debug, Clone, PartialEq)]
pub struct CashBook {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<CashBookRow>,
    pub total_receipts: BigDecimal,
    pub total_payments: BigDecimal,
}

/// One ledger's line in the trial balance
#[derive(Debug, Clone, PartialEq)]
pub struct TrialBalanceRow {
    pub ledger: Ledger,
    pub debit: Option<BigDecimal>,
    pub credit: Option<BigDecimal>,
}

/// Trial balance across every ledger of a company
///
/// A nonzero `difference` is a data-integrity signal, not merely a display
/// value: individually balanced approved vouchers can never produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialBalance {
    pub as_of: Option<NaiveDate>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub difference: BigDecimal,
    pub is_balanced: bool,
}

/// Read-only balance aggregation over a storage backend
pub struct BalanceReporter<S: BooksStorage> {
    storage: S,
}

impl<S: BooksStorage> BalanceReporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Closing balance of a ledger: opening balance folded with every
    /// approved entry, optionally up to `as_of`
    pub async fn closing_balance(
        &self,
        ledger_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<LedgerBalance> {
        let ledger = self
            .storage
            .get_ledger(ledger_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("ledger {}", ledger_id)))?;

        let vouchers = self
            .storage
            .vouchers_for_ledger(ledger_id, None, as_of)
            .await?;

        let mut net = ledger.opening_balance;
        for voucher in vouchers
            .iter()
            .filter(|v| v.status == VoucherStatus::Approved)
        {
            for entry in voucher.entries.iter().filter(|e| e.ledger_id == ledger_id) {
                net += &entry.amount;
            }
        }
        Ok(LedgerBalance::from_net(net))
    }

    /// Period statement with per-line running balance
    pub async fn ledger_statement(
        &self,
        ledger_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BooksResult<LedgerStatement> {
        let opening = match from.pred_opt() {
            Some(day_before) => self.closing_balance(ledger_id, Some(day_before)).await?.amount,
            None => {
                self.storage
                    .get_ledger(ledger_id)
                    .await?
                    .ok_or_else(|| BooksError::NotFound(format!("ledger {}", ledger_id)))?
                    .opening_balance
            }
        };

        let mut vouchers: Vec<Voucher> = self
            .storage
            .vouchers_for_ledger(ledger_id, Some(from), Some(to))
            .await?
            .into_iter()
            .filter(|v| v.status == VoucherStatus::Approved)
            .collect();
        vouchers.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let mut running = opening.clone();
        let mut lines = Vec::new();
        for voucher in &vouchers {
            for entry in voucher.entries.iter().filter(|e| e.ledger_id == ledger_id) {
                running += &entry.amount;
                lines.push(StatementLine {
                    date: voucher.date,
                    voucher_id: voucher.id,
                    voucher_type: voucher.voucher_type,
                    voucher_no: voucher.voucher_no,
                    narration: voucher.narration.clone(),
                    amount: entry.amount.clone(),
                    running: running.clone(),
                });
            }
        }

        Ok(LedgerStatement {
            ledger_id,
            from,
            to,
            opening,
            closing: LedgerBalance::from_net(running),
            lines,
        })
    }

    /// Cash book: period statements of every cash and bank ledger
    pub async fn cash_book(
        &self,
        company_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BooksResult<CashBook> {
        let ledgers = self.storage.list_ledgers(company_id).await?;

        let mut rows = Vec::new();
        let mut total_receipts = BigDecimal::from(0);
        let mut total_payments = BigDecimal::from(0);

        for ledger in ledgers {
            let group = self
                .storage
                .get_group(ledger.group_id)
                .await?
                .ok_or_else(|| BooksError::NotFound(format!("group {}", ledger.group_id)))?;
            let class = group.classify();
            if class == LedgerClass::Other {
                continue;
            }

            let statement = self.ledger_statement(ledger.id, from, to).await?;
            let receipts: BigDecimal = statement
                .lines
                .iter()
                .filter(|l| l.amount < BigDecimal::from(0))
                .map(|l| l.amount.abs())
                .sum();
            let payments: BigDecimal = statement
                .lines
                .iter()
                .filter(|l| l.amount >= BigDecimal::from(0))
                .map(|l| l.amount.clone())
                .sum();

            total_receipts += &receipts;
            total_payments += &payments;
            rows.push(CashBookRow {
                ledger,
                class,
                opening: statement.opening,
                receipts,
                payments,
                closing: statement.closing.amount,
            });
        }

        Ok(CashBook {
            from,
            to,
            rows,
            total_receipts,
            total_payments,
        })
    }

    /// Trial balance: every ledger's closing balance split by side
    pub async fn trial_balance(
        &self,
        company_id: i64,
        as_of: Option<NaiveDate>,
    ) -> BooksResult<TrialBalance> {
        let ledgers = self.storage.list_ledgers(company_id).await?;

        let mut rows = Vec::new();
        let mut total_debit = BigDecimal::from(0);
        let mut total_credit = BigDecimal::from(0);

        for ledger in ledgers {
            let balance = self.closing_balance(ledger.id, as_of).await?;
            let row = match balance.side {
                BalanceSide::Debit => {
                    total_debit += balance.magnitude();
                    TrialBalanceRow {
                        ledger,
                        debit: Some(balance.magnitude()),
                        credit: None,
                    }
                }
                BalanceSide::Credit => {
                    total_credit += balance.magnitude();
                    TrialBalanceRow {
                        ledger,
                        debit: None,
                        credit: Some(balance.magnitude()),
                    }
                }
            };
            rows.push(row);
        }

        let difference = &total_debit - &total_credit;
        let is_balanced = difference.abs() <= balance_epsilon();

        Ok(TrialBalance {
            as_of,
            rows,
            total_debit,
            total_credit,
            difference,
            is_balanced,
        })
    }
}
