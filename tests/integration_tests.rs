//! Integration tests for books-core

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use std::sync::Arc;

use books_core::{
    utils::MemoryStorage, BalanceSide, Books, BooksError, BooksResult, BomComponent, Company,
    ImportLedgerLeg, ImportRecord, InventoryEntry, Ledger, NameOrId, PostingValidator,
    ResolvedEntry, VoucherBuilder, VoucherStatus, VoucherType,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(s: &str) -> BigDecimal {
    s.parse().unwrap()
}

/// Fresh company with the standard groups and a handful of ledgers
async fn seeded_books() -> (Books<MemoryStorage>, Company, HashMap<String, Ledger>) {
    let mut books = Books::new(MemoryStorage::new());
    let company = books
        .create_company("Acme Traders", date(2024, 4, 1), date(2024, 4, 1))
        .await
        .unwrap();
    let groups = books.setup_standard_groups(company.id).await.unwrap();

    let mut ledgers = HashMap::new();
    for (handle, group_handle, name) in [
        ("cash", "cash", "Cash"),
        ("bank", "bank", "HDFC Bank"),
        ("sales", "sales", "Sales Revenue"),
        ("purchases", "purchase", "Purchases"),
        ("rent", "expenses", "Office Rent"),
        ("customer", "debtors", "Globex Corp"),
        ("supplier", "creditors", "Initech Supplies"),
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
async fn complete_bookkeeping_workflow() {
    let (mut books, company, ledgers) = seeded_books().await;

    // Cash sale received into the till
    let receipt = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Receipt, date(2024, 4, 5), "Cash sale")
                .debit(ledgers["cash"].id, BigDecimal::from(40000))
                .credit(ledgers["sales"].id, BigDecimal::from(40000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(receipt.id, company.id, 2).await.unwrap();

    // Move part of it to the bank
    let contra = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Contra, date(2024, 4, 8), "Deposit")
                .debit(ledgers["bank"].id, BigDecimal::from(25000))
                .credit(ledgers["cash"].id, BigDecimal::from(25000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(contra.id, company.id, 2).await.unwrap();

    // Pay the rent from the bank
    let payment = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 4, 10), "April rent")
                .debit(ledgers["rent"].id, BigDecimal::from(15000))
                .credit(ledgers["bank"].id, BigDecimal::from(15000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(payment.id, company.id, 2).await.unwrap();

    // Negative = debit throughout
    let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
    assert_eq!(cash.amount, BigDecimal::from(-15000));
    assert_eq!(cash.side, BalanceSide::Debit);
    let bank = books.closing_balance(ledgers["bank"].id, None).await.unwrap();
    assert_eq!(bank.amount, BigDecimal::from(-10000));
    let sales = books.closing_balance(ledgers["sales"].id, None).await.unwrap();
    assert_eq!(sales.amount, BigDecimal::from(40000));
    assert_eq!(sales.side, BalanceSide::Credit);

    // Trial balance zeroes and both column totals agree
    let trial = books.trial_balance(company.id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, BigDecimal::from(40000));
    assert_eq!(trial.total_credit, BigDecimal::from(40000));

    // Ledger statement carries a running balance per line
    let statement = books
        .ledger_statement(ledgers["cash"].id, date(2024, 4, 1), date(2024, 4, 30))
        .await
        .unwrap();
    assert_eq!(statement.opening, BigDecimal::from(0));
    assert_eq!(statement.lines.len(), 2);
    assert_eq!(statement.lines[0].running, BigDecimal::from(-40000));
    assert_eq!(statement.lines[1].running, BigDecimal::from(-15000));
    assert_eq!(statement.closing.amount, BigDecimal::from(-15000));

    // Cash book covers the cash and bank ledgers only
    let cash_book = books
        .cash_book(company.id, date(2024, 4, 1), date(2024, 4, 30))
        .await
        .unwrap();
    assert_eq!(cash_book.rows.len(), 2);
    assert_eq!(cash_book.total_receipts, BigDecimal::from(65000));
    assert_eq!(cash_book.total_payments, BigDecimal::from(40000));

    let report = books.check_integrity(company.id, None).await.unwrap();
    assert!(report.is_valid, "issues: {:?}", report.issues);
}

#[tokio::test]
async fn voucher_numbers_are_gapless_per_type() {
    let (mut books, company, ledgers) = seeded_books().await;

    for day in 1..=3 {
        books
            .create_voucher(
                VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, day), "Rent")
                    .debit(ledgers["rent"].id, BigDecimal::from(1000))
                    .credit(ledgers["cash"].id, BigDecimal::from(1000))
                    .build()
                    .unwrap(),
                1,
            )
            .await
            .unwrap();
    }
    let contra = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Contra, date(2024, 5, 4), "Deposit")
                .debit(ledgers["bank"].id, BigDecimal::from(500))
                .credit(ledgers["cash"].id, BigDecimal::from(500))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();

    let payments: Vec<i64> = books
        .vouchers(company.id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|v| v.voucher_type == VoucherType::Payment)
        .map(|v| v.voucher_no)
        .collect();
    assert_eq!(payments, vec![1, 2, 3]);
    // Each voucher type runs its own sequence
    assert_eq!(contra.voucher_no, 1);
}

#[tokio::test]
async fn verification_is_first_writer_wins() {
    let (mut books, company, ledgers) = seeded_books().await;
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Rent")
                .debit(ledgers["rent"].id, BigDecimal::from(9000))
                .credit(ledgers["cash"].id, BigDecimal::from(9000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();

    books.verify_voucher(voucher.id, company.id, 2).await.unwrap();
    let err = books.verify_voucher(voucher.id, company.id, 3).await.unwrap_err();
    assert!(matches!(err, BooksError::Conflict(_)));

    // The retry changed nothing; inventory and balances were applied once
    let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
    assert_eq!(cash.amount, BigDecimal::from(9000));
}

#[tokio::test]
async fn rejected_vouchers_are_retained_and_inert() {
    let (mut books, company, ledgers) = seeded_books().await;
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Duplicate")
                .debit(ledgers["rent"].id, BigDecimal::from(9000))
                .credit(ledgers["cash"].id, BigDecimal::from(9000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();

    books
        .reject_voucher(voucher.id, company.id, 2, "entered twice")
        .await
        .unwrap();

    let rejected = books.voucher(voucher.id).await.unwrap().unwrap();
    assert_eq!(rejected.status, VoucherStatus::Rejected);
    let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
    assert_eq!(cash.amount, BigDecimal::from(0));

    // A rejected voucher cannot be verified afterwards
    let err = books.verify_voucher(voucher.id, company.id, 2).await.unwrap_err();
    assert!(matches!(err, BooksError::Conflict(_)));
}

#[tokio::test]
async fn deleting_a_voucher_restores_aggregates() {
    let (mut books, company, ledgers) = seeded_books().await;
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Rent")
                .debit(ledgers["rent"].id, BigDecimal::from(15000))
                .credit(ledgers["cash"].id, BigDecimal::from(15000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(voucher.id, company.id, 2).await.unwrap();

    let outcome = books.delete_vouchers(&[voucher.id], company.id, 1).await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert!(outcome.failures.is_empty());

    let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
    assert_eq!(cash.amount, BigDecimal::from(0));
    let trial = books.trial_balance(company.id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, BigDecimal::from(0));

    // The freed number is reusable without a conflict
    let replacement = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 4), "Rent redo")
                .voucher_no(voucher.voucher_no)
                .debit(ledgers["rent"].id, BigDecimal::from(14000))
                .credit(ledgers["cash"].id, BigDecimal::from(14000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    assert_eq!(replacement.voucher_no, voucher.voucher_no);
}

#[tokio::test]
async fn weighted_average_cost_valuation() {
    let (mut books, company, ledgers) = seeded_books().await;
    let widgets = books
        .create_stock_item(
            company.id,
            "Widgets",
            "pcs",
            BigDecimal::from(0),
            BigDecimal::from(0),
            None,
        )
        .await
        .unwrap();

    // Buy 10 @ 5
    let purchase = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Purchase, date(2024, 4, 5), "Stock buy")
                .debit(ledgers["purchases"].id, BigDecimal::from(50))
                .credit(ledgers["supplier"].id, BigDecimal::from(50))
                .inward(widgets.id, BigDecimal::from(10), BigDecimal::from(5))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(purchase.id, company.id, 2).await.unwrap();

    // Sell 4; the issue rate does not disturb the weighted average
    let sale = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Sales, date(2024, 4, 12), "Stock sale")
                .debit(ledgers["customer"].id, BigDecimal::from(32))
                .credit(ledgers["sales"].id, BigDecimal::from(32))
                .outward(widgets.id, BigDecimal::from(4), BigDecimal::from(8))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(sale.id, company.id, 2).await.unwrap();

    let valuation = books.closing_stock(widgets.id).await.unwrap();
    assert_eq!(valuation.qty, BigDecimal::from(6));
    assert_eq!(valuation.avg_rate, BigDecimal::from(5));
    assert_eq!(valuation.value, BigDecimal::from(30));

    // The materialized quantity tracks the entry history
    assert_eq!(
        books.recompute_running_qty(widgets.id).await.unwrap(),
        BigDecimal::from(6)
    );

    // Removing the sale puts the goods back
    books.delete_vouchers(&[sale.id], company.id, 1).await.unwrap();
    let valuation = books.closing_stock(widgets.id).await.unwrap();
    assert_eq!(valuation.qty, BigDecimal::from(10));
    assert_eq!(valuation.value, BigDecimal::from(50));
}

#[tokio::test]
async fn bom_production_moves_stock_at_cost() {
    let (mut books, company, _ledgers) = seeded_books().await;
    let raw = books
        .create_stock_item(
            company.id,
            "Steel Rod",
            "kg",
            BigDecimal::from(10),
            BigDecimal::from(50),
            None,
        )
        .await
        .unwrap();
    let finished = books
        .create_stock_item(
            company.id,
            "Bracket",
            "pcs",
            BigDecimal::from(0),
            BigDecimal::from(0),
            None,
        )
        .await
        .unwrap();

    let bom = books
        .create_bom(
            company.id,
            "Bracket build",
            finished.id,
            BigDecimal::from(1),
            vec![BomComponent {
                stock_item_id: raw.id,
                quantity: BigDecimal::from(2),
            }],
        )
        .await
        .unwrap();

    let voucher = books
        .produce(company.id, bom.id, BigDecimal::from(3), date(2024, 4, 20), "Batch 1", 1)
        .await
        .unwrap();
    assert_eq!(voucher.voucher_type, VoucherType::StockJournal);
    assert_eq!(voucher.status, VoucherStatus::Pending);
    books.verify_voucher(voucher.id, company.id, 2).await.unwrap();

    // 6 kg issued at the 5/kg weighted average, 3 pcs in at total cost 30
    let raw_valuation = books.closing_stock(raw.id).await.unwrap();
    assert_eq!(raw_valuation.qty, BigDecimal::from(4));
    assert_eq!(raw_valuation.value, BigDecimal::from(20));
    let finished_valuation = books.closing_stock(finished.id).await.unwrap();
    assert_eq!(finished_valuation.qty, BigDecimal::from(3));
    assert_eq!(finished_valuation.avg_rate, BigDecimal::from(10));
    assert_eq!(finished_valuation.value, BigDecimal::from(30));
}

#[tokio::test]
async fn import_upserts_by_voucher_number() {
    let (mut books, company, ledgers) = seeded_books().await;

    let record = ImportRecord {
        voucher_type: VoucherType::Payment,
        voucher_no: Some(1),
        date: date(2024, 4, 3),
        narration: "April rent".to_string(),
        entries: vec![
            ImportLedgerLeg {
                ledger: NameOrId::Name("Office Rent".to_string()),
                amount: dec("-5000"),
            },
            ImportLedgerLeg {
                ledger: NameOrId::Id(ledgers["cash"].id),
                amount: dec("5000"),
            },
        ],
        inventory_entries: vec![],
    };
    let summary = books.import_records(company.id, vec![record.clone()], 1).await.unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 0);

    // Imported vouchers are trusted and approved immediately
    let vouchers = books.vouchers(company.id, None).await.unwrap();
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0].status, VoucherStatus::Approved);
    let rent = books.closing_balance(ledgers["rent"].id, None).await.unwrap();
    assert_eq!(rent.amount, BigDecimal::from(-5000));

    // Same number again replaces the entries instead of duplicating
    let mut revised = record;
    revised.entries[0].amount = dec("-8000");
    revised.entries[1].amount = dec("8000");
    let summary = books.import_records(company.id, vec![revised], 1).await.unwrap();
    assert_eq!(summary.imported, 1);
    let vouchers = books.vouchers(company.id, None).await.unwrap();
    assert_eq!(vouchers.len(), 1);
    let rent = books.closing_balance(ledgers["rent"].id, None).await.unwrap();
    assert_eq!(rent.amount, BigDecimal::from(-8000));
}

#[tokio::test]
async fn import_tallies_failures_without_aborting() {
    let (mut books, company, ledgers) = seeded_books().await;

    let good = ImportRecord {
        voucher_type: VoucherType::Receipt,
        voucher_no: None,
        date: date(2024, 4, 9),
        narration: "Counter sale".to_string(),
        entries: vec![
            ImportLedgerLeg {
                ledger: NameOrId::Id(ledgers["cash"].id),
                amount: dec("-1200"),
            },
            ImportLedgerLeg {
                ledger: NameOrId::Id(ledgers["sales"].id),
                amount: dec("1200"),
            },
        ],
        inventory_entries: vec![],
    };
    let bad = ImportRecord {
        voucher_type: VoucherType::Receipt,
        voucher_no: None,
        date: date(2024, 4, 9),
        narration: "Unknown ledger".to_string(),
        entries: vec![
            ImportLedgerLeg {
                ledger: NameOrId::Name("No Such Ledger".to_string()),
                amount: dec("-700"),
            },
            ImportLedgerLeg {
                ledger: NameOrId::Id(ledgers["sales"].id),
                amount: dec("700"),
            },
        ],
        inventory_entries: vec![],
    };

    let summary = books
        .import_records(company.id, vec![good, bad], 1)
        .await
        .unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].0, 1);

    let trial = books.trial_balance(company.id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, BigDecimal::from(1200));
}

#[tokio::test]
async fn export_snapshot_covers_the_whole_company() {
    let (mut books, company, ledgers) = seeded_books().await;
    books
        .create_stock_item(
            company.id,
            "Widgets",
            "pcs",
            BigDecimal::from(2),
            BigDecimal::from(10),
            None,
        )
        .await
        .unwrap();
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Rent")
                .debit(ledgers["rent"].id, BigDecimal::from(1000))
                .credit(ledgers["cash"].id, BigDecimal::from(1000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();

    let snapshot = books.export_company(company.id).await.unwrap();
    assert_eq!(snapshot.company.id, company.id);
    assert_eq!(snapshot.ledgers.len(), 7);
    assert_eq!(snapshot.stock_items.len(), 1);
    assert_eq!(snapshot.vouchers.len(), 1);
    assert_eq!(snapshot.vouchers[0].id, voucher.id);

    // The snapshot serializes cleanly for the export collaborator
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("Office Rent"));
}

#[tokio::test]
async fn auto_numbering_continues_past_pinned_numbers() {
    let (mut books, company, ledgers) = seeded_books().await;

    let pinned = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Contra, date(2024, 5, 1), "Deposit")
                .voucher_no(1)
                .debit(ledgers["bank"].id, BigDecimal::from(500))
                .credit(ledgers["cash"].id, BigDecimal::from(500))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    assert_eq!(pinned.voucher_no, 1);

    // the sequencer has seen the pinned number and moves past it
    let auto = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Contra, date(2024, 5, 2), "Deposit")
                .debit(ledgers["bank"].id, BigDecimal::from(700))
                .credit(ledgers["cash"].id, BigDecimal::from(700))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    assert_eq!(auto.voucher_no, 2);
}

#[tokio::test]
async fn approved_vouchers_cannot_be_edited() {
    let (mut books, company, ledgers) = seeded_books().await;
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Rent")
                .debit(ledgers["rent"].id, BigDecimal::from(1000))
                .credit(ledgers["cash"].id, BigDecimal::from(1000))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(voucher.id, company.id, 2).await.unwrap();

    let err = books
        .update_voucher(
            voucher.id,
            company.id,
            vec![
                books_core::VoucherEntry::debit(ledgers["rent"].id, BigDecimal::from(9999)),
                books_core::VoucherEntry::credit(ledgers["cash"].id, BigDecimal::from(9999)),
            ],
            vec![],
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BooksError::Conflict(_)));

    // the approved entries are untouched
    let stored = books.voucher(voucher.id).await.unwrap().unwrap();
    assert_eq!(stored.entries[0].amount, BigDecimal::from(-1000));
    let cash = books.closing_balance(ledgers["cash"].id, None).await.unwrap();
    assert_eq!(cash.amount, BigDecimal::from(1000));
}

#[tokio::test]
async fn verify_applies_inventory_from_the_edited_entries() {
    let (mut books, company, _ledgers) = seeded_books().await;
    let widgets = books
        .create_stock_item(
            company.id,
            "Widgets",
            "pcs",
            BigDecimal::from(0),
            BigDecimal::from(0),
            None,
        )
        .await
        .unwrap();

    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::StockJournal, date(2024, 5, 6), "Intake")
                .inward(widgets.id, BigDecimal::from(10), BigDecimal::from(5))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books
        .update_voucher(
            voucher.id,
            company.id,
            vec![],
            vec![InventoryEntry::inward(
                widgets.id,
                BigDecimal::from(7),
                BigDecimal::from(5),
            )],
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(voucher.id, company.id, 2).await.unwrap();

    // the running quantity reflects the entries that were approved, not
    // the ones the voucher was drafted with
    let snapshot = books.export_company(company.id).await.unwrap();
    assert_eq!(snapshot.stock_items[0].running_qty, BigDecimal::from(7));
    let valuation = books.closing_stock(widgets.id).await.unwrap();
    assert_eq!(valuation.qty, BigDecimal::from(7));
}

#[tokio::test]
async fn stock_summary_flags_items_below_minimum() {
    let (mut books, company, _ledgers) = seeded_books().await;
    let rods = books
        .create_stock_item(
            company.id,
            "Steel Rod",
            "kg",
            BigDecimal::from(10),
            BigDecimal::from(50),
            Some(BigDecimal::from(5)),
        )
        .await
        .unwrap();
    books
        .create_stock_item(
            company.id,
            "Bracket",
            "pcs",
            BigDecimal::from(3),
            BigDecimal::from(30),
            Some(BigDecimal::from(2)),
        )
        .await
        .unwrap();

    let issue = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::StockJournal, date(2024, 5, 8), "Issue")
                .outward(rods.id, BigDecimal::from(6), BigDecimal::from(5))
                .build()
                .unwrap(),
            1,
        )
        .await
        .unwrap();
    books.verify_voucher(issue.id, company.id, 2).await.unwrap();

    let summary = books.stock_summary(company.id).await.unwrap();
    assert_eq!(summary.len(), 2);
    let rods_row = summary.iter().find(|r| r.item.id == rods.id).unwrap();
    assert_eq!(rods_row.valuation.qty, BigDecimal::from(4));
    assert!(rods_row.below_min);
    assert!(!summary.iter().find(|r| r.item.id != rods.id).unwrap().below_min);
}

#[tokio::test]
async fn books_balance_assertion_reports_opening_imbalance() {
    let (mut books, company, _ledgers) = seeded_books().await;
    books.assert_books_balanced(company.id, None).await.unwrap();

    // a one-sided opening balance throws the trial balance off
    let groups = books.list_groups(company.id).await.unwrap();
    books
        .create_ledger(company.id, "Capital", groups[0].id, BigDecimal::from(100))
        .await
        .unwrap();
    let err = books.assert_books_balanced(company.id, None).await.unwrap_err();
    assert!(matches!(err, BooksError::Integrity(_)));
}

struct PostingsClosed;

impl PostingValidator for PostingsClosed {
    fn validate(
        &self,
        _voucher_type: VoucherType,
        _entries: &[ResolvedEntry],
        _inventory_entries: &[InventoryEntry],
    ) -> BooksResult<()> {
        Err(BooksError::Validation("postings are closed".to_string()))
    }
}

#[tokio::test]
async fn custom_validator_governs_the_import_path() {
    let mut books = Books::with_validator(MemoryStorage::new(), Arc::new(PostingsClosed));
    let company = books
        .create_company("Acme Traders", date(2024, 4, 1), date(2024, 4, 1))
        .await
        .unwrap();
    let groups = books.setup_standard_groups(company.id).await.unwrap();
    let cash = books
        .create_ledger(company.id, "Cash", groups["cash"].id, BigDecimal::from(0))
        .await
        .unwrap();
    let rent = books
        .create_ledger(company.id, "Office Rent", groups["expenses"].id, BigDecimal::from(0))
        .await
        .unwrap();

    let record = ImportRecord {
        voucher_type: VoucherType::Payment,
        voucher_no: None,
        date: date(2024, 4, 3),
        narration: "April rent".to_string(),
        entries: vec![
            ImportLedgerLeg {
                ledger: NameOrId::Id(rent.id),
                amount: dec("-5000"),
            },
            ImportLedgerLeg {
                ledger: NameOrId::Id(cash.id),
                amount: dec("5000"),
            },
        ],
        inventory_entries: vec![],
    };
    let summary = books.import_records(company.id, vec![record], 1).await.unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].1.contains("postings are closed"));
    assert!(books.vouchers(company.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn audit_trail_records_the_voucher_lifecycle() {
    let (mut books, company, ledgers) = seeded_books().await;
    let voucher = books
        .create_voucher(
            VoucherBuilder::new(company.id, VoucherType::Payment, date(2024, 5, 3), "Rent")
                .debit(ledgers["rent"].id, BigDecimal::from(1000))
                .credit(ledgers["cash"].id, BigDecimal::from(1000))
                .build()
                .unwrap(),
            7,
        )
        .await
        .unwrap();
    books
        .update_voucher(
            voucher.id,
            company.id,
            vec![
                books_core::VoucherEntry::debit(ledgers["rent"].id, BigDecimal::from(1100)),
                books_core::VoucherEntry::credit(ledgers["cash"].id, BigDecimal::from(1100)),
            ],
            vec![],
            7,
        )
        .await
        .unwrap();
    books.verify_voucher(voucher.id, company.id, 9).await.unwrap();

    let trail = books.audit_trail(voucher.id).await.unwrap();
    let actions: Vec<_> = trail.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            books_core::AuditAction::Created,
            books_core::AuditAction::Edited,
            books_core::AuditAction::Verified,
        ]
    );
    assert_eq!(trail[0].user_id, 7);
    assert_eq!(trail[2].user_id, 9);
}
