//! In-memory storage implementation for testing and development
//!
//! Mutating methods take a single write guard for their whole body, which
//! gives the composite operations of the trait their all-or-nothing and
//! isolated behavior without a real transaction manager.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::traits::BooksStorage;
use crate::types::*;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    companies: Arc<RwLock<HashMap<i64, Company>>>,
    groups: Arc<RwLock<HashMap<i64, Group>>>,
    ledgers: Arc<RwLock<HashMap<i64, Ledger>>>,
    stock_items: Arc<RwLock<HashMap<i64, StockItem>>>,
    boms: Arc<RwLock<HashMap<i64, Bom>>>,
    vouchers: Arc<RwLock<HashMap<i64, Voucher>>>,
    sequences: Arc<RwLock<HashMap<(i64, VoucherType), i64>>>,
    audits: Arc<RwLock<Vec<AuditRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicI64::new(1)),
            ..Default::default()
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.companies.write().unwrap().clear();
        self.groups.write().unwrap().clear();
        self.ledgers.write().unwrap().clear();
        self.stock_items.write().unwrap().clear();
        self.boms.write().unwrap().clear();
        self.vouchers.write().unwrap().clear();
        self.sequences.write().unwrap().clear();
        self.audits.write().unwrap().clear();
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl BooksStorage for MemoryStorage {
    async fn insert_company(&mut self, mut company: Company) -> BooksResult<Company> {
        company.id = self.alloc_id();
        self.companies
            .write()
            .unwrap()
            .insert(company.id, company.clone());
        Ok(company)
    }

    async fn get_company(&self, company_id: i64) -> BooksResult<Option<Company>> {
        Ok(self.companies.read().unwrap().get(&company_id).cloned())
    }

    async fn delete_company(&mut self, company_id: i64) -> BooksResult<()> {
        if self.companies.write().unwrap().remove(&company_id).is_some() {
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("company {}", company_id)))
        }
    }

    async fn insert_group(&mut self, mut group: Group) -> BooksResult<Group> {
        group.id = self.alloc_id();
        self.groups.write().unwrap().insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: i64) -> BooksResult<Option<Group>> {
        Ok(self.groups.read().unwrap().get(&group_id).cloned())
    }

    async fn list_groups(&self, company_id: i64) -> BooksResult<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .groups
            .read()
            .unwrap()
            .values()
            .filter(|g| g.company_id == company_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn update_group(&mut self, group: &Group) -> BooksResult<()> {
        let mut groups = self.groups.write().unwrap();
        if groups.contains_key(&group.id) {
            groups.insert(group.id, group.clone());
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("group {}", group.id)))
        }
    }

    async fn delete_group(&mut self, group_id: i64) -> BooksResult<()> {
        if self.groups.write().unwrap().remove(&group_id).is_some() {
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("group {}", group_id)))
        }
    }

    async fn insert_ledger(&mut self, mut ledger: Ledger) -> BooksResult<Ledger> {
        ledger.id = self.alloc_id();
        self.ledgers
            .write()
            .unwrap()
            .insert(ledger.id, ledger.clone());
        Ok(ledger)
    }

    async fn get_ledger(&self, ledger_id: i64) -> BooksResult<Option<Ledger>> {
        Ok(self.ledgers.read().unwrap().get(&ledger_id).cloned())
    }

    async fn find_ledger_by_name(
        &self,
        company_id: i64,
        name: &str,
    ) -> BooksResult<Option<Ledger>> {
        Ok(self
            .ledgers
            .read()
            .unwrap()
            .values()
            .find(|l| l.company_id == company_id && l.name == name)
            .cloned())
    }

    async fn list_ledgers(&self, company_id: i64) -> BooksResult<Vec<Ledger>> {
        let mut ledgers: Vec<Ledger> = self
            .ledgers
            .read()
            .unwrap()
            .values()
            .filter(|l| l.company_id == company_id)
            .cloned()
            .collect();
        ledgers.sort_by_key(|l| l.id);
        Ok(ledgers)
    }

    async fn update_ledger(&mut self, ledger: &Ledger) -> BooksResult<()> {
        let mut ledgers = self.ledgers.write().unwrap();
        if ledgers.contains_key(&ledger.id) {
            ledgers.insert(ledger.id, ledger.clone());
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("ledger {}", ledger.id)))
        }
    }

    async fn delete_ledger(&mut self, ledger_id: i64) -> BooksResult<()> {
        if self.ledgers.write().unwrap().remove(&ledger_id).is_some() {
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("ledger {}", ledger_id)))
        }
    }

    async fn count_entries_for_ledger(&self, ledger_id: i64) -> BooksResult<u64> {
        let count = self
            .vouchers
            .read()
            .unwrap()
            .values()
            .flat_map(|v| &v.entries)
            .filter(|e| e.ledger_id == ledger_id)
            .count();
        Ok(count as u64)
    }

    async fn insert_stock_item(&mut self, mut item: StockItem) -> BooksResult<StockItem> {
        item.id = self.alloc_id();
        self.stock_items
            .write()
            .unwrap()
            .insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_stock_item(&self, item_id: i64) -> BooksResult<Option<StockItem>> {
        Ok(self.stock_items.read().unwrap().get(&item_id).cloned())
    }

    async fn find_stock_item_by_name(
        &self,
        company_id: i64,
        name: &str,
    ) -> BooksResult<Option<StockItem>> {
        Ok(self
            .stock_items
            .read()
            .unwrap()
            .values()
            .find(|i| i.company_id == company_id && i.name == name)
            .cloned())
    }

    async fn list_stock_items(&self, company_id: i64) -> BooksResult<Vec<StockItem>> {
        let mut items: Vec<StockItem> = self
            .stock_items
            .read()
            .unwrap()
            .values()
            .filter(|i| i.company_id == company_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    async fn update_stock_item(&mut self, item: &StockItem) -> BooksResult<()> {
        let mut items = self.stock_items.write().unwrap();
        if items.contains_key(&item.id) {
            items.insert(item.id, item.clone());
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("stock item {}", item.id)))
        }
    }

    async fn adjust_running_qty(&mut self, item_id: i64, delta: &BigDecimal) -> BooksResult<()> {
        let mut items = self.stock_items.write().unwrap();
        match items.get_mut(&item_id) {
            Some(item) => {
                item.running_qty += delta;
                Ok(())
            }
            None => Err(BooksError::NotFound(format!("stock item {}", item_id))),
        }
    }

    async fn insert_bom(&mut self, mut bom: Bom) -> BooksResult<Bom> {
        bom.id = self.alloc_id();
        self.boms.write().unwrap().insert(bom.id, bom.clone());
        Ok(bom)
    }

    async fn get_bom(&self, bom_id: i64) -> BooksResult<Option<Bom>> {
        Ok(self.boms.read().unwrap().get(&bom_id).cloned())
    }

    async fn list_boms(&self, company_id: i64) -> BooksResult<Vec<Bom>> {
        let mut boms: Vec<Bom> = self
            .boms
            .read()
            .unwrap()
            .values()
            .filter(|b| b.company_id == company_id)
            .cloned()
            .collect();
        boms.sort_by_key(|b| b.id);
        Ok(boms)
    }

    async fn next_voucher_number(
        &mut self,
        company_id: i64,
        voucher_type: VoucherType,
    ) -> BooksResult<i64> {
        // The write guard spans the whole read-and-increment, so two
        // concurrent callers for the same (company, type) can never see
        // the same number.
        let mut sequences = self.sequences.write().unwrap();
        let counter = sequences.entry((company_id, voucher_type)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn record_voucher_number(
        &mut self,
        company_id: i64,
        voucher_type: VoucherType,
        voucher_no: i64,
    ) -> BooksResult<()> {
        let mut sequences = self.sequences.write().unwrap();
        let counter = sequences.entry((company_id, voucher_type)).or_insert(0);
        if voucher_no > *counter {
            *counter = voucher_no;
        }
        Ok(())
    }

    async fn insert_voucher(&mut self, mut voucher: Voucher) -> BooksResult<Voucher> {
        let mut vouchers = self.vouchers.write().unwrap();
        if vouchers.values().any(|v| {
            v.company_id == voucher.company_id
                && v.voucher_type == voucher.voucher_type
                && v.voucher_no == voucher.voucher_no
        }) {
            return Err(BooksError::Conflict(format!(
                "{} voucher {} already exists",
                voucher.voucher_type.label(),
                voucher.voucher_no
            )));
        }
        if vouchers
            .values()
            .any(|v| v.transaction_code == voucher.transaction_code)
        {
            return Err(BooksError::Conflict(format!(
                "transaction code {} already exists",
                voucher.transaction_code
            )));
        }
        voucher.id = self.alloc_id();
        vouchers.insert(voucher.id, voucher.clone());
        Ok(voucher)
    }

    async fn get_voucher(&self, voucher_id: i64) -> BooksResult<Option<Voucher>> {
        Ok(self.vouchers.read().unwrap().get(&voucher_id).cloned())
    }

    async fn find_voucher_by_number(
        &self,
        company_id: i64,
        voucher_type: VoucherType,
        voucher_no: i64,
    ) -> BooksResult<Option<Voucher>> {
        Ok(self
            .vouchers
            .read()
            .unwrap()
            .values()
            .find(|v| {
                v.company_id == company_id
                    && v.voucher_type == voucher_type
                    && v.voucher_no == voucher_no
            })
            .cloned())
    }

    async fn transaction_code_exists(&self, code: &str) -> BooksResult<bool> {
        Ok(self
            .vouchers
            .read()
            .unwrap()
            .values()
            .any(|v| v.transaction_code == code))
    }

    async fn replace_voucher_entries(
        &mut self,
        voucher_id: i64,
        expected: VoucherStatus,
        entries: Vec<VoucherEntry>,
        inventory_entries: Vec<InventoryEntry>,
        total_amount: BigDecimal,
    ) -> BooksResult<bool> {
        let mut vouchers = self.vouchers.write().unwrap();
        match vouchers.get_mut(&voucher_id) {
            Some(voucher) if voucher.status == expected => {
                voucher.entries = entries;
                voucher.inventory_entries = inventory_entries;
                voucher.total_amount = total_amount;
                voucher.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(BooksError::NotFound(format!("voucher {}", voucher_id))),
        }
    }

    async fn delete_voucher(&mut self, voucher_id: i64) -> BooksResult<()> {
        if self.vouchers.write().unwrap().remove(&voucher_id).is_some() {
            Ok(())
        } else {
            Err(BooksError::NotFound(format!("voucher {}", voucher_id)))
        }
    }

    async fn transition_status(
        &mut self,
        voucher_id: i64,
        from: VoucherStatus,
        to: VoucherStatus,
    ) -> BooksResult<bool> {
        let mut vouchers = self.vouchers.write().unwrap();
        match vouchers.get_mut(&voucher_id) {
            Some(voucher) if voucher.status == from => {
                voucher.status = to;
                voucher.updated_at = chrono::Utc::now().naive_utc();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(BooksError::NotFound(format!("voucher {}", voucher_id))),
        }
    }

    async fn list_vouchers(
        &self,
        company_id: i64,
        status: Option<VoucherStatus>,
    ) -> BooksResult<Vec<Voucher>> {
        let mut vouchers: Vec<Voucher> = self
            .vouchers
            .read()
            .unwrap()
            .values()
            .filter(|v| v.company_id == company_id && status.map_or(true, |s| v.status == s))
            .cloned()
            .collect();
        vouchers.sort_by_key(|v| v.id);
        Ok(vouchers)
    }

    async fn vouchers_for_ledger(
        &self,
        ledger_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> BooksResult<Vec<Voucher>> {
        let mut vouchers: Vec<Voucher> = self
            .vouchers
            .read()
            .unwrap()
            .values()
            .filter(|v| {
                if !v.entries.iter().any(|e| e.ledger_id == ledger_id) {
                    return false;
                }
                if let Some(from) = from {
                    if v.date < from {
                        return false;
                    }
                }
                if let Some(to) = to {
                    if v.date > to {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        vouchers.sort_by_key(|v| v.id);
        Ok(vouchers)
    }

    async fn vouchers_for_stock_item(&self, item_id: i64) -> BooksResult<Vec<Voucher>> {
        let mut vouchers: Vec<Voucher> = self
            .vouchers
            .read()
            .unwrap()
            .values()
            .filter(|v| {
                v.inventory_entries
                    .iter()
                    .any(|e| e.stock_item_id == item_id)
            })
            .cloned()
            .collect();
        vouchers.sort_by_key(|v| v.id);
        Ok(vouchers)
    }

    async fn company_has_vouchers(&self, company_id: i64) -> BooksResult<bool> {
        Ok(self
            .vouchers
            .read()
            .unwrap()
            .values()
            .any(|v| v.company_id == company_id))
    }

    async fn append_audit(&mut self, record: AuditRecord) -> BooksResult<()> {
        self.audits.write().unwrap().push(record);
        Ok(())
    }

    async fn audit_for_voucher(&self, voucher_id: i64) -> BooksResult<Vec<AuditRecord>> {
        Ok(self
            .audits
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.voucher_id == voucher_id)
            .cloned()
            .collect())
    }
}
