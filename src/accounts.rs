//! Chart-of-accounts management: companies, groups and ledgers

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

use crate::traits::BooksStorage;
use crate::types::*;

/// Manager for the chart of accounts of one storage backend
pub struct AccountsManager<S: BooksStorage> {
    storage: S,
}

impl<S: BooksStorage> AccountsManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    // -- companies ---------------------------------------------------------

    pub async fn create_company(
        &mut self,
        name: &str,
        fy_start: NaiveDate,
        books_begin: NaiveDate,
    ) -> BooksResult<Company> {
        if name.trim().is_empty() {
            return Err(BooksError::Validation(
                "company name cannot be empty".to_string(),
            ));
        }
        let company = self
            .storage
            .insert_company(Company {
                id: 0,
                name: name.to_string(),
                fy_start,
                books_begin,
            })
            .await?;
        info!(company = company.id, name = %company.name, "company created");
        Ok(company)
    }

    pub async fn get_company(&self, company_id: i64) -> BooksResult<Option<Company>> {
        self.storage.get_company(company_id).await
    }

    /// Delete a company. Refused while the company still owns vouchers.
    pub async fn delete_company(&mut self, company_id: i64) -> BooksResult<()> {
        if self.storage.get_company(company_id).await?.is_none() {
            return Err(BooksError::NotFound(format!("company {}", company_id)));
        }
        if self.storage.company_has_vouchers(company_id).await? {
            return Err(BooksError::Integrity(
                "company still owns vouchers and cannot be deleted".to_string(),
            ));
        }
        self.storage.delete_company(company_id).await?;
        info!(company = company_id, "company deleted");
        Ok(())
    }

    // -- groups ------------------------------------------------------------

    pub async fn create_group(
        &mut self,
        company_id: i64,
        name: &str,
        nature: AccountNature,
        parent_id: Option<i64>,
        special: Option<String>,
    ) -> BooksResult<Group> {
        if name.trim().is_empty() {
            return Err(BooksError::Validation(
                "group name cannot be empty".to_string(),
            ));
        }
        if self.storage.get_company(company_id).await?.is_none() {
            return Err(BooksError::NotFound(format!("company {}", company_id)));
        }
        let existing = self.storage.list_groups(company_id).await?;
        if existing.iter().any(|g| g.name == name) {
            return Err(BooksError::Validation(format!(
                "group '{}' already exists in this company",
                name
            )));
        }
        if let Some(parent_id) = parent_id {
            let parent = self
                .storage
                .get_group(parent_id)
                .await?
                .ok_or_else(|| BooksError::NotFound(format!("parent group {}", parent_id)))?;
            if parent.company_id != company_id {
                return Err(BooksError::Validation(
                    "parent group belongs to a different company".to_string(),
                ));
            }
        }
        self.storage
            .insert_group(Group {
                id: 0,
                company_id,
                name: name.to_string(),
                nature,
                parent_id,
                special,
            })
            .await
    }

    pub async fn get_group(&self, group_id: i64) -> BooksResult<Option<Group>> {
        self.storage.get_group(group_id).await
    }

    pub async fn list_groups(&self, company_id: i64) -> BooksResult<Vec<Group>> {
        self.storage.list_groups(company_id).await
    }

    /// Update a group, refusing any reparenting that would introduce a cycle
    pub async fn update_group(&mut self, group: &Group) -> BooksResult<()> {
        if self.storage.get_group(group.id).await?.is_none() {
            return Err(BooksError::NotFound(format!("group {}", group.id)));
        }
        if let Some(parent_id) = group.parent_id {
            if parent_id == group.id {
                return Err(BooksError::Validation(
                    "a group cannot be its own parent".to_string(),
                ));
            }
            // Walk up from the proposed parent; reaching the group itself
            // means the move closes a cycle.
            let mut cursor = Some(parent_id);
            while let Some(id) = cursor {
                if id == group.id {
                    return Err(BooksError::Validation(format!(
                        "moving group '{}' under group {} would create a cycle",
                        group.name, parent_id
                    )));
                }
                cursor = self
                    .storage
                    .get_group(id)
                    .await?
                    .ok_or_else(|| BooksError::NotFound(format!("parent group {}", id)))?
                    .parent_id;
            }
        }
        self.storage.update_group(group).await
    }

    /// Delete a group. Refused while it still has child groups or ledgers.
    pub async fn delete_group(&mut self, group_id: i64) -> BooksResult<()> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("group {}", group_id)))?;
        let groups = self.storage.list_groups(group.company_id).await?;
        if groups.iter().any(|g| g.parent_id == Some(group_id)) {
            return Err(BooksError::Integrity(format!(
                "group '{}' still has child groups",
                group.name
            )));
        }
        let ledgers = self.storage.list_ledgers(group.company_id).await?;
        if ledgers.iter().any(|l| l.group_id == group_id) {
            return Err(BooksError::Integrity(format!(
                "group '{}' still owns ledgers",
                group.name
            )));
        }
        self.storage.delete_group(group_id).await
    }

    /// Full path from the root group down to `group_id`
    pub async fn group_path(&self, group_id: i64) -> BooksResult<Vec<Group>> {
        let mut path = Vec::new();
        let mut cursor = Some(group_id);
        while let Some(id) = cursor {
            let group = self
                .storage
                .get_group(id)
                .await?
                .ok_or_else(|| BooksError::NotFound(format!("group {}", id)))?;
            cursor = group.parent_id;
            path.insert(0, group);
        }
        Ok(path)
    }

    // -- ledgers -----------------------------------------------------------

    pub async fn create_ledger(
        &mut self,
        company_id: i64,
        name: &str,
        group_id: i64,
        opening_balance: BigDecimal,
    ) -> BooksResult<Ledger> {
        self.create_ledger_full(company_id, name, group_id, opening_balance, None, None, None)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_ledger_full(
        &mut self,
        company_id: i64,
        name: &str,
        group_id: i64,
        opening_balance: BigDecimal,
        gstin: Option<String>,
        state: Option<String>,
        gst_rate: Option<BigDecimal>,
    ) -> BooksResult<Ledger> {
        if name.trim().is_empty() {
            return Err(BooksError::Validation(
                "ledger name cannot be empty".to_string(),
            ));
        }
        if self
            .storage
            .find_ledger_by_name(company_id, name)
            .await?
            .is_some()
        {
            return Err(BooksError::Validation(format!(
                "ledger '{}' already exists in this company",
                name
            )));
        }
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("group {}", group_id)))?;
        if group.company_id != company_id {
            return Err(BooksError::Validation(
                "group belongs to a different company".to_string(),
            ));
        }
        self.storage
            .insert_ledger(Ledger {
                id: 0,
                company_id,
                name: name.to_string(),
                group_id,
                opening_balance,
                gstin,
                state,
                gst_rate,
            })
            .await
    }

    pub async fn get_ledger(&self, ledger_id: i64) -> BooksResult<Option<Ledger>> {
        self.storage.get_ledger(ledger_id).await
    }

    pub async fn get_ledger_required(&self, ledger_id: i64) -> BooksResult<Ledger> {
        self.storage
            .get_ledger(ledger_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("ledger {}", ledger_id)))
    }

    pub async fn list_ledgers(&self, company_id: i64) -> BooksResult<Vec<Ledger>> {
        self.storage.list_ledgers(company_id).await
    }

    pub async fn update_ledger(&mut self, ledger: &Ledger) -> BooksResult<()> {
        let current = self.get_ledger_required(ledger.id).await?;
        if current.name != ledger.name {
            if let Some(other) = self
                .storage
                .find_ledger_by_name(ledger.company_id, &ledger.name)
                .await?
            {
                if other.id != ledger.id {
                    return Err(BooksError::Validation(format!(
                        "ledger '{}' already exists in this company",
                        ledger.name
                    )));
                }
            }
        }
        self.storage.update_ledger(ledger).await
    }

    /// Delete a ledger. Refused while any voucher entry references it.
    pub async fn delete_ledger(&mut self, ledger_id: i64) -> BooksResult<()> {
        let ledger = self.get_ledger_required(ledger_id).await?;
        let entries = self.storage.count_entries_for_ledger(ledger_id).await?;
        if entries > 0 {
            return Err(BooksError::Integrity(format!(
                "ledger '{}' still owns {} entries",
                ledger.name, entries
            )));
        }
        self.storage.delete_ledger(ledger_id).await
    }

    /// Resolve a ledger's placement class through its owning group
    pub async fn classify(&self, ledger: &Ledger) -> BooksResult<LedgerClass> {
        let group = self
            .storage
            .get_group(ledger.group_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("group {}", ledger.group_id)))?;
        Ok(group.classify())
    }

    /// Whether a ledger is a party (debtor/creditor) ledger
    pub async fn is_party_ledger(&self, ledger: &Ledger) -> BooksResult<bool> {
        let group = self
            .storage
            .get_group(ledger.group_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("group {}", ledger.group_id)))?;
        Ok(group.is_party())
    }

    // -- stock items and recipes -------------------------------------------

    pub async fn create_stock_item(
        &mut self,
        company_id: i64,
        name: &str,
        unit: &str,
        opening_qty: BigDecimal,
        opening_value: BigDecimal,
        min_stock: Option<BigDecimal>,
    ) -> BooksResult<StockItem> {
        if name.trim().is_empty() {
            return Err(BooksError::Validation(
                "stock item name cannot be empty".to_string(),
            ));
        }
        if self
            .storage
            .find_stock_item_by_name(company_id, name)
            .await?
            .is_some()
        {
            return Err(BooksError::Validation(format!(
                "stock item '{}' already exists in this company",
                name
            )));
        }
        let running_qty = opening_qty.clone();
        self.storage
            .insert_stock_item(StockItem {
                id: 0,
                company_id,
                name: name.to_string(),
                unit: unit.to_string(),
                group: None,
                opening_qty,
                opening_value,
                running_qty,
                min_stock,
            })
            .await
    }

    pub async fn get_stock_item(&self, item_id: i64) -> BooksResult<Option<StockItem>> {
        self.storage.get_stock_item(item_id).await
    }

    pub async fn list_stock_items(&self, company_id: i64) -> BooksResult<Vec<StockItem>> {
        self.storage.list_stock_items(company_id).await
    }

    pub async fn create_bom(
        &mut self,
        company_id: i64,
        name: &str,
        finished_item_id: i64,
        target_qty: BigDecimal,
        components: Vec<BomComponent>,
    ) -> BooksResult<Bom> {
        if target_qty <= BigDecimal::from(0) {
            return Err(BooksError::Validation(
                "bill of materials target quantity must be positive".to_string(),
            ));
        }
        if components.is_empty() {
            return Err(BooksError::Validation(
                "bill of materials needs at least one component".to_string(),
            ));
        }
        if self
            .storage
            .get_stock_item(finished_item_id)
            .await?
            .is_none()
        {
            return Err(BooksError::NotFound(format!(
                "stock item {}",
                finished_item_id
            )));
        }
        for component in &components {
            if self
                .storage
                .get_stock_item(component.stock_item_id)
                .await?
                .is_none()
            {
                return Err(BooksError::NotFound(format!(
                    "stock item {}",
                    component.stock_item_id
                )));
            }
        }
        self.storage
            .insert_bom(Bom {
                id: 0,
                company_id,
                name: name.to_string(),
                finished_item_id,
                target_qty,
                components,
            })
            .await
    }

    pub async fn get_bom(&self, bom_id: i64) -> BooksResult<Option<Bom>> {
        self.storage.get_bom(bom_id).await
    }
}

/// Utility functions for bootstrapping a chart of accounts
pub mod utils {
    use super::*;

    /// Create the standard groups a fresh company needs, keyed by a short
    /// handle for convenient lookup in callers and tests
    pub async fn create_standard_groups<S: BooksStorage>(
        accounts: &mut AccountsManager<S>,
        company_id: i64,
    ) -> BooksResult<HashMap<String, Group>> {
        let mut groups = HashMap::new();

        let specs: [(&str, &str, AccountNature); 8] = [
            ("cash", "Cash-in-hand", AccountNature::Asset),
            ("bank", "Bank Accounts", AccountNature::Asset),
            ("debtors", "Sundry Debtors", AccountNature::Asset),
            ("creditors", "Sundry Creditors", AccountNature::Liability),
            ("sales", "Sales Accounts", AccountNature::Income),
            ("purchase", "Purchase Accounts", AccountNature::Expense),
            ("duties", "Duties & Taxes", AccountNature::Liability),
            ("expenses", "Indirect Expenses", AccountNature::Expense),
        ];

        for (handle, name, nature) in specs {
            let group = accounts
                .create_group(company_id, name, nature, None, None)
                .await?;
            groups.insert(handle.to_string(), group);
        }

        Ok(groups)
    }
}
