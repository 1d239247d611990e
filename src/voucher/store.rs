//! Atomic persistence of vouchers with their ledger and inventory legs

use bigdecimal::BigDecimal;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{info, warn};

use crate::traits::BooksStorage;
use crate::types::*;
use crate::voucher::validate::{PostingValidator, ResolvedEntry, StandardPostingValidator};

/// Length of the human-facing transaction code
const CODE_LEN: usize = 8;
/// Collision retries before giving up with `Conflict`
const CODE_ATTEMPTS: usize = 8;

/// Which path posted the voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Maker-created; starts Pending and waits for a checker
    Interactive,
    /// Trusted bulk-import path; starts Approved and skips the checker
    BulkImport,
}

/// Tally of a bulk delete; the batch never aborts on first error
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeleteOutcome {
    pub requested: usize,
    pub deleted: usize,
    /// (voucher id, reason) per failed id
    pub failures: Vec<(i64, String)>,
}

/// Store for voucher create/update/delete, each an all-or-nothing unit
pub struct VoucherStore<S: BooksStorage> {
    storage: S,
    validator: Arc<dyn PostingValidator>,
}

impl<S: BooksStorage> VoucherStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Arc::new(StandardPostingValidator),
        }
    }

    pub fn with_validator(storage: S, validator: Arc<dyn PostingValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a voucher from a draft
    ///
    /// Assigns the voucher number via the sequencer when the draft leaves it
    /// unset, assigns a unique transaction code, validates placement rules,
    /// and writes the audit row. Interactive vouchers start Pending; the
    /// bulk-import channel posts directly as Approved.
    pub async fn create(
        &mut self,
        draft: VoucherDraft,
        user_id: i64,
        channel: Channel,
    ) -> BooksResult<Voucher> {
        if self.storage.get_company(draft.company_id).await?.is_none() {
            return Err(BooksError::NotFound(format!(
                "company {}",
                draft.company_id
            )));
        }

        let resolved = self.resolve_entries(draft.company_id, &draft.entries).await?;
        self.check_inventory_refs(draft.company_id, &draft.inventory_entries)
            .await?;
        if let Err(err) =
            self.validator
                .validate(draft.voucher_type, &resolved, &draft.inventory_entries)
        {
            warn!(company = draft.company_id, kind = draft.voucher_type.label(),
                  %err, "voucher rejected by posting validator");
            return Err(err);
        }

        let voucher_no = match draft.voucher_no {
            Some(no) => {
                if self
                    .storage
                    .find_voucher_by_number(draft.company_id, draft.voucher_type, no)
                    .await?
                    .is_some()
                {
                    return Err(BooksError::Conflict(format!(
                        "{} voucher {} already exists",
                        draft.voucher_type.label(),
                        no
                    )));
                }
                // Keep the sequencer ahead of pinned numbers so later
                // auto-numbered vouchers do not collide with this one.
                self.storage
                    .record_voucher_number(draft.company_id, draft.voucher_type, no)
                    .await?;
                no
            }
            None => {
                self.storage
                    .next_voucher_number(draft.company_id, draft.voucher_type)
                    .await?
            }
        };

        let transaction_code = self.assign_code().await?;
        let status = match channel {
            Channel::Interactive => VoucherStatus::Pending,
            Channel::BulkImport => VoucherStatus::Approved,
        };
        let now = chrono::Utc::now().naive_utc();
        let total_amount = Self::total_amount(&draft);

        let voucher = self
            .storage
            .insert_voucher(Voucher {
                id: 0,
                company_id: draft.company_id,
                voucher_type: draft.voucher_type,
                voucher_no,
                transaction_code,
                date: draft.date,
                narration: draft.narration,
                total_amount,
                status,
                created_by: user_id,
                entries: draft.entries,
                inventory_entries: draft.inventory_entries,
                created_at: now,
                updated_at: now,
            })
            .await?;

        // Only approved movements count towards the materialized quantity.
        if voucher.status == VoucherStatus::Approved {
            self.apply_inventory(&voucher, false).await?;
        }

        self.storage
            .append_audit(AuditRecord::new(
                voucher.id,
                voucher.voucher_type,
                user_id,
                AuditAction::Created,
                format!(
                    "{} voucher {} ({}) created",
                    voucher.voucher_type.label(),
                    voucher.voucher_no,
                    voucher.transaction_code
                ),
            ))
            .await?;

        info!(
            voucher = voucher.id,
            company = voucher.company_id,
            kind = voucher.voucher_type.label(),
            no = voucher.voucher_no,
            "voucher created"
        );
        Ok(voucher)
    }

    /// Replace a pending voucher's entry sets
    ///
    /// Re-runs the posting validator against the new set, then rewrites
    /// both entry collections destructively inside one storage unit. The
    /// rewrite is compare-and-set on the Pending status, so editing an
    /// approved or rejected voucher is a `Conflict`, and so is an edit
    /// that loses the race against a concurrent verify.
    pub async fn update(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        entries: Vec<VoucherEntry>,
        inventory_entries: Vec<InventoryEntry>,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        let voucher = self.get_required(voucher_id, company_id).await?;
        if voucher.status != VoucherStatus::Pending {
            return Err(BooksError::Conflict(format!(
                "voucher {} is no longer pending and cannot be edited",
                voucher_id
            )));
        }

        let resolved = self.resolve_entries(company_id, &entries).await?;
        self.check_inventory_refs(company_id, &inventory_entries)
            .await?;
        self.validator
            .validate(voucher.voucher_type, &resolved, &inventory_entries)?;

        let draft_total = Self::total_amount(&VoucherDraft {
            company_id,
            voucher_type: voucher.voucher_type,
            voucher_no: Some(voucher.voucher_no),
            date: voucher.date,
            narration: voucher.narration.clone(),
            entries: entries.clone(),
            inventory_entries: inventory_entries.clone(),
        });
        let replaced = self
            .storage
            .replace_voucher_entries(
                voucher_id,
                VoucherStatus::Pending,
                entries,
                inventory_entries,
                draft_total,
            )
            .await?;
        if !replaced {
            return Err(BooksError::Conflict(format!(
                "voucher {} is no longer pending and cannot be edited",
                voucher_id
            )));
        }

        self.storage
            .append_audit(AuditRecord::new(
                voucher_id,
                voucher.voucher_type,
                user_id,
                AuditAction::Edited,
                format!(
                    "{} voucher {} entries replaced",
                    voucher.voucher_type.label(),
                    voucher.voucher_no
                ),
            ))
            .await?;

        info!(voucher = voucher_id, company = company_id, "voucher edited");
        self.get_required(voucher_id, company_id).await
    }

    /// Replace a voucher's entries on behalf of the trusted import path
    ///
    /// Unlike [`VoucherStore::update`], this may rewrite an approved
    /// voucher: its old inventory movements are backed out of the running
    /// quantities and the new ones folded in, inside the same logical unit
    /// as the rewrite.
    pub(crate) async fn replace_for_import(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        entries: Vec<VoucherEntry>,
        inventory_entries: Vec<InventoryEntry>,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        let voucher = self.get_required(voucher_id, company_id).await?;

        let resolved = self.resolve_entries(company_id, &entries).await?;
        self.check_inventory_refs(company_id, &inventory_entries)
            .await?;
        self.validator
            .validate(voucher.voucher_type, &resolved, &inventory_entries)?;

        let total = Self::total_amount(&VoucherDraft {
            company_id,
            voucher_type: voucher.voucher_type,
            voucher_no: Some(voucher.voucher_no),
            date: voucher.date,
            narration: voucher.narration.clone(),
            entries: entries.clone(),
            inventory_entries: inventory_entries.clone(),
        });
        // The rewrite is compare-and-set on the status seen above, so the
        // inventory reversal below always backs out exactly the entries
        // that were replaced.
        let swapped = self
            .storage
            .replace_voucher_entries(voucher_id, voucher.status, entries, inventory_entries, total)
            .await?;
        if !swapped {
            return Err(BooksError::Conflict(format!(
                "voucher {} changed status during import and was not replaced",
                voucher_id
            )));
        }

        let replaced = self.get_required(voucher_id, company_id).await?;
        if voucher.status == VoucherStatus::Approved {
            self.apply_inventory(&voucher, true).await?;
            self.apply_inventory(&replaced, false).await?;
        }

        self.storage
            .append_audit(AuditRecord::new(
                voucher_id,
                voucher.voucher_type,
                user_id,
                AuditAction::Edited,
                format!(
                    "{} voucher {} replaced by import",
                    voucher.voucher_type.label(),
                    voucher.voucher_no
                ),
            ))
            .await?;

        info!(voucher = voucher_id, company = company_id, "voucher replaced by import");
        Ok(replaced)
    }

    /// Delete a batch of vouchers
    ///
    /// Per id: approved inventory movements are reversed out of the
    /// materialized running quantity, then entries and header go in one
    /// unit. Failures are collected per id; the rest of the batch proceeds.
    pub async fn delete(
        &mut self,
        ids: &[i64],
        company_id: i64,
        user_id: i64,
    ) -> BooksResult<BulkDeleteOutcome> {
        let mut outcome = BulkDeleteOutcome {
            requested: ids.len(),
            deleted: 0,
            failures: Vec::new(),
        };

        for &id in ids {
            match self.delete_one(id, company_id).await {
                Ok(()) => outcome.deleted += 1,
                Err(err) => {
                    warn!(voucher = id, %err, "bulk delete: voucher skipped");
                    outcome.failures.push((id, err.to_string()));
                }
            }
        }

        info!(
            company = company_id,
            user = user_id,
            requested = outcome.requested,
            deleted = outcome.deleted,
            "bulk delete finished"
        );
        Ok(outcome)
    }

    async fn delete_one(&mut self, voucher_id: i64, company_id: i64) -> BooksResult<()> {
        let voucher = self.get_required(voucher_id, company_id).await?;
        if voucher.status == VoucherStatus::Approved {
            self.apply_inventory(&voucher, true).await?;
        }
        self.storage.delete_voucher(voucher_id).await
    }

    pub async fn get(&self, voucher_id: i64) -> BooksResult<Option<Voucher>> {
        self.storage.get_voucher(voucher_id).await
    }

    pub async fn get_required(&self, voucher_id: i64, company_id: i64) -> BooksResult<Voucher> {
        match self.storage.get_voucher(voucher_id).await? {
            Some(v) if v.company_id == company_id => Ok(v),
            _ => Err(BooksError::NotFound(format!("voucher {}", voucher_id))),
        }
    }

    pub async fn list(
        &self,
        company_id: i64,
        status: Option<VoucherStatus>,
    ) -> BooksResult<Vec<Voucher>> {
        self.storage.list_vouchers(company_id, status).await
    }

    pub async fn audit_trail(&self, voucher_id: i64) -> BooksResult<Vec<AuditRecord>> {
        self.storage.audit_for_voucher(voucher_id).await
    }

    /// Join each entry with its ledger's placement class and party flag
    async fn resolve_entries(
        &self,
        company_id: i64,
        entries: &[VoucherEntry],
    ) -> BooksResult<Vec<ResolvedEntry>> {
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            let ledger = match self.storage.get_ledger(entry.ledger_id).await? {
                Some(l) if l.company_id == company_id => l,
                _ => {
                    return Err(BooksError::NotFound(format!(
                        "ledger {} in company {}",
                        entry.ledger_id, company_id
                    )))
                }
            };
            let group = self
                .storage
                .get_group(ledger.group_id)
                .await?
                .ok_or_else(|| BooksError::NotFound(format!("group {}", ledger.group_id)))?;
            resolved.push(ResolvedEntry::new(
                entry.clone(),
                group.classify(),
                group.is_party(),
            ));
        }
        Ok(resolved)
    }

    async fn check_inventory_refs(
        &self,
        company_id: i64,
        inventory_entries: &[InventoryEntry],
    ) -> BooksResult<()> {
        for entry in inventory_entries {
            match self.storage.get_stock_item(entry.stock_item_id).await? {
                Some(item) if item.company_id == company_id => {}
                _ => {
                    return Err(BooksError::NotFound(format!(
                        "stock item {} in company {}",
                        entry.stock_item_id, company_id
                    )))
                }
            }
        }
        Ok(())
    }

    /// Fold the voucher's approved inventory movements into the running
    /// quantities, or back out (`reverse`) on delete
    pub(crate) async fn apply_inventory(
        &mut self,
        voucher: &Voucher,
        reverse: bool,
    ) -> BooksResult<()> {
        for entry in &voucher.inventory_entries {
            let delta = if reverse {
                -entry.quantity.clone()
            } else {
                entry.quantity.clone()
            };
            self.storage
                .adjust_running_qty(entry.stock_item_id, &delta)
                .await?;
        }
        Ok(())
    }

    /// Display total: the debit side, or the inward inventory value for a
    /// pure stock journal
    fn total_amount(draft: &VoucherDraft) -> BigDecimal {
        if draft.entries.is_empty() {
            draft
                .inventory_entries
                .iter()
                .filter(|e| e.is_inward())
                .map(|e| &e.amount)
                .sum()
        } else {
            draft
                .entries
                .iter()
                .filter(|e| e.is_debit())
                .map(|e| e.magnitude())
                .sum()
        }
    }

    async fn assign_code(&mut self) -> BooksResult<String> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_code();
            if !self.storage.transaction_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(BooksError::Conflict(
            "could not assign a unique transaction code".to_string(),
        ))
    }
}

/// Short random alphanumeric transaction code
fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_are_not_constant() {
        let a = generate_code();
        let b = generate_code();
        // 62^8 codes; two draws colliding means the generator is broken
        assert_ne!(a, b);
    }
}
