//! Maker-checker verification workflow
//!
//! Pending vouchers surface only here; reports read approved vouchers
//! exclusively. Transitions go through a storage-level compare-and-set so a
//! verify racing an edit, another verify, or a delete resolves to
//! `Conflict`/`NotFound` and never double-applies a side effect.

use tracing::info;

use crate::traits::BooksStorage;
use crate::types::*;
use crate::voucher::store::VoucherStore;

/// Checker-facing queue over pending vouchers
pub struct VerificationQueue<S: BooksStorage> {
    storage: S,
}

impl<S: BooksStorage + Clone> VerificationQueue<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Vouchers awaiting a checker, oldest first
    pub async fn pending(&self, company_id: i64) -> BooksResult<Vec<Voucher>> {
        let mut vouchers = self
            .storage
            .list_vouchers(company_id, Some(VoucherStatus::Pending))
            .await?;
        vouchers.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(vouchers)
    }

    /// Approve a pending voucher
    ///
    /// The status flips Pending -> Approved exactly once; a second call for
    /// the same voucher fails with `Conflict` and applies nothing. Approval
    /// makes the voucher visible to the balance aggregator and stock
    /// valuation, and folds its inventory movements into the running
    /// quantities.
    pub async fn verify(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        user_id: i64,
    ) -> BooksResult<Voucher> {
        let voucher = match self.storage.get_voucher(voucher_id).await? {
            Some(v) if v.company_id == company_id => v,
            _ => return Err(BooksError::NotFound(format!("voucher {}", voucher_id))),
        };

        let flipped = self
            .storage
            .transition_status(voucher_id, VoucherStatus::Pending, VoucherStatus::Approved)
            .await?;
        if !flipped {
            return Err(BooksError::Conflict(format!(
                "voucher {} is not pending; it may already be verified",
                voucher_id
            )));
        }

        // Re-fetch after the flip: an edit may have landed between the
        // snapshot above and the compare-and-set, and the quantities folded
        // into the running stock must come from the entries that were
        // actually approved.
        let voucher = self
            .storage
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("voucher {}", voucher_id)))?;

        let mut store = VoucherStore::new(self.storage.clone());
        store.apply_inventory(&voucher, false).await?;

        self.storage
            .append_audit(AuditRecord::new(
                voucher_id,
                voucher.voucher_type,
                user_id,
                AuditAction::Verified,
                format!(
                    "{} voucher {} approved",
                    voucher.voucher_type.label(),
                    voucher.voucher_no
                ),
            ))
            .await?;

        info!(
            voucher = voucher_id,
            company = company_id,
            checker = user_id,
            "voucher verified"
        );
        Ok(voucher)
    }

    /// Reject a pending voucher
    ///
    /// The voucher is retained in the terminal Rejected state with its
    /// audit trail, but is permanently invisible to every report and to
    /// this queue.
    pub async fn reject(
        &mut self,
        voucher_id: i64,
        company_id: i64,
        user_id: i64,
        reason: &str,
    ) -> BooksResult<()> {
        let voucher = match self.storage.get_voucher(voucher_id).await? {
            Some(v) if v.company_id == company_id => v,
            _ => return Err(BooksError::NotFound(format!("voucher {}", voucher_id))),
        };

        let flipped = self
            .storage
            .transition_status(voucher_id, VoucherStatus::Pending, VoucherStatus::Rejected)
            .await?;
        if !flipped {
            return Err(BooksError::Conflict(format!(
                "voucher {} is not pending and cannot be rejected",
                voucher_id
            )));
        }

        self.storage
            .append_audit(AuditRecord::new(
                voucher_id,
                voucher.voucher_type,
                user_id,
                AuditAction::Rejected,
                format!(
                    "{} voucher {} rejected: {}",
                    voucher.voucher_type.label(),
                    voucher.voucher_no,
                    reason
                ),
            ))
            .await?;

        info!(
            voucher = voucher_id,
            company = company_id,
            checker = user_id,
            "voucher rejected"
        );
        Ok(())
    }
}
