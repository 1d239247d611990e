//! Stock valuation under Weighted Average Cost
//!
//! Outward movements never track their own cost: they exit at the average
//! rate computed from the full inward history (opening plus every approved
//! inward entry). BOM-driven production moves are ordinary inventory
//! entries and are valued uniformly with purchases and sales.

use bigdecimal::BigDecimal;

use crate::traits::BooksStorage;
use crate::types::*;

/// Closing position of one stock item
#[derive(Debug, Clone, PartialEq)]
pub struct StockValuation {
    pub stock_item_id: i64,
    pub qty: BigDecimal,
    pub avg_rate: BigDecimal,
    pub value: BigDecimal,
}

/// One row of the stock summary report
#[derive(Debug, Clone, PartialEq)]
pub struct StockSummaryRow {
    pub item: StockItem,
    pub valuation: StockValuation,
    /// Closing quantity fell below the reorder threshold
    pub below_min: bool,
}

/// Read-only stock valuation over a storage backend
pub struct StockReporter<S: BooksStorage> {
    storage: S,
}

impl<S: BooksStorage> StockReporter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Weighted-average closing position of one item
    pub async fn closing_stock(&self, stock_item_id: i64) -> BooksResult<StockValuation> {
        let item = self
            .storage
            .get_stock_item(stock_item_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("stock item {}", stock_item_id)))?;

        let vouchers = self.storage.vouchers_for_stock_item(stock_item_id).await?;

        let mut inward_qty = item.opening_qty.clone();
        let mut inward_value = item.opening_value.clone();
        let mut outward_qty = BigDecimal::from(0);

        for voucher in vouchers
            .iter()
            .filter(|v| v.status == VoucherStatus::Approved)
        {
            for entry in voucher
                .inventory_entries
                .iter()
                .filter(|e| e.stock_item_id == stock_item_id)
            {
                if entry.is_inward() {
                    inward_qty += &entry.quantity;
                    inward_value += &entry.amount;
                } else {
                    outward_qty += entry.quantity.abs();
                }
            }
        }

        let avg_rate = if inward_qty == BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            &inward_value / &inward_qty
        };
        let qty = &inward_qty - &outward_qty;
        let value = &qty * &avg_rate;

        Ok(StockValuation {
            stock_item_id,
            qty,
            avg_rate,
            value,
        })
    }

    /// Valuation of every item of a company, with reorder flags
    pub async fn stock_summary(&self, company_id: i64) -> BooksResult<Vec<StockSummaryRow>> {
        let items = self.storage.list_stock_items(company_id).await?;
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let valuation = self.closing_stock(item.id).await?;
            let below_min = match &item.min_stock {
                Some(min) => valuation.qty < *min,
                None => false,
            };
            rows.push(StockSummaryRow {
                item,
                valuation,
                below_min,
            });
        }
        Ok(rows)
    }

    /// Rebuild the materialized running quantity from the entry history
    /// (the ground truth) and persist the corrected figure
    pub async fn recompute_running_qty(&mut self, stock_item_id: i64) -> BooksResult<BigDecimal> {
        let mut item = self
            .storage
            .get_stock_item(stock_item_id)
            .await?
            .ok_or_else(|| BooksError::NotFound(format!("stock item {}", stock_item_id)))?;

        let vouchers = self.storage.vouchers_for_stock_item(stock_item_id).await?;
        let moved: BigDecimal = vouchers
            .iter()
            .filter(|v| v.status == VoucherStatus::Approved)
            .flat_map(|v| &v.inventory_entries)
            .filter(|e| e.stock_item_id == stock_item_id)
            .map(|e| &e.quantity)
            .sum();

        let recomputed = &item.opening_qty + &moved;
        if recomputed != item.running_qty {
            item.running_qty = recomputed.clone();
            self.storage.update_stock_item(&item).await?;
        }
        Ok(recomputed)
    }

    /// Expand a bill of materials into the inventory entries of a
    /// production stock journal
    ///
    /// Each component is issued at `component quantity x scale` outward at
    /// its current average rate; the finished good comes inward at the
    /// total component cost.
    pub async fn production_entries(
        &self,
        bom: &Bom,
        scale: BigDecimal,
    ) -> BooksResult<Vec<InventoryEntry>> {
        if scale <= BigDecimal::from(0) {
            return Err(BooksError::Validation(
                "production scale must be positive".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(bom.components.len() + 1);
        let mut consumed_value = BigDecimal::from(0);

        for component in &bom.components {
            let valuation = self.closing_stock(component.stock_item_id).await?;
            let qty = &component.quantity * &scale;
            let cost = &qty * &valuation.avg_rate;
            consumed_value += &cost;
            entries.push(InventoryEntry {
                stock_item_id: component.stock_item_id,
                quantity: -qty,
                rate: valuation.avg_rate,
                amount: -cost,
            });
        }

        let finished_qty = &bom.target_qty * &scale;
        let finished_rate = if finished_qty == BigDecimal::from(0) {
            BigDecimal::from(0)
        } else {
            &consumed_value / &finished_qty
        };
        entries.push(InventoryEntry {
            stock_item_id: bom.finished_item_id,
            quantity: finished_qty,
            rate: finished_rate,
            amount: consumed_value,
        });

        Ok(entries)
    }
}
