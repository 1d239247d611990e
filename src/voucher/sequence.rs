//! Per-company, per-type monotonic voucher numbering

use crate::traits::BooksStorage;
use crate::types::*;

/// Hands out voucher numbers from the storage-backed counters
///
/// The atomicity lives in [`BooksStorage::next_voucher_number`]: the
/// counter row is locked for the whole read-and-increment, so concurrent
/// callers for the same (company, type) pair always receive distinct
/// numbers. If the increment fails, no voucher may be created with the
/// number that would have been returned.
pub struct Sequencer<S: BooksStorage> {
    storage: S,
}

impl<S: BooksStorage> Sequencer<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Next number for (company, type), starting at 1
    pub async fn next_number(
        &mut self,
        company_id: i64,
        voucher_type: VoucherType,
    ) -> BooksResult<i64> {
        self.storage
            .next_voucher_number(company_id, voucher_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn numbers_are_monotonic_per_company_and_type() {
        let storage = MemoryStorage::new();
        let mut seq = Sequencer::new(storage);

        assert_eq!(seq.next_number(1, VoucherType::Payment).await.unwrap(), 1);
        assert_eq!(seq.next_number(1, VoucherType::Payment).await.unwrap(), 2);
        // independent counter per type and per company
        assert_eq!(seq.next_number(1, VoucherType::Receipt).await.unwrap(), 1);
        assert_eq!(seq.next_number(2, VoucherType::Payment).await.unwrap(), 1);
        assert_eq!(seq.next_number(1, VoucherType::Payment).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_callers_get_distinct_gapless_numbers() {
        let storage = MemoryStorage::new();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let mut seq = Sequencer::new(storage);
                seq.next_number(1, VoucherType::Sales).await.unwrap()
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();
        let expected: Vec<i64> = (1..=32).collect();
        assert_eq!(numbers, expected);
    }
}
