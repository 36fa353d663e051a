//! Adapters implementing the domain ports.

pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::transaction::Transaction;
use std::cmp::Reverse;

/// Orders history newest first; records with equal timestamps keep the most
/// recently appended first.
pub(crate) fn newest_first(records: &mut [Transaction]) {
    records.sort_by_key(|record| Reverse((record.timestamp, record.record_id)));
}
