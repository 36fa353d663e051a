use super::newest_first;
use crate::domain::ports::TransactionLog;
use crate::domain::transaction::{RecordId, Transaction};
use crate::error::StorageError;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding the transaction log.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent, append-only transaction log backed by RocksDB.
///
/// Records are keyed by their big-endian record id, so iteration order is
/// insertion order and ids keep increasing across restarts.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbTransactionLog {
    db: Arc<DB>,
    last_id: Arc<Mutex<RecordId>>,
}

impl RocksDbTransactionLog {
    /// Opens or creates the log at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions])?;

        let last_id = {
            let cf = column_family(&db)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_key(&key)?
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            last_id: Arc::new(Mutex::new(last_id)),
        })
    }
}

fn column_family(db: &DB) -> Result<&ColumnFamily, StorageError> {
    db.cf_handle(CF_TRANSACTIONS)
        .ok_or_else(|| StorageError::Backend("Transactions column family not found".to_string()))
}

fn decode_key(key: &[u8]) -> Result<RecordId, StorageError> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| StorageError::Backend(format!("Malformed record key of {} bytes", key.len())))?;
    Ok(RecordId::from_be_bytes(bytes))
}

#[async_trait]
impl TransactionLog for RocksDbTransactionLog {
    async fn append(&self, mut record: Transaction) -> Result<Transaction, StorageError> {
        let cf = column_family(&self.db)?;
        let mut last_id = self.last_id.lock().await;

        let id = *last_id + 1;
        record.record_id = Some(id);
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, id.to_be_bytes(), value)?;

        *last_id = id;
        Ok(record)
    }

    async fn find_by_account(&self, account_number: &str) -> Result<Vec<Transaction>, StorageError> {
        let cf = column_family(&self.db)?;

        let mut matching = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: Transaction = serde_json::from_slice(&value)?;
            if record.involves(account_number) {
                matching.push(record);
            }
        }

        newest_first(&mut matching);
        Ok(matching)
    }
}
