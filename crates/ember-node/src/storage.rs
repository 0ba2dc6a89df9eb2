//! RocksDB-backed persistent board storage.
//!
//! Column families hold live entries, every id ever admitted, owed refunds,
//! and metadata. Each board mutation is written as one atomic
//! [`WriteBatch`] so a crash never leaves an admission half-applied.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};

use ember_board::{Admission, BoardSnapshot};
use ember_core::constants::{MESSAGE_ID_LEN, SENDER_LEN};
use ember_core::error::EmberError;
use ember_core::types::{Amount, Entry, MessageId, Sender};

// --- Column family names ---

const CF_ENTRIES: &str = "entries";
const CF_SEEN: &str = "seen";
const CF_REFUNDS: &str = "refunds";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[CF_ENTRIES, CF_SEEN, CF_REFUNDS, CF_METADATA];

// --- Metadata keys ---

const META_NEXT_SEQ: &[u8] = b"next_seq";

/// Persistent board state.
///
/// Keys are raw id or sender bytes. Entries are bincode-encoded; refund
/// balances and metadata counters are little-endian integers.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all column families if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EmberError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| EmberError::Storage(e.to_string()))?;

        Ok(Self { db })
    }

    /// Load everything needed to rebuild the in-memory board.
    pub fn load_snapshot(&self) -> Result<BoardSnapshot, EmberError> {
        Ok(BoardSnapshot {
            entries: self.entries()?,
            seen: self.seen_ids()?,
            refunds: self.refunds()?,
            next_seq: self.next_seq()?,
        })
    }

    /// Atomically record an admission: the new entry and its id, plus the
    /// evicted entry's removal and its sender's new refund balance.
    pub fn persist_admission(&self, admission: &Admission) -> Result<(), EmberError> {
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let cf_seen = self.cf_handle(CF_SEEN)?;
        let cf_refunds = self.cf_handle(CF_REFUNDS)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;

        let entry = &admission.entry;
        let encoded = bincode::encode_to_vec(entry, bincode::config::standard())
            .map_err(|e| EmberError::Storage(e.to_string()))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_entries, entry.id.as_bytes(), &encoded);
        batch.put_cf(cf_seen, entry.id.as_bytes(), b"");

        if let Some(victim) = &admission.evicted {
            batch.delete_cf(cf_entries, victim.id.as_bytes());
            batch.put_cf(
                cf_refunds,
                victim.sender.as_bytes(),
                admission.refund_balance.to_le_bytes(),
            );
        }

        let next_seq = entry.seq.saturating_add(1).max(self.next_seq()?);
        batch.put_cf(cf_meta, META_NEXT_SEQ, next_seq.to_le_bytes());

        self.db
            .write(batch)
            .map_err(|e| EmberError::Storage(e.to_string()))
    }

    /// Remove a sender's refund balance after a withdrawal.
    pub fn persist_withdrawal(&self, sender: &Sender) -> Result<(), EmberError> {
        let cf = self.cf_handle(CF_REFUNDS)?;
        self.db
            .delete_cf(cf, sender.as_bytes())
            .map_err(|e| EmberError::Storage(e.to_string()))
    }

    /// Look up a live entry by id.
    pub fn get_entry(&self, id: &MessageId) -> Result<Option<Entry>, EmberError> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        match self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| EmberError::Storage(e.to_string()))?
        {
            Some(bytes) => Self::decode_entry(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Refund balance stored for `sender`, zero when absent.
    pub fn refund_balance(&self, sender: &Sender) -> Result<Amount, EmberError> {
        let cf = self.cf_handle(CF_REFUNDS)?;
        match self
            .db
            .get_cf(cf, sender.as_bytes())
            .map_err(|e| EmberError::Storage(e.to_string()))?
        {
            Some(bytes) => Self::decode_amount(&bytes),
            None => Ok(0),
        }
    }

    /// All live entries, in key order.
    pub fn entries(&self) -> Result<Vec<Entry>, EmberError> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item.map_err(|e| EmberError::Storage(e.to_string()))?;
            entries.push(Self::decode_entry(&value)?);
        }
        Ok(entries)
    }

    /// Every id ever admitted, evicted ones included.
    pub fn seen_ids(&self) -> Result<Vec<MessageId>, EmberError> {
        let cf = self.cf_handle(CF_SEEN)?;
        let mut ids = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _) = item.map_err(|e| EmberError::Storage(e.to_string()))?;
            let bytes = <[u8; MESSAGE_ID_LEN]>::try_from(&key[..]).map_err(|_| {
                EmberError::Storage(format!("invalid message id key length: {}", key.len()))
            })?;
            ids.push(MessageId(bytes));
        }
        Ok(ids)
    }

    /// All non-zero refund balances.
    pub fn refunds(&self) -> Result<Vec<(Sender, Amount)>, EmberError> {
        let cf = self.cf_handle(CF_REFUNDS)?;
        let mut refunds = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item.map_err(|e| EmberError::Storage(e.to_string()))?;
            let bytes = <[u8; SENDER_LEN]>::try_from(&key[..]).map_err(|_| {
                EmberError::Storage(format!("invalid sender key length: {}", key.len()))
            })?;
            let amount = Self::decode_amount(&value)?;
            if amount > 0 {
                refunds.push((Sender(bytes), amount));
            }
        }
        Ok(refunds)
    }

    /// Next admission sequence number, zero on a fresh database.
    pub fn next_seq(&self) -> Result<u64, EmberError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self
            .db
            .get_cf(cf, META_NEXT_SEQ)
            .map_err(|e| EmberError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    EmberError::Storage("invalid metadata value length".into())
                })?;
                Ok(u64::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    /// Whether no entry has ever been admitted.
    pub fn is_empty(&self) -> Result<bool, EmberError> {
        let cf = self.cf_handle(CF_SEEN)?;
        Ok(self
            .db
            .iterator_cf(cf, rocksdb::IteratorMode::Start)
            .next()
            .is_none())
    }

    // --- Internal helpers ---

    /// Get a column family handle.
    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, EmberError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EmberError::Storage(format!("missing column family: {name}")))
    }

    fn decode_entry(bytes: &[u8]) -> Result<Entry, EmberError> {
        let (entry, _): (Entry, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| EmberError::Storage(e.to_string()))?;
        Ok(entry)
    }

    fn decode_amount(bytes: &[u8]) -> Result<Amount, EmberError> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| EmberError::Storage("invalid refund balance length".into()))?;
        Ok(Amount::from_le_bytes(arr))
    }
}
