//! SQLite implementation of the QueueStore trait.
//!
//! The persistent backend for the deferred queue. Uses rusqlite with bundled
//! SQLite behind a mutex; every call is a single short statement.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use namereg_core::{decode_transaction, Maturity, QueuedTransaction, Txid};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{PutResult, QueueStore};

/// SQLite-backed deferred queue.
///
/// Thread-safe via internal Mutex.
pub struct SqliteQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened queue store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }
}

struct QueueRow {
    txid: Vec<u8>,
    raw_tx: Vec<u8>,
    depends_on: Option<Vec<u8>>,
    min_depth: Option<u32>,
    queued_at: i64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRow> {
    Ok(QueueRow {
        txid: row.get("txid")?,
        raw_tx: row.get("raw_tx")?,
        depends_on: row.get("depends_on")?,
        min_depth: row.get("min_depth")?,
        queued_at: row.get("queued_at")?,
    })
}

impl QueueRow {
    /// Decode the stored bytes and check them against the row key.
    fn into_entry(self) -> Result<QueuedTransaction> {
        let txid = Txid::try_from(self.txid.as_slice())
            .map_err(|_| StoreError::InvalidData("txid must be 32 bytes".into()))?;
        let tx = decode_transaction(&self.raw_tx)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", txid, e)))?;
        if tx.txid() != txid {
            return Err(StoreError::InvalidData(format!(
                "row {} holds transaction {}",
                txid,
                tx.txid()
            )));
        }

        let maturity = match (self.depends_on, self.min_depth) {
            (Some(dep), Some(depth)) => {
                let depends_on = Txid::try_from(dep.as_slice())
                    .map_err(|_| StoreError::InvalidData("depends_on must be 32 bytes".into()))?;
                Some(Maturity::new(depends_on, depth))
            }
            (None, None) => None,
            _ => {
                return Err(StoreError::InvalidData(format!(
                    "row {} has partial maturity metadata",
                    txid
                )))
            }
        };

        Ok(QueuedTransaction {
            txid,
            tx,
            maturity,
            queued_at: self.queued_at,
        })
    }
}

impl QueueStore for SqliteQueueStore {
    fn put(&self, entry: &QueuedTransaction) -> Result<PutResult> {
        let raw = entry.raw_bytes();
        let depends_on = entry.maturity.map(|m| m.depends_on.0.to_vec());
        let min_depth = entry.maturity.map(|m| m.depth);

        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO queued_transactions
                    (txid, raw_tx, depends_on, min_depth, queued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.txid.as_bytes().as_slice(),
                    raw,
                    depends_on,
                    min_depth,
                    entry.queued_at
                ],
            )?;

            if inserted == 0 {
                tracing::debug!(txid = %entry.txid, "transaction already queued");
                Ok(PutResult::AlreadyQueued)
            } else {
                tracing::debug!(txid = %entry.txid, "queued transaction");
                Ok(PutResult::Queued)
            }
        })
    }

    fn get(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT txid, raw_tx, depends_on, min_depth, queued_at
                     FROM queued_transactions WHERE txid = ?1",
                    params![txid.as_bytes().as_slice()],
                    read_row,
                )
                .optional()?)
        })?;
        row.map(QueueRow::into_entry).transpose()
    }

    /// Deletes by key. A row that no longer decodes is still deleted and
    /// reported as `None`.
    fn remove(&self, txid: &Txid) -> Result<Option<QueuedTransaction>> {
        let row = self.with_conn(|conn| {
            let key = txid.as_bytes().as_slice();
            let row = conn
                .query_row(
                    "SELECT txid, raw_tx, depends_on, min_depth, queued_at
                     FROM queued_transactions WHERE txid = ?1",
                    params![key],
                    read_row,
                )
                .optional()?;
            if row.is_some() {
                conn.execute("DELETE FROM queued_transactions WHERE txid = ?1", params![key])?;
            }
            Ok(row)
        })?;

        let Some(row) = row else {
            return Ok(None);
        };
        match row.into_entry() {
            Ok(entry) => {
                tracing::debug!(%txid, "removed queued transaction");
                Ok(Some(entry))
            }
            Err(e) => {
                tracing::warn!(%txid, error = %e, "removed undecodable queued transaction");
                Ok(None)
            }
        }
    }

    fn list(&self) -> Result<BTreeMap<Txid, QueuedTransaction>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT txid, raw_tx, depends_on, min_depth, queued_at
                 FROM queued_transactions ORDER BY txid",
            )?;
            let rows = stmt
                .query_map([], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|row| row.into_entry().map(|e| (e.txid, e)))
            .collect()
    }

    fn contains(&self, txid: &Txid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM queued_transactions WHERE txid = ?1",
                    params![txid.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM queued_transactions", [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namereg_core::{Keypair, OutPoint, Script, Transaction, TxIn, TxOut};

    fn entry(seed: u8, maturity: Option<Maturity>) -> QueuedTransaction {
        let key = Keypair::from_seed(&[seed; 32]).public_key();
        let tx = Transaction::new(
            vec![TxIn::new(OutPoint::new(Txid::from_bytes([seed; 32]), 0))],
            vec![TxOut::new(1_000, Script::pay_to_key(&key))],
        );
        QueuedTransaction::new(tx, maturity, 1_736_870_400_000)
    }

    #[test]
    fn test_put_get_remove() {
        let store = SqliteQueueStore::open_memory().unwrap();
        let e = entry(1, Some(Maturity::new(Txid::from_bytes([9; 32]), 12)));

        assert_eq!(store.put(&e).unwrap(), PutResult::Queued);
        assert_eq!(store.get(&e.txid).unwrap(), Some(e.clone()));
        assert!(store.contains(&e.txid).unwrap());

        assert_eq!(store.remove(&e.txid).unwrap(), Some(e.clone()));
        assert_eq!(store.get(&e.txid).unwrap(), None);
        assert_eq!(store.remove(&e.txid).unwrap(), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = SqliteQueueStore::open_memory().unwrap();
        let e = entry(2, None);

        assert_eq!(store.put(&e).unwrap(), PutResult::Queued);
        assert_eq!(store.put(&e).unwrap(), PutResult::AlreadyQueued);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_list_is_keyed_by_txid() {
        let store = SqliteQueueStore::open_memory().unwrap();
        let a = entry(3, None);
        let b = entry(4, Some(Maturity::new(Txid::from_bytes([1; 32]), 1)));
        store.put(&a).unwrap();
        store.put(&b).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.get(&a.txid), Some(&a));
        assert_eq!(listed.get(&b.txid), Some(&b));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let e = entry(5, Some(Maturity::new(Txid::from_bytes([7; 32]), 12)));

        {
            let store = SqliteQueueStore::open(&path).unwrap();
            store.put(&e).unwrap();
        }

        let store = SqliteQueueStore::open(&path).unwrap();
        assert_eq!(store.get(&e.txid).unwrap(), Some(e));
    }

    #[test]
    fn test_detects_tampered_row() {
        let store = SqliteQueueStore::open_memory().unwrap();
        let a = entry(6, None);
        let b = entry(7, None);
        store.put(&a).unwrap();

        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE queued_transactions SET raw_tx = ?1 WHERE txid = ?2",
                    params![b.raw_bytes(), a.txid.as_bytes().as_slice()],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(store.get(&a.txid), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_undecodable_row_can_be_removed() {
        let store = SqliteQueueStore::open_memory().unwrap();
        let bad = entry(8, None);
        let good = entry(9, None);
        store.put(&bad).unwrap();
        store.put(&good).unwrap();

        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE queued_transactions SET raw_tx = ?1 WHERE txid = ?2",
                    params![vec![0xffu8; 7], bad.txid.as_bytes().as_slice()],
                )?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(store.list(), Err(StoreError::Serialization(_))));

        assert_eq!(store.remove(&bad.txid).unwrap(), None);
        assert!(!store.contains(&bad.txid).unwrap());
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.get(&good.txid), Some(&good));
    }
}
