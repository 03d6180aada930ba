//! SQLite-backed history of scored transactions.
//!
//! Every operation opens its own connection and closes it when done, so a
//! failure in one request never poisons a shared handle.

use crate::error::StoreError;
use crate::types::transaction::{NewTransaction, TransactionRecord};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "TransactionID, TransactionType, Amount, OldBalanceSender, \
     NewBalanceSender, OldBalanceReceiver, NewBalanceReceiver, Timestamp, is_fraud, fraud_score";

/// Handle to the `Transactions` table
#[derive(Debug, Clone)]
pub struct TransactionStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl TransactionStore {
    /// Open the store at `path`, creating the file and schema if needed
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path, busy_timeout };
        let conn = store.connect()?;
        conn.execute_batch(include_str!("../sql/schema.sql"))?;

        info!(path = %store.path.display(), "Transaction store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Insert a scored transaction and return its assigned identifier
    pub fn insert(&self, tx: &NewTransaction) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO Transactions
                (TransactionType, Amount, OldBalanceSender, NewBalanceSender,
                 OldBalanceReceiver, NewBalanceReceiver, Timestamp, is_fraud, fraud_score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tx.transaction_type,
                tx.amount,
                tx.old_balance_sender,
                tx.new_balance_sender,
                tx.old_balance_receiver,
                tx.new_balance_receiver,
                tx.timestamp,
                tx.is_fraud,
                tx.fraud_score,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(transaction_id = id, "Transaction stored");
        Ok(id)
    }

    /// Every stored transaction, newest identifier first
    pub fn list_all(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM Transactions ORDER BY TransactionID DESC",
            SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM Transactions", [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Remove every transaction and restart identifiers at 1
    pub fn delete_all(&self) -> Result<usize, StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM Transactions", [])?;
        tx.execute(
            "DELETE FROM sqlite_sequence WHERE name = 'Transactions'",
            [],
        )?;
        tx.commit()?;

        info!(deleted = deleted, "Transaction history cleared");
        Ok(deleted)
    }

    /// Remove the transactions with the given identifiers.
    ///
    /// Identifiers that do not exist are ignored; an empty set does nothing.
    pub fn delete_by_ids(&self, ids: &BTreeSet<i64>) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let conn = self.connect()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM Transactions WHERE TransactionID IN ({})",
                placeholders
            ),
            params_from_iter(ids.iter()),
        )?;

        info!(
            requested = ids.len(),
            deleted = deleted,
            "Selected transactions deleted"
        );
        Ok(deleted)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    Ok(TransactionRecord {
        transaction_id: row.get(0)?,
        transaction_type: row.get(1)?,
        amount: row.get(2)?,
        old_balance_sender: row.get(3)?,
        new_balance_sender: row.get(4)?,
        old_balance_receiver: row.get(5)?,
        new_balance_receiver: row.get(6)?,
        timestamp: row.get(7)?,
        is_fraud: row.get(8)?,
        fraud_score: row.get(9)?,
    })
}
