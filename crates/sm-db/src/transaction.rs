//! Scoped transaction guard.
//!
//! A [`Transaction`] borrows the database mutably for its whole lifetime,
//! so no statement can run outside it while it is open. If the guard is
//! dropped while still active (early return, `?`, panic), it rolls back.

use crate::error::{DbError, DbResult};
use crate::query::SqlQuery;
use crate::traits::Database;
use crate::value::SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// An open transaction on a [`Database`].
pub struct Transaction<'a, D: Database + ?Sized> {
    db: &'a mut D,
    state: TxState,
}

impl<'a, D: Database + ?Sized> Transaction<'a, D> {
    /// Begin a transaction on `db`.
    pub fn begin(db: &'a mut D) -> DbResult<Self> {
        db.begin()?;
        Ok(Self {
            db,
            state: TxState::Active,
        })
    }

    /// Whether neither commit nor rollback has completed yet.
    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    /// Execute a statement inside the transaction.
    pub fn execute(&mut self, query: &SqlQuery) -> DbResult<usize> {
        self.ensure_active()?;
        self.db.execute(query)
    }

    /// Run a scalar query inside the transaction.
    pub fn query_scalar(&mut self, query: &SqlQuery) -> DbResult<SqlValue> {
        self.ensure_active()?;
        self.db.query_scalar(query)
    }

    /// Commit.
    ///
    /// On failure the transaction stays active so the caller can roll it
    /// back explicitly; otherwise the drop guard does.
    pub fn commit(&mut self) -> DbResult<()> {
        self.ensure_active()?;
        self.db.commit()?;
        self.state = TxState::Committed;
        Ok(())
    }

    /// Roll back. The transaction is finished afterwards even if the
    /// rollback itself failed, so the drop guard never retries.
    pub fn rollback(&mut self) -> DbResult<()> {
        self.ensure_active()?;
        self.state = TxState::RolledBack;
        self.db.rollback()
    }

    fn ensure_active(&self) -> DbResult<()> {
        match self.state {
            TxState::Active => Ok(()),
            TxState::Committed => Err(DbError::TransactionError(
                "transaction already committed".to_string(),
            )),
            TxState::RolledBack => Err(DbError::TransactionError(
                "transaction already rolled back".to_string(),
            )),
        }
    }
}

impl<D: Database + ?Sized> Drop for Transaction<'_, D> {
    fn drop(&mut self) {
        if self.state == TxState::Active {
            log::warn!("Transaction dropped while active; rolling back");
            if let Err(e) = self.db.rollback() {
                log::error!("Rollback on drop failed: {e}");
            }
        }
    }
}

#[cfg(test)]
#[path = "transaction_test.rs"]
mod tests;
