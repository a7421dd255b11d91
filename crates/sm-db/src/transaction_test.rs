use super::*;

/// Records the calls made against it; `fail_commit` makes COMMIT fail.
#[derive(Default)]
struct CallLog {
    calls: Vec<&'static str>,
    fail_commit: bool,
}

impl Database for CallLog {
    fn open(&mut self) -> DbResult<()> {
        Ok(())
    }
    fn close(&mut self) -> DbResult<()> {
        Ok(())
    }
    fn is_open(&self) -> bool {
        true
    }
    fn begin(&mut self) -> DbResult<()> {
        self.calls.push("begin");
        Ok(())
    }
    fn commit(&mut self) -> DbResult<()> {
        self.calls.push("commit");
        if self.fail_commit {
            return Err(DbError::TransactionError("COMMIT failed".into()));
        }
        Ok(())
    }
    fn rollback(&mut self) -> DbResult<()> {
        self.calls.push("rollback");
        Ok(())
    }
    fn execute(&mut self, _query: &SqlQuery) -> DbResult<usize> {
        self.calls.push("execute");
        Ok(1)
    }
    fn query_scalar(&mut self, _query: &SqlQuery) -> DbResult<SqlValue> {
        self.calls.push("scalar");
        Ok(SqlValue::Null)
    }
    fn db_type(&self) -> &'static str {
        "call-log"
    }
}

#[test]
fn test_commit_does_not_roll_back_on_drop() {
    let mut db = CallLog::default();
    {
        let mut tx = Transaction::begin(&mut db).unwrap();
        tx.execute(&SqlQuery::new("x")).unwrap();
        tx.commit().unwrap();
        assert!(!tx.is_active());
    }
    assert_eq!(db.calls, vec!["begin", "execute", "commit"]);
}

#[test]
fn test_drop_while_active_rolls_back() {
    let mut db = CallLog::default();
    {
        let mut tx = Transaction::begin(&mut db).unwrap();
        tx.execute(&SqlQuery::new("x")).unwrap();
    }
    assert_eq!(db.calls, vec!["begin", "execute", "rollback"]);
}

#[test]
fn test_explicit_rollback_is_not_repeated() {
    let mut db = CallLog::default();
    {
        let mut tx = Transaction::begin(&mut db).unwrap();
        tx.rollback().unwrap();
        assert!(tx.execute(&SqlQuery::new("x")).is_err());
    }
    assert_eq!(db.calls, vec!["begin", "rollback"]);
}

#[test]
fn test_failed_commit_stays_active() {
    let mut db = CallLog {
        fail_commit: true,
        ..Default::default()
    };
    {
        let mut tx = Transaction::begin(&mut db).unwrap();
        assert!(tx.commit().is_err());
        assert!(tx.is_active());
        tx.rollback().unwrap();
    }
    assert_eq!(db.calls, vec!["begin", "commit", "rollback"]);
}

#[test]
fn test_commit_twice_fails() {
    let mut db = CallLog::default();
    let mut tx = Transaction::begin(&mut db).unwrap();
    tx.commit().unwrap();
    let err = tx.commit().unwrap_err();
    assert!(err.to_string().contains("already committed"));
}
