//! SQLite-backed store.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row};

use crate::error::Error;

/// A connection to a mapped database file.
///
/// Every statement prepared through the store is owned by the calling scope
/// and finalized when that scope ends, including on early return and error
/// paths. A store must not be shared across threads.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open a database file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open a database file read-only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Wrap an already opened connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a query and hand every row to `on_row` until it returns `false`.
    ///
    /// Returns `false` if the callback stopped the scan early.
    pub fn for_each_row<P, F>(&self, sql: &str, params: P, mut on_row: F) -> Result<bool, Error>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> Result<bool, Error>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            if !on_row(row)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Collect a single-column integer result.
    pub fn query_ids<P: Params>(&self, sql: &str, params: P) -> Result<Vec<i64>, Error> {
        let mut ids = Vec::new();
        self.for_each_row(sql, params, |row| {
            ids.push(row.get(0)?);
            Ok(true)
        })?;
        Ok(ids)
    }

    /// Run a query expected to return one integer.
    pub fn query_count<P: Params>(&self, sql: &str, params: P) -> Result<i64, Error> {
        Ok(self.conn.query_row(sql, params, |row| row.get(0))?)
    }

    /// Run a query returning at most one text value.
    pub fn query_optional_text<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<String>, Error> {
        let value: Option<Option<String>> = self
            .conn
            .query_row(sql, params, |row| row.get(0))
            .optional()?;
        Ok(value.flatten())
    }
}

/// Quote an identifier for use in generated SQL.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let store = Store::from_connection(Connection::open_in_memory().unwrap());
        store
            .connection()
            .execute_batch(
                "CREATE TABLE t(Id INTEGER PRIMARY KEY, Name TEXT);
                 INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, NULL);",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_for_each_row_stops_early() {
        let store = store();
        let mut seen = Vec::new();
        let completed = store
            .for_each_row("SELECT Id FROM t ORDER BY Id", [], |row| {
                seen.push(row.get::<_, i64>(0)?);
                Ok(seen.len() < 2)
            })
            .unwrap();

        assert!(!completed);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_query_helpers() {
        let store = store();
        assert_eq!(
            store.query_ids("SELECT Id FROM t ORDER BY Id", []).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(store.query_count("SELECT COUNT(*) FROM t", []).unwrap(), 3);
        assert_eq!(
            store
                .query_optional_text("SELECT Name FROM t WHERE Id=?1", [1])
                .unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            store
                .query_optional_text("SELECT Name FROM t WHERE Id=?1", [3])
                .unwrap(),
            None
        );
        assert_eq!(
            store
                .query_optional_text("SELECT Name FROM t WHERE Id=?1", [9])
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("ts_Widget"), "[ts_Widget]");
        assert_eq!(quote_ident("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_statement_error_is_returned() {
        let store = store();
        let err = store.for_each_row("SELECT * FROM missing", [], |_| Ok(true));
        assert!(matches!(err, Err(Error::Sqlite(_))));
    }
}
