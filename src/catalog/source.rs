//! Backing source of catalog truth.
//!
//! The catalog pulls schema names, table names and CREATE TABLE text from a
//! [`CatalogSource`] on first touch only; everything after that is served
//! from the in-memory overlay. DML pre-images are read through the same
//! trait so tests can script row data.

use std::collections::HashMap;

use crate::error::ReviewResult;

/// One result row: column name to nullable text value.
pub type Row = HashMap<String, Option<String>>;

/// Read-only access to a live database used to seed the virtual catalog.
///
/// Implementations must report connectivity failures as
/// [`ReviewError::RemoteUnavailable`](crate::error::ReviewError); an absent
/// object is an empty answer, never an error.
pub trait CatalogSource {
    /// Names of all schemas visible to the reviewing account.
    fn list_schemas(&self) -> ReviewResult<Vec<String>>;

    /// Names of all tables in `schema`. Empty when the schema has no tables
    /// or does not exist.
    fn list_tables(&self, schema: &str) -> ReviewResult<Vec<String>>;

    /// The `SHOW CREATE TABLE` text for a table, or `None` when it does not
    /// exist.
    fn fetch_create_table(&self, schema: &str, table: &str) -> ReviewResult<Option<String>>;

    /// Run a read-only query and return its rows. Used for DML pre-images.
    fn query_rows(&self, sql: &str) -> ReviewResult<Vec<Row>>;
}

pub mod memory {
    //! In-memory [`CatalogSource`] for tests and dry runs.

    use super::*;
    use crate::error::remote_error;
    use std::cell::{Cell, RefCell};

    /// Scriptable in-memory source that counts every fetch, so tests can
    /// assert the catalog loads each piece of remote state at most once.
    /// Single-threaded by construction; wrap it in an `Rc` to keep a handle
    /// on the counters after the catalog takes ownership.
    #[derive(Default)]
    pub struct MemorySource {
        schemas: Vec<String>,
        tables: HashMap<String, Vec<String>>,
        create_tables: HashMap<(String, String), String>,
        rows: RefCell<HashMap<String, Vec<Row>>>,
        offline: Cell<bool>,
        pub schema_calls: Cell<usize>,
        pub table_calls: Cell<usize>,
        pub create_calls: Cell<usize>,
        pub row_calls: Cell<usize>,
    }

    impl MemorySource {
        pub fn new(schemas: &[&str]) -> Self {
            Self {
                schemas: schemas.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn with_table(mut self, schema: &str, table: &str, create_sql: &str) -> Self {
            self.tables
                .entry(schema.to_string())
                .or_default()
                .push(table.to_string());
            self.create_tables
                .insert((schema.to_string(), table.to_string()), create_sql.to_string());
            self
        }

        /// Script the rows returned for an exact query text.
        pub fn with_rows(self, sql: &str, rows: Vec<Row>) -> Self {
            self.rows.borrow_mut().insert(sql.to_string(), rows);
            self
        }

        /// Take the source offline: every call fails with
        /// `RemoteUnavailable` until it is brought back.
        pub fn set_offline(&self, offline: bool) {
            self.offline.set(offline);
        }

        fn reachable(&self) -> ReviewResult<()> {
            if self.offline.get() {
                return Err(remote_error("memory source is offline"));
            }
            Ok(())
        }
    }

    impl CatalogSource for MemorySource {
        fn list_schemas(&self) -> ReviewResult<Vec<String>> {
            self.reachable()?;
            self.schema_calls.set(self.schema_calls.get() + 1);
            Ok(self.schemas.clone())
        }

        fn list_tables(&self, schema: &str) -> ReviewResult<Vec<String>> {
            self.reachable()?;
            self.table_calls.set(self.table_calls.get() + 1);
            Ok(self.tables.get(schema).cloned().unwrap_or_default())
        }

        fn fetch_create_table(&self, schema: &str, table: &str) -> ReviewResult<Option<String>> {
            self.reachable()?;
            self.create_calls.set(self.create_calls.get() + 1);
            Ok(self
                .create_tables
                .get(&(schema.to_string(), table.to_string()))
                .cloned())
        }

        fn query_rows(&self, sql: &str) -> ReviewResult<Vec<Row>> {
            self.reachable()?;
            self.row_calls.set(self.row_calls.get() + 1);
            Ok(self.rows.borrow().get(sql).cloned().unwrap_or_default())
        }
    }

    // Lets a test keep a handle on the counters after the catalog takes
    // ownership of the source.
    impl CatalogSource for std::rc::Rc<MemorySource> {
        fn list_schemas(&self) -> ReviewResult<Vec<String>> {
            self.as_ref().list_schemas()
        }

        fn list_tables(&self, schema: &str) -> ReviewResult<Vec<String>> {
            self.as_ref().list_tables(schema)
        }

        fn fetch_create_table(&self, schema: &str, table: &str) -> ReviewResult<Option<String>> {
            self.as_ref().fetch_create_table(schema, table)
        }

        fn query_rows(&self, sql: &str) -> ReviewResult<Vec<Row>> {
            self.as_ref().query_rows(sql)
        }
    }

    /// Convenience row constructor for tests.
    pub fn row(pairs: &[(&str, Option<&str>)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(|s| s.to_string())))
            .collect()
    }
}
