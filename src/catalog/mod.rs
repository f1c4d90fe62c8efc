//! Virtual schema catalog.
//!
//! Mirrors the reviewed database lazily: schema names, table names and table
//! definitions are fetched from the [`CatalogSource`] the first time they are
//! needed and never re-fetched afterwards. Simulated DDL is layered on top of
//! the cached state, so later statements in a batch see the effects of
//! earlier ones without touching the live database.

mod source;
mod table;

pub use source::memory::MemorySource;
pub use source::{memory, CatalogSource, Row};
pub use table::TableDefinition;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::ReviewResult;
use crate::parser::SqlDialect;
use crate::statement::{Statement, TableRef};

#[derive(Debug, Default)]
struct SchemaEntry {
    /// Table names; `None` until listed from the source.
    tables: Option<BTreeSet<String>>,
    /// Definitions cached or simulated so far, keyed by table name.
    defs: HashMap<String, TableDefinition>,
}

pub struct SchemaCatalog {
    source: Box<dyn CatalogSource>,
    dialect: SqlDialect,
    /// All schema names; `None` until listed from the source.
    schema_names: Option<BTreeSet<String>>,
    /// Cache entries, created by lookups as well as simulated DDL. Presence
    /// here says nothing about existence.
    schemas: HashMap<String, SchemaEntry>,
    /// Schemas created by simulated DDL. Masks source state.
    created_schemas: BTreeSet<String>,
    /// Schemas dropped by simulated DDL. Masks source state.
    dropped_schemas: BTreeSet<String>,
    current_schema: Option<String>,
}

impl SchemaCatalog {
    pub fn new(source: Box<dyn CatalogSource>, dialect: SqlDialect) -> Self {
        Self {
            source,
            dialect,
            schema_names: None,
            schemas: HashMap::new(),
            created_schemas: BTreeSet::new(),
            dropped_schemas: BTreeSet::new(),
            current_schema: None,
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn current_schema(&self) -> Option<&str> {
        self.current_schema.as_deref()
    }

    pub fn set_current_schema(&mut self, schema: &str) {
        self.current_schema = Some(schema.to_string());
    }

    /// Resolve a table reference against the current schema.
    pub fn resolve(&self, table: &TableRef) -> Option<(String, String)> {
        table.resolve(self.current_schema())
    }

    /// Run a read-only query against the backing source.
    pub fn query_rows(&self, sql: &str) -> ReviewResult<Vec<Row>> {
        self.source.query_rows(sql)
    }

    fn load_schema_names(&mut self) -> ReviewResult<&BTreeSet<String>> {
        if self.schema_names.is_none() {
            let names = self.source.list_schemas()?;
            debug!(count = names.len(), "loaded schema list");
            self.schema_names = Some(names.into_iter().collect());
        }
        Ok(self.schema_names.get_or_insert_with(BTreeSet::new))
    }

    pub fn schema_exists(&mut self, schema: &str) -> ReviewResult<bool> {
        if self.dropped_schemas.contains(schema) {
            return Ok(false);
        }
        if self.created_schemas.contains(schema) {
            return Ok(true);
        }
        Ok(self.load_schema_names()?.contains(schema))
    }

    fn entry_with_tables(&mut self, schema: &str) -> ReviewResult<&mut SchemaEntry> {
        let needs_load = self
            .schemas
            .get(schema)
            .map_or(true, |e| e.tables.is_none());
        if needs_load {
            let tables = self.source.list_tables(schema)?;
            debug!(schema, count = tables.len(), "loaded table list");
            let entry = self.schemas.entry(schema.to_string()).or_default();
            if entry.tables.is_none() {
                entry.tables = Some(tables.into_iter().collect());
            }
        }
        Ok(self.schemas.entry(schema.to_string()).or_default())
    }

    pub fn table_exists(&mut self, schema: &str, table: &str) -> ReviewResult<bool> {
        if self.dropped_schemas.contains(schema) {
            return Ok(false);
        }
        if let Some(entry) = self.schemas.get(schema) {
            if entry.defs.contains_key(table) {
                return Ok(true);
            }
        }
        let entry = self.entry_with_tables(schema)?;
        Ok(entry
            .tables
            .get_or_insert_with(BTreeSet::new)
            .contains(table))
    }

    /// The table's current (possibly simulated) definition, or `None` when
    /// it does not exist.
    pub fn table_definition(
        &mut self,
        schema: &str,
        table: &str,
    ) -> ReviewResult<Option<TableDefinition>> {
        if !self.table_exists(schema, table)? {
            return Ok(None);
        }
        if let Some(def) = self
            .schemas
            .get(schema)
            .and_then(|e| e.defs.get(table))
        {
            return Ok(Some(def.clone()));
        }
        let fetched = self.source.fetch_create_table(schema, table)?;
        let Some(create_sql) = fetched else {
            return Ok(None);
        };
        let def = TableDefinition::from_create_sql(schema, self.dialect, &create_sql)?;
        let entry = self.schemas.entry(schema.to_string()).or_default();
        entry.defs.insert(table.to_string(), def.clone());
        Ok(Some(def))
    }

    fn create_schema(&mut self, name: &str) {
        self.dropped_schemas.remove(name);
        self.created_schemas.insert(name.to_string());
        let entry = self.schemas.entry(name.to_string()).or_default();
        if entry.tables.is_none() {
            entry.tables = Some(BTreeSet::new());
        }
        if let Some(names) = self.schema_names.as_mut() {
            names.insert(name.to_string());
        }
    }

    fn drop_schema(&mut self, name: &str) {
        self.schemas.remove(name);
        self.created_schemas.remove(name);
        self.dropped_schemas.insert(name.to_string());
        if let Some(names) = self.schema_names.as_mut() {
            names.remove(name);
        }
    }

    fn put_definition(&mut self, def: TableDefinition) {
        let entry = self.schemas.entry(def.schema.clone()).or_default();
        if let Some(tables) = entry.tables.as_mut() {
            tables.insert(def.name.clone());
        }
        entry.defs.insert(def.name.clone(), def);
    }

    fn remove_table(&mut self, schema: &str, table: &str) {
        if let Some(entry) = self.schemas.get_mut(schema) {
            entry.defs.remove(table);
            if let Some(tables) = entry.tables.as_mut() {
                tables.remove(table);
            }
        }
    }

    /// Advance the catalog past one statement, simulating its DDL effect.
    ///
    /// Returns the pre-mutation definition of the affected table for
    /// statements that mutate exactly one known table (ALTER, DROP with the
    /// last named table, CREATE over an existing table). DML and reads leave
    /// the catalog untouched and return `None`.
    pub fn apply(&mut self, stmt: &Statement) -> ReviewResult<Option<TableDefinition>> {
        match stmt {
            Statement::CreateSchema(cs) => {
                self.create_schema(&cs.name);
                Ok(None)
            }
            Statement::DropSchema(ds) => {
                self.drop_schema(&ds.name);
                Ok(None)
            }
            Statement::CreateTable(ct) => {
                let Some((schema, table)) = self.resolve(&ct.table) else {
                    return Ok(None);
                };
                let existing = self.table_definition(&schema, &table)?;
                if existing.is_some() && ct.if_not_exists {
                    return Ok(existing);
                }
                self.put_definition(TableDefinition::from_create(&schema, ct));
                Ok(existing)
            }
            Statement::AlterTable(at) => {
                let Some((schema, table)) = self.resolve(&at.table) else {
                    return Ok(None);
                };
                let Some(pre) = self.table_definition(&schema, &table)? else {
                    return Ok(None);
                };
                let mut post = pre.clone();
                for spec in &at.specs {
                    post.apply_spec(spec);
                }
                if post.schema != pre.schema || post.name != pre.name {
                    self.remove_table(&pre.schema, &pre.name);
                }
                self.put_definition(post);
                Ok(Some(pre))
            }
            Statement::DropTable(dt) => {
                let mut last_pre = None;
                for table_ref in &dt.tables {
                    let Some((schema, table)) = self.resolve(table_ref) else {
                        continue;
                    };
                    if let Some(pre) = self.table_definition(&schema, &table)? {
                        last_pre = Some(pre);
                    }
                    self.remove_table(&schema, &table);
                }
                Ok(last_pre)
            }
            Statement::UseSchema(name) => {
                self.set_current_schema(name);
                Ok(None)
            }
            // Server-side index DDL, DML and reads do not change the
            // simulated structure.
            Statement::CreateIndex(_)
            | Statement::DropIndex(_)
            | Statement::Insert(_)
            | Statement::Update(_)
            | Statement::Delete(_)
            | Statement::Select(_)
            | Statement::Unsupported(_) => Ok(None),
        }
    }
}
