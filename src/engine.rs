//! Engine Module
//!
//! The database: a registry of tables sharing one page store.
//!
//! ## Responsibilities
//! - Discover and reopen tables on startup
//! - Create tables and persist their catalogs
//! - Serialize writers per table (one `Mutex` per table)
//! - Rewrite a table's catalog whenever its page directory changes

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::page::{Constraint, LogicalOp};
use crate::storage::{self, FileStore};
use crate::table::{Table, TableCatalog};
use crate::tuple::{ColumnValues, Schema, Tuple, Value};

/// The main database handle
///
/// ## Concurrency Model
/// - The table registry is behind an `RwLock` (many readers, table
///   creation is exclusive)
/// - Each table sits behind its own `Mutex`: every operation on a table,
///   including reads, runs to completion before the next one starts
pub struct Database {
    /// Database configuration
    config: Config,

    /// Page store shared by every table
    store: Arc<FileStore>,

    /// Tables by name
    tables: RwLock<BTreeMap<String, Arc<Mutex<Table>>>>,
}

impl Database {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const CATALOG_FILENAME: &'static str = "table.meta";

    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Find every table directory holding a catalog
    /// 3. Reopen each table (loads pages, rebuilds indices)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let store = Arc::new(FileStore::open(&config.data_dir, config.sync_writes)?);
        let mut tables = BTreeMap::new();

        for entry in fs::read_dir(&config.data_dir)? {
            let dir = entry?.path();
            let catalog_path = dir.join(Self::CATALOG_FILENAME);
            if !dir.is_dir() || !catalog_path.exists() {
                continue;
            }

            let catalog = Self::read_catalog(&catalog_path)?;
            let name = catalog.schema.table().to_string();
            let table = Table::open(catalog, store.clone(), config.max_rows_per_page)?;
            tables.insert(name, Arc::new(Mutex::new(table)));
        }

        info!(
            data_dir = %config.data_dir.display(),
            tables = tables.len(),
            page_capacity = config.max_rows_per_page,
            "database opened"
        );

        Ok(Self {
            config,
            store,
            tables: RwLock::new(tables),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Create an empty table
    pub fn create_table(&self, schema: Schema) -> Result<()> {
        let mut tables = self.tables.write();
        let name = schema.table().to_string();
        if tables.contains_key(&name) {
            return Err(StoreError::TableExists(name));
        }

        let table = Table::new(schema, self.store.clone(), self.config.max_rows_per_page);
        self.write_catalog(&table)?;
        tables.insert(name.clone(), Arc::new(Mutex::new(table)));

        info!(table = %name, "table created");
        Ok(())
    }

    /// Names of every table, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Run `f` with shared access to a table
    pub fn with_table<R>(&self, name: &str, f: impl FnOnce(&Table) -> R) -> Result<R> {
        let table = self.table(name)?;
        let guard = table.lock();
        Ok(f(&*guard))
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Insert a row into `table`
    pub fn insert(&self, table: &str, values: &ColumnValues) -> Result<()> {
        self.mutate(table, |t| t.insert(values))
    }

    /// Update the row with primary key `key`
    pub fn update(&self, table: &str, key: &Value, values: &ColumnValues) -> Result<()> {
        self.mutate(table, |t| t.update(key, values))
    }

    /// Update the row whose primary key is given as text
    ///
    /// The text is parsed according to the key column's type.
    pub fn update_by_str(&self, table: &str, key: &str, values: &ColumnValues) -> Result<()> {
        self.mutate(table, |t| {
            let key = t.schema().parse_key(key)?;
            t.update(&key, values)
        })
    }

    /// Delete every row matching all `constraints`; returns the count
    pub fn delete(&self, table: &str, constraints: &ColumnValues) -> Result<usize> {
        self.mutate(table, |t| t.delete(constraints))
    }

    /// Rows of `table` satisfying `constraints` combined with `op`
    pub fn select(&self, table: &str, constraints: &[Constraint], op: LogicalOp) -> Result<Vec<Tuple>> {
        self.with_table(table, |t| t.select(constraints, op))?
    }

    /// Point lookup by primary key
    pub fn get(&self, table: &str, key: &Value) -> Result<Option<Tuple>> {
        self.with_table(table, |t| t.get(key).cloned())
    }

    /// Create a secondary index on `table`
    pub fn create_index(&self, table: &str, name: &str, columns: Vec<String>) -> Result<()> {
        self.mutate(table, |t| t.create_index(name, columns))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared page store
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Path of a table's catalog file
    pub fn catalog_path(&self, table: &str) -> PathBuf {
        self.store.table_dir(table).join(Self::CATALOG_FILENAME)
    }

    /// Read a table's catalog from disk
    pub fn read_catalog(path: &Path) -> Result<TableCatalog> {
        let data = fs::read(path)?;
        let payload = storage::decode_frame(storage::CATALOG_MAGIC, &data)?;
        Ok(bincode::deserialize(payload)?)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn table(&self, name: &str) -> Result<Arc<Mutex<Table>>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Run a mutation and rewrite the catalog if the directory changed
    ///
    /// The catalog is rewritten even when the mutation fails part-way, since
    /// pages may have been created or destroyed before the failure. A failed
    /// mutation reports its own error; a failed rewrite after it is logged.
    fn mutate<R>(&self, name: &str, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let table = self.table(name)?;
        let mut guard = table.lock();

        let before = guard.version();
        let result = f(&mut *guard);
        if guard.version() != before {
            if let Err(err) = self.write_catalog(&*guard) {
                if result.is_ok() {
                    return Err(err);
                }
                warn!(table = name, error = %err, "failed to rewrite catalog");
            }
        }
        result
    }

    fn write_catalog(&self, table: &Table) -> Result<()> {
        let payload = bincode::serialize(&table.catalog())?;
        let frame = storage::encode_frame(storage::CATALOG_MAGIC, &payload)?;
        FileStore::write_atomic(&self.catalog_path(table.name()), &frame, self.config.sync_writes)
    }
}
