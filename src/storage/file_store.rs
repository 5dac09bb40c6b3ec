//! File-backed page store
//!
//! One file per page: `{root}/{table}/page_{identity}.page`.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{codec, PageStore};
use crate::error::{Result, StoreError};
use crate::page::Page;

/// Stores every page image in its own file
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written image.
pub struct FileStore {
    /// Root directory (one subdirectory per table)
    root: PathBuf,

    /// fsync each image before the rename
    sync_writes: bool,
}

impl FileStore {
    const PAGE_PREFIX: &'static str = "page_";
    const PAGE_EXTENSION: &'static str = "page";

    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: &Path, sync_writes: bool) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            sync_writes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files of one table
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    /// File path of a page image
    pub fn page_path(&self, table: &str, page: &str) -> PathBuf {
        self.table_dir(table).join(format!(
            "{}{}.{}",
            Self::PAGE_PREFIX,
            page,
            Self::PAGE_EXTENSION
        ))
    }

    /// Identities of every page persisted for `table`, sorted
    pub fn page_ids(&self, table: &str) -> Result<Vec<String>> {
        let dir = self.table_dir(table);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if let Some(id) = Self::parse_page_id(&path) {
                ids.push(id);
            }
        }
        ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        });
        Ok(ids)
    }

    /// Write bytes through a temp file and rename into place
    pub(crate) fn write_atomic(path: &Path, data: &[u8], sync: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(data)?;
            if sync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// "page_7.page" → Some("7")
    fn parse_page_id(path: &Path) -> Option<String> {
        if path.extension()? != Self::PAGE_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy();
        stem.strip_prefix(Self::PAGE_PREFIX).map(str::to_string)
    }
}

impl PageStore for FileStore {
    fn create(&self, table: &str, page: &str, state: &Page) -> Result<()> {
        let path = self.page_path(table, page);
        if path.exists() {
            return Err(StoreError::Persistence(format!(
                "page {} of '{}' already exists",
                page, table
            )));
        }
        self.save(table, page, state)
    }

    fn save(&self, table: &str, page: &str, state: &Page) -> Result<()> {
        let image = codec::encode_page(state)?;
        let path = self.page_path(table, page);
        Self::write_atomic(&path, &image, self.sync_writes)?;
        debug!(table, page, bytes = image.len(), "page image written");
        Ok(())
    }

    fn delete(&self, table: &str, page: &str) -> Result<()> {
        let path = self.page_path(table, page);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(table, page, "page image removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::Persistence(format!(
                "no persisted image for page {} of '{}'",
                page, table
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, table: &str, page: &str) -> Result<Page> {
        let path = self.page_path(table, page);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Persistence(format!(
                    "no persisted image for page {} of '{}'",
                    page, table
                )))
            }
            Err(e) => return Err(e.into()),
        };
        codec::decode_page(&data)
    }

    fn exists(&self, table: &str, page: &str) -> bool {
        self.page_path(table, page).exists()
    }
}
