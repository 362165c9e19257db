//! Index store: lazily opened, cached per-application index handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::{debug, info, warn};

use super::document::record_to_document;
use super::schema::LogSchema;
use super::{IndexError, IndexResult};
use crate::config::EngineConfig;
use crate::model::LogRecord;

const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

/// One opened application index: tantivy index, a reloading reader and a
/// single writer behind a mutex. Read-only searches may run concurrently
/// with each other and with a committing writer; readers see a consistent
/// snapshot as of their acquisition.
pub struct AppIndex {
    app_name: String,
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    schema: LogSchema,
}

impl AppIndex {
    /// Open the index at `path`, creating it when no valid index exists yet.
    /// A valid index is recognized by its `meta.json`.
    pub(crate) fn open(path: &Path, app_name: &str, writer_heap_bytes: usize) -> IndexResult<Self> {
        let schema = LogSchema::build();

        let meta_path = path.join("meta.json");
        let index = if meta_path.exists() {
            Index::open_in_dir(path)?
        } else {
            std::fs::create_dir_all(path)?;
            Index::create_in_dir(path, schema.schema.clone())?
        };

        schema.configure_tokenizers(&index)?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()?;
        let writer = index.writer(writer_heap_bytes)?;

        info!(app_name = %app_name, path = %path.display(), "Application index opened");

        Ok(Self {
            app_name: app_name.to_string(),
            index,
            reader,
            writer: Mutex::new(writer),
            schema,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn schema(&self) -> &LogSchema {
        &self.schema
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Acquire a point-in-time searcher over the committed state.
    pub fn searcher(&self) -> tantivy::Searcher {
        self.reader.searcher()
    }

    /// Queue one record for indexing. Not visible to searches until
    /// [`AppIndex::commit`].
    pub fn index_record(&self, record: &LogRecord) -> IndexResult<()> {
        let doc = record_to_document(&self.schema, record)?;
        let writer = self.writer.lock();
        writer.add_document(doc)?;
        Ok(())
    }

    /// Commit queued records and reload the reader so the new snapshot is
    /// visible to subsequent searches.
    pub fn commit(&self) -> IndexResult<()> {
        {
            let mut writer = self.writer.lock();
            writer.commit()?;
        }
        self.reader.reload()?;
        debug!(app_name = %self.app_name, "Index commit done");
        Ok(())
    }
}

/// A resolved set of application indices queried as a logical union.
#[derive(Clone)]
pub struct MultiHandle {
    indices: Vec<Arc<AppIndex>>,
}

impl MultiHandle {
    pub fn indices(&self) -> &[Arc<AppIndex>] {
        &self.indices
    }

    pub fn app_names(&self) -> Vec<&str> {
        self.indices.iter().map(|i| i.app_name()).collect()
    }
}

/// Owns the index root and the cache of opened application indices.
///
/// Created once at startup and passed by handle to searcher, statistics
/// and ingestion; never ambient state.
pub struct IndexStore {
    root: PathBuf,
    writer_heap_bytes: usize,
    handles: DashMap<String, Arc<AppIndex>>,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
            handles: DashMap::new(),
        }
    }

    /// Build a store from a validated [`EngineConfig`]: its root path and
    /// its writer budget.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            root: config.root_path.clone(),
            writer_heap_bytes: config.writer_heap_bytes,
            handles: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open (or create) the index for `app_name`. Idempotent and cached;
    /// concurrent first-opens of the same name collapse to a single
    /// underlying open. A failed open is not cached, so a later retry can
    /// succeed once the underlying fault clears.
    pub fn open(&self, app_name: &str) -> IndexResult<Arc<AppIndex>> {
        if app_name.is_empty() || app_name.contains(['/', '\\']) {
            return Err(IndexError::InvalidAppName(app_name.to_string()));
        }

        if let Some(handle) = self.handles.get(app_name) {
            return Ok(Arc::clone(&handle));
        }

        // The vacant entry holds the shard lock while the open runs, which
        // makes concurrent opens of the same name single-flight.
        match self.handles.entry(app_name.to_string()) {
            Entry::Occupied(occupied) => Ok(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let path = self.root.join(app_name);
                let opened = AppIndex::open(&path, app_name, self.writer_heap_bytes)?;
                let handle = Arc::new(opened);
                vacant.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Whether `app_name` denotes an actually indexed application: either
    /// already cached, or a directory under the root holding a valid index.
    pub fn is_application(&self, app_name: &str) -> bool {
        if self.handles.contains_key(app_name) {
            return true;
        }
        self.root.join(app_name).join("meta.json").is_file()
    }

    /// Resolve a set of application names to a combined handle.
    ///
    /// Returns `None` when the set is empty or contains any name that is
    /// not a valid indexed application. Never a partial union: callers must
    /// treat `None` as "no such index", distinct from an empty result set.
    pub fn resolve(&self, app_names: &[&str]) -> IndexResult<Option<MultiHandle>> {
        if app_names.is_empty() {
            return Ok(None);
        }
        for name in app_names {
            if !self.is_application(name) {
                warn!(app_name = %name, "Resolve miss: unknown application");
                return Ok(None);
            }
        }
        let mut indices = Vec::with_capacity(app_names.len());
        for name in app_names {
            indices.push(self.open(name)?);
        }
        Ok(Some(MultiHandle { indices }))
    }

    /// Names of applications that have actually been indexed, in sorted
    /// order. A stray directory without a valid index is excluded even when
    /// present on disk.
    pub fn application_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().join("meta.json").is_file())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
            Err(_) => Vec::new(),
        };
        for handle in self.handles.iter() {
            if !names.contains(handle.key()) {
                names.push(handle.key().clone());
            }
        }
        names.sort();
        names.dedup();
        names
    }
}
