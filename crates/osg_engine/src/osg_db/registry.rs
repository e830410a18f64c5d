//! Extension-keyed loader registry

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{LoadError, ReaderWriter};
use crate::scene::NodeFragment;

/// Maps file extensions to the [`ReaderWriter`] that loads them
///
/// Extensions are matched case-insensitively and without the leading dot.
#[derive(Default)]
pub struct Registry {
    reader_writers: HashMap<String, Arc<dyn ReaderWriter>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&String> = self.reader_writers.keys().collect();
        extensions.sort();
        f.debug_struct("Registry").field("extensions", &extensions).finish()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reader_writer` for `extension`
    ///
    /// A second registration for the same extension wins; the replaced one is
    /// returned.
    pub fn add_reader_writer(
        &mut self,
        extension: &str,
        reader_writer: Arc<dyn ReaderWriter>,
    ) -> Option<Arc<dyn ReaderWriter>> {
        let key = normalize(extension);
        log::debug!("Registering {} for .{}", reader_writer.name(), key);
        let previous = self.reader_writers.insert(key.clone(), reader_writer);
        if let Some(previous) = &previous {
            log::warn!(
                "Reader/writer for .{} registered twice, replacing {}",
                key,
                previous.name()
            );
        }
        previous
    }

    /// Loader registered for `extension`
    pub fn get_reader_writer_for_extension(&self, extension: &str) -> Option<Arc<dyn ReaderWriter>> {
        self.reader_writers.get(&normalize(extension)).cloned()
    }

    /// Loader for `source`, chosen by its file extension
    pub fn reader_writer_for_source(&self, source: &str) -> Result<Arc<dyn ReaderWriter>, LoadError> {
        let extension = Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.get_reader_writer_for_extension(extension)
            .ok_or_else(|| LoadError::NoReaderWriter(extension.to_string()))
    }

    /// Load `source` with the matching loader
    pub fn read_node(&self, source: &str) -> Result<NodeFragment, LoadError> {
        self.reader_writer_for_source(source)?.read_node(source)
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.reader_writers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.reader_writers.is_empty()
    }

    /// Forget every registration
    pub fn clear(&mut self) {
        self.reader_writers.clear();
    }
}
