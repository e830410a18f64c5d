//! Loading
//!
//! Loaders implement [`ReaderWriter`] and are looked up by extension in a
//! [`Registry`] that the application owns and injects. The
//! [`DatabasePager`] runs them on a worker thread.

mod registry;
mod pager;

pub use registry::Registry;
pub use pager::{DatabasePager, LoadFailure, PagerUpdate, RequestId};

use thiserror::Error;

use crate::scene::NodeFragment;

/// A loader for one or more file formats
///
/// Loaders run on the pager thread and must not touch any scene graph; they
/// return an owned fragment instead.
pub trait ReaderWriter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Load `source` into a detached subtree
    fn read_node(&self, source: &str) -> Result<NodeFragment, LoadError>;
}

/// Loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    /// No loader registered for the extension
    #[error("no reader/writer registered for extension '{0}'")]
    NoReaderWriter(String),

    /// Reading the source failed
    #[error("failed to read {path}: {error}")]
    Io {
        /// Source path
        path: String,
        /// Underlying error
        #[source]
        error: std::io::Error,
    },

    /// The source is malformed
    #[error("{path}:{line}: {message}")]
    Parse {
        /// Source path
        path: String,
        /// One-based line number
        line: usize,
        /// What was wrong
        message: String,
    },

    /// The worker thread could not be started
    #[error("failed to start pager worker: {0}")]
    WorkerSpawn(String),

    /// The worker thread is gone
    #[error("pager worker stopped")]
    WorkerStopped,
}
