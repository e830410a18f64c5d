//! Background loading
//!
//! A single worker thread reads requested sources through the [`Registry`]
//! and sends back owned [`NodeFragment`]s. Nothing touches the scene graph
//! until [`DatabasePager::update_scene_graph`] runs on the frame thread.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{LoadError, Registry};
use crate::scene::{NodeFragment, NodeId, SceneGraph};

/// Handle of one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

struct Request {
    id: RequestId,
    parent: NodeId,
    source: String,
}

struct Completed {
    id: RequestId,
    parent: NodeId,
    source: String,
    result: Result<NodeFragment, LoadError>,
}

/// A request whose load failed
#[derive(Debug)]
pub struct LoadFailure {
    /// Request handle
    pub id: RequestId,
    /// Requested source
    pub source: String,
    /// Why the load failed
    pub error: LoadError,
}

/// What one [`DatabasePager::update_scene_graph`] call did
#[derive(Debug, Default)]
pub struct PagerUpdate {
    /// Roots of the fragments attached this time
    pub attached: Vec<NodeId>,
    /// Failed loads, returned to the caller
    pub failures: Vec<LoadFailure>,
}

/// Loads sources off the frame thread and merges them at update time
pub struct DatabasePager {
    requests: Option<Sender<Request>>,
    results: Receiver<Completed>,
    worker: Option<JoinHandle<()>>,
    ready: Vec<Completed>,
    pending: HashSet<RequestId>,
    cancelled: HashSet<RequestId>,
    next_id: u64,
}

impl std::fmt::Debug for DatabasePager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePager")
            .field("pending", &self.pending.len())
            .field("cancelled", &self.cancelled.len())
            .finish()
    }
}

impl DatabasePager {
    /// Start the worker thread
    pub fn new(registry: Arc<Registry>) -> Result<Self, LoadError> {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (result_tx, result_rx) = mpsc::channel::<Completed>();

        let worker = std::thread::Builder::new()
            .name("database-pager".to_string())
            .spawn(move || {
                for request in request_rx {
                    log::debug!("Loading {}", request.source);
                    let result = registry.read_node(&request.source);
                    let completed = Completed {
                        id: request.id,
                        parent: request.parent,
                        source: request.source,
                        result,
                    };
                    if result_tx.send(completed).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| LoadError::WorkerSpawn(e.to_string()))?;

        log::info!("Database pager started");
        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            worker: Some(worker),
            ready: Vec::new(),
            pending: HashSet::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        })
    }

    /// Queue `source` to be loaded and attached under `parent`
    pub fn request(&mut self, parent: NodeId, source: &str) -> Result<RequestId, LoadError> {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let sender = self.requests.as_ref().ok_or(LoadError::WorkerStopped)?;
        sender
            .send(Request {
                id,
                parent,
                source: source.to_string(),
            })
            .map_err(|_| LoadError::WorkerStopped)?;
        self.pending.insert(id);
        Ok(id)
    }

    /// Drop the result of `id` when it arrives. The load itself may still run.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    /// Requests neither merged nor cancelled yet
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Block until every pending request has completed or `timeout` passes.
    /// Returns true when nothing is left pending.
    pub fn wait_for_pending(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.ready.iter().filter(|c| self.pending.contains(&c.id)).count() < self.pending.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(completed) => self.ready.push(completed),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    /// Attach every finished fragment under its parent
    ///
    /// Runs at the start of the update pass. Results of cancelled requests
    /// and fragments whose parent has been removed are dropped.
    pub fn update_scene_graph(&mut self, graph: &mut SceneGraph) -> PagerUpdate {
        let mut completed = std::mem::take(&mut self.ready);
        completed.extend(self.results.try_iter());

        let mut update = PagerUpdate::default();
        for done in completed {
            if self.cancelled.remove(&done.id) {
                log::debug!("Dropping cancelled load of {}", done.source);
                continue;
            }
            self.pending.remove(&done.id);
            match done.result {
                Ok(fragment) => {
                    if !graph.contains(done.parent) {
                        log::warn!("Parent of {} was removed before the load finished", done.source);
                        continue;
                    }
                    match graph.attach_fragment(Some(done.parent), fragment) {
                        Ok(root) => {
                            log::info!("Attached {}", done.source);
                            update.attached.push(root);
                        }
                        Err(e) => log::warn!("Could not attach {}: {}", done.source, e),
                    }
                }
                Err(error) => {
                    log::warn!("Loading {} failed: {}", done.source, error);
                    update.failures.push(LoadFailure {
                        id: done.id,
                        source: done.source,
                        error,
                    });
                }
            }
        }
        update
    }
}

impl Drop for DatabasePager {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Database pager worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::osg_db::ReaderWriter;
    use crate::scene::{Geometry, Node};

    struct Points;

    impl ReaderWriter for Points {
        fn name(&self) -> &str {
            "points"
        }

        fn read_node(&self, source: &str) -> Result<NodeFragment, LoadError> {
            if source.starts_with("bad") {
                return Err(LoadError::Parse {
                    path: source.to_string(),
                    line: 1,
                    message: "not a point".to_string(),
                });
            }
            Ok(NodeFragment::leaf(Node::group().with_name(source)).with_child(NodeFragment::leaf(
                Node::geometry(Geometry::points(vec![Vec3::zeros(), Vec3::x()])),
            )))
        }
    }

    fn pager() -> DatabasePager {
        let mut registry = Registry::new();
        registry.add_reader_writer("pts", Arc::new(Points));
        DatabasePager::new(Arc::new(registry)).unwrap()
    }

    #[test]
    fn test_loaded_fragment_attaches_at_update() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let mut pager = pager();

        pager.request(root, "tile.pts").unwrap();
        assert!(pager.wait_for_pending(Duration::from_secs(5)));
        // Nothing is merged before the update
        assert!(graph.children(root).is_empty());

        let update = pager.update_scene_graph(&mut graph);
        assert!(update.failures.is_empty());
        assert_eq!(update.attached.len(), 1);
        assert_eq!(graph.children(root), update.attached.as_slice());
        assert_eq!(graph.len(), 3);
        assert_eq!(pager.pending_count(), 0);
    }

    #[test]
    fn test_failures_are_returned() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let mut pager = pager();

        let bad = pager.request(root, "bad.pts").unwrap();
        let unknown = pager.request(root, "mesh.obj").unwrap();
        assert!(pager.wait_for_pending(Duration::from_secs(5)));

        let update = pager.update_scene_graph(&mut graph);
        assert_eq!(update.failures.len(), 2);
        assert!(update.failures.iter().any(|f| f.id == bad && matches!(f.error, LoadError::Parse { .. })));
        assert!(update.failures.iter().any(|f| f.id == unknown && matches!(f.error, LoadError::NoReaderWriter(_))));
        assert!(graph.children(root).is_empty());
    }

    #[test]
    fn test_cancelled_and_orphaned_results_are_dropped() {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::group());
        let doomed = graph.add_node(Node::group());
        graph.add_child(root, doomed).unwrap();
        let mut pager = pager();

        let cancelled = pager.request(root, "a.pts").unwrap();
        pager.request(doomed, "b.pts").unwrap();
        assert!(pager.cancel(cancelled));
        assert!(!pager.cancel(cancelled));
        assert!(pager.wait_for_pending(Duration::from_secs(5)));
        graph.remove_node(doomed);

        // The cancelled result may arrive after this update; run until both are in
        let deadline = Instant::now() + Duration::from_secs(5);
        while !pager.cancelled.is_empty() && Instant::now() < deadline {
            let update = pager.update_scene_graph(&mut graph);
            assert!(update.attached.is_empty());
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(graph.children(root).is_empty());
        assert_eq!(graph.len(), 1);
    }
}
