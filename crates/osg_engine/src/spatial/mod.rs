//! Spatial structures
//!
//! Bounding volumes for culling and the lazily built [`KdTree`] shapes used
//! for picking against geometry.

mod bounds;
mod primitives;
mod kdtree;
mod kdtree_builder;

pub use bounds::{BoundingBox, BoundingSphere, Frustum, Plane};
pub use primitives::{Ray, Triangle};
pub use kdtree::{KdHit, KdTree, KdTreeBuildOptions};
pub use kdtree_builder::KdTreeBuilder;
