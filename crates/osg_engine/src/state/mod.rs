//! State attributes and their traversal-time stacks
//!
//! Nodes carry [`StateSet`]s; traversals push them onto a [`State`], which
//! keeps one [`Stack`] per [`AttributeType`] and elides redundant context
//! calls when the result is applied.

mod attribute;
mod stack;
mod state_set;
#[allow(clippy::module_inception)]
mod state;

pub use attribute::{
    AttributeFlags, AttributeType, AttributeTypeSet, Depth, Light, Material, ShadowCast,
    StateAttribute,
};
pub use stack::Stack;
pub use state_set::{AttributeEntry, StateSet};
pub use state::State;
