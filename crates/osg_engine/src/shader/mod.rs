//! Shader generation
//!
//! Shader stages are assembled from typed nodes ([`NodeLibrary`]) wired
//! through variables in a [`ShaderGraph`]. The [`ShaderCompiler`] builds
//! those graphs for a set of active attributes, the [`ShaderProcessor`]
//! resolves includes, and a [`ShaderGenerator`] caches the resulting
//! programs per attribute fingerprint.

mod node_library;
mod graph;
mod processor;
mod compiler;
mod generator;

pub use node_library::{NodeDefinition, NodeLibrary};
pub use graph::{ShaderGraph, ShaderNode, ShaderNodeId, Variable, VariableId, VariableKind};
pub use processor::ShaderProcessor;
pub use compiler::{CompiledShader, ShaderCompiler};
pub use generator::{
    ProgramId, ShaderGenerator, ShaderGeneratorProxy, DEFAULT_GENERATOR, SHADOW_CAST_GENERATOR,
};

use thiserror::Error;

/// Shader graph construction and compilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// No node type registered under this name
    #[error("unknown shader node type '{0}'")]
    UnknownNodeType(String),

    /// Node type registered twice
    #[error("shader node type '{0}' is already registered")]
    DuplicateNodeType(String),

    /// Slot name not declared by the node type
    #[error("node '{node}' has no slot '{slot}'")]
    InvalidSlot {
        /// Node type
        node: String,
        /// Offending slot
        slot: String,
    },

    /// Declared input left unbound
    #[error("input '{slot}' of node '{node}' is not bound")]
    UnboundInput {
        /// Node type
        node: String,
        /// Unbound slot
        slot: String,
    },

    /// Declared output left unbound
    #[error("output '{slot}' of node '{node}' is not bound")]
    UnboundOutput {
        /// Node type
        node: String,
        /// Unbound slot
        slot: String,
    },

    /// Variable handle from another graph
    #[error("unknown shader variable #{0}")]
    UnknownVariable(usize),

    /// Node handle from another graph
    #[error("unknown shader node #{0}")]
    UnknownNode(usize),

    /// Nodes depend on each other
    #[error("cycle in shader graph through node '{0}'")]
    Cycle(String),

    /// Include file not found
    #[error("missing shader include '{0}'")]
    MissingInclude(String),
}
