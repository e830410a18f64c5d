//! Graphics context abstraction
//!
//! The engine never talks to WebGL directly. Everything it needs from the
//! binding layer goes through [`GraphicContext`]: state setters for the
//! attributes it manages, resource creation and deletion, program upload and
//! draw submission.

use std::sync::atomic::{AtomicU32, Ordering};

use super::{GlError, GlResourceKind};
use crate::foundation::math::{Mat4, Vec4};

/// Identity of a graphics context
///
/// `generation` is bumped each time a lost context is restored, so objects
/// created against the previous incarnation can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId {
    /// Unique id of the context
    pub id: u32,
    /// Incarnation of the context
    pub generation: u32,
}

impl ContextId {
    /// Allocate a process-unique context id
    pub fn allocate() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        }
    }

    /// Same context, next incarnation
    pub fn next_generation(self) -> Self {
        Self {
            id: self.id,
            generation: self.generation + 1,
        }
    }
}

/// Capabilities toggled through `enable` / `disable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Blending
    Blend,
    /// Depth testing
    DepthTest,
    /// Face culling
    CullFace,
}

/// Blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
}

/// Depth comparison functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DepthFunc {
    /// Never passes
    Never,
    /// Passes if closer
    Less,
    /// Passes if closer or equal
    LessEqual,
    /// Always passes
    Always,
}

/// Which faces are culled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CullFaceMode {
    /// Back faces
    Back,
    /// Front faces
    Front,
    /// Both
    FrontAndBack,
}

/// Primitive topology of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// Point list (point clouds)
    Points,
    /// Line list
    Lines,
    /// Triangle list
    Triangles,
}

/// Minimal surface of a WebGL-like context driven by the engine
pub trait GraphicContext {
    /// Identity of this context
    fn id(&self) -> ContextId;

    /// True once the context has been lost and not restored
    fn is_context_lost(&self) -> bool;

    /// Set the rasterized line width
    fn line_width(&mut self, width: f32);

    /// Enable a capability
    fn enable(&mut self, cap: Capability);

    /// Disable a capability
    fn disable(&mut self, cap: Capability);

    /// Set blend factors
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Set the depth comparison function
    fn depth_func(&mut self, func: DepthFunc);

    /// Enable or disable depth writes
    fn depth_mask(&mut self, write: bool);

    /// Select culled faces
    fn cull_face(&mut self, mode: CullFaceMode);

    /// Create a resource of `kind` and return its raw handle
    fn create_resource(&mut self, kind: GlResourceKind) -> Result<u32, GlError>;

    /// Delete a resource previously created by this context
    fn delete_resource(&mut self, kind: GlResourceKind, handle: u32);

    /// Upload bytes into a buffer
    fn buffer_data(&mut self, handle: u32, data: &[u8]);

    /// Attach sources to a program handle and link it
    fn link_program(&mut self, program: u32, vertex: &str, fragment: &str) -> Result<(), GlError>;

    /// Make a program current
    fn use_program(&mut self, program: u32);

    /// Set a matrix uniform on the current program
    fn uniform_matrix4(&mut self, name: &str, value: &Mat4);

    /// Set a vec4 uniform on the current program
    fn uniform_vec4(&mut self, name: &str, value: &Vec4);

    /// Set a float uniform on the current program
    fn uniform_float(&mut self, name: &str, value: f32);

    /// Bind a vertex buffer to an attribute
    fn bind_vertex_buffer(&mut self, attribute: &str, buffer: u32);

    /// Issue a non-indexed draw
    fn draw_arrays(&mut self, mode: PrimitiveMode, count: usize);
}

/// Command recorded by [`RecordingContext`]
#[derive(Debug, Clone, PartialEq)]
pub enum GlCommand {
    /// `line_width`
    LineWidth(f32),
    /// `enable`
    Enable(Capability),
    /// `disable`
    Disable(Capability),
    /// `blend_func`
    BlendFunc(BlendFactor, BlendFactor),
    /// `depth_func`
    DepthFunc(DepthFunc),
    /// `depth_mask`
    DepthMask(bool),
    /// `cull_face`
    CullFace(CullFaceMode),
    /// `create_resource`
    Create(GlResourceKind, u32),
    /// `delete_resource`
    Delete(GlResourceKind, u32),
    /// `buffer_data` with the byte count
    BufferData(u32, usize),
    /// `link_program`
    LinkProgram(u32),
    /// `use_program`
    UseProgram(u32),
    /// Any uniform upload, by name
    Uniform(String),
    /// `bind_vertex_buffer`
    BindVertexBuffer(String, u32),
    /// `draw_arrays`
    DrawArrays(PrimitiveMode, usize),
}

/// Headless context that records every call
///
/// Used by the demo binary and tests in place of a real WebGL binding.
#[derive(Debug)]
pub struct RecordingContext {
    id: ContextId,
    lost: bool,
    next_handle: u32,
    commands: Vec<GlCommand>,
    live: std::collections::HashSet<(GlResourceKind, u32)>,
}

impl RecordingContext {
    /// Create a context with a fresh id
    pub fn new() -> Self {
        Self {
            id: ContextId::allocate(),
            lost: false,
            next_handle: 1,
            commands: Vec::new(),
            live: std::collections::HashSet::new(),
        }
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[GlCommand] {
        &self.commands
    }

    /// Drain the recorded commands
    pub fn take_commands(&mut self) -> Vec<GlCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of resources created and not yet deleted
    pub fn live_resources(&self) -> usize {
        self.live.len()
    }

    /// Simulate a context loss; every resource dies with it
    pub fn lose_context(&mut self) {
        self.lost = true;
        self.live.clear();
    }

    /// Simulate a restore; the context gets a new generation
    pub fn restore_context(&mut self) {
        self.lost = false;
        self.id = self.id.next_generation();
    }
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicContext for RecordingContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn line_width(&mut self, width: f32) {
        self.commands.push(GlCommand::LineWidth(width));
    }

    fn enable(&mut self, cap: Capability) {
        self.commands.push(GlCommand::Enable(cap));
    }

    fn disable(&mut self, cap: Capability) {
        self.commands.push(GlCommand::Disable(cap));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.commands.push(GlCommand::BlendFunc(src, dst));
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.commands.push(GlCommand::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.commands.push(GlCommand::DepthMask(write));
    }

    fn cull_face(&mut self, mode: CullFaceMode) {
        self.commands.push(GlCommand::CullFace(mode));
    }

    fn create_resource(&mut self, kind: GlResourceKind) -> Result<u32, GlError> {
        if self.lost {
            return Err(GlError::ContextLost);
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.live.insert((kind, handle));
        self.commands.push(GlCommand::Create(kind, handle));
        Ok(handle)
    }

    fn delete_resource(&mut self, kind: GlResourceKind, handle: u32) {
        self.live.remove(&(kind, handle));
        self.commands.push(GlCommand::Delete(kind, handle));
    }

    fn buffer_data(&mut self, handle: u32, data: &[u8]) {
        self.commands.push(GlCommand::BufferData(handle, data.len()));
    }

    fn link_program(&mut self, program: u32, vertex: &str, fragment: &str) -> Result<(), GlError> {
        if !vertex.contains("void main") || !fragment.contains("void main") {
            return Err(GlError::LinkFailed(format!("program {program} has no entry point")));
        }
        self.commands.push(GlCommand::LinkProgram(program));
        Ok(())
    }

    fn use_program(&mut self, program: u32) {
        self.commands.push(GlCommand::UseProgram(program));
    }

    fn uniform_matrix4(&mut self, name: &str, _value: &Mat4) {
        self.commands.push(GlCommand::Uniform(name.to_string()));
    }

    fn uniform_vec4(&mut self, name: &str, _value: &Vec4) {
        self.commands.push(GlCommand::Uniform(name.to_string()));
    }

    fn uniform_float(&mut self, name: &str, _value: f32) {
        self.commands.push(GlCommand::Uniform(name.to_string()));
    }

    fn bind_vertex_buffer(&mut self, attribute: &str, buffer: u32) {
        self.commands.push(GlCommand::BindVertexBuffer(attribute.to_string(), buffer));
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, count: usize) {
        self.commands.push(GlCommand::DrawArrays(mode, count));
    }
}
