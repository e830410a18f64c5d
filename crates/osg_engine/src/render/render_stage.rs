//! Draw pass
//!
//! Replays the leaves of a [`CullVisitor`] against a graphics context: the
//! leaf's state sets are pushed onto the [`State`], changed attributes are
//! applied, the program is fetched from the generator the state selects and
//! the geometry is drawn.

use super::{CullVisitor, RenderLeaf};
use crate::gl::{GlError, GraphicContext};
use crate::scene::SceneGraph;
use crate::shader::{ProgramId, ShaderGeneratorProxy};
use crate::state::State;

/// Counters for one draw pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Leaves drawn
    pub drawn: usize,
    /// Leaves skipped because their program could not be built
    pub skipped: usize,
    /// Attributes sent to the context
    pub state_changes: usize,
    /// Program switches
    pub program_changes: usize,
}

/// Draws render leaves in traversal order
#[derive(Debug, Default)]
pub struct RenderStage {
    last_stats: DrawStats,
}

impl RenderStage {
    /// Create a render stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of the most recent [`RenderStage::draw`]
    pub fn last_stats(&self) -> DrawStats {
        self.last_stats
    }

    /// Draw every leaf collected by `cull`
    ///
    /// Leaves whose shader permutation fails to compile or link are logged and
    /// skipped. Context errors abort the pass.
    pub fn draw(
        &mut self,
        graph: &mut SceneGraph,
        cull: &CullVisitor,
        state: &mut State,
        proxy: &mut ShaderGeneratorProxy,
        ctx: &mut dyn GraphicContext,
    ) -> Result<DrawStats, GlError> {
        let mut stats = DrawStats::default();
        let mut current: Option<(String, ProgramId)> = None;

        for leaf in cull.leaves() {
            push_leaf_state(graph, leaf, state);
            stats.state_changes += state.apply(ctx);

            let generator_name = state.shader_generator_name().map(str::to_string);
            let Some(generator) = proxy.generator_mut(generator_name.as_deref()) else {
                log::warn!(
                    "No shader generator named '{}', skipping leaf",
                    generator_name.as_deref().unwrap_or_default()
                );
                stats.skipped += 1;
                continue;
            };
            let id = match generator.get_or_create_program(state) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("{}: skipping leaf, shader failed: {}", generator.name(), e);
                    stats.skipped += 1;
                    continue;
                }
            };

            let key = (generator.name().to_string(), id);
            if current.as_ref() != Some(&key) {
                let Some(program) = generator.program_mut(id) else {
                    stats.skipped += 1;
                    continue;
                };
                if program.gl_object().graphic_context().is_err() {
                    program.set_graphic_context(&*ctx);
                }
                match program.apply(ctx) {
                    Ok(_) => {}
                    Err(GlError::LinkFailed(message)) => {
                        log::warn!("{}: skipping leaf, link failed: {}", key.0, message);
                        stats.skipped += 1;
                        current = None;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
                stats.program_changes += 1;
                current = Some(key);
            }

            ctx.uniform_matrix4("uModelViewMatrix", cull.model_view(leaf));
            ctx.uniform_matrix4("uProjectionMatrix", cull.projection());
            state.apply_uniforms(ctx);

            if let Some(geometry) = graph.node_mut(leaf.node).and_then(|n| n.as_geometry_mut()) {
                geometry.draw(ctx)?;
                stats.drawn += 1;
            }
        }

        state.pop_all();
        self.last_stats = stats;
        Ok(stats)
    }
}

fn push_leaf_state(graph: &SceneGraph, leaf: &RenderLeaf, state: &mut State) {
    state.pop_all();
    for &id in &leaf.state_sets {
        if let Some(set) = graph.node(id).and_then(|n| n.state_set()) {
            state.push_state_set(set);
        }
    }
}
