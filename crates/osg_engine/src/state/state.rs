//! Traversal-time attribute state
//!
//! One [`Stack`] per attribute type. Entering a node pushes its state set,
//! leaving pops it, so nesting is strictly LIFO per type. At draw time
//! [`State::apply`] sends only the tops that differ from what the context
//! already has.

use super::{AttributeEntry, AttributeFlags, AttributeType, AttributeTypeSet, Stack, StateAttribute, StateSet};
use crate::gl::GraphicContext;

#[derive(Debug, Clone)]
struct PushedSet {
    types: Vec<AttributeType>,
    named_generator: bool,
}

/// Attribute stacks for every type plus the shader generator name stack
#[derive(Debug, Clone)]
pub struct State {
    stacks: Vec<Stack<AttributeEntry>>,
    pushed: Vec<PushedSet>,
    generator_names: Vec<String>,
}

impl State {
    /// Create a state with empty stacks
    pub fn new() -> Self {
        Self {
            stacks: (0..AttributeType::COUNT).map(|_| Stack::new()).collect(),
            pushed: Vec::new(),
            generator_names: Vec::new(),
        }
    }

    /// Push every attribute of `set`
    pub fn push_state_set(&mut self, set: &StateSet) {
        let mut types = Vec::new();
        for entry in set.entries() {
            let ty = entry.attribute.attribute_type();
            self.push_attribute(entry.attribute.clone(), entry.flags);
            types.push(ty);
        }
        let named_generator = match set.shader_generator_name() {
            Some(name) => {
                self.generator_names.push(name.to_string());
                true
            }
            None => false,
        };
        self.pushed.push(PushedSet { types, named_generator });
    }

    /// Pop what the matching [`State::push_state_set`] pushed. No-op when
    /// nothing is pushed.
    pub fn pop_state_set(&mut self) {
        let Some(set) = self.pushed.pop() else {
            return;
        };
        for ty in set.types {
            self.stacks[ty.index()].pop();
        }
        if set.named_generator {
            self.generator_names.pop();
        }
    }

    /// Push a single attribute
    ///
    /// An OVERRIDE on the current top wins over a new, unprotected value: the
    /// top is pushed again so the matching pop stays balanced.
    pub fn push_attribute(&mut self, attribute: StateAttribute, flags: AttributeFlags) {
        let stack = &mut self.stacks[attribute.attribute_type().index()];
        let entry = match stack.back() {
            Some(top)
                if top.flags.contains(AttributeFlags::OVERRIDE)
                    && !flags.contains(AttributeFlags::PROTECTED) =>
            {
                top.clone()
            }
            _ => AttributeEntry { attribute, flags },
        };
        stack.push(entry);
    }

    /// Pop a single attribute of `ty`
    pub fn pop_attribute(&mut self, ty: AttributeType) -> Option<StateAttribute> {
        self.stacks[ty.index()].pop().map(|entry| entry.attribute)
    }

    /// The stack of `ty`
    pub fn stack(&self, ty: AttributeType) -> &Stack<AttributeEntry> {
        &self.stacks[ty.index()]
    }

    /// Current top of `ty`
    pub fn top(&self, ty: AttributeType) -> Option<&StateAttribute> {
        self.stacks[ty.index()].back().map(|entry| &entry.attribute)
    }

    /// Types with at least one pushed value
    pub fn active_types(&self) -> AttributeTypeSet {
        AttributeType::ALL
            .into_iter()
            .filter(|ty| !self.stacks[ty.index()].empty())
            .fold(AttributeTypeSet::empty(), |set, ty| set | ty.bit())
    }

    /// Shader generator selected by the innermost named state set
    pub fn shader_generator_name(&self) -> Option<&str> {
        self.generator_names.last().map(String::as_str)
    }

    /// Number of state sets currently pushed
    pub fn depth(&self) -> usize {
        self.pushed.len()
    }

    /// Pop everything, keeping `last_applied` so the next apply still elides
    /// unchanged state
    pub fn pop_all(&mut self) {
        while !self.pushed.is_empty() {
            self.pop_state_set();
        }
    }

    /// Forget what the context holds; the next apply re-sends every type
    pub fn dirty_all(&mut self) {
        for stack in &mut self.stacks {
            stack.last_applied = None;
            stack.as_changed = true;
        }
    }

    /// Send changed attribute tops (or type defaults when empty) to `ctx`.
    /// Returns the number of attributes actually applied.
    pub fn apply(&mut self, ctx: &mut dyn GraphicContext) -> usize {
        let mut applied = 0;
        for ty in AttributeType::ALL {
            let stack = &mut self.stacks[ty.index()];
            if !stack.as_changed && stack.last_applied.is_some() {
                continue;
            }
            let desired = match stack.back() {
                Some(entry) => Some(entry.clone()),
                None => ty.default_attribute().map(|attribute| AttributeEntry {
                    attribute,
                    flags: AttributeFlags::empty(),
                }),
            };
            let current = stack.last_applied.as_ref().map(|entry| &entry.attribute);
            let wanted = desired.as_ref().map(|entry| &entry.attribute);
            if current != wanted {
                if let Some(attribute) = wanted {
                    attribute.apply(ctx);
                    applied += 1;
                }
                stack.last_applied = desired;
            }
            stack.as_changed = false;
        }
        applied
    }

    /// Upload uniforms of every active attribute to the current program
    pub fn apply_uniforms(&self, ctx: &mut dyn GraphicContext) {
        for stack in &self.stacks {
            if let Some(entry) = stack.back() {
                entry.attribute.apply_uniforms(ctx);
            }
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{GlCommand, RecordingContext};

    fn line_width_set(width: f32) -> StateSet {
        StateSet::new().with_attribute(StateAttribute::LineWidth(width))
    }

    #[test]
    fn test_nested_sets_shadow_and_restore() {
        let mut state = State::new();
        state.push_state_set(&line_width_set(2.0));
        state.push_state_set(&line_width_set(5.0));
        assert_eq!(state.top(AttributeType::LineWidth), Some(&StateAttribute::LineWidth(5.0)));

        state.pop_state_set();
        assert_eq!(state.top(AttributeType::LineWidth), Some(&StateAttribute::LineWidth(2.0)));
        state.pop_state_set();
        assert_eq!(state.top(AttributeType::LineWidth), None);
        assert!(state.active_types().is_empty());
    }

    #[test]
    fn test_override_shadows_unprotected_children() {
        let mut state = State::new();
        let mut parent = StateSet::new();
        parent.set_attribute_with_flags(StateAttribute::LineWidth(4.0), AttributeFlags::OVERRIDE);
        state.push_state_set(&parent);

        state.push_state_set(&line_width_set(1.5));
        assert_eq!(state.top(AttributeType::LineWidth), Some(&StateAttribute::LineWidth(4.0)));
        state.pop_state_set();

        let mut protected = StateSet::new();
        protected.set_attribute_with_flags(StateAttribute::LineWidth(1.5), AttributeFlags::PROTECTED);
        state.push_state_set(&protected);
        assert_eq!(state.top(AttributeType::LineWidth), Some(&StateAttribute::LineWidth(1.5)));
    }

    #[test]
    fn test_apply_skips_redundant_changes() {
        let mut ctx = RecordingContext::new();
        let mut state = State::new();

        // First apply sends every default once
        let first = state.apply(&mut ctx);
        assert!(first > 0);
        ctx.take_commands();

        // Same width as default: stack changed but value did not
        state.push_state_set(&line_width_set(1.0));
        assert_eq!(state.apply(&mut ctx), 0);

        state.push_state_set(&line_width_set(3.0));
        assert_eq!(state.apply(&mut ctx), 1);
        assert_eq!(ctx.take_commands(), vec![GlCommand::LineWidth(3.0)]);

        state.pop_state_set();
        state.apply(&mut ctx);
        assert_eq!(ctx.take_commands(), vec![GlCommand::LineWidth(1.0)]);
    }

    #[test]
    fn test_dirty_all_reapplies_everything() {
        let mut ctx = RecordingContext::new();
        let mut state = State::new();
        let first = state.apply(&mut ctx);
        assert_eq!(state.apply(&mut ctx), 0);
        state.dirty_all();
        assert_eq!(state.apply(&mut ctx), first);
    }

    #[test]
    fn test_generator_name_follows_nesting() {
        let mut state = State::new();
        let mut shadow = StateSet::new();
        shadow.set_shader_generator_name("ShadowCast");
        state.push_state_set(&shadow);
        state.push_state_set(&line_width_set(2.0));
        assert_eq!(state.shader_generator_name(), Some("ShadowCast"));
        state.pop_all();
        assert_eq!(state.shader_generator_name(), None);
        assert_eq!(state.depth(), 0);
    }
}
