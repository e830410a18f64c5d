//! Transform stacks recomposed during the update pass

use super::{ChannelValue, StackedTransform};
use crate::foundation::math::Mat4;

/// Update callback recomposing a transform node's matrix from its stack
///
/// Entries apply in list order, so `[translate, rotate, scale]` yields
/// `T * R * S`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMatrixTransform {
    stacked_transforms: Vec<StackedTransform>,
}

impl UpdateMatrixTransform {
    /// Empty stack; composes to identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an entry
    pub fn with(mut self, entry: StackedTransform) -> Self {
        self.stacked_transforms.push(entry);
        self
    }

    /// Append an entry
    pub fn push(&mut self, entry: StackedTransform) {
        self.stacked_transforms.push(entry);
    }

    /// Entries, in application order
    pub fn stacked_transforms(&self) -> &[StackedTransform] {
        &self.stacked_transforms
    }

    /// Index of the entry called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.stacked_transforms.iter().position(|e| e.name() == name)
    }

    /// Write a channel sample into entry `index`
    pub fn set_value(&mut self, index: usize, value: &ChannelValue) -> bool {
        self.stacked_transforms
            .get_mut(index)
            .is_some_and(|e| e.set_value(value))
    }

    /// Restore every entry's authored value
    pub fn reset_to_default(&mut self) {
        for entry in &mut self.stacked_transforms {
            entry.reset_to_default();
        }
    }

    /// Compose the stack starting from identity
    pub fn compute_matrix(&self) -> Mat4 {
        let mut m = Mat4::identity();
        for entry in &self.stacked_transforms {
            entry.apply_to_matrix(&mut m);
        }
        m
    }
}
