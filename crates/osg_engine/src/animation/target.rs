//! Animated values with an authored default

/// A value driven by animation channels, with the authored value to fall back to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTarget<T> {
    value: T,
    default: T,
}

impl<T: Clone> AnimationTarget<T> {
    /// Target whose current and default values are both `value`
    pub fn new(value: T) -> Self {
        Self {
            default: value.clone(),
            value,
        }
    }

    /// Current value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Overwrite the current value
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Authored value
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Change the authored value; the current value is left alone
    pub fn set_default_value(&mut self, value: T) {
        self.default = value;
    }

    /// Restore the authored value
    pub fn reset_to_default(&mut self) {
        self.value = self.default.clone();
    }
}
