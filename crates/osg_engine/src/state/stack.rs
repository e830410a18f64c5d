//! Per-attribute-type value stack

/// Ordered values of one attribute type plus what was last sent to the GPU
///
/// `back()` is always the most recently pushed value still on the stack.
/// `as_changed` is raised by every push and pop and tells the state applier
/// that `back()` may differ from `last_applied`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack<T> {
    values: Vec<T>,
    /// Value last applied to the graphics context
    pub last_applied: Option<T>,
    /// The top may have changed since the last apply
    pub as_changed: bool,
}

impl<T> Stack<T> {
    /// Create an empty stack
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            last_applied: None,
            as_changed: false,
        }
    }

    /// Push a value; it becomes `back()`
    pub fn push(&mut self, value: T) {
        self.values.push(value);
        self.as_changed = true;
    }

    /// Remove the top value. Popping an empty stack is a no-op returning `None`.
    pub fn pop(&mut self) -> Option<T> {
        let value = self.values.pop();
        if value.is_some() {
            self.as_changed = true;
        }
        value
    }

    /// Current top, or `None` when empty
    pub fn back(&self) -> Option<&T> {
        self.values.last()
    }

    /// True when nothing is pushed
    pub fn empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All pushed values, bottom first
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_tracks_last_unmatched_push() {
        let mut stack = Stack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        stack.pop();
        assert_eq!(stack.back(), Some(&2));

        stack.push(4);
        stack.pop();
        assert_eq!(stack.back(), Some(&2));

        stack.pop();
        stack.pop();
        assert_eq!(stack.back(), None);
        assert!(stack.empty());
    }

    #[test]
    fn test_pop_on_empty_is_noop() {
        let mut stack: Stack<u8> = Stack::new();
        assert_eq!(stack.pop(), None);
        assert!(!stack.as_changed);
        assert_eq!(stack.back(), None);
    }

    #[test]
    fn test_balanced_sequences_return_to_start() {
        // Nested push/pop patterns encoded as +n / -1
        let patterns: [&[i32]; 3] = [&[1, -1], &[1, 2, -1, 3, -1, -1], &[5, 6, 7, -1, -1, 8, -1]];
        for pattern in patterns {
            let mut stack = Stack::new();
            let mut model: Vec<i32> = Vec::new();
            for &op in pattern {
                if op > 0 {
                    stack.push(op);
                    model.push(op);
                } else {
                    stack.pop();
                    model.pop();
                }
                assert_eq!(stack.back(), model.last());
                assert_eq!(stack.values(), model.as_slice());
            }
        }
    }
}
