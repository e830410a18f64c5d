//! Transform stack entries

use super::{AnimationTarget, ChannelValue};
use crate::foundation::math::{Mat4, Mat4Ext, Quat, Vec3};

/// Typed payload of a [`StackedTransform`]
#[derive(Debug, Clone, PartialEq)]
pub enum StackedElement {
    /// Translation vector
    Translate(AnimationTarget<Vec3>),
    /// Rotation of an animated angle (radians) around a fixed axis
    Rotate {
        /// Rotation axis
        axis: Vec3,
        /// Angle in radians
        angle: AnimationTarget<f32>,
    },
    /// Orientation
    Quaternion(AnimationTarget<Quat>),
    /// Per-axis scale
    Scale(AnimationTarget<Vec3>),
    /// Arbitrary matrix
    Matrix(AnimationTarget<Mat4>),
}

/// One named entry of an animated node's transform stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackedTransform {
    name: String,
    element: StackedElement,
}

impl StackedTransform {
    /// Entry with an explicit element
    pub fn new(name: impl Into<String>, element: StackedElement) -> Self {
        Self {
            name: name.into(),
            element,
        }
    }

    /// Translation entry
    pub fn translate(name: impl Into<String>, translation: Vec3) -> Self {
        Self::new(name, StackedElement::Translate(AnimationTarget::new(translation)))
    }

    /// Axis-angle rotation entry
    pub fn rotate(name: impl Into<String>, axis: Vec3, angle: f32) -> Self {
        Self::new(
            name,
            StackedElement::Rotate {
                axis,
                angle: AnimationTarget::new(angle),
            },
        )
    }

    /// Quaternion entry
    pub fn quaternion(name: impl Into<String>, rotation: Quat) -> Self {
        Self::new(name, StackedElement::Quaternion(AnimationTarget::new(rotation)))
    }

    /// Scale entry
    pub fn scale(name: impl Into<String>, scale: Vec3) -> Self {
        Self::new(name, StackedElement::Scale(AnimationTarget::new(scale)))
    }

    /// Matrix entry
    pub fn matrix(name: impl Into<String>, matrix: Mat4) -> Self {
        Self::new(name, StackedElement::Matrix(AnimationTarget::new(matrix)))
    }

    /// Element name channels bind to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed payload
    pub fn element(&self) -> &StackedElement {
        &self.element
    }

    /// Matrix for the current value
    pub fn to_matrix(&self) -> Mat4 {
        match &self.element {
            StackedElement::Translate(t) => {
                let v = t.value();
                Mat4::translation(v.x, v.y, v.z)
            }
            StackedElement::Rotate { axis, angle } => Mat4::rotation_axis(axis, *angle.value()),
            StackedElement::Quaternion(q) => q.value().to_homogeneous(),
            StackedElement::Scale(s) => {
                let v = s.value();
                Mat4::scaling(v.x, v.y, v.z)
            }
            StackedElement::Matrix(m) => *m.value(),
        }
    }

    /// Post-multiply `m` by this entry: `m = m * entry`
    pub fn apply_to_matrix(&self, m: &mut Mat4) {
        *m *= self.to_matrix();
    }

    /// Restore the authored value
    pub fn reset_to_default(&mut self) {
        match &mut self.element {
            StackedElement::Translate(t) | StackedElement::Scale(t) => t.reset_to_default(),
            StackedElement::Rotate { angle, .. } => angle.reset_to_default(),
            StackedElement::Quaternion(q) => q.reset_to_default(),
            StackedElement::Matrix(m) => m.reset_to_default(),
        }
    }

    /// Write a sampled channel value; false when the types do not match
    pub fn set_value(&mut self, value: &ChannelValue) -> bool {
        match (&mut self.element, value) {
            (StackedElement::Translate(t), ChannelValue::Vec3(v))
            | (StackedElement::Scale(t), ChannelValue::Vec3(v)) => t.set_value(*v),
            (StackedElement::Rotate { angle, .. }, ChannelValue::Float(a)) => angle.set_value(*a),
            (StackedElement::Quaternion(q), ChannelValue::Quat(v)) => q.set_value(*v),
            (StackedElement::Matrix(m), ChannelValue::Matrix(v)) => m.set_value(*v),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_set_value_checks_type() {
        let mut entry = StackedTransform::translate("translate", Vec3::zeros());
        assert!(entry.set_value(&ChannelValue::Vec3(Vec3::x())));
        assert!(!entry.set_value(&ChannelValue::Float(1.0)));
        assert_eq!(entry.to_matrix(), Mat4::translation(1.0, 0.0, 0.0));

        entry.reset_to_default();
        assert_eq!(entry.to_matrix(), Mat4::identity());
    }

    #[test]
    fn test_rotate_entry_matches_quaternion_entry() {
        let axis = Vec3::z();
        let angle = std::f32::consts::FRAC_PI_2;
        let rotate = StackedTransform::rotate("rotateZ", axis, angle);
        let quat = StackedTransform::quaternion(
            "quaternion",
            Quat::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle),
        );
        assert_relative_eq!(rotate.to_matrix(), quat.to_matrix(), epsilon = 1e-6);
    }
}
