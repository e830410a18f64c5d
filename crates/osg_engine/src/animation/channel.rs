//! Keyframe channels

use crate::foundation::math::{utils, Mat4, Quat, Vec3};

/// A value at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    /// Time in seconds from the start of the animation
    pub time: f64,
    /// Value at `time`
    pub value: T,
}

impl<T> Keyframe<T> {
    /// Create a keyframe
    pub fn new(time: f64, value: T) -> Self {
        Self { time, value }
    }
}

/// A sampled channel value, written into a stacked transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    /// Translation or scale
    Vec3(Vec3),
    /// Rotation angle
    Float(f32),
    /// Orientation
    Quat(Quat),
    /// Full matrix
    Matrix(Mat4),
}

/// Keyframes of one type and how they are interpolated
#[derive(Debug, Clone, PartialEq)]
pub enum Sampler {
    /// Linear interpolation
    Vec3(Vec<Keyframe<Vec3>>),
    /// Spherical interpolation
    Quat(Vec<Keyframe<Quat>>),
    /// Linear interpolation
    Float(Vec<Keyframe<f32>>),
    /// Stepped; matrices are not interpolated
    Matrix(Vec<Keyframe<Mat4>>),
}

/// Keyframes bound to one element of one node's transform stack
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    target_name: String,
    element_name: String,
    sampler: Sampler,
}

impl Channel {
    /// Channel writing `element_name` on the node called `target_name`.
    /// Keyframes are sorted by time.
    pub fn new(target_name: impl Into<String>, element_name: impl Into<String>, mut sampler: Sampler) -> Self {
        match &mut sampler {
            Sampler::Vec3(k) => k.sort_by(|a, b| a.time.total_cmp(&b.time)),
            Sampler::Quat(k) => k.sort_by(|a, b| a.time.total_cmp(&b.time)),
            Sampler::Float(k) => k.sort_by(|a, b| a.time.total_cmp(&b.time)),
            Sampler::Matrix(k) => k.sort_by(|a, b| a.time.total_cmp(&b.time)),
        }
        Self {
            target_name: target_name.into(),
            element_name: element_name.into(),
            sampler,
        }
    }

    /// Name of the animated node
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Name of the stacked transform element
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// Keyframes
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Time of the last keyframe
    pub fn end_time(&self) -> f64 {
        match &self.sampler {
            Sampler::Vec3(k) => last_time(k),
            Sampler::Quat(k) => last_time(k),
            Sampler::Float(k) => last_time(k),
            Sampler::Matrix(k) => last_time(k),
        }
    }

    /// Value at `time`; clamps outside the keyframe range, `None` without keyframes
    pub fn sample(&self, time: f64) -> Option<ChannelValue> {
        match &self.sampler {
            Sampler::Vec3(k) => sample_with(k, time, |a, b, t| a.lerp(b, t)).map(ChannelValue::Vec3),
            Sampler::Quat(k) => sample_with(k, time, slerp).map(ChannelValue::Quat),
            Sampler::Float(k) => sample_with(k, time, |a, b, t| utils::lerp(*a, *b, t)).map(ChannelValue::Float),
            Sampler::Matrix(k) => sample_with(k, time, |a, _, _| *a).map(ChannelValue::Matrix),
        }
    }
}

fn last_time<T>(keys: &[Keyframe<T>]) -> f64 {
    keys.last().map_or(0.0, |k| k.time)
}

fn slerp(a: &Quat, b: &Quat, t: f32) -> Quat {
    a.try_slerp(b, t, 1.0e-6)
        .unwrap_or(if t < 0.5 { *a } else { *b })
}

fn sample_with<T: Copy>(keys: &[Keyframe<T>], time: f64, interpolate: impl Fn(&T, &T, f32) -> T) -> Option<T> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }
    // First key strictly after `time`; the range checks above keep it in 1..len
    let next = keys.partition_point(|k| k.time <= time);
    let (a, b) = (&keys[next - 1], &keys[next]);
    let span = b.time - a.time;
    if span <= 0.0 {
        return Some(b.value);
    }
    let t = ((time - a.time) / span) as f32;
    Some(interpolate(&a.value, &b.value, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vec3_channel_interpolates_and_clamps() {
        let channel = Channel::new(
            "node",
            "translate",
            Sampler::Vec3(vec![
                Keyframe::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
                Keyframe::new(0.0, Vec3::zeros()),
            ]),
        );
        assert_eq!(channel.end_time(), 1.0);
        let Some(ChannelValue::Vec3(mid)) = channel.sample(0.25) else {
            panic!("expected a vec3 sample");
        };
        assert_relative_eq!(mid, Vec3::new(2.5, 0.0, 0.0));
        assert_eq!(channel.sample(-1.0), Some(ChannelValue::Vec3(Vec3::zeros())));
        assert_eq!(channel.sample(5.0), Some(ChannelValue::Vec3(Vec3::new(10.0, 0.0, 0.0))));
    }

    #[test]
    fn test_quat_channel_slerps() {
        let axis = nalgebra::Vector3::z_axis();
        let channel = Channel::new(
            "node",
            "quaternion",
            Sampler::Quat(vec![
                Keyframe::new(0.0, Quat::identity()),
                Keyframe::new(2.0, Quat::from_axis_angle(&axis, std::f32::consts::FRAC_PI_2)),
            ]),
        );
        let Some(ChannelValue::Quat(q)) = channel.sample(1.0) else {
            panic!("expected a quaternion sample");
        };
        assert_relative_eq!(q.angle(), std::f32::consts::FRAC_PI_4, epsilon = 1e-5);
    }

    #[test]
    fn test_matrix_channel_steps() {
        let a = Mat4::identity();
        let b = Mat4::new_scaling(2.0);
        let channel = Channel::new(
            "node",
            "matrix",
            Sampler::Matrix(vec![Keyframe::new(0.0, a), Keyframe::new(1.0, b)]),
        );
        assert_eq!(channel.sample(0.99), Some(ChannelValue::Matrix(a)));
        assert_eq!(channel.sample(1.0), Some(ChannelValue::Matrix(b)));
    }

    #[test]
    fn test_empty_channel_has_no_sample() {
        let channel = Channel::new("node", "angle", Sampler::Float(Vec::new()));
        assert!(channel.sample(0.0).is_none());
        assert_eq!(channel.end_time(), 0.0);
    }
}
