//! Animation playback

use std::collections::{BTreeMap, HashMap};

use super::{Channel, UpdateCallback};
use crate::foundation::time::FrameStamp;
use crate::scene::{NodeId, NodeVisitor, SceneGraph, TraversalMode, VisitorState};

/// What happens when playback reaches the end of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Wrap around
    Loop,
    /// Hold the last frame and stop
    Once,
}

/// Named group of channels played together
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    name: String,
    channels: Vec<Channel>,
}

impl Animation {
    /// Create an animation
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    /// Builder: add a channel
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Animation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// End time of the longest channel
    pub fn duration(&self) -> f64 {
        self.channels.iter().map(Channel::end_time).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ChannelBinding {
    node: NodeId,
    element: usize,
}

#[derive(Debug, Clone)]
struct ActiveAnimation {
    name: String,
    mode: PlayMode,
    start_time: Option<f64>,
}

/// Update callback driving every animation of a subtree
///
/// Usually installed on the scene root. Channels are bound on the first
/// update after animations or the graph structure change, by looking up the
/// node name and the stacked transform element name of each channel.
#[derive(Debug, Clone, Default)]
pub struct AnimationManager {
    animations: BTreeMap<String, Animation>,
    bindings: HashMap<String, Vec<Option<ChannelBinding>>>,
    active: Vec<ActiveAnimation>,
    stopped: Vec<String>,
    bound_generation: Option<u64>,
}

impl AnimationManager {
    /// Manager without animations
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animation, replacing one with the same name
    pub fn add_animation(&mut self, animation: Animation) {
        if self.animations.insert(animation.name().to_string(), animation).is_some() {
            log::warn!("Replacing animation with the same name");
        }
        self.bound_generation = None;
    }

    /// Builder: register an animation
    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.add_animation(animation);
        self
    }

    /// Animation by name
    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    /// Start (or restart) an animation at the next update
    pub fn play(&mut self, name: &str, mode: PlayMode) -> bool {
        if !self.animations.contains_key(name) {
            log::warn!("Cannot play unknown animation '{}'", name);
            return false;
        }
        self.active.retain(|a| a.name != name);
        self.active.push(ActiveAnimation {
            name: name.to_string(),
            mode,
            start_time: None,
        });
        true
    }

    /// Stop an animation; its targets return to their authored values at
    /// the next update
    pub fn stop(&mut self, name: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|a| a.name != name);
        let was_playing = self.active.len() != before;
        if was_playing {
            self.stopped.push(name.to_string());
        }
        was_playing
    }

    /// True while `name` is playing
    pub fn is_playing(&self, name: &str) -> bool {
        self.active.iter().any(|a| a.name == name)
    }

    /// Number of channels of `name` that found their target
    pub fn bound_channel_count(&self, name: &str) -> usize {
        self.bindings.get(name).map_or(0, |b| b.iter().flatten().count())
    }

    /// Resolve every channel against the subtree rooted at `root`
    pub fn bind(&mut self, graph: &mut SceneGraph, root: NodeId) {
        let mut collector = CollectAnimationTargets::new();
        collector.run(graph, root);

        self.bindings.clear();
        for (name, animation) in &self.animations {
            let bindings = animation
                .channels()
                .iter()
                .map(|channel| {
                    let Some(&node) = collector.targets.get(channel.target_name()) else {
                        log::warn!(
                            "Animation '{}': no animated node named '{}'",
                            name,
                            channel.target_name()
                        );
                        return None;
                    };
                    let element = match graph.node(node).and_then(|n| n.update_callback()) {
                        Some(UpdateCallback::MatrixTransform(update)) => update.find(channel.element_name()),
                        _ => None,
                    };
                    if element.is_none() {
                        log::warn!(
                            "Animation '{}': node '{}' has no element '{}'",
                            name,
                            channel.target_name(),
                            channel.element_name()
                        );
                    }
                    element.map(|element| ChannelBinding { node, element })
                })
                .collect();
            self.bindings.insert(name.clone(), bindings);
        }
        self.bound_generation = Some(graph.generation());
        log::debug!("Bound {} animations", self.animations.len());
    }

    pub(crate) fn update(&mut self, graph: &mut SceneGraph, id: NodeId, stamp: &FrameStamp) {
        if self.bound_generation != Some(graph.generation()) {
            self.bind(graph, id);
        }

        for name in std::mem::take(&mut self.stopped) {
            for binding in self.bindings.get(&name).into_iter().flatten().flatten() {
                if let Some(UpdateCallback::MatrixTransform(update)) =
                    graph.node_mut(binding.node).and_then(|n| n.update_callback_mut())
                {
                    update.reset_to_default();
                }
            }
        }

        let mut finished = Vec::new();
        for active in &mut self.active {
            let Some(animation) = self.animations.get(&active.name) else {
                continue;
            };
            let start = *active.start_time.get_or_insert(stamp.simulation_time);
            let duration = animation.duration();
            let mut time = stamp.simulation_time - start;
            match active.mode {
                PlayMode::Loop if duration > 0.0 => time %= duration,
                PlayMode::Loop => {}
                PlayMode::Once => {
                    if time >= duration {
                        time = duration;
                        finished.push(active.name.clone());
                    }
                }
            }

            let bindings = self.bindings.get(&active.name);
            for (index, channel) in animation.channels().iter().enumerate() {
                let Some(binding) = bindings.and_then(|b| b.get(index).copied().flatten()) else {
                    continue;
                };
                let Some(value) = channel.sample(time) else {
                    continue;
                };
                if let Some(UpdateCallback::MatrixTransform(update)) =
                    graph.node_mut(binding.node).and_then(|n| n.update_callback_mut())
                {
                    update.set_value(binding.element, &value);
                }
            }
        }
        self.active.retain(|a| !finished.contains(&a.name));
    }
}

/// Collects named nodes carrying a transform-stack update callback
struct CollectAnimationTargets {
    state: VisitorState,
    targets: HashMap<String, NodeId>,
}

impl CollectAnimationTargets {
    fn new() -> Self {
        Self {
            state: VisitorState::new(TraversalMode::AllChildren),
            targets: HashMap::new(),
        }
    }
}

impl NodeVisitor for CollectAnimationTargets {
    fn state(&self) -> &VisitorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut VisitorState {
        &mut self.state
    }

    fn apply(&mut self, graph: &mut SceneGraph, id: NodeId) {
        if let Some(node) = graph.node(id) {
            if let Some(UpdateCallback::MatrixTransform(_)) = node.update_callback() {
                match node.name() {
                    Some(name) => {
                        let existing = *self.targets.entry(name.to_string()).or_insert(id);
                        if existing != id {
                            log::warn!("Several animated nodes are named '{}', keeping the first", name);
                        }
                    }
                    None => log::warn!("Animated node without a name cannot be bound"),
                }
            }
        }
        self.traverse(graph, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Keyframe, Sampler, StackedTransform, UpdateMatrixTransform};
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::scene::{Node, NodeFragment, UpdateVisitor};

    fn stamp(time: f64) -> FrameStamp {
        FrameStamp { simulation_time: time, ..FrameStamp::default() }
    }

    fn move_x() -> Animation {
        Animation::new(
            "move",
            vec![Channel::new(
                "cube",
                "translate",
                Sampler::Vec3(vec![
                    Keyframe::new(0.0, Vec3::zeros()),
                    Keyframe::new(2.0, Vec3::new(10.0, 0.0, 0.0)),
                ]),
            )],
        )
    }

    fn scene(manager: AnimationManager) -> (SceneGraph, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(
            Node::group().with_update_callback(UpdateCallback::AnimationManager(manager)),
        );
        let cube = graph.add_node(
            Node::matrix_transform(Mat4::identity())
                .with_name("cube")
                .with_update_callback(UpdateCallback::MatrixTransform(
                    UpdateMatrixTransform::new()
                        .with(StackedTransform::translate("translate", Vec3::zeros())),
                )),
        );
        graph.add_child(root, cube).unwrap();
        (graph, root, cube)
    }

    fn manager_mut(graph: &mut SceneGraph, root: NodeId) -> &mut AnimationManager {
        match graph.node_mut(root).and_then(|n| n.update_callback_mut()) {
            Some(UpdateCallback::AnimationManager(manager)) => manager,
            _ => panic!("root has no animation manager"),
        }
    }

    fn run_update(graph: &mut SceneGraph, root: NodeId, time: f64) {
        let mut visitor = UpdateVisitor::new();
        visitor.set_frame_stamp(stamp(time));
        visitor.run(graph, root);
    }

    #[test]
    fn test_loop_playback_drives_matrix() {
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(move_x()));
        assert!(manager_mut(&mut graph, root).play("move", PlayMode::Loop));

        run_update(&mut graph, root, 10.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("move"), 1);
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::identity()));

        run_update(&mut graph, root, 11.0);
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::translation(5.0, 0.0, 0.0)));

        // Wraps after two seconds
        run_update(&mut graph, root, 12.5);
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::translation(2.5, 0.0, 0.0)));
    }

    #[test]
    fn test_once_holds_last_frame_then_stops() {
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(move_x()));
        manager_mut(&mut graph, root).play("move", PlayMode::Once);

        run_update(&mut graph, root, 0.0);
        run_update(&mut graph, root, 5.0);
        assert!(!manager_mut(&mut graph, root).is_playing("move"));
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::translation(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_stop_resets_targets() {
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(move_x()));
        manager_mut(&mut graph, root).play("move", PlayMode::Loop);
        run_update(&mut graph, root, 0.0);
        run_update(&mut graph, root, 1.0);

        assert!(manager_mut(&mut graph, root).stop("move"));
        run_update(&mut graph, root, 1.5);
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::identity()));
    }

    #[test]
    fn test_missing_targets_are_skipped() {
        let broken = Animation::new(
            "broken",
            vec![
                Channel::new("ghost", "translate", Sampler::Float(vec![Keyframe::new(0.0, 1.0)])),
                Channel::new("cube", "missing", Sampler::Float(vec![Keyframe::new(0.0, 1.0)])),
            ],
        );
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(broken));
        let unnamed = graph.add_node(
            Node::matrix_transform(Mat4::identity())
                .with_update_callback(UpdateCallback::MatrixTransform(UpdateMatrixTransform::new())),
        );
        graph.add_child(root, unnamed).unwrap();

        manager_mut(&mut graph, root).play("broken", PlayMode::Loop);
        run_update(&mut graph, root, 0.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("broken"), 0);
        assert_eq!(graph.node(cube).unwrap().matrix(), Some(&Mat4::identity()));
    }

    #[test]
    fn test_nodes_attached_later_are_bound() {
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(move_x()));
        graph.remove_node(cube).unwrap();
        manager_mut(&mut graph, root).play("move", PlayMode::Loop);
        run_update(&mut graph, root, 0.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("move"), 0);

        let fragment = NodeFragment::leaf(
            Node::matrix_transform(Mat4::identity())
                .with_name("cube")
                .with_update_callback(UpdateCallback::MatrixTransform(
                    UpdateMatrixTransform::new()
                        .with(StackedTransform::translate("translate", Vec3::zeros())),
                )),
        );
        let late = graph.attach_fragment(Some(root), fragment).unwrap();

        run_update(&mut graph, root, 1.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("move"), 1);
        assert_eq!(graph.node(late).unwrap().matrix(), Some(&Mat4::translation(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_removed_target_is_unbound() {
        let (mut graph, root, cube) = scene(AnimationManager::new().with_animation(move_x()));
        manager_mut(&mut graph, root).play("move", PlayMode::Loop);
        run_update(&mut graph, root, 0.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("move"), 1);

        graph.remove_node(cube).unwrap();
        run_update(&mut graph, root, 1.0);
        assert_eq!(manager_mut(&mut graph, root).bound_channel_count("move"), 0);
    }

    #[test]
    fn test_unknown_animation_is_refused() {
        let mut manager = AnimationManager::new();
        assert!(!manager.play("nothing", PlayMode::Once));
        assert!(!manager.stop("nothing"));
    }
}
