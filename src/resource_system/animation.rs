// Runtime clip format

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use glam::{Mat4, Quat, Vec3};

use crate::errors::{ClipError, Result};

use super::file_formats::clipfile::{ChannelDesc, ClipFile, Interpolation, TrackDesc};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct NodeId(pub Index);

#[derive(Debug)]
pub struct Node {
    pub name: String,
    /// local transform relative to the parent when no track animates this node
    pub bind_pose: Mat4,
    pub children: Vec<NodeId>,
}

/// Skeleton hierarchy. Nodes are only ever appended under an existing parent, so the
/// arena always holds a tree rooted at `root`.
#[derive(Debug)]
pub struct NodeTree {
    root: NodeId,
    nodes: Arena<Node>,
}
impl NodeTree {
    pub fn new(root_name: impl Into<String>, bind_pose: Mat4) -> Self {
        let mut nodes = Arena::new();
        let root = NodeId(nodes.insert(Node {
            name: root_name.into(),
            bind_pose,
            children: vec![],
        }));
        Self { root, nodes }
    }

    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>, bind_pose: Mat4) -> Result<NodeId> {
        if !self.nodes.contains(parent.0) {
            return Err(ClipError::UnknownNode);
        }
        let id = NodeId(self.nodes.insert(Node {
            name: name.into(),
            bind_pose,
            children: vec![],
        }));
        self.nodes
            .get_mut(parent.0)
            .ok_or(ClipError::UnknownNode)?
            .children
            .push(id);
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(idx, _)| NodeId(idx))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneBinding {
    /// index into the sampler's palette
    pub slot: u32,
    /// inverse bind pose
    pub offset: Mat4,
}

#[derive(Clone, Debug)]
pub struct Channel<T> {
    pub times: Option<Box<[f32]>>, // None = use BoneTrack.shared_times
    pub values: Box<[T]>,
    pub interpolation: Interpolation,
}
impl<T> Channel<T> {
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: Interpolation) -> Self {
        Self {
            times: Some(times.into_boxed_slice()),
            values: values.into_boxed_slice(),
            interpolation,
        }
    }

    pub fn with_shared_times(values: Vec<T>, interpolation: Interpolation) -> Self {
        Self {
            times: None,
            values: values.into_boxed_slice(),
            interpolation,
        }
    }

    fn stride(&self) -> usize {
        match self.interpolation {
            Interpolation::CubicSpline => 3,
            _ => 1,
        }
    }

    fn validate(&self, track: &BoneTrack, track_name: &str, channel: &'static str) -> Result<()> {
        let times = self.times.as_deref().or(track.shared_times.as_deref()).ok_or_else(|| {
            ClipError::MalformedChannel {
                track: track_name.to_string(),
                channel,
                reason: "no keyframe times and no shared times".to_string(),
            }
        })?;
        let expected = times.len() * self.stride();
        if self.values.len() != expected {
            return Err(ClipError::MalformedChannel {
                track: track_name.to_string(),
                channel,
                reason: format!("expected {} values for {} keys, got {}", expected, times.len(), self.values.len()),
            });
        }
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(ClipError::MalformedChannel {
                track: track_name.to_string(),
                channel,
                reason: format!("non-finite keyframe time {}", bad),
            });
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ClipError::UnsortedKeyframes {
                track: track_name.to_string(),
                channel,
            });
        }
        Ok(())
    }
}

/// Keyframes for one node. Missing channels leave that component at identity.
#[derive(Clone, Debug, Default)]
pub struct BoneTrack {
    pub shared_times: Option<Box<[f32]>>, // if all TRS share same time array
    pub translation: Option<Channel<Vec3>>,
    pub rotation: Option<Channel<Quat>>,
    pub scale: Option<Channel<Vec3>>,
}
impl BoneTrack {
    pub fn with_translation(mut self, channel: Channel<Vec3>) -> Self {
        self.translation = Some(channel);
        self
    }

    pub fn with_rotation(mut self, channel: Channel<Quat>) -> Self {
        self.rotation = Some(channel);
        self
    }

    pub fn with_scale(mut self, channel: Channel<Vec3>) -> Self {
        self.scale = Some(channel);
        self
    }

    pub fn with_shared_times(mut self, times: Vec<f32>) -> Self {
        self.shared_times = Some(times.into_boxed_slice());
        self
    }

    /// Keyframe times of `channel`, falling back to the shared array.
    pub fn channel_times<'a, T>(&'a self, channel: &'a Channel<T>) -> &'a [f32] {
        channel
            .times
            .as_deref()
            .or(self.shared_times.as_deref())
            .unwrap_or(&[])
    }

    fn validate(&self, name: &str) -> Result<()> {
        if let Some(channel) = &self.translation {
            channel.validate(self, name, "translation")?;
        }
        if let Some(channel) = &self.rotation {
            channel.validate(self, name, "rotation")?;
        }
        if let Some(channel) = &self.scale {
            channel.validate(self, name, "scale")?;
        }
        Ok(())
    }
}

/// An immutable skeletal animation. Samplers borrow it; it is never copied or mutated
/// during playback, so one clip can back any number of samplers.
#[derive(Debug)]
pub struct Clip {
    ticks_per_second: f32,
    /// in ticks
    duration: f32,
    hierarchy: NodeTree,
    bindings: HashMap<String, BoneBinding>,
    tracks: HashMap<String, BoneTrack>,
}
impl Clip {
    pub fn new(ticks_per_second: f32, duration: f32, hierarchy: NodeTree) -> Result<Self> {
        check_timing("ticks_per_second", ticks_per_second)?;
        check_timing("duration", duration)?;
        Ok(Self {
            ticks_per_second,
            duration,
            hierarchy,
            bindings: HashMap::new(),
            tracks: HashMap::new(),
        })
    }

    pub fn bind_bone(&mut self, name: impl Into<String>, slot: u32, offset: Mat4) {
        self.bindings.insert(name.into(), BoneBinding { slot, offset });
    }

    pub fn insert_track(&mut self, name: impl Into<String>, track: BoneTrack) -> Result<()> {
        let name = name.into();
        track.validate(&name)?;
        if self.tracks.insert(name.clone(), track).is_some() {
            log::warn!("track '{}' defined twice, keeping the last one", name);
        }
        Ok(())
    }

    pub fn ticks_per_second(&self) -> f32 {
        self.ticks_per_second
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn root_node(&self) -> &NodeTree {
        &self.hierarchy
    }

    pub fn find_bone_track(&self, name: &str) -> Option<&BoneTrack> {
        self.tracks.get(name)
    }

    pub fn bone_bindings(&self) -> &HashMap<String, BoneBinding> {
        &self.bindings
    }

    pub fn max_slot(&self) -> Option<u32> {
        self.bindings.values().map(|binding| binding.slot).max()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClipFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn from_file(file: ClipFile) -> Result<Self> {
        let Some(root_desc) = file.nodes.first() else {
            return Err(ClipError::EmptyHierarchy);
        };
        let count = file.nodes.len();
        let mut tree = NodeTree::new(root_desc.name.clone(), Mat4::from_cols_array_2d(&root_desc.transform));

        let mut visited = vec![false; count];
        visited[0] = true;
        let mut stack = vec![(0usize, tree.root())];
        while let Some((desc_idx, id)) = stack.pop() {
            for &child in &file.nodes[desc_idx].children {
                let child_idx = child as usize;
                let Some(child_desc) = file.nodes.get(child_idx) else {
                    return Err(ClipError::ChildOutOfRange {
                        node: desc_idx as u32,
                        child,
                        count,
                    });
                };
                if visited[child_idx] {
                    return Err(ClipError::NotATree(child));
                }
                visited[child_idx] = true;
                let child_id = tree.add_child(id, child_desc.name.clone(), Mat4::from_cols_array_2d(&child_desc.transform))?;
                stack.push((child_idx, child_id));
            }
        }
        for (idx, node) in file.nodes.iter().enumerate() {
            if !visited[idx] {
                log::warn!("node {} '{}' is not reachable from the root and was dropped", idx, node.name);
            }
        }

        let mut clip = Self::new(file.ticks_per_second, file.duration, tree)?;
        for bone in file.bones {
            clip.bind_bone(bone.name, bone.slot, Mat4::from_cols_array_2d(&bone.offset));
        }
        for track in file.tracks {
            let (name, track) = convert_track(track);
            clip.insert_track(name, track)?;
        }
        Ok(clip)
    }
}

fn check_timing(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ClipError::InvalidTiming { field, value })
    }
}

fn convert_channel<S: Copy, T>(desc: ChannelDesc<S>, f: impl Fn(S) -> T) -> Channel<T> {
    Channel {
        times: desc.times.map(Vec::into_boxed_slice),
        values: desc.values.into_iter().map(f).collect(),
        interpolation: desc.interpolation,
    }
}

fn convert_track(desc: TrackDesc) -> (String, BoneTrack) {
    let track = BoneTrack {
        shared_times: desc.shared_times.map(Vec::into_boxed_slice),
        translation: desc.translation.map(|c| convert_channel(c, Vec3::from_array)),
        rotation: desc.rotation.map(|c| convert_channel(c, Quat::from_array)),
        scale: desc.scale.map(|c| convert_channel(c, Vec3::from_array)),
    };
    (desc.name, track)
}
