use thiserror::Error;

/// Errors raised while building a [`Clip`](crate::resource_system::animation::Clip).
///
/// Playback itself never fails; see [`SamplerEvent`](crate::sim::animator::SamplerEvent)
/// for the silently tolerated per-frame conditions.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("clip has no nodes")]
    EmptyHierarchy,

    #[error("node {node} lists child {child}, but the clip only has {count} nodes")]
    ChildOutOfRange { node: u32, child: u32, count: usize },

    /// A node is reachable more than once, either shared between parents or through a cycle.
    #[error("node {0} is reachable more than once, hierarchy is not a tree")]
    NotATree(u32),

    #[error("unknown node id")]
    UnknownNode,

    #[error("invalid timing: {field} = {value}")]
    InvalidTiming { field: &'static str, value: f32 },

    #[error("malformed {channel} channel on track '{track}': {reason}")]
    MalformedChannel {
        track: String,
        channel: &'static str,
        reason: String,
    },

    #[error("keyframe times of the {channel} channel on track '{track}' are not sorted")]
    UnsortedKeyframes { track: String, channel: &'static str },

    #[error("failed to parse clip: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClipError>;
