//! Skeletal animation sampling for GPU skinning.
//!
//! A [`PoseSampler`] borrows an immutable [`Clip`], advances a playback clock in clip ticks
//! and walks the clip's node hierarchy once per `advance`, writing `global * offset`
//! skinning matrices into a fixed-size palette the renderer uploads each frame.

pub mod errors;
pub mod renderer;
pub mod resource_system;
pub mod sim;

pub use errors::ClipError;
pub use resource_system::animation::{BoneBinding, BoneTrack, Channel, Clip, Node, NodeId, NodeTree};
pub use resource_system::file_formats::clipfile::Interpolation;
pub use sim::animator::{
    PoseSampler, SamplerConfig, SamplerDiagnostics, SamplerEvent, DEFAULT_PALETTE_CAPACITY,
};
pub use sim::track_eval::evaluate_track;
