use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::resource_system::animation::{Clip, NodeId};

use super::track_eval::evaluate_track;

/// Matches the bone array size of the common skinning shaders.
pub const DEFAULT_PALETTE_CAPACITY: usize = 100;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Number of palette slots. Bones bound to a slot at or past this are dropped.
    /// 0 defers allocation to the first `play`/`switch`, which uses the default size.
    pub palette_capacity: usize,
}
impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            palette_capacity: DEFAULT_PALETTE_CAPACITY,
        }
    }
}
impl SamplerConfig {
    /// Sizes the palette to fit every slot any of `clips` binds, never below the default.
    pub fn for_clips(clips: &[&Clip]) -> Self {
        let needed = clips
            .iter()
            .filter_map(|clip| clip.max_slot())
            .max()
            .map_or(0, |slot| slot as usize + 1);
        Self {
            palette_capacity: needed.max(DEFAULT_PALETTE_CAPACITY),
        }
    }
}

/// Conditions the sampler tolerates without interrupting the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerEvent<'n> {
    /// `advance` was called with no active clip; the palette keeps its last pose.
    NoActiveClip,
    /// `play`/`switch` was called without a clip and was ignored.
    InvalidClip,
    /// A bone's slot lies past the end of the palette and was not written.
    SlotOutOfRange { bone: &'n str, slot: u32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplerDiagnostics {
    pub missing_clip: u64,
    pub invalid_clip: u64,
    pub dropped_slots: u64,
}

/// Plays one clip at a time and turns it into a palette of skinning matrices.
///
/// `palette()[i]` holds `global_pose * offset` for the bone the active clip binds to
/// slot `i`; every other slot is identity. The palette is rebuilt in full on each
/// `advance` and stays valid until the next one.
#[derive(Debug)]
pub struct PoseSampler<'a> {
    palette: Vec<Mat4>,
    active_clip: Option<&'a Clip>,
    /// in ticks
    current_time: f32,
    /// last dt passed to `advance`, in seconds
    delta_time: f32,
    looping: bool,
    diagnostics: SamplerDiagnostics,
}
impl<'a> PoseSampler<'a> {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            palette: vec![Mat4::IDENTITY; config.palette_capacity],
            active_clip: None,
            current_time: 0.0,
            delta_time: 0.0,
            looping: true,
            diagnostics: SamplerDiagnostics::default(),
        }
    }

    pub fn with_clip(config: SamplerConfig, clip: &'a Clip) -> Self {
        let mut sampler = Self::new(config);
        sampler.play(Some(clip));
        sampler
    }

    /// Starts `clip` from t = 0. Looping mode is left as is.
    pub fn play(&mut self, clip: Option<&'a Clip>) {
        self.switch(clip, true);
    }

    /// Makes `clip` the active clip, keeping the current time unless `reset_time` is set.
    /// Keeping the time lets clips that share a timeline (walk/run cycles) continue in phase.
    pub fn switch(&mut self, clip: Option<&'a Clip>, reset_time: bool) {
        let Some(clip) = clip else {
            self.report(SamplerEvent::InvalidClip);
            return;
        };
        self.active_clip = Some(clip);
        if reset_time {
            self.current_time = 0.0;
        }
        if self.palette.is_empty() {
            self.palette.resize(DEFAULT_PALETTE_CAPACITY, Mat4::IDENTITY);
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Only the lower bound is enforced; keeping `t` within the clip is up to the caller.
    pub fn set_current_time(&mut self, t: f32) {
        self.current_time = if t.is_finite() { t.max(0.0) } else { 0.0 };
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn active_clip(&self) -> Option<&'a Clip> {
        self.active_clip
    }

    pub fn palette(&self) -> &[Mat4] {
        &self.palette
    }

    /// Playback position in [0, 1], 0 without a clip or for a zero-length clip.
    pub fn normalized_time(&self) -> f32 {
        match self.active_clip {
            Some(clip) if clip.duration() > 0.0 => {
                (self.current_time / clip.duration()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        match self.active_clip {
            Some(clip) => !self.looping && self.current_time >= clip.duration(),
            None => false,
        }
    }

    pub fn diagnostics(&self) -> SamplerDiagnostics {
        self.diagnostics
    }

    pub fn reset_diagnostics(&mut self) {
        self.diagnostics = SamplerDiagnostics::default();
    }

    /// Moves the clock by `dt` seconds and recomputes the whole palette.
    pub fn advance(&mut self, dt: f32) {
        self.delta_time = dt;
        let Some(clip) = self.active_clip else {
            self.report(SamplerEvent::NoActiveClip);
            return;
        };

        let next = self.current_time + clip.ticks_per_second() * dt;
        if next.is_finite() {
            self.current_time = next;
        }

        let duration = clip.duration();
        if self.looping {
            self.current_time = if duration > 0.0 {
                // rem_euclid can round up to exactly `duration` for tiny negative times
                let wrapped = self.current_time.rem_euclid(duration);
                if wrapped >= duration { 0.0 } else { wrapped }
            } else {
                0.0
            };
        } else {
            self.current_time = self.current_time.clamp(0.0, duration);
        }

        self.evaluate_hierarchy(clip);
    }

    fn evaluate_hierarchy(&mut self, clip: &'a Clip) {
        self.palette.fill(Mat4::IDENTITY);

        let tree = clip.root_node();
        let bindings = clip.bone_bindings();
        let mut stack: Vec<(NodeId, Mat4)> = vec![(tree.root(), Mat4::IDENTITY)];
        while let Some((id, parent)) = stack.pop() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            let local = match clip.find_bone_track(&node.name) {
                Some(track) => evaluate_track(track, self.current_time),
                None => node.bind_pose,
            };
            let global = parent * local;

            if let Some(binding) = bindings.get(&node.name) {
                let slot = binding.slot as usize;
                if slot < self.palette.len() {
                    self.palette[slot] = global * binding.offset;
                } else {
                    self.report(SamplerEvent::SlotOutOfRange {
                        bone: &node.name,
                        slot: binding.slot,
                    });
                }
            }

            // reversed so children are visited in declared order
            stack.extend(node.children.iter().rev().map(|&child| (child, global)));
        }
    }

    fn report(&mut self, event: SamplerEvent<'_>) {
        match event {
            SamplerEvent::NoActiveClip => {
                self.diagnostics.missing_clip += 1;
                log::trace!("advance without an active clip, palette left unchanged");
            }
            SamplerEvent::InvalidClip => {
                self.diagnostics.invalid_clip += 1;
                log::warn!("play/switch called without a clip, ignored");
            }
            SamplerEvent::SlotOutOfRange { bone, slot } => {
                self.diagnostics.dropped_slots += 1;
                log::debug!(
                    "bone '{}' uses slot {} but the palette has {} slots, dropped",
                    bone,
                    slot,
                    self.palette.len()
                );
            }
        }
    }
}
