use std::cmp::Ordering;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::resource_system::{
    animation::{BoneTrack, Channel},
    file_formats::clipfile::Interpolation,
};

trait Keyframe: Copy {
    fn lerp_keys(self, other: Self, alpha: f32) -> Self;
    fn hermite(v0: Self, out_tangent0: Self, in_tangent1: Self, v1: Self, t: f32, dt: f32) -> Self;
}

impl Keyframe for Vec3 {
    fn lerp_keys(self, other: Self, alpha: f32) -> Self {
        self.lerp(other, alpha)
    }

    fn hermite(v0: Self, out_tangent0: Self, in_tangent1: Self, v1: Self, t: f32, dt: f32) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        v0 * s0 + out_tangent0 * dt * s1 + v1 * s2 + in_tangent1 * dt * s3
    }
}

impl Keyframe for Quat {
    fn lerp_keys(self, other: Self, alpha: f32) -> Self {
        self.slerp(other, alpha)
    }

    fn hermite(v0: Self, out_tangent0: Self, in_tangent1: Self, v1: Self, t: f32, dt: f32) -> Self {
        let (s0, s1, s2, s3) = hermite_basis(t);
        let v = Vec4::from(v0) * s0
            + Vec4::from(out_tangent0) * dt * s1
            + Vec4::from(v1) * s2
            + Vec4::from(in_tangent1) * dt * s3;
        Quat::from_vec4(v)
    }
}

fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    let s2 = -2.0 * t3 + 3.0 * t2;
    let s3 = t3 - t2;
    let s0 = 1.0 - s2;
    let s1 = s3 - t2 + t;
    (s0, s1, s2, s3)
}

fn bin_search_anim_indices(times: &[f32], val: f32) -> (usize, usize) {
    let n = times.len();
    if n <= 1 {
        return (0, 0);
    }

    match times.binary_search_by(|x| x.partial_cmp(&val).unwrap_or(Ordering::Greater)) {
        Ok(i) => (i, i),                    // exact hit, no blend
        Err(0) => (0, 0),                   // before first, clamp
        Err(i) if i >= n => (n - 1, n - 1), // after last, clamp
        Err(i) => (i - 1, i),               // between i-1 and i
    }
}

fn interpolate_channel<T: Keyframe>(times: &[f32], channel: &Channel<T>, t: f32) -> Option<T> {
    let stride = match channel.interpolation {
        Interpolation::CubicSpline => 3,
        _ => 1,
    };
    // tolerate hand-built channels whose values do not cover every key
    let keys = times.len().min(channel.values.len() / stride);
    if keys == 0 {
        return None;
    }
    let times = &times[..keys];
    let value_at = |i: usize| match channel.interpolation {
        Interpolation::CubicSpline => channel.values[i * 3 + 1],
        _ => channel.values[i],
    };

    let (i0, i1) = bin_search_anim_indices(times, t);
    let (t0, t1) = (times[i0], times[i1]);
    let dt = t1 - t0;
    if i0 == i1 || dt <= f32::EPSILON {
        return Some(value_at(i0));
    }
    let alpha = ((t - t0) / dt).clamp(0.0, 1.0);

    let value = match channel.interpolation {
        Interpolation::Step => value_at(i0),
        Interpolation::Linear => value_at(i0).lerp_keys(value_at(i1), alpha),
        Interpolation::CubicSpline => T::hermite(
            channel.values[i0 * 3 + 1],
            channel.values[i0 * 3 + 2],
            channel.values[i1 * 3],
            channel.values[i1 * 3 + 1],
            alpha,
            dt,
        ),
    };
    Some(value)
}

/// Samples `track` at `time` (in ticks) and returns the local transform `T * R * S`.
pub fn evaluate_track(track: &BoneTrack, time: f32) -> Mat4 {
    let translation = track
        .translation
        .as_ref()
        .and_then(|channel| interpolate_channel(track.channel_times(channel), channel, time))
        .unwrap_or(Vec3::ZERO);
    let rotation = track
        .rotation
        .as_ref()
        .and_then(|channel| interpolate_channel(track.channel_times(channel), channel, time))
        .map(|r| Vec4::from(r).try_normalize().map_or(Quat::IDENTITY, Quat::from_vec4))
        .unwrap_or(Quat::IDENTITY);
    let scale = track
        .scale
        .as_ref()
        .and_then(|channel| interpolate_channel(track.channel_times(channel), channel, time))
        .unwrap_or(Vec3::ONE);

    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn translation_track(interpolation: Interpolation) -> BoneTrack {
        BoneTrack::default().with_translation(Channel::new(
            vec![0.0, 10.0],
            vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)],
            interpolation,
        ))
    }

    #[test]
    fn linear_translation_blends_between_keys() {
        let m = evaluate_track(&translation_track(Interpolation::Linear), 2.5);
        assert!(m.abs_diff_eq(Mat4::from_translation(Vec3::new(2.5, 0.0, 0.0)), 1e-5));
    }

    #[test]
    fn step_holds_left_key() {
        let m = evaluate_track(&translation_track(Interpolation::Step), 9.9);
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn out_of_range_times_clamp_to_boundary_keys() {
        let track = translation_track(Interpolation::Linear);
        assert!(evaluate_track(&track, -3.0).abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(evaluate_track(&track, 42.0)
            .abs_diff_eq(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)), 1e-5));
    }

    #[test]
    fn rotation_uses_slerp() {
        let track = BoneTrack::default().with_rotation(Channel::new(
            vec![0.0, 1.0],
            vec![Quat::IDENTITY, Quat::from_rotation_z(FRAC_PI_2)],
            Interpolation::Linear,
        ));
        let expected = Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2 * 0.5));
        assert!(evaluate_track(&track, 0.5).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn shared_times_feed_channels_without_their_own() {
        let track = BoneTrack::default()
            .with_shared_times(vec![0.0, 2.0])
            .with_scale(Channel::with_shared_times(vec![Vec3::ONE, Vec3::splat(3.0)], Interpolation::Linear));
        let expected = Mat4::from_scale(Vec3::splat(2.0));
        assert!(evaluate_track(&track, 1.0).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn cubic_spline_with_flat_tangents_hits_midpoint() {
        let track = BoneTrack::default().with_translation(Channel::new(
            vec![0.0, 1.0],
            vec![
                Vec3::ZERO, Vec3::ZERO, Vec3::ZERO,
                Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO,
            ],
            Interpolation::CubicSpline,
        ));
        let expected = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        assert!(evaluate_track(&track, 0.5).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn empty_track_is_identity() {
        assert_eq!(evaluate_track(&BoneTrack::default(), 1.0), Mat4::IDENTITY);
    }
}
