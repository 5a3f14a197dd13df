use glam::Mat4;

/// Upper three rows of an affine bone matrix, the layout the skinning shader reads from
/// its storage buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BoneMat34 {
    pub mat: [[f32; 4]; 3],
}
impl Default for BoneMat34 {
    fn default() -> Self {
        Self {
            mat: [
                [1f32, 0f32, 0f32, 0f32],
                [0f32, 1f32, 0f32, 0f32],
                [0f32, 0f32, 1f32, 0f32],
            ]
        }
    }
}
impl From<Mat4> for BoneMat34 {
    fn from(m: Mat4) -> Self {
        Self {
            mat: [m.row(0).to_array(), m.row(1).to_array(), m.row(2).to_array()],
        }
    }
}

pub fn pack_palette(palette: &[Mat4]) -> Vec<BoneMat34> {
    palette.iter().copied().map(BoneMat34::from).collect()
}
