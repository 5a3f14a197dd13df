use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    /// values are stored as [in_tangent, value, out_tangent] triples
    CubicSpline,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClipFile {
    pub ticks_per_second: f32,
    /// in ticks
    pub duration: f32,
    /// nodes[0] is the root
    pub nodes: Vec<NodeDesc>,
    #[serde(default)]
    pub bones: Vec<BoneDesc>,
    #[serde(default)]
    pub tracks: Vec<TrackDesc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub children: Vec<u32>,
    /// column-major
    #[serde(default = "identity")]
    pub transform: [[f32; 4]; 4],
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoneDesc {
    pub name: String,
    pub slot: u32,
    /// column-major inverse bind matrix
    #[serde(default = "identity")]
    pub offset: [[f32; 4]; 4],
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackDesc {
    /// name of the node this track animates
    pub name: String,

    /// If Some, T/R/S without their own times use this array.
    #[serde(default)]
    pub shared_times: Option<Vec<f32>>,

    #[serde(default)]
    pub translation: Option<ChannelDesc<[f32; 3]>>,
    /// xyzw
    #[serde(default)]
    pub rotation: Option<ChannelDesc<[f32; 4]>>,
    #[serde(default)]
    pub scale: Option<ChannelDesc<[f32; 3]>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChannelDesc<T> {
    #[serde(default)]
    pub times: Option<Vec<f32>>, // None -> use TrackDesc.shared_times
    pub values: Vec<T>,
    #[serde(default)]
    pub interpolation: Interpolation,
}

fn identity() -> [[f32; 4]; 4] {
    glam::Mat4::IDENTITY.to_cols_array_2d()
}
