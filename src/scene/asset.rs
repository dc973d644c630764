use crate::core::texture::HalfTexture;
use crate::pipeline::layout::TextureLayout;
use nalgebra::Vector3;

/// The baked output of one clip: position and normal textures plus the
/// metadata a playback material needs.
#[derive(Debug, Clone)]
pub struct BakedAnimationAsset {
    pub clip_name: String,
    pub duration: f32,
    pub looping: bool,
    pub vertex_count: usize,
    pub frame_count: usize,
    pub layout: TextureLayout,
    /// Label of the position texture, e.g. `"Hero.Walk.posTex"`.
    pub position_name: String,
    /// Label of the normal texture, e.g. `"Hero.Walk.normTex"`.
    pub normal_name: String,
    pub positions: HalfTexture,
    pub normals: HalfTexture,
}

impl BakedAnimationAsset {
    /// Baked position of `vertex` at `frame`, or `None` outside the baked grid.
    pub fn position_at(&self, vertex: usize, frame: usize) -> Option<Vector3<f32>> {
        if vertex >= self.vertex_count || frame >= self.frame_count {
            return None;
        }
        self.positions.read_vec3(vertex, frame)
    }

    /// Baked normal of `vertex` at `frame`, or `None` outside the baked grid.
    pub fn normal_at(&self, vertex: usize, frame: usize) -> Option<Vector3<f32>> {
        if vertex >= self.vertex_count || frame >= self.frame_count {
            return None;
        }
        self.normals.read_vec3(vertex, frame)
    }
}

/// References shared by every clip baked from one mesh.
#[derive(Debug, Clone, Default)]
pub struct SharedAssets {
    /// Name or path of the base mesh the playback object renders.
    pub mesh: String,
    /// Main color texture of the source material, if any.
    pub main_texture: Option<String>,
}
