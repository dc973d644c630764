use half::f16;
use image::{Rgba, Rgba32FImage};
use nalgebra::Vector3;

/// One RGBA half-float texel.
pub type Texel = [f16; 4];

/// The clear value every texel starts at: transparent black.
pub const CLEAR_TEXEL: Texel = [f16::ZERO; 4];

/// A 2D image of 4-channel half-precision floats (the ARGBHalf layout).
///
/// Texel `(x, y)` lives at `y * width + x`. In baked textures `x` is the
/// vertex index and `y` the frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct HalfTexture {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<Texel>,
}

impl HalfTexture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            texels: vec![CLEAR_TEXEL; width * height],
        }
    }

    #[inline(always)]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Resets every texel to `value`.
    pub fn clear(&mut self, value: Texel) {
        self.texels.fill(value);
    }

    pub fn texel(&self, x: usize, y: usize) -> Option<Texel> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.texels[self.index(x, y)])
    }

    /// Reads the RGB channels of a texel back as a vector.
    pub fn read_vec3(&self, x: usize, y: usize) -> Option<Vector3<f32>> {
        self.texel(x, y)
            .map(|t| Vector3::new(t[0].to_f32(), t[1].to_f32(), t[2].to_f32()))
    }

    /// Widens the texture to 32-bit floats for image encoders.
    pub fn to_rgba32f(&self) -> Rgba32FImage {
        Rgba32FImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let t = self.texels[self.index(x as usize, y as usize)];
            Rgba([t[0].to_f32(), t[1].to_f32(), t[2].to_f32(), t[3].to_f32()])
        })
    }
}

/// Encodes a vector into a texel: xyz in RGB, alpha set to one.
#[inline(always)]
pub fn encode_vec3(v: &Vector3<f32>) -> Texel {
    [
        f16::from_f32(v.x),
        f16::from_f32(v.y),
        f16::from_f32(v.z),
        f16::ONE,
    ]
}
