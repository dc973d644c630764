use crate::core::error::{BakeError, Result};
use crate::pipeline::layout::WorkGroupSize;
use crate::pipeline::sampler::DEFAULT_SAMPLE_INTERVAL;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bake: BakeConfig,
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default = "default_bones")]
    pub bones: Vec<BoneConfig>,
    #[serde(default = "default_clips")]
    pub clips: Vec<ClipConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bake: BakeConfig::default(),
            mesh: MeshConfig::default(),
            bones: default_bones(),
            clips: default_clips(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BakeConfig {
    // --- Naming & Output ---
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub main_texture: Option<String>,

    // --- Sampling ---
    #[serde(default = "default_sample_interval")]
    pub sample_interval: f32,

    // --- Compute ---
    #[serde(default = "default_work_group")]
    pub work_group: [u32; 3],
    #[serde(default = "default_max_texture_size")]
    pub max_texture_size: usize,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            output_dir: default_output_dir(),
            main_texture: None,
            sample_interval: default_sample_interval(),
            work_group: default_work_group(),
            max_texture_size: default_max_texture_size(),
        }
    }
}

impl BakeConfig {
    /// Kernel work-group size. Every axis must declare at least one thread.
    pub fn work_group_size(&self) -> Result<WorkGroupSize> {
        let [x, y, z] = self.work_group;
        let size = WorkGroupSize::new(x, y, z);
        if size.is_degenerate() {
            return Err(BakeError::Config(format!(
                "bake.work_group {:?} has a zero axis",
                self.work_group
            )));
        }
        Ok(size)
    }
}

fn default_name() -> String {
    "Column".to_string()
}
fn default_output_dir() -> String {
    "baked".to_string()
}
fn default_sample_interval() -> f32 {
    DEFAULT_SAMPLE_INTERVAL
}
fn default_work_group() -> [u32; 3] {
    [8, 8, 1]
}
fn default_max_texture_size() -> usize {
    16384
}

/// Source mesh. Without `path` a procedural column is generated.
#[derive(Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default = "default_segments")]
    pub segments: usize,
    #[serde(default = "default_rings")]
    pub rings: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            path: None,
            radius: default_radius(),
            height: default_height(),
            segments: default_segments(),
            rings: default_rings(),
        }
    }
}

fn default_radius() -> f32 {
    0.25
}
fn default_height() -> f32 {
    2.0
}
fn default_segments() -> usize {
    12
}
fn default_rings() -> usize {
    9
}

#[derive(Debug, Deserialize)]
pub struct BoneConfig {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub head: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct ClipConfig {
    pub name: String,
    pub duration: f32,
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

#[derive(Debug, Deserialize)]
pub struct TrackConfig {
    pub bone: String,
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
}

#[derive(Debug, Deserialize)]
pub struct KeyConfig {
    pub time: f32,
    /// Euler angles in degrees.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub translation: [f32; 3],
}

fn bone(name: &str, parent: Option<&str>, head: [f32; 3]) -> BoneConfig {
    BoneConfig {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        head,
    }
}

fn key(time: f32, rotation: [f32; 3]) -> KeyConfig {
    KeyConfig {
        time,
        rotation,
        translation: [0.0; 3],
    }
}

// Demo rig matching the default column
fn default_bones() -> Vec<BoneConfig> {
    vec![
        bone("root", None, [0.0, 0.0, 0.0]),
        bone("spine", Some("root"), [0.0, 0.7, 0.0]),
        bone("neck", Some("spine"), [0.0, 1.4, 0.0]),
    ]
}

fn default_clips() -> Vec<ClipConfig> {
    vec![
        ClipConfig {
            name: "Sway".to_string(),
            duration: 1.0,
            looping: true,
            tracks: vec![TrackConfig {
                bone: "spine".to_string(),
                keys: vec![
                    key(0.0, [0.0, 0.0, 0.0]),
                    key(0.25, [0.0, 0.0, 15.0]),
                    key(0.75, [0.0, 0.0, -15.0]),
                    key(1.0, [0.0, 0.0, 0.0]),
                ],
            }],
        },
        ClipConfig {
            name: "Bow".to_string(),
            duration: 2.0,
            looping: false,
            tracks: vec![
                TrackConfig {
                    bone: "spine".to_string(),
                    keys: vec![
                        key(0.0, [0.0, 0.0, 0.0]),
                        key(1.0, [45.0, 0.0, 0.0]),
                        key(2.0, [0.0, 0.0, 0.0]),
                    ],
                },
                TrackConfig {
                    bone: "neck".to_string(),
                    keys: vec![key(0.0, [0.0, 0.0, 0.0]), key(1.0, [30.0, 0.0, 0.0])],
                },
            ],
        },
    ]
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BakeError::Config(format!("failed to parse TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_demo_rig() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.bake.name, "Column");
        assert_eq!(config.bake.sample_interval, 0.05);
        assert_eq!(config.bake.work_group_size().unwrap(), WorkGroupSize::new(8, 8, 1));
        assert_eq!(config.bones.len(), 3);
        assert_eq!(config.clips.len(), 2);
        assert!(config.mesh.path.is_none());
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [bake]
            name = "Hero"
            sample_interval = 0.1
            work_group = [16, 4, 1]

            [mesh]
            path = "hero.obj"

            [[bones]]
            name = "hips"

            [[clips]]
            name = "Idle"
            duration = 3.0
            looping = true

            [[clips.tracks]]
            bone = "hips"
            keys = [{ time = 0.0 }, { time = 3.0, rotation = [0.0, 90.0, 0.0] }]
            "#,
        )
        .unwrap();

        assert_eq!(config.bake.name, "Hero");
        assert_eq!(config.bake.output_dir, "baked");
        assert_eq!(config.bake.work_group, [16, 4, 1]);
        assert_eq!(config.mesh.path.as_deref(), Some("hero.obj"));
        assert_eq!(config.bones.len(), 1);
        assert_eq!(config.bones[0].head, [0.0; 3]);
        assert_eq!(config.clips[0].tracks[0].keys[1].rotation, [0.0, 90.0, 0.0]);
    }

    #[test]
    fn zero_work_group_axis_is_rejected() {
        let config = Config::from_toml_str("[bake]\nwork_group = [8, 8, 0]").unwrap();
        assert!(matches!(
            config.bake.work_group_size(),
            Err(BakeError::Config(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("[bake\nname = 1").unwrap_err();
        assert!(matches!(err, BakeError::Config(_)));
    }
}
