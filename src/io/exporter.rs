use crate::core::error::{BakeError, Result};
use crate::core::texture::HalfTexture;
use crate::pipeline::baker::AssetSink;
use crate::scene::asset::{BakedAnimationAsset, SharedAssets};
use image::DynamicImage;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Keyword enabled on looping playback materials.
pub const LOOP_KEYWORD: &str = "ANIM_LOOP";

/// Parameters the playback shader reads.
#[derive(Debug, Serialize, PartialEq)]
pub struct PlaybackMaterial {
    #[serde(rename = "_MainTex", skip_serializing_if = "Option::is_none")]
    pub main_tex: Option<String>,
    #[serde(rename = "_PosTex")]
    pub pos_tex: String,
    #[serde(rename = "_NmlTex")]
    pub nml_tex: String,
    #[serde(rename = "_Length")]
    pub length: f32,
    #[serde(rename = "_Loop")]
    pub looping: f32,
    pub keywords: Vec<String>,
}

impl PlaybackMaterial {
    pub fn new(asset: &BakedAnimationAsset, shared: &SharedAssets, pos_file: &str, nml_file: &str) -> Self {
        Self {
            main_tex: shared.main_texture.clone(),
            pos_tex: pos_file.to_string(),
            nml_tex: nml_file.to_string(),
            length: asset.duration,
            looping: if asset.looping { 1.0 } else { 0.0 },
            keywords: if asset.looping {
                vec![LOOP_KEYWORD.to_string()]
            } else {
                Vec::new()
            },
        }
    }
}

/// Description of the playback object: the shared mesh drawn with the
/// baked material.
#[derive(Debug, Serialize)]
pub struct PlaybackManifest {
    pub object: String,
    pub mesh: String,
    pub clip: String,
    pub vertex_count: usize,
    pub frame_count: usize,
    pub texture_width: usize,
    pub texture_height: usize,
    pub baked_at: String,
    pub material: PlaybackMaterial,
}

/// Writes each clip to `<root>/<name>/` as two OpenEXR textures plus a
/// TOML manifest.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    name: String,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Folder holding this baker's textures and manifests.
    pub fn folder(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn write_texture(path: &Path, texture: &HalfTexture) -> Result<()> {
        DynamicImage::ImageRgba32F(texture.to_rgba32f())
            .save(path)
            .map_err(|e| BakeError::persistence(format!("failed to write '{}': {}", path.display(), e)))
    }
}

impl AssetSink for DirectorySink {
    fn persist(&mut self, asset: BakedAnimationAsset, shared: &SharedAssets) -> Result<()> {
        let folder = self.folder();
        fs::create_dir_all(&folder)?;

        let pos_file = format!("{}.exr", asset.position_name);
        let nml_file = format!("{}.exr", asset.normal_name);

        let object = format!("{}.{}", self.name, asset.clip_name);
        let manifest = PlaybackManifest {
            object: object.clone(),
            mesh: shared.mesh.clone(),
            clip: asset.clip_name.clone(),
            vertex_count: asset.vertex_count,
            frame_count: asset.frame_count,
            texture_width: asset.layout.width,
            texture_height: asset.layout.height,
            baked_at: chrono::Local::now().to_rfc3339(),
            material: PlaybackMaterial::new(&asset, shared, &pos_file, &nml_file),
        };
        let text = toml::to_string_pretty(&manifest)
            .map_err(|e| BakeError::persistence(format!("failed to encode manifest: {}", e)))?;

        // Textures go to temporary names first; any failure removes every
        // file of the clip so no partial pair stays under the final names.
        let pos_tmp = folder.join(format!("{}.tmp.exr", asset.position_name));
        let nml_tmp = folder.join(format!("{}.tmp.exr", asset.normal_name));
        let pos_path = folder.join(&pos_file);
        let nml_path = folder.join(&nml_file);
        let manifest_path = folder.join(format!("{}.animTex.toml", object));

        let saved = Self::write_texture(&pos_tmp, &asset.positions)
            .and_then(|_| Self::write_texture(&nml_tmp, &asset.normals))
            .and_then(|_| fs::rename(&pos_tmp, &pos_path).map_err(BakeError::from))
            .and_then(|_| fs::rename(&nml_tmp, &nml_path).map_err(BakeError::from))
            .and_then(|_| fs::write(&manifest_path, text).map_err(BakeError::from));
        if let Err(e) = saved {
            for path in [&pos_tmp, &nml_tmp, &pos_path, &nml_path] {
                fs::remove_file(path).ok();
            }
            return Err(e);
        }

        info!("Saved '{}' to {}", object, folder.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::{WorkGroupSize, plan};

    fn asset(looping: bool) -> BakedAnimationAsset {
        let layout = plan(3, 2, WorkGroupSize::default());
        BakedAnimationAsset {
            clip_name: "Walk".into(),
            duration: 1.5,
            looping,
            vertex_count: 3,
            frame_count: 2,
            layout,
            position_name: "Hero.Walk.posTex".into(),
            normal_name: "Hero.Walk.normTex".into(),
            positions: HalfTexture::new(layout.width, layout.height),
            normals: HalfTexture::new(layout.width, layout.height),
        }
    }

    #[test]
    fn looping_material_enables_keyword() {
        let shared = SharedAssets {
            mesh: "hero.obj".into(),
            main_texture: Some("hero.png".into()),
        };
        let mat = PlaybackMaterial::new(&asset(true), &shared, "p.exr", "n.exr");
        assert_eq!(mat.looping, 1.0);
        assert_eq!(mat.keywords, vec![LOOP_KEYWORD.to_string()]);
        assert_eq!(mat.length, 1.5);
        assert_eq!(mat.main_tex.as_deref(), Some("hero.png"));

        let mat = PlaybackMaterial::new(&asset(false), &shared, "p.exr", "n.exr");
        assert_eq!(mat.looping, 0.0);
        assert!(mat.keywords.is_empty());
    }

    #[test]
    fn directory_sink_writes_textures_and_manifest() {
        let root = std::env::temp_dir().join(format!("vat_baker_sink_{}", std::process::id()));
        let mut sink = DirectorySink::new(&root, "Hero");
        let shared = SharedAssets {
            mesh: "hero.obj".into(),
            main_texture: None,
        };
        sink.persist(asset(true), &shared).unwrap();

        let folder = sink.folder();
        assert!(folder.join("Hero.Walk.posTex.exr").exists());
        assert!(folder.join("Hero.Walk.normTex.exr").exists());
        assert!(!folder.join("Hero.Walk.posTex.tmp.exr").exists());
        let manifest = fs::read_to_string(folder.join("Hero.Walk.animTex.toml")).unwrap();
        assert!(manifest.contains("_PosTex"));
        assert!(manifest.contains("Hero.Walk.posTex.exr"));
        assert!(manifest.contains("ANIM_LOOP"));
        assert!(!manifest.contains("_MainTex"));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn failed_manifest_write_leaves_no_textures() {
        let root = std::env::temp_dir().join(format!("vat_baker_partial_{}", std::process::id()));
        let mut sink = DirectorySink::new(&root, "Hero");
        // A directory squatting on the manifest path makes the write fail.
        let folder = sink.folder();
        fs::create_dir_all(folder.join("Hero.Walk.animTex.toml")).unwrap();

        let err = sink
            .persist(asset(false), &SharedAssets::default())
            .unwrap_err();
        assert!(matches!(err, BakeError::Io(_)));
        for name in [
            "Hero.Walk.posTex.exr",
            "Hero.Walk.normTex.exr",
            "Hero.Walk.posTex.tmp.exr",
            "Hero.Walk.normTex.tmp.exr",
        ] {
            assert!(!folder.join(name).exists(), "{} left behind", name);
        }

        fs::remove_dir_all(&root).ok();
    }
}
