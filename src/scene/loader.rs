use crate::core::error::{BakeError, Result};
use crate::core::math::transform::TransformFactory;
use crate::io::config::Config;
use crate::io::obj_loader::load_obj;
use crate::scene::asset::SharedAssets;
use crate::scene::clip::ClipInfo;
use crate::scene::mesh::Mesh;
use crate::scene::rig::{AnimationClip, Bone, BoneTrack, Keyframe, Skeleton, SkinnedEvaluator};
use log::info;
use nalgebra::{Point3, Vector3};

/// Builds the bone hierarchy. Parents are referenced by name and must be
/// declared before their children.
pub fn build_skeleton_from_config(config: &Config) -> Result<Skeleton> {
    let mut bones: Vec<Bone> = Vec::with_capacity(config.bones.len());
    for b in &config.bones {
        let parent = match &b.parent {
            Some(name) => Some(
                bones
                    .iter()
                    .position(|p| &p.name == name)
                    .ok_or_else(|| {
                        BakeError::Config(format!(
                            "bone '{}' references unknown or later parent '{}'",
                            b.name, name
                        ))
                    })?,
            ),
            None => None,
        };
        bones.push(Bone {
            name: b.name.clone(),
            parent,
            head: Point3::from(b.head),
        });
    }
    Skeleton::new(bones)
}

/// Builds keyframed clips, resolving track bones by name.
pub fn build_clips_from_config(config: &Config, skeleton: &Skeleton) -> Result<Vec<AnimationClip>> {
    config
        .clips
        .iter()
        .map(|c| {
            let tracks = c
                .tracks
                .iter()
                .map(|t| {
                    let bone = skeleton.find(&t.bone).ok_or_else(|| {
                        BakeError::Config(format!(
                            "clip '{}' animates unknown bone '{}'",
                            c.name, t.bone
                        ))
                    })?;
                    let keys = t
                        .keys
                        .iter()
                        .map(|k| Keyframe {
                            time: k.time,
                            rotation: TransformFactory::rotation_euler_deg(&k.rotation),
                            translation: Vector3::from(k.translation),
                        })
                        .collect();
                    Ok(BoneTrack::new(bone, keys))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(AnimationClip {
                info: ClipInfo::new(c.name.clone(), c.duration, c.looping),
                tracks,
            })
        })
        .collect()
}

/// Loads the configured OBJ or generates the procedural column.
pub fn load_mesh_from_config(config: &Config) -> Result<Mesh> {
    match &config.mesh.path {
        Some(path) => load_obj(path),
        None => Ok(Mesh::create_test_column(
            config.mesh.radius,
            config.mesh.height,
            config.mesh.segments,
            config.mesh.rings,
        )),
    }
}

/// Initial resource loading. Returns the evaluator ready to bake.
pub fn init_evaluator(config: &Config) -> Result<SkinnedEvaluator> {
    let mesh = load_mesh_from_config(config)?;
    let skeleton = build_skeleton_from_config(config)?;
    let clips = build_clips_from_config(config, &skeleton)?;
    info!(
        "Rig initialized: {} vertices, {} bones, {} clips",
        mesh.vertex_count(),
        skeleton.len(),
        clips.len()
    );
    SkinnedEvaluator::new(mesh, skeleton, clips)
}

pub fn shared_assets_from_config(config: &Config) -> SharedAssets {
    SharedAssets {
        mesh: config
            .mesh
            .path
            .clone()
            .unwrap_or_else(|| format!("{}.column", config.bake.name)),
        main_texture: config.bake.main_texture.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::evaluator::PoseEvaluator;

    #[test]
    fn default_config_builds_demo_evaluator() {
        let config = Config::default();
        let eval = init_evaluator(&config).unwrap();
        assert_eq!(eval.vertex_count().unwrap(), 12 * 9);
        let names: Vec<_> = eval.clip_infos().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Sway", "Bow"]);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let config = Config::from_toml_str(
            r#"
            [[bones]]
            name = "child"
            parent = "ghost"
            "#,
        )
        .unwrap();
        assert!(matches!(
            build_skeleton_from_config(&config),
            Err(BakeError::Config(_))
        ));
    }

    #[test]
    fn unknown_track_bone_is_rejected() {
        let config = Config::from_toml_str(
            r#"
            [[bones]]
            name = "root"

            [[clips]]
            name = "Wave"
            duration = 1.0

            [[clips.tracks]]
            bone = "arm"
            "#,
        )
        .unwrap();
        let skeleton = build_skeleton_from_config(&config).unwrap();
        assert!(build_clips_from_config(&config, &skeleton).is_err());
    }
}
