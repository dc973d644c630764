use crate::core::error::{BakeError, Result};
use crate::core::math::interpolation::{bracket_keys, lerp, slerp};
use crate::core::math::transform::{TransformFactory, transform_direction, transform_point};
use crate::scene::clip::ClipInfo;
use crate::scene::evaluator::PoseEvaluator;
use crate::scene::mesh::Mesh;
use log::{debug, trace};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use rayon::prelude::*;

/// A joint of the bind-pose hierarchy.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone. Parents always precede their children.
    pub parent: Option<usize>,
    /// Joint position in model space at bind time.
    pub head: Point3<f32>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Result<Self> {
        if bones.is_empty() {
            return Err(BakeError::EvaluatorUnavailable(
                "skeleton has no bones".to_string(),
            ));
        }
        for (i, bone) in bones.iter().enumerate() {
            if let Some(p) = bone.parent
                && p >= i
            {
                return Err(BakeError::Config(format!(
                    "bone '{}' must come after its parent (index {})",
                    bone.name, p
                )));
            }
        }
        Ok(Self { bones })
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Offset of a bone's head from its parent's head.
    fn local_offset(&self, index: usize) -> Vector3<f32> {
        let bone = &self.bones[index];
        match bone.parent {
            Some(p) => bone.head - self.bones[p].head,
            None => bone.head.coords,
        }
    }

    /// The segment a bone influences: head to first child's head.
    fn segment(&self, index: usize) -> (Point3<f32>, Point3<f32>) {
        let head = self.bones[index].head;
        let tail = self
            .bones
            .iter()
            .find(|b| b.parent == Some(index))
            .map(|b| b.head)
            .unwrap_or(head);
        (head, tail)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Keyframe {
    /// Seconds from the start of the clip.
    pub time: f32,
    pub rotation: UnitQuaternion<f32>,
    pub translation: Vector3<f32>,
}

/// Keyframes for one bone, sorted by time.
#[derive(Debug, Clone)]
pub struct BoneTrack {
    pub bone: usize,
    keys: Vec<Keyframe>,
    /// Key times, parallel to `keys`.
    times: Vec<f32>,
}

impl BoneTrack {
    pub fn new(bone: usize, mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        let times = keys.iter().map(|k| k.time).collect();
        Self { bone, keys, times }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Rotation and translation at `time` seconds.
    pub fn sample(&self, time: f32) -> (UnitQuaternion<f32>, Vector3<f32>) {
        match bracket_keys(&self.times, time) {
            Some((a, b, t)) => {
                let ka = &self.keys[a];
                let kb = &self.keys[b];
                (
                    slerp(&ka.rotation, &kb.rotation, t),
                    lerp(&ka.translation, &kb.translation, t),
                )
            }
            None => (UnitQuaternion::identity(), Vector3::zeros()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub info: ClipInfo,
    pub tracks: Vec<BoneTrack>,
}

/// Up to two bone influences per vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub bones: [usize; 2],
    pub weights: [f32; 2],
}

fn distance_to_segment(p: &Point3<f32>, a: &Point3<f32>, b: &Point3<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-12 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Binds every vertex to its two nearest bone segments, weighted by
/// inverse distance.
pub fn bind_by_proximity(mesh: &Mesh, skeleton: &Skeleton) -> Vec<VertexWeight> {
    let segments: Vec<_> = (0..skeleton.len()).map(|i| skeleton.segment(i)).collect();

    mesh.vertices
        .par_iter()
        .map(|v| {
            let mut nearest = [(0usize, f32::INFINITY); 2];
            for (i, (a, b)) in segments.iter().enumerate() {
                let d = distance_to_segment(&v.position, a, b);
                if d < nearest[0].1 {
                    nearest[1] = nearest[0];
                    nearest[0] = (i, d);
                } else if d < nearest[1].1 {
                    nearest[1] = (i, d);
                }
            }

            let (b0, d0) = nearest[0];
            let (b1, d1) = nearest[1];
            if !d1.is_finite() {
                return VertexWeight {
                    bones: [b0, b0],
                    weights: [1.0, 0.0],
                };
            }
            let sum = d0 + d1;
            let w0 = if sum > 1e-6 { d1 / sum } else { 1.0 };
            VertexWeight {
                bones: [b0, b1],
                weights: [w0, 1.0 - w0],
            }
        })
        .collect()
}

/// Linear-blend skinning evaluator over a keyframed skeleton.
pub struct SkinnedEvaluator {
    mesh: Mesh,
    skeleton: Skeleton,
    clips: Vec<AnimationClip>,
    weights: Vec<VertexWeight>,
    /// Clip index and time in seconds awaiting `commit`.
    pending: Option<(usize, f32)>,
    positions: Vec<Vector3<f32>>,
    normals: Vec<Vector3<f32>>,
}

impl SkinnedEvaluator {
    pub fn new(mesh: Mesh, skeleton: Skeleton, clips: Vec<AnimationClip>) -> Result<Self> {
        for clip in &clips {
            if let Some(track) = clip.tracks.iter().find(|t| t.bone >= skeleton.len()) {
                return Err(BakeError::Config(format!(
                    "clip '{}' animates missing bone index {}",
                    clip.info.name, track.bone
                )));
            }
        }

        let weights = bind_by_proximity(&mesh, &skeleton);
        let positions = mesh.vertices.iter().map(|v| v.position.coords).collect();
        let normals = mesh.vertices.iter().map(|v| v.normal).collect();

        debug!(
            "Skinned evaluator: {} vertices, {} bones, {} clips",
            mesh.vertex_count(),
            skeleton.len(),
            clips.len()
        );

        Ok(Self {
            mesh,
            skeleton,
            clips,
            weights,
            pending: None,
            positions,
            normals,
        })
    }

    pub fn clip_infos(&self) -> Vec<ClipInfo> {
        self.clips.iter().map(|c| c.info.clone()).collect()
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Matrices taking bind-pose model space to posed model space.
    fn skinning_matrices(&self, clip: &AnimationClip, time: f32) -> Vec<Matrix4<f32>> {
        let bones = self.skeleton.bones();
        let mut world: Vec<Matrix4<f32>> = Vec::with_capacity(bones.len());

        for (i, bone) in bones.iter().enumerate() {
            let (rotation, translation) = clip
                .tracks
                .iter()
                .find(|t| t.bone == i)
                .map(|t| t.sample(time))
                .unwrap_or((UnitQuaternion::identity(), Vector3::zeros()));

            let local = TransformFactory::translation_rotation(
                &(self.skeleton.local_offset(i) + translation),
                &rotation,
            );
            let global = match bone.parent {
                Some(p) => world[p] * local,
                None => local,
            };
            world.push(global);
        }

        world
            .iter()
            .zip(bones)
            .map(|(w, b)| w * TransformFactory::translation(&-b.head.coords))
            .collect()
    }

    fn evaluate(&mut self, clip_index: usize, time: f32) {
        let matrices = self.skinning_matrices(&self.clips[clip_index], time);
        let vertices = &self.mesh.vertices;
        let weights = &self.weights;

        self.positions
            .par_iter_mut()
            .zip(self.normals.par_iter_mut())
            .zip(vertices.par_iter())
            .zip(weights.par_iter())
            .for_each(|(((pos_out, norm_out), vertex), weight)| {
                let mut pos = Vector3::zeros();
                let mut norm = Vector3::zeros();
                for k in 0..2 {
                    let w = weight.weights[k];
                    if w == 0.0 {
                        continue;
                    }
                    let m = &matrices[weight.bones[k]];
                    pos += transform_point(m, &vertex.position).coords * w;
                    norm += transform_direction(m, &vertex.normal) * w;
                }
                *pos_out = pos;
                *norm_out = norm.try_normalize(1e-12).unwrap_or(vertex.normal);
            });
    }
}

impl PoseEvaluator for SkinnedEvaluator {
    fn vertex_count(&self) -> Result<usize> {
        match self.mesh.vertex_count() {
            0 => Err(BakeError::EvaluatorUnavailable(
                "mesh has no vertices".to_string(),
            )),
            n => Ok(n),
        }
    }

    fn request_time(&mut self, clip: &ClipInfo, normalized_time: f32) -> Result<()> {
        let index = self
            .clips
            .iter()
            .position(|c| c.info.name == clip.name)
            .ok_or_else(|| BakeError::ClipNotFound(clip.name.clone()))?;

        let t = normalized_time.clamp(0.0, 1.0);
        self.pending = Some((index, t * self.clips[index].info.duration));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.mesh.vertices.is_empty() {
            return Err(BakeError::EvaluatorUnavailable(
                "mesh has no vertices".to_string(),
            ));
        }
        if let Some((index, time)) = self.pending.take() {
            trace!("Evaluating clip '{}' at {:.4}s", self.clips[index].info.name, time);
            self.evaluate(index, time);
        }
        Ok(())
    }

    fn evaluated_positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    fn evaluated_normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bone_skeleton() -> Skeleton {
        Skeleton::new(vec![
            Bone {
                name: "root".into(),
                parent: None,
                head: Point3::new(0.0, 0.0, 0.0),
            },
            Bone {
                name: "tip".into(),
                parent: Some(0),
                head: Point3::new(0.0, 1.0, 0.0),
            },
        ])
        .unwrap()
    }

    fn bend_clip() -> AnimationClip {
        AnimationClip {
            info: ClipInfo::new("bend", 1.0, false),
            tracks: vec![BoneTrack::new(
                0,
                vec![
                    Keyframe {
                        time: 0.0,
                        rotation: UnitQuaternion::identity(),
                        translation: Vector3::zeros(),
                    },
                    Keyframe {
                        time: 1.0,
                        rotation: TransformFactory::rotation_euler_deg(&[0.0, 0.0, 90.0]),
                        translation: Vector3::zeros(),
                    },
                ],
            )],
        }
    }

    #[test]
    fn skeleton_rejects_child_before_parent() {
        let result = Skeleton::new(vec![Bone {
            name: "a".into(),
            parent: Some(0),
            head: Point3::origin(),
        }]);
        assert!(matches!(result, Err(BakeError::Config(_))));
        assert!(Skeleton::new(vec![]).is_err());
    }

    #[test]
    fn proximity_weights_sum_to_one() {
        let mesh = Mesh::create_test_column(0.2, 2.0, 6, 5);
        let weights = bind_by_proximity(&mesh, &two_bone_skeleton());
        assert_eq!(weights.len(), mesh.vertex_count());
        for w in weights {
            assert!((w.weights[0] + w.weights[1] - 1.0).abs() < 1e-5);
            assert!(w.weights[0] >= w.weights[1]);
        }
    }

    #[test]
    fn reads_before_commit_return_previous_pose() {
        let mesh = Mesh::create_test_column(0.2, 2.0, 6, 5);
        let bind: Vec<_> = mesh.vertices.iter().map(|v| v.position.coords).collect();
        let mut eval = SkinnedEvaluator::new(mesh, two_bone_skeleton(), vec![bend_clip()]).unwrap();
        let clip = ClipInfo::new("bend", 1.0, false);

        eval.request_time(&clip, 1.0).unwrap();
        assert_eq!(eval.evaluated_positions(), bind.as_slice());

        eval.commit().unwrap();
        assert_ne!(eval.evaluated_positions(), bind.as_slice());
    }

    #[test]
    fn rest_pose_is_identity() {
        let mesh = Mesh::create_test_column(0.2, 2.0, 6, 5);
        let bind: Vec<_> = mesh.vertices.iter().map(|v| v.position.coords).collect();
        let mut eval = SkinnedEvaluator::new(mesh, two_bone_skeleton(), vec![bend_clip()]).unwrap();
        eval.request_time(&ClipInfo::new("bend", 1.0, false), 0.0)
            .unwrap();
        eval.commit().unwrap();
        for (a, b) in eval.evaluated_positions().iter().zip(&bind) {
            assert!((a - b).norm() < 1e-5);
        }
    }

    #[test]
    fn full_bend_rotates_root_bound_vertex() {
        // A single-bone rig binds everything rigidly to the root.
        let skeleton = Skeleton::new(vec![Bone {
            name: "root".into(),
            parent: None,
            head: Point3::origin(),
        }])
        .unwrap();
        let mesh = Mesh::create_test_column(0.5, 1.0, 4, 2);
        let mut eval = SkinnedEvaluator::new(mesh, skeleton, vec![bend_clip()]).unwrap();
        eval.request_time(&ClipInfo::new("bend", 1.0, false), 1.0)
            .unwrap();
        eval.commit().unwrap();

        // Vertex 0 sits at (0.5, 0, 0); a quarter turn about Z puts it at (0, 0.5, 0).
        let p = eval.evaluated_positions()[0];
        assert!((p - Vector3::new(0.0, 0.5, 0.0)).norm() < 1e-5);
        let n = eval.evaluated_normals()[0];
        assert!((n - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn track_sorts_keys_and_samples_between_them() {
        let key = |time: f32, x: f32| Keyframe {
            time,
            rotation: UnitQuaternion::identity(),
            translation: Vector3::new(x, 0.0, 0.0),
        };
        let track = BoneTrack::new(0, vec![key(1.0, 2.0), key(0.0, 0.0), key(2.0, 4.0)]);
        let times: Vec<f32> = track.keys().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);

        assert_eq!(track.sample(0.5).1, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(track.sample(1.5).1, Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(track.sample(-1.0).1, Vector3::zeros());
        assert_eq!(track.sample(9.0).1, Vector3::new(4.0, 0.0, 0.0));

        let empty = BoneTrack::new(0, Vec::new());
        assert_eq!(empty.sample(0.3).1, Vector3::zeros());
    }

    #[test]
    fn unknown_clip_is_reported() {
        let mesh = Mesh::create_test_column(0.2, 1.0, 4, 2);
        let mut eval = SkinnedEvaluator::new(mesh, two_bone_skeleton(), vec![]).unwrap();
        let err = eval
            .request_time(&ClipInfo::new("missing", 1.0, false), 0.0)
            .unwrap_err();
        assert!(matches!(err, BakeError::ClipNotFound(name) if name == "missing"));
    }
}
