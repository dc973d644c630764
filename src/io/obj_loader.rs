use crate::core::error::{BakeError, Result};
use crate::core::geometry::Vertex;
use crate::scene::mesh::Mesh;
use log::{info, warn};
use nalgebra::{Point3, Vector3};
use std::path::Path;

/// Loads an OBJ file and returns a unified Mesh.
///
/// All sub-models are merged in file order, so vertex indices are stable
/// across runs. Missing normals are rebuilt from face connectivity.
pub fn load_obj(path: &str) -> Result<Mesh> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return Err(BakeError::EvaluatorUnavailable(format!(
            "mesh file not found: {}",
            path
        )));
    }

    info!("Loading OBJ file: {}", path);

    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true, // Important: Unifies indices for Position/Normal
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path_obj, &load_options)
        .map_err(|e| BakeError::EvaluatorUnavailable(format!("failed to load OBJ: {}", e)))?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut index_offset = 0;
    let mut missing_normals = false;

    for model in models {
        let mesh = &model.mesh;
        let num_vertices = mesh.positions.len() / 3;
        let has_normals = mesh.normals.len() == mesh.positions.len();

        if !has_normals {
            warn!(
                "Mesh '{}' is missing normals. Rebuilding smooth normals.",
                model.name
            );
            missing_normals = true;
        }

        for i in 0..num_vertices {
            let position = Point3::new(
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            );
            let normal = if has_normals {
                Vector3::new(
                    mesh.normals[i * 3],
                    mesh.normals[i * 3 + 1],
                    mesh.normals[i * 3 + 2],
                )
            } else {
                Vector3::zeros()
            };
            vertices.push(Vertex::new(position, normal));
        }

        // Offset indices by the vertices already merged from earlier models.
        for index in &mesh.indices {
            indices.push(index + index_offset);
        }

        index_offset += num_vertices as u32;
    }

    if missing_normals {
        compute_smooth_normals(&mut vertices, &indices);
    }

    info!(
        "OBJ loaded successfully. Total vertices: {}, Total indices: {}",
        vertices.len(),
        indices.len()
    );

    Ok(Mesh::new(vertices, indices))
}

/// Area-weighted vertex normals for vertices whose normal is zero.
pub fn compute_smooth_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vector3::zeros(); vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let e1 = vertices[b].position - vertices[a].position;
        let e2 = vertices[c].position - vertices[a].position;
        // Un-normalized cross product weights by triangle area.
        let face = e1.cross(&e2);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    for (vertex, sum) in vertices.iter_mut().zip(accum) {
        if vertex.normal.norm_squared() == 0.0 {
            vertex.normal = sum.try_normalize(1e-12).unwrap_or(Vector3::y());
        }
    }
}
