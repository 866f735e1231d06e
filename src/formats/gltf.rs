//! Provides a glTF/GLB importer.
//!
//! Supports both binary GLB and JSON glTF with embedded or external buffers.
//! Every node of the default scene becomes one object carrying its
//! flattened world transform: nodes with triangle meshes become meshes,
//! nodes with cameras become camera helpers, everything else an empty.

use std::path::Path;

use glam::{Mat4, Vec3};

use super::{Importer, LoadError};
use crate::scene::{CameraData, Face, MeshData, ObjectKind, Scene, SceneObject};

/// The glTF format importer.
///
/// # Examples
/// ```
/// use thumbkit::formats::{gltf::GltfImporter, Importer};
///
/// assert!(GltfImporter.extensions().contains(&"glb"));
/// ```
pub struct GltfImporter;

impl Importer for GltfImporter {
    fn name(&self) -> &'static str {
        "glTF"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gltf", "glb"]
    }

    fn import(&self, path: &Path, scene: &mut Scene) -> Result<(), LoadError> {
        let (document, buffers, _images) = gltf::import(path)
            .map_err(|e| LoadError::InvalidData(format!("Failed to import glTF: {}", e)))?;

        let Some(root) = document.default_scene().or_else(|| document.scenes().next()) else {
            return Ok(());
        };

        for node in root.nodes() {
            add_node(&node, &buffers, Mat4::IDENTITY, scene);
        }
        Ok(())
    }
}

/// Recursively adds a node and its children with accumulated world transforms.
fn add_node(node: &gltf::Node, buffers: &[gltf::buffer::Data], parent: Mat4, scene: &mut Scene) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node{}", node.index()));

    let kind = if let Some(mesh) = node.mesh() {
        let data = read_mesh(&mesh, buffers);
        if data.is_empty() {
            ObjectKind::Empty
        } else {
            ObjectKind::Mesh(data)
        }
    } else if node.camera().is_some() {
        ObjectKind::Camera(CameraData::default())
    } else {
        ObjectKind::Empty
    };

    let (scale, rotation, location) = world.to_scale_rotation_translation();
    scene.add(SceneObject::new(name, kind).with_transform(location, rotation, scale));

    for child in node.children() {
        add_node(&child, buffers, world, scene);
    }
}

/// Reads all triangle primitives of a mesh into node-local geometry.
fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> MeshData {
    let mut out = MeshData::default();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &*d.0));

        let positions: Vec<[f32; 3]> = match reader.read_positions() {
            Some(iter) => iter.collect(),
            None => continue,
        };

        let base_factor = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_factor();
        let material_color = [base_factor[0], base_factor[1], base_factor[2]];

        let vertex_colors: Option<Vec<[f32; 4]>> = reader
            .read_colors(0)
            .map(|iter| iter.into_rgba_f32().collect());

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let base = out.vertices.len() as u32;
        out.vertices
            .extend(positions.iter().map(|p| Vec3::from_array(*p)));

        for tri in indices.chunks_exact(3) {
            if tri.iter().any(|&i| i as usize >= positions.len()) {
                continue;
            }

            let color = match &vertex_colors {
                Some(vc) => {
                    let avg = |c: usize| {
                        tri.iter()
                            .map(|&i| vc.get(i as usize).map(|v| v[c]).unwrap_or(1.0))
                            .sum::<f32>()
                            / 3.0
                    };
                    [
                        avg(0) * material_color[0],
                        avg(1) * material_color[1],
                        avg(2) * material_color[2],
                    ]
                }
                None => material_color,
            };

            out.faces.push(Face {
                indices: [base + tri[0], base + tri[1], base + tri[2]],
                color,
            });
        }
    }

    out
}
