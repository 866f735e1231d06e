//! Provides a Wavefront OBJ importer.
//!
//! Every `g` group becomes its own mesh object, so a multi-part OBJ imports
//! as several objects the way a DCC tool would show it. Polygons are fan
//! triangulated. Companion .mtl files are resolved for diffuse colors.

use std::collections::HashMap;
use std::io::{BufReader, Cursor};
use std::path::Path;

use glam::Vec3;
use obj::raw::material::{parse_mtl, MtlColor};
use obj::raw::object::{Polygon, RawObj};
use obj::raw::parse_obj;

use super::{Importer, LoadError};
use crate::scene::{Face, MeshData, ObjectKind, Scene, SceneObject};

const DEFAULT_COLOR: [f32; 3] = [0.85, 0.85, 0.85];
const DEFAULT_GROUP: &str = "default";

pub struct ObjImporter;

impl Importer for ObjImporter {
    fn name(&self) -> &'static str {
        "Wavefront OBJ"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn import(&self, path: &Path, scene: &mut Scene) -> Result<(), LoadError> {
        let data = std::fs::read(path)?;
        let raw = parse_obj(BufReader::new(Cursor::new(&data[..])))
            .map_err(|e| LoadError::InvalidData(format!("Failed to parse OBJ: {}", e)))?;

        let obj_dir = path.parent().unwrap_or(Path::new("."));
        let colors = load_mtl_colors(&raw.material_libraries, obj_dir);

        for (name, mesh) in build_group_meshes(&raw, &colors) {
            scene.add(SceneObject::new(name, ObjectKind::Mesh(mesh)));
        }
        Ok(())
    }
}

/// Loads diffuse colors from the .mtl files referenced by the OBJ.
///
/// Missing or unreadable libraries are skipped; their materials fall back
/// to the default color.
fn load_mtl_colors(mtl_libs: &[String], obj_dir: &Path) -> HashMap<String, [f32; 3]> {
    let mut colors = HashMap::new();

    for mtl_name in mtl_libs {
        let mtl_path = obj_dir.join(mtl_name);
        let mtl_data = match std::fs::read(&mtl_path) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Skipping material library {}: {}", mtl_path.display(), e);
                continue;
            }
        };

        let raw_mtl = match parse_mtl(BufReader::new(Cursor::new(&mtl_data[..]))) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Skipping material library {}: {}", mtl_path.display(), e);
                continue;
            }
        };

        for (name, mat) in &raw_mtl.materials {
            let color = mat
                .diffuse
                .as_ref()
                .map(mtl_color_to_rgb)
                .unwrap_or(DEFAULT_COLOR);
            colors.insert(name.clone(), color);
        }
    }

    colors
}

fn mtl_color_to_rgb(color: &MtlColor) -> [f32; 3] {
    match color {
        MtlColor::Rgb(r, g, b) => [*r, *g, *b],
        MtlColor::Xyz(x, y, z) => [*x, *y, *z],
        MtlColor::Spectral(_, _) => DEFAULT_COLOR,
    }
}

/// Extracts position index at a given slot from any polygon variant.
fn polygon_pos_at(polygon: &Polygon, i: usize) -> Option<usize> {
    match polygon {
        Polygon::P(indices) => indices.get(i).copied(),
        Polygon::PT(pairs) => pairs.get(i).map(|&(p, _)| p),
        Polygon::PN(pairs) => pairs.get(i).map(|&(p, _)| p),
        Polygon::PTN(triples) => triples.get(i).map(|&(p, _, _)| p),
    }
}

fn polygon_len(polygon: &Polygon) -> usize {
    match polygon {
        Polygon::P(indices) => indices.len(),
        Polygon::PT(pairs) => pairs.len(),
        Polygon::PN(pairs) => pairs.len(),
        Polygon::PTN(triples) => triples.len(),
    }
}

/// Labels each polygon with the name of a group range that contains it.
///
/// Groups are visited in name order so a polygon listed under several
/// groups lands in the same one on every run.
fn label_polygons<'a>(
    groups: &'a HashMap<String, obj::raw::object::Group>,
    polygon_count: usize,
) -> Vec<Option<&'a str>> {
    let mut labels: Vec<Option<&str>> = vec![None; polygon_count];
    let mut names: Vec<&String> = groups.keys().collect();
    names.sort();

    for name in names {
        for range in &groups[name].polygons {
            for i in range.start..range.end.min(polygon_count) {
                if labels[i].is_none() {
                    labels[i] = Some(name.as_str());
                }
            }
        }
    }
    labels
}

/// Splits the OBJ into one mesh per group, in order of first appearance.
fn build_group_meshes(raw: &RawObj, colors: &HashMap<String, [f32; 3]>) -> Vec<(String, MeshData)> {
    let groups = label_polygons(&raw.groups, raw.polygons.len());
    let materials = label_polygons(&raw.meshes, raw.polygons.len());

    // Per group: output mesh plus a global → local vertex index map.
    let mut out: Vec<(String, MeshData, HashMap<usize, u32>)> = Vec::new();
    let mut slot_of: HashMap<&str, usize> = HashMap::new();

    for (poly_idx, polygon) in raw.polygons.iter().enumerate() {
        let n = polygon_len(polygon);
        if n < 3 {
            continue;
        }

        let group = groups[poly_idx].unwrap_or(DEFAULT_GROUP);
        let color = materials[poly_idx]
            .and_then(|m| colors.get(m).copied())
            .unwrap_or(DEFAULT_COLOR);

        let valid = |i: usize| polygon_pos_at(polygon, i).filter(|&p| p < raw.positions.len());
        let Some(p0) = valid(0) else {
            continue;
        };

        let slot = *slot_of.entry(group).or_insert_with(|| {
            out.push((group.to_string(), MeshData::default(), HashMap::new()));
            out.len() - 1
        });
        let (_, mesh, remap) = &mut out[slot];

        let mut local = |p: usize| -> u32 {
            *remap.entry(p).or_insert_with(|| {
                let (x, y, z, _) = raw.positions[p];
                mesh.vertices.push(Vec3::new(x, y, z));
                (mesh.vertices.len() - 1) as u32
            })
        };

        // Fan triangulation
        let mut faces = Vec::with_capacity(n - 2);
        for i in 1..n - 1 {
            let (Some(p1), Some(p2)) = (valid(i), valid(i + 1)) else {
                continue;
            };
            faces.push(Face {
                indices: [local(p0), local(p1), local(p2)],
                color,
            });
        }
        mesh.faces.extend(faces);
    }

    out.into_iter()
        .filter(|(_, mesh, _)| !mesh.is_empty())
        .map(|(name, mesh, _)| (name, mesh))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> RawObj {
        parse_obj(BufReader::new(Cursor::new(src.as_bytes()))).unwrap()
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let raw = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let meshes = build_group_meshes(&raw, &HashMap::new());
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0].1;
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces[0].color, DEFAULT_COLOR);
    }

    #[test]
    fn test_groups_become_separate_meshes() {
        let raw = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 5 0 0\nv 6 0 0\nv 5 1 0\n\
             g left\nf 1 2 3\ng right\nf 4 5 6\n",
        );
        let meshes = build_group_meshes(&raw, &HashMap::new());
        let names: Vec<&str> = meshes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["left", "right"]);
        assert!(meshes.iter().all(|(_, m)| m.faces.len() == 1));
    }

    #[test]
    fn test_material_colors_applied() {
        let raw = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n");
        let mut colors = HashMap::new();
        colors.insert("red".to_string(), [1.0, 0.0, 0.0]);
        let meshes = build_group_meshes(&raw, &colors);
        assert_eq!(meshes[0].1.faces[0].color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vertices_only_yields_no_meshes() {
        let raw = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\n");
        assert!(build_group_meshes(&raw, &HashMap::new()).is_empty());
    }
}
