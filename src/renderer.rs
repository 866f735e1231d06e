//! Provides a software rasterizer that renders a [`Scene`] to a PNG.
//!
//! Rendering goes through the scene's active orthographic camera, shades
//! each triangle flat against the first directional light, resolves the
//! supersampled buffer down to the target resolution and encodes RGBA.
//!
//! No GPU is required; it runs entirely on the CPU and is deterministic,
//! so rendering the same scene twice produces identical bytes.

use std::path::Path;

use glam::{Mat4, Vec3};
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use crate::scene::{ObjectKind, Scene};

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene has no active camera")]
    NoCamera,
    #[error("cannot build a pixel buffer for {0}x{0}")]
    BufferSize(u32),
    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders the scene and writes it to `path` as PNG, replacing any existing file.
///
/// # Errors
/// Returns an error if the scene has no camera or the file cannot be written.
pub fn render_to_file(scene: &Scene, path: &Path) -> Result<(), RenderError> {
    let image = render(scene)?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Renders the scene into an RGBA image of `resolution × resolution` pixels.
///
/// # Errors
/// Returns [`RenderError::NoCamera`] if no active camera is set.
pub fn render(scene: &Scene) -> Result<RgbaImage, RenderError> {
    let settings = scene.render;
    let camera_id = scene.active_camera().ok_or(RenderError::NoCamera)?;
    let camera_obj = scene.get(camera_id).map_err(|_| RenderError::NoCamera)?;
    let ObjectKind::Camera(camera) = camera_obj.kind else {
        return Err(RenderError::NoCamera);
    };

    // ---- Camera ----
    let view = camera_obj.matrix().inverse();
    let half = camera.ortho_scale.max(1e-6) * 0.5;
    let proj = Mat4::orthographic_rh(-half, half, -half, half, camera.clip_start, camera.clip_end);
    let view_proj = proj * view;

    // ---- Lighting ----
    let (light_dir, light_strength) = scene
        .objects()
        .find_map(|(_, obj)| match obj.kind {
            ObjectKind::Light(light) => Some((-obj.forward(), (light.energy / 3.0).min(1.0))),
            _ => None,
        })
        .unwrap_or((-camera_obj.forward(), 1.0));

    // ---- Framebuffer ----
    let ss = settings.supersampling();
    let size = settings
        .resolution
        .checked_mul(ss)
        .ok_or(RenderError::BufferSize(settings.resolution))?;
    let w = size as usize;
    let h = size as usize;
    let clear = settings.background.fill().unwrap_or([0.0; 4]);
    let mut color_buf = vec![clear; w * h];
    let mut depth_buf = vec![f32::INFINITY; w * h];

    // ---- Rasterize each triangle ----
    for (_, obj) in scene.objects() {
        let Some(mesh) = obj.mesh() else {
            continue;
        };
        let world = obj.matrix();
        let mvp = view_proj * world;

        for face in &mesh.faces {
            let Some(local) = mesh.face_vertices(face) else {
                continue;
            };

            let mut screen = [Vec3::ZERO; 3];
            for i in 0..3 {
                let ndc = mvp.project_point3(local[i]);
                screen[i] = Vec3::new(
                    (ndc.x * 0.5 + 0.5) * size as f32,
                    (0.5 - ndc.y * 0.5) * size as f32,
                    ndc.z,
                );
            }

            // Face normal in world space (flat shading)
            let v: [Vec3; 3] = local.map(|p| world.transform_point3(p));
            let normal = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();
            let ndl = normal.dot(light_dir).abs();

            let ambient = 0.15;
            let diffuse = ndl * 0.70 * light_strength;
            let specular = ndl.powf(32.0) * 0.10 * light_strength;
            let shade = (ambient + diffuse + specular).min(1.0);
            let shaded = face.color.map(|c| (c * shade).min(1.0));

            // Screen-space bounding box
            let min_x = screen[0].x.min(screen[1].x).min(screen[2].x).max(0.0) as usize;
            let max_x = (screen[0].x.max(screen[1].x).max(screen[2].x).ceil().max(0.0) as usize).min(w);
            let min_y = screen[0].y.min(screen[1].y).min(screen[2].y).max(0.0) as usize;
            let max_y = (screen[0].y.max(screen[1].y).max(screen[2].y).ceil().max(0.0) as usize).min(h);

            for y in min_y..max_y {
                for x in min_x..max_x {
                    let px = x as f32 + 0.5;
                    let py = y as f32 + 0.5;

                    let (u, v, t) = barycentric(screen, px, py);
                    if u < 0.0 || v < 0.0 || t < 0.0 {
                        continue;
                    }

                    let z = u * screen[0].z + v * screen[1].z + t * screen[2].z;
                    // Outside the clip range
                    if !(0.0..=1.0).contains(&z) {
                        continue;
                    }

                    let idx = y * w + x;
                    if z < depth_buf[idx] {
                        depth_buf[idx] = z;
                        color_buf[idx] = [shaded[0], shaded[1], shaded[2], 1.0];
                    }
                }
            }
        }
    }

    let pixels = resolve(&color_buf, w, ss as usize, settings.resolution as usize);
    ImageBuffer::<Rgba<u8>, _>::from_raw(settings.resolution, settings.resolution, pixels)
        .ok_or(RenderError::BufferSize(settings.resolution))
}

/// Box-filters `ss × ss` blocks of the supersampled buffer down to `out × out` RGBA8.
///
/// Color is alpha-weighted so transparent samples don't darken edges.
fn resolve(buf: &[[f32; 4]], stride: usize, ss: usize, out: usize) -> Vec<u8> {
    let mut pixels = vec![0u8; out * out * 4];
    let n = (ss * ss) as f32;

    for oy in 0..out {
        for ox in 0..out {
            let mut rgb = [0.0_f32; 3];
            let mut alpha = 0.0_f32;
            for sy in 0..ss {
                for sx in 0..ss {
                    let s = buf[(oy * ss + sy) * stride + ox * ss + sx];
                    for c in 0..3 {
                        rgb[c] += s[c] * s[3];
                    }
                    alpha += s[3];
                }
            }

            let i = (oy * out + ox) * 4;
            if alpha > 0.0 {
                for c in 0..3 {
                    pixels[i + c] = to_u8(rgb[c] / alpha);
                }
            }
            pixels[i + 3] = to_u8(alpha / n);
        }
    }
    pixels
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

// ===========================================================================
// Rasterization helpers
// ===========================================================================

fn barycentric(tri: [Vec3; 3], px: f32, py: f32) -> (f32, f32, f32) {
    let v0x = tri[1].x - tri[0].x;
    let v0y = tri[1].y - tri[0].y;
    let v1x = tri[2].x - tri[0].x;
    let v1y = tri[2].y - tri[0].y;
    let v2x = px - tri[0].x;
    let v2y = py - tri[0].y;

    let d00 = v0x * v0x + v0y * v0y;
    let d01 = v0x * v1x + v0y * v1y;
    let d11 = v1x * v1x + v1y * v1y;
    let d20 = v2x * v0x + v2y * v0y;
    let d21 = v2x * v1x + v2y * v1y;

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-10 {
        return (-1.0, -1.0, -1.0);
    }

    let inv = 1.0 / denom;
    let v = (d11 * d20 - d01 * d21) * inv;
    let w = (d00 * d21 - d01 * d20) * inv;
    let u = 1.0 - v - w;

    (u, v, w)
}
