//! Camera and light placement for a normalized model.
//!
//! The camera sits on a sphere around the origin at the configured
//! elevation/azimuth. Its orthographic width follows the model's horizontal
//! footprint only; height does not influence the framing.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbkit::config::CameraAngle;
//! use thumbkit::framing::compute_framing;
//!
//! let framing = compute_framing(Vec3::new(2.0, 1.0, 5.0), &CameraAngle::new(90.0, 0.0), 1.5, 0.0);
//! assert_eq!(framing.ortho_scale, 3.0);
//! assert!((framing.camera_location - Vec3::new(0.0, 0.0, framing.distance)).length() < 1e-4);
//! ```

use glam::Vec3;

use crate::config::CameraAngle;
use crate::scene::{ObjectId, Scene, SceneError};

/// Light position relative to the camera.
pub const LIGHT_OFFSET: Vec3 = Vec3::new(2.0, -1.0, 3.0);

/// Camera distance never drops below this many units times [`DISTANCE_FACTOR`].
pub const MIN_EXTENT: f32 = 1.0;
pub const DISTANCE_FACTOR: f32 = 2.0;

/// Derived camera/light placement for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub ortho_scale: f32,
    /// Radius of the camera sphere, before the horizontal offset.
    pub distance: f32,
    pub camera_location: Vec3,
    pub light_location: Vec3,
}

/// Computes the framing for a model whose bounding box has extent `size`.
///
/// `horizontal_offset` shifts the camera along world X after it has been
/// placed on the sphere; pass 0.0 for a camera centered on the sphere.
pub fn compute_framing(
    size: Vec3,
    angle: &CameraAngle,
    margin: f32,
    horizontal_offset: f32,
) -> Framing {
    let ortho_scale = size.x.max(size.y) * margin;
    let distance = size.length().max(MIN_EXTENT) * DISTANCE_FACTOR;

    let (elev, azim) = angle.radians();
    let on_sphere = Vec3::new(
        distance * elev.cos() * azim.cos(),
        -distance * elev.cos() * azim.sin(),
        distance * elev.sin(),
    );
    let camera_location = on_sphere + Vec3::new(horizontal_offset, 0.0, 0.0);

    Framing {
        ortho_scale,
        distance,
        camera_location,
        light_location: camera_location + LIGHT_OFFSET,
    }
}

/// Moves the camera and light into place and aims both at the origin.
pub fn apply_framing(
    scene: &mut Scene,
    camera: ObjectId,
    light: ObjectId,
    framing: &Framing,
) -> Result<(), SceneError> {
    scene.set_ortho_scale(camera, framing.ortho_scale)?;

    scene.set_location(camera, framing.camera_location)?;
    scene.look_at(camera, Vec3::ZERO)?;

    scene.set_location(light, framing.light_location)?;
    scene.look_at(light, Vec3::ZERO)?;

    log::debug!(
        "framing: ortho_scale={:.4} distance={:.4} camera={:?} light={:?}",
        framing.ortho_scale,
        framing.distance,
        framing.camera_location,
        framing.light_location
    );
    Ok(())
}
