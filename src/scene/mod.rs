//! Provides the scene graph that import, normalization, framing and rendering share.
//!
//! A [`Scene`] is a flat set of objects keyed by [`ObjectId`]. Each object has
//! a location/rotation/scale transform and a kind (mesh, camera, light or
//! empty). There is no parenting: importers flatten their hierarchies into
//! world transforms, so an object's world matrix is its local matrix.
//!
//! The scene is an owned value. Stages receive `&mut Scene`; nothing about it
//! is global.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbkit::scene::{MeshData, ObjectKind, Scene, SceneObject};
//!
//! let mut scene = Scene::default();
//! let mesh = MeshData::from_triangles(
//!     [[Vec3::ZERO, Vec3::X, Vec3::Y]],
//!     [0.8, 0.8, 0.8],
//! );
//! let id = scene.add(SceneObject::new("tri", ObjectKind::Mesh(mesh)));
//! let bb = scene.world_bounds(id).unwrap();
//! assert_eq!(bb.size(), Vec3::new(1.0, 1.0, 0.0));
//! ```

mod bounds;

pub use bounds::BoundingBox;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glam::{Mat3, Mat4, Quat, Vec3};
use thiserror::Error;

use crate::config::Background;

/// Stable handle to an object. Ids grow monotonically, so ordering by id is creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by scene operations.
#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("object {0} is not in the scene")]
    MissingObject(ObjectId),
    #[error("object {0} is not a mesh")]
    NotAMesh(ObjectId),
    #[error("object {0} is not a camera")]
    NotACamera(ObjectId),
    #[error("object {0} has a degenerate transform")]
    DegenerateTransform(ObjectId),
    #[error("no mesh objects given")]
    NothingToJoin,
}

/// One flat-colored triangle, indexing into [`MeshData::vertices`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [u32; 3],
    pub color: [f32; 3],
}

/// Triangle mesh geometry in object-local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
}

impl MeshData {
    /// Builds a mesh with unshared vertices from a list of triangles.
    pub fn from_triangles<I>(triangles: I, color: [f32; 3]) -> Self
    where
        I: IntoIterator<Item = [Vec3; 3]>,
    {
        let mut mesh = MeshData::default();
        for tri in triangles {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&tri);
            mesh.faces.push(Face {
                indices: [base, base + 1, base + 2],
                color,
            });
        }
        mesh
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Local-space box around all vertices, or `None` for an empty mesh.
    pub fn local_bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().copied())
    }

    /// Transforms every vertex in place.
    pub fn transform(&mut self, matrix: Mat4) {
        for v in &mut self.vertices {
            *v = matrix.transform_point3(*v);
        }
    }

    /// Appends `other`, mapping its vertices through `matrix` first.
    pub fn append_transformed(&mut self, other: &MeshData, matrix: Mat4) {
        let base = self.vertices.len() as u32;
        self.vertices
            .extend(other.vertices.iter().map(|v| matrix.transform_point3(*v)));
        self.faces.extend(other.faces.iter().map(|f| Face {
            indices: f.indices.map(|i| i + base),
            color: f.color,
        }));
    }

    /// Resolves a face to its three vertex positions. Out-of-range indices yield `None`.
    pub fn face_vertices(&self, face: &Face) -> Option<[Vec3; 3]> {
        let [a, b, c] = face.indices;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }
}

/// Orthographic camera settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Visible width (and height, for square targets) in world units.
    pub ortho_scale: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            ortho_scale: 6.0,
            clip_start: 0.1,
            clip_end: 1000.0,
        }
    }
}

/// Directional light. Shines along the object's local -Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    pub energy: f32,
}

impl Default for LightData {
    fn default() -> Self {
        Self { energy: 3.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Mesh(MeshData),
    Camera(CameraData),
    Light(LightData),
    /// Transform-only helper, e.g. a grouping node left by an importer.
    Empty,
}

/// A named object with a location/rotation/scale transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn with_transform(mut self, location: Vec3, rotation: Quat, scale: Vec3) -> Self {
        self.location = location;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.location)
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh(_))
    }

    pub fn mesh(&self) -> Option<&MeshData> {
        match &self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Unit vector along the object's local -Z axis, in world space.
    pub fn forward(&self) -> Vec3 {
        (self.rotation * Vec3::NEG_Z).normalize_or_zero()
    }
}

/// Output image settings, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Edge length of the square image in pixels.
    pub resolution: u32,
    /// Sample budget per pixel; see [`RenderSettings::supersampling`].
    pub samples: u32,
    pub background: Background,
}

impl RenderSettings {
    /// Per-axis supersampling factor derived from the sample budget (1..=4).
    ///
    /// # Examples
    /// ```
    /// use thumbkit::config::Background;
    /// use thumbkit::scene::RenderSettings;
    ///
    /// let settings = RenderSettings { resolution: 64, samples: 64, background: Background::Transparent };
    /// assert_eq!(settings.supersampling(), 4);
    /// ```
    pub fn supersampling(&self) -> u32 {
        ((self.samples as f32).sqrt().floor() as u32).clamp(1, 4)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: 512,
            samples: 64,
            background: Background::Transparent,
        }
    }
}

/// The object graph plus render settings for one run.
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u64,
    active_camera: Option<ObjectId>,
    pub render: RenderSettings,
}

impl Scene {
    pub fn new(render: RenderSettings) -> Self {
        Self {
            render,
            ..Self::default()
        }
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        if self.active_camera == Some(id) {
            self.active_camera = None;
        }
        self.objects.remove(&id)
    }

    /// Removes every object not listed in `keep`. Returns how many were removed.
    pub fn retain_only(&mut self, keep: &[ObjectId]) -> usize {
        let doomed: Vec<ObjectId> = self
            .objects
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    pub fn get(&self, id: ObjectId) -> Result<&SceneObject, SceneError> {
        self.objects.get(&id).ok_or(SceneError::MissingObject(id))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject, SceneError> {
        self.objects.get_mut(&id).ok_or(SceneError::MissingObject(id))
    }

    /// Snapshot of the current ids, used to diff the scene around an import.
    pub fn object_ids(&self) -> BTreeSet<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_active_camera(&mut self, id: ObjectId) -> Result<(), SceneError> {
        match self.get(id)?.kind {
            ObjectKind::Camera(_) => {
                self.active_camera = Some(id);
                Ok(())
            }
            _ => Err(SceneError::NotACamera(id)),
        }
    }

    pub fn active_camera(&self) -> Option<ObjectId> {
        self.active_camera
    }

    pub fn set_ortho_scale(&mut self, id: ObjectId, scale: f32) -> Result<(), SceneError> {
        match &mut self.get_mut(id)?.kind {
            ObjectKind::Camera(cam) => {
                cam.ortho_scale = scale;
                Ok(())
            }
            _ => Err(SceneError::NotACamera(id)),
        }
    }

    pub fn world_matrix(&self, id: ObjectId) -> Result<Mat4, SceneError> {
        Ok(self.get(id)?.matrix())
    }

    /// The eight local-space corners of an object's geometry.
    ///
    /// Objects without geometry report all corners at the local origin.
    pub fn bound_box(&self, id: ObjectId) -> Result<[Vec3; 8], SceneError> {
        let bounds = self
            .get(id)?
            .mesh()
            .and_then(MeshData::local_bounds)
            .unwrap_or(BoundingBox::new(Vec3::ZERO, Vec3::ZERO));
        Ok(bounds.corners())
    }

    /// World-space box built from the local corners and the world matrix.
    pub fn world_bounds(&self, id: ObjectId) -> Result<BoundingBox, SceneError> {
        Ok(BoundingBox::from_corners(
            self.world_matrix(id)?,
            &self.bound_box(id)?,
        ))
    }

    pub fn set_location(&mut self, id: ObjectId, location: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.location = location;
        Ok(())
    }

    pub fn translate(&mut self, id: ObjectId, delta: Vec3) -> Result<(), SceneError> {
        self.get_mut(id)?.location += delta;
        Ok(())
    }

    /// Bakes the rotation and/or scale of a mesh into its vertices.
    ///
    /// The world-space geometry is unchanged; afterwards the baked parts of
    /// the transform are identity. Location is never touched.
    pub fn apply_transform(
        &mut self,
        id: ObjectId,
        rotation: bool,
        scale: bool,
    ) -> Result<(), SceneError> {
        let object = self.get_mut(id)?;
        let (rot, scl) = (object.rotation, object.scale);

        let bake = match (rotation, scale) {
            (false, false) => return Ok(()),
            (true, true) => Mat4::from_quat(rot) * Mat4::from_scale(scl),
            (false, true) => Mat4::from_scale(scl),
            // Keeping scale while baking rotation: v' = S^-1 R S v.
            (true, false) => {
                if scl.abs().min_element() < f32::EPSILON {
                    return Err(SceneError::DegenerateTransform(id));
                }
                Mat4::from_scale(scl.recip()) * Mat4::from_quat(rot) * Mat4::from_scale(scl)
            }
        };

        let ObjectKind::Mesh(mesh) = &mut object.kind else {
            return Err(SceneError::NotAMesh(id));
        };
        mesh.transform(bake);

        if rotation {
            object.rotation = Quat::IDENTITY;
        }
        if scale {
            object.scale = Vec3::ONE;
        }
        Ok(())
    }

    /// Merges `others` into `target` and removes them from the scene.
    ///
    /// Geometry keeps its world placement: the others' vertices are mapped
    /// into the target's local space.
    pub fn join(&mut self, target: ObjectId, others: &[ObjectId]) -> Result<ObjectId, SceneError> {
        let target_world = self.world_matrix(target)?;
        if !self.get(target)?.is_mesh() {
            return Err(SceneError::NotAMesh(target));
        }
        if target_world.determinant().abs() < 1e-12 {
            return Err(SceneError::DegenerateTransform(target));
        }
        let to_target = target_world.inverse();

        for &other in others.iter().filter(|&&o| o != target) {
            if !self.get(other)?.is_mesh() {
                return Err(SceneError::NotAMesh(other));
            }
        }

        for &other in others.iter().filter(|&&o| o != target) {
            let Some(removed) = self.remove(other) else {
                continue;
            };
            let matrix = to_target * removed.matrix();
            if let (ObjectKind::Mesh(src), Ok(dst)) = (&removed.kind, self.get_mut(target)) {
                if let ObjectKind::Mesh(dst_mesh) = &mut dst.kind {
                    dst_mesh.append_transformed(src, matrix);
                }
            }
        }
        Ok(target)
    }

    /// Rotates an object so its -Z axis points at `target` with local +Y toward world +Z.
    pub fn look_at(&mut self, id: ObjectId, target: Vec3) -> Result<(), SceneError> {
        let object = self.get_mut(id)?;
        object.rotation = track_rotation(target - object.location);
        Ok(())
    }
}

/// Rotation taking local -Z onto `direction`, keeping local +Y as close to world +Z as possible.
fn track_rotation(direction: Vec3) -> Quat {
    let forward = direction.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let z_axis = -forward;
    let mut x_axis = Vec3::Z.cross(z_axis);
    if x_axis.length_squared() < 1e-12 {
        // Looking straight up or down; any horizontal right vector works.
        x_axis = Vec3::X;
    }
    let x_axis = x_axis.normalize();
    let y_axis = z_axis.cross(x_axis);
    Quat::from_mat3(&Mat3::from_cols(x_axis, y_axis, z_axis)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube(color: [f32; 3]) -> MeshData {
        let b = BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let c = b.corners();
        // Bounds only need all eight corners referenced.
        MeshData::from_triangles([[c[0], c[1], c[2]], [c[4], c[6], c[7]], [c[3], c[5], c[7]]], color)
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_retain_only_keeps_listed_objects() {
        let mut scene = Scene::default();
        let cam = scene.add(SceneObject::new("Cam", ObjectKind::Camera(CameraData::default())));
        let sun = scene.add(SceneObject::new("Sun", ObjectKind::Light(LightData::default())));
        scene.add(SceneObject::new("a", ObjectKind::Empty));
        scene.add(SceneObject::new("b", ObjectKind::Mesh(unit_cube([1.0; 3]))));

        assert_eq!(scene.retain_only(&[cam, sun]), 2);
        assert_eq!(scene.object_ids(), BTreeSet::from([cam, sun]));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut scene = Scene::default();
        let a = scene.add(SceneObject::new("a", ObjectKind::Empty));
        scene.remove(a);
        let b = scene.add(SceneObject::new("b", ObjectKind::Empty));
        assert!(b > a);
    }

    #[test]
    fn test_apply_transform_preserves_world_bounds() {
        let mut scene = Scene::default();
        let obj = SceneObject::new("m", ObjectKind::Mesh(unit_cube([1.0; 3]))).with_transform(
            Vec3::new(3.0, -2.0, 1.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(2.0, 1.0, 0.5),
        );
        let id = scene.add(obj);
        let before = scene.world_bounds(id).unwrap();

        scene.apply_transform(id, true, true).unwrap();
        let after = scene.world_bounds(id).unwrap();
        let object = scene.get(id).unwrap();

        assert_eq!(object.rotation, Quat::IDENTITY);
        assert_eq!(object.scale, Vec3::ONE);
        assert_eq!(object.location, Vec3::new(3.0, -2.0, 1.0));
        assert!(approx(before.min, after.min));
        assert!(approx(before.max, after.max));
    }

    #[test]
    fn test_apply_transform_rejects_non_mesh() {
        let mut scene = Scene::default();
        let id = scene.add(SceneObject::new("e", ObjectKind::Empty));
        assert_eq!(
            scene.apply_transform(id, true, true),
            Err(SceneError::NotAMesh(id))
        );
    }

    #[test]
    fn test_join_keeps_world_placement() {
        let mut scene = Scene::default();
        let a = scene.add(
            SceneObject::new("a", ObjectKind::Mesh(unit_cube([1.0, 0.0, 0.0])))
                .with_transform(Vec3::new(-2.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0)),
        );
        let b = scene.add(
            SceneObject::new("b", ObjectKind::Mesh(unit_cube([0.0, 1.0, 0.0])))
                .with_transform(Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE),
        );

        let joined = scene.join(a, &[a, b]).unwrap();
        assert_eq!(joined, a);
        assert!(scene.get(b).is_err());

        let bb = scene.world_bounds(a).unwrap();
        assert!(approx(bb.min, Vec3::new(-3.0, -1.0, -1.0)));
        assert!(approx(bb.max, Vec3::new(4.5, 1.0, 1.0)));
        assert_eq!(scene.get(a).unwrap().mesh().unwrap().faces.len(), 6);
    }

    #[test]
    fn test_look_at_points_forward_axis_at_target() {
        let mut scene = Scene::default();
        let id = scene.add(
            SceneObject::new("Cam", ObjectKind::Camera(CameraData::default()))
                .with_transform(Vec3::new(4.0, -3.0, 5.0), Quat::IDENTITY, Vec3::ONE),
        );
        scene.look_at(id, Vec3::ZERO).unwrap();

        let obj = scene.get(id).unwrap();
        let expected = (Vec3::ZERO - obj.location).normalize();
        assert!(approx(obj.forward(), expected));
        // Local up stays in the vertical plane through the view direction.
        let up = obj.rotation * Vec3::Y;
        assert!(up.z > 0.0);
        assert!(up.dot(obj.rotation * Vec3::X).abs() < 1e-5);
    }

    #[test]
    fn test_look_at_straight_down() {
        let mut scene = Scene::default();
        let id = scene.add(
            SceneObject::new("Cam", ObjectKind::Camera(CameraData::default()))
                .with_transform(Vec3::new(0.0, 0.0, 10.0), Quat::IDENTITY, Vec3::ONE),
        );
        scene.look_at(id, Vec3::ZERO).unwrap();
        assert!(approx(scene.get(id).unwrap().forward(), Vec3::NEG_Z));
    }

    #[test]
    fn test_active_camera_must_be_camera() {
        let mut scene = Scene::default();
        let e = scene.add(SceneObject::new("e", ObjectKind::Empty));
        assert_eq!(scene.set_active_camera(e), Err(SceneError::NotACamera(e)));
    }
}
