//! Provides the importer table and the model loader.
//!
//! Each supported file format has an [`Importer`] that adds the objects it
//! decodes to a [`Scene`]. The [`ImporterRegistry`] maps file extensions to
//! importers; [`load_model`] dispatches through it and isolates the objects a
//! single import introduced by diffing the scene before and after.
//!
//! # Examples
//! ```
//! use thumbkit::formats::ImporterRegistry;
//!
//! let registry = ImporterRegistry::default();
//! assert!(registry.find("OBJ").is_some());
//! assert!(registry.find("fbx").is_none());
//! ```

pub mod gltf;
pub mod obj;

use std::path::Path;

use thiserror::Error;

use crate::scene::{ObjectId, Scene};

/// Errors that can occur while loading a model file.
///
/// # Examples
/// ```
/// use thumbkit::formats::LoadError;
///
/// let err = LoadError::UnsupportedFormat("fbx".to_string());
/// assert_eq!(format!("{}", err), "Unsupported format: .fbx");
/// ```
#[derive(Debug, Error)]
pub enum LoadError {
    /// No importer is registered for the file extension.
    #[error("Unsupported format: .{0}")]
    UnsupportedFormat(String),
    /// The importer could not decode the file.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A format-specific importer.
///
/// Importers add every object they decode to the scene, including helpers
/// such as cameras or empties. The loader works out afterwards which of them
/// are meshes.
pub trait Importer: Send + Sync {
    /// Returns the human-readable name for this format.
    fn name(&self) -> &'static str;

    /// Returns the file extensions this importer handles (lowercase, without dot).
    fn extensions(&self) -> &'static [&'static str];

    /// Imports the file at `path` into `scene`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded. Objects added
    /// before the failure stay in the scene until the next cleanup.
    fn import(&self, path: &Path, scene: &mut Scene) -> Result<(), LoadError>;
}

/// Extension → importer table.
pub struct ImporterRegistry {
    importers: Vec<Box<dyn Importer>>,
}

impl ImporterRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            importers: Vec::new(),
        }
    }

    /// Adds an importer. Later registrations win for shared extensions.
    pub fn register(&mut self, importer: Box<dyn Importer>) -> &mut Self {
        self.importers.insert(0, importer);
        self
    }

    /// Finds the importer for an extension (case-insensitive, dot optional).
    pub fn find(&self, extension: &str) -> Option<&dyn Importer> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.importers
            .iter()
            .find(|importer| importer.extensions().contains(&ext.as_str()))
            .map(|importer| &**importer)
    }

    /// All extensions some importer handles, sorted.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .importers
            .iter()
            .flat_map(|importer| importer.extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Box::new(gltf::GltfImporter))
            .register(Box::new(obj::ObjImporter));
        registry
    }
}

/// The objects one import introduced, split into meshes and everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInstance {
    /// Mesh objects in creation order.
    pub meshes: Vec<ObjectId>,
    /// Cameras, lights and empties the importer left behind.
    pub helpers: Vec<ObjectId>,
}

/// What loading one file produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ModelInstance),
    /// The import succeeded but added nothing renderable.
    NoMesh { helpers: Vec<ObjectId> },
}

/// Imports `path` into `scene` and returns the objects it added.
///
/// # Errors
/// Returns [`LoadError::UnsupportedFormat`] when no importer handles the
/// extension, or the importer's own error.
///
/// # Examples
/// ```
/// use std::path::Path;
///
/// use thumbkit::formats::{self, ImporterRegistry, LoadError};
/// use thumbkit::scene::Scene;
///
/// let mut scene = Scene::default();
/// let result = formats::load_model(&mut scene, &ImporterRegistry::default(), Path::new("a.fbx"));
/// assert!(matches!(result, Err(LoadError::UnsupportedFormat(ext)) if ext == "fbx"));
/// ```
pub fn load_model(
    scene: &mut Scene,
    registry: &ImporterRegistry,
    path: &Path,
) -> Result<LoadOutcome, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let importer = registry
        .find(&extension)
        .ok_or_else(|| LoadError::UnsupportedFormat(extension.clone()))?;

    let before = scene.object_ids();
    importer.import(path, scene)?;
    let after = scene.object_ids();

    let (meshes, helpers): (Vec<ObjectId>, Vec<ObjectId>) = after
        .difference(&before)
        .copied()
        .partition(|id| scene.get(*id).map(|o| o.is_mesh()).unwrap_or(false));

    log::debug!(
        "{} import of {} added {} mesh(es), {} helper(s)",
        importer.name(),
        path.display(),
        meshes.len(),
        helpers.len()
    );

    if meshes.is_empty() {
        Ok(LoadOutcome::NoMesh { helpers })
    } else {
        Ok(LoadOutcome::Loaded(ModelInstance { meshes, helpers }))
    }
}
