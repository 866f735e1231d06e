//! Provides the per-file pipeline and the batch loop.
//!
//! [`run_batch`] discovers the input files, builds one [`SceneState`] for the
//! whole run and then pushes every file through load → normalize → frame →
//! render. Each file ends as a [`FrameResult`]; a failure in one file is
//! recorded and the loop moves on.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::discover::{self, DiscoverError};
use crate::formats::{self, ImporterRegistry, LoadError, LoadOutcome};
use crate::framing;
use crate::renderer::{self, RenderError};
use crate::scene::{
    BoundingBox, CameraData, LightData, ObjectId, ObjectKind, RenderSettings, Scene, SceneError,
    SceneObject,
};

/// Errors that abort a run before any file is processed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error("failed to set up scene: {0}")]
    Scene(#[from] SceneError),
}

/// Per-file failures. Caught by the batch loop, never fatal to the run.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

/// How one file ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameStatus {
    Rendered { output: PathBuf },
    Skipped { reason: String },
    Failed { error: String },
}

/// Outcome record for one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub input: PathBuf,
    pub name: String,
    #[serde(flatten)]
    pub status: FrameStatus,
}

impl FrameResult {
    pub fn is_rendered(&self) -> bool {
        matches!(self.status, FrameStatus::Rendered { .. })
    }
}

/// Everything a run produced, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Files found before sharding.
    pub discovered: usize,
    pub results: Vec<FrameResult>,
}

impl RunReport {
    pub fn rendered(&self) -> usize {
        self.count(|s| matches!(s, FrameStatus::Rendered { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FrameStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FrameStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FrameStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

/// The scene plus the camera and light that live for the whole run.
#[derive(Debug)]
pub struct SceneState {
    pub scene: Scene,
    pub camera: ObjectId,
    pub light: ObjectId,
}

impl SceneState {
    /// Removes everything except the camera and light.
    pub fn reset(&mut self) -> usize {
        self.scene.retain_only(&[self.camera, self.light])
    }
}

/// Builds the render target, background and the persistent camera and light.
///
/// Called once per run.
///
/// # Errors
/// Returns a [`SceneError`] if the camera cannot be made the active camera.
pub fn init_scene(config: &RunConfig) -> Result<SceneState, SceneError> {
    let mut scene = Scene::new(RenderSettings {
        resolution: config.resolution,
        samples: config.samples,
        background: config.background,
    });

    let camera = scene.add(SceneObject::new(
        "Cam",
        ObjectKind::Camera(CameraData::default()),
    ));
    let light = scene.add(SceneObject::new("Sun", ObjectKind::Light(LightData::default())));
    scene.set_active_camera(camera)?;

    Ok(SceneState {
        scene,
        camera,
        light,
    })
}

/// Joins `meshes` into one object, bakes rotation and scale, and moves its
/// bounding-box center to the origin.
///
/// Returns the merged object and its re-queried world bounding box.
///
/// # Errors
/// Returns a [`SceneError`] if an id is missing or not a mesh.
pub fn normalize(
    scene: &mut Scene,
    meshes: &[ObjectId],
) -> Result<(ObjectId, BoundingBox), SceneError> {
    let Some(&first) = meshes.first() else {
        return Err(SceneError::NothingToJoin);
    };

    let target = if meshes.len() > 1 {
        scene.join(first, &meshes[1..])?
    } else {
        first
    };

    scene.apply_transform(target, true, true)?;
    let bounds = scene.world_bounds(target)?;

    scene.translate(target, -bounds.center())?;
    let bounds = scene.world_bounds(target)?;

    Ok((target, bounds))
}

/// Processes one file against the shared scene. Never panics on bad input;
/// every failure becomes part of the returned [`FrameResult`].
pub fn process_file(
    state: &mut SceneState,
    registry: &ImporterRegistry,
    config: &RunConfig,
    path: &Path,
) -> FrameResult {
    let name = output_name(path);
    let status = match try_process(state, registry, config, path, &name) {
        Ok(Some(output)) => FrameStatus::Rendered { output },
        Ok(None) => {
            warn!("No mesh in {}, skipping", name);
            FrameStatus::Skipped {
                reason: "no mesh".to_string(),
            }
        }
        Err(e) => {
            warn!("Skipped {}: {}", name, e);
            FrameStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    FrameResult {
        input: path.to_path_buf(),
        name,
        status,
    }
}

fn try_process(
    state: &mut SceneState,
    registry: &ImporterRegistry,
    config: &RunConfig,
    path: &Path,
    name: &str,
) -> Result<Option<PathBuf>, FrameError> {
    state.reset();

    let instance = match formats::load_model(&mut state.scene, registry, path)? {
        LoadOutcome::Loaded(instance) => instance,
        LoadOutcome::NoMesh { .. } => return Ok(None),
    };

    let (_, bounds) = normalize(&mut state.scene, &instance.meshes)?;

    let framing = framing::compute_framing(
        bounds.size(),
        &config.angle,
        config.margin,
        config.camera_offset,
    );
    framing::apply_framing(&mut state.scene, state.camera, state.light, &framing)?;

    let output = config.output_dir.join(format!("{}.png", name));
    renderer::render_to_file(&state.scene, &output)?;
    Ok(Some(output))
}

/// `<stem>` of the input file, used as the output base name.
fn output_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// Runs the whole batch.
///
/// # Errors
/// Returns a [`BatchError`] only for startup problems (invalid configuration,
/// unreadable input directory, scene setup). Per-file problems are in the report.
pub fn run_batch(config: &RunConfig, registry: &ImporterRegistry) -> Result<RunReport, BatchError> {
    config.validate()?;

    let discovered = discover::find_files(&config.input_dir, &config.extensions)?;
    let discovered_count = discovered.len();
    let files = match config.shard {
        Some(shard) => shard.select(discovered),
        None => discovered,
    };

    let mut state = init_scene(config)?;
    let mut report = RunReport {
        discovered: discovered_count,
        results: Vec::with_capacity(files.len()),
    };

    for (idx, path) in files.iter().enumerate() {
        info!("[{}/{}] Render {}", idx + 1, files.len(), output_name(path));
        report
            .results
            .push(process_file(&mut state, registry, config, path));
    }

    info!(
        "Done. {} rendered, {} skipped, {} failed",
        report.rendered(),
        report.skipped(),
        report.failed()
    );
    Ok(report)
}
