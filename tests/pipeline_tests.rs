//! End-to-end batch tests: discovery, failure isolation, output files.
//!
//! Renders at a small resolution with a single sample so the suite stays fast.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thumbkit::config::{Background, ConfigError, RunConfig, MAX_RESOLUTION};
use thumbkit::formats::{obj::ObjImporter, Importer, ImporterRegistry, LoadError};
use thumbkit::pipeline::{self, BatchError, FrameStatus};
use thumbkit::scene::{ObjectKind, Scene};

const RES: u32 = 32;

fn cube_obj(offset: [f32; 3], size: f32) -> String {
    let mut s = String::new();
    for xi in 0..2 {
        for yi in 0..2 {
            for zi in 0..2 {
                s.push_str(&format!(
                    "v {} {} {}\n",
                    offset[0] + xi as f32 * size,
                    offset[1] + yi as f32 * size,
                    offset[2] + zi as f32 * size
                ));
            }
        }
    }
    s.push_str("f 1 2 4 3\nf 5 7 8 6\nf 1 5 6 2\nf 3 4 8 7\nf 1 3 7 5\nf 2 6 8 4\n");
    s
}

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(files: &[(&str, String)]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        for (name, contents) in files {
            let path = input.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        Self {
            _dir: dir,
            input,
            output,
        }
    }

    fn config(&self) -> RunConfig {
        RunConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            resolution: RES,
            samples: 1,
            ..RunConfig::default()
        }
    }

    fn png(&self, name: &str) -> PathBuf {
        self.output.join(format!("{}.png", name))
    }
}

/// Wraps the OBJ importer and fails for one file stem.
struct FailOn(&'static str);

impl Importer for FailOn {
    fn name(&self) -> &'static str {
        "flaky OBJ"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn import(&self, path: &Path, scene: &mut Scene) -> Result<(), LoadError> {
        if path.file_stem().and_then(|s| s.to_str()) == Some(self.0) {
            return Err(LoadError::InvalidData("corrupt file".to_string()));
        }
        ObjImporter.import(path, scene)
    }
}

#[test]
fn test_failing_file_does_not_stop_batch() {
    let fx = Fixture::new(&[
        ("a.obj", cube_obj([0.0; 3], 1.0)),
        ("b.obj", cube_obj([0.0; 3], 1.0)),
        ("c.obj", cube_obj([5.0, 5.0, 5.0], 2.0)),
    ]);
    let mut registry = ImporterRegistry::default();
    registry.register(Box::new(FailOn("b")));

    let report = pipeline::run_batch(&fx.config(), &registry).unwrap();

    assert!(fx.png("a").exists());
    assert!(!fx.png("b").exists());
    assert!(fx.png("c").exists());
    assert_eq!(report.rendered(), 2);
    assert_eq!(report.failed() + report.skipped(), 1);
    assert!(matches!(
        &report.results[1].status,
        FrameStatus::Failed { error } if error.contains("corrupt file")
    ));
}

#[test]
fn test_no_mesh_and_unsupported_are_recorded() {
    let fx = Fixture::new(&[
        ("a.obj", "v 0 0 0\nv 1 0 0\n".to_string()),
        ("b.fbx", "Kaydara FBX Binary".to_string()),
        ("c.obj", cube_obj([0.0; 3], 1.0)),
    ]);
    let config = RunConfig {
        extensions: vec!["obj".to_string(), "fbx".to_string()],
        ..fx.config()
    };

    let report = pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();

    let statuses: Vec<&FrameStatus> = report.results.iter().map(|r| &r.status).collect();
    assert!(matches!(statuses[0], FrameStatus::Skipped { .. }));
    assert!(matches!(statuses[1], FrameStatus::Failed { error } if error.contains("Unsupported format")));
    assert!(matches!(statuses[2], FrameStatus::Rendered { .. }));
    assert!(fx.png("c").exists());
}

#[test]
fn test_output_is_square_rgba_png() {
    let fx = Fixture::new(&[("nested/dir/crate.obj", cube_obj([10.0, -3.0, 2.0], 4.0))]);
    pipeline::run_batch(&fx.config(), &ImporterRegistry::default()).unwrap();

    // Output is flat: no subdirectory mirroring.
    let img = image::open(fx.png("crate")).expect("Failed to open output PNG");
    assert_eq!(img.color(), image::ColorType::Rgba8);
    let img = img.to_rgba8();
    assert_eq!(img.dimensions(), (RES, RES));

    // Model framed at the center, transparent around it.
    assert_eq!(img.get_pixel(RES / 2, RES / 2)[3], 255);
    assert_eq!(img.get_pixel(0, 0)[3], 0);
}

#[test]
fn test_flat_background_fills_corners() {
    let fx = Fixture::new(&[("m.obj", cube_obj([0.0; 3], 1.0))]);
    let config = RunConfig {
        background: Background::parse("#f00"),
        ..fx.config()
    };
    pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();

    let img = image::open(fx.png("m")).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert!(img.pixels().all(|p| p[3] == 255));
}

#[test]
fn test_rendering_twice_is_byte_identical() {
    let fx = Fixture::new(&[("m.obj", cube_obj([1.0, 2.0, 3.0], 2.5))]);
    let config = fx.config();

    pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();
    let first = fs::read(fx.png("m")).unwrap();
    pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();
    let second = fs::read(fx.png("m")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_scene_holds_only_camera_and_light_between_files() {
    let fx = Fixture::new(&[
        ("a.obj", cube_obj([0.0; 3], 1.0)),
        ("b.obj", cube_obj([0.0; 3], 3.0)),
    ]);
    let config = fx.config();
    let registry = ImporterRegistry::default();
    let mut state = pipeline::init_scene(&config).unwrap();

    for name in ["a.obj", "b.obj"] {
        let result = pipeline::process_file(&mut state, &registry, &config, &fx.input.join(name));
        assert!(result.is_rendered());
        assert_eq!(state.scene.len(), 3);

        state.reset();
        assert_eq!(
            state.scene.object_ids(),
            BTreeSet::from([state.camera, state.light])
        );
    }

    let cameras = state
        .scene
        .objects()
        .filter(|(_, o)| matches!(o.kind, ObjectKind::Camera(_)))
        .count();
    assert_eq!(cameras, 1);
}

#[test]
fn test_shards_split_the_batch() {
    let fx = Fixture::new(&[
        ("a.obj", cube_obj([0.0; 3], 1.0)),
        ("b.obj", cube_obj([0.0; 3], 1.0)),
        ("c.obj", cube_obj([0.0; 3], 1.0)),
    ]);
    let config = RunConfig {
        shard: Some("1/2".parse().unwrap()),
        ..fx.config()
    };

    let report = pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.results.len(), 1);
    assert!(fx.png("b").exists());
    assert!(!fx.png("a").exists());
}

#[test]
fn test_startup_errors_abort() {
    let fx = Fixture::new(&[]);

    let bad = RunConfig {
        margin: 0.5,
        ..fx.config()
    };
    assert!(matches!(
        pipeline::run_batch(&bad, &ImporterRegistry::default()),
        Err(BatchError::Config(ConfigError::InvalidMargin(_)))
    ));

    let huge = RunConfig {
        resolution: MAX_RESOLUTION + 1,
        ..fx.config()
    };
    assert!(matches!(
        pipeline::run_batch(&huge, &ImporterRegistry::default()),
        Err(BatchError::Config(ConfigError::ResolutionTooLarge(_)))
    ));

    let missing = RunConfig {
        input_dir: fx.input.join("missing"),
        ..fx.config()
    };
    assert!(matches!(
        pipeline::run_batch(&missing, &ImporterRegistry::default()),
        Err(BatchError::Discover(_))
    ));

    let empty = pipeline::run_batch(&fx.config(), &ImporterRegistry::default()).unwrap();
    assert!(empty.results.is_empty());
}

#[test]
fn test_report_serializes_statuses() {
    let fx = Fixture::new(&[("a.obj", cube_obj([0.0; 3], 1.0)), ("z.obj", String::new())]);
    let report = pipeline::run_batch(&fx.config(), &ImporterRegistry::default()).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["discovered"], 2);
    assert_eq!(json["results"][0]["status"], "rendered");
    assert_eq!(json["results"][0]["name"], "a");
    assert_eq!(json["results"][1]["status"], "skipped");
}
