//! Provides batch rendering of normalized 3D model thumbnails.
//!
//! Given a folder of model files with arbitrary scale, origin and
//! orientation, thumbkit renders one square PNG per file so that every image
//! shows its model at the same apparent size, from the same angle, on the
//! same background. Each model is merged into a single mesh, its rotation
//! and scale are baked, it is re-centered on the origin, and an orthographic
//! camera is placed at a fixed elevation/azimuth sized to the model's
//! horizontal footprint.
//!
//! A file that fails to import or render is recorded in the run report and
//! the batch continues.
//!
//! # Examples
//! ```no_run
//! use thumbkit::config::RunConfig;
//! use thumbkit::formats::ImporterRegistry;
//! use thumbkit::pipeline;
//!
//! let config = RunConfig {
//!     input_dir: "models".into(),
//!     output_dir: "thumbs".into(),
//!     ..RunConfig::default()
//! };
//! let report = pipeline::run_batch(&config, &ImporterRegistry::default()).unwrap();
//! println!("{} rendered", report.rendered());
//! ```

pub mod config;
pub mod discover;
pub mod formats;
pub mod framing;
pub mod pipeline;
pub mod renderer;
pub mod scene;
