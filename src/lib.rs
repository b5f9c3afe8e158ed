// THEORY:
// This file is the main entry point for the `cube_vision` library crate.
// It defines the public API exposed to a host application (a camera preview,
// a desktop tool, a test harness).
//
// The primary goal is to export `CubeScanner` and its associated data
// structures (`ScannerConfig`, `SolveOutcome`, etc.) as the high-level interface
// for scanning a cube. The building blocks in `core_modules` stay public so a
// caller can classify a single frame or convert a string without the runtime.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::grid_manager::FaceGrid;
pub use core_modules::notation::SolverCubeString;
pub use core_modules::palette::{CubeColor, ReferencePalette};
pub use core_modules::scan_session::ScanState;
pub use core_modules::smoother::SmoothingPolicy;
pub use core_modules::solve::{CubeSolver, SolveOutcome};
pub use error::{ConfigurationError, ConversionError, ScanError, ScanResult};
pub use pipeline::{CubeScanner, ScannerConfig};
