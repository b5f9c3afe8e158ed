// THEORY:
// The grid manager orchestrates the per-frame layer of the scanner. It owns the
// fixed 3x3 layout of cells over the camera's field of view, the per-cell
// smoothing memory and the classifier, and it turns each incoming frame into a
// `FaceGrid` snapshot: one classified color per cell.
//
// Key architectural principles:
// 1.  **Orchestration**: `FrameAnalyzer` is not an analyzer of colors itself. It
//     slices the frame into cells (`ScanLayout`), asks the feature source for
//     each cell's average, runs it through the smoother and the classifier, and
//     collects the results.
// 2.  **Synchronous boundary**: `analyze` takes a frame and returns a grid. How
//     frames arrive (callbacks, channels, a camera thread) is somebody else's
//     concern.
// 3.  **Whole-snapshot sharing**: the grid is read by the commit and preview
//     paths while the analysis worker keeps writing it. `SharedFaceGrid` only
//     exposes "replace the whole snapshot" and "read the whole snapshot", both
//     under one lock, so a reader can never observe a half-updated face.

use crate::core_modules::chunk::chunk::FeatureSource;
use crate::core_modules::classifier::ColorClassifier;
use crate::core_modules::palette::CubeColor;
use crate::core_modules::smoother::SmoothingState;
use std::sync::{Arc, Mutex, PoisonError};

/// Fraction of the shorter frame side covered by the 3x3 face.
pub const DEFAULT_COVERAGE: f64 = 0.8;

/// A 3x3 snapshot of classified colors, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceGrid {
    cells: [[CubeColor; 3]; 3],
}

impl FaceGrid {
    pub fn new(cells: [[CubeColor; 3]; 3]) -> Self {
        Self { cells }
    }

    /// A grid showing one color in every cell.
    pub fn uniform(color: CubeColor) -> Self {
        Self {
            cells: [[color; 3]; 3],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> CubeColor {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, color: CubeColor) {
        self.cells[row][col] = color;
    }

    pub fn center(&self) -> CubeColor {
        self.cells[1][1]
    }

    pub fn with_center(mut self, color: CubeColor) -> Self {
        self.cells[1][1] = color;
        self
    }

    pub fn rows(&self) -> &[[CubeColor; 3]; 3] {
        &self.cells
    }

    /// The nine cells in row-major order.
    pub fn row_major(&self) -> impl Iterator<Item = CubeColor> + '_ {
        self.cells.iter().flatten().copied()
    }
}

/// The single owned container for the live grid.
#[derive(Debug, Clone, Default)]
pub struct SharedFaceGrid {
    inner: Arc<Mutex<FaceGrid>>,
}

impl SharedFaceGrid {
    pub fn new(grid: FaceGrid) -> Self {
        Self {
            inner: Arc::new(Mutex::new(grid)),
        }
    }

    pub fn replace(&self, grid: FaceGrid) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = grid;
    }

    pub fn snapshot(&self) -> FaceGrid {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pixel geometry of the nine cells for one frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLayout {
    /// Left edge of the face square in pixels.
    pub start_x: u32,
    /// Top edge of the face square in pixels.
    pub start_y: u32,
    /// Side length of one cell in pixels.
    pub box_len: u32,
}

impl ScanLayout {
    /// Centers a square covering `coverage` of the shorter side and splits it into 3x3 cells.
    pub fn for_frame(width: u32, height: u32, coverage: f64) -> Self {
        let cube_len = width.min(height) as f64 * coverage;
        let box_len = (cube_len / 3.0) as u32;
        let start_x = ((width as f64 - cube_len) / 2.0).max(0.0) as u32;
        let start_y = ((height as f64 - cube_len) / 2.0).max(0.0) as u32;
        Self {
            start_x,
            start_y,
            box_len,
        }
    }

    /// Top-left corner of the cell at `(row, col)`; rows run along y, columns along x.
    pub fn cell_origin(&self, row: usize, col: usize) -> (u32, u32) {
        (
            self.start_x + self.box_len * col as u32,
            self.start_y + self.box_len * row as u32,
        )
    }
}

/// Owns the per-frame state: classifier, smoothing memory and layout settings.
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    classifier: ColorClassifier,
    smoothing: SmoothingState,
    coverage: f64,
}

impl FrameAnalyzer {
    pub fn new(classifier: ColorClassifier, alpha: f64, coverage: f64) -> Self {
        Self {
            classifier,
            smoothing: SmoothingState::new(alpha),
            coverage,
        }
    }

    /// Classifies every cell of `frame`, updating the smoothing memory as it goes.
    pub fn analyze<F: FeatureSource + ?Sized>(&mut self, frame: &F) -> FaceGrid {
        let (width, height) = frame.dimensions();
        let layout = ScanLayout::for_frame(width, height, self.coverage);
        let mut grid = FaceGrid::default();

        for row in 0..3 {
            for col in 0..3 {
                let (x, y) = layout.cell_origin(row, col);
                let raw = frame.region_feature(x, y, layout.box_len);
                let smoothed = self.smoothing.smooth(row, col, &raw);
                grid.set(row, col, self.classifier.classify(&smoothed));
            }
        }

        grid
    }

    pub fn clear_smoothing(&mut self) {
        self.smoothing.clear();
    }

    pub fn smoothing(&self) -> &SmoothingState {
        &self.smoothing
    }
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new(
            ColorClassifier::default(),
            crate::core_modules::smoother::DEFAULT_ALPHA,
            DEFAULT_COVERAGE,
        )
    }
}
