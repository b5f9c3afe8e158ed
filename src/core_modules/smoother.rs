// THEORY:
// The smoother is the temporal layer of the scanner. A camera frame is noisy:
// glare, auto-exposure and sensor noise make a cell's average color jitter from
// one frame to the next, and a single bad frame is enough to flip the
// classification of a sticker. Each of the nine grid cells therefore carries a
// memory of its own recent appearance, an exponential moving average of its
// feature vector, and the classifier only ever sees that smoothed value.
//
// Key architectural principles:
// 1.  **Pure update rule**: `update` is a plain function of the previous value,
//     the current value and `alpha`. It holds no state of its own.
// 2.  **Per-cell memory**: `SmoothingState` owns the nine remembered vectors and
//     is the only place they are persisted between frames. A cell with no memory
//     passes the current frame straight through.
// 3.  **Explicit reset policy**: when the memory is cleared is a configuration
//     choice (`SmoothingPolicy`), not something the smoother decides.

use crate::core_modules::pixel::pixel::{ColorFeatureVector, FEATURE_LEN};

/// Weight of the newest frame in the moving average.
pub const DEFAULT_ALPHA: f64 = 0.75;

/// When the per-cell smoothing memory is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingPolicy {
    /// Memory survives face changes and is cleared only when the whole session resets.
    #[default]
    PerSession,
    /// Memory is cleared whenever the face being scanned changes (commit, rollback, reset).
    PerFace,
}

/// `alpha * current + (1 - alpha) * previous`, or `current` when there is no previous value.
pub fn update(
    previous: Option<&ColorFeatureVector>,
    current: &ColorFeatureVector,
    alpha: f64,
) -> ColorFeatureVector {
    let Some(previous) = previous else {
        return *current;
    };

    let mut blended = [0.0; FEATURE_LEN];
    for (i, slot) in blended.iter_mut().enumerate() {
        *slot = alpha * current[i] + (1.0 - alpha) * previous[i];
    }
    ColorFeatureVector::new(blended)
}

/// The carried moving average for every cell of the 3x3 grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingState {
    alpha: f64,
    cells: [[Option<ColorFeatureVector>; 3]; 3],
}

impl SmoothingState {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            cells: [[None; 3]; 3],
        }
    }

    /// Blends `current` into the cell's memory and returns the new smoothed value.
    pub fn smooth(&mut self, row: usize, col: usize, current: &ColorFeatureVector) -> ColorFeatureVector {
        let smoothed = update(self.cells[row][col].as_ref(), current, self.alpha);
        self.cells[row][col] = Some(smoothed);
        smoothed
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&ColorFeatureVector> {
        self.cells[row][col].as_ref()
    }

    pub fn clear(&mut self) {
        self.cells = [[None; 3]; 3];
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }
}

impl Default for SmoothingState {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
