// THEORY:
// The `ScanSession` is the memory of the scanner across faces. The frame layer
// forgets everything but its smoothing averages; the session is where a face,
// once the user accepts it, becomes a permanent 9-character string.
//
// Key architectural principles:
// 1.  **Derived position**: the face index is never stored separately from the
//     committed faces. It is the number of committed faces, so
//     `len(committed) == face_index` holds by construction.
// 2.  **Forced centers**: the center sticker of a face never moves, and scan
//     order fixes which face comes next, so the center is supplied by the
//     caller and never taken from classification.
// 3.  **Small surface**: `commit_face`, `rollback_face` and `reset` are the only
//     mutators. Rollback doubles as "go back" for the user and as the recovery
//     step after the solver rejects a cube.

use crate::core_modules::grid_manager::FaceGrid;
use crate::core_modules::palette::{CubeColor, ReferencePalette};
use crate::error::ScanError;
use tracing::debug;

pub const TOTAL_FACES: usize = 6;
pub const FACELETS_PER_FACE: usize = 9;

/// Center colors bordering each scan face as (top, left, bottom, right), with the
/// cube held in the orientation the solver reads that face in.
pub const SIDE_COLORS: [[CubeColor; 4]; TOTAL_FACES] = {
    use CubeColor::*;
    [
        [Green, Orange, Blue, Red],
        [White, Blue, Yellow, Green],
        [White, Orange, Yellow, Red],
        [Blue, Orange, Green, Red],
        [White, Green, Yellow, Blue],
        [White, Red, Yellow, Orange],
    ]
};

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Scanning the face with this index (0..5).
    Scanning(usize),
    /// All six faces are committed; terminal until reset.
    AllFacesCommitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    labels: [char; CubeColor::COUNT],
    committed: Vec<String>,
}

impl ScanSession {
    /// A session labelling faces with the given palette's labels.
    pub fn new(palette: &ReferencePalette) -> Self {
        Self {
            labels: palette.labels(),
            committed: Vec::with_capacity(TOTAL_FACES),
        }
    }

    pub fn state(&self) -> ScanState {
        match self.committed.len() {
            n if n >= TOTAL_FACES => ScanState::AllFacesCommitted,
            n => ScanState::Scanning(n),
        }
    }

    /// 0..=6; 6 once every face is committed.
    pub fn face_index(&self) -> usize {
        self.committed.len().min(TOTAL_FACES)
    }

    pub fn is_complete(&self) -> bool {
        self.state() == ScanState::AllFacesCommitted
    }

    pub fn committed_faces(&self) -> &[String] {
        &self.committed
    }

    /// The center color the face being scanned must have, following scan order.
    pub fn expected_center(&self) -> Option<CubeColor> {
        match self.state() {
            ScanState::Scanning(face) => CubeColor::from_index(face),
            ScanState::AllFacesCommitted => None,
        }
    }

    /// The neighbouring centers to show around the face being scanned.
    pub fn expected_sides(&self) -> Option<[CubeColor; 4]> {
        self.expected_center().map(|center| SIDE_COLORS[center.index()])
    }

    /// Scan progress in whole percent: 0, 16, 33, 50, 66, 83, 100.
    pub fn progress_percent(&self) -> u8 {
        ((100.0 / TOTAL_FACES as f64) * self.face_index() as f64) as u8
    }

    /// The grid as it should be displayed: center forced to the expected color.
    pub fn preview(&self, grid: &FaceGrid) -> FaceGrid {
        match self.expected_center() {
            Some(center) => grid.with_center(center),
            None => *grid,
        }
    }

    /// Appends the face in `grid` with its center replaced by `forced_center`.
    pub fn commit_face(&mut self, grid: &FaceGrid, forced_center: CubeColor) -> Result<ScanState, ScanError> {
        let ScanState::Scanning(face) = self.state() else {
            return Err(ScanError::SessionComplete);
        };

        let face_string: String = grid
            .with_center(forced_center)
            .row_major()
            .map(|color| self.labels[color.index()])
            .collect();

        debug!(face, detected = ?grid.rows(), committed = %face_string, "committing face");
        self.committed.push(face_string);
        Ok(self.state())
    }

    /// Discards the most recently committed face. A no-op on an empty session.
    pub fn rollback_face(&mut self) -> ScanState {
        if let Some(discarded) = self.committed.pop() {
            debug!(face = self.committed.len(), discarded = %discarded, "rolled back face");
        }
        self.state()
    }

    pub fn reset(&mut self) {
        self.committed.clear();
        debug!("scan session reset");
    }

    /// The 54-character scan-order string, available once all faces are committed.
    pub fn raw_cube_string(&self) -> Option<String> {
        self.is_complete().then(|| self.committed.concat())
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(&ReferencePalette::reference())
    }
}
