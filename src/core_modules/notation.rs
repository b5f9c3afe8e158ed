// THEORY:
// The notation converter is the hand-off protocol between the scanner and the
// external solver. The scanner accumulates faces in the order the user holds
// them up to the camera (Yellow, Orange, Green, White, Red, Blue) and names
// stickers by color. The solver expects faces in its canonical order
// (U, R, F, D, L, B) and names stickers by the face they belong to.
//
// Two fixed tables bridge the gap and are a contract, not something derived at
// runtime:
// - the face permutation: solver faces are scan faces 3, 4, 2, 0, 1, 5;
// - the alphabet: Y→D, O→L, G→F, W→U, R→R, B→B.
//
// Unknown characters do not abort the conversion. They become `?` so the
// problem stays visible in the final string (and the solver will reject it).

use crate::core_modules::scan_session::{FACELETS_PER_FACE, TOTAL_FACES};
use crate::error::ConversionError;
use std::fmt;
use tracing::{info, warn};

pub const CUBE_STRING_LEN: usize = TOTAL_FACES * FACELETS_PER_FACE;

/// Scan-face index placed at each solver position.
pub const SOLVER_FACE_ORDER: [usize; TOTAL_FACES] = [3, 4, 2, 0, 1, 5];

/// Solver face letters in canonical order.
pub const SOLVER_FACES: [char; TOTAL_FACES] = ['U', 'R', 'F', 'D', 'L', 'B'];

pub const UNKNOWN_FACELET: char = '?';

/// Maps a scan-alphabet color label to the solver alphabet.
pub fn solver_letter(label: char) -> Option<char> {
    match label {
        'Y' => Some('D'),
        'O' => Some('L'),
        'G' => Some('F'),
        'W' => Some('U'),
        'R' => Some('R'),
        'B' => Some('B'),
        _ => None,
    }
}

/// A 54-character facelet string in solver order and alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolverCubeString(String);

impl SolverCubeString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Positions holding the `?` sentinel.
    pub fn unknown_positions(&self) -> Vec<usize> {
        self.0
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == UNKNOWN_FACELET)
            .map(|(i, _)| i)
            .collect()
    }

    /// How many facelets carry each solver face letter, in `SOLVER_FACES` order.
    pub fn facelet_counts(&self) -> [usize; TOTAL_FACES] {
        let mut counts = [0; TOTAL_FACES];
        for c in self.0.chars() {
            if let Some(slot) = SOLVER_FACES.iter().position(|face| *face == c) {
                counts[slot] += 1;
            }
        }
        counts
    }

    /// True when every face letter appears exactly nine times.
    pub fn is_balanced(&self) -> bool {
        self.facelet_counts()
            .iter()
            .all(|count| *count == FACELETS_PER_FACE)
    }
}

impl fmt::Display for SolverCubeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SolverCubeString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reorders a scan-order cube string into solver face order and relabels it.
pub fn convert(raw: &str) -> Result<SolverCubeString, ConversionError> {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() != CUBE_STRING_LEN {
        return Err(ConversionError::UnexpectedLength {
            expected: CUBE_STRING_LEN,
            actual: chars.len(),
        });
    }

    let faces: Vec<&[char]> = chars.chunks(FACELETS_PER_FACE).collect();
    let mut converted = String::with_capacity(CUBE_STRING_LEN);

    for (solver_position, &scan_face) in SOLVER_FACE_ORDER.iter().enumerate() {
        for (offset, &label) in faces[scan_face].iter().enumerate() {
            match solver_letter(label) {
                Some(letter) => converted.push(letter),
                None => {
                    warn!(
                        label = %label.escape_debug(),
                        position = solver_position * FACELETS_PER_FACE + offset,
                        "unknown facelet label, substituting '?'"
                    );
                    converted.push(UNKNOWN_FACELET);
                }
            }
        }
    }

    info!(cube = %converted, "solver cube string ready");
    Ok(SolverCubeString(converted))
}
