// THEORY:
// The solve module sits on the far side of the hand-off. The solver itself is an
// external collaborator behind the `CubeSolver` trait: it takes the 54-letter
// facelet string and answers with either a move sequence or a negative error
// code. This module turns that answer into what the user sees next and into
// the matching move on the `ScanSession`.
//
// Policy:
// - a solution ends the session (`reset`);
// - a rejection rolls back exactly one face, on the heuristic that the face
//   scanned last is the likeliest culprit. It is a guess, not a diagnosis.

use crate::core_modules::scan_session::ScanSession;
use std::fmt;
use tracing::{error, info};

/// The solver's answer: moves on success, a negative error code on failure.
pub type SolverReply = Result<String, i32>;

/// The external cube-solving engine.
pub trait CubeSolver: Send + Sync {
    fn solve(&self, facelets: &str) -> SolverReply;
}

impl<F> CubeSolver for F
where
    F: Fn(&str) -> SolverReply + Send + Sync,
{
    fn solve(&self, facelets: &str) -> SolverReply {
        self(facelets)
    }
}

/// Human-readable meaning of solver error codes -1, -2, ... in order.
pub const SOLVER_ERROR_MESSAGES: [&str; 8] = [
    "There are not exactly nine facelets of each color",
    "Not all 12 edges exist exactly once",
    "Flip error: One edge has to be flipped",
    "Not all 8 corners exist exactly once",
    "Twist error: One corner has to be twisted",
    "Parity error: Two corners or two edges have to be exchanged",
    "No solution exists for the given maximum depth",
    "Probe limit exceeded, no solution within the given probe budget",
];

pub const UNKNOWN_SOLVER_ERROR: &str = "Unknown solver error";

/// Error code for "not exactly nine facelets of each color".
pub const UNBALANCED_FACELETS_CODE: i32 = -1;

/// Looks up the message for `code` at index `(-code) - 1`.
pub fn error_message(code: i32) -> &'static str {
    if code >= 0 {
        return UNKNOWN_SOLVER_ERROR;
    }
    let index = (-(code as i64) - 1) as usize;
    SOLVER_ERROR_MESSAGES
        .get(index)
        .copied()
        .unwrap_or(UNKNOWN_SOLVER_ERROR)
}

/// What the user is told after a solve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved { moves: String },
    Rejected { code: i32, message: &'static str },
}

impl SolveOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved { .. })
    }
}

impl fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveOutcome::Solved { moves } => write!(f, "Solution: {}", moves),
            SolveOutcome::Rejected { code, message } => {
                write!(f, "Invalid cube (error code {}): {}", code, message)
            }
        }
    }
}

/// Applies the solver's reply to the session and reports the outcome.
pub fn interpret(reply: SolverReply, session: &mut ScanSession) -> SolveOutcome {
    match reply {
        Ok(moves) => {
            info!(moves = %moves, "cube solved");
            session.reset();
            SolveOutcome::Solved { moves }
        }
        Err(code) => {
            let message = error_message(code);
            error!(code, reason = message, "solver rejected cube, rolling back one face");
            session.rollback_face();
            SolveOutcome::Rejected { code, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::grid_manager::FaceGrid;
    use crate::core_modules::palette::CubeColor;
    use crate::core_modules::scan_session::ScanState;
    use rstest::rstest;

    fn complete_session() -> ScanSession {
        let mut session = ScanSession::default();
        for color in CubeColor::ALL {
            session.commit_face(&FaceGrid::uniform(color), color).unwrap();
        }
        session
    }

    #[test]
    fn success_resets_the_session() {
        let mut session = complete_session();
        let outcome = interpret(Ok("R U R' U'".to_string()), &mut session);
        assert_eq!(
            outcome,
            SolveOutcome::Solved {
                moves: "R U R' U'".to_string()
            }
        );
        assert_eq!(session.state(), ScanState::Scanning(0));
        assert!(session.committed_faces().is_empty());
    }

    #[test]
    fn rejection_rolls_back_one_face() {
        let mut session = complete_session();
        let outcome = interpret(Err(-3), &mut session);
        assert_eq!(
            outcome,
            SolveOutcome::Rejected {
                code: -3,
                message: "Flip error: One edge has to be flipped"
            }
        );
        assert_eq!(session.state(), ScanState::Scanning(5));
    }

    #[rstest]
    #[case(-1, SOLVER_ERROR_MESSAGES[0])]
    #[case(-6, SOLVER_ERROR_MESSAGES[5])]
    #[case(-8, SOLVER_ERROR_MESSAGES[7])]
    #[case(-9, UNKNOWN_SOLVER_ERROR)]
    #[case(0, UNKNOWN_SOLVER_ERROR)]
    #[case(4, UNKNOWN_SOLVER_ERROR)]
    #[case(i32::MIN, UNKNOWN_SOLVER_ERROR)]
    fn error_codes_map_to_table(#[case] code: i32, #[case] expected: &str) {
        assert_eq!(error_message(code), expected);
    }

    #[test]
    fn closures_act_as_solvers() {
        let solver = |facelets: &str| -> SolverReply { Ok(format!("{} chars", facelets.len())) };
        assert_eq!(solver.solve("UUU"), Ok("3 chars".to_string()));
    }

    #[test]
    fn outcome_display_is_user_facing() {
        let rejected = SolveOutcome::Rejected {
            code: -2,
            message: error_message(-2),
        };
        assert_eq!(
            rejected.to_string(),
            "Invalid cube (error code -2): Not all 12 edges exist exactly once"
        );
        assert!(!rejected.is_solved());
    }
}
