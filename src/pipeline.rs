// THEORY:
// The `pipeline` module is the top-level API of the scanner. It encapsulates the
// whole stack (frame analysis, the live grid, the scan session and the solver
// hand-off) behind `CubeScanner`, so a host application only has to push frames,
// press "scan", "back" and "reset", and finally ask for a solve.
//
// Concurrency model:
// - frames are analyzed by the single worker from `parallel_pipeline`, which is
//   the sole writer of the shared live grid;
// - session mutations are serialized behind one mutex and read the live grid as
//   one consistent snapshot;
// - at most one solve is in flight. While it runs, commit, rollback and reset
//   are refused. The flag is only flipped while the session lock is held, so a
//   mutation can never slip in between "solve started" and "session frozen".

use crate::core_modules::chunk::chunk::FeatureSource;
use crate::core_modules::classifier::ColorClassifier;
use crate::core_modules::grid_manager::{DEFAULT_COVERAGE, FaceGrid, FrameAnalyzer, SharedFaceGrid};
use crate::core_modules::notation::{self, SolverCubeString};
use crate::core_modules::palette::{CubeColor, ReferencePalette};
use crate::core_modules::scan_session::{ScanSession, ScanState};
use crate::core_modules::smoother::{DEFAULT_ALPHA, SmoothingPolicy};
use crate::core_modules::solve::{self, CubeSolver, SolveOutcome, UNBALANCED_FACELETS_CODE};
use crate::error::{ConfigurationError, ScanError, ScanResult};
use crate::parallel_pipeline::{AnalysisWorker, FrameFeed, spawn_analysis_worker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::chunk::chunk::RgbaFrame;
pub use crate::core_modules::solve::SolverReply;

/// Configuration for the CubeScanner, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Weight of the newest frame in each cell's moving average, in (0, 1].
    pub smoothing_alpha: f64,
    /// Fraction of the shorter frame side covered by the 3x3 face, in (0, 1].
    pub grid_coverage: f64,
    /// When the per-cell smoothing memory is cleared.
    pub smoothing_policy: SmoothingPolicy,
    /// Reject a cube without calling the solver when a face letter does not appear
    /// exactly nine times.
    pub precheck_facelet_counts: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_ALPHA,
            grid_coverage: DEFAULT_COVERAGE,
            smoothing_policy: SmoothingPolicy::PerSession,
            precheck_facelet_counts: true,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(ConfigurationError::InvalidAlpha(self.smoothing_alpha));
        }
        if !(self.grid_coverage > 0.0 && self.grid_coverage <= 1.0) {
            return Err(ConfigurationError::InvalidCoverage(self.grid_coverage));
        }
        Ok(())
    }
}

/// Face changes that may clear the smoothing memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceChange {
    Commit,
    Rollback,
    Reset,
}

/// The main, top-level struct for the scanner. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CubeScanner {
    config: ScannerConfig,
    classifier: ColorClassifier,
    grid: SharedFaceGrid,
    session: Arc<Mutex<ScanSession>>,
    solving: Arc<AtomicBool>,
    smoothing_reset: Arc<AtomicBool>,
}

impl CubeScanner {
    pub fn new(config: ScannerConfig, palette: ReferencePalette) -> Result<Self, ConfigurationError> {
        config.validate()?;
        info!(?config, "cube scanner configured");
        Ok(Self {
            classifier: ColorClassifier::train(&palette),
            session: Arc::new(Mutex::new(ScanSession::new(&palette))),
            grid: SharedFaceGrid::default(),
            solving: Arc::new(AtomicBool::new(false)),
            smoothing_reset: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// A standalone analyzer with this scanner's classifier and settings.
    pub fn frame_analyzer(&self) -> FrameAnalyzer {
        FrameAnalyzer::new(
            self.classifier.clone(),
            self.config.smoothing_alpha,
            self.config.grid_coverage,
        )
    }

    /// Starts the analysis worker on the current tokio runtime. Frames pushed into
    /// the returned feed update this scanner's live grid.
    pub fn start<F>(&self) -> (FrameFeed<F>, AnalysisWorker)
    where
        F: FeatureSource + Send + Sync + 'static,
    {
        spawn_analysis_worker(
            self.frame_analyzer(),
            self.grid.clone(),
            self.smoothing_reset.clone(),
        )
    }

    /// The latest classified grid, exactly as analyzed.
    pub fn live_grid(&self) -> FaceGrid {
        self.grid.snapshot()
    }

    /// The latest grid with its center forced to the color the current face must have.
    pub fn preview(&self) -> FaceGrid {
        let grid = self.grid.snapshot();
        self.lock_session().preview(&grid)
    }

    pub fn state(&self) -> ScanState {
        self.lock_session().state()
    }

    pub fn progress_percent(&self) -> u8 {
        self.lock_session().progress_percent()
    }

    pub fn expected_center(&self) -> Option<CubeColor> {
        self.lock_session().expected_center()
    }

    pub fn is_solving(&self) -> bool {
        self.solving.load(Ordering::Acquire)
    }

    /// A copy of the session as it stands.
    pub fn session(&self) -> ScanSession {
        self.lock_session().clone()
    }

    /// Commits the live grid with `forced_center` as its center.
    pub fn commit_face(&self, forced_center: CubeColor) -> ScanResult<ScanState> {
        let mut session = self.lock_idle_session()?;
        self.commit_locked(&mut session, forced_center)
    }

    /// Commits the live grid with the center the scan order prescribes.
    pub fn commit_next_face(&self) -> ScanResult<ScanState> {
        let mut session = self.lock_idle_session()?;
        let center = session.expected_center().ok_or(ScanError::SessionComplete)?;
        self.commit_locked(&mut session, center)
    }

    /// Neighbouring center colors (top, left, bottom, right) the user should see
    /// around the face being scanned.
    pub fn expected_sides(&self) -> Option<[CubeColor; 4]> {
        self.lock_session().expected_sides()
    }

    pub fn rollback_face(&self) -> ScanResult<ScanState> {
        let mut session = self.lock_idle_session()?;
        let had_faces = session.face_index() > 0;
        let state = session.rollback_face();
        if had_faces {
            self.on_face_change(FaceChange::Rollback);
        }
        Ok(state)
    }

    pub fn reset(&self) -> ScanResult<()> {
        let mut session = self.lock_idle_session()?;
        session.reset();
        self.on_face_change(FaceChange::Reset);
        Ok(())
    }

    /// The solver-ready string for a completed scan.
    pub fn solver_input(&self) -> ScanResult<SolverCubeString> {
        let session = self.lock_session();
        Self::solver_input_of(&session)
    }

    /// Hands the completed cube to `solver` off the caller's path and applies the
    /// result: reset on success, one-face rollback on rejection.
    pub async fn solve(&self, solver: Arc<dyn CubeSolver>) -> ScanResult<SolveOutcome> {
        let facelets = {
            let session = self.lock_idle_session()?;
            let facelets = Self::solver_input_of(&session)?;
            self.solving.store(true, Ordering::Release);
            facelets
        };
        let _in_flight = InFlight(&self.solving);

        let reply = if self.config.precheck_facelet_counts && !facelets.is_balanced() {
            warn!(
                counts = ?facelets.facelet_counts(),
                "facelet counts unbalanced, skipping solver"
            );
            Err(UNBALANCED_FACELETS_CODE)
        } else {
            let input = facelets.into_string();
            tokio::task::spawn_blocking(move || solver.solve(&input))
                .await
                .map_err(|e| ScanError::SolverTask(e.to_string()))?
        };

        let outcome = {
            let mut session = self.lock_session();
            solve::interpret(reply, &mut session)
        };
        self.on_face_change(match outcome {
            SolveOutcome::Solved { .. } => FaceChange::Reset,
            SolveOutcome::Rejected { .. } => FaceChange::Rollback,
        });
        Ok(outcome)
    }

    fn solver_input_of(session: &ScanSession) -> ScanResult<SolverCubeString> {
        let raw = session.raw_cube_string().ok_or(ScanError::Incomplete {
            committed: session.face_index(),
        })?;
        Ok(notation::convert(&raw)?)
    }

    fn commit_locked(&self, session: &mut ScanSession, center: CubeColor) -> ScanResult<ScanState> {
        let grid = self.grid.snapshot();
        let state = session.commit_face(&grid, center)?;
        self.on_face_change(FaceChange::Commit);
        if state == ScanState::AllFacesCommitted {
            info!("all faces committed");
        }
        Ok(state)
    }

    fn lock_session(&self) -> MutexGuard<'_, ScanSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the session for a mutation, refusing while a solve is in flight.
    fn lock_idle_session(&self) -> ScanResult<MutexGuard<'_, ScanSession>> {
        let session = self.lock_session();
        if self.is_solving() {
            return Err(ScanError::SolveInFlight);
        }
        Ok(session)
    }

    fn on_face_change(&self, change: FaceChange) {
        let clear = match self.config.smoothing_policy {
            SmoothingPolicy::PerFace => true,
            SmoothingPolicy::PerSession => change == FaceChange::Reset,
        };
        if clear {
            self.smoothing_reset.store(true, Ordering::Release);
        }
    }
}

/// Clears the in-flight flag when the solve ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::grid_manager::tests::frame_showing;
    use rstest::rstest;

    fn scanner(config: ScannerConfig) -> CubeScanner {
        CubeScanner::new(config, ReferencePalette::reference()).unwrap()
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.5)]
    #[case(1.5)]
    #[case(f64::NAN)]
    fn invalid_alpha_is_a_configuration_error(#[case] alpha: f64) {
        let config = ScannerConfig {
            smoothing_alpha: alpha,
            ..Default::default()
        };
        assert!(matches!(
            CubeScanner::new(config, ReferencePalette::reference()),
            Err(ConfigurationError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn invalid_coverage_is_a_configuration_error() {
        let config = ScannerConfig {
            grid_coverage: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::InvalidCoverage(0.0))
        );
    }

    #[test]
    fn commit_reads_live_grid_and_forces_center() {
        let scanner = scanner(ScannerConfig::default());
        scanner.grid.replace(FaceGrid::uniform(CubeColor::Red));
        assert_eq!(scanner.preview().center(), CubeColor::Yellow);
        assert_eq!(scanner.commit_next_face(), Ok(ScanState::Scanning(1)));
        assert_eq!(scanner.session().committed_faces(), ["RRRRYRRRR".to_string()]);
    }

    #[test]
    fn palette_outside_the_solver_alphabet_fails_construction() {
        let entries = ReferencePalette::reference()
            .entries()
            .iter()
            .map(|entry| {
                let mut entry = *entry;
                entry.label = entry.label.to_ascii_lowercase();
                entry
            })
            .collect();
        assert!(matches!(
            ReferencePalette::new(entries),
            Err(ConfigurationError::UnsupportedLabel { .. })
        ));
    }

    #[test]
    fn concurrent_commits_force_centers_in_scan_order() {
        for _ in 0..50 {
            let scanner = scanner(ScannerConfig::default());
            scanner.grid.replace(FaceGrid::uniform(CubeColor::White));
            let start = std::sync::Barrier::new(CubeColor::COUNT);
            std::thread::scope(|threads| {
                for _ in 0..CubeColor::COUNT {
                    threads.spawn(|| {
                        start.wait();
                        scanner.commit_next_face().unwrap();
                    });
                }
            });

            let raw = scanner.session().raw_cube_string().unwrap();
            let centers: String = raw.chars().skip(4).step_by(9).collect();
            assert_eq!(centers, "YOGWRB");
        }
    }

    #[test]
    fn expected_sides_follow_the_session() {
        let scanner = scanner(ScannerConfig::default());
        use CubeColor::*;
        assert_eq!(scanner.expected_sides(), Some([Green, Orange, Blue, Red]));
        scanner.commit_next_face().unwrap();
        assert_eq!(scanner.expected_sides(), Some([White, Blue, Yellow, Green]));
    }

    #[test]
    fn solver_input_requires_every_face() {
        let scanner = scanner(ScannerConfig::default());
        scanner.commit_next_face().unwrap();
        assert_eq!(
            scanner.solver_input(),
            Err(ScanError::Incomplete { committed: 1 })
        );
    }

    #[test]
    fn rollback_and_reset_walk_the_session_back() {
        let scanner = scanner(ScannerConfig::default());
        assert_eq!(scanner.rollback_face(), Ok(ScanState::Scanning(0)));
        scanner.commit_next_face().unwrap();
        scanner.commit_next_face().unwrap();
        assert_eq!(scanner.progress_percent(), 33);
        assert_eq!(scanner.rollback_face(), Ok(ScanState::Scanning(1)));
        scanner.reset().unwrap();
        assert_eq!(scanner.state(), ScanState::Scanning(0));
    }

    #[rstest]
    #[case(SmoothingPolicy::PerSession, false)]
    #[case(SmoothingPolicy::PerFace, true)]
    fn commit_clears_smoothing_only_per_face(
        #[case] policy: SmoothingPolicy,
        #[case] cleared: bool,
    ) {
        let scanner = scanner(ScannerConfig {
            smoothing_policy: policy,
            ..Default::default()
        });
        scanner.commit_next_face().unwrap();
        assert_eq!(scanner.smoothing_reset.load(Ordering::Acquire), cleared);
    }

    #[rstest]
    #[case(SmoothingPolicy::PerSession)]
    #[case(SmoothingPolicy::PerFace)]
    fn reset_clears_smoothing_under_both_policies(#[case] policy: SmoothingPolicy) {
        let scanner = scanner(ScannerConfig {
            smoothing_policy: policy,
            ..Default::default()
        });
        scanner.reset().unwrap();
        assert!(scanner.smoothing_reset.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn frames_pushed_through_the_worker_reach_commit() {
        let scanner = scanner(ScannerConfig::default());
        let (feed, worker) = scanner.start::<RgbaFrame>();
        let mut face = FaceGrid::uniform(CubeColor::Green);
        face.set(0, 0, CubeColor::Blue);
        feed.push(frame_showing(&face, 90, 90));
        worker.wait_for_frames(1).await;

        scanner.commit_next_face().unwrap();
        assert_eq!(scanner.session().committed_faces(), ["BGGGYGGGG".to_string()]);
    }

    #[tokio::test]
    async fn mutations_are_refused_while_a_solve_is_in_flight() {
        let scanner = scanner(ScannerConfig::default());
        for color in CubeColor::ALL {
            scanner.grid.replace(FaceGrid::uniform(color));
            scanner.commit_next_face().unwrap();
        }

        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let solver: Arc<dyn CubeSolver> = Arc::new(move |_: &str| -> SolverReply {
            let _ = release_rx.lock().unwrap().recv();
            Ok("U".to_string())
        });

        let background = scanner.clone();
        let solving = tokio::spawn(async move { background.solve(solver).await });
        while !scanner.is_solving() {
            tokio::task::yield_now().await;
        }

        assert_eq!(scanner.reset(), Err(ScanError::SolveInFlight));
        assert_eq!(scanner.rollback_face(), Err(ScanError::SolveInFlight));
        assert_eq!(
            scanner.commit_face(CubeColor::Yellow),
            Err(ScanError::SolveInFlight)
        );

        release_tx.send(()).unwrap();
        let outcome = solving.await.unwrap().unwrap();
        assert!(outcome.is_solved());
        assert!(!scanner.is_solving());
        assert_eq!(scanner.state(), ScanState::Scanning(0));
    }

    #[tokio::test]
    async fn unbalanced_cube_is_rejected_without_calling_the_solver() {
        let scanner = scanner(ScannerConfig::default());
        for _ in 0..6 {
            scanner.grid.replace(FaceGrid::uniform(CubeColor::Red));
            scanner.commit_next_face().unwrap();
        }
        let solver: Arc<dyn CubeSolver> =
            Arc::new(|_: &str| -> SolverReply { panic!("solver must not be called") });

        let outcome = scanner.solve(solver).await.unwrap();
        assert_eq!(
            outcome,
            SolveOutcome::Rejected {
                code: -1,
                message: "There are not exactly nine facelets of each color"
            }
        );
        assert_eq!(scanner.state(), ScanState::Scanning(5));
    }

    #[tokio::test]
    async fn panicking_solver_surfaces_as_task_error_and_releases_the_gate() {
        let scanner = scanner(ScannerConfig::default());
        for color in CubeColor::ALL {
            scanner.grid.replace(FaceGrid::uniform(color));
            scanner.commit_next_face().unwrap();
        }
        let solver: Arc<dyn CubeSolver> =
            Arc::new(|_: &str| -> SolverReply { panic!("solver crashed") });

        let result = scanner.solve(solver).await;
        assert!(matches!(result, Err(ScanError::SolverTask(_))));
        assert!(!scanner.is_solving());
        assert!(scanner.session().is_complete());
    }
}
