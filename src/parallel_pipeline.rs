// THEORY:
// The parallel pipeline moves frame analysis off the caller's path. A camera
// produces frames faster than anyone needs them, and a stale frame is worth
// nothing, so frames are not queued: the feed is a `watch` channel that only
// ever holds the most recent frame. A frame that arrives while the worker is
// busy simply replaces the one waiting behind it.
//
// Key architectural principles:
// 1.  **Single worker**: exactly one task owns the `FrameAnalyzer`, so the
//     smoothing memory is never touched by two analyses at once and frame N+1
//     is only analyzed after frame N has finished.
// 2.  **Sole writer**: the worker is the only writer of the `SharedFaceGrid`
//     and replaces the whole snapshot in one step.
// 3.  **Out-of-band reset**: the rest of the system never reaches into the
//     analyzer. It raises a flag and the worker clears its smoothing memory
//     before the next frame.
// 4.  **Lifecycle by ownership**: dropping the `FrameFeed` ends the worker.

use crate::core_modules::chunk::chunk::FeatureSource;
use crate::core_modules::grid_manager::{FrameAnalyzer, SharedFaceGrid};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The producer side of the latest-wins frame stream.
pub struct FrameFeed<F> {
    sender: watch::Sender<Option<Arc<F>>>,
}

impl<F> FrameFeed<F>
where
    F: FeatureSource + Send + Sync + 'static,
{
    /// Offers a frame to the worker, replacing any frame it has not picked up yet.
    /// Returns `false` once the worker has stopped.
    pub fn push(&self, frame: F) -> bool {
        self.sender.send(Some(Arc::new(frame))).is_ok()
    }

    /// Forwards every frame of `frames` into the feed until the stream ends or
    /// the worker stops. Returns how many frames were offered.
    pub async fn pump<S>(&self, frames: S) -> usize
    where
        S: Stream<Item = F>,
    {
        let mut frames = std::pin::pin!(frames);
        let mut offered = 0;
        while let Some(frame) = frames.next().await {
            if !self.push(frame) {
                break;
            }
            offered += 1;
            // Let the worker run between frames of a fast stream.
            tokio::task::yield_now().await;
        }
        offered
    }
}

/// Handle to the running analysis task.
pub struct AnalysisWorker {
    handle: JoinHandle<()>,
    analyzed: watch::Receiver<u64>,
}

impl AnalysisWorker {
    /// Number of frames analyzed so far.
    pub fn frames_analyzed(&self) -> u64 {
        *self.analyzed.borrow()
    }

    /// Waits until at least `count` frames have been analyzed.
    /// Returns the final count if the worker stops first.
    pub async fn wait_for_frames(&self, count: u64) -> u64 {
        let mut analyzed = self.analyzed.clone();
        let reached = analyzed
            .wait_for(|done| *done >= count)
            .await
            .map(|done| *done);
        match reached {
            Ok(done) => done,
            Err(_) => *analyzed.borrow(),
        }
    }

    /// Waits for the worker to finish; it finishes once its `FrameFeed` is dropped.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            debug!(error = %e, "analysis worker ended abnormally");
        }
    }
}

/// Spawns the single analysis worker on the current tokio runtime.
pub fn spawn_analysis_worker<F>(
    mut analyzer: FrameAnalyzer,
    grid: SharedFaceGrid,
    smoothing_reset: Arc<AtomicBool>,
) -> (FrameFeed<F>, AnalysisWorker)
where
    F: FeatureSource + Send + Sync + 'static,
{
    let (sender, mut receiver) = watch::channel::<Option<Arc<F>>>(None);
    let (analyzed_sender, analyzed) = watch::channel(0u64);

    let handle = tokio::spawn(async move {
        let mut frames_done = 0u64;
        while receiver.changed().await.is_ok() {
            let Some(frame) = receiver.borrow_and_update().clone() else {
                continue;
            };

            if smoothing_reset.swap(false, Ordering::AcqRel) {
                analyzer.clear_smoothing();
                debug!("smoothing memory cleared");
            }

            let face = analyzer.analyze(frame.as_ref());
            grid.replace(face);

            frames_done += 1;
            analyzed_sender.send_replace(frames_done);
            trace!(frames_done, "frame analyzed");
        }
        debug!(frames_done, "frame feed closed, analysis worker stopping");
    });

    (FrameFeed { sender }, AnalysisWorker { handle, analyzed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::chunk::chunk::RgbaFrame;
    use crate::core_modules::grid_manager::FaceGrid;
    use crate::core_modules::grid_manager::tests::frame_showing;
    use crate::core_modules::palette::CubeColor;

    fn uniform_frame(color: CubeColor) -> RgbaFrame {
        frame_showing(&FaceGrid::uniform(color), 60, 60)
    }

    fn worker() -> (FrameFeed<RgbaFrame>, AnalysisWorker, SharedFaceGrid, Arc<AtomicBool>) {
        let grid = SharedFaceGrid::default();
        let reset = Arc::new(AtomicBool::new(false));
        let (feed, worker) =
            spawn_analysis_worker(FrameAnalyzer::default(), grid.clone(), reset.clone());
        (feed, worker, grid, reset)
    }

    #[tokio::test]
    async fn worker_publishes_the_analyzed_grid() {
        let (feed, worker, grid, _) = worker();
        assert!(feed.push(uniform_frame(CubeColor::Green)));
        worker.wait_for_frames(1).await;
        assert_eq!(grid.snapshot(), FaceGrid::uniform(CubeColor::Green));
    }

    #[tokio::test]
    async fn only_the_latest_frame_is_analyzed() {
        let (feed, worker, grid, _) = worker();
        // The worker cannot run until this task yields, so the first two frames are superseded.
        feed.push(uniform_frame(CubeColor::Red));
        feed.push(uniform_frame(CubeColor::Green));
        feed.push(uniform_frame(CubeColor::Blue));
        assert_eq!(worker.wait_for_frames(1).await, 1);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(worker.frames_analyzed(), 1);
        assert_eq!(grid.snapshot(), FaceGrid::uniform(CubeColor::Blue));
    }

    #[tokio::test]
    async fn reset_flag_clears_smoothing_before_next_frame() {
        let grid = SharedFaceGrid::default();
        let reset = Arc::new(AtomicBool::new(false));
        let analyzer = FrameAnalyzer::new(Default::default(), 0.1, 0.8);
        let (feed, worker) = spawn_analysis_worker(analyzer, grid.clone(), reset.clone());

        feed.push(uniform_frame(CubeColor::Blue));
        worker.wait_for_frames(1).await;

        // With alpha 0.1 a single white frame would not flip Blue without the reset.
        reset.store(true, Ordering::Release);
        feed.push(uniform_frame(CubeColor::White));
        worker.wait_for_frames(2).await;
        assert_eq!(grid.snapshot(), FaceGrid::uniform(CubeColor::White));
        assert!(!reset.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn pump_forwards_a_stream_and_dropping_the_feed_stops_the_worker() {
        let (feed, worker, grid, _) = worker();
        let frames = futures::stream::iter(vec![
            uniform_frame(CubeColor::Orange),
            uniform_frame(CubeColor::Yellow),
        ]);
        assert_eq!(feed.pump(frames).await, 2);
        drop(feed);
        worker.join().await;
        assert_eq!(grid.snapshot(), FaceGrid::uniform(CubeColor::Yellow));
    }
}
