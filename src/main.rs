// This file is an example of how to use the `cube_vision` library.
// The main library entry point is `src/lib.rs`.
//
// It paints six synthetic frames, one per face of a solved cube, runs them through
// the analysis worker, commits each face and hands the result to a stand-in solver.

use cube_vision::core_modules::chunk::chunk::RgbaFrame;
use cube_vision::core_modules::grid_manager::{DEFAULT_COVERAGE, ScanLayout};
use cube_vision::{CubeColor, CubeScanner, CubeSolver, ReferencePalette, ScannerConfig};
use image::{Rgba, RgbaImage};
use std::error::Error;
use std::sync::Arc;
use tracing::info;

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;

/// A camera frame showing a face whose stickers are all `color`.
fn synthetic_face(color: CubeColor) -> RgbaImage {
    let layout = ScanLayout::for_frame(FRAME_WIDTH, FRAME_HEIGHT, DEFAULT_COVERAGE);
    let face_len = layout.box_len * 3;
    let (r, g, b) = color.reference_rgb();
    RgbaImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
        let inside = (layout.start_x..layout.start_x + face_len).contains(&x)
            && (layout.start_y..layout.start_y + face_len).contains(&y);
        if inside {
            Rgba([r, g, b, 255])
        } else {
            Rgba([30, 30, 30, 255])
        }
    })
}

/// Only knows the solved cube; everything else is reported as out of reach.
fn solved_cube_only(facelets: &str) -> Result<String, i32> {
    let solved = facelets
        .as_bytes()
        .chunks(9)
        .all(|face| face.iter().all(|c| *c == face[4]));
    if solved { Ok(String::new()) } else { Err(-7) }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    println!("Cube Vision - Example Runner");

    let scanner = CubeScanner::new(ScannerConfig::default(), ReferencePalette::reference())?;
    let (feed, worker) = scanner.start::<RgbaFrame>();

    let mut frames_sent = 0;
    for color in CubeColor::ALL {
        feed.push(RgbaFrame::from(synthetic_face(color)));
        frames_sent += 1;
        worker.wait_for_frames(frames_sent).await;

        info!(preview = ?scanner.preview().rows(), "showing {}", color.name());
        let state = scanner.commit_next_face()?;
        println!("{:>3}% scanned ({:?})", scanner.progress_percent(), state);
    }

    let facelets = scanner.solver_input()?;
    println!("Solver input: {}", facelets);

    let solver: Arc<dyn CubeSolver> = Arc::new(solved_cube_only);
    let outcome = scanner.solve(solver).await?;
    println!("{}", outcome);

    drop(feed);
    worker.join().await;
    Ok(())
}
