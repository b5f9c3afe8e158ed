pub mod chunk;
pub mod classifier;
pub mod grid_manager;
pub mod notation;
pub mod palette;
pub mod pixel;
pub mod scan_session;
pub mod smoother;
pub mod solve;
