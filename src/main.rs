//! # Voxel Frame Engine Entry Point
//!
//! Calls into the library's `run()` function, which parses the command line and drives
//! the engine until it exits.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --graphical --frames 300
//! ```

fn main() {
    voxel_frame_engine::run();
}
