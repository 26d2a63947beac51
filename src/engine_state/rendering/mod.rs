//! # Rendering Module
//!
//! The seam between the engine and whatever graphics API draws the frame.
//!
//! ## Key Components
//! - `Graphics`: the draw-call interface the render thread talks to
//! - `Vertex`: the vertex layout shared by terrain, entities and overlay
//! - `mesher`: chunk, cube and outline mesh builders
//! - `gui`: the 2D overlay registry
//!
//! Only the thread that owns the graphics session ever calls into `Graphics`.

use winit::dpi::PhysicalSize;

use vertex::Vertex;

pub mod gui;
pub mod mesher;
pub mod vertex;

/// Pipeline state selected before a group of draw calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Static terrain chunks.
    Terrain,
    /// Entity batches.
    Entities,
    /// Line list around the targeted block.
    Highlight,
    /// 2D GUI elements.
    Overlay,
}

/// Graphics backend used by the render thread.
pub trait Graphics {
    /// Clears color and depth for a new frame.
    fn clear(&mut self);

    /// Sets the combined view-projection matrix for 3D passes.
    fn set_view_projection(&mut self, matrix: [[f32; 4]; 4]);

    fn set_render_mode(&mut self, mode: RenderMode);

    fn set_depth_test(&mut self, enabled: bool);

    fn set_complex_lighting(&mut self, enabled: bool);

    /// Uploads the vertices used by the next draw call.
    fn upload_static(&mut self, vertices: &[Vertex]);

    /// Draws `vertex_count` uploaded vertices.
    fn draw(&mut self, vertex_count: usize);

    /// Draws `index_count` indices over the uploaded vertices.
    fn draw_indexed(&mut self, index_count: usize);

    /// Adapts the framebuffer to a new window size.
    fn resize(&mut self, size: PhysicalSize<u32>);

    /// Presents the finished frame.
    fn present(&mut self);
}
