pub mod background;
pub mod camera;
pub mod material;
pub mod preview;

pub use preview::PreviewRenderer;
