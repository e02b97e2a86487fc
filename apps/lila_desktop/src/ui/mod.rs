//! UI layer: view state, pure renderers, and the egui app shell.

pub mod app;
pub mod render;
pub mod state;

pub use app::LilaApp;
