//! Terminal presentation layer
//!
//! Renders the three modes and reflects the session state:
//! - `App`: the input loop and slash commands
//! - `state`: tabs and the document / picture panels

pub mod app;
pub mod state;

pub use app::{App, Control};
pub use state::{DocumentPanel, ImagePanel, SelectedImage, Tab};
