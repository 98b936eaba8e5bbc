pub mod window;

pub use window::{WindowEvent, WindowInfo};
