pub mod focus_source;
pub mod focus_watcher;
pub mod layout_switcher;

pub use focus_source::{create_focus_source, FocusSource};
pub use focus_watcher::FocusWatcher;
pub use layout_switcher::{create_layout_backend, LayoutSwitcher};
