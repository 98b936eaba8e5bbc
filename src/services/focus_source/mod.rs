//! FocusSource: responsibility and boundaries
//!
//! This module answers one question: which window currently has the input focus.
//! It MUST NOT decide anything about layouts; the FocusWatcher turns answers into
//! WindowEvent(s) and the LayoutSwitcher acts on them.

mod dry_run;
mod xlib;
mod r#trait;

pub use self::dry_run::DryRunFocusSource;
pub use self::r#trait::{create_focus_source, FocusSource};
pub use self::xlib::XlibFocusSource;
