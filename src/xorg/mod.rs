//! Обёртки над Xlib: соединение, перехват ошибок протокола, фокус и XKB.

pub mod display;
pub mod error_trap;
pub mod focus;
pub mod xkb;

pub use display::XDisplay;
pub use focus::focused_window;

use parking_lot::Mutex;
use std::sync::Arc;

/// Соединение, разделяемое между сервисами
pub type SharedDisplay = Arc<Mutex<XDisplay>>;
