use super::r#trait::FocusSource;
use crate::error::Result;
use crate::events::WindowInfo;
use crate::xorg::{self, SharedDisplay};

/// Фокус через XGetInputFocus + WM_CLASS
pub struct XlibFocusSource {
    display: SharedDisplay,
}

impl XlibFocusSource {
    pub fn new(display: SharedDisplay) -> Self {
        Self { display }
    }
}

#[async_trait::async_trait]
impl FocusSource for XlibFocusSource {
    async fn active_window(&mut self) -> Result<Option<WindowInfo>> {
        let display = self.display.lock();
        xorg::focused_window(&display)
    }

    fn name(&self) -> &'static str {
        "xlib"
    }
}
