use crate::error::{Result, XswitchError};
use crate::events::WindowInfo;
use crate::xorg::SharedDisplay;

/// Trait for sources of the currently focused window
#[async_trait::async_trait]
pub trait FocusSource: Send {
    /// Focused window, or None when nothing has the focus
    async fn active_window(&mut self) -> Result<Option<WindowInfo>>;

    fn name(&self) -> &'static str;
}

/// Factory function to create an appropriate focus source based on the dry_run flag
pub fn create_focus_source(
    display: Option<SharedDisplay>,
    dry_run: bool,
) -> Result<Box<dyn FocusSource>> {
    if dry_run {
        return Ok(Box::new(super::DryRunFocusSource::new()));
    }
    match display {
        Some(display) => Ok(Box::new(super::XlibFocusSource::new(display))),
        None => Err(XswitchError::ServiceUnavailable(
            "нет соединения с X-дисплеем для FocusSource".to_string(),
        )),
    }
}
