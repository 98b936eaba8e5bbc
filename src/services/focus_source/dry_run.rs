use super::r#trait::FocusSource;
use crate::error::Result;
use crate::events::WindowInfo;
use tracing::info;

/// Эмуляция смены окон без X-сервера: каждый вызов возвращает следующее окно
pub struct DryRunFocusSource {
    windows: Vec<Option<WindowInfo>>,
    index: usize,
}

impl DryRunFocusSource {
    pub fn new() -> Self {
        let fake = |id: u64, title: &str, instance: &str, class: &str| {
            Some(
                WindowInfo::new(title.to_string())
                    .with_id(id)
                    .with_instance(instance.to_string())
                    .with_class(class.to_string()),
            )
        };
        Self::with_windows(vec![
            fake(0x1400003, "Terminal - dry_run", "xterm", "XTerm"),
            fake(0x2600011, "Browser - dry_run", "Navigator", "firefox"),
            None,
            fake(0x3000007, "Editor - dry_run", "code", "Code"),
        ])
    }

    pub fn with_windows(windows: Vec<Option<WindowInfo>>) -> Self {
        Self { windows, index: 0 }
    }
}

impl Default for DryRunFocusSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FocusSource for DryRunFocusSource {
    async fn active_window(&mut self) -> Result<Option<WindowInfo>> {
        if self.windows.is_empty() {
            return Ok(None);
        }
        let window = self.windows[self.index].clone();
        self.index = (self.index + 1) % self.windows.len();
        if let Some(window) = &window {
            info!("Dry-run: эмулируем фокус на: {}", window);
        }
        Ok(window)
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_cycles_windows() {
        let mut source = DryRunFocusSource::new();
        let first = source.active_window().await.unwrap().unwrap();
        assert_eq!(first.class, "XTerm");
        assert_eq!(source.active_window().await.unwrap().unwrap().class, "firefox");
        assert!(source.active_window().await.unwrap().is_none());
        source.active_window().await.unwrap();
        assert_eq!(source.active_window().await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn empty_dry_run_has_no_focus() {
        let mut source = DryRunFocusSource::with_windows(Vec::new());
        assert!(source.active_window().await.unwrap().is_none());
    }

    #[test]
    fn factory_requires_display_outside_dry_run() {
        assert!(crate::services::create_focus_source(None, false).is_err());
        let source = crate::services::create_focus_source(None, true).unwrap();
        assert_eq!(source.name(), "dry-run");
    }
}
