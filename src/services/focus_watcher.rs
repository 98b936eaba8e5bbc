use crate::config::Config;
use crate::error::Result;
use crate::events::{WindowEvent, WindowInfo};
use crate::services::{FocusSource, LayoutSwitcher};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Опрашивает источник фокуса и включает раскладку из правил при смене окна
pub struct FocusWatcher {
    config: Arc<Config>,
    source: Box<dyn FocusSource>,
    switcher: LayoutSwitcher,
    // None - ещё ни разу не опрашивали
    current_window: Option<Option<WindowInfo>>,
}

impl FocusWatcher {
    pub fn new(config: Arc<Config>, source: Box<dyn FocusSource>, switcher: LayoutSwitcher) -> Self {
        info!("Инициализация FocusWatcher (источник: {})", source.name());
        Self {
            config,
            source,
            switcher,
            current_window: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let period = Duration::from_millis(self.config.watch.polling_interval_ms);
        info!("FocusWatcher запущен, интервал опроса {:?}", period);

        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if let Err(e) = self.poll_once().await {
                error!("Ошибка опроса фокуса: {}", e);
            }
        }
    }

    /// Один опрос: событие, если окно сменилось
    pub async fn poll_once(&mut self) -> Result<Option<WindowEvent>> {
        let window = match self.source.active_window().await {
            Ok(window) => window,
            Err(e) if e.is_protocol() => {
                // Окно исчезло между запросами, следующий опрос увидит новое
                warn!("Окно с фокусом недоступно: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !self.is_window_changed(window.as_ref()) {
            return Ok(None);
        }

        let event = match &window {
            Some(window) => WindowEvent::focus_changed(window.clone()),
            None => WindowEvent::focus_lost(),
        };
        info!("{}", event);

        self.current_window = Some(window);
        self.handle_window_event(&event)?;
        Ok(Some(event))
    }

    fn is_window_changed(&self, new_window: Option<&WindowInfo>) -> bool {
        match (&self.current_window, new_window) {
            (None, _) => true,
            (Some(None), None) => false,
            (Some(Some(current)), Some(new)) => current.differs_from(new),
            _ => true,
        }
    }

    fn handle_window_event(&mut self, event: &WindowEvent) -> Result<()> {
        let Some(window) = &event.window else {
            return Ok(());
        };
        let Some(group) = self.config.layout_for(window) else {
            debug!("Для {} нет правила раскладки", window);
            return Ok(());
        };

        match self.switcher.apply(group) {
            Ok(true) => {
                let layout = self.switcher.describe(group);
                info!("Раскладка {} для {}", layout, window);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) if e.is_protocol() => {
                warn!("Не удалось переключить раскладку для {}: {}", window, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    pub fn switcher_mut(&mut self) -> &mut LayoutSwitcher {
        &mut self.switcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowRule;
    use crate::error::XswitchError;
    use crate::events::window::WindowEventType;
    use crate::services::focus_source::DryRunFocusSource;
    use crate::services::layout_switcher::DryRunBackend;

    fn window(id: u64, instance: &str) -> Option<WindowInfo> {
        Some(
            WindowInfo::new(format!("{} window", instance))
                .with_id(id)
                .with_instance(instance.to_string()),
        )
    }

    fn config() -> Arc<Config> {
        let mut config = Config::default();
        config.rules = vec![
            WindowRule { class: Some("^xterm".to_string()), layout: 0 },
            WindowRule { class: Some("^telegram".to_string()), layout: 1 },
        ];
        config.build_optimization_indexes();
        Arc::new(config)
    }

    fn watcher(windows: Vec<Option<WindowInfo>>) -> FocusWatcher {
        let backend = DryRunBackend::new(vec!["us".to_string(), "ru".to_string()]);
        FocusWatcher::new(
            config(),
            Box::new(DryRunFocusSource::with_windows(windows)),
            LayoutSwitcher::new(Box::new(backend), vec![]),
        )
    }

    #[tokio::test]
    async fn focus_change_applies_rule() {
        let mut watcher = watcher(vec![window(10, "telegram"), window(11, "xterm")]);

        let event = watcher.poll_once().await.unwrap().unwrap();
        assert_eq!(event.event_type, WindowEventType::FocusChanged);
        assert_eq!(watcher.switcher_mut().current().unwrap(), 1);

        watcher.poll_once().await.unwrap().unwrap();
        assert_eq!(watcher.switcher_mut().current().unwrap(), 0);
    }

    #[tokio::test]
    async fn same_window_emits_nothing() {
        let mut watcher = watcher(vec![window(10, "telegram")]);
        assert!(watcher.poll_once().await.unwrap().is_some());
        assert!(watcher.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lost_focus_is_reported_once() {
        let mut watcher = watcher(vec![None]);
        let event = watcher.poll_once().await.unwrap().unwrap();
        assert_eq!(event.event_type, WindowEventType::FocusLost);
        assert!(watcher.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn window_without_rule_keeps_layout() {
        let mut watcher = watcher(vec![window(10, "telegram"), window(12, "firefox")]);
        watcher.poll_once().await.unwrap();
        watcher.poll_once().await.unwrap();
        assert_eq!(watcher.switcher_mut().current().unwrap(), 1);
    }

    struct VanishingWindow;

    #[async_trait::async_trait]
    impl FocusSource for VanishingWindow {
        async fn active_window(&mut self) -> Result<Option<WindowInfo>> {
            XswitchError::protocol("XGetClassHint")
        }

        fn name(&self) -> &'static str {
            "vanishing"
        }
    }

    #[tokio::test]
    async fn protocol_error_does_not_stop_polling() {
        let backend = DryRunBackend::new(vec!["us".to_string()]);
        let mut watcher = FocusWatcher::new(
            config(),
            Box::new(VanishingWindow),
            LayoutSwitcher::new(Box::new(backend), vec![]),
        );
        assert!(watcher.poll_once().await.unwrap().is_none());
        assert!(watcher.poll_once().await.unwrap().is_none());
    }
}
