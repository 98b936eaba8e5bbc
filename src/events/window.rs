use serde::{Deserialize, Serialize};
use std::fmt;

/// Информация об окне с фокусом ввода
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: u64,
    pub title: String,
    /// `res_class` из WM_CLASS
    pub class: String,
    /// `res_name` из WM_CLASS
    pub instance: String,
}

impl WindowInfo {
    pub fn new(title: String) -> Self {
        Self {
            id: 0,
            title,
            class: String::new(),
            instance: String::new(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_instance(mut self, instance: String) -> Self {
        self.instance = instance;
        self
    }

    /// Сменилось ли окно с точки зрения наблюдателя фокуса
    pub fn differs_from(&self, other: &WindowInfo) -> bool {
        self.id != other.id || self.class != other.class || self.title != other.title
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x} \"{}\"", self.id, self.title)?;
        match (self.instance.is_empty(), self.class.is_empty()) {
            (true, true) => Ok(()),
            (false, true) => write!(f, " ({})", self.instance),
            (true, false) => write!(f, " ({})", self.class),
            (false, false) => write!(f, " ({}.{})", self.instance, self.class),
        }
    }
}

/// Событие смены активного окна
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub window: Option<WindowInfo>,
    pub event_type: WindowEventType,
}

impl WindowEvent {
    pub fn new(window: Option<WindowInfo>, event_type: WindowEventType) -> Self {
        Self {
            window,
            event_type,
        }
    }

    pub fn focus_changed(window: WindowInfo) -> Self {
        Self::new(Some(window), WindowEventType::FocusChanged)
    }

    pub fn focus_lost() -> Self {
        Self::new(None, WindowEventType::FocusLost)
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "{:?}: {}", self.event_type, window),
            None => write!(f, "{:?}", self.event_type),
        }
    }
}

/// Тип события окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowEventType {
    FocusChanged,
    /// Фокус ни на одном окне (None или PointerRoot)
    FocusLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_creation() {
        let window = WindowInfo::new("Test Window".to_string())
            .with_id(0x3a00007)
            .with_class("Firefox".to_string())
            .with_instance("Navigator".to_string());

        assert_eq!(window.title, "Test Window");
        assert_eq!(window.class, "Firefox");
        assert_eq!(window.instance, "Navigator");
        assert_eq!(window.to_string(), "0x3a00007 \"Test Window\" (Navigator.Firefox)");
    }

    #[test]
    fn test_window_change_detection() {
        let a = WindowInfo::new("a".to_string()).with_id(1);
        assert!(!a.differs_from(&a.clone()));
        assert!(a.differs_from(&a.clone().with_id(2)));
        assert!(a.differs_from(&WindowInfo::new("b".to_string()).with_id(1)));
    }

    #[test]
    fn test_window_event_creation() {
        let window = WindowInfo::new("Test".to_string());
        let event = WindowEvent::focus_changed(window.clone());

        assert_eq!(event.window, Some(window));
        assert_eq!(event.event_type, WindowEventType::FocusChanged);
        assert_eq!(WindowEvent::focus_lost().event_type, WindowEventType::FocusLost);
    }
}
