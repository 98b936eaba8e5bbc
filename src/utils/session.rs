use crate::error::Result;
use crate::xswitch_error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    X11,
    Wayland,
    Unknown,
}

impl SessionType {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("x11") => SessionType::X11,
            Some("wayland") => SessionType::Wayland,
            _ => SessionType::Unknown,
        }
    }
}

/// Проверить, что есть X-дисплей, к которому можно подключиться
pub fn check_session(configured_display: Option<&str>) -> Result<SessionType> {
    let session = SessionType::from_env_value(std::env::var("XDG_SESSION_TYPE").ok().as_deref());
    let display = std::env::var("DISPLAY").ok().filter(|d| !d.is_empty());
    check_session_with(session, configured_display, display.as_deref())
}

fn check_session_with(
    session: SessionType,
    configured_display: Option<&str>,
    env_display: Option<&str>,
) -> Result<SessionType> {
    info!("Тип сессии: {:?}", session);

    if session == SessionType::Wayland {
        warn!("Сессия Wayland: видны только окна XWayland, раскладку может перехватить композитор");
    }

    match configured_display.or(env_display) {
        Some(name) => {
            info!("Используется дисплей {}", name);
            Ok(session)
        }
        None => Err(xswitch_error!(
            display_unavailable,
            "переменная DISPLAY не задана и display.name не указан в конфигурации"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_type() {
        assert_eq!(SessionType::from_env_value(Some("x11")), SessionType::X11);
        assert_eq!(SessionType::from_env_value(Some("Wayland")), SessionType::Wayland);
        assert_eq!(SessionType::from_env_value(Some("tty")), SessionType::Unknown);
        assert_eq!(SessionType::from_env_value(None), SessionType::Unknown);
    }

    #[test]
    fn display_is_required() {
        assert!(check_session_with(SessionType::X11, None, None).is_err());
        assert!(check_session_with(SessionType::X11, None, Some(":0")).is_ok());
        assert_eq!(
            check_session_with(SessionType::Wayland, Some(":1"), None).unwrap(),
            SessionType::Wayland
        );
    }
}
