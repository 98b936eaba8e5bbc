use thiserror::Error;

#[derive(Error, Debug)]
pub enum XswitchError {
    #[error("X-дисплей недоступен: {0}")]
    DisplayUnavailable(String),

    #[error("Ошибка протокола X11 в запросе {request}")]
    Protocol { request: &'static str },

    #[error("Неверная раскладка {group} (доступно: {available})")]
    InvalidLayout { group: u32, available: usize },

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),
}

impl XswitchError {
    pub fn protocol<T>(request: &'static str) -> Result<T> {
        Err(XswitchError::Protocol { request })
    }

    /// Ошибка протокола X11 (окно исчезло и т.п.), после которой можно продолжать работу
    pub fn is_protocol(&self) -> bool {
        matches!(self, XswitchError::Protocol { .. })
    }
}

pub type Result<T> = std::result::Result<T, XswitchError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! xswitch_error {
    (display_unavailable, $($arg:tt)*) => {
        $crate::error::XswitchError::DisplayUnavailable(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::XswitchError::ServiceUnavailable(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_are_recoverable() {
        let err = XswitchError::protocol::<()>("XGetClassHint").unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("XGetClassHint"));

        let err = xswitch_error!(service_unavailable, "нет XKB на {}", ":0");
        assert!(!err.is_protocol());
        assert_eq!(err.to_string(), "Сервис недоступен: нет XKB на :0");
    }
}
