use super::error_trap::{self, XErrorStatus};
use crate::error::{Result, XswitchError};
use crate::xswitch_error;
use std::ffi::CString;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use tracing::{debug, info};
use x11::xlib as x;

/// Соединение с X-сервером со своим флагом ошибок протокола
pub struct XDisplay {
    raw: NonNull<x::Display>,
    status: Arc<XErrorStatus>,
    name: String,
}

// SAFETY: соединение используется из одного потока за раз (через Mutex у
// владельцев), Xlib это допускает и без XInitThreads.
unsafe impl Send for XDisplay {}

impl XDisplay {
    /// Открыть соединение. `None` - взять имя из `$DISPLAY`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let c_name = name
            .map(CString::new)
            .transpose()
            .map_err(|e| xswitch_error!(display_unavailable, "неверное имя дисплея: {}", e))?;
        let shown = name.map(str::to_string).unwrap_or_else(|| "$DISPLAY".to_string());

        error_trap::install_error_handler();

        // SAFETY: указатель на имя живёт до конца вызова, NULL допустим.
        let raw = unsafe { x::XOpenDisplay(c_name.as_ref().map_or(ptr::null(), |n| n.as_ptr())) };
        let raw = NonNull::new(raw)
            .ok_or_else(|| xswitch_error!(display_unavailable, "XOpenDisplay({}) не удался", shown))?;

        let status = Arc::new(XErrorStatus::new());
        error_trap::register(raw.as_ptr(), status.clone());
        info!("Подключено к X-дисплею {}", shown);

        Ok(Self {
            raw,
            status,
            name: shown,
        })
    }

    pub fn raw(&self) -> *mut x::Display {
        self.raw.as_ptr()
    }

    #[cfg(test)]
    pub fn status(&self) -> &Arc<XErrorStatus> {
        &self.status
    }

    pub fn root(&self) -> x::Window {
        // SAFETY: соединение открыто, пока жив self.
        unsafe { x::XDefaultRootWindow(self.raw()) }
    }

    /// Выполнить запрос и дождаться ответа сервера (`XSync`).
    ///
    /// Флаг сбрасывается до запроса и забирается после синхронизации; если за это
    /// время пришла ошибка протокола, возвращается `XswitchError::Protocol`.
    pub fn checked<T, F>(&self, request: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(*mut x::Display) -> T,
    {
        let raw = self.raw();
        let result = sync_checked(
            &self.status,
            request,
            || f(raw),
            // SAFETY: соединение открыто, пока жив self.
            || unsafe {
                x::XSync(raw, x::False);
            },
        );
        if result.is_err() {
            debug!("Ошибка протокола X11 в {} на {}", request, self.name);
        }
        result
    }
}

/// Сбросить флаг, выполнить запрос, синхронизироваться и забрать флаг
fn sync_checked<T>(
    status: &XErrorStatus,
    request: &'static str,
    call: impl FnOnce() -> T,
    sync: impl FnOnce(),
) -> Result<T> {
    status.reset();
    let out = call();
    sync();
    if status.take() {
        return XswitchError::protocol(request);
    }
    Ok(out)
}

impl Drop for XDisplay {
    fn drop(&mut self) {
        // XCloseDisplay ещё сбрасывает буфер запросов: ошибки должны дойти до нашего флага
        // SAFETY: соединение больше нигде не используется.
        unsafe {
            x::XCloseDisplay(self.raw());
        }
        error_trap::unregister(self.raw());
        if self.status.occurred() {
            debug!("Непрочитанная ошибка протокола X11 на {}", self.name);
        }
        debug!("Соединение с {} закрыто", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Заведомо несуществующее окно
    const BOGUS_WINDOW: x::Window = 0x7ff_fff1;

    #[test]
    fn stale_flag_is_cleared_before_request() {
        let status = XErrorStatus::new();
        status.raise();

        let seen = sync_checked(&status, "XGetInputFocus", || status.occurred(), || {}).unwrap();
        assert!(!seen);
        assert!(!status.occurred());
    }

    #[test]
    fn error_during_sync_becomes_protocol_error() {
        let status = XErrorStatus::new();

        let result = sync_checked(&status, "XGetClassHint", || 0, || status.raise());
        match result {
            Err(XswitchError::Protocol { request }) => assert_eq!(request, "XGetClassHint"),
            other => panic!("ожидалась Protocol, получено {:?}", other),
        }
        assert!(!status.occurred());
    }

    #[test]
    fn clean_request_returns_value() {
        let status = XErrorStatus::new();
        assert_eq!(sync_checked(&status, "XSync", || 7, || {}).unwrap(), 7);
        assert!(!status.occurred());
    }

    #[test]
    #[ignore = "нужен X-сервер ($DISPLAY)"]
    fn bad_window_is_reported_and_process_survives() {
        let display = XDisplay::open(None).unwrap();
        let mut hint = x::XClassHint {
            res_name: ptr::null_mut(),
            res_class: ptr::null_mut(),
        };

        let result = display.checked("XGetClassHint", |d| unsafe {
            x::XGetClassHint(d, BOGUS_WINDOW, &mut hint)
        });
        assert!(matches!(result, Err(XswitchError::Protocol { request: "XGetClassHint" })));
        assert!(!display.status().occurred());

        // соединение продолжает работать
        let root = display.root();
        assert!(display.checked("XDefaultRootWindow", |_| root).is_ok());
    }

    #[test]
    #[ignore = "нужен X-сервер ($DISPLAY)"]
    fn errors_flushed_on_close_stay_with_connection() {
        error_trap::unrouted_status().reset();
        let display = XDisplay::open(None).unwrap();
        let status = display.status().clone();

        // асинхронный запрос без XSync: ошибка придёт при XCloseDisplay
        unsafe {
            x::XMapWindow(display.raw(), BOGUS_WINDOW);
        }
        drop(display);

        assert!(status.occurred());
        assert!(!error_trap::unrouted_status().occurred());
    }

    #[test]
    fn open_rejects_name_with_nul() {
        let err = XDisplay::open(Some("bad\0name")).err().unwrap();
        assert!(matches!(err, XswitchError::DisplayUnavailable(_)));
    }

    #[test]
    fn open_missing_display_is_an_error() {
        let err = XDisplay::open(Some(":4242")).err().unwrap();
        assert!(matches!(err, XswitchError::DisplayUnavailable(_)));
        assert!(err.to_string().contains(":4242"));
    }
}
