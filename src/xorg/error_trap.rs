//! Перехват асинхронных ошибок протокола X11.
//!
//! По умолчанию Xlib печатает ошибку и завершает процесс. Обработчик из этого
//! модуля только взводит флаг `XErrorStatus` того соединения, на котором
//! пришла ошибка, и возвращает управление Xlib.
//!
//! Callback Xlib не несёт пользовательских данных, поэтому флаг ищется по
//! адресу `Display`. Ошибки с незарегистрированных соединений попадают в
//! общий `unrouted_status()`.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use x11::xlib as x;

/// Значение, которое обработчик всегда возвращает Xlib (ошибка обработана).
pub const HANDLED: c_int = 1;

/// Флаг "с момента последнего сброса пришла ошибка протокола X11".
#[derive(Debug, Default)]
pub struct XErrorStatus {
    occurred: AtomicBool,
}

impl XErrorStatus {
    pub const fn new() -> Self {
        Self {
            occurred: AtomicBool::new(false),
        }
    }

    pub fn occurred(&self) -> bool {
        self.occurred.load(Ordering::Acquire)
    }

    pub fn raise(&self) {
        self.occurred.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.occurred.store(false, Ordering::Release);
    }

    /// Прочитать и сбросить флаг одной операцией
    pub fn take(&self) -> bool {
        self.occurred.swap(false, Ordering::AcqRel)
    }
}

static ROUTES: Lazy<DashMap<usize, Arc<XErrorStatus>>> = Lazy::new(DashMap::new);
static UNROUTED: XErrorStatus = XErrorStatus::new();

/// Установить обработчик ошибок Xlib для всего процесса.
///
/// Заменяет ранее установленный обработчик; повторный вызов ничего не меняет.
pub fn install_error_handler() {
    // SAFETY: XSetErrorHandler только сохраняет указатель на функцию в глобальной
    // переменной libX11, соединение для этого не требуется.
    unsafe {
        x::XSetErrorHandler(Some(handle_error));
    }
}

/// Направлять ошибки соединения `display` в `status`
pub fn register(display: *mut x::Display, status: Arc<XErrorStatus>) {
    ROUTES.insert(display as usize, status);
}

pub fn unregister(display: *mut x::Display) {
    ROUTES.remove(&(display as usize));
}

/// Флаг для ошибок, пришедших с соединений, которые никто не зарегистрировал
pub fn unrouted_status() -> &'static XErrorStatus {
    &UNROUTED
}

/// Обработчик, который регистрирует `install_error_handler`.
///
/// Содержимое `XErrorEvent` не разбирается, `display` не разыменовывается.
pub unsafe extern "C" fn handle_error(display: *mut x::Display, _event: *mut x::XErrorEvent) -> c_int {
    match ROUTES.get(&(display as usize)) {
        Some(status) => status.raise(),
        None => UNROUTED.raise(),
    }
    HANDLED
}
