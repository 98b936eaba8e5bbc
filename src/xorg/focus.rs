//! Окно с фокусом ввода и его WM_CLASS.

use super::display::XDisplay;
use crate::error::Result;
use crate::events::WindowInfo;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use tracing::debug;
use x11::xlib as x;

/// XGetInputFocus возвращает None (0) или PointerRoot (1), когда фокуса нет
const POINTER_ROOT: x::Window = 1;

pub fn focused_window(display: &XDisplay) -> Result<Option<WindowInfo>> {
    let mut focus: x::Window = 0;
    let mut revert_to: c_int = 0;
    display.checked("XGetInputFocus", |d| unsafe {
        x::XGetInputFocus(d, &mut focus, &mut revert_to)
    })?;

    if focus <= POINTER_ROOT {
        return Ok(None);
    }

    // Ошибка на самом окне фокуса значит, что оно исчезло: отдаём её наверх.
    let mut hint = class_hint(display, focus)?.map(|h| (focus, h));

    if hint.is_none() {
        let parent = parent_window(display, focus).unwrap_or(None);
        for candidate in fallback_candidates(focus, parent, display.root()) {
            match class_hint(display, candidate) {
                Ok(Some(h)) => {
                    hint = Some((candidate, h));
                    break;
                }
                Ok(None) => {}
                Err(e) => debug!("Окно 0x{:x} недоступно: {}", candidate, e),
            }
        }
    }

    let (owner, (instance, class)) = match hint {
        Some(found) => found,
        None => {
            debug!("У окна 0x{:x} нет WM_CLASS", focus);
            (focus, (String::new(), String::new()))
        }
    };
    let title = title_or_empty(owner, window_name(display, owner));

    Ok(Some(
        WindowInfo::new(title)
            .with_id(focus as u64)
            .with_instance(instance)
            .with_class(class),
    ))
}

/// Куда смотреть за WM_CLASS, если у самого окна фокуса его нет.
///
/// GTK отдаёт фокус дочернему окну, родитель которого обычно имеет id на единицу меньше.
fn fallback_candidates(focus: x::Window, parent: Option<x::Window>, root: x::Window) -> Vec<x::Window> {
    let mut candidates = Vec::with_capacity(2);
    if focus - 1 > POINTER_ROOT {
        candidates.push(focus - 1);
    }
    if let Some(parent) = parent {
        if parent != root && parent > POINTER_ROOT && !candidates.contains(&parent) {
            candidates.push(parent);
        }
    }
    candidates
}

/// Заголовок окна; без WM_NAME или при ошибке протокола - пустая строка
fn title_or_empty(window: x::Window, name: Result<Option<String>>) -> String {
    match name {
        Ok(name) => name.unwrap_or_default(),
        Err(e) => {
            debug!("Не удалось прочитать имя окна 0x{:x}: {}", window, e);
            String::new()
        }
    }
}

/// (res_name, res_class) или None, если свойства нет
fn class_hint(display: &XDisplay, window: x::Window) -> Result<Option<(String, String)>> {
    let mut hint = x::XClassHint {
        res_name: ptr::null_mut(),
        res_class: ptr::null_mut(),
    };
    let found = display.checked("XGetClassHint", |d| unsafe {
        x::XGetClassHint(d, window, &mut hint)
    });
    // SAFETY: строки выделены Xlib (или NULL), освобождаются ровно один раз.
    let (name, class) = unsafe { (take_x_string(hint.res_name), take_x_string(hint.res_class)) };

    if found? == 0 {
        return Ok(None);
    }
    Ok(Some((name.unwrap_or_default(), class.unwrap_or_default())))
}

fn window_name(display: &XDisplay, window: x::Window) -> Result<Option<String>> {
    let mut name: *mut c_char = ptr::null_mut();
    let status = display.checked("XFetchName", |d| unsafe { x::XFetchName(d, window, &mut name) });
    // SAFETY: см. class_hint
    let name = unsafe { take_x_string(name) };
    status?;
    Ok(name)
}

fn parent_window(display: &XDisplay, window: x::Window) -> Result<Option<x::Window>> {
    let mut root: x::Window = 0;
    let mut parent: x::Window = 0;
    let mut children: *mut x::Window = ptr::null_mut();
    let mut count: c_uint = 0;
    let status = display.checked("XQueryTree", |d| unsafe {
        x::XQueryTree(d, window, &mut root, &mut parent, &mut children, &mut count)
    });
    if !children.is_null() {
        // SAFETY: массив выделен Xlib
        unsafe {
            x::XFree(children as *mut _);
        }
    }
    if status? == 0 || parent == 0 {
        return Ok(None);
    }
    Ok(Some(parent))
}

unsafe fn take_x_string(raw: *mut c_char) -> Option<String> {
    if raw.is_null() {
        return None;
    }
    let value = CStr::from_ptr(raw).to_string_lossy().into_owned();
    x::XFree(raw as *mut _);
    Some(value)
}
