//! Состояние XKB основной клавиатуры: текущая группа (раскладка) и модификаторы.

use super::display::XDisplay;
use crate::error::{Result, XswitchError};
use std::os::raw::{c_int, c_uchar, c_uint, c_ulong, c_ushort};
use std::ptr;
use tracing::debug;
use x11::xlib as x;

const XKB_USE_CORE_KBD: c_uint = 0x0100;
const LOCK_MASK: u8 = 1 << 1;
const MOD2_MASK: u8 = 1 << 4;
const RULES_NAMES_ATOM: &[u8] = b"_XKB_RULES_NAMES\0";

#[repr(C)]
#[allow(dead_code)]
#[derive(Debug, Default, Clone, Copy)]
struct XkbStateRec {
    group: c_uchar,
    locked_group: c_uchar,
    base_group: c_ushort,
    latched_group: c_ushort,
    mods: c_uchar,
    base_mods: c_uchar,
    latched_mods: c_uchar,
    locked_mods: c_uchar,
    compat_state: c_uchar,
    grab_mods: c_uchar,
    compat_grab_mods: c_uchar,
    lookup_mods: c_uchar,
    compat_lookup_mods: c_uchar,
    ptr_buttons: c_ushort,
}

#[link(name = "X11")]
extern "C" {
    fn XkbGetState(display: *mut x::Display, device_spec: c_uint, state: *mut XkbStateRec) -> c_int;
    fn XkbLockGroup(display: *mut x::Display, device_spec: c_uint, group: c_uint) -> c_int;
}

/// Снимок состояния клавиатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pub group: u32,
    pub locked_group: u32,
    pub mods: u8,
}

impl KeyboardState {
    pub fn caps_lock(&self) -> bool {
        self.mods & LOCK_MASK != 0
    }

    pub fn num_lock(&self) -> bool {
        self.mods & MOD2_MASK != 0
    }
}

impl From<XkbStateRec> for KeyboardState {
    fn from(rec: XkbStateRec) -> Self {
        Self {
            group: rec.group as u32,
            locked_group: rec.locked_group as u32,
            mods: rec.mods,
        }
    }
}

pub fn keyboard_state(display: &XDisplay) -> Result<KeyboardState> {
    let mut rec = XkbStateRec::default();
    let status = display.checked("XkbGetState", |d| unsafe {
        XkbGetState(d, XKB_USE_CORE_KBD, &mut rec)
    })?;
    if status != 0 {
        return Err(XswitchError::ServiceUnavailable(format!(
            "XkbGetState вернул {} (нет расширения XKB?)",
            status
        )));
    }
    Ok(rec.into())
}

/// Зафиксировать группу и вернуть группу, которая действует после этого
pub fn lock_group(display: &XDisplay, group: u32) -> Result<u32> {
    let sent = display.checked("XkbLockGroup", |d| unsafe {
        XkbLockGroup(d, XKB_USE_CORE_KBD, group as c_uint)
    })?;
    if sent == 0 {
        return Err(XswitchError::ServiceUnavailable("XkbLockGroup не отправлен".to_string()));
    }
    let state = keyboard_state(display)?;
    debug!("XkbLockGroup({}) -> группа {}", group, state.group);
    Ok(state.group)
}

/// Имена раскладок из свойства `_XKB_RULES_NAMES` корневого окна
pub fn layout_names(display: &XDisplay) -> Result<Vec<String>> {
    let atom = display.checked("XInternAtom", |d| unsafe {
        x::XInternAtom(d, RULES_NAMES_ATOM.as_ptr() as *const _, x::True)
    })?;
    if atom == 0 {
        return Ok(Vec::new());
    }

    let root = display.root();
    let mut actual_type: x::Atom = 0;
    let mut actual_format: c_int = 0;
    let mut nitems: c_ulong = 0;
    let mut bytes_after: c_ulong = 0;
    let mut data: *mut c_uchar = ptr::null_mut();

    let status = display.checked("XGetWindowProperty", |d| unsafe {
        x::XGetWindowProperty(
            d, root, atom, 0, 1024, x::False,
            x::AnyPropertyType as x::Atom, &mut actual_type,
            &mut actual_format, &mut nitems,
            &mut bytes_after, &mut data,
        )
    });

    let bytes = if data.is_null() {
        Vec::new()
    } else {
        // SAFETY: при формате 8 сервер вернул nitems байт, память освобождаем через XFree.
        unsafe {
            let bytes = if actual_format == 8 {
                std::slice::from_raw_parts(data, nitems as usize).to_vec()
            } else {
                Vec::new()
            };
            x::XFree(data as *mut _);
            bytes
        }
    };

    if status? != x::Success as c_int {
        return Err(XswitchError::ServiceUnavailable(
            "XGetWindowProperty(_XKB_RULES_NAMES) не удался".to_string(),
        ));
    }
    Ok(parse_rules_names(&bytes))
}

/// Разобрать `rules\0model\0layouts\0variants\0options` и вернуть список раскладок
pub fn parse_rules_names(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|b| *b == 0)
        .nth(2)
        .map(|layouts| {
            String::from_utf8_lossy(layouts)
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
