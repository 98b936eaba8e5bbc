use crate::error::{Result, XswitchError};
use crate::xorg::{xkb, SharedDisplay};
use tracing::{debug, info, warn};

/// XKB допускает не больше четырёх групп
pub const MAX_GROUPS: u32 = 4;

/// Где живёт текущая раскладка
pub trait LayoutBackend: Send {
    fn current(&mut self) -> Result<u32>;
    /// Зафиксировать группу, вернуть действующую после этого
    fn lock(&mut self, group: u32) -> Result<u32>;
    fn names(&mut self) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}

pub struct XkbBackend {
    display: SharedDisplay,
}

impl XkbBackend {
    pub fn new(display: SharedDisplay) -> Self {
        Self { display }
    }
}

impl LayoutBackend for XkbBackend {
    fn current(&mut self) -> Result<u32> {
        Ok(xkb::keyboard_state(&self.display.lock())?.group)
    }

    fn lock(&mut self, group: u32) -> Result<u32> {
        xkb::lock_group(&self.display.lock(), group)
    }

    fn names(&mut self) -> Result<Vec<String>> {
        xkb::layout_names(&self.display.lock())
    }

    fn name(&self) -> &'static str {
        "xkb"
    }
}

/// Раскладки в памяти для --dry-run
pub struct DryRunBackend {
    group: u32,
    names: Vec<String>,
}

impl DryRunBackend {
    pub fn new(names: Vec<String>) -> Self {
        Self { group: 0, names }
    }
}

impl LayoutBackend for DryRunBackend {
    fn current(&mut self) -> Result<u32> {
        Ok(self.group)
    }

    fn lock(&mut self, group: u32) -> Result<u32> {
        info!("Dry-run: XkbLockGroup({})", group);
        self.group = group;
        Ok(group)
    }

    fn names(&mut self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

/// Factory function to create a layout backend based on the dry_run flag
pub fn create_layout_backend(
    display: Option<SharedDisplay>,
    dry_run: bool,
) -> Result<Box<dyn LayoutBackend>> {
    if dry_run {
        return Ok(Box::new(DryRunBackend::new(vec!["us".to_string(), "ru".to_string()])));
    }
    match display {
        Some(display) => Ok(Box::new(XkbBackend::new(display))),
        None => Err(XswitchError::ServiceUnavailable(
            "нет соединения с X-дисплеем для LayoutBackend".to_string(),
        )),
    }
}

pub struct LayoutSwitcher {
    backend: Box<dyn LayoutBackend>,
    cycle: Vec<u32>,
    names: Option<Vec<String>>,
}

impl LayoutSwitcher {
    pub fn new(backend: Box<dyn LayoutBackend>, cycle: Vec<u32>) -> Self {
        info!("Инициализация LayoutSwitcher (backend: {})", backend.name());
        Self {
            backend,
            cycle,
            names: None,
        }
    }

    /// Имена раскладок; читаются один раз
    pub fn names(&mut self) -> Result<&[String]> {
        if self.names.is_none() {
            let names = self.backend.names()?;
            debug!("Известные раскладки: {:?}", names);
            self.names = Some(names);
        }
        Ok(self.names.as_deref().unwrap_or_default())
    }

    pub fn current(&mut self) -> Result<u32> {
        self.backend.current()
    }

    /// Имя группы, если оно известно
    pub fn describe(&mut self, group: u32) -> String {
        match self.names() {
            Ok(names) => match names.get(group as usize) {
                Some(name) => format!("{} ({})", group, name),
                None => group.to_string(),
            },
            Err(_) => group.to_string(),
        }
    }

    fn available(&mut self) -> Result<u32> {
        let count = self.names()?.len() as u32;
        Ok(if count == 0 { MAX_GROUPS } else { count.min(MAX_GROUPS) })
    }

    pub fn set(&mut self, group: u32) -> Result<u32> {
        let available = self.available()?;
        if group >= available {
            return Err(XswitchError::InvalidLayout {
                group,
                available: available as usize,
            });
        }

        let effective = self.backend.lock(group)?;
        if effective != group {
            warn!("Запрошена раскладка {}, но действует {}", group, effective);
        }
        Ok(effective)
    }

    /// Следующая раскладка из `layout.cycle` (или из всех известных)
    pub fn next(&mut self) -> Result<u32> {
        let candidates: Vec<u32> = if self.cycle.is_empty() {
            let count = self.names()?.len() as u32;
            if count == 0 {
                return Err(XswitchError::ServiceUnavailable(
                    "список раскладок пуст, задайте layout.cycle".to_string(),
                ));
            }
            (0..count.min(MAX_GROUPS)).collect()
        } else {
            self.cycle.clone()
        };

        let current = self.current()?;
        let next = match candidates.iter().position(|g| *g == current) {
            Some(pos) => candidates[(pos + 1) % candidates.len()],
            None => candidates[0],
        };
        debug!("Переключение раскладки {} -> {}", current, next);
        self.set(next)
    }

    /// Включить группу, если она ещё не включена. Возвращает true, если переключили.
    pub fn apply(&mut self, group: u32) -> Result<bool> {
        if self.current()? == group {
            return Ok(false);
        }
        self.set(group)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switcher(names: &[&str], cycle: Vec<u32>) -> LayoutSwitcher {
        let names = names.iter().map(|n| n.to_string()).collect();
        LayoutSwitcher::new(Box::new(DryRunBackend::new(names)), cycle)
    }

    #[test]
    fn set_validates_against_known_layouts() {
        let mut sw = switcher(&["us", "ru"], vec![]);
        assert_eq!(sw.set(1).unwrap(), 1);
        assert_eq!(sw.current().unwrap(), 1);

        match sw.set(2) {
            Err(XswitchError::InvalidLayout { group, available }) => {
                assert_eq!(group, 2);
                assert_eq!(available, 2);
            }
            other => panic!("ожидалась InvalidLayout, получено {:?}", other),
        }
        assert_eq!(sw.current().unwrap(), 1);
    }

    #[test]
    fn set_without_names_allows_xkb_groups() {
        let mut sw = switcher(&[], vec![]);
        assert_eq!(sw.set(3).unwrap(), 3);
        assert!(sw.set(MAX_GROUPS).is_err());
    }

    #[test]
    fn next_cycles_all_known_layouts() {
        let mut sw = switcher(&["us", "ru", "ua"], vec![]);
        assert_eq!(sw.next().unwrap(), 1);
        assert_eq!(sw.next().unwrap(), 2);
        assert_eq!(sw.next().unwrap(), 0);
    }

    #[test]
    fn next_follows_configured_cycle() {
        let mut sw = switcher(&["us", "de", "ru"], vec![0, 2]);
        assert_eq!(sw.next().unwrap(), 2);
        assert_eq!(sw.next().unwrap(), 0);

        // текущая группа вне цикла - начинаем с первой
        sw.set(1).unwrap();
        assert_eq!(sw.next().unwrap(), 0);
    }

    #[test]
    fn next_without_layouts_fails() {
        let mut sw = switcher(&[], vec![]);
        assert!(sw.next().is_err());
    }

    #[test]
    fn apply_skips_current_group() {
        let mut sw = switcher(&["us", "ru"], vec![]);
        assert!(!sw.apply(0).unwrap());
        assert!(sw.apply(1).unwrap());
        assert!(!sw.apply(1).unwrap());
    }

    #[test]
    fn describe_uses_names() {
        let mut sw = switcher(&["us", "ru"], vec![]);
        assert_eq!(sw.describe(1), "1 (ru)");
        assert_eq!(sw.describe(3), "3");
    }
}
