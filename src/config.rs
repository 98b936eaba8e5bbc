use crate::events::WindowInfo;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub display: DisplayConfig,
    pub layout: LayoutConfig,
    pub watch: WatchConfig,
    #[serde(default)]
    pub rules: Vec<WindowRule>,
    // Скомпилированные регулярки правил, строятся после загрузки
    #[serde(skip)]
    rule_matchers: Vec<RuleMatcher>,
}

#[derive(Debug, Clone)]
enum RuleMatcher {
    /// Правило без `class` подходит любому окну
    Any,
    Pattern(Regex),
    /// Паттерн не компилируется (конфигурация не прошла validate)
    Never,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Директива EnvFilter; пусто - `xswitch={level}`
    #[serde(default)]
    pub filter: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Имя X-дисплея; без него используется `$DISPLAY`
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayoutConfig {
    /// Группы XKB, по которым ходит `layout --next`; пусто - все известные
    #[serde(default)]
    pub cycle: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    pub polling_interval_ms: u64,
    #[serde(default)]
    pub default_layout: Option<u32>,
}

/// Раскладка, которую нужно включить при фокусе на окне данного класса.
///
/// `class` - регулярное выражение по `res_name` или `res_class` из WM_CLASS.
/// Правило без `class` срабатывает для любого окна. Правила проверяются по порядку.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowRule {
    #[serde(default)]
    pub class: Option<String>,
    pub layout: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
                filter: String::new(),
            },
            display: DisplayConfig::default(),
            layout: LayoutConfig::default(),
            watch: WatchConfig {
                polling_interval_ms: 250,
                default_layout: None,
            },
            rules: Vec::new(),
            rule_matchers: Vec::new(),
        };
        config.build_optimization_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("XSWITCH_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_optimization_indexes();

        Ok(config)
    }

    pub fn build_optimization_indexes(&mut self) {
        self.rule_matchers = self
            .rules
            .iter()
            .map(|rule| match &rule.class {
                None => RuleMatcher::Any,
                Some(pattern) => Regex::new(pattern)
                    .map(RuleMatcher::Pattern)
                    .unwrap_or(RuleMatcher::Never),
            })
            .collect();
    }

    /// Директива для EnvFilter по умолчанию
    pub fn log_directive(&self) -> String {
        if self.logging.filter.trim().is_empty() {
            format!("xswitch={}", self.logging.level)
        } else {
            self.logging.filter.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.watch.polling_interval_ms < 50 {
            anyhow::bail!("polling_interval_ms должно быть минимум 50");
        }

        let mut seen = HashSet::new();
        for group in &self.layout.cycle {
            if !seen.insert(group) {
                anyhow::bail!("Группа {} повторяется в layout.cycle", group);
            }
        }

        for (i, rule) in self.rules.iter().enumerate() {
            let Some(pattern) = &rule.class else {
                continue;
            };
            if pattern.trim().is_empty() {
                anyhow::bail!("Пустой класс окна в правиле #{}", i + 1);
            }
            Regex::new(pattern)
                .with_context(|| format!("Неверное регулярное выражение в правиле #{}", i + 1))?;
        }

        Ok(())
    }

    /// Раскладка для окна: первое подходящее правило, иначе `watch.default_layout`
    pub fn layout_for(&self, window: &WindowInfo) -> Option<u32> {
        let unnamed = window.instance.is_empty() && window.class.is_empty();

        self.rule_matchers
            .iter()
            .zip(&self.rules)
            .find(|(matcher, _)| match matcher {
                RuleMatcher::Any => true,
                // окно без WM_CLASS подходит только правилу без class
                RuleMatcher::Pattern(_) if unnamed => false,
                RuleMatcher::Pattern(re) => re.is_match(&window.instance) || re.is_match(&window.class),
                RuleMatcher::Never => false,
            })
            .map(|(_, rule)| rule.layout)
            .or(self.watch.default_layout)
    }
}
