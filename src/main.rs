use anyhow::Result;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;
mod xorg;

use config::Config;
use services::{create_focus_source, create_layout_backend, FocusWatcher, LayoutSwitcher};
use xorg::{SharedDisplay, XDisplay};

#[derive(Parser, Debug)]
#[command(name = "xswitch")]
#[command(about = "Помощник раскладки клавиатуры для X.Org")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "xswitch.toml")]
    config: String,

    /// Режим сухого запуска (без X-сервера)
    #[arg(long)]
    dry_run: bool,

    /// Директива логирования (по умолчанию logging.filter или xswitch={logging.level})
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Показать окно с фокусом ввода
    Focus,
    /// Показать или сменить раскладку
    Layout {
        /// Включить группу XKB с этим номером
        #[arg(long, conflicts_with = "next")]
        set: Option<u32>,

        /// Включить следующую раскладку из layout.cycle
        #[arg(long)]
        next: bool,
    },
    /// Показать группу XKB и lock-модификаторы
    State,
    /// Следить за фокусом и включать раскладку по правилам
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Конфигурация нужна до логирования: из неё берутся уровень и формат
    let config = Arc::new(Config::load(&args.config)?);

    let directive = args.log_level.clone().unwrap_or_else(|| config.log_directive());
    init_tracing(&directive, &config.logging.format)?;

    info!("Запуск xswitch v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let display = if args.dry_run {
        warn!("Режим сухого запуска - X-сервер не используется");
        None
    } else {
        utils::check_session(config.display.name.as_deref())?;
        let display = XDisplay::open(config.display.name.as_deref())?;
        Some(Arc::new(Mutex::new(display)))
    };

    match args.command {
        Command::Focus => print_focus(display, args.dry_run).await?,
        Command::Layout { set, next } => {
            let mut switcher = layout_switcher(&config, display, args.dry_run)?;
            let group = match (set, next) {
                (Some(group), _) => switcher.set(group)?,
                (None, true) => switcher.next()?,
                (None, false) => switcher.current()?,
            };
            println!("{}", switcher.describe(group));
        }
        Command::State => print_state(&config, display, args.dry_run)?,
        Command::Watch => watch(config, display, args.dry_run).await?,
    }

    Ok(())
}

fn layout_switcher(config: &Config, display: Option<SharedDisplay>, dry_run: bool) -> Result<LayoutSwitcher> {
    let backend = create_layout_backend(display, dry_run)?;
    Ok(LayoutSwitcher::new(backend, config.layout.cycle.clone()))
}

async fn print_focus(display: Option<SharedDisplay>, dry_run: bool) -> Result<()> {
    let mut source = create_focus_source(display, dry_run)?;
    match source.active_window().await? {
        Some(window) => println!("{}", window),
        None => println!("нет окна с фокусом"),
    }
    Ok(())
}

fn print_state(config: &Config, display: Option<SharedDisplay>, dry_run: bool) -> Result<()> {
    let Some(display) = display else {
        let mut switcher = layout_switcher(config, None, dry_run)?;
        let group = switcher.current()?;
        println!("группа: {}", switcher.describe(group));
        return Ok(());
    };

    let state = xorg::xkb::keyboard_state(&display.lock())?;
    let mut switcher = layout_switcher(config, Some(display), dry_run)?;
    println!("группа: {}", switcher.describe(state.group));
    println!("зафиксированная группа: {}", switcher.describe(state.locked_group));
    println!("caps lock: {}", if state.caps_lock() { "вкл" } else { "выкл" });
    println!("num lock: {}", if state.num_lock() { "вкл" } else { "выкл" });
    Ok(())
}

async fn watch(config: Arc<Config>, display: Option<SharedDisplay>, dry_run: bool) -> Result<()> {
    let source = create_focus_source(display.clone(), dry_run)?;
    let switcher = layout_switcher(&config, display, dry_run)?;
    let watcher = FocusWatcher::new(config.clone(), source, switcher);

    info!("Правил раскладки: {}", config.rules.len());

    let watch_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            error!("Ошибка в FocusWatcher: {}", e);
        }
    });

    // Ожидание сигнала завершения
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
        }
    }

    info!("Завершение работы...");
    watch_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, watch_handle).await {
        Ok(_) => info!("FocusWatcher завершил работу"),
        Err(_) => warn!("Таймаут при завершении FocusWatcher"),
    }

    if xorg::error_trap::unrouted_status().take() {
        warn!("Были ошибки X11 на незарегистрированных соединениях");
    }

    Ok(())
}

fn init_tracing(filter: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))?;

    let registry = tracing_subscriber::registry().with(filter);
    if format == "pretty" {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
