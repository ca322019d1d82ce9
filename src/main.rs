mod app;
mod event;
mod ui;

/// Version injected at compile time via CAREDESK_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CAREDESK_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use app::App;
use caredesk::config::Config;
use clap::{Parser, ValueEnum};
use crossterm::{
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use ui::splash::{render as render_splash, SplashState};

/// Terminal UI for a healthcare directory backend
#[derive(Parser, Debug)]
#[command(name = "caredesk", version, about, long_about = None)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8090/
    #[arg(short, long)]
    base_url: Option<String>,

    /// Resource to open first (clinics, orders, ...)
    #[arg(short, long)]
    resource: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Keep records in memory instead of talking to a backend
    #[arg(long)]
    offline: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("caredesk started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("caredesk").join("caredesk.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".caredesk").join("caredesk.log");
    }
    PathBuf::from("caredesk.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = initialize_with_splash(&mut terminal, &args).await;

    match result {
        Ok(Some(mut app)) => {
            let run_result = run_app(&mut terminal, &mut app);
            cleanup_terminal(&mut terminal)?;

            if let Err(err) = run_result {
                eprintln!("Error: {err:?}");
            }
        },
        Ok(None) => {
            cleanup_terminal(&mut terminal)?;
        },
        Err(err) => {
            cleanup_terminal(&mut terminal)?;
            eprintln!("Initialization error: {err:?}");
        },
    }

    Ok(())
}

fn cleanup_terminal<B: Backend + std::io::Write>(terminal: &mut Terminal<B>) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn initialize_with_splash<B: Backend>(
    terminal: &mut Terminal<B>,
    args: &Args,
) -> Result<Option<App>>
where
    B::Error: Send + Sync + 'static,
{
    let mut splash = SplashState::new();
    terminal.draw(|f| render_splash(f, &splash))?;

    if check_abort()? {
        return Ok(None);
    }

    // Step 1: Load configuration (CLI > config > default)
    splash.set_message("Loading configuration");
    terminal.draw(|f| render_splash(f, &splash))?;

    let config = Config::load();
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.effective_base_url());
    let timeout = args
        .timeout
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.effective_timeout());
    let resource = args
        .resource
        .clone()
        .unwrap_or_else(|| config.effective_resource());

    if caredesk::resource::get_resource(&resource).is_none() {
        return Err(anyhow::anyhow!(
            "Unknown resource '{}'. Available: {}",
            resource,
            caredesk::resource::get_all_resource_keys().join(", ")
        ));
    }
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 2: Prepare the backend
    let backend = if args.offline {
        splash.set_message("Starting offline");
        app::Backend::Offline
    } else {
        splash.set_message(&format!("Connecting to {}", base_url));
        app::Backend::http(&base_url, timeout)?
    };
    terminal.draw(|f| render_splash(f, &splash))?;
    tracing::info!("Using backend {} with timeout {:?}", backend.describe(), timeout);
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 3: Fetch initial records
    splash.set_message(&format!("Fetching {}", resource));
    terminal.draw(|f| render_splash(f, &splash))?;

    let mut app = App::new(config, backend, timeout, &resource);
    app.mount_current().await?;

    splash.complete_step();
    terminal.draw(|f| render_splash(f, &splash))?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(Some(app))
}

fn check_abort() -> Result<bool> {
    if poll(Duration::from_millis(50))? {
        if let Event::Key(key) = read()? {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        app.tick();
        terminal.draw(|f| ui::render(f, app))?;

        if event::handle_events(app)? {
            tracing::info!("caredesk exiting");
            return Ok(());
        }
    }
}
