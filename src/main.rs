//! USB Device Viewer - CLI entry point.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use usbview::config::{Config, example_config, generate_config};
use usbview::devices::DevicesParser;
use usbview::logging::{self, LogTarget};
use usbview::model::DeviceKey;
use usbview::output::{device_text, render_diagnostics, render_report, render_tree};
use usbview::session::Session;
use usbview::ui::{App, render};

#[derive(Parser)]
#[command(name = "usbview")]
#[command(about = "USB device tree viewer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Devices dump to read (default: settings.devices_file)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Config file path (default: auto-detect)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the device tree
    Tree {
        /// Show serial, speed, power and endpoints
        #[arg(short, long)]
        verbose: bool,
    },

    /// Describe one device
    Show {
        /// Bus number
        bus: u8,
        /// Device number on that bus
        device: u8,
    },

    /// Generate detailed report (for sharing/debugging)
    Report,

    /// List parse warnings; exits non-zero if there are any
    Check,

    /// Print blank example config file
    InitConfig,

    /// Generate config from current system
    GenerateConfig {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions early (doesn't need config or the dump)
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "usbview", &mut std::io::stdout());
        return Ok(());
    }

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    if let Some(Commands::InitConfig) = &cli.command {
        print!("{}", example_config());
        return Ok(());
    }

    // The TUI owns the terminal, so its logs go nowhere.
    let target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::Sink
    };
    logging::init(cli.verbose, &config.settings.log_level, target)?;
    // Logged here because the subscriber needs the configured level first.
    match &config.source {
        Some(source) => debug!(path = %source.display(), "loaded configuration"),
        None => debug!("no configuration file found; using defaults"),
    }

    let path = cli
        .file
        .clone()
        .unwrap_or_else(|| config.settings.devices_file.clone());
    debug!("reading {}", path.display());
    let parser = DevicesParser::with_path(&path).with_limits(config.limits);
    let mut session = Session::new(parser);

    let Some(command) = cli.command else {
        // Default: run TUI
        return run_tui(session, config);
    };

    let report = session.reload()?;

    match command {
        Commands::Tree { verbose } => {
            print!("{}", render_tree(&report.forest, &config, verbose));
        }
        Commands::Show { bus, device } => {
            let key = DeviceKey::new(bus, device);
            let Some(device) = report.device(key) else {
                bail!("no device {} in {}", key, path.display());
            };
            println!("{}", device_text(device, &config));
        }
        Commands::Report => {
            print!("{}", render_report(report, &config));
        }
        Commands::Check => {
            print!("{}", render_diagnostics(&report.diagnostics));
            if !report.diagnostics.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::GenerateConfig { output } => {
            let content = generate_config(&report.forest);
            match output {
                Some(path) => {
                    std::fs::write(&path, &content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("Config written to {}", path.display());
                    eprintln!("Edit the file to customize labels, then copy to one of:");
                    eprintln!("  ./usbview.toml");
                    eprintln!("  ~/.config/usbview/config.toml");
                    eprintln!("  /etc/usbview.toml");
                }
                None => print!("{}", content),
            }
        }
        Commands::InitConfig | Commands::Completions { .. } => {
            // Handled above before reading the dump
            unreachable!()
        }
    }

    Ok(())
}

fn run_tui(session: Session, config: Config) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, config);
    app.reload();

    let result = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll so expired status messages disappear
        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('j') | KeyCode::Down => {
                    app.move_selection(1);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    app.move_selection(-1);
                }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    app.toggle_expand();
                }
                KeyCode::Char('g') => {
                    app.goto_top();
                }
                KeyCode::Char('G') => {
                    app.goto_bottom();
                }
                KeyCode::Char('x') => {
                    app.toggle_expand_all();
                }
                KeyCode::Char('r') => {
                    app.reload();
                }
                KeyCode::Char('?') => {
                    app.show_help = !app.show_help;
                }
                KeyCode::Esc => {
                    if app.show_help {
                        app.show_help = false;
                    } else {
                        break;
                    }
                }
                KeyCode::PageUp | KeyCode::Char('K') => {
                    app.scroll_details(-10);
                }
                KeyCode::PageDown | KeyCode::Char('J') => {
                    app.scroll_details(10);
                }
                _ => {}
            }
        }
    }
    Ok(())
}
