//! simterm - An interactive TCP test console for serial-device simulators
//!
//! simterm opens a TCP connection to a device simulator, prints whatever the
//! simulator sends back, fires a short scripted warm-up sequence and then
//! drops into an interactive prompt for hand-typed command lines.
//!
//! # Features
//!
//! - **Background Receiver**: incoming data is printed as it arrives
//! - **Scripted Warm-up**: a configurable command sequence (default
//!   `M105`, `M114`, `G28`) with a pause after each command
//! - **Interactive Prompt**: type commands, `quit`/`exit` to leave
//! - **Config File**: defaults read from `~/.simterm/config.toml`
//!
//! # Quick Start
//!
//! ```text
//! simterm              # Connect to localhost:8080
//! simterm -p 9100      # Different port
//! simterm -n           # Skip the scripted warm-up
//! ```

mod config;
mod console;
mod net;

use std::env;
use std::time::Duration;

use crossbeam::channel::Receiver;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config as SimtermConfig;
use crate::net::connection::{Connection, NetError};
use crate::net::session::{ScriptOutcome, Session};

/// Command line configuration
#[derive(Debug, Default)]
struct Config {
    /// Simulator host override
    host: Option<String>,
    /// Simulator port override
    port: Option<u16>,
    /// Pause after each scripted command, in milliseconds
    delay_ms: Option<u64>,
    /// Connect timeout per address, in seconds
    timeout_secs: Option<u64>,
    /// Skip the scripted command phase
    no_script: bool,
}

/// Resolved runtime settings: command line over config file over defaults
struct Settings {
    host: String,
    port: u16,
    commands: Vec<String>,
    delay: Duration,
    timeout: Duration,
    no_script: bool,
}

impl Settings {
    fn resolve(cli: &Config, file: &SimtermConfig) -> Self {
        Self {
            host: cli.host.clone().unwrap_or_else(|| file.host.clone()),
            port: cli.port.unwrap_or(file.port),
            commands: file.script.commands.clone(),
            delay: Duration::from_millis(cli.delay_ms.unwrap_or(file.script.delay_ms)),
            timeout: Duration::from_secs(cli.timeout_secs.unwrap_or(file.connect.timeout_secs)),
            no_script: cli.no_script,
        }
    }
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("simterm {}", VERSION);
}

fn print_help() {
    eprintln!("simterm {} - An interactive TCP test console for serial-device simulators", VERSION);
    eprintln!();
    eprintln!("Usage: simterm [OPTIONS]");
    eprintln!();
    eprintln!("Connection options:");
    eprintln!("  (default)             From config.toml or localhost:8080");
    eprintln!("  -H, --host <HOST>     Simulator host");
    eprintln!("  -p, --port <PORT>     Simulator TCP port");
    eprintln!("  -t, --timeout <SECS>  Connect timeout per address (default: 10)");
    eprintln!();
    eprintln!("Script options:");
    eprintln!("  -d, --delay <MS>      Pause after each scripted command (default: 1000)");
    eprintln!("  -n, --no-script       Skip the scripted commands, go straight to the prompt");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Interactive commands:");
    eprintln!("  quit, exit            End the session (case-insensitive)");
    eprintln!("  Ctrl+C                End the session");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  simterm               Connect to localhost:8080");
    eprintln!("  simterm -H 192.168.1.50 -p 9100");
    eprintln!("  simterm -n            Interactive prompt only");
    eprintln!();
    eprintln!("Configuration: ~/.simterm/config.toml");
    eprintln!();
    eprintln!("Log file: ~/.simterm/simterm.log");
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            // Connection
            "-H" | "--host" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing host argument".to_string());
                }
                config.host = Some(args[i].clone());
            }
            "-p" | "--port" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing port argument".to_string());
                }
                config.port = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid port: {}", args[i]))?,
                );
            }
            "-t" | "--timeout" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing timeout argument".to_string());
                }
                config.timeout_secs = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid timeout: {}", args[i]))?,
                );
            }
            // Script
            "-d" | "--delay" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing delay argument".to_string());
                }
                config.delay_ms = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("Invalid delay: {}", args[i]))?,
                );
            }
            "-n" | "--no-script" => {
                config.no_script = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Initialize logging to file
    let home = std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(std::path::PathBuf::from);

    let log_path = home
        .map(|h| h.join(".simterm").join("simterm.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("simterm.log"));

    // Create log directory if needed
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    info!("simterm starting...");

    // Load config file and merge: command line args override config file
    let file_config = SimtermConfig::load();
    let settings = Settings::resolve(&config, &file_config);

    info!("Target: {}:{}", settings.host, settings.port);
    info!(
        "Script: {} commands, {} ms delay, skip: {}",
        settings.commands.len(),
        settings.delay.as_millis(),
        settings.no_script
    );

    run(&settings)
}

/// Run one session and report its outcome on the console.
fn run(settings: &Settings) -> anyhow::Result<()> {
    let (_interrupt_tx, interrupts) = console::interrupt_channel()?;

    match run_session(settings, &interrupts) {
        Ok(()) => {
            info!("Session closed");
        }
        Err(NetError::Refused(addr)) => {
            info!("Connection refused by {}", addr);
            println!("Failed to connect to {}:{}", settings.host, settings.port);
            println!("Make sure the simulator is running with TCP support");
        }
        Err(e) => {
            error!("Session error: {}", e);
            println!("Error: {}", e);
        }
    }

    // Printed on every path, including a failed connect
    println!("Disconnected");
    Ok(())
}

/// Connect, run the scripted phase, then hand the console to the operator.
fn run_session(settings: &Settings, interrupts: &Receiver<()>) -> Result<(), NetError> {
    println!("Connecting to {}:{}...", settings.host, settings.port);
    let conn = Connection::connect(&settings.host, settings.port, settings.timeout)?;
    println!("Connected successfully!");
    info!("Connected to {}", conn.peer_addr());

    let mut session = Session::new(conn);
    session.start_receiver();

    if !settings.no_script && !settings.commands.is_empty() {
        println!("Sending test commands...");
        match session.send_scripted(&settings.commands, settings.delay, interrupts)? {
            ScriptOutcome::Interrupted => return Ok(()),
            ScriptOutcome::Completed => {}
        }
    }

    println!("\nPress Enter to send custom commands (or 'quit' to exit):");
    let lines = console::spawn_reader();
    console::run_interactive(&session, &lines, interrupts)
}
