//! ubdump CLI - Command-line tool for dumping memory through the U-Boot shell.
//!
//! ## Features
//!
//! - Dump any address range to a binary file over the serial console
//! - Strict validation of every printed line (no silent corruption)
//! - Serial port listing
//! - Configuration files and environment variable support

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use ubdump::{
    DEFAULT_BAUD, DEFAULT_BURST_SIZE, DEFAULT_PROMPT, DEFAULT_TOTAL_BYTES, DumpRequest, DumpSession,
    ErrorCategory, FileSink, NativePort, NativePortEnumerator, PortEnumerator, SerialConfig,
    TransportSettings,
};

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Check if emoji/animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(std::sync::atomic::Ordering::Relaxed) && console::colors_enabled_stderr()
}

mod config;

use config::Config;

/// Serial device used when neither flags, environment nor config name one.
const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Exit status for invalid parameters or an existing output file.
const EXIT_PRECONDITION: u8 = 3;
/// Exit status when the port cannot be used or the shell stays silent.
const EXIT_NOT_RESPONDING: u8 = 4;
/// Exit status when the transfer was garbled.
const EXIT_CORRUPTION: u8 = 5;

/// ubdump - Dump device memory through the U-Boot shell.
///
/// Environment variables:
///   UBDUMP_DEVICE   - Serial device (default: /dev/ttyACM0)
///   UBDUMP_PROMPT   - Shell prompt to wait for (default: U-Boot#)
#[derive(Parser)]
#[command(name = "ubdump")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial device the U-Boot console is attached to.
    #[arg(short, long, global = true, env = "UBDUMP_DEVICE")]
    device: Option<String>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Dump a memory range to a binary file.
    Dump(DumpArgs),

    /// List available serial ports.
    ListPorts {
        /// Output in JSON format.
        #[arg(long)]
        json: bool,

        /// Only show USB adapters with this ID (e.g. 0483:5740).
        #[arg(long, value_name = "VID:PID", value_parser = parse_usb_id)]
        usb: Option<(u16, u16)>,
    },
}

/// Arguments of the `dump` command.
#[derive(Args)]
struct DumpArgs {
    /// Start address (0x hex, 0o octal, 0b binary or decimal).
    #[arg(value_parser = parse_u32)]
    address: u32,

    /// Number of bytes to dump [default: 131072].
    #[arg(short, long, value_parser = parse_u64)]
    size: Option<u64>,

    /// Bytes requested per md.b command [default: 1024].
    #[arg(short, long = "burst-size", value_parser = parse_u32)]
    burst_size: Option<u32>,

    /// Output file [default: dump-0xADDRESS.bin].
    #[arg(short = 'f', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Shell prompt to wait for [default: U-Boot#].
    #[arg(short, long, env = "UBDUMP_PROMPT")]
    prompt: Option<String>,

    /// Quiet period while waiting for the prompt, in milliseconds.
    #[arg(long, value_parser = parse_u64)]
    slow_timeout_ms: Option<u64>,

    /// Quiet period that ends a burst response, in milliseconds.
    #[arg(long, value_parser = parse_u64)]
    fast_timeout_ms: Option<u64>,
}

/// Parse an integer with an optional radix prefix (0x, 0o, 0b) and `_` separators.
fn parse_u64(s: &str) -> Result<u64, String> {
    let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("Invalid number: {s}"));
    }
    u64::from_str_radix(digits, radix).map_err(|e| format!("Invalid number {s}: {e}"))
}

/// Like [`parse_u64`], limited to the 32-bit address space.
fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("{s} does not fit in 32 bits"))
}

/// Parse a `VID:PID` pair of hexadecimal USB IDs.
fn parse_usb_id(s: &str) -> Result<(u16, u16), String> {
    let (vid, pid) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected VID:PID, got {s}"))?;
    let field = |v: &str| {
        u16::from_str_radix(v.trim_start_matches("0x"), 16)
            .map_err(|e| format!("Invalid USB ID {v}: {e}"))
    };
    Ok((field(vid)?, field(pid)?))
}

/// Map a failure to the process exit status.
fn exit_code(err: &anyhow::Error) -> u8 {
    let Some(e) = err.chain().find_map(|c| c.downcast_ref::<ubdump::Error>()) else {
        return 1;
    };
    match e.category() {
        ErrorCategory::Precondition => EXIT_PRECONDITION,
        ErrorCategory::Liveness => EXIT_NOT_RESPONDING,
        ErrorCategory::Structural | ErrorCategory::Continuity => EXIT_CORRUPTION,
        ErrorCategory::Io => match e {
            ubdump::Error::Serial(_) => EXIT_NOT_RESPONDING,
            _ => 1,
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // NO_COLOR and TTY detection
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, std::sync::atomic::Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        // Disable all color output
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "ubdump v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    let config = Config::load(cli.config_path.as_deref());

    let result = match &cli.command {
        Commands::Dump(args) => cmd_dump(&cli, &config, args),
        Commands::ListPorts { json, usb } => cmd_list_ports(*json, *usb),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::from(exit_code(&e))
        },
    }
}

/// Dump command implementation.
fn cmd_dump(cli: &Cli, config: &Config, args: &DumpArgs) -> Result<()> {
    let device = cli
        .device
        .clone()
        .or_else(|| config.connection.device.clone())
        .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let prompt = args
        .prompt
        .clone()
        .or_else(|| config.shell.prompt.clone())
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let size = args.size.or(config.dump.size).unwrap_or(DEFAULT_TOTAL_BYTES);
    let burst_size = args
        .burst_size
        .or(config.dump.burst_size)
        .unwrap_or(DEFAULT_BURST_SIZE);

    let mut settings = TransportSettings::default();
    if let Some(ms) = args.slow_timeout_ms.or(config.dump.slow_timeout_ms) {
        settings.slow_timeout = timeout_from_ms("slow", ms)?;
    }
    if let Some(ms) = args.fast_timeout_ms.or(config.dump.fast_timeout_ms) {
        settings.fast_timeout = timeout_from_ms("fast", ms)?;
    }

    ubdump::shell::validate_prompt(&prompt)?;
    let request = DumpRequest::new(args.address, size, burst_size)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(request.default_output_name()));

    // Refuse to clobber before the device is touched
    let sink = FileSink::new(&output)?;

    if !cli.quiet {
        eprintln!(
            "{} Using {} at {} baud",
            style("🔌").cyan(),
            style(&device).cyan(),
            DEFAULT_BAUD
        );
    }
    let serial = SerialConfig::new(&device).with_timeout(settings.slow_timeout);
    let port = NativePort::open(&serial).with_context(|| format!("Failed to open {device}"))?;

    if !cli.quiet {
        eprintln!(
            "{} Waiting for {:?} prompt...",
            style("⏳").yellow(),
            prompt
        );
    }

    let pb = if cli.quiet || !use_fancy_output() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(request.total_bytes());
        #[allow(clippy::unwrap_used)] // Static template string
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb
    };

    let mut session = DumpSession::new(port, request, settings, prompt, sink)?;
    let outcome = session.run(|done, total| {
        pb.set_length(total);
        pb.set_position(done);
    });

    match outcome {
        Ok(summary) => {
            pb.finish_and_clear();
            println!(
                "Dumped {} bytes from 0x{:08X} to {} in {:.2}s ({:.2} kB/s)",
                summary.bytes,
                summary.start_address,
                output.display(),
                summary.elapsed.as_secs_f64(),
                summary.rate_kib_per_sec()
            );
            Ok(())
        },
        Err(e) => {
            pb.abandon();
            let written = session.state().bytes_written;
            drop(session);
            if output.exists() && !cli.quiet {
                eprintln!(
                    "{} Partial dump ({} bytes) left in {}",
                    style("⚠").yellow(),
                    written,
                    output.display()
                );
            }
            Err(e).context("Dump failed")
        },
    }
}

fn timeout_from_ms(which: &str, ms: u64) -> Result<Duration> {
    if ms == 0 {
        return Err(ubdump::Error::Config(format!("{which} timeout must be positive")).into());
    }
    Ok(Duration::from_millis(ms))
}

/// List ports command implementation.
fn cmd_list_ports(json: bool, usb: Option<(u16, u16)>) -> Result<()> {
    let ports = match usb {
        Some((vid, pid)) => NativePortEnumerator::find_by_vid_pid(vid, pid),
        None => NativePortEnumerator::list_ports(),
    }
    .context("Failed to enumerate serial ports")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports:").bold().underlined());

    if ports.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
        return Ok(());
    }

    for port in &ports {
        let product = port.product.as_deref().unwrap_or("");
        let vid_pid = if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            format!(" ({vid:04X}:{pid:04X})")
        } else {
            String::new()
        };

        eprintln!(
            "  {} {}{}{}",
            style("•").green(),
            style(&port.name).cyan(),
            vid_pid,
            if product.is_empty() {
                String::new()
            } else {
                format!(" - {}", style(product).dim())
            }
        );
    }

    Ok(())
}
