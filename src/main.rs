use anyhow::Result;
use clap::Parser;
use shutter::{AppCommand, CameraApp, ShutterConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "shutter")]
#[command(about = "Camera session controller with photo capture and QR scanning")]
#[command(version)]
#[command(long_about = "Drives a camera capture session through permission, configuration, \
start/stop, front/back switching and still capture. Photos are written to the configured \
output directory; detected QR codes are logged.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "shutter.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without opening the camera")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Run comma separated commands instead of reading the keyboard
    #[arg(
        long,
        value_name = "STEPS",
        help = "Run commands non-interactively, e.g. \"configure,capture,switch,capture,stop\""
    )]
    script: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting shutter v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match ShutterConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    // Parse before touching the camera so typos fail fast
    let script = args
        .script
        .as_deref()
        .map(AppCommand::parse_script)
        .transpose()?;

    let mut app = CameraApp::new(config).await.map_err(|e| {
        error!("Failed to create camera app: {}", e);
        e
    })?;
    app.set_keyboard_enabled(script.is_none());

    app.start().await.map_err(|e| {
        error!("Failed to start camera app: {}", e);
        e
    })?;

    let exit_code = match script {
        Some(commands) => app.run_script(commands).await,
        None => app.run().await,
    }
    .map_err(|e| {
        error!("Camera app error during execution: {}", e);
        e
    })?;

    info!("shutter exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shutter={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# shutter configuration file");
    println!("# Every option with its default value; SHUTTER_<SECTION>__<KEY> overrides");
    println!();
    println!("{}", ShutterConfig::default().to_toml()?);
    Ok(())
}
