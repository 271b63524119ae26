use clap::Parser;
use serial_points::config::{Config, ConfigLoader};
use serial_points::error::exit_codes;
use serial_points::{
    logging, Bridge, BridgeError, BridgeOptions, Console, SyncSerialPort, SystemClock,
    TerminationListener,
};
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Forward operator commands to a serial scanner and record its point data.",
    long_about = "Lines typed on stdin are sent to the serial device. Device output is echoed \
                  with a '> ' prefix, except lines starting with 'p', which are written (tag \
                  stripped) to the current points-<timestamp>.asdp file. Typing a line starting \
                  with 'r' opens a new result file. Ctrl+C or SIGTERM closes the file and exits."
)]
struct Args {
    /// Serial port to use (device path or configured alias).
    #[arg(short, long)]
    serial: Option<String>,

    /// Configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory result files are written to.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level or filter directive (overridden by RUST_LOG).
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(serial) = self.serial {
            config.serial.port = serial;
        }
        if let Some(dir) = self.output_dir {
            config.output.directory = dir;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match ConfigLoader::load(args.config.as_deref()) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(exit_codes::CONFIG_ERROR);
        }
    };
    args.apply(&mut config);

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("{e}");
        return ExitCode::from(e.exit_code());
    }

    match run(config).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            tracing::error!(error = %e, "serial-points terminated");
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(config: Config) -> Result<(), BridgeError> {
    config.validate()?;

    let path = config.serial.device_path();
    let port = SyncSerialPort::open(&path, config.serial.port_configuration())
        .map_err(|source| BridgeError::DeviceOpen { path, source })?;

    let options = BridgeOptions {
        sink: config.output.sink_config(),
        console: Console::stdout(),
        clock: Arc::new(SystemClock),
        write_terminator: config.serial.write_terminator.clone(),
    };
    let operator_input = BufReader::new(std::io::stdin());

    let mut signals = TerminationListener::install().map_err(BridgeError::Signal)?;
    let bridge = Bridge::start(Box::new(port), operator_input, options)?;
    let summary = bridge.run_until(signals.recv()).await?;

    tracing::info!(
        files = summary.files.len(),
        records = summary.records_written,
        "shutdown complete"
    );
    Ok(())
}
