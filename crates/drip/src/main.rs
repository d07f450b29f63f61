// # drip - DR IP-configuration reconciler
//
// The drip binary is a thin integration layer:
// 1. Parsing the command line (with `DRIP_*` environment fallbacks)
// 2. Building and validating the configuration
// 3. Initializing logging and the runtime
// 4. Running one reconciliation pass per selected interface
//
// All decision logic lives in drip-core.
//
// ## Configuration
//
// Sources, lowest precedence first:
// - Built-in defaults
// - JSON file (`--config` / `DRIP_CONFIG`)
// - Environment variables (`DRIP_PATH`, `DRIP_SETTLE_SECS`, ...)
// - Command-line flags
//
// ## Example
//
// ```bash
// # Automatic reconciliation of every active interface
// drip --path /var/lib/drip
//
// # Operator override: put interface 2 on its DR configuration
// drip --setdr --interface 2
// ```

use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use drip_core::{
    CsvConfigStore, DripConfig, InterfaceSelector, Mode, NetworkProbe, Orchestrator, RunReport,
    RunRequest, Target,
};

/// Exit codes for different termination scenarios
///
/// - 0: Every selected interface was processed
/// - 1: Configuration or argument error
/// - 2: Runtime error (a pass was aborted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DripExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DripExitCode> for ExitCode {
    fn from(code: DripExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Reconcile each active interface against its production and DR snapshots
#[derive(Parser, Debug)]
#[command(name = "drip", version, about, long_about = None)]
#[command(group(ArgGroup::new("force").args(["dhcp", "setprod", "setdr"])))]
struct Cli {
    /// Enable DHCP on the selected interfaces
    #[arg(long)]
    dhcp: bool,

    /// Apply the stored production configuration
    #[arg(long)]
    setprod: bool,

    /// Apply the stored DR configuration
    #[arg(long)]
    setdr: bool,

    /// Interface slot (1-based, in interface-index order) or "all"
    #[arg(long, env = "DRIP_INTERFACE", default_value = "all")]
    interface: InterfaceSelector,

    /// Directory holding the snapshot files
    #[arg(long, env = "DRIP_PATH")]
    path: Option<PathBuf>,

    /// Seconds to wait after a change before probing the new gateway
    #[arg(long, env = "DRIP_SETTLE_SECS")]
    settle_secs: Option<u64>,

    /// Echo requests sent before a gateway counts as unreachable
    #[arg(long, env = "DRIP_PING_ATTEMPTS")]
    ping_attempts: Option<u32>,

    /// trace, debug, info, warn or error
    #[arg(long, env = "DRIP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// JSON configuration file
    #[arg(long, env = "DRIP_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.dhcp {
            Mode::Force(Target::Dhcp)
        } else if self.setprod {
            Mode::Force(Target::Production)
        } else if self.setdr {
            Mode::Force(Target::Dr)
        } else {
            Mode::Automatic
        }
    }

    fn request(&self) -> RunRequest {
        RunRequest::new(self.mode(), self.interface)
    }

    /// Layer flags over the config file over defaults, then validate
    fn load_config(&self) -> Result<DripConfig> {
        let mut config = match &self.config {
            Some(path) => DripConfig::from_json_file(path)?,
            None => DripConfig::default(),
        };

        if let Some(path) = &self.path {
            config.store.base_path = path.clone();
        }
        if let Some(secs) = self.settle_secs {
            config.gateway.settle_delay_secs = secs;
        }
        if let Some(attempts) = self.ping_attempts {
            config.gateway.ping_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "Log level '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                DripExitCode::ConfigError
            } else {
                DripExitCode::Success
            };
            let _ = e.print();
            return code.into();
        }
    };

    let log_level = match cli.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DripExitCode::ConfigError.into();
        }
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DripExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DripExitCode::ConfigError.into();
    }

    let request = cli.request();
    info!(
        "Starting drip: mode {:?}, interface {}, snapshots in {}",
        request.mode,
        request.interface,
        config.store.base_path.display()
    );

    // Passes run strictly one after another
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DripExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(request, &config).await {
            Ok(report) => {
                print_report(&report);
                DripExitCode::Success
            }
            Err(e) => {
                error!("{}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Wire the probe and the snapshot store, then run once
async fn run(request: RunRequest, config: &DripConfig) -> drip_core::Result<RunReport> {
    let probe = network_probe()?;
    let store = CsvConfigStore::new(&config.store.base_path);

    let orchestrator = Orchestrator::new(probe, Box::new(store), config)?;
    orchestrator.run(request).await
}

#[cfg(all(feature = "linux", target_os = "linux"))]
fn network_probe() -> drip_core::Result<Box<dyn NetworkProbe>> {
    Ok(Box::new(drip_probe_linux::LinuxNetworkProbe::new()))
}

#[cfg(not(all(feature = "linux", target_os = "linux")))]
fn network_probe() -> drip_core::Result<Box<dyn NetworkProbe>> {
    Err(drip_core::Error::Other(
        "No network probe is available for this platform".to_string(),
    ))
}

fn exit_code_for(err: &drip_core::Error) -> DripExitCode {
    match err {
        drip_core::Error::Config(_) | drip_core::Error::UnknownInterface { .. } => {
            DripExitCode::ConfigError
        }
        _ => DripExitCode::RuntimeError,
    }
}

/// One line per processed interface
fn print_report(report: &RunReport) {
    for pass in &report.passes {
        if pass.changes.is_empty() {
            println!("{}: {}", pass.interface, pass.outcome);
        } else {
            let changes: Vec<String> = pass.changes.iter().map(ToString::to_string).collect();
            println!(
                "{}: {} (applied: {})",
                pass.interface,
                pass.outcome,
                changes.join(" → ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_flags_means_automatic_on_every_interface() {
        let cli = Cli::try_parse_from(["drip"]).unwrap();
        assert_eq!(cli.request(), RunRequest::automatic());
    }

    #[test]
    fn forced_modes_take_an_interface() {
        let cli = Cli::try_parse_from(["drip", "--setprod", "--interface", "2"]).unwrap();
        assert_eq!(
            cli.request(),
            RunRequest::new(Mode::Force(Target::Production), InterfaceSelector::Slot(2))
        );

        let cli = Cli::try_parse_from(["drip", "--dhcp", "--interface", "all"]).unwrap();
        assert_eq!(cli.mode(), Mode::Force(Target::Dhcp));
        assert_eq!(cli.interface, InterfaceSelector::All);

        let cli = Cli::try_parse_from(["drip", "--setdr"]).unwrap();
        assert_eq!(cli.mode(), Mode::Force(Target::Dr));
    }

    #[test]
    fn forced_modes_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["drip", "--dhcp", "--setdr"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn interface_must_be_a_slot_or_all() {
        assert!(Cli::try_parse_from(["drip", "--interface", "0"]).is_err());
        assert!(Cli::try_parse_from(["drip", "--interface", "eth0"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "drip",
            "--path",
            "/srv/drip",
            "--settle-secs",
            "0",
            "--ping-attempts",
            "4",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.store.base_path, PathBuf::from("/srv/drip"));
        assert_eq!(config.gateway.settle_delay_secs, 0);
        assert_eq!(config.gateway.ping_attempts, 4);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cli = Cli::try_parse_from(["drip", "--ping-attempts", "0"]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn log_level_is_validated() {
        let cli = Cli::try_parse_from(["drip", "--log-level", "DEBUG"]).unwrap();
        assert_eq!(cli.log_level().unwrap(), Level::DEBUG);

        let cli = Cli::try_parse_from(["drip", "--log-level", "verbose"]).unwrap();
        assert!(cli.log_level().is_err());
    }

    #[test]
    fn argument_errors_map_to_exit_code_one() {
        let err = drip_core::Error::UnknownInterface {
            requested: 3,
            available: 1,
        };
        assert_eq!(exit_code_for(&err), DripExitCode::ConfigError);
        assert_eq!(
            exit_code_for(&drip_core::Error::NoActiveInterface),
            DripExitCode::RuntimeError
        );
    }
}
