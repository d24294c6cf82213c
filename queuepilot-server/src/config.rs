//! Configuration and CLI argument parsing
//!
//! Both binaries are configured the same way:
//! - Command-line arguments
//! - Environment variables (with the QUEUEPILOT_ prefix)
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! queuepilot --consumer-rate 20 --queue-threshold 64
//!
//! # Using environment variables
//! export QUEUEPILOT_CONSUMER_RATE=20
//! export QUEUEPILOT_TELEMETRY_HOST=10.0.0.5
//! queuepilot
//!
//! # Mixed (CLI overrides env)
//! export QUEUEPILOT_CONTROL_PORT=7000
//! queuepilot --control-port 7368  # Uses port 7368
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use queuepilot::{Controller, Rate};
use serde::Deserialize;

/// Validated configuration of the pipeline binary
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    /// Address the control server listens on
    pub control: ListenConfig,
    /// Collector to publish telemetry to; `None` when telemetry is disabled
    pub telemetry: Option<ListenConfig>,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Host and port pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Queue, rate and controller settings
///
/// Rates are in permits per second.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub producer_rate: f64,
    pub consumer_rate: f64,
    pub controller_rate: f64,
    pub queue_threshold: usize,
    /// Change applied to the producer rate on every controller tick
    pub controller_step: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            queue_capacity: 256,
            producer_rate: 10.0,
            consumer_rate: 10.0,
            controller_rate: 0.5,
            queue_threshold: 128,
            controller_step: 1.0,
        }
    }
}

impl PipelineConfig {
    /// Check every value the pipeline would otherwise reject at startup
    ///
    /// # Errors
    ///
    /// Returns an error for a zero capacity, a rate that is not positive and
    /// finite, or an invalid controller step.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(anyhow!("Queue capacity must be at least 1"));
        }

        for (name, value) in [
            ("producer", self.producer_rate),
            ("consumer", self.consumer_rate),
            ("controller", self.controller_rate),
        ] {
            Rate::per_second(value).map_err(|e| anyhow!("Invalid {name} rate: {e}"))?;
        }

        Controller::new(self.controller_step)
            .map_err(|e| anyhow!("Invalid controller step: {e}"))?;

        Ok(())
    }
}

/// Command-line arguments for the pipeline
///
/// # Examples
///
/// Slow consumer with a tight threshold:
/// ```bash
/// queuepilot --consumer-rate 2 --queue-threshold 8
/// ```
///
/// Run without a collector:
/// ```bash
/// queuepilot --disable-telemetry --log-level debug
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "queuepilot",
    about = "Self-regulating producer/consumer pipeline",
    long_about = "A producer/consumer pipeline whose producer rate is steered by a feedback controller.\n\nTelemetry is pushed to a collector on every controller tick; rates and the threshold can be changed at runtime over the control port.\n\nEnvironment variables with QUEUEPILOT_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // Queue
    #[arg(
        long,
        value_name = "SIZE",
        help = "Queue capacity",
        default_value_t = 256,
        env = "QUEUEPILOT_QUEUE_CAPACITY"
    )]
    pub queue_capacity: usize,
    #[arg(
        long,
        value_name = "N",
        help = "Occupancy above which the producer is slowed down",
        default_value_t = 128,
        env = "QUEUEPILOT_QUEUE_THRESHOLD"
    )]
    pub queue_threshold: usize,

    // Rates
    #[arg(
        long,
        value_name = "RATE",
        help = "Initial producer rate (items/s)",
        default_value_t = 10.0,
        env = "QUEUEPILOT_PRODUCER_RATE"
    )]
    pub producer_rate: f64,
    #[arg(
        long,
        value_name = "RATE",
        help = "Initial consumer rate (items/s)",
        default_value_t = 10.0,
        env = "QUEUEPILOT_CONSUMER_RATE"
    )]
    pub consumer_rate: f64,
    #[arg(
        long,
        value_name = "RATE",
        help = "Controller tick rate (ticks/s)",
        default_value_t = 0.5,
        env = "QUEUEPILOT_CONTROLLER_RATE"
    )]
    pub controller_rate: f64,
    #[arg(
        long,
        value_name = "STEP",
        help = "Producer rate change per controller tick (items/s)",
        default_value_t = 1.0,
        env = "QUEUEPILOT_CONTROLLER_STEP"
    )]
    pub controller_step: f64,

    // Control channel
    #[arg(
        long,
        value_name = "HOST",
        help = "Control server host",
        default_value = "0.0.0.0",
        env = "QUEUEPILOT_CONTROL_HOST"
    )]
    pub control_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Control server port",
        default_value_t = 7368,
        env = "QUEUEPILOT_CONTROL_PORT"
    )]
    pub control_port: u16,

    // Telemetry
    #[arg(
        long,
        value_name = "HOST",
        help = "Telemetry collector host",
        default_value = "127.0.0.1",
        env = "QUEUEPILOT_TELEMETRY_HOST"
    )]
    pub telemetry_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Telemetry collector port",
        default_value_t = 6873,
        env = "QUEUEPILOT_TELEMETRY_PORT"
    )]
    pub telemetry_port: u16,
    #[arg(
        long,
        help = "Do not connect to a collector",
        env = "QUEUEPILOT_DISABLE_TELEMETRY"
    )]
    pub disable_telemetry: bool,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "QUEUEPILOT_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails validation.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let telemetry = (!args.disable_telemetry).then(|| ListenConfig {
            host: args.telemetry_host,
            port: args.telemetry_port,
        });

        let config = Config {
            pipeline: PipelineConfig {
                queue_capacity: args.queue_capacity,
                producer_rate: args.producer_rate,
                consumer_rate: args.consumer_rate,
                controller_rate: args.controller_rate,
                queue_threshold: args.queue_threshold,
                controller_step: args.controller_step,
            },
            control: ListenConfig {
                host: args.control_host,
                port: args.control_port,
            },
            telemetry,
            log_level: args.log_level,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.pipeline.validate()
    }

    fn print_env_vars() {
        println!("QueuePilot Environment Variables");
        println!("================================");
        println!();
        println!("All environment variables use the QUEUEPILOT_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Queue Configuration:");
        println!("  QUEUEPILOT_QUEUE_CAPACITY=<size>      Queue capacity [default: 256]");
        println!("  QUEUEPILOT_QUEUE_THRESHOLD=<n>        Occupancy threshold [default: 128]");
        println!();

        println!("Rate Configuration:");
        println!("  QUEUEPILOT_PRODUCER_RATE=<rate>       Initial producer rate [default: 10]");
        println!("  QUEUEPILOT_CONSUMER_RATE=<rate>       Initial consumer rate [default: 10]");
        println!("  QUEUEPILOT_CONTROLLER_RATE=<rate>     Controller tick rate [default: 0.5]");
        println!("  QUEUEPILOT_CONTROLLER_STEP=<step>     Producer rate step [default: 1]");
        println!();

        println!("Network Configuration:");
        println!("  QUEUEPILOT_CONTROL_HOST=<host>        Control server host [default: 0.0.0.0]");
        println!("  QUEUEPILOT_CONTROL_PORT=<port>        Control server port [default: 7368]");
        println!("  QUEUEPILOT_TELEMETRY_HOST=<host>      Collector host [default: 127.0.0.1]");
        println!("  QUEUEPILOT_TELEMETRY_PORT=<port>      Collector port [default: 6873]");
        println!("  QUEUEPILOT_DISABLE_TELEMETRY=true     Do not connect to a collector");
        println!();

        println!("General Configuration:");
        println!(
            "  QUEUEPILOT_LOG_LEVEL=<level>          Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Slow consumer, collector on another host");
        println!("  export QUEUEPILOT_CONSUMER_RATE=2");
        println!("  export QUEUEPILOT_TELEMETRY_HOST=10.0.0.5");
        println!();
        println!("  # Run (CLI args override env vars)");
        println!("  queuepilot --consumer-rate 4  # Will use 4, not 2");
    }
}

/// Validated configuration of the collector binary
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Address telemetry publishers connect to
    pub telemetry: ListenConfig,
    /// Address of the HTTP scrape endpoint
    pub http: ListenConfig,
    pub log_level: String,
}

/// Command-line arguments for the telemetry collector
#[derive(Parser, Debug)]
#[command(
    name = "queuepilot-collector",
    about = "Telemetry collector for queuepilot",
    long_about = "Receives queuepilot telemetry frames and serves the latest values in Prometheus text format.\n\nEnvironment variables with QUEUEPILOT_COLLECTOR_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct CollectorArgs {
    #[arg(
        long,
        value_name = "HOST",
        help = "Telemetry listener host",
        default_value = "127.0.0.1",
        env = "QUEUEPILOT_COLLECTOR_TELEMETRY_HOST"
    )]
    pub telemetry_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Telemetry listener port",
        default_value_t = 6873,
        env = "QUEUEPILOT_COLLECTOR_TELEMETRY_PORT"
    )]
    pub telemetry_port: u16,
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "QUEUEPILOT_COLLECTOR_HTTP_HOST"
    )]
    pub http_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 9090,
        env = "QUEUEPILOT_COLLECTOR_HTTP_PORT"
    )]
    pub http_port: u16,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "QUEUEPILOT_COLLECTOR_LOG_LEVEL"
    )]
    pub log_level: String,
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl CollectorConfig {
    pub fn from_env_and_args() -> Result<Self> {
        let args = CollectorArgs::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Ok(Self::from_args(args))
    }

    pub fn from_args(args: CollectorArgs) -> Self {
        CollectorConfig {
            telemetry: ListenConfig {
                host: args.telemetry_host,
                port: args.telemetry_port,
            },
            http: ListenConfig {
                host: args.http_host,
                port: args.http_port,
            },
            log_level: args.log_level,
        }
    }

    fn print_env_vars() {
        println!("QueuePilot Collector Environment Variables");
        println!("==========================================");
        println!();
        println!("  QUEUEPILOT_COLLECTOR_TELEMETRY_HOST=<host>  Telemetry host [default: 127.0.0.1]");
        println!("  QUEUEPILOT_COLLECTOR_TELEMETRY_PORT=<port>  Telemetry port [default: 6873]");
        println!("  QUEUEPILOT_COLLECTOR_HTTP_HOST=<host>       HTTP host [default: 127.0.0.1]");
        println!("  QUEUEPILOT_COLLECTOR_HTTP_PORT=<port>       HTTP port [default: 9090]");
        println!(
            "  QUEUEPILOT_COLLECTOR_LOG_LEVEL=<level>      Log level: error, warn, info, debug, trace [default: info]"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let args = Args::try_parse_from(std::iter::once("queuepilot").chain(args.iter().copied()))?;
        Config::from_args(args)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.control.port, 7368);
        assert_eq!(
            config.telemetry,
            Some(ListenConfig {
                host: "127.0.0.1".to_string(),
                port: 6873,
            })
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_values() {
        let config = parse(&[
            "--queue-capacity",
            "32",
            "--consumer-rate",
            "2.5",
            "--controller-step",
            "0.25",
            "--queue-threshold",
            "0",
            "--control-port",
            "9000",
        ])
        .unwrap();

        assert_eq!(config.pipeline.queue_capacity, 32);
        assert_eq!(config.pipeline.consumer_rate, 2.5);
        assert_eq!(config.pipeline.controller_step, 0.25);
        assert_eq!(config.pipeline.queue_threshold, 0);
        assert_eq!(config.control.port, 9000);
    }

    #[test]
    fn test_disable_telemetry() {
        let config = parse(&["--disable-telemetry"]).unwrap();
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let err = parse(&["--queue-capacity", "0"]).unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_validation_rejects_bad_rates() {
        assert!(parse(&["--producer-rate", "0"]).is_err());
        assert!(parse(&["--consumer-rate", "-3"]).is_err());
        assert!(parse(&["--controller-rate", "inf"]).is_err());
        assert!(parse(&["--controller-step", "0"]).is_err());
    }

    #[test]
    fn test_pipeline_config_validate() {
        let mut config = PipelineConfig::default();
        assert!(config.validate().is_ok());

        config.consumer_rate = f64::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("consumer"));
    }

    #[test]
    fn test_collector_defaults() {
        let args = CollectorArgs::try_parse_from(["queuepilot-collector"]).unwrap();
        let config = CollectorConfig::from_args(args);

        assert_eq!(config.telemetry.port, 6873);
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.host, "127.0.0.1");
    }
}
