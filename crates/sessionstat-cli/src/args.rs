use clap::{Args, Parser, Subcommand, ValueEnum};
use sessionstat_runtime::Config;
use std::fmt;

#[derive(Parser)]
#[command(name = "sessionstat")]
#[command(about = "Mean/median session duration statistics over a trailing window", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to $SESSIONSTAT_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP service until interrupted")]
    Serve(ServeArgs),

    #[command(about = "Inspect or create the configuration file")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Address to listen on (e.g. 127.0.0.1:8080)")]
    pub listen: Option<String>,

    #[arg(long, help = "Seconds a completed session stays in the statistics")]
    pub retention_secs: Option<u64>,

    #[arg(long, help = "Capacity of the event and session buffers")]
    pub buffer_capacity: Option<usize>,
}

impl ServeArgs {
    /// Overlays flags given on the command line onto the file configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.listen_address = listen.clone();
        }
        if let Some(retention_secs) = self.retention_secs {
            config.retention_secs = retention_secs;
        }
        if let Some(buffer_capacity) = self.buffer_capacity {
            config.buffer_capacity = buffer_capacity;
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the effective configuration as TOML")]
    Show,

    #[command(about = "Write the default configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(level)
    }
}
