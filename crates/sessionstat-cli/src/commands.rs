use super::args::{Cli, Commands, ConfigCommand};
use super::handlers;
use crate::logging;
use anyhow::Result;
use sessionstat_runtime::{Config, resolve_config_path};

pub fn run(cli: Cli) -> Result<()> {
    logging::init_tracing(cli.log_level);

    let config_path = resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => {
            let mut config = Config::load_from(&config_path)?;
            args.apply(&mut config);
            handlers::serve::handle(config)
        }

        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                let config = Config::load_from(&config_path)?;
                handlers::config::show(&config)
            }
            ConfigCommand::Init { force } => handlers::config::init(&config_path, force),
        },
    }
}
