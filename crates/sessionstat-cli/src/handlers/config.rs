use anyhow::{Result, bail};
use sessionstat_runtime::Config;
use std::path::Path;

pub fn show(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
