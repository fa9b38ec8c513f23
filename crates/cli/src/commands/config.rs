//! Config Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

use crate::config::UatConfig;
use crate::output::{print_success, print_value, OutputFormat};

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config path
    #[arg(long)]
    pub write: bool,

    /// Overwrite an existing file when writing
    #[arg(long, requires = "write")]
    pub force: bool,
}

pub async fn execute(args: ConfigArgs, config: &UatConfig, path: &Path, format: OutputFormat) -> Result<()> {
    if args.write {
        if path.exists() && !args.force {
            anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
        }
        config
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        print_success(&format!("Wrote {}", path.display()));
        return Ok(());
    }

    if format.is_structured() {
        print_value(config, format);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
