use clap::{Parser, Subcommand};

pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "queuekeeper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Walk-in service queue bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service on the console gateway
    Run {
        /// Path to config file (default: <data_dir>/queuekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Write a commented default config file
    InitConfig {
        /// Where to write it (default: <data_dir>/queuekeeper/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::InitConfig { config, force } => init_config(config, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

fn init_config(path: Option<String>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::default_config_path);
    if path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    config::QueuekeeperConfig::create_default(&path)?;
    println!("📝 Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::try_parse_from(["queuekeeper", "run", "--config", "/tmp/q.toml"]).unwrap();
        match cli.command {
            Commands::Run { config } => assert_eq!(config.as_deref(), Some("/tmp/q.toml")),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_version() {
        let cli = Cli::try_parse_from(["queuekeeper", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_init_config_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_string_lossy().to_string();

        init_config(Some(path_str.clone()), false).unwrap();
        assert!(init_config(Some(path_str.clone()), false).is_err());
        init_config(Some(path_str), true).unwrap();
    }
}
