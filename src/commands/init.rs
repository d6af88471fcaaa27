//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

impl InitOptions {
    /// Resolve `--config`: a `.toml` path is the file, anything else a directory
    pub fn from_cli(config: Option<PathBuf>, force: bool) -> Self {
        let (base_dir, config_path) = match config {
            Some(path) if path.extension().is_some_and(|e| e == "toml") => {
                let base = path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(Config::default_base_dir);
                (base, path)
            }
            Some(dir) => (dir.clone(), dir.join("config.toml")),
            None => {
                let base = Config::default_base_dir();
                (base.clone(), base.join("config.toml"))
            }
        };

        Self {
            base_dir,
            config_path,
            force,
        }
    }
}

/// Write the default configuration
pub fn cmd_init(options: InitOptions) -> Result<Config> {
    if options.config_path.exists() && !options.force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            options.config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths = PathsConfig {
        base_dir: options.base_dir,
        config_file: options.config_path,
    };
    config.save()?;
    info!("Created config at {:?}", config.paths.config_file);

    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("✓ Initialized growthwise at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Reference tables: {:?}", config.growth.tables_dir);
    println!("Guideline documents: {:?}", config.rag.docs_dir);
    println!("\nNext steps:");
    println!("  growthwise index build                        # Index guideline documents");
    println!("  growthwise diagnose --sex f --age 9 --weight 8.1 --height 70.2");
    println!("  growthwise recommend --sex f --age 9 --weight 8.1 --height 70.2");
    println!(
        "\nSet {} to enable generated recommendations.",
        config.generation.api_key_env
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_paths() {
        let options = InitOptions::from_cli(Some(PathBuf::from("/tmp/gw/custom.toml")), false);
        assert_eq!(options.base_dir, PathBuf::from("/tmp/gw"));
        assert_eq!(options.config_path, PathBuf::from("/tmp/gw/custom.toml"));

        let options = InitOptions::from_cli(Some(PathBuf::from("/tmp/gw")), false);
        assert_eq!(options.config_path, PathBuf::from("/tmp/gw/config.toml"));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let options = InitOptions::from_cli(Some(dir.path().to_path_buf()), false);

        let config = cmd_init(options.clone()).unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.rag.top_k, config.rag.top_k);

        assert!(matches!(cmd_init(options.clone()), Err(Error::Config(_))));

        let forced = InitOptions {
            force: true,
            ..options
        };
        assert!(cmd_init(forced).is_ok());
    }
}
