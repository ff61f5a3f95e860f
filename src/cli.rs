//! # CLI Module - Command Line Interface for the Flocking Simulator
//!
//! A run takes one or more configuration files (composed in order into a
//! single root object), optionally exports the composed configuration for
//! provenance, and executes either headless to `Tmax` or, in a build with a
//! viewer attached, paced by the viewer.
//!
//! **Usage**:
//! ```bash
//! torusflock --headless
//! torusflock --config my_config.json --headless
//! torusflock --config config.json --config species/prey.json --config species/predator.json
//! torusflock --exp-files --headless   # dump composed_config.json next to the binary
//! ```
//!
//! Without `--config` the default composition is `config.json` +
//! `species/prey.json` + `species/predator.json` from the working directory.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file(s), composed in order into one root object
    #[arg(short, long)]
    pub config: Vec<PathBuf>,

    /// Write the composed configuration to ./composed_config.json
    #[arg(long)]
    pub exp_files: bool,

    /// Run without a viewer, synchronously to Tmax
    #[arg(long)]
    pub headless: bool,
}

impl Cli {
    /// The configuration paths to compose, falling back to the default
    /// triple when none were given.
    pub fn config_paths(&self) -> Vec<PathBuf> {
        if self.config.is_empty() {
            vec![
                PathBuf::from("config.json"),
                PathBuf::from("species/prey.json"),
                PathBuf::from("species/predator.json"),
            ]
        } else {
            self.config.clone()
        }
    }

    /// Identifier of the configuration used for the run's marker file.
    pub fn config_name(&self) -> String {
        match self.config.first() {
            Some(p) if self.config.len() == 1 => p.display().to_string(),
            _ => "composed_config.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_compose_the_species_files() {
        let cli = Cli::parse_from(["torusflock", "--headless"]);
        let paths = cli.config_paths();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], PathBuf::from("config.json"));
        assert_eq!(cli.config_name(), "composed_config.json");
        assert!(cli.headless);
        assert!(!cli.exp_files);
    }

    #[test]
    fn explicit_config_becomes_the_run_name() {
        let cli = Cli::parse_from(["torusflock", "--config", "runs/exp1.json"]);
        assert_eq!(cli.config_paths(), vec![PathBuf::from("runs/exp1.json")]);
        assert_eq!(cli.config_name(), "runs/exp1.json");
    }
}
