use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = "data";
/// Leading zero bits a block hash needs by default
pub const DEFAULT_DIFFICULTY: u32 = 8;
pub const DEFAULT_SUBSIDY: u64 = 10;
pub const GENESIS_COINBASE_DATA: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const SUBSIDY_KEY: &str = "LEDGER_SUBSIDY";

/// Where the chain lives and the parameters it is mined with.
///
/// Passed explicitly into `Ledger::create` / `Ledger::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub difficulty: u32,
    pub subsidy: u64,
    pub genesis_coinbase_data: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            difficulty: DEFAULT_DIFFICULTY,
            subsidy: DEFAULT_SUBSIDY,
            genesis_coinbase_data: GENESIS_COINBASE_DATA.to_string(),
        }
    }
}

impl Config {
    /// Default parameters with the chain stored under `data_dir`
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Config {
        Config {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then `LEDGER_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Ok(dir) = env::var(DATA_DIR_KEY) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(value) = env::var(DIFFICULTY_KEY) {
            config.difficulty = value
                .parse()
                .map_err(|e| LedgerError::Config(format!("{DIFFICULTY_KEY}={value}: {e}")))?;
        }
        if let Ok(value) = env::var(SUBSIDY_KEY) {
            config.subsidy = value
                .parse()
                .map_err(|e| LedgerError::Config(format!("{SUBSIDY_KEY}={value}: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=255).contains(&self.difficulty) {
            return Err(LedgerError::Config(format!(
                "difficulty must be between 1 and 255, got {}",
                self.difficulty
            )));
        }
        if self.subsidy == 0 {
            return Err(LedgerError::Config(
                "subsidy must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.difficulty, 8);
        assert_eq!(config.subsidy, 10);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"/tmp/chain\"\ndifficulty = 4").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/chain"));
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.subsidy, DEFAULT_SUBSIDY);
    }

    #[test]
    fn test_from_file_rejects_bad_difficulty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = 300").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_from_file_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = = 3").unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_zero_subsidy_is_rejected() {
        let config = Config {
            subsidy: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
