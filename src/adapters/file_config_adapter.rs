//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[backtest]
initial_cash = 25000

[indicators]
bb_period = 30
stddev = population

[strategy]
rule = bollinger_rsi
whole_units = yes
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_cash", 0.0).unwrap(), 25000.0);
        assert_eq!(adapter.get_usize("indicators", "bb_period", 20).unwrap(), 30);
        assert_eq!(
            adapter.get_string("indicators", "stddev"),
            Some("population".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "rule"),
            Some("bollinger_rsi".to_string())
        );
        assert!(adapter.get_bool("strategy", "whole_units", false).unwrap());
    }

    #[test]
    fn keys_and_sections_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Indicators]\nBB_Period = 10\n").unwrap();
        assert_eq!(adapter.get_usize("indicators", "bb_period", 20).unwrap(), 10);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_cash = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_cash = not_a_number\n").unwrap();
        assert!(adapter.get_double("backtest", "initial_cash", 99.9).is_err());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\npath = /data/btc.csv\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/data/btc.csv".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
