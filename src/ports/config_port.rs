//! Configuration access port trait.
//!
//! Missing keys fall back to the caller's default; a value that is present
//! but does not parse is a [`BandtraderError::ConfigInvalid`].

use std::fmt::Display;
use std::str::FromStr;

use crate::domain::error::BandtraderError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, BandtraderError> {
        parse_value(section, key, self.get_string(section, key), default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, BandtraderError> {
        parse_value(section, key, self.get_string(section, key), default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, BandtraderError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                BandtraderError::invalid(
                    section,
                    key,
                    format!("expected true/false, yes/no or 1/0, got '{}'", raw.trim()),
                )
            }),
        }
    }
}

/// Read any `FromStr` value, e.g. the indicator and rule enums.
pub fn get_parsed<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, BandtraderError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(section, key, config.get_string(section, key), default)
}

fn parse_value<T>(
    section: &str,
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, BandtraderError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(s) if s.trim().is_empty() => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|e: T::Err| BandtraderError::invalid(section, key, format!("'{}': {}", s.trim(), e))),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
