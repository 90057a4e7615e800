//! Configuration validation.
//!
//! Checks every parameter before a pipeline or backtest is built. Errors name
//! the INI section and key the value comes from.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::BandtraderError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::indicator::stddev::StddevMode;
use crate::domain::signal::SignalParams;

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), BandtraderError> {
    validate_initial_cash(config.initial_cash)?;
    validate_position_size(config.sizing.position_size)?;
    validate_exclusive_position(config.exclusive_position)?;
    validate_indicator_params(&config.indicators)?;
    validate_signal_params(&config.signal)?;
    Ok(())
}

pub fn validate_indicator_params(params: &IndicatorParams) -> Result<(), BandtraderError> {
    validate_bb_period(params.bb_period, params.stddev)?;
    validate_bb_std_multiplier(params.bb_std_multiplier)?;
    validate_rsi_period(params.rsi_period)?;
    Ok(())
}

pub fn validate_signal_params(params: &SignalParams) -> Result<(), BandtraderError> {
    validate_threshold("rsi_upper_threshold", params.rsi_upper_threshold)?;
    validate_threshold("rsi_lower_threshold", params.rsi_lower_threshold)?;
    validate_stop_loss_fraction(params.stop_loss_fraction)?;
    Ok(())
}

fn validate_bb_period(period: usize, mode: StddevMode) -> Result<(), BandtraderError> {
    if period == 0 {
        return Err(BandtraderError::invalid(
            "indicators",
            "bb_period",
            "bb_period must be at least 1",
        ));
    }
    if period <= mode.ddof() {
        return Err(BandtraderError::invalid(
            "indicators",
            "bb_period",
            format!("bb_period must be greater than {} for {} stddev", mode.ddof(), mode),
        ));
    }
    Ok(())
}

fn validate_bb_std_multiplier(value: f64) -> Result<(), BandtraderError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BandtraderError::invalid(
            "indicators",
            "bb_std_multiplier",
            "bb_std_multiplier must be positive",
        ));
    }
    Ok(())
}

fn validate_rsi_period(period: usize) -> Result<(), BandtraderError> {
    if period == 0 {
        return Err(BandtraderError::invalid(
            "indicators",
            "rsi_period",
            "rsi_period must be at least 1",
        ));
    }
    Ok(())
}

fn validate_threshold(key: &str, value: f64) -> Result<(), BandtraderError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(BandtraderError::invalid(
            "strategy",
            key,
            format!("{} must be between 0 and 100", key),
        ));
    }
    Ok(())
}

fn validate_stop_loss_fraction(value: f64) -> Result<(), BandtraderError> {
    if !(0.0..1.0).contains(&value) {
        return Err(BandtraderError::invalid(
            "strategy",
            "stop_loss_fraction",
            "stop_loss_fraction must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_initial_cash(value: f64) -> Result<(), BandtraderError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BandtraderError::invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_position_size(value: f64) -> Result<(), BandtraderError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(BandtraderError::invalid(
            "strategy",
            "position_size",
            "position_size must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_exclusive_position(value: bool) -> Result<(), BandtraderError> {
    if !value {
        return Err(BandtraderError::invalid(
            "strategy",
            "exclusive_position",
            "only exclusive positions are supported",
        ));
    }
    Ok(())
}
