// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export configuration loaded from environment variables and CLI flags.

use std::path::PathBuf;
use stepmesh_geometry::{OutputUnit, TessellationParams};
use tracing::debug;

/// Default linear deflection in millimetres.
pub const DEFAULT_DEFLECTION: f64 = 0.2;
/// Default angular deflection in radians.
pub const DEFAULT_ANGLE: f64 = 0.5;
/// Default output unit token.
pub const DEFAULT_UNIT: &str = "mm";

/// One export invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// STEP file to read.
    pub input: PathBuf,
    /// Maximum chord deviation.
    pub deflection: f64,
    /// Maximum angle between adjacent segments.
    pub angle: f64,
    /// Output unit token; only `"m"` selects metres.
    pub unit: String,
}

impl ExportConfig {
    /// Defaults for `input`, overridden by `STEPMESH_DEFLECTION`,
    /// `STEPMESH_ANGLE` and `STEPMESH_UNIT` when set. Command line flags
    /// applied by [`ExportConfig::from_args`] take precedence over both.
    pub fn from_env(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            deflection: env_number("STEPMESH_DEFLECTION").unwrap_or(DEFAULT_DEFLECTION),
            angle: env_number("STEPMESH_ANGLE").unwrap_or(DEFAULT_ANGLE),
            unit: env_value("STEPMESH_UNIT").unwrap_or_else(|| DEFAULT_UNIT.into()),
        }
    }

    /// Build from command line arguments (program name excluded):
    /// `<file> [--deflection <f>] [--angle <f>] [--unit <token>]`.
    ///
    /// Returns None when the file argument is missing. Numbers are read from
    /// the start of the value; values without one keep the previous setting.
    /// A trailing flag without a value and unknown arguments are ignored.
    pub fn from_args<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let input = args.next()?;
        let mut config = Self::from_env(input.as_ref());

        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--deflection" => {
                    if let Some(value) = args.next() {
                        config.deflection = parse_number(value.as_ref()).unwrap_or(config.deflection);
                    }
                }
                "--angle" => {
                    if let Some(value) = args.next() {
                        config.angle = parse_number(value.as_ref()).unwrap_or(config.angle);
                    }
                }
                "--unit" => {
                    if let Some(value) = args.next() {
                        config.unit = value.as_ref().to_string();
                    }
                }
                _ => {}
            }
        }

        Some(config)
    }

    pub fn tessellation_params(&self) -> TessellationParams {
        TessellationParams::new(self.deflection, self.angle)
    }

    pub fn output_unit(&self) -> OutputUnit {
        OutputUnit::from_token(&self.unit)
    }
}

fn env_value(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    debug!(variable = name, value = %value, "configuration from environment");
    Some(value)
}

fn env_number(name: &str) -> Option<f64> {
    env_value(name).and_then(|v| parse_number(&v))
}

/// Read the leading number of `value`: `0.3rad` gives 0.3. Text without a
/// leading number, overflow to infinity and NaN give None.
fn parse_number(value: &str) -> Option<f64> {
    match fast_float::parse_partial::<f64, _>(value.trim_start()) {
        Ok((number, consumed)) if consumed > 0 && number.is_finite() => Some(number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Option<ExportConfig> {
        ExportConfig::from_args(args.iter().copied())
    }

    #[test]
    fn test_missing_input() {
        assert!(config(&[]).is_none());
    }

    #[test]
    fn test_flags() {
        let c = config(&["part.step", "--deflection", "0.05", "--angle", "0.2", "--unit", "m"]).unwrap();
        assert_eq!(c.input, PathBuf::from("part.step"));
        assert_eq!(c.deflection, 0.05);
        assert_eq!(c.angle, 0.2);
        assert_eq!(c.output_unit(), OutputUnit::Metre);
        assert_eq!(c.tessellation_params(), TessellationParams::new(0.05, 0.2));
    }

    #[test]
    fn test_invalid_number_keeps_previous_value() {
        let c = config(&["part.step", "--deflection", "0.1", "--deflection", "fine"]).unwrap();
        assert_eq!(c.deflection, 0.1);
    }

    #[test]
    fn test_trailing_flag_and_unknown_arguments_ignored() {
        let c = config(&["part.step", "--verbose", "--unit", "m", "--angle"]).unwrap();
        assert_eq!(c.unit, "m");
        assert_eq!(c.angle, ExportConfig::from_env("part.step").angle);
    }

    #[test]
    fn test_unknown_unit_is_millimetres() {
        let c = config(&["part.step", "--unit", "inch"]).unwrap();
        assert_eq!(c.output_unit(), OutputUnit::Millimetre);
    }

    #[test]
    fn test_numeric_prefix_is_read() {
        let c = config(&["part.step", "--angle", "0.3rad", "--deflection", " 0.05mm"]).unwrap();
        assert_eq!(c.angle, 0.3);
        assert_eq!(c.deflection, 0.05);
    }

    #[test]
    fn test_out_of_range_and_nan_fall_back() {
        let c = config(&["part.step", "--deflection", "1e400", "--angle", "nan"]).unwrap();
        let defaults = ExportConfig::from_env("part.step");
        assert_eq!(c.deflection, defaults.deflection);
        assert_eq!(c.angle, defaults.angle);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("2"), Some(2.0));
        assert_eq!(parse_number("-1.5e-1x"), Some(-0.15));
        assert_eq!(parse_number("rad0.3"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-1e999"), None);
        assert_eq!(parse_number("inf"), None);
    }
}
