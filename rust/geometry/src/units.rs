// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output unit resolution
//!
//! Kernel coordinates are millimetres. The exported document is either in
//! metres (`"m"`) or millimetres scaled by 0.001, which is what every other
//! token resolves to.

use std::fmt;

/// Requested output unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputUnit {
    Metre,
    #[default]
    Millimetre,
}

impl OutputUnit {
    /// Resolve a CLI token. Only `"m"` selects metres; anything else,
    /// including unknown or empty tokens, falls back to millimetres.
    pub fn from_token(token: &str) -> Self {
        match token {
            "m" => OutputUnit::Metre,
            _ => OutputUnit::Millimetre,
        }
    }

    /// Multiplier applied to every kernel coordinate
    #[inline]
    pub fn scale(self) -> f64 {
        match self {
            OutputUnit::Metre => 1.0,
            OutputUnit::Millimetre => 0.001,
        }
    }
}

impl fmt::Display for OutputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputUnit::Metre => write!(f, "m"),
            OutputUnit::Millimetre => write!(f, "mm"),
        }
    }
}

/// Scale factor for a unit token
#[inline]
pub fn unit_scale(token: &str) -> f64 {
    OutputUnit::from_token(token).scale()
}
