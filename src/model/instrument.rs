//! Instrument identity (spec §3): underlying, expiry, strike, type.
//! Grounded on `options-engine`'s `OptionContract`/`IndexOption`, trimmed to
//! the identity fields the spec calls for — lot size and tick size move to
//! config/adapters since the spec scopes broker wire formats out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Ce,
    Pe,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Ce => write!(f, "CE"),
            OptionType::Pe => write!(f, "PE"),
        }
    }
}

/// Underlying index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Underlying {
    Nifty,
    BankNifty,
}

/// Instrument identity: (underlying, expiry, strike, type). Two instruments
/// with equal identity fields are the same instrument (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub underlying: Underlying,
    pub expiry_days_code: i32,
    pub strike: i64,
    pub option_type: OptionType,
}

/// A cheap, `Copy` handle used as a hash-map key and ring-buffer index,
/// derived from `Instrument`'s identity fields.
pub type InstrumentId = Instrument;

impl Instrument {
    pub fn new(underlying: Underlying, expiry_days_code: i32, strike: i64, option_type: OptionType) -> Self {
        Self { underlying, expiry_days_code, strike, option_type }
    }

    pub fn id(&self) -> InstrumentId {
        *self
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self.underlying {
            Underlying::Nifty => "NIFTY",
            Underlying::BankNifty => "BANKNIFTY",
        };
        write!(f, "{sym}{}{}", self.strike, self.option_type)
    }
}
