//! Regime detector (spec §4.6): classifies the current market from a
//! VIX-like IV mean, ATR%, and a trend-strength signal, and maps the
//! classification to a trading posture.

use crate::model::MarketRegime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldingStyle {
    Quick,
    Normal,
    Runner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posture {
    pub trade_frequency_multiplier: f64,
    pub size_multiplier: f64,
    pub holding_style: HoldingStyle,
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    pub iv_mean: f64,
    pub atr_pct: f64,
    pub trend_strength: f64,
}

/// `trend_strength` is signed: positive favors bull, negative favors bear,
/// magnitude below the choppy threshold means no clear trend.
pub fn classify(inputs: RegimeInputs) -> MarketRegime {
    const HIGH_VOL_IV: f64 = 0.35;
    const LOW_VOL_IV: f64 = 0.12;
    const HIGH_ATR: f64 = 0.015;
    const TREND_THRESHOLD: f64 = 0.4;

    if inputs.iv_mean >= HIGH_VOL_IV || inputs.atr_pct >= HIGH_ATR {
        return MarketRegime::HighVol;
    }
    if inputs.iv_mean <= LOW_VOL_IV {
        return MarketRegime::LowVol;
    }
    if inputs.trend_strength >= TREND_THRESHOLD {
        return MarketRegime::TrendingBull;
    }
    if inputs.trend_strength <= -TREND_THRESHOLD {
        return MarketRegime::TrendingBear;
    }
    MarketRegime::Choppy
}

pub fn posture_for(regime: MarketRegime) -> Posture {
    match regime {
        MarketRegime::HighVol => Posture { trade_frequency_multiplier: 0.5, size_multiplier: 0.6, holding_style: HoldingStyle::Quick },
        MarketRegime::LowVol => Posture { trade_frequency_multiplier: 0.7, size_multiplier: 0.8, holding_style: HoldingStyle::Normal },
        MarketRegime::TrendingBull | MarketRegime::TrendingBear => {
            Posture { trade_frequency_multiplier: 1.2, size_multiplier: 1.1, holding_style: HoldingStyle::Runner }
        }
        MarketRegime::Choppy => Posture { trade_frequency_multiplier: 0.6, size_multiplier: 0.7, holding_style: HoldingStyle::Quick },
        MarketRegime::EventDriven => Posture { trade_frequency_multiplier: 0.3, size_multiplier: 0.5, holding_style: HoldingStyle::Quick },
        MarketRegime::Normal => Posture { trade_frequency_multiplier: 1.0, size_multiplier: 1.0, holding_style: HoldingStyle::Normal },
    }
}
