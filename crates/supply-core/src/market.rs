use crate::constants::{TREND_WINDOW, VOLUME_RANGE};
use crate::entropy::{int_in, Entropy};
use crate::{MarketAnalysis, Predictions, PricePoint, Trend};

/// Summarise a price history. Volume and predictions are illustrative draws
/// around the mean, not a model.
pub fn analyse(history: &[PricePoint], rng: &mut dyn Entropy) -> MarketAnalysis {
    let mean = mean_price(history);
    MarketAnalysis {
        mean_price: mean,
        volatility: volatility(history),
        trend: trend(history),
        volume: int_in(rng, VOLUME_RANGE) as u64,
        predictions: Predictions {
            short_term: mean * rng.jitter(0.1),
            medium_term: mean * rng.jitter(0.2),
            long_term: mean * rng.jitter(0.3),
        },
    }
}

pub fn mean_price(history: &[PricePoint]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    history.iter().map(|p| p.price as f64).sum::<f64>() / history.len() as f64
}

/// Population standard deviation over mean, as a percentage rounded to two decimals.
///
/// A history with any spread never reports 0: sub-rounding values are floored at 0.01.
pub fn volatility(history: &[PricePoint]) -> f64 {
    let mean = mean_price(history);
    if mean == 0.0 {
        return 0.0;
    }
    let variance = history
        .iter()
        .map(|p| (p.price as f64 - mean).powi(2))
        .sum::<f64>()
        / history.len() as f64;
    let raw = variance.sqrt() / mean * 100.0;
    if raw == 0.0 {
        return 0.0;
    }
    ((raw * 100.0).round() / 100.0).max(0.01)
}

/// Compares the first and last of the most recent samples.
pub fn trend(history: &[PricePoint]) -> Trend {
    let recent = &history[history.len().saturating_sub(TREND_WINDOW)..];
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if last.price > first.price => Trend::Bullish,
        (Some(first), Some(last)) if last.price < first.price => Trend::Bearish,
        _ => Trend::Neutral,
    }
}
