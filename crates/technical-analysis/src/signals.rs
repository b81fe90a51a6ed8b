use analysis_core::{CrossoverSignal, OscillatorSignal};
use serde::{Deserialize, Serialize};

use crate::engine::{IndicatorSet, IndicatorValues};
use crate::indicators::last_pair;

pub const OVERBOUGHT_LEVEL: f64 = 70.0;
pub const OVERSOLD_LEVEL: f64 = 30.0;

/// Signals derived from the latest two points of each classified indicator.
/// `None` means the indicator was not requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub oscillator: Option<OscillatorSignal>,
    pub crossover: Option<CrossoverSignal>,
}

/// Turns indicator readings into categorical signals.
///
/// The oscillator is edge-triggered: crossing into a zone and staying in it are
/// separate signals. Missing readings classify as `Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalClassifier;

impl SignalClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_oscillator(&self, previous: Option<f64>, latest: Option<f64>) -> OscillatorSignal {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let (Some(previous), Some(latest)) = (finite(previous), finite(latest)) else {
            return OscillatorSignal::Unavailable;
        };

        if latest > OVERBOUGHT_LEVEL {
            if previous > OVERBOUGHT_LEVEL {
                OscillatorSignal::SustainedOverbought
            } else {
                OscillatorSignal::EnteredOverbought
            }
        } else if latest < OVERSOLD_LEVEL {
            if previous < OVERSOLD_LEVEL {
                OscillatorSignal::SustainedOversold
            } else {
                OscillatorSignal::EnteredOversold
            }
        } else {
            OscillatorSignal::Neutral
        }
    }

    /// `previous` and `latest` are (primary, signal) pairs.
    pub fn classify_crossover(
        &self,
        previous: Option<(f64, f64)>,
        latest: Option<(f64, f64)>,
    ) -> CrossoverSignal {
        let (Some((prev_primary, prev_signal)), Some((primary, signal))) = (previous, latest) else {
            return CrossoverSignal::Unavailable;
        };

        if prev_primary < prev_signal && primary > signal {
            CrossoverSignal::BullishCrossover
        } else if prev_primary > prev_signal && primary < signal {
            CrossoverSignal::BearishCrossover
        } else {
            CrossoverSignal::NoCrossover
        }
    }

    /// Classify an oscillator entry from the indicator set.
    pub fn oscillator_signal(&self, values: &IndicatorValues) -> OscillatorSignal {
        match values {
            IndicatorValues::Line { values } => match last_pair(values) {
                Some((previous, latest)) => self.classify_oscillator(Some(previous), Some(latest)),
                None => OscillatorSignal::Unavailable,
            },
            _ => OscillatorSignal::Unavailable,
        }
    }

    /// Classify a convergence entry from the indicator set.
    pub fn crossover_signal(&self, values: &IndicatorValues) -> CrossoverSignal {
        match values {
            IndicatorValues::Convergence { primary, signal } => {
                let (Some((p0, p1)), Some((s0, s1))) = (last_pair(primary), last_pair(signal)) else {
                    return CrossoverSignal::Unavailable;
                };
                self.classify_crossover(Some((p0, s0)), Some((p1, s1)))
            }
            _ => CrossoverSignal::Unavailable,
        }
    }

    pub fn summarize(&self, set: &IndicatorSet) -> SignalSummary {
        SignalSummary {
            oscillator: set.oscillator().map(|v| self.oscillator_signal(v)),
            crossover: set.convergence().map(|v| self.crossover_signal(v)),
        }
    }
}
