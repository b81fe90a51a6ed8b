use analysis_core::{AnalysisError, PolarityModel};
use async_trait::async_trait;
use std::collections::HashSet;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "rallies", "surge", "surges", "gain", "gains", "profit", "growth", "beat", "beats",
    "upgrade", "outperform", "strong", "positive", "rise", "rises", "increase",
    "breakthrough", "innovation", "success", "exceed", "exceeds", "momentum",
    "buy", "recommend", "optimistic", "record", "high", "advance",
    // Financial-specific terms
    "dividend", "buyback", "repurchase", "accretive", "upside",
    "recovery", "rebound", "expansion", "robust", "accelerating",
    "overweight", "raised", "upgraded", "outpacing", "tailwind",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge", "plunges", "crash", "miss", "misses",
    "downgrade", "underperform", "weak", "negative", "drop", "drops", "decrease",
    "concern", "concerns", "risk", "fail", "disappoint", "slump", "sell",
    "warning", "pessimistic", "low", "retreat", "fear", "fears", "trouble",
    // Financial-specific terms
    "dilution", "dilutive", "headwind", "lawsuit", "litigation",
    "recall", "investigation", "probe", "default", "bankruptcy",
    "restructuring", "layoff", "layoffs", "downside", "overvalued", "bubble",
    "underweight", "lowered", "suspended", "downgraded",
];

/// Word-list polarity model with negation handling.
///
/// Each matched word contributes +1 or -1 (flipped when a negation word sits
/// within three words before it); the polarity is the mean contribution, so it
/// always lies in [-1, 1]. Text with no matched words scores 0.
pub struct LexiconPolarity {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl LexiconPolarity {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    pub fn score_text(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        // Split into words, stripping common punctuation
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut total: i32 = 0;
        let mut matched: i32 = 0;

        for (i, word) in words.iter().enumerate() {
            let direction = if self.positive.contains(*word) {
                1
            } else if self.negative.contains(*word) {
                -1
            } else {
                continue;
            };

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            total += if negated { -direction } else { direction };
            matched += 1;
        }

        if matched == 0 {
            0.0
        } else {
            total as f64 / matched as f64
        }
    }
}

impl Default for LexiconPolarity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolarityModel for LexiconPolarity {
    async fn polarity(&self, texts: &[String]) -> Result<Vec<f64>, AnalysisError> {
        Ok(texts.iter().map(|t| self.score_text(t)).collect())
    }
}
