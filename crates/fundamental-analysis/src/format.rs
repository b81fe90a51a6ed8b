//! Text rendering for the fundamentals panel. Missing values read `N/A`.

use analysis_core::FundamentalsSnapshot;

const NOT_AVAILABLE: &str = "N/A";

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}", v))
}

/// Whole dollars with thousands separators, e.g. `$3,421,000,000`.
pub fn dollars(value: f64) -> String {
    let rounded = value.abs().round() as u128;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{}${}", sign, grouped)
}

/// Label/value pairs in dashboard order.
pub trait FundamentalsDisplay {
    fn display_rows(&self) -> Vec<(&'static str, String)>;
}

impl FundamentalsDisplay for FundamentalsSnapshot {
    fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("P/E Ratio", ratio(self.trailing_pe)),
            ("EPS (TTM)", ratio(self.trailing_eps)),
            (
                "ROE",
                self.return_on_equity
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |r| format!("{:.2}%", r * 100.0)),
            ),
            ("Debt/Equity", ratio(self.debt_to_equity)),
            ("P/B Ratio", ratio(self.price_to_book)),
            (
                "Market Cap",
                self.market_cap.map_or_else(|| NOT_AVAILABLE.to_string(), dollars),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollars_grouping() {
        assert_eq!(dollars(0.0), "$0");
        assert_eq!(dollars(999.4), "$999");
        assert_eq!(dollars(1_000.0), "$1,000");
        assert_eq!(dollars(3_421_000_000.0), "$3,421,000,000");
        assert_eq!(dollars(-12_500.0), "-$12,500");
    }

    #[test]
    fn test_missing_values_render_na() {
        let rows = FundamentalsSnapshot::default().display_rows();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|(_, v)| v == "N/A"));
    }

    #[test]
    fn test_roe_renders_as_percent() {
        let snap = FundamentalsSnapshot {
            return_on_equity: Some(0.1567),
            trailing_pe: Some(28.456),
            ..Default::default()
        };
        let rows = snap.display_rows();
        assert_eq!(rows[0].1, "28.46");
        assert_eq!(rows[2].1, "15.67%");
    }
}
