use analysis_core::{CompanyProfile, Financials, FundamentalsSnapshot};

pub mod format;
pub use format::FundamentalsDisplay;

/// Derives the dashboard's headline ratios from provider statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    fn calculate_pe_ratio(&self, price: f64, eps: f64) -> Option<f64> {
        if eps > 0.0 && price > 0.0 {
            Some(price / eps)
        } else {
            None
        }
    }

    fn calculate_pb_ratio(&self, market_cap: f64, equity: f64) -> Option<f64> {
        if market_cap > 0.0 && equity > 0.0 {
            Some(market_cap / equity)
        } else {
            None
        }
    }

    fn calculate_debt_to_equity(&self, liabilities: f64, equity: f64) -> Option<f64> {
        if equity > 0.0 {
            Some(liabilities / equity)
        } else {
            None
        }
    }

    /// Fraction, not percent.
    fn calculate_roe(&self, net_income: f64, equity: f64) -> Option<f64> {
        if equity > 0.0 {
            Some(net_income / equity)
        } else {
            None
        }
    }

    /// Trailing-twelve-month value of a flow metric: the sum of the latest four
    /// quarters when all four report it, otherwise the latest annual (or TTM) row.
    fn trailing(financials: &[Financials], accessor: fn(&Financials) -> Option<f64>) -> Option<f64> {
        let quarters: Vec<f64> = financials
            .iter()
            .filter(|f| f.is_quarterly())
            .take(4)
            .map(accessor)
            .collect::<Option<Vec<f64>>>()
            .unwrap_or_default();

        if quarters.len() == 4 {
            return Some(quarters.iter().sum());
        }

        financials
            .iter()
            .filter(|f| !f.is_quarterly())
            .find_map(accessor)
    }

    /// Balance-sheet items are point-in-time: take the latest period reporting them.
    fn latest(financials: &[Financials], accessor: fn(&Financials) -> Option<f64>) -> Option<f64> {
        financials.iter().find_map(accessor)
    }

    pub fn snapshot(&self, profile: &CompanyProfile, last_close: Option<f64>) -> FundamentalsSnapshot {
        let financials = &profile.financials;

        let trailing_eps = Self::trailing(financials, |f| f.eps);
        let trailing_net_income = Self::trailing(financials, |f| f.net_income);
        let equity = Self::latest(financials, |f| f.shareholders_equity);
        let liabilities = Self::latest(financials, |f| f.total_liabilities);

        let snapshot = FundamentalsSnapshot {
            trailing_pe: last_close.zip(trailing_eps).and_then(|(p, e)| self.calculate_pe_ratio(p, e)),
            trailing_eps,
            return_on_equity: trailing_net_income.zip(equity).and_then(|(n, e)| self.calculate_roe(n, e)),
            debt_to_equity: liabilities.zip(equity).and_then(|(l, e)| self.calculate_debt_to_equity(l, e)),
            price_to_book: profile.market_cap.zip(equity).and_then(|(m, e)| self.calculate_pb_ratio(m, e)),
            market_cap: profile.market_cap,
        };

        tracing::debug!(
            "Fundamentals from {} periods: eps={:?} pe={:?}",
            financials.len(),
            snapshot.trailing_eps,
            snapshot.trailing_pe
        );
        snapshot
    }
}
