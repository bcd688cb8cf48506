use crate::config::FinancialConfig;

/// Years to recover `capex` from `annual_saving`.
///
/// Zero when nothing was spent (even if nothing is saved), infinite when nothing is saved.
pub fn simple_payback(capex: f64, annual_saving: f64) -> f64 {
    if capex <= 0. {
        0.
    } else if annual_saving <= 0. {
        f64::INFINITY
    } else {
        capex / annual_saving
    }
}

/// Whole years until cumulative discounted savings reach `capex`, or infinity if that does not
/// happen within the configured horizon.
pub fn discounted_payback(capex: f64, annual_saving: f64, financial: &FinancialConfig) -> f64 {
    if capex <= 0. {
        return 0.;
    }
    if annual_saving <= 0. {
        return f64::INFINITY;
    }

    let mut cumulative = 0.;
    for year in 1..=financial.horizon_years {
        cumulative += annual_saving / (1. + financial.discount_rate).powi(year as i32);
        if cumulative >= capex {
            return year as f64;
        }
    }

    f64::INFINITY
}
