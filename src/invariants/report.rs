//! Plain-text audit report for an [`InvariantSet`].

use super::InvariantSet;

const RULE_WIDTH: usize = 70;

/// Format an integer with `,` thousands separators.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn or_na(value: Option<f64>, suffix: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v}{suffix}"))
}

/// Render the invariant set as the multi-section audit block.
pub fn render(inv: &InvariantSet, exported_columns: usize) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "SHIFT PIPELINE - ALGORITHMIC INTEGRITY AUDIT".to_string(),
        rule.clone(),
        format!("  Shifts total:         {}", inv.n_total),
        format!("  Shifts valid (ROI):   {}", inv.n_valid_roi),
        format!(
            "  Integrity gap:        {} (expense = 0 -> ROI null)",
            inv.integrity_gap()
        ),
        String::new(),
        "  -- FINANCIALS --------------------------------------".to_string(),
        format!("  Gross income:         ${}", group_thousands(inv.gross_income_total)),
        format!("  Operating expense:    ${}", group_thousands(inv.expense_total)),
        format!("  Net profit:           ${}", group_thousands(inv.net_profit_total)),
        format!(
            "  Period ROI:           {}   [N={}]",
            or_na(inv.period_roi, "%"),
            inv.n_valid_roi
        ),
        String::new(),
        "  -- DISTANCE ASYMMETRY ------------------------------".to_string(),
        format!("  km reference:         {} km", inv.km_reference_total),
        format!("  km platform:          {} km", inv.km_platform_total),
        format!("  km phantom:           {} km", inv.km_phantom_total),
        format!("  Ratio mean:           {}", or_na(inv.ratio_mean, "x")),
        format!("  Ratio median:         {}", or_na(inv.ratio_median, "x")),
    ];

    lines.push(match inv.ratio_ci95 {
        Some(ci) => format!("  Ratio 95% CI:         [{}, {}]", ci.lo, ci.hi),
        None => "  Ratio 95% CI:         n/a (fewer than 2 ratios)".to_string(),
    });
    lines.push(String::new());

    lines.push("  -- PRESCRIPTIVE MODEL ------------------------------".to_string());
    match &inv.regression {
        Some(m) => {
            lines.push(format!("  Slope (orders->net):  ${} per order", m.slope));
            lines.push(format!("  Intercept:            ${}", m.intercept));
            lines.push(format!("  Pearson r:            {}    p={}", m.r, m.p_value));
            lines.push(format!(
                "  R-squared:            {} ({:.1}% variance explained)",
                m.r_squared,
                m.r_squared * 100.0
            ));
            lines.push(format!("  Residual sigma:       ${}", m.residual_sigma));
        }
        None => lines.push(
            "  Regression:           n/a (needs 3+ shifts with varying orders)".to_string(),
        ),
    }

    lines.push(rule.clone());
    lines.push(format!("  Pipeline complete - {exported_columns} columns exported"));
    lines.push(rule);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::statistics::ConfidenceInterval;
    use crate::invariants::RegressionModel;

    fn sample() -> InvariantSet {
        InvariantSet {
            n_total: 4,
            n_valid_roi: 3,
            gross_income_total: 1_234_567,
            expense_total: 100_000,
            net_profit_total: 1_134_567,
            period_roi: Some(782.24),
            km_reference_total: 120.5,
            km_platform_total: 205.25,
            km_phantom_total: 84.75,
            ratio_mean: Some(1.706),
            ratio_median: Some(1.7),
            ratio_ci95: Some(ConfidenceInterval { lo: 1.6, hi: 1.81 }),
            regression: Some(RegressionModel {
                slope: 14_940.0,
                intercept: -54_378.0,
                r: 0.912,
                r_squared: 0.832,
                p_value: 0.000_123,
                residual_sigma: 51_320.0,
            }),
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(-1_234_567), "-1,234,567");
    }

    #[test]
    fn report_lists_every_section() {
        let text = render(&sample(), 28);
        assert!(text.contains("Integrity gap:        1"));
        assert!(text.contains("$1,234,567"));
        assert!(text.contains("782.24%"));
        assert!(text.contains("[1.6, 1.81]"));
        assert!(text.contains("83.2% variance explained"));
        assert!(text.contains("28 columns exported"));
        assert!(text.ends_with("=\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("====")).count(), 4);
    }

    #[test]
    fn missing_values_render_as_na() {
        let mut inv = sample();
        inv.period_roi = None;
        inv.ratio_ci95 = None;
        inv.regression = None;
        let text = render(&inv, 9);
        assert!(text.contains("Period ROI:           n/a"));
        assert!(text.contains("fewer than 2 ratios"));
        assert!(text.contains("Regression:           n/a"));
    }
}
