use serde::Serialize;

/// Statutory fixed conversion rate: 1 EUR = 1.95583 BGN.
/// Set by the currency board law; never recalculated or fetched.
pub const EUR_BGN_RATE: f64 = 1.95583;

/// Rounds a money amount to two decimals, half-up at the cent boundary.
///
/// Every intermediate result in a change calculation goes through this,
/// matching cash-register behavior where each displayed subtotal is itself
/// a rounded figure.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a free-text money amount.
///
/// Accepts comma or dot as the decimal separator. Empty or non-numeric
/// input parses to 0.00, and so does anything negative (money amounts are
/// non-negative). The result is rounded to cents.
pub fn parse_amount(input: &str) -> f64 {
    let normalized = input.trim().replace(',', ".");
    let parsed = normalized.parse::<f64>().unwrap_or(0.0);
    if !parsed.is_finite() || parsed < 0.0 {
        return 0.0;
    }
    round_cents(parsed)
}

/// Converts BGN to EUR by dividing by the fixed rate.
///
/// Division by 1.95583 is the legally prescribed conversion direction;
/// multiplying by a precomputed reciprocal differs in the last decimal on
/// some inputs and is not acceptable here.
pub fn bgn_to_eur(bgn: f64) -> f64 {
    round_cents(bgn / EUR_BGN_RATE)
}

/// Converts EUR to BGN by multiplying by the fixed rate.
pub fn eur_to_bgn(eur: f64) -> f64 {
    round_cents(eur * EUR_BGN_RATE)
}

/// Result of a change calculation. All amounts are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeBreakdown {
    /// The BGN payment expressed in EUR.
    pub paid_bgn_in_eur: f64,
    /// Total paid, in EUR.
    pub total_paid_eur: f64,
    /// Change due in EUR; 0.00 when the payment is insufficient.
    pub change_eur: f64,
    /// Change due expressed in BGN.
    pub change_bgn: f64,
    /// Whether the payment covers the price.
    pub sufficient: bool,
}

/// Computes change due for a price in EUR paid with a mix of BGN and EUR.
///
/// Pure and synchronous: identical inputs always yield identical outputs.
/// An insufficient payment is not an error; change is reported as 0.00 and
/// `sufficient` is false.
pub fn compute_change(price_eur: f64, paid_bgn: f64, paid_eur: f64) -> ChangeBreakdown {
    let price_eur = round_cents(price_eur);
    let paid_bgn = round_cents(paid_bgn);
    let paid_eur = round_cents(paid_eur);

    let paid_bgn_in_eur = bgn_to_eur(paid_bgn);
    let total_paid_eur = round_cents(paid_eur + paid_bgn_in_eur);
    let sufficient = total_paid_eur >= price_eur || price_eur == 0.0;

    let change_eur = if sufficient {
        round_cents(total_paid_eur - price_eur)
    } else {
        0.0
    };

    ChangeBreakdown {
        paid_bgn_in_eur,
        total_paid_eur,
        change_eur,
        change_bgn: eur_to_bgn(change_eur),
        sufficient,
    }
}
