//! Agreement measures.
//!
//! A measure turns a filled contingency table into a scalar. Measures differ
//! in whether they can treat "no annotation" as a category of its own; the
//! calculator refuses to run a measure on tables it cannot represent.

use crate::agreement::model::ContingencyTable;
use crate::errors::{ConcordError, Result};

/// Pluggable agreement coefficient
pub trait AgreementMeasure: Send + Sync {
    /// Stable name used in configuration and reports
    fn name(&self) -> &'static str;

    /// Whether [`Category::Absent`](crate::agreement::Category::Absent) is a valid category
    fn supports_absent(&self) -> bool;

    /// Score a table; `None` when there are no units or the coefficient is undefined
    fn score(&self, table: &ContingencyTable) -> Option<f64>;
}

/// Share of units on which both sources chose the same category
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentageAgreement;

impl AgreementMeasure for PercentageAgreement {
    fn name(&self) -> &'static str {
        "percentage"
    }

    fn supports_absent(&self) -> bool {
        true
    }

    fn score(&self, table: &ContingencyTable) -> Option<f64> {
        let total = table.total();
        if total == 0 {
            return None;
        }
        Some(table.agreed() as f64 / total as f64)
    }
}

/// Cohen's kappa for two raters
#[derive(Debug, Clone, Copy, Default)]
pub struct CohenKappa;

impl AgreementMeasure for CohenKappa {
    fn name(&self) -> &'static str {
        "cohen_kappa"
    }

    fn supports_absent(&self) -> bool {
        false
    }

    fn score(&self, table: &ContingencyTable) -> Option<f64> {
        let n = table.total() as f64;
        if n == 0.0 {
            return None;
        }
        let observed = table.agreed() as f64 / n;
        let marg_b = table.marginals_b();
        let expected: f64 = table
            .marginals_a()
            .iter()
            .map(|(cat, count_a)| {
                let count_b = marg_b.get(cat).copied().unwrap_or(0);
                (*count_a as f64 / n) * (count_b as f64 / n)
            })
            .sum();
        chance_corrected(observed, expected)
    }
}

/// Krippendorff's alpha with the nominal distance, two coders, no missing values
#[derive(Debug, Clone, Copy, Default)]
pub struct KrippendorffAlphaNominal;

impl AgreementMeasure for KrippendorffAlphaNominal {
    fn name(&self) -> &'static str {
        "krippendorff_alpha"
    }

    fn supports_absent(&self) -> bool {
        false
    }

    fn score(&self, table: &ContingencyTable) -> Option<f64> {
        let units = table.total();
        if units == 0 {
            return None;
        }
        // Each unit contributes two pairable values to the coincidence matrix
        let n = (2 * units) as f64;
        let mut pooled = table.marginals_a();
        for (cat, count) in table.marginals_b() {
            *pooled.entry(cat).or_insert(0) += count;
        }
        let sum_sq: f64 = pooled.values().map(|c| (*c as f64) * (*c as f64)).sum();

        let observed_disagreement = (units - table.agreed()) as f64 / units as f64;
        let expected_disagreement = (n * n - sum_sq) / (n * (n - 1.0));

        if expected_disagreement == 0.0 {
            return if observed_disagreement == 0.0 {
                Some(1.0)
            } else {
                None
            };
        }
        Some(1.0 - observed_disagreement / expected_disagreement)
    }
}

/// `(po - pe) / (1 - pe)`, with perfect agreement on a single category scoring 1
fn chance_corrected(observed: f64, expected: f64) -> Option<f64> {
    if (1.0 - expected).abs() < f64::EPSILON {
        return if (1.0 - observed).abs() < f64::EPSILON {
            Some(1.0)
        } else {
            None
        };
    }
    Some((observed - expected) / (1.0 - expected))
}

/// Names accepted by [`measure_by_name`]
pub const MEASURE_NAMES: &[&str] = &["percentage", "cohen_kappa", "krippendorff_alpha"];

/// Look up a reference measure by its configuration name
///
/// # Errors
///
/// Returns `UnknownMeasure` for any name not in [`MEASURE_NAMES`].
pub fn measure_by_name(name: &str) -> Result<Box<dyn AgreementMeasure>> {
    match name {
        "percentage" | "percent" => Ok(Box::new(PercentageAgreement)),
        "cohen_kappa" | "kappa" => Ok(Box::new(CohenKappa)),
        "krippendorff_alpha" | "alpha" => Ok(Box::new(KrippendorffAlphaNominal)),
        other => Err(ConcordError::UnknownMeasure {
            name: other.to_string(),
        }),
    }
}

/// Landis & Koch reading of a chance-corrected coefficient
pub fn interpretation(score: f64) -> &'static str {
    match score {
        s if s < 0.0 => "poor",
        s if s <= 0.20 => "slight",
        s if s <= 0.40 => "fair",
        s if s <= 0.60 => "moderate",
        s if s <= 0.80 => "substantial",
        _ => "almost perfect",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::model::Category;

    fn cat(s: &str) -> Category {
        Category::Value(s.into())
    }

    fn table(pairs: &[(&str, &str)]) -> ContingencyTable {
        let mut t = ContingencyTable::new();
        for (a, b) in pairs {
            t.add(cat(a), cat(b));
        }
        t
    }

    #[test]
    fn test_percentage_two_of_three() {
        let t = table(&[("ORG", "ORG"), ("PER", "PER"), ("LOC", "ORG")]);
        let score = PercentageAgreement.score(&t).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_has_no_score() {
        let t = ContingencyTable::new();
        assert_eq!(PercentageAgreement.score(&t), None);
        assert_eq!(CohenKappa.score(&t), None);
        assert_eq!(KrippendorffAlphaNominal.score(&t), None);
    }

    #[test]
    fn test_kappa_known_value() {
        // po = 0.7, pe = 0.5*0.6 + 0.5*0.4 = 0.5, kappa = 0.4
        let mut t = ContingencyTable::new();
        for _ in 0..4 {
            t.add(cat("y"), cat("y"));
        }
        t.add(cat("y"), cat("n"));
        for _ in 0..2 {
            t.add(cat("n"), cat("y"));
        }
        for _ in 0..3 {
            t.add(cat("n"), cat("n"));
        }
        let kappa = CohenKappa.score(&t).unwrap();
        assert!((kappa - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_single_category_perfect_agreement() {
        let t = table(&[("ORG", "ORG"), ("ORG", "ORG")]);
        assert_eq!(CohenKappa.score(&t), Some(1.0));
        assert_eq!(KrippendorffAlphaNominal.score(&t), Some(1.0));
    }

    #[test]
    fn test_alpha_perfect_and_imperfect() {
        let perfect = table(&[("a", "a"), ("b", "b")]);
        assert!((KrippendorffAlphaNominal.score(&perfect).unwrap() - 1.0).abs() < 1e-9);

        // 4 units, 2 disagreements: Do = 0.5; pooled a=4 b=4, De = (64-32)/56
        let t = table(&[("a", "a"), ("b", "b"), ("a", "b"), ("b", "a")]);
        let alpha = KrippendorffAlphaNominal.score(&t).unwrap();
        let expected = 1.0 - 0.5 / (32.0 / 56.0);
        assert!((alpha - expected).abs() < 1e-9);
    }

    #[test]
    fn test_measure_lookup() {
        assert_eq!(measure_by_name("kappa").unwrap().name(), "cohen_kappa");
        assert!(measure_by_name("percentage").unwrap().supports_absent());
        assert!(matches!(
            measure_by_name("fleiss"),
            Err(ConcordError::UnknownMeasure { .. })
        ));
    }

    #[test]
    fn test_interpretation_bands() {
        assert_eq!(interpretation(-0.1), "poor");
        assert_eq!(interpretation(0.5), "moderate");
        assert_eq!(interpretation(0.95), "almost perfect");
    }
}
