//! CSV export of agreement results.
//!
//! Row order is stable: pairs lexicographic by label, units by position.

use crate::agreement::model::PairwiseAgreementResult;

/// One row per unit of every pair
///
/// Columns: `document,source_a,source_b,position,classification,category_a,category_b`.
pub fn render_agreement_csv(result: &PairwiseAgreementResult) -> String {
    let mut out =
        String::from("document,source_a,source_b,position,classification,category_a,category_b\n");
    for pair in &result.pairs {
        for unit in &pair.units {
            let row = [
                unit.document.clone().unwrap_or_default(),
                pair.source_a.to_string(),
                pair.source_b.to_string(),
                unit.position.to_string(),
                unit.classification.to_string(),
                unit.a.to_string(),
                unit.b.to_string(),
            ];
            push_row(&mut out, &row);
        }
    }
    out
}

/// One row per pair with its score and skip counters
///
/// Columns: `feature,measure,source_a,source_b,score,units,incomplete_units,stacked_units`.
/// An undefined score is written as an empty field.
pub fn render_score_csv(result: &PairwiseAgreementResult) -> String {
    let mut out = String::from(
        "feature,measure,source_a,source_b,score,units,incomplete_units,stacked_units\n",
    );
    for pair in &result.pairs {
        let row = [
            result.feature.to_string(),
            result.measure.clone(),
            pair.source_a.to_string(),
            pair.source_b.to_string(),
            pair.score.map(|s| format!("{:.4}", s)).unwrap_or_default(),
            pair.table.total().to_string(),
            pair.incomplete_units.to_string(),
            pair.stacked_units.to_string(),
        ];
        push_row(&mut out, &row);
    }
    out
}

fn push_row(out: &mut String, fields: &[String]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::{pairwise_agreement, FeatureId, PercentageAgreement};
    use crate::diff::diff;
    use crate::model::{AnnotationInstance, AnnotationStore, LayerSet, LinkCompareBehavior};

    #[test]
    fn test_escape_quotes_and_commas() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_rows_follow_pair_then_position_order() {
        let mut stores = Vec::new();
        for label in ["c", "a", "b"] {
            let mut s = AnnotationStore::new(label);
            s.push(AnnotationInstance::span("Entity", 10, 12).with_feature("value", "X"));
            s.push(AnnotationInstance::span("Entity", 0, 4).with_feature("value", "Y"));
            stores.push(s);
        }
        let d = diff(
            stores,
            LayerSet::from_names(["Entity"]),
            LinkCompareBehavior::TargetOnly,
        )
        .unwrap();
        let r = pairwise_agreement(
            &d,
            &FeatureId::new("Entity", "value"),
            &PercentageAgreement,
            true,
        )
        .unwrap();

        let csv = render_agreement_csv(&r);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + 3 * 2);
        assert!(lines[1].starts_with(",a,b,\"Entity[0,4]\""));
        assert!(lines[2].starts_with(",a,b,\"Entity[10,12]\""));
        assert!(lines[3].starts_with(",a,c,"));
        assert!(lines[5].starts_with(",b,c,"));

        let scores = render_score_csv(&r);
        assert!(scores.contains("Entity.value,percentage,a,b,1.0000,2,0,0"));
    }
}
