//! Human-readable summary renderer for diff results.

use crate::diff::model::{ConfigurationSet, DiffResult, SetClassification};

/// Render a Markdown summary of a [`DiffResult`]
///
/// Intended for review screens. It is informational only and does not affect
/// the structured result.
pub fn render_human_summary(diff: &DiffResult) -> String {
    let mut out = String::new();
    let counts = diff.counts();

    out.push_str("## Annotation Diff\n\n");

    let sources: Vec<&str> = diff.sources.iter().map(|s| s.as_str()).collect();
    let layers: Vec<&str> = diff.layers.names().collect();
    out.push_str(&format!(
        "**Sources**: {}  \n**Layers**: {}\n\n",
        or_none(&sources.join(", ")),
        or_none(&layers.join(", "))
    ));

    out.push_str(&format!(
        "| Unanimous | Differing | Incomplete | Total |\n\
         |---|---|---|---|\n\
         | {} | {} | {} | {} |\n\n",
        counts.unanimous,
        counts.differing,
        counts.incomplete,
        counts.total()
    ));

    if counts.differing == 0 && counts.incomplete == 0 {
        out.push_str("_All sources agree._\n");
        return out;
    }

    out.push_str("### Sets requiring review\n\n");
    let mut header = String::from("| Position | Classification |");
    let mut rule = String::from("|---|---|");
    for source in &sources {
        header.push_str(&format!(" {} |", source));
        rule.push_str("---|");
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for (set, class) in diff.classified() {
        if class == SetClassification::Unanimous {
            continue;
        }
        out.push_str(&format!("| `{}` | {} |", set.position, class));
        for source in &diff.sources {
            out.push_str(&format!(" {} |", cell(set, source)));
        }
        out.push('\n');
    }

    out
}

fn cell(set: &ConfigurationSet, source: &crate::model::SourceLabel) -> String {
    let values: Vec<String> = set
        .configurations_for(source)
        .map(|c| {
            if c.is_slot() {
                "linked".to_string()
            } else if c.values.is_empty() {
                "(no value)".to_string()
            } else {
                c.values
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        })
        .collect();
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(" / ")
    }
}

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        "(none)"
    } else {
        s
    }
}
