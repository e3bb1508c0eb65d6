use std::fmt::Write;

use chrono::NaiveDate;

use crate::compare;
use crate::dataset;
use crate::frequency::{self, FrequencyMatrix};
use crate::index::knowledge_index;
use crate::models::{Outcome, Scope, SurveyRecord};

pub fn build_report(records: &[SurveyRecord], generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Diversity Survey Report");
    let _ = writeln!(
        output,
        "Generated on {} from {} responses.",
        generated_on,
        records.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Respondents by Course and Year");
    let counts = dataset::respondent_counts(records);
    if counts.is_empty() {
        let _ = writeln!(output, "No responses recorded.");
    } else {
        for group in counts.iter() {
            let _ = writeln!(
                output,
                "- {} / {}: {} respondents",
                group.course, group.year, group.respondents
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Knowledge Indices");
    let everyone: Vec<&SurveyRecord> = records.iter().collect();
    let matrix = FrequencyMatrix::from_records(&everyone);
    for scope in Scope::ALL {
        let index = knowledge_index(&matrix, scope);
        let _ = writeln!(output, "- {}: {:.1}%", scope.label(), index.mean);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Frequency Statistics by Course and Year");
    let cells = frequency::grouped_cells(records);
    let stats = frequency::group_frequency_stats(&cells);
    if stats.is_empty() {
        let _ = writeln!(output, "No responses recorded.");
    } else {
        for group in stats.iter() {
            let _ = writeln!(
                output,
                "- {} / {}: mean {:.2}, median {:.1}, std dev {:.2}, range {}-{}",
                group.course, group.year, group.mean, group.median, group.std_dev, group.min,
                group.max
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Significant Differences (p < 0.05)");
    let results = compare::compare_all(records);
    let findings = compare::significant(&results);
    if findings.is_empty() {
        let _ = writeln!(output, "No significant differences found.");
    } else {
        for comparison in findings.iter() {
            if let Outcome::Computed {
                statistic, p_value, ..
            } = comparison.outcome
            {
                let _ = writeln!(
                    output,
                    "- {} ({}) on {}: statistic {:.3}, p-value {:.4}",
                    comparison.test.label(),
                    comparison.factor.label(),
                    comparison.target.describe(),
                    statistic,
                    p_value
                );
            }
        }
    }

    let skipped = results
        .iter()
        .filter(|comparison| matches!(comparison.outcome, Outcome::Insufficient { .. }))
        .count();
    if skipped > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{skipped} comparisons lacked sufficient data and were skipped."
        );
    }

    output
}
