use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod compare;
mod dataset;
mod frequency;
mod index;
mod models;
mod report;
mod stats;

use models::{AnswerCategory, Outcome, Scope, QUESTION_COUNT};

#[derive(Parser)]
#[command(name = "survey-insights")]
#[command(about = "Aggregation and statistics engine for the diversity survey", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-question answer frequency table
    Frequencies {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Knowledge indices for the four scopes
    Indices {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Group comparison statistics across courses and years
    Compare {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        significant_only: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Frequencies { csv, course, year } => {
            let records = dataset::load_csv(&csv)?;
            let filter = dataset::RowFilter::from_options(course, year);
            let rows = dataset::filter_records(&records, &filter);
            let matrix = frequency::FrequencyMatrix::from_records(&rows);

            println!(
                "Frequencies for {} ({} respondents):",
                filter.describe(),
                rows.len()
            );
            let header: Vec<&str> = AnswerCategory::ALL.iter().map(|c| c.label()).collect();
            println!("Questão | {}", header.join(" | "));
            for question in 1..=QUESTION_COUNT as u8 {
                let counts: Vec<String> = AnswerCategory::ALL
                    .iter()
                    .map(|category| matrix.count(question, *category).to_string())
                    .collect();
                println!("Q{question} | {}", counts.join(" | "));
            }
        }
        Commands::Indices {
            csv,
            course,
            year,
            json,
        } => {
            let records = dataset::load_csv(&csv)?;
            let filter = dataset::RowFilter::from_options(course, year);
            let rows = dataset::filter_records(&records, &filter);
            let matrix = frequency::FrequencyMatrix::from_records(&rows);
            let indices: Vec<models::KnowledgeIndex> = Scope::ALL
                .iter()
                .map(|scope| index::knowledge_index(&matrix, *scope))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&indices)?);
                return Ok(());
            }

            println!(
                "Knowledge indices for {} ({} respondents):",
                filter.describe(),
                rows.len()
            );
            for knowledge in indices.iter() {
                println!("- {}: {:.1}%", knowledge.scope.label(), knowledge.mean);
                for share in knowledge.per_question.iter() {
                    println!(
                        "  Q{} ({}): {:.1}%",
                        share.question,
                        share.expected.label(),
                        share.percentage
                    );
                }
            }
        }
        Commands::Compare {
            csv,
            json,
            significant_only,
        } => {
            let records = dataset::load_csv(&csv)?;
            let results = compare::compare_all(&records);
            let results = if significant_only {
                compare::significant(&results)
            } else {
                results
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            if results.is_empty() {
                println!("No comparisons to report.");
                return Ok(());
            }
            for comparison in results.iter() {
                match &comparison.outcome {
                    Outcome::Computed {
                        statistic,
                        p_value,
                        significant,
                    } => {
                        let marker = if *significant { "significant" } else { "n.s." };
                        println!(
                            "- {} ({}) on {}: statistic {:.3}, p-value {:.4} [{marker}]",
                            comparison.test.label(),
                            comparison.factor.label(),
                            comparison.target.describe(),
                            statistic,
                            p_value
                        );
                    }
                    Outcome::Insufficient { reason } => {
                        println!(
                            "- {} ({}) on {}: insufficient data ({reason})",
                            comparison.test.label(),
                            comparison.factor.label(),
                            comparison.target.describe()
                        );
                    }
                }
            }
        }
        Commands::Report { csv, out } => {
            let records = dataset::load_csv(&csv)?;
            let generated_on = chrono::Utc::now().date_naive();
            let report = report::build_report(&records, generated_on);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
