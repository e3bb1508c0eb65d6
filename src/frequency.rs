use std::collections::HashMap;

use crate::dataset::year_sort_key;
use crate::models::{
    AnswerCategory, FrequencyCell, GroupFrequencyStats, SurveyRecord, CATEGORY_COUNT,
    QUESTION_COUNT,
};

/// Dense per-question count of each answer category over one row subset.
/// Absent categories hold explicit zeros so downstream division always runs
/// over the complete category set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyMatrix {
    counts: [[u64; CATEGORY_COUNT]; QUESTION_COUNT],
    rows: usize,
}

impl FrequencyMatrix {
    /// Pure count over the provided rows. Callers filter beforehand; the
    /// matrix never assumes global totals.
    pub fn from_records(records: &[&SurveyRecord]) -> FrequencyMatrix {
        let mut counts = [[0u64; CATEGORY_COUNT]; QUESTION_COUNT];
        for record in records {
            for (slot, answer) in record.answers.iter().enumerate() {
                if let Some(category) = answer {
                    counts[slot][category.position()] += 1;
                }
            }
        }
        FrequencyMatrix {
            counts,
            rows: records.len(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn count(&self, question: u8, category: AnswerCategory) -> u64 {
        self.counts[usize::from(question - 1)][category.position()]
    }

    /// Total answers recorded for a question; blank cells do not count.
    pub fn total(&self, question: u8) -> u64 {
        self.counts[usize::from(question - 1)].iter().sum()
    }
}

/// Melted frequency table grouped by course, year, question and answer,
/// keeping only observed combinations. This is the observation unit for the
/// frequency-level comparisons.
pub fn grouped_cells(records: &[SurveyRecord]) -> Vec<FrequencyCell> {
    let mut counts: HashMap<(String, String, u8, AnswerCategory), u64> = HashMap::new();
    for record in records {
        for (slot, answer) in record.answers.iter().enumerate() {
            if let Some(category) = answer {
                let key = (
                    record.course.clone(),
                    record.year.clone(),
                    slot as u8 + 1,
                    *category,
                );
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    let mut cells: Vec<FrequencyCell> = counts
        .into_iter()
        .map(|((course, year, question, category), count)| FrequencyCell {
            course,
            year,
            question,
            category,
            count,
        })
        .collect();
    cells.sort_by(|a, b| {
        a.course
            .cmp(&b.course)
            .then_with(|| year_sort_key(&a.year).cmp(&year_sort_key(&b.year)))
            .then_with(|| a.question.cmp(&b.question))
            .then_with(|| a.category.cmp(&b.category))
    });
    cells
}

/// Mean, median, standard deviation and range of the grouped frequency
/// counts per (course, year) group.
pub fn group_frequency_stats(cells: &[FrequencyCell]) -> Vec<GroupFrequencyStats> {
    let mut grouped: HashMap<(String, String), Vec<u64>> = HashMap::new();
    for cell in cells {
        grouped
            .entry((cell.course.clone(), cell.year.clone()))
            .or_default()
            .push(cell.count);
    }

    let mut stats: Vec<GroupFrequencyStats> = grouped
        .into_iter()
        .map(|((course, year), mut counts)| {
            counts.sort_unstable();
            let n = counts.len();
            let sum: u64 = counts.iter().sum();
            let mean = sum as f64 / n as f64;
            let median = if n % 2 == 1 {
                counts[n / 2] as f64
            } else {
                (counts[n / 2 - 1] + counts[n / 2]) as f64 / 2.0
            };
            let std_dev = if n > 1 {
                let squared: f64 = counts
                    .iter()
                    .map(|&count| (count as f64 - mean).powi(2))
                    .sum();
                (squared / (n - 1) as f64).sqrt()
            } else {
                0.0
            };
            GroupFrequencyStats {
                course,
                year,
                mean,
                median,
                std_dev,
                min: counts[0],
                max: counts[n - 1],
            }
        })
        .collect();
    stats.sort_by(|a, b| {
        a.course
            .cmp(&b.course)
            .then_with(|| year_sort_key(&a.year).cmp(&year_sort_key(&b.year)))
    });
    stats
}
