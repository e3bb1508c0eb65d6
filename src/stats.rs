use std::cmp::Ordering;
use std::collections::HashMap;

/// Statistic plus p-value of one rank-based test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestSummary {
    pub statistic: f64,
    pub p_value: f64,
}

/// Why a comparison could not be computed. These are values, not errors:
/// the comparator turns them into insufficient-data markers instead of
/// letting anything propagate to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewGroups,
    EmptyGroup,
    TooFewLevels,
    EmptyCell,
    NoErrorDegreesOfFreedom,
    IdenticalValues,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::TooFewGroups => "fewer than 2 groups to compare",
            SkipReason::EmptyGroup => "a group has no observations",
            SkipReason::TooFewLevels => "a factor has fewer than 2 levels",
            SkipReason::EmptyCell => "an interaction cell has no observations",
            SkipReason::NoErrorDegreesOfFreedom => "no error degrees of freedom left",
            SkipReason::IdenticalValues => "all observations are identical",
        }
    }
}

/// 1-based ranks with ties averaged, matching the midrank convention.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // Midrank of positions start..=end, 1-based.
        let midrank = (start + end + 2) as f64 / 2.0;
        for &index in &order[start..=end] {
            ranks[index] = midrank;
        }
        start = end + 1;
    }
    ranks
}

/// Sum of t³ - t over tie groups.
fn tie_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut term = 0.0;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start;
        while end + 1 < sorted.len() && sorted[end + 1] == sorted[start] {
            end += 1;
        }
        let ties = (end - start + 1) as f64;
        term += ties * ties * ties - ties;
        start = end + 1;
    }
    term
}

/// Kruskal-Wallis H test over 2+ independent samples, with tie correction
/// and p-value from the chi-square approximation with k-1 degrees of
/// freedom.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Result<TestSummary, SkipReason> {
    if groups.len() < 2 {
        return Err(SkipReason::TooFewGroups);
    }
    if groups.iter().any(|group| group.is_empty()) {
        return Err(SkipReason::EmptyGroup);
    }

    let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
    let n = pooled.len() as f64;
    let ranks = average_ranks(&pooled);

    let mut rank_sum_term = 0.0;
    let mut offset = 0;
    for group in groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        rank_sum_term += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let correction = 1.0 - tie_term(&pooled) / (n * n * n - n);
    if correction <= 0.0 {
        return Err(SkipReason::IdenticalValues);
    }

    let h = (12.0 / (n * (n + 1.0)) * rank_sum_term - 3.0 * (n + 1.0)) / correction;
    let h = h.max(0.0);
    let df = (groups.len() - 1) as f64;
    Ok(TestSummary {
        statistic: h,
        p_value: chi_square_sf(h, df),
    })
}

/// Two-sided Mann-Whitney U test, tie-corrected normal approximation.
/// No continuity correction, so the two-group Kruskal-Wallis equivalence
/// holds exactly. The statistic is U of the first sample.
pub fn mann_whitney(first: &[f64], second: &[f64]) -> Result<TestSummary, SkipReason> {
    if first.is_empty() || second.is_empty() {
        return Err(SkipReason::EmptyGroup);
    }

    let n1 = first.len() as f64;
    let n2 = second.len() as f64;
    let pooled: Vec<f64> = first.iter().chain(second.iter()).copied().collect();
    let n = n1 + n2;
    let ranks = average_ranks(&pooled);

    let rank_sum_first: f64 = ranks[..first.len()].iter().sum();
    let u_first = rank_sum_first - n1 * (n1 + 1.0) / 2.0;

    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term(&pooled) / (n * (n - 1.0)));
    if variance <= 0.0 {
        return Err(SkipReason::IdenticalValues);
    }

    let z = (u_first - n1 * n2 / 2.0) / variance.sqrt();
    let p_value = (2.0 * normal_sf(z.abs())).min(1.0);
    Ok(TestSummary {
        statistic: u_first,
        p_value,
    })
}

/// One observation of the two-factor design: a measured value tagged with
/// its level on each factor.
#[derive(Debug, Clone, Copy)]
pub struct SrhObservation<'a> {
    pub value: f64,
    pub level_a: &'a str,
    pub level_b: &'a str,
}

/// Per-factor rows of the Scheirer-Ray-Hare table.
#[derive(Debug, Clone, Copy)]
pub struct SrhResult {
    pub factor_a: TestSummary,
    pub factor_b: TestSummary,
    pub interaction: TestSummary,
}

/// Scheirer-Ray-Hare test: rank-based two-factor ANOVA analog. Observations
/// are ranked globally; sums of squares come from rank sums per factor level
/// and per interaction cell; H = (SS / SS_error) * df_error is referred to
/// the chi-square distribution.
///
/// Preconditions: both factors carry at least 2 levels, every interaction
/// cell is populated, and at least one error degree of freedom remains.
pub fn scheirer_ray_hare(observations: &[SrhObservation]) -> Result<SrhResult, SkipReason> {
    let levels_a = distinct_levels(observations.iter().map(|o| o.level_a));
    let levels_b = distinct_levels(observations.iter().map(|o| o.level_b));
    let a = levels_a.len();
    let b = levels_b.len();
    if a < 2 || b < 2 {
        return Err(SkipReason::TooFewLevels);
    }

    let n = observations.len();
    if n < a * b + 1 {
        return Err(SkipReason::NoErrorDegreesOfFreedom);
    }

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let ranks = average_ranks(&values);
    let grand_sum: f64 = ranks.iter().sum();
    let mean_rank = grand_sum / n as f64;

    let position_a: HashMap<&str, usize> = levels_a
        .iter()
        .enumerate()
        .map(|(index, level)| (*level, index))
        .collect();
    let position_b: HashMap<&str, usize> = levels_b
        .iter()
        .enumerate()
        .map(|(index, level)| (*level, index))
        .collect();

    let mut sum_a = vec![0.0; a];
    let mut count_a = vec![0usize; a];
    let mut sum_b = vec![0.0; b];
    let mut count_b = vec![0usize; b];
    let mut sum_cell = vec![0.0; a * b];
    let mut count_cell = vec![0usize; a * b];

    for (observation, rank) in observations.iter().zip(&ranks) {
        let ia = position_a[observation.level_a];
        let ib = position_b[observation.level_b];
        sum_a[ia] += rank;
        count_a[ia] += 1;
        sum_b[ib] += rank;
        count_b[ib] += 1;
        sum_cell[ia * b + ib] += rank;
        count_cell[ia * b + ib] += 1;
    }

    if count_cell.iter().any(|&count| count == 0) {
        return Err(SkipReason::EmptyCell);
    }

    let correction = grand_sum * grand_sum / n as f64;
    let raw_a: f64 = sum_a
        .iter()
        .zip(&count_a)
        .map(|(sum, &count)| sum * sum / count as f64)
        .sum();
    let raw_b: f64 = sum_b
        .iter()
        .zip(&count_b)
        .map(|(sum, &count)| sum * sum / count as f64)
        .sum();
    let raw_cells: f64 = sum_cell
        .iter()
        .zip(&count_cell)
        .map(|(sum, &count)| sum * sum / count as f64)
        .sum();

    let ss_total: f64 = ranks.iter().map(|rank| (rank - mean_rank).powi(2)).sum();
    let ss_a = raw_a - correction;
    let ss_b = raw_b - correction;
    let ss_interaction = raw_cells - raw_a - raw_b + correction;
    let ss_error = ss_total - ss_a - ss_b - ss_interaction;
    if ss_error <= f64::EPSILON {
        return Err(SkipReason::IdenticalValues);
    }

    let df_error = (n - a * b) as f64;
    let row = |ss: f64, df: f64| {
        let h = (ss / ss_error * df_error).max(0.0);
        TestSummary {
            statistic: h,
            p_value: chi_square_sf(h, df),
        }
    };

    Ok(SrhResult {
        factor_a: row(ss_a, (a - 1) as f64),
        factor_b: row(ss_b, (b - 1) as f64),
        interaction: row(ss_interaction, ((a - 1) * (b - 1)) as f64),
    })
}

fn distinct_levels<'a>(levels: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for level in levels {
        if !seen.contains(&level) {
            seen.push(level);
        }
    }
    seen
}

/// Upper-tail chi-square survival function: P(X² > x) at `df` degrees of
/// freedom, via the regularized upper incomplete gamma.
pub fn chi_square_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(df / 2.0, x / 2.0)
}

/// P(Z > z) for the standard normal, expressed through the same incomplete
/// gamma so the chi-square identity sf(z², 1) == 2·normal_sf(z) is exact.
pub fn normal_sf(z: f64) -> f64 {
    if z < 0.0 {
        return 1.0 - normal_sf(-z);
    }
    0.5 * regularized_gamma_q(0.5, z * z / 2.0)
}

/// Regularized upper incomplete gamma Q(a, x), Numerical Recipes style:
/// series for the lower tail, continued fraction for the upper.
fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - lower_gamma_series(a, x)
    } else {
        upper_gamma_continued_fraction(a, x)
    }
}

const GAMMA_EPS: f64 = 3.0e-12;
const GAMMA_MAX_ITERS: usize = 300;

fn lower_gamma_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0 / a;
    let mut sum = term;
    let mut ap = a;
    for _ in 0..GAMMA_MAX_ITERS {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * GAMMA_EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn upper_gamma_continued_fraction(a: f64, x: f64) -> f64 {
    const FPMIN: f64 = 1.0e-300;

    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=GAMMA_MAX_ITERS {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = b + an / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < GAMMA_EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Lanczos approximation of ln(Gamma(x)) for x > 0.
#[allow(clippy::excessive_precision)]
fn ln_gamma(x: f64) -> f64 {
    let coefficients = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = coefficients[0];
    let t = x + 7.5; // g + 0.5

    for (i, &coefficient) in coefficients.iter().enumerate().skip(1) {
        acc += coefficient / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (t.ln() * (x + 0.5)) - t + acc.ln()
}
