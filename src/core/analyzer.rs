//! Result analyzer - statistics over a sample population
//!
//! Everything here is a pure function of the values passed in.
//! Percentiles use linear interpolation between order statistics
//! (`h = (n - 1) * p / 100`), so p = 0 is the minimum and p = 100 the
//! maximum. Standard deviation is the population form (divisor n).

use serde::{Deserialize, Serialize};

use crate::core::chain::WorstCase;
use crate::core::engine::SamplePopulation;
use crate::core::error::ValidationError;

/// Percentiles reported when none are requested (±3σ, 95% and median)
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.135, 2.5, 50.0, 97.5, 99.865];

/// Upper limit on automatically chosen bin counts
const MAX_AUTO_BINS: usize = 1000;

/// Upper limit on explicitly requested bin counts
pub const MAX_BINS: usize = 100_000;

/// Lower/upper limits (at least one side)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl SpecLimits {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Result<Self, ValidationError> {
        let limits = Self { lower, upper };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for v in [self.lower, self.upper].into_iter().flatten() {
            if !v.is_finite() {
                return Err(ValidationError::NonFiniteLimit(v));
            }
        }
        match (self.lower, self.upper) {
            (None, None) => Err(ValidationError::EmptyLimits),
            (Some(lower), Some(upper)) if lower >= upper => {
                Err(ValidationError::InvertedLimits { lower, upper })
            }
            _ => Ok(()),
        }
    }
}

/// What to compute in [`summarize`]
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub percentiles: Vec<f64>,
    pub spec_limits: Option<SpecLimits>,
    /// Secondary limits evaluated exactly like the spec limits
    pub custom_limits: Option<SpecLimits>,
}

impl Default for SummaryRequest {
    fn default() -> Self {
        Self {
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            spec_limits: None,
            custom_limits: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

/// Capability and out-of-limit fractions against one set of limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub limits: SpecLimits,
    /// Needs both limits and a non-zero spread
    pub cp: Option<f64>,
    /// Worst side among the limits present
    pub cpk: Option<f64>,
    pub fraction_below: f64,
    pub fraction_above: f64,
    pub fraction_outside: f64,
    pub ppm_outside: f64,
}

impl Capability {
    /// Percentage of samples within limits
    pub fn percent_ok(&self) -> f64 {
        (1.0 - self.fraction_outside) * 100.0
    }
}

/// Summary statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<PercentileValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_case: Option<WorstCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Capability>,
}

impl ResultSummary {
    /// Value of a requested percentile
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|pv| pv.percentile == p)
            .map(|pv| pv.value)
    }
}

/// Summarize a population (radial populations by magnitude)
pub fn summarize(
    population: &SamplePopulation,
    request: &SummaryRequest,
) -> Result<ResultSummary, ValidationError> {
    summarize_values(&population.values(), population.worst_case, request)
}

/// Summarize raw values
pub fn summarize_values(
    values: &[f64],
    worst_case: Option<WorstCase>,
    request: &SummaryRequest,
) -> Result<ResultSummary, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyPopulation);
    }
    for &p in &request.percentiles {
        check_percentile(p)?;
    }
    for limits in [&request.spec_limits, &request.custom_limits].into_iter().flatten() {
        limits.validate()?;
    }

    let sorted = sorted_copy(values);
    let (mean, std_dev) = mean_std(values);

    let percentiles = request
        .percentiles
        .iter()
        .map(|&p| PercentileValue {
            percentile: p,
            value: interpolate(&sorted, p),
        })
        .collect();

    Ok(ResultSummary {
        count: values.len(),
        mean,
        std_dev,
        median: interpolate(&sorted, 50.0),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles,
        worst_case,
        spec: request
            .spec_limits
            .map(|l| capability(&sorted, mean, std_dev, l)),
        custom: request
            .custom_limits
            .map(|l| capability(&sorted, mean, std_dev, l)),
    })
}

fn check_percentile(p: f64) -> Result<(), ValidationError> {
    if p.is_finite() && (0.0..=100.0).contains(&p) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPercentile(p))
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 100.0 {
        return sorted[n - 1];
    }
    let h = (n - 1) as f64 * p / 100.0;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Percentile `p` (0-100) of already sorted values
pub fn percentile(sorted: &[f64], p: f64) -> Result<f64, ValidationError> {
    check_percentile(p)?;
    if sorted.is_empty() {
        return Err(ValidationError::EmptyPopulation);
    }
    Ok(interpolate(sorted, p))
}

fn capability(sorted: &[f64], mean: f64, std_dev: f64, limits: SpecLimits) -> Capability {
    let n = sorted.len() as f64;
    let below = limits
        .lower
        .map_or(0, |lsl| sorted.partition_point(|x| *x < lsl));
    let above = limits
        .upper
        .map_or(0, |usl| sorted.len() - sorted.partition_point(|x| *x <= usl));

    let (cp, cpk) = if std_dev > 0.0 {
        let cp = match (limits.lower, limits.upper) {
            (Some(lsl), Some(usl)) => Some((usl - lsl) / (6.0 * std_dev)),
            _ => None,
        };
        let sides = [
            limits.upper.map(|usl| (usl - mean) / (3.0 * std_dev)),
            limits.lower.map(|lsl| (mean - lsl) / (3.0 * std_dev)),
        ];
        let cpk = sides.into_iter().flatten().reduce(f64::min);
        (cp, cpk)
    } else {
        (None, None)
    };

    let fraction_below = below as f64 / n;
    let fraction_above = above as f64 / n;
    let fraction_outside = (below + above) as f64 / n;
    Capability {
        limits,
        cp,
        cpk,
        fraction_below,
        fraction_above,
        fraction_outside,
        ppm_outside: fraction_outside * 1e6,
    }
}

/// Histogram bin count policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinRule {
    Fixed(usize),
    /// ⌈log2 n⌉ + 1
    Sturges,
    /// Width 2·IQR·n^(-1/3); Sturges when the IQR is zero
    #[default]
    FreedmanDiaconis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `counts.len() + 1` edges; the last bin includes its right edge
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Midpoint of each bin
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

fn sturges(n: usize) -> usize {
    (n as f64).log2().ceil() as usize + 1
}

fn bin_count(sorted: &[f64], rule: BinRule) -> Result<usize, ValidationError> {
    let n = sorted.len();
    match rule {
        BinRule::Fixed(0) => Err(ValidationError::ZeroBins),
        BinRule::Fixed(k) if k > MAX_BINS => Err(ValidationError::TooManyBins {
            requested: k,
            max: MAX_BINS,
        }),
        BinRule::Fixed(k) => Ok(k),
        BinRule::Sturges => Ok(sturges(n)),
        BinRule::FreedmanDiaconis => {
            let iqr = interpolate(sorted, 75.0) - interpolate(sorted, 25.0);
            let range = sorted[n - 1] - sorted[0];
            if iqr <= 0.0 || range <= 0.0 {
                return Ok(sturges(n));
            }
            let width = 2.0 * iqr / (n as f64).cbrt();
            Ok(((range / width).ceil() as usize).clamp(1, MAX_AUTO_BINS))
        }
    }
}

/// Bin `values` into equal-width bins spanning [min, max]
pub fn histogram(values: &[f64], rule: BinRule) -> Result<Histogram, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyPopulation);
    }
    let sorted = sorted_copy(values);
    let k = bin_count(&sorted, rule)?;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    // Single value: unit-wide span centred on it
    if max <= min {
        let edges: Vec<f64> = (0..=k).map(|i| min - 0.5 + i as f64 / k as f64).collect();
        let idx = (0..k).rev().find(|&i| edges[i] <= min).unwrap_or(0);
        let mut counts = vec![0; k];
        counts[idx] = sorted.len();
        return Ok(Histogram { edges, counts });
    }

    let width = (max - min) / k as f64;
    let mut edges: Vec<f64> = (0..=k).map(|i| min + width * i as f64).collect();
    edges[k] = max;

    let mut counts = vec![0; k];
    for &x in &sorted {
        let idx = (((x - min) / width) as usize).min(k - 1);
        counts[idx] += 1;
    }
    Ok(Histogram { edges, counts })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcdfPoint {
    pub x: f64,
    pub p: f64,
}

/// Empirical CDF steps `(x_(i), i/n)`, thinned to at most `max_points`
///
/// The first and last steps are always kept.
pub fn ecdf(values: &[f64], max_points: usize) -> Result<Vec<EcdfPoint>, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptyPopulation);
    }
    let sorted = sorted_copy(values);
    let n = sorted.len();
    let point = |i: usize| EcdfPoint {
        x: sorted[i],
        p: (i + 1) as f64 / n as f64,
    };

    let m = max_points.max(2);
    if n <= m {
        return Ok((0..n).map(point).collect());
    }
    let mut points: Vec<EcdfPoint> = (0..m)
        .map(|j| point(((j as f64) * (n - 1) as f64 / (m - 1) as f64).round() as usize))
        .collect();
    points.dedup_by(|a, b| a.p == b.p);
    Ok(points)
}

/// Which tail(s) a coverage interval leaves out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    /// From the minimum up
    Lower,
    /// From the maximum down
    Upper,
    /// Centered, equal tails
    #[default]
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageInterval {
    pub coverage: Coverage,
    pub percent: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Range holding `percent` of the values
pub fn coverage_interval(
    values: &[f64],
    percent: f64,
    coverage: Coverage,
) -> Result<CoverageInterval, ValidationError> {
    if !(percent > 0.0 && percent <= 100.0) {
        return Err(ValidationError::InvalidCoverage(percent));
    }
    if values.is_empty() {
        return Err(ValidationError::EmptyPopulation);
    }
    let sorted = sorted_copy(values);
    let (lo, hi) = match coverage {
        Coverage::Lower => (0.0, percent),
        Coverage::Upper => (100.0 - percent, 100.0),
        Coverage::Symmetric => {
            let tail = (100.0 - percent) / 2.0;
            (tail, 100.0 - tail)
        }
    };
    Ok(CoverageInterval {
        coverage,
        percent,
        lower: interpolate(&sorted, lo),
        upper: interpolate(&sorted, hi),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(percentiles: &[f64]) -> SummaryRequest {
        SummaryRequest {
            percentiles: percentiles.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let summary = summarize_values(&values, None, &request(&[])).unwrap();
        assert_eq!(summary.count, 8);
        assert!((summary.mean - 5.0).abs() < 1e-12);
        // Population std of this set is exactly 2
        assert!((summary.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(summary.median, 4.5);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
    }

    #[test]
    fn test_percentile_boundaries() {
        let values = [3.0, -1.0, 8.5, 2.0, 0.25];
        let summary = summarize_values(&values, None, &request(&[0.0, 100.0])).unwrap();
        assert_eq!(summary.percentile(0.0), Some(-1.0));
        assert_eq!(summary.percentile(100.0), Some(8.5));
        assert_eq!(summary.percentile(50.0), None);
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // h = 3 * 0.25 = 0.75
        assert!((percentile(&sorted, 25.0).unwrap() - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 30.0).unwrap(), 7.0);
    }

    #[test]
    fn test_invalid_percentiles() {
        for p in [-0.1, 100.5, f64::NAN, f64::INFINITY] {
            let err = summarize_values(&[1.0, 2.0], None, &request(&[p])).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidPercentile(_)));
        }
        assert_eq!(
            percentile(&[], 10.0).unwrap_err(),
            ValidationError::EmptyPopulation
        );
    }

    #[test]
    fn test_empty_population() {
        assert_eq!(
            summarize_values(&[], None, &SummaryRequest::default()).unwrap_err(),
            ValidationError::EmptyPopulation
        );
    }

    #[test]
    fn test_capability_two_sided() {
        let values = [9.0, 10.0, 11.0, 10.0];
        let (mean, std) = mean_std(&values);
        let req = SummaryRequest {
            percentiles: vec![],
            spec_limits: Some(SpecLimits::new(Some(8.0), Some(11.5)).unwrap()),
            custom_limits: Some(SpecLimits::new(Some(9.5), Some(10.5)).unwrap()),
        };
        let summary = summarize_values(&values, None, &req).unwrap();

        let spec = summary.spec.unwrap();
        assert!((spec.cp.unwrap() - 3.5 / (6.0 * std)).abs() < 1e-12);
        assert!((spec.cpk.unwrap() - (11.5 - mean) / (3.0 * std)).abs() < 1e-12);
        assert_eq!(spec.fraction_outside, 0.0);
        assert_eq!(spec.percent_ok(), 100.0);

        let custom = summary.custom.unwrap();
        assert_eq!(custom.fraction_below, 0.25);
        assert_eq!(custom.fraction_above, 0.25);
        assert_eq!(custom.fraction_outside, 0.5);
        assert_eq!(custom.ppm_outside, 500_000.0);
    }

    #[test]
    fn test_capability_one_sided() {
        let values = [0.1, 0.2, 0.3, 0.4];
        let (mean, std) = mean_std(&values);
        let req = SummaryRequest {
            percentiles: vec![],
            spec_limits: Some(SpecLimits::new(None, Some(0.35)).unwrap()),
            custom_limits: None,
        };
        let cap = summarize_values(&values, None, &req).unwrap().spec.unwrap();
        assert_eq!(cap.cp, None);
        assert!((cap.cpk.unwrap() - (0.35 - mean) / (3.0 * std)).abs() < 1e-12);
        assert_eq!(cap.fraction_above, 0.25);
        assert_eq!(cap.fraction_below, 0.0);
    }

    #[test]
    fn test_capability_zero_spread() {
        let req = SummaryRequest {
            percentiles: vec![],
            spec_limits: Some(SpecLimits::new(Some(0.0), Some(2.0)).unwrap()),
            custom_limits: None,
        };
        let cap = summarize_values(&[1.0; 10], None, &req).unwrap().spec.unwrap();
        assert_eq!(cap.cp, None);
        assert_eq!(cap.cpk, None);
        assert_eq!(cap.fraction_outside, 0.0);
    }

    #[test]
    fn test_limits_validation() {
        assert_eq!(SpecLimits::new(None, None).unwrap_err(), ValidationError::EmptyLimits);
        assert!(matches!(
            SpecLimits::new(Some(2.0), Some(1.0)).unwrap_err(),
            ValidationError::InvertedLimits { .. }
        ));
        assert!(matches!(
            SpecLimits::new(Some(f64::NAN), None).unwrap_err(),
            ValidationError::NonFiniteLimit(_)
        ));
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.37).sin()).collect();
        for rule in [BinRule::Fixed(7), BinRule::Sturges, BinRule::FreedmanDiaconis] {
            let h = histogram(&values, rule).unwrap();
            assert_eq!(h.total(), 1000, "{:?}", rule);
            assert_eq!(h.edges.len(), h.bin_count() + 1);
            assert!(h.edges.windows(2).all(|w| w[0] < w[1]));
        }
        let h = histogram(&values, BinRule::Sturges).unwrap();
        assert_eq!(h.bin_count(), 11);
    }

    #[test]
    fn test_histogram_last_bin_closed() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], BinRule::Fixed(4)).unwrap();
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.centers(), vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_histogram_degenerate_cases() {
        assert_eq!(
            histogram(&[1.0], BinRule::Fixed(0)).unwrap_err(),
            ValidationError::ZeroBins
        );
        assert_eq!(
            histogram(&[], BinRule::Sturges).unwrap_err(),
            ValidationError::EmptyPopulation
        );
        let h = histogram(&[2.0; 16], BinRule::FreedmanDiaconis).unwrap();
        assert_eq!(h.total(), 16);
        // Zero IQR falls back to Sturges
        assert_eq!(h.bin_count(), 5);
        let filled = h.counts.iter().position(|&c| c == 16).unwrap();
        assert!(h.edges[filled] <= 2.0 && 2.0 <= h.edges[filled + 1]);

        for k in [1, 2, 4] {
            let h = histogram(&[-3.0; 3], BinRule::Fixed(k)).unwrap();
            let filled = h.counts.iter().position(|&c| c == 3).unwrap();
            assert!(h.edges[filled] <= -3.0 && -3.0 <= h.edges[filled + 1], "k = {}", k);
        }
    }

    #[test]
    fn test_histogram_rejects_oversized_bin_count() {
        assert_eq!(
            histogram(&[1.0, 2.0], BinRule::Fixed(usize::MAX)).unwrap_err(),
            ValidationError::TooManyBins {
                requested: usize::MAX,
                max: MAX_BINS
            }
        );
        let h = histogram(&[1.0, 2.0], BinRule::Fixed(MAX_BINS)).unwrap();
        assert_eq!(h.bin_count(), MAX_BINS);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_ecdf() {
        let points = ecdf(&[3.0, 1.0, 2.0], 10).unwrap();
        assert_eq!(
            points,
            vec![
                EcdfPoint { x: 1.0, p: 1.0 / 3.0 },
                EcdfPoint { x: 2.0, p: 2.0 / 3.0 },
                EcdfPoint { x: 3.0, p: 1.0 },
            ]
        );

        let values: Vec<f64> = (0..10_000).map(|i| i as f64).collect();
        let thinned = ecdf(&values, 101).unwrap();
        assert_eq!(thinned.len(), 101);
        assert_eq!(thinned[0].x, 0.0);
        assert_eq!(thinned[100].x, 9999.0);
        assert_eq!(thinned[100].p, 1.0);
        assert!(thinned.windows(2).all(|w| w[0].p < w[1].p));
    }

    #[test]
    fn test_coverage_interval() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();

        let sym = coverage_interval(&values, 90.0, Coverage::Symmetric).unwrap();
        assert!((sym.lower - 5.0).abs() < 1e-12);
        assert!((sym.upper - 95.0).abs() < 1e-12);

        let lower = coverage_interval(&values, 90.0, Coverage::Lower).unwrap();
        assert_eq!(lower.lower, 0.0);
        assert!((lower.upper - 90.0).abs() < 1e-12);

        let upper = coverage_interval(&values, 90.0, Coverage::Upper).unwrap();
        assert!((upper.lower - 10.0).abs() < 1e-12);
        assert_eq!(upper.upper, 100.0);

        assert!(matches!(
            coverage_interval(&values, 0.0, Coverage::Lower).unwrap_err(),
            ValidationError::InvalidCoverage(_)
        ));
    }
}
