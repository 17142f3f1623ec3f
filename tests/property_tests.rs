//! Property tests - invariants over random inputs

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tolstack::core::analyzer::{coverage_interval, ecdf, histogram, percentile, BinRule, Coverage};
use tolstack::core::chain::{Chain, ChainKind, ComposedOutcome, Contributor, Direction, Draws, Placement};
use tolstack::core::distribution::{Bounds, Distribution, Normal, TruncationPolicy, Uniform};

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_unstable_by(f64::total_cmp);
    values
}

proptest! {
    /// Percentile 0 and 100 are the extremes, and percentiles never decrease
    #[test]
    fn prop_percentiles_are_monotone(
        values in prop::collection::vec(-1e6f64..1e6, 1..200),
        p in 0.0f64..100.0,
        q in 0.0f64..100.0,
    ) {
        let values = sorted(values);
        prop_assert_eq!(percentile(&values, 0.0).unwrap(), values[0]);
        prop_assert_eq!(percentile(&values, 100.0).unwrap(), values[values.len() - 1]);

        let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
        prop_assert!(percentile(&values, lo).unwrap() <= percentile(&values, hi).unwrap());
    }

    /// Every value lands in exactly one bin
    #[test]
    fn prop_histogram_counts_everything(
        values in prop::collection::vec(-1e3f64..1e3, 1..500),
        bins in 1usize..64,
    ) {
        for rule in [BinRule::Fixed(bins), BinRule::Sturges, BinRule::FreedmanDiaconis] {
            let hist = histogram(&values, rule).unwrap();
            prop_assert_eq!(hist.total(), values.len());
            prop_assert_eq!(hist.edges.len(), hist.counts.len() + 1);
        }
    }

    /// The ECDF ends at 1 and never decreases
    #[test]
    fn prop_ecdf_is_a_cdf(
        values in prop::collection::vec(-10f64..10.0, 1..300),
        max_points in 2usize..50,
    ) {
        let points = ecdf(&values, max_points).unwrap();
        prop_assert!(points.len() <= max_points);
        prop_assert_eq!(points.last().unwrap().p, 1.0);
        for w in points.windows(2) {
            prop_assert!(w[0].x <= w[1].x);
            prop_assert!(w[0].p <= w[1].p);
        }
    }

    /// Coverage intervals lie within the data range
    #[test]
    fn prop_coverage_within_range(
        values in prop::collection::vec(-50f64..50.0, 1..200),
        pct in 1.0f64..100.0,
    ) {
        let sorted_values = sorted(values.clone());
        let (min, max) = (sorted_values[0], sorted_values[sorted_values.len() - 1]);
        for coverage in [Coverage::Lower, Coverage::Upper, Coverage::Symmetric] {
            let ci = coverage_interval(&values, pct, coverage).unwrap();
            prop_assert!(min <= ci.lower && ci.lower <= ci.upper && ci.upper <= max);
        }
    }

    /// Truncated normal samples never leave their window
    #[test]
    fn prop_truncated_normal_within_bounds(
        seed in any::<u64>(),
        mean in -10f64..10.0,
        std in 0.01f64..5.0,
        lo_z in -3f64..1.0,
        width_z in 0.5f64..4.0,
    ) {
        let lower = mean + lo_z * std;
        let upper = lower + width_z * std;
        let dist = Normal::truncated(mean, std, Bounds::new(lower, upper), &TruncationPolicy::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for x in dist.sample(500, &mut rng) {
            prop_assert!(lower <= x && x <= upper, "{} outside [{}, {}]", x, lower, upper);
        }
    }

    /// Uniform samples stay in [lower, upper]
    #[test]
    fn prop_uniform_within_range(seed in any::<u64>(), lower in -100f64..100.0, width in 1e-3f64..50.0) {
        let dist = Uniform::new(lower, lower + width).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for x in dist.sample(200, &mut rng) {
            prop_assert!(lower <= x && x <= lower + width);
        }
    }

    /// Linear combination does not depend on contributor order, bit for bit
    #[test]
    fn prop_linear_combine_order_invariant(
        columns in prop::collection::vec(prop::collection::vec(-1e9f64..1e9, 8), 2..6),
        rotate in 0usize..6,
    ) {
        let k = columns.len();
        let contributors: Vec<Contributor> = (0..k)
            .map(|i| {
                let dir = if i % 2 == 0 { Direction::Positive } else { Direction::Negative };
                let dist: Distribution = Normal::new(0.0, 1.0).unwrap().into();
                Contributor::new(format!("C{}", i), dist, Placement::Linear(dir)).unwrap()
            })
            .collect();
        let draws: Vec<Draws> = columns
            .iter()
            .map(|c| Draws { values: c.clone(), phases: None })
            .collect();

        let build = |order: &[usize]| {
            let mut chain = Chain::new(ChainKind::Linear);
            for &i in order {
                chain.add_contributor(contributors[i].clone()).unwrap();
            }
            let ordered: Vec<Draws> = order.iter().map(|&i| draws[i].clone()).collect();
            chain.combine(&ordered).unwrap()
        };

        let identity: Vec<usize> = (0..k).collect();
        let mut rotated = identity.clone();
        rotated.rotate_left(rotate % k);

        let (ComposedOutcome::Linear(a), ComposedOutcome::Linear(b)) = (build(&identity), build(&rotated)) else {
            panic!("expected linear outcomes");
        };
        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}
