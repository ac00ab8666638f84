//! Property tests for map derivations and carrier filtering

use dose_hetero::domain::{Axis, CarrierCategory, DoseMap, DoseMapBuilder, Region, ScoringEvent, TrackLineageTag};
use dose_hetero::services::carrier_filter::accept;
use dose_hetero::services::significance::chi_square_test;
use dose_hetero::services::{DoseComparisonEngine, RegionAggregator};
use proptest::prelude::*;

const NX: usize = 6;
const NY: usize = 4;

fn build(values: &[f64]) -> DoseMap {
    let x = Axis::new(NX, -3.0, 3.0).unwrap();
    let y = Axis::new(NY, 0.0, 4.0).unwrap();
    let mut b = DoseMapBuilder::new("m", x, y);
    for (i, &v) in values.iter().enumerate() {
        if v != 0.0 {
            b.fill_bin(i % NX, i / NX, v).unwrap();
        }
    }
    b.build()
}

fn contents() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(0.0), 0.001f64..100.0], NX * NY)
}

proptest! {
    /// Property: both projections and the full-region sum conserve the integral
    #[test]
    fn prop_projection_conserves_integral(values in contents()) {
        let map = build(&values);
        let agg = RegionAggregator::new(&map);
        let total = map.integral();
        let tol = 1e-9 * total.max(1.0);
        prop_assert!((agg.profile_y().total() - total).abs() < tol);
        prop_assert!((agg.profile_x().total() - total).abs() < tol);
        prop_assert!((agg.total() - total).abs() < tol);
    }

    /// Property: a map divided by itself is 1 where populated and 0 elsewhere
    #[test]
    fn prop_self_ratio(values in contents()) {
        let map = build(&values);
        let ratio = DoseComparisonEngine::new().ratio(&map, &map).unwrap();
        for (r, v) in ratio.values().iter().zip(map.values()) {
            if *v > 0.0 {
                prop_assert!((r - 1.0).abs() < 1e-12);
            } else {
                prop_assert_eq!(*r, 0.0);
            }
        }
    }

    /// Property: ratio is finite and zero wherever the reference is empty
    #[test]
    fn prop_ratio_zero_policy(a in contents(), b in contents()) {
        let (a, b) = (build(&a), build(&b));
        let ratio = DoseComparisonEngine::new().ratio(&a, &b).unwrap();
        for (r, vb) in ratio.values().iter().zip(b.values()) {
            prop_assert!(r.is_finite());
            if *vb == 0.0 {
                prop_assert_eq!(*r, 0.0);
            }
        }
    }

    /// Property: difference is antisymmetric and leaves inputs untouched
    #[test]
    fn prop_difference_antisymmetric(a in contents(), b in contents()) {
        let (ma, mb) = (build(&a), build(&b));
        let before = ma.values().to_vec();
        let engine = DoseComparisonEngine::new();
        let ab = engine.difference(&ma, &mb).unwrap();
        let ba = engine.difference(&mb, &ma).unwrap();
        for (x, y) in ab.values().iter().zip(ba.values()) {
            prop_assert_eq!(*x, -*y);
        }
        prop_assert_eq!(ma.values(), before.as_slice());
    }

    /// Property: a map compared with itself is never significant
    #[test]
    fn prop_self_comparison_p_value_one(values in contents()) {
        let map = build(&values);
        let result = chi_square_test(&map, &map).unwrap();
        prop_assert!((result.p_value - 1.0).abs() < 1e-12);
        if map.integral() > 0.0 {
            let region = Region::full(&map);
            prop_assert_eq!(DoseComparisonEngine::new().percent_change(&map, &map, &region).unwrap(), 0.0);
        }
    }

    /// Property: exactly one of the two carrier filters accepts any deposit
    #[test]
    fn prop_filters_partition_deposits(
        has_tag in any::<bool>(),
        photon in any::<bool>(),
        primary in any::<bool>(),
        energy in 0.0f64..10.0,
    ) {
        let mut tag = TrackLineageTag::new();
        tag.set_photon_lineage(photon);
        if primary {
            tag.mark_primary_dose_carrier();
        }
        let event = ScoringEvent {
            tag: if has_tag { Some(&tag) } else { None },
            energy,
            scorer_name: "eDep",
        };
        let p = accept(CarrierCategory::Primary, &event);
        let s = accept(CarrierCategory::Secondary, &event);
        prop_assert!(p ^ s);
        prop_assert_eq!(p, has_tag && primary);
    }
}
