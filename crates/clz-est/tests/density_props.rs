use clz_est::{ClipNegative, DensityEnsemble, DensityPolicy, RedshiftEstimate};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = f64> {
    prop_oneof![
        -5.0f64..5.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(0.0),
    ]
}

proptest! {
    #[test]
    fn clipping_zeroes_only_invalid_values(row in prop::collection::vec(value(), 1..40)) {
        let mut clipped = row.clone();
        ClipNegative.apply_row(&mut clipped);
        for (raw, out) in row.iter().zip(&clipped) {
            if raw.is_finite() && *raw > 0.0 {
                prop_assert_eq!(raw, out);
            } else {
                prop_assert_eq!(*out, 0.0);
            }
        }
    }

    #[test]
    fn clipped_rows_normalise_to_one(
        rows in prop::collection::vec(prop::collection::vec(value(), 8), 1..10),
        start in 0.0f64..0.5,
        step in 0.01f64..0.3,
    ) {
        let edges: Vec<f64> = (0..=8).map(|idx| start + step * idx as f64).collect();
        let variants: Vec<Vec<f64>> = rows
            .into_iter()
            .map(|mut row| {
                ClipNegative.apply_row(&mut row);
                row
            })
            .collect();
        let estimate = RedshiftEstimate {
            edges: edges.clone(),
            primary: vec![0.0; 8],
            variants: variants.clone(),
        };
        let density = estimate.to_density();
        prop_assert_eq!(density.edges(), edges.as_slice());
        prop_assert_eq!(density.len(), variants.len());
        for (idx, raw) in variants.iter().enumerate() {
            prop_assert!(density.pdfs()[idx].iter().all(|&p| p >= 0.0));
            if raw.iter().all(|&v| v == 0.0) {
                prop_assert!(density.pdfs()[idx].iter().all(|&p| p == 0.0));
            } else {
                prop_assert!((density.integral(idx) - 1.0).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn density_csv_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nz.csv");
    let ensemble = DensityEnsemble::from_rows(
        vec![0.1, 0.3, 0.6],
        vec![vec![1.0, 2.0], vec![0.5, 0.25]],
    );
    ensemble.write_csv(&path).unwrap();
    assert_eq!(DensityEnsemble::read_csv(&path).unwrap(), ensemble);
}
