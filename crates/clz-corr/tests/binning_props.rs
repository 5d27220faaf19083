use clz_corr::{BinningConfig, BinningMethod, Cosmology};
use proptest::prelude::*;

fn method() -> impl Strategy<Value = BinningMethod> {
    prop_oneof![
        Just(BinningMethod::Linear),
        Just(BinningMethod::Comoving),
        Just(BinningMethod::Logspace),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn generated_edges_are_pinned_and_increasing(
        zmin in 0.0f64..1.5,
        width in 0.05f64..2.0,
        zbin_num in 1usize..40,
        method in method(),
    ) {
        let mut config = BinningConfig::new(zmin, zmin + width);
        config.zbin_num = zbin_num;
        config.method = method;
        let binning = config.binning(&Cosmology::default()).unwrap();
        let edges = binning.edges();
        prop_assert_eq!(edges.len(), zbin_num + 1);
        prop_assert_eq!(edges[0], zmin);
        prop_assert_eq!(edges[zbin_num], zmin + width);
        prop_assert!(edges.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn found_bin_contains_the_redshift(
        zbin_num in 1usize..20,
        fraction in 0.0f64..1.0,
    ) {
        let mut config = BinningConfig::new(0.1, 1.1);
        config.zbin_num = zbin_num;
        let binning = config.binning(&Cosmology::default()).unwrap();
        let z = 0.1 + fraction;
        if let Some(bin) = binning.find(z) {
            let (low, high) = binning.intervals().nth(bin).unwrap();
            prop_assert!(low <= z && z < high);
        } else {
            prop_assert!(z >= 1.1);
        }
    }
}
