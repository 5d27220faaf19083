use clz_catalog::{assign_patches, PatchMethod, Table};
use clz_core::{radec_to_vector, CoordSky};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_object_lands_in_its_nearest_center(
        points in prop::collection::vec((0.0f64..6.0, -1.4f64..1.4), 1..60),
        centers in prop::collection::vec((0.0f64..6.0, -1.4f64..1.4), 1..6),
    ) {
        let sky = CoordSky::new(
            centers.iter().map(|c| c.0).collect(),
            centers.iter().map(|c| c.1).collect(),
        ).unwrap();
        let positions: Vec<_> = points.iter().map(|&(ra, dec)| radec_to_vector(ra, dec)).collect();
        let assignment = assign_patches(&PatchMethod::Centers(sky.clone()), &Table::new(), &positions).unwrap();
        prop_assert_eq!(&assignment.centers, &sky);
        let center_vectors = sky.to_unit_vectors();
        for (position, &label) in positions.iter().zip(&assignment.labels) {
            let chosen = position.dot(&center_vectors[label]);
            for center in &center_vectors {
                prop_assert!(chosen >= position.dot(center) - 1e-12);
            }
        }
    }

    #[test]
    fn kmeans_is_deterministic(seed in 0u64..1000, count in 1usize..5) {
        let positions: Vec<_> = (0..40)
            .map(|i| radec_to_vector(i as f64 * 0.05, (i % 7) as f64 * 0.03))
            .collect();
        let a = clz_catalog::kmeans(&positions, count, seed).unwrap();
        let b = clz_catalog::kmeans(&positions, count, seed).unwrap();
        prop_assert_eq!(a.labels.len(), positions.len());
        prop_assert_eq!(a, b);
    }
}
