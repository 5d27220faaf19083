//! Auto- and cross-correlation measurements on correlation caches.

use clz_catalog::{Catalog, CorrelationCache};
use clz_core::{ClzError, ErrorInfo};
use rayon::ThreadPool;

use crate::config::Configuration;
use crate::corrfunc::CorrFunc;
use crate::counts::{count_pairs, SampleView};

fn no_randoms() -> ClzError {
    ClzError::Config(
        ErrorInfo::new("no-randoms", "no randoms provided")
            .with_hint("store a random catalog in the cache"),
    )
}

fn build_pool(config: &Configuration) -> Result<ThreadPool, ClzError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.backend.thread_num.unwrap_or(0))
        .build()
        .map_err(|err| ClzError::Io(ErrorInfo::new("thread-pool", err.to_string())))
}

fn check_patches(first: &Catalog, second: &Catalog) -> Result<(), ClzError> {
    if first.n_patches() != second.n_patches() {
        return Err(ClzError::Config(
            ErrorInfo::new("patch-mismatch", "catalogs have different numbers of patches")
                .with_context("first", first.n_patches().to_string())
                .with_context("second", second.n_patches().to_string())
                .with_hint("create the caches with the same patch centers"),
        ));
    }
    if first.centers() != second.centers() {
        log::warn!("patch centers differ between catalogs; jackknife samples may be inconsistent");
    }
    Ok(())
}

/// Measures the redshift-binned autocorrelation of a cache.
///
/// Requires data and randoms, both with redshifts, and counts DD, DR and RR.
pub fn autocorrelate(cache: &CorrelationCache, config: &Configuration) -> Result<CorrFunc, ClzError> {
    if !cache.rand().exists() {
        return Err(no_randoms());
    }
    config.validate()?;
    let data = cache.data().get()?;
    let rand = cache.rand().get()?;
    check_patches(&data, &rand)?;

    let binning = config.redshift_binning()?;
    let pool = build_pool(config)?;
    let data_view = SampleView::binned(&data, &binning)?;
    let rand_view = SampleView::binned(&rand, &binning)?;

    log::info!(
        "autocorrelating {} objects against {} randoms in {} bins",
        data.len(),
        rand.len(),
        binning.n_bins()
    );
    log::debug!("counting DD");
    let dd = count_pairs(&data_view, &data_view, true, &binning, config, &pool);
    log::debug!("counting DR");
    let dr = count_pairs(&data_view, &rand_view, false, &binning, config, &pool);
    log::debug!("counting RR");
    let rr = count_pairs(&rand_view, &rand_view, true, &binning, config, &pool);

    Ok(CorrFunc {
        binning,
        dd,
        dr: Some(dr),
        rd: None,
        rr: Some(rr),
    })
}

/// Measures the cross-correlation of a redshift-binned reference sample with
/// an unknown sample.
///
/// Reference randoms give RD, unknown randoms give DR; at least one of them
/// is required. RR is never counted.
pub fn crosscorrelate(
    reference: &CorrelationCache,
    unknown: &CorrelationCache,
    config: &Configuration,
) -> Result<CorrFunc, ClzError> {
    let ref_rand = reference.rand().exists();
    let unk_rand = unknown.rand().exists();
    if !(ref_rand || unk_rand) {
        return Err(no_randoms());
    }
    config.validate()?;
    let ref_data = reference.data().get()?;
    let unk_data = unknown.data().get()?;
    check_patches(&ref_data, &unk_data)?;

    let binning = config.redshift_binning()?;
    let pool = build_pool(config)?;
    let ref_view = SampleView::binned(&ref_data, &binning)?;
    let unk_view = SampleView::unbinned(&unk_data);

    log::info!(
        "cross-correlating {} reference with {} unknown objects in {} bins",
        ref_data.len(),
        unk_data.len(),
        binning.n_bins()
    );
    log::debug!("counting DD");
    let dd = count_pairs(&ref_view, &unk_view, false, &binning, config, &pool);

    let rd = if ref_rand {
        let rand = reference.rand().get()?;
        check_patches(&rand, &unk_data)?;
        log::debug!("counting RD");
        let rand_view = SampleView::binned(&rand, &binning)?;
        Some(count_pairs(&rand_view, &unk_view, false, &binning, config, &pool))
    } else {
        None
    };
    let dr = if unk_rand {
        let rand = unknown.rand().get()?;
        check_patches(&ref_data, &rand)?;
        log::debug!("counting DR");
        let rand_view = SampleView::unbinned(&rand);
        Some(count_pairs(&ref_view, &rand_view, false, &binning, config, &pool))
    } else {
        None
    };

    Ok(CorrFunc {
        binning,
        dd,
        dr,
        rd,
        rr: None,
    })
}
