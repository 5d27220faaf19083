//! Flat ΛCDM distances.

use clz_core::{ClzError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Speed of light in km/s.
const SPEED_OF_LIGHT: f64 = 299_792.458;
/// Simpson intervals used for the comoving distance integral.
const INTEGRATION_STEPS: usize = 256;

/// Flat ΛCDM cosmology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    /// Hubble constant in km/s/Mpc.
    #[serde(default = "default_h0")]
    pub h0: f64,
    /// Matter density parameter.
    #[serde(default = "default_omega_m")]
    pub omega_m: f64,
}

fn default_h0() -> f64 {
    67.74
}

fn default_omega_m() -> f64 {
    0.3075
}

impl Default for Cosmology {
    fn default() -> Self {
        Self {
            h0: default_h0(),
            omega_m: default_omega_m(),
        }
    }
}

impl Cosmology {
    /// Checks that the parameters describe a physical cosmology.
    pub fn validate(&self) -> Result<(), ClzError> {
        if !(self.h0 > 0.0 && self.h0.is_finite()) || !(0.0..=1.0).contains(&self.omega_m) {
            return Err(ClzError::Config(
                ErrorInfo::new("cosmology", "invalid cosmological parameters")
                    .with_context("h0", self.h0.to_string())
                    .with_context("omega_m", self.omega_m.to_string()),
            ));
        }
        Ok(())
    }

    fn inv_efunc(&self, z: f64) -> f64 {
        let a = 1.0 + z;
        1.0 / (self.omega_m * a * a * a + (1.0 - self.omega_m)).sqrt()
    }

    /// Hubble distance c / H0 in Mpc.
    pub fn hubble_distance(&self) -> f64 {
        SPEED_OF_LIGHT / self.h0
    }

    /// Line-of-sight comoving distance in Mpc.
    pub fn comoving_distance(&self, z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        let h = z / INTEGRATION_STEPS as f64;
        let mut sum = self.inv_efunc(0.0) + self.inv_efunc(z);
        for step in 1..INTEGRATION_STEPS {
            let weight = if step % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.inv_efunc(step as f64 * h);
        }
        self.hubble_distance() * sum * h / 3.0
    }

    /// Angular diameter distance in Mpc.
    pub fn angular_diameter_distance(&self, z: f64) -> f64 {
        self.comoving_distance(z) / (1.0 + z)
    }

    /// Redshift at which the comoving distance equals `distance` (Mpc).
    pub fn redshift_at_comoving_distance(&self, distance: f64) -> f64 {
        let mut lo = 0.0;
        let mut hi = 1.0;
        while self.comoving_distance(hi) < distance && hi < 1e3 {
            hi *= 2.0;
        }
        for _ in 0..60 {
            let mid = 0.5 * (lo + hi);
            if self.comoving_distance(mid) < distance {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_are_monotonic() {
        let cosmo = Cosmology::default();
        let mut last = 0.0;
        for idx in 1..20 {
            let d = cosmo.comoving_distance(idx as f64 * 0.1);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn comoving_distance_matches_reference_value() {
        // about 3400 Mpc at z = 1 for Planck 2015 parameters
        let d = Cosmology::default().comoving_distance(1.0);
        assert!((d - 3380.0).abs() < 60.0, "{d}");
    }

    #[test]
    fn inverse_recovers_redshift() {
        let cosmo = Cosmology::default();
        let d = cosmo.comoving_distance(0.73);
        assert!((cosmo.redshift_at_comoving_distance(d) - 0.73).abs() < 1e-8);
    }
}
