//! Sky coordinates and their Cartesian unit-vector representation.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::errors::{ClzError, ErrorInfo};

/// Unit vector on the celestial sphere.
pub type UnitVector = Vector3<f64>;

/// A list of sky positions, right ascension and declination in radians.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordSky {
    /// Right ascension in radians.
    pub ra: Vec<f64>,
    /// Declination in radians.
    pub dec: Vec<f64>,
}

impl CoordSky {
    /// Creates coordinates from radians, rejecting mismatched lengths.
    pub fn new(ra: Vec<f64>, dec: Vec<f64>) -> Result<Self, ClzError> {
        if ra.len() != dec.len() {
            return Err(ClzError::Config(
                ErrorInfo::new("coords-length", "ra and dec must have the same length")
                    .with_context("ra", ra.len().to_string())
                    .with_context("dec", dec.len().to_string()),
            ));
        }
        Ok(Self { ra, dec })
    }

    /// Creates coordinates from values given in degrees.
    pub fn from_degrees(ra_deg: &[f64], dec_deg: &[f64]) -> Result<Self, ClzError> {
        Self::new(
            ra_deg.iter().map(|v| v.to_radians()).collect(),
            dec_deg.iter().map(|v| v.to_radians()).collect(),
        )
    }

    /// Builds coordinates from (not necessarily normalised) Cartesian vectors.
    pub fn from_unit_vectors(vectors: &[UnitVector]) -> Self {
        let mut ra = Vec::with_capacity(vectors.len());
        let mut dec = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let (r, d) = vector_to_radec(vector);
            ra.push(r);
            dec.push(d);
        }
        Self { ra, dec }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    /// True if no positions are stored.
    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// Cartesian unit vectors for all positions.
    pub fn to_unit_vectors(&self) -> Vec<UnitVector> {
        self.ra
            .iter()
            .zip(&self.dec)
            .map(|(&ra, &dec)| radec_to_vector(ra, dec))
            .collect()
    }
}

/// Converts a sky position in radians into a unit vector.
pub fn radec_to_vector(ra: f64, dec: f64) -> UnitVector {
    let (sin_ra, cos_ra) = ra.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Converts a Cartesian vector into (ra, dec) in radians, ra in `[0, 2π)`.
pub fn vector_to_radec(vector: &UnitVector) -> (f64, f64) {
    let norm = vector.norm();
    if norm == 0.0 {
        return (0.0, 0.0);
    }
    let unit = vector / norm;
    let mut ra = unit.y.atan2(unit.x);
    if ra < 0.0 {
        ra += std::f64::consts::TAU;
    }
    let dec = unit.z.clamp(-1.0, 1.0).asin();
    (ra, dec)
}

/// Angular separation in radians between two unit vectors.
pub fn angular_distance(a: &UnitVector, b: &UnitVector) -> f64 {
    // atan2 of cross and dot stays accurate for tiny and near-antipodal angles
    a.cross(b).norm().atan2(a.dot(b))
}
