use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Nombre de points du maillage facial (topologie fixe).
pub const LANDMARK_COUNT: usize = 468;

/// Dimension du vecteur de features : 468 points × (x, y, z).
pub const FEATURE_DIM: usize = LANDMARK_COUNT * 3;

/// A single face-mesh landmark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Exactly [`LANDMARK_COUNT`] points in mesh-topology order.
///
/// Built from at least 468 points; extra points are dropped, order is kept.
///
/// # Example
/// ```
/// use fm_core::landmarks::{LandmarkSet, Point3D};
/// let set = LandmarkSet::new(vec![Point3D::default(); 470]).unwrap();
/// assert_eq!(set.points().len(), 468);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point3D>,
}

impl LandmarkSet {
    /// Keep the first 468 points of `points`.
    ///
    /// # Errors
    /// Returns [`ValidationError::TooFewPoints`] below 468 points.
    pub fn new(mut points: Vec<Point3D>) -> Result<Self, ValidationError> {
        if points.len() < LANDMARK_COUNT {
            return Err(ValidationError::TooFewPoints {
                count: points.len(),
            });
        }
        points.truncate(LANDMARK_COUNT);
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// Flatten into a feature vector (point-then-axis order).
    #[must_use]
    pub fn to_features(&self) -> FeatureVector {
        FeatureVector::from(self)
    }
}

/// Flat, immutable feature vector.
///
/// Produced from a [`LandmarkSet`] as `x0, y0, z0, x1, y1, z1, ...`, or by
/// the normalizer.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Box<[f32]>,
}

impl FeatureVector {
    /// Wrap raw values. Used by the normalizer and tests.
    #[must_use]
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<&LandmarkSet> for FeatureVector {
    fn from(set: &LandmarkSet) -> Self {
        let mut values = Vec::with_capacity(FEATURE_DIM);
        for p in &set.points {
            values.extend_from_slice(&[p.x, p.y, p.z]);
        }
        Self::from_values(values)
    }
}
