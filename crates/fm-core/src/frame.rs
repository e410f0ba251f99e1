use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boîte englobante du visage, en pixels (bornes exclusives à droite/en bas).
///
/// # Example
/// ```
/// use fm_core::frame::FaceRegion;
/// let r = FaceRegion { x_min: 10, y_min: 10, x_max: 10, y_max: 40 };
/// assert!(r.is_empty());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FaceRegion {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl FaceRegion {
    /// Zero-area region: a detector hit that yields an empty crop.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        u64::from((self.x_max - self.x_min).unsigned_abs())
            * u64::from((self.y_max - self.y_min).unsigned_abs())
    }

    /// Bounding box of normalized `(x, y)` landmarks scaled to a `width`×`height` image.
    ///
    /// The box is clamped to the image. Returns `None` without points.
    ///
    /// # Example
    /// ```
    /// use fm_core::frame::FaceRegion;
    /// let r = FaceRegion::from_normalized([(0.25, 0.5), (0.75, 0.875)], 100, 200).unwrap();
    /// assert_eq!(r, FaceRegion { x_min: 25, y_min: 100, x_max: 75, y_max: 175 });
    /// ```
    pub fn from_normalized<I>(points: I, width: u32, height: u32) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let mut region: Option<Self> = None;
        for (x, y) in points {
            let px = ((x * width as f32) as i32).clamp(0, w);
            let py = ((y * height as f32) as i32).clamp(0, h);
            let r = region.get_or_insert(Self {
                x_min: px,
                y_min: py,
                x_max: px,
                y_max: py,
            });
            r.x_min = r.x_min.min(px);
            r.y_min = r.y_min.min(py);
            r.x_max = r.x_max.max(px);
            r.y_max = r.y_max.max(py);
        }
        region
    }
}

/// Une frame du flux d'entrée : index, région du visage détecté, landmarks bruts.
///
/// `landmarks` keeps the inbound JSON shape (`{index, points}`); it is only
/// validated when the frame is actually submitted for classification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub face: Option<FaceRegion>,
    pub landmarks: Option<Value>,
}

impl Frame {
    /// Frame with no detected face.
    #[must_use]
    pub fn no_face(index: u64) -> Self {
        Self {
            index,
            face: None,
            landmarks: None,
        }
    }

    /// A face counts only with landmarks and a non-empty region.
    #[must_use]
    pub fn has_face(&self) -> bool {
        self.landmarks.is_some() && self.face.is_some_and(|f| !f.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_clamped_to_image() {
        let r = FaceRegion::from_normalized([(-0.5, 0.1), (1.5, 0.2)], 640, 480).unwrap();
        assert_eq!(r.x_min, 0);
        assert_eq!(r.x_max, 640);
        assert_eq!(r.area(), 640 * 48);
    }

    #[test]
    fn no_points_no_region() {
        assert!(FaceRegion::from_normalized(std::iter::empty(), 640, 480).is_none());
    }

    #[test]
    fn single_point_region_is_empty() {
        let r = FaceRegion::from_normalized([(0.5, 0.5)], 640, 480).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.area(), 0);
    }

    #[test]
    fn has_face_requires_landmarks_and_area() {
        let region = FaceRegion {
            x_min: 0,
            y_min: 0,
            x_max: 10,
            y_max: 10,
        };
        let mut frame = Frame {
            index: 1,
            face: Some(region),
            landmarks: None,
        };
        assert!(!frame.has_face());
        frame.landmarks = Some(serde_json::json!({"points": []}));
        assert!(frame.has_face());
        frame.face = Some(FaceRegion::default());
        assert!(!frame.has_face());
        assert!(!Frame::no_face(2).has_face());
    }
}
