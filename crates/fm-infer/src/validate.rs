use fm_core::error::ValidationError;
use fm_core::landmarks::{LANDMARK_COUNT, LandmarkSet, Point3D};
use serde_json::Value;

/// Longueur max des aperçus de valeurs dans les messages d'erreur.
const PREVIEW_CHARS: usize = 160;

/// Check the `{ "landmarks": { ... } }` request envelope, then the landmark object.
///
/// # Errors
/// [`ValidationError::MissingLandmarks`] when `landmarks` is absent or not a
/// single object, otherwise whatever [`validate`] reports.
///
/// # Example
/// ```
/// use fm_infer::validate_request;
/// let err = validate_request(&serde_json::json!({"landmarks": []})).unwrap_err();
/// assert!(err.to_string().starts_with("Invalid data format"));
/// ```
pub fn validate_request(body: &Value) -> Result<LandmarkSet, ValidationError> {
    match body.get("landmarks") {
        Some(landmarks @ Value::Object(_)) => validate(landmarks),
        other => Err(ValidationError::MissingLandmarks {
            got: preview(other.unwrap_or(&Value::Null)),
        }),
    }
}

/// Validate one landmark object and extract its first 468 points.
///
/// Checks run in order and stop at the first failure:
/// single object with `points`, `points` is a list of at least 468 entries,
/// each of the first 468 entries has numeric `x`, `y`, `z`.
///
/// # Errors
/// A [`ValidationError`] naming the failing field or count.
///
/// # Example
/// ```
/// use fm_infer::validate;
/// let points: Vec<_> = (0..467).map(|_| serde_json::json!({"x": 0.1, "y": 0.2, "z": 0.0})).collect();
/// let err = validate(&serde_json::json!({"index": 0, "points": points})).unwrap_err();
/// assert_eq!(err.to_string(), "Landmark has 467 points, expected at least 468");
/// ```
pub fn validate(input: &Value) -> Result<LandmarkSet, ValidationError> {
    let Some(points) = input.as_object().and_then(|obj| obj.get("points")) else {
        return Err(ValidationError::InvalidLandmark {
            got: preview(input),
        });
    };
    let Value::Array(points) = points else {
        return Err(ValidationError::PointsNotSequence {
            got: preview(points),
        });
    };
    if points.len() < LANDMARK_COUNT {
        return Err(ValidationError::TooFewPoints {
            count: points.len(),
        });
    }

    let mut parsed = Vec::with_capacity(LANDMARK_COUNT);
    for (index, raw) in points.iter().take(LANDMARK_COUNT).enumerate() {
        let point = parse_point(raw).ok_or_else(|| ValidationError::InvalidPoint {
            index,
            got: preview(raw),
        })?;
        parsed.push(point);
    }
    LandmarkSet::new(parsed)
}

fn parse_point(raw: &Value) -> Option<Point3D> {
    let obj = raw.as_object()?;
    let axis = |key: &str| {
        obj.get(key)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
    };
    Some(Point3D {
        x: axis("x")?,
        y: axis("y")?,
        z: axis("z")?,
    })
}

/// Compact JSON rendering, cut at [`PREVIEW_CHARS`] characters.
fn preview(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
