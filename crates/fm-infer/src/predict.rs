//! Opération `predict` : une requête JSON → une réponse `(statut, corps)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ModelContext;
use crate::validate::validate_request;

/// Message générique renvoyé pour toute erreur serveur.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error during prediction";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    ClientError,
    ServerError,
}

impl ResponseStatus {
    /// HTTP-style status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::ClientError => 400,
            Self::ServerError => 500,
        }
    }
}

/// Corps de réponse : `{status, emotion}` ou `{error}`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PredictBody {
    Success { status: String, emotion: String },
    Error { error: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredictResponse {
    pub status: ResponseStatus,
    pub body: PredictBody,
}

impl PredictResponse {
    fn success(emotion: &str) -> Self {
        Self {
            status: ResponseStatus::Success,
            body: PredictBody::Success {
                status: "success".into(),
                emotion: emotion.into(),
            },
        }
    }

    fn error(status: ResponseStatus, message: String) -> Self {
        Self {
            status,
            body: PredictBody::Error { error: message },
        }
    }

    /// Emotion label of a successful response.
    #[must_use]
    pub fn emotion(&self) -> Option<&str> {
        match &self.body {
            PredictBody::Success { emotion, .. } => Some(emotion),
            PredictBody::Error { .. } => None,
        }
    }
}

/// Validate a `{ "landmarks": {...} }` request and classify it.
///
/// Validation failures are client errors carrying the validator message.
/// Any failure after validation is a server error with a generic message;
/// the detail is only logged.
///
/// # Example
/// ```
/// # fn demo(ctx: &fm_infer::ModelContext) {
/// let resp = fm_infer::predict(ctx, &serde_json::json!({"landmarks": []}));
/// assert_eq!(resp.status.code(), 400);
/// # }
/// ```
#[must_use]
pub fn predict(ctx: &ModelContext, request: &Value) -> PredictResponse {
    let landmarks = match validate_request(request) {
        Ok(set) => set,
        Err(e) => {
            log::warn!("Requête rejetée : {e}");
            return PredictResponse::error(ResponseStatus::ClientError, e.to_string());
        }
    };
    match ctx.infer(&landmarks) {
        Ok(out) => {
            log::info!("Émotion prédite : {} (confiance {:.3})", out.label, out.confidence);
            PredictResponse::success(&out.label)
        }
        Err(e) if e.is_client_error() => {
            log::warn!("Requête rejetée : {e}");
            PredictResponse::error(ResponseStatus::ClientError, e.to_string())
        }
        Err(e) => {
            log::error!("Erreur pendant la prédiction : {e}");
            PredictResponse::error(ResponseStatus::ServerError, INTERNAL_ERROR_MESSAGE.into())
        }
    }
}

/// Same as [`predict`] for a raw body; unparseable JSON is a client error.
#[must_use]
pub fn predict_str(ctx: &ModelContext, request: &str) -> PredictResponse {
    match serde_json::from_str::<Value>(request) {
        Ok(value) => predict(ctx, &value),
        Err(e) => {
            log::warn!("Corps JSON illisible : {e}");
            PredictResponse::error(ResponseStatus::ClientError, format!("Invalid JSON body: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{fixed_context, landmark_json};
    use serde_json::json;

    fn request(n: usize) -> Value {
        json!({ "landmarks": landmark_json(n) })
    }

    #[test]
    fn too_few_points_is_a_client_error() {
        let ctx = fixed_context(vec![0.0; 6]);
        let resp = predict(&ctx, &request(467));
        assert_eq!(resp.status.code(), 400);
        assert_eq!(
            serde_json::to_value(&resp.body).unwrap(),
            json!({"error": "Landmark has 467 points, expected at least 468"})
        );
    }

    #[test]
    fn reference_scores_answer_fear() {
        let ctx = fixed_context(vec![0.1, 0.2, 5.0, 0.0, 0.3, 0.1]);
        let resp = predict(&ctx, &request(468));
        assert_eq!(resp.status, ResponseStatus::Success);
        assert_eq!(
            serde_json::to_value(&resp.body).unwrap(),
            json!({"status": "success", "emotion": "Fear"})
        );
    }

    #[test]
    fn extra_points_are_ignored() {
        let ctx = fixed_context(vec![0.0, 0.0, 0.0, 4.0, 0.0, 0.0]);
        assert_eq!(predict(&ctx, &request(478)).emotion(), Some("Happy"));
    }

    #[test]
    fn nan_score_is_a_server_error() {
        let ctx = fixed_context(vec![0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0]);
        let resp = predict(&ctx, &request(468));
        assert_eq!(resp.status.code(), 500);
        assert_eq!(
            resp.body,
            PredictBody::Error {
                error: INTERNAL_ERROR_MESSAGE.into()
            }
        );
    }

    #[test]
    fn envelope_errors() {
        let ctx = fixed_context(vec![0.0; 6]);
        for body in [json!({}), json!({"landmarks": [landmark_json(468)]})] {
            let resp = predict(&ctx, &body);
            assert_eq!(resp.status, ResponseStatus::ClientError);
            let PredictBody::Error { error } = resp.body else {
                panic!("expected an error body");
            };
            assert!(error.starts_with("Invalid data format"));
        }
    }

    #[test]
    fn bad_point_names_its_index() {
        let ctx = fixed_context(vec![0.0; 6]);
        let mut req = request(468);
        req["landmarks"]["points"][12] = json!({"x": "a", "y": 0.0, "z": 0.0});
        let PredictBody::Error { error } = predict(&ctx, &req).body else {
            panic!("expected an error body");
        };
        assert!(error.starts_with("Invalid point format at index 12"));
    }

    #[test]
    fn overflowing_coordinate_is_a_client_error() {
        let ctx = fixed_context(vec![0.0; 6]);
        let mut req = request(468);
        req["landmarks"]["points"][5]["x"] = json!(1e300);
        let resp = predict(&ctx, &req);
        assert_eq!(resp.status.code(), 400);
        let PredictBody::Error { error } = resp.body else {
            panic!("expected an error body");
        };
        assert!(error.starts_with("Invalid point format at index 5"));
    }

    #[test]
    fn unparseable_body_is_a_client_error() {
        let ctx = fixed_context(vec![0.0; 6]);
        assert_eq!(predict_str(&ctx, "{not json").status.code(), 400);
        let ok = predict_str(&ctx, &request(468).to_string());
        assert_eq!(ok.status.code(), 200);
    }
}
