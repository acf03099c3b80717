//! Remote face analysis client
//!
//! Uploads the encoded frame to the face-detection service and returns
//! structured results. Every failure — transport, status, decode, timeout,
//! missing configuration — is absorbed into an empty face list so the
//! session always completes.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::capture::EncodedImage;
use crate::config::AnalysisConfig;
use crate::{Error, Result};

/// Attribute set requested from the service
const ATTRIBUTES: &str = "age,gender,facialHair,headPose,smile";

/// Threshold above which a 0..1 service score counts as present
const SCORE_THRESHOLD: f64 = 0.5;

/// Bounding box of a detected face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FaceRectangle {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

/// Head orientation angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HeadPose {
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
}

/// Attributes the service attaches to a detected face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAttributes {
    /// Estimated age in years
    pub age: f64,
    /// Reported gender label
    pub gender: String,
    /// Smile score crossed the threshold
    pub smile: bool,
    /// Any facial-hair score crossed the threshold
    pub facial_hair: bool,
    /// Head orientation, when reported
    pub head_pose: Option<HeadPose>,
}

/// One detected face
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Bounding box in the uploaded image
    pub rectangle: FaceRectangle,
    /// Attributes, when the service reported them
    pub attributes: Option<FaceAttributes>,
}

/// Boundary trait for face detection, mocked in tests
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detect faces in `image`, spending at most `budget` on the request.
    ///
    /// Infallible surface: failures degrade to an empty list.
    async fn detect_faces(&self, image: &EncodedImage, budget: Duration) -> Vec<Face>;
}

/// HTTP client for the face-detection service
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    key: Option<SecretString>,
}

impl AnalysisClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            endpoint: config.endpoint.clone(),
            key: config.key.clone(),
        })
    }

    /// The fallible inner request, kept separate for testability
    ///
    /// # Errors
    ///
    /// Returns [`Error::Analysis`] on missing configuration, non-success
    /// status, or response decode failure; transport errors convert via
    /// [`Error::Http`].
    pub async fn request_faces(&self, image: &EncodedImage, budget: Duration) -> Result<Vec<Face>> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Analysis("no endpoint configured".to_string()))?;
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| Error::Analysis("no subscription key configured".to_string()))?;

        let response = self
            .http
            .post(format!("{endpoint}/detect"))
            .query(&[
                ("returnFaceAttributes", ATTRIBUTES),
                ("returnFaceLandmarks", "false"),
            ])
            .header("Ocp-Apim-Subscription-Key", key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.bytes.clone())
            .timeout(budget)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Analysis(format!("service returned {status}")));
        }

        let wire: Vec<WireFace> = response.json().await?;
        Ok(wire.into_iter().map(Face::from).collect())
    }
}

#[async_trait]
impl FaceDetector for AnalysisClient {
    async fn detect_faces(&self, image: &EncodedImage, budget: Duration) -> Vec<Face> {
        match self.request_faces(image, budget).await {
            Ok(faces) => {
                tracing::info!(count = faces.len(), "face detection complete");
                faces
            }
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed, reporting zero faces");
                Vec::new()
            }
        }
    }
}

/// Service wire format for one detected face
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFace {
    face_rectangle: FaceRectangle,
    face_attributes: Option<WireAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAttributes {
    age: f64,
    gender: String,
    smile: Option<f64>,
    facial_hair: Option<WireFacialHair>,
    head_pose: Option<HeadPose>,
}

#[derive(Debug, Deserialize)]
struct WireFacialHair {
    moustache: f64,
    beard: f64,
    sideburns: f64,
}

impl From<WireFace> for Face {
    fn from(wire: WireFace) -> Self {
        Self {
            rectangle: wire.face_rectangle,
            attributes: wire.face_attributes.map(|a| FaceAttributes {
                age: a.age,
                gender: a.gender,
                smile: a.smile.is_some_and(|s| s >= SCORE_THRESHOLD),
                facial_hair: a.facial_hair.is_some_and(|fh| {
                    fh.moustache.max(fh.beard).max(fh.sideburns) >= SCORE_THRESHOLD
                }),
                head_pose: a.head_pose,
            }),
        }
    }
}
