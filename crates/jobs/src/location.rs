//! GPS coordinates and the location check gating job completion.

use serde::{Deserialize, Serialize};

use surety_core::{DomainError, DomainResult, ValueObject};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Start position recorded until real GPS capture exists upstream.
    pub const PLACEHOLDER: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> DomainResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::validation(format!(
                "latitude must be within [-90, 90] (got {lat})"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::validation(format!(
                "longitude must be within [-180, 180] (got {lng})"
            )));
        }
        Ok(Self { lat, lng })
    }
}

impl ValueObject for GeoPoint {}

/// Outcome of a location check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationVerdict {
    Accepted,
    Rejected(String),
}

/// Decides whether a completion report is plausible given where the job
/// started and where the worker claims to have finished.
///
/// Runs before the completion transition is persisted; a rejection aborts
/// the transition.
pub trait LocationVerifier: Send + Sync + 'static {
    fn verify(&self, start: Option<GeoPoint>, end: GeoPoint) -> LocationVerdict;
}

/// Stub verifier: accepts every report.
#[derive(Debug, Copy, Clone, Default)]
pub struct AcceptAllVerifier;

impl LocationVerifier for AcceptAllVerifier {
    fn verify(&self, _start: Option<GeoPoint>, _end: GeoPoint) -> LocationVerdict {
        LocationVerdict::Accepted
    }
}
