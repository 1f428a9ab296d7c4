use crate::types::LngLat;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out")]
    Timeout,
    #[error("geolocation not supported")]
    Unsupported,
}

impl GeolocationError {
    /// Maps a browser `GeolocationPositionError.code`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }
}

/// What the device reported, as posted by the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PositionReport {
    Ok {
        lon: f64,
        lat: f64,
    },
    Error {
        code: u16,
        #[serde(default)]
        message: Option<String>,
    },
    Unsupported,
}

impl PositionReport {
    pub fn into_result(self) -> Result<LngLat, GeolocationError> {
        match self {
            PositionReport::Ok { lon, lat } => Ok(LngLat::new(lon, lat)),
            PositionReport::Error { code, message } => {
                if let Some(message) = message {
                    debug!(code, %message, "device reported a position error");
                }
                Err(GeolocationError::from_code(code))
            }
            PositionReport::Unsupported => Err(GeolocationError::Unsupported),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Recenter(LngLat),
    KeepDefault(LngLat),
}

/// A single position request. The first answer settles it; nothing retries.
#[derive(Debug)]
pub struct GeolocationRequest {
    default_center: LngLat,
    settled: bool,
}

impl GeolocationRequest {
    pub fn new(default_center: LngLat) -> Self {
        Self {
            default_center,
            settled: false,
        }
    }

    pub fn resolve(&mut self, result: Result<LngLat, GeolocationError>) -> Option<Outcome> {
        if self.settled {
            debug!("ignoring late position report");
            return None;
        }
        self.settled = true;

        match result {
            Ok(position) => Some(Outcome::Recenter(position)),
            Err(err) => {
                warn!(error = %err, "Error getting location");
                Some(Outcome::KeepDefault(self.default_center))
            }
        }
    }
}
