//! Device position lookup. The actual positioning is up to the host; this
//! module only defines the seam and two simple sources.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> anyhow::Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("coordinates out of range: {latitude}, {longitude}");
        }
        Ok(Self { latitude, longitude })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("permission to read the device location was denied")]
    PermissionDenied,
    #[error("device location unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Position known up front, e.g. from `--lat/--lon` or the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Host without any positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}
