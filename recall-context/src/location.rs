// Copyright 2025 Recall Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Location collaborator interfaces
//!
//! Geolocation and reverse geocoding are external collaborators; the
//! cache only defines the seams and how their answers are rendered.
//! Network implementations live outside this crate; tests use fakes.

use async_trait::async_trait;
use recall_core::Coordinates;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by location collaborators
#[derive(Debug, Error)]
pub enum LocationError {
    /// The user denied the position request
    #[error("location permission denied")]
    PermissionDenied,

    /// No position could be determined
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// Reverse geocoding failed
    #[error("geocoding failed: {0}")]
    Geocoding(String),
}

/// Source of the device's current position
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Resolves coordinates to a structured address
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, position: Coordinates) -> Result<Address, LocationError>;
}

/// Structured address returned by a geocoding collaborator.
///
/// All fields are optional; a response can name a city, a town, or a
/// village depending on where the coordinates land.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Join locality, state, and country into a single display string.
    ///
    /// Locality prefers city over town over village. Returns `None` when
    /// every field is empty so the caller can fall back to coordinate
    /// text.
    pub fn display_name(&self) -> Option<String> {
        let locality = self
            .city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref());

        let parts: Vec<&str> = [locality, self.state.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
