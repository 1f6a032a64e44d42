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

//! Session context
//!
//! Ambient metadata (date, time, timezone, location) injected into
//! prompts. The clock fields are plain formatted strings recomputed on
//! demand; location survives across refreshes and is never cleared back
//! to empty once set.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Location shown before any geolocation has succeeded
pub const DEFAULT_LOCATION: &str = "Unknown";

/// Geographic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Fixed-precision display used when no place name is available
    pub fn display(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Ambient metadata injected into prompts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Formatted current date, e.g. "Monday, January 6, 2025"
    pub current_date: String,
    /// Formatted current time, e.g. "3:42 PM"
    pub current_time: String,
    /// UTC offset of the local clock, e.g. "UTC+09:00"
    pub timezone: String,
    /// Human-readable place name
    pub location: String,
    /// Last known position, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// When the location was last refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location_update: Option<DateTime<Utc>>,
}

impl SessionContext {
    /// Create a context with default location and a fresh clock
    pub fn with_defaults() -> Self {
        let mut ctx = Self {
            current_date: String::new(),
            current_time: String::new(),
            timezone: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            coordinates: None,
            last_location_update: None,
        };
        ctx.refresh_clock();
        ctx
    }

    /// Recompute the date/time/timezone strings from the wall clock
    pub fn refresh_clock(&mut self) {
        let now = Local::now();
        self.current_date = now.format("%A, %B %-d, %Y").to_string();
        self.current_time = now.format("%-I:%M %p").to_string();
        self.timezone = now.format("UTC%:z").to_string();
    }

    /// Record a resolved position and place name
    pub fn set_location(&mut self, place: String, coordinates: Coordinates) {
        self.location = place;
        self.coordinates = Some(coordinates);
        self.last_location_update = Some(Utc::now());
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}
