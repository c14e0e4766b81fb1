use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CompanyId);

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// A persisted company record. The id is assigned by the backend and never
/// changes; every other field changes only through a backend round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub industry: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Company {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        in_range(self.latitude, LATITUDE_RANGE) && in_range(self.longitude, LONGITUDE_RANGE)
    }

    /// `"lat, lon"` with the given number of decimals.
    pub fn format(&self, decimals: usize) -> String {
        format!(
            "{:.prec$}, {:.prec$}",
            self.latitude,
            self.longitude,
            prec = decimals
        )
    }
}

pub fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value.is_finite() && value >= min && value <= max
}
