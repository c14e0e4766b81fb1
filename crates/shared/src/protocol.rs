use serde::{Deserialize, Serialize};

use crate::domain::{Company, Coordinates};

/// Body of `POST /api/companies/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyCreate {
    pub name: String,
    pub industry: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CompanyCreate {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Response of `GET /api/companies/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyListResponse {
    pub companies: Vec<Company>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCompaniesQuery {
    pub skip: u32,
    pub limit: u32,
}

impl Default for ListCompaniesQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

/// Subset of the Nominatim reverse geocoding answer we read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
