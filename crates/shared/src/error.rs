use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub detail: String,
}

impl ApiErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyField {
    Name,
    Industry,
    Location,
    Latitude,
    Longitude,
}

impl CompanyField {
    pub const ALL: [CompanyField; 5] = [
        CompanyField::Name,
        CompanyField::Industry,
        CompanyField::Location,
        CompanyField::Latitude,
        CompanyField::Longitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyField::Name => "name",
            CompanyField::Industry => "industry",
            CompanyField::Location => "location",
            CompanyField::Latitude => "latitude",
            CompanyField::Longitude => "longitude",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", field.as_str())]
pub struct FieldError {
    pub field: CompanyField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: CompanyField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
