//! Company draft validation and location prefill for the create surfaces.

use std::time::Duration;

use shared::{
    domain::{in_range, Coordinates, LATITUDE_RANGE, LONGITUDE_RANGE},
    error::{CompanyField, FieldError},
    protocol::CompanyCreate,
};
use thiserror::Error;

use crate::{
    api::ApiClientError,
    geo::{acquire_position, describe_position, GeolocationError, Geolocator, ReverseGeocoder},
};

/// Suggested industry categories as `(slug, label)`. Not enforced: any
/// non-empty industry is accepted, and a known slug submits as its label.
pub const INDUSTRY_CATALOG: &[(&str, &str)] = &[
    ("technology", "Technology"),
    ("healthcare", "Healthcare"),
    ("finance", "Finance"),
    ("education", "Education"),
    ("retail", "Retail"),
    ("manufacturing", "Manufacturing"),
    ("transportation", "Transportation"),
    ("real-estate", "Real Estate"),
    ("entertainment", "Entertainment"),
    ("food-beverage", "Food & Beverage"),
    ("automotive", "Automotive"),
    ("energy", "Energy"),
    ("other", "Other"),
];

pub fn industry_label(slug: &str) -> Option<&'static str> {
    INDUSTRY_CATALOG
        .iter()
        .find(|(candidate, _)| *candidate == slug)
        .map(|(_, label)| *label)
}

pub fn normalize_industry(raw: &str) -> String {
    let trimmed = raw.trim();
    industry_label(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Unpersisted company as typed into a form. Coordinates stay as text until
/// validation so partial input can be kept and re-edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDraft {
    pub name: String,
    pub industry: String,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
}

impl CompanyDraft {
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    pub fn set_position(&mut self, position: Coordinates) {
        self.latitude = position.latitude.to_string();
        self.longitude = position.longitude.to_string();
    }

    /// Overwrites latitude, longitude and location only.
    pub fn apply_location(&mut self, fix: &LocationFix) {
        self.set_position(fix.position);
        self.location = fix.location.clone();
    }

    pub fn validate(&self) -> Result<CompanyCreate, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = required_text(&self.name, CompanyField::Name, "Company name", &mut errors);
        let industry = required_text(&self.industry, CompanyField::Industry, "Industry", &mut errors);
        let location = required_text(&self.location, CompanyField::Location, "Location", &mut errors);
        let latitude = coordinate(
            &self.latitude,
            CompanyField::Latitude,
            "Latitude",
            LATITUDE_RANGE,
            &mut errors,
        );
        let longitude = coordinate(
            &self.longitude,
            CompanyField::Longitude,
            "Longitude",
            LONGITUDE_RANGE,
            &mut errors,
        );

        match (name, industry, location, latitude, longitude) {
            (Some(name), Some(industry), Some(location), Some(latitude), Some(longitude))
                if errors.is_empty() =>
            {
                Ok(CompanyCreate {
                    name: name.to_string(),
                    industry: normalize_industry(industry),
                    location: location.to_string(),
                    latitude,
                    longitude,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_text<'a>(
    raw: &'a str,
    field: CompanyField,
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{label} is required"));
        return None;
    }
    Some(trimmed)
}

fn coordinate(
    raw: &str,
    field: CompanyField,
    label: &str,
    range: (f64, f64),
    errors: &mut ValidationErrors,
) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{label} is required"));
        return None;
    }
    let Ok(value) = trimmed.parse::<f64>() else {
        errors.push(field, format!("{label} must be a number"));
        return None;
    };
    if !value.is_finite() {
        errors.push(field, format!("{label} must be a number"));
        return None;
    }
    if !in_range(value, range) {
        errors.push(
            field,
            format!("{label} must be between {} and {}", range.0, range.1),
        );
        return None;
    }
    Some(value)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: CompanyField, message: String) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn fields(&self) -> Vec<CompanyField> {
        self.errors.iter().map(|error| error.field).collect()
    }

    pub fn message_for(&self, field: CompanyField) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("invalid company: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("failed to create company: {0}")]
    Network(#[from] ApiClientError),
}

/// Device position plus the address it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub position: Coordinates,
    pub location: String,
}

/// Acquires the device position and describes it. Touches no draft, so the
/// caller can apply the result to whatever the draft holds by then.
pub async fn locate(
    geolocator: &dyn Geolocator,
    geocoder: &dyn ReverseGeocoder,
    timeout: Duration,
) -> Result<LocationFix, GeolocationError> {
    let position = acquire_position(geolocator, timeout).await?;
    let location = describe_position(geocoder, position).await;
    Ok(LocationFix { position, location })
}

/// Fills the draft's coordinates and location from the device position.
/// On failure the draft is left untouched.
pub async fn prefill_current_location(
    draft: &mut CompanyDraft,
    geolocator: &dyn Geolocator,
    geocoder: &dyn ReverseGeocoder,
    timeout: Duration,
) -> Result<Coordinates, GeolocationError> {
    let fix = locate(geolocator, geocoder, timeout).await?;
    draft.apply_location(&fix);
    Ok(fix.position)
}

#[cfg(test)]
#[path = "tests/create_tests.rs"]
mod tests;
