//! Client-side core of the company map dashboard: REST access, the company
//! store, filtering, selection, map projection and the create flow.

pub mod api;
pub mod config;
pub mod controller;
pub mod create;
pub mod filter;
pub mod geo;
pub mod map;
pub mod notification;
pub mod selection;
pub mod store;
pub mod views;

pub use api::{ApiClientError, CompaniesApi, HttpCompaniesApi};
pub use config::{load_settings, DashboardSettings};
pub use controller::{Dashboard, DashboardMessage, DashboardOptions, DashboardState, RefreshOutcome};
pub use create::{CompanyDraft, CreateError, LocationFix, ValidationErrors};
pub use filter::{FilterState, IndustryFacet};
pub use geo::{
    FixedGeolocator, GeolocationError, Geolocator, MissingGeolocator, NominatimGeocoder,
    ReverseGeocoder,
};
pub use notification::{Notification, NotificationLevel};
pub use selection::{SelectionCoordinator, SelectionOrigin};
