//! Turns the filtered company set into marker and viewport state for a
//! slippy-map widget. Projection math is spherical Web Mercator with 256px
//! tiles.

use std::f64::consts::PI;

use shared::domain::{Company, CompanyId, Coordinates};

pub const DEFAULT_CENTER: Coordinates = Coordinates {
    latitude: 40.7128,
    longitude: -74.0060,
};
pub const DEFAULT_ZOOM: u8 = 10;
pub const MAX_ZOOM: u8 = 18;
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors";

const TILE_SIZE: f64 = 256.0;
const TILE_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub tile_url_template: String,
    pub default_center: Coordinates,
    pub default_zoom: u8,
    pub max_zoom: u8,
    pub padding_px: u32,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url_template: DEFAULT_TILE_URL.to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            max_zoom: MAX_ZOOM,
            padding_px: 20,
            width_px: 800,
            height_px: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl LatLngBounds {
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self {
            south_west: first,
            north_east: first,
        };
        for point in points {
            bounds.south_west.latitude = bounds.south_west.latitude.min(point.latitude);
            bounds.south_west.longitude = bounds.south_west.longitude.min(point.longitude);
            bounds.north_east.latitude = bounds.north_east.latitude.max(point.latitude);
            bounds.north_east.longitude = bounds.north_east.longitude.max(point.longitude);
        }
        Some(bounds)
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude
            && point.longitude >= self.south_west.longitude
            && point.longitude <= self.north_east.longitude
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub center: Coordinates,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub company_id: CompanyId,
    pub position: Coordinates,
    pub title: String,
    pub popup: Vec<String>,
    pub selected: bool,
}

impl MapMarker {
    pub fn for_company(company: &Company, selected: bool) -> Self {
        Self {
            company_id: company.id,
            position: company.coordinates(),
            title: company.name.clone(),
            popup: vec![
                format!("Industry: {}", company.industry),
                format!("Location: {}", company.location),
                format!("Coordinates: {}", company.coordinates().format(6)),
            ],
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub viewport: MapViewport,
    pub bounds: Option<LatLngBounds>,
    pub markers: Vec<MapMarker>,
}

impl MapView {
    pub fn selected_marker(&self) -> Option<&MapMarker> {
        self.markers.iter().find(|marker| marker.selected)
    }

    pub fn marker(&self, id: CompanyId) -> Option<&MapMarker> {
        self.markers.iter().find(|marker| marker.company_id == id)
    }
}

pub fn build_map_view(
    companies: &[&Company],
    selected: Option<CompanyId>,
    config: &MapConfig,
) -> MapView {
    let markers: Vec<MapMarker> = companies
        .iter()
        .map(|company| MapMarker::for_company(company, selected == Some(company.id)))
        .collect();
    let bounds = LatLngBounds::from_points(markers.iter().map(|marker| marker.position));
    let viewport = match bounds {
        Some(bounds) => fit_bounds(&bounds, config),
        None => MapViewport {
            center: config.default_center,
            zoom: config.default_zoom,
        },
    };
    MapView {
        viewport,
        bounds,
        markers,
    }
}

/// Largest whole zoom at which `bounds` fits inside the padded viewport.
pub fn fit_bounds(bounds: &LatLngBounds, config: &MapConfig) -> MapViewport {
    let (x1, y1) = project(bounds.south_west);
    let (x2, y2) = project(bounds.north_east);
    let center = unproject((x1 + x2) / 2.0, (y1 + y2) / 2.0);

    let usable_width = f64::from(config.width_px.saturating_sub(2 * config.padding_px).max(1));
    let usable_height = f64::from(config.height_px.saturating_sub(2 * config.padding_px).max(1));
    let span_x = (x2 - x1).abs();
    let span_y = (y2 - y1).abs();

    let zoom_for = |span: f64, usable: f64| {
        if span <= f64::EPSILON {
            f64::INFINITY
        } else {
            (usable / (TILE_SIZE * span)).log2()
        }
    };
    let fitted = zoom_for(span_x, usable_width).min(zoom_for(span_y, usable_height));
    let zoom = if fitted.is_finite() {
        fitted.floor().clamp(0.0, f64::from(config.max_zoom)) as u8
    } else {
        config.max_zoom
    };

    MapViewport { center, zoom }
}

/// Normalized Web Mercator position in `[0, 1]` on both axes.
pub fn project(point: Coordinates) -> (f64, f64) {
    let latitude = point
        .latitude
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = (point.longitude + 180.0) / 360.0;
    let y = (1.0 - (latitude.tan() + 1.0 / latitude.cos()).ln() / PI) / 2.0;
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> Coordinates {
    let longitude = x * 360.0 - 180.0;
    let latitude = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    Coordinates::new(latitude, longitude)
}

/// Tile column and row containing `point` at `zoom`.
pub fn tile_for(point: Coordinates, zoom: u8) -> (u32, u32) {
    let (x, y) = project(point);
    let tiles = 2f64.powi(i32::from(zoom));
    let max_index = tiles - 1.0;
    (
        (x * tiles).floor().clamp(0.0, max_index) as u32,
        (y * tiles).floor().clamp(0.0, max_index) as u32,
    )
}

pub fn tile_url(template: &str, zoom: u8, x: u32, y: u32) -> String {
    let subdomain = TILE_SUBDOMAINS[((x + y) as usize) % TILE_SUBDOMAINS.len()];
    template
        .replace("{s}", subdomain)
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}
