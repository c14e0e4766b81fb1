use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings,
    map::{tile_for, tile_url, TILE_ATTRIBUTION},
    CompanyDraft, CreateError, Dashboard, DashboardOptions, DashboardSettings, FixedGeolocator,
    Geolocator, HttpCompaniesApi, IndustryFacet, MissingGeolocator, NominatimGeocoder,
    Notification, RefreshOutcome, SelectionOrigin,
};
use shared::domain::CompanyId;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Geo-tagged company dashboard")]
struct Args {
    /// Backend base URL; overrides API_URL and dashboard.toml.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    page_limit: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List companies, optionally filtered.
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        industry: String,
    },
    /// Industry facets: the filter value and its display label.
    Industries,
    Show {
        id: i64,
    },
    /// Select a company and print its detail pane.
    Select {
        id: i64,
    },
    Create {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        industry: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        latitude: String,
        #[arg(long, default_value = "")]
        longitude: String,
        /// Prefill coordinates and location from the device position.
        #[arg(long)]
        use_current_location: bool,
    },
    Delete {
        id: i64,
    },
    /// Print the fitted viewport and markers.
    Map {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value = "all")]
        industry: String,
        #[arg(long)]
        select: Option<i64>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
}

fn build_dashboard(settings: &DashboardSettings) -> Result<Arc<Dashboard>> {
    let api = HttpCompaniesApi::new(&settings.api_url, settings.request_timeout)
        .context("failed to build companies client")?;
    let geocoder = NominatimGeocoder::new(&settings.geocoder_url, settings.request_timeout)
        .context("failed to build geocoder")?;
    let geolocator: Arc<dyn Geolocator> = match settings.device_position {
        Some(position) => Arc::new(FixedGeolocator::new(position)),
        None => Arc::new(MissingGeolocator),
    };
    let options = DashboardOptions {
        page_limit: settings.page_limit,
        geolocation_timeout: settings.geolocation_timeout,
        map: settings.map_config(),
    };
    Ok(Dashboard::new_with_dependencies(
        Arc::new(api),
        geolocator,
        Arc::new(geocoder),
        options,
    ))
}

fn print_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        println!("[{:?}] {}", notification.level, notification.message);
    }
}

async fn apply_filter(dashboard: &Dashboard, query: String, industry: &str) {
    dashboard.set_query(query).await;
    let facet = industry.parse::<IndustryFacet>().unwrap_or_default();
    dashboard.set_industry_facet(facet).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(page_limit) = args.page_limit {
        settings.page_limit = page_limit;
    }
    settings.validate()?;

    let dashboard = build_dashboard(&settings)?;
    let mut notifications = dashboard.subscribe_notifications();
    info!(api_url = %settings.api_url, page_limit = settings.page_limit, "loading companies");

    if let RefreshOutcome::Failed = dashboard.load().await {
        print_notifications(&mut notifications);
        anyhow::bail!("could not load companies from {}", settings.api_url);
    }

    match args.command {
        Command::List { query, industry } => {
            apply_filter(&dashboard, query, &industry).await;
            let view = dashboard.read(|state| state.list_view()).await;
            println!("{}", view.header());
            if let Some(message) = view.empty_message {
                println!("{message}");
            }
            for row in view.rows {
                println!(
                    "{:>5}  {:<30} {:<20} {:<20} {}",
                    row.id, row.name, row.location, row.industry, row.coordinates
                );
            }
        }
        Command::Industries => {
            for facet in dashboard.read(|state| state.facet_options()).await {
                println!("{:<20} {}", facet.to_string(), facet.label());
            }
        }
        Command::Show { id } => {
            let company = dashboard.fetch_company(CompanyId(id)).await?;
            println!("{} (#{})", company.name, company.id);
            println!("Industry: {}", company.industry);
            println!("Location: {}", company.location);
            println!("Coordinates: {}", company.coordinates().format(6));
        }
        Command::Select { id } => {
            if !dashboard.select(CompanyId(id), SelectionOrigin::ListRow).await {
                anyhow::bail!("company {id} is not in the loaded list");
            }
            if let Some(detail) = dashboard.read(|state| state.detail()).await {
                println!("{}", detail.company.name);
                println!("Industry: {}", detail.company.industry);
                println!("Location: {}", detail.company.location);
                println!("Coordinates: {}", detail.coordinates);
            }
        }
        Command::Create {
            name,
            industry,
            location,
            latitude,
            longitude,
            use_current_location,
        } => {
            dashboard
                .edit_draft(|draft| {
                    *draft = CompanyDraft {
                        name,
                        industry,
                        location,
                        latitude,
                        longitude,
                    }
                })
                .await;
            if use_current_location {
                // Failure is reported as a notification; manual entry still applies.
                let _ = dashboard.use_current_location().await;
            }
            match dashboard.submit_draft().await {
                Ok(company) => println!("created company #{}", company.id),
                Err(CreateError::Validation(errors)) => {
                    for error in errors.iter() {
                        eprintln!("{}: {}", error.field.as_str(), error.message);
                    }
                    print_notifications(&mut notifications);
                    anyhow::bail!("{errors}");
                }
                Err(err) => {
                    print_notifications(&mut notifications);
                    return Err(err.into());
                }
            }
        }
        Command::Delete { id } => {
            if let Err(err) = dashboard.delete(CompanyId(id)).await {
                print_notifications(&mut notifications);
                return Err(err.into());
            }
        }
        Command::Map {
            query,
            industry,
            select,
            width,
            height,
        } => {
            apply_filter(&dashboard, query, &industry).await;
            if let Some(id) = select {
                dashboard.select(CompanyId(id), SelectionOrigin::MapMarker).await;
            }
            let mut config = dashboard.options().map.clone();
            config.width_px = width.unwrap_or(config.width_px);
            config.height_px = height.unwrap_or(config.height_px);
            let view = dashboard.read(|state| state.map_view(&config)).await;

            let center = view.viewport.center;
            let (x, y) = tile_for(center, view.viewport.zoom);
            println!(
                "center {} zoom {}",
                center.format(6),
                view.viewport.zoom
            );
            println!("tile {}", tile_url(&config.tile_url_template, view.viewport.zoom, x, y));
            for marker in &view.markers {
                let flag = if marker.selected { "*" } else { " " };
                println!("{flag} {} @ {}", marker.title, marker.position.format(6));
                for line in &marker.popup {
                    println!("    {line}");
                }
            }
            if let Some(id) = select {
                if view.marker(CompanyId(id)).is_none() {
                    eprintln!("company {id} has no marker under the current filter");
                }
            }
            println!("{TILE_ATTRIBUTION}");
        }
    }

    print_notifications(&mut notifications);
    Ok(())
}
