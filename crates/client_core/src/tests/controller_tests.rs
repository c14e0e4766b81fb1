use super::*;
use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    geo::FixedGeolocator,
    notification::{NotificationLevel, SELECTION_DURATION},
    views::NO_MATCHES,
};

struct FakeCompaniesApi {
    companies: Mutex<Vec<Company>>,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    list_gate: Option<Arc<Notify>>,
}

impl FakeCompaniesApi {
    fn with(companies: Vec<Company>) -> Self {
        Self {
            companies: Mutex::new(companies),
            fail_list: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            list_gate: None,
        }
    }

    fn gated(companies: Vec<Company>, gate: Arc<Notify>) -> Self {
        Self {
            list_gate: Some(gate),
            ..Self::with(companies)
        }
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompaniesApi for FakeCompaniesApi {
    async fn list_companies(
        &self,
        query: ListCompaniesQuery,
    ) -> Result<CompanyListResponse, ApiClientError> {
        // Answers with the rows present when the request was sent.
        let rows = self.companies.lock().await.clone();
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ApiClientError::Status {
                status: 503,
                detail: "database unavailable".into(),
            });
        }
        Ok(CompanyListResponse {
            total: rows.len() as u64,
            companies: rows
                .into_iter()
                .skip(query.skip as usize)
                .take(query.limit as usize)
                .collect(),
        })
    }

    async fn get_company(&self, id: CompanyId) -> Result<Company, ApiClientError> {
        self.companies
            .lock()
            .await
            .iter()
            .find(|company| company.id == id)
            .cloned()
            .ok_or(ApiClientError::NotFound(id))
    }

    async fn create_company(
        &self,
        company: &shared::protocol::CompanyCreate,
    ) -> Result<Company, ApiClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ApiClientError::Status {
                status: 500,
                detail: "insert failed".into(),
            });
        }
        let mut companies = self.companies.lock().await;
        let next_id = companies.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let created = Company {
            id: CompanyId(next_id),
            name: company.name.clone(),
            industry: company.industry.clone(),
            location: company.location.clone(),
            latitude: company.latitude,
            longitude: company.longitude,
        };
        companies.push(created.clone());
        Ok(created)
    }

    async fn delete_company(&self, id: CompanyId) -> Result<(), ApiClientError> {
        let mut companies = self.companies.lock().await;
        let before = companies.len();
        companies.retain(|company| company.id != id);
        if companies.len() == before {
            return Err(ApiClientError::NotFound(id));
        }
        Ok(())
    }
}

/// Reports a fixed position once the test opens the gate.
struct GatedGeolocator {
    gate: Notify,
    asked: AtomicBool,
    position: Coordinates,
}

#[async_trait]
impl Geolocator for GatedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        self.asked.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.position)
    }
}

fn acme() -> Company {
    Company {
        id: CompanyId(1),
        name: "Acme".into(),
        industry: "Technology".into(),
        location: "NYC".into(),
        latitude: 40.7,
        longitude: -74.0,
    }
}

fn beta() -> Company {
    Company {
        id: CompanyId(2),
        name: "Beta".into(),
        industry: "Finance".into(),
        location: "LA".into(),
        latitude: 34.0,
        longitude: -118.2,
    }
}

fn gamma_draft() -> CompanyDraft {
    CompanyDraft {
        name: "Gamma".into(),
        industry: "energy".into(),
        location: "Austin".into(),
        latitude: "30.2672".into(),
        longitude: "-97.7431".into(),
    }
}

async fn wait_for_list_calls(api: &FakeCompaniesApi, calls: usize) {
    while api.list_calls() < calls {
        tokio::task::yield_now().await;
    }
}

fn dashboard(api: Arc<FakeCompaniesApi>) -> Arc<Dashboard> {
    Dashboard::new(api, DashboardOptions::default())
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

fn ids(state: &DashboardState) -> Vec<i64> {
    state.store().companies().iter().map(|c| c.id.0).collect()
}

#[tokio::test]
async fn load_populates_store_and_facets() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api.clone());

    assert_eq!(dashboard.load().await, RefreshOutcome::Refreshed { count: 2 });

    let state = dashboard.snapshot().await;
    assert!(!state.is_loading());
    assert_eq!(ids(&state), vec![1, 2]);
    assert_eq!(state.industries(), vec!["Finance", "Technology"]);
    assert_eq!(state.facet_options()[0], IndustryFacet::All);
    assert_eq!(api.list_calls(), 1);
}

#[tokio::test]
async fn refresh_failure_keeps_previous_store_and_notifies() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api.clone());
    dashboard.load().await;
    let mut rx = dashboard.subscribe_notifications();

    api.fail_list.store(true, Ordering::SeqCst);
    assert_eq!(dashboard.refresh().await, RefreshOutcome::Failed);

    let state = dashboard.snapshot().await;
    assert_eq!(ids(&state), vec![1, 2]);
    assert!(!state.is_loading());
    let notifications = drain(&mut rx);
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].is_error());
    assert_eq!(notifications[0].message, notification::LOAD_FAILED);
}

#[tokio::test]
async fn list_and_marker_selection_share_one_path() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let from_list = dashboard(api.clone());
    let from_map = dashboard(api);
    from_list.load().await;
    from_map.load().await;
    let mut list_rx = from_list.subscribe_notifications();
    let mut map_rx = from_map.subscribe_notifications();

    assert!(from_list.select(CompanyId(2), SelectionOrigin::ListRow).await);
    assert!(from_map.select(CompanyId(2), SelectionOrigin::MapMarker).await);

    let list_state = from_list.snapshot().await;
    let map_state = from_map.snapshot().await;
    assert_eq!(list_state.selection(), map_state.selection());
    assert_eq!(list_state.detail(), map_state.detail());

    let list_note = drain(&mut list_rx);
    let map_note = drain(&mut map_rx);
    assert_eq!(list_note[0].message, "Selected: Beta");
    assert_eq!(list_note[0].message, map_note[0].message);
    assert_eq!(list_note[0].duration, SELECTION_DURATION);
}

#[tokio::test]
async fn selecting_unknown_company_is_ignored() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme()]));
    let dashboard = dashboard(api);
    dashboard.load().await;
    let mut rx = dashboard.subscribe_notifications();

    assert!(!dashboard.select(CompanyId(99), SelectionOrigin::MapMarker).await);
    assert_eq!(dashboard.snapshot().await.selection().selected(), None);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn refresh_reconciles_selection() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api.clone());
    dashboard.load().await;
    dashboard.select(CompanyId(1), SelectionOrigin::ListRow).await;

    dashboard.refresh().await;
    assert_eq!(
        dashboard.snapshot().await.selection().selected(),
        Some(CompanyId(1))
    );

    api.companies.lock().await.retain(|c| c.id != CompanyId(1));
    dashboard.refresh().await;
    let state = dashboard.snapshot().await;
    assert_eq!(state.selection().selected(), None);
    assert!(state.detail().is_none());
}

#[tokio::test]
async fn invalid_draft_never_reaches_network() {
    let api = Arc::new(FakeCompaniesApi::with(Vec::new()));
    let dashboard = dashboard(api.clone());
    let draft = CompanyDraft {
        latitude: "95".into(),
        name: String::new(),
        ..gamma_draft()
    };

    let err = dashboard.submit(draft.clone()).await.expect_err("invalid");
    match err {
        CreateError::Validation(errors) => {
            assert_eq!(
                errors.fields(),
                vec![
                    shared::error::CompanyField::Name,
                    shared::error::CompanyField::Latitude
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(api.create_calls(), 0);
    assert_eq!(api.list_calls(), 0);
    assert_eq!(dashboard.draft().await, draft);
}

#[tokio::test]
async fn network_failure_keeps_draft_for_retry() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme()]));
    let dashboard = dashboard(api.clone());
    dashboard.load().await;
    let mut rx = dashboard.subscribe_notifications();

    api.fail_create.store(true, Ordering::SeqCst);
    let err = dashboard.submit(gamma_draft()).await.expect_err("network");
    assert!(matches!(err, CreateError::Network(_)));
    assert_eq!(dashboard.draft().await, gamma_draft());
    assert_eq!(api.list_calls(), 1);

    let notifications = drain(&mut rx);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, notification::CREATE_FAILED);

    api.fail_create.store(false, Ordering::SeqCst);
    let created = dashboard.submit_draft().await.expect("retry");
    assert_eq!(created.name, "Gamma");
}

#[tokio::test]
async fn successful_create_refreshes_and_selects_new_company() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api.clone());
    dashboard.load().await;
    dashboard.edit_draft(|draft| *draft = gamma_draft()).await;
    let mut rx = dashboard.subscribe_notifications();

    let created = dashboard.submit_draft().await.expect("create");

    assert_eq!(created.id, CompanyId(3));
    assert_eq!(created.industry, "Energy");
    assert_eq!(api.create_calls(), 1);
    assert_eq!(api.list_calls(), 2);
    assert!(dashboard.draft().await.is_blank());

    let state = dashboard.snapshot().await;
    assert_eq!(ids(&state), vec![1, 2, 3]);
    assert_eq!(state.selection().selected(), Some(CompanyId(3)));

    let messages: Vec<String> = drain(&mut rx).into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec![
            notification::CREATE_SUCCEEDED.to_string(),
            "Selected: Gamma".to_string()
        ]
    );
}

#[tokio::test]
async fn overlapping_refreshes_are_coalesced_into_one_follow_up() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeCompaniesApi::gated(vec![acme()], gate.clone()));
    let dashboard = dashboard(api.clone());

    let first = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh().await })
    };
    wait_for_list_calls(&api, 1).await;
    assert!(dashboard.snapshot().await.is_loading());

    assert_eq!(dashboard.refresh().await, RefreshOutcome::Coalesced);
    assert_eq!(dashboard.refresh().await, RefreshOutcome::Coalesced);
    assert_eq!(api.list_calls(), 1);

    gate.notify_one();
    wait_for_list_calls(&api, 2).await;
    gate.notify_one();
    assert_eq!(
        first.await.expect("join"),
        RefreshOutcome::Refreshed { count: 1 }
    );
    assert_eq!(api.list_calls(), 2);
    assert!(!dashboard.snapshot().await.is_loading());

    gate.notify_one();
    assert_eq!(
        dashboard.refresh().await,
        RefreshOutcome::Refreshed { count: 1 }
    );
    assert_eq!(api.list_calls(), 3);
}

#[tokio::test]
async fn create_during_running_refresh_still_lands_and_selects() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeCompaniesApi::gated(vec![acme()], gate.clone()));
    let dashboard = dashboard(api.clone());

    let load = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.load().await })
    };
    wait_for_list_calls(&api, 1).await;

    let created = dashboard.submit(gamma_draft()).await.expect("create");
    assert_eq!(created.id, CompanyId(2));

    // The running fetch predates the create and answers without it.
    gate.notify_one();
    wait_for_list_calls(&api, 2).await;
    gate.notify_one();
    assert_eq!(
        load.await.expect("join"),
        RefreshOutcome::Refreshed { count: 2 }
    );

    let state = dashboard.snapshot().await;
    assert_eq!(ids(&state), vec![1, 2]);
    assert_eq!(state.selection().selected(), Some(CompanyId(2)));
    assert!(dashboard.draft().await.is_blank());
}

#[tokio::test]
async fn current_location_prefills_held_draft() {
    let api = Arc::new(FakeCompaniesApi::with(Vec::new()));
    let dashboard = Dashboard::new_with_dependencies(
        api,
        Arc::new(FixedGeolocator::new(Coordinates::new(51.5074, -0.1278))),
        Arc::new(MissingReverseGeocoder),
        DashboardOptions::default(),
    );
    dashboard
        .edit_draft(|draft| draft.name = "Tower".into())
        .await;
    let mut rx = dashboard.subscribe_notifications();

    let position = dashboard.use_current_location().await.expect("location");
    assert_eq!(position, Coordinates::new(51.5074, -0.1278));

    let draft = dashboard.draft().await;
    assert_eq!(draft.name, "Tower");
    assert_eq!(draft.latitude, "51.5074");
    assert_eq!(draft.location, "51.507400, -0.127800");
    assert_eq!(drain(&mut rx)[0].message, notification::LOCATION_SET);
}

#[tokio::test]
async fn edits_made_while_locating_are_kept() {
    let geolocator = Arc::new(GatedGeolocator {
        gate: Notify::new(),
        asked: AtomicBool::new(false),
        position: Coordinates::new(51.5, -0.12),
    });
    let dashboard = Dashboard::new_with_dependencies(
        Arc::new(FakeCompaniesApi::with(Vec::new())),
        geolocator.clone(),
        Arc::new(MissingReverseGeocoder),
        DashboardOptions::default(),
    );

    let locating = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.use_current_location().await })
    };
    while !geolocator.asked.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
    dashboard
        .edit_draft(|draft| {
            draft.name = "Typed while locating".into();
            draft.industry = "Retail".into();
        })
        .await;
    geolocator.gate.notify_one();
    locating.await.expect("join").expect("location");

    let draft = dashboard.draft().await;
    assert_eq!(draft.name, "Typed while locating");
    assert_eq!(draft.industry, "Retail");
    assert_eq!(draft.latitude, "51.5");
    assert_eq!(draft.longitude, "-0.12");
    assert_eq!(draft.location, "51.500000, -0.120000");
}

#[tokio::test]
async fn missing_geolocation_only_notifies() {
    let api = Arc::new(FakeCompaniesApi::with(Vec::new()));
    let dashboard = dashboard(api.clone());
    dashboard.edit_draft(|draft| *draft = gamma_draft()).await;
    let mut rx = dashboard.subscribe_notifications();

    let err = dashboard.use_current_location().await.expect_err("unsupported");
    assert_eq!(err, GeolocationError::Unsupported);
    assert_eq!(dashboard.draft().await, gamma_draft());
    let notifications = drain(&mut rx);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert_eq!(notifications[0].message, notification::LOCATION_FAILED);

    dashboard.submit_draft().await.expect("submit still works");
    assert_eq!(api.create_calls(), 1);
}

#[tokio::test]
async fn delete_refreshes_and_drops_selection() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api.clone());
    dashboard.load().await;
    dashboard.select(CompanyId(2), SelectionOrigin::ListRow).await;

    dashboard.delete(CompanyId(2)).await.expect("delete");

    let state = dashboard.snapshot().await;
    assert_eq!(ids(&state), vec![1]);
    assert_eq!(state.selection().selected(), None);

    let err = dashboard.delete(CompanyId(2)).await.expect_err("gone");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn filters_drive_list_and_map() {
    let api = Arc::new(FakeCompaniesApi::with(vec![acme(), beta()]));
    let dashboard = dashboard(api);
    dashboard.load().await;

    dashboard
        .set_industry_facet(IndustryFacet::Industry("Finance".into()))
        .await;
    let (list, map) = dashboard
        .read(|state| (state.list_view(), state.map_view(&MapConfig::default())))
        .await;
    assert_eq!(list.rows.len(), 1);
    assert_eq!(list.rows[0].name, "Beta");
    assert_eq!(list.total, 2);
    assert_eq!(map.markers.len(), 1);
    assert_eq!(map.markers[0].company_id, CompanyId(2));

    dashboard.set_query("zzz").await;
    let list = dashboard.read(DashboardState::list_view).await;
    assert!(list.rows.is_empty());
    assert_eq!(list.empty_message, Some(NO_MATCHES));
}

#[test]
fn reducer_is_deterministic_without_a_runtime() {
    let mut state = DashboardState::default();
    assert!(state.apply(DashboardMessage::RefreshStarted).is_empty());
    assert!(state.is_loading());

    state.apply(DashboardMessage::RefreshSucceeded(CompanyListResponse {
        companies: vec![acme(), beta()],
        total: 2,
    }));
    let notes = state.apply(DashboardMessage::Select {
        id: CompanyId(1),
        origin: SelectionOrigin::MapMarker,
    });
    assert_eq!(notes[0].message, "Selected: Acme");
    assert_eq!(state.detail().map(|d| d.company.id), Some(CompanyId(1)));

    let notes = state.apply(DashboardMessage::RefreshFailed("boom".into()));
    assert_eq!(notes[0].message, notification::LOAD_FAILED);
    assert_eq!(state.store().len(), 2);
    assert_eq!(state.selection().selected(), Some(CompanyId(1)));

    state.apply(DashboardMessage::ClearSelection);
    assert_eq!(state.selection().selected(), None);
}

#[test]
fn created_company_is_selected_by_the_refresh_that_contains_it() {
    let mut state = DashboardState::default();
    let gamma = Company {
        id: CompanyId(3),
        name: "Gamma".into(),
        industry: "Energy".into(),
        location: "Austin".into(),
        latitude: 30.2672,
        longitude: -97.7431,
    };
    state.apply(DashboardMessage::CreateSucceeded(gamma.clone()));

    let notes = state.apply(DashboardMessage::RefreshSucceeded(CompanyListResponse {
        companies: vec![acme()],
        total: 1,
    }));
    assert!(notes.is_empty());
    assert_eq!(state.selection().selected(), None);

    let notes = state.apply(DashboardMessage::RefreshSucceeded(CompanyListResponse {
        companies: vec![acme(), gamma],
        total: 2,
    }));
    assert_eq!(notes[0].message, "Selected: Gamma");
    assert_eq!(state.selection().selected(), Some(CompanyId(3)));
}

#[test]
fn explicit_selection_replaces_pending_created_one() {
    let mut state = DashboardState::default();
    state.apply(DashboardMessage::RefreshSucceeded(CompanyListResponse {
        companies: vec![acme()],
        total: 1,
    }));
    state.apply(DashboardMessage::CreateSucceeded(beta()));
    state.apply(DashboardMessage::Select {
        id: CompanyId(1),
        origin: SelectionOrigin::ListRow,
    });

    let notes = state.apply(DashboardMessage::RefreshSucceeded(CompanyListResponse {
        companies: vec![acme(), beta()],
        total: 2,
    }));
    assert!(notes.is_empty());
    assert_eq!(state.selection().selected(), Some(CompanyId(1)));
}
