//! Dashboard state container: a total reducer over [`DashboardMessage`] plus
//! the async orchestration (refresh, create, delete) that feeds it.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::{Company, CompanyId, Coordinates},
    protocol::{CompanyListResponse, ListCompaniesQuery},
};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiClientError, CompaniesApi},
    create::{locate, CompanyDraft, CreateError},
    filter::{distinct_industries, facet_options, FilterState, IndustryFacet},
    geo::{
        GeolocationError, Geolocator, MissingGeolocator, MissingReverseGeocoder, ReverseGeocoder,
        DEFAULT_GEOLOCATION_TIMEOUT,
    },
    map::{build_map_view, MapConfig, MapView},
    notification::{self, Notification},
    selection::{SelectionCoordinator, SelectionOrigin},
    store::CompanyStore,
    views::{CompanyDetail, ListView},
};

const NOTIFICATION_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum DashboardMessage {
    RefreshStarted,
    RefreshSucceeded(CompanyListResponse),
    RefreshFailed(String),
    SetQuery(String),
    SetIndustryFacet(IndustryFacet),
    Select {
        id: CompanyId,
        origin: SelectionOrigin,
    },
    ClearSelection,
    CreateSucceeded(Company),
    CreateFailed(String),
    LocationAcquired(Coordinates),
    LocationFailed(String),
    DeleteSucceeded(CompanyId),
    DeleteFailed {
        id: CompanyId,
        reason: String,
    },
}

/// Everything the list, map and detail panes render from.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    store: CompanyStore,
    selection: SelectionCoordinator,
    filter: FilterState,
    loading: bool,
    /// Created company to select once a refresh brings it into the store.
    pending_selection: Option<CompanyId>,
}

impl DashboardState {
    /// Applies one message. Never fails; returns the notifications the
    /// transition produced.
    pub fn apply(&mut self, message: DashboardMessage) -> Vec<Notification> {
        match message {
            DashboardMessage::RefreshStarted => {
                self.loading = true;
                Vec::new()
            }
            DashboardMessage::RefreshSucceeded(response) => {
                self.store.replace(response);
                self.loading = false;
                if self.selection.clear_if_missing(self.store.companies()) {
                    info!("selected company disappeared after refresh");
                }
                let created = self.pending_selection.and_then(|id| self.store.get(id));
                match created {
                    Some(company) => {
                        self.pending_selection = None;
                        vec![self.selection.select(company, SelectionOrigin::Created)]
                    }
                    None => Vec::new(),
                }
            }
            DashboardMessage::RefreshFailed(reason) => {
                self.loading = false;
                error!(%reason, "error fetching companies");
                vec![Notification::error(notification::LOAD_FAILED)]
            }
            DashboardMessage::SetQuery(query) => {
                self.filter.query = query;
                Vec::new()
            }
            DashboardMessage::SetIndustryFacet(facet) => {
                self.filter.industry = facet;
                Vec::new()
            }
            DashboardMessage::Select { id, origin } => match self.store.get(id) {
                Some(company) => {
                    self.pending_selection = None;
                    vec![self.selection.select(company, origin)]
                }
                None => {
                    warn!(company_id = id.0, ?origin, "ignoring selection of unknown company");
                    Vec::new()
                }
            },
            DashboardMessage::ClearSelection => {
                self.pending_selection = None;
                self.selection.clear();
                Vec::new()
            }
            DashboardMessage::CreateSucceeded(company) => {
                info!(company_id = company.id.0, name = %company.name, "company created");
                self.pending_selection = Some(company.id);
                vec![Notification::success(notification::CREATE_SUCCEEDED)]
            }
            DashboardMessage::CreateFailed(reason) => {
                error!(%reason, "error creating company");
                vec![Notification::error(notification::CREATE_FAILED)]
            }
            DashboardMessage::LocationAcquired(position) => {
                debug!(position = %position.format(6), "device location acquired");
                vec![Notification::success(notification::LOCATION_SET)]
            }
            DashboardMessage::LocationFailed(reason) => {
                warn!(%reason, "error getting location");
                vec![Notification::error(notification::LOCATION_FAILED)]
            }
            DashboardMessage::DeleteSucceeded(id) => {
                info!(company_id = id.0, "company deleted");
                vec![Notification::success(notification::DELETE_SUCCEEDED)]
            }
            DashboardMessage::DeleteFailed { id, reason } => {
                error!(company_id = id.0, %reason, "error deleting company");
                vec![Notification::error(notification::DELETE_FAILED)]
            }
        }
    }

    pub fn store(&self) -> &CompanyStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn filtered(&self) -> Vec<&Company> {
        self.filter.apply(self.store.companies())
    }

    pub fn industries(&self) -> Vec<String> {
        distinct_industries(self.store.companies())
    }

    pub fn facet_options(&self) -> Vec<IndustryFacet> {
        facet_options(self.store.companies())
    }

    pub fn list_view(&self) -> ListView {
        ListView::build(
            &self.filtered(),
            self.store.len(),
            &self.filter,
            &self.selection,
        )
    }

    pub fn map_view(&self, config: &MapConfig) -> MapView {
        build_map_view(&self.filtered(), self.selection.selected(), config)
    }

    pub fn detail(&self) -> Option<CompanyDetail> {
        self.selection
            .resolve(self.store.companies())
            .map(CompanyDetail::new)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { count: usize },
    Failed,
    /// Another refresh was already running; no request was made.
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub page_limit: u32,
    pub geolocation_timeout: Duration,
    pub map: MapConfig,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            page_limit: ListCompaniesQuery::default().limit,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            map: MapConfig::default(),
        }
    }
}

pub struct Dashboard {
    api: Arc<dyn CompaniesApi>,
    geolocator: Arc<dyn Geolocator>,
    geocoder: Arc<dyn ReverseGeocoder>,
    options: DashboardOptions,
    state: RwLock<DashboardState>,
    draft: Mutex<CompanyDraft>,
    refresh_in_flight: AtomicBool,
    refresh_pending: AtomicBool,
    notifications: broadcast::Sender<Notification>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Dashboard {
    pub fn new(api: Arc<dyn CompaniesApi>, options: DashboardOptions) -> Arc<Self> {
        Self::new_with_dependencies(
            api,
            Arc::new(MissingGeolocator),
            Arc::new(MissingReverseGeocoder),
            options,
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn CompaniesApi>,
        geolocator: Arc<dyn Geolocator>,
        geocoder: Arc<dyn ReverseGeocoder>,
        options: DashboardOptions,
    ) -> Arc<Self> {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Arc::new(Self {
            api,
            geolocator,
            geocoder,
            options,
            state: RwLock::new(DashboardState::default()),
            draft: Mutex::new(CompanyDraft::default()),
            refresh_in_flight: AtomicBool::new(false),
            refresh_pending: AtomicBool::new(false),
            notifications,
        })
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    /// Runs a message through the reducer and publishes its notifications.
    pub async fn dispatch(&self, message: DashboardMessage) {
        let produced = self.state.write().await.apply(message);
        for notification in produced {
            debug!(level = ?notification.level, message = %notification.message, "notify");
            // No subscribers is fine; the state change already happened.
            let _ = self.notifications.send(notification);
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Initial population of the store.
    pub async fn load(&self) -> RefreshOutcome {
        self.refresh().await
    }

    /// Single-flight refresh. A trigger that arrives while a refresh runs
    /// returns `Coalesced` and makes the running refresh fetch once more, so
    /// every trigger is followed by a fetch that started after it.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_pending.store(true, Ordering::SeqCst);
        let mut outcome = RefreshOutcome::Coalesced;
        while self.refresh_pending.load(Ordering::SeqCst) {
            if self
                .refresh_in_flight
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("refresh already in flight; queued a follow-up fetch");
                break;
            }
            let _guard = InFlightGuard(&self.refresh_in_flight);
            if !self.refresh_pending.swap(false, Ordering::SeqCst) {
                continue;
            }
            outcome = self.fetch_companies().await;
        }
        outcome
    }

    async fn fetch_companies(&self) -> RefreshOutcome {
        self.dispatch(DashboardMessage::RefreshStarted).await;
        let query = ListCompaniesQuery {
            skip: 0,
            limit: self.options.page_limit,
        };
        match self.api.list_companies(query).await {
            Ok(response) => {
                let count = response.companies.len();
                self.dispatch(DashboardMessage::RefreshSucceeded(response))
                    .await;
                info!(count, "companies refreshed");
                RefreshOutcome::Refreshed { count }
            }
            Err(err) => {
                self.dispatch(DashboardMessage::RefreshFailed(err.to_string()))
                    .await;
                RefreshOutcome::Failed
            }
        }
    }

    pub async fn set_query(&self, query: impl Into<String>) {
        self.dispatch(DashboardMessage::SetQuery(query.into())).await;
    }

    pub async fn set_industry_facet(&self, facet: IndustryFacet) {
        self.dispatch(DashboardMessage::SetIndustryFacet(facet)).await;
    }

    /// List rows and map markers both land here.
    pub async fn select(&self, id: CompanyId, origin: SelectionOrigin) -> bool {
        self.dispatch(DashboardMessage::Select { id, origin }).await;
        self.state.read().await.selection.is_selected(id)
    }

    pub async fn clear_selection(&self) {
        self.dispatch(DashboardMessage::ClearSelection).await;
    }

    pub async fn draft(&self) -> CompanyDraft {
        self.draft.lock().await.clone()
    }

    pub async fn edit_draft(&self, edit: impl FnOnce(&mut CompanyDraft)) {
        edit(&mut *self.draft.lock().await);
    }

    /// Cancelling the create surface discards the draft.
    pub async fn discard_draft(&self) {
        *self.draft.lock().await = CompanyDraft::default();
    }

    /// Prefills the held draft from the device position. Failures only
    /// notify; they never block a later submission.
    /// Edits made to the draft while the position resolves are kept.
    pub async fn use_current_location(&self) -> Result<Coordinates, GeolocationError> {
        let located = locate(
            self.geolocator.as_ref(),
            self.geocoder.as_ref(),
            self.options.geolocation_timeout,
        )
        .await;
        match located {
            Ok(fix) => {
                self.draft.lock().await.apply_location(&fix);
                self.dispatch(DashboardMessage::LocationAcquired(fix.position))
                    .await;
                Ok(fix.position)
            }
            Err(err) => {
                self.dispatch(DashboardMessage::LocationFailed(err.to_string()))
                    .await;
                Err(err)
            }
        }
    }

    pub async fn submit_draft(&self) -> Result<Company, CreateError> {
        let draft = self.draft().await;
        self.submit(draft).await
    }

    /// Validates and creates a company. Validation failures never reach the
    /// network. A network failure keeps the draft for a retry; success
    /// discards it and refreshes the store. The new company is selected by
    /// whichever refresh first brings it into the store.
    pub async fn submit(&self, draft: CompanyDraft) -> Result<Company, CreateError> {
        let payload = match draft.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(fields = ?errors.fields(), "company draft rejected");
                *self.draft.lock().await = draft;
                return Err(CreateError::Validation(errors));
            }
        };

        let company = match self.api.create_company(&payload).await {
            Ok(company) => company,
            Err(err) => {
                *self.draft.lock().await = draft;
                self.dispatch(DashboardMessage::CreateFailed(err.to_string()))
                    .await;
                return Err(CreateError::Network(err));
            }
        };

        self.discard_draft().await;
        self.dispatch(DashboardMessage::CreateSucceeded(company.clone()))
            .await;

        match self.refresh().await {
            RefreshOutcome::Refreshed { .. } => {
                let state = self.state.read().await;
                if !state.store.contains(company.id) {
                    warn!(
                        company_id = company.id.0,
                        truncated = state.store.is_truncated(),
                        "created company missing from refreshed page"
                    );
                }
            }
            outcome => debug!(?outcome, "post-create refresh did not apply a list itself"),
        }

        Ok(company)
    }

    pub async fn fetch_company(&self, id: CompanyId) -> Result<Company, ApiClientError> {
        self.api.get_company(id).await
    }

    pub async fn delete(&self, id: CompanyId) -> Result<(), ApiClientError> {
        match self.api.delete_company(id).await {
            Ok(()) => {
                self.dispatch(DashboardMessage::DeleteSucceeded(id)).await;
                self.refresh().await;
                Ok(())
            }
            Err(err) => {
                self.dispatch(DashboardMessage::DeleteFailed {
                    id,
                    reason: err.to_string(),
                })
                .await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
