use shared::domain::{Company, CompanyId};
use tracing::{debug, info};

use crate::notification::Notification;

/// Where a selection request came from. Every origin goes through
/// [`SelectionCoordinator::select`]; the origin is only recorded for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    ListRow,
    MapMarker,
    Created,
}

/// Holds the currently selected company as an id looked up against the
/// store, never as an owned copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionCoordinator {
    selected: Option<CompanyId>,
}

impl SelectionCoordinator {
    pub fn selected(&self) -> Option<CompanyId> {
        self.selected
    }

    pub fn is_selected(&self, id: CompanyId) -> bool {
        self.selected == Some(id)
    }

    pub fn select(&mut self, company: &Company, origin: SelectionOrigin) -> Notification {
        info!(company_id = company.id.0, ?origin, "company selected");
        self.selected = Some(company.id);
        Notification::selected(&company.name)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Drops the selection when its id is no longer in `companies`.
    /// Returns true when it cleared something.
    pub fn clear_if_missing(&mut self, companies: &[Company]) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        if companies.iter().any(|company| company.id == id) {
            return false;
        }
        debug!(company_id = id.0, "selection no longer in store; clearing");
        self.selected = None;
        true
    }

    pub fn resolve<'a>(&self, companies: &'a [Company]) -> Option<&'a Company> {
        let id = self.selected?;
        companies.iter().find(|company| company.id == id)
    }
}
