//! Display-ready projections for the company list and detail panes.

use shared::domain::{Company, CompanyId};

use crate::{filter::FilterState, selection::SelectionCoordinator};

pub const NO_MATCHES: &str = "No companies match your search criteria";
pub const NO_COMPANIES: &str = "No companies found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRow {
    pub id: CompanyId,
    pub name: String,
    pub location: String,
    pub industry: String,
    pub coordinates: String,
    pub selected: bool,
}

impl CompanyRow {
    fn new(company: &Company, selected: bool) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
            location: company.location.clone(),
            industry: company.industry.clone(),
            coordinates: company.coordinates().format(4),
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub rows: Vec<CompanyRow>,
    /// Number of companies in the store before filtering.
    pub total: usize,
    pub empty_message: Option<&'static str>,
}

impl ListView {
    pub fn build(
        filtered: &[&Company],
        total: usize,
        filter: &FilterState,
        selection: &SelectionCoordinator,
    ) -> Self {
        let rows: Vec<CompanyRow> = filtered
            .iter()
            .map(|company| CompanyRow::new(company, selection.is_selected(company.id)))
            .collect();
        let empty_message = match (rows.is_empty(), filter.is_active()) {
            (false, _) => None,
            (true, true) => Some(NO_MATCHES),
            (true, false) => Some(NO_COMPANIES),
        };
        Self {
            rows,
            total,
            empty_message,
        }
    }

    pub fn header(&self) -> String {
        format!("Companies ({})", self.rows.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDetail {
    pub company: Company,
    pub coordinates: String,
}

impl CompanyDetail {
    pub fn new(company: &Company) -> Self {
        Self {
            company: company.clone(),
            coordinates: company.coordinates().format(6),
        }
    }
}
