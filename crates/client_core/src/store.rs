use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{Company, CompanyId},
    protocol::CompanyListResponse,
};
use tracing::warn;

/// Last fetched company list. Replaced wholesale on every refresh; readers
/// hold an `Arc` snapshot so they never observe a half-written list.
#[derive(Debug, Clone)]
pub struct CompanyStore {
    companies: Arc<[Company]>,
    total: u64,
    fetched: usize,
    loaded: bool,
}

impl Default for CompanyStore {
    fn default() -> Self {
        Self {
            companies: Arc::from(Vec::new()),
            total: 0,
            fetched: 0,
            loaded: false,
        }
    }
}

impl CompanyStore {
    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn snapshot(&self) -> Arc<[Company]> {
        Arc::clone(&self.companies)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Count reported by the backend, which may exceed the page we hold.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, id: CompanyId) -> Option<&Company> {
        self.companies.iter().find(|company| company.id == id)
    }

    pub fn contains(&self, id: CompanyId) -> bool {
        self.get(id).is_some()
    }

    /// True when the backend holds more companies than the fetched page.
    pub fn is_truncated(&self) -> bool {
        self.total > self.fetched as u64
    }

    /// Swaps in a freshly fetched list. Duplicate ids keep their first row.
    pub fn replace(&mut self, response: CompanyListResponse) {
        let fetched = response.companies.len();
        let mut seen = HashSet::with_capacity(fetched);
        let companies: Vec<Company> = response
            .companies
            .into_iter()
            .filter(|company| seen.insert(company.id))
            .collect();
        if companies.len() != fetched {
            warn!(
                fetched,
                kept = companies.len(),
                "backend returned duplicate company ids"
            );
        }
        if response.total > fetched as u64 {
            warn!(
                total = response.total,
                fetched,
                "company list truncated by page limit"
            );
        }

        self.companies = Arc::from(companies);
        self.total = response.total;
        self.fetched = fetched;
        self.loaded = true;
    }
}
