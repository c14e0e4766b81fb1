//! Free-text and industry filtering over the in-memory company list.

use std::{collections::BTreeSet, convert::Infallible, fmt, str::FromStr};

use shared::domain::Company;

pub const ALL_INDUSTRIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IndustryFacet {
    #[default]
    All,
    Industry(String),
}

impl IndustryFacet {
    pub fn matches(&self, company: &Company) -> bool {
        match self {
            IndustryFacet::All => true,
            IndustryFacet::Industry(industry) => company.industry == *industry,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            IndustryFacet::All => "All Industries",
            IndustryFacet::Industry(industry) => industry,
        }
    }
}

impl FromStr for IndustryFacet {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == ALL_INDUSTRIES {
            Ok(IndustryFacet::All)
        } else {
            Ok(IndustryFacet::Industry(raw.to_string()))
        }
    }
}

impl fmt::Display for IndustryFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndustryFacet::All => f.write_str(ALL_INDUSTRIES),
            IndustryFacet::Industry(industry) => f.write_str(industry),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub query: String,
    pub industry: IndustryFacet,
}

impl FilterState {
    pub fn new(query: impl Into<String>, industry: IndustryFacet) -> Self {
        Self {
            query: query.into(),
            industry,
        }
    }

    /// True when the view shows a narrowed subset rather than the whole store.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.industry != IndustryFacet::All
    }

    pub fn apply<'a>(&self, companies: &'a [Company]) -> Vec<&'a Company> {
        filter_companies(companies, &self.query, &self.industry)
    }
}

/// Companies whose industry matches `facet` and whose name or location
/// contains `query`, case-insensitively. Input order is kept. The query is
/// not trimmed, so a whitespace query only matches text containing it.
pub fn filter_companies<'a>(
    companies: &'a [Company],
    query: &str,
    facet: &IndustryFacet,
) -> Vec<&'a Company> {
    let needle = query.to_lowercase();
    companies
        .iter()
        .filter(|company| facet.matches(company))
        .filter(|company| {
            needle.is_empty()
                || company.name.to_lowercase().contains(&needle)
                || company.location.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Sorted, deduplicated industries present in `companies`.
pub fn distinct_industries(companies: &[Company]) -> Vec<String> {
    companies
        .iter()
        .map(|company| company.industry.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Facet choices for a picker: `All` followed by every distinct industry.
pub fn facet_options(companies: &[Company]) -> Vec<IndustryFacet> {
    std::iter::once(IndustryFacet::All)
        .chain(
            distinct_industries(companies)
                .into_iter()
                .map(IndustryFacet::Industry),
        )
        .collect()
}
