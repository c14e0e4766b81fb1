//! REST client for the companies backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Company, CompanyId},
    error::ApiErrorBody,
    protocol::{CompanyCreate, CompanyListResponse, ListCompaniesQuery},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const COMPANIES_PATH: &str = "api/companies/";

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("company {0} not found")]
    NotFound(CompanyId),
}

impl ApiClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiClientError::NotFound(_))
    }
}

#[async_trait]
pub trait CompaniesApi: Send + Sync {
    async fn list_companies(
        &self,
        query: ListCompaniesQuery,
    ) -> Result<CompanyListResponse, ApiClientError>;
    async fn get_company(&self, id: CompanyId) -> Result<Company, ApiClientError>;
    async fn create_company(&self, company: &CompanyCreate) -> Result<Company, ApiClientError>;
    async fn delete_company(&self, id: CompanyId) -> Result<(), ApiClientError>;
}

pub struct HttpCompaniesApi {
    http: Client,
    base_url: Url,
}

impl HttpCompaniesApi {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ApiClientError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ApiClientError> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ApiClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                source,
            })
    }

    fn company_endpoint(&self, id: CompanyId) -> Result<Url, ApiClientError> {
        self.endpoint(&format!("{COMPANIES_PATH}{}", id.0))
    }
}

#[async_trait]
impl CompaniesApi for HttpCompaniesApi {
    async fn list_companies(
        &self,
        query: ListCompaniesQuery,
    ) -> Result<CompanyListResponse, ApiClientError> {
        let url = self.endpoint(COMPANIES_PATH)?;
        debug!(%url, skip = query.skip, limit = query.limit, "listing companies");
        let response = self.http.get(url).query(&query).send().await?;
        let body: CompanyListResponse = check_status(response).await?.json().await?;
        Ok(body)
    }

    async fn get_company(&self, id: CompanyId) -> Result<Company, ApiClientError> {
        let url = self.company_endpoint(id)?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiClientError::NotFound(id));
        }
        Ok(check_status(response).await?.json().await?)
    }

    async fn create_company(&self, company: &CompanyCreate) -> Result<Company, ApiClientError> {
        let url = self.endpoint(COMPANIES_PATH)?;
        debug!(%url, name = %company.name, "creating company");
        let response = self.http.post(url).json(company).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn delete_company(&self, id: CompanyId) -> Result<(), ApiClientError> {
        let url = self.company_endpoint(id)?;
        let response = self.http.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiClientError::NotFound(id));
        }
        check_status(response).await?;
        Ok(())
    }
}

/// Parses the base url and makes sure relative joins keep any path prefix.
pub fn normalize_base_url(raw: &str) -> Result<Url, ApiClientError> {
    let mut url = Url::parse(raw.trim()).map_err(|source| ApiClientError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<ApiErrorBody>(&raw) {
        Ok(body) => body.detail,
        Err(_) if !raw.trim().is_empty() => raw,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    warn!(status = status.as_u16(), %detail, "backend request failed");
    Err(ApiClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
