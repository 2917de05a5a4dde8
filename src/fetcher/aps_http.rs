//! HTTP client for the primary-care reporting service.
//!
//! Performs exactly one request per call and classifies every failure into
//! the [`FailureReason`] taxonomy. This classification is the single place
//! that decides retriability; retry policy lives one layer up.

use crate::catalog::{Municipality, Region};
use crate::fetcher::aps_config::{
    request_headers, BASE_URL, GEO_LEVEL, MUNICIPALITIES_ENDPOINT, PAYMENT_ENDPOINT, REPORT_TYPE,
    REQUEST_TIMEOUT,
};
use crate::fetcher::aps_parser::{extract_payload, PaymentResponse};
use crate::fetcher::{FailureReason, FetchOutcome, PaymentFetcher};
use crate::Period;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

/// Single-attempt client for the reporting service.
#[derive(Debug, Clone)]
pub struct ApsHttpClient {
    client: Client,
    base_url: String,
}

impl ApsHttpClient {
    /// Create a client against the production service.
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Create a client against an alternative base URL (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the municipality directory for one federal unit, name-sorted.
    ///
    /// Used once at startup to hydrate the region catalog; failures here are
    /// pre-flight errors that abort before any collection task runs.
    pub async fn list_municipalities(
        &self,
        region: &Region,
    ) -> Result<Vec<Municipality>, FailureReason> {
        let url = format!("{}{}", self.base_url, MUNICIPALITIES_ENDPOINT);
        debug!(region = %region.code, "fetching municipality directory");

        let response = self
            .client
            .get(&url)
            .query(&[("coUf", region.ibge_code.as_str())])
            .headers(request_headers())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if let Some(reason) = classify_status(response.status()) {
            warn!(region = %region.code, status = response.status().as_u16(),
                "municipality directory request failed");
            return Err(reason);
        }

        let entries: Vec<MunicipalityEntry> = response
            .json()
            .await
            .map_err(|e| classify_body_error(&e))?;

        let mut municipalities: Vec<Municipality> = entries
            .into_iter()
            .filter_map(|entry| entry.into_municipality())
            .collect();
        municipalities.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            region = %region.code,
            count = municipalities.len(),
            "municipality directory loaded"
        );
        Ok(municipalities)
    }
}

impl Default for ApsHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentFetcher for ApsHttpClient {
    async fn fetch_payment(
        &self,
        region_ibge: &str,
        municipality_ibge: &str,
        period: Period,
    ) -> FetchOutcome {
        let url = format!("{}{}", self.base_url, PAYMENT_ENDPOINT);
        let parcela = period.to_query_token();
        let params = [
            ("unidadeGeografica", GEO_LEVEL),
            ("coUf", region_ibge),
            ("coMunicipio", municipality_ibge),
            ("nuParcelaInicio", parcela.as_str()),
            ("nuParcelaFim", parcela.as_str()),
            ("tipoRelatorio", REPORT_TYPE),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .headers(request_headers())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if let Some(reason) = classify_status(response.status()) {
            return Err(reason);
        }

        let body: PaymentResponse = response
            .json()
            .await
            .map_err(|e| classify_body_error(&e))?;

        // A well-formed body without any ACS section is still a schema
        // mismatch at this boundary; no partial record ever escapes.
        extract_payload(&body).ok_or(FailureReason::MalformedResponse)
    }
}

/// Classify a transport-level error (no HTTP status available).
fn classify_transport(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        FailureReason::TransientTimeout
    } else {
        FailureReason::TransientNetwork
    }
}

/// Classify an HTTP status; `None` means success.
fn classify_status(status: StatusCode) -> Option<FailureReason> {
    if status.is_client_error() {
        Some(FailureReason::Remote4xx {
            status: status.as_u16(),
        })
    } else if status.is_server_error() {
        Some(FailureReason::Remote5xx {
            status: status.as_u16(),
        })
    } else {
        None
    }
}

/// Classify an error raised while reading or decoding the response body.
fn classify_body_error(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        FailureReason::TransientTimeout
    } else if err.is_decode() {
        FailureReason::MalformedResponse
    } else {
        FailureReason::TransientNetwork
    }
}

/// One municipality entry in the directory response. The service has been
/// observed using different field names for the IBGE code over time.
#[derive(Debug, Deserialize)]
struct MunicipalityEntry {
    #[serde(alias = "codigo", alias = "id", alias = "codigoIBGE")]
    code: Option<CodeValue>,
    #[serde(default, rename = "nome")]
    name: String,
}

/// IBGE codes arrive as strings or numbers depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Text(String),
    Number(u64),
}

impl MunicipalityEntry {
    fn into_municipality(self) -> Option<Municipality> {
        let ibge_code = match self.code? {
            CodeValue::Text(s) => s,
            CodeValue::Number(n) => n.to_string(),
        };
        if ibge_code.is_empty() || self.name.is_empty() {
            return None;
        }
        Some(Municipality {
            ibge_code,
            name: self.name,
        })
    }
}
