//! Remote service endpoints, headers, and request constants.

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

/// Base URL of the primary-care reporting service.
pub const BASE_URL: &str = "https://relatorioaps-prd.saude.gov.br";

/// Endpoint serving per-municipality payment reports.
pub const PAYMENT_ENDPOINT: &str = "/financiamento/pagamento";

/// Endpoint serving the municipality directory for one federal unit.
pub const MUNICIPALITIES_ENDPOINT: &str = "/ibge/municipios";

/// Fixed per-request deadline. The service is slow under load but responses
/// beyond this are effectively lost.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Geographic granularity of payment queries.
pub const GEO_LEVEL: &str = "MUNICIPIO";

/// Report variant carrying both payment and budget sections.
pub const REPORT_TYPE: &str = "COMPLETO";

/// The service rejects requests without a browser-like header profile, so
/// every request carries this fixed set.
static REQUEST_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert(
        "Origin",
        HeaderValue::from_static("https://relatorioaps.saude.gov.br"),
    );
    headers.insert("Pragma", HeaderValue::from_static("no-cache"));
    headers.insert(
        "Referer",
        HeaderValue::from_static("https://relatorioaps.saude.gov.br/"),
    );
    headers.insert(
        "User-Agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
        ),
    );
    headers
});

/// Header set required by the remote service.
pub fn request_headers() -> HeaderMap {
    REQUEST_HEADERS.clone()
}
