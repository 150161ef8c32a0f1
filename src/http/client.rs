//! Low-level HTTP client — `StockflowHttp`.
//!
//! One method per API endpoint. Returns wire types (conversion to domain types
//! happens at the Layer 5 boundary). Internal to the SDK — Layer 5 wraps this.

use crate::auth::{TokenResponse, TokenVault};
use crate::domain::collection::wire::{BatchRequest, FetchStatusRequest, FetchStatusResponse};
use crate::domain::series::wire::{ChartResponse, DateRangeResponse, RecomputeResponse};
use crate::domain::statistics::wire::{
    AllSectorsChartResponse, InvestorRatioResponse, SectorInfo, SectorStock, SupplyDemandRow,
};
use crate::domain::statistics::RecomputeKind;
use crate::domain::stock::wire::{StockListRefreshResponse, StockSearchResult};
use crate::error::{HttpError, SdkError};
use crate::http::retry::{RetryConfig, RetryPolicy};

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout. Streaming responses are exempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level HTTP client for the Stockflow REST API.
#[derive(Clone)]
pub struct StockflowHttp {
    base_url: String,
    client: Client,
    vault: TokenVault,
    retry: RetryConfig,
    timeout: Duration,
}

impl StockflowHttp {
    pub fn new(
        base_url: &str,
        vault: TokenVault,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let client = Client::builder().pool_max_idle_per_host(10).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            vault,
            retry,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn vault(&self) -> &TokenVault {
        &self.vault
    }

    // ── OAuth ────────────────────────────────────────────────────────────

    pub async fn issue_token(&self) -> Result<TokenResponse, SdkError> {
        let url = format!("{}/api/v1/oauth/token", self.base_url);
        self.post(&url, None::<&()>, RetryPolicy::None).await
    }

    pub async fn token_status(&self) -> Result<TokenResponse, SdkError> {
        let url = format!("{}/api/v1/oauth/token/status", self.base_url);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Stock list ───────────────────────────────────────────────────────

    pub async fn search_stocks(&self, keyword: &str) -> Result<Vec<StockSearchResult>, SdkError> {
        let url = format!(
            "{}/api/v1/stock-list/search?keyword={}",
            self.base_url,
            urlencoding::encode(keyword)
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_kospi200_stocks(&self) -> Result<Vec<StockSearchResult>, SdkError> {
        let url = format!("{}/api/v1/stock-list/kospi200", self.base_url);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn refresh_stock_list(&self) -> Result<StockListRefreshResponse, SdkError> {
        let url = format!("{}/api/v1/stock-list/refresh", self.base_url);
        self.post(&url, None::<&()>, RetryPolicy::None).await
    }

    pub async fn get_date_range(&self, stock_code: &str) -> Result<DateRangeResponse, SdkError> {
        let url = format!(
            "{}/api/v1/investor-chart/{}/date-range",
            self.base_url,
            urlencoding::encode(stock_code)
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Statistic charts ─────────────────────────────────────────────────

    pub async fn get_moving_average_chart(
        &self,
        stock_code: &str,
        days: u32,
        investors: &str,
        period: u32,
        before_date: Option<&str>,
    ) -> Result<ChartResponse, SdkError> {
        let mut url = format!(
            "{}/api/statistics/moving-average/chart/{}?days={}&investors={}&period={}",
            self.base_url,
            urlencoding::encode(stock_code),
            days,
            urlencoding::encode(investors),
            period
        );
        if let Some(b) = before_date {
            url = format!("{}&beforeDate={}", url, b);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_sector_ma_chart(
        &self,
        sector_code: &str,
        days: u32,
        investors: &str,
        period: u32,
        before_date: Option<&str>,
    ) -> Result<ChartResponse, SdkError> {
        let mut url = format!(
            "{}/api/v1/sector-ma/chart/{}?days={}&investors={}&period={}",
            self.base_url,
            urlencoding::encode(sector_code),
            days,
            urlencoding::encode(investors),
            period
        );
        if let Some(b) = before_date {
            url = format!("{}&beforeDate={}", url, b);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_correlation_chart(
        &self,
        stock_code: &str,
        corr_days: u32,
        limit: u32,
        before_date: Option<&str>,
    ) -> Result<ChartResponse, SdkError> {
        let mut url = format!(
            "{}/api/statistics/correlation/chart/{}?corrDays={}&limit={}",
            self.base_url,
            urlencoding::encode(stock_code),
            corr_days,
            limit
        );
        if let Some(b) = before_date {
            url = format!("{}&beforeDate={}", url, b);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn recompute(
        &self,
        kind: RecomputeKind,
        stock_code: &str,
    ) -> Result<RecomputeResponse, SdkError> {
        let url = format!(
            "{}/api/statistics/{}/calculate/{}",
            self.base_url,
            kind.path_segment(),
            urlencoding::encode(stock_code)
        );
        self.post(&url, None::<&()>, RetryPolicy::None).await
    }

    /// Rebuild one statistic for every stock. Slow; raise the client
    /// timeout for large universes.
    pub async fn recompute_kospi200(&self, kind: RecomputeKind) -> Result<RecomputeResponse, SdkError> {
        let url = format!("{}/api/statistics/{}/calculate", self.base_url, kind.path_segment());
        self.post(&url, None::<&()>, RetryPolicy::None).await
    }

    /// Investor share over the trailing year.
    pub async fn get_investor_ratio(&self, stock_code: &str) -> Result<InvestorRatioResponse, SdkError> {
        let url = format!(
            "{}/api/statistics/investor-ratio/{}",
            self.base_url,
            urlencoding::encode(stock_code)
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_investor_ratio_ma(
        &self,
        stock_code: &str,
        period: u32,
        from_date: Option<&str>,
        to_date: Option<&str>,
    ) -> Result<InvestorRatioResponse, SdkError> {
        let mut url = format!(
            "{}/api/statistics/investor-ratio-ma/{}?period={}",
            self.base_url,
            urlencoding::encode(stock_code),
            period
        );
        if let Some(f) = from_date {
            url = format!("{}&fromDate={}", url, f);
        }
        if let Some(t) = to_date {
            url = format!("{}&toDate={}", url, t);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_all_sectors_chart(
        &self,
        days: u32,
        investors: &str,
        period: u32,
        before_date: Option<&str>,
    ) -> Result<AllSectorsChartResponse, SdkError> {
        let mut url = format!(
            "{}/api/v1/sector-ma/chart/all?days={}&investors={}&period={}",
            self.base_url,
            days,
            urlencoding::encode(investors),
            period
        );
        if let Some(b) = before_date {
            url = format!("{}&beforeDate={}", url, b);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Analysis ─────────────────────────────────────────────────────────

    pub async fn get_supply_demand(
        &self,
        stock_code: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<SupplyDemandRow>, SdkError> {
        let mut url = format!(
            "{}/api/v1/analysis/supply-demand?stkCd={}",
            self.base_url,
            urlencoding::encode(stock_code)
        );
        if let Some(s) = start_date {
            url = format!("{}&startDt={}", url, s);
        }
        if let Some(e) = end_date {
            url = format!("{}&endDt={}", url, e);
        }
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_sectors(&self) -> Result<Vec<SectorInfo>, SdkError> {
        let url = format!("{}/api/v1/sector-ma/sectors", self.base_url);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    pub async fn get_sector_stocks(&self, sector_code: &str) -> Result<Vec<SectorStock>, SdkError> {
        let url = format!(
            "{}/api/v1/sector-ma/stocks/{}",
            self.base_url,
            urlencoding::encode(sector_code)
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Collection ───────────────────────────────────────────────────────

    pub async fn fetch_with_status(
        &self,
        request: &FetchStatusRequest,
    ) -> Result<FetchStatusResponse, SdkError> {
        let url = format!("{}/api/v1/investor-chart/fetch/status", self.base_url);
        self.post(&url, Some(request), RetryPolicy::None).await
    }

    /// Open the KOSPI200 batch event stream. The response body is read
    /// incrementally by the caller; no retry, no overall timeout.
    pub async fn open_kospi200_batch(
        &self,
        request: &BatchRequest,
    ) -> Result<reqwest::Response, HttpError> {
        let url = format!("{}/api/v1/investor-chart/fetch/kospi200-batch", self.base_url);
        let req = self
            .authorize(self.client.post(&url))
            .header("Accept", "text/event-stream")
            .json(request);

        let resp = req.send().await?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, error_message(&body)))
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: &str, retry: RetryPolicy) -> Result<T, SdkError> {
        let value = self
            .request_with_retry(reqwest::Method::GET, url, None::<&()>, retry)
            .await?;
        decode(value)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<T, SdkError> {
        let value = self
            .request_with_retry(reqwest::Method::POST, url, body, retry)
            .await?;
        decode(value)
    }

    async fn request_with_retry<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<Value, HttpError> {
        let config = match &retry {
            RetryPolicy::None => {
                return self.do_request(&method, url, body).await;
            }
            RetryPolicy::Idempotent => self.retry.clone(),
            RetryPolicy::Custom(c) => c.clone(),
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_request(&method, url, body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let should_retry = match &e {
                        HttpError::ServerError { status, .. } => {
                            config.retryable_statuses.contains(status)
                        }
                        HttpError::RateLimited { retry_after_ms } => {
                            if let Some(ms) = retry_after_ms {
                                futures_timer::Delay::new(Duration::from_millis(*ms)).await;
                            }
                            true
                        }
                        HttpError::Timeout => true,
                        HttpError::Reqwest(re) => re.is_connect() || re.is_timeout(),
                        _ => false,
                    };

                    if should_retry && attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request to {}",
                            url
                        );
                        futures_timer::Delay::new(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_request<B: Serialize>(
        &self,
        method: &reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Value, HttpError> {
        let mut req = self
            .authorize(self.client.request(method.clone(), url))
            .timeout(self.timeout);

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::Reqwest(e)
            }
        })?;
        let status = resp.status();
        let body_text = resp.text().await?;

        if status.is_success() {
            if body_text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body_text)
                .map_err(|e| HttpError::BadResponse(e.to_string()));
        }

        Err(status_error(status.as_u16(), error_message(&body_text)))
    }

    /// Attach the stored bearer token, read at send time.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.vault.bearer(Utc::now()) {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }
}

impl std::fmt::Debug for StockflowHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockflowHttp")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn status_error(status: u16, message: String) -> HttpError {
    match status {
        401 => HttpError::Unauthorized,
        404 => HttpError::NotFound(message),
        429 => HttpError::RateLimited {
            retry_after_ms: None,
        },
        400..=499 => HttpError::BadRequest(message),
        _ => HttpError::ServerError {
            status,
            body: message,
        },
    }
}

/// `message`, then `error`, from a JSON error body; the raw text otherwise.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

/// Unwrap the response envelope and deserialize.
///
/// A non-zero `returnCode` is a business failure even under HTTP 200.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    if let Some(code) = value.get("returnCode").and_then(Value::as_i64) {
        if code != 0 {
            let message = ["returnMsg", "message"]
                .iter()
                .find_map(|k| value.get(k).and_then(Value::as_str))
                .unwrap_or("Request failed");
            return Err(SdkError::Backend(message.to_string()));
        }
    }
    Ok(serde_json::from_value(value)?)
}
