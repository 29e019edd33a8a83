// Async HTTP client for the NetBox REST API.
//
// Base path: {url}/api/
// Auth: `Authorization: Token <key>` header

use std::future::Future;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::Page;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Read-only async client for a NetBox inventory.
///
/// Every request carries the API token as a default header. List
/// endpoints are paginated transparently by [`paginate_all`](Self::paginate_all).
pub struct NetboxClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
}

impl NetboxClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a token and transport config.
    ///
    /// `base_url` is the NetBox root (e.g. `https://netbox.example.org`);
    /// `/api/` is appended if not already present.
    pub fn from_token(
        base_url: &str,
        token: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size used by list endpoints.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The normalized API root (always ends with `/api/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }

        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"dcim/devices/"`) onto the API root.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    /// Fetch a single object, mapping 404 to [`Error::NotFound`].
    pub(crate) async fn get_object<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        path: &str,
        id: u64,
    ) -> Result<T, Error> {
        match self.get(path).await {
            Err(e) if e.is_not_found() => Err(Error::NotFound { resource, id }),
            other => other,
        }
    }

    /// Fetch every page of a list endpoint with the given filters.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        self.paginate_all(self.page_size, |offset, limit| async move {
            let mut query: Vec<(&str, String)> = params.to_vec();
            query.push(("offset", offset.to_string()));
            query.push(("limit", limit.to_string()));
            self.get_with_params::<Page<T>>(path, &query).await
        })
        .await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.detail);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: detail.unwrap_or_else(|| status.to_string()),
            };
        }

        Error::Api {
            status: status.as_u16(),
            message: match detail {
                Some(d) => d,
                None if raw.is_empty() => status.to_string(),
                None => raw,
            },
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages into a single `Vec<T>`.
    pub async fn paginate_all<T, F, Fut>(&self, limit: u32, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(u64, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        let mut all = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let page = fetch(offset, limit).await?;
            let received = page.results.len();
            all.extend(page.results);

            let limit_usize = usize::try_from(limit).unwrap_or(usize::MAX);
            if received == 0
                || received < limit_usize
                || u64::try_from(all.len()).unwrap_or(u64::MAX) >= page.count
            {
                break;
            }

            offset += u64::try_from(received).unwrap_or(u64::MAX);
        }

        Ok(all)
    }
}
