//! HTTP access to the shop API.
//!
//! `ApiClient` keeps a cookie store, so the credential the server sets on login
//! rides along on every later request without this crate ever touching it.
//! Bodies are decoded into [`Envelope`]; non-success statuses become
//! [`AppError`]s carrying the server's `message` when it sent one.

mod envelope;
pub mod models;
pub mod shop;

pub use envelope::Envelope;
pub use models::{Cart, CartItem, Order, OrderItem, OrderStatus, Payment, Product, ProductForm, ShipmentLog, VerifyPayment};

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult, SERVER_CODE};
use crate::identity::{AuthBackend, Credentials, Identity};
use crate::pagination::{Page, PageSource};
use envelope::ErrorBody;

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> AppResult<Self> {
        let base = Url::parse(config.base_url.trim())
            .map_err(|e| AppError::user("invalid_base_url", format!("invalid API URL '{}': {}", config.base_url, e)))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { base, client, config })
    }

    pub fn base(&self) -> &Url { &self.base }

    pub fn config(&self) -> &ClientConfig { &self.config }

    /// Endpoint path appended to the base URL's own path (`/api` + `/orders`).
    pub fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| AppError::user("invalid_path", format!("invalid endpoint '{}': {}", path, e)))
    }

    /// Resolve a server-issued cursor. Absolute cursors come back unchanged;
    /// relative ones resolve against the base like any link reference.
    pub fn resolve_cursor(&self, cursor: &str) -> AppResult<Url> {
        self.base
            .join(cursor.trim())
            .map_err(|e| AppError::decode("invalid_cursor", format!("invalid next page URL '{}': {}", cursor, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<Envelope<T>> {
        let url = self.endpoint(path)?;
        self.execute("GET", url.clone(), self.client.get(url)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> AppResult<Envelope<T>> {
        let url = self.endpoint(path)?;
        let mut req = self.client.post(url.clone());
        if let Some(b) = body {
            req = req.json(b);
        }
        self.execute("POST", url, req).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> AppResult<Envelope<T>> {
        let url = self.endpoint(path)?;
        let mut req = self.client.put(url.clone());
        if let Some(b) = body {
            req = req.json(b);
        }
        self.execute("PUT", url, req).await
    }

    /// Multipart upload of one file under `field`.
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, field: &str, file: &Path) -> AppResult<Envelope<T>> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| AppError::user("file_unreadable", format!("cannot read {}: {}", file.display(), e)))?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let part = Part::bytes(bytes).file_name(name).mime_str(mime_for(file))?;
        let url = self.endpoint(path)?;
        let req = self.client.post(url.clone()).multipart(Form::new().part(field.to_string(), part));
        self.execute("POST", url, req).await
    }

    async fn execute<T: DeserializeOwned>(&self, method: &'static str, url: Url, req: RequestBuilder) -> AppResult<Envelope<T>> {
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "api", method, url = %url, error = %e, "request failed to send");
                return Err(e.into());
            }
        };
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body).ok().and_then(|b| b.message);
            let err = AppError::from_status(status.as_u16(), message);
            debug!(target: "api", method, url = %url, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }
        let env: Envelope<T> = if body.iter().all(|b| b.is_ascii_whitespace()) {
            Envelope::empty()
        } else {
            serde_json::from_slice(&body)?
        };
        if env.success == Some(false) {
            let err = match env.message {
                Some(m) => AppError::remote(SERVER_CODE, m),
                None => AppError::remote("request_failed", format!("{} {} reported failure", method, url.path())),
            };
            debug!(target: "api", method, url = %url, error = %err, "request reported failure");
            return Err(err);
        }
        debug!(target: "api", method, url = %url, status = status.as_u16(), "ok");
        Ok(env)
    }

    async fn fetch_listing<T: DeserializeOwned>(&self, url: Url) -> AppResult<Page<T>> {
        let env: Envelope<Vec<T>> = self.execute("GET", url.clone(), self.client.get(url)).await?;
        Ok(env.into_page())
    }
}

fn mime_for(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn whoami(&self) -> AppResult<Identity> {
        let path = self.config.identity_path.clone();
        let env: Envelope<Identity> = self.get(&path).await?;
        env.data.ok_or_else(|| AppError::decode("identity_missing", "identity response carried no data"))
    }

    async fn authenticate(&self, credentials: &Credentials) -> AppResult<()> {
        let path = self.config.login_path.clone();
        let _: Envelope<serde_json::Value> = self.post(&path, Some(credentials)).await?;
        Ok(())
    }

    async fn invalidate(&self) -> AppResult<()> {
        let path = self.config.logout_path.clone();
        let _: Envelope<serde_json::Value> = self.post::<(), _>(&path, None).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send + 'static> PageSource<T> for ApiClient {
    async fn fetch_first(&self, path: &str) -> AppResult<Page<T>> {
        let url = self.endpoint(path)?;
        self.fetch_listing(url).await
    }

    async fn fetch_page(&self, cursor: &str) -> AppResult<Page<T>> {
        let url = self.resolve_cursor(cursor)?;
        self.fetch_listing(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient { ApiClient::new(ClientConfig::new(base)).unwrap() }

    #[test]
    fn endpoints_keep_base_path() {
        let c = client("http://127.0.0.1:8000/api");
        assert_eq!(c.endpoint("/orders").unwrap().as_str(), "http://127.0.0.1:8000/api/orders");
        assert_eq!(c.endpoint("shipment/4/logs").unwrap().as_str(), "http://127.0.0.1:8000/api/shipment/4/logs");

        let c = client("http://127.0.0.1:8000/");
        assert_eq!(c.endpoint("/me").unwrap().as_str(), "http://127.0.0.1:8000/me");
    }

    #[test]
    fn cursors_are_followed_verbatim() {
        let c = client("http://127.0.0.1:8000/api");
        let abs = "http://cdn.example.test/api/orders?page=2&per_page=10";
        assert_eq!(c.resolve_cursor(abs).unwrap().as_str(), abs);
        assert_eq!(c.resolve_cursor("/api/orders?page=3").unwrap().as_str(), "http://127.0.0.1:8000/api/orders?page=3");
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = ApiClient::new(ClientConfig::new("not a url")).err().unwrap();
        assert_eq!(err.code_str(), "invalid_base_url");
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_for(Path::new("proof.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("stock.xlsx")), "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
        assert_eq!(mime_for(Path::new("blob")), "application/octet-stream");
    }
}
