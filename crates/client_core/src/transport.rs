//! Thin reqwest wrapper shared by the admin data provider, the public API and
//! the submission transports. Every non-2xx response is turned into a
//! [`ClientError`] here so callers never inspect status codes themselves.

use reqwest::{multipart::Form, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::protocol::{parse_content_range_total, ListPage};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, ClientResult},
};

#[derive(Clone)]
pub struct ApiHttp {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiHttp {
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url()?,
            token: settings.admin_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid request path '{path}': {e}")))
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let url = self.url(path)?;
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await.map_err(|err| {
            warn!(%method, path, error = %err, "request did not complete");
            ClientError::from(err)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(%method, path, status = status.as_u16(), "request ok");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%method, path, status = status.as_u16(), "request rejected by server");
        Err(ClientError::from_response(status.as_u16(), &body))
    }

    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.send(Method::GET, path, request).await?;
        Ok(response.json().await?)
    }

    /// GET a list endpoint. The total comes from `Content-Range`, then
    /// `X-Total-Count`, then the row count.
    pub async fn get_page<T, Q>(&self, path: &str, query: &Q) -> ClientResult<ListPage<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.send(Method::GET, path, request).await?;
        let headers = response.headers();
        let total = headers
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .or_else(|| {
                headers
                    .get("x-total-count")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
            });
        let data: Vec<T> = response.json().await?;
        let total = total.unwrap_or(data.len() as u64);
        Ok(ListPage { data, total })
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body);
        let response = self.send(Method::POST, path, request).await?;
        Ok(response.json().await?)
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path)?.json(body);
        let response = self.send(Method::PUT, path, request).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_json<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::DELETE, path)?.query(query);
        let response = self.send(Method::DELETE, path, request).await?;
        Ok(response.json().await?)
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> ClientResult<T> {
        let request = self.request(Method::POST, path)?.multipart(form);
        let response = self.send(Method::POST, path, request).await?;
        Ok(response.json().await?)
    }
}
