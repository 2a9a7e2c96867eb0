//! Thin transport over the REST surface: one cookie-holding `reqwest`
//! client, envelope decoding, and multipart assembly.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ut_core::models::Upload;

use crate::error::{ClientError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A connection to one UniTrade server. The session cookie set by login or
/// register is kept in the client's cookie store and sent on every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| ClientError::BaseUrl(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::BaseUrl(format!("{path}: {e}")))?;
        Ok(self.http.request(method, url))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(%status, bytes = body.len(), "response received");
        decode(status, &body)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(self.request(Method::GET, path)?).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.request(Method::GET, path)?.query(query)).await
    }

    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.request(method, path)?.json(body)).await
    }

    /// A request without a body (logout, wishlist mutations, deletes).
    pub async fn send_empty<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T> {
        self.execute(self.request(method, path)?).await
    }

    pub async fn send_form<T: DeserializeOwned>(&self, method: Method, path: &str, form: Form) -> Result<T> {
        self.execute(self.request(method, path)?.multipart(form)).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct Failure {
    message: Option<String>,
    field: Option<String>,
}

/// Unwraps the `{success, message?, ...payload}` envelope into `T`.
pub(crate) fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ClientError::Api {
                status,
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
                field: None,
            });
        }
        Err(err) => return Err(ClientError::Decode(err.to_string())),
    };

    let succeeded = value.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !status.is_success() || !succeeded {
        let failure: Failure = serde_json::from_value(value).unwrap_or_default();
        return Err(ClientError::Api {
            status,
            message: failure
                .message
                .unwrap_or_else(|| format!("request failed with status {status}")),
            field: failure.field,
        });
    }

    serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
}

/// Multipart body builder. Absent text fields are skipped rather than sent
/// empty, so a partial update leaves them untouched.
pub struct FormBuilder {
    form: Form,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self { form: Form::new() }
    }

    pub fn text(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.form = self.form.text(name.to_string(), value);
        }
        self
    }

    pub fn texts(mut self, name: &str, values: &[String]) -> Self {
        for value in values {
            self.form = self.form.text(name.to_string(), value.clone());
        }
        self
    }

    pub fn file(mut self, name: &str, upload: Upload) -> Result<Self> {
        let filename = upload.filename.unwrap_or_else(|| "upload".to_string());
        let part = Part::bytes(upload.data)
            .file_name(filename)
            .mime_str(&upload.content_type)?;
        self.form = self.form.part(name.to_string(), part);
        Ok(self)
    }

    pub fn files(self, name: &str, uploads: Vec<Upload>) -> Result<Self> {
        uploads.into_iter().try_fold(self, |builder, upload| builder.file(name, upload))
    }

    pub fn build(self) -> Form {
        self.form
    }
}
