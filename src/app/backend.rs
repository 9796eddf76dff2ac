use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{request::Parts, HeaderMap, HeaderValue, StatusCode};
use lazy_static::lazy_static;
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::archives::{Link, LinkID};
use super::collections::{Collection, CollectionID, PublicUser, UserRef};

lazy_static! {
    static ref BACKEND_ENDPOINT: String = std::env::var("LINKSHELF_API_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
}

#[derive(Debug, thiserror::Error)]
pub enum ApiErr {
    #[error("reqwest error: {0}")]
    Reqwest(reqwest::Error),
    #[error("json parse error: {0}")]
    Json(serde_json::Error),
    /// The backend refused and said why; shown to the user verbatim.
    #[error("{0}")]
    Backend(String),
    #[error("not found")]
    NotFound,
    #[error("invalid backend url: {0}")]
    Endpoint(String),
}

pub type ApiResult<T> = Result<T, ApiErr>;

/// Every JSON reply from the backend is wrapped in `{ "response": ... }`.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    response: T,
}

/// Unwraps a successful reply.
fn unwrap_envelope<T>(body: &str) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(ApiErr::Json)?;
    Ok(envelope.response)
}

/// Maps a non-2xx reply. A `{ "response": "..." }` body is the backend's own
/// message and wins over the status.
fn refusal(status: StatusCode, body: &str) -> ApiErr {
    match serde_json::from_str::<Envelope<String>>(body) {
        Ok(envelope) => ApiErr::Backend(envelope.response),
        Err(_) if status == StatusCode::NOT_FOUND => ApiErr::NotFound,
        Err(_) => ApiErr::Backend(format!("backend returned {status}")),
    }
}

/// Address of the public profile lookup. The user becomes a single escaped
/// path segment.
fn public_user_url(endpoint: &str, user: &UserRef) -> ApiResult<Url> {
    let segment = user.to_string();
    if matches!(segment.trim(), "" | "." | "..") {
        return Err(ApiErr::NotFound);
    }

    let mut url = Url::parse(endpoint).map_err(|err| ApiErr::Endpoint(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ApiErr::Endpoint(endpoint.to_string()))?
        .pop_if_empty()
        .extend(["api", "v1", "public", "users", segment.as_str()]);

    Ok(url)
}

#[derive(Debug, Deserialize)]
struct Session {
    user: Option<PublicUser>,
}

/// Headers of the incoming page request that identify the caller.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    cookie: Option<HeaderValue>,
    authorization: Option<HeaderValue>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            cookie: headers.get(COOKIE).cloned(),
            authorization: headers.get(AUTHORIZATION).cloned(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_headers(&parts.headers)
    }

    fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.clone());
        }
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.clone());
        }
        request
    }
}

/// A binary body relayed from the backend.
#[derive(Debug)]
pub struct Asset {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[derive(Debug)]
pub struct BackendClient {
    endpoint: String,
    http: Client,
}

impl Default for BackendClient {
    fn default() -> Self {
        Self::new(
            BACKEND_ENDPOINT.as_str(),
            env!("CARGO_PKG_NAME"),
            Some(env!("CARGO_PKG_VERSION")),
        )
    }
}

impl BackendClient {
    pub fn new(endpoint: &str, name: &str, version: Option<&str>) -> Self {
        let mut user_agent = name.to_string();

        if let Some(version) = version {
            user_agent.push('/');
            user_agent.push_str(version);
        }

        let http = ClientBuilder::default()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "falling back to a default http client");
                Client::new()
            });

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str, credentials: &Credentials) -> RequestBuilder {
        credentials.apply(self.http.request(method, format!("{}{path}", self.endpoint)))
    }

    async fn send_json<T>(&self, request: RequestBuilder) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(ApiErr::Reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiErr::Reqwest)?;

        if status.is_success() {
            return unwrap_envelope(&body);
        }

        tracing::debug!(%status, "backend refused request");
        Err(refusal(status, &body))
    }

    pub async fn get_collection(
        &self,
        id: CollectionID,
        credentials: &Credentials,
    ) -> ApiResult<Collection> {
        let request = self.request(Method::GET, &format!("/api/v1/collections/{id}"), credentials);
        self.send_json(request).await
    }

    pub async fn create_collection(
        &self,
        collection: &Collection,
        credentials: &Credentials,
    ) -> ApiResult<Collection> {
        let body = serde_json::to_string(collection).map_err(ApiErr::Json)?;
        let request = self
            .request(Method::POST, "/api/v1/collections", credentials)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        self.send_json(request).await
    }

    pub async fn update_collection(
        &self,
        collection: &Collection,
        credentials: &Credentials,
    ) -> ApiResult<Collection> {
        let id = collection
            .id
            .ok_or_else(|| ApiErr::Backend("Collection has no id.".to_string()))?;
        let body = serde_json::to_string(collection).map_err(ApiErr::Json)?;
        let request = self
            .request(Method::PUT, &format!("/api/v1/collections/{id}"), credentials)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        self.send_json(request).await
    }

    pub async fn get_public_user(
        &self,
        user: &UserRef,
        credentials: &Credentials,
    ) -> ApiResult<PublicUser> {
        let url = public_user_url(&self.endpoint, user)?;
        let request = credentials.apply(self.http.get(url));
        self.send_json(request).await
    }

    pub async fn get_session_user(&self, credentials: &Credentials) -> ApiResult<Option<PublicUser>> {
        let response = self
            .request(Method::GET, "/api/v1/auth/session", credentials)
            .send()
            .await
            .map_err(ApiErr::Reqwest)?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body = response.text().await.map_err(ApiErr::Reqwest)?;
        let session: Session = serde_json::from_str(&body).map_err(ApiErr::Json)?;

        Ok(session.user)
    }

    pub async fn get_link(&self, id: LinkID, credentials: &Credentials) -> ApiResult<Link> {
        let request = self.request(Method::GET, &format!("/api/v1/links/{id}"), credentials);
        self.send_json(request).await
    }

    /// Relays a binary resource, whatever status the backend answers with.
    pub async fn download_file(&self, path: &str, credentials: &Credentials) -> ApiResult<Asset> {
        let response = self
            .request(Method::GET, path, credentials)
            .send()
            .await
            .map_err(ApiErr::Reqwest)?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(ApiErr::Reqwest)?;

        Ok(Asset {
            status,
            content_type,
            body,
        })
    }
}
