//! REST transport for resource collections.
//!
//! Routes, relative to the configured base URL:
//!
//! | operation | request                      |
//! |-----------|------------------------------|
//! | list      | `GET /{domain}/?params`      |
//! | detail    | `GET /{domain}/{id}/`        |
//! | by_slug   | `GET /{domain}/slug/{slug}/` |
//! | create    | `POST /{domain}/`            |
//! | update    | `PATCH /{domain}/{id}/`      |
//! | delete    | `DELETE /{domain}/{id}/`     |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheError, FieldErrors, QueryParams};
use crate::domain::Domain;

use super::error::InfraError;

/// Source of the bearer token attached to every request.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A token fixed at startup, typically from configuration.
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticToken {
    fn from(token: Option<String>) -> Self {
        Self(token.filter(|token| !token.trim().is_empty()))
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.0.is_some() { "<redacted>" } else { "<none>" };
        f.debug_tuple("StaticToken").field(&shown).finish()
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Clone)]
pub struct ResourceClient {
    client: Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ResourceClient {
    pub fn new(
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let base = Url::parse(base_url)
            .map_err(|err| InfraError::configuration(format!("invalid api.base_url: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "api.base_url `{base_url}` cannot carry a path"
            )));
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base,
            tokens,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    pub async fn list(&self, domain: Domain, params: &QueryParams) -> Result<Value, CacheError> {
        let mut url = self.url(domain, &[])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.to_query_pairs());
        }
        self.send(Method::GET, url, None).await
    }

    pub async fn detail(&self, domain: Domain, id: &str) -> Result<Value, CacheError> {
        let url = self.url(domain, &[id])?;
        self.send(Method::GET, url, None).await
    }

    pub async fn by_slug(&self, domain: Domain, slug: &str) -> Result<Value, CacheError> {
        let url = self.url(domain, &["slug", slug])?;
        self.send(Method::GET, url, None).await
    }

    pub async fn create(&self, domain: Domain, body: &Value) -> Result<Value, CacheError> {
        let url = self.url(domain, &[])?;
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn update(&self, domain: Domain, id: &str, body: &Value) -> Result<Value, CacheError> {
        let url = self.url(domain, &[id])?;
        self.send(Method::PATCH, url, Some(body)).await
    }

    pub async fn delete(&self, domain: Domain, id: &str) -> Result<Value, CacheError> {
        let url = self.url(domain, &[id])?;
        self.send(Method::DELETE, url, None).await
    }

    /// `{base}/{domain}/{tail...}/`, with each segment percent-encoded.
    fn url(&self, domain: Domain, tail: &[&str]) -> Result<Url, CacheError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CacheError::network(format!("base URL {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .push(domain.as_str())
            .extend(tail)
            .push("");
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value, CacheError> {
        debug!(%method, %url, "API request");
        let mut request = self.client.request(method, url);
        if let Some(token) = self.tokens.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        Self::handle(response).await
    }

    async fn handle(response: Response) -> Result<Value, CacheError> {
        let status = response.status();
        let path = response.url().path().to_string();
        let bytes = response.bytes().await.map_err(transport_error)?;
        debug!(%status, %path, len = bytes.len(), "API response");

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|err| CacheError::network(format!("malformed response body from {path}: {err}")));
        }

        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Err(status_error(status, &path, &body))
    }
}

fn transport_error(err: reqwest::Error) -> CacheError {
    if err.is_timeout() {
        CacheError::network(format!("request timed out: {err}"))
    } else {
        CacheError::network(err.to_string())
    }
}

fn status_error(status: StatusCode, path: &str, body: &Value) -> CacheError {
    let message = body_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CacheError::unauthenticated(
            message.unwrap_or_else(|| format!("{status} for {path}")),
        ),
        StatusCode::NOT_FOUND => CacheError::not_found(message.unwrap_or_else(|| path.to_string())),
        status if status.is_client_error() => CacheError::validation(
            status.as_u16(),
            message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request rejected")
                    .to_string()
            }),
            field_errors(body),
        ),
        status => CacheError::network(message.map_or_else(
            || format!("server responded {status} for {path}"),
            |message| format!("server responded {status} for {path}: {message}"),
        )),
    }
}

const MESSAGE_FIELDS: &[&str] = &["message", "detail", "error"];

fn body_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    MESSAGE_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Field messages from `{errors: {field: [msg]}}` or a bare `{field: [msg]}`.
fn field_errors(body: &Value) -> FieldErrors {
    let Some(object) = body.as_object() else {
        return FieldErrors::new();
    };
    let source = object
        .get("errors")
        .and_then(Value::as_object)
        .unwrap_or(object);

    source
        .iter()
        .filter(|(field, _)| !MESSAGE_FIELDS.contains(&field.as_str()))
        .filter_map(|(field, messages)| {
            let messages: Vec<String> = match messages {
                Value::String(message) => vec![message.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => return None,
            };
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer, token: StaticToken) -> ResourceClient {
        ResourceClient::new(&server.base_url(), Arc::new(token), Duration::from_secs(5))
            .expect("client")
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let err = ResourceClient::new(
            "mailto:someone@example.com",
            Arc::new(StaticToken::anonymous()),
            Duration::from_secs(1),
        )
        .err()
        .expect("mailto cannot be a base");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[tokio::test]
    async fn list_sends_params_and_token() -> Result<(), CacheError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/categories/")
                .query_param("page", "2")
                .query_param("search", "sea")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(json!({"data": [], "meta": {"total": 0}}));
        });

        let params = QueryParams::new().with("page", 2_u64).with("search", "sea");
        let body = client(&server, StaticToken::new("secret"))
            .list(Domain::Categories, &params)
            .await?;
        mock.assert();
        assert_eq!(body["meta"]["total"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn base_path_and_slug_route_are_preserved() -> Result<(), CacheError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v2/articles/slug/hello-world/");
            then.status(200).json_body(json!({"id": 1, "title": "Hello"}));
        });

        let client = ResourceClient::new(
            &server.url("/api/v2"),
            Arc::new(StaticToken::anonymous()),
            Duration::from_secs(5),
        )
        .expect("client");
        client.by_slug(Domain::Articles, "hello-world").await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn writes_use_rest_verbs() -> Result<(), CacheError> {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/collections/")
                .json_body(json!({"name": "Climate Tech"}));
            then.status(201).json_body(json!({"id": 5, "name": "Climate Tech"}));
        });
        let update = server.mock(|when, then| {
            when.method(PATCH).path("/collections/5/");
            then.status(200).json_body(json!({"id": 5, "name": "Climate"}));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/collections/5/");
            then.status(204);
        });

        let client = client(&server, StaticToken::anonymous());
        client
            .create(Domain::Collections, &json!({"name": "Climate Tech"}))
            .await?;
        client
            .update(Domain::Collections, "5", &json!({"name": "Climate"}))
            .await?;
        let deleted = client.delete(Domain::Collections, "5").await?;

        create.assert();
        update.assert();
        delete.assert();
        assert_eq!(deleted, Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn statuses_map_to_error_kinds() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/articles/1/");
            then.status(401).json_body(json!({"detail": "token expired"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/articles/2/");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/articles/3/");
            then.status(503).body("upstream down");
        });
        let client = client(&server, StaticToken::anonymous());

        assert_eq!(
            client.detail(Domain::Articles, "1").await,
            Err(CacheError::unauthenticated("token expired"))
        );
        assert!(matches!(
            client.detail(Domain::Articles, "2").await,
            Err(CacheError::NotFound { .. })
        ));
        assert!(matches!(
            client.detail(Domain::Articles, "3").await,
            Err(CacheError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn validation_errors_carry_field_messages() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/categories/");
            then.status(422).json_body(json!({
                "message": "invalid category",
                "errors": {"name": ["is required"], "slug": "taken"}
            }));
        });
        server.mock(|when, then| {
            when.method(PATCH).path("/categories/9/");
            then.status(400).json_body(json!({"name": ["This field may not be blank."]}));
        });
        let client = client(&server, StaticToken::anonymous());

        let Err(CacheError::Validation { status, message, fields }) =
            client.create(Domain::Categories, &json!({})).await
        else {
            panic!("expected validation error");
        };
        assert_eq!(status, 422);
        assert_eq!(message, "invalid category");
        assert_eq!(fields["name"], vec!["is required".to_string()]);
        assert_eq!(fields["slug"], vec!["taken".to_string()]);

        let Err(CacheError::Validation { status, message, fields }) = client
            .update(Domain::Categories, "9", &json!({"name": ""}))
            .await
        else {
            panic!("expected validation error");
        };
        assert_eq!(status, 400);
        assert_eq!(message, "Bad Request");
        assert_eq!(fields["name"], vec!["This field may not be blank.".to_string()]);
    }

    #[test]
    fn static_token_ignores_blank_values() {
        assert_eq!(StaticToken::from(Some("  ".to_string())).token(), None);
        assert_eq!(StaticToken::from(Some("t".to_string())).token(), Some("t".to_string()));
        assert_eq!(format!("{:?}", StaticToken::new("t")), "StaticToken(\"<redacted>\")");
    }
}
