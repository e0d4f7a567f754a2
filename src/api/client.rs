use async_trait::async_trait;
use reqwest::{Client, Method, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};

use super::{
    SnapshotApi,
    error::{ApiError, ApiResult},
    types::{Action, ActionResponse, ResourceType, Snapshot, SnapshotActionRequest, SnapshotList},
};
use crate::config::ApiConfig;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.digitalocean.com/v2/";

/// Client for the DigitalOcean v2 API.
///
/// # Example
/// ```ignore
/// let client = DigitalOceanClient::new(&config.api)?;
///
/// let action = client
///     .create_droplet_snapshot("123123123", "auto-123123123-20240101-000000")
///     .await?;
/// let snapshots = client.list_snapshots(ResourceType::Droplet).await?;
/// client.delete_snapshot(&snapshots[0].id).await?;
/// ```
#[derive(Clone)]
pub struct DigitalOceanClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for DigitalOceanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl DigitalOceanClient {
    /// Create a client from the `[api]` configuration section.
    ///
    /// Both the connect timeout and the overall request timeout are finite.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .user_agent(concat!("droplet-rotator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = config.base_url.clone();
        // Remove trailing slash
        if base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            http_client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Send one request and return the raw body of a 2xx response.
    ///
    /// With a body the request is a POST, without one a GET, unless
    /// `method_override` says otherwise.
    async fn request<B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: Option<&B>,
        method_override: Option<Method>,
    ) -> ApiResult<bytes::Bytes> {
        let url = format!("{}/{}", self.base_url, resource.trim_start_matches('/'));
        let method = method_override.unwrap_or(if body.is_some() {
            Method::POST
        } else {
            Method::GET
        });

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, url = %url, "Sending DigitalOcean API request");

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            tracing::debug!(
                method = %method,
                url = %url,
                status = %status,
                "DigitalOcean API request failed"
            );
            return Err(ApiError::from_response(status, &bytes));
        }

        Ok(bytes)
    }
}

/// Reject ids that would not stay a single URL path segment.
fn check_path_segment(what: &str, value: &str) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::InvalidArgument(format!("{what} must not be empty")));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(ApiError::InvalidArgument(format!(
            "{what} contains invalid characters: '{value}'"
        )));
    }
    Ok(())
}

/// Decode a body that must be present.
fn decode<T: DeserializeOwned>(context: &'static str, bytes: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(bytes).map_err(|source| ApiError::Decode { context, source })
}

/// Decode a body where an empty or `null` response means "nothing".
fn decode_or_default<T: DeserializeOwned + Default>(
    context: &'static str,
    bytes: &[u8],
) -> ApiResult<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Option<T> = decode(context, bytes)?;
    Ok(value.unwrap_or_default())
}

#[async_trait]
impl SnapshotApi for DigitalOceanClient {
    async fn create_droplet_snapshot(&self, droplet_id: &str, name: &str) -> ApiResult<Action> {
        check_path_segment("droplet id", droplet_id)?;
        if name.is_empty() {
            return Err(ApiError::InvalidArgument(
                "snapshot name must not be empty".into(),
            ));
        }

        let body = SnapshotActionRequest {
            kind: "snapshot",
            name,
        };

        let bytes = self
            .request(&format!("droplets/{droplet_id}/actions"), Some(&body), None)
            .await?;
        let response: ActionResponse = decode("droplet action", &bytes)?;

        Ok(response.action)
    }

    async fn list_snapshots(&self, resource_type: ResourceType) -> ApiResult<Vec<Snapshot>> {
        let bytes = self
            .request(
                &format!("snapshots?resource_type={resource_type}"),
                None::<&()>,
                None,
            )
            .await?;
        let list: SnapshotList = decode_or_default("snapshot list", &bytes)?;

        Ok(list.into_snapshots())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> ApiResult<()> {
        check_path_segment("snapshot id", snapshot_id)?;

        self.request(
            &format!("snapshots/{snapshot_id}"),
            None::<&()>,
            Some(Method::DELETE),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use rstest::rstest;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{bearer_token, body_json, header, method, path, query_param},
    };

    use super::*;

    fn test_config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            token: "test-token".to_string(),
            connect_timeout_secs: 2,
            timeout_secs: 5,
        }
    }

    fn client_for(server: &MockServer) -> DigitalOceanClient {
        DigitalOceanClient::new(&test_config(&server.uri())).unwrap()
    }

    #[test]
    fn test_client_creation_trims_trailing_slash() {
        let client = DigitalOceanClient::new(&test_config(DEFAULT_BASE_URL)).unwrap();
        assert_eq!(client.base_url, "https://api.digitalocean.com/v2");

        let client = DigitalOceanClient::new(&test_config("http://localhost:8080")).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = DigitalOceanClient::new(&test_config(DEFAULT_BASE_URL)).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("test-token"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_create_droplet_snapshot_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/droplets/123123123/actions"))
            .and(bearer_token("test-token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "type": "snapshot",
                "name": "auto-123123123-20240101-000000"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "action": {
                    "id": 36805022,
                    "status": "in-progress",
                    "type": "snapshot",
                    "started_at": "2024-01-01T00:00:01Z",
                    "resource_id": 123123123,
                    "resource_type": "droplet"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let action = client
            .create_droplet_snapshot("123123123", "auto-123123123-20240101-000000")
            .await
            .unwrap();

        assert_eq!(action.id, 36805022);
        assert_eq!(action.status, "in-progress");
        assert_eq!(action.kind, "snapshot");
        assert!(action.started_at.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_arguments_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_droplet_snapshot("", "name").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = client.create_droplet_snapshot("1", "").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_ids_outside_one_path_segment_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .create_droplet_snapshot("1/../../account", "auto-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)), "{err:?}");

        let err = client.delete_snapshot("1?force=true").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)), "{err:?}");

        // Volume snapshot ids are UUIDs.
        assert!(check_path_segment("snapshot id", "fbe805e8-866b-11e6-96bf-000f53315a41").is_ok());
    }

    #[tokio::test]
    async fn test_create_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/droplets/1/actions"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "id": "unprocessable_entity",
                "message": "Droplet already has a pending event."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_droplet_snapshot("1", "auto-1").await.unwrap_err();

        match err {
            ApiError::Status {
                status,
                id,
                message,
            } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(id.as_deref(), Some("unprocessable_entity"));
                assert_eq!(message, "Droplet already has a pending event.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_snapshots_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .and(query_param("resource_type", "droplet"))
            .and(bearer_token("test-token"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "snapshots": [
                    {
                        "id": "1",
                        "resource_id": "123123123",
                        "name": "auto-123123123-20240101-000000",
                        "created_at": "2024-01-01T00:00:00Z"
                    },
                    {
                        "id": "2",
                        "resource_id": "999",
                        "name": "other",
                        "created_at": "2024-01-02T00:00:00Z"
                    }
                ],
                "meta": {"total": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let snapshots = client.list_snapshots(ResourceType::Droplet).await.unwrap();

        let ids: Vec<_> = snapshots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_list_snapshots_empty_body_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_snapshots(ResourceType::Droplet).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_snapshots_missing_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": {}})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_snapshots(ResourceType::Droplet).await.unwrap().is_empty());
    }

    #[rstest]
    #[case::null_body("null")]
    #[case::null_field(r#"{"snapshots": null, "links": {}}"#)]
    #[tokio::test]
    async fn test_list_snapshots_null_is_empty(#[case] body: &str) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.list_snapshots(ResourceType::Droplet).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_snapshots_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_snapshots(ResourceType::Droplet).await.unwrap_err();
        assert!(
            matches!(err, ApiError::Decode { context: "snapshot list", .. }),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_list_snapshots_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "id": "unauthorized",
                "message": "Unable to authenticate you."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_snapshots(ResourceType::Droplet).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_delete_snapshot_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/snapshots/6372321"))
            .and(bearer_token("test-token"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_snapshot("6372321").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_delete_snapshot_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/snapshots/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "id": "not_found",
                "message": "The resource you were accessing could not be found."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.delete_snapshot("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transport_failure_is_request_error() {
        // Nothing listens on port 1.
        let client = DigitalOceanClient::new(&test_config("http://127.0.0.1:1")).unwrap();
        let err = client.list_snapshots(ResourceType::Droplet).await.unwrap_err();
        assert!(matches!(err, ApiError::Request(_)), "unexpected error: {err:?}");
    }
}
