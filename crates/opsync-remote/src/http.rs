//! ---
//! opsync_section: "03-remote-service"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Shared HTTP transport and URL construction."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{EndpointError, FetchError, Resource};

const USER_AGENT: &str = concat!("opsyncd/", env!("CARGO_PKG_VERSION"));

/// Base URL of the control service plus the HTTP client used to reach it.
///
/// Cloning is cheap; both remote clients share one connection pool.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    client: Client,
    base: Url,
}

impl ServiceEndpoint {
    pub fn new(base: Url) -> Result<Self, EndpointError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(EndpointError::Client)?;
        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: Url) -> Result<Self, EndpointError> {
        if base.cannot_be_a_base() {
            return Err(EndpointError::InvalidBase(base));
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Append path segments to the base URL, percent-encoding each one.
    pub fn url<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        // Checked in `with_client`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issue a GET that must answer 200 and decode the body.
    ///
    /// An empty body or a JSON `null` decodes to `T::default()`.
    pub(crate) async fn get_json<T>(
        &self,
        resource: Resource,
        cluster: &str,
        url: Url,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Default,
    {
        debug!(%resource, cluster, %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                resource,
                cluster: cluster.to_string(),
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::UnexpectedStatus {
                resource,
                cluster: cluster.to_string(),
                url,
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Body {
            resource,
            cluster: cluster.to_string(),
            url: url.clone(),
            source,
        })?;

        decode_body(&body).map_err(|source| FetchError::Decode {
            resource,
            cluster: cluster.to_string(),
            url,
            source,
        })
    }
}

pub(crate) fn decode_body<T>(body: &[u8]) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsync_store::ConfigurationDelta;

    fn endpoint(base: &str) -> ServiceEndpoint {
        ServiceEndpoint::new(base.parse().unwrap()).unwrap()
    }

    #[test]
    fn appends_segments_to_bare_host() {
        let url = endpoint("http://localhost:8080").url(["api", "v1", "operator"]);
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/operator");
    }

    #[test]
    fn keeps_base_path_prefix() {
        let url = endpoint("https://gw.example/control/").url(["api", "v1"]);
        assert_eq!(url.as_str(), "https://gw.example/control/api/v1");
    }

    #[test]
    fn encodes_cluster_as_single_segment() {
        let url = endpoint("http://localhost").url(["triggers", "team a/b?x"]);
        assert_eq!(url.path(), "/triggers/team%20a%2Fb%3Fx");
    }

    #[test]
    fn rejects_non_hierarchical_base() {
        let err = ServiceEndpoint::new("mailto:ops@example.com".parse().unwrap()).unwrap_err();
        assert!(matches!(err, EndpointError::InvalidBase(_)));
    }

    #[test]
    fn empty_and_null_bodies_decode_to_default() {
        assert!(decode_body::<ConfigurationDelta>(b"").unwrap().is_empty());
        assert!(decode_body::<ConfigurationDelta>(b"  \n").unwrap().is_empty());
        assert!(decode_body::<ConfigurationDelta>(b"null").unwrap().is_empty());
        assert!(decode_body::<Vec<i64>>(b"null").unwrap().is_empty());
    }

    #[test]
    fn non_object_body_is_an_error() {
        assert!(decode_body::<ConfigurationDelta>(b"[1,2]").is_err());
        assert!(decode_body::<ConfigurationDelta>(b"{\"a\":").is_err());
    }
}
