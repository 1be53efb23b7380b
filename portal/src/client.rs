// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::types::{
    EditFrame, SearchResponse, UploadCredentials, UploadResponse,
};

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("invalid portal url: {0}")]
    Url(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status} {reason}\n{body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Authenticated client for the metadata portal.
///
/// Credentials are an access key id / secret pair sent as HTTP basic auth,
/// the same pair submitters use. All responses are JSON.
pub struct PortalClient {
    base: Url,
    client: Client,
    access_key: String,
    secret_key: String,
}

impl PortalClient {
    pub fn new(
        base_url: impl AsRef<str>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, PortalError> {
        let base = Url::parse(base_url.as_ref())
            .map_err(|e| PortalError::Url(format!("{}: {e}", base_url.as_ref())))?;
        Ok(Self {
            base,
            client: Client::new(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn join(&self, path_and_query: &str) -> Result<Url, PortalError> {
        self.base
            .join(path_and_query)
            .map_err(|e| PortalError::Url(format!("{path_and_query}: {e}")))
    }

    async fn get(&self, path_and_query: &str) -> Result<Response, PortalError> {
        let url = self.join(path_and_query)?;
        debug!(%url, "portal GET");
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| PortalError::Transport {
                url: url.to_string(),
                source,
            })?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, PortalError> {
        let response = self.get(path_and_query).await?;
        let url = response.url().to_string();
        response.json().await.map_err(|e| PortalError::Decode {
            url,
            detail: e.to_string(),
        })
    }

    /// `@id`s of files matching a raw search query fragment, e.g.
    /// `status=uploading` or `accession=ABC123`.
    pub async fn search_file_ids(&self, query: &str) -> Result<Vec<String>, PortalError> {
        let graph = self
            .search_graph(&format!("/search/?field=@id&limit=all&type=File&{query}"))
            .await?;
        Ok(graph
            .iter()
            .filter_map(|entry| entry.get("@id").and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    /// Raw search: the `@graph` array for an arbitrary search path.
    pub async fn search_graph(&self, path_and_query: &str) -> Result<Vec<Value>, PortalError> {
        let response: SearchResponse = self.get_json(path_and_query).await?;
        Ok(response.graph)
    }

    /// An item's edit frame together with its etag. The etag is what makes
    /// the later PATCH safe against concurrent edits.
    pub async fn fetch_edit_frame(&self, id: &str) -> Result<EditFrame, PortalError> {
        let response = self
            .get(&format!("{id}?frame=edit&datastore=database"))
            .await?;
        let url = response.url().to_string();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| PortalError::Decode {
                url: url.clone(),
                detail: "missing etag header".into(),
            })?;
        let item = response.json().await.map_err(|e| PortalError::Decode {
            url,
            detail: e.to_string(),
        })?;
        Ok(EditFrame { item, etag })
    }

    /// Upload credentials for a file, if the portal still holds any.
    pub async fn fetch_upload_credentials(
        &self,
        id: &str,
    ) -> Result<Option<UploadCredentials>, PortalError> {
        let response: UploadResponse = self
            .get_json(&format!("{id}@@upload?datastore=database"))
            .await?;
        Ok(response
            .graph
            .into_iter()
            .next()
            .and_then(|entry| entry.upload_credentials))
    }

    /// An object frame for any `@id` path (files, platforms, awards, ...).
    pub async fn fetch_object(&self, id: &str) -> Result<Value, PortalError> {
        self.get_json(&format!("{id}?datastore=database&frame=object&format=json"))
            .await
    }

    /// A page frame, which carries the audit block object frames lack.
    pub async fn fetch_page(&self, id: &str) -> Result<Value, PortalError> {
        self.get_json(&format!("{id}?frame=page&format=json")).await
    }

    /// Files (other than replaced ones) carrying the given content md5sum.
    pub async fn search_content_md5(&self, value: &str) -> Result<Vec<Value>, PortalError> {
        self.search_graph(&format!(
            "/search/?type=File&status!=replaced&datastore=database&content_md5sum={value}"
        ))
        .await
    }

    /// Fastq files (other than replaced ones) carrying the given read-name
    /// signature.
    pub async fn search_fastq_signature(&self, signature: &str) -> Result<Vec<Value>, PortalError> {
        self.search_graph(&format!(
            "/search/?type=File&status!=replaced&file_format=fastq&datastore=database&fastq_signature={signature}"
        ))
        .await
    }

    /// PATCH an item. When `etag` is given the request carries `If-Match`,
    /// so a portal-side edit since that etag fails the request instead of
    /// clobbering it. Never retried.
    pub async fn patch_item(
        &self,
        id: &str,
        body: &Value,
        etag: Option<&str>,
    ) -> Result<(), PortalError> {
        let url = self.join(id)?;
        debug!(%url, "portal PATCH");
        let mut request = self
            .client
            .patch(url.clone())
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(etag) = etag {
            request = request.header(IF_MATCH, etag);
        }
        let response = request.send().await.map_err(|source| PortalError::Transport {
            url: url.to_string(),
            source,
        })?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: Response) -> Result<Response, PortalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let reason = status.canonical_reason().unwrap_or("").to_owned();
    let body = response.text().await.unwrap_or_default();
    Err(PortalError::Status {
        status: status.as_u16(),
        reason,
        body,
    })
}

impl PortalError {
    /// True for failures worth retrying on the next polling cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            PortalError::Transport { .. } => true,
            PortalError::Status { status, .. } => {
                StatusCode::from_u16(*status).map_or(false, |s| s.is_server_error())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn search_file_ids_extracts_graph_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/search/?field=@id&limit=all&type=File&status=uploading",
            )
            .with_status(200)
            .with_body(
                json!({"@graph": [{"@id": "/files/ABC123/"}, {"@id": "/files/DEF456/"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = PortalClient::new(server.url(), "key", "secret").unwrap();
        let ids = client.search_file_ids("status=uploading").await.unwrap();
        assert_eq!(ids, vec!["/files/ABC123/", "/files/DEF456/"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn edit_frame_requires_etag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/ABC123/?frame=edit&datastore=database")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = PortalClient::new(server.url(), "key", "secret").unwrap();
        let err = client.fetch_edit_frame("/files/ABC123/").await.unwrap_err();
        assert!(matches!(err, PortalError::Decode { .. }));
    }

    #[tokio::test]
    async fn edit_frame_captures_etag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/ABC123/?frame=edit&datastore=database")
            .with_status(200)
            .with_header("etag", "\"abc\"")
            .with_body(json!({"accession": "ABC123"}).to_string())
            .create_async()
            .await;

        let client = PortalClient::new(server.url(), "key", "secret").unwrap();
        let frame = client.fetch_edit_frame("/files/ABC123/").await.unwrap();
        assert_eq!(frame.etag, "\"abc\"");
        assert_eq!(frame.item["accession"], "ABC123");
    }

    #[tokio::test]
    async fn patch_sends_if_match() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/files/ABC123/")
            .match_header("if-match", "\"abc\"")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = PortalClient::new(server.url(), "key", "secret").unwrap();
        client
            .patch_item("/files/ABC123/", &json!({"status": "in progress"}), Some("\"abc\""))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(422)
            .with_body("unprocessable")
            .create_async()
            .await;

        let client = PortalClient::new(server.url(), "key", "secret").unwrap();
        let err = client.fetch_object("/files/ABC123/").await.unwrap_err();
        match err {
            PortalError::Status { status, body, .. } => {
                assert_eq!(status, 422);
                assert_eq!(body, "unprocessable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
