//! HTTP session store.
//!
//! Speaks the JSON wire protocol of the remote session store:
//!
//! ```text
//! POST  {base}/api/session                      create
//! PATCH {base}/api/session/{id}                 submit patch
//! GET   {base}/api/session/{id}                 full fetch
//! GET   {base}/api/session/{id}?range=s-e       ranged fetch
//! GET   {base}/api/session/{id}/diffs?since=v   pending patches
//! ```
//!
//! Session ids and versions are opaque strings and are percent-escaped when
//! embedded in paths and queries.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use docsync_core::{Document, Patch, SessionId, Version};

use crate::error::{ClientError, Result};
use crate::messages::{
    CreateSessionRequest, CreatedSession, FullFetch, FullState, PatchAccepted, PendingPatches,
    Range, RangedChunk, SubmitPatchRequest,
};
use crate::store::SessionStore;

/// Session store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSessionStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSessionStore {
    /// Store rooted at `base_url` (e.g. `http://localhost:6003`).
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn sessions_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport("base url cannot carry a path".into()))?
            .extend(["api", "session"]);
        Ok(url)
    }

    fn session_url(&self, session_id: &SessionId) -> Result<Url> {
        let mut url = self.sessions_url()?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport("base url cannot carry a path".into()))?
            .push(session_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn create_session(&self, document: &Document) -> Result<CreatedSession> {
        let response = self
            .client
            .post(self.sessions_url()?)
            .json(&CreateSessionRequest {
                document: document.clone(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("create session: {e}")))?;
        parse_json(response, "create session").await
    }

    async fn submit_patch(
        &self,
        session_id: &SessionId,
        patch: &Patch,
        user_name: &str,
    ) -> Result<PatchAccepted> {
        let response = self
            .client
            .patch(self.session_url(session_id)?)
            .json(&SubmitPatchRequest {
                patch: patch.clone(),
                user_name: user_name.to_string(),
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("submit patch: {e}")))?;
        parse_json(response, "submit patch").await
    }

    async fn fetch_full(&self, session_id: &SessionId) -> Result<FullFetch> {
        let response = self
            .client
            .get(self.session_url(session_id)?)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("full fetch: {e}")))?;

        // A non-success status on the full fetch is the store signalling
        // that the document must travel through bounded ranges instead.
        if !response.status().is_success() {
            tracing::debug!(
                session = %session_id,
                status = %response.status(),
                "full fetch refused; using ranged fetch"
            );
            return Ok(FullFetch::UseRanged);
        }

        let state: FullState = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("full fetch: {e}")))?;
        Ok(FullFetch::Complete(state))
    }

    async fn fetch_range(&self, session_id: &SessionId, range: Range) -> Result<RangedChunk> {
        let mut url = self.session_url(session_id)?;
        url.query_pairs_mut()
            .append_pair("range", &range.to_string());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("ranged fetch: {e}")))?;
        parse_json(response, "ranged fetch").await
    }

    async fn fetch_patches_since(
        &self,
        session_id: &SessionId,
        since: &Version,
    ) -> Result<PendingPatches> {
        let mut url = self.session_url(session_id)?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport("base url cannot carry a path".into()))?
            .push("diffs");
        url.query_pairs_mut().append_pair("since", since.as_str());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("fetch patches: {e}")))?;
        parse_json(response, "fetch patches").await
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Transport(format!(
            "{what} failed with {status}: {body}"
        )));
    }
    response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(format!("{what}: {e}")))
}
