//! Microsoft Graph mail provider implementation.
//!
//! # API Usage
//!
//! Relative to the configured base (`https://graph.microsoft.com/v1.0/me`):
//! - `GET mailFolders` (paged through `@odata.nextLink`)
//! - `POST mailFolders` to create a folder
//! - `POST messages/{id}/createReply` to create a reply draft
//! - `POST messages/{id}/move` to move a message
//! - `DELETE messages/{id}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{MailFolder, MailTransport};
use crate::domain::{AccessToken, EmailId, FolderId};
use crate::providers::error::{build_client, error_from_response, ProviderError, Result};

/// Upper bound on folder pages followed in one listing. A listing with
/// more pages is an error.
pub const MAX_FOLDER_PAGES: usize = 100;

/// Graph folder list response.
#[derive(Debug, Deserialize)]
struct FolderListResponse {
    #[serde(default)]
    value: Vec<MailFolder>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Graph response carrying just an id.
#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest<'a> {
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateReplyRequest<'a> {
    comment: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest<'a> {
    destination_id: &'a str,
}

/// Mail transport backed by the Graph REST API.
#[derive(Debug, Clone)]
pub struct GraphMailClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GraphMailClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::InvalidRequest(format!("mail base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidRequest(format!(
                "mail base url cannot be a base: {}",
                base_url
            )));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
        })
    }

    /// Appends path segments to the base, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base url has no path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(token: &AccessToken) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.secret()))
                .map_err(|e| ProviderError::Authentication(format!("invalid token: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request.
    async fn get<T: DeserializeOwned>(&self, token: &AccessToken, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(Self::auth_headers(token)?)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Makes an authenticated POST request with a JSON body.
    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        token: &AccessToken,
        url: Url,
        body: &B,
    ) -> Result<T> {
        let mut headers = Self::auth_headers(token)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }
}

#[async_trait]
impl MailTransport for GraphMailClient {
    async fn list_folders(&self, token: &AccessToken) -> Result<Vec<MailFolder>> {
        let mut folders = Vec::new();
        let mut next = Some(self.url(&["mailFolders"])?);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: FolderListResponse = self.get(token, url).await?;
            folders.extend(page.value);
            pages += 1;

            if pages >= MAX_FOLDER_PAGES && page.next_link.is_some() {
                // A partial listing would let find-or-create duplicate a folder.
                tracing::warn!(pages, "folder listing exceeded page limit");
                return Err(ProviderError::Internal(
                    "folder listing exceeded page limit".to_string(),
                ));
            }
            next = page
                .next_link
                .map(|link| {
                    Url::parse(&link)
                        .map_err(|e| ProviderError::Internal(format!("bad nextLink: {}", e)))
                })
                .transpose()?;
        }

        tracing::debug!(count = folders.len(), pages, "listed mail folders");
        Ok(folders)
    }

    async fn create_folder(&self, token: &AccessToken, display_name: &str) -> Result<FolderId> {
        let url = self.url(&["mailFolders"])?;
        let created: IdResponse = self
            .post(token, url, &CreateFolderRequest { display_name })
            .await?;
        Ok(FolderId(created.id))
    }

    async fn create_reply(
        &self,
        token: &AccessToken,
        message_id: &EmailId,
        comment: &str,
    ) -> Result<EmailId> {
        let url = self.url(&["messages", &message_id.0, "createReply"])?;
        let draft: IdResponse = self
            .post(token, url, &CreateReplyRequest { comment })
            .await?;
        Ok(EmailId(draft.id))
    }

    async fn move_message(
        &self,
        token: &AccessToken,
        message_id: &EmailId,
        destination: &FolderId,
    ) -> Result<EmailId> {
        let url = self.url(&["messages", &message_id.0, "move"])?;
        let moved: IdResponse = self
            .post(
                token,
                url,
                &MoveRequest {
                    destination_id: &destination.0,
                },
            )
            .await?;
        Ok(EmailId(moved.id))
    }

    async fn delete_message(&self, token: &AccessToken, message_id: &EmailId) -> Result<()> {
        let url = self.url(&["messages", &message_id.0])?;
        let response = self
            .client
            .delete(url)
            .headers(Self::auth_headers(token)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}
