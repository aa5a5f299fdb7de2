//! HTTP implementation of the metadata gateway.
//!
//! # API Usage
//!
//! All endpoints are `GET` with a single query parameter:
//! - `fetchCustomerProfile?outlookEmailId=` returns `{ customerProfile }`
//! - `fetchName?outlookEmailId=` returns `{ objectname }`
//! - `fetchFolderName?outlookEmailId=` returns `{ folderName }`
//! - `fetchEmailsByFolderName?folderName=` returns a list of rated emails

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::MetadataGateway;
use crate::domain::{EmailId, EmailRecord, ProfileSnapshot};
use crate::providers::error::{build_client, error_from_response, ProviderError, Result};

const EMAIL_ID_PARAM: &str = "outlookEmailId";
const FOLDER_NAME_PARAM: &str = "folderName";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerProfileResponse {
    customer_profile: String,
}

#[derive(Debug, Deserialize)]
struct ObjectNameResponse {
    objectname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderNameResponse {
    folder_name: String,
}

/// Metadata gateway backed by the inquiry metadata web service.
#[derive(Debug, Clone)]
pub struct HttpMetadataGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMetadataGateway {
    /// Creates a gateway rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidRequest`] if the URL cannot serve as a base.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::InvalidRequest(format!("metadata base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidRequest(format!(
                "metadata base url cannot be a base: {}",
                base_url
            )));
        }
        Ok(Self {
            client: build_client(timeout)?,
            base_url,
        })
    }

    /// Returns the base URL requests are built from.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/<endpoint>?<param>=<value>` with the value percent-encoded.
    fn endpoint(&self, endpoint: &str, param: &str, value: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base url has no path".to_string()))?
            .pop_if_empty()
            .push(endpoint);
        url.query_pairs_mut().append_pair(param, value);
        Ok(url)
    }

    /// Issues a GET and decodes a JSON body, mapping non-2xx to errors.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    async fn customer_profile(&self, email_id: &EmailId) -> Result<String> {
        let url = self.endpoint("fetchCustomerProfile", EMAIL_ID_PARAM, &email_id.0)?;
        let body: CustomerProfileResponse = self.get_json(url).await?;
        Ok(body.customer_profile)
    }

    async fn object_name(&self, email_id: &EmailId) -> Result<String> {
        let url = self.endpoint("fetchName", EMAIL_ID_PARAM, &email_id.0)?;
        let body: ObjectNameResponse = self.get_json(url).await?;
        Ok(body.objectname)
    }

    async fn folder_name(&self, email_id: &EmailId) -> Result<String> {
        let url = self.endpoint("fetchFolderName", EMAIL_ID_PARAM, &email_id.0)?;
        let body: FolderNameResponse = self.get_json(url).await?;
        Ok(body.folder_name)
    }

    async fn emails_by_folder(&self, folder_name: &str) -> Result<Vec<EmailRecord>> {
        let url = self.endpoint("fetchEmailsByFolderName", FOLDER_NAME_PARAM, folder_name)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn fetch_profile(&self, email_id: &EmailId) -> Option<ProfileSnapshot> {
        if email_id.is_blank() {
            tracing::debug!("skipping profile fetch for blank email id");
            return None;
        }

        let lookups = tokio::try_join!(
            self.customer_profile(email_id),
            self.object_name(email_id),
            self.folder_name(email_id),
        );

        match lookups {
            Ok((customer_profile, object_name, folder_name)) => Some(ProfileSnapshot::new(
                email_id.clone(),
                customer_profile,
                object_name,
                folder_name,
            )),
            Err(e) => {
                tracing::warn!(email_id = %email_id, error = %e, "profile fetch failed");
                None
            }
        }
    }

    async fn fetch_folder_name(&self, email_id: &EmailId) -> Option<String> {
        if email_id.is_blank() {
            return None;
        }

        match self.folder_name(email_id).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(email_id = %email_id, error = %e, "folder name fetch failed");
                None
            }
        }
    }

    async fn fetch_emails_by_folder(&self, folder_name: &str) -> Vec<EmailRecord> {
        match self.emails_by_folder(folder_name).await {
            Ok(emails) => {
                tracing::debug!(folder = folder_name, count = emails.len(), "fetched emails");
                emails
            }
            Err(e) => {
                tracing::warn!(folder = folder_name, error = %e, "email list fetch failed");
                Vec::new()
            }
        }
    }
}
