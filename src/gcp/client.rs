//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality. One client is scoped to one project and region.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;

/// Base URLs for the APIs the collectors talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compute: String,
    pub container: String,
    pub storage: String,
    pub resourcemanager: String,
    /// Cloud Run is served per region; `None` means `https://{region}-run.googleapis.com`
    pub run: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compute: "https://compute.googleapis.com".to_string(),
            container: "https://container.googleapis.com".to_string(),
            storage: "https://storage.googleapis.com".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".to_string(),
            run: None,
        }
    }
}

impl Endpoints {
    /// Point every API at one base URL (emulators and tests)
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            compute: base.clone(),
            container: base.clone(),
            storage: base.clone(),
            resourcemanager: base.clone(),
            run: Some(base),
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub region: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client
    pub async fn new(project_id: &str, region: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, project_id, region, Endpoints::default())
    }

    /// Create a client from existing credentials
    pub fn with_credentials(
        credentials: GcpCredentials,
        project_id: &str,
        region: &str,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            region: region.to_string(),
            endpoints,
        })
    }

    /// Same project, credentials and connection pool, different region
    pub fn for_region(&self, region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..self.clone()
        }
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!(
            "{}/compute/v1/projects/{}/{}",
            self.endpoints.compute, self.project_id, path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, zone: &str, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, resource: &str) -> String {
        self.compute_url(&format!("regions/{}/{}", self.region, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }

    /// URL of the region itself (lists its zones)
    pub fn compute_region_url(&self) -> String {
        self.compute_url(&format!("regions/{}", self.region))
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // GKE API helpers
    // =========================================================================

    /// Build GKE API URL
    pub fn container_url(&self, path: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.endpoints.container, self.project_id, path
        )
    }

    /// Build GKE location URL (region or zone)
    pub fn container_location_url(&self, location: &str, resource: &str) -> String {
        self.container_url(&format!("locations/{}/{}", location, resource))
    }

    // =========================================================================
    // Cloud Run API helpers
    // =========================================================================

    /// Build Cloud Run (Knative serving v1) URL for the client's region
    pub fn run_url(&self, resource: &str) -> String {
        let base = match &self.endpoints.run {
            Some(base) => base.clone(),
            None => format!("https://{}-run.googleapis.com", self.region),
        };
        format!(
            "{}/apis/serving.knative.dev/v1/namespaces/{}/{}",
            base, self.project_id, resource
        )
    }

    // =========================================================================
    // Resource Manager API helpers
    // =========================================================================

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.resourcemanager, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcpClient {
        GcpClient::with_credentials(
            GcpCredentials::from_token("t"),
            "my-project",
            "us-central1",
            Endpoints::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_compute_urls() {
        let client = client();
        assert_eq!(
            client.compute_regional_url("subnetworks"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/regions/us-central1/subnetworks"
        );
        assert_eq!(
            client.compute_zonal_url("us-central1-b", "instances"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/zones/us-central1-b/instances"
        );
        assert!(client.compute_global_url("networks").ends_with("/global/networks"));
    }

    #[test]
    fn test_run_url_is_regional() {
        let client = client().for_region("europe-west1");
        assert_eq!(
            client.run_url("revisions"),
            "https://europe-west1-run.googleapis.com/apis/serving.knative.dev/v1/namespaces/my-project/revisions"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let client = GcpClient::with_credentials(
            GcpCredentials::from_token("t"),
            "p",
            "us-east1",
            Endpoints::all("http://127.0.0.1:9000/"),
        )
        .unwrap();
        assert_eq!(
            client.storage_bucket_url("my bucket"),
            "http://127.0.0.1:9000/storage/v1/b/my%20bucket"
        );
        assert!(client.run_url("revisions").starts_with("http://127.0.0.1:9000/apis/"));
    }
}
