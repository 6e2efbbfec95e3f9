//! GCP API interaction module
//!
//! This module provides the core functionality for interacting with Google Cloud Platform
//! APIs, including authentication, HTTP client, per-region clients and name lookups.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client for making API requests
//! - [`clients`] - One client per configured region
//! - [`http`] - HTTP utilities for REST API calls
//! - [`names`] - Bulk id -> name enumeration for the name resolver
//! - [`projects`] - Project listing
//!
//! # Example
//!
//! ```ignore
//! use gcpinv::gcp::client::GcpClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new("my-project", "us-central1").await?;
//!     let subnets = client.get(&client.compute_regional_url("subnetworks")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod clients;
pub mod http;
pub mod names;
pub mod projects;

pub use client::{Endpoints, GcpClient};
pub use clients::ClientSet;
pub use names::GcpNameSource;
