//! Quickwit API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Typed client for the health, index and source endpoints
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use qwinit::quickwit::client::QuickwitClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let url = url::Url::parse("http://localhost:7280")?;
//!     let client = QuickwitClient::new(url, std::time::Duration::from_secs(10))?;
//!     let indexes = client.list_index_ids().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
