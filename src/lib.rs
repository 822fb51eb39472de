//! Uplink — resilient HTTP access and three-phase file uploads.
//!
//! [`api::ApiClient`] dispatches requests to the configured backends with
//! bounded exponential backoff, one session-recovery attempt on an expired
//! session, and errors normalized into [`error::NormalizedError`].
//! [`upload::Uploader`] builds the init, transfer and complete upload flow on
//! top of it.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use uplink::api::ApiClient;
//! use uplink::config::load_config;
//! use uplink::session::{StaticAuthService, TracingNotifier};
//! use uplink::upload::{UploadFile, Uploader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let auth = Arc::new(StaticAuthService::from_parts("token", Some("session")));
//! let client = ApiClient::new(&config, auth);
//! let uploader = Uploader::new(client, Arc::new(TracingNotifier), &config.upload);
//! let file = UploadFile::from_path("report.pdf".as_ref()).await?;
//! let record = uploader.upload(Some(&file)).await?.into_result()?;
//! println!("{}", record.id);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod upload;
