//! Backend API interaction module
//!
//! # Module Structure
//!
//! - [`transport`] - request/response contract and the [`Transport`] trait
//! - [`http`] - reqwest implementation of the transport
//! - [`client`] - endpoint resolution against a [`Context`]
//! - [`bulk`] - concurrent per-item fan-out with barrier join
//! - [`model_api`] - CRUD orchestration for one model
//! - [`export`] - table export of resource lists
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hastily::api::{Client, Context, HttpTransport, ModelApi};
//! use hastily::model::Model;
//!
//! async fn example() -> hastily::Result<()> {
//!     let context = Context::new("https://api.example.com", "users", "token");
//!     let transport = Arc::new(HttpTransport::new().expect("http client"));
//!     let api = ModelApi::<Model>::new(Client::new(context, transport));
//!     let users = api.get().await?;
//!     let results = api.delete_many(&users).await;
//!     println!("{}/{} deleted", results.successes(), results.size());
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod client;
pub mod export;
pub mod http;
pub mod model_api;
pub mod transport;

pub use bulk::{BulkOptions, CANCELLED};
pub use client::{Client, Context, Request, INVALID_CREDENTIALS};
pub use export::ExportModel;
pub use http::{status_hint, HttpTransport};
pub use model_api::ModelApi;
pub use transport::{HttpRequest, Method, Response, ResponseList, Transport, NON_OK_STATUS};
