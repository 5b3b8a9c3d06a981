//! # audit-tools
//!
//! Capture helpers for audit logging in Actix-Web applications.
//!
//! The crate turns framework objects into plain, storable records:
//!
//! - **Requests**: `request_to_dict` flattens a request into GET/POST/cookie/
//!   metadata sections and never fails; unreadable sections are kept raw
//! - **Models**: `serialize_model_instance` normalizes dates, decimals, byte
//!   strings and file fields
//! - **Processes**: `extract_process_data` records who served a request
//! - **Providers**: `import_providers` resolves configured dotted paths to
//!   context providers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer, web, HttpResponse};
//! use audit_tools::AuditMiddleware;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(AuditMiddleware::new())
//!             .service(web::resource("/").to(|| async {
//!                 HttpResponse::Ok().body("Hello!")
//!             }))
//!     })
//!     .bind("0.0.0.0:8080")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! Read from environment variables by `Config::from_env`:
//!
//! - `AUDIT_TRANSLATE_URLS`: record URLs as translatable markers
//! - `AUDIT_CUSTOM_PROVIDERS`: JSON object of provider name to dotted path
//! - `AUDIT_LAUNCHER_SCRIPTS`: launcher scripts skipped when naming the process
//! - `AUDIT_DEBUG`: log every event pretty-printed at debug level
//!
//! ## Architecture
//!
//! - `middleware`: Actix-Web middleware tying capture to a sink
//! - `request`: request snapshots and the `RequestSource` interface
//! - `actix_request`: `RequestSource` for `actix_web::HttpRequest`
//! - `request_body_capture`: form body buffering for POST parameters
//! - `sanitize`: key sanitizer and environment filter
//! - `import`: dotted path resolution and provider loading
//! - `model`: model field serialization
//! - `process`: process facts
//! - `i18n`: translatable URLs
//! - `logger`: audit events and sinks
//! - `config`, `error`, `utils`: configuration, errors, id helpers

pub mod actix_request;
pub mod config;
pub mod error;
pub mod i18n;
pub mod import;
pub mod logger;
pub mod middleware;
pub mod model;
pub mod prelude;
pub mod process;
pub mod request;
pub mod request_body_capture;
pub mod sanitize;
pub mod utils;

// Re-export main components for easy access
pub use config::Config;
pub use error::AuditError;
pub use i18n::i18n_url;
pub use import::{dynamic_import, import_providers};
pub use middleware::AuditMiddleware;
pub use model::serialize_model_instance;
pub use process::extract_process_data;
pub use request::{parse_request_meta, request_to_dict};
pub use sanitize::{filter_request_meta, fix_dict};
