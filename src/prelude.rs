//! Convenience re-exports for easy importing
//!
//! Import everything you need with:
//! ```rust
//! use audit_tools::prelude::*;
//! ```

pub use crate::actix_request::ActixRequest;
pub use crate::config::Config;
pub use crate::error::AuditError;
pub use crate::i18n::{i18n_url, LocalizedUrl};
pub use crate::import::{dynamic_import, import_providers, ContextProvider, ModuleRegistry};
pub use crate::logger::{AuditEvent, AuditSink, TracingSink};
pub use crate::middleware::AuditMiddleware;
pub use crate::model::{serialize_model_instance, FieldValue, ModelInstance, SerializedValue};
pub use crate::process::{extract_process_data, ProcessData};
pub use crate::request::{request_to_dict, RequestSnapshot, RequestSource};
pub use crate::request_body_capture::BodyCapture;
pub use crate::sanitize::{filter_request_meta, fix_dict, EnvSnapshot};
