//! Actix-Web middleware that audits every request
//!
//! For each request the middleware captures form bodies, builds a
//! [`RequestSnapshot`](crate::request::RequestSnapshot) with
//! `request_to_dict`, runs the configured context providers, and forwards
//! an [`AuditEvent`] to the sink once the response is ready. Capture never
//! changes what the handler sees.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::actix_request::ActixRequest;
use crate::config::Config;
use crate::error::AuditError;
use crate::import::{import_providers, ContextProvider, ModuleRegistry};
use crate::logger::{forward_event, AuditEvent, AuditSink, TracingSink};
use crate::process::{extract_process_data, ProcessData};
use crate::request::request_to_dict;
use crate::request_body_capture::capture_form_body;
use crate::sanitize::EnvSnapshot;
use crate::utils::{current_timestamp, generate_interlink_id, generate_trace_id};

/// State shared by every worker's middleware instance
struct AuditState {
    config: Arc<Config>,
    sink: Arc<dyn AuditSink>,
    process: ProcessData,
    env: EnvSnapshot,
    providers: BTreeMap<String, ContextProvider>,
}

/// Audit middleware for Actix-Web
///
/// Add this middleware to your Actix app via `.wrap()`:
///
/// ```rust,no_run
/// use actix_web::App;
/// use audit_tools::AuditMiddleware;
///
/// let app = App::new().wrap(AuditMiddleware::new());
/// ```
#[derive(Clone)]
pub struct AuditMiddleware {
    state: Arc<AuditState>,
}

impl AuditMiddleware {
    /// Build from environment configuration with the tracing sink
    pub fn new() -> Self {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        let process = extract_process_data(&generate_interlink_id(), &config);
        debug!(pid = process.pid, interlink_id = %process.interlink_id, "audit middleware ready");

        Self {
            state: Arc::new(AuditState {
                config: config.into_arc(),
                sink: Arc::new(TracingSink),
                process,
                env: EnvSnapshot::capture(),
                providers: BTreeMap::new(),
            }),
        }
    }

    /// Replace the sink events are forwarded to
    pub fn with_sink(self, sink: impl AuditSink + 'static) -> Self {
        self.map_state(|state| state.sink = Arc::new(sink))
    }

    /// Use fixed process facts instead of the ones read at construction
    pub fn with_process(self, process: ProcessData) -> Self {
        self.map_state(|state| state.process = process)
    }

    /// Resolve the configured providers against `registry`
    ///
    /// Fails on the first provider that does not resolve.
    pub fn with_providers(self, registry: &ModuleRegistry<ContextProvider>) -> Result<Self, AuditError> {
        let providers = import_providers(registry, &self.state.config.providers)?;
        Ok(self.map_state(|state| state.providers = providers))
    }

    fn map_state(self, f: impl FnOnce(&mut AuditState)) -> Self {
        let mut state = match Arc::try_unwrap(self.state) {
            Ok(state) => state,
            Err(shared) => AuditState {
                config: shared.config.clone(),
                sink: shared.sink.clone(),
                process: shared.process.clone(),
                env: shared.env.clone(),
                providers: shared.providers.clone(),
            },
        };
        f(&mut state);
        Self {
            state: Arc::new(state),
        }
    }
}

impl Default for AuditMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuditMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuditMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuditMiddlewareService {
            service: Rc::new(service),
            state: self.state.clone(),
        })
    }
}

/// The actual service that handles each request
pub struct AuditMiddlewareService<S> {
    service: Rc<S>,
    state: Arc<AuditState>,
}

impl<S, B> Service<ServiceRequest> for AuditMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let state = self.state.clone();
        let start_time = Instant::now();
        let timestamp = current_timestamp();
        let trace_id = generate_trace_id();

        Box::pin(async move {
            // The body must be captured before the handler consumes it
            let body = capture_form_body(&mut req).await;
            let source = ActixRequest::new(req.request()).with_body(&body);
            let snapshot = request_to_dict(&source, &state.env);

            let context: BTreeMap<String, Value> = state
                .providers
                .iter()
                .map(|(name, provider)| (name.clone(), provider(&snapshot)))
                .collect();

            let res = service.call(req).await?;

            let event = AuditEvent {
                timestamp,
                trace_id,
                process: state.process.clone(),
                request: snapshot,
                context,
                status: res.status().as_u16(),
                duration_ms: start_time.elapsed().as_millis() as u64,
            };
            forward_event(&event, state.sink.as_ref(), &state.config);

            Ok(res)
        })
    }
}
