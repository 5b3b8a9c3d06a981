//! Basic usage example for audit-tools
//!
//! Run with:
//! ```bash
//! AUDIT_CUSTOM_PROVIDERS='{"agent": "demo.providers.user_agent"}' \
//! RUST_LOG=audit=info \
//! cargo run --example basic_usage
//! ```

use actix_web::{web, App, HttpResponse, HttpServer};
use audit_tools::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Hello audit-tools!")
}

async fn echo(body: String) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

fn user_agent(snapshot: &RequestSnapshot) -> Value {
    snapshot
        .metadata
        .as_ref()
        .and_then(|meta| meta.get("HTTP_USER_AGENT").cloned())
        .unwrap_or(Value::Null)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = ModuleRegistry::<ContextProvider>::new();
    registry
        .register("demo.providers.user_agent", Arc::new(user_agent))
        .map_err(std::io::Error::other)?;

    let middleware = AuditMiddleware::new()
        .with_providers(&registry)
        .map_err(std::io::Error::other)?;

    println!("Starting example server on http://0.0.0.0:8080");
    println!("  GET  http://localhost:8080/");
    println!("  POST http://localhost:8080/echo");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware.clone())
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/echo").route(web::post().to(echo)))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}
