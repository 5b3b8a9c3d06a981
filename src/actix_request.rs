//! Actix-Web adapter for [`RequestSource`]
//!
//! Exposes an `HttpRequest` (plus an optionally captured form body) through
//! the capture interface. Metadata uses CGI-style keys so snapshots from
//! different frameworks line up in the audit store.

use actix_web::{
    http::header::{self, HeaderName, HeaderValue},
    web, HttpRequest,
};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AuditError;
use crate::request::{Metadata, Params, RequestSource};
use crate::request_body_capture::BodyCapture;

static NO_BODY: BodyCapture = BodyCapture::Absent;

/// An Actix request as seen by `request_to_dict`
pub struct ActixRequest<'a> {
    req: &'a HttpRequest,
    body: &'a BodyCapture,
}

impl<'a> ActixRequest<'a> {
    pub fn new(req: &'a HttpRequest) -> Self {
        Self { req, body: &NO_BODY }
    }

    /// Attach the outcome of capturing the form body
    pub fn with_body(mut self, body: &'a BodyCapture) -> Self {
        self.body = body;
        self
    }

    fn collect_metadata<F>(&self, mut decode: F) -> Result<BTreeMap<String, String>, AuditError>
    where
        F: FnMut(&HeaderName, &HeaderValue) -> Result<String, AuditError>,
    {
        let req = self.req;
        let mut meta = BTreeMap::new();

        meta.insert("REQUEST_METHOD".to_string(), req.method().to_string());
        meta.insert("PATH_INFO".to_string(), req.path().to_string());
        meta.insert("QUERY_STRING".to_string(), req.query_string().to_string());
        meta.insert("SERVER_PROTOCOL".to_string(), format!("{:?}", req.version()));

        let app = req.app_config();
        let server_name = app.host().split(':').next().unwrap_or_default();
        meta.insert("SERVER_NAME".to_string(), server_name.to_string());
        meta.insert("SERVER_PORT".to_string(), app.local_addr().port().to_string());

        if let Some(peer) = req.peer_addr() {
            meta.insert("REMOTE_ADDR".to_string(), peer.ip().to_string());
        }

        for (name, value) in req.headers() {
            if is_sensitive_header(name.as_str()) {
                continue;
            }
            let value = decode(name, value)?;
            meta.insert(meta_key(name), value);
        }

        Ok(meta)
    }
}

impl RequestSource for ActixRequest<'_> {
    fn path(&self) -> String {
        self.req.path().to_string()
    }

    fn get_params(&self) -> Result<Params, AuditError> {
        parse_urlencoded(self.req.query_string())
    }

    fn raw_get(&self) -> String {
        self.req.query_string().to_string()
    }

    fn post_params(&self) -> Result<Params, AuditError> {
        match self.body {
            BodyCapture::Absent => Ok(Params::new()),
            BodyCapture::Form(body) => parse_urlencoded(body),
            BodyCapture::Skipped(reason) => Err(AuditError::BodyNotCaptured(reason.to_string())),
        }
    }

    fn raw_post(&self) -> String {
        match self.body {
            BodyCapture::Absent => String::new(),
            BodyCapture::Form(body) => body.clone(),
            BodyCapture::Skipped(reason) => format!("<{}>", reason),
        }
    }

    fn cookies(&self) -> Result<Params, AuditError> {
        let cookies = self
            .req
            .cookies()
            .map_err(|e| AuditError::InvalidCookie(e.to_string()))?;

        Ok(cookies
            .iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect())
    }

    fn raw_cookies(&self) -> String {
        self.req
            .headers()
            .get_all(header::COOKIE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn metadata(&self) -> Result<Metadata, AuditError> {
        let meta = self.collect_metadata(|name, value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| AuditError::InvalidHeader(name.as_str().to_string()))
        })?;

        Ok(meta.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    }

    fn raw_metadata(&self) -> BTreeMap<String, String> {
        self.collect_metadata(|_, value| Ok(String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .unwrap_or_default()
    }
}

/// Parse `a=1&b=2` style data; repeated keys keep the last value
pub fn parse_urlencoded(data: &str) -> Result<Params, AuditError> {
    web::Query::<Params>::from_query(data)
        .map(web::Query::into_inner)
        .map_err(|e| AuditError::InvalidQuery(e.to_string()))
}

/// CGI name for a header: `Content-Type` and `Content-Length` keep their
/// bare names, everything else becomes `HTTP_<NAME>`
fn meta_key(name: &HeaderName) -> String {
    let upper = name.as_str().to_uppercase().replace('-', "_");
    if *name == header::CONTENT_TYPE || *name == header::CONTENT_LENGTH {
        upper
    } else {
        format!("HTTP_{}", upper)
    }
}

/// Credentials never make it into stored metadata
fn is_sensitive_header(name: &str) -> bool {
    matches!(
        name,
        "authorization" | "proxy-authorization" | "x-api-key" | "x-auth-token"
    )
}
