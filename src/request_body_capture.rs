//! Form body capture for the audit middleware
//!
//! POST parameters live in the request payload, which a handler can only
//! read once. The payload is buffered here, put back into the request, and
//! a copy is returned for `request_to_dict`.

use actix_web::{
    dev::{Payload, ServiceRequest},
    error::PayloadError,
    http::header,
    web::{Bytes, BytesMut},
    HttpMessage,
};
use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use tracing::debug;

/// Largest form body kept in a snapshot (10KB)
pub const MAX_BODY_SIZE: usize = 10 * 1024;

/// Outcome of trying to capture a request body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyCapture {
    /// Not a form request, nothing to capture
    #[default]
    Absent,
    /// The complete form body
    Form(String),
    /// A form body was sent but could not be kept
    Skipped(SkipReason),
}

impl BodyCapture {
    pub fn as_form(&self) -> Option<&str> {
        match self {
            BodyCapture::Form(body) => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge,
    NotUtf8,
    ReadError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge => write!(f, "form body over {} bytes", MAX_BODY_SIZE),
            SkipReason::NotUtf8 => write!(f, "form body is not UTF-8"),
            SkipReason::ReadError => write!(f, "form body could not be read"),
        }
    }
}

/// Captures the request body if it is a form under the size limit
///
/// Buffering stops at the first chunk that passes `MAX_BODY_SIZE`. Whatever
/// was read is handed back to the request ahead of the unread remainder, and
/// a read error is replayed after it, so downstream handlers see the same
/// payload they would have seen without the middleware.
pub async fn capture_form_body(req: &mut ServiceRequest) -> BodyCapture {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !is_form_content_type(content_type) {
        return BodyCapture::Absent;
    }

    // Skip declared oversized payloads early; the handler reads them untouched
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|size| size > MAX_BODY_SIZE) {
        debug!(size = ?declared, "form body over capture limit");
        return BodyCapture::Skipped(SkipReason::TooLarge);
    }

    let bytes = match read_and_restore_body(req).await {
        Ok(b) => b,
        Err(reason) => return BodyCapture::Skipped(reason),
    };

    match String::from_utf8(bytes.to_vec()) {
        Ok(body) => BodyCapture::Form(body),
        Err(_) => BodyCapture::Skipped(SkipReason::NotUtf8),
    }
}

/// True for `application/x-www-form-urlencoded`, parameters allowed
pub fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Reads the payload up to the capture limit and re-inserts an equivalent one
async fn read_and_restore_body(req: &mut ServiceRequest) -> Result<Bytes, SkipReason> {
    let mut payload = req.take_payload();
    let mut buffer = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) => {
                buffer.extend_from_slice(&chunk);
                if buffer.len() > MAX_BODY_SIZE {
                    debug!(read = buffer.len(), "form body over capture limit");
                    let prefix = buffer.freeze();
                    let rest =
                        stream::once(async move { Ok::<_, PayloadError>(prefix) }).chain(payload);
                    req.set_payload(stream_payload(rest));
                    return Err(SkipReason::TooLarge);
                }
            }
            Err(e) => {
                debug!(error = %e, "failed to read form body");
                let prefix = buffer.freeze();
                req.set_payload(stream_payload(stream::iter([Ok(prefix), Err(e)])));
                return Err(SkipReason::ReadError);
            }
        }
    }

    let bytes = buffer.freeze();
    let cloned_bytes = bytes.clone();
    req.set_payload(stream_payload(stream::once(async move {
        Ok::<_, PayloadError>(cloned_bytes)
    })));

    Ok(bytes)
}

fn stream_payload<S>(stream: S) -> Payload
where
    S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
{
    Payload::Stream {
        payload: Box::pin(stream),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn form_request() -> ServiceRequest {
        TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .to_srv_request()
    }

    async fn drain(req: &mut ServiceRequest) -> (BytesMut, Option<PayloadError>) {
        let mut payload = req.take_payload();
        let mut restored = BytesMut::new();
        while let Some(chunk) = payload.next().await {
            match chunk {
                Ok(chunk) => restored.extend_from_slice(&chunk),
                Err(e) => return (restored, Some(e)),
            }
        }
        (restored, None)
    }

    #[test]
    fn test_is_form_content_type() {
        assert!(is_form_content_type("application/x-www-form-urlencoded"));
        assert!(is_form_content_type(
            "application/x-www-form-urlencoded; charset=utf-8"
        ));
        assert!(is_form_content_type("Application/X-WWW-Form-Urlencoded"));
    }

    #[test]
    fn test_skip_other_content_types() {
        assert!(!is_form_content_type("application/json"));
        assert!(!is_form_content_type("multipart/form-data; boundary=x"));
        assert!(!is_form_content_type(""));
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::TooLarge.to_string(), "form body over 10240 bytes");
        assert_eq!(BodyCapture::Form("a=1".into()).as_form(), Some("a=1"));
        assert_eq!(BodyCapture::Skipped(SkipReason::NotUtf8).as_form(), None);
    }

    #[actix_rt::test]
    async fn test_capture_form_body() {
        let mut req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload("name=ada&lang=rust")
            .to_srv_request();

        let body = capture_form_body(&mut req).await;
        assert_eq!(body, BodyCapture::Form("name=ada&lang=rust".to_string()));

        // The payload is still readable after capture
        let (restored, failure) = drain(&mut req).await;
        assert_eq!(&restored[..], b"name=ada&lang=rust");
        assert!(failure.is_none());
    }

    #[actix_rt::test]
    async fn test_skip_json_body() {
        let mut req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload(r#"{"a":1}"#)
            .to_srv_request();

        assert_eq!(capture_form_body(&mut req).await, BodyCapture::Absent);
    }

    #[actix_rt::test]
    async fn test_skip_oversized_body() {
        let big = "a=".to_string() + &"x".repeat(MAX_BODY_SIZE + 1);
        let mut req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload(big.clone())
            .to_srv_request();

        assert_eq!(
            capture_form_body(&mut req).await,
            BodyCapture::Skipped(SkipReason::TooLarge)
        );
        let (restored, _) = drain(&mut req).await;
        assert_eq!(restored.len(), big.len());
    }

    #[actix_rt::test]
    async fn test_chunked_body_stops_at_limit() {
        // No Content-Length, so the limit is enforced while reading
        let chunk = Bytes::from(vec![b'x'; 4 * 1024]);
        let chunks: Vec<Result<Bytes, PayloadError>> = (0..8).map(|_| Ok(chunk.clone())).collect();
        let mut req = form_request();
        req.set_payload(stream_payload(stream::iter(chunks)));

        assert_eq!(
            capture_form_body(&mut req).await,
            BodyCapture::Skipped(SkipReason::TooLarge)
        );

        let (restored, failure) = drain(&mut req).await;
        assert_eq!(restored.len(), 8 * 4 * 1024);
        assert!(failure.is_none());
    }

    #[actix_rt::test]
    async fn test_read_error_is_replayed() {
        let chunks: Vec<Result<Bytes, PayloadError>> = vec![
            Ok(Bytes::from_static(b"name=ada")),
            Err(PayloadError::Incomplete(None)),
        ];
        let mut req = form_request();
        req.set_payload(stream_payload(stream::iter(chunks)));

        assert_eq!(
            capture_form_body(&mut req).await,
            BodyCapture::Skipped(SkipReason::ReadError)
        );

        let (restored, failure) = drain(&mut req).await;
        assert_eq!(&restored[..], b"name=ada");
        assert!(matches!(failure, Some(PayloadError::Incomplete(_))));
    }

    #[actix_rt::test]
    async fn test_non_utf8_body_is_skipped() {
        let mut req = TestRequest::post()
            .insert_header((header::CONTENT_TYPE, "application/x-www-form-urlencoded"))
            .set_payload(&b"name=caf\xe9"[..])
            .to_srv_request();

        assert_eq!(
            capture_form_body(&mut req).await,
            BodyCapture::Skipped(SkipReason::NotUtf8)
        );
    }
}
