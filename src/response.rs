//! HTTP responses produced by the node server.
//!
//! Handlers never see these: they deal in [`Message`](crate::Message)s. This
//! module only shapes what goes back over the wire.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

pub(crate) type HttpResponse = http::Response<Full<Bytes>>;

/// Common content-type values.
#[derive(Clone, Copy)]
pub(crate) enum ContentType {
    Json, // application/json
    Text, // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

pub(crate) fn bytes(status: StatusCode, content_type: ContentType, body: impl Into<Bytes>) -> HttpResponse {
    let mut res = http::Response::new(Full::new(body.into()));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    res
}

pub(crate) fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    bytes(status, ContentType::Text, body.into())
}

pub(crate) fn json(status: StatusCode, body: Vec<u8>) -> HttpResponse {
    bytes(status, ContentType::Json, body)
}
