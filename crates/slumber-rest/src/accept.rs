//! Default accept handling: renders a response document as JSON text.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, request::Parts, HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use slumber_core::{SlumberError, SlumberResult};

/// Content type of every rendered response.
///
/// Always plain text, whatever the negotiated type was.
pub const RESPONSE_CONTENT_TYPE: &str = "text/plain";

/// Renders `response` as JSON, pretty-printed with a four space indent when
/// `debug` is set.
///
/// The status comes from `response["_meta"]["status"]`, which must be a
/// valid HTTP status code.
pub fn default_handler(
    _request: &Parts,
    response: &Value,
    _content_type: &str,
    debug: bool,
) -> SlumberResult<Response> {
    render(response, debug)
}

/// Renders a response document without request context.
pub fn render(response: &Value, debug: bool) -> SlumberResult<Response> {
    let status = response_status(response)?;
    let body = if debug {
        let mut buffer = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        response.serialize(&mut serializer)?;
        buffer
    } else {
        serde_json::to_vec(response)?
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static(RESPONSE_CONTENT_TYPE))
        .body(Body::from(body))
        .map_err(|e| SlumberError::internal(format!("cannot build response: {e}")))
}

fn response_status(response: &Value) -> SlumberResult<StatusCode> {
    let status = response
        .get("_meta")
        .and_then(|meta| meta.get("status"))
        .ok_or_else(|| SlumberError::malformed("response has no _meta.status"))?;

    status
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| SlumberError::malformed(format!("invalid response status {status}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;

    fn parts() -> Parts {
        Request::builder().uri("/slumber/").body(()).unwrap().into_parts().0
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_compact_output() {
        let document = json!({"_meta": {"status": 200}, "a": [1, 2]});
        let response = default_handler(&parts(), &document, "application/json", false).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(body_text(response).await, r#"{"_meta":{"status":200},"a":[1,2]}"#);
    }

    #[tokio::test]
    async fn test_debug_output_is_indented() {
        let document = json!({"_meta": {"status": 404}});
        let response = default_handler(&parts(), &document, "text/html", true).unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "{\n    \"_meta\": {\n        \"status\": 404\n    }\n}"
        );
    }

    #[test]
    fn test_missing_status_fails() {
        let err = default_handler(&parts(), &json!({"_meta": {}}), "text/plain", false).unwrap_err();
        assert!(matches!(err, SlumberError::MalformedPayload(_)));

        let err = default_handler(&parts(), &json!({}), "text/plain", false).unwrap_err();
        assert!(matches!(err, SlumberError::MalformedPayload(_)));
    }

    #[test]
    fn test_invalid_status_fails() {
        let err = default_handler(&parts(), &json!({"_meta": {"status": "OK"}}), "", false).unwrap_err();
        assert!(matches!(err, SlumberError::MalformedPayload(_)));

        let err = default_handler(&parts(), &json!({"_meta": {"status": 42}}), "", false).unwrap_err();
        assert!(matches!(err, SlumberError::MalformedPayload(_)));
    }
}
