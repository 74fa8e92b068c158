use crate::{errors::ServiceError, services::art::FileDownload, services::page_bounds, AppState};
use axum::{
    body::{to_bytes, Body},
    extract::{FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

/// The page/limit pair a list endpoint actually served, for the response envelope.
pub fn served_page(state: &AppState, page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    page_bounds(
        page.unwrap_or(1),
        state.config.page_size(limit),
        state.config.max_page_size,
    )
}

/// JSON body that may be left out entirely. An empty body yields
/// `T::default()`; anything else must be valid JSON for `T` or the request
/// fails with 400.
#[derive(Debug, Clone, Default)]
pub struct OptionalJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|e| ServiceError::InvalidInput(format!("Could not read request body: {}", e)))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let request = Request::from_parts(parts, Body::from(bytes));
        let Json(value) = Json::<T>::from_request(request, state)
            .await
            .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Raw file body with its stored content type, offered as an attachment.
pub fn file_response(file: FileDownload) -> Response {
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        file.file_name.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Action {
        note: Option<String>,
        version: Option<i32>,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn empty_body_is_the_default() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let OptionalJson(action) = OptionalJson::<Action>::from_request(request, &()).await.unwrap();
        assert_eq!(action, Action::default());
    }

    #[tokio::test]
    async fn present_body_is_parsed() {
        let OptionalJson(action) =
            OptionalJson::<Action>::from_request(json_request(r#"{"version":3}"#), &())
                .await
                .unwrap();
        assert_eq!(action.version, Some(3));
    }

    #[tokio::test]
    async fn malformed_or_untyped_body_is_rejected() {
        let wrong_type = OptionalJson::<Action>::from_request(json_request(r#"{"version":1,"note":5}"#), &()).await;
        assert_matches!(wrong_type, Err(ServiceError::InvalidInput(_)));

        let no_content_type = Request::builder().body(Body::from(r#"{"version":1}"#)).unwrap();
        let rejected = OptionalJson::<Action>::from_request(no_content_type, &()).await;
        assert_matches!(rejected, Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn downloads_are_attachments() {
        let response = file_response(FileDownload {
            file_name: "proof \"v2\".png".into(),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"proof v2.png\""
        );
    }
}
