use axum::{
    body::{Body, HttpBody, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

const MAX_LOGGED_BODY: usize = 64 * 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();

    // 过大或长度未知的 body 不读取，原样返回
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_LOGGED_BODY as u64);
    if !fits {
        error!(
            "Server error occurred - {} {} - Status: {}, Body: <not logged, larger than {} bytes or streamed>",
            method, uri, parts.status, MAX_LOGGED_BODY
        );
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body for {} {}: {}", method, uri, e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let body_str = String::from_utf8_lossy(&bytes);

    error!(
        "Server error occurred - {} {} - Status: {}, Body: {}",
        method, uri, parts.status, body_str
    );

    // 重置body以便重新构建响应
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
