//! HTTP surface: every path and method goes to the thumbnail endpoint,
//! optionally behind a static file layer over the thumbnail root.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::handler::Handler;
use axum::http::{header, HeaderValue, Uri};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use thumbgate_core::{Thumbgate, ThumbnailResponse};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// With `server.serve_static`, existing thumbnails are served straight from
/// the thumbnail root and only misses reach the generator, which is what
/// makes the generate-then-redirect round trip terminate. Dot-prefixed path
/// segments (including in-flight `.thumbgate-*` temp files) are never served
/// statically.
pub fn router(gate: Arc<Thumbgate>) -> Router {
    let serve_static = gate.config().server.serve_static;
    let thumb_root = gate.config().thumb_root();

    let router = if serve_static {
        let generator = handle_thumbnail.with_state(Arc::clone(&gate));
        let static_files = ServeDir::new(thumb_root)
            .append_index_html_on_directories(false)
            .call_fallback_on_method_not_allowed(true)
            .fallback(generator);
        Router::new()
            .fallback_service(static_files)
            .layer(middleware::from_fn_with_state(Arc::clone(&gate), hide_dotfiles))
    } else {
        Router::new().fallback(handle_thumbnail).with_state(gate)
    };

    router.layer(TraceLayer::new_for_http())
}

/// Send dot-prefixed paths straight to the endpoint, bypassing `ServeDir`.
async fn hide_dotfiles(
    State(gate): State<Arc<Thumbgate>>,
    request: Request,
    next: Next,
) -> Response {
    if has_dot_segment(request.uri().path()) {
        let uri = request.uri().clone();
        return handle_thumbnail(State(gate), uri).await;
    }
    next.run(request).await
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    })
}

/// Feed the raw request URI (path + query) to the endpoint.
async fn handle_thumbnail(State(gate): State<Arc<Thumbgate>>, uri: Uri) -> Response {
    let request_uri = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    into_http_response(gate.handle(request_uri).await)
}

fn into_http_response(resp: ThumbnailResponse) -> Response {
    let mut response = Response::new(Body::from(resp.body));
    *response.status_mut() = resp.status;

    let headers = response.headers_mut();
    if let Some(content_type) = resp.content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    if let Some(location) = resp.location {
        match HeaderValue::from_str(&location) {
            Ok(value) => {
                headers.insert(header::LOCATION, value);
            }
            Err(e) => tracing::warn!("Dropping unrepresentable Location {:?}: {}", location, e),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request, StatusCode};
    use image::DynamicImage;
    use tempfile::TempDir;
    use thumbgate_core::{Config, Transform, TransformDescriptor};
    use tower::ServiceExt;

    struct Fixture {
        _tmp: TempDir,
        gate: Arc<Thumbgate>,
    }

    fn fixture(serve_static: bool) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let images = tmp.path().join("images");
        let thumbs = tmp.path().join("thumbs");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&thumbs).unwrap();
        DynamicImage::new_rgb8(600, 800)
            .save(images.join("4238_bpM4oOcw.png"))
            .unwrap();

        let mut config = Config::default();
        config.signing.secret_key = "test-secret".into();
        config.storage.image_root = images;
        config.storage.thumb_root = thumbs;
        config.server.serve_static = serve_static;
        Fixture {
            _tmp: tmp,
            gate: Arc::new(Thumbgate::new(config).unwrap()),
        }
    }

    fn signed_uri(gate: &Thumbgate) -> String {
        let mut d = TransformDescriptor {
            id: "4238".into(),
            hash: "bpM4oOcw".into(),
            width: 150,
            height: 200,
            transform: Transform::Scale,
            extension: "png".into(),
            signature: String::new(),
        };
        d.signature = gate.signer().sign(&d);
        d.to_request_uri()
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_root_is_forbidden() {
        let fx = fixture(true);
        let resp = send(router(fx.gate.clone()), Method::GET, "/").await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_generate_then_serve_static() {
        let fx = fixture(true);
        let uri = signed_uri(&fx.gate);

        let first = send(router(fx.gate.clone()), Method::GET, &uri).await;
        assert_eq!(first.status(), StatusCode::FOUND);
        assert_eq!(first.headers()[header::LOCATION], uri.as_str());

        let second = send(router(fx.gate.clone()), Method::GET, &uri).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_method_agnostic() {
        let fx = fixture(false);
        let uri = signed_uri(&fx.gate);
        for method in [Method::GET, Method::POST, Method::DELETE] {
            let resp = send(router(fx.gate.clone()), method.clone(), &uri).await;
            assert_eq!(resp.status(), StatusCode::FOUND, "{method}");
        }
    }

    #[test]
    fn test_has_dot_segment() {
        assert!(has_dot_segment("/.thumbgate-a1b2c3.png"));
        assert!(has_dot_segment("/%2Ethumbgate-a1b2c3.png"));
        assert!(has_dot_segment("/sub/.hidden"));
        assert!(!has_dot_segment("/4238_bpM4oOcw_150x200_s.png"));
        assert!(!has_dot_segment("/"));
    }

    #[tokio::test]
    async fn test_temp_files_are_not_served() {
        let fx = fixture(true);
        let thumbs = fx.gate.config().thumb_root();
        std::fs::write(thumbs.join(".thumbgate-a1b2c3.png"), b"partial").unwrap();

        for uri in ["/.thumbgate-a1b2c3.png", "/%2ethumbgate-a1b2c3.png"] {
            let resp = send(router(fx.gate.clone()), Method::GET, uri).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_bad_signature_is_not_found() {
        let fx = fixture(true);
        let resp = send(
            router(fx.gate.clone()),
            Method::GET,
            "/4238_bpM4oOcw_150x200_s.png?000000000000000000000000",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain");
    }
}
