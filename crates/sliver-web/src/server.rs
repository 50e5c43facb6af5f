use crate::{PartialRequest, WebError};
use axum::{
    body::Body,
    extract::State,
    http::{header::VARY, HeaderValue},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use sliver_core::{Renderer, RequestInfo, ResponseClass, TemplateView};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Shared state of every route: the renderer.
pub type AppState = Arc<Renderer>;

/// Request headers that decide between a page and a fragment.
const VARY_ON: &str = "X-Requested-With, HX-Request";

/// Route a [`TemplateView`] for GET and POST requests.
pub fn view<V: TemplateView>(view: V) -> MethodRouter<AppState> {
    let view = Arc::new(view);
    on(
        MethodFilter::GET.or(MethodFilter::POST),
        move |State(renderer): State<AppState>, PartialRequest(request): PartialRequest| {
            serve_view(Arc::clone(&view), renderer, request)
        },
    )
}

async fn serve_view<V: TemplateView>(
    view: Arc<V>,
    renderer: AppState,
    request: RequestInfo,
) -> Result<Response, WebError> {
    let response = view.get(renderer, request)?;
    let mut response = response.into_http()?;
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static(VARY_ON));
    Ok(response.map(Body::from).into_response())
}

/// HTTP server hosting template views.
pub struct SliverServer {
    renderer: AppState,
    router: Router<AppState>,
    static_dir: Option<PathBuf>,
}

impl SliverServer {
    pub fn new(renderer: AppState) -> Self {
        Self {
            renderer,
            router: Router::new(),
            static_dir: None,
        }
    }

    /// Mount a view at a path.
    pub fn route_view<V: TemplateView>(mut self, path: &str, v: V) -> Self {
        self.router = self.router.route(path, view(v));
        self
    }

    /// Serve a view for every path no other route matches.
    pub fn fallback_view<V: TemplateView>(mut self, v: V) -> Self {
        let v = Arc::new(v);
        self.router = self.router.fallback(
            move |State(renderer): State<AppState>, PartialRequest(request): PartialRequest| {
                serve_view(Arc::clone(&v), renderer, request)
            },
        );
        self
    }

    /// Serve files from `dir` under `/static`.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Assemble the final router.
    pub fn into_router(self) -> Router {
        let mut router = self.router;
        if let Some(dir) = self.static_dir {
            router = router.nest_service("/static", ServeDir::new(dir));
        }
        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.renderer)
    }

    pub async fn start(self, port: u16) -> std::io::Result<()> {
        let app = self.into_router();

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        tracing::info!("Sliver server available at http://localhost:{}", port);
        axum::serve(listener, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Request, StatusCode};
    use sliver_core::{BlockAware, PathTemplateView, SimpleTemplateView, TemplateContext, TemplateSet};
    use tower::ServiceExt;

    const PAGE: &str = r#"<html><body>{{#block "content"}}Hello {{name}}{{/block}}</body></html>"#;

    fn app() -> Router {
        let set = TemplateSet::new()
            .with_raw("page.html", PAGE)
            .unwrap()
            .with_raw("index.html", r#"<h1>{{#block "title"}}Home{{/block}}</h1>"#)
            .unwrap();
        let renderer = Arc::new(Renderer::new(set));
        let page = SimpleTemplateView::new("page.html")
            .with_context(TemplateContext::new().with("name", "Ada"));

        SliverServer::new(renderer)
            .route_view("/page", BlockAware(page.clone()))
            .route_view("/plain", page)
            .fallback_view(BlockAware(PathTemplateView::new()))
            .into_router()
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> axum::http::request::Builder {
        Request::builder().method("GET").uri(uri)
    }

    #[tokio::test]
    async fn test_full_page() {
        let (status, body) = send(get("/page?__part__=content").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html><body>Hello Ada</body></html>");
    }

    #[tokio::test]
    async fn test_ajax_block() {
        let request = get("/page?__part__=content")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello Ada");
    }

    #[tokio::test]
    async fn test_htmx_form_post() {
        let request = Request::builder()
            .method("POST")
            .uri("/page")
            .header("HX-Request", "true")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("__part__=content"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello Ada");
    }

    #[tokio::test]
    async fn test_unknown_block_is_not_found() {
        let request = get("/page?__part__=sidebar")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("sidebar"));
    }

    #[tokio::test]
    async fn test_plain_view_ignores_partial_request() {
        let request = get("/plain?__part__=content")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(request).await;
        assert_eq!(body, "<html><body>Hello Ada</body></html>");
    }

    #[tokio::test]
    async fn test_content_type() {
        let response = app()
            .oneshot(get("/page").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_responses_vary_on_async_headers() {
        for uri in ["/page", "/plain"] {
            let response = app()
                .oneshot(get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.headers()[header::VARY], "X-Requested-With, HX-Request");
        }
    }

    #[tokio::test]
    async fn test_oversized_form_is_payload_too_large() {
        let body = format!("__part__=content&pad={}", "x".repeat(2 * 1024 * 1024));
        let request = Request::builder()
            .method("POST")
            .uri("/page")
            .header("HX-Request", "true")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_fallback_path_view() {
        let (status, body) = send(get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Home</h1>");

        let request = get("/?__part__=title")
            .header("HX-Request", "true")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await.1, "Home");

        let (status, _) = send(get("/missing").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
