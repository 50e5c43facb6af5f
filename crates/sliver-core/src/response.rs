//! Templated responses.
//!
//! [`TemplateResponse`] renders its whole template. [`PartialTemplateResponse`]
//! decides once, at construction, whether the request asked for a single
//! block, and renders only that block when it did.
//!
//! Rendering is lazy: content is produced when [`ResponseClass::rendered_content`]
//! is read, so the context and template may still be adjusted after the
//! response is built.

use crate::{
    BlockSelection, BlockSelector, Renderer, RequestInfo, ResolvedTemplate, Result,
    TemplateContext, TemplateNames,
};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;

/// Content type used when a response does not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A response type a view can construct from its template and context.
pub trait ResponseClass: Sized + Send {
    /// Construct the response for a request.
    fn build(
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: TemplateNames,
        context: TemplateContext,
    ) -> Self;

    /// The plain templated response underneath.
    fn base(&self) -> &TemplateResponse;

    /// Render the body. Safe to call repeatedly.
    fn rendered_content(&self) -> Result<String>;

    /// Render and assemble the final HTTP response.
    fn into_http(self) -> Result<http::Response<String>> {
        let body = self.rendered_content()?;
        let base = self.base();

        let mut response = http::Response::new(body);
        *response.status_mut() = base.status;
        *response.headers_mut() = base.headers.clone();
        if !response.headers().contains_key(CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
        Ok(response)
    }
}

/// Renders a whole template with its context.
pub struct TemplateResponse {
    renderer: Arc<Renderer>,
    request: RequestInfo,
    template: TemplateNames,
    context: TemplateContext,
    status: StatusCode,
    headers: HeaderMap,
}

impl TemplateResponse {
    pub fn new(
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: impl Into<TemplateNames>,
        context: TemplateContext,
    ) -> Self {
        Self {
            renderer,
            request,
            template: template.into(),
            context,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Set the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The request this response was created for.
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn template(&self) -> &TemplateNames {
        &self.template
    }

    pub fn set_template(&mut self, template: impl Into<TemplateNames>) {
        self.template = template.into();
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    /// Context data, still mutable until the content is rendered.
    pub fn context_mut(&mut self) -> &mut TemplateContext {
        &mut self.context
    }

    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    /// Resolve the template names to one concrete template.
    pub fn resolve_template(&self) -> Result<Arc<ResolvedTemplate>> {
        self.renderer.resolve_template(&self.template)
    }

    /// Resolve the context data to its final mapping.
    pub fn resolve_context(&self) -> Result<Value> {
        self.renderer.resolve_context(Some(&self.request), &self.context)
    }

    /// Render the whole template.
    pub fn rendered_content(&self) -> Result<String> {
        let template = self.resolve_template()?;
        let context = self.resolve_context()?;
        self.renderer.render_template(&template, &context)
    }
}

impl ResponseClass for TemplateResponse {
    fn build(
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: TemplateNames,
        context: TemplateContext,
    ) -> Self {
        Self::new(renderer, request, template, context)
    }

    fn base(&self) -> &TemplateResponse {
        self
    }

    fn rendered_content(&self) -> Result<String> {
        TemplateResponse::rendered_content(self)
    }
}

/// A templated response that renders a single block on partial requests.
///
/// The block selection is computed once from the request, before the
/// underlying response is built, and never changes afterwards.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sliver_core::{PartialTemplateResponse, Renderer, RequestInfo, TemplateContext, TemplateSet};
///
/// let set = TemplateSet::new()
///     .with_raw("page.html", r#"<body>{{#block "content"}}Hello{{/block}}</body>"#)
///     .unwrap();
/// let renderer = Arc::new(Renderer::new(set));
///
/// let request = RequestInfo::new(http::Method::GET, "/?__part__=content").ajax();
/// let response = PartialTemplateResponse::new(renderer, request, "page.html", TemplateContext::new());
/// assert_eq!(response.rendered_content().unwrap(), "Hello");
/// ```
pub struct PartialTemplateResponse {
    base: TemplateResponse,
    block: BlockSelection,
}

impl PartialTemplateResponse {
    /// Build using the renderer's block selection convention.
    pub fn new(
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: impl Into<TemplateNames>,
        context: TemplateContext,
    ) -> Self {
        let selector = renderer.selector();
        Self::with_selector(selector.as_ref(), renderer, request, template, context)
    }

    /// Build using an explicit block selection convention.
    pub fn with_selector(
        selector: &dyn BlockSelector,
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: impl Into<TemplateNames>,
        context: TemplateContext,
    ) -> Self {
        let block = selector.select(&request);
        debug!("Block selection for {}: {:?}", request.path, block);

        Self {
            base: TemplateResponse::new(renderer, request, template, context),
            block,
        }
    }

    /// The block chosen at construction.
    pub fn block(&self) -> &BlockSelection {
        &self.block
    }

    /// Render the selected block, or the whole template if none was selected.
    pub fn rendered_content(&self) -> Result<String> {
        let Some(block) = self.block.name() else {
            return self.base.rendered_content();
        };

        let template = self.base.resolve_template()?;
        let context = self.base.resolve_context()?;
        self.base.renderer.render_block(&template, block, &context)
    }

    /// Unwrap into the plain response, dropping the selection.
    pub fn into_inner(self) -> TemplateResponse {
        self.base
    }
}

impl Deref for PartialTemplateResponse {
    type Target = TemplateResponse;

    fn deref(&self) -> &TemplateResponse {
        &self.base
    }
}

impl DerefMut for PartialTemplateResponse {
    fn deref_mut(&mut self) -> &mut TemplateResponse {
        &mut self.base
    }
}

impl ResponseClass for PartialTemplateResponse {
    fn build(
        renderer: Arc<Renderer>,
        request: RequestInfo,
        template: TemplateNames,
        context: TemplateContext,
    ) -> Self {
        Self::new(renderer, request, template, context)
    }

    fn base(&self) -> &TemplateResponse {
        &self.base
    }

    fn rendered_content(&self) -> Result<String> {
        PartialTemplateResponse::rendered_content(self)
    }
}
