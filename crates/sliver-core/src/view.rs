//! Template views.
//!
//! A [`TemplateView`] names the template(s) to render and supplies context
//! data; its associated [`ResponseClass`] decides how the response renders.
//! Wrapping any view in [`BlockAware`] switches that response type to
//! [`PartialTemplateResponse`] without changing anything else.

use crate::{
    PartialTemplateResponse, Renderer, RequestInfo, ResponseClass, Result, TemplateContext,
    TemplateNames, TemplateResponse,
};
use std::sync::Arc;

/// A view that renders a template.
pub trait TemplateView: Send + Sync + 'static {
    /// Response type constructed by [`TemplateView::render_to_response`].
    type Response: ResponseClass;

    /// Template name, or candidates tried in order.
    fn template_names(&self, request: &RequestInfo) -> TemplateNames;

    /// Context data for the request.
    fn context_data(&self, _request: &RequestInfo) -> Result<TemplateContext> {
        Ok(TemplateContext::new())
    }

    /// Build the response with this view's response type.
    fn render_to_response(
        &self,
        renderer: Arc<Renderer>,
        request: RequestInfo,
        context: TemplateContext,
    ) -> Self::Response {
        let template = self.template_names(&request);
        Self::Response::build(renderer, request, template, context)
    }

    /// Handle a request: gather context and build the response.
    fn get(&self, renderer: Arc<Renderer>, request: RequestInfo) -> Result<Self::Response> {
        let context = self.context_data(&request)?;
        Ok(self.render_to_response(renderer, request, context))
    }
}

/// Makes the wrapped view build [`PartialTemplateResponse`]s.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sliver_core::{BlockAware, Renderer, RequestInfo, SimpleTemplateView, TemplateSet, TemplateView};
///
/// let set = TemplateSet::new()
///     .with_raw("page.html", r#"<body>{{#block "content"}}Hello{{/block}}</body>"#)
///     .unwrap();
/// let renderer = Arc::new(Renderer::new(set));
/// let view = BlockAware(SimpleTemplateView::new("page.html"));
///
/// let request = RequestInfo::new(http::Method::GET, "/?__part__=content").ajax();
/// let response = view.get(renderer, request).unwrap();
/// assert_eq!(response.rendered_content().unwrap(), "Hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockAware<V>(pub V);

impl<V: TemplateView> TemplateView for BlockAware<V> {
    type Response = PartialTemplateResponse;

    fn template_names(&self, request: &RequestInfo) -> TemplateNames {
        self.0.template_names(request)
    }

    fn context_data(&self, request: &RequestInfo) -> Result<TemplateContext> {
        self.0.context_data(request)
    }
}

/// Renders a fixed template with fixed context.
#[derive(Debug, Clone)]
pub struct SimpleTemplateView {
    template: TemplateNames,
    context: TemplateContext,
}

impl SimpleTemplateView {
    pub fn new(template: impl Into<TemplateNames>) -> Self {
        Self {
            template: template.into(),
            context: TemplateContext::new(),
        }
    }

    pub fn with_context(mut self, context: TemplateContext) -> Self {
        self.context = context;
        self
    }
}

impl TemplateView for SimpleTemplateView {
    type Response = TemplateResponse;

    fn template_names(&self, _request: &RequestInfo) -> TemplateNames {
        self.template.clone()
    }

    fn context_data(&self, _request: &RequestInfo) -> Result<TemplateContext> {
        Ok(self.context.clone())
    }
}

/// Maps the request path onto template names.
///
/// `/` becomes `index.html`; `/docs/intro` tries `docs/intro.html` and then
/// `docs/intro/index.html`.
#[derive(Debug, Clone)]
pub struct PathTemplateView {
    extension: String,
    context: TemplateContext,
}

impl PathTemplateView {
    pub fn new() -> Self {
        Self {
            extension: "html".to_string(),
            context: TemplateContext::new(),
        }
    }

    /// Use a different template file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Context shared by every page.
    pub fn with_context(mut self, context: TemplateContext) -> Self {
        self.context = context;
        self
    }
}

impl Default for PathTemplateView {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateView for PathTemplateView {
    type Response = TemplateResponse;

    fn template_names(&self, request: &RequestInfo) -> TemplateNames {
        let path = request.path.trim_matches('/');
        if path.is_empty() {
            return TemplateNames::from(format!("index.{}", self.extension));
        }
        TemplateNames::new([
            format!("{}.{}", path, self.extension),
            format!("{}/index.{}", path, self.extension),
        ])
    }

    fn context_data(&self, _request: &RequestInfo) -> Result<TemplateContext> {
        Ok(self.context.clone())
    }
}
