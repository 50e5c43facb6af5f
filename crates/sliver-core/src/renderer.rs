//! Renderer - the shared rendering service behind every response.
//!
//! Owns the template set, the handlebars registry, the site-wide block
//! selection convention and the context processors.

use crate::{
    BlockSelector, ContextProcessor, ParamSelector, RequestInfo, RequestProcessor,
    ResolvedTemplate, Result, SliverConfig, SliverError, TemplateContext, TemplateNames,
    TemplateSet,
};
use handlebars::{Handlebars, HelperDef};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Renders resolved templates, whole or one block at a time.
///
/// # Example
///
/// ```
/// use sliver_core::{Renderer, TemplateSet, TemplateContext};
///
/// let set = TemplateSet::new()
///     .with_raw("page.html", r#"<main>{{#block "content"}}Hello {{name}}{{/block}}</main>"#)
///     .unwrap();
/// let renderer = Renderer::new(set);
///
/// let template = renderer.resolve_template(&"page.html".into()).unwrap();
/// let context = TemplateContext::new().with("name", "Ada").into_value();
/// assert_eq!(renderer.render_block(&template, "content", &context).unwrap(), "Hello Ada");
/// ```
pub struct Renderer {
    /// Templates available for resolution.
    templates: TemplateSet,

    /// Handlebars registry used for expression evaluation.
    registry: Handlebars<'static>,

    /// Convention deciding whether a request asks for a single block.
    selector: Arc<dyn BlockSelector>,

    /// Processors run before the view's own context data.
    processors: Vec<Arc<dyn ContextProcessor>>,
}

impl Renderer {
    /// Create a renderer with the default `__part__` convention.
    pub fn new(templates: TemplateSet) -> Self {
        Self {
            templates,
            registry: Handlebars::new(),
            selector: Arc::new(ParamSelector::default()),
            processors: Vec::new(),
        }
    }

    /// Create a renderer configured from [`SliverConfig`].
    pub fn from_config(templates: TemplateSet, config: &SliverConfig) -> Self {
        let mut renderer = Self::new(templates)
            .with_strict_mode(config.strict_mode)
            .with_selector_arc(config.selector());

        if config.expose_request {
            renderer = renderer.with_processor(RequestProcessor);
        }
        renderer
    }

    /// Replace the block selection convention.
    pub fn with_selector(self, selector: impl BlockSelector + 'static) -> Self {
        self.with_selector_arc(Arc::new(selector))
    }

    fn with_selector_arc(mut self, selector: Arc<dyn BlockSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Add a context processor.
    pub fn with_processor(mut self, processor: impl ContextProcessor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Register a handlebars helper.
    pub fn with_helper(
        mut self,
        name: &str,
        helper: impl HelperDef + Send + Sync + 'static,
    ) -> Self {
        self.registry.register_helper(name, Box::new(helper));
        self
    }

    /// Fail on missing variables instead of rendering them empty.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.registry.set_strict_mode(strict);
        self
    }

    /// The template set.
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// The configured block selection convention.
    pub fn selector(&self) -> Arc<dyn BlockSelector> {
        Arc::clone(&self.selector)
    }

    /// Resolve one template name or a candidate list to a concrete template.
    pub fn resolve_template(&self, names: &TemplateNames) -> Result<Arc<ResolvedTemplate>> {
        self.templates.resolve(names)
    }

    /// Resolve view data into the final flat mapping.
    ///
    /// Processors run first; view data overrides their values.
    pub fn resolve_context(
        &self,
        request: Option<&RequestInfo>,
        data: &TemplateContext,
    ) -> Result<Value> {
        let mut context = TemplateContext::new();
        if let Some(request) = request {
            for processor in &self.processors {
                processor.process(request, &mut context)?;
            }
        }
        context.merge(data);
        Ok(context.into_value())
    }

    /// Render the whole document.
    #[instrument(skip(self, template, context), fields(template_name = %template.name()))]
    pub fn render_template(&self, template: &ResolvedTemplate, context: &Value) -> Result<String> {
        debug!("Rendering full template");
        self.evaluate(template.source(), context)
    }

    /// Render a single block of the document.
    ///
    /// Fails with [`SliverError::BlockNotFound`] if the block does not exist.
    #[instrument(skip(self, template, context), fields(template_name = %template.name()))]
    pub fn render_block(
        &self,
        template: &ResolvedTemplate,
        block: &str,
        context: &Value,
    ) -> Result<String> {
        let source = template
            .block_source(block)
            .ok_or_else(|| SliverError::BlockNotFound {
                block: block.to_string(),
                template: template.name().to_string(),
            })?;

        debug!("Rendering block '{}'", block);
        self.evaluate(&source, context)
    }

    /// Resolve and render in one call, optionally restricted to a block.
    pub fn render(
        &self,
        names: &TemplateNames,
        block: Option<&str>,
        data: &TemplateContext,
    ) -> Result<String> {
        let template = self.resolve_template(names)?;
        let context = self.resolve_context(None, data)?;
        match block {
            Some(block) => self.render_block(&template, block, &context),
            None => self.render_template(&template, &context),
        }
    }

    fn evaluate(&self, source: &str, context: &Value) -> Result<String> {
        self.registry
            .render_template(source, context)
            .map_err(|e| SliverError::Render(e.to_string()))
    }
}
