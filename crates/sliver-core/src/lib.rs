//! # Sliver Core
//!
//! Block-aware template responses for server-rendered pages.
//!
//! A view renders a template with a context. When the request is an async
//! (AJAX / htmx) request carrying a `__part__` parameter, a
//! [`PartialTemplateResponse`] renders only the named block of the template,
//! so a page fragment can be refreshed without re-rendering the document.
//!
//! ## Features
//!
//! - Named, nestable blocks and `extends` inheritance on top of handlebars
//! - Block selection decided once per response, as a pluggable strategy
//! - [`BlockAware`] view wrapper switching any view to partial responses
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sliver_core::{BlockAware, Renderer, RequestInfo, SimpleTemplateView, TemplateSet, TemplateView};
//!
//! let set = TemplateSet::new()
//!     .with_raw("page.html", r#"<html>{{#block "content"}}Hello{{/block}}</html>"#)?;
//! let renderer = Arc::new(Renderer::new(set));
//! let view = BlockAware(SimpleTemplateView::new("page.html"));
//!
//! let full = view.get(renderer.clone(), RequestInfo::new(http::Method::GET, "/"))?;
//! assert_eq!(full.rendered_content()?, "<html>Hello</html>");
//!
//! let partial = view.get(renderer, RequestInfo::new(http::Method::GET, "/?__part__=content").ajax())?;
//! assert_eq!(partial.rendered_content()?, "Hello");
//! # Ok::<(), sliver_core::SliverError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod renderer;
pub mod request;
pub mod response;
pub mod selector;
pub mod template;
pub mod view;

pub use config::SliverConfig;
pub use context::{ContextProcessor, RequestProcessor, TemplateContext};
pub use error::{Result, SliverError};
pub use loader::{TemplateNames, TemplateSet};
pub use renderer::Renderer;
pub use request::RequestInfo;
pub use response::{PartialTemplateResponse, ResponseClass, TemplateResponse};
pub use selector::{BlockSelection, BlockSelector, HeaderSelector, ParamSelector, PART_PARAM};
pub use template::{ResolvedTemplate, Template};
pub use view::{BlockAware, PathTemplateView, SimpleTemplateView, TemplateView};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        BlockAware, BlockSelection, BlockSelector, PartialTemplateResponse, Renderer,
        RequestInfo, ResponseClass, Result, SliverConfig, SliverError, TemplateContext,
        TemplateResponse, TemplateView,
    };
}
