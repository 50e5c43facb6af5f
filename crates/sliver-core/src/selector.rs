//! Block selection: deciding from a request whether only one block is wanted.
//!
//! The decision is a single pluggable operation, [`BlockSelector::select`].
//! [`ParamSelector`] implements the default convention (async request plus a
//! `__part__` parameter). Other conventions can be supplied as a
//! [`HeaderSelector`], a closure, or any type implementing the trait.

use crate::RequestInfo;
use serde::{Deserialize, Serialize};

/// Reserved parameter naming the block to render.
pub const PART_PARAM: &str = "__part__";

/// Outcome of inspecting a request for a block name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSelection {
    /// Not a partial request; render the whole document.
    #[default]
    Unset,

    /// Partial request carrying an empty block name.
    Empty,

    /// Partial request for the named block.
    Named(String),
}

impl BlockSelection {
    /// Map an optional raw value onto the tri-state.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            None => Self::Unset,
            Some("") => Self::Empty,
            Some(name) => Self::Named(name.to_string()),
        }
    }

    /// Whether a block (possibly the empty name) was selected.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// The selected block name; `Some("")` for [`BlockSelection::Empty`].
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Empty => Some(""),
            Self::Named(name) => Some(name),
        }
    }
}

/// Strategy computing the block selection for a request.
pub trait BlockSelector: Send + Sync {
    /// Inspect the request and decide which block, if any, to render.
    fn select(&self, request: &RequestInfo) -> BlockSelection;
}

impl<F> BlockSelector for F
where
    F: Fn(&RequestInfo) -> BlockSelection + Send + Sync,
{
    fn select(&self, request: &RequestInfo) -> BlockSelection {
        self(request)
    }
}

/// Reads the block name from a request parameter on async requests.
#[derive(Debug, Clone)]
pub struct ParamSelector {
    param: String,
}

impl ParamSelector {
    /// Use a custom parameter name.
    pub fn new(param: impl Into<String>) -> Self {
        Self { param: param.into() }
    }

    /// The parameter this selector reads.
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl Default for ParamSelector {
    fn default() -> Self {
        Self::new(PART_PARAM)
    }
}

impl BlockSelector for ParamSelector {
    fn select(&self, request: &RequestInfo) -> BlockSelection {
        if !request.is_async() {
            return BlockSelection::Unset;
        }
        BlockSelection::from_value(request.param(&self.param))
    }
}

/// Reads the block name from a dedicated header, PJAX style.
///
/// The presence of the header is the partial-request signal.
#[derive(Debug, Clone)]
pub struct HeaderSelector {
    header: String,
}

impl HeaderSelector {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }
}

impl BlockSelector for HeaderSelector {
    fn select(&self, request: &RequestInfo) -> BlockSelection {
        BlockSelection::from_value(request.header(&self.header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn get(path: &str) -> RequestInfo {
        RequestInfo::new(Method::GET, path)
    }

    #[test]
    fn test_tri_state() {
        assert_eq!(BlockSelection::from_value(None), BlockSelection::Unset);
        assert_eq!(BlockSelection::from_value(Some("")), BlockSelection::Empty);
        assert_eq!(
            BlockSelection::from_value(Some("content")),
            BlockSelection::Named("content".into())
        );
        assert!(!BlockSelection::Unset.is_set());
        assert!(BlockSelection::Empty.is_set());
        assert_eq!(BlockSelection::Empty.name(), Some(""));
    }

    #[test]
    fn test_param_selector_requires_async() {
        let selector = ParamSelector::default();
        assert_eq!(selector.select(&get("/?__part__=content")), BlockSelection::Unset);
        assert_eq!(
            selector.select(&get("/?__part__=content").ajax()),
            BlockSelection::Named("content".into())
        );
    }

    #[test]
    fn test_param_selector_absent_and_empty() {
        let selector = ParamSelector::default();
        assert_eq!(selector.select(&get("/").ajax()), BlockSelection::Unset);
        assert_eq!(selector.select(&get("/?__part__=").ajax()), BlockSelection::Empty);
    }

    #[test]
    fn test_custom_param() {
        let selector = ParamSelector::new("fragment");
        let request = get("/?fragment=list&__part__=content").ajax();
        assert_eq!(selector.select(&request), BlockSelection::Named("list".into()));
    }

    #[test]
    fn test_header_selector() {
        let selector = HeaderSelector::new("X-PJAX-Block");
        assert_eq!(selector.select(&get("/")), BlockSelection::Unset);
        assert_eq!(
            selector.select(&get("/").with_header("x-pjax-block", "main")),
            BlockSelection::Named("main".into())
        );
    }

    #[test]
    fn test_closure_selector() {
        let selector = |request: &RequestInfo| {
            BlockSelection::from_value(request.query_param("only"))
        };
        assert_eq!(
            BlockSelection::Named("a".into()),
            selector.select(&get("/?only=a"))
        );
    }
}
