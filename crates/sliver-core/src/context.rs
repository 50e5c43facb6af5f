//! Render context for templates.
//!
//! A [`TemplateContext`] is the data a view hands to its response. Before
//! rendering, the renderer resolves it into a flat JSON object, running any
//! registered [`ContextProcessor`]s first so view data can override them.

use crate::{RequestInfo, Result, SliverError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value data available to a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateContext {
    values: Map<String, Value>,
}

impl TemplateContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(SliverError::Context(format!(
                "expected an object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Build a context from any serializable struct or map.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(data)?)
    }

    /// Set a value, builder style.
    ///
    /// # Example
    ///
    /// ```
    /// use sliver_core::TemplateContext;
    ///
    /// let ctx = TemplateContext::new().with("title", "Home").with("count", 3);
    /// assert_eq!(ctx.get("count"), Some(&serde_json::json!(3)));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a serializable value.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay another context; its values win.
    pub fn merge(&mut self, other: &TemplateContext) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// The final flat mapping handed to the template engine.
    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// Adds request-derived values to every render context.
pub trait ContextProcessor: Send + Sync {
    /// Contribute values for this request.
    fn process(&self, request: &RequestInfo, context: &mut TemplateContext) -> Result<()>;
}

/// Exposes a summary of the request under the `request` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestProcessor;

impl ContextProcessor for RequestProcessor {
    fn process(&self, request: &RequestInfo, context: &mut TemplateContext) -> Result<()> {
        context.insert("request", &request.summary())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_builder() {
        let ctx = TemplateContext::new()
            .with("title", "Home")
            .with("items", json!(["a", "b"]));

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("title"), Some(&json!("Home")));
        assert_eq!(ctx.into_value(), json!({"title": "Home", "items": ["a", "b"]}));
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(TemplateContext::from_value(json!({"a": 1})).is_ok());
        assert!(TemplateContext::from_value(Value::Null).unwrap().is_empty());
        assert!(matches!(
            TemplateContext::from_value(json!([1, 2])),
            Err(SliverError::Context(_))
        ));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = TemplateContext::new().with("a", 1).with("b", 1);
        base.merge(&TemplateContext::new().with("b", 2));
        assert_eq!(base.get("a"), Some(&json!(1)));
        assert_eq!(base.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_request_processor() {
        let request = RequestInfo::new(http::Method::GET, "/docs?tab=api").ajax();
        let mut ctx = TemplateContext::new();
        RequestProcessor.process(&request, &mut ctx).unwrap();

        let summary = ctx.get("request").unwrap();
        assert_eq!(summary["path"], json!("/docs"));
        assert_eq!(summary["method"], json!("GET"));
        assert_eq!(summary["is_async"], json!(true));
        assert_eq!(summary["query"]["tab"], json!("api"));
    }
}
