//! Template registry and string-interpolation templates.
//!
//! Templates and layouts are plain render functions registered by name.
//! File-based templates use `{{ variable }}` interpolation rather than a
//! full template engine.

use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;

use crate::render::RenderContext;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),

    /// Templates and layouts need a non-empty name.
    #[error("invalid template name: {0:?}")]
    InvalidName(String),

    /// A render function reported a failure.
    #[error("{0}")]
    Render(String),

    /// A render function panicked.
    #[error("template panicked: {0}")]
    Panic(String),
}

impl TemplateError {
    /// Create a render error from any message.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// A page template: renders the body for a page or listing.
pub type TemplateFn = Arc<dyn Fn(&RenderContext<'_>) -> Result<String> + Send + Sync>;

/// A layout: wraps a rendered body into a full document.
pub type LayoutFn = Arc<dyn Fn(&RenderContext<'_>, &str) -> Result<String> + Send + Sync>;

/// Template context with variables for interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A template that supports variable interpolation.
///
/// Variables are written `{{ name }}`; `{{ name? }}` renders empty when the
/// variable is absent. Substituted values are never re-scanned.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template with the given context.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut result = self.content.clone();
        let mut pos = 0;

        while let Some(start) = result[pos..].find("{{") {
            let start = pos + start;
            let end = result[start..]
                .find("}}")
                .ok_or_else(|| TemplateError::InvalidSyntax("unclosed {{ delimiter".to_string()))?;
            let end = start + end + 2;

            let var_name = result[start + 2..end - 2].trim();

            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped.trim(), true),
                None => (var_name, false),
            };

            let value = match context.get(var_name) {
                Some(v) => v.to_string(),
                None if optional => String::new(),
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            };

            result.replace_range(start..end, &value);
            pos = start + value.len();
        }

        Ok(result)
    }
}

/// Named templates and layouts.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateFn>,
    layouts: HashMap<String, LayoutFn>,
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.template_names())
            .field("layouts", &self.layout_names())
            .finish()
    }
}

impl TemplateRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with the same name.
    pub fn register_template<F>(&mut self, name: impl Into<String>, template: F) -> Result<()>
    where
        F: Fn(&RenderContext<'_>) -> Result<String> + Send + Sync + 'static,
    {
        let name = valid_name(name.into())?;
        self.templates.insert(name, Arc::new(template));
        Ok(())
    }

    /// Register a layout, replacing any previous one with the same name.
    pub fn register_layout<F>(&mut self, name: impl Into<String>, layout: F) -> Result<()>
    where
        F: Fn(&RenderContext<'_>, &str) -> Result<String> + Send + Sync + 'static,
    {
        let name = valid_name(name.into())?;
        self.layouts.insert(name, Arc::new(layout));
        Ok(())
    }

    pub(crate) fn insert_builtin(&mut self, name: &'static str, template: TemplateFn) {
        self.templates.insert(name.to_string(), template);
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&TemplateFn> {
        self.templates.get(name)
    }

    #[must_use]
    pub fn layout(&self, name: &str) -> Option<&LayoutFn> {
        self.layouts.get(name)
    }

    /// Registered template names, sorted.
    #[must_use]
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered layout names, sorted.
    #[must_use]
    pub fn layout_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.layouts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Remove all templates and layouts.
    pub fn clear(&mut self) {
        self.templates.clear();
        self.layouts.clear();
    }
}

fn valid_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        Err(TemplateError::InvalidName(name))
    } else {
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_interpolation() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let ctx = TemplateContext::new().with_var("name", "World");
        assert_eq!(template.render(&ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_multiple_variables() {
        let template = Template::new("test", "{{ greeting }}, {{name}}!");
        let ctx = TemplateContext::new()
            .with_var("greeting", "Hi")
            .with_var("name", "there");
        assert_eq!(template.render(&ctx).unwrap(), "Hi, there!");
    }

    #[test]
    fn test_optional_variable() {
        let template = Template::new("test", "Hello{{ suffix? }}!");
        let ctx = TemplateContext::new();
        assert_eq!(template.render(&ctx).unwrap(), "Hello!");
    }

    #[test]
    fn test_missing_required_variable() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let result = template.render(&TemplateContext::new());
        assert!(matches!(result, Err(TemplateError::MissingVariable(name)) if name == "name"));
    }

    #[test]
    fn test_unclosed_delimiter() {
        let template = Template::new("test", "Hello, {{ name");
        let result = template.render(&TemplateContext::new().with_var("name", "x"));
        assert!(matches!(result, Err(TemplateError::InvalidSyntax(_))));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = Template::new("test", "{{ a }}{{ b }}");
        let ctx = TemplateContext::new()
            .with_var("a", "{{ b }}")
            .with_var("b", "x");
        assert_eq!(template.render(&ctx).unwrap(), "{{ b }}x");
    }

    #[test]
    fn test_registry_rejects_empty_name() {
        let mut registry = TemplateRegistry::new();
        let result = registry.register_template("  ", |_| Ok(String::new()));
        assert!(matches!(result, Err(TemplateError::InvalidName(_))));
        let result = registry.register_layout("", |_, body| Ok(body.to_string()));
        assert!(matches!(result, Err(TemplateError::InvalidName(_))));
        assert!(registry.template_names().is_empty());
    }

    #[test]
    fn test_registry_replaces_by_name() {
        let mut registry = TemplateRegistry::new();
        registry.register_template("b", |_| Ok("one".into())).unwrap();
        registry.register_template("a", |_| Ok("two".into())).unwrap();
        registry.register_template("b", |_| Ok("three".into())).unwrap();

        assert_eq!(registry.template_names(), vec!["a", "b"]);
        assert!(registry.template("b").is_some());
        assert!(registry.template("missing").is_none());

        registry.clear();
        assert!(registry.template_names().is_empty());
    }
}
