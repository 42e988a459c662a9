//! SVG templates: placeholder substitution followed by inlining.
//!
//! Placeholders are written `{name}`. Literal braces, e.g. in a `<style>`
//! block, are written `{{` and `}}`.

use crate::fetch::FetchCache;
use crate::inline::Inliner;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Placeholder values available to every template unless overridden
pub const DEFAULT_VARS: &[(&str, &str)] = &[("text_dx", "0"), ("text_dy", "0")];

/// Placeholder name to value map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<String, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults (`text_dx` and `text_dy`, both `0`)
    pub fn defaults() -> Self {
        DEFAULT_VARS.iter().map(|(k, v)| (*k, *v)).collect()
    }

    /// Defaults with `self` layered on top; caller values win.
    pub fn with_defaults(&self) -> Self {
        let mut merged = Self::defaults();
        merged.0.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Replace every `{name}` in `template` with its value from `vars`.
pub fn substitute(template: &str, vars: &TemplateVars) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let offset = template.len() - tail.len();

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
            continue;
        }
        if tail.starts_with('}') {
            return Err(Error::TemplateError(format!("single '}}' at byte {}", offset)));
        }

        let field = &tail[1..];
        let close = match field.find(['{', '}']) {
            Some(i) if field.as_bytes()[i] == b'}' => i,
            _ => {
                return Err(Error::TemplateError(format!("unterminated placeholder at byte {}", offset)));
            }
        };

        let name = &field[..close];
        if name.is_empty() {
            return Err(Error::TemplateError(format!("empty placeholder at byte {}", offset)));
        }
        if name.contains([':', '!']) {
            return Err(Error::TemplateError(format!(
                "format specs and conversions are not supported in placeholder {{{}}}",
                name
            )));
        }
        let value = vars
            .get(name)
            .ok_or_else(|| Error::TemplateError(format!("no value for placeholder {{{}}}", name)))?;
        out.push_str(value);
        rest = &field[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Renders templates into self-contained SVG text
pub struct Renderer<'a> {
    inliner: Inliner<'a>,
}

impl<'a> Renderer<'a> {
    pub fn new(cache: &'a FetchCache) -> Self {
        Self {
            inliner: Inliner::new(cache),
        }
    }

    /// Load `template_path`, substitute `vars` over the defaults and inline
    /// remote references.
    pub fn render(&self, template_path: &Path, vars: &TemplateVars) -> Result<String> {
        let template = fs::read_to_string(template_path).map_err(|e| {
            Error::TemplateError(format!("cannot read template {}: {}", template_path.display(), e))
        })?;

        self.render_str(&template, vars).map_err(|e| match e {
            Error::TemplateError(msg) => Error::TemplateError(format!("{}: {}", template_path.display(), msg)),
            other => other,
        })
    }

    pub fn render_str(&self, template: &str, vars: &TemplateVars) -> Result<String> {
        let svg = substitute(template, &vars.with_defaults())?;
        self.inliner.inline(&svg)
    }
}
