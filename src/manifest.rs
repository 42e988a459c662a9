//! Icon manifest: icon name to template source and variables.
//!
//! ```toml
//! [pin]
//! src = "pin.svg"
//! var = { text_dx = 3, label = "P" }
//! ```
//!
//! A manifest with a `.json` extension is read as JSON of the same shape.

use crate::template::TemplateVars;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ManifestFormat::Json,
            _ => ManifestFormat::Toml,
        }
    }
}

/// A scalar variable value as written in the manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Floats keep their decimal point (`1.0`); booleans render as `True`/`False`.
impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Str(s) => f.write_str(s),
            VarValue::Int(i) => write!(f, "{}", i),
            VarValue::Float(x) => write!(f, "{:?}", x),
            VarValue::Bool(true) => f.write_str("True"),
            VarValue::Bool(false) => f.write_str("False"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    src: String,
    #[serde(default)]
    var: BTreeMap<String, VarValue>,
}

/// One icon to generate
#[derive(Debug, Clone, PartialEq)]
pub struct IconDefinition {
    /// Output file stem
    pub name: String,
    /// Template path, already resolved against the manifest directory
    pub template_path: PathBuf,
    /// Caller variables (defaults are merged at render time)
    pub variables: TemplateVars,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    /// Icons in name order
    pub icons: Vec<IconDefinition>,
}

impl Manifest {
    /// Load a manifest file; template paths resolve relative to its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::ManifestError(format!("cannot read {}: {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        Self::parse(&text, ManifestFormat::from_path(path), base_dir).map_err(|e| match e {
            Error::ManifestError(msg) => Error::ManifestError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(text: &str, format: ManifestFormat, base_dir: &Path) -> Result<Self> {
        let entries: BTreeMap<String, RawEntry> = match format {
            ManifestFormat::Toml => toml::from_str(text).map_err(|e| Error::ManifestError(e.to_string()))?,
            ManifestFormat::Json => serde_json::from_str(text).map_err(|e| Error::ManifestError(e.to_string()))?,
        };

        let icons = entries
            .into_iter()
            .map(|(name, entry)| -> Result<IconDefinition> {
                validate_name(&name)?;
                if entry.src.trim().is_empty() {
                    return Err(Error::ManifestError(format!("icon {:?} has an empty src", name)));
                }
                Ok(IconDefinition {
                    template_path: base_dir.join(&entry.src),
                    variables: entry.var.iter().map(|(k, v)| (k.as_str(), v.to_string())).collect(),
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { icons })
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

// Names become file stems in the output directory.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::ManifestError(format!("icon name {:?} is not a valid file name", name)));
    }
    Ok(())
}
