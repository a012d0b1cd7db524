//! Template syntax and rendering options, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GridplateError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Tags are written `<ns:name ...>`.
    pub tag_namespace: String,
    pub expression_begin: String,
    pub expression_end: String,
    pub metadata_marker: String,
    pub formula_begin: String,
    pub formula_end: String,
    /// Discover loops from bare collection references.
    pub implicit_collections: bool,
    /// Paths (and everything under them) never looped implicitly.
    pub no_implicit: Vec<String>,
    /// Paths (and everything under them) whose implicit loops are fixed.
    pub fixed_size: Vec<String>,
    pub max_depth: usize,
    /// Formula text for a reference whose cells are all gone.
    pub ref_error: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            tag_namespace: "t".to_string(),
            expression_begin: "${".to_string(),
            expression_end: "}".to_string(),
            metadata_marker: "?@".to_string(),
            formula_begin: "$[".to_string(),
            formula_end: "]".to_string(),
            implicit_collections: true,
            no_implicit: Vec::new(),
            fixed_size: Vec::new(),
            max_depth: 64,
            ref_error: "#REF!".to_string(),
        }
    }
}

impl TemplateConfig {
    pub fn is_no_implicit(&self, path: &str) -> bool {
        self.no_implicit.iter().any(|base| path_covers(base, path))
    }

    pub fn is_fixed_size(&self, path: &str) -> bool {
        self.fixed_size.iter().any(|base| path_covers(base, path))
    }

    /// Reset blank markers to their defaults. Returns one warning per reset.
    fn sanitize(&mut self) -> Vec<String> {
        let defaults = TemplateConfig::default();
        let mut warnings = Vec::new();
        let fields: [(&str, &mut String, String); 7] = [
            ("tag_namespace", &mut self.tag_namespace, defaults.tag_namespace),
            ("expression_begin", &mut self.expression_begin, defaults.expression_begin),
            ("expression_end", &mut self.expression_end, defaults.expression_end),
            ("metadata_marker", &mut self.metadata_marker, defaults.metadata_marker),
            ("formula_begin", &mut self.formula_begin, defaults.formula_begin),
            ("formula_end", &mut self.formula_end, defaults.formula_end),
            ("ref_error", &mut self.ref_error, defaults.ref_error),
        ];
        for (name, value, default) in fields {
            if value.trim().is_empty() {
                warnings.push(format!("{} must not be blank, using {:?}", name, default));
                *value = default;
            }
        }
        if self.max_depth == 0 {
            warnings.push(format!("max_depth must be positive, using {}", defaults.max_depth));
            self.max_depth = defaults.max_depth;
        }
        warnings
    }
}

/// `base` names `path` itself or one of its ancestors.
pub fn path_covers(base: &str, path: &str) -> bool {
    path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Parse config text. Unknown keys are errors.
pub fn parse_config(content: &str) -> Result<(TemplateConfig, Vec<String>)> {
    let mut config: TemplateConfig =
        toml::from_str(content).map_err(|e| GridplateError::Config(e.to_string()))?;
    let warnings = config.sanitize();
    Ok((config, warnings))
}

/// Load config from `path`, falling back to defaults with warnings instead of
/// failing. A missing file only warns when `required` is set.
pub fn load_config(path: &Path, required: bool) -> (TemplateConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !path.exists() {
        if required {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (TemplateConfig::default(), warnings);
    }

    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
            warnings.push(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ));
        }
        Ok(_) => match std::fs::read_to_string(path) {
            Ok(content) => match parse_config(&content) {
                Ok((config, parse_warnings)) => {
                    warnings.extend(parse_warnings);
                    return (config, warnings);
                }
                Err(err) => warnings.push(format!("Failed to parse {}: {}", path.display(), err)),
            },
            Err(err) => warnings.push(format!("Failed to read {}: {}", path.display(), err)),
        },
        Err(err) => warnings.push(format!(
            "Failed to read metadata for {}: {}",
            path.display(),
            err
        )),
    }

    (TemplateConfig::default(), warnings)
}
