//! Response template loading
//!
//! Templates load from YAML or JSON files with a `templates` array of
//! `{type, trigger, text}` objects. A default set is compiled in.

use std::path::Path;

use kiosk_agent_core::ResponseTemplate;
use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

const BUNDLED_TEMPLATES: &str = include_str!("../data/response_templates.yaml");

/// Template file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    pub templates: Vec<ResponseTemplate>,
}

impl TemplateFile {
    /// Templates shipped with the crate
    pub fn bundled() -> Result<Self> {
        serde_yaml::from_str(BUNDLED_TEMPLATES)
            .map_err(|e| RagError::Load(format!("bundled templates: {}", e)))
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Load(format!("Failed to read {}: {}", path.display(), e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file: TemplateFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Load(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Load(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Load(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            },
        };

        if let Some(empty) = file
            .templates
            .iter()
            .find(|t| t.trigger.trim().is_empty() || t.text.trim().is_empty())
        {
            return Err(RagError::Load(format!(
                "{} template with empty trigger or text",
                empty.kind
            )));
        }

        tracing::info!(
            file = %path.display(),
            templates = file.templates.len(),
            "Loaded response templates"
        );
        Ok(file)
    }

    /// Load `path` when given, else the bundled set
    pub fn from_path_or_bundled(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::bundled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_agent_core::TemplateKind;
    use std::io::Write;

    #[test]
    fn test_bundled_templates_cover_every_kind() {
        let file = TemplateFile::bundled().unwrap();
        for kind in [
            TemplateKind::Greeting,
            TemplateKind::Farewell,
            TemplateKind::Casual,
            TemplateKind::AdditionalOrder,
            TemplateKind::OrderComplete,
        ] {
            assert!(
                file.templates.iter().any(|t| t.kind == kind),
                "missing {}",
                kind
            );
        }
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "templates:\n  - type: casual\n    trigger: 콘센트 있나요\n    text: 창가 자리에 있습니다."
        )
        .unwrap();

        let loaded = TemplateFile::load(file.path()).unwrap();
        assert_eq!(loaded.templates.len(), 1);
        assert_eq!(loaded.templates[0].kind, TemplateKind::Casual);
        assert_eq!(loaded.templates[0].score, None);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"templates": [{{"type": "farewell", "trigger": "잘 가요", "text": "안녕히 가세요!"}}]}}"#
        )
        .unwrap();

        let loaded = TemplateFile::load(file.path()).unwrap();
        assert_eq!(loaded.templates[0].kind, TemplateKind::Farewell);
    }

    #[test]
    fn test_invalid_files_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "templates:\n  - type: unknown_kind\n    trigger: a\n    text: b").unwrap();
        assert!(TemplateFile::load(file.path()).is_err());

        let txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(TemplateFile::load(txt.path()).is_err());
        assert!(TemplateFile::load("/nonexistent/templates.yaml").is_err());
    }
}
