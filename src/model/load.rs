use super::types::{Capability, CandidateDeclaration, TypeCapabilities};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Declared capabilities of one host type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

/// A serialized snapshot of the host program: its types and candidate declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramModel {
    /// Compilation unit name, used in the generated file header
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeInfo>,
    #[serde(default)]
    pub candidates: Vec<CandidateDeclaration>,
    #[serde(skip)]
    index: HashMap<String, HashSet<Capability>>,
}

impl ProgramModel {
    /// Build a model from in-memory parts
    pub fn new(types: Vec<TypeInfo>, candidates: Vec<CandidateDeclaration>) -> Self {
        let mut model = ProgramModel {
            name: None,
            types,
            candidates,
            index: HashMap::new(),
        };
        model.rebuild_index();
        model
    }

    /// Register (or extend) a type's capabilities
    pub fn declare_type(&mut self, name: impl Into<String>, capabilities: &[Capability]) {
        let name = name.into();
        match self.types.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.capabilities.extend_from_slice(capabilities),
            None => self.types.push(TypeInfo {
                name,
                capabilities: capabilities.to_vec(),
            }),
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for info in &self.types {
            self.index
                .entry(info.name.clone())
                .or_default()
                .extend(info.capabilities.iter().copied());
        }
    }

    /// Display name of the compilation unit
    #[must_use]
    pub fn unit_name(&self) -> &str {
        self.name.as_deref().unwrap_or("handlers")
    }
}

impl TypeCapabilities for ProgramModel {
    fn satisfies(&self, ty: &str, capability: Capability) -> bool {
        self.index
            .get(ty.trim())
            .is_some_and(|caps| caps.contains(&capability))
    }
}

/// Parse a program model from a string; `yaml` selects the YAML parser, JSON otherwise
pub fn parse_model(content: &str, yaml: bool) -> anyhow::Result<ProgramModel> {
    let mut model: ProgramModel = if yaml {
        serde_yaml::from_str(content).context("Failed to parse program model as YAML")?
    } else {
        serde_json::from_str(content).context("Failed to parse program model as JSON")?
    };
    model.rebuild_index();
    Ok(model)
}

/// Load a program model manifest (YAML or JSON, chosen by extension)
pub fn load_model(path: &Path) -> anyhow::Result<ProgramModel> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program model: {:?}", path))?;
    let yaml = path
        .extension()
        .map(|s| s == "yaml" || s == "yml")
        .unwrap_or(false);
    let model = parse_model(&content, yaml)
        .with_context(|| format!("Invalid program model: {:?}", path))?;
    info!(
        path = %path.display(),
        types = model.types.len(),
        candidates = model.candidates.len(),
        "Loaded program model"
    );
    debug!(unit = model.unit_name(), "Program model unit");
    Ok(model)
}
