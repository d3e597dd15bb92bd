//! Tool declarations.

use crate::schema::ParameterSchema;
use serde::{Deserialize, Serialize};
use wire::ToolDef;

/// One registered tool: what the model sees plus where calls go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Unique, case-sensitive tool name.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Name of the backend that executes this tool.
    pub backend: String,

    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ToolDeclaration {
    /// Render as the wire-level function tool advertised to the model.
    pub fn to_wire(&self) -> ToolDef {
        ToolDef::function(&self.name, &self.description, self.parameters.to_value())
    }
}
