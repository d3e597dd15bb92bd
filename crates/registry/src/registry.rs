//! The reloadable tool registry.

use crate::declaration::ToolDeclaration;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An immutable set of tool declarations.
///
/// Declaration order is preserved so capability advertisement is
/// deterministic.
#[derive(Debug, Default)]
pub struct ToolSet {
    tools: Vec<Arc<ToolDeclaration>>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    /// Build a set, rejecting duplicate names.
    pub fn new(declarations: Vec<ToolDeclaration>) -> Result<Self> {
        let mut tools = Vec::with_capacity(declarations.len());
        let mut index = HashMap::with_capacity(declarations.len());

        for declaration in declarations {
            if index.contains_key(&declaration.name) {
                return Err(Error::DuplicateTool(declaration.name));
            }
            index.insert(declaration.name.clone(), tools.len());
            tools.push(Arc::new(declaration));
        }

        Ok(Self { tools, index })
    }

    /// Case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<Arc<ToolDeclaration>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn list(&self) -> &[Arc<ToolDeclaration>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeclarationFile {
    #[serde(default, rename = "tool")]
    tools: Vec<ToolDeclaration>,
}

/// Shared, atomically-reloadable registry handle.
///
/// Readers take an [`Arc`] snapshot of the current set; [`Registry::reload`]
/// swaps the whole set in one store, so concurrent resolutions never see a
/// partially-updated registry.
#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Arc<ToolSet>>,
}

impl Registry {
    pub fn new(set: ToolSet) -> Self {
        Self {
            inner: RwLock::new(Arc::new(set)),
        }
    }

    /// Create a registry with no tools.
    pub fn empty() -> Self {
        Self::new(ToolSet::default())
    }

    /// Load declarations from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse declarations from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        Ok(Self::new(parse_set(toml)?))
    }

    /// Snapshot the current set. A dispatch batch resolves every call
    /// against one snapshot so a concurrent reload cannot split it.
    pub fn snapshot(&self) -> Arc<ToolSet> {
        Arc::clone(&read_lock(&self.inner))
    }

    /// Case-sensitive lookup against the current set.
    pub fn resolve(&self, name: &str) -> Option<Arc<ToolDeclaration>> {
        self.snapshot().resolve(name)
    }

    /// All declarations in declaration order.
    pub fn list(&self) -> Vec<Arc<ToolDeclaration>> {
        self.snapshot().list().to_vec()
    }

    /// Atomically replace the active set.
    pub fn reload(&self, set: ToolSet) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(set);
    }

    /// Re-parse declarations and replace the active set atomically.
    pub fn reload_from(&self, toml: &str) -> Result<usize> {
        let set = parse_set(toml)?;
        let count = set.len();
        self.reload(set);
        Ok(count)
    }
}

fn parse_set(toml: &str) -> Result<ToolSet> {
    let file: DeclarationFile = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
    ToolSet::new(file.tools)
}

fn read_lock(lock: &RwLock<Arc<ToolSet>>) -> std::sync::RwLockReadGuard<'_, Arc<ToolSet>> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
