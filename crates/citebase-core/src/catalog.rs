//! Model catalog for runtime model lookup.
//!
//! An ordered list of model profiles. Order is significant: upgrade
//! suggestions are listed in catalog order, not by capacity.

use citebase_types::config::builtin_models;
use citebase_types::error::CatalogError;
use citebase_types::model::ModelProfile;

use crate::budget::context::higher_capacity_models;

/// Ordered catalog of selectable models.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelProfile>,
}

impl ModelCatalog {
    /// The four built-in models.
    pub fn builtin() -> Self {
        Self::from_profiles(builtin_models())
    }

    pub fn from_profiles(models: Vec<ModelProfile>) -> Self {
        Self { models }
    }

    /// Look up a model by name. The first entry wins on duplicate names.
    pub fn get(&self, name: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Look up a model by name, failing when it is not in the catalog.
    pub fn require(&self, name: &str) -> Result<&ModelProfile, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownModel(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelProfile> {
        self.models.iter()
    }

    pub fn profiles(&self) -> &[ModelProfile] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models with a larger context window than `current`, in catalog order.
    pub fn higher_capacity(&self, current: &ModelProfile) -> Vec<&ModelProfile> {
        higher_capacity_models(&self.models, current)
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
