//! persona 配置目录

use std::sync::Arc;
use rustc_hash::FxHashMap;

use super::spec::PersonaSpec;
use crate::error::{RspResult, RspersonaError};
use crate::rule::PersonaId;

/// persona 配置目录（规范ID -> 配置）
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    specs: FxHashMap<PersonaId, Arc<PersonaSpec>>,
}

impl PersonaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入配置，同一 persona 重复出现视为配置错误
    pub fn insert(&mut self, spec: PersonaSpec) -> RspResult<()> {
        let id = PersonaId::new(spec.id.as_str());
        if self.specs.contains_key(&id) {
            return Err(RspersonaError::Configuration(format!(
                "persona spec `{}` declared twice",
                id
            )));
        }
        self.specs.insert(id, Arc::new(spec));
        Ok(())
    }

    pub fn get(&self, persona: &PersonaId) -> Option<&Arc<PersonaSpec>> {
        self.specs.get(persona)
    }

    pub fn contains(&self, persona: &PersonaId) -> bool {
        self.specs.contains_key(persona)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// 已配置的 persona（升序）
    pub fn ids(&self) -> Vec<PersonaId> {
        let mut ids: Vec<PersonaId> = self.specs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> PersonaSpec {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    #[test]
    fn test_insert_normalizes_and_rejects_duplicates() {
        let mut catalog = PersonaCatalog::new();
        catalog.insert(spec("Traveller-Free-Screening")).unwrap();

        assert!(catalog.contains(&PersonaId::new("traveller_free_screening")));
        assert!(catalog.insert(spec("traveller_free_screening")).is_err());
        assert_eq!(catalog.len(), 1);
    }
}
