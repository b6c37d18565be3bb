//! persona 配置：词表、计划支柱、置信度阈值、路线图模板库
//! 所有面向用户的文案都放在这里，引擎代码中不出现 persona 专属措辞

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceRules;
use crate::error::{RspResult, RspersonaError};
use crate::roadmap::{LabelResolver, PlaceholderSource, RoadmapLibrary};
use crate::rule::PersonaId;

/// 模式词条
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLexiconEntry {
    pub label: String,
    #[serde(default)]
    pub snippets: Vec<String>,
}

/// 计划支柱（按主题或分类索引）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPillar {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supports_domains: Vec<String>,
    #[serde(default)]
    pub supports_patterns: Vec<String>,
}

/// persona 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaSpec {
    pub id: PersonaId,
    #[serde(default)]
    pub pattern_lexicon: BTreeMap<String, PatternLexiconEntry>,
    #[serde(default)]
    pub plan_pillar_catalog: BTreeMap<String, PlanPillar>,
    #[serde(default)]
    pub confidence_rules: ConfidenceRules,
    #[serde(default)]
    pub roadmap_library: RoadmapLibrary,
}

impl PersonaSpec {
    /// 加载期校验：阈值与模板
    pub fn validate(&self) -> RspResult<()> {
        if self.id.as_str().is_empty() {
            return Err(RspersonaError::Configuration("persona spec with empty id".to_string()));
        }
        self.confidence_rules.validate(self.id.as_str())?;
        self.roadmap_library.validate()?;

        for (tag, entry) in &self.pattern_lexicon {
            if entry.label.trim().is_empty() {
                return Err(RspersonaError::Configuration(format!(
                    "persona `{}`: lexicon entry `{}` has an empty label",
                    self.id, tag
                )));
            }
        }
        Ok(())
    }
}

impl LabelResolver for PersonaSpec {
    fn label(&self, source: PlaceholderSource, id: &str) -> Option<String> {
        match source {
            PlaceholderSource::TopPattern => self.pattern_lexicon.get(id).map(|e| e.label.clone()),
            PlaceholderSource::PlanPillar => self.plan_pillar_catalog.get(id).map(|p| p.title.clone()),
            PlaceholderSource::TopDomain | PlaceholderSource::PersonaTag => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PersonaSpec {
        serde_json::from_value(serde_json::json!({
            "id": "traveller_free_screening",
            "patternLexicon": {
                "circadian_misalignment": {"label": "Body clock out of sync", "snippets": ["time zones"]}
            },
            "planPillarCatalog": {
                "sleep_anchors": {"title": "Sleep anchors", "supportsDomains": ["sleep"]},
                "movement": {"title": "Movement breaks"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_and_validation() {
        let spec = spec();
        spec.validate().unwrap();
        assert_eq!(spec.confidence_rules, ConfidenceRules::default());
        assert!(spec.roadmap_library.without_plan.is_empty());
    }

    #[test]
    fn test_labels_come_from_lexicon_and_pillars() {
        let spec = spec();
        assert_eq!(
            spec.label(PlaceholderSource::TopPattern, "circadian_misalignment").as_deref(),
            Some("Body clock out of sync")
        );
        assert_eq!(
            spec.label(PlaceholderSource::PlanPillar, "sleep_anchors").as_deref(),
            Some("Sleep anchors")
        );
        assert_eq!(spec.label(PlaceholderSource::TopDomain, "sleep"), None);
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let mut spec = spec();
        spec.pattern_lexicon.insert("bad".to_string(), PatternLexiconEntry::default());
        assert!(spec.validate().unwrap_err().is_configuration());
    }
}
