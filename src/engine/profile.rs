//! 风险画像累加器
//! 每次评估新建一份，合并策略满足交换律与结合律（roadmapModifier 由求值顺序决定）

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::compiler::MAX_SEVERITY;

/// 命中的模式：严重度 + 所属领域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub severity: u8,
    pub domain: String,
}

/// 计划主题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTheme {
    pub category: String,
    pub theme: String,
    pub weight: u32,
}

/// 风险画像
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub patterns: BTreeMap<String, PatternEntry>,
    pub domains: BTreeMap<String, u32>,
    pub persona_tags: BTreeMap<String, u32>,
    /// 保持首次出现顺序
    pub plan_themes: Vec<PlanTheme>,
    pub roadmap_modifiers: BTreeMap<String, String>,
}

impl RiskProfile {
    /// 模式严重度取最大值，领域以首次写入为准
    pub fn add_pattern(&mut self, tag: &str, severity: u8, domain: &str) {
        let severity = severity.min(MAX_SEVERITY);
        match self.patterns.entry(tag.to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.severity = existing.severity.max(severity);
            }
            Entry::Vacant(entry) => {
                entry.insert(PatternEntry {
                    severity,
                    domain: domain.to_string(),
                });
            }
        }
    }

    /// 在已存在的模式上叠加严重度，封顶最高档；模式不存在时忽略
    pub fn boost_pattern(&mut self, tag: &str, delta: u32) -> bool {
        match self.patterns.get_mut(tag) {
            Some(entry) => {
                let boosted = u32::from(entry.severity).saturating_add(delta);
                entry.severity = boosted.min(u32::from(MAX_SEVERITY)) as u8;
                true
            }
            None => false,
        }
    }

    pub fn add_domain(&mut self, domain: &str, weight: u32) {
        let total = self.domains.entry(domain.to_string()).or_insert(0);
        *total = total.saturating_add(weight);
    }

    pub fn add_persona_tag(&mut self, tag: &str, strength: u32) {
        let total = self.persona_tags.entry(tag.to_string()).or_insert(0);
        *total = total.saturating_add(strength);
    }

    /// 相同 (category, theme) 累加权重，否则追加
    pub fn add_plan_theme(&mut self, category: &str, theme: &str, weight: u32) {
        if let Some(existing) = self
            .plan_themes
            .iter_mut()
            .find(|t| t.category == category && t.theme == theme)
        {
            existing.weight = existing.weight.saturating_add(weight);
            return;
        }
        self.plan_themes.push(PlanTheme {
            category: category.to_string(),
            theme: theme.to_string(),
            weight,
        });
    }

    /// 覆盖写入，返回被替换的旧值（按规范顺序应用，排序靠后的规则最终生效）
    pub fn set_modifier(&mut self, key: &str, value: &str) -> Option<String> {
        self.roadmap_modifiers.insert(key.to_string(), value.to_string())
    }

    pub fn has_pattern(&self, tag: &str) -> bool {
        self.patterns.contains_key(tag)
    }

    /// 严重度不低于 band 的模式数量
    pub fn worst_band_count(&self, band: u8) -> usize {
        self.patterns.values().filter(|p| p.severity >= band).count()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
            && self.domains.is_empty()
            && self.persona_tags.is_empty()
            && self.plan_themes.is_empty()
            && self.roadmap_modifiers.is_empty()
    }

    /// 最严重的模式（同分取名称升序）
    pub fn top_pattern(&self) -> Option<&str> {
        self.patterns
            .iter()
            .max_by(|(a_tag, a), (b_tag, b)| a.severity.cmp(&b.severity).then_with(|| b_tag.cmp(a_tag)))
            .map(|(tag, _)| tag.as_str())
    }

    /// 权重最高的领域（同分取名称升序）
    pub fn top_domain(&self) -> Option<&str> {
        Self::top_weighted(&self.domains)
    }

    /// 强度最高的 persona 标签（同分取名称升序）
    pub fn top_persona_tag(&self) -> Option<&str> {
        Self::top_weighted(&self.persona_tags)
    }

    /// 权重最高的计划主题（同分取首次出现者）
    pub fn top_plan_theme(&self) -> Option<&PlanTheme> {
        let mut best: Option<&PlanTheme> = None;
        for theme in &self.plan_themes {
            match best {
                Some(current) if current.weight >= theme.weight => {}
                _ => best = Some(theme),
            }
        }
        best
    }

    fn top_weighted(map: &BTreeMap<String, u32>) -> Option<&str> {
        // BTreeMap 升序遍历，严格大于才替换，保证同分取最小名称
        let mut best: Option<(&str, u32)> = None;
        for (name, weight) in map {
            match best {
                Some((_, current)) if current >= *weight => {}
                _ => best = Some((name.as_str(), *weight)),
            }
        }
        best.map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_merge_keeps_max_and_first_domain() {
        let mut profile = RiskProfile::default();
        profile.add_pattern("circadian_misalignment", 2, "sleep");
        profile.add_pattern("circadian_misalignment", 3, "sleep");
        profile.add_pattern("circadian_misalignment", 1, "sleep");

        let entry = &profile.patterns["circadian_misalignment"];
        assert_eq!(entry.severity, 3);
        assert_eq!(entry.domain, "sleep");
    }

    #[test]
    fn test_boost_is_capped_and_requires_pattern() {
        let mut profile = RiskProfile::default();
        profile.add_pattern("p", 2, "d");

        assert!(profile.boost_pattern("p", 5));
        assert_eq!(profile.patterns["p"].severity, 3);
        assert!(!profile.boost_pattern("missing", 1));
        assert!(!profile.has_pattern("missing"));
    }

    #[test]
    fn test_weights_sum_and_themes_keep_first_seen_order() {
        let mut profile = RiskProfile::default();
        profile.add_domain("sleep", 3);
        profile.add_domain("sleep", 2);
        profile.add_plan_theme("sleep", "sleep_anchors", 3);
        profile.add_plan_theme("movement", "circulation_breaks", 3);
        profile.add_plan_theme("sleep", "sleep_anchors", 1);

        assert_eq!(profile.domains["sleep"], 5);
        assert_eq!(profile.plan_themes.len(), 2);
        assert_eq!(profile.plan_themes[0].weight, 4);
        assert_eq!(profile.top_plan_theme().map(|t| t.theme.as_str()), Some("sleep_anchors"));
    }

    #[test]
    fn test_top_helpers_break_ties_by_name() {
        let mut profile = RiskProfile::default();
        profile.add_pattern("zeta", 3, "d");
        profile.add_pattern("alpha", 3, "d");
        profile.add_pattern("beta", 1, "d");
        profile.add_domain("stress", 3);
        profile.add_domain("metabolic", 3);

        assert_eq!(profile.top_pattern(), Some("alpha"));
        assert_eq!(profile.top_domain(), Some("metabolic"));
        assert_eq!(profile.top_persona_tag(), None);
        assert_eq!(profile.worst_band_count(3), 2);
    }

    #[test]
    fn test_plan_theme_tie_goes_to_first_seen() {
        let mut profile = RiskProfile::default();
        profile.add_plan_theme("stress", "recovery_practices", 3);
        profile.add_plan_theme("movement", "circulation_breaks", 3);
        assert_eq!(profile.top_plan_theme().map(|t| t.category.as_str()), Some("stress"));
    }

    #[test]
    fn test_modifier_last_write_wins() {
        let mut profile = RiskProfile::default();
        assert_eq!(profile.set_modifier("riskLevel", "high"), None);
        assert_eq!(profile.set_modifier("riskLevel", "low").as_deref(), Some("high"));
        assert_eq!(profile.roadmap_modifiers["riskLevel"], "low");
    }
}
