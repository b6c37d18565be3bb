//! 规则求值器
//! 全量匹配累加：所有命中规则的效果合并进同一份画像，并记录命中溯源

use std::collections::{BTreeMap, BTreeSet, HashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::condition::ConditionEvaluator;
use super::profile::RiskProfile;
use crate::feature::FeatureVector;
use crate::rule::{Effect, Rule};

/// 证据特征展示上限
pub const TOP_EVIDENCE_LIMIT: usize = 6;

/// 命中溯源
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// 命中规则ID（规范顺序）
    pub matched_rules: Vec<String>,
    /// 出现次数最多的证据特征（次数降序、ID升序）
    pub top_evidence_features: Vec<String>,
}

/// 规则求值器
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// 求值并返回画像
    pub fn evaluate(features: &FeatureVector, rules: &[Rule]) -> RiskProfile {
        Self::evaluate_traced(features, rules).0
    }

    /// 求值并返回画像与溯源信息
    pub fn evaluate_traced(features: &FeatureVector, rules: &[Rule]) -> (RiskProfile, Provenance) {
        // 1. 规范顺序：输入顺序不影响结果
        let mut ordered: Vec<&Rule> = rules.iter().collect();
        ordered.sort_by(|a, b| Rule::canonical_cmp(a, b));

        let mut profile = RiskProfile::default();
        let mut pending_boosts: BTreeMap<&str, u32> = BTreeMap::new();
        let mut claimed_groups: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();
        let mut evidence: BTreeMap<&str, usize> = BTreeMap::new();

        // 2. 逐条求值，命中即按声明顺序应用效果
        for rule in ordered {
            if !ConditionEvaluator::matches(&rule.when, features) {
                continue;
            }
            if let Some(group) = rule.exclusive_group.as_deref() {
                if !claimed_groups.insert(group) {
                    debug!("规则 {} 命中但互斥组 {} 已被占用，跳过", rule.id, group);
                    continue;
                }
            }
            debug!("规则命中：{}（priority={}）", rule.id, rule.priority);

            Self::apply_effects(rule, &mut profile, &mut pending_boosts);
            matched.push(rule.id.clone());

            let unique: BTreeSet<&str> = rule.evidence_features.iter().map(String::as_str).collect();
            for feature in unique {
                *evidence.entry(feature).or_insert(0) += 1;
            }
        }

        // 3. 所有 addPattern 完成后再叠加 boost
        for (tag, delta) in pending_boosts {
            if !profile.boost_pattern(tag, delta) {
                debug!("模式 {} 未命中，忽略 boost", tag);
            }
        }

        let provenance = Provenance {
            matched_rules: matched,
            top_evidence_features: Self::top_evidence(evidence),
        };
        (profile, provenance)
    }

    fn apply_effects<'a>(rule: &'a Rule, profile: &mut RiskProfile, pending_boosts: &mut BTreeMap<&'a str, u32>) {
        for effect in &rule.then {
            match effect {
                Effect::AddPattern { tag, base_severity, domain } => {
                    profile.add_pattern(tag, *base_severity, domain);
                }
                Effect::BoostPattern { tag, delta } => {
                    let total = pending_boosts.entry(tag.as_str()).or_insert(0);
                    *total = total.saturating_add(u32::from(*delta));
                }
                Effect::AddDomain { domain, weight } => profile.add_domain(domain, *weight),
                Effect::AddPersonaTag { tag, strength } => profile.add_persona_tag(tag, *strength),
                Effect::AddPlanTheme { category, theme, weight } => {
                    profile.add_plan_theme(category, theme, *weight);
                }
                // 规范顺序下后写覆盖先写，规则内同名键以最后一次声明为准
                Effect::RoadmapModifier { key, value } => {
                    if let Some(previous) = profile.set_modifier(key, value) {
                        debug!("roadmapModifier {}：规则 {} 覆盖旧值 {}", key, rule.id, previous);
                    }
                }
            }
        }
    }

    fn top_evidence(counts: BTreeMap<&str, usize>) -> Vec<String> {
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|(a_id, a), (b_id, b)| b.cmp(a).then_with(|| a_id.cmp(b_id)));
        ranked
            .into_iter()
            .take(TOP_EVIDENCE_LIMIT)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Bucket;

    fn rules(json: serde_json::Value) -> Vec<Rule> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_all_matching_rules_accumulate() {
        let rules = rules(serde_json::json!([
            {"id": "a", "priority": 5, "when": {"op": "gte", "feature": "stress_load", "bucket": "MED"},
             "then": [{"type": "addDomain", "domain": "stress", "weight": 2}],
             "evidenceFeatures": ["stress_load"]},
            {"id": "b", "priority": 1, "when": {"op": "gte", "feature": "stress_load", "bucket": "HIGH"},
             "then": [{"type": "addDomain", "domain": "stress", "weight": 3}],
             "evidenceFeatures": ["stress_load", "recovery_quality"]}
        ]));
        let features = FeatureVector::new().with("stress_load", Bucket::High);
        let (profile, provenance) = RuleEvaluator::evaluate_traced(&features, &rules);

        assert_eq!(profile.domains["stress"], 5);
        assert_eq!(provenance.matched_rules, vec!["a", "b"]);
        assert_eq!(provenance.top_evidence_features, vec!["stress_load", "recovery_quality"]);
    }

    #[test]
    fn test_modifier_last_write_in_canonical_order_wins() {
        // 测试场景：priority 降序、id 升序应用，排在最后的命中规则决定取值，与输入顺序无关
        let mut rules = rules(serde_json::json!([
            {"id": "hi", "priority": 90, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "roadmapModifier", "key": "riskLevel", "value": "from_priority_90"}]},
            {"id": "lo", "priority": 10, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "roadmapModifier", "key": "riskLevel", "value": "first"},
                      {"type": "roadmapModifier", "key": "riskLevel", "value": "from_priority_10"}]},
            {"id": "b", "priority": 50, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "roadmapModifier", "key": "tie", "value": "from_id_b"}]},
            {"id": "a", "priority": 50, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "roadmapModifier", "key": "tie", "value": "from_id_a"}]}
        ]));
        let features = FeatureVector::new().with("stress_load", Bucket::High);

        let forward = RuleEvaluator::evaluate(&features, &rules);
        rules.reverse();
        let backward = RuleEvaluator::evaluate(&features, &rules);

        assert_eq!(forward.roadmap_modifiers["riskLevel"], "from_priority_10");
        assert_eq!(forward.roadmap_modifiers["tie"], "from_id_b");
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_boost_applies_after_patterns_and_caps() {
        let rules = rules(serde_json::json!([
            {"id": "boost", "priority": 99, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "boostPattern", "tag": "p", "delta": 1},
                      {"type": "boostPattern", "tag": "ghost", "delta": 2}]},
            {"id": "add", "priority": 1, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "addPattern", "tag": "p", "baseSeverity": 2, "domain": "stress"}]},
            {"id": "boost2", "priority": 0, "when": {"op": "gte", "feature": "stress_load", "bucket": "LOW"},
             "then": [{"type": "boostPattern", "tag": "p", "delta": 3}]}
        ]));
        let features = FeatureVector::new().with("stress_load", Bucket::Low);
        let profile = RuleEvaluator::evaluate(&features, &rules);

        assert_eq!(profile.patterns["p"].severity, 3);
        assert!(!profile.has_pattern("ghost"));
    }

    #[test]
    fn test_exclusive_group_keeps_top_ranked_rule() {
        let rules = rules(serde_json::json!([
            {"id": "mild", "priority": 10, "exclusiveGroup": "sleep_tier",
             "when": {"op": "gte", "feature": "sleep_latency", "bucket": "LOW"},
             "then": [{"type": "addPattern", "tag": "mild_sleep", "baseSeverity": 1, "domain": "sleep"}]},
            {"id": "severe", "priority": 20, "exclusiveGroup": "sleep_tier",
             "when": {"op": "gte", "feature": "sleep_latency", "bucket": "HIGH"},
             "then": [{"type": "addPattern", "tag": "severe_sleep", "baseSeverity": 3, "domain": "sleep"}]}
        ]));

        let high = RuleEvaluator::evaluate(&FeatureVector::new().with("sleep_latency", Bucket::High), &rules);
        assert!(high.has_pattern("severe_sleep"));
        assert!(!high.has_pattern("mild_sleep"));

        let low = RuleEvaluator::evaluate(&FeatureVector::new().with("sleep_latency", Bucket::Low), &rules);
        assert!(low.has_pattern("mild_sleep"));
    }

    #[test]
    fn test_no_rules_or_no_features_yield_empty_profile() {
        let (profile, provenance) = RuleEvaluator::evaluate_traced(&FeatureVector::new(), &[]);
        assert!(profile.is_empty());
        assert!(provenance.matched_rules.is_empty());
    }
}
