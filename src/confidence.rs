//! 置信度分级
//! 按 persona 配置的阈值，把画像的领域数、标签数、最严重模式数映射到 Low/Med/High

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::compiler::MAX_SEVERITY;
use crate::engine::RiskProfile;
use crate::error::{RspResult, RspersonaError};

/// 置信度档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    Low,
    Med,
    High,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceTier::Low => write!(f, "LOW"),
            ConfidenceTier::Med => write!(f, "MED"),
            ConfidenceTier::High => write!(f, "HIGH"),
        }
    }
}

/// 阈值组合方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    /// 三项阈值同时满足
    #[default]
    All,
    /// 任一非零阈值满足
    Any,
}

/// 单档阈值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThreshold {
    #[serde(default)]
    pub min_domains: usize,
    #[serde(default)]
    pub min_tags: usize,
    #[serde(default)]
    pub min_worst_bands: usize,
}

impl TierThreshold {
    pub fn new(min_domains: usize, min_tags: usize, min_worst_bands: usize) -> Self {
        Self {
            min_domains,
            min_tags,
            min_worst_bands,
        }
    }

    fn is_zero(&self) -> bool {
        self.min_domains == 0 && self.min_tags == 0 && self.min_worst_bands == 0
    }

    /// 每一项都不低于 other
    fn dominates(&self, other: &TierThreshold) -> bool {
        self.min_domains >= other.min_domains
            && self.min_tags >= other.min_tags
            && self.min_worst_bands >= other.min_worst_bands
    }

    fn is_met(&self, counts: &ProfileCounts, combine: Combine) -> bool {
        let checks = [
            (self.min_domains, counts.domains),
            (self.min_tags, counts.tags),
            (self.min_worst_bands, counts.worst_bands),
        ];
        match combine {
            Combine::All => checks.iter().all(|(min, actual)| actual >= min),
            Combine::Any => checks
                .iter()
                .filter(|(min, _)| *min > 0)
                .any(|(min, actual)| actual >= min),
        }
    }
}

fn default_worst_band() -> u8 {
    MAX_SEVERITY
}

/// persona 配置的置信度规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceRules {
    /// 计入 "最严重" 的严重度下限
    #[serde(default = "default_worst_band")]
    pub worst_band: u8,
    #[serde(default)]
    pub combine: Combine,
    pub high: TierThreshold,
    pub med: TierThreshold,
}

impl Default for ConfidenceRules {
    fn default() -> Self {
        Self {
            worst_band: MAX_SEVERITY,
            combine: Combine::All,
            high: TierThreshold::new(3, 1, 2),
            med: TierThreshold::new(2, 0, 1),
        }
    }
}

impl ConfidenceRules {
    /// 加载期校验：全零档位会让空画像越级，high 不得比 med 宽松
    pub fn validate(&self, persona: &str) -> RspResult<()> {
        let invalid = |reason: &str| RspersonaError::InvalidConfidenceRules {
            persona: persona.to_string(),
            reason: reason.to_string(),
        };
        if self.worst_band > MAX_SEVERITY {
            return Err(invalid("worstBand must be within 0..=3"));
        }
        if self.high.is_zero() {
            return Err(invalid("high tier thresholds are all zero"));
        }
        if self.med.is_zero() {
            return Err(invalid("med tier thresholds are all zero"));
        }
        if !self.high.dominates(&self.med) {
            return Err(invalid("high tier is looser than med tier"));
        }
        Ok(())
    }
}

/// 画像基数统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProfileCounts {
    domains: usize,
    tags: usize,
    worst_bands: usize,
}

/// 置信度分级器
pub struct ConfidenceClassifier;

impl ConfidenceClassifier {
    /// 先判 High，再判 Med，否则 Low
    pub fn classify(profile: &RiskProfile, rules: &ConfidenceRules) -> ConfidenceTier {
        let counts = ProfileCounts {
            domains: profile.domains.len(),
            tags: profile.persona_tags.len(),
            worst_bands: profile.worst_band_count(rules.worst_band),
        };

        if rules.high.is_met(&counts, rules.combine) {
            ConfidenceTier::High
        } else if rules.med.is_met(&counts, rules.combine) {
            ConfidenceTier::Med
        } else {
            ConfidenceTier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(domains: &[&str], tags: &[&str], severities: &[u8]) -> RiskProfile {
        let mut profile = RiskProfile::default();
        for domain in domains {
            profile.add_domain(domain, 1);
        }
        for tag in tags {
            profile.add_persona_tag(tag, 1);
        }
        for (i, severity) in severities.iter().enumerate() {
            profile.add_pattern(&format!("p{}", i), *severity, "d");
        }
        profile
    }

    #[test]
    fn test_empty_profile_is_low() {
        let rules = ConfidenceRules::default();
        rules.validate("demo").unwrap();
        assert_eq!(
            ConfidenceClassifier::classify(&RiskProfile::default(), &rules),
            ConfidenceTier::Low
        );
    }

    #[test]
    fn test_all_combine_checks_every_threshold() {
        let rules = ConfidenceRules::default();
        let high = profile(&["sleep", "stress", "immune"], &["upcoming_travel"], &[3, 3]);
        let med = profile(&["sleep", "stress"], &[], &[3, 1]);
        let short_of_high = profile(&["sleep", "stress", "immune"], &[], &[3, 3]);

        assert_eq!(ConfidenceClassifier::classify(&high, &rules), ConfidenceTier::High);
        assert_eq!(ConfidenceClassifier::classify(&med, &rules), ConfidenceTier::Med);
        assert_eq!(ConfidenceClassifier::classify(&short_of_high, &rules), ConfidenceTier::Med);
    }

    #[test]
    fn test_any_combine_ignores_zero_thresholds() {
        // 测试场景：any 模式下 minTags=0 不应让任何画像直接达标
        let rules = ConfidenceRules {
            worst_band: 2,
            combine: Combine::Any,
            high: TierThreshold::new(4, 0, 3),
            med: TierThreshold::new(2, 0, 1),
        };
        rules.validate("demo").unwrap();

        let tags_only = profile(&[], &["a", "b", "c"], &[]);
        assert_eq!(ConfidenceClassifier::classify(&tags_only, &rules), ConfidenceTier::Low);

        let one_severe = profile(&[], &[], &[2]);
        assert_eq!(ConfidenceClassifier::classify(&one_severe, &rules), ConfidenceTier::Med);
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        let zero_med = ConfidenceRules {
            med: TierThreshold::default(),
            ..ConfidenceRules::default()
        };
        assert!(zero_med.validate("demo").is_err());

        let inverted = ConfidenceRules {
            high: TierThreshold::new(1, 0, 1),
            med: TierThreshold::new(2, 0, 1),
            ..ConfidenceRules::default()
        };
        assert!(matches!(
            inverted.validate("demo"),
            Err(RspersonaError::InvalidConfidenceRules { .. })
        ));
    }

    #[test]
    fn test_rules_json_defaults() {
        let rules: ConfidenceRules = serde_json::from_str(
            r#"{"high": {"minDomains": 3, "minTags": 1, "minWorstBands": 2},
                "med": {"minDomains": 2, "minWorstBands": 1}}"#,
        )
        .unwrap();
        assert_eq!(rules.worst_band, 3);
        assert_eq!(rules.combine, Combine::All);
        assert_eq!(rules.med.min_tags, 0);
    }
}
