//! 特征目录：系统中声明过的全部特征ID及其取值类型
//! 规则校验以此为准，未声明的特征属于配置错误

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use super::model::FeatureKind;

/// 特征ID常量（封闭词表，与 data/features.json 保持一致）
pub mod ids {
    // 出行相关
    pub const TIME_ZONE_SHIFT: &str = "time_zone_shift";
    pub const UPCOMING_TRAVEL: &str = "upcoming_travel";
    pub const TRAVEL_FREQUENCY: &str = "travel_frequency";
    pub const SITTING_DURATION: &str = "sitting_duration";

    // 睡眠相关
    pub const SLEEP_LATENCY: &str = "sleep_latency";
    pub const SLEEP_FRAGMENTATION: &str = "sleep_fragmentation";
    pub const SLEEP_CONSISTENCY: &str = "sleep_consistency";
    pub const SLEEP_DISRUPTION_TRAVEL: &str = "sleep_disruption_travel";

    // 压力相关
    pub const STRESS_LOAD: &str = "stress_load";
    pub const STRESS_RECOVERY: &str = "stress_recovery";
    pub const OVERWHELM_FREQUENCY: &str = "overwhelm_frequency";

    // 精力/恢复
    pub const ENERGY_LEVEL: &str = "energy_level";
    pub const RECOVERY_QUALITY: &str = "recovery_quality";
    pub const AFTERNOON_FATIGUE: &str = "afternoon_fatigue";

    // 运动
    pub const MOVEMENT_FREQUENCY: &str = "movement_frequency";
    pub const STRENGTH_TRAINING: &str = "strength_training";
    pub const MOBILITY_ISSUES: &str = "mobility_issues";

    // 饮食
    pub const PROCESSED_FOODS: &str = "processed_foods";
    pub const VEGETABLE_INTAKE: &str = "vegetable_intake";
    pub const HYDRATION: &str = "hydration";
    pub const DIET_PATTERNS: &str = "diet_patterns";

    // 既往病史
    pub const HAS_DIABETES: &str = "has_diabetes";
    pub const HAS_HYPERTENSION: &str = "has_hypertension";
    pub const HAS_HIGH_CHOLESTEROL: &str = "has_high_cholesterol";
    pub const HAS_AUTOIMMUNE: &str = "has_autoimmune";

    // 家族史
    pub const FAMILY_CARDIAC: &str = "family_cardiac";
    pub const FAMILY_DIABETES: &str = "family_diabetes";
    pub const FAMILY_NEURODEGENERATIVE: &str = "family_neurodegenerative";

    // 化验结果（如有）
    pub const CRP_STATUS: &str = "crp_status";
    pub const GLUCOSE_STATUS: &str = "glucose_status";
    pub const LIPID_STATUS: &str = "lipid_status";
}

/// 特征目录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCatalog {
    features: BTreeMap<String, FeatureKind>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明一个特征（重复声明以最后一次为准）
    pub fn declare(&mut self, feature: impl Into<String>, kind: FeatureKind) -> &mut Self {
        self.features.insert(feature.into(), kind);
        self
    }

    pub fn kind_of(&self, feature: &str) -> Option<FeatureKind> {
        self.features.get(feature).copied()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureKind)> {
        self.features.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, FeatureKind)> for FeatureCatalog {
    fn from_iter<T: IntoIterator<Item = (String, FeatureKind)>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut catalog = FeatureCatalog::new();
        catalog
            .declare(ids::STRESS_LOAD, FeatureKind::Bucket)
            .declare(ids::HAS_DIABETES, FeatureKind::Boolean);

        assert_eq!(catalog.kind_of(ids::STRESS_LOAD), Some(FeatureKind::Bucket));
        assert_eq!(catalog.kind_of(ids::HAS_DIABETES), Some(FeatureKind::Boolean));
        assert!(!catalog.contains(ids::LIPID_STATUS));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_catalog_json_is_flat_map() {
        let catalog: FeatureCatalog =
            serde_json::from_str(r#"{"sleep_latency": "bucket", "diet_patterns": "set"}"#).unwrap();
        assert_eq!(catalog.kind_of(ids::SLEEP_LATENCY), Some(FeatureKind::Bucket));
        assert_eq!(catalog.kind_of(ids::DIET_PATTERNS), Some(FeatureKind::Set));
    }
}
