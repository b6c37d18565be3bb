//! 禁忌检查：按固定表顺序改写补充剂列表并汇总提示

use tracing::debug;

use super::model::{SafetyResult, Supplement, UserResponses};
use super::table::{SupplementMutation, CONTRAINDICATION_TABLE};

/// 禁忌检查器
pub struct SafetyChecker;

impl SafetyChecker {
    /// 执行禁忌检查，永不失败
    pub fn check(responses: &UserResponses, supplements: &[Supplement]) -> SafetyResult {
        let mut result = SafetyResult {
            supplements: supplements.to_vec(),
            banner: None,
            warnings: Vec::new(),
        };

        for rule in CONTRAINDICATION_TABLE.iter() {
            if !rule.condition.holds(responses) {
                continue;
            }

            // 移除类与纯提示类规则给出一条提示，改写类规则每改写一个补充剂给出一条
            let warning_count = match rule.mutation {
                SupplementMutation::Remove(category) => {
                    let before = result.supplements.len();
                    result.supplements.retain(|s| !category.matches(s));
                    debug!("禁忌 {} 移除补充剂 {} 个", rule.id, before - result.supplements.len());
                    1
                }
                SupplementMutation::Relabel { category, safety } => {
                    let mut touched = 0usize;
                    for supplement in result.supplements.iter_mut().filter(|s| category.matches(s)) {
                        supplement.safety = safety.to_string();
                        touched += 1;
                    }
                    debug!("禁忌 {} 改写补充剂安全提示 {} 个", rule.id, touched);
                    touched
                }
                SupplementMutation::NoChange => 1,
            };

            result
                .warnings
                .extend(std::iter::repeat(rule.warning.to_string()).take(warning_count));
            // 先设置的横幅优先
            if result.banner.is_none() {
                result.banner = rule.banner.map(str::to_string);
            }
        }

        result
    }
}

/// 便捷入口
pub fn check_contraindications(responses: &UserResponses, supplements: &[Supplement]) -> SafetyResult {
    SafetyChecker::check(responses, supplements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::table::{MEDICATION_BANNER, PREGNANCY_BANNER};

    fn base_supplements() -> Vec<Supplement> {
        serde_json::from_value(serde_json::json!([
            {"name": "Omega-3 EPA/DHA", "dose": "1-2 g/day", "timing": "with meals",
             "why": "Supports cardiovascular health", "safety": "Safe for most people"},
            {"name": "Magnesium glycinate", "dose": "200-400 mg", "timing": "evening",
             "why": "Supports sleep quality", "safety": "Generally well-tolerated"},
            {"name": "Ashwagandha", "dose": "300-600 mg", "timing": "morning or evening",
             "why": "Helps with stress", "safety": "Generally safe"},
            {"name": "Vitamin C", "dose": "1000 mg", "timing": "with breakfast",
             "why": "Supports immune function", "safety": "Water-soluble"}
        ]))
        .unwrap()
    }

    fn responses(json: serde_json::Value) -> UserResponses {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_no_disclosures_leaves_list_untouched() {
        let result = check_contraindications(&UserResponses::default(), &base_supplements());
        assert_eq!(result.supplements, base_supplements());
        assert!(result.banner.is_none());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_pregnancy_removes_adaptogens_and_sets_banner() {
        let result = check_contraindications(
            &responses(serde_json::json!({"pregnancy_status": "pregnant", "medications": ["Prenatal vitamins"]})),
            &base_supplements(),
        );

        assert!(result.supplements.iter().all(|s| s.name != "Ashwagandha"));
        assert_eq!(result.supplements.len(), 3);
        assert_eq!(result.banner.as_deref(), Some(PREGNANCY_BANNER));
        assert_eq!(
            result.warnings,
            vec![
                "Adaptogens suppressed due to pregnancy status",
                "General medication interaction warning added"
            ]
        );
    }

    #[test]
    fn test_omega3_relabel_does_not_touch_ashwagandha() {
        // 测试场景：名称中含 "dha" 子串的 Ashwagandha 不应被当作 Omega-3
        let result = check_contraindications(
            &responses(serde_json::json!({"anticoagulants": true})),
            &base_supplements(),
        );

        let omega = result.supplements.iter().find(|s| s.name.starts_with("Omega-3")).unwrap();
        let ashwagandha = result.supplements.iter().find(|s| s.name == "Ashwagandha").unwrap();
        assert!(omega.safety.contains("anticoagulants"));
        assert_eq!(ashwagandha.safety, "Generally safe");
        assert_eq!(result.banner.as_deref(), Some(MEDICATION_BANNER));
        assert_eq!(result.warnings, vec!["Omega-3 safety warning added due to anticoagulant use"]);
    }

    #[test]
    fn test_condition_relabels_accumulate() {
        let result = check_contraindications(
            &responses(serde_json::json!({
                "kidney_disease": true,
                "medical_conditions": ["Hashimoto's thyroiditis", "Acid reflux"]
            })),
            &base_supplements(),
        );

        let safety_of = |name: &str| {
            result
                .supplements
                .iter()
                .find(|s| s.name.starts_with(name))
                .map(|s| s.safety.clone())
                .unwrap()
        };
        assert!(safety_of("Magnesium").contains("kidney disease"));
        assert!(safety_of("Ashwagandha").contains("thyroid"));
        assert!(safety_of("Vitamin C").contains("stomach irritation"));
        assert_eq!(result.warnings.len(), 3);
        assert!(result.banner.is_none());
    }

    #[test]
    fn test_relabel_warns_once_per_touched_supplement() {
        // 测试场景：两个 Omega-3 产品都被改写，每个各对应一条提示
        let mut supplements = base_supplements();
        supplements.push(Supplement::new("Fish Oils"));
        let result = check_contraindications(&responses(serde_json::json!({"anticoagulants": true})), &supplements);

        let relabeled = result
            .supplements
            .iter()
            .filter(|s| s.safety.contains("anticoagulants"))
            .count();
        assert_eq!(relabeled, 2);
        assert_eq!(
            result.warnings,
            vec![
                "Omega-3 safety warning added due to anticoagulant use",
                "Omega-3 safety warning added due to anticoagulant use"
            ]
        );
    }

    #[test]
    fn test_relabel_without_matching_supplement_adds_no_warning() {
        let result = check_contraindications(
            &responses(serde_json::json!({"gerd": true})),
            &[Supplement::new("Magnesium glycinate")],
        );
        assert!(result.warnings.is_empty());
    }
}
