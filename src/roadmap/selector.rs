//! 路线图模板筛选与排序

use tracing::debug;

use super::model::{Horizon, Lane, RenderedRoadmap, RoadmapLibrary, RoadmapTemplate, TrajectoryPoint};
use super::renderer::{IdentityLabels, LabelResolver, RoadmapRenderer};
use crate::engine::RiskProfile;

/// 模板选择器
pub struct RoadmapSelector;

impl RoadmapSelector {
    /// 筛选、排序并渲染（标识符直接转文本）
    pub fn select(profile: &RiskProfile, horizon: Horizon, templates: &[RoadmapTemplate]) -> Vec<RenderedRoadmap> {
        Self::select_with_labels(profile, horizon, templates, &IdentityLabels)
    }

    /// 筛选、排序并渲染（通过 persona 词表取展示文本）
    pub fn select_with_labels(
        profile: &RiskProfile,
        horizon: Horizon,
        templates: &[RoadmapTemplate],
        labels: &dyn LabelResolver,
    ) -> Vec<RenderedRoadmap> {
        // 1. 资格过滤
        let mut eligible: Vec<(&RoadmapTemplate, usize)> = templates
            .iter()
            .filter_map(|t| Self::matched_criteria(t, profile, horizon).map(|count| (t, count)))
            .collect();

        // 2. 命中必需条件数降序，模板ID升序
        eligible.sort_by(|(a, a_count), (b, b_count)| b_count.cmp(a_count).then_with(|| a.id.cmp(&b.id)));
        debug!("horizon {} 可用模板 {} 个", horizon, eligible.len());

        // 3. 渲染，必填占位符缺值的模板被丢弃
        eligible
            .into_iter()
            .filter_map(|(t, count)| RoadmapRenderer::render(t, profile, horizon, count, labels))
            .collect()
    }

    /// 四个时间跨度 × 两条通道，每格取排名第一的模板
    pub fn trajectory(
        profile: &RiskProfile,
        library: &RoadmapLibrary,
        labels: &dyn LabelResolver,
    ) -> Vec<TrajectoryPoint> {
        let mut points = Vec::with_capacity(Horizon::ALL.len() * Lane::ALL.len());
        for horizon in Horizon::ALL {
            for lane in Lane::ALL {
                let roadmap = Self::select_with_labels(profile, horizon, library.lane(lane), labels)
                    .into_iter()
                    .next();
                points.push(TrajectoryPoint { horizon, lane, roadmap });
            }
        }
        points
    }

    /// 满足资格时返回命中的必需条件数
    fn matched_criteria(template: &RoadmapTemplate, profile: &RiskProfile, horizon: Horizon) -> Option<usize> {
        let eligibility = &template.eligibility;
        if !eligibility.horizons.contains(&horizon) {
            return None;
        }
        if eligibility.excluded_patterns.iter().any(|p| profile.has_pattern(p)) {
            return None;
        }
        let all_present = eligibility.required_domains.iter().all(|d| profile.domains.contains_key(d))
            && eligibility.required_patterns.iter().all(|p| profile.has_pattern(p))
            && eligibility
                .required_persona_tags
                .iter()
                .all(|t| profile.persona_tags.contains_key(t));
        all_present.then(|| eligibility.required_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates(json: serde_json::Value) -> Vec<RoadmapTemplate> {
        serde_json::from_value(json).unwrap()
    }

    fn profile() -> RiskProfile {
        let mut profile = RiskProfile::default();
        profile.add_pattern("circadian_misalignment", 3, "sleep");
        profile.add_domain("sleep", 3);
        profile.add_persona_tag("upcoming_travel", 2);
        profile
    }

    #[test]
    fn test_ranking_by_matched_criteria_then_id() {
        let library = templates(serde_json::json!([
            {"id": "b_generic", "eligibility": {"horizons": [3]}, "render": {"title": "B", "sentences": []}},
            {"id": "a_generic", "eligibility": {"horizons": [3]}, "render": {"title": "A", "sentences": []}},
            {"id": "z_specific", "eligibility": {"horizons": [3], "requiredDomains": ["sleep"],
             "requiredPersonaTags": ["upcoming_travel"]}, "render": {"title": "Z", "sentences": []}}
        ]));
        let selected = RoadmapSelector::select(&profile(), Horizon::Three, &library);

        let ids: Vec<&str> = selected.iter().map(|r| r.template_id.as_str()).collect();
        assert_eq!(ids, vec!["z_specific", "a_generic", "b_generic"]);
        assert_eq!(selected[0].matched_criteria, 2);
    }

    #[test]
    fn test_eligibility_filters() {
        // 测试场景：horizon 不符、缺少必需领域、存在排除模式，三者都应被过滤
        let library = templates(serde_json::json!([
            {"id": "wrong_horizon", "eligibility": {"horizons": [12]}, "render": {"title": "x", "sentences": []}},
            {"id": "needs_metabolic", "eligibility": {"horizons": [3], "requiredDomains": ["metabolic"]},
             "render": {"title": "x", "sentences": []}},
            {"id": "excluded", "eligibility": {"horizons": [3], "excludedPatterns": ["circadian_misalignment"]},
             "render": {"title": "x", "sentences": []}}
        ]));
        assert!(RoadmapSelector::select(&profile(), Horizon::Three, &library).is_empty());
    }

    #[test]
    fn test_trajectory_covers_every_horizon_and_lane() {
        let library = RoadmapLibrary {
            without_plan: templates(serde_json::json!([
                {"id": "drift", "eligibility": {"horizons": [3, 6, 9, 12]}, "render": {"title": "Drift", "sentences": []}}
            ])),
            with_plan: templates(serde_json::json!([
                {"id": "early", "eligibility": {"horizons": [3]}, "render": {"title": "Early", "sentences": []}}
            ])),
        };
        let points = RoadmapSelector::trajectory(&profile(), &library, &IdentityLabels);

        assert_eq!(points.len(), 8);
        assert_eq!(points[0].horizon, Horizon::Three);
        assert_eq!(points[0].lane, Lane::WithoutPlan);
        assert_eq!(points[1].roadmap.as_ref().map(|r| r.template_id.as_str()), Some("early"));
        assert!(points[3].roadmap.is_none());
        assert!(points.iter().filter(|p| p.lane == Lane::WithoutPlan).all(|p| p.roadmap.is_some()));
    }

    #[test]
    fn test_sparse_profile_never_panics() {
        let library = templates(serde_json::json!([
            {"id": "t", "eligibility": {"horizons": [3]}, "render": {
                "title": "{{p}}", "sentences": ["{{d}} first."],
                "placeholders": [{"key": "p", "source": "topPattern"}, {"key": "d", "source": "topDomain"}]
            }}
        ]));
        let selected = RoadmapSelector::select(&RiskProfile::default(), Horizon::Three, &library);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].title, "");
        assert!(selected[0].sentences.is_empty());
    }
}
