//! 路线图模板数据模型
//! 模板文本存放在 persona 配置中，引擎只做筛选、排序与占位符替换

use std::collections::HashSet;
use std::fmt;
use serde::{Deserialize, Serialize};

use super::renderer::placeholder_keys;
use crate::error::{RspResult, RspersonaError};

/// 时间跨度（月）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Horizon {
    Three,
    Six,
    Nine,
    Twelve,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [Horizon::Three, Horizon::Six, Horizon::Nine, Horizon::Twelve];

    pub fn months(self) -> u8 {
        match self {
            Horizon::Three => 3,
            Horizon::Six => 6,
            Horizon::Nine => 9,
            Horizon::Twelve => 12,
        }
    }
}

impl TryFrom<u8> for Horizon {
    type Error = String;

    fn try_from(months: u8) -> Result<Self, Self::Error> {
        match months {
            3 => Ok(Horizon::Three),
            6 => Ok(Horizon::Six),
            9 => Ok(Horizon::Nine),
            12 => Ok(Horizon::Twelve),
            other => Err(format!("horizon must be one of 3, 6, 9, 12 (got {})", other)),
        }
    }
}

impl From<Horizon> for u8 {
    fn from(horizon: Horizon) -> Self {
        horizon.months()
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.months())
    }
}

/// 轨迹通道：不执行计划 / 执行计划
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lane {
    WithoutPlan,
    WithPlan,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::WithoutPlan, Lane::WithPlan];
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::WithoutPlan => write!(f, "withoutPlan"),
            Lane::WithPlan => write!(f, "withPlan"),
        }
    }
}

/// 资格条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub horizons: Vec<Horizon>,
    #[serde(default)]
    pub required_domains: Vec<String>,
    #[serde(default)]
    pub required_patterns: Vec<String>,
    #[serde(default)]
    pub required_persona_tags: Vec<String>,
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
}

impl Eligibility {
    /// 必需条件总数（排序依据）
    pub fn required_count(&self) -> usize {
        self.required_domains.len() + self.required_patterns.len() + self.required_persona_tags.len()
    }
}

/// 占位符取值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderSource {
    TopPattern,
    TopDomain,
    PersonaTag,
    PlanPillar,
}

/// 占位符声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub key: String,
    pub source: PlaceholderSource,
    /// 必填占位符取不到值时整个模板作废
    #[serde(default)]
    pub mandatory: bool,
}

/// 渲染配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub title: String,
    pub sentences: Vec<String>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

/// 路线图模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapTemplate {
    pub id: String,
    pub eligibility: Eligibility,
    pub render: RenderSpec,
}

impl RoadmapTemplate {
    /// 加载期校验
    pub fn validate(&self) -> RspResult<()> {
        let invalid = |reason: String| RspersonaError::InvalidTemplate {
            template_id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("template id is empty".to_string()));
        }
        if self.eligibility.horizons.is_empty() {
            return Err(invalid("eligibility.horizons is empty".to_string()));
        }
        if self.render.title.trim().is_empty() {
            return Err(invalid("render.title is empty".to_string()));
        }

        // 同一模式既必需又排除，模板永远不可能入选
        if let Some(tag) = self
            .eligibility
            .required_patterns
            .iter()
            .find(|tag| self.eligibility.excluded_patterns.contains(tag))
        {
            return Err(invalid(format!("pattern `{}` is both required and excluded", tag)));
        }

        let mut declared = HashSet::new();
        for placeholder in &self.render.placeholders {
            if !declared.insert(placeholder.key.as_str()) {
                return Err(invalid(format!("duplicate placeholder `{}`", placeholder.key)));
            }
        }

        let texts = std::iter::once(&self.render.title).chain(self.render.sentences.iter());
        for text in texts {
            for key in placeholder_keys(text) {
                if !declared.contains(key) {
                    return Err(invalid(format!("marker `{{{{{}}}}}` has no placeholder declaration", key)));
                }
            }
        }
        Ok(())
    }
}

/// persona 的模板库（两条通道）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapLibrary {
    #[serde(default)]
    pub without_plan: Vec<RoadmapTemplate>,
    #[serde(default)]
    pub with_plan: Vec<RoadmapTemplate>,
}

impl RoadmapLibrary {
    pub fn lane(&self, lane: Lane) -> &[RoadmapTemplate] {
        match lane {
            Lane::WithoutPlan => &self.without_plan,
            Lane::WithPlan => &self.with_plan,
        }
    }

    /// 校验每个模板，并要求同一通道内模板ID唯一
    pub fn validate(&self) -> RspResult<()> {
        for lane in Lane::ALL {
            let mut seen = HashSet::new();
            for template in self.lane(lane) {
                template.validate()?;
                if !seen.insert(template.id.as_str()) {
                    return Err(RspersonaError::InvalidTemplate {
                        template_id: template.id.clone(),
                        reason: format!("duplicate template id in lane {}", lane),
                    });
                }
            }
        }
        Ok(())
    }
}

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRoadmap {
    pub template_id: String,
    pub horizon: Horizon,
    pub title: String,
    pub sentences: Vec<String>,
    /// 命中的必需条件数
    pub matched_criteria: usize,
}

/// 轨迹上的一个点：某个时间跨度 × 某条通道的首选模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub horizon: Horizon,
    pub lane: Lane,
    pub roadmap: Option<RenderedRoadmap>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(json: serde_json::Value) -> RoadmapTemplate {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_horizon_accepts_only_known_months() {
        let horizons: Vec<Horizon> = serde_json::from_str("[3, 6, 9, 12]").unwrap();
        assert_eq!(horizons, Horizon::ALL.to_vec());
        assert!(serde_json::from_str::<Horizon>("4").is_err());
        assert_eq!(serde_json::to_string(&Horizon::Nine).unwrap(), "9");
    }

    #[test]
    fn test_valid_template_passes() {
        let t = template(serde_json::json!({
            "id": "sleep_3m",
            "eligibility": {"horizons": [3], "requiredDomains": ["sleep"]},
            "render": {
                "title": "Stabilise {{pattern}}",
                "sentences": ["Your {{domain}} signals lead."],
                "placeholders": [
                    {"key": "pattern", "source": "topPattern", "mandatory": true},
                    {"key": "domain", "source": "topDomain"}
                ]
            }
        }));
        t.validate().unwrap();
        assert_eq!(t.eligibility.required_count(), 1);
    }

    #[test]
    fn test_invalid_templates_are_rejected() {
        // 测试场景：未声明的占位符、重复占位符、必需且排除、空 horizons
        let undeclared = template(serde_json::json!({
            "id": "t", "eligibility": {"horizons": [3]},
            "render": {"title": "Hi {{who}}", "sentences": []}
        }));
        let duplicate = template(serde_json::json!({
            "id": "t", "eligibility": {"horizons": [3]},
            "render": {"title": "Hi", "sentences": [], "placeholders": [
                {"key": "a", "source": "topDomain"}, {"key": "a", "source": "topPattern"}
            ]}
        }));
        let contradictory = template(serde_json::json!({
            "id": "t", "eligibility": {"horizons": [3], "requiredPatterns": ["p"], "excludedPatterns": ["p"]},
            "render": {"title": "Hi", "sentences": []}
        }));
        let no_horizons = template(serde_json::json!({
            "id": "t", "eligibility": {"horizons": []},
            "render": {"title": "Hi", "sentences": []}
        }));

        for bad in [undeclared, duplicate, contradictory, no_horizons] {
            assert!(matches!(bad.validate(), Err(RspersonaError::InvalidTemplate { .. })));
        }
    }

    #[test]
    fn test_duplicate_ids_within_lane_rejected() {
        let t = template(serde_json::json!({
            "id": "same", "eligibility": {"horizons": [3]},
            "render": {"title": "Hi", "sentences": []}
        }));
        let library = RoadmapLibrary {
            without_plan: vec![t.clone(), t.clone()],
            with_plan: Vec::new(),
        };
        assert!(library.validate().is_err());

        let split = RoadmapLibrary {
            without_plan: vec![t.clone()],
            with_plan: vec![t],
        };
        split.validate().unwrap();
    }
}
