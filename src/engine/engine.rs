//! 个性化引擎核心：加载一次规则包，对每次提交执行完整流水线
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::evaluator::{Provenance, RuleEvaluator};
use super::profile::RiskProfile;
use crate::compiler::{CompiledBundle, RuleCompiler};
use crate::confidence::{ConfidenceClassifier, ConfidenceRules, ConfidenceTier};
use crate::config::EngineConfig;
use crate::error::RspResult;
use crate::feature::{FeatureCatalog, FeatureVector};
use crate::persona::PersonaSpec;
use crate::roadmap::{
    Horizon, IdentityLabels, Lane, RenderedRoadmap, RoadmapLibrary, RoadmapSelector,
    TrajectoryPoint,
};
use crate::rule::{PersonaId, RuleBundle, RuleLoader, RulesetRegistry};

/// 单次提交的完整输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationReport {
    /// 规范 persona（未知 persona 为 None）
    pub persona: Option<PersonaId>,
    pub ruleset_version: Option<String>,
    pub profile: RiskProfile,
    pub provenance: Provenance,
    pub confidence: ConfidenceTier,
    pub trajectory: Vec<TrajectoryPoint>,
}

/// 个性化引擎
#[derive(Debug, Clone)]
pub struct PersonalizationEngine {
    bundle: Arc<CompiledBundle>,
    config: EngineConfig,
}

impl PersonalizationEngine {
    /// 创建引擎
    pub async fn new(config: EngineConfig) -> RspResult<Self> {
        // 1. 加载原始规则包
        let bundle = RuleLoader::load(&config).await?;

        // 2. 校验并编译
        Self::from_bundle(&bundle, config)
    }

    /// 从已加载的规则包创建引擎（同步，便于测试与嵌入）
    pub fn from_bundle(bundle: &RuleBundle, config: EngineConfig) -> RspResult<Self> {
        let compiled = RuleCompiler::compile_bundle(bundle, &config)?;
        Ok(Self {
            bundle: Arc::new(compiled),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.bundle.catalog
    }

    pub fn registry(&self) -> &RulesetRegistry {
        &self.bundle.registry
    }

    /// 原始标识 -> 规范ID（规则集或 persona 配置任一存在即可）
    pub fn resolve(&self, persona: &str) -> Option<PersonaId> {
        self.bundle.registry.resolve(persona).or_else(|| {
            let id = PersonaId::new(persona);
            self.bundle.personas.contains(&id).then_some(id)
        })
    }

    pub fn persona_spec(&self, persona: &str) -> Option<&PersonaSpec> {
        let id = self.resolve(persona)?;
        self.bundle.personas.get(&id).map(Arc::as_ref)
    }

    /// 只做规则求值
    pub fn evaluate(&self, persona: &str, features: &FeatureVector) -> RiskProfile {
        RuleEvaluator::evaluate(features, self.bundle.registry.get_ruleset(persona))
    }

    /// 指定时间跨度与通道的模板（已排序、已渲染）
    pub fn select_roadmaps(
        &self,
        persona: &str,
        profile: &RiskProfile,
        horizon: Horizon,
        lane: Lane,
    ) -> Vec<RenderedRoadmap> {
        match self.persona_spec(persona) {
            Some(spec) => RoadmapSelector::select_with_labels(profile, horizon, spec.roadmap_library.lane(lane), spec),
            None => Vec::new(),
        }
    }

    /// 完整流水线：求值 -> 置信度 -> 轨迹
    pub fn personalize(&self, persona: &str, features: &FeatureVector) -> PersonalizationReport {
        let canonical = self.resolve(persona);
        let rules = self.bundle.registry.get_ruleset(persona);
        let ruleset_version = self
            .bundle
            .registry
            .active_ruleset(persona)
            .map(|r| r.version.clone());

        let undeclared = features.iter().filter(|(id, _)| !self.catalog().contains(id)).count();
        if undeclared > 0 {
            debug!("特征向量中有 {} 个未声明特征，不参与任何规则", undeclared);
        }

        // 1. 规则求值
        let (profile, provenance) = RuleEvaluator::evaluate_traced(features, rules);

        // 2. 置信度与轨迹（缺少 persona 配置时使用默认阈值、空模板库）
        let (confidence, trajectory) = match self.persona_spec(persona) {
            Some(spec) => (
                ConfidenceClassifier::classify(&profile, &spec.confidence_rules),
                RoadmapSelector::trajectory(&profile, &spec.roadmap_library, spec),
            ),
            None => (
                ConfidenceClassifier::classify(&profile, &ConfidenceRules::default()),
                RoadmapSelector::trajectory(&profile, &RoadmapLibrary::default(), &IdentityLabels),
            ),
        };

        let summary = format!(
            "persona {:?} 个性化完成：命中规则{}条、模式{}个、置信度{}",
            canonical.as_ref().map(PersonaId::as_str),
            provenance.matched_rules.len(),
            profile.patterns.len(),
            confidence
        );
        if self.config.verbose {
            info!("{}", summary);
        } else {
            debug!("{}", summary);
        }

        PersonalizationReport {
            persona: canonical,
            ruleset_version,
            profile,
            provenance,
            confidence,
            trajectory,
        }
    }
}
