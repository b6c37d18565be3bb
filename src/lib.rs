//! rspersona - 问卷个性化规则与评分引擎

// 导出全局错误类型
pub use self::error::{RspersonaError, RspResult};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, EngineConfig, RuleOrigin};

// 导出特征模块核心接口
pub use self::feature::{ids, Bucket, FeatureCatalog, FeatureKind, FeatureValue, FeatureVector};

// 导出规则模块核心接口
pub use self::rule::{
    embedded_bundle, ConditionNode, Effect, PersonaId, Rule, RuleBundle, RuleCacheManager, RuleLoader,
    RulesetFile, RulesetRegistry,
};

// 导出编译模块核心接口
pub use self::compiler::{CompiledBundle, CompiledRuleset, RuleCompiler};

// 导出引擎模块核心接口
pub use self::engine::{
    global_engine, init_global_engine, init_global_engine_with_config, personalize, ConditionEvaluator,
    PatternEntry, PersonalizationEngine, PersonalizationReport, PlanTheme, Provenance, RiskProfile,
    RuleEvaluator,
};

// 导出置信度、persona、路线图与安全模块核心接口
pub use self::confidence::{Combine, ConfidenceClassifier, ConfidenceRules, ConfidenceTier, TierThreshold};
pub use self::persona::{PersonaCatalog, PersonaSpec};
pub use self::roadmap::{
    Horizon, Lane, RenderedRoadmap, RoadmapLibrary, RoadmapSelector, RoadmapTemplate, TrajectoryPoint,
};
pub use self::safety::{check_contraindications, SafetyResult, Supplement, UserResponses};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod feature;
pub mod rule;
pub mod compiler;
pub mod engine;
pub mod confidence;
pub mod persona;
pub mod roadmap;
pub mod safety;
