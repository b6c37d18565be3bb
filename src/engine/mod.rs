//! 引擎模块：规则求值、画像累加与个性化流水线
pub mod condition;
pub mod profile;
pub mod evaluator;
pub mod engine;
pub mod global;

// 导出核心接口
pub use self::condition::ConditionEvaluator;
pub use self::profile::{PatternEntry, PlanTheme, RiskProfile};
pub use self::evaluator::{Provenance, RuleEvaluator, TOP_EVIDENCE_LIMIT};
pub use self::engine::{PersonalizationEngine, PersonalizationReport};
pub use self::global::{global_engine, init_global_engine, init_global_engine_with_config, personalize};
