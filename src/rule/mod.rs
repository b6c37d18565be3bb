//! 规则模块：负责规则的加载、缓存、注册与数据模型定义
pub mod model;
pub mod builtin;
pub mod cache;
pub mod loader;
pub mod registry;

// 导出核心接口
pub use self::model::{ConditionNode, Effect, PersonaId, Rule, RuleBundle, RulesetFile};
pub use self::builtin::embedded_bundle;
pub use self::loader::RuleLoader;
pub use self::cache::RuleCacheManager;
pub use self::registry::RulesetRegistry;
