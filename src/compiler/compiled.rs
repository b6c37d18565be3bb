//! 编译后规则集模型
//! 通过校验的规则按规范顺序（priority 降序、id 升序）存放，加载后只读

use std::sync::Arc;

use crate::feature::FeatureCatalog;
use crate::persona::PersonaCatalog;
use crate::rule::{PersonaId, Rule, RulesetRegistry};

/// 编译后的规则集
#[derive(Debug, Clone)]
pub struct CompiledRuleset {
    pub persona: PersonaId,
    pub version: String,
    rules: Arc<Vec<Rule>>,
}

impl CompiledRuleset {
    pub(crate) fn new(persona: PersonaId, version: String, rules: Vec<Rule>) -> Self {
        Self {
            persona,
            version,
            rules: Arc::new(rules),
        }
    }

    /// 规范顺序的规则列表
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 编译后的规则包：特征目录 + 规则集注册表 + persona 配置目录
#[derive(Debug, Clone)]
pub struct CompiledBundle {
    pub catalog: FeatureCatalog,
    pub registry: RulesetRegistry,
    pub personas: PersonaCatalog,
}

impl CompiledBundle {
    pub(crate) fn new(catalog: FeatureCatalog, registry: RulesetRegistry, personas: PersonaCatalog) -> Self {
        Self {
            catalog,
            registry,
            personas,
        }
    }
}
