//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::feature::{Bucket, FeatureCatalog};
use crate::persona::PersonaSpec;

/// 规范化的 persona 标识
/// 别名解析只发生在注册表边界，调用方拿到的一律是规范ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(String);

impl PersonaId {
    /// 规范化输入：去空白、小写、`-` 转 `_`
    pub fn new(raw: &str) -> Self {
        Self(Self::normalize(raw))
    }

    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase().replace('-', "_")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 条件树
/// JSON 形如 `{"op": "and", "all": [...]}` / `{"op": "gte", "feature": "...", "bucket": "HIGH"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ConditionNode {
    And { all: Vec<ConditionNode> },
    Or { any: Vec<ConditionNode> },
    Not { pred: Box<ConditionNode> },
    Gte { feature: String, bucket: Bucket },
    Lte { feature: String, bucket: Bucket },
    Eq { feature: String, value: String },
    In { feature: String, values: Vec<String> },
}

impl ConditionNode {
    pub fn op_name(&self) -> &'static str {
        match self {
            ConditionNode::And { .. } => "and",
            ConditionNode::Or { .. } => "or",
            ConditionNode::Not { .. } => "not",
            ConditionNode::Gte { .. } => "gte",
            ConditionNode::Lte { .. } => "lte",
            ConditionNode::Eq { .. } => "eq",
            ConditionNode::In { .. } => "in",
        }
    }

    /// 收集条件树中引用的全部特征（去重、有序）
    pub fn referenced_features(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_features(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_features<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ConditionNode::And { all: children } | ConditionNode::Or { any: children } => {
                for child in children {
                    child.collect_features(out);
                }
            }
            ConditionNode::Not { pred } => pred.collect_features(out),
            ConditionNode::Gte { feature, .. }
            | ConditionNode::Lte { feature, .. }
            | ConditionNode::Eq { feature, .. }
            | ConditionNode::In { feature, .. } => out.push(feature.as_str()),
        }
    }
}

fn default_strength() -> u32 {
    1
}

/// 规则效果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Effect {
    AddPattern {
        tag: String,
        #[serde(rename = "baseSeverity")]
        base_severity: u8,
        domain: String,
    },
    /// 在已命中的模式上叠加严重度（上限为最高档）
    BoostPattern { tag: String, delta: u8 },
    AddDomain { domain: String, weight: u32 },
    AddPersonaTag {
        tag: String,
        #[serde(default = "default_strength")]
        strength: u32,
    },
    AddPlanTheme {
        category: String,
        theme: String,
        weight: u32,
    },
    RoadmapModifier { key: String, value: String },
}

/// 单条规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    pub when: ConditionNode,
    pub then: Vec<Effect>,
    /// 仅用于可解释性输出，不参与求值
    #[serde(rename = "evidenceFeatures", default)]
    pub evidence_features: Vec<String>,
    /// 同组内只有排序最靠前的命中规则生效
    #[serde(rename = "exclusiveGroup", default, skip_serializing_if = "Option::is_none")]
    pub exclusive_group: Option<String>,
}

impl Rule {
    /// 规范顺序：priority 降序，id 升序
    pub fn canonical_cmp(a: &Rule, b: &Rule) -> Ordering {
        b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
    }
}

/// 规则集文件（rulesets/<persona>/<version>.json）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetFile {
    pub persona: String,
    pub version: String,
    pub rules: Vec<Rule>,
}

/// 未校验的原始规则包：特征目录 + 规则集 + persona 配置 + 别名
/// 可整体缓存为 MessagePack 快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBundle {
    pub catalog: FeatureCatalog,
    pub rulesets: Vec<RulesetFile>,
    pub personas: Vec<PersonaSpec>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}
