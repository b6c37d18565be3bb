//! 特征数据模型定义
//! FeatureVector 由外部的答案分桶组件产出，引擎只读

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// 有序分桶：NONE < LOW < MED < HIGH
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    None,
    Low,
    Med,
    High,
}

impl Bucket {
    /// 分桶序号（0..=3）
    pub fn rank(self) -> u8 {
        match self {
            Bucket::None => 0,
            Bucket::Low => 1,
            Bucket::Med => 2,
            Bucket::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::None => "NONE",
            Bucket::Low => "LOW",
            Bucket::Med => "MED",
            Bucket::High => "HIGH",
        }
    }

    /// 按名称解析（大小写严格，与规则文件一致）
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "NONE" => Some(Bucket::None),
            "LOW" => Some(Bucket::Low),
            "MED" => Some(Bucket::Med),
            "HIGH" => Some(Bucket::High),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 特征取值类型（目录中声明）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Bucket,
    Boolean,
    Enum,
    Set,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Bucket => write!(f, "bucket"),
            FeatureKind::Boolean => write!(f, "boolean"),
            FeatureKind::Enum => write!(f, "enum"),
            FeatureKind::Set => write!(f, "set"),
        }
    }
}

/// 单个特征的取值
/// JSON 形如 `{"kind": "bucket", "value": "HIGH"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FeatureValue {
    Bucket(Bucket),
    Boolean(bool),
    Enum(String),
    Set(Vec<String>),
}

impl FeatureValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Bucket(_) => FeatureKind::Bucket,
            FeatureValue::Boolean(_) => FeatureKind::Boolean,
            FeatureValue::Enum(_) => FeatureKind::Enum,
            FeatureValue::Set(_) => FeatureKind::Set,
        }
    }

    /// 标量取值的文本形式（set 无标量形式）
    pub fn scalar_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Bucket(b) => Some(b.as_str()),
            FeatureValue::Boolean(true) => Some("true"),
            FeatureValue::Boolean(false) => Some("false"),
            FeatureValue::Enum(s) => Some(s.as_str()),
            FeatureValue::Set(_) => None,
        }
    }
}

impl From<Bucket> for FeatureValue {
    fn from(bucket: Bucket) -> Self {
        FeatureValue::Bucket(bucket)
    }
}

impl From<bool> for FeatureValue {
    fn from(flag: bool) -> Self {
        FeatureValue::Boolean(flag)
    }
}

/// 特征向量：特征ID -> 取值，每个特征至多出现一次
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式构造
    pub fn with(mut self, feature: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(feature, value);
        self
    }

    /// 写入特征，重复写入覆盖旧值（保证单一取值）
    pub fn insert(&mut self, feature: impl Into<String>, value: impl Into<FeatureValue>) -> Option<FeatureValue> {
        self.values.insert(feature.into(), value.into())
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureValue> {
        self.values.get(feature)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureVector {
    fn from_iter<T: IntoIterator<Item = (String, FeatureValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_order_matches_rank() {
        assert!(Bucket::None < Bucket::Low);
        assert!(Bucket::Low < Bucket::Med);
        assert!(Bucket::Med < Bucket::High);
        assert_eq!(Bucket::High.rank(), 3);
        assert_eq!(Bucket::parse("MED"), Some(Bucket::Med));
        assert_eq!(Bucket::parse("med"), None);
    }

    #[test]
    fn test_feature_vector_json_shape() {
        // 测试场景：与上游分桶组件约定的 {kind, value} 形态
        let json = r#"{
            "time_zone_shift": {"kind": "bucket", "value": "HIGH"},
            "has_diabetes": {"kind": "boolean", "value": true},
            "crp_status": {"kind": "enum", "value": "elevated"},
            "diet_patterns": {"kind": "set", "value": ["vegan", "gluten_free"]}
        }"#;
        let vector: FeatureVector = serde_json::from_str(json).unwrap();

        assert_eq!(vector.len(), 4);
        assert_eq!(vector.get("time_zone_shift"), Some(&FeatureValue::Bucket(Bucket::High)));
        assert_eq!(vector.get("has_diabetes").and_then(|v| v.scalar_text()), Some("true"));
        assert_eq!(vector.get("diet_patterns").map(|v| v.kind()), Some(FeatureKind::Set));
    }

    #[test]
    fn test_insert_keeps_single_value() {
        let mut vector = FeatureVector::new().with("stress_load", Bucket::Low);
        let previous = vector.insert("stress_load", Bucket::High);

        assert_eq!(previous, Some(FeatureValue::Bucket(Bucket::Low)));
        assert_eq!(vector.len(), 1);
        assert_eq!(vector.get("stress_load"), Some(&FeatureValue::Bucket(Bucket::High)));
    }
}
