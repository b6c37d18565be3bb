//! 安全检查数据模型
//! 用户问卷中与禁忌相关的字段全部可选，未知字段被收集后忽略

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// 妊娠状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyStatus {
    Pregnant,
    TryingToConceive,
    NotApplicable,
    /// 无法识别的取值按 "不适用" 处理
    #[serde(other)]
    Unknown,
}

/// 用户医疗信息披露
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserResponses {
    #[serde(default)]
    pub pregnancy_status: Option<PregnancyStatus>,
    #[serde(default)]
    pub medications: Option<Vec<String>>,
    #[serde(default)]
    pub medical_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub gerd: Option<bool>,
    #[serde(default)]
    pub kidney_disease: Option<bool>,
    #[serde(default)]
    pub thyroid_disease: Option<bool>,
    #[serde(default)]
    pub anticoagulants: Option<bool>,
    /// 其余问卷字段
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl UserResponses {
    pub fn is_pregnant_or_trying(&self) -> bool {
        matches!(
            self.pregnancy_status,
            Some(PregnancyStatus::Pregnant) | Some(PregnancyStatus::TryingToConceive)
        )
    }

    pub fn medications(&self) -> &[String] {
        self.medications.as_deref().unwrap_or(&[])
    }

    pub fn medical_conditions(&self) -> &[String] {
        self.medical_conditions.as_deref().unwrap_or(&[])
    }
}

/// 补充剂推荐
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplement {
    pub name: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub safety: String,
    /// 分类标签（如 "adaptogen"），优先于名称关键词匹配
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Supplement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// 安全检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyResult {
    pub supplements: Vec<Supplement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    pub warnings: Vec<String>,
}
