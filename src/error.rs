//! 全局错误类型定义
//! 配置类错误在加载期抛出；查找未命中、渲染缺口都不是错误

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;

#[derive(Error, Debug)]
pub enum RspersonaError {
    // 配置相关错误（加载期致命）
    /// 条件引用了目录中未声明的特征
    #[error("Unknown feature `{feature}` referenced by rule `{rule_id}`")]
    UnknownFeature { rule_id: String, feature: String },
    /// 比较运算符与特征取值类型不匹配（例如对布尔特征使用 gte）
    #[error("Rule `{rule_id}`: operator `{op}` cannot be applied to {kind} feature `{feature}`")]
    OperatorKindMismatch {
        rule_id: String,
        op: &'static str,
        feature: String,
        kind: String,
    },
    /// 同一模式标签在不同规则中声明了不同领域
    #[error("Pattern `{tag}` declared with domain `{first}` and `{second}` (rule `{rule_id}`)")]
    PatternDomainConflict {
        tag: String,
        first: String,
        second: String,
        rule_id: String,
    },
    #[error("Duplicate rule id `{0}`")]
    DuplicateRuleId(String),
    #[error("Invalid ruleset `{persona}/{version}`: {reason}")]
    InvalidRuleset {
        persona: String,
        version: String,
        reason: String,
    },
    #[error("Invalid roadmap template `{template_id}`: {reason}")]
    InvalidTemplate { template_id: String, reason: String },
    #[error("Invalid confidence rules for persona `{persona}`: {reason}")]
    InvalidConfidenceRules { persona: String, reason: String },
    #[error("Configuration error: {0}")]
    Configuration(String),

    // 加载相关错误
    #[error("Rule load failed: {0}")]
    RuleLoadError(String),
    #[error("Rule cache operation failed: {0}")]
    RuleCacheError(String),

    // 引擎相关错误
    #[error("Engine not initialized: {0}")]
    EngineNotInitialized(String),
    #[error("Engine initialization failed: {0}")]
    EngineInitError(String),

    // 序列化/反序列化错误
    #[error("JSON parse failed: {0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("Regex compilation failed: {0}")]
    RegexCompileError(#[from] RegexError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RspersonaError {
    /// 是否属于配置类错误（规则/模板/阈值校验失败）
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RspersonaError::UnknownFeature { .. }
                | RspersonaError::OperatorKindMismatch { .. }
                | RspersonaError::PatternDomainConflict { .. }
                | RspersonaError::DuplicateRuleId(_)
                | RspersonaError::InvalidRuleset { .. }
                | RspersonaError::InvalidTemplate { .. }
                | RspersonaError::InvalidConfidenceRules { .. }
                | RspersonaError::Configuration(_)
        )
    }
}

// 全局Result类型
pub type RspResult<T> = Result<T, RspersonaError>;
