//! 条件树求值
//! 缺失的特征视为 "未知"，任何比较运算都不成立

use crate::feature::{FeatureValue, FeatureVector};
use crate::rule::ConditionNode;

/// 条件求值器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 判断条件树在给定特征向量上是否成立
    pub fn matches(node: &ConditionNode, features: &FeatureVector) -> bool {
        match node {
            // 组合子：对全部子节点求值，不要求短路
            ConditionNode::And { all } => all
                .iter()
                .map(|child| Self::matches(child, features))
                .fold(true, |acc, hit| acc & hit),
            ConditionNode::Or { any } => any
                .iter()
                .map(|child| Self::matches(child, features))
                .fold(false, |acc, hit| acc | hit),
            ConditionNode::Not { pred } => !Self::matches(pred, features),

            ConditionNode::Gte { feature, bucket } => match features.get(feature) {
                Some(FeatureValue::Bucket(actual)) => actual.rank() >= bucket.rank(),
                _ => false,
            },
            ConditionNode::Lte { feature, bucket } => match features.get(feature) {
                Some(FeatureValue::Bucket(actual)) => actual.rank() <= bucket.rank(),
                _ => false,
            },
            ConditionNode::Eq { feature, value } => features
                .get(feature)
                .and_then(FeatureValue::scalar_text)
                .map(|actual| actual == value)
                .unwrap_or(false),
            ConditionNode::In { feature, values } => match features.get(feature) {
                // 集合特征：任一成员在列表中即成立
                Some(FeatureValue::Set(members)) => members.iter().any(|m| values.contains(m)),
                Some(other) => other
                    .scalar_text()
                    .map(|actual| values.iter().any(|v| v == actual))
                    .unwrap_or(false),
                None => false,
            },
        }
    }
}
