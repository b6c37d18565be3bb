//! 模板渲染：解析占位符来源并替换 `{{key}}`
//! 取不到值的占位符即 RenderGap，按省略处理，不报错

use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use super::model::{Horizon, PlaceholderSource, RenderedRoadmap, RoadmapTemplate};
use crate::engine::RiskProfile;

static PLACEHOLDER_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").ok());

/// 提取文本中的占位符键（按出现顺序）
pub fn placeholder_keys(text: &str) -> Vec<&str> {
    match PLACEHOLDER_RE.as_ref() {
        Some(re) => re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect(),
        None => Vec::new(),
    }
}

/// 标识符 -> 展示文本
pub trait LabelResolver {
    /// 返回 None 时回退为下划线转空格的标识符
    fn label(&self, source: PlaceholderSource, id: &str) -> Option<String>;
}

/// 不做任何映射
pub struct IdentityLabels;

impl LabelResolver for IdentityLabels {
    fn label(&self, _source: PlaceholderSource, _id: &str) -> Option<String> {
        None
    }
}

/// 模板渲染器
pub struct RoadmapRenderer;

impl RoadmapRenderer {
    /// 渲染模板；必填占位符缺值时返回 None
    pub fn render(
        template: &RoadmapTemplate,
        profile: &RiskProfile,
        horizon: Horizon,
        matched_criteria: usize,
        labels: &dyn LabelResolver,
    ) -> Option<RenderedRoadmap> {
        // 1. 解析全部占位符
        let mut values: HashMap<&str, Option<String>> = HashMap::new();
        for placeholder in &template.render.placeholders {
            let value = Self::resolve(placeholder.source, profile, labels);
            if value.is_none() && placeholder.mandatory {
                warn!(
                    "模板 {} 的必填占位符 {} 无可用取值，模板被丢弃",
                    template.id, placeholder.key
                );
                return None;
            }
            values.insert(placeholder.key.as_str(), value);
        }

        // 2. 标题缺值折叠为空串，句子缺值整句省略
        let title = Self::fill(&template.render.title, &values).unwrap_or_else(|| {
            warn!("模板 {} 的标题存在未解析占位符，已置空", template.id);
            String::new()
        });
        let sentences = template
            .render
            .sentences
            .iter()
            .filter_map(|sentence| {
                let filled = Self::fill(sentence, &values);
                if filled.is_none() {
                    warn!("模板 {} 的句子存在未解析占位符，已省略：{}", template.id, sentence);
                }
                filled
            })
            .collect();

        Some(RenderedRoadmap {
            template_id: template.id.clone(),
            horizon,
            title,
            sentences,
            matched_criteria,
        })
    }

    /// 按来源取画像中的首选项
    fn resolve(source: PlaceholderSource, profile: &RiskProfile, labels: &dyn LabelResolver) -> Option<String> {
        let id = match source {
            PlaceholderSource::TopPattern => profile.top_pattern(),
            PlaceholderSource::TopDomain => profile.top_domain(),
            PlaceholderSource::PersonaTag => profile.top_persona_tag(),
            PlaceholderSource::PlanPillar => profile.top_plan_theme().map(|t| t.theme.as_str()),
        }?;
        Some(labels.label(source, id).unwrap_or_else(|| humanize(id)))
    }

    /// 替换文本中的占位符；存在缺值占位符时返回 None
    fn fill(text: &str, values: &HashMap<&str, Option<String>>) -> Option<String> {
        let re = match PLACEHOLDER_RE.as_ref() {
            Some(re) => re,
            None => return Some(text.to_string()),
        };
        let has_gap = placeholder_keys(text)
            .into_iter()
            .any(|key| !matches!(values.get(key), Some(Some(_))));
        if has_gap {
            return None;
        }
        let replaced = re.replace_all(text, |caps: &Captures| {
            caps.get(1)
                .and_then(|key| values.get(key.as_str()))
                .and_then(|value| value.clone())
                .unwrap_or_default()
        });
        Some(replaced.into_owned())
    }
}

/// `circadian_misalignment` -> `circadian misalignment`
pub fn humanize(id: &str) -> String {
    id.replace('_', " ")
}
