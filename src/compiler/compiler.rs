//! 规则编译器核心
//! 负责加载期校验：特征是否声明、运算符与取值类型是否匹配、模式领域是否一致
//! 校验失败即拒绝整个规则集，不做任何静默修补

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::compiled::{CompiledBundle, CompiledRuleset};
use crate::config::EngineConfig;
use crate::error::{RspResult, RspersonaError};
use crate::feature::{Bucket, FeatureCatalog, FeatureKind};
use crate::persona::PersonaCatalog;
use crate::rule::{ConditionNode, Effect, PersonaId, Rule, RuleBundle, RulesetFile, RulesetRegistry};

/// 严重度档位上限（0..=3）
pub const MAX_SEVERITY: u8 = 3;

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译整个规则包：规则集 -> 注册表，persona 配置 -> 配置目录
    pub fn compile_bundle(bundle: &RuleBundle, config: &EngineConfig) -> RspResult<CompiledBundle> {
        let start = Instant::now();
        let mut registry = RulesetRegistry::new();
        let mut stats = CompileStats::default();

        // 1. 编译每个规则集
        for file in &bundle.rulesets {
            let compiled = Self::compile_ruleset_with_stats(file, &bundle.catalog, &mut stats)?;
            registry.register(compiled)?;
        }

        // 2. 编译 persona 配置
        let mut personas = PersonaCatalog::new();
        for spec in &bundle.personas {
            spec.validate()?;
            personas.insert(spec.clone())?;
        }

        // 3. 注册别名（目标必须是已知 persona）
        for (alias, target) in &bundle.aliases {
            let target_id = PersonaId::new(target);
            if !registry.contains(&target_id) && !personas.contains(&target_id) {
                return Err(RspersonaError::Configuration(format!(
                    "alias `{}` points to unknown persona `{}`",
                    alias, target
                )));
            }
            registry.add_alias(alias, &target_id)?;
        }

        // 4. 应用版本固定
        for (persona, version) in &config.pinned_versions {
            registry.pin(persona, version)?;
        }

        let summary = format!(
            "📊 编译统计：规则集{}个、规则{}条、叶子条件{}个、效果{}个、persona配置{}个，总耗时{:?}",
            bundle.rulesets.len(),
            stats.rule_count,
            stats.leaf_count,
            stats.effect_count,
            personas.len(),
            start.elapsed()
        );
        // verbose 时统计提升到 info 级别
        if config.verbose {
            info!("{}", summary);
        } else {
            debug!("{}", summary);
        }

        Ok(CompiledBundle::new(bundle.catalog.clone(), registry, personas))
    }

    /// 编译单个规则集
    pub fn compile_ruleset(file: &RulesetFile, catalog: &FeatureCatalog) -> RspResult<CompiledRuleset> {
        let mut stats = CompileStats::default();
        Self::compile_ruleset_with_stats(file, catalog, &mut stats)
    }

    fn compile_ruleset_with_stats(
        file: &RulesetFile,
        catalog: &FeatureCatalog,
        stats: &mut CompileStats,
    ) -> RspResult<CompiledRuleset> {
        let invalid = |reason: String| RspersonaError::InvalidRuleset {
            persona: file.persona.clone(),
            version: file.version.clone(),
            reason,
        };

        if PersonaId::normalize(&file.persona).is_empty() {
            return Err(invalid("persona id is empty".to_string()));
        }
        if file.version.trim().is_empty() {
            return Err(invalid("version is empty".to_string()));
        }

        let mut seen_ids = HashSet::new();
        // 模式标签 -> (领域, 首次声明的规则)
        let mut pattern_domains: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
        let mut boosted: BTreeSet<(&str, &str)> = BTreeSet::new();

        for rule in &file.rules {
            if rule.id.trim().is_empty() {
                return Err(invalid("rule with empty id".to_string()));
            }
            if !seen_ids.insert(rule.id.as_str()) {
                return Err(RspersonaError::DuplicateRuleId(rule.id.clone()));
            }

            // 1. 校验条件树
            Self::check_condition(&rule.when, rule, catalog, stats)
                .map_err(|e| Self::attach_context(e, file))?;

            // 2. 校验效果
            if rule.then.is_empty() {
                warn!("规则 {} 没有任何效果，命中后不会改变画像", rule.id);
            }
            for effect in &rule.then {
                stats.effect_count += 1;
                match effect {
                    Effect::AddPattern { tag, base_severity, domain } => {
                        if tag.is_empty() || domain.is_empty() {
                            return Err(invalid(format!("rule `{}`: addPattern needs tag and domain", rule.id)));
                        }
                        if *base_severity > MAX_SEVERITY {
                            return Err(invalid(format!(
                                "rule `{}`: severity {} of pattern `{}` exceeds {}",
                                rule.id, base_severity, tag, MAX_SEVERITY
                            )));
                        }
                        match pattern_domains.get(tag.as_str()) {
                            Some((first, _)) if *first != domain.as_str() => {
                                return Err(RspersonaError::PatternDomainConflict {
                                    tag: tag.clone(),
                                    first: first.to_string(),
                                    second: domain.clone(),
                                    rule_id: rule.id.clone(),
                                });
                            }
                            Some(_) => {}
                            None => {
                                pattern_domains.insert(tag.as_str(), (domain.as_str(), rule.id.as_str()));
                            }
                        }
                    }
                    Effect::BoostPattern { tag, delta } => {
                        if *delta == 0 || *delta > MAX_SEVERITY {
                            return Err(invalid(format!(
                                "rule `{}`: boost delta {} for `{}` out of range 1..={}",
                                rule.id, delta, tag, MAX_SEVERITY
                            )));
                        }
                        boosted.insert((tag.as_str(), rule.id.as_str()));
                    }
                    Effect::AddDomain { domain, .. } if domain.is_empty() => {
                        return Err(invalid(format!("rule `{}`: addDomain with empty domain", rule.id)));
                    }
                    Effect::AddPersonaTag { tag, .. } if tag.is_empty() => {
                        return Err(invalid(format!("rule `{}`: addPersonaTag with empty tag", rule.id)));
                    }
                    Effect::AddPlanTheme { category, theme, .. } if category.is_empty() || theme.is_empty() => {
                        return Err(invalid(format!("rule `{}`: addPlanTheme needs category and theme", rule.id)));
                    }
                    Effect::RoadmapModifier { key, .. } if key.is_empty() => {
                        return Err(invalid(format!("rule `{}`: roadmapModifier with empty key", rule.id)));
                    }
                    _ => {}
                }
            }

            // 3. 证据特征必须已声明
            for feature in &rule.evidence_features {
                if !catalog.contains(feature) {
                    return Err(RspersonaError::UnknownFeature {
                        rule_id: rule.id.clone(),
                        feature: feature.clone(),
                    });
                }
            }
            stats.rule_count += 1;
        }

        // 4. boostPattern 只能作用于本规则集中声明过的模式
        for (tag, rule_id) in boosted {
            if !pattern_domains.contains_key(tag) {
                return Err(invalid(format!(
                    "rule `{}` boosts pattern `{}` that no rule adds",
                    rule_id, tag
                )));
            }
        }

        // 5. 按规范顺序固化
        let mut rules = file.rules.clone();
        rules.sort_by(Rule::canonical_cmp);

        debug!(
            "规则集 {}/{} 编译完成：规则{}条、模式标签{}个",
            file.persona,
            file.version,
            rules.len(),
            pattern_domains.len()
        );

        Ok(CompiledRuleset::new(PersonaId::new(&file.persona), file.version.clone(), rules))
    }

    /// 递归校验条件树
    fn check_condition(
        node: &ConditionNode,
        rule: &Rule,
        catalog: &FeatureCatalog,
        stats: &mut CompileStats,
    ) -> RspResult<()> {
        match node {
            ConditionNode::And { all: children } | ConditionNode::Or { any: children } => {
                if children.is_empty() {
                    return Err(RspersonaError::Configuration(format!(
                        "rule `{}`: empty `{}` combinator",
                        rule.id,
                        node.op_name()
                    )));
                }
                for child in children {
                    Self::check_condition(child, rule, catalog, stats)?;
                }
                Ok(())
            }
            ConditionNode::Not { pred } => Self::check_condition(pred, rule, catalog, stats),
            ConditionNode::Gte { feature, .. } | ConditionNode::Lte { feature, .. } => {
                stats.leaf_count += 1;
                let kind = Self::declared_kind(feature, rule, catalog)?;
                if kind != FeatureKind::Bucket {
                    return Err(Self::mismatch(node, feature, kind, rule));
                }
                Ok(())
            }
            ConditionNode::Eq { feature, value } => {
                stats.leaf_count += 1;
                let kind = Self::declared_kind(feature, rule, catalog)?;
                if kind == FeatureKind::Set || !Self::value_fits(kind, value) {
                    return Err(Self::mismatch(node, feature, kind, rule));
                }
                Ok(())
            }
            ConditionNode::In { feature, values } => {
                stats.leaf_count += 1;
                let kind = Self::declared_kind(feature, rule, catalog)?;
                if values.is_empty() {
                    return Err(RspersonaError::Configuration(format!(
                        "rule `{}`: `in` on `{}` with empty value list",
                        rule.id, feature
                    )));
                }
                if values.iter().any(|v| !Self::value_fits(kind, v)) {
                    return Err(Self::mismatch(node, feature, kind, rule));
                }
                Ok(())
            }
        }
    }

    fn declared_kind(feature: &str, rule: &Rule, catalog: &FeatureCatalog) -> RspResult<FeatureKind> {
        catalog.kind_of(feature).ok_or_else(|| RspersonaError::UnknownFeature {
            rule_id: rule.id.clone(),
            feature: feature.to_string(),
        })
    }

    /// 比较值是否属于该特征类型的取值域
    fn value_fits(kind: FeatureKind, value: &str) -> bool {
        match kind {
            FeatureKind::Bucket => Bucket::parse(value).is_some(),
            FeatureKind::Boolean => value == "true" || value == "false",
            FeatureKind::Enum | FeatureKind::Set => !value.is_empty(),
        }
    }

    fn mismatch(node: &ConditionNode, feature: &str, kind: FeatureKind, rule: &Rule) -> RspersonaError {
        RspersonaError::OperatorKindMismatch {
            rule_id: rule.id.clone(),
            op: node.op_name(),
            feature: feature.to_string(),
            kind: kind.to_string(),
        }
    }

    /// 给无上下文的配置错误补上规则集信息
    fn attach_context(err: RspersonaError, file: &RulesetFile) -> RspersonaError {
        match err {
            RspersonaError::Configuration(reason) => RspersonaError::InvalidRuleset {
                persona: file.persona.clone(),
                version: file.version.clone(),
                reason,
            },
            other => other,
        }
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    rule_count: usize,
    leaf_count: usize,
    effect_count: usize,
}
