//! 规则集注册表
//! 按规范 persona 标识存放各版本的编译后规则集，别名解析只在入口处发生一次

use std::cmp::Ordering;
use std::collections::BTreeMap;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::model::{PersonaId, Rule};
use crate::compiler::CompiledRuleset;
use crate::error::{RspResult, RspersonaError};

/// 规则集注册表（加载后只读）
#[derive(Debug, Clone, Default)]
pub struct RulesetRegistry {
    rulesets: FxHashMap<PersonaId, BTreeMap<String, CompiledRuleset>>,
    // persona -> 生效版本
    active: FxHashMap<PersonaId, String>,
    // 规范化别名 -> 规范ID
    aliases: FxHashMap<String, PersonaId>,
    // 显式固定的版本不会被后续注册覆盖
    pinned: FxHashMap<PersonaId, String>,
}

impl RulesetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个编译后的规则集，同一 persona 同一版本重复注册视为配置错误
    pub fn register(&mut self, ruleset: CompiledRuleset) -> RspResult<()> {
        let persona = ruleset.persona.clone();
        let version = ruleset.version.clone();
        let versions = self.rulesets.entry(persona.clone()).or_default();
        if versions.contains_key(&version) {
            return Err(RspersonaError::InvalidRuleset {
                persona: persona.to_string(),
                version,
                reason: "version registered twice".to_string(),
            });
        }
        versions.insert(version.clone(), ruleset);

        // 未固定版本时，生效版本始终是最高版本
        if !self.pinned.contains_key(&persona) {
            let highest = versions
                .keys()
                .max_by(|a, b| compare_versions(a, b))
                .cloned()
                .unwrap_or(version);
            self.active.insert(persona.clone(), highest);
        }
        debug!("注册规则集 {}，当前生效版本 {:?}", persona, self.active.get(&persona));
        Ok(())
    }

    /// 注册别名，别名不能遮蔽已存在的规范ID
    pub fn add_alias(&mut self, alias: &str, target: &PersonaId) -> RspResult<()> {
        let key = PersonaId::normalize(alias);
        if key.is_empty() {
            return Err(RspersonaError::Configuration("empty persona alias".to_string()));
        }
        if key != target.as_str() && self.rulesets.contains_key(&PersonaId::new(&key)) {
            return Err(RspersonaError::Configuration(format!(
                "alias `{}` shadows an existing persona",
                alias
            )));
        }
        self.aliases.insert(key, target.clone());
        Ok(())
    }

    /// 固定某个 persona 的生效版本
    pub fn pin(&mut self, persona: &str, version: &str) -> RspResult<()> {
        let id = self.resolve(persona).ok_or_else(|| {
            RspersonaError::Configuration(format!("cannot pin unknown persona `{}`", persona))
        })?;
        let known = self
            .rulesets
            .get(&id)
            .map(|versions| versions.contains_key(version))
            .unwrap_or(false);
        if !known {
            return Err(RspersonaError::Configuration(format!(
                "cannot pin `{}` to missing version `{}`",
                id, version
            )));
        }
        self.pinned.insert(id.clone(), version.to_string());
        self.active.insert(id, version.to_string());
        Ok(())
    }

    /// 原始标识 -> 规范ID（先规范化，再查别名）；未知 persona 返回 None
    pub fn resolve(&self, raw: &str) -> Option<PersonaId> {
        let key = PersonaId::normalize(raw);
        if let Some(target) = self.aliases.get(&key) {
            return Some(target.clone());
        }
        let id = PersonaId::new(&key);
        self.rulesets.contains_key(&id).then_some(id)
    }

    pub fn contains(&self, persona: &PersonaId) -> bool {
        self.rulesets.contains_key(persona)
    }

    /// 生效规则集（规范顺序），未知 persona 返回空切片
    pub fn get_ruleset(&self, persona: &str) -> &[Rule] {
        self.active_ruleset(persona)
            .map(CompiledRuleset::rules)
            .unwrap_or(&[])
    }

    /// 指定版本的规则集
    pub fn get_ruleset_version(&self, persona: &str, version: &str) -> Option<&CompiledRuleset> {
        let id = self.resolve(persona)?;
        self.rulesets.get(&id)?.get(version)
    }

    pub fn active_ruleset(&self, persona: &str) -> Option<&CompiledRuleset> {
        let id = self.resolve(persona)?;
        let version = self.active.get(&id)?;
        self.rulesets.get(&id)?.get(version)
    }

    /// 已注册的规范ID（升序）
    pub fn personas(&self) -> Vec<PersonaId> {
        let mut ids: Vec<PersonaId> = self.rulesets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 某个 persona 的全部版本（按版本号升序）
    pub fn versions(&self, persona: &str) -> Vec<String> {
        let mut versions: Vec<String> = self
            .resolve(persona)
            .and_then(|id| self.rulesets.get(&id))
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions
    }
}

/// 版本比较：`v<数字>` 按数值比较（v10 > v9），其余按字典序
fn compare_versions(a: &str, b: &str) -> Ordering {
    match (version_number(a), version_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

fn version_number(version: &str) -> Option<u64> {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .and_then(|digits| digits.parse().ok())
}
