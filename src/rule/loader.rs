//! 规则加载管理器
//! 负责从本地缓存、规则目录或内置规则包加载原始规则包

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::builtin::embedded_bundle;
use super::cache::RuleCacheManager;
use super::model::{PersonaId, RuleBundle, RulesetFile};
use crate::config::{EngineConfig, RuleOrigin};
use crate::error::{RspResult, RspersonaError};
use crate::feature::FeatureCatalog;
use crate::persona::PersonaSpec;

pub const FEATURES_FILE: &str = "features.json";
pub const ALIASES_FILE: &str = "aliases.json";
pub const RULESETS_DIR: &str = "rulesets";
pub const PERSONAS_DIR: &str = "personas";

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 加载规则包（优先本地缓存，缓存失效则读取规则来源）
    pub async fn load(config: &EngineConfig) -> RspResult<RuleBundle> {
        let start = Instant::now();

        // 1. 优先加载本地缓存
        if config.cache_path.is_some() {
            match RuleCacheManager::load_from_cache(config).await {
                Ok(bundle) => {
                    debug!("从本地缓存加载规则包成功，耗时{:?}", start.elapsed());
                    return Ok(bundle);
                }
                Err(e) => warn!("本地缓存不可用（{}），将读取规则来源", e),
            }
        }

        // 2. 读取规则来源
        let bundle = Self::load_from_origin(&config.origin).await?;
        debug!(
            "规则包加载完成：特征{}个、规则集{}个、persona配置{}个、别名{}个，耗时{:?}",
            bundle.catalog.len(),
            bundle.rulesets.len(),
            bundle.personas.len(),
            bundle.aliases.len(),
            start.elapsed()
        );

        // 3. 缓存到本地
        if config.cache_path.is_some() {
            if let Err(e) = RuleCacheManager::save_to_cache(config, &bundle).await {
                warn!("规则包缓存到本地失败：{}", e);
            } else {
                debug!("规则包已缓存到本地");
            }
        }

        Ok(bundle)
    }

    /// 按来源加载，不经过缓存
    pub async fn load_from_origin(origin: &RuleOrigin) -> RspResult<RuleBundle> {
        match origin {
            RuleOrigin::Embedded => embedded_bundle(),
            RuleOrigin::Directory(dir) => Self::load_dir(dir).await,
        }
    }

    /// 读取规则目录
    /// 布局：features.json、rulesets/<persona>/<version>.json、personas/<persona>.json、aliases.json
    pub async fn load_dir(dir: &Path) -> RspResult<RuleBundle> {
        if !tokio::fs::try_exists(dir).await? {
            return Err(RspersonaError::RuleLoadError(format!(
                "rules directory {} does not exist",
                dir.display()
            )));
        }

        // 1. 特征目录（必需）
        let catalog: FeatureCatalog = Self::read_json(&dir.join(FEATURES_FILE)).await?;

        // 2. 规则集：目录名即 persona，文件名即版本
        let mut rulesets = Vec::new();
        for persona_dir in Self::list_dir(&dir.join(RULESETS_DIR), true).await? {
            let persona = Self::file_label(&persona_dir)?;
            for file in Self::list_json_files(&persona_dir).await? {
                let ruleset: RulesetFile = Self::read_json(&file).await?;
                let version = Self::file_label(&file)?;
                if PersonaId::normalize(&ruleset.persona) != PersonaId::normalize(&persona) || ruleset.version != version {
                    return Err(RspersonaError::InvalidRuleset {
                        persona: ruleset.persona,
                        version: ruleset.version,
                        reason: format!("declared identity does not match path {}", file.display()),
                    });
                }
                rulesets.push(ruleset);
            }
        }

        // 3. persona 配置（可选目录）
        let mut personas = Vec::new();
        let personas_dir = dir.join(PERSONAS_DIR);
        if tokio::fs::try_exists(&personas_dir).await? {
            for file in Self::list_json_files(&personas_dir).await? {
                let spec: PersonaSpec = Self::read_json(&file).await?;
                personas.push(spec);
            }
        }

        // 4. 别名（可选文件）
        let aliases_path = dir.join(ALIASES_FILE);
        let aliases: BTreeMap<String, String> = if tokio::fs::try_exists(&aliases_path).await? {
            Self::read_json(&aliases_path).await?
        } else {
            BTreeMap::new()
        };

        Ok(RuleBundle {
            catalog,
            rulesets,
            personas,
            aliases,
        })
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> RspResult<T> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RspersonaError::RuleLoadError(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| RspersonaError::RuleLoadError(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// 列出目录项（按路径排序，保证加载顺序稳定）
    async fn list_dir(dir: &Path, dirs_only: bool) -> RspResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            RspersonaError::RuleLoadError(format!("failed to list {}: {}", dir.display(), e))
        })?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() == dirs_only {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn list_json_files(dir: &Path) -> RspResult<Vec<PathBuf>> {
        let files = Self::list_dir(dir, false).await?;
        Ok(files
            .into_iter()
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect())
    }

    fn file_label(path: &Path) -> RspResult<String> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| RspersonaError::RuleLoadError(format!("invalid path {}", path.display())))
    }
}
