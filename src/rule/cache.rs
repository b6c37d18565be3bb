//! 规则缓存管理
//! 仅处理规则包的本地序列化（MessagePack）和反序列化

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::RuleBundle;
use crate::config::{EngineConfig, RuleOrigin};
use crate::error::{RspResult, RspersonaError};

/// 快照格式版本，结构变化时递增
pub const CACHE_FORMAT_VERSION: u32 = 2;

/// 缓存快照：记录来源与目录指纹，任一不一致的快照视为失效
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheSnapshot {
    format_version: u32,
    origin: String,
    // 目录来源的文件指纹，内置规则包为 None
    fingerprint: Option<u64>,
    bundle: RuleBundle,
}

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从本地缓存加载规则包
    pub async fn load_from_cache(config: &EngineConfig) -> RspResult<RuleBundle> {
        let cache_path = Self::cache_path(config)?;
        let cache_data = tokio::fs::read(cache_path).await?;

        // MessagePack反序列化
        let snapshot: CacheSnapshot = rmp_serde::from_slice(&cache_data)
            .map_err(|e| RspersonaError::RuleCacheError(format!("deserialize failed: {}", e)))?;

        if snapshot.format_version != CACHE_FORMAT_VERSION {
            return Err(RspersonaError::RuleCacheError(format!(
                "cache format {} is not {}",
                snapshot.format_version, CACHE_FORMAT_VERSION
            )));
        }
        let expected = Self::origin_key(&config.origin);
        if snapshot.origin != expected {
            return Err(RspersonaError::RuleCacheError(format!(
                "cache was built from `{}`, expected `{}`",
                snapshot.origin, expected
            )));
        }

        // 目录内容变化后快照失效；目录不可读时按离线快照使用
        if let RuleOrigin::Directory(dir) = &config.origin {
            match Self::dir_fingerprint(dir).await {
                Ok(current) if snapshot.fingerprint != Some(current) => {
                    return Err(RspersonaError::RuleCacheError(format!(
                        "rules under {} changed since the cache was written",
                        dir.display()
                    )));
                }
                Ok(_) => {}
                Err(e) => warn!("规则目录 {} 不可读（{}），使用离线缓存快照", dir.display(), e),
            }
        }

        debug!(
            "缓存文件反序列化成功，规则集数：{}，persona配置数：{}",
            snapshot.bundle.rulesets.len(),
            snapshot.bundle.personas.len()
        );
        Ok(snapshot.bundle)
    }

    /// 将规则包缓存到本地
    pub async fn save_to_cache(config: &EngineConfig, bundle: &RuleBundle) -> RspResult<()> {
        let cache_path = Self::cache_path(config)?;
        let snapshot = CacheSnapshot {
            format_version: CACHE_FORMAT_VERSION,
            origin: Self::origin_key(&config.origin),
            fingerprint: match &config.origin {
                RuleOrigin::Embedded => None,
                RuleOrigin::Directory(dir) => Some(Self::dir_fingerprint(dir).await?),
            },
            bundle: bundle.clone(),
        };

        // MessagePack序列化（字段名保留，兼容带标签的枚举）
        let cache_data = rmp_serde::to_vec_named(&snapshot)
            .map_err(|e| RspersonaError::RuleCacheError(format!("serialize failed: {}", e)))?;
        debug!("规则包序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        if let Some(parent) = cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(cache_path, cache_data).await?;
        Ok(())
    }

    /// 清除本地缓存
    pub async fn clear_cache(config: &EngineConfig) -> RspResult<()> {
        let cache_path = Self::cache_path(config)?;
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }

    fn cache_path(config: &EngineConfig) -> RspResult<&Path> {
        config
            .cache_path
            .as_deref()
            .ok_or_else(|| RspersonaError::RuleCacheError("cache path not configured".to_string()))
    }

    fn origin_key(origin: &RuleOrigin) -> String {
        match origin {
            RuleOrigin::Embedded => format!("embedded:{}", env!("CARGO_PKG_VERSION")),
            RuleOrigin::Directory(path) => format!("dir:{}", path.display()),
        }
    }

    /// 目录指纹：所有 JSON 文件的相对路径、大小与修改时间的哈希
    async fn dir_fingerprint(dir: &Path) -> RspResult<u64> {
        let mut files: Vec<(PathBuf, u64, u128)> = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().map(|ext| ext != "json").unwrap_or(true) {
                    continue;
                }
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let relative = path.strip_prefix(dir).map(Path::to_path_buf).unwrap_or_else(|_| path.clone());
                files.push((relative, metadata.len(), modified));
            }
        }

        // read_dir 顺序不固定，排序后再哈希
        files.sort();
        let mut hasher = FxHasher::default();
        files.hash(&mut hasher);
        Ok(hasher.finish())
    }
}
