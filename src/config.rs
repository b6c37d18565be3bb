//! 全局配置管理,存储所有可配置项

use std::collections::BTreeMap;
use std::path::PathBuf;

/// 规则来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOrigin {
    Embedded,           // 内置规则包（编译期 include）
    Directory(PathBuf), // 本地规则目录（运行时）
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // 规则来源
    pub origin: RuleOrigin,
    // MessagePack 规则快照路径（None 表示不使用缓存）
    pub cache_path: Option<PathBuf>,
    // 固定版本：persona -> version，未指定时取已加载的最高版本
    pub pinned_versions: BTreeMap<String, String>,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: RuleOrigin::Embedded,
            cache_path: None,
            pinned_versions: BTreeMap::new(),
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> EngineConfig {
        EngineConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: EngineConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn origin(mut self, origin: RuleOrigin) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn rules_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.origin = RuleOrigin::Directory(path.into());
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = Some(path.into());
        self
    }

    pub fn pin_version(mut self, persona: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.pinned_versions.insert(persona.into(), version.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ConfigManager::custom()
            .rules_dir("/tmp/rules")
            .cache_path("/tmp/rules.mp")
            .pin_version("traveller_free_screening", "v1")
            .verbose(true)
            .build();

        assert_eq!(config.origin, RuleOrigin::Directory(PathBuf::from("/tmp/rules")));
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/rules.mp")));
        assert_eq!(
            config.pinned_versions.get("traveller_free_screening").map(String::as_str),
            Some("v1")
        );
        assert!(config.verbose);
    }

    #[test]
    fn test_default_is_embedded_without_cache() {
        let config = ConfigManager::get_default();
        assert_eq!(config.origin, RuleOrigin::Embedded);
        assert!(config.cache_path.is_none());
        assert!(config.pinned_versions.is_empty());
    }
}
