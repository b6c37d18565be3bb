//! 全局引擎单例管理
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::engine::{PersonalizationEngine, PersonalizationReport};
use crate::config::{ConfigManager, EngineConfig};
use crate::error::{RspResult, RspersonaError};
use crate::feature::FeatureVector;

/// 全局引擎实例
static GLOBAL_ENGINE: Lazy<Arc<OnceCell<PersonalizationEngine>>> = Lazy::new(|| Arc::new(OnceCell::new()));

/// 初始化全局引擎（默认配置）
pub async fn init_global_engine() -> RspResult<()> {
    init_global_engine_with_config(ConfigManager::get_default()).await
}

/// 带自定义配置初始化全局引擎，重复调用时保留首次的实例
pub async fn init_global_engine_with_config(config: EngineConfig) -> RspResult<()> {
    GLOBAL_ENGINE
        .get_or_try_init(|| PersonalizationEngine::new(config))
        .await?;
    Ok(())
}

/// 获取全局引擎
pub fn global_engine() -> RspResult<&'static PersonalizationEngine> {
    GLOBAL_ENGINE.get().ok_or_else(|| {
        RspersonaError::EngineNotInitialized("call init_global_engine first".to_string())
    })
}

/// 使用全局引擎执行个性化
pub fn personalize(persona: &str, features: &FeatureVector) -> RspResult<PersonalizationReport> {
    let engine = global_engine()?;
    Ok(engine.personalize(persona, features))
}
