//! 特征模块：特征取值模型与特征目录
pub mod model;
pub mod catalog;

// 导出核心接口
pub use self::model::{Bucket, FeatureKind, FeatureValue, FeatureVector};
pub use self::catalog::{ids, FeatureCatalog};
