//! 安全模块：基于用户医疗披露的补充剂禁忌检查
pub mod model;
pub mod table;
pub mod checker;

// 导出核心接口
pub use self::model::{PregnancyStatus, SafetyResult, Supplement, UserResponses};
pub use self::table::{
    ContraindicationRule, SafetyCondition, SupplementCategory, SupplementMutation,
    CONTRAINDICATION_TABLE, MEDICATION_BANNER, PREGNANCY_BANNER,
};
pub use self::checker::{check_contraindications, SafetyChecker};
