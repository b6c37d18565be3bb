//! persona 模块：persona 专属词表、阈值与模板库
pub mod spec;
pub mod catalog;

pub use self::spec::{PatternLexiconEntry, PersonaSpec, PlanPillar};
pub use self::catalog::PersonaCatalog;
