//! 编译模块：校验原始规则并固化为规范顺序的只读规则集
pub mod compiled;
pub mod compiler;

pub use self::compiled::{CompiledBundle, CompiledRuleset};
pub use self::compiler::{RuleCompiler, MAX_SEVERITY};
