//! 内置规则包 - 仅在开启 embedded-rules 特性时编译进二进制
//! 与 data/ 目录下的文件一一对应，首次访问时解析，进程内仅一份

use crate::error::RspResult;
use super::model::RuleBundle;

#[cfg(feature = "embedded-rules")]
mod embedded {
    use once_cell::sync::OnceCell;

    use crate::error::{RspResult, RspersonaError};
    use crate::persona::PersonaSpec;
    use crate::rule::model::{RuleBundle, RulesetFile};

    static FEATURES_JSON: &str = include_str!("../../data/features.json");
    static ALIASES_JSON: &str = include_str!("../../data/aliases.json");

    // (路径, 内容)，路径只用于报错
    static RULESET_FILES: &[(&str, &str)] = &[(
        "rulesets/traveller_free_screening/v1.json",
        include_str!("../../data/rulesets/traveller_free_screening/v1.json"),
    )];

    static PERSONA_FILES: &[(&str, &str)] = &[(
        "personas/traveller_free_screening.json",
        include_str!("../../data/personas/traveller_free_screening.json"),
    )];

    static EMBEDDED_BUNDLE: OnceCell<RuleBundle> = OnceCell::new();

    fn parse<T: serde::de::DeserializeOwned>(path: &str, content: &str) -> RspResult<T> {
        serde_json::from_str(content)
            .map_err(|e| RspersonaError::RuleLoadError(format!("embedded `{}` is malformed: {}", path, e)))
    }

    pub(super) fn bundle() -> RspResult<&'static RuleBundle> {
        EMBEDDED_BUNDLE.get_or_try_init(|| {
            let rulesets = RULESET_FILES
                .iter()
                .map(|(path, content)| parse::<RulesetFile>(path, content))
                .collect::<RspResult<Vec<_>>>()?;
            let personas = PERSONA_FILES
                .iter()
                .map(|(path, content)| parse::<PersonaSpec>(path, content))
                .collect::<RspResult<Vec<_>>>()?;

            Ok(RuleBundle {
                catalog: parse("features.json", FEATURES_JSON)?,
                rulesets,
                personas,
                aliases: parse("aliases.json", ALIASES_JSON)?,
            })
        })
    }
}

/// 内置规则包（特性开启时）
#[cfg(feature = "embedded-rules")]
pub fn embedded_bundle() -> RspResult<RuleBundle> {
    embedded::bundle().map(Clone::clone)
}

/// 内置规则包（特性关闭时直接报错）
#[cfg(not(feature = "embedded-rules"))]
pub fn embedded_bundle() -> RspResult<RuleBundle> {
    Err(crate::error::RspersonaError::RuleLoadError(
        "embedded-rules feature is disabled; configure a rules directory".to_string(),
    ))
}

#[cfg(all(test, feature = "embedded-rules"))]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_bundle_parses() {
        let bundle = embedded_bundle().unwrap();
        assert!(!bundle.catalog.is_empty());
        assert_eq!(bundle.rulesets.len(), 1);
        assert_eq!(bundle.rulesets[0].version, "v1");
        assert_eq!(bundle.personas.len(), 1);
        assert_eq!(bundle.aliases.get("traveler").map(String::as_str), Some("traveller_free_screening"));
    }
}
