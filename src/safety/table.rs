//! 固定禁忌表
//! 条件 -> 补充剂变更，按表顺序求值，所有命中项都生效

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{Supplement, UserResponses};

pub const PREGNANCY_BANNER: &str =
    "If you are pregnant or taking prescription medication, consult a clinician before starting any supplements.";
pub const MEDICATION_BANNER: &str = "If you are taking prescription medications, consult your healthcare provider before starting any supplements to avoid potential interactions.";

/// 补充剂分类（按标签或名称关键词识别）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplementCategory {
    Adaptogen,
    Omega3,
    Magnesium,
    Ashwagandha,
    VitaminC,
}

impl SupplementCategory {
    pub const ALL: [SupplementCategory; 5] = [
        SupplementCategory::Adaptogen,
        SupplementCategory::Omega3,
        SupplementCategory::Magnesium,
        SupplementCategory::Ashwagandha,
        SupplementCategory::VitaminC,
    ];

    /// 补充剂 `tags` 中使用的分类标签
    pub fn tag(self) -> &'static str {
        match self {
            SupplementCategory::Adaptogen => "adaptogen",
            SupplementCategory::Omega3 => "omega3",
            SupplementCategory::Magnesium => "magnesium",
            SupplementCategory::Ashwagandha => "ashwagandha",
            SupplementCategory::VitaminC => "vitamin_c",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            SupplementCategory::Adaptogen => &["ashwagandha", "rhodiola", "ginseng", "maca", "holy basil"],
            SupplementCategory::Omega3 => &["omega-3", "omega 3", "fish oil", "epa", "dha"],
            SupplementCategory::Magnesium => &["magnesium"],
            SupplementCategory::Ashwagandha => &["ashwagandha"],
            SupplementCategory::VitaminC => &["vitamin c", "ascorbic acid"],
        }
    }

    fn index(self) -> usize {
        match self {
            SupplementCategory::Adaptogen => 0,
            SupplementCategory::Omega3 => 1,
            SupplementCategory::Magnesium => 2,
            SupplementCategory::Ashwagandha => 3,
            SupplementCategory::VitaminC => 4,
        }
    }

    /// 标签命中，或名称中出现完整的关键词
    pub fn matches(self, supplement: &Supplement) -> bool {
        if supplement.tags.iter().any(|t| t.eq_ignore_ascii_case(self.tag())) {
            return true;
        }
        CATEGORY_PATTERNS
            .get(self.index())
            .and_then(Option::as_ref)
            .map(|re| re.is_match(&supplement.name))
            .unwrap_or(false)
    }
}

// 补充剂名称两端都要求词边界，避免 "Ashwagandha" 被当成 "DHA"
static CATEGORY_PATTERNS: Lazy<Vec<Option<Regex>>> = Lazy::new(|| {
    SupplementCategory::ALL
        .iter()
        .map(|category| keyword_regex(category.keywords(), true))
        .collect()
});

// 药物/病史只要求词首边界，"hypothyroidism" 也应命中 "hypothyroid"
static ANTICOAGULANT_RE: Lazy<Option<Regex>> =
    Lazy::new(|| keyword_regex(&["warfarin", "heparin", "aspirin", "clopidogrel"], false));
static KIDNEY_RE: Lazy<Option<Regex>> = Lazy::new(|| keyword_regex(&["kidney", "renal"], false));
static THYROID_RE: Lazy<Option<Regex>> =
    Lazy::new(|| keyword_regex(&["thyroid", "hypothyroid", "hyperthyroid"], false));
static GERD_RE: Lazy<Option<Regex>> =
    Lazy::new(|| keyword_regex(&["gerd", "acid reflux", "heartburn"], false));

/// whole_word 时关键词须独立成词，允许复数后缀（"Fish Oils"、"Omega-3s"）
fn keyword_regex(words: &[&str], whole_word: bool) -> Option<Regex> {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    let tail = if whole_word { r"(?:e?s)?\b" } else { "" };
    Regex::new(&format!(r"(?i)\b(?:{}){}", alternatives.join("|"), tail)).ok()
}

fn any_matches(pattern: &Lazy<Option<Regex>>, texts: &[String]) -> bool {
    match pattern.as_ref() {
        Some(re) => texts.iter().any(|text| re.is_match(text)),
        None => false,
    }
}

/// 触发条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyCondition {
    PregnancyOrConception,
    Anticoagulants,
    KidneyDisease,
    ThyroidDisease,
    Gerd,
    PrescriptionMedication,
}

impl SafetyCondition {
    /// 缺失字段一律视为条件不成立
    pub fn holds(self, responses: &UserResponses) -> bool {
        match self {
            SafetyCondition::PregnancyOrConception => responses.is_pregnant_or_trying(),
            SafetyCondition::Anticoagulants => {
                responses.anticoagulants == Some(true) || any_matches(&ANTICOAGULANT_RE, responses.medications())
            }
            SafetyCondition::KidneyDisease => {
                responses.kidney_disease == Some(true) || any_matches(&KIDNEY_RE, responses.medical_conditions())
            }
            SafetyCondition::ThyroidDisease => {
                responses.thyroid_disease == Some(true) || any_matches(&THYROID_RE, responses.medical_conditions())
            }
            SafetyCondition::Gerd => {
                responses.gerd == Some(true) || any_matches(&GERD_RE, responses.medical_conditions())
            }
            SafetyCondition::PrescriptionMedication => !responses.medications().is_empty(),
        }
    }
}

/// 补充剂变更
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplementMutation {
    /// 移除该分类下的全部补充剂
    Remove(SupplementCategory),
    /// 改写该分类补充剂的安全提示
    Relabel {
        category: SupplementCategory,
        safety: &'static str,
    },
    /// 不改动补充剂，仅输出提示
    NoChange,
}

/// 禁忌表条目
#[derive(Debug, Clone, Copy)]
pub struct ContraindicationRule {
    pub id: &'static str,
    pub condition: SafetyCondition,
    pub mutation: SupplementMutation,
    pub banner: Option<&'static str>,
    pub warning: &'static str,
}

/// 禁忌表（顺序即求值顺序，决定横幅优先级）
pub static CONTRAINDICATION_TABLE: [ContraindicationRule; 6] = [
    ContraindicationRule {
        id: "pregnancy_adaptogens",
        condition: SafetyCondition::PregnancyOrConception,
        mutation: SupplementMutation::Remove(SupplementCategory::Adaptogen),
        banner: Some(PREGNANCY_BANNER),
        warning: "Adaptogens suppressed due to pregnancy status",
    },
    ContraindicationRule {
        id: "anticoagulant_omega3",
        condition: SafetyCondition::Anticoagulants,
        mutation: SupplementMutation::Relabel {
            category: SupplementCategory::Omega3,
            safety: "May interact with anticoagulants. Consult your healthcare provider before use.",
        },
        banner: Some(MEDICATION_BANNER),
        warning: "Omega-3 safety warning added due to anticoagulant use",
    },
    ContraindicationRule {
        id: "kidney_magnesium",
        condition: SafetyCondition::KidneyDisease,
        mutation: SupplementMutation::Relabel {
            category: SupplementCategory::Magnesium,
            safety: "Use with caution in kidney disease. Consult your healthcare provider for appropriate dosing.",
        },
        banner: None,
        warning: "Magnesium safety warning added due to kidney disease",
    },
    ContraindicationRule {
        id: "thyroid_ashwagandha",
        condition: SafetyCondition::ThyroidDisease,
        mutation: SupplementMutation::Relabel {
            category: SupplementCategory::Ashwagandha,
            safety: "May affect thyroid function. Consult your healthcare provider before use.",
        },
        banner: None,
        warning: "Ashwagandha safety warning added due to thyroid disease",
    },
    ContraindicationRule {
        id: "gerd_vitamin_c",
        condition: SafetyCondition::Gerd,
        mutation: SupplementMutation::Relabel {
            category: SupplementCategory::VitaminC,
            safety: "May cause stomach irritation. Take with food to reduce discomfort.",
        },
        banner: None,
        warning: "Vitamin C safety warning added due to GERD",
    },
    ContraindicationRule {
        id: "prescription_medication",
        condition: SafetyCondition::PrescriptionMedication,
        mutation: SupplementMutation::NoChange,
        banner: Some(MEDICATION_BANNER),
        warning: "General medication interaction warning added",
    },
];
