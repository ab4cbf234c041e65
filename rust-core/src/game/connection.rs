//! 接续判定：助动词要求动词的哪一个活用形。
//!
//! 例外规则集中在 [`RULE_TABLE`] 中，统一由 [`check_connection`] 解释。

use serde::{Deserialize, Serialize};

use super::catalog::{ConnectionCategory, FormSlot, Particle, Verb, VerbClass};

/// 四段・ナ変・ラ変。
pub const YODAN_GROUP: &[VerbClass] = &[VerbClass::Yodan, VerbClass::NaHen, VerbClass::RaHen];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    /// 只能接在列出的活用类型后。
    Only(&'static [VerbClass]),
    /// 不能接在列出的活用类型后。
    Except(&'static [VerbClass]),
    /// 完全按活用类型决定活用形，忽略接续类别。
    Bespoke(&'static [(VerbClass, FormSlot)]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEntry {
    pub particle_id: &'static str,
    pub restriction: Restriction,
    pub reason: Option<&'static str>,
}

pub const RULE_TABLE: &[RuleEntry] = &[
    RuleEntry {
        particle_id: "ru",
        restriction: Restriction::Only(YODAN_GROUP),
        reason: None,
    },
    RuleEntry {
        particle_id: "su",
        restriction: Restriction::Only(YODAN_GROUP),
        reason: None,
    },
    RuleEntry {
        particle_id: "raru",
        restriction: Restriction::Except(YODAN_GROUP),
        reason: None,
    },
    RuleEntry {
        particle_id: "sasu",
        restriction: Restriction::Except(YODAN_GROUP),
        reason: None,
    },
    RuleEntry {
        particle_id: "ri",
        restriction: Restriction::Bespoke(&[
            (VerbClass::SaHen, FormSlot::Mizenkei),
            (VerbClass::Yodan, FormSlot::Izenkei),
        ]),
        reason: Some("「り」はサ変未然形・四段已然形にのみ接続します"),
    },
];

fn rule_for(particle_id: &str) -> Option<&'static RuleEntry> {
    RULE_TABLE
        .iter()
        .find(|entry| entry.particle_id == particle_id)
}

/// 接续类别到活用形的映射；体言接续按连体形处理。
pub fn category_slot(category: ConnectionCategory) -> Option<FormSlot> {
    match category {
        ConnectionCategory::Mizenkei => Some(FormSlot::Mizenkei),
        ConnectionCategory::Renyoukei => Some(FormSlot::Renyoukei),
        ConnectionCategory::Shuushikei => Some(FormSlot::Shuushikei),
        ConnectionCategory::Rentaikei | ConnectionCategory::Taigen => Some(FormSlot::Rentaikei),
        ConnectionCategory::Special => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub can_connect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_slot: Option<FormSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_form_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Connection {
    fn resolved(verb: &Verb, slot: FormSlot) -> Self {
        Self {
            can_connect: true,
            required_slot: Some(slot),
            required_form: Some(verb.conjugation.form(slot).to_string()),
            required_form_label: Some(slot.label().to_string()),
            reason: None,
        }
    }

    fn refused(reason: String) -> Self {
        Self {
            can_connect: false,
            required_slot: None,
            required_form: None,
            required_form_label: None,
            reason: Some(reason),
        }
    }
}

fn restriction_reason(particle: &Particle, entry: &RuleEntry) -> String {
    if let Some(reason) = entry.reason {
        return reason.to_string();
    }
    match entry.restriction {
        Restriction::Only(classes) => format!(
            "「{}」は{}にのみ接続します",
            particle.name,
            join_labels(classes)
        ),
        Restriction::Except(classes) => format!(
            "「{}」は{}以外に接続します",
            particle.name,
            join_labels(classes)
        ),
        Restriction::Bespoke(_) => format!("「{}」は特殊な接続をします", particle.name),
    }
}

fn join_labels(classes: &[VerbClass]) -> String {
    classes
        .iter()
        .map(|class| class.label())
        .collect::<Vec<_>>()
        .join("・")
}

/// 判定助动词能否接在动词后，以及要求的活用形。
pub fn check_connection(particle: &Particle, verb: &Verb) -> Connection {
    let entry = rule_for(&particle.id);

    let slot = match entry.map(|entry| entry.restriction) {
        Some(Restriction::Bespoke(branches)) => branches
            .iter()
            .find(|(class, _)| *class == verb.class)
            .map(|(_, slot)| *slot),
        Some(Restriction::Only(classes)) if !classes.contains(&verb.class) => None,
        Some(Restriction::Except(classes)) if classes.contains(&verb.class) => None,
        _ => category_slot(particle.category),
    };

    match (slot, entry) {
        (Some(slot), _) => Connection::resolved(verb, slot),
        (None, Some(entry)) => Connection::refused(restriction_reason(particle, entry)),
        (None, None) => Connection::refused(format!(
            "「{}」は「{}」に接続できません",
            particle.name, verb.name
        )),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerCheck {
    pub correct: bool,
    pub correct_form: Option<String>,
}

/// 无法接续时一律判错，且不给出正确形。
pub fn validate_answer(particle: &Particle, verb: &Verb, chosen_form: &str) -> AnswerCheck {
    let connection = check_connection(particle, verb);
    match connection.required_form {
        Some(form) if connection.can_connect => AnswerCheck {
            correct: chosen_form == form,
            correct_form: Some(form),
        },
        _ => AnswerCheck {
            correct: false,
            correct_form: None,
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InflectedForm {
    pub slot: FormSlot,
    pub label: String,
    pub form: String,
}

pub fn list_inflected_forms(verb: &Verb) -> Vec<InflectedForm> {
    FormSlot::ALL
        .iter()
        .map(|slot| InflectedForm {
            slot: *slot,
            label: slot.label().to_string(),
            form: verb.conjugation.form(*slot).to_string(),
        })
        .collect()
}
