//! 学习评估：掌握度记录、弱点权重与出题。

pub mod mastery;
pub mod questions;
pub mod weights;

pub use mastery::{mastery_level, MasteryBook, MasteryRecord, TypeTally, MAX_MASTERY_LEVEL};
pub use questions::{build_choices, draw_question, pick_unit, select_question_type};
pub use weights::{type_weakness, weakness_weight, weighted_pick, WeightModel, Weighted};
