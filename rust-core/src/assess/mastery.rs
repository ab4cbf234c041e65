use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::catalog::QuestionType;
use crate::game::duel::TurnOutcome;
use crate::game::state::ConnectionQuizResult;

pub const MAX_MASTERY_LEVEL: u8 = 5;

/// (答对次数, 正确率) 阈值，从高到低。
const LEVEL_THRESHOLDS: [(u32, f64, u8); 5] = [
    (50, 0.95, 5),
    (30, 0.90, 4),
    (20, 0.85, 3),
    (10, 0.80, 2),
    (5, 0.70, 1),
];

pub fn mastery_level(correct: u32, attempts: u32) -> u8 {
    if attempts == 0 {
        return 0;
    }
    let rate = f64::from(correct) / f64::from(attempts);
    LEVEL_THRESHOLDS
        .iter()
        .find(|(min_correct, min_rate, _)| correct >= *min_correct && rate >= *min_rate)
        .map(|(_, _, level)| *level)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeTally {
    pub attempts: u32,
    pub correct: u32,
}

impl TypeTally {
    fn record(&mut self, correct: bool) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
    }
}

/// 单个学习单元（助动词或技能）的累计作答记录。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MasteryRecord {
    pub attempts: u32,
    pub correct: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_type: BTreeMap<QuestionType, TypeTally>,
}

impl MasteryRecord {
    pub fn level(&self) -> u8 {
        mastery_level(self.correct, self.attempts)
    }

    fn record(&mut self, kind: Option<QuestionType>, correct: bool) {
        self.attempts += 1;
        if correct {
            self.correct += 1;
        }
        if let Some(kind) = kind {
            self.by_type.entry(kind).or_default().record(correct);
        }
    }
}

/// 学习者的全部掌握度记录，按单元 id 索引。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MasteryBook {
    pub records: BTreeMap<String, MasteryRecord>,
}

impl MasteryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析持久化的记录；数据损坏时从空记录重建，不中断初始化。
    pub fn from_json_lenient(json: Option<&str>) -> Self {
        let Some(raw) = json.filter(|raw| !raw.trim().is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<MasteryBook>(raw) {
            Ok(book) => book.sanitized(),
            Err(err) => {
                tracing::warn!(error = %err, "mastery record unreadable, starting from empty");
                Self::default()
            }
        }
    }

    /// 修正答对数大于作答数的记录。
    fn sanitized(mut self) -> Self {
        for (unit, record) in self.records.iter_mut() {
            if record.correct > record.attempts {
                tracing::warn!(unit = %unit, "clamping correct count to attempts");
                record.correct = record.attempts;
            }
            for tally in record.by_type.values_mut() {
                tally.correct = tally.correct.min(tally.attempts);
            }
        }
        self
    }

    pub fn get(&self, unit_id: &str) -> Option<&MasteryRecord> {
        self.records.get(unit_id)
    }

    pub fn level(&self, unit_id: &str) -> u8 {
        self.get(unit_id).map(MasteryRecord::level).unwrap_or(0)
    }

    pub fn with_attempt(&self, unit_id: &str, kind: Option<QuestionType>, correct: bool) -> Self {
        let mut next = self.clone();
        next.records
            .entry(unit_id.to_string())
            .or_default()
            .record(kind, correct);
        next
    }

    /// 把一回合的结果计入被提问的单元。
    pub fn record_turn(&self, outcome: &TurnOutcome) -> Self {
        match outcome.tracked_unit() {
            Some(unit) => self.with_attempt(unit, outcome.question_type, outcome.correct),
            None => self.clone(),
        }
    }

    pub fn record_quiz(&self, quiz: &ConnectionQuizResult) -> Self {
        self.with_attempt(
            &quiz.particle_id,
            Some(QuestionType::Connection),
            quiz.is_correct,
        )
    }

    /// 跨所有单元汇总某题型的作答情况。
    pub fn type_totals(&self, kind: QuestionType) -> TypeTally {
        self.records
            .values()
            .filter_map(|record| record.by_type.get(&kind))
            .fold(TypeTally::default(), |acc, tally| TypeTally {
                attempts: acc.attempts + tally.attempts,
                correct: acc.correct + tally.correct,
            })
    }
}
