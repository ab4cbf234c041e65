//! 单体 HP 竞速战：答题驱动的回合制战斗。
//!
//! 每个操作都接收快照引用并返回新的快照；非法操作返回原快照的拷贝。

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Enemy, Gimmick, QuestionType, SkillCard};
use super::damage::{
    compute_damage, counter_damage, element_multiplier, timing_bonus, ComboTable, DamageInput,
};
use super::progress::{exp_for_battle, star_rating, PlayerStats};
use crate::config::DuelConfig;

pub const GAUGE_MAX: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuelPhase {
    #[default]
    Intro,
    Question,
    ResultCorrect,
    ResultWrong,
    ResultTimeout,
    SpecialAttack,
    Victory,
    Defeat,
}

impl DuelPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, DuelPhase::Victory | DuelPhase::Defeat)
    }

    fn is_result(self) -> bool {
        matches!(
            self,
            DuelPhase::ResultCorrect
                | DuelPhase::ResultWrong
                | DuelPhase::ResultTimeout
                | DuelPhase::SpecialAttack
        )
    }
}

/// 出给玩家的一道题。选项即可打出的技能卡。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleQuestion {
    pub template_id: String,
    pub kind: QuestionType,
    pub type_label: String,
    pub sentence: String,
    pub answer_id: String,
    pub choices: Vec<SkillCard>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// 玩家提交的回答。超时由调用方合成 `Timeout`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Chosen {
        card_index: usize,
        correct: bool,
        elapsed_secs: f64,
    },
    Timeout {
        elapsed_secs: f64,
    },
}

/// 单回合的结算记录，供复盘界面与掌握度统计使用。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnOutcome {
    pub turn: u32,
    pub correct: bool,
    pub timed_out: bool,
    pub damage_dealt: u32,
    pub damage_taken: u32,
    pub critical: bool,
    pub combo_multiplier: f64,
    pub timing_multiplier: f64,
    pub element_multiplier: f64,
    pub elapsed_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    /// 题目考查的单元。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_unit: Option<String>,
    /// 玩家实际选择的单元。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_unit: Option<String>,
}

impl TurnOutcome {
    pub fn tracked_unit(&self) -> Option<&str> {
        self.asked_unit
            .as_deref()
            .or(self.answered_unit.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DuelEvent {
    BattleStarted { enemy_id: String, max_turns: u32 },
    QuestionPresented {
        #[serde(skip_serializing_if = "Option::is_none")]
        template_id: Option<String>,
    },
    DamageDealt {
        card_id: String,
        amount: u32,
        critical: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    BarrierAbsorbed { before: u32, after: u32 },
    CounterTaken { amount: u32, reflected: bool },
    EnemyHealed { amount: u32 },
    SpecialReady,
    SpecialAttack { card_id: String, amount: u32 },
    BattleEnded { victory: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum DuelError {
    #[error("battle already finished")]
    BattleFinished,
    #[error("action not allowed during {actual:?}")]
    InvalidPhase { actual: DuelPhase },
    #[error("no card at index {index}")]
    CardNotFound { index: usize },
    #[error("special gauge is not full")]
    SpecialNotReady,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuelState {
    pub enemy: Enemy,
    pub enemy_hp: u32,
    pub player_hp: u32,
    pub player: PlayerStats,
    pub turn: u32,
    pub max_turns: u32,
    pub combo: u32,
    pub gauge: u32,
    pub special_ready: bool,
    pub hand: Vec<SkillCard>,
    pub time_limit_secs: f64,
    pub choice_count: usize,
    pub phase: DuelPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question: Option<BattleQuestion>,
    #[serde(default)]
    pub turn_log: Vec<TurnOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<DuelEvent>,
    #[serde(default)]
    pub config: DuelConfig,
}

impl DuelState {
    pub fn new<R>(
        enemy: Enemy,
        hand: Vec<SkillCard>,
        player: PlayerStats,
        config: DuelConfig,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let max_turns = match enemy.turn_cap {
            Some(cap) => cap.max(1),
            None if enemy.is_boss => config.boss_turn_cap,
            None if config.turn_cap_jitter > 0 => {
                config.base_turn_cap + rng.gen_range(0..config.turn_cap_jitter)
            }
            None => config.base_turn_cap,
        };
        let time_limit_secs = match enemy.gimmick {
            Some(Gimmick::TimeAccel { seconds }) => seconds,
            _ => config.time_limit_secs,
        };
        let choice_count = match enemy.gimmick {
            Some(Gimmick::ExtraChoices { count }) => count,
            _ => config.choice_count,
        };

        let event_log = vec![DuelEvent::BattleStarted {
            enemy_id: enemy.id.clone(),
            max_turns,
        }];

        Self {
            enemy_hp: enemy.max_hp,
            enemy,
            player_hp: player.max_hp,
            player,
            turn: 0,
            max_turns,
            combo: 0,
            gauge: 0,
            special_ready: false,
            hand,
            time_limit_secs,
            choice_count,
            phase: DuelPhase::Intro,
            current_question: None,
            turn_log: Vec::new(),
            event_log,
            config,
        }
    }

    fn record_event(&mut self, event: DuelEvent) {
        self.event_log.push(event);
    }

    /// 敌方或我方 HP 归零，或回合数达到上限。
    pub fn is_over(&self) -> bool {
        self.enemy_hp == 0 || self.player_hp == 0 || self.turn >= self.max_turns
    }

    /// 结束时敌方 HP 为 0 才算胜利。
    pub fn is_victory(&self) -> bool {
        self.enemy_hp == 0
    }

    fn card_for_answer(&self, card_index: usize) -> Result<SkillCard, DuelError> {
        match &self.current_question {
            Some(question) => {
                let choice = question
                    .choices
                    .get(card_index)
                    .ok_or(DuelError::CardNotFound { index: card_index })?;
                // 手牌中有同一助动词时使用玩家自己的卡（带等级）
                Ok(self
                    .hand
                    .iter()
                    .find(|card| card.particle_id == choice.particle_id)
                    .unwrap_or(choice)
                    .clone())
            }
            None => self
                .hand
                .get(card_index)
                .cloned()
                .ok_or(DuelError::CardNotFound { index: card_index }),
        }
    }

    fn finish(&mut self) {
        let victory = self.is_victory();
        self.phase = if victory {
            DuelPhase::Victory
        } else {
            DuelPhase::Defeat
        };
        self.current_question = None;
        self.record_event(DuelEvent::BattleEnded { victory });
    }
}

fn try_advance(
    state: &DuelState,
    question: Option<BattleQuestion>,
) -> Result<DuelState, DuelError> {
    if state.phase.is_terminal() {
        return Err(DuelError::BattleFinished);
    }
    if state.phase != DuelPhase::Intro && !state.phase.is_result() {
        return Err(DuelError::InvalidPhase {
            actual: state.phase,
        });
    }

    let mut next = state.clone();
    if next.phase != DuelPhase::Intro && next.is_over() {
        next.finish();
        return Ok(next);
    }

    next.record_event(DuelEvent::QuestionPresented {
        template_id: question.as_ref().map(|q| q.template_id.clone()),
    });
    next.current_question = question;
    next.phase = DuelPhase::Question;
    Ok(next)
}

/// 推进阶段：开场或结算后进入下一题，战斗结束时进入胜负阶段。
pub fn advance(state: &DuelState, question: Option<BattleQuestion>) -> DuelState {
    try_advance(state, question).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "duel advance rejected");
        state.clone()
    })
}

fn try_submit_answer<R>(
    state: &DuelState,
    answer: Answer,
    rng: &mut R,
) -> Result<(DuelState, TurnOutcome), DuelError>
where
    R: Rng + ?Sized,
{
    if state.phase.is_terminal() {
        return Err(DuelError::BattleFinished);
    }
    if state.phase != DuelPhase::Question {
        return Err(DuelError::InvalidPhase {
            actual: state.phase,
        });
    }

    let (card, correct, timed_out, elapsed_secs) = match answer {
        Answer::Chosen {
            card_index,
            correct,
            elapsed_secs,
        } => (Some(state.card_for_answer(card_index)?), correct, false, elapsed_secs),
        Answer::Timeout { elapsed_secs } => (None, false, true, elapsed_secs),
    };

    let mut next = state.clone();
    let config = &state.config;
    let timing = timing_bonus(elapsed_secs);
    let element = card
        .as_ref()
        .map(|card| element_multiplier(card.element, state.enemy.element))
        .unwrap_or(1.0);

    let mut damage_dealt = 0;
    let mut damage_taken = 0;
    let mut critical = false;

    if correct {
        next.combo = state.combo + 1;
        next.gauge = (state.gauge + config.gauge_per_correct).min(GAUGE_MAX);

        let card = card.as_ref().ok_or(DuelError::CardNotFound { index: 0 })?;
        critical = rng.gen_bool(config.critical_chance.clamp(0.0, 1.0));
        let input = DamageInput::new(
            f64::from(card.effective_power()),
            f64::from(state.player.attack),
            f64::from(state.enemy.defense),
        )
        .with_multipliers(ComboTable::DUEL.multiplier(next.combo), timing.multiplier, element)
        .critical(critical);
        damage_dealt = compute_damage(&input);

        if let (Some(Gimmick::Barrier { scale }), 0) = (state.enemy.gimmick, state.turn) {
            let before = damage_dealt;
            damage_dealt = ((f64::from(before) * scale).floor() as u32).max(1);
            next.record_event(DuelEvent::BarrierAbsorbed {
                before,
                after: damage_dealt,
            });
        }

        next.enemy_hp = state.enemy_hp.saturating_sub(damage_dealt);
        next.record_event(DuelEvent::DamageDealt {
            card_id: card.id.clone(),
            amount: damage_dealt,
            critical,
            label: timing.label.map(str::to_string),
        });
    } else {
        next.combo = 0;
        next.gauge = (f64::from(state.gauge) * config.wrong_gauge_factor).floor() as u32;

        let reflect = match state.enemy.gimmick {
            Some(Gimmick::Reflect { factor }) => Some(factor),
            _ => None,
        };
        damage_taken = counter_damage(state.player.max_hp, config.counter_ratio, reflect);
        next.player_hp = state.player_hp.saturating_sub(damage_taken);
        next.record_event(DuelEvent::CounterTaken {
            amount: damage_taken,
            reflected: reflect.is_some(),
        });
    }

    next.turn = state.turn + 1;
    let was_ready = state.special_ready;
    next.special_ready = next.gauge >= GAUGE_MAX;
    if next.special_ready && !was_ready {
        next.record_event(DuelEvent::SpecialReady);
    }

    if let Some(Gimmick::Heal { ratio }) = state.enemy.gimmick {
        if correct && next.turn % config.heal_period.max(1) == 0 {
            let amount = (f64::from(state.enemy.max_hp) * ratio).floor() as u32;
            next.enemy_hp = next.enemy_hp.saturating_add(amount).min(state.enemy.max_hp);
            next.record_event(DuelEvent::EnemyHealed { amount });
        }
    }

    let question = state.current_question.as_ref();
    let outcome = TurnOutcome {
        turn: next.turn,
        correct,
        timed_out,
        damage_dealt,
        damage_taken,
        critical,
        combo_multiplier: ComboTable::DUEL.multiplier(next.combo),
        timing_multiplier: timing.multiplier,
        element_multiplier: element,
        elapsed_secs,
        question_type: question.map(|q| q.kind),
        asked_unit: question.map(|q| q.answer_id.clone()),
        answered_unit: card.map(|card| card.particle_id),
    };

    next.turn_log.push(outcome.clone());
    next.current_question = None;
    next.phase = if timed_out {
        DuelPhase::ResultTimeout
    } else if correct {
        DuelPhase::ResultCorrect
    } else {
        DuelPhase::ResultWrong
    };

    Ok((next, outcome))
}

/// 结算一次回答。被拒绝时返回原快照且没有回合记录。
pub fn submit_answer<R>(
    state: &DuelState,
    answer: Answer,
    rng: &mut R,
) -> (DuelState, Option<TurnOutcome>)
where
    R: Rng + ?Sized,
{
    match try_submit_answer(state, answer, rng) {
        Ok((next, outcome)) => (next, Some(outcome)),
        Err(err) => {
            tracing::debug!(error = %err, "answer rejected");
            (state.clone(), None)
        }
    }
}

fn try_special_attack(state: &DuelState, card_index: usize) -> Result<DuelState, DuelError> {
    if state.phase.is_terminal() {
        return Err(DuelError::BattleFinished);
    }
    if state.phase != DuelPhase::Question && !state.phase.is_result() {
        return Err(DuelError::InvalidPhase {
            actual: state.phase,
        });
    }
    if !state.special_ready {
        return Err(DuelError::SpecialNotReady);
    }
    let card = state
        .hand
        .get(card_index)
        .ok_or(DuelError::CardNotFound { index: card_index })?;

    let input = DamageInput::new(
        f64::from(card.effective_power()),
        f64::from(state.player.attack),
        f64::from(state.enemy.defense),
    )
    .with_multipliers(
        ComboTable::DUEL.multiplier(state.combo),
        1.0,
        element_multiplier(card.element, state.enemy.element),
    )
    .special(true);
    let amount = compute_damage(&input);

    let mut next = state.clone();
    next.enemy_hp = state.enemy_hp.saturating_sub(amount);
    next.gauge = 0;
    next.special_ready = false;
    next.current_question = None;
    next.phase = DuelPhase::SpecialAttack;
    next.record_event(DuelEvent::SpecialAttack {
        card_id: card.id.clone(),
        amount,
    });
    Ok(next)
}

/// 必杀技：消耗满蓄力槽，不经过答题，必定命中。
pub fn special_attack(state: &DuelState, card_index: usize) -> DuelState {
    try_special_attack(state, card_index).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "special attack rejected");
        state.clone()
    })
}

/// 战斗结算结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuelSummary {
    pub victory: bool,
    pub enemy_id: String,
    pub turns: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub accuracy: f64,
    pub star_rating: u8,
    pub best_combo: u32,
    pub exp_gained: u32,
    pub stones_gained: u32,
}

/// 任意位置最长的连续答对数。
pub fn best_streak<I>(results: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    let mut best = 0;
    let mut current = 0;
    for correct in results {
        if correct {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

pub fn summarize(state: &DuelState) -> DuelSummary {
    let total_questions = state.turn_log.len() as u32;
    let correct_count = state.turn_log.iter().filter(|turn| turn.correct).count() as u32;
    let accuracy = if total_questions > 0 {
        f64::from(correct_count) / f64::from(total_questions)
    } else {
        0.0
    };
    let victory = state.is_victory();

    DuelSummary {
        victory,
        enemy_id: state.enemy.id.clone(),
        turns: state.turn,
        correct_count,
        total_questions,
        accuracy,
        star_rating: if victory { star_rating(accuracy) } else { 0 },
        best_combo: best_streak(state.turn_log.iter().map(|turn| turn.correct)),
        exp_gained: exp_for_battle(state.enemy.drop_exp, victory),
        stones_gained: if victory { state.enemy.drop_stones } else { 0 },
    }
}
