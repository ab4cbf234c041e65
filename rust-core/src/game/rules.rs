use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    connection::{check_connection, validate_answer},
    damage::{compute_damage, element_multiplier, ComboTable, DamageInput},
    state::{
        BoardCard, BoardEvent, BoardPhase, BoardState, CardKind, ConnectionQuizResult,
        IntegrityError, Side, UnitInPlay, SLOT_COUNT,
    },
};

/// 一次行动。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardAction {
    Place {
        hand_index: usize,
        slot: usize,
    },
    Attach {
        hand_index: usize,
        slot: usize,
        chosen_form: String,
    },
    Attack {
        attacker_slot: usize,
        target_slot: usize,
    },
    Pass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("battle already finished")]
    GameFinished,
    #[error("expected phase {expected:?}, found {actual:?}")]
    InvalidPhase {
        expected: BoardPhase,
        actual: BoardPhase,
    },
    #[error("{side:?} cannot act now")]
    NotYourTurn { side: Side },
    #[error("no card at hand index {hand_index}")]
    CardNotFound { hand_index: usize },
    #[error("expected a {expected:?} card, found {actual:?}")]
    CardTypeMismatch { expected: CardKind, actual: CardKind },
    #[error("slot {slot} is out of range")]
    SlotOutOfRange { slot: usize },
    #[error("slot {slot} is already occupied")]
    SlotOccupied { slot: usize },
    #[error("slot {slot} has no unit")]
    SlotEmpty { slot: usize },
    #[error("unit in slot {slot} already carries a modifier")]
    AlreadyModified { slot: usize },
    #[error("{particle_id} cannot attach to {verb_id}: {reason}")]
    CannotConnect {
        particle_id: String,
        verb_id: String,
        reason: String,
    },
    #[error("unit in slot {slot} has been defeated")]
    UnitDefeated { slot: usize },
    #[error("unit in slot {slot} has no modifier")]
    NoModifier { slot: usize },
    #[error("unit in slot {slot} already attacked this round")]
    AlreadyAttacked { slot: usize },
    #[error("no live target in slot {slot}")]
    InvalidTarget { slot: usize },
    #[error("state failed integrity check: {error}")]
    IntegrityViolation { error: IntegrityError },
}

fn ensure_active(state: &BoardState) -> Result<(), RuleError> {
    if state.is_finished() {
        return Err(RuleError::GameFinished);
    }
    state
        .integrity_check()
        .map_err(|error| RuleError::IntegrityViolation { error })
}

fn ensure_phase(state: &BoardState, expected: BoardPhase) -> Result<(), RuleError> {
    if state.phase != expected {
        return Err(RuleError::InvalidPhase {
            expected,
            actual: state.phase,
        });
    }
    Ok(())
}

fn ensure_slot(slot: usize) -> Result<(), RuleError> {
    if slot >= SLOT_COUNT {
        return Err(RuleError::SlotOutOfRange { slot });
    }
    Ok(())
}

fn reject(state: &BoardState, err: RuleError, what: &str) -> BoardState {
    tracing::debug!(error = %err, action = what, "board transition rejected");
    state.clone()
}

fn try_draw_phase(state: &BoardState) -> Result<BoardState, RuleError> {
    ensure_active(state)?;
    if !matches!(state.phase, BoardPhase::Setup | BoardPhase::Draw) {
        return Err(RuleError::InvalidPhase {
            expected: BoardPhase::Draw,
            actual: state.phase,
        });
    }

    let mut next = state.clone();
    next.round = state.round + 1;
    next.record_event(BoardEvent::RoundStarted { round: next.round });
    for side in [Side::Player, Side::Opponent] {
        let drawn = next.side_mut(side).draw().map(|card| card.id().to_string());
        if let Some(card_id) = drawn {
            next.record_event(BoardEvent::CardDrawn { side, card_id });
        }
    }
    next.phase = BoardPhase::PlayerAction;
    Ok(next)
}

/// 回合开始：回合数加一，双方各从牌库顶抽一张（牌库空则跳过）。
pub fn draw_phase(state: &BoardState) -> BoardState {
    try_draw_phase(state).unwrap_or_else(|err| reject(state, err, "draw"))
}

fn try_place(
    state: &BoardState,
    side: Side,
    hand_index: usize,
    slot: usize,
) -> Result<BoardState, RuleError> {
    ensure_slot(slot)?;
    let acting = state.side(side);
    let card = acting
        .hand
        .get(hand_index)
        .ok_or(RuleError::CardNotFound { hand_index })?;
    let BoardCard::Unit(verb) = card else {
        return Err(RuleError::CardTypeMismatch {
            expected: CardKind::Unit,
            actual: card.kind(),
        });
    };
    if acting.slots[slot].is_some() {
        return Err(RuleError::SlotOccupied { slot });
    }

    let verb_id = verb.id.clone();
    let unit = UnitInPlay::new(verb.clone());
    let mut next = state.clone();
    let acting = next.side_mut(side);
    acting.hand.remove(hand_index);
    acting.slots[slot] = Some(unit);
    next.record_event(BoardEvent::UnitPlaced {
        side,
        slot,
        verb_id,
    });
    Ok(next)
}

fn try_attach(
    state: &BoardState,
    side: Side,
    hand_index: usize,
    slot: usize,
    chosen_form: &str,
) -> Result<(BoardState, ConnectionQuizResult), RuleError> {
    ensure_slot(slot)?;
    let acting = state.side(side);
    let card = acting
        .hand
        .get(hand_index)
        .ok_or(RuleError::CardNotFound { hand_index })?;
    let BoardCard::Modifier(particle) = card else {
        return Err(RuleError::CardTypeMismatch {
            expected: CardKind::Modifier,
            actual: card.kind(),
        });
    };
    let unit = acting.unit(slot).ok_or(RuleError::SlotEmpty { slot })?;
    if unit.modifier.is_some() {
        return Err(RuleError::AlreadyModified { slot });
    }

    let connection = check_connection(particle, &unit.verb);
    if !connection.can_connect {
        return Err(RuleError::CannotConnect {
            particle_id: particle.id.clone(),
            verb_id: unit.verb.id.clone(),
            reason: connection.reason.unwrap_or_default(),
        });
    }
    let check = validate_answer(particle, &unit.verb, chosen_form);
    let correct_form = check.correct_form.unwrap_or_default();

    let quiz = ConnectionQuizResult {
        side,
        round: state.round,
        particle_id: particle.id.clone(),
        verb_id: unit.verb.id.clone(),
        chosen_form: chosen_form.to_string(),
        correct_form: correct_form.clone(),
        is_correct: check.correct,
    };

    let mut next = state.clone();
    if check.correct {
        let particle = particle.clone();
        let particle_id = particle.id.clone();
        let acting = next.side_mut(side);
        acting.hand.remove(hand_index);
        if let Some(unit) = acting.slots[slot].as_mut() {
            unit.modifier = Some(particle);
        }
        next.record_event(BoardEvent::ModifierAttached {
            side,
            slot,
            particle_id,
            form: correct_form,
        });
    } else {
        // 答错：卡留在手牌，行动被消耗
        next.record_event(BoardEvent::AttachFailed {
            side,
            slot,
            particle_id: particle.id.clone(),
            chosen_form: chosen_form.to_string(),
            correct_form,
        });
    }
    next.quiz_log.push(quiz.clone());
    Ok((next, quiz))
}

fn try_attack(
    state: &BoardState,
    side: Side,
    attacker_slot: usize,
    target_slot: usize,
) -> Result<BoardState, RuleError> {
    ensure_slot(attacker_slot)?;
    ensure_slot(target_slot)?;
    let attacker = state
        .side(side)
        .unit(attacker_slot)
        .ok_or(RuleError::SlotEmpty {
            slot: attacker_slot,
        })?;
    if !attacker.is_alive() {
        return Err(RuleError::UnitDefeated {
            slot: attacker_slot,
        });
    }
    let modifier = attacker.modifier.as_ref().ok_or(RuleError::NoModifier {
        slot: attacker_slot,
    })?;
    if attacker.has_attacked {
        return Err(RuleError::AlreadyAttacked {
            slot: attacker_slot,
        });
    }
    let target = state
        .side(side.other())
        .unit(target_slot)
        .filter(|unit| unit.is_alive())
        .ok_or(RuleError::InvalidTarget { slot: target_slot })?;

    let combo_multiplier = ComboTable::BOARD.multiplier(state.consecutive_correct(side));
    let element = element_multiplier(modifier.element, target.verb.element);
    let input = DamageInput::new(
        f64::from(modifier.power),
        f64::from(attacker.verb.attack),
        0.0,
    )
    .with_multipliers(combo_multiplier, 1.0, element);
    let damage = compute_damage(&input);

    let spent = BoardCard::Modifier(modifier.clone());
    let mut next = state.clone();
    if let Some(target) = next.side_mut(side.other()).slots[target_slot].as_mut() {
        target.hp = target.hp.saturating_sub(damage);
    }
    let acting = next.side_mut(side);
    if let Some(attacker) = acting.slots[attacker_slot].as_mut() {
        attacker.modifier = None;
        attacker.has_attacked = true;
    }
    acting.discard.push(spent);
    next.record_event(BoardEvent::AttackResolved {
        side,
        attacker_slot,
        target_slot,
        damage,
        combo_multiplier,
        element_multiplier: element,
    });
    Ok(next)
}

/// 行动结果：新状态，以及装备时产生的测验记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResolution {
    pub state: BoardState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<ConnectionQuizResult>,
}

fn try_apply_action(
    state: &BoardState,
    side: Side,
    action: &BoardAction,
) -> Result<ActionResolution, RuleError> {
    ensure_active(state)?;
    if state.phase.actor() != Some(side) {
        return Err(RuleError::NotYourTurn { side });
    }

    let (mut next, quiz) = match action {
        BoardAction::Place { hand_index, slot } => {
            (try_place(state, side, *hand_index, *slot)?, None)
        }
        BoardAction::Attach {
            hand_index,
            slot,
            chosen_form,
        } => {
            let (next, quiz) = try_attach(state, side, *hand_index, *slot, chosen_form)?;
            (next, Some(quiz))
        }
        BoardAction::Attack {
            attacker_slot,
            target_slot,
        } => (try_attack(state, side, *attacker_slot, *target_slot)?, None),
        BoardAction::Pass => {
            let mut next = state.clone();
            next.record_event(BoardEvent::Passed { side });
            (next, None)
        }
    };

    next.phase = match side {
        Side::Player => BoardPhase::OpponentAction,
        Side::Opponent => BoardPhase::Resolve,
    };
    Ok(ActionResolution { state: next, quiz })
}

/// 执行一方的行动。非法行动返回原状态且没有测验记录。
pub fn apply_action(state: &BoardState, side: Side, action: &BoardAction) -> ActionResolution {
    try_apply_action(state, side, action).unwrap_or_else(|err| ActionResolution {
        state: reject(state, err, "action"),
        quiz: None,
    })
}

pub fn place_unit(state: &BoardState, side: Side, hand_index: usize, slot: usize) -> BoardState {
    apply_action(state, side, &BoardAction::Place { hand_index, slot }).state
}

pub fn attach_modifier(
    state: &BoardState,
    side: Side,
    hand_index: usize,
    slot: usize,
    chosen_form: &str,
) -> ActionResolution {
    apply_action(
        state,
        side,
        &BoardAction::Attach {
            hand_index,
            slot,
            chosen_form: chosen_form.to_string(),
        },
    )
}

pub fn attack(state: &BoardState, side: Side, attacker_slot: usize, target_slot: usize) -> BoardState {
    apply_action(
        state,
        side,
        &BoardAction::Attack {
            attacker_slot,
            target_slot,
        },
    )
    .state
}

fn try_resolve_round(state: &BoardState) -> Result<BoardState, RuleError> {
    ensure_active(state)?;
    ensure_phase(state, BoardPhase::Resolve)?;

    let mut next = state.clone();
    for side in [Side::Player, Side::Opponent] {
        let acting = next.side_mut(side);
        let mut defeated = Vec::new();
        for slot in 0..SLOT_COUNT {
            let verb_id = match acting.slots[slot].as_mut() {
                Some(unit) if unit.is_alive() => {
                    unit.has_attacked = false;
                    continue;
                }
                Some(unit) => unit.verb.id.clone(),
                None => continue,
            };
            acting.slots[slot] = None;
            defeated.push((slot, verb_id));
        }
        for (slot, verb_id) in defeated {
            next.record_event(BoardEvent::UnitDefeated {
                side,
                slot,
                verb_id,
            });
        }
    }

    let player_alive = next.player.live_units();
    let opponent_alive = next.opponent.live_units();

    let (phase, winner) = if player_alive == 0 && opponent_alive == 0 {
        (BoardPhase::DrawGame, None)
    } else if opponent_alive == 0 {
        (BoardPhase::Victory, Some(Side::Player))
    } else if player_alive == 0 {
        (BoardPhase::Defeat, Some(Side::Opponent))
    } else if next.round >= next.max_rounds {
        // 回合上限：比较场上 HP 合计，平局判给玩家一方
        if next.player.board_hp() >= next.opponent.board_hp() {
            (BoardPhase::Victory, Some(Side::Player))
        } else {
            (BoardPhase::Defeat, Some(Side::Opponent))
        }
    } else {
        (BoardPhase::Draw, None)
    };

    next.phase = phase;
    next.winner = winner;
    if phase.is_terminal() {
        next.record_event(BoardEvent::BattleEnded { winner });
    }
    Ok(next)
}

/// 回合结算：移除阵亡单位、重置攻击标记并判定胜负。
pub fn resolve_round(state: &BoardState) -> BoardState {
    try_resolve_round(state).unwrap_or_else(|err| reject(state, err, "resolve"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSummary {
    pub victory: bool,
    pub is_draw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    pub rounds: u32,
    pub attach_correct: u32,
    pub attach_total: u32,
    /// 只统计玩家的装备测验。
    pub accuracy: f64,
    pub player_units_alive: usize,
    pub opponent_units_alive: usize,
}

pub fn summarize(state: &BoardState) -> BoardSummary {
    let (correct, total) = state
        .quiz_log
        .iter()
        .filter(|quiz| quiz.side == Side::Player)
        .fold((0u32, 0u32), |(correct, total), quiz| {
            (correct + u32::from(quiz.is_correct), total + 1)
        });

    BoardSummary {
        victory: state.winner == Some(Side::Player),
        is_draw: state.phase == BoardPhase::DrawGame,
        winner: state.winner,
        rounds: state.round,
        attach_correct: correct,
        attach_total: total,
        accuracy: if total > 0 {
            f64::from(correct) / f64::from(total)
        } else {
            0.0
        },
        player_units_alive: state.player.units_on_board(),
        opponent_units_alive: state.opponent.units_on_board(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::game::catalog::{Catalog, Particle, Verb};
    use crate::game::state::SideState;

    fn verb(id: &str) -> Verb {
        Catalog::sample().verb(id).expect("verb should exist").clone()
    }

    fn particle(id: &str) -> Particle {
        Catalog::sample()
            .particle(id)
            .expect("particle should exist")
            .clone()
    }

    fn setup_state() -> BoardState {
        let player = SideState::new(
            "p",
            vec![
                BoardCard::Unit(verb("v_kaku")),
                BoardCard::Modifier(particle("zu")),
                BoardCard::Modifier(particle("ru")),
            ],
            vec![BoardCard::Modifier(particle("ki"))],
        );
        let opponent = SideState::new(
            "o",
            vec![BoardCard::Unit(verb("v_uku"))],
            vec![BoardCard::Unit(verb("v_miru"))],
        );
        BoardState::new(player, opponent, &BoardConfig::default())
    }

    fn in_action(mut state: BoardState, side: Side) -> BoardState {
        state.phase = match side {
            Side::Player => BoardPhase::PlayerAction,
            Side::Opponent => BoardPhase::OpponentAction,
        };
        state
    }

    #[test]
    fn draw_phase_advances_round_and_draws_for_both() {
        let state = setup_state();
        let next = draw_phase(&state);
        assert_eq!(next.round, 1);
        assert_eq!(next.phase, BoardPhase::PlayerAction);
        assert_eq!(next.player.hand.len(), 4);
        assert_eq!(next.opponent.hand.len(), 2);

        let again = draw_phase(&in_action(draw_phase(&state), Side::Player));
        assert_eq!(again.round, 1, "draw outside the draw phase is ignored");
    }

    #[test]
    fn empty_stock_draw_is_a_no_op_for_that_side() {
        let mut state = setup_state();
        state.player.stock.clear();
        let next = draw_phase(&state);
        assert_eq!(next.player.hand.len(), 3);
        assert_eq!(next.opponent.hand.len(), 2);
    }

    #[test]
    fn placing_moves_the_unit_and_passes_the_turn() {
        let state = in_action(setup_state(), Side::Player);
        let next = place_unit(&state, Side::Player, 0, 1);
        assert_eq!(next.player.hand.len(), 2);
        assert_eq!(
            next.player.unit(1).map(|unit| unit.hp),
            Some(verb("v_kaku").max_hp)
        );
        assert_eq!(next.phase, BoardPhase::OpponentAction);
    }

    #[test]
    fn illegal_placements_return_the_same_state() {
        let state = in_action(setup_state(), Side::Player);
        assert_eq!(place_unit(&state, Side::Player, 1, 0), state, "not a unit");
        assert_eq!(place_unit(&state, Side::Player, 0, 3), state, "out of range");
        assert_eq!(place_unit(&state, Side::Player, 9, 0), state, "bad hand index");
        assert_eq!(place_unit(&state, Side::Opponent, 0, 0), state, "wrong side");

        let mut occupied = state.clone();
        occupied.player.slots[0] = Some(UnitInPlay::new(verb("v_yomu")));
        assert_eq!(place_unit(&occupied, Side::Player, 0, 0), occupied);
    }

    #[test]
    fn correct_attachment_consumes_the_card() {
        let mut state = in_action(setup_state(), Side::Player);
        state.player.slots[0] = Some(UnitInPlay::new(verb("v_kaku")));
        let resolution = attach_modifier(&state, Side::Player, 1, 0, "書か");
        let quiz = resolution.quiz.expect("quiz should be recorded");
        assert!(quiz.is_correct);
        let next = resolution.state;
        assert_eq!(next.player.hand.len(), 2);
        assert_eq!(
            next.player
                .unit(0)
                .and_then(|unit| unit.modifier.as_ref())
                .map(|p| p.id.as_str()),
            Some("zu")
        );
        assert_eq!(next.quiz_log.len(), 1);
    }

    #[test]
    fn unconnectable_pair_is_rejected_without_a_quiz() {
        let mut state = in_action(setup_state(), Side::Player);
        state.player.slots[0] = Some(UnitInPlay::new(verb("v_uku")));
        let resolution = attach_modifier(&state, Side::Player, 2, 0, "受け");
        assert!(resolution.quiz.is_none());
        assert_eq!(resolution.state, state);
    }

    #[test]
    fn attack_spends_the_modifier() {
        let mut state = in_action(setup_state(), Side::Player);
        let mut attacker = UnitInPlay::new(verb("v_kaku"));
        attacker.modifier = Some(particle("zu"));
        state.player.slots[0] = Some(attacker);
        state.opponent.slots[2] = Some(UnitInPlay::new(verb("v_uku")));

        let next = attack(&state, Side::Player, 0, 2);
        // zu(12) + 書く(8)，暗对水无克制，无连击
        assert_eq!(next.opponent.unit(2).map(|unit| unit.hp), Some(30 - 20));
        let attacker = next.player.unit(0).expect("attacker stays");
        assert!(attacker.modifier.is_none());
        assert!(attacker.has_attacked);
        assert_eq!(next.player.discard.len(), 1);

        assert_eq!(attack(&state, Side::Player, 0, 1), state, "empty target");
        assert_eq!(attack(&state, Side::Player, 1, 2), state, "empty attacker");
    }

    #[test]
    fn attack_uses_the_attach_streak() {
        let mut state = in_action(setup_state(), Side::Player);
        let mut attacker = UnitInPlay::new(verb("v_kaku"));
        attacker.modifier = Some(particle("zu"));
        state.player.slots[0] = Some(attacker);
        state.opponent.slots[0] = Some(UnitInPlay::new(verb("v_uku")));
        let quiz = ConnectionQuizResult {
            side: Side::Player,
            round: 1,
            particle_id: "zu".into(),
            verb_id: "v_kaku".into(),
            chosen_form: "書か".into(),
            correct_form: "書か".into(),
            is_correct: true,
        };
        state.quiz_log = vec![quiz.clone(), quiz.clone(), quiz];

        let next = attack(&state, Side::Player, 0, 0);
        // 20 * 1.3 = 26
        assert_eq!(next.opponent.unit(0).map(|unit| unit.hp), Some(4));
    }

    #[test]
    fn actions_use_snake_case_on_the_wire() {
        let action: BoardAction =
            serde_json::from_str(r#"{"type":"attack","attacker_slot":0,"target_slot":2}"#)
                .expect("action should parse");
        assert_eq!(
            action,
            BoardAction::Attack {
                attacker_slot: 0,
                target_slot: 2
            }
        );
        let json = serde_json::to_value(BoardAction::Pass).expect("action should serialize");
        assert_eq!(json["type"], "pass");
    }

    fn armed_board() -> BoardState {
        let mut state = in_action(setup_state(), Side::Player);
        let mut attacker = UnitInPlay::new(verb("v_kaku"));
        attacker.modifier = Some(particle("zu"));
        state.player.slots[0] = Some(attacker);
        state.player.slots[1] = Some(UnitInPlay::new(verb("v_yomu")));
        state.opponent.slots[0] = Some(UnitInPlay::new(verb("v_uku")));
        state
    }

    fn assert_rejected(state: &BoardState, side: Side, action: BoardAction, expected: RuleError) {
        assert_eq!(try_apply_action(state, side, &action).err(), Some(expected));
        let resolution = apply_action(state, side, &action);
        assert_eq!(&resolution.state, state);
        assert!(resolution.quiz.is_none());
    }

    #[test]
    fn attaching_to_a_modified_unit_is_rejected() {
        assert_rejected(
            &armed_board(),
            Side::Player,
            BoardAction::Attach {
                hand_index: 2,
                slot: 0,
                chosen_form: "書か".into(),
            },
            RuleError::AlreadyModified { slot: 0 },
        );
    }

    #[test]
    fn attacking_without_a_modifier_is_rejected() {
        assert_rejected(
            &armed_board(),
            Side::Player,
            BoardAction::Attack {
                attacker_slot: 1,
                target_slot: 0,
            },
            RuleError::NoModifier { slot: 1 },
        );
    }

    #[test]
    fn attacking_twice_in_a_round_is_rejected() {
        let mut state = armed_board();
        if let Some(unit) = state.player.slots[0].as_mut() {
            unit.has_attacked = true;
        }
        assert_rejected(
            &state,
            Side::Player,
            BoardAction::Attack {
                attacker_slot: 0,
                target_slot: 0,
            },
            RuleError::AlreadyAttacked { slot: 0 },
        );
    }

    #[test]
    fn defeated_unit_cannot_strike_back() {
        let mut state = armed_board();
        let mut doomed = UnitInPlay::new(verb("v_uku"));
        doomed.modifier = Some(particle("zu"));
        doomed.hp = 5;
        state.opponent.slots[0] = Some(doomed);

        let after_hit = attack(&state, Side::Player, 0, 0);
        assert_eq!(after_hit.opponent.unit(0).map(|unit| unit.hp), Some(0));
        assert_eq!(after_hit.phase, BoardPhase::OpponentAction);
        assert!(after_hit.opponent.ready_attackers().is_empty());

        assert_rejected(
            &after_hit,
            Side::Opponent,
            BoardAction::Attack {
                attacker_slot: 0,
                target_slot: 0,
            },
            RuleError::UnitDefeated { slot: 0 },
        );
    }

    #[test]
    fn resolve_clears_dead_units_and_continues() {
        let mut state = setup_state().with_phase(BoardPhase::Resolve);
        state.round = 2;
        let mut fallen = UnitInPlay::new(verb("v_uku"));
        fallen.hp = 0;
        state.opponent.slots[1] = Some(fallen);
        let mut tired = UnitInPlay::new(verb("v_kaku"));
        tired.has_attacked = true;
        state.player.slots[0] = Some(tired);

        let next = resolve_round(&state);
        assert!(next.opponent.slots[1].is_none());
        assert_eq!(next.player.unit(0).map(|unit| unit.has_attacked), Some(false));
        assert_eq!(next.phase, BoardPhase::Draw);
        assert!(next
            .event_log
            .iter()
            .any(|event| matches!(event, BoardEvent::UnitDefeated { slot: 1, .. })));
    }

    #[test]
    fn side_without_units_loses() {
        let mut state = setup_state().with_phase(BoardPhase::Resolve);
        state.opponent.hand.clear();
        state.opponent.stock.clear();
        let next = resolve_round(&state);
        assert_eq!(next.phase, BoardPhase::Victory);
        assert_eq!(next.winner, Some(Side::Player));

        let mut both_empty = state.clone();
        both_empty.player.hand.retain(|card| card.kind() != CardKind::Unit);
        let next = resolve_round(&both_empty);
        assert_eq!(next.phase, BoardPhase::DrawGame);
        assert_eq!(next.winner, None);
    }

    #[test]
    fn round_cap_compares_board_hp() {
        let mut state = setup_state().with_phase(BoardPhase::Resolve);
        state.round = state.max_rounds;
        let mut weak = UnitInPlay::new(verb("v_kaku"));
        weak.hp = 5;
        state.player.slots[0] = Some(weak);
        state.opponent.slots[0] = Some(UnitInPlay::new(verb("v_uku")));
        let next = resolve_round(&state);
        assert_eq!(next.phase, BoardPhase::Defeat);

        let summary = summarize(&next);
        assert!(!summary.victory);
        assert!(!summary.is_draw);
        assert_eq!(summary.player_units_alive, 1);
    }
}
