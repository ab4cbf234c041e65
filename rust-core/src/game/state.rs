use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, CatalogError, Particle, Verb};
use super::connection::check_connection;
use crate::config::BoardConfig;

/// 每方固定三个格子。
pub const SLOT_COUNT: usize = 3;
pub const DECK_UNITS: usize = 3;
pub const DECK_MODIFIERS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Unit,
    Modifier,
}

/// 手牌与牌库中的卡：动词是单位，助动词是装备。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "card", rename_all = "snake_case")]
pub enum BoardCard {
    Unit(Verb),
    Modifier(Particle),
}

impl BoardCard {
    pub fn kind(&self) -> CardKind {
        match self {
            BoardCard::Unit(_) => CardKind::Unit,
            BoardCard::Modifier(_) => CardKind::Modifier,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BoardCard::Unit(verb) => &verb.id,
            BoardCard::Modifier(particle) => &particle.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BoardCard::Unit(verb) => &verb.name,
            BoardCard::Modifier(particle) => &particle.name,
        }
    }
}

/// 场上的单位。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitInPlay {
    pub verb: Verb,
    pub hp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Particle>,
    #[serde(default)]
    pub has_attacked: bool,
}

impl UnitInPlay {
    pub fn new(verb: Verb) -> Self {
        Self {
            hp: verb.max_hp,
            verb,
            modifier: None,
            has_attacked: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// 已装备且本回合尚未攻击。
    pub fn can_attack(&self) -> bool {
        self.is_alive() && self.modifier.is_some() && !self.has_attacked
    }
}

/// 一方的场地、手牌、牌库与弃牌堆。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SideState {
    pub name: String,
    pub slots: [Option<UnitInPlay>; SLOT_COUNT],
    #[serde(default)]
    pub hand: Vec<BoardCard>,
    #[serde(default)]
    pub stock: Vec<BoardCard>,
    #[serde(default)]
    pub discard: Vec<BoardCard>,
}

impl SideState {
    pub fn new(name: impl Into<String>, hand: Vec<BoardCard>, stock: Vec<BoardCard>) -> Self {
        Self {
            name: name.into(),
            slots: Default::default(),
            hand,
            stock,
            discard: Vec::new(),
        }
    }

    pub fn unit(&self, slot: usize) -> Option<&UnitInPlay> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// 从牌库顶抽一张；牌库为空时不做任何事。
    pub fn draw(&mut self) -> Option<&BoardCard> {
        if self.stock.is_empty() {
            return None;
        }
        let card = self.stock.remove(0);
        self.hand.push(card);
        self.hand.last()
    }

    pub fn unit_card_indices(&self) -> Vec<usize> {
        self.hand_indices(CardKind::Unit)
    }

    pub fn modifier_card_indices(&self) -> Vec<usize> {
        self.hand_indices(CardKind::Modifier)
    }

    fn hand_indices(&self, kind: CardKind) -> Vec<usize> {
        self.hand
            .iter()
            .enumerate()
            .filter(|(_, card)| card.kind() == kind)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn empty_slots(&self) -> Vec<usize> {
        (0..SLOT_COUNT)
            .filter(|slot| self.slots[*slot].is_none())
            .collect()
    }

    /// 有存活单位的格子，可作为攻击目标。
    pub fn occupied_slots(&self) -> Vec<usize> {
        (0..SLOT_COUNT)
            .filter(|slot| self.unit(*slot).is_some_and(UnitInPlay::is_alive))
            .collect()
    }

    pub fn ready_attackers(&self) -> Vec<usize> {
        (0..SLOT_COUNT)
            .filter(|slot| self.unit(*slot).is_some_and(UnitInPlay::can_attack))
            .collect()
    }

    /// 可以装备该助动词的格子：有单位、未装备、且接续成立。
    pub fn attachable_slots(&self, particle: &Particle) -> Vec<usize> {
        (0..SLOT_COUNT)
            .filter(|slot| {
                self.unit(*slot).is_some_and(|unit| {
                    unit.modifier.is_none() && check_connection(particle, &unit.verb).can_connect
                })
            })
            .collect()
    }

    pub fn units_on_board(&self) -> usize {
        self.occupied_slots().len()
    }

    /// 场上、手牌与牌库中的全部存活单位。
    pub fn live_units(&self) -> usize {
        let in_reserve = self
            .hand
            .iter()
            .chain(self.stock.iter())
            .filter(|card| card.kind() == CardKind::Unit)
            .count();
        self.units_on_board() + in_reserve
    }

    pub fn board_hp(&self) -> u32 {
        self.slots.iter().flatten().map(|unit| unit.hp).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoardPhase {
    #[default]
    Setup,
    Draw,
    PlayerAction,
    OpponentAction,
    Resolve,
    Victory,
    Defeat,
    DrawGame,
}

impl BoardPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BoardPhase::Victory | BoardPhase::Defeat | BoardPhase::DrawGame
        )
    }

    /// 该阶段行动的一方。
    pub fn actor(self) -> Option<Side> {
        match self {
            BoardPhase::PlayerAction => Some(Side::Player),
            BoardPhase::OpponentAction => Some(Side::Opponent),
            _ => None,
        }
    }
}

/// 一次装备测验的记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionQuizResult {
    pub side: Side,
    pub round: u32,
    pub particle_id: String,
    pub verb_id: String,
    pub chosen_form: String,
    pub correct_form: String,
    pub is_correct: bool,
}

/// 卡牌战事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BoardEvent {
    RoundStarted {
        round: u32,
    },
    CardDrawn {
        side: Side,
        card_id: String,
    },
    UnitPlaced {
        side: Side,
        slot: usize,
        verb_id: String,
    },
    ModifierAttached {
        side: Side,
        slot: usize,
        particle_id: String,
        form: String,
    },
    AttachFailed {
        side: Side,
        slot: usize,
        particle_id: String,
        chosen_form: String,
        correct_form: String,
    },
    AttackResolved {
        side: Side,
        attacker_slot: usize,
        target_slot: usize,
        damage: u32,
        combo_multiplier: f64,
        element_multiplier: f64,
    },
    UnitDefeated {
        side: Side,
        slot: usize,
        verb_id: String,
    },
    Passed {
        side: Side,
    },
    BattleEnded {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<Side>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("{side:?} slot {slot} has hp {hp} above max {max}")]
    HpOutOfRange {
        side: Side,
        slot: usize,
        hp: u32,
        max: u32,
    },
    #[error("round {round} exceeds cap {max}")]
    RoundOutOfRange { round: u32, max: u32 },
    #[error("unit {verb_id} appears twice on the {side:?} board")]
    DuplicateUnit { side: Side, verb_id: String },
}

/// 三格卡牌战的整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardState {
    pub player: SideState,
    pub opponent: SideState,
    pub round: u32,
    pub max_rounds: u32,
    pub phase: BoardPhase,
    pub action_time_secs: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quiz_log: Vec<ConnectionQuizResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<BoardEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
}

impl BoardState {
    pub fn new(player: SideState, opponent: SideState, config: &BoardConfig) -> Self {
        Self {
            player,
            opponent,
            round: 0,
            max_rounds: config.max_rounds,
            phase: BoardPhase::Setup,
            action_time_secs: config.action_time_secs,
            quiz_log: Vec::new(),
            event_log: Vec::new(),
            winner: None,
        }
    }

    /// 洗牌并各自抽起始手牌。
    pub fn from_decks<R>(
        player_deck: &DeckConfig,
        opponent_deck: &DeckConfig,
        opponent_name: &str,
        catalog: &Catalog,
        config: &BoardConfig,
        rng: &mut R,
    ) -> Result<Self, CatalogError>
    where
        R: Rng + ?Sized,
    {
        let player = deal_side("プレイヤー", player_deck, catalog, config, rng)?;
        let opponent = deal_side(opponent_name, opponent_deck, catalog, config, rng)?;
        Ok(Self::new(player, opponent, config))
    }

    pub fn with_phase(mut self, phase: BoardPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }

    pub fn record_event(&mut self, event: BoardEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// 从最近一次往前数，该方连续答对的装备次数。
    pub fn consecutive_correct(&self, side: Side) -> u32 {
        self.quiz_log
            .iter()
            .rev()
            .filter(|quiz| quiz.side == side)
            .take_while(|quiz| quiz.is_correct)
            .count() as u32
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.round > self.max_rounds {
            return Err(IntegrityError::RoundOutOfRange {
                round: self.round,
                max: self.max_rounds,
            });
        }
        for side in [Side::Player, Side::Opponent] {
            let mut seen = HashSet::new();
            for (slot, unit) in self.side(side).slots.iter().enumerate() {
                let Some(unit) = unit else { continue };
                if unit.hp > unit.verb.max_hp {
                    return Err(IntegrityError::HpOutOfRange {
                        side,
                        slot,
                        hp: unit.hp,
                        max: unit.verb.max_hp,
                    });
                }
                if !seen.insert(unit.verb.id.as_str()) {
                    return Err(IntegrityError::DuplicateUnit {
                        side,
                        verb_id: unit.verb.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn deal_side<R>(
    name: &str,
    deck: &DeckConfig,
    catalog: &Catalog,
    config: &BoardConfig,
    rng: &mut R,
) -> Result<SideState, CatalogError>
where
    R: Rng + ?Sized,
{
    let mut cards = deck.resolve(catalog)?;
    cards.shuffle(rng);
    let split = config.initial_draw.min(cards.len());
    let stock = cards.split_off(split);
    Ok(SideState::new(name, cards, stock))
}

/// 卡组构成：3 张动词与 5 张助动词。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckConfig {
    pub units: Vec<String>,
    pub modifiers: Vec<String>,
}

impl DeckConfig {
    pub fn default_deck() -> Self {
        Self {
            units: vec!["v_kaku".into(), "v_yomu".into(), "v_yuku".into()],
            modifiers: vec![
                "zu".into(),
                "ki".into(),
                "keri".into(),
                "mu".into(),
                "beshi".into(),
            ],
        }
    }

    pub fn resolve(&self, catalog: &Catalog) -> Result<Vec<BoardCard>, CatalogError> {
        let units = self
            .units
            .iter()
            .map(|id| catalog.verb(id).map(|verb| BoardCard::Unit(verb.clone())));
        let modifiers = self
            .modifiers
            .iter()
            .map(|id| catalog.particle(id).map(|p| BoardCard::Modifier(p.clone())));
        units.chain(modifiers).collect()
    }
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self::default_deck()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum DeckIssue {
    #[error("deck needs {expected} unit cards, found {actual}")]
    UnitCount { expected: usize, actual: usize },
    #[error("deck needs {expected} modifier cards, found {actual}")]
    ModifierCount { expected: usize, actual: usize },
    #[error("unit card {id} appears more than once")]
    DuplicateUnit { id: String },
    #[error("modifier card {id} appears more than once")]
    DuplicateModifier { id: String },
    #[error("unknown unit card {id}")]
    UnknownUnit { id: String },
    #[error("unknown modifier card {id}")]
    UnknownModifier { id: String },
}

/// 检查卡组，返回全部问题；为空表示合法。
pub fn validate_deck(deck: &DeckConfig, catalog: &Catalog) -> Vec<DeckIssue> {
    let mut issues = Vec::new();
    if deck.units.len() != DECK_UNITS {
        issues.push(DeckIssue::UnitCount {
            expected: DECK_UNITS,
            actual: deck.units.len(),
        });
    }
    if deck.modifiers.len() != DECK_MODIFIERS {
        issues.push(DeckIssue::ModifierCount {
            expected: DECK_MODIFIERS,
            actual: deck.modifiers.len(),
        });
    }

    let mut seen = HashSet::new();
    for id in &deck.units {
        if !seen.insert(id) {
            issues.push(DeckIssue::DuplicateUnit { id: id.clone() });
        }
        if catalog.verb(id).is_err() {
            issues.push(DeckIssue::UnknownUnit { id: id.clone() });
        }
    }
    let mut seen = HashSet::new();
    for id in &deck.modifiers {
        if !seen.insert(id) {
            issues.push(DeckIssue::DuplicateModifier { id: id.clone() });
        }
        if catalog.particle(id).is_err() {
            issues.push(DeckIssue::UnknownModifier { id: id.clone() });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    fn verb(id: &str) -> Verb {
        Catalog::sample().verb(id).expect("verb should exist").clone()
    }

    fn particle(id: &str) -> Particle {
        Catalog::sample()
            .particle(id)
            .expect("particle should exist")
            .clone()
    }

    #[test]
    fn decks_are_dealt_into_hand_and_stock() {
        let mut rng = SmallRng::seed_from_u64(5);
        let deck = DeckConfig::default_deck();
        let state = BoardState::from_decks(
            &deck,
            &deck,
            "見習い文法士",
            Catalog::sample(),
            &BoardConfig::default(),
            &mut rng,
        )
        .expect("default deck should resolve");

        assert_eq!(state.player.hand.len(), 5);
        assert_eq!(state.player.stock.len(), 3);
        assert_eq!(state.player.live_units(), 3);
        assert_eq!(state.opponent.name, "見習い文法士");
        assert_eq!(state.phase, BoardPhase::Setup);
        assert!(state.player.slots.iter().all(Option::is_none));
    }

    #[test]
    fn unknown_card_aborts_dealing() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut deck = DeckConfig::default_deck();
        deck.units[0] = "v_nothing".into();
        let result = BoardState::from_decks(
            &deck,
            &DeckConfig::default_deck(),
            "cpu",
            Catalog::sample(),
            &BoardConfig::default(),
            &mut rng,
        );
        assert_eq!(
            result.err(),
            Some(CatalogError::UnknownVerb {
                id: "v_nothing".into()
            })
        );
    }

    #[test]
    fn deck_validation_lists_every_problem() {
        let deck = DeckConfig {
            units: vec!["v_kaku".into(), "v_kaku".into()],
            modifiers: vec!["zu".into(), "nope".into()],
        };
        let issues = validate_deck(&deck, Catalog::sample());
        assert!(issues.contains(&DeckIssue::UnitCount {
            expected: 3,
            actual: 2
        }));
        assert!(issues.contains(&DeckIssue::DuplicateUnit { id: "v_kaku".into() }));
        assert!(issues.contains(&DeckIssue::UnknownModifier { id: "nope".into() }));
        assert!(validate_deck(&DeckConfig::default_deck(), Catalog::sample()).is_empty());
    }

    #[test]
    fn slot_predicates() {
        let mut side = SideState::new(
            "p",
            vec![
                BoardCard::Modifier(particle("ru")),
                BoardCard::Unit(verb("v_uku")),
            ],
            Vec::new(),
        );
        side.slots[0] = Some(UnitInPlay::new(verb("v_kaku")));
        side.slots[2] = Some(UnitInPlay::new(verb("v_miru")));

        assert_eq!(side.empty_slots(), vec![1]);
        assert_eq!(side.occupied_slots(), vec![0, 2]);
        assert_eq!(side.unit_card_indices(), vec![1]);
        assert_eq!(side.modifier_card_indices(), vec![0]);
        // る は四段にのみ接続
        assert_eq!(side.attachable_slots(&particle("ru")), vec![0]);
        assert!(side.ready_attackers().is_empty());
        assert_eq!(side.live_units(), 3);
        assert_eq!(side.board_hp(), 28 + 24);
    }

    #[test]
    fn streak_counts_only_own_recent_answers() {
        let quiz = |side, is_correct| ConnectionQuizResult {
            side,
            round: 1,
            particle_id: "zu".into(),
            verb_id: "v_kaku".into(),
            chosen_form: "書か".into(),
            correct_form: "書か".into(),
            is_correct,
        };
        let mut state = BoardState::new(
            SideState::new("p", Vec::new(), Vec::new()),
            SideState::new("o", Vec::new(), Vec::new()),
            &BoardConfig::default(),
        );
        state.quiz_log = vec![
            quiz(Side::Player, false),
            quiz(Side::Player, true),
            quiz(Side::Opponent, false),
            quiz(Side::Player, true),
        ];
        assert_eq!(state.consecutive_correct(Side::Player), 2);
        assert_eq!(state.consecutive_correct(Side::Opponent), 0);
    }

    #[test]
    fn integrity_rejects_overhealed_units() {
        let mut state = BoardState::new(
            SideState::new("p", Vec::new(), Vec::new()),
            SideState::new("o", Vec::new(), Vec::new()),
            &BoardConfig::default(),
        );
        let mut unit = UnitInPlay::new(verb("v_kaku"));
        unit.hp = 99;
        state.player.slots[1] = Some(unit);
        assert!(matches!(
            state.integrity_check(),
            Err(IntegrityError::HpOutOfRange { slot: 1, .. })
        ));
    }
}
