//! 战斗核心：伤害计算、接续判定、两种战斗的状态机与结算，以及卡牌收集和首领连战。

pub mod catalog;
pub mod collection;
pub mod connection;
pub mod damage;
pub mod duel;
pub mod progress;
pub mod rules;
pub mod rush;
pub mod state;

pub use catalog::{
    Catalog, CatalogError, ConnectionCategory, Element, Enemy, FormSlot, Gimmick, Particle,
    QuestionTemplate, QuestionType, Rarity, SkillCard, Verb, VerbClass,
};
pub use collection::{
    find_pool, gacha_pools, pull, roll_gacha, swap_hand_card, upgrade_card, upgrade_cost,
    validate_hand_deck, CollectionError, GachaPool, GachaPull, HandDeckIssue, Upgrade,
};
pub use connection::{check_connection, list_inflected_forms, validate_answer, AnswerCheck, Connection};
pub use damage::{compute_damage, element_multiplier, timing_bonus, ComboTable, DamageInput};
pub use duel::{Answer, BattleQuestion, DuelEvent, DuelPhase, DuelState, DuelSummary, TurnOutcome};
pub use progress::{settle_battle, BattleReward, LevelUp, PlayerStats};
pub use rules::{apply_action, draw_phase, resolve_round, ActionResolution, BoardAction, BoardSummary, RuleError};
pub use rush::{BossRushState, RushError, RushSettlement, RushStatus};
pub use state::{
    validate_deck, BoardCard, BoardEvent, BoardPhase, BoardState, ConnectionQuizResult, DeckConfig,
    DeckIssue, IntegrityError, Side, SideState, UnitInPlay,
};
