//! 卡牌战对手：行动策略与对手名册。

pub mod opponents;
pub mod policy;

pub use opponents::{find_opponent, roster, Opponent};
pub use policy::{choose_action, AiDecision, AiProfile, DecisionRule, Difficulty, Targeting};
