use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 属性。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Ice,
    Wind,
    Light,
    Dark,
    Earth,
    Phantom,
    Water,
}

impl Element {
    pub const ALL: [Element; 8] = [
        Element::Fire,
        Element::Ice,
        Element::Wind,
        Element::Light,
        Element::Dark,
        Element::Earth,
        Element::Phantom,
        Element::Water,
    ];

    /// 该属性克制的属性。
    pub fn beats(self) -> Element {
        match self {
            Element::Fire => Element::Ice,
            Element::Ice => Element::Wind,
            Element::Wind => Element::Fire,
            Element::Light => Element::Dark,
            Element::Dark => Element::Light,
            Element::Earth => Element::Phantom,
            Element::Phantom => Element::Water,
            Element::Water => Element::Earth,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Rarity {
    #[default]
    N,
    R,
    SR,
    SSR,
}

/// 助动词声明的接续类别。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionCategory {
    Mizenkei,
    Renyoukei,
    Shuushikei,
    Rentaikei,
    Taigen,
    Special,
}

/// 动词活用类型。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerbClass {
    Yodan,
    KamiNidan,
    ShimoNidan,
    KamiIchidan,
    ShimoIchidan,
    KaHen,
    SaHen,
    NaHen,
    RaHen,
}

impl VerbClass {
    pub fn label(self) -> &'static str {
        match self {
            VerbClass::Yodan => "四段",
            VerbClass::KamiNidan => "上二段",
            VerbClass::ShimoNidan => "下二段",
            VerbClass::KamiIchidan => "上一段",
            VerbClass::ShimoIchidan => "下一段",
            VerbClass::KaHen => "カ変",
            VerbClass::SaHen => "サ変",
            VerbClass::NaHen => "ナ変",
            VerbClass::RaHen => "ラ変",
        }
    }
}

/// 动词的六个固定活用形槽位，顺序固定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FormSlot {
    Mizenkei,
    Renyoukei,
    Shuushikei,
    Rentaikei,
    Izenkei,
    Meireikei,
}

impl FormSlot {
    pub const ALL: [FormSlot; 6] = [
        FormSlot::Mizenkei,
        FormSlot::Renyoukei,
        FormSlot::Shuushikei,
        FormSlot::Rentaikei,
        FormSlot::Izenkei,
        FormSlot::Meireikei,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormSlot::Mizenkei => "未然形",
            FormSlot::Renyoukei => "連用形",
            FormSlot::Shuushikei => "終止形",
            FormSlot::Rentaikei => "連体形",
            FormSlot::Izenkei => "已然形",
            FormSlot::Meireikei => "命令形",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conjugation {
    pub mizenkei: String,
    pub renyoukei: String,
    pub shuushikei: String,
    pub rentaikei: String,
    pub izenkei: String,
    pub meireikei: String,
}

impl Conjugation {
    pub fn form(&self, slot: FormSlot) -> &str {
        match slot {
            FormSlot::Mizenkei => &self.mizenkei,
            FormSlot::Renyoukei => &self.renyoukei,
            FormSlot::Shuushikei => &self.shuushikei,
            FormSlot::Rentaikei => &self.rentaikei,
            FormSlot::Izenkei => &self.izenkei,
            FormSlot::Meireikei => &self.meireikei,
        }
    }
}

/// 助动词（卡牌形态）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Particle {
    pub id: String,
    pub name: String,
    pub category: ConnectionCategory,
    pub element: Element,
    #[serde(default)]
    pub rarity: Rarity,
    pub power: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meanings: Vec<String>,
    #[serde(default)]
    pub chapter: u32,
}

/// 动词（卡牌战中的单位）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verb {
    pub id: String,
    pub name: String,
    pub class: VerbClass,
    pub conjugation: Conjugation,
    pub max_hp: u32,
    pub attack: u32,
    pub element: Element,
}

/// 敌人的特殊规则。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Gimmick {
    /// 第一回合伤害按比例缩小。
    Barrier { scale: f64 },
    /// 缩短作答时间（秒）。
    TimeAccel { seconds: f64 },
    /// 增加选项数量。
    ExtraChoices { count: usize },
    /// 每隔固定回合按最大 HP 比例回复。
    Heal { ratio: f64 },
    /// 答错时放大反击伤害。
    Reflect { factor: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enemy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub level: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub element: Element,
    #[serde(default)]
    pub is_boss: bool,
    #[serde(default)]
    pub drop_stones: u32,
    #[serde(default)]
    pub drop_exp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gimmick: Option<Gimmick>,
    /// 覆盖默认的回合上限。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_cap: Option<u32>,
}

/// 玩家持有的技能卡。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillCard {
    pub id: String,
    pub particle_id: String,
    pub name: String,
    pub element: Element,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default = "default_card_level")]
    pub level: u32,
    pub power: u32,
}

fn default_card_level() -> u32 {
    1
}

impl SkillCard {
    pub fn from_particle(particle: &Particle, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            particle_id: particle.id.clone(),
            name: particle.name.clone(),
            element: particle.element,
            rarity: particle.rarity,
            level: 1,
            power: particle.power,
        }
    }

    pub fn effective_power(&self) -> u32 {
        self.power + self.level.saturating_sub(1) * 3
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Connection,
    Meaning,
    Conjugation,
    Composite,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Connection,
        QuestionType::Meaning,
        QuestionType::Conjugation,
        QuestionType::Composite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuestionType::Connection => "接続問題",
            QuestionType::Meaning => "意味問題",
            QuestionType::Conjugation => "活用問題",
            QuestionType::Composite => "複合問題",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionTemplate {
    pub id: String,
    pub kind: QuestionType,
    pub sentence: String,
    /// 正确答案对应的助动词 id。
    pub answer_id: String,
    pub chapter: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum CatalogError {
    #[error("unknown particle: {id}")]
    UnknownParticle { id: String },
    #[error("unknown verb: {id}")]
    UnknownVerb { id: String },
    #[error("unknown enemy: {id}")]
    UnknownEnemy { id: String },
    #[error("malformed catalog: {message}")]
    Malformed { message: String },
}

/// 外部提供的静态内容表。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    pub particles: Vec<Particle>,
    #[serde(default)]
    pub verbs: Vec<Verb>,
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    #[serde(default)]
    pub questions: Vec<QuestionTemplate>,
}

static SAMPLE: Lazy<Catalog> = Lazy::new(build_sample);

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|err| CatalogError::Malformed {
            message: err.to_string(),
        })
    }

    /// 内置示例内容，方便前端调试与测试。
    pub fn sample() -> &'static Catalog {
        &SAMPLE
    }

    /// 传入 JSON 时解析外部内容表，否则借用内置示例。
    pub fn from_json_or_sample(json: Option<&str>) -> Result<Cow<'static, Catalog>, CatalogError> {
        match json {
            Some(json) => Catalog::from_json(json).map(Cow::Owned),
            None => Ok(Cow::Borrowed(Catalog::sample())),
        }
    }

    pub fn particle(&self, id: &str) -> Result<&Particle, CatalogError> {
        self.particles
            .iter()
            .find(|particle| particle.id == id)
            .ok_or_else(|| CatalogError::UnknownParticle { id: id.to_string() })
    }

    pub fn verb(&self, id: &str) -> Result<&Verb, CatalogError> {
        self.verbs
            .iter()
            .find(|verb| verb.id == id)
            .ok_or_else(|| CatalogError::UnknownVerb { id: id.to_string() })
    }

    pub fn enemy(&self, id: &str) -> Result<&Enemy, CatalogError> {
        self.enemies
            .iter()
            .find(|enemy| enemy.id == id)
            .ok_or_else(|| CatalogError::UnknownEnemy { id: id.to_string() })
    }

    pub fn skill_card(&self, particle_id: &str) -> Result<SkillCard, CatalogError> {
        let particle = self.particle(particle_id)?;
        Ok(SkillCard::from_particle(
            particle,
            format!("card_{}", particle.id),
        ))
    }
}

fn particle(
    id: &str,
    name: &str,
    category: ConnectionCategory,
    element: Element,
    rarity: Rarity,
    chapter: u32,
    meanings: &[&str],
) -> Particle {
    let power = match rarity {
        Rarity::N => 12,
        Rarity::R => 15,
        Rarity::SR => 18,
        Rarity::SSR => 22,
    };
    Particle {
        id: id.into(),
        name: name.into(),
        category,
        element,
        rarity,
        power,
        meanings: meanings.iter().map(|m| m.to_string()).collect(),
        chapter,
    }
}

#[allow(clippy::too_many_arguments)]
fn verb(
    id: &str,
    name: &str,
    class: VerbClass,
    forms: [&str; 6],
    max_hp: u32,
    attack: u32,
    element: Element,
) -> Verb {
    let [mizenkei, renyoukei, shuushikei, rentaikei, izenkei, meireikei] = forms;
    Verb {
        id: id.into(),
        name: name.into(),
        class,
        conjugation: Conjugation {
            mizenkei: mizenkei.into(),
            renyoukei: renyoukei.into(),
            shuushikei: shuushikei.into(),
            rentaikei: rentaikei.into(),
            izenkei: izenkei.into(),
            meireikei: meireikei.into(),
        },
        max_hp,
        attack,
        element,
    }
}

#[allow(clippy::too_many_arguments)]
fn enemy(
    id: &str,
    name: &str,
    level: u32,
    max_hp: u32,
    attack: u32,
    defense: u32,
    element: Element,
    drops: (u32, u32),
    gimmick: Option<Gimmick>,
) -> Enemy {
    Enemy {
        id: id.into(),
        name: name.into(),
        level,
        max_hp,
        attack,
        defense,
        element,
        is_boss: gimmick.is_some(),
        drop_stones: drops.0,
        drop_exp: drops.1,
        gimmick,
        turn_cap: None,
    }
}

fn question(id: &str, kind: QuestionType, sentence: &str, answer_id: &str, chapter: u32) -> QuestionTemplate {
    QuestionTemplate {
        id: id.into(),
        kind,
        sentence: sentence.into(),
        answer_id: answer_id.into(),
        chapter,
        hint: None,
    }
}

fn build_sample() -> Catalog {
    use ConnectionCategory::*;
    use Element::*;
    use QuestionType::{Composite, Conjugation as Conj, Connection, Meaning};
    use Rarity::*;

    let particles = vec![
        particle("ru", "る", Mizenkei, Water, R, 1, &["受身", "尊敬", "自発", "可能"]),
        particle("raru", "らる", Mizenkei, Water, R, 1, &["受身", "尊敬", "自発", "可能"]),
        particle("su", "す", Mizenkei, Fire, R, 1, &["使役", "尊敬"]),
        particle("sasu", "さす", Mizenkei, Fire, R, 1, &["使役", "尊敬"]),
        particle("shimu", "しむ", Mizenkei, Fire, SR, 1, &["使役", "尊敬"]),
        particle("zu", "ず", Mizenkei, Dark, N, 1, &["打消"]),
        particle("ki", "き", Renyoukei, Earth, N, 2, &["過去（体験）"]),
        particle("keri", "けり", Renyoukei, Earth, N, 2, &["過去（伝聞）", "詠嘆"]),
        particle("tsu", "つ", Renyoukei, Earth, R, 2, &["完了", "強意"]),
        particle("nu", "ぬ", Renyoukei, Earth, R, 2, &["完了", "強意"]),
        particle("tari_kanryou", "たり", Renyoukei, Earth, R, 2, &["完了", "存続"]),
        particle("ri", "り", Special, Earth, SR, 2, &["完了", "存続"]),
        particle("mu", "む", Mizenkei, Wind, N, 3, &["推量", "意志", "適当", "勧誘", "仮定", "婉曲"]),
        particle("muzu", "むず", Mizenkei, Wind, SSR, 3, &["推量", "意志"]),
        particle("ramu", "らむ", Shuushikei, Wind, SR, 3, &["現在推量"]),
        particle("kemu", "けむ", Renyoukei, Wind, SR, 3, &["過去推量"]),
        particle("beshi", "べし", Shuushikei, Wind, R, 3, &["推量", "意志", "可能", "当然", "命令", "適当"]),
        particle("mashi", "まし", Mizenkei, Wind, SR, 3, &["反実仮想"]),
        particle("ji", "じ", Mizenkei, Dark, SR, 4, &["打消推量", "打消意志"]),
        particle("maji", "まじ", Shuushikei, Dark, SSR, 4, &["打消推量", "打消意志", "不可能"]),
        particle("mahoshi", "まほし", Mizenkei, Dark, SR, 4, &["希望"]),
        particle("tashi", "たし", Renyoukei, Dark, R, 4, &["希望"]),
        particle("nari_dantei", "なり", Taigen, Light, R, 4, &["断定", "存在"]),
        particle("tari_dantei", "たり", Taigen, Light, SSR, 4, &["断定"]),
        particle("nari_denbun", "なり", Shuushikei, Light, SR, 4, &["伝聞", "推定"]),
        particle("meri", "めり", Shuushikei, Light, SR, 4, &["推定", "婉曲"]),
        particle("gotoshi", "ごとし", Rentaikei, Light, SR, 5, &["比況", "例示"]),
    ];

    let verbs = vec![
        verb("v_kaku", "書く", VerbClass::Yodan, ["書か", "書き", "書く", "書く", "書け", "書け"], 28, 8, Earth),
        verb("v_yomu", "読む", VerbClass::Yodan, ["読ま", "読み", "読む", "読む", "読め", "読め"], 26, 9, Wind),
        verb("v_yuku", "行く", VerbClass::Yodan, ["行か", "行き", "行く", "行く", "行け", "行け"], 30, 7, Wind),
        verb("v_kiku", "聞く", VerbClass::Yodan, ["聞か", "聞き", "聞く", "聞く", "聞け", "聞け"], 25, 8, Water),
        verb("v_omofu", "思ふ", VerbClass::Yodan, ["思は", "思ひ", "思ふ", "思ふ", "思へ", "思へ"], 24, 10, Light),
        verb("v_ifu", "言ふ", VerbClass::Yodan, ["言は", "言ひ", "言ふ", "言ふ", "言へ", "言へ"], 26, 9, Fire),
        verb("v_tatsu", "立つ", VerbClass::Yodan, ["立た", "立ち", "立つ", "立つ", "立て", "立て"], 32, 7, Earth),
        verb("v_saku", "咲く", VerbClass::Yodan, ["咲か", "咲き", "咲く", "咲く", "咲け", "咲け"], 22, 11, Fire),
        verb("v_oku", "起く", VerbClass::KamiNidan, ["起き", "起き", "起く", "起くる", "起くれ", "起きよ"], 24, 9, Light),
        verb("v_otsu", "落つ", VerbClass::KamiNidan, ["落ち", "落ち", "落つ", "落つる", "落つれ", "落ちよ"], 26, 10, Dark),
        verb("v_sugu", "過ぐ", VerbClass::KamiNidan, ["過ぎ", "過ぎ", "過ぐ", "過ぐる", "過ぐれ", "過ぎよ"], 22, 8, Phantom),
        verb("v_uku", "受く", VerbClass::ShimoNidan, ["受け", "受け", "受く", "受くる", "受くれ", "受けよ"], 30, 6, Water),
        verb("v_sutsu", "捨つ", VerbClass::ShimoNidan, ["捨て", "捨て", "捨つ", "捨つる", "捨つれ", "捨てよ"], 20, 12, Dark),
        verb("v_izu", "出づ", VerbClass::ShimoNidan, ["出で", "出で", "出づ", "出づる", "出づれ", "出でよ"], 26, 9, Wind),
        verb("v_miru", "見る", VerbClass::KamiIchidan, ["見", "見", "見る", "見る", "見れ", "見よ"], 24, 10, Light),
        verb("v_kiru", "着る", VerbClass::KamiIchidan, ["着", "着", "着る", "着る", "着れ", "着よ"], 28, 7, Phantom),
        verb("v_keru", "蹴る", VerbClass::ShimoIchidan, ["蹴", "蹴", "蹴る", "蹴る", "蹴れ", "蹴よ"], 22, 11, Fire),
        verb("v_ku", "来", VerbClass::KaHen, ["こ", "き", "く", "くる", "くれ", "こよ"], 28, 9, Wind),
        verb("v_su", "す", VerbClass::SaHen, ["せ", "し", "す", "する", "すれ", "せよ"], 26, 10, Fire),
        verb("v_shinu", "死ぬ", VerbClass::NaHen, ["死な", "死に", "死ぬ", "死ぬる", "死ぬれ", "死ね"], 20, 14, Dark),
        verb("v_ari", "あり", VerbClass::RaHen, ["あら", "あり", "あり", "ある", "あれ", "あれ"], 34, 6, Earth),
    ];

    let enemies = vec![
        enemy("e1_1", "未然のスライム", 1, 80, 8, 2, Earth, (3, 20), None),
        enemy("e1_2", "受身の亡霊", 2, 100, 10, 3, Water, (3, 25), None),
        enemy("e1_3", "使役のゴーレム", 3, 120, 12, 5, Fire, (4, 30), None),
        enemy("e1_boss", "虚無の番人", 7, 300, 20, 8, Dark, (30, 100), Some(Gimmick::Barrier { scale: 0.5 })),
        enemy("e2_boss", "時の守護者", 12, 450, 28, 12, Earth, (30, 150), Some(Gimmick::TimeAccel { seconds: 8.0 })),
        enemy("e3_boss", "幻影の王", 17, 600, 35, 15, Wind, (30, 200), Some(Gimmick::ExtraChoices { count: 7 })),
        enemy("e4_boss", "真偽の裁定者", 22, 800, 42, 18, Light, (30, 300), Some(Gimmick::Reflect { factor: 1.5 })),
        enemy("e5_boss", "最終文法帝", 28, 1200, 55, 25, Dark, (50, 500), Some(Gimmick::Heal { ratio: 0.1 })),
    ];

    let questions = vec![
        question("q1_01", Connection, "花の散るを惜しま___", "ru", 1),
        question("q1_02", Connection, "帝に召さ___", "raru", 1),
        question("q1_03", Connection, "人を走ら___", "su", 1),
        question("q1_06", Connection, "花咲か___", "zu", 1),
        question("q1_07", Meaning, "受身の意味を持つ助動詞を選べ", "ru", 1),
        question("q1_09", Meaning, "打消の意味を持つ助動詞を選べ", "zu", 1),
        question("q1_11", Conj, "「る」の已然形を選べ", "ru", 1),
        question("q2_01", Connection, "昔、男あり___", "ki", 2),
        question("q2_02", Connection, "竹取の翁といふものあり___", "keri", 2),
        question("q2_05", Connection, "花咲け___", "ri", 2),
        question("q2_07", Meaning, "詠嘆の意味を持つ助動詞を選べ", "keri", 2),
        question("q2_10", Conj, "「き」の連体形を選べ", "ki", 2),
        question("q3_01", Connection, "明日は雨降ら___", "mu", 3),
        question("q3_02", Connection, "行く___", "beshi", 3),
        question("q3_05", Meaning, "反実仮想の意味を持つ助動詞を選べ", "mashi", 3),
        question("q4_01", Connection, "人の言ふ___", "nari_denbun", 4),
        question("q4_04", Meaning, "希望の意味を持つ助動詞を選べ", "mahoshi", 4),
        question("q5_01", Composite, "水の流るる___し", "gotoshi", 5),
    ];

    Catalog {
        particles,
        verbs,
        enemies,
        questions,
    }
}
