//! Pure, thread-safe card rules (§4.1). No I/O, no hidden state.
//!
//! The piece set mirrors the Xiangqi-style set the original game deals
//! from: one General, two each of Advisor/Elephant/Chariot/Horse/Cannon,
//! and five Soldiers, per color. That is 16 pieces per color, 32 total —
//! exactly four 8-piece hands.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Every seat is dealt exactly this many pieces at Preparation entry.
pub const HAND_SIZE: usize = 8;

/// Open Question resolution: the red-general starter rule applies
/// whenever there is no carried-over winner, which in this design only
/// happens at round 1 (every later round always carries a starter
/// forward per §4.6.2 rule 2).
pub const STARTER_RULE_APPLIES_ROUND_ONE_ONLY: bool = true;

/// Open Question resolution: hard cap on `redeal_multiplier`.
pub const MAX_REDEAL_MULTIPLIER: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    General,
    Advisor,
    Elephant,
    Chariot,
    Horse,
    Cannon,
    Soldier,
}

/// Value object `{kind, color, point}`. `point` in 1..14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    pub point: u8,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color, point: u8) -> Self {
        Self { kind, color, point }
    }

    pub fn is_red_general(&self) -> bool {
        self.kind == PieceKind::General && self.color == Color::Red
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}-{:?}({})", self.color, self.kind, self.point)
    }
}

pub type Hand = Vec<Piece>;
pub type Play = Vec<Piece>;

/// The rules-engine classification of a play (§3 Play, GLOSSARY "Play type").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayType {
    Single { point: u8 },
    Pair { point: u8 },
    ThreeOfAKind { point: u8 },
    FourOfAKind { point: u8 },
    Straight { start: u8, len: u8 },
    ExtendedStraight { start: u8, len: u8 },
    Invalid,
}

impl PlayType {
    /// A scalar used only to compare equal-typed plays (§3).
    fn value(&self) -> u32 {
        match *self {
            PlayType::Single { point }
            | PlayType::Pair { point }
            | PlayType::ThreeOfAKind { point }
            | PlayType::FourOfAKind { point } => point as u32,
            PlayType::Straight { start, len } | PlayType::ExtendedStraight { start, len } => {
                start as u32 * 100 + len as u32
            }
            PlayType::Invalid => 0,
        }
    }

    fn same_variant(&self, other: &PlayType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AWins,
    BWins,
    Tie,
}

/// The opaque collaborator the core calls into; internal algorithms are
/// not specified beyond these signatures (§1, §6).
pub trait RulesEngine: Send + Sync {
    fn classify(&self, play: &[Piece]) -> PlayType;

    /// Only valid when `a` and `b` classify to the same `PlayType`
    /// variant; callers (TurnResults) only ever invoke it that way.
    fn compare(&self, a: &[Piece], b: &[Piece]) -> Comparison;

    fn valid_combos(&self, hand: &[Piece], required_count: usize) -> Vec<Play>;

    fn is_weak(&self, hand: &[Piece]) -> bool;

    /// Opaque scoring formula (§4.6.7, §6); the spec deliberately leaves
    /// this out of scope. Declared/captured mismatch is penalized,
    /// an exact match is rewarded, and the round's redeal multiplier
    /// scales the result.
    fn score(&self, declared: u8, captured: u32, redeal_multiplier: u32) -> i32;

    fn hand_size(&self) -> usize {
        HAND_SIZE
    }
}

/// The standard Liap Tui rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardRules;

impl StandardRules {
    fn points_sorted(play: &[Piece]) -> Vec<u8> {
        let mut points: Vec<u8> = play.iter().map(|p| p.point).collect();
        points.sort_unstable();
        points
    }

    fn is_straight(play: &[Piece]) -> bool {
        if play.len() < 3 {
            return false;
        }
        let same_color = play.windows(2).all(|w| w[0].color == w[1].color);
        if !same_color {
            return false;
        }
        let points = Self::points_sorted(play);
        points.windows(2).all(|w| w[1] == w[0] + 1)
    }
}

impl RulesEngine for StandardRules {
    fn classify(&self, play: &[Piece]) -> PlayType {
        if play.is_empty() || play.len() > HAND_SIZE {
            return PlayType::Invalid;
        }
        let points = Self::points_sorted(play);
        let all_same_point = points.windows(2).all(|w| w[0] == w[1]);
        if all_same_point {
            let point = points[0];
            return match play.len() {
                1 => PlayType::Single { point },
                2 => PlayType::Pair { point },
                3 => PlayType::ThreeOfAKind { point },
                4 => PlayType::FourOfAKind { point },
                _ => PlayType::Invalid,
            };
        }
        if Self::is_straight(play) {
            let start = points[0];
            let len = play.len() as u8;
            return if play.len() == 3 {
                PlayType::Straight { start, len }
            } else {
                PlayType::ExtendedStraight { start, len }
            };
        }
        PlayType::Invalid
    }

    fn compare(&self, a: &[Piece], b: &[Piece]) -> Comparison {
        let ta = self.classify(a);
        let tb = self.classify(b);
        if !ta.same_variant(&tb) {
            return Comparison::Tie;
        }
        match ta.value().cmp(&tb.value()) {
            std::cmp::Ordering::Greater => Comparison::AWins,
            std::cmp::Ordering::Less => Comparison::BWins,
            std::cmp::Ordering::Equal => Comparison::Tie,
        }
    }

    fn valid_combos(&self, hand: &[Piece], required_count: usize) -> Vec<Play> {
        if required_count == 0 || required_count > hand.len() || hand.len() > 20 {
            return Vec::new();
        }
        let n = hand.len();
        let mut combos = Vec::new();
        for mask in 1u32..(1u32 << n) {
            if mask.count_ones() as usize != required_count {
                continue;
            }
            let play: Vec<Piece> = (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| hand[i])
                .collect();
            if !matches!(self.classify(&play), PlayType::Invalid) {
                combos.push(play);
            }
        }
        combos
    }

    fn is_weak(&self, hand: &[Piece]) -> bool {
        hand.iter().all(|p| p.point <= 9)
    }

    fn score(&self, declared: u8, captured: u32, redeal_multiplier: u32) -> i32 {
        let multiplier = redeal_multiplier.max(1) as i32;
        let declared = declared as i32;
        let captured = captured as i32;
        let base = if declared == 0 && captured == 0 {
            3
        } else if declared == captured {
            declared + 5
        } else {
            -(declared - captured).abs()
        };
        base * multiplier
    }
}

/// Builds one full 32-piece deck (unshuffled).
pub fn build_deck() -> Vec<Piece> {
    let mut deck = Vec::with_capacity(32);
    let counts: [(PieceKind, u8, u8); 7] = [
        (PieceKind::General, 1, 14),
        (PieceKind::Advisor, 2, 13),
        (PieceKind::Elephant, 2, 12),
        (PieceKind::Chariot, 2, 11),
        (PieceKind::Horse, 2, 10),
        (PieceKind::Cannon, 2, 9),
        (PieceKind::Soldier, 5, 1),
    ];
    for color in [Color::Red, Color::Black] {
        for (kind, count, point) in counts {
            for _ in 0..count {
                deck.push(Piece::new(kind, color, point));
            }
        }
    }
    deck
}

/// Shuffles a fresh deck and splits it into four 8-piece hands (§4.6.2).
pub fn deal(rng: &mut impl Rng) -> [Hand; 4] {
    let mut deck = build_deck();
    deck.shuffle(rng);
    let mut hands: [Hand; 4] = Default::default();
    for (i, piece) in deck.into_iter().enumerate() {
        hands[i % 4].push(piece);
    }
    hands
}
