//! One actor per room, subscribed in-process to phase changes (§4.10).
//! Grounded in the teacher's `BotManager`/`BotDecisionMaker` split: a
//! lightweight manager loop that owns timing and exactly-once intent
//! tracking, delegating the actual choice to a small strategy type.
//!
//! Unlike the teacher's bots, these never touch a database — they act
//! purely off the in-process `BotCue` snapshot and enqueue through the
//! same `ActionQueue` a human transport would use.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::debug;

use crate::action_queue::ActionQueueHandle;
use crate::game::GameSnapshot;
use crate::game_state_machine::BotCue;
use crate::net::messages::{ClientAction, PlayerView};
use crate::room::RoomConfig;
use crate::rules::{Piece, RulesEngine, StandardRules};

/// Opaque per §6: the actor doesn't care how a decision is made, only
/// that it gets one back for a given phase/seat.
pub trait BotStrategy: Send + Sync {
    fn choose_redeal(&self, snapshot: &GameSnapshot, seat: &str) -> bool;
    fn choose_declare(&self, snapshot: &GameSnapshot, seat: &str) -> u8;
    fn choose_play(&self, snapshot: &GameSnapshot, seat: &str) -> Vec<usize>;
}

/// A simple heuristic strategy: accept weak-hand redeals, declare off
/// a count of strong pieces, play the lowest-value legal combo.
pub struct DefaultBotStrategy {
    rules: Arc<dyn RulesEngine>,
}

impl DefaultBotStrategy {
    pub fn new(rules: Arc<dyn RulesEngine>) -> Self {
        Self { rules }
    }
}

impl BotStrategy for DefaultBotStrategy {
    fn choose_redeal(&self, snapshot: &GameSnapshot, seat: &str) -> bool {
        snapshot
            .bot_hands
            .get(seat)
            .map(|hand| self.rules.is_weak(hand))
            .unwrap_or(false)
    }

    fn choose_declare(&self, snapshot: &GameSnapshot, seat: &str) -> u8 {
        let Some(hand) = snapshot.bot_hands.get(seat) else { return 0 };
        let strong = hand.iter().filter(|p| p.point >= 10).count() as u8;
        let already_declared: u32 = snapshot.players.iter().filter_map(|p| p.declared).map(u32::from).sum();
        let player: Option<&PlayerView> = snapshot.players.iter().find(|p| p.name == seat);
        let zero_streak = player.map(|p| p.zero_declares_in_a_row).unwrap_or(0);
        let cap = hand.len() as u8;
        let mut value = strong.min(cap);

        if zero_streak >= 2 && value == 0 {
            value = 1;
        }
        if already_declared as i64 + value as i64 == 8 {
            value = if value < cap { value + 1 } else { value.saturating_sub(1) };
        }
        value
    }

    fn choose_play(&self, snapshot: &GameSnapshot, seat: &str) -> Vec<usize> {
        let Some(hand) = snapshot.bot_hands.get(seat) else { return Vec::new() };
        let required = snapshot.required_piece_count.unwrap_or(1).max(1);
        let combos = self.rules.valid_combos(hand, required);
        let chosen = combos
            .into_iter()
            .min_by_key(|combo| combo.iter().map(|p| p.point as u32).sum::<u32>())
            .unwrap_or_else(|| hand.iter().take(required).cloned().collect());
        combo_to_indices(hand, &chosen)
    }
}

/// Matches each chosen piece back to a hand index, so a duplicate
/// piece value is never counted twice.
fn combo_to_indices(hand: &[Piece], combo: &[Piece]) -> Vec<usize> {
    let mut used = HashSet::new();
    let mut indices = Vec::with_capacity(combo.len());
    for piece in combo {
        if let Some(idx) = hand.iter().enumerate().position(|(i, p)| p == piece && !used.contains(&i)) {
            used.insert(idx);
            indices.push(idx);
        }
    }
    indices
}

/// `(phase, turn_number, seat)`: refuses to enqueue twice for the same
/// tuple (§4.10 "exactly-once intent per phase-turn").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Intent {
    phase: String,
    turn_number: u32,
    seat: String,
}

pub struct BotActor {
    room_id: String,
    actions: ActionQueueHandle,
    config: RoomConfig,
    cue: watch::Receiver<BotCue>,
    strategy: Arc<dyn BotStrategy>,
    sent: HashSet<Intent>,
}

impl BotActor {
    pub fn new(room_id: impl Into<String>, actions: ActionQueueHandle, config: RoomConfig, cue: watch::Receiver<BotCue>) -> Self {
        Self {
            room_id: room_id.into(),
            actions,
            config,
            cue,
            strategy: Arc::new(DefaultBotStrategy::new(Arc::new(StandardRules))),
            sent: HashSet::new(),
        }
    }

    /// Runs until the `GameStateMachine`'s cue sender is dropped (the
    /// room has torn down).
    pub async fn run(mut self) {
        loop {
            let cue = self.cue.borrow_and_update().clone();
            self.sent.retain(|i| i.phase == cue.phase && i.turn_number == cue.snapshot.turn_number);
            self.act_on(&cue).await;
            if self.cue.changed().await.is_err() {
                break;
            }
        }
        debug!(room_id = %self.room_id, "bot actor exiting");
    }

    async fn act_on(&mut self, cue: &BotCue) {
        let intents = self.pending_intents(cue);
        for (seat, think_delay) in intents {
            let intent = Intent { phase: cue.phase.clone(), turn_number: cue.snapshot.turn_number, seat: seat.clone() };
            if self.sent.contains(&intent) {
                continue;
            }
            self.sent.insert(intent);

            tokio::time::sleep(think_delay).await;
            // The phase may have moved on during the sleep (§4.10
            // cancellation); re-check before enqueuing a stale intent.
            let current = self.cue.borrow().clone();
            if current.phase != cue.phase || current.snapshot.turn_number != cue.snapshot.turn_number {
                continue;
            }

            let action = match cue.phase.as_str() {
                "preparation" => ClientAction::RedealDecision { accept: self.strategy.choose_redeal(&cue.snapshot, &seat) },
                "declaration" => ClientAction::Declare { value: self.strategy.choose_declare(&cue.snapshot, &seat) },
                "turn" => ClientAction::Play { indices: self.strategy.choose_play(&cue.snapshot, &seat) },
                _ => continue,
            };
            self.actions.enqueue(seat, action);
        }
    }

    /// Which bot seats owe an action this phase, and how long each
    /// should think before acting (§4.10).
    fn pending_intents(&self, cue: &BotCue) -> Vec<(String, Duration)> {
        let mut rng = rand::rng();
        match cue.phase.as_str() {
            "preparation" => cue
                .snapshot
                .redeal_offer_to
                .as_ref()
                .filter(|name| cue.snapshot.players.iter().any(|p| &p.name == *name && p.is_bot))
                .map(|name| vec![(name.clone(), random_delay(&mut rng, self.config.bot_redeal_delay_min, self.config.bot_redeal_delay_max))])
                .unwrap_or_default(),
            "declaration" => cue
                .snapshot
                .current_declarer
                .as_ref()
                .filter(|name| cue.snapshot.players.iter().any(|p| &p.name == *name && p.is_bot))
                .map(|name| vec![(name.clone(), random_delay(&mut rng, self.config.bot_declare_delay_min, self.config.bot_declare_delay_max))])
                .unwrap_or_default(),
            "turn" => cue
                .snapshot
                .current_player
                .as_ref()
                .filter(|name| cue.snapshot.players.iter().any(|p| &p.name == *name && p.is_bot))
                .map(|name| vec![(name.clone(), random_delay(&mut rng, self.config.bot_declare_delay_min, self.config.bot_declare_delay_max))])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

fn random_delay(rng: &mut impl Rng, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rng.random_range(0..=span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Color, PieceKind};

    fn snapshot_with_hand(seat: &str, hand: Vec<Piece>) -> GameSnapshot {
        let mut bot_hands = std::collections::HashMap::new();
        bot_hands.insert(seat.to_string(), hand);
        GameSnapshot {
            room_id: "ABC123".into(),
            round_number: 1,
            turn_number: 0,
            redeal_multiplier: 1,
            players: vec![PlayerView {
                name: seat.to_string(),
                is_bot: true,
                is_connected: false,
                score: 0,
                hand_size: 8,
                captured_piles: 0,
                declared: None,
                zero_declares_in_a_row: 0,
            }],
            current_plays: Vec::new(),
            required_piece_count: Some(1),
            current_player: Some(seat.to_string()),
            current_declarer: Some(seat.to_string()),
            redeal_offer_to: Some(seat.to_string()),
            bot_hands,
        }
    }

    #[test]
    fn choose_play_returns_indices_present_in_the_hand() {
        let strategy = DefaultBotStrategy::new(Arc::new(StandardRules));
        let hand = vec![
            Piece::new(PieceKind::Soldier, Color::Red, 1),
            Piece::new(PieceKind::Horse, Color::Black, 10),
        ];
        let snap = snapshot_with_hand("Bot1", hand);
        let indices = strategy.choose_play(&snap, "Bot1");
        assert!(!indices.is_empty());
        assert!(indices.iter().all(|&i| i < 2));
    }

    #[test]
    fn choose_declare_never_brings_total_to_eight_when_avoidable() {
        let strategy = DefaultBotStrategy::new(Arc::new(StandardRules));
        let hand: Vec<Piece> = (0..8).map(|_| Piece::new(PieceKind::Horse, Color::Red, 10)).collect();
        let mut snap = snapshot_with_hand("Bot1", hand);
        snap.players.push(PlayerView {
            name: "Other".into(),
            is_bot: false,
            is_connected: true,
            score: 0,
            hand_size: 8,
            captured_piles: 0,
            declared: Some(0),
            zero_declares_in_a_row: 0,
        });
        let value = strategy.choose_declare(&snap, "Bot1");
        assert_ne!(value, 8);
    }

    #[test]
    fn choose_redeal_accepts_a_weak_hand() {
        let strategy = DefaultBotStrategy::new(Arc::new(StandardRules));
        let hand: Vec<Piece> = (0..8).map(|i| Piece::new(PieceKind::Soldier, Color::Red, (i % 5) as u8 + 1)).collect();
        let snap = snapshot_with_hand("Bot1", hand);
        assert!(strategy.choose_redeal(&snap, "Bot1"));
    }

    #[test]
    fn combo_to_indices_never_reuses_the_same_slot_twice() {
        let hand = vec![
            Piece::new(PieceKind::Soldier, Color::Red, 1),
            Piece::new(PieceKind::Soldier, Color::Red, 1),
        ];
        let combo = vec![Piece::new(PieceKind::Soldier, Color::Red, 1), Piece::new(PieceKind::Soldier, Color::Red, 1)];
        let indices = combo_to_indices(&hand, &combo);
        assert_eq!(indices.len(), 2);
        assert_ne!(indices[0], indices[1]);
    }
}
