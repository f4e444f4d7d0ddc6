//! Fully deterministic, AI-free combat resolution.
//!
//! The AI may suggest a combat encounter, but it never controls outcomes:
//! every result here comes from dice against player and enemy stats.
//!
//! Combat model:
//! - d20 system: roll a 20-sided die to determine hits and misses
//! - Player damage = roll + strength; a natural 20 is a critical for double
//!   damage that ignores defense
//! - Enemy counter-attack hits when roll + attack >= 10, for d6 + attack
//! - Rounds resolve until one side reaches 0 HP or the player flees
//!
//! All randomness flows through a single [`DiceRoller`], so encounters are
//! reproducible under test with a seeded or scripted source.

use crate::bestiary::Enemy;
use crate::player::Player;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Base probability of a successful flee, before the intelligence bonus.
const FLEE_BASE_CHANCE: f64 = 0.4;
/// Flee probability gained per point of intelligence.
const FLEE_INT_BONUS: f64 = 0.02;
/// Threshold an enemy's roll + attack must reach to hit the player.
const ENEMY_HIT_THRESHOLD: u32 = 10;

/// The shared randomness source driving all combat dice.
pub trait DiceRoller {
    /// Roll a 20-sided die (1..=20).
    fn d20(&mut self) -> u32;

    /// Roll a 6-sided die (1..=6).
    fn d6(&mut self) -> u32;

    /// Uniform draw in [0, 1) for flee checks.
    fn flee_roll(&mut self) -> f64;
}

/// Dice backed by a [`rand::Rng`].
pub struct RngDice<R: Rng> {
    rng: R,
}

impl RngDice<StdRng> {
    /// Dice seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministically seeded dice for reproducible encounters.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DiceRoller for RngDice<R> {
    fn d20(&mut self) -> u32 {
        self.rng.gen_range(1..=20)
    }

    fn d6(&mut self) -> u32 {
        self.rng.gen_range(1..=6)
    }

    fn flee_roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Player choice for one combat round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatAction {
    Attack,
    Flee,
}

/// Terminal and non-terminal encounter states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatState {
    Ongoing,
    Victory,
    Defeat,
    Fled,
}

impl CombatState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CombatState::Ongoing)
    }
}

impl Default for CombatState {
    fn default() -> Self {
        CombatState::Ongoing
    }
}

/// Human-readable record of a combat encounter.
#[derive(Debug, Clone, Default)]
pub struct CombatLog {
    pub rounds: Vec<String>,
    pub outcome: CombatState,
    pub xp_gained: u32,
    pub gold_gained: u32,
    pub loot_gained: Vec<String>,
}

impl CombatLog {
    fn add(&mut self, line: impl Into<String>) {
        self.rounds.push(line.into());
    }

    /// The most recent log line, for per-round display.
    pub fn latest(&self) -> Option<&str> {
        self.rounds.last().map(|s| s.as_str())
    }
}

/// One complete combat engagement, from enemy instantiation to a terminal
/// outcome. Holds the enemy instance; the player is borrowed per round so
/// the engine retains ownership.
pub struct Encounter {
    pub enemy: Enemy,
    pub log: CombatLog,
    state: CombatState,
}

impl Encounter {
    pub fn new(enemy: Enemy) -> Self {
        Self {
            enemy,
            log: CombatLog::default(),
            state: CombatState::Ongoing,
        }
    }

    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Process one combat round. Returns the next state; terminal states
    /// end the encounter.
    pub fn resolve_round(
        &mut self,
        player: &mut Player,
        action: CombatAction,
        dice: &mut dyn DiceRoller,
    ) -> CombatState {
        debug_assert!(self.state == CombatState::Ongoing);

        match action {
            CombatAction::Flee => {
                let chance = FLEE_BASE_CHANCE + player.intelligence as f64 * FLEE_INT_BONUS;
                if dice.flee_roll() < chance {
                    self.log.add("You dash into the shadows and escape!");
                    self.state = CombatState::Fled;
                    self.log.outcome = self.state;
                    return self.state;
                }
                self.log
                    .add("You scramble to flee but the enemy cuts off your escape!");
            }
            CombatAction::Attack => {
                let roll = dice.d20();
                if roll == 20 {
                    // Critical: double damage, ignores defense
                    let damage = 2 * (roll + player.strength);
                    self.enemy.hp -= damage as i64;
                    self.log.add(format!(
                        "CRITICAL HIT! You roll a 20 -> {damage} damage to {}.",
                        self.enemy.name
                    ));
                } else if roll >= self.enemy.defense {
                    let damage = roll + player.strength;
                    self.enemy.hp -= damage as i64;
                    self.log.add(format!(
                        "You roll {roll} -> Hit! {damage} damage to {} (HP: {}/{}).",
                        self.enemy.name,
                        self.enemy.display_hp(),
                        self.enemy.max_hp
                    ));
                } else {
                    self.log.add(format!(
                        "You roll {roll} -> Miss. {} dodges your blow.",
                        self.enemy.name
                    ));
                }
            }
        }

        if self.enemy.is_dead() {
            self.resolve_victory(player);
            return self.state;
        }

        // Enemy counter-attack
        let roll = dice.d20();
        if roll + self.enemy.attack >= ENEMY_HIT_THRESHOLD {
            let damage = dice.d6() + self.enemy.attack;
            let actual = player.take_damage(damage);
            self.log.add(format!(
                "{} strikes back -> {actual} damage to you (HP: {}/{}).",
                self.enemy.name, player.hp, player.max_hp
            ));
        } else {
            self.log.add(format!(
                "{} swings wildly -- you dodge.",
                self.enemy.name
            ));
        }

        if !player.is_alive() {
            self.log
                .add(format!("You have been slain by {}...", self.enemy.name));
            self.state = CombatState::Defeat;
            self.log.outcome = self.state;
            return self.state;
        }

        CombatState::Ongoing
    }

    /// Apply XP, gold, and loot rewards; runs through the player's named
    /// mutation methods only.
    fn resolve_victory(&mut self, player: &mut Player) {
        let xp = self.enemy.xp_reward;
        let gold = self.enemy.gold_reward;
        let loot = self.enemy.loot.clone();

        let levelled_up = player.gain_xp(xp);
        player.modify_gold(gold as i64);
        for item in &loot {
            player.add_item(item.clone());
        }

        self.log.xp_gained = xp;
        self.log.gold_gained = gold;
        self.log.loot_gained = loot.clone();

        self.log.add(format!(
            "{} falls! You gain {xp} XP and {gold} gold.",
            self.enemy.name
        ));
        if !loot.is_empty() {
            self.log.add(format!("Loot: {}", loot.join(", ")));
        }
        if levelled_up {
            self.log.add(format!(
                "LEVEL UP! You are now level {}. HP fully restored to {}.",
                player.level, player.max_hp
            ));
        }

        self.state = CombatState::Victory;
        self.log.outcome = self.state;
    }

    /// Full all-attack auto-resolve loop, for tests and non-interactive use.
    pub fn resolve_auto(&mut self, player: &mut Player, dice: &mut dyn DiceRoller) -> CombatState {
        while self.state == CombatState::Ongoing {
            self.resolve_round(player, CombatAction::Attack, dice);
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bestiary::spawn;
    use crate::testing::ScriptedDice;

    #[test]
    fn test_seeded_dice_are_reproducible() {
        let mut a = RngDice::seeded(42);
        let mut b = RngDice::seeded(42);
        let rolls_a: Vec<u32> = (0..20).map(|_| a.d20()).collect();
        let rolls_b: Vec<u32> = (0..20).map(|_| b.d20()).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|r| (1..=20).contains(r)));
    }

    #[test]
    fn test_critical_hit_ignores_defense() {
        // Cave troll defense 12 is irrelevant on a natural 20
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("cave_troll").unwrap());
        let mut dice = ScriptedDice::new(vec![20, 5], vec![]);

        encounter.resolve_round(&mut player, CombatAction::Attack, &mut dice);

        // 2 * (20 + 5) = 50 off 30 HP
        assert_eq!(encounter.enemy.hp, 30 - 50);
        assert_eq!(encounter.state(), CombatState::Victory);
    }

    #[test]
    fn test_goblin_one_crit_scenario() {
        let mut player = Player::default();
        assert_eq!(player.level, 1);
        assert_eq!(player.strength, 5);

        let mut encounter = Encounter::new(spawn("goblin").unwrap());
        let mut dice = ScriptedDice::new(vec![20], vec![]);

        let state = encounter.resolve_round(&mut player, CombatAction::Attack, &mut dice);

        assert_eq!(state, CombatState::Victory);
        assert_eq!(encounter.log.xp_gained, 30);
        assert_eq!(player.xp, 30);
        assert_eq!(player.gold, 15);
        assert!(player.inventory.contains(&"Rusty Dagger".to_string()));
    }

    #[test]
    fn test_miss_below_defense() {
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("goblin").unwrap());
        // Player rolls 7 (< goblin defense 8), goblin counter-rolls 1
        // (1 + 2 attack < 10, a miss)
        let mut dice = ScriptedDice::new(vec![7, 1], vec![]);

        let state = encounter.resolve_round(&mut player, CombatAction::Attack, &mut dice);

        assert_eq!(state, CombatState::Ongoing);
        assert_eq!(encounter.enemy.hp, 8);
        assert_eq!(player.hp, 20);
    }

    #[test]
    fn test_enemy_counter_attack_damage() {
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("goblin").unwrap());
        // Player misses with 7; goblin rolls 10 (10 + 2 >= 10, hit),
        // then d6 roll of 4 -> 4 + 2 = 6 damage
        let mut dice = ScriptedDice::new(vec![7, 10], vec![4]);

        encounter.resolve_round(&mut player, CombatAction::Attack, &mut dice);

        assert_eq!(player.hp, 14);
    }

    #[test]
    fn test_flee_success() {
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("skeleton").unwrap());
        // Chance = 0.4 + 5 * 0.02 = 0.5; draw 0.49 succeeds
        let mut dice = ScriptedDice::new(vec![], vec![]).with_flee_rolls(vec![0.49]);

        let state = encounter.resolve_round(&mut player, CombatAction::Flee, &mut dice);

        assert_eq!(state, CombatState::Fled);
        assert_eq!(player.hp, 20);
    }

    #[test]
    fn test_flee_failure_triggers_counter_attack() {
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("skeleton").unwrap());
        // Draw 0.51 fails; skeleton rolls 15 (hit), d6 of 3 -> 3 + 3 = 6
        let mut dice = ScriptedDice::new(vec![15], vec![3]).with_flee_rolls(vec![0.51]);

        let state = encounter.resolve_round(&mut player, CombatAction::Flee, &mut dice);

        assert_eq!(state, CombatState::Ongoing);
        assert_eq!(player.hp, 14);
        assert!(encounter
            .log
            .rounds
            .iter()
            .any(|l| l.contains("cuts off your escape")));
    }

    #[test]
    fn test_defeat_on_player_death() {
        let mut player = Player::default();
        player.take_damage(19); // 1 HP left

        let mut encounter = Encounter::new(spawn("cave_troll").unwrap());
        // Player misses with 3; troll rolls 10, d6 of 2 -> 8 damage
        let mut dice = ScriptedDice::new(vec![3, 10], vec![2]);

        let state = encounter.resolve_round(&mut player, CombatAction::Attack, &mut dice);

        assert_eq!(state, CombatState::Defeat);
        assert_eq!(player.hp, 0);
        assert_eq!(encounter.log.outcome, CombatState::Defeat);
    }

    #[test]
    fn test_golden_master_fixed_sequence() {
        // Level-1 player vs goblin with a fully scripted dice sequence:
        // round 1: player rolls 12 -> hit for 17 (goblin 8 -> -9 dead)
        let mut player = Player::default();
        let mut encounter = Encounter::new(spawn("goblin").unwrap());
        let mut dice = ScriptedDice::new(vec![12], vec![]);

        let state = encounter.resolve_auto(&mut player, &mut dice);

        assert_eq!(state, CombatState::Victory);
        assert_eq!(
            encounter.log.rounds,
            vec![
                "You roll 12 -> Hit! 17 damage to Goblin Scout (HP: 0/8).".to_string(),
                "Goblin Scout falls! You gain 30 XP and 5 gold.".to_string(),
                "Loot: Rusty Dagger".to_string(),
            ]
        );
    }
}
