//! The generic standard-kind handlers: JOIN, START, MOVE, UPDATE, END.
//!
//! These implement the fallback behavior the Session Runtime uses for
//! standard action kinds whenever no game-specific validator is deployed
//! (or a deployed one is unavailable/timed out). They're also the
//! concrete implementation the Conversion Pipeline's validator
//! synthesis step parameterizes per analysis report (see
//! `forge-conversion`), so a "synthesized" validator for a turn-based
//! board game is this same handler configured with `board = Some((3,
//! 3))`, not a bespoke code generator.

use forge_protocol::{ActionKind, BroadcastKind};
use serde::{Deserialize, Serialize};

use crate::contract::{Validator, ValidatorBroadcast, ValidatorInput, ValidatorOutput};

/// Tunables that select which of the generic behaviors apply. A plain
/// "everyone acts whenever" game and a strict turn-based board game are
/// the same handler with different configuration.
#[derive(Debug, Clone)]
pub struct GenericValidatorConfig {
    pub turn_based: bool,
    pub board_dims: Option<(usize, usize)>,
    pub target_score: Option<i64>,
    /// Starting lives for every joining player. `Some` enables the
    /// last-active-player-standing win condition in `handle_move`;
    /// `None` (the default) leaves elimination unused, matching the
    /// board/counter templates which have their own win conditions.
    pub starting_lives: Option<i64>,
    /// Whether an unbounded `MOVE` `{"delta": N}` payload accumulates
    /// into the mover's score, independent of any target/board win
    /// condition. Set by `score_based`.
    pub scored: bool,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for GenericValidatorConfig {
    fn default() -> Self {
        Self {
            turn_based: false,
            board_dims: None,
            target_score: None,
            starting_lives: None,
            scored: false,
            min_players: 1,
            max_players: 8,
        }
    }
}

impl GenericValidatorConfig {
    /// `counter-turn-based`: two players race to a target total.
    pub fn counter_turn_based(target: i64) -> Self {
        Self {
            turn_based: true,
            target_score: Some(target),
            min_players: 2,
            max_players: 2,
            ..Default::default()
        }
    }

    /// `board-3x3-turn-based`: tic-tac-toe style, three in a row wins.
    pub fn board_turn_based(rows: usize, cols: usize) -> Self {
        Self {
            turn_based: true,
            board_dims: Some((rows, cols)),
            min_players: 2,
            max_players: 2,
            ..Default::default()
        }
    }

    /// `last-player-standing`: turn order, no board; a `MOVE` payload
    /// of `{"damage": N, "target": "<playerId>"}` (defaulting to 1
    /// point of self-damage when omitted) drains lives, and the last
    /// non-eliminated player wins.
    pub fn last_player_standing(starting_lives: i64, max_players: usize) -> Self {
        Self {
            turn_based: true,
            starting_lives: Some(starting_lives),
            min_players: 2,
            max_players,
            ..Default::default()
        }
    }

    /// `score-based`: no turn order, no board, no fixed target — every
    /// `MOVE`'s `{"delta": N}` folds into the mover's running score.
    /// Ending is driven by an explicit `END`, not an automatic win
    /// condition.
    pub fn score_based(max_players: usize) -> Self {
        Self {
            scored: true,
            min_players: 1,
            max_players,
            ..Default::default()
        }
    }

    /// `realtime-reconciling`: no turn gating at all — any player may
    /// `MOVE`/`UPDATE` at any time, and `handle_update`'s generic merge
    /// is the reconciliation mechanism. Used for canvas/realtime
    /// analyses where there's no natural turn order to enforce.
    pub fn realtime_reconciling(max_players: usize) -> Self {
        Self {
            min_players: 1,
            max_players,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct PlayerEntry {
    id: String,
    #[serde(default)]
    score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lives: Option<i64>,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    eliminated: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenericState {
    #[serde(default = "default_phase")]
    phase: String,
    #[serde(default)]
    round: u64,
    #[serde(default)]
    current_turn: Option<String>,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    players: Vec<PlayerEntry>,
    #[serde(default)]
    board: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    counter: i64,
    #[serde(default)]
    target: Option<i64>,
}

fn default_phase() -> String {
    "lobby".to_string()
}

impl GenericState {
    fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| GenericState {
            phase: default_phase(),
            round: 0,
            current_turn: None,
            winner: None,
            players: Vec::new(),
            board: None,
            counter: 0,
            target: None,
        })
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::to_value(self).expect("GenericState always serializes")
    }
}

/// The generic fallback / synthesized-template validator.
pub struct GenericValidator {
    config: GenericValidatorConfig,
}

impl GenericValidator {
    pub fn new(config: GenericValidatorConfig) -> Self {
        Self { config }
    }
}

impl Validator for GenericValidator {
    fn initial_state(&self) -> serde_json::Value {
        let mut state = GenericState {
            phase: "lobby".into(),
            round: 0,
            current_turn: None,
            winner: None,
            players: Vec::new(),
            board: self
                .config
                .board_dims
                .map(|(rows, cols)| vec![vec![None; cols]; rows]),
            counter: 0,
            target: self.config.target_score,
        };
        if let Some(target) = self.config.target_score {
            state.target = Some(target);
        }
        state.into_value()
    }

    fn min_players(&self) -> usize {
        self.config.min_players
    }

    fn max_players(&self) -> usize {
        self.config.max_players
    }

    fn invoke(&self, input: ValidatorInput) -> ValidatorOutput {
        let mut state = GenericState::from_value(&input.state);
        let player = input.player_id.as_str().to_string();

        match input.action {
            ActionKind::Join => self.handle_join(&mut state, player, input.timestamp),
            ActionKind::Start => self.handle_start(&mut state, input.timestamp),
            ActionKind::Move => self.handle_move(&mut state, player, &input.data, input.timestamp),
            ActionKind::Update => self.handle_update(&mut state, player, &input.data, input.timestamp),
            ActionKind::End => self.handle_end(&mut state, input.timestamp),
            ActionKind::Custom(tag) => {
                ValidatorOutput::reject(format!("no generic handler for custom kind {tag}"), input.timestamp)
            }
        }
    }
}

impl GenericValidator {
    fn handle_join(&self, state: &mut GenericState, player: String, ts: u64) -> ValidatorOutput {
        if state.players.iter().any(|p| p.id == player) {
            return ValidatorOutput::reject("DUPLICATE_PLAYER", ts);
        }
        if state.players.len() >= self.config.max_players {
            return ValidatorOutput::reject("GAME_FULL", ts);
        }
        let first_join = state.players.is_empty();
        state.players.push(PlayerEntry {
            id: player.clone(),
            score: 0,
            lives: self.config.starting_lives,
            active: true,
            eliminated: false,
        });
        if self.config.turn_based && first_join {
            state.current_turn = Some(player.clone());
        }
        let broadcast = ValidatorBroadcast {
            kind: Some(BroadcastKind::PlayerJoined),
            change: format!("{player} joined"),
            delta: None,
        };
        ValidatorOutput::accept(state.clone().into_value(), broadcast, ts)
    }

    fn handle_start(&self, state: &mut GenericState, ts: u64) -> ValidatorOutput {
        if state.phase != "lobby" {
            return ValidatorOutput::reject("GAME_ALREADY_ACTIVE", ts);
        }
        if state.players.len() < self.config.min_players {
            return ValidatorOutput::reject("NOT_ENOUGH_PLAYERS", ts);
        }
        state.phase = "active".into();
        state.round = 1;
        let broadcast = ValidatorBroadcast {
            kind: Some(BroadcastKind::GameStarted),
            change: "game started".into(),
            delta: None,
        };
        ValidatorOutput::accept(state.clone().into_value(), broadcast, ts)
    }

    fn handle_move(
        &self,
        state: &mut GenericState,
        player: String,
        data: &serde_json::Value,
        ts: u64,
    ) -> ValidatorOutput {
        if state.phase != "active" {
            return ValidatorOutput::reject("GAME_NOT_ACTIVE", ts);
        }
        if self.config.turn_based && state.current_turn.as_deref() != Some(player.as_str()) {
            return ValidatorOutput::reject("NOT_YOUR_TURN", ts);
        }

        if let Some(board) = state.board.as_mut() {
            let row = data.get("row").and_then(|v| v.as_u64()).map(|v| v as usize);
            let col = data.get("col").and_then(|v| v.as_u64()).map(|v| v as usize);
            if let (Some(row), Some(col)) = (row, col) {
                match board.get(row).and_then(|r| r.get(col)) {
                    Some(None) => board[row][col] = Some(player.clone()),
                    Some(Some(_)) => return ValidatorOutput::reject("ILLEGAL_MOVE", ts),
                    None => return ValidatorOutput::reject("ILLEGAL_MOVE", ts),
                }
            }
        } else if state.target.is_some() || self.config.scored {
            let delta = data.get("delta").and_then(|v| v.as_i64()).unwrap_or(0);
            state.counter += delta;
            if let Some(p) = state.players.iter_mut().find(|p| p.id == player) {
                p.score += delta;
            }
        }

        if self.config.starting_lives.is_some() {
            apply_lives_damage(state, &player, data);
        }

        if self.config.turn_based {
            advance_turn(state, &player);
        }

        let mut kind = BroadcastKind::MoveMade;
        if let Some(board) = state.board.clone() {
            if let Some(winner) = board_winner(&board) {
                state.winner = Some(winner);
                state.phase = "ended".into();
                kind = BroadcastKind::GameEnded;
            } else if board.iter().flatten().all(|c| c.is_some()) {
                state.phase = "ended".into();
                kind = BroadcastKind::GameEnded;
            }
        } else if let Some(target) = state.target {
            if state.counter >= target {
                state.winner = Some(player.clone());
                state.phase = "ended".into();
                kind = BroadcastKind::GameEnded;
            }
        }

        if state.phase != "ended" {
            if let Some(survivor) = last_player_standing(state) {
                state.winner = Some(survivor);
                state.phase = "ended".into();
                kind = BroadcastKind::GameEnded;
            }
        }

        let broadcast = ValidatorBroadcast {
            kind: Some(kind),
            change: format!("{player} moved"),
            delta: Some(data.clone()),
        };
        ValidatorOutput::accept(state.clone().into_value(), broadcast, ts)
    }

    fn handle_update(
        &self,
        state: &mut GenericState,
        player: String,
        data: &serde_json::Value,
        ts: u64,
    ) -> ValidatorOutput {
        if let Some(obj) = data.as_object() {
            if let Some(score) = obj.get("score").and_then(|v| v.as_i64()) {
                if let Some(p) = state.players.iter_mut().find(|p| p.id == player) {
                    p.score = score;
                } else {
                    state.players.push(PlayerEntry {
                        id: player.clone(),
                        score,
                        lives: self.config.starting_lives,
                        active: true,
                        eliminated: false,
                    });
                }
            }
        }
        let broadcast = ValidatorBroadcast {
            kind: Some(BroadcastKind::StateUpdate),
            change: "state updated".into(),
            delta: Some(data.clone()),
        };
        ValidatorOutput::accept(state.clone().into_value(), broadcast, ts)
    }

    fn handle_end(&self, state: &mut GenericState, ts: u64) -> ValidatorOutput {
        state.phase = "ended".into();
        let broadcast = ValidatorBroadcast {
            kind: Some(BroadcastKind::GameEnded),
            change: "game ended".into(),
            delta: None,
        };
        ValidatorOutput::accept(state.clone().into_value(), broadcast, ts)
    }
}

/// Applies a `MOVE` payload's `{"damage": N, "target": "<id>"}` fields
/// against a lives-tracked player, marking them eliminated once their
/// lives reach zero. `target` defaults to the mover (a failed attempt
/// costs the mover a life) and `damage` defaults to 1.
fn apply_lives_damage(state: &mut GenericState, mover: &str, data: &serde_json::Value) {
    let target = data.get("target").and_then(|v| v.as_str()).unwrap_or(mover).to_string();
    let damage = data.get("damage").and_then(|v| v.as_i64()).unwrap_or(1);
    if let Some(p) = state.players.iter_mut().find(|p| p.id == target) {
        if p.eliminated {
            return;
        }
        let lives = p.lives.unwrap_or(0) - damage;
        p.lives = Some(lives);
        if lives <= 0 {
            p.eliminated = true;
            p.active = false;
        }
    }
}

/// The last-active-player-standing win condition (spec §4.4): when
/// exactly one of two-or-more joined players remains non-eliminated,
/// that player wins. Only meaningful for games with a lives mechanic —
/// games that never eliminate anyone never have fewer than all players
/// active, so this is a no-op for them.
fn last_player_standing(state: &GenericState) -> Option<String> {
    if state.players.len() < 2 {
        return None;
    }
    let mut remaining = state.players.iter().filter(|p| !p.eliminated);
    let first = remaining.next()?;
    if remaining.next().is_none() {
        Some(first.id.clone())
    } else {
        None
    }
}

/// Advances the turn pointer to the next non-eliminated player by
/// insertion order, wrapping modulo the active set.
fn advance_turn(state: &mut GenericState, current: &str) {
    if state.players.is_empty() {
        return;
    }
    let active: Vec<&PlayerEntry> = state.players.iter().filter(|p| !p.eliminated).collect();
    if active.len() <= 1 {
        return;
    }
    let idx = active.iter().position(|p| p.id == current).unwrap_or(0);
    let next = active[(idx + 1) % active.len()];
    state.current_turn = Some(next.id.clone());
}

/// Checks rows, columns, and both diagonals for three-in-a-row (or
/// N-in-a-row on an N×N board) by a single player.
fn board_winner(board: &[Vec<Option<String>>]) -> Option<String> {
    let n = board.len();
    let check_line = |line: Vec<&Option<String>>| -> Option<String> {
        let first = line[0].as_ref()?;
        if line.iter().all(|c| c.as_deref() == Some(first.as_str())) {
            Some(first.clone())
        } else {
            None
        }
    };

    for row in board {
        if let Some(w) = check_line(row.iter().collect()) {
            return Some(w);
        }
    }
    for col in 0..n {
        if let Some(w) = check_line(board.iter().map(|r| &r[col]).collect()) {
            return Some(w);
        }
    }
    if let Some(w) = check_line((0..n).map(|i| &board[i][i]).collect()) {
        return Some(w);
    }
    if let Some(w) = check_line((0..n).map(|i| &board[i][n - 1 - i]).collect()) {
        return Some(w);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_protocol::{PlayerId, RoomId};

    fn input(
        action: ActionKind,
        player: &str,
        state: serde_json::Value,
        data: serde_json::Value,
    ) -> ValidatorInput {
        ValidatorInput {
            action,
            state,
            player_id: PlayerId::new(player),
            data,
            room_id: RoomId::new("r1"),
            timestamp: 1000,
        }
    }

    #[test]
    fn counter_race_to_ten() {
        let v = GenericValidator::new(GenericValidatorConfig::counter_turn_based(10));
        let mut state = v.initial_state();

        let out = v.invoke(input(ActionKind::Join, "p1", state.clone(), serde_json::Value::Null));
        assert!(out.valid);
        state = out.updated_state.unwrap();

        let out = v.invoke(input(ActionKind::Join, "p2", state.clone(), serde_json::Value::Null));
        assert!(out.valid);
        state = out.updated_state.unwrap();

        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        assert!(out.valid);
        state = out.updated_state.unwrap();

        let mut mover = "p1";
        for i in 0..10 {
            let out = v.invoke(input(
                ActionKind::Move,
                mover,
                state.clone(),
                serde_json::json!({"delta": 1}),
            ));
            assert!(out.valid, "move {i} by {mover} should be accepted");
            state = out.updated_state.unwrap();
            mover = if mover == "p1" { "p2" } else { "p1" };
        }

        let final_state: GenericState = serde_json::from_value(state).unwrap();
        assert_eq!(final_state.counter, 10);
        assert_eq!(final_state.phase, "ended");
        assert_eq!(final_state.winner.as_deref(), Some("p2"));
    }

    #[test]
    fn tic_tac_toe_diagonal_win() {
        let v = GenericValidator::new(GenericValidatorConfig::board_turn_based(3, 3));
        let mut state = v.initial_state();
        for p in ["p1", "p2"] {
            let out = v.invoke(input(ActionKind::Join, p, state.clone(), serde_json::Value::Null));
            state = out.updated_state.unwrap();
        }
        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();

        let moves = [("p1", 0, 0), ("p2", 1, 0), ("p1", 1, 1), ("p2", 2, 0), ("p1", 2, 2)];
        for (player, row, col) in moves {
            let out = v.invoke(input(
                ActionKind::Move,
                player,
                state.clone(),
                serde_json::json!({"row": row, "col": col}),
            ));
            assert!(out.valid);
            state = out.updated_state.unwrap();
        }

        let final_state: GenericState = serde_json::from_value(state).unwrap();
        assert_eq!(final_state.winner.as_deref(), Some("p1"));
        assert_eq!(final_state.phase, "ended");
    }

    #[test]
    fn out_of_turn_move_rejected() {
        let v = GenericValidator::new(GenericValidatorConfig::board_turn_based(3, 3));
        let mut state = v.initial_state();
        for p in ["p1", "p2"] {
            let out = v.invoke(input(ActionKind::Join, p, state.clone(), serde_json::Value::Null));
            state = out.updated_state.unwrap();
        }
        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();

        let out = v.invoke(input(
            ActionKind::Move,
            "p2",
            state.clone(),
            serde_json::json!({"row": 0, "col": 0}),
        ));
        assert!(!out.valid);
        assert_eq!(out.reason.as_deref(), Some("NOT_YOUR_TURN"));
    }

    #[test]
    fn third_join_in_two_player_game_fails() {
        let v = GenericValidator::new(GenericValidatorConfig::board_turn_based(3, 3));
        let mut state = v.initial_state();
        for p in ["p1", "p2"] {
            let out = v.invoke(input(ActionKind::Join, p, state.clone(), serde_json::Value::Null));
            state = out.updated_state.unwrap();
        }
        let out = v.invoke(input(ActionKind::Join, "p3", state.clone(), serde_json::Value::Null));
        assert!(!out.valid);
        assert_eq!(out.reason.as_deref(), Some("GAME_FULL"));
    }

    #[test]
    fn last_player_standing_ends_game_when_one_player_remains() {
        let v = GenericValidator::new(GenericValidatorConfig::last_player_standing(1, 3));
        let mut state = v.initial_state();
        for p in ["p1", "p2", "p3"] {
            let out = v.invoke(input(ActionKind::Join, p, state.clone(), serde_json::Value::Null));
            assert!(out.valid);
            state = out.updated_state.unwrap();
        }
        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();

        // p1 eliminates p2; turn passes to p3 (p2 skipped).
        let out = v.invoke(input(
            ActionKind::Move,
            "p1",
            state.clone(),
            serde_json::json!({"damage": 1, "target": "p2"}),
        ));
        assert!(out.valid);
        state = out.updated_state.unwrap();
        let mid_state: GenericState = serde_json::from_value(state.clone()).unwrap();
        assert_eq!(mid_state.phase, "active");
        assert_eq!(mid_state.current_turn.as_deref(), Some("p3"));

        // p3 eliminates p1, leaving only p3 standing.
        let out = v.invoke(input(
            ActionKind::Move,
            "p3",
            state.clone(),
            serde_json::json!({"damage": 1, "target": "p1"}),
        ));
        assert!(out.valid);
        state = out.updated_state.unwrap();

        let final_state: GenericState = serde_json::from_value(state).unwrap();
        assert_eq!(final_state.phase, "ended");
        assert_eq!(final_state.winner.as_deref(), Some("p3"));
    }

    #[test]
    fn score_based_accumulates_without_a_target() {
        let v = GenericValidator::new(GenericValidatorConfig::score_based(4));
        let mut state = v.initial_state();
        let out = v.invoke(input(ActionKind::Join, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();
        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();

        let out = v.invoke(input(
            ActionKind::Move,
            "p1",
            state.clone(),
            serde_json::json!({"delta": 7}),
        ));
        assert!(out.valid);
        state = out.updated_state.unwrap();

        let final_state: GenericState = serde_json::from_value(state).unwrap();
        assert_eq!(final_state.counter, 7);
        assert_eq!(final_state.phase, "active", "score-based has no automatic win condition");
    }

    #[test]
    fn start_below_minimum_rejected() {
        let v = GenericValidator::new(GenericValidatorConfig::board_turn_based(3, 3));
        let mut state = v.initial_state();
        let out = v.invoke(input(ActionKind::Join, "p1", state.clone(), serde_json::Value::Null));
        state = out.updated_state.unwrap();
        let out = v.invoke(input(ActionKind::Start, "p1", state.clone(), serde_json::Value::Null));
        assert!(!out.valid);
        assert_eq!(out.reason.as_deref(), Some("NOT_ENOUGH_PLAYERS"));
    }
}
