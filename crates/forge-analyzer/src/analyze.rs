//! `analyze(source) -> AnalysisReport`: the analyzer's single entry
//! point. Never fails — a document that trips no signal gets the
//! `custom-game` fallback (spec.md §4.2 "Errors").

use crate::report::{
    AnalysisReport, ComplexityBucket, ElementsInventory, InteractionsInventory, MechanicsFlags,
    NetworkInventory, StateInventory,
};
use crate::signals::{score_characteristic, score_mechanics_flag, strip_comments, CHARACTERISTIC_PRIORITY};

/// Minimum score a characteristic must clear to be considered detected
/// at all, before priority-order tie-breaking decides the winner.
const DETECTION_THRESHOLD: f64 = 1.0;

pub fn analyze(source: &str) -> AnalysisReport {
    let body = strip_comments(source);
    let lower_body = body.to_lowercase();
    let lower_raw = source.to_lowercase();

    let kind = classify_kind(&lower_body, &lower_raw);
    let mechanics = classify_mechanics(&lower_body, &lower_raw);
    let elements = inventory_elements(&body);
    let interactions = inventory_interactions(&lower_body);
    let state = inventory_state(&body, &lower_body);
    let network = inventory_network(&lower_body);
    let (complexity, complexity_score) =
        classify_complexity(&mechanics, &elements, &interactions, &network);

    AnalysisReport {
        kind,
        mechanics,
        elements,
        interactions,
        state,
        network,
        complexity,
        complexity_score,
    }
}

/// Builds the free-form kind tag, e.g. `board-3x3-turn-based`. The
/// leading characteristic is the highest-scoring one clearing
/// [`DETECTION_THRESHOLD`], ties broken by `CHARACTERISTIC_PRIORITY`;
/// when nothing clears the threshold, falls back to `custom-game`.
fn classify_kind(body: &str, raw: &str) -> String {
    let mut best: Option<(&str, f64)> = None;
    for characteristic in CHARACTERISTIC_PRIORITY {
        let score = score_characteristic(characteristic, body, raw);
        if score < DETECTION_THRESHOLD {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((characteristic, score)),
        }
    }

    let Some((leading, _)) = best else {
        return "custom-game".to_string();
    };

    let mut parts = vec![leading.to_string()];
    if let Some((rows, cols)) = infer_board_dims(body) {
        parts.push(format!("{rows}x{cols}"));
    }
    if leading != "turn-based" && score_characteristic("turn-based", body, raw) >= DETECTION_THRESHOLD {
        parts.push("turn-based".to_string());
    } else if leading != "realtime" && score_characteristic("realtime", body, raw) >= DETECTION_THRESHOLD {
        parts.push("realtime".to_string());
    }
    parts.join("-")
}

fn classify_mechanics(body: &str, raw: &str) -> MechanicsFlags {
    MechanicsFlags {
        turns: score_mechanics_flag("turns", body, raw),
        board: score_mechanics_flag("board", body, raw) || infer_board_dims(body).is_some(),
        score: score_mechanics_flag("score", body, raw),
        timer: score_mechanics_flag("timer", body, raw),
        levels: score_mechanics_flag("levels", body, raw),
        lives: score_mechanics_flag("lives", body, raw),
        realtime: score_mechanics_flag("realtime", body, raw),
        win_condition: score_mechanics_flag("win_condition", body, raw),
        physics: score_mechanics_flag("physics", body, raw),
        rounds: score_mechanics_flag("rounds", body, raw),
    }
}

fn inventory_elements(body: &str) -> ElementsInventory {
    let lower = body.to_lowercase();
    ElementsInventory {
        buttons: extract_button_labels(body),
        has_form: lower.contains("<form"),
        has_canvas: lower.contains("<canvas"),
        board_dims: infer_board_dims(&lower),
        cell_count: count_cell_elements(&lower),
    }
}

/// Pulls the inner text of `<button>...</button>` tags as candidate
/// labels. Pattern-scan level: no attribute/nesting parsing.
fn extract_button_labels(body: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let lower = body.to_lowercase();
    let mut search_from = 0;
    while let Some(open_rel) = lower[search_from..].find("<button") {
        let open = search_from + open_rel;
        let Some(tag_end_rel) = lower[open..].find('>') else {
            break;
        };
        let content_start = open + tag_end_rel + 1;
        let Some(close_rel) = lower[content_start..].find("</button>") else {
            break;
        };
        let label = body[content_start..content_start + close_rel].trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
        search_from = content_start + close_rel + "</button>".len();
    }
    labels
}

/// Requires an explicit `NxM` token (e.g. `3x3`, `3 x 3`) — numeric
/// inference never guesses from counted elements alone here; that's
/// what `count_cell_elements` is for.
fn infer_board_dims(lower_body: &str) -> Option<(usize, usize)> {
    let bytes = lower_body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let rows: usize = lower_body[start..i].parse().ok()?;
            let mut j = i;
            while j < bytes.len() && bytes[j] == b' ' {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] == b'x' || lower_body[j..].starts_with('\u{d7}')) {
                let sep_len = if bytes[j] == b'x' { 1 } else { '\u{d7}'.len_utf8() };
                let mut k = j + sep_len;
                while k < bytes.len() && bytes[k] == b' ' {
                    k += 1;
                }
                let digit_start = k;
                while k < bytes.len() && bytes[k].is_ascii_digit() {
                    k += 1;
                }
                if k > digit_start {
                    if let Ok(cols) = lower_body[digit_start..k].parse::<usize>() {
                        if rows > 0 && rows <= 64 && cols > 0 && cols <= 64 {
                            return Some((rows, cols));
                        }
                    }
                }
            }
            continue;
        }
        i += 1;
    }
    None
}

/// Counts occurrences of a `cell`-labeled class/data attribute as a
/// corroborating, counted-element signal independent of any `NxM`
/// token.
fn count_cell_elements(lower_body: &str) -> Option<usize> {
    let markers = ["class=\"cell", "data-cell", "class='cell"];
    let count: usize = markers.iter().map(|m| lower_body.matches(m).count()).sum();
    if count > 0 {
        Some(count)
    } else {
        None
    }
}

fn inventory_interactions(lower_body: &str) -> InteractionsInventory {
    InteractionsInventory {
        click_count: lower_body.matches("onclick").count() + lower_body.matches("addeventlistener('click'").count(),
        draggable: lower_body.contains("draggable") || lower_body.contains("dragstart"),
        keyboard: lower_body.contains("keydown") || lower_body.contains("keyup") || lower_body.contains("keypress"),
        touch: lower_body.contains("touchstart") || lower_body.contains("touchmove") || lower_body.contains("ontouchend"),
        gamepad: lower_body.contains("getgamepads") || lower_body.contains("gamepadconnected"),
    }
}

fn inventory_state(body: &str, lower_body: &str) -> StateInventory {
    StateInventory {
        global_state_markers: lower_body.matches("window.").count() + lower_body.matches("globalthis.").count(),
        uses_storage: lower_body.contains("localstorage") || lower_body.contains("sessionstorage"),
        candidate_state_vars: extract_candidate_state_vars(body),
    }
}

/// Scans `let`/`const`/`var` declarations for identifiers that look
/// like state (`state`, `score`, `board`, `turn`, `players`).
fn extract_candidate_state_vars(body: &str) -> Vec<String> {
    let keywords = ["let ", "const ", "var "];
    let state_hints = ["state", "score", "board", "turn", "player", "lives", "level"];
    let mut found = Vec::new();
    let lower = body.to_lowercase();
    for kw in keywords {
        let mut from = 0;
        while let Some(rel) = lower[from..].find(kw) {
            let start = from + rel + kw.len();
            let end = lower[start..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .map(|e| start + e)
                .unwrap_or(lower.len());
            let ident = &body[start..end];
            let ident_lower = ident.to_lowercase();
            if state_hints.iter().any(|h| ident_lower.contains(h)) && !ident.is_empty() {
                let owned = ident.to_string();
                if !found.contains(&owned) {
                    found.push(owned);
                }
            }
            from = end.max(start + 1);
        }
    }
    found
}

fn inventory_network(lower_body: &str) -> NetworkInventory {
    NetworkInventory {
        sockets: lower_body.contains("websocket") || lower_body.contains("new ws("),
        http: lower_body.contains("fetch(") || lower_body.contains("xmlhttprequest"),
        peer: lower_body.contains("rtcpeerconnection") || lower_body.contains("webrtc"),
    }
}

fn classify_complexity(
    mechanics: &MechanicsFlags,
    elements: &ElementsInventory,
    interactions: &InteractionsInventory,
    network: &NetworkInventory,
) -> (ComplexityBucket, f64) {
    let mut score = 0.0;
    let flags = [
        mechanics.turns,
        mechanics.board,
        mechanics.score,
        mechanics.timer,
        mechanics.levels,
        mechanics.lives,
        mechanics.realtime,
        mechanics.win_condition,
        mechanics.physics,
        mechanics.rounds,
    ];
    score += flags.iter().filter(|f| **f).count() as f64;
    score += elements.buttons.len() as f64 * 0.2;
    if elements.has_canvas {
        score += 1.0;
    }
    score += interactions.click_count as f64 * 0.1;
    if interactions.draggable {
        score += 0.5;
    }
    if network.sockets || network.peer {
        score += 1.5;
    }

    let bucket = if score < 2.0 {
        ComplexityBucket::Simple
    } else if score < 5.0 {
        ComplexityBucket::Moderate
    } else {
        ComplexityBucket::Complex
    };
    (bucket, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_falls_back_to_custom_game() {
        let report = analyze("<html><body></body></html>");
        assert_eq!(report.kind, "custom-game");
        assert_eq!(report.complexity, ComplexityBucket::Simple);
    }

    #[test]
    fn board_game_with_explicit_dims_and_turns() {
        let src = r#"
            <div class="board" data-dims="3x3">
              <div class="cell"></div><div class="cell"></div><div class="cell"></div>
            </div>
            <script>
              let board = [[null,null,null],[null,null,null],[null,null,null]];
              let turn = 0;
            </script>
        "#;
        let report = analyze(src);
        assert!(report.kind.starts_with("board"));
        assert!(report.kind.contains("3x3"));
        assert!(report.mechanics.board);
        assert!(report.mechanics.turns);
        assert_eq!(report.elements.board_dims, Some((3, 3)));
    }

    #[test]
    fn shooter_signals_outrank_generic_board_signals() {
        let src = "let enemy = spawnEnemy(); shootBullet(); fireWeapon(); ammo -= 1;";
        let report = analyze(src);
        assert!(report.kind.starts_with("shooter"));
    }

    #[test]
    fn realtime_loop_sets_realtime_mechanics_flag() {
        let src = "function gameLoop() { requestAnimationFrame(gameLoop); }";
        let report = analyze(src);
        assert!(report.mechanics.realtime);
    }

    #[test]
    fn websocket_usage_is_flagged_in_network_inventory() {
        let src = "const socket = new WebSocket('wss://example.test');";
        let report = analyze(src);
        assert!(report.network.sockets);
    }

    #[test]
    fn cell_count_is_counted_independent_of_dims_token() {
        let src = r#"<div class="cell"></div><div class="cell"></div><div class="cell"></div><div class="cell"></div>"#;
        let report = analyze(src);
        assert_eq!(report.elements.cell_count, Some(4));
    }

    #[test]
    fn button_labels_are_extracted() {
        let src = r#"<button id="start">Start Game</button><button>Reset</button>"#;
        let report = analyze(src);
        assert_eq!(report.elements.buttons, vec!["Start Game", "Reset"]);
    }

    #[test]
    fn complexity_grows_with_richer_signal_count() {
        let simple = analyze("<html></html>");
        let complex = analyze(
            r#"
            <canvas></canvas>
            <script>
              let score = 0; let lives = 3; let level = 1; let turn = 0;
              const socket = new WebSocket('wss://x');
              function gameLoop() { requestAnimationFrame(gameLoop); }
              function onWin() { /* winner declared, game over */ }
            </script>
            "#,
        );
        assert!(complex.complexity_score > simple.complexity_score);
    }
}
