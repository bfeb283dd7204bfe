//! Pattern-scan signal catalogs and scoring. Deliberately string-match
//! based rather than a full parser — spec.md calls this out at
//! "pattern scan" rigor, and the corpus doesn't otherwise reach for an
//! HTML/JS parser for this kind of lightweight classification.

/// One weighted token: the more specific/unambiguous a token is to a
/// characteristic, the higher its weight.
#[derive(Debug, Clone, Copy)]
pub struct Signal {
    pub token: &'static str,
    pub weight: f64,
}

const fn s(token: &'static str, weight: f64) -> Signal {
    Signal { token, weight }
}

/// Tie-break order when two characteristics score equally: earlier
/// entries win. Mirrors spec.md §4.2's documented priority list
/// verbatim.
pub const CHARACTERISTIC_PRIORITY: &[&str] = &[
    "shooter",
    "platformer",
    "racing",
    "rpg",
    "card",
    "dice",
    "word",
    "quiz",
    "puzzle",
    "strategy",
    "board",
    "turn-based",
    "realtime",
    "canvas",
];

/// The signal set for one characteristic tag.
pub fn signals_for(characteristic: &str) -> &'static [Signal] {
    match characteristic {
        "shooter" => &[
            s("shoot", 2.0),
            s("bullet", 2.0),
            s("weapon", 2.0),
            s("enemy", 1.0),
            s("ammo", 2.0),
            s("laser", 1.5),
        ],
        "platformer" => &[
            s("platform", 1.5),
            s("jump", 1.5),
            s("gravity", 1.0),
            s("obstacle", 1.0),
            s("double jump", 2.0),
        ],
        "racing" => &[
            s("race", 1.5),
            s("lap", 2.0),
            s("checkpoint", 2.0),
            s("speed", 0.5),
            s("track", 1.0),
        ],
        "rpg" => &[
            s("inventory", 2.0),
            s("quest", 2.0),
            s("experience", 1.5),
            s("level up", 2.0),
            s("mana", 1.5),
            s("hitpoint", 1.5),
        ],
        "card" => &[
            s("card", 1.5),
            s("deck", 2.0),
            s("shuffle", 1.5),
            s("hand", 0.5),
            s("suit", 1.0),
        ],
        "dice" => &[s("dice", 2.0), s("roll", 1.0), s("d6", 2.0), s("d20", 2.0)],
        "word" => &[
            s("anagram", 2.0),
            s("spelling", 1.5),
            s("guess the word", 2.0),
            s("letter", 0.5),
            s("wordlist", 1.5),
        ],
        "quiz" => &[
            s("quiz", 2.0),
            s("question", 1.0),
            s("correct answer", 1.5),
            s("multiple choice", 2.0),
        ],
        "puzzle" => &[
            s("puzzle", 2.0),
            s("match-3", 2.0),
            s("swap", 1.0),
            s("solve", 1.0),
        ],
        "strategy" => &[
            s("strategy", 1.5),
            s("resource", 1.0),
            s("territory", 1.5),
            s("build order", 2.0),
            s("unit", 0.5),
        ],
        "board" => &[
            s("board", 1.5),
            s("grid", 1.0),
            s("cell", 0.5),
            s("tile", 0.5),
            s("<table", 0.5),
        ],
        "turn-based" => &[
            s("turn", 1.0),
            s("currentplayer", 1.5),
            s("whoseturn", 2.0),
            s("playerturn", 1.5),
            s("nextturn", 1.5),
        ],
        "realtime" => &[
            s("requestanimationframe", 2.0),
            s("gameloop", 1.5),
            s("setinterval", 1.0),
            s("tick", 0.5),
        ],
        "canvas" => &[s("<canvas", 2.0), s("getcontext", 1.5), s("ctx.", 1.0)],
        _ => &[],
    }
}

/// Mechanics-flag signal sets, independent of the `kind` characteristic
/// above.
pub fn mechanics_signals(flag: &str) -> &'static [Signal] {
    match flag {
        "turns" => &[s("turn", 1.0), s("currentplayer", 1.5), s("whoseturn", 2.0)],
        "board" => &[s("board", 1.5), s("grid", 1.0), s("cell", 0.5)],
        "score" => &[s("score", 1.5), s("points", 0.5)],
        "timer" => &[s("timer", 1.5), s("countdown", 1.5), s("settimeout", 0.5)],
        "levels" => &[s("level", 1.0), s("stage", 1.0)],
        "lives" => &[s("lives", 1.5), s("health", 1.0), s("hp", 1.0)],
        "realtime" => &[s("requestanimationframe", 2.0), s("gameloop", 1.5)],
        "win_condition" => &[s("winner", 1.5), s("game over", 1.5), s("win condition", 2.0)],
        "physics" => &[s("gravity", 1.5), s("velocity", 1.5), s("physics", 2.0)],
        "rounds" => &[s("round", 1.0)],
        _ => &[],
    }
}

/// Decides whether `characteristic` passes threshold against `body`
/// (comment-stripped text) and `raw` (full source, comments included).
///
/// Corroboration rule: a signal that only shows up inside a comment
/// (present in `raw`, absent from `body`) doesn't count toward the
/// score unless at least one other signal for the same characteristic
/// matched in `body`.
pub fn score_characteristic(characteristic: &str, body: &str, raw: &str) -> f64 {
    let signals = signals_for(characteristic);
    let mut body_hits = Vec::new();
    let mut comment_only_hits = Vec::new();

    for signal in signals {
        let in_body = body.contains(signal.token);
        let in_raw = raw.contains(signal.token);
        if in_body {
            body_hits.push(signal);
        } else if in_raw {
            comment_only_hits.push(signal);
        }
    }

    let mut score: f64 = body_hits.iter().map(|s| s.weight).sum();
    if !body_hits.is_empty() {
        score += comment_only_hits.iter().map(|s| s.weight).sum::<f64>();
    }
    score
}

pub fn score_mechanics_flag(flag: &str, body: &str, raw: &str) -> bool {
    let signals = mechanics_signals(flag);
    let mut body_hits = 0usize;
    let mut comment_only_hits = 0usize;
    for signal in signals {
        if body.contains(signal.token) {
            body_hits += 1;
        } else if raw.contains(signal.token) {
            comment_only_hits += 1;
        }
    }
    body_hits > 0 || (body_hits == 0 && comment_only_hits >= 2)
}

/// Strips `<!-- -->`, `//` line comments, and `/* */` block comments, so
/// scoring can ignore dead/commented-out code while the corroboration
/// rule still has access to the original via `raw`.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if source[i..].starts_with("<!--") {
            if let Some(end) = source[i..].find("-->") {
                i += end + 3;
                continue;
            } else {
                break;
            }
        }
        if source[i..].starts_with("/*") {
            if let Some(end) = source[i..].find("*/") {
                i += end + 2;
                continue;
            } else {
                break;
            }
        }
        if source[i..].starts_with("//") {
            if let Some(end) = source[i..].find('\n') {
                i += end + 1;
                continue;
            } else {
                break;
            }
        }
        let ch = source[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comments_removes_html_and_js_comments() {
        let src = "<!-- hidden board --><script>// turn tracker\nlet turn = 1; /* dice roll */</script>";
        let stripped = strip_comments(src);
        assert!(!stripped.contains("hidden board"));
        assert!(!stripped.contains("turn tracker"));
        assert!(!stripped.contains("dice roll"));
        assert!(stripped.contains("let turn = 1;"));
    }

    #[test]
    fn comment_only_signal_does_not_score_alone() {
        let raw = "<!-- shoot the bullet --><div>nothing else here</div>";
        let body = strip_comments(raw);
        let score = score_characteristic("shooter", &body, raw);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn comment_only_signal_scores_with_corroboration() {
        let raw = "<!-- bullet --><div>enemy spawner active</div>";
        let body = strip_comments(raw);
        let score = score_characteristic("shooter", &body, raw);
        assert!(score > 0.0);
    }
}
