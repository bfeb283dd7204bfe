//! Step 4 of the conversion pipeline: build the prompt text for the
//! collaborator from an [`AnalysisReport`]. Pure function — no I/O, no
//! collaborator dependency — so it's testable on its own.

use forge_analyzer::AnalysisReport;

/// The contract clause every prompt carries regardless of analysis
/// result: the converted document must keep communicating only through
/// the Event Bridge, never open its own sockets or call the server
/// directly.
const BRIDGE_ONLY_CONTRACT: &str = "The converted document MUST communicate only through the \
injected Event Bridge's postMessage envelopes. It must never open its own WebSocket or HTTP \
connection, and must never assume it can reach the server directly.";

/// Builds the adaptive prompt for a source document, specifying which
/// multiplayer affordances the converted output must contain based on
/// the document's analysis report.
pub fn build_prompt(source_document: &str, report: &AnalysisReport) -> String {
    let mut affordances = Vec::new();

    if report.mechanics.turns {
        affordances.push(
            "Turn arbitration: only the player whose turn it is may act; reject out-of-turn \
attempts with a visible message and advance turn order after an accepted action.",
        );
    }
    if report.mechanics.board {
        affordances.push(
            "Board synchronization: the full board state must be kept in sync across all \
players after every accepted action, not just the cell that changed.",
        );
    }
    if report.mechanics.score {
        affordances.push(
            "Per-player scoring: maintain an authoritative score per player, displayed to \
every participant, updated only in response to server-confirmed actions.",
        );
    }
    if report.mechanics.realtime {
        affordances.push(
            "Real-time reconciliation: local prediction is allowed, but the client must \
reconcile to the server's authoritative state on every update it receives.",
        );
    }
    affordances.push(
        "Lobby controls: a waiting room UI before the game starts, showing connected players \
and a start control gated on the minimum player count.",
    );

    let kind = &report.kind;
    let board_clause = match report.elements.board_dims {
        Some((rows, cols)) => format!("The inferred board is {rows}x{cols}."),
        None => String::new(),
    };

    format!(
        "Convert the following single-player browser game into a multiplayer-ready document.\n\
Inferred game kind: {kind}.\n\
{board_clause}\n\
Required multiplayer affordances:\n- {}\n\n\
{BRIDGE_ONLY_CONTRACT}\n\n\
Respond with the complete, modified HTML document and nothing else.\n\n\
--- SOURCE DOCUMENT ---\n{source_document}",
        affordances.join("\n- ")
    )
}
