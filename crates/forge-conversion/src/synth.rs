//! Step 7: validator synthesis. Selects and parameterizes one of the
//! built-in [`GenericValidator`] templates keyed by the analysis
//! report's mechanics flags, rather than asking the collaborator to
//! author executable validator code — the collaborator in this
//! pipeline only ever produces the converted *document* (see
//! `forge-llm`'s crate docs and the design note this mirrors in
//! `forge-validator::generic`).

use std::sync::Arc;

use forge_analyzer::AnalysisReport;
use forge_validator::{GenericValidator, GenericValidatorConfig, Validator};

/// Default lives per player for a `lives`-flagged analysis that carries
/// no more specific signal to size it from.
const DEFAULT_STARTING_LIVES: i64 = 3;

/// Default table size for a `realtime`-flagged analysis with no
/// `cell_count`/board signal to size it from.
const DEFAULT_REALTIME_MAX_PLAYERS: usize = 8;

/// Picks a template based on mechanics flags, preferring the most
/// specific match: an explicit board size beats a bare turn-based flag,
/// which beats a lives mechanic, which beats a realtime flag, which
/// beats a bare scored free-for-all.
pub fn synthesize_validator(report: &AnalysisReport) -> Arc<dyn Validator> {
    let config = if let Some((rows, cols)) = report.elements.board_dims {
        GenericValidatorConfig::board_turn_based(rows, cols)
    } else if report.mechanics.turns && report.mechanics.score {
        GenericValidatorConfig::counter_turn_based(report.elements.cell_count.unwrap_or(10) as i64)
    } else if report.mechanics.turns && report.mechanics.lives {
        GenericValidatorConfig::last_player_standing(
            DEFAULT_STARTING_LIVES,
            report.elements.cell_count.unwrap_or(4),
        )
    } else if report.mechanics.realtime {
        GenericValidatorConfig::realtime_reconciling(DEFAULT_REALTIME_MAX_PLAYERS)
    } else if report.mechanics.score {
        GenericValidatorConfig::score_based(report.elements.cell_count.unwrap_or(8))
    } else {
        GenericValidatorConfig {
            turn_based: report.mechanics.turns,
            ..Default::default()
        }
    };

    Arc::new(GenericValidator::new(config))
}
