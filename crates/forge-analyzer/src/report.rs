//! The structural report an analysis pass produces, and the types that
//! compose it (spec.md §4.2 "Outputs").

use serde::{Deserialize, Serialize};

/// Mechanics flag set: the documented characteristics a document can
/// exhibit, independent of which specific game `kind` it was classified
/// as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanicsFlags {
    pub turns: bool,
    pub board: bool,
    pub score: bool,
    pub timer: bool,
    pub levels: bool,
    pub lives: bool,
    pub realtime: bool,
    pub win_condition: bool,
    pub physics: bool,
    pub rounds: bool,
}

/// Button labels/ids, form presence, canvas presence, inferred board
/// dimensions, and counted cell elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementsInventory {
    pub buttons: Vec<String>,
    pub has_form: bool,
    pub has_canvas: bool,
    pub board_dims: Option<(usize, usize)>,
    pub cell_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionsInventory {
    pub click_count: usize,
    pub draggable: bool,
    pub keyboard: bool,
    pub touch: bool,
    pub gamepad: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateInventory {
    pub global_state_markers: usize,
    pub uses_storage: bool,
    pub candidate_state_vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInventory {
    pub sockets: bool,
    pub http: bool,
    pub peer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityBucket {
    Simple,
    Moderate,
    Complex,
}

/// The analyzer's best-effort classification of a source document.
/// Never a hard failure — a document that trips no signal gets `kind =
/// "custom-game"` and default/empty inventories (spec.md §4.2
/// "Errors").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub kind: String,
    pub mechanics: MechanicsFlags,
    pub elements: ElementsInventory,
    pub interactions: InteractionsInventory,
    pub state: StateInventory,
    pub network: NetworkInventory,
    pub complexity: ComplexityBucket,
    pub complexity_score: f64,
}

impl AnalysisReport {
    pub fn fallback() -> Self {
        Self {
            kind: "custom-game".to_string(),
            mechanics: MechanicsFlags::default(),
            elements: ElementsInventory::default(),
            interactions: InteractionsInventory::default(),
            state: StateInventory::default(),
            network: NetworkInventory::default(),
            complexity: ComplexityBucket::Simple,
            complexity_score: 0.0,
        }
    }
}
