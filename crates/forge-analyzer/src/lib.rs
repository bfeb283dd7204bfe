//! Static classification of a single-player browser game document into
//! a structural [`AnalysisReport`]: a best-effort, pattern-scan level
//! read of the document's mechanics, DOM elements, interactions, state
//! surface, and network usage, used to steer the Conversion Pipeline's
//! prompt construction and validator template selection.
//!
//! This is deliberately not a parser. It never fails — an
//! unrecognizable document still produces a report, classified as
//! `custom-game` with empty inventories.

pub mod analyze;
pub mod report;
pub mod signals;

pub use analyze::analyze;
pub use report::{
    AnalysisReport, ComplexityBucket, ElementsInventory, InteractionsInventory, MechanicsFlags,
    NetworkInventory, StateInventory,
};
pub use signals::CHARACTERISTIC_PRIORITY;
