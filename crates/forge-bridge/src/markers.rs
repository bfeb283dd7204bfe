//! Marker attribute names the Analyzer injects and the bridge's
//! (out-of-scope) DOM half observes. Kept as plain string constants
//! here rather than DOM bindings, since the bridge's auto-interception
//! half lives in the sandboxed document, not in this workspace (see
//! the crate-level docs).

/// Identifies an interactive element whose click/key/submit/touch
/// gestures should be emitted as `INTERACTION` events.
pub const ACTION_MARKER: &str = "action-marker";

/// Identifies an element whose text or selected attributes, when
/// changed, should be emitted as an `UPDATE` event.
pub const STATE_MARKER: &str = "state-marker";

/// Identifies a gesture surface for touch input.
pub const TOUCH_MARKER: &str = "touch-marker";

/// All three marker attribute names, in the order the Analyzer
/// documents them.
pub const ALL_MARKERS: [&str; 3] = [ACTION_MARKER, STATE_MARKER, TOUCH_MARKER];
