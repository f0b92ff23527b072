//! Stage layout
//!
//! Several instruments of the same kind stand in a row. The layout is
//! computed once per frame from every instrument's visibility, and each
//! instrument eases toward its slot.

use std::collections::HashMap;

use crate::instrument::InstrumentKind;

/// How quickly an instrument slides to its slot, per second
const INDEX_EASING: f64 = 5.0;

/// Per-frame slot assignment for every instrument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageLayout {
    targets: Vec<f64>,
    counts: Vec<usize>,
}

impl StageLayout {
    /// Build from `(kind, visible)` in instrument order
    ///
    /// A visible instrument's target is its position among the visible
    /// instruments of its kind. A hidden one heads for the end of the row.
    pub fn compute(entries: impl IntoIterator<Item = (InstrumentKind, bool)>) -> Self {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut visible_per_kind: HashMap<InstrumentKind, usize> = HashMap::new();
        for &(kind, visible) in &entries {
            if visible {
                *visible_per_kind.entry(kind).or_default() += 1;
            }
        }

        let mut seen: HashMap<InstrumentKind, usize> = HashMap::new();
        let mut layout = Self::default();
        for &(kind, visible) in &entries {
            let count = visible_per_kind.get(&kind).copied().unwrap_or(0);
            let target = if visible {
                let position = seen.entry(kind).or_default();
                *position += 1;
                *position - 1
            } else {
                count.saturating_sub(1)
            };
            layout.targets.push(target as f64);
            layout.counts.push(count);
        }
        layout
    }

    /// Target row index of the instrument in `slot`
    pub fn target(&self, slot: usize) -> f64 {
        self.targets.get(slot).copied().unwrap_or(0.0)
    }

    /// Visible instruments sharing the kind of the one in `slot`
    pub fn similar_count(&self, slot: usize) -> usize {
        self.counts.get(slot).copied().unwrap_or(0)
    }

    /// Ease `index` toward the slot's target for one frame
    pub fn ease_index(&self, slot: usize, index: f64, delta: f64) -> f64 {
        let step = (delta * INDEX_EASING).clamp(0.0, 1.0);
        let eased = index + step * (self.target(slot) - index);
        eased.clamp(0.0, self.similar_count(slot) as f64)
    }
}
