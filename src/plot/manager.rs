//! Chart lifecycle: at most one live chart per slot.
//!
//! `render` always tears the previous instance down (releasing and wiping its
//! canvas) before the new one binds, so repeated renders never stack drawings on
//! the same canvas. Callers get a borrow of the live instance that ends before
//! the next render.

use tracing::debug;

use crate::config::ChartSize;
use crate::error::AppError;
use crate::plot::canvas::Canvas;
use crate::plot::spec::ChartSpec;

/// Named display slot; each one owns exactly one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartSlot {
    Forecast,
    Analytics,
    Compare,
    Multi,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 4] = [
        ChartSlot::Forecast,
        ChartSlot::Analytics,
        ChartSlot::Compare,
        ChartSlot::Multi,
    ];

    fn index(self) -> usize {
        match self {
            ChartSlot::Forecast => 0,
            ChartSlot::Analytics => 1,
            ChartSlot::Compare => 2,
            ChartSlot::Multi => 3,
        }
    }

    /// Stable canvas identifier (also used as the snapshot file stem).
    pub fn canvas_id(self) -> &'static str {
        match self {
            ChartSlot::Forecast => "forecast_chart",
            ChartSlot::Analytics => "analytics_chart",
            ChartSlot::Compare => "compare_chart",
            ChartSlot::Multi => "multi_chart",
        }
    }
}

/// A chart currently bound to a slot's canvas.
#[derive(Debug)]
pub struct ChartInstance {
    id: u64,
    slot: ChartSlot,
    spec: ChartSpec,
}

impl ChartInstance {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self) -> ChartSlot {
        self.slot
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    fn destroy(self, canvas: &mut Canvas) {
        debug!(slot = ?self.slot, id = self.id, "destroying chart");
        canvas.release();
    }
}

#[derive(Debug)]
struct SlotState {
    canvas: Canvas,
    live: Option<ChartInstance>,
}

/// Lifetime counters, mostly useful to assert nothing leaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartStats {
    pub created: u64,
    pub destroyed: u64,
}

impl ChartStats {
    pub fn live(&self) -> u64 {
        self.created - self.destroyed
    }
}

#[derive(Debug)]
pub struct ChartManager {
    slots: [SlotState; 4],
    next_id: u64,
    stats: ChartStats,
}

impl ChartManager {
    pub fn new(size: ChartSize) -> Self {
        Self {
            slots: ChartSlot::ALL.map(|slot| SlotState {
                canvas: Canvas::new(slot.canvas_id(), size),
                live: None,
            }),
            next_id: 1,
            stats: ChartStats::default(),
        }
    }

    /// Replace whatever `slot` shows with a chart built from `spec`.
    ///
    /// The previous instance is destroyed first. If drawing the new one fails the
    /// slot is left empty.
    pub fn render(&mut self, slot: ChartSlot, spec: ChartSpec) -> Result<&ChartInstance, AppError> {
        let id = self.next_id;
        self.next_id += 1;

        let state = &mut self.slots[slot.index()];
        if let Some(previous) = state.live.take() {
            previous.destroy(&mut state.canvas);
            self.stats.destroyed += 1;
        }

        state.canvas.bind(id)?;
        if let Err(err) = state.canvas.draw(&spec) {
            state.canvas.release();
            return Err(err);
        }

        self.stats.created += 1;
        debug!(?slot, id, series = spec.series.len(), points = spec.labels.len(), "chart created");
        let instance: &ChartInstance = state.live.insert(ChartInstance { id, slot, spec });
        Ok(instance)
    }

    pub fn live(&self, slot: ChartSlot) -> Option<&ChartInstance> {
        self.slots[slot.index()].live.as_ref()
    }

    pub fn has_live(&self, slot: ChartSlot) -> bool {
        self.live(slot).is_some()
    }

    pub fn canvas(&self, slot: ChartSlot) -> &Canvas {
        &self.slots[slot.index()].canvas
    }

    pub fn stats(&self) -> ChartStats {
        self.stats
    }

    /// Slots that currently show a chart.
    pub fn live_slots(&self) -> Vec<ChartSlot> {
        ChartSlot::ALL
            .into_iter()
            .filter(|slot| self.has_live(*slot))
            .collect()
    }
}
