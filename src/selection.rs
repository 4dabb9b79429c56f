//! Brush selection on a rendered scatter chart.
//!
//! Pointer input is folded into a screen rectangle by [`DragTracker`], the rectangle is
//! inverted through the chart's own scales into a [`SelectionRange`], and the plotted
//! points inside it become an index filter. Only points that were actually plotted can
//! be selected, so a downsampled chart yields a downsampled selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::chart::{ChartKind, PlotSeries};
use crate::filter::FilterPredicate;
use crate::scale::AxisScales;

/// Minimum drag extent, in pixels, for a gesture to count as a selection.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle spanned by two screen corners, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub start: ScreenPoint,
    pub end: ScreenPoint,
}

impl ScreenRect {
    pub fn new(start: ScreenPoint, end: ScreenPoint) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> f64 {
        (self.end.x - self.start.x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.end.y - self.start.y).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(ScreenPoint),
    Move(ScreenPoint),
    Up(ScreenPoint),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { start: ScreenPoint, current: ScreenPoint },
    Committed { rect: ScreenRect },
}

/// Emitted once per completed drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSelected {
    pub rect: ScreenRect,
}

/// Accumulates pointer events into a screen rectangle: idle, dragging, committed.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    state: DragState,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// The rectangle being dragged, for drawing a rubber band.
    pub fn pending_rect(&self) -> Option<ScreenRect> {
        match self.state {
            DragState::Dragging { start, current } => Some(ScreenRect::new(start, current)),
            _ => None,
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> Option<RegionSelected> {
        let (next, emitted) = match (self.state, event) {
            (_, PointerEvent::Down(p)) => (DragState::Dragging { start: p, current: p }, None),
            (DragState::Dragging { start, .. }, PointerEvent::Move(p)) => {
                (DragState::Dragging { start, current: p }, None)
            }
            (DragState::Dragging { start, .. }, PointerEvent::Up(p)) => {
                let rect = ScreenRect::new(start, p);
                (DragState::Committed { rect }, Some(RegionSelected { rect }))
            }
            (_, PointerEvent::Cancel) => (DragState::Idle, None),
            // moves and releases without a press are ignored
            (state, _) => (state, None),
        };
        trace!("Drag {:?} + {:?} -> {:?}", self.state, event, next);
        self.state = next;
        emitted
    }

    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }
}

/// Data-space bounds of a brush selection. `y_col` names the primary y column; the
/// bounds apply to every plotted series since they share one y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub x_col: usize,
    pub y_col: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl SelectionRange {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    Keep,
    Exclude,
}

/// Invert a screen rectangle into data space. Only scatter charts accept selections,
/// and gestures no larger than `threshold_px` in both directions are treated as clicks.
pub fn select_region(
    rect: &ScreenRect,
    scales: &AxisScales,
    plot: &PlotSeries,
    threshold_px: f64,
) -> Option<SelectionRange> {
    if plot.kind != ChartKind::Scatter {
        trace!("Ignoring selection on {:?} chart", plot.kind);
        return None;
    }
    if rect.width() <= threshold_px && rect.height() <= threshold_px {
        trace!("Selection {}x{} below threshold", rect.width(), rect.height());
        return None;
    }
    let y_col = plot.series.first()?.column;

    let x0 = scales.x.invert(rect.start.x);
    let x1 = scales.x.invert(rect.end.x);
    let y0 = scales.y.invert(rect.start.y);
    let y1 = scales.y.invert(rect.end.y);

    let range = SelectionRange {
        x_col: plot.x_col,
        y_col,
        x_min: x0.min(x1),
        x_max: x0.max(x1),
        y_min: y0.min(y1),
        y_max: y0.max(y1),
    };
    debug!("Selected region {:?}", range);
    Some(range)
}

/// Turn the plotted points inside a selection into an index predicate on the x column.
/// Points of every series count, so a brush over secondary-y points selects their rows.
/// Returns `None` when the selection caught no points.
pub fn materialize_filter(
    range: &SelectionRange,
    plot: &PlotSeries,
    mode: SelectionMode,
) -> Option<FilterPredicate> {
    let set: BTreeSet<usize> = plot
        .series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter(|p| range.contains(p.x, p.y))
        .map(|p| p.original_index)
        .collect();

    if set.is_empty() {
        debug!("Selection matched no plotted points");
        return None;
    }
    debug!("Selection matched {} rows ({:?})", set.len(), mode);

    let col = range.x_col;
    Some(match mode {
        SelectionMode::Keep => FilterPredicate::Indices { col, set },
        SelectionMode::Exclude => FilterPredicate::ExcludeIndices { col, set },
    })
}
