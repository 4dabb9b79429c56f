//! Per-session state owner.
//!
//! An [`AnalysisSession`] holds the loaded dataset together with everything the user has
//! layered on top of it: filters, sort order, chart bindings, the last plotted series and
//! the current brush selection. Sessions share nothing, so each concurrent user gets
//! their own instance.

use serde_json::Value;
use tracing::{debug, info};

use crate::analysis::{order_columns, ColumnChoice, ColumnRanker, RankingAlgorithm};
use crate::chart::{bind, ChartConfig, PlotSeries};
use crate::config::EngineConfig;
use crate::data::Dataset;
use crate::error::Result;
use crate::export::export_delimited;
use crate::filter::{apply, FilterPredicate, FilterSet};
use crate::graph::{render_series, RenderedChart};
use crate::ingest::DatasetSource;
use crate::scale::{build_scales, AxisScales, PlotFrame};
use crate::selection::{
    materialize_filter, select_region, DragTracker, PointerEvent, SelectionMode, SelectionRange,
};
use crate::table::{project, ColumnVisibility, TablePage};
use crate::view::{sort, RowView, SortDirection, SortSpec};

#[derive(Debug, Clone)]
struct Plotted {
    series: PlotSeries,
    scales: Option<AxisScales>,
}

#[derive(Debug, Clone)]
pub struct AnalysisSession {
    id: String,
    config: EngineConfig,
    file_name: Option<String>,
    dataset: Dataset,
    filters: FilterSet,
    sort: Option<SortSpec>,
    chart: ChartConfig,
    plotted: Option<Plotted>,
    selection: Option<SelectionRange>,
    drag: DragTracker,
    visibility: ColumnVisibility,
}

impl AnalysisSession {
    pub fn new(id: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            id: id.into(),
            config,
            file_name: None,
            dataset: Dataset::default(),
            filters: FilterSet::new(),
            sort: None,
            chart: ChartConfig::default(),
            plotted: None,
            selection: None,
            drag: DragTracker::new(),
            visibility: ColumnVisibility::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort_spec(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn chart_config(&self) -> &ChartConfig {
        &self.chart
    }

    pub fn plotted(&self) -> Option<&PlotSeries> {
        self.plotted.as_ref().map(|p| &p.series)
    }

    pub fn scales(&self) -> Option<&AxisScales> {
        self.plotted.as_ref().and_then(|p| p.scales.as_ref())
    }

    pub fn selection(&self) -> Option<&SelectionRange> {
        self.selection.as_ref()
    }

    pub fn drag(&self) -> &DragTracker {
        &self.drag
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    pub fn visibility_mut(&mut self) -> &mut ColumnVisibility {
        &mut self.visibility
    }

    // ---- loading ----

    /// Parse delimited text and make it the session's dataset. On error the session is
    /// left exactly as it was.
    pub fn load_text(&mut self, file_name: &str, text: &str) -> Result<()> {
        let dataset = Dataset::from_delimited(text, self.config.delimiter_byte(), self.config.ragged_rows)?;
        self.replace_dataset(file_name, dataset);
        Ok(())
    }

    /// Fetch through an ingestion source, then load.
    pub fn load_from(&mut self, source: &dyn DatasetSource, file_name: &str) -> Result<()> {
        let text = source.fetch(file_name, &self.id)?;
        self.load_text(file_name, &text)
    }

    pub fn load_json(&mut self, file_name: &str, value: &Value) -> Result<()> {
        let dataset = Dataset::from_json(value)?;
        self.replace_dataset(file_name, dataset);
        Ok(())
    }

    fn replace_dataset(&mut self, file_name: &str, dataset: Dataset) {
        info!(
            "Session {} loaded {}: {} rows x {} columns",
            self.id,
            file_name,
            dataset.len(),
            dataset.column_count()
        );
        self.dataset = dataset;
        self.file_name = Some(file_name.to_string());
        self.filters.clear();
        self.sort = None;
        self.chart = ChartConfig::default();
        self.visibility.show_all();
        self.invalidate_plot();
    }

    /// Drop the plotted series and anything derived from its geometry.
    fn invalidate_plot(&mut self) {
        self.plotted = None;
        self.selection = None;
        self.drag.reset();
    }

    // ---- filters ----

    pub fn add_filter(&mut self, predicate: FilterPredicate) {
        debug!("Adding filter: {}", predicate.describe(self.dataset.headers()));
        self.filters.push(predicate);
        self.invalidate_plot();
    }

    pub fn remove_filter(&mut self, position: usize) -> Option<FilterPredicate> {
        let removed = self.filters.remove(position)?;
        self.invalidate_plot();
        Some(removed)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.invalidate_plot();
    }

    /// Human readable list of active filters, in insertion order.
    pub fn filter_descriptions(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|p| p.describe(self.dataset.headers()))
            .collect()
    }

    // ---- sort / view ----

    pub fn set_sort(&mut self, spec: Option<SortSpec>) {
        self.sort = spec;
    }

    /// Cycle a column through ascending, descending and unsorted.
    pub fn toggle_sort(&mut self, col: usize) -> Option<SortSpec> {
        self.sort = match self.sort {
            Some(SortSpec { col: current, direction: SortDirection::Asc }) if current == col => {
                Some(SortSpec::desc(col))
            }
            Some(SortSpec { col: current, direction: SortDirection::Desc }) if current == col => None,
            _ => Some(SortSpec::asc(col)),
        };
        self.sort
    }

    /// Filtered, then sorted rows.
    pub fn view(&self) -> RowView {
        let filtered = apply(&self.dataset, &self.filters);
        sort(&self.dataset, &filtered, self.sort)
    }

    pub fn page(&self, page_number: usize) -> TablePage {
        project(&self.dataset, &self.view(), page_number, &self.visibility)
    }

    pub fn export(&self) -> Result<String> {
        export_delimited(&self.dataset, &self.view(), self.config.delimiter_byte())
    }

    // ---- chart ----

    /// Bind the current view to a chart. When the bindings are incomplete the previous
    /// series is torn down and `None` is returned.
    pub fn set_chart(&mut self, config: ChartConfig) -> Option<&PlotSeries> {
        self.chart = config;
        self.rebind()
    }

    /// Re-bind the current chart configuration against the current view.
    pub fn rebind(&mut self) -> Option<&PlotSeries> {
        self.invalidate_plot();
        let series = bind(&self.dataset, &self.view(), &self.chart, self.config.point_budget)?;
        self.plotted = Some(Plotted { series, scales: None });
        self.plotted()
    }

    /// Record where the chart's plotting area was drawn, enabling brush selection.
    pub fn attach_frame(&mut self, frame: PlotFrame) -> Option<AxisScales> {
        let plotted = self.plotted.as_mut()?;
        let scales = build_scales(&plotted.series, &frame);
        plotted.scales = Some(scales);
        Some(scales)
    }

    /// Rasterize the plotted series and attach the resulting frame.
    pub fn render_chart(&mut self) -> Result<Option<RenderedChart>> {
        let Some(plotted) = &self.plotted else {
            return Ok(None);
        };
        let rendered = render_series(&plotted.series, &self.config.render)?;
        self.attach_frame(rendered.frame);
        Ok(Some(rendered))
    }

    // ---- selection ----

    /// Feed a pointer event to the brush. Returns the data-space range when a drag
    /// commits to a selection large enough to count.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<SelectionRange> {
        let region = self.drag.handle(event)?;
        let plotted = self.plotted.as_ref()?;
        let scales = plotted.scales.as_ref()?;
        let range = select_region(&region.rect, scales, &plotted.series, self.config.drag_threshold_px);
        self.selection = range;
        range
    }

    /// Turn the current selection into a filter and append it. The selection is consumed
    /// either way; nothing is appended when it caught no points.
    pub fn apply_selection(&mut self, mode: SelectionMode) -> Option<FilterPredicate> {
        let range = self.selection.take()?;
        let plotted = self.plotted.as_ref()?;
        let predicate = materialize_filter(&range, &plotted.series, mode)?;
        self.add_filter(predicate.clone());
        Some(predicate)
    }

    // ---- analysis ----

    /// Column picker order after asking a ranker about `target`.
    pub fn rank_columns(
        &self,
        ranker: &dyn ColumnRanker,
        target: &str,
        algorithm: RankingAlgorithm,
    ) -> Result<Vec<ColumnChoice>> {
        let ranking = ranker.rank(target, algorithm)?;
        Ok(order_columns(self.dataset.headers(), target, &ranking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PearsonRanker;
    use crate::chart::ChartKind;
    use crate::error::EngineError;
    use crate::ingest::MemorySource;
    use crate::selection::ScreenPoint;

    const CSV: &str = "x,y,label\n1,10,a\n2,20,b\n3,30,c\n4,40,d\n";

    fn session() -> AnalysisSession {
        let mut s = AnalysisSession::new("s1", EngineConfig::default());
        s.load_text("points.csv", CSV).unwrap();
        s
    }

    fn frame() -> PlotFrame {
        PlotFrame { left: 0.0, right: 100.0, top: 0.0, bottom: 100.0 }
    }

    fn drag(s: &mut AnalysisSession, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<SelectionRange> {
        s.handle_pointer(PointerEvent::Down(ScreenPoint::new(x0, y0)));
        s.handle_pointer(PointerEvent::Move(ScreenPoint::new(x1, y1)));
        s.handle_pointer(PointerEvent::Up(ScreenPoint::new(x1, y1)))
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut s = session();
        s.add_filter(FilterPredicate::Range { col: 0, min: 2.0, max: 3.0 });
        s.set_sort(Some(SortSpec::desc(0)));

        assert!(matches!(s.load_text("bad.csv", ""), Err(EngineError::Parse { .. })));
        assert_eq!(s.file_name(), Some("points.csv"));
        assert_eq!(s.filters().len(), 1);
        assert_eq!(s.view().indices(), &[2, 1]);
    }

    #[test]
    fn test_file_switch_resets_state() {
        let mut s = session();
        s.add_filter(FilterPredicate::NotEmpty { col: 2 });
        s.set_sort(Some(SortSpec::asc(1)));
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        s.visibility_mut().hide(2);

        s.load_text("other.csv", "q\n1\n").unwrap();
        assert!(s.filters().is_empty());
        assert_eq!(s.sort_spec(), None);
        assert_eq!(s.chart_config(), &ChartConfig::default());
        assert!(s.plotted().is_none());
        assert!(s.visibility().is_visible(2));
    }

    #[test]
    fn test_load_from_source_uses_session_id() {
        let mut source = MemorySource::new();
        source.insert("a.csv", CSV);
        let mut s = AnalysisSession::new("abc", EngineConfig::default());
        s.load_from(&source, "a.csv").unwrap();
        assert_eq!(s.dataset().len(), 4);
        assert!(matches!(s.load_from(&source, "missing.csv"), Err(EngineError::Network { .. })));
        assert_eq!(s.dataset().len(), 4);
    }

    #[test]
    fn test_toggle_sort_cycles() {
        let mut s = session();
        assert_eq!(s.toggle_sort(1), Some(SortSpec::asc(1)));
        assert_eq!(s.toggle_sort(1), Some(SortSpec::desc(1)));
        assert_eq!(s.toggle_sort(1), None);
        s.toggle_sort(1);
        assert_eq!(s.toggle_sort(0), Some(SortSpec::asc(0)));
    }

    #[test]
    fn test_filter_change_drops_plot_but_keeps_axes() {
        let mut s = session();
        let config = ChartConfig::new(ChartKind::Scatter, 0, 1);
        assert!(s.set_chart(config.clone()).is_some());
        s.attach_frame(frame());

        s.add_filter(FilterPredicate::Range { col: 0, min: 1.0, max: 2.0 });
        assert!(s.plotted().is_none());
        assert!(s.scales().is_none());
        assert_eq!(s.chart_config(), &config);
        assert_eq!(s.rebind().map(|p| p.point_count()), Some(2));
    }

    #[test]
    fn test_unbindable_chart_tears_down_previous() {
        let mut s = session();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        assert!(s.set_chart(ChartConfig::default()).is_none());
        assert!(s.plotted().is_none());
    }

    #[test]
    fn test_brush_to_filter_round_trip() {
        let mut s = session();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        let scales = s.attach_frame(frame()).unwrap();

        // rectangle around the points x=2 and x=3
        let x0 = scales.x.map(1.5);
        let x1 = scales.x.map(3.5);
        let y0 = scales.y.map(45.0);
        let y1 = scales.y.map(5.0);
        let range = drag(&mut s, x0, y0, x1, y1).unwrap();
        assert!(range.contains(2.0, 20.0));

        let predicate = s.apply_selection(SelectionMode::Keep).unwrap();
        assert_eq!(predicate.column(), 0);
        assert_eq!(s.view().indices(), &[1, 2]);
        assert!(s.selection().is_none());
        assert!(s.plotted().is_none());
    }

    #[test]
    fn test_brush_over_secondary_series_selects_its_rows() {
        let mut s = AnalysisSession::new("s2", EngineConfig::default());
        s.load_text("pairs.csv", "x,y,y2\n1,1,50\n2,2,60\n3,3,70\n").unwrap();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1).with_y2(2));
        let scales = s.attach_frame(frame()).unwrap();

        // only the y2 points fall inside y 45..75
        let range = drag(
            &mut s,
            scales.x.map(0.5),
            scales.y.map(75.0),
            scales.x.map(3.5),
            scales.y.map(45.0),
        )
        .unwrap();
        assert_eq!(range.y_col, 1);
        assert!(!range.contains(1.0, 1.0));

        let predicate = s.apply_selection(SelectionMode::Keep).unwrap();
        assert_eq!(predicate, FilterPredicate::Indices { col: 0, set: [0, 1, 2].into_iter().collect() });
        assert_eq!(s.view().indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_small_drag_is_not_a_selection() {
        let mut s = session();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        s.attach_frame(frame());
        assert!(drag(&mut s, 10.0, 10.0, 13.0, 12.0).is_none());
        assert!(s.apply_selection(SelectionMode::Keep).is_none());
        assert!(s.filters().is_empty());
    }

    #[test]
    fn test_selection_without_frame_is_ignored() {
        let mut s = session();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        assert!(drag(&mut s, 0.0, 0.0, 90.0, 90.0).is_none());
    }

    #[test]
    fn test_exclude_selection() {
        let mut s = session();
        s.set_chart(ChartConfig::new(ChartKind::Scatter, 0, 1));
        s.attach_frame(frame());
        drag(&mut s, 0.0, 0.0, 100.0, 100.0).unwrap();
        s.apply_selection(SelectionMode::Exclude).unwrap();
        assert!(s.view().is_empty());
        assert_eq!(s.page(1).label(), "page 1 of 1");
    }

    #[test]
    fn test_export_ignores_visibility() {
        let mut s = session();
        s.visibility_mut().hide(2);
        s.add_filter(FilterPredicate::Text { col: 2, needle: "B".into() });
        assert_eq!(s.page(1).headers, vec!["x", "y"]);
        assert_eq!(s.export().unwrap(), "x,y,label\n2,20,b\n");
    }

    #[test]
    fn test_remove_filter() {
        let mut s = session();
        s.add_filter(FilterPredicate::Range { col: 0, min: 9.0, max: 10.0 });
        assert!(s.view().is_empty());
        assert!(s.remove_filter(3).is_none());
        assert!(s.remove_filter(0).is_some());
        assert_eq!(s.view().len(), 4);
        assert_eq!(s.filter_descriptions().len(), 0);
    }

    #[test]
    fn test_rank_columns() {
        let s = session();
        let ranker = PearsonRanker::new(s.dataset(), s.view());
        let order = s.rank_columns(&ranker, "y", RankingAlgorithm::Correlation).unwrap();
        assert_eq!(order[0].name, "y");
        assert_eq!(order[1].name, "x");
        assert_eq!(order[2].name, "label");
    }
}
