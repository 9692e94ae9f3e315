//! Per-strategy-instance indicator registry.
//!
//! A strategy declares its indicators once in `prepare`; each declaration is
//! computed immediately over the whole bar series and stored in an arena in
//! declaration order. The returned [`IndicatorHandle`] is the only way to read
//! the series back. The registry lives for one instrument's run.

use std::collections::HashMap;

use crate::domain::error::BackfolioError;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries};
use crate::domain::ohlcv::OhlcvBar;

/// Typed index into an [`IndicatorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorHandle(usize);

impl IndicatorHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct IndicatorRegistry<'a> {
    bars: &'a [OhlcvBar],
    series: Vec<IndicatorSeries>,
    builtin: HashMap<IndicatorKind, IndicatorHandle>,
}

impl<'a> IndicatorRegistry<'a> {
    pub fn new(bars: &'a [OhlcvBar]) -> Self {
        Self {
            bars,
            series: Vec::new(),
            builtin: HashMap::new(),
        }
    }

    pub fn bars(&self) -> &'a [OhlcvBar] {
        self.bars
    }

    /// Declare a built-in indicator. Declaring the same kind twice returns
    /// the existing handle without recomputing.
    pub fn register(&mut self, kind: IndicatorKind) -> IndicatorHandle {
        if let Some(&handle) = self.builtin.get(&kind) {
            return handle;
        }
        let handle = self.push(kind.compute(self.bars));
        self.builtin.insert(kind, handle);
        handle
    }

    /// Declare a custom indicator function. Its output must be aligned 1:1
    /// with the bar series.
    pub fn register_with<F>(&mut self, compute: F) -> Result<IndicatorHandle, BackfolioError>
    where
        F: FnOnce(&[OhlcvBar]) -> IndicatorSeries,
    {
        let series = compute(self.bars);
        if series.len() != self.bars.len() {
            return Err(BackfolioError::Indicator {
                label: series.label().to_string(),
                reason: format!(
                    "produced {} values for {} bars",
                    series.len(),
                    self.bars.len()
                ),
            });
        }
        Ok(self.push(series))
    }

    fn push(&mut self, series: IndicatorSeries) -> IndicatorHandle {
        let handle = IndicatorHandle(self.series.len());
        self.series.push(series);
        handle
    }

    /// Value of `handle` at bar `index`; `None` when undefined.
    pub fn value(&self, handle: IndicatorHandle, index: usize) -> Option<f64> {
        self.series.get(handle.0).and_then(|s| s.get(index))
    }

    pub fn series(&self, handle: IndicatorHandle) -> Option<&IndicatorSeries> {
        self.series.get(handle.0)
    }

    pub(crate) fn series_mut(&mut self, handle: IndicatorHandle) -> Option<&mut IndicatorSeries> {
        self.series.get_mut(handle.0)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// First bar index at which every declared indicator is defined.
    ///
    /// `Some(0)` when nothing is declared; `None` when some indicator never
    /// becomes defined over the available bars.
    pub fn warmup_index(&self) -> Option<usize> {
        self.series
            .iter()
            .try_fold(0usize, |acc, s| s.first_defined().map(|i| acc.max(i)))
    }
}
