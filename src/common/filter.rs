//! Named row filters with per-stage drop accounting.
//!
//! Each filter stage is a predicate with a name.  Applying a [`FilterChain`]
//! yields the surviving rows together with a [`FilterReport`] that records how
//! many rows each stage removed.

use thousands::Separable;

/// Number of dropped-row descriptions kept per stage for diagnostics.
const MAX_EXAMPLES: usize = 5;

/// Outcome of evaluating a stage predicate on a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the row.
    Keep,
    /// Drop the row, with a short description of why.
    Drop(String),
}

impl From<bool> for Verdict {
    fn from(keep: bool) -> Self {
        if keep {
            Verdict::Keep
        } else {
            Verdict::Drop(String::new())
        }
    }
}

/// Predicate type of a filter stage.
type Predicate<'a, T> = Box<dyn Fn(&T) -> Result<Verdict, anyhow::Error> + 'a>;

/// A named filter stage.
pub struct FilterStage<'a, T> {
    /// Name used in the report.
    pub name: &'static str,
    predicate: Predicate<'a, T>,
}

impl<'a, T> std::fmt::Debug for FilterStage<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStage").field("name", &self.name).finish()
    }
}

impl<'a, T> FilterStage<'a, T> {
    /// Stage from a fallible predicate returning a [`Verdict`].
    pub fn new<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&T) -> Result<Verdict, anyhow::Error> + 'a,
    {
        Self {
            name,
            predicate: Box::new(predicate),
        }
    }

    /// Stage from a plain predicate where `true` means keep.
    pub fn keep_if<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'a,
    {
        Self::new(name, move |row| Ok(predicate(row).into()))
    }

    /// Apply the stage to `rows`.
    pub fn apply(&self, rows: Vec<T>) -> Result<(Vec<T>, StageReport), anyhow::Error> {
        let mut report = StageReport {
            name: self.name,
            ..Default::default()
        };
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            report.seen += 1;
            match (self.predicate)(&row)
                .map_err(|e| anyhow::anyhow!("filter {} failed: {}", self.name, e))?
            {
                Verdict::Keep => kept.push(row),
                Verdict::Drop(reason) => {
                    report.dropped += 1;
                    if !reason.is_empty() && report.examples.len() < MAX_EXAMPLES {
                        report.examples.push(reason);
                    }
                }
            }
        }
        Ok((kept, report))
    }
}

/// Dropped-row diagnostics of one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Name of the stage.
    pub name: &'static str,
    /// Number of rows the stage saw.
    pub seen: usize,
    /// Number of rows the stage dropped.
    pub dropped: usize,
    /// Descriptions of the first dropped rows.
    pub examples: Vec<String>,
}

/// Dropped-row diagnostics of a sequence of stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub stages: Vec<StageReport>,
}

impl FilterReport {
    /// Number of rows dropped by the stage named `name`, 0 if not present.
    pub fn dropped(&self, name: &str) -> usize {
        self.stages
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.dropped)
            .sum()
    }

    /// Total number of dropped rows.
    pub fn total_dropped(&self) -> usize {
        self.stages.iter().map(|s| s.dropped).sum()
    }

    /// Add the stages of `other`.
    pub fn extend(&mut self, other: FilterReport) {
        self.stages.extend(other.stages);
    }

    /// Log the report via `tracing`.
    pub fn log(&self, context: &str) {
        for stage in &self.stages {
            tracing::info!(
                "{}: filter {} dropped {} of {} rows",
                context,
                stage.name,
                stage.dropped.separate_with_commas(),
                stage.seen.separate_with_commas()
            );
            for example in &stage.examples {
                tracing::debug!("{}: filter {} dropped {}", context, stage.name, example);
            }
        }
    }
}

/// Ordered sequence of filter stages.
#[derive(Debug, Default)]
pub struct FilterChain<'a, T> {
    stages: Vec<FilterStage<'a, T>>,
}

impl<'a, T> FilterChain<'a, T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append `stage` to the chain.
    pub fn stage(mut self, stage: FilterStage<'a, T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Apply all stages in order.
    pub fn apply(&self, rows: Vec<T>) -> Result<(Vec<T>, FilterReport), anyhow::Error> {
        let mut report = FilterReport::default();
        let mut rows = rows;
        for stage in &self.stages {
            let (kept, stage_report) = stage.apply(rows)?;
            report.stages.push(stage_report);
            rows = kept;
        }
        Ok((rows, report))
    }
}
