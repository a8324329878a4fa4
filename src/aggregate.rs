use crate::classify::Classifier;
use crate::model::{
    AnalysisWindow, CommitRecord, ComplexityCounts, DayActivity, FileActivity, LineChangeTotals,
    WindowSummary,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

/// Occurrence counter that remembers first-seen order, so ranking ties resolve
/// to whichever key showed up first.
#[derive(Debug, Clone)]
pub struct OrderedCounter<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
}

impl<K: Eq + Hash + Clone> OrderedCounter<K> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: K, by: u64) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += by,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, by));
            }
        }
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index.get(key).map(|&slot| self.entries[slot].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest counts first; the sort is stable so equal counts keep encounter order.
    pub fn top(&self, limit: usize) -> Vec<(K, u64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }
}

impl<K: Eq + Hash + Clone> Default for OrderedCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub type FileChangeCounts = OrderedCounter<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopLimits {
    pub files: usize,
    pub days: usize,
}

impl Default for TopLimits {
    fn default() -> Self {
        Self { files: 5, days: 5 }
    }
}

/// Incremental reduction of one window. Nothing here is shared with another window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    window: AnalysisWindow,
    commit_count: u64,
    complexity: ComplexityCounts,
    days: OrderedCounter<NaiveDate>,
    files: FileChangeCounts,
    lines: LineChangeTotals,
}

impl WindowAccumulator {
    pub fn new(window: AnalysisWindow) -> Self {
        Self {
            window,
            commit_count: 0,
            complexity: ComplexityCounts::default(),
            days: OrderedCounter::new(),
            files: FileChangeCounts::new(),
            lines: LineChangeTotals::default(),
        }
    }

    pub fn add_commit(&mut self, commit: &CommitRecord, classifier: &Classifier) {
        self.commit_count += 1;
        self.complexity.record(classifier.classify(&commit.message));
        self.days.increment(commit.date);
    }

    pub fn set_file_changes(&mut self, files: FileChangeCounts) {
        self.files = files;
    }

    pub fn set_line_changes(&mut self, lines: LineChangeTotals) {
        self.lines = lines;
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    pub fn finish(self, limits: TopLimits) -> WindowSummary {
        let daily_rate = self.commit_count as f64 / f64::from(self.window.day_count);
        WindowSummary {
            window: self.window,
            commit_count: self.commit_count,
            daily_rate,
            complexity: self.complexity,
            top_files: self
                .files
                .top(limits.files)
                .into_iter()
                .map(|(path, changes)| FileActivity { path, changes })
                .collect(),
            top_days: self
                .days
                .top(limits.days)
                .into_iter()
                .map(|(date, commits)| DayActivity { date, commits })
                .collect(),
            lines: self.lines,
        }
    }
}

/// One-shot reduction of already parsed records into a summary.
pub fn aggregate<I>(
    window: AnalysisWindow,
    commits: I,
    file_changes: FileChangeCounts,
    line_changes: LineChangeTotals,
    limits: TopLimits,
    classifier: &Classifier,
) -> WindowSummary
where
    I: IntoIterator<Item = CommitRecord>,
{
    let mut acc = WindowAccumulator::new(window);
    for commit in commits {
        acc.add_commit(&commit, classifier);
    }
    acc.set_file_changes(file_changes);
    acc.set_line_changes(line_changes);
    acc.finish(limits)
}
