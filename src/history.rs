//! Measure history assembly.
//!
//! Metric histories are fetched in batches, merged across pages, cast by the
//! metric's declared type and aligned to a project's analyses, producing one
//! row per analysis (newest first) and one column per metric.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};

use crate::client::SonarClient;
use crate::error::{empty_on_rejection, Result, SonarError};
use crate::models::{HistoryQuery, MeasureHistory, Metric, MAX_METRICS_PER_REQUEST};
use crate::traits::List;

/// Values of these metrics are comma-separated lists; commas become `;`.
const COMMA_LIST_METRICS: &[&str] = &["quality_profiles", "quality_gate_details"];

/// Values of these metrics are `;`-separated distributions; `;` becomes `,`.
const SEMICOLON_LIST_METRICS: &[&str] = &[
    "class_complexity_distribution",
    "function_complexity_distribution",
    "file_complexity_distribution",
    "ncloc_language_distribution",
];

/// Shortest raw `MILLISEC` value treated as an epoch timestamp.
const MILLISEC_TIMESTAMP_LEN: usize = 12;

/// Declared value type of a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricType {
    Int,
    WorkDur,
    Float,
    Percent,
    Rating,
    Bool,
    Millisec,
    /// Any other type (`STRING`, `DATA`, `LEVEL`, `DISTRIB`, ...), kept as text.
    Other(String),
}

impl MetricType {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "INT" => MetricType::Int,
            "WORK_DUR" => MetricType::WorkDur,
            "FLOAT" => MetricType::Float,
            "PERCENT" => MetricType::Percent,
            "RATING" => MetricType::Rating,
            "BOOL" => MetricType::Bool,
            "MILLISEC" => MetricType::Millisec,
            other => MetricType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Int => "INT",
            MetricType::WorkDur => "WORK_DUR",
            MetricType::Float => "FLOAT",
            MetricType::Percent => "PERCENT",
            MetricType::Rating => "RATING",
            MetricType::Bool => "BOOL",
            MetricType::Millisec => "MILLISEC",
            MetricType::Other(s) => s,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric's position and type in the output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: String,
    pub order: usize,
    pub metric_type: MetricType,
}

/// The ordered set of metrics to assemble.
///
/// Loaded once from the metrics ordering file and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct MetricOrder {
    specs: Vec<MetricSpec>,
    index: HashMap<String, usize>,
}

impl MetricOrder {
    /// Build from `(name, type)` pairs, in order.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut order = Self::default();
        for (name, metric_type) in pairs {
            order.push(name.into(), MetricType::parse(metric_type.as_ref()));
        }
        order
    }

    /// Build from metric definitions, in the order given.
    pub fn from_metrics(metrics: &[Metric]) -> Self {
        Self::from_pairs(
            metrics
                .iter()
                .map(|m| (m.key.clone(), m.metric_type.as_str())),
        )
    }

    /// Parse the ordering CSV: a header row, then one row per metric with the
    /// metric key in the second column and its type in the third.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut order = Self::default();
        for (line, record) in rows.records().enumerate() {
            let record = record?;
            match (record.get(1), record.get(2)) {
                (Some(name), Some(metric_type)) => {
                    order.push(name.to_string(), MetricType::parse(metric_type));
                }
                _ => {
                    return Err(SonarError::MetricsFile(format!(
                        "row {} has {} columns, expected at least 3",
                        line + 2,
                        record.len()
                    )))
                }
            }
        }
        Ok(order)
    }

    /// Load the ordering file.
    ///
    /// # Errors
    ///
    /// [`SonarError::MetricsFileMissing`] if `path` does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SonarError::MetricsFileMissing(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let order = Self::from_reader(file)?;
        tracing::debug!(path = %path.display(), metrics = order.len(), "loaded metric order");
        Ok(order)
    }

    fn push(&mut self, name: String, metric_type: MetricType) {
        let order = self.specs.len();
        self.index.insert(name.clone(), order);
        self.specs.push(MetricSpec {
            name,
            order,
            metric_type,
        });
    }

    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Metric names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Rewriting applied to text values that embed list separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEscape {
    None,
    CommaToSemicolon,
    SemicolonToComma,
}

impl TextEscape {
    pub fn for_metric(name: &str) -> Self {
        if COMMA_LIST_METRICS.contains(&name) {
            TextEscape::CommaToSemicolon
        } else if SEMICOLON_LIST_METRICS.contains(&name) {
            TextEscape::SemicolonToComma
        } else {
            TextEscape::None
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            TextEscape::None => value.to_string(),
            TextEscape::CommaToSemicolon => value.replace(',', ";"),
            TextEscape::SemicolonToComma => value.replace(';', ","),
        }
    }
}

/// One cell of an assembled table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    /// UTC date-time decoded from an epoch-milliseconds value.
    Timestamp(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(v) => write!(f, "{v}"),
            // Whole floats keep their decimal point so the column reads back as float.
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Cast a raw history value by its declared type.
///
/// Unparseable numbers become [`CellValue::Null`] with a warning. `BOOL` is
/// true for any non-empty string, including `"false"`.
pub fn cast_value(raw: &str, metric_type: &MetricType, escape: TextEscape) -> CellValue {
    let cast = match metric_type {
        MetricType::Int | MetricType::WorkDur => raw.trim().parse::<i64>().ok().map(CellValue::Int),
        MetricType::Float | MetricType::Percent | MetricType::Rating => {
            raw.trim().parse::<f64>().ok().map(CellValue::Float)
        }
        MetricType::Bool => Some(CellValue::Bool(!raw.is_empty())),
        MetricType::Millisec => {
            let millis = raw.trim().parse::<i64>().ok();
            if raw.len() >= MILLISEC_TIMESTAMP_LEN {
                millis
                    .and_then(DateTime::from_timestamp_millis)
                    .map(|dt| CellValue::Timestamp(dt.naive_utc()))
            } else {
                millis.map(CellValue::Int)
            }
        }
        MetricType::Other(_) => Some(CellValue::Text(escape.apply(raw))),
    };

    cast.unwrap_or_else(|| {
        tracing::warn!(value = raw, metric_type = %metric_type, "exception casting value");
        CellValue::Null
    })
}

/// Merge per-page fragments so each metric appears once.
///
/// Metrics keep the order in which they were first seen; the history of a
/// metric is the concatenation of its fragments in encounter order.
pub fn merge_histories(fragments: Vec<MeasureHistory>) -> Vec<MeasureHistory> {
    let mut merged: Vec<MeasureHistory> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        match position.get(&fragment.metric) {
            Some(&i) => merged[i].history.extend(fragment.history),
            None => {
                position.insert(fragment.metric.clone(), merged.len());
                merged.push(fragment);
            }
        }
    }
    merged
}

/// Turn an oldest-first history into exactly `num_rows` newest-first values.
///
/// Extra old values are dropped; missing ones are padded with nulls.
pub fn align_history(mut values: Vec<CellValue>, num_rows: usize) -> Vec<CellValue> {
    values.reverse();
    values.truncate(num_rows);
    values.resize(num_rows, CellValue::Null);
    values
}

/// One metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricColumn {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// Measures of one project, one row per analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureTable {
    pub project_key: String,
    /// Analysis keys, newest first.
    pub analysis_keys: Vec<String>,
    /// Metric columns in declared order.
    pub metrics: Vec<MetricColumn>,
}

impl MeasureTable {
    /// `project_key`, `analysis_key`, then every metric name.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec!["project_key".to_string(), "analysis_key".to_string()];
        columns.extend(self.metrics.iter().map(|m| m.name.clone()));
        columns
    }

    pub fn num_rows(&self) -> usize {
        self.analysis_keys.len()
    }

    pub fn column(&self, metric: &str) -> Option<&[CellValue]> {
        self.metrics
            .iter()
            .find(|m| m.name == metric)
            .map(|m| m.values.as_slice())
    }

    /// Rows in the order of [`MeasureTable::columns`].
    pub fn rows(&self) -> impl Iterator<Item = Vec<CellValue>> + '_ {
        self.analysis_keys.iter().enumerate().map(move |(i, key)| {
            let mut row = Vec::with_capacity(self.metrics.len() + 2);
            row.push(CellValue::Text(self.project_key.clone()));
            row.push(CellValue::Text(key.clone()));
            row.extend(self.metrics.iter().map(|m| m.values[i].clone()));
            row
        })
    }
}

/// Build the table from merged histories.
///
/// Histories are sorted into declared order; metrics absent from `order`
/// are skipped with a warning.
pub fn build_table(
    project_key: &str,
    analysis_keys: &[String],
    histories: Vec<MeasureHistory>,
    order: &MetricOrder,
) -> MeasureTable {
    let num_rows = analysis_keys.len();

    let mut known: Vec<(&MetricSpec, MeasureHistory)> = Vec::with_capacity(histories.len());
    for history in histories {
        match order.get(&history.metric) {
            Some(spec) => known.push((spec, history)),
            None => tracing::warn!(metric = %history.metric, "metric missing from ordering, skipped"),
        }
    }
    known.sort_by_key(|(spec, _)| spec.order);

    let metrics = known
        .into_iter()
        .map(|(spec, history)| {
            let escape = TextEscape::for_metric(&spec.name);
            let values = history
                .history
                .iter()
                .map(|point| match &point.value {
                    Some(raw) => cast_value(raw, &spec.metric_type, escape),
                    None => CellValue::Null,
                })
                .collect();
            MetricColumn {
                name: spec.name.clone(),
                values: align_history(values, num_rows),
            }
        })
        .collect();

    MeasureTable {
        project_key: project_key.to_string(),
        analysis_keys: analysis_keys.to_vec(),
        metrics,
    }
}

/// Fetch the history of every metric in `order`, ten metrics per request.
///
/// A batch rejected with an HTTP error status is logged and skipped.
#[tracing::instrument(skip(client, order), fields(metrics = order.len()))]
pub async fn fetch_histories(
    client: &SonarClient,
    project_key: &str,
    order: &MetricOrder,
) -> Result<Vec<MeasureHistory>> {
    let names: Vec<String> = order.names().map(str::to_string).collect();
    let mut histories = Vec::with_capacity(names.len());

    for batch in names.chunks(MAX_METRICS_PER_REQUEST) {
        let query = HistoryQuery::new(project_key, batch);
        let fragments = empty_on_rejection(
            MeasureHistory::list_all(client, &query).await,
            "api/measures/search_history",
        )?;
        histories.extend(merge_histories(fragments));
    }
    Ok(histories)
}

/// Fetch and assemble the measure table of one project.
pub async fn assemble(
    client: &SonarClient,
    project_key: &str,
    analysis_keys: &[String],
    order: &MetricOrder,
) -> Result<MeasureTable> {
    let histories = fetch_histories(client, project_key, order).await?;
    Ok(build_table(project_key, analysis_keys, histories, order))
}
