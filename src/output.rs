//! Artifact writers.
//!
//! Every harvested collection ends up on disk as JSON or CSV under the
//! output directory. Parent directories are created as needed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::history::MeasureTable;
use crate::models::{Metric, ProjectRecord};

/// File-name-safe form of a project key: spaces and `:` become `_`.
pub fn sanitize_project_key(key: &str) -> String {
    key.replace([' ', ':'], "_")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut file = fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}

#[derive(Serialize)]
struct ProjectRow<'a> {
    organization: &'a str,
    key: &'a str,
    name: &'a str,
    qualifier: &'a str,
    visibility: &'a str,
    repo: &'a str,
    commit_hash: &'a str,
}

/// Write project records as CSV, one row per project.
///
/// Nothing is written for an empty list.
pub fn write_projects_csv(path: &Path, records: &[ProjectRecord]) -> Result<()> {
    if records.is_empty() {
        tracing::debug!(path = %path.display(), "no projects, skipping csv");
        return Ok(());
    }
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(ProjectRow {
            organization: &record.organization,
            key: &record.id,
            name: record.name.as_deref().unwrap_or_default(),
            qualifier: record.qualifier.as_deref().unwrap_or_default(),
            visibility: record.visibility.as_deref().unwrap_or_default(),
            repo: record.repo.as_deref().unwrap_or_default(),
            commit_hash: record.commit_hash.as_deref().unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = records.len(), "wrote projects csv");
    Ok(())
}

#[derive(Serialize)]
struct MetricRow<'a> {
    id: &'a str,
    key: &'a str,
    #[serde(rename = "type")]
    metric_type: &'a str,
    name: &'a str,
    domain: &'a str,
    description: &'a str,
}

/// Write metric definitions in the layout read back by
/// [`MetricOrder::from_reader`](crate::history::MetricOrder::from_reader).
pub fn write_metrics_csv(path: &Path, metrics: &[Metric]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for metric in metrics {
        writer.serialize(MetricRow {
            id: metric.id.as_deref().unwrap_or_default(),
            key: &metric.key,
            metric_type: &metric.metric_type,
            name: metric.name.as_deref().unwrap_or_default(),
            domain: metric.domain.as_deref().unwrap_or_default(),
            description: metric.description.as_deref().unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `table` to `<dir>/<sanitized project key>.csv` and return the path.
///
/// Null cells are written as empty fields.
pub fn write_measure_table(dir: &Path, table: &MeasureTable) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", sanitize_project_key(&table.project_key)));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = table.num_rows(), "wrote measures");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CellValue, MetricColumn, MetricOrder};

    #[test]
    fn test_sanitize_project_key() {
        assert_eq!(sanitize_project_key("org:my project"), "org_my_project");
        assert_eq!(sanitize_project_key("plain-key"), "plain-key");
    }

    #[test]
    fn test_write_json_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/projects_java.json");
        write_json(&path, &vec![ProjectRecord::new("acme", "widget")]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["id"], "widget");
        assert_eq!(written[0]["organization"], "acme");
    }

    #[test]
    fn test_write_projects_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects/projects.csv");
        let mut record = ProjectRecord::new("acme", "widget");
        record.qualifier = Some("TRK".to_string());
        record.visibility = Some("public".to_string());
        record.repo = Some("https://github.com/acme/widget".to_string());

        write_projects_csv(&path, &[record, ProjectRecord::new("acme", "gadget")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "organization,key,name,qualifier,visibility,repo,commit_hash"
        );
        assert_eq!(lines[1], "acme,widget,,TRK,public,https://github.com/acme/widget,");
        assert_eq!(lines[2], "acme,gadget,,,,,");
    }

    #[test]
    fn test_write_projects_csv_skips_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects/projects.csv");

        write_projects_csv(&path, &[]).unwrap();

        assert!(!path.exists());
        assert!(!dir.path().join("projects").exists());
    }

    #[test]
    fn test_metrics_csv_reads_back_as_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics/metrics.csv");
        let metrics = vec![
            Metric {
                id: Some("1".to_string()),
                key: "ncloc".to_string(),
                metric_type: "INT".to_string(),
                name: Some("Lines of Code".to_string()),
                domain: Some("Size".to_string()),
                description: Some("Non commenting lines, excluding blanks".to_string()),
            },
            Metric {
                id: Some("2".to_string()),
                key: "coverage".to_string(),
                metric_type: "PERCENT".to_string(),
                name: None,
                domain: None,
                description: None,
            },
        ];
        write_metrics_csv(&path, &metrics).unwrap();

        let order = MetricOrder::load(&path).unwrap();
        assert_eq!(order.names().collect::<Vec<_>>(), vec!["ncloc", "coverage"]);
    }

    #[test]
    fn test_write_measure_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = MeasureTable {
            project_key: "org:proj".to_string(),
            analysis_keys: vec!["A2".to_string(), "A1".to_string()],
            metrics: vec![MetricColumn {
                name: "ncloc".to_string(),
                values: vec![CellValue::Int(120), CellValue::Null],
            }],
        };

        let path = write_measure_table(&dir.path().join("measures"), &table).unwrap();
        assert!(path.ends_with("measures/org_proj.csv"));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "project_key,analysis_key,ncloc\norg:proj,A2,120\norg:proj,A1,\n"
        );
    }
}
