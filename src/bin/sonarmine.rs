//! SonarCloud harvester CLI binary.
//!
//! A command-line interface for collecting SonarCloud data into JSON and CSV files.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use sonarmine::cli::{Cli, Command, MissingRepo};
use sonarmine::output::{
    sanitize_project_key, write_json, write_measure_table, write_metrics_csv, write_projects_csv,
};
use sonarmine::{
    get_analysis_keys, get_metrics, get_organization_projects, get_project_issues, history,
    HarvestConfig, Issue, Metric, MetricOrder, ProjectRecord, Range, RangeEnumerator,
    RepoResolver, SonarClient,
};
use tabled::{Table, Tabled};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = match SonarClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Check the SONAR_URL environment variable");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &SonarClient, cli: Cli) -> sonarmine::Result<()> {
    let out = cli.output_dir.as_path();
    match cli.command {
        Command::Harvest { config } => handle_harvest(client, &config, out, cli.json).await,
        Command::Organization {
            organization,
            resolve_repos,
            missing_repo,
            workers,
        } => {
            handle_organization(
                client,
                &organization,
                resolve_repos,
                missing_repo,
                workers,
                out,
                cli.json,
            )
            .await
        }
        Command::Metrics => handle_metrics(client, out, cli.json).await,
        Command::Measures {
            project,
            metrics_file,
        } => {
            let metrics_file = metrics_file.unwrap_or_else(|| out.join("metrics/metrics.csv"));
            handle_measures(client, &project, &metrics_file, out, cli.json).await
        }
        Command::Issues {
            project,
            organization,
        } => handle_issues(client, &project, organization.as_deref(), out, cli.json).await,
        Command::Count {
            language,
            lower,
            upper,
        } => {
            let range = Range { lower, upper };
            let total = RangeEnumerator::new(client, &language).count(range).await?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "language": language, "range": range, "total": total })
                );
            } else {
                println!("{language} {range}: {total} projects");
            }
            Ok(())
        }
    }
}

async fn handle_harvest(
    client: &SonarClient,
    config_path: &Path,
    out: &Path,
    json: bool,
) -> sonarmine::Result<()> {
    let config = HarvestConfig::from_path(config_path)?;
    let out = out.join(&config.output_dir);

    let resolver = RepoResolver::new(client)
        .with_workers(config.max_workers)
        .with_policy(config.missing_repo);

    let mut rows = Vec::with_capacity(config.languages.len());
    for language in &config.languages {
        tracing::info!(language, "harvesting language");

        let enumeration = RangeEnumerator::new(client, language)
            .with_initial_upper_bound(config.initial_upper_bound)
            .run()
            .await?;
        let ranges = enumeration.ranges.len();
        let enumerated = enumeration.records.len();

        let report = resolver.resolve_all(enumeration.into_records()).await?;
        write_json(&out.join(format!("projects_{language}.json")), &report.projects)?;
        write_json(&out.join(format!("repos_{language}.json")), &report.repos)?;

        rows.push(HarvestRow {
            language: language.clone(),
            ranges,
            projects: enumerated,
            repos: report.repos.len(),
            no_repo: report.no_repo.len(),
            failures: report.failures.len(),
        });
    }

    output_rows(rows, json)
}

async fn handle_organization(
    client: &SonarClient,
    organization: &str,
    resolve_repos: bool,
    missing_repo: MissingRepo,
    workers: usize,
    out: &Path,
    json: bool,
) -> sonarmine::Result<()> {
    let components = get_organization_projects(client, organization).await?;
    let mut records: Vec<ProjectRecord> = components.iter().map(ProjectRecord::from).collect();

    if resolve_repos {
        let report = RepoResolver::new(client)
            .with_workers(workers)
            .with_policy(missing_repo.into())
            .resolve_all(records)
            .await?;
        write_json(&out.join("repos.json"), &report.repos)?;
        records = report.projects;
    }

    write_projects_csv(&out.join("projects/projects.csv"), &records)?;
    let rows: Vec<ProjectRow> = records.iter().map(ProjectRow::from).collect();
    output_items(&records, rows, json)
}

async fn handle_metrics(client: &SonarClient, out: &Path, json: bool) -> sonarmine::Result<()> {
    let metrics = get_metrics(client).await?;
    write_metrics_csv(&out.join("metrics/metrics.csv"), &metrics)?;
    let rows: Vec<MetricRow> = metrics.iter().map(MetricRow::from).collect();
    output_items(&metrics, rows, json)
}

async fn handle_measures(
    client: &SonarClient,
    project: &str,
    metrics_file: &Path,
    out: &Path,
    json: bool,
) -> sonarmine::Result<()> {
    let order = MetricOrder::load(metrics_file)?;
    let analysis_keys = get_analysis_keys(client, project).await?;
    let table = history::assemble(client, project, &analysis_keys, &order).await?;
    let path = write_measure_table(&out.join("measures"), &table)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "project": project,
                "path": path,
                "analyses": table.num_rows(),
                "metrics": table.metrics.len(),
            })
        );
    } else {
        println!(
            "{project}: {} analyses x {} metrics -> {}",
            table.num_rows(),
            table.metrics.len(),
            path.display()
        );
    }
    Ok(())
}

async fn handle_issues(
    client: &SonarClient,
    project: &str,
    organization: Option<&str>,
    out: &Path,
    json: bool,
) -> sonarmine::Result<()> {
    let issues = get_project_issues(client, project, organization).await?;
    let path = out
        .join("issues")
        .join(format!("{}.json", sanitize_project_key(project)));
    write_json(&path, &issues)?;

    let rows: Vec<IssueRow> = issues.iter().map(IssueRow::from).collect();
    output_items(&issues, rows, json)?;
    if !json {
        let bugs = issues.iter().filter(|i| i.is_bug()).count();
        let smells = issues.iter().filter(|i| i.is_code_smell()).count();
        println!("{bugs} bugs, {smells} code smells");
    }
    Ok(())
}

fn output_items<T: Serialize, R: Tabled>(
    items: &[T],
    rows: Vec<R>,
    json: bool,
) -> sonarmine::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        let count = rows.len();
        println!("{}", Table::new(rows));
        println!("\n{count} total items");
    }
    Ok(())
}

fn output_rows<R: Tabled + Serialize>(rows: Vec<R>, json: bool) -> sonarmine::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

// Table row types for non-JSON output

#[derive(Tabled, Serialize)]
struct HarvestRow {
    language: String,
    ranges: usize,
    projects: usize,
    repos: usize,
    no_repo: usize,
    failures: usize,
}

#[derive(Tabled)]
struct ProjectRow {
    project: String,
    name: String,
    repo: String,
    commit: String,
}

impl From<&ProjectRecord> for ProjectRow {
    fn from(p: &ProjectRecord) -> Self {
        Self {
            project: p.full_name(),
            name: p.name.clone().unwrap_or_default(),
            repo: p.repo.clone().unwrap_or_default(),
            commit: p.commit_hash.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct MetricRow {
    key: String,
    #[tabled(rename = "type")]
    metric_type: String,
    domain: String,
}

impl From<&Metric> for MetricRow {
    fn from(m: &Metric) -> Self {
        Self {
            key: m.key.clone(),
            metric_type: m.metric_type.clone(),
            domain: m.domain.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct IssueRow {
    key: String,
    #[tabled(rename = "type")]
    issue_type: String,
    severity: String,
    rule: String,
    line: String,
}

impl From<&Issue> for IssueRow {
    fn from(i: &Issue) -> Self {
        Self {
            key: i.key.clone(),
            issue_type: i.issue_type.clone().unwrap_or_default(),
            severity: i.severity.clone().unwrap_or_default(),
            rule: i.rule.clone(),
            line: i.line.map(|l| l.to_string()).unwrap_or_default(),
        }
    }
}
