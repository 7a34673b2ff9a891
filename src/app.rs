//! Application wiring and the headless run flows.
//!
//! Builds the gateway, directory, and orchestrator from config, runs a
//! query directly or impersonated, and renders the engine's projections as
//! a text preview or an export.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::directory::{Directory, StaticDirectory};
use crate::error::{Result, VantageError};
use crate::gateway::{self, ExecutionGateway, ExecutionResult, GatewayRequest};
use crate::impersonation::{Orchestrator, WatchEvent, WatchOptions, WatcherSet};
use crate::results::{snapshot_json, to_csv, ResultView, RowView};

/// The assembled application.
pub struct App {
    config: Config,
    directory: Arc<StaticDirectory>,
    gateway: Arc<dyn ExecutionGateway>,
    orchestrator: Arc<Orchestrator>,
    watchers: WatcherSet,
    view: ResultView,
}

impl App {
    /// Builds the application from CLI flags and the config file.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load_from_file(&cli.config_path())?;

        let mut gateway_config = config.gateway.clone();
        if cli.mock_gateway {
            gateway_config.backend = "mock".to_string();
        }
        let gateway = gateway::connect(&gateway_config)?;

        let caller_key = cli
            .caller
            .clone()
            .or_else(|| config.caller.clone())
            .ok_or_else(|| {
                VantageError::config("No caller configured. Set 'caller' or pass --caller")
            })?;
        let directory = Arc::new(StaticDirectory::from_config(&config, &caller_key)?);

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&gateway),
            directory.clone(),
            Duration::from_secs(config.impersonation.result_ttl_secs),
        ));

        let page_size = cli.page_size.unwrap_or(config.preview.page_size);

        Ok(Self {
            config,
            directory,
            gateway,
            orchestrator,
            watchers: WatcherSet::new(),
            view: ResultView::new(page_size),
        })
    }

    /// Runs one CLI invocation to completion.
    pub async fn run(&mut self, cli: &Cli) -> Result<()> {
        if cli.list {
            print!("{}", self.query_listing());
            return Ok(());
        }

        let query_name = cli
            .query
            .as_deref()
            .ok_or_else(|| VantageError::validation("A query name is required. See --help"))?;
        let format = cli.output_format()?;

        let (result, error_banner) = match &cli.run_as {
            Some(target) => self.run_impersonated(target, query_name, cli).await?,
            None => self.run_direct(query_name, cli).await?,
        };

        self.view.replace_result(result);
        self.view.set_page(cli.page);
        for key in &cli.expand {
            self.view.toggle_expanded(key);
        }

        let output = match format {
            OutputFormat::Text => self.render_text(error_banner.as_deref()),
            OutputFormat::Json => snapshot_json(self.view.result(), Utc::now()),
            OutputFormat::Csv => to_csv(self.view.result()),
        };

        match &cli.output {
            Some(path) => std::fs::write(path, output.as_bytes()).map_err(|e| {
                VantageError::validation(format!("Cannot write {}: {e}", path.display()))
            })?,
            None => println!("{output}"),
        }

        Ok(())
    }

    /// Resolves a query configuration and its effective bindings.
    fn resolve_request(&self, query_name: &str, cli: &Cli) -> Result<GatewayRequest> {
        let config = self
            .directory
            .query_config(query_name)
            .ok_or_else(|| VantageError::not_found(format!("Query configuration '{query_name}'")))?;
        if !config.active {
            return Err(VantageError::not_found(format!(
                "Query configuration '{query_name}' is inactive"
            )));
        }

        let bindings = self.effective_bindings(query_name, cli)?;

        Ok(GatewayRequest {
            config_id: Some(config.id.clone()),
            bindings_json: Some(bindings.to_json()),
            query_override: cli.query_override.clone(),
            run_as_user_id: None,
        })
    }

    /// Request bindings merged over the configuration's predefined ones.
    fn effective_bindings(
        &self,
        query_name: &str,
        cli: &Cli,
    ) -> Result<crate::gateway::ParameterBindings> {
        let predefined = self
            .config
            .get_query(query_name)
            .map(|entry| {
                crate::gateway::ParameterBindings::from_value(serde_json::Value::Object(
                    entry.bindings.clone().into_iter().collect(),
                ))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(cli.request_bindings()?.merged_over(&predefined))
    }

    /// Direct flow: one synchronous gateway round trip.
    ///
    /// A query-level failure is not a process error; it comes back as an
    /// empty result plus a banner so the preview still shows the columns.
    async fn run_direct(
        &self,
        query_name: &str,
        cli: &Cli,
    ) -> Result<(ExecutionResult, Option<String>)> {
        let request = self.resolve_request(query_name, cli)?;
        info!(query = %query_name, "Executing query");

        let response = self.gateway.execute(&request).await?;
        let fields = response.fields.clone();
        match response.into_result() {
            Ok(result) => Ok((result, None)),
            Err(message) => Ok((ExecutionResult::with_data(Vec::new(), fields), Some(message))),
        }
    }

    /// Impersonated flow: enqueue, then poll until terminal or the attempt
    /// cap.
    async fn run_impersonated(
        &mut self,
        target: &str,
        query_name: &str,
        cli: &Cli,
    ) -> Result<(ExecutionResult, Option<String>)> {
        let bindings = self.effective_bindings(query_name, cli)?;
        let receipt = self.orchestrator.enqueue_impersonated_execution(
            target,
            query_name,
            &bindings.to_json(),
        )?;
        info!(job_id = %receipt.job_id, "{}", receipt.message);

        // The cache is keyed by the backend user id, not the roster key
        let target_user_id = self
            .directory
            .user(target)
            .map(|user| user.id.clone())
            .ok_or_else(|| VantageError::not_found(format!("User '{target}'")))?;

        let options = WatchOptions::from_config(&self.config.impersonation);
        let handle = self
            .watchers
            .start(Arc::clone(&self.orchestrator), &target_user_id, options);

        match handle.join().await {
            WatchEvent::Completed(result) => Ok((result, None)),
            WatchEvent::Failed { message } => Ok((ExecutionResult::default(), Some(message))),
            WatchEvent::TimedOut => Err(VantageError::timeout(format!(
                "No result for '{target}' after {} polls",
                options.max_polls
            ))),
            WatchEvent::Cancelled => Err(VantageError::internal("Watch cancelled before a result")),
        }
    }

    /// Formats the `--list` output.
    fn query_listing(&self) -> String {
        let mut names: Vec<&String> = self.config.queries.keys().collect();
        names.sort();

        let mut out = String::from("Configured queries:\n");
        for name in names {
            let entry = &self.config.queries[name];
            out.push_str(&format!(
                "  {name}  [{}]{}\n",
                entry.object.as_deref().unwrap_or("-"),
                if entry.active { "" } else { "  (inactive)" }
            ));
        }
        out
    }

    /// Renders the current page as a plain-text table.
    fn render_text(&self, error_banner: Option<&str>) -> String {
        let mut lines: Vec<String> = Vec::new();

        if let Some(banner) = error_banner {
            lines.push(format!("Error: {banner}"));
            lines.push(String::new());
        }

        let result = self.view.result();
        if let Some(run_as) = &result.run_as_user_name {
            lines.push(format!("Run as: {run_as}"));
        }
        if let Some(ms) = result.execution_time_ms {
            lines.push(format!("Execution time: {ms} ms"));
        }

        let labels: Vec<String> = self
            .view
            .columns()
            .iter()
            .map(|c| c.label.clone())
            .collect();
        let rows = self.view.page_rows();
        let cell_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.cells.iter().map(|c| c.value.clone()).collect())
            .collect();
        lines.extend(text_table(&labels, &cell_rows));

        for row in &rows {
            if row.expanded {
                lines.extend(render_expanded(row));
            }
        }

        lines.push(format!(
            "Page {} of {} ({} records)",
            self.view.page(),
            self.view.total_pages(),
            result.record_count
        ));

        lines.join("\n")
    }
}

/// Renders the child tables of an expanded row, indented under it.
fn render_expanded(row: &RowView) -> Vec<String> {
    let mut lines = Vec::new();
    for relationship in &row.child_relationships {
        lines.push(format!("  {} — {}", row.display_name, relationship.label));
        let labels: Vec<String> = relationship
            .columns
            .iter()
            .map(|c| c.label.clone())
            .collect();
        let cells: Vec<Vec<String>> = relationship
            .records
            .iter()
            .map(|child| {
                relationship
                    .columns
                    .iter()
                    .map(|column| {
                        child
                            .get(&column.field_name)
                            .map(crate::results::render_scalar)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        for line in text_table(&labels, &cells) {
            lines.push(format!("  {line}"));
        }
    }
    lines
}

/// Renders an aligned text table: header, rule, one line per row.
fn text_table(labels: &[String], rows: &[Vec<String>]) -> Vec<String> {
    if labels.is_empty() {
        return vec!["(no columns)".to_string()];
    }

    let mut widths: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render_line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_line(labels)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render_line(row));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_table_alignment() {
        let labels = vec!["Id".to_string(), "Name".to_string()];
        let rows = vec![
            vec!["1".to_string(), "Acme".to_string()],
            vec!["2".to_string(), "Globex Corp".to_string()],
        ];
        let lines = text_table(&labels, &rows);
        assert_eq!(lines[0], "Id  Name");
        assert_eq!(lines[1], "--  -----------");
        assert_eq!(lines[2], "1   Acme");
        assert_eq!(lines[3], "2   Globex Corp");
    }

    #[test]
    fn test_text_table_no_columns() {
        let lines = text_table(&[], &[]);
        assert_eq!(lines, vec!["(no columns)".to_string()]);
    }

    #[test]
    fn test_text_table_empty_rows_keeps_header() {
        let labels = vec!["Id".to_string(), "Name".to_string()];
        let lines = text_table(&labels, &[]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Id  Name");
    }
}
