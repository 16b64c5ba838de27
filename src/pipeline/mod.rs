// src/pipeline/mod.rs

use anyhow::Context;
use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    clean::{clean_table, CleanedRow},
    config::ServerConfig,
    error::PipelineError,
    fetch::fetch_page,
    table::parse_tables,
};

/// Fetch the upstream page, pick the configured table and clean it.
pub async fn fetch_and_clean(
    client: &Client,
    config: &ServerConfig,
) -> Result<Vec<CleanedRow>, PipelineError> {
    let start = Instant::now();
    let html = fetch_page(client, &config.source_url, config.fetch_timeout).await?;
    debug!(elapsed = ?start.elapsed(), "upstream responded");

    // the DOM is not Send, so parse off the async workers
    let index = config.table_index;
    let rows = tokio::task::spawn_blocking(move || extract_rows(&html, index))
        .await
        .context("table parsing task failed")??;

    info!(rows = rows.len(), elapsed = ?start.elapsed(), "cleaned NSE table");
    Ok(rows)
}

/// Parse `html` and clean the table at `index`.
pub fn extract_rows(html: &str, index: usize) -> Result<Vec<CleanedRow>, PipelineError> {
    let mut tables = parse_tables(html);
    let found = tables.len();
    if index >= found {
        return Err(PipelineError::TableNotFound { index, found });
    }
    let table = tables.swap_remove(index);
    debug!(columns = ?table.columns, rows = table.len(), "selected table");
    Ok(clean_table(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::Value;

    fn page(tables: usize) -> String {
        let mut html = String::from("<html><body>");
        for i in 0..tables {
            html.push_str(&format!(
                "<table><tr><th>T{i}</th></tr><tr><td>{i}</td></tr></table>"
            ));
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn picks_the_table_at_index() {
        let rows = extract_rows(&page(5), 3).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("T3"), Some(&Value::Int(3)));
    }

    #[test]
    fn too_few_tables_is_table_not_found() {
        let err = extract_rows(&page(3), 3).unwrap_err();
        assert!(matches!(err, PipelineError::TableNotFound { index: 3, found: 3 }));
    }

    #[test]
    fn no_tables_is_table_not_found() {
        let err = extract_rows("<p>maintenance</p>", 3).unwrap_err();
        assert!(matches!(err, PipelineError::TableNotFound { found: 0, .. }));
    }
}
