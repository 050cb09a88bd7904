use crate::check_status;
use crate::error::ApiError;
use async_trait::async_trait;
use configuration::ExportConfig;
use core_types::Table;
use std::collections::BTreeMap;

/// Somewhere the static CSV exports can be read from.
#[async_trait]
pub trait ExportSource: Send + Sync {
    /// Fetches the raw text of one export file.
    async fn fetch_text(&self, file_name: &str) -> Result<String, ApiError>;
}

/// Reads exports over HTTP from a fixed base URL.
#[derive(Clone)]
pub struct CsvExportClient {
    client: reqwest::Client,
    base_url: String,
}

impl CsvExportClient {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl ExportSource for CsvExportClient {
    async fn fetch_text(&self, file_name: &str) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, file_name);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        check_status(status, &url, &text)?;
        Ok(text)
    }
}

/// Fetches and parses one export.
pub async fn fetch_export(source: &dyn ExportSource, file_name: &str) -> Result<Table, ApiError> {
    let text = source.fetch_text(file_name).await?;
    Ok(Table::from_csv(&text)?)
}

/// Fetches every named dataset independently.
///
/// A dataset that fails to download or parse is logged and returned as an
/// empty table; it never aborts the others.
pub async fn fetch_all_exports(
    source: &dyn ExportSource,
    datasets: &BTreeMap<String, String>,
) -> BTreeMap<String, Table> {
    tracing::info!(datasets = datasets.len(), "Fetching CSV exports.");
    let mut tables = BTreeMap::new();

    for (name, file_name) in datasets {
        let table = match fetch_export(source, file_name).await {
            Ok(table) => {
                tracing::info!(dataset = %name, rows = table.len(), "Loaded export.");
                table
            }
            Err(e) => {
                tracing::warn!(dataset = %name, error = %e, "Export failed, using an empty table.");
                Table::empty()
            }
        };
        tables.insert(name.clone(), table);
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves canned CSV for every file except those listed as missing.
    struct FakeExports {
        missing: Vec<String>,
    }

    #[async_trait]
    impl ExportSource for FakeExports {
        async fn fetch_text(&self, file_name: &str) -> Result<String, ApiError> {
            if self.missing.iter().any(|m| m == file_name) {
                return Err(ApiError::Http {
                    status: 404,
                    url: format!("https://exports.test/{file_name}"),
                    body: "404: Not Found".to_string(),
                });
            }
            Ok("time,amount_usd\n2024-01-15,1000\n2024-02-10,2000\n".to_string())
        }
    }

    #[tokio::test]
    async fn one_missing_dataset_leaves_the_rest_intact() {
        let datasets = ExportConfig::default().datasets;
        assert_eq!(datasets.len(), 8);
        let source = FakeExports {
            missing: vec!["tvl_by_vault.csv".to_string()],
        };

        let tables = fetch_all_exports(&source, &datasets).await;

        assert_eq!(tables.len(), 8);
        let populated = tables.values().filter(|t| !t.is_empty()).count();
        assert_eq!(populated, 7);
        assert!(tables["tvl_by_vault"].is_empty());
        assert_eq!(tables["rewards_total"].len(), 2);
    }

    #[tokio::test]
    async fn every_dataset_failing_still_returns_all_names() {
        let datasets = ExportConfig::default().datasets;
        let missing = datasets.values().cloned().collect();
        let tables = fetch_all_exports(&FakeExports { missing }, &datasets).await;

        assert_eq!(tables.len(), 8);
        assert!(tables.values().all(Table::is_empty));
    }

    #[tokio::test]
    async fn single_export_errors_propagate() {
        let source = FakeExports {
            missing: vec!["gone.csv".to_string()],
        };
        let err = fetch_export(&source, "gone.csv").await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 404, .. }));
    }
}
