//! Sheet backends: a local CSV grid and the Google Sheets values API.

use crate::domain::ports::SheetStore;
use crate::domain::sheet::{column_index, CellRef, RangeRef};
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

/// A CSV file treated as a single sheet: row 1 is the first line, column A the
/// first field. The sheet name in references is ignored.
pub struct CsvSheet {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_grid(&self) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        let mut grid = Vec::new();
        for record in reader.records() {
            let record = record?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(grid)
    }

    fn store_grid(&self, grid: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        for row in grid {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for CsvSheet {
    async fn read(&self, range: &RangeRef) -> Result<Vec<Vec<String>>> {
        let _guard = self.lock.lock().await;
        let grid = self.load_grid()?;

        let first = range.start_row.saturating_sub(1) as usize;
        let last = range
            .end_row
            .map(|r| r as usize)
            .unwrap_or(grid.len())
            .min(grid.len());
        let columns = range.column_span();

        Ok(grid
            .get(first..last.max(first))
            .unwrap_or_default()
            .iter()
            .map(|row| {
                columns
                    .clone()
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    async fn write(&self, cell: &CellRef, value: &str) -> Result<()> {
        if cell.row == 0 {
            return Err(EnrichError::SheetError {
                message: format!("invalid row 0 in {}", cell),
            });
        }
        let _guard = self.lock.lock().await;
        let mut grid = if self.path.exists() {
            self.load_grid()?
        } else {
            Vec::new()
        };

        let col = column_index(&cell.column).ok_or_else(|| EnrichError::SheetError {
            message: format!("invalid column '{}' in {}", cell.column, cell),
        })?;
        let row = cell.row as usize - 1;
        if grid.len() <= row {
            // A zero-field record would be written as a blank line, which readers skip.
            grid.resize_with(row + 1, || vec![String::new()]);
        }
        let cells = &mut grid[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();

        self.store_grid(&grid)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Google Sheets v4 values API with a pre-issued OAuth bearer token.
pub struct GoogleSheets {
    client: Client,
    endpoint: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheets {
    pub fn new(endpoint: &str, spreadsheet_id: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| EnrichError::InvalidConfigValueError {
            field: "sheet.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// `{endpoint}/v4/spreadsheets/{id}/values/{range}` with the range percent-encoded.
    pub fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| EnrichError::SheetError {
                message: format!("endpoint {} cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(EnrichError::SheetError {
            message: format!("Sheets API error {}: {}", status, body),
        })
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn read(&self, range: &RangeRef) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&range.to_string())?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = Self::check(response).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn write(&self, cell: &CellRef, value: &str) -> Result<()> {
        let range = cell.to_string();
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [[value]],
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
