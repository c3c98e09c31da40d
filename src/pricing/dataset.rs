//! Reference dataset acquisition and parsing

use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::evaluation::LabeledHouse;
use super::house::{House, Location};
use crate::config::DatasetConfig;
use crate::error::{AppError, Result};

/// Source of the raw CSV bytes
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Fetch the whole document
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Dataset downloaded over HTTP
pub struct HttpDatasetSource {
    client: Client,
    url: String,
}

impl HttpDatasetSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Dataset(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        let bytes = response.bytes().await?;
        debug!(url = %self.url, bytes = bytes.len(), "Downloaded dataset");
        Ok(bytes.to_vec())
    }
}

/// Dataset read from the local filesystem
pub struct FileDatasetSource {
    path: PathBuf,
}

impl FileDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileDatasetSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Pick the configured source. A URL wins over a path.
pub fn source_from_config(config: &DatasetConfig) -> Result<Arc<dyn DatasetSource>> {
    match (&config.url, &config.path) {
        (Some(url), _) => Ok(Arc::new(HttpDatasetSource::new(url.clone()))),
        (None, Some(path)) => Ok(Arc::new(FileDatasetSource::new(path.clone()))),
        (None, None) => Err(AppError::Dataset(
            "no dataset url or path configured".to_string(),
        )),
    }
}

/// Fetch and parse the dataset. Any failure here is fatal for the node.
pub async fn load(source: &dyn DatasetSource) -> Result<Vec<LabeledHouse>> {
    let raw = source.fetch().await?;
    let rows = parse_csv(&raw)?;
    info!(source = %source.describe(), rows = rows.len(), "Loaded reference dataset");
    Ok(rows)
}

/// Parse `size,bedrooms,age,location,price` rows. The first line is a header.
pub fn parse_csv(raw: &[u8]) -> Result<Vec<LabeledHouse>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() < 5 {
            return Err(AppError::Dataset(format!(
                "line {}: expected 5 columns, found {}",
                line,
                record.len()
            )));
        }

        let number = |index: usize, column: &str| -> Result<f64> {
            record[index].parse::<f64>().map_err(|e| {
                AppError::Dataset(format!("line {}: invalid {} '{}': {}", line, column, &record[index], e))
            })
        };

        rows.push(LabeledHouse {
            house: House {
                size: number(0, "size")?,
                bedrooms: number(1, "bedrooms")?,
                age: number(2, "age")?,
                location: Location::from(&record[3]),
            },
            price: number(4, "price")?,
        });
    }

    if rows.is_empty() {
        return Err(AppError::Dataset("dataset has no rows".to_string()));
    }

    Ok(rows)
}
