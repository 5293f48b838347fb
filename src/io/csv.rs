use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::{CharacterRecord, Variant};
use crate::utils::run_blocking;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Character Name")]
    name: String,
    #[serde(rename = "Tier")]
    tier: String,
    #[serde(rename = "Cost")]
    cost: String,
    #[serde(rename = "Income per Second")]
    income: String,
    #[serde(rename = "Variant Type", default)]
    variant: String,
    #[serde(rename = "Image Path", default)]
    image_path: String,
}

impl From<&CharacterRecord> for CsvRow {
    fn from(record: &CharacterRecord) -> Self {
        Self {
            name: record.name.clone(),
            tier: record.tier.clone(),
            cost: record.cost.to_string(),
            income: record.income.to_string(),
            variant: record.variant.clone(),
            image_path: record.image_path_display(),
        }
    }
}

impl CsvRow {
    /// `line` is the 1-based line number in the file, header included.
    fn into_record(self, line: usize) -> AppResult<CharacterRecord> {
        let parse = |label: &str, raw: &str| {
            raw.parse::<u64>().map_err(|_| {
                AppError::Validation(format!("Row {}: invalid {} '{}'", line, label, raw))
            })
        };
        let cost = parse("cost", &self.cost)?;
        let income = parse("income", &self.income)?;
        let record = CharacterRecord::new(self.name, self.tier, cost, income)
            .map_err(|e| AppError::Validation(format!("Row {}: {}", line, e)))?;
        let variant = if self.variant.is_empty() {
            Variant::default().to_string()
        } else {
            self.variant
        };
        let record = record.with_variant(variant);
        Ok(if self.image_path.is_empty() {
            record
        } else {
            record.with_image_path(self.image_path)
        })
    }
}

fn header_matches(headers: &StringRecord) -> bool {
    headers.len() == config::CSV_HEADERS.len()
        && headers
            .iter()
            .zip(config::CSV_HEADERS.iter())
            .all(|(found, expected)| found.trim() == *expected)
}

fn csv_error(path: &Path, e: csv::Error) -> AppError {
    AppError::persistence(path, e.to_string())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "records.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_rows(path: &Path, rows: &[CsvRow]) -> AppResult<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    writer
        .write_record(config::CSV_HEADERS)
        .map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::persistence(path, e.to_string()))
}

/// Writes a fresh CSV. Rows go to a temporary sibling first, which is renamed over `path`
/// only after every row is flushed. Returns the number of rows written.
pub async fn write_records(path: &Path, records: &[CharacterRecord]) -> AppResult<usize> {
    if records.is_empty() {
        return Err(AppError::Argument(
            "Cannot write an empty record list".into(),
        ));
    }
    let rows: Vec<CsvRow> = records.iter().map(CsvRow::from).collect();
    let path = path.to_path_buf();

    run_blocking(move || {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::persistence(parent, e.to_string()))?;
        }
        let tmp = temp_sibling(&path);
        if let Err(e) = write_rows(&tmp, &rows) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(AppError::persistence(&path, e.to_string()));
        }
        log(
            LogLevel::Success,
            &format!("Wrote {} records to {}", rows.len(), path.display()),
        );
        Ok(rows.len())
    })
    .await
}

fn missing_trailing_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Appends to an existing CSV whose header matches. The header is not rewritten.
pub async fn append_records(path: &Path, records: &[CharacterRecord]) -> AppResult<usize> {
    if records.is_empty() {
        return Err(AppError::Argument(
            "Cannot append an empty record list".into(),
        ));
    }
    let rows: Vec<CsvRow> = records.iter().map(CsvRow::from).collect();
    let path = path.to_path_buf();

    run_blocking(move || {
        let mut reader = ReaderBuilder::new()
            .from_path(&path)
            .map_err(|e| csv_error(&path, e))?;
        let headers = reader.headers().map_err(|e| csv_error(&path, e))?.clone();
        if !header_matches(&headers) {
            return Err(AppError::Validation(format!(
                "Cannot append to {}: header does not match the expected columns",
                path.display()
            )));
        }
        drop(reader);

        let needs_newline = missing_trailing_newline(&path)
            .map_err(|e| AppError::persistence(&path, e.to_string()))?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| AppError::persistence(&path, e.to_string()))?;
        if needs_newline {
            file.write_all(b"\n")
                .map_err(|e| AppError::persistence(&path, e.to_string()))?;
        }
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        for row in &rows {
            writer.serialize(row).map_err(|e| csv_error(&path, e))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::persistence(&path, e.to_string()))?;
        log(
            LogLevel::Success,
            &format!("Appended {} records to {}", rows.len(), path.display()),
        );
        Ok(rows.len())
    })
    .await
}

fn read_records(path: &Path) -> AppResult<Vec<CharacterRecord>> {
    let file = File::open(path).map_err(|e| AppError::persistence(path, e.to_string()))?;
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    if !header_matches(&headers) {
        return Err(AppError::Validation(format!(
            "Unexpected CSV header in {}",
            path.display()
        )));
    }
    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| {
            let line = i + 2;
            row.map_err(|e| AppError::Validation(format!("Row {}: {}", line, e)))?
                .into_record(line)
        })
        .collect()
}

pub async fn load_records(path: &Path) -> AppResult<Vec<CharacterRecord>> {
    let path = path.to_path_buf();
    run_blocking(move || read_records(&path)).await
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvFormatCheck {
    pub is_valid: bool,
    pub rows: usize,
    pub errors: Vec<String>,
}

/// Structural check only: header, at least one data row, column count per row.
pub async fn validate_csv_format(path: &Path) -> AppResult<CsvFormatCheck> {
    let path = path.to_path_buf();
    run_blocking(move || {
        let file = File::open(&path).map_err(|e| AppError::persistence(&path, e.to_string()))?;
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(file);

        let mut check = CsvFormatCheck::default();
        let mut records = reader.records();
        match records.next() {
            Some(Ok(headers)) if header_matches(&headers) => {}
            Some(Ok(headers)) => check.errors.push(format!(
                "Header mismatch: expected [{}], found [{}]",
                config::CSV_HEADERS.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            )),
            Some(Err(e)) => check.errors.push(format!("Unreadable header: {}", e)),
            None => check.errors.push("File is empty".to_string()),
        }

        for (i, row) in records.enumerate() {
            let line = i + 2;
            match row {
                Ok(row) if row.len() != config::CSV_HEADERS.len() => check.errors.push(format!(
                    "Row {}: expected {} columns, found {}",
                    line,
                    config::CSV_HEADERS.len(),
                    row.len()
                )),
                Ok(_) => {}
                Err(e) => check.errors.push(format!("Row {}: {}", line, e)),
            }
            check.rows += 1;
        }
        if check.rows == 0 && check.errors.is_empty() {
            check.errors.push("No data rows".to_string());
        }

        check.is_valid = check.errors.is_empty();
        Ok(check)
    })
    .await
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvStatistics {
    pub rows: usize,
    pub by_tier: BTreeMap<String, usize>,
    pub by_variant: BTreeMap<String, usize>,
    pub with_image_path: usize,
}

pub async fn csv_statistics(path: &Path) -> AppResult<CsvStatistics> {
    let records = load_records(path).await?;
    let mut stats = CsvStatistics {
        rows: records.len(),
        ..Default::default()
    };
    for record in &records {
        *stats.by_tier.entry(record.tier.clone()).or_default() += 1;
        *stats.by_variant.entry(record.variant.clone()).or_default() += 1;
        if record.image_path.is_some() {
            stats.with_image_path += 1;
        }
    }
    Ok(stats)
}
