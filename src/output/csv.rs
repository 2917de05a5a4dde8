//! CSV writers for datasets and failure manifests.
//!
//! One row per (region, municipality, period). The two payload variants
//! share a flat column set with a `record_kind` discriminator; columns a
//! variant lacks stay empty rather than zero-filled, so consumers can tell
//! "not reported" from "reported as zero".

use crate::aggregate::{DatasetRecord, ManifestEntry};
use crate::output::{OutputError, OutputResult};
use crate::RecordPayload;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 8192;
const FLUSH_INTERVAL: u64 = 1_000;

/// Flat CSV row for one dataset record.
#[derive(Debug, Serialize)]
struct DatasetRow {
    region: String,
    region_name: String,
    municipality: String,
    municipality_name: String,
    period: String,
    record_kind: &'static str,
    ceiling: Option<u32>,
    direct_credentialed: Option<u32>,
    indirect_credentialed: Option<u32>,
    direct_paid: Option<u32>,
    indirect_paid: Option<u32>,
    credentialed_total: Option<u32>,
    paid_total: Option<u32>,
    direct_amount: Option<String>,
    indirect_amount: Option<String>,
    amount_total: String,
    budget_plan: Option<String>,
}

impl From<&DatasetRecord> for DatasetRow {
    fn from(record: &DatasetRecord) -> Self {
        let mut row = Self {
            region: record.key.region.clone(),
            region_name: record.region_name.clone(),
            municipality: record.key.municipality.clone(),
            municipality_name: record.municipality_name.clone(),
            period: record.key.period.to_string(),
            record_kind: record.payload.kind(),
            ceiling: None,
            direct_credentialed: None,
            indirect_credentialed: None,
            direct_paid: None,
            indirect_paid: None,
            credentialed_total: None,
            paid_total: None,
            direct_amount: None,
            indirect_amount: None,
            amount_total: record.payload.amount_total().to_string(),
            budget_plan: None,
        };
        match &record.payload {
            RecordPayload::Detailed(payment) => {
                row.ceiling = Some(payment.ceiling);
                row.direct_credentialed = Some(payment.direct_credentialed);
                row.indirect_credentialed = Some(payment.indirect_credentialed);
                row.direct_paid = Some(payment.direct_paid);
                row.indirect_paid = Some(payment.indirect_paid);
                row.credentialed_total = Some(payment.credentialed());
                row.paid_total = Some(payment.paid());
                row.direct_amount = Some(payment.direct_amount.to_string());
                row.indirect_amount = Some(payment.indirect_amount.to_string());
            }
            RecordPayload::BudgetOnly(summary) => {
                row.budget_plan = Some(summary.plan.clone());
            }
        }
        row
    }
}

/// Flat CSV row for one manifest entry.
#[derive(Debug, Serialize)]
struct ManifestRow {
    seq: u64,
    region: String,
    municipality: String,
    period: String,
    reason: &'static str,
    detail: String,
}

impl From<&ManifestEntry> for ManifestRow {
    fn from(entry: &ManifestEntry) -> Self {
        Self {
            seq: entry.seq,
            region: entry.key.region.clone(),
            municipality: entry.key.municipality.clone(),
            period: entry.key.period.to_string(),
            reason: entry.reason.as_token(),
            detail: entry.reason.to_string(),
        }
    }
}

/// Buffered CSV writer for dataset records.
pub struct CsvDatasetWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvDatasetWriter {
    /// Create a writer at the given path, creating parent directories.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let writer = open_csv(path.as_ref())?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one record.
    pub fn write_record(&mut self, record: &DatasetRecord) -> OutputResult<()> {
        let row = DatasetRow::from(record);
        self.writer
            .serialize(&row)
            .map_err(|e| OutputError::CsvError(format!("failed to write record: {e}")))?;
        self.rows_written += 1;
        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!(rows = self.rows_written, "dataset rows written");
        }
        Ok(())
    }

    /// Write a slice of records.
    pub fn write_records<'a, I>(&mut self, records: I) -> OutputResult<()>
    where
        I: IntoIterator<Item = &'a DatasetRecord>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("failed to flush: {e}")))
    }

    /// Close the writer, syncing the file to disk.
    pub fn close(mut self) -> OutputResult<()> {
        self.flush()?;
        close_csv(self.writer)?;
        debug!(rows = self.rows_written, "dataset writer closed");
        Ok(())
    }
}

/// Buffered CSV writer for the failure manifest.
pub struct CsvManifestWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvManifestWriter {
    /// Create a writer at the given path, creating parent directories.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let writer = open_csv(path.as_ref())?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one manifest entry.
    pub fn write_entry(&mut self, entry: &ManifestEntry) -> OutputResult<()> {
        let row = ManifestRow::from(entry);
        self.writer
            .serialize(&row)
            .map_err(|e| OutputError::CsvError(format!("failed to write entry: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Close the writer, syncing the file to disk.
    pub fn close(mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("failed to flush: {e}")))?;
        close_csv(self.writer)?;
        Ok(())
    }
}

/// Write a full dataset partition to one file; returns rows written.
pub fn write_dataset<'a, I>(path: &Path, records: I) -> OutputResult<u64>
where
    I: IntoIterator<Item = &'a DatasetRecord>,
{
    let mut writer = CsvDatasetWriter::new(path)?;
    writer.write_records(records)?;
    let rows = writer.rows_written();
    writer.close()?;
    info!(path = %path.display(), rows, "dataset written");
    Ok(rows)
}

/// Write the full failure manifest to one file; returns rows written.
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> OutputResult<u64> {
    let mut writer = CsvManifestWriter::new(path)?;
    for entry in entries {
        writer.write_entry(entry)?;
    }
    let rows = writer.rows_written();
    writer.close()?;
    info!(path = %path.display(), rows, "failure manifest written");
    Ok(rows)
}

fn open_csv(path: &Path) -> OutputResult<Writer<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::IoError(format!("failed to create directory: {e}")))?;
    }
    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("failed to create file: {e}")))?;
    let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
    Ok(Writer::from_writer(buf_writer))
}

fn close_csv(writer: Writer<BufWriter<File>>) -> OutputResult<()> {
    let buf_writer = writer
        .into_inner()
        .map_err(|e| OutputError::IoError(format!("failed to get inner writer: {e}")))?;
    let file = buf_writer
        .into_inner()
        .map_err(|e| OutputError::IoError(format!("failed to flush buffer: {e}")))?;
    file.sync_all()
        .map_err(|e| OutputError::IoError(format!("failed to sync file: {e}")))
}
