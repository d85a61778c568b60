// crates/core/src/report.rs
//! Requests for the three job kinds the report API runs.
//!
//! - upload: a zipped shapefile / FGDB of analysis units, inspected server-side
//! - report: a spreadsheet for a previous upload, a chosen attribute, and datasets
//! - summary unit: a spreadsheet for a predefined subwatershed or lease block

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;
use crate::jobs::JobPayload;

pub const UPLOAD_ENDPOINT: &str = "upload";
pub const REPORT_ENDPOINT: &str = "report";

const ZIP_MIME: &str = "application/zip";

// ── Upload ──────────────────────────────────────────────────────────────

/// A zipped boundary dataset to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Optional display name for the area of interest.
    pub name: Option<String>,
}

impl UploadRequest {
    /// Read a `.zip` file from disk.
    pub async fn from_path(path: &Path, name: Option<String>) -> Result<Self, RequestError> {
        let is_zip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if !is_zip {
            return Err(RequestError::NotZip {
                path: path.to_path_buf(),
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RequestError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());

        tracing::debug!(file_name = %file_name, size = bytes.len(), "Read upload file");
        Ok(Self {
            file_name,
            bytes,
            name,
        })
    }

    pub fn endpoint(&self) -> &'static str {
        UPLOAD_ENDPOINT
    }

    pub fn into_payload(self) -> JobPayload {
        let payload = JobPayload::new().file("file", self.file_name, self.bytes, ZIP_MIME);
        match self.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => payload.text("name", name),
            None => payload,
        }
    }
}

/// What the server learned from an uploaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    /// Tracks the upload between jobs.
    pub uuid: String,
    /// Number of features in the dataset.
    #[serde(default)]
    pub count: u64,
    /// Attributes that could identify analysis units, with their number of
    /// unique values. Empty for single-feature datasets.
    #[serde(default)]
    pub fields: BTreeMap<String, u64>,
    /// Datasets that overlap the uploaded areas.
    #[serde(default)]
    pub available_datasets: BTreeMap<String, bool>,
}

impl UploadSummary {
    /// Decode the `result` of a successful upload job.
    pub fn from_result(result: Value) -> Result<Self, RequestError> {
        serde_json::from_value(result).map_err(|e| RequestError::MalformedUploadResult(e.to_string()))
    }

    /// Check that `field` is one of the uploaded dataset's attributes.
    /// `None` means the areas are reported on as a whole.
    pub fn validate_attribute(&self, field: Option<&str>) -> Result<Option<String>, RequestError> {
        match field.map(str::trim).filter(|f| !f.is_empty()) {
            None => Ok(None),
            Some(field) if self.fields.contains_key(field) => Ok(Some(field.to_string())),
            Some(field) => Err(RequestError::UnknownAttribute {
                field: field.to_string(),
            }),
        }
    }

    /// All available datasets, selected.
    pub fn dataset_selection(&self) -> DatasetSelection {
        DatasetSelection::from_available(&self.available_datasets)
    }
}

// ── Dataset selection ───────────────────────────────────────────────────

/// Which datasets to include in a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSelection {
    available: BTreeMap<String, bool>,
    selected: BTreeMap<String, bool>,
}

impl DatasetSelection {
    /// Start with every available dataset selected.
    pub fn from_available(available: &BTreeMap<String, bool>) -> Self {
        Self {
            available: available.clone(),
            selected: available.clone(),
        }
    }

    /// Selection for callers that do not have an upload summary; every id is
    /// treated as available and selected.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let available: BTreeMap<String, bool> = ids.into_iter().map(|id| (id.into(), true)).collect();
        Self::from_available(&available)
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.available.get(id).copied().unwrap_or(false)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: &str, selected: bool) -> Result<(), RequestError> {
        if selected && !self.is_available(id) {
            return Err(RequestError::UnknownDataset { id: id.to_string() });
        }
        self.selected.insert(id.to_string(), selected);
        Ok(())
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, RequestError> {
        let next = !self.is_selected(id);
        self.set(id, next)?;
        Ok(next)
    }

    /// Apply several changes at once; nothing changes if any one fails.
    pub fn update<'a, I>(&mut self, changes: I) -> Result<(), RequestError>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut next = self.clone();
        for (id, selected) in changes {
            next.set(id, selected)?;
        }
        *self = next;
        Ok(())
    }

    /// Select exactly `ids`.
    pub fn only<'a, I>(&mut self, ids: I) -> Result<(), RequestError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut next = self.clone();
        next.selected.values_mut().for_each(|v| *v = false);
        for id in ids {
            next.set(id, true)?;
        }
        *self = next;
        Ok(())
    }

    pub fn selected_ids(&self) -> Vec<&str> {
        self.selected
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Comma-delimited ids, as the report endpoint expects.
    pub fn to_param(&self) -> String {
        self.selected_ids().join(",")
    }
}

// ── Report ──────────────────────────────────────────────────────────────

/// A report for a previously uploaded dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub uuid: String,
    pub datasets: DatasetSelection,
    /// Attribute that identifies analysis units; `None` reports all areas
    /// together.
    pub field: Option<String>,
    pub name: Option<String>,
}

impl ReportRequest {
    pub fn new(uuid: impl Into<String>, datasets: DatasetSelection) -> Result<Self, RequestError> {
        if datasets.selected_ids().is_empty() {
            return Err(RequestError::NoDatasetsSelected);
        }
        Ok(Self {
            uuid: uuid.into(),
            datasets,
            field: None,
            name: None,
        })
    }

    pub fn with_field(mut self, field: Option<String>) -> Self {
        self.field = field.filter(|f| !f.is_empty());
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn endpoint(&self) -> &'static str {
        REPORT_ENDPOINT
    }

    pub fn into_payload(self) -> JobPayload {
        let mut payload = JobPayload::new()
            .text("uuid", self.uuid)
            .text("datasets", self.datasets.to_param());
        if let Some(field) = self.field {
            payload = payload.text("field", field);
        }
        if let Some(name) = self.name {
            payload = payload.text("name", name);
        }
        payload
    }
}

// ── Summary units ───────────────────────────────────────────────────────

/// Predefined analysis units with ready-made reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryUnitType {
    Subwatershed,
    MarineLeaseBlock,
}

impl SummaryUnitType {
    pub fn path_segment(&self) -> &'static str {
        match self {
            SummaryUnitType::Subwatershed => "huc12",
            SummaryUnitType::MarineLeaseBlock => "marine_blocks",
        }
    }

    /// Job endpoint for the report on unit `id`. Takes no payload.
    pub fn endpoint(&self, id: &str) -> String {
        format!("reports/{}/{}", self.path_segment(), urlencoding::encode(id))
    }
}

impl fmt::Display for SummaryUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryUnitType::Subwatershed => f.write_str("subwatershed"),
            SummaryUnitType::MarineLeaseBlock => f.write_str("marine lease block"),
        }
    }
}

impl FromStr for SummaryUnitType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "subwatershed" | "huc12" => Ok(SummaryUnitType::Subwatershed),
            "marine lease block" | "marine blocks" => Ok(SummaryUnitType::MarineLeaseBlock),
            _ => Err(RequestError::UnknownSummaryUnit(s.to_string())),
        }
    }
}
