//! WOID assignment uploads.
//!
//! Spreadsheets arrive already parsed into rows of cells. The first row holds the
//! headers; an `address` column and a WOID column (`workOrderId`, `work_order_id` or
//! `woid`, case-insensitive) are required.

use crate::errors::ServiceError;
use crate::services::backend::{functions, mutation_as, BackendClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const ALLOWED_EXTENSIONS: &[&str] = &[".xlsx", ".xls", ".csv"];
pub const PREVIEW_ROWS: usize = 5;
/// How many backend errors a summary lists before collapsing the rest into a count.
pub const DISPLAYED_ERRORS: usize = 10;

const ADDRESS_HEADER: &str = "address";
const WOID_HEADERS: &[&str] = &["workorderid", "work_order_id", "woid"];

pub type Row = Vec<Value>;

/// Text of a cell the way a spreadsheet reader renders it. Empty cells are `""`.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_at(row: &[Value], index: usize) -> String {
    row.get(index).map(cell_text).unwrap_or_default().trim().to_string()
}

pub fn validate_extension(file_name: &str) -> Result<(), ServiceError> {
    let extension = file_name
        .rfind('.')
        .map(|i| file_name[i..].to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(
            "Please select a valid Excel file (.xlsx, .xls) or CSV file (.csv)".into(),
        ))
    }
}

/// Positions of the address and WOID columns in a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndexes {
    pub address: usize,
    pub work_order_id: usize,
}

pub fn locate_columns(header_row: &[Value]) -> Result<ColumnIndexes, ServiceError> {
    let headers: Vec<String> = header_row
        .iter()
        .map(|h| cell_text(h).trim().to_lowercase())
        .collect();

    let address = headers.iter().position(|h| h == ADDRESS_HEADER);
    let work_order_id = headers
        .iter()
        .position(|h| WOID_HEADERS.contains(&h.as_str()));

    match (address, work_order_id) {
        (Some(address), Some(work_order_id)) => Ok(ColumnIndexes {
            address,
            work_order_id,
        }),
        _ => Err(ServiceError::ValidationError(
            "File must have columns named 'address' and 'workOrderId' (or 'work_order_id' or 'woid')"
                .into(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub address: String,
    pub work_order_id: String,
}

/// Data rows with both cells present. Requires a header row and at least one data row.
pub fn extract_assignments(rows: &[Row]) -> Result<Vec<AssignmentRow>, ServiceError> {
    if rows.len() < 2 {
        return Err(ServiceError::ValidationError(
            "The file must have at least a header row and one data row".into(),
        ));
    }

    let columns = locate_columns(&rows[0])?;
    let assignments: Vec<AssignmentRow> = rows[1..]
        .iter()
        .filter_map(|row| {
            let address = cell_at(row, columns.address);
            let work_order_id = cell_at(row, columns.work_order_id);
            (!address.is_empty() && !work_order_id.is_empty()).then_some(AssignmentRow {
                address,
                work_order_id,
            })
        })
        .collect();

    if assignments.is_empty() {
        return Err(ServiceError::ValidationError(
            "No valid rows found in the file".into(),
        ));
    }
    Ok(assignments)
}

/// First data rows as they will be read, blanks included.
pub fn preview(rows: &[Row]) -> Result<Vec<AssignmentRow>, ServiceError> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ServiceError::ValidationError(
            "The file appears to be empty".into(),
        ));
    };
    let columns = locate_columns(header)?;

    Ok(data
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| AssignmentRow {
            address: cell_at(row, columns.address),
            work_order_id: cell_at(row, columns.work_order_id),
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[validate(length(min = 1, message = "file name is required"))]
    pub file_name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[validate(length(min = 1, message = "file name is required"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "a completing team is required"))]
    pub completing_team_id: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkInsertResult {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BulkInsertResult {
    /// The errors worth listing, plus how many more were left out.
    pub fn error_summary(&self) -> (&[String], usize) {
        let shown = self.errors.len().min(DISPLAYED_ERRORS);
        (&self.errors[..shown], self.errors.len() - shown)
    }
}

fn require_project(project_id: &str) -> Result<(), ServiceError> {
    if project_id.trim().is_empty() {
        return Err(ServiceError::ValidationError("a project is required".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UploadService {
    backend: Arc<dyn BackendClient>,
}

impl UploadService {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    pub fn preview(
        &self,
        project_id: &str,
        request: &PreviewRequest,
    ) -> Result<Vec<AssignmentRow>, ServiceError> {
        require_project(project_id)?;
        request.validate()?;
        validate_extension(&request.file_name)?;
        preview(&request.rows)
    }

    #[instrument(skip(self, request), fields(file = %request.file_name, rows = request.rows.len()))]
    pub async fn submit(
        &self,
        project_id: &str,
        request: &UploadRequest,
    ) -> Result<BulkInsertResult, ServiceError> {
        require_project(project_id)?;
        request.validate()?;
        validate_extension(&request.file_name)?;
        let assignments = extract_assignments(&request.rows)?;

        let result: BulkInsertResult = mutation_as(
            self.backend.as_ref(),
            functions::BULK_INSERT_ASSIGNMENTS,
            json!({
                "assignments": assignments,
                "projectId": project_id,
                "completingTeamId": request.completing_team_id,
            }),
        )
        .await?;

        info!(
            submitted = assignments.len(),
            created = result.created,
            updated = result.updated,
            failed = result.errors.len(),
            "assignment upload processed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::Mutex;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    #[rstest]
    #[case("assignments.xlsx")]
    #[case("legacy.XLS")]
    #[case("export.2024.csv")]
    fn accepts_spreadsheet_extensions(#[case] name: &str) {
        assert!(validate_extension(name).is_ok());
    }

    #[rstest]
    #[case("notes.txt")]
    #[case("xlsx")]
    #[case("archive.xlsx.zip")]
    fn rejects_other_extensions(#[case] name: &str) {
        assert_matches!(validate_extension(name), Err(ServiceError::ValidationError(_)));
    }

    #[rstest]
    #[case(json!(["Address", "WorkOrderId"]), 0, 1)]
    #[case(json!([" woid ", "notes", " ADDRESS"]), 2, 0)]
    #[case(json!(["work_order_id", "address"]), 1, 0)]
    fn locates_columns(#[case] header: Value, #[case] address: usize, #[case] woid: usize) {
        let header: Row = serde_json::from_value(header).unwrap();
        assert_eq!(
            locate_columns(&header).unwrap(),
            ColumnIndexes {
                address,
                work_order_id: woid
            }
        );
    }

    #[test]
    fn missing_woid_column_is_rejected() {
        let header = rows(json!([["address", "work order"]])).remove(0);
        assert_matches!(locate_columns(&header), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn extracts_rows_with_both_cells() {
        let sheet = rows(json!([
            ["Address", "WOID"],
            [" 12 Oak Ave ", 10045],
            ["", "W-2"],
            ["3 Elm St", "   "],
            ["4 Pine Rd", "W-4"],
            ["5 Birch Ln"]
        ]));
        let assignments = extract_assignments(&sheet).unwrap();
        assert_eq!(
            assignments,
            vec![
                AssignmentRow {
                    address: "12 Oak Ave".into(),
                    work_order_id: "10045".into()
                },
                AssignmentRow {
                    address: "4 Pine Rd".into(),
                    work_order_id: "W-4".into()
                },
            ]
        );
    }

    #[test]
    fn header_only_sheet_is_rejected() {
        let sheet = rows(json!([["address", "woid"]]));
        assert_matches!(
            extract_assignments(&sheet),
            Err(ServiceError::ValidationError(msg)) if msg.contains("header row")
        );
    }

    #[test]
    fn sheet_without_valid_rows_is_rejected() {
        let sheet = rows(json!([["address", "woid"], ["", ""], [null, "W-1"]]));
        assert_matches!(
            extract_assignments(&sheet),
            Err(ServiceError::ValidationError(msg)) if msg.contains("No valid rows")
        );
    }

    #[test]
    fn preview_keeps_blanks_and_stops_at_five() {
        let mut sheet = vec![vec![json!("address"), json!("woid")], vec![json!(""), json!("W-0")]];
        for i in 1..10 {
            sheet.push(vec![json!(format!("{i} Main St")), json!(format!("W-{i}"))]);
        }
        let preview = preview(&sheet).unwrap();
        assert_eq!(preview.len(), PREVIEW_ROWS);
        assert_eq!(preview[0].address, "");
        assert_eq!(preview[0].work_order_id, "W-0");
        assert_eq!(preview[4].work_order_id, "W-4");
    }

    #[test]
    fn preview_of_empty_sheet_is_rejected() {
        assert_matches!(preview(&[]), Err(ServiceError::ValidationError(_)));
        assert!(preview(&rows(json!([["address", "woid"]]))).unwrap().is_empty());
    }

    #[test]
    fn error_summary_collapses_overflow() {
        let result = BulkInsertResult {
            created: 1,
            updated: 0,
            errors: (0..13).map(|i| format!("row {i}")).collect(),
        };
        let (shown, hidden) = result.error_summary();
        assert_eq!(shown.len(), DISPLAYED_ERRORS);
        assert_eq!(hidden, 3);
    }

    struct RecordingBackend {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl BackendClient for RecordingBackend {
        async fn query(&self, _path: &str, _args: Value) -> Result<Value, ServiceError> {
            unreachable!()
        }

        async fn mutation(&self, path: &str, args: Value) -> Result<Value, ServiceError> {
            self.calls.lock().unwrap().push((path.to_string(), args));
            Ok(json!({ "created": 1, "updated": 1, "errors": ["row 4: duplicate"] }))
        }
    }

    #[tokio::test]
    async fn submit_sends_assignments_to_bulk_insert() {
        let backend = Arc::new(RecordingBackend {
            calls: Mutex::new(Vec::new()),
        });
        let service = UploadService::new(backend.clone());
        let request = UploadRequest {
            file_name: "woids.csv".into(),
            completing_team_id: "tf-splice".into(),
            rows: rows(json!([["woid", "address"], ["W-1", "1 Main St"], ["W-2", "2 Main St"]])),
        };

        let result = service.submit("proj-1", &request).await.unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(result.errors, vec!["row 4: duplicate".to_string()]);

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, functions::BULK_INSERT_ASSIGNMENTS);
        assert_eq!(
            calls[0].1,
            json!({
                "assignments": [
                    { "address": "1 Main St", "workOrderId": "W-1" },
                    { "address": "2 Main St", "workOrderId": "W-2" }
                ],
                "projectId": "proj-1",
                "completingTeamId": "tf-splice"
            })
        );
    }

    #[tokio::test]
    async fn submit_requires_completing_team() {
        let service = UploadService::new(Arc::new(RecordingBackend {
            calls: Mutex::new(Vec::new()),
        }));
        let request = UploadRequest {
            file_name: "woids.csv".into(),
            completing_team_id: String::new(),
            rows: rows(json!([["woid", "address"], ["W-1", "1 Main St"]])),
        };
        assert_matches!(
            service.submit("proj-1", &request).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn preview_requires_a_project() {
        let service = UploadService::new(Arc::new(RecordingBackend {
            calls: Mutex::new(Vec::new()),
        }));
        let request = PreviewRequest {
            file_name: "woids.xlsx".into(),
            rows: rows(json!([["woid", "address"], ["W-1", "1 Main St"]])),
        };
        assert_matches!(
            service.preview("  ", &request),
            Err(ServiceError::ValidationError(msg)) if msg.contains("project")
        );
        assert_eq!(service.preview("proj-1", &request).unwrap().len(), 1);
    }
}
