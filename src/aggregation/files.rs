use crate::models::{FileRecord, Millis};
use serde::Serialize;

const IMAGE_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp"];

pub const UNNAMED_FILE: &str = "Unnamed File";

/// Whether a file should be shown inline as an image.
///
/// A MIME type mentioning "image" wins; otherwise the extension decides.
pub fn is_image(name: &str, file_type: Option<&str>) -> bool {
    if file_type.is_some_and(|kind| kind.contains("image")) {
        return true;
    }
    let name = name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub kind: FileKind,
    /// Images open in a viewer and carry an empty link when none is stored;
    /// documents fall back to `#`.
    pub link: String,
    pub created_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
}

impl From<&FileRecord> for FileView {
    fn from(file: &FileRecord) -> Self {
        let raw_name = file.name.as_deref().unwrap_or_default();
        let kind = if is_image(raw_name, file.file_type.as_deref()) {
            FileKind::Image
        } else {
            FileKind::Document
        };
        let fallback = match kind {
            FileKind::Image => "",
            FileKind::Document => "#",
        };

        FileView {
            id: file.id.clone(),
            name: if raw_name.is_empty() {
                UNNAMED_FILE.to_string()
            } else {
                raw_name.to_string()
            },
            kind,
            link: file.link().unwrap_or(fallback).to_string(),
            created_at: file.creation_time,
            work_order_id: file.woid().map(str::to_string),
        }
    }
}

pub fn file_views(files: &[FileRecord]) -> Vec<FileView> {
    files.iter().map(FileView::from).collect()
}
