//! Spreadsheet export of the collected dataset.

use std::fs;
use std::path::{Path, PathBuf};

use ftclaw_harvester::{sentinel, LawRecord};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use crate::error::{PipelineError, Result};

pub const SHEET_NAME: &str = "FTC_Laws";

/// Rejection message when there is nothing to export.
pub const EMPTY_DATASET_MESSAGE: &str = "저장할 데이터가 없습니다.";

/// Header, width and whether the column is left-aligned.
const COLUMNS: [(&str, f64, bool); 9] = [
    ("법령명", 15.0, false),
    ("구분", 12.0, false),
    ("법령명_상세", 35.0, true),
    ("담당부서", 15.0, false),
    ("개정유형", 12.0, false),
    ("시행일", 15.0, false),
    ("개정정보", 20.0, true),
    ("개정일", 15.0, false),
    ("팝업페이지링크", 20.0, true),
];

pub fn headers() -> [&'static str; 9] {
    COLUMNS.map(|(name, _, _)| name)
}

/// One row per record in column order, empty values replaced with `-`.
pub fn export_rows(records: &[LawRecord]) -> Vec<[String; 9]> {
    records
        .iter()
        .map(|r| {
            [
                &r.category,
                &r.kind,
                &r.title,
                &r.department,
                &r.revision_type,
                &r.effective_date,
                &r.revision_info,
                &r.revision_date,
                &r.detail_link,
            ]
            .map(|value| cell(value))
        })
        .collect()
}

fn cell(value: &str) -> String {
    match value.trim() {
        "" => sentinel::DASH.to_string(),
        v => v.to_string(),
    }
}

/// Write `FTC_Laws_{timestamp}.xlsx` into `output_dir` and return its path.
#[tracing::instrument(skip(records), fields(records = records.len()))]
pub fn write_workbook(records: &[LawRecord], output_dir: &Path) -> Result<PathBuf> {
    if records.is_empty() {
        return Err(PipelineError::EmptyDataset(EMPTY_DATASET_MESSAGE.to_string()));
    }
    fs::create_dir_all(output_dir)?;

    let file_name = format!("FTC_Laws_{}.xlsx", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let path = output_dir.join(file_name);

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4F46E5))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let centered = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let left = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (name, width, _)) in (0u16..).zip(COLUMNS) {
        sheet.write_string_with_format(0, col, name, &header_format)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, values) in (1u32..).zip(export_rows(records)) {
        for (col, (value, (_, _, left_aligned))) in (0u16..).zip(values.iter().zip(COLUMNS)) {
            let format = if left_aligned { &left } else { &centered };
            sheet.write_string_with_format(row, col, value, format)?;
        }
    }

    workbook.save(&path)?;
    tracing::info!(path = %path.display(), "spreadsheet written");
    Ok(path)
}
