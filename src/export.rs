//! Excel export functionality.

use crate::error::Result;
use crate::models::{AttendanceAnalysis, RecapEntry};
use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

/// Header row plus widths, one entry per column.
fn write_headers(worksheet: &mut Worksheet, columns: &[(&str, f64)]) -> std::result::Result<(), XlsxError> {
    let format = header_format();
    for (col, (header, width)) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &format)?;
        worksheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

fn finish_sheet(worksheet: &mut Worksheet, rows: usize, columns: usize) -> std::result::Result<(), XlsxError> {
    // Autofilter
    if rows > 0 {
        worksheet.autofilter(0, 0, rows as u32, (columns - 1) as u16)?;
    }

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Export the daily analysis: one row per employee-day.
pub fn export_analysis_to_excel(data: &[AttendanceAnalysis], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Daily Attendance")?;

    let columns = [
        ("Employee ID", 14.0),
        ("Name", 28.0),
        ("Date", 12.0),
        ("Status", 22.0),
        ("First Log", 10.0),
        ("Last Log", 10.0),
        ("Lateness (min)", 14.0),
        ("Work (min)", 12.0),
        ("Comments", 60.0),
    ];
    write_headers(worksheet, &columns)?;

    let late_format = Format::new().set_font_color(Color::RGB(0xC00000));

    for (idx, record) in data.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &record.employee_id)?;
        worksheet.write_string(row, 1, &record.name)?;
        worksheet.write_string(row, 2, record.date.to_string())?;
        worksheet.write_string(row, 3, record.status.label())?;
        worksheet.write_string(row, 4, record.first_log.map(|t| t.to_string()).unwrap_or_default())?;
        worksheet.write_string(row, 5, record.last_log.map(|t| t.to_string()).unwrap_or_default())?;
        if record.is_late {
            worksheet.write_number_with_format(row, 6, record.lateness_minutes, &late_format)?;
        } else {
            worksheet.write_number(row, 6, record.lateness_minutes)?;
        }
        worksheet.write_number(row, 7, record.work_duration_minutes)?;
        worksheet.write_string(row, 8, record.comments.join(" | "))?;
    }

    finish_sheet(worksheet, data.len(), columns.len())?;

    workbook.save(path)?;
    Ok(())
}

/// Export the payroll recap: one row per employee.
pub fn export_recap_to_excel(data: &[RecapEntry], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Payroll Recap")?;

    let columns = [
        ("Employee ID", 14.0),
        ("Name", 28.0),
        ("Worked", 9.0),
        ("Late (min)", 11.0),
        ("Unauthorized", 13.0),
        ("Authorized", 11.0),
        ("Incomplete", 11.0),
        ("Meetings", 10.0),
        ("Deduction", 12.0),
        ("Compliant", 10.0),
        ("Late Details", 50.0),
    ];
    write_headers(worksheet, &columns)?;

    // Number format for amounts
    let amount_format = Format::new().set_num_format("0.00");

    for (idx, entry) in data.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &entry.employee_id)?;
        worksheet.write_string(row, 1, &entry.name)?;
        worksheet.write_number(row, 2, entry.worked)?;
        worksheet.write_number(row, 3, entry.late_cumul_minutes)?;
        worksheet.write_number(row, 4, entry.abs_unauthorized)?;
        worksheet.write_number(row, 5, entry.abs_authorized)?;
        worksheet.write_number(row, 6, entry.incomplete)?;
        worksheet.write_number(row, 7, entry.meetings)?;
        worksheet.write_number_with_format(row, 8, entry.deduction, &amount_format)?;
        worksheet.write_string(row, 9, if entry.is_compliant { "Yes" } else { "No" })?;
        worksheet.write_string(row, 10, entry.late_details.join(", "))?;
    }

    finish_sheet(worksheet, data.len(), columns.len())?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::models::{AttendanceStatus, ClockTime};
    use chrono::NaiveDate;

    fn sample() -> Vec<AttendanceAnalysis> {
        vec![AttendanceAnalysis {
            employee_id: "E1".to_string(),
            name: "Alice".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            status: AttendanceStatus::Present,
            first_log: ClockTime::from_hm(9, 10),
            last_log: ClockTime::from_hm(17, 30),
            lateness_minutes: 40,
            is_late: true,
            work_duration_minutes: 500,
            comments: vec!["late".to_string()],
        }]
    }

    #[test]
    fn test_export_filename() {
        let name = generate_export_filename("recap");
        assert!(name.starts_with("recap_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "recap_".len() + 15 + ".xlsx".len());
    }

    #[test]
    fn test_exports_write_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let analyses = sample();

        let daily = dir.path().join("daily.xlsx");
        export_analysis_to_excel(&analyses, &daily).unwrap();
        assert!(std::fs::metadata(&daily).unwrap().len() > 0);

        let recap = dir.path().join("recap.xlsx");
        export_recap_to_excel(&aggregate(&analyses), &recap).unwrap();
        assert!(std::fs::metadata(&recap).unwrap().len() > 0);

        let empty = dir.path().join("empty.xlsx");
        export_recap_to_excel(&[], &empty).unwrap();
        assert!(empty.exists());
    }
}
