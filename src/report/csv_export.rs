use std::io::Write;

use super::inr::format_optional_inr;
use super::{ReportError, headers, report_lines};
use crate::core::Projection;

/// Prepended so spreadsheet tools detect UTF-8 (the headers carry `₹`).
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CsvStyle {
    /// Plain numbers; cells outside a window are left empty.
    #[default]
    Raw,
    /// Indian-grouped rupee strings; cells outside a window hold `-`.
    Currency,
}

pub fn write_csv<W: Write>(
    projection: &Projection,
    style: CsvStyle,
    mut out: W,
) -> Result<(), ReportError> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(headers(projection))?;
    for line in report_lines(projection) {
        let mut record = Vec::with_capacity(line.amounts.len() + 1);
        record.push(line.year.to_string());
        for amount in line.amounts {
            record.push(match style {
                CsvStyle::Raw => amount.map(|v| v.to_string()).unwrap_or_default(),
                CsvStyle::Currency => format_optional_inr(amount),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn csv_bytes(projection: &Projection, style: CsvStyle) -> Result<Vec<u8>, ReportError> {
    let mut buf = Vec::new();
    write_csv(projection, style, &mut buf)?;
    Ok(buf)
}
