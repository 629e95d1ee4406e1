// Reading count sheets from disk into raw rows.
//
// Workbooks (first sheet only), CSV exports and JSON arrays are supported.
// This is the only place that touches the filesystem for input; the rows it
// returns still carry the source headers and untyped cells.
use crate::error::{ReportError, ReportResult};
use crate::types::{CellValue, RawRow};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub skipped_blank_rows: usize,
    /// Worksheet the rows came from, for workbook inputs.
    pub sheet: Option<String>,
}

/// Load every non-blank row of `path`, choosing the reader by extension.
pub fn load_rows(path: &Path) -> ReportResult<(Vec<RawRow>, LoadReport)> {
    if !path.exists() {
        return Err(ReportError::FileNotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let (rows, report) = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path)?,
        "csv" => load_csv(std::fs::File::open(path)?)?,
        "json" => load_json(std::fs::File::open(path)?)?,
        _ => return Err(ReportError::UnsupportedFormat(ext)),
    };
    info!(
        path = %path.display(),
        rows = rows.len(),
        skipped = report.skipped_blank_rows,
        "loaded count sheet"
    );
    Ok((rows, report))
}

pub fn load_workbook(path: &Path) -> ReportResult<(Vec<RawRow>, LoadReport)> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReportError::Spreadsheet(e.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::Spreadsheet("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ReportError::Spreadsheet(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .ok_or(ReportError::MissingHeader)?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    debug!(sheet = %sheet, columns = headers.len(), "reading worksheet");

    let mut report = LoadReport {
        sheet: Some(sheet),
        ..LoadReport::default()
    };
    let mut rows = Vec::new();
    for data_row in rows_iter {
        report.total_rows += 1;
        let row: RawRow = headers
            .iter()
            .zip(data_row.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, cell)| (h.clone(), cell_from_sheet(cell)))
            .collect();
        push_unless_blank(&mut rows, row, &mut report);
    }
    Ok((rows, report))
}

/// Workbook cell → loose cell. Dates stay as serial numbers so they go
/// through the same date parser as any other serial.
fn cell_from_sheet(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// CSV exports carry text only. Spanish-locale exports usually separate
/// columns with `;`, so the delimiter is sniffed from the header line.
pub fn load_csv<R: Read>(mut reader: R) -> ReportResult<(Vec<RawRow>, LoadReport)> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    let header_line = raw.lines().next().unwrap_or("");
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReportError::MissingHeader);
    }

    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        report.total_rows += 1;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), CellValue::Text(v.to_string())))
            .collect();
        push_unless_blank(&mut rows, row, &mut report);
    }
    Ok((rows, report))
}

/// JSON input is an array of objects, one per row.
pub fn load_json<R: Read>(reader: R) -> ReportResult<(Vec<RawRow>, LoadReport)> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_reader(reader)?;
    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    for record in records {
        report.total_rows += 1;
        let row: RawRow = record
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), CellValue::from(v)))
            .collect();
        push_unless_blank(&mut rows, row, &mut report);
    }
    Ok((rows, report))
}

fn push_unless_blank(rows: &mut Vec<RawRow>, row: RawRow, report: &mut LoadReport) {
    if row.values().all(CellValue::is_blank) {
        report.skipped_blank_rows += 1;
    } else {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const SAMPLE_CSV: &str = "\
Fecha Doc;Almacén;Artículo;Stock a Fecha;Stock Inventario;Variación Stock;Cobro;Estado
01/03/2024;Sede Norte;Whisky;100;98;-2;$150.000;Faltante
;;;;;;;
02/03/2024;Sede Sur;Solomito;50;51;1;0;Sobrante
";

    #[test]
    fn csv_with_semicolons() {
        let (rows, report) = load_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.skipped_blank_rows, 1);
        assert_eq!(rows[0]["Almacén"], CellValue::Text("Sede Norte".into()));
        assert_eq!(rows[1]["Cobro"], CellValue::Text("0".into()));
    }

    #[test]
    fn csv_with_commas_and_bom() {
        let data = "\u{feff}Almacén,Artículo,Cobro\nNorte,Sal,\"$1.234,56\"\n";
        let (rows, _) = load_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Cobro"], CellValue::Text("$1.234,56".into()));
        assert!(rows[0].contains_key("Almacén"));
    }

    #[test]
    fn json_rows_keep_native_types() {
        let data = r#"[
            {"Almacén": "Sede Central", "Stock a Fecha": 200, "Cobro": null, "Fecha Doc": 45016},
            {}
        ]"#;
        let (rows, report) = load_json(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.skipped_blank_rows, 1);
        assert_eq!(rows[0]["Stock a Fecha"], CellValue::Number(200.0));
        assert_eq!(rows[0]["Cobro"], CellValue::Empty);
    }

    #[test]
    fn load_rows_dispatches_on_extension() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();
        let (rows, _) = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = load_rows(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(ext) if ext == "txt"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_rows(Path::new("/no/such/conteo.xlsx")).unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound(_)));
    }

    #[test]
    fn broken_workbook_is_a_spreadsheet_error() {
        let mut file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"not a zip archive").unwrap();
        let err = load_rows(file.path()).unwrap_err();
        assert!(matches!(err, ReportError::Spreadsheet(_)));
    }
}
