//! Minimal `.xlsx` reader: sheet names, shared strings and cell values.
//!
//! Styles are not read, so date cells arrive as Excel serial numbers.

use crate::utils::error::{EtlError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Empty | Cell::Error(_) => serde_json::Value::Null,
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Number(n) => serde_json::Value::from(*n),
            Cell::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Header text: strings trimmed, whole numbers without a fraction.
    pub fn as_header(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Empty | Cell::Error(_) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// Row-major; row `i` is spreadsheet row `i + 1`.
    pub rows: Vec<Vec<Cell>>,
}

pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Sheet>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| EtlError::spreadsheet("xl/workbook.xml missing, not an .xlsx file"))?;
    let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::new();
    for (position, (name, rel_id)) in parse_sheet_list(&workbook)?.into_iter().enumerate() {
        let part = rels
            .iter()
            .find(|(id, _)| *id == rel_id)
            .map(|(_, target)| resolve_target(target))
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", position + 1));

        match read_part(&mut archive, &part)? {
            Some(xml) => sheets.push(Sheet {
                rows: parse_sheet(&xml, &shared_strings)?,
                name,
            }),
            None => tracing::warn!("Sheet '{}' points to missing part {}", name, part),
        }
    }
    Ok(sheets)
}

fn xml_error<E: std::fmt::Display>(err: E) -> EtlError {
    EtlError::spreadsheet(format!("malformed XML: {}", err))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            Ok(Some(data))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let (mut in_item, mut in_text, mut in_phonetic) = (false, false, false);

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_item && !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(t) if in_text => current.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?) {
                    rels.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// `(sheet name, relationship id)` in workbook order.
fn parse_sheet_list(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?.unwrap_or_default();
                let rel_id = attr_value(&e, b"id")?.unwrap_or_default();
                sheets.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Sheet limits of the format itself; anything past them is a broken file.
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

/// `"AB12"` -> 27 (zero-based column).
fn column_index(cell_ref: &str) -> Result<Option<usize>> {
    let letters: Vec<u8> = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let mut number = 0usize;
    for b in letters {
        number = number * 26 + usize::from(b - b'A' + 1);
        if number > MAX_COLUMNS {
            return Err(EtlError::spreadsheet(format!(
                "cell reference {} is past the last column",
                cell_ref
            )));
        }
    }
    Ok(Some(number - 1))
}

fn row_index(cell_ref: &str) -> Option<usize> {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}

fn checked_row(row_number: usize) -> Result<usize> {
    if row_number > MAX_ROWS {
        return Err(EtlError::spreadsheet(format!(
            "row {} is past the last row",
            row_number
        )));
    }
    Ok(row_number)
}

/// Row number from an `r` attribute, else the one after `previous`.
fn next_row(attr: Option<String>, previous: usize) -> Result<usize> {
    match attr {
        Some(r) if !r.is_empty() && r.bytes().all(|b| b.is_ascii_digit()) => {
            checked_row(r.parse().unwrap_or(usize::MAX))
        }
        _ => checked_row(previous + 1),
    }
}

fn decode_cell(cell_type: Option<&str>, raw: &str, shared_strings: &[String]) -> Cell {
    match cell_type {
        Some("s") => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .map(|s| Cell::Text(s.clone()))
            .unwrap_or_else(|| Cell::Error(format!("bad shared string index {}", raw))),
        Some("inlineStr") | Some("str") | Some("d") => Cell::Text(raw.to_string()),
        Some("b") => Cell::Bool(raw.trim() == "1"),
        Some("e") => Cell::Error(raw.to_string()),
        _ if raw.trim().is_empty() => Cell::Empty,
        _ => raw
            .trim()
            .parse::<f64>()
            .map(Cell::Number)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
    }
}

fn place(row: &mut Vec<Cell>, column: usize, cell: Cell) -> Result<()> {
    if column >= MAX_COLUMNS {
        return Err(EtlError::spreadsheet(format!(
            "cell in column {} is past the last column",
            column + 1
        )));
    }
    if row.len() <= column {
        row.resize(column + 1, Cell::Empty);
    }
    row[column] = cell;
    Ok(())
}

fn parse_sheet(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<Cell>>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut row_number = 0usize;
    let mut column = 0usize;
    let mut cell_type: Option<String> = None;
    let mut value = String::new();
    let mut capture = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_number = next_row(attr_value(&e, b"r")?, row_number)?;
                    row = Vec::new();
                    column = 0;
                }
                b"c" => {
                    let cell_ref = attr_value(&e, b"r")?;
                    if let Some(r) = cell_ref.as_deref() {
                        column = column_index(r)?.unwrap_or(column);
                        if row_number == 0 {
                            row_number = checked_row(row_index(r).unwrap_or(1))?;
                        }
                    }
                    cell_type = attr_value(&e, b"t")?;
                    value.clear();
                }
                b"v" | b"t" => capture = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(r) = attr_value(&e, b"r")? {
                        column = column_index(&r)?.unwrap_or(column);
                    }
                    column += 1;
                }
                b"row" => {
                    row_number = next_row(attr_value(&e, b"r")?, row_number)?;
                }
                _ => {}
            },
            Event::Text(t) if capture => value.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(t) if capture => value.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    let cell = decode_cell(cell_type.as_deref(), &value, shared_strings);
                    place(&mut row, column, cell)?;
                    column += 1;
                }
                b"row" => {
                    let index = row_number.max(1) - 1;
                    if rows.len() <= index {
                        rows.resize(index + 1, Vec::new());
                    }
                    rows[index] = std::mem::take(&mut row);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn build_archive(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Maggio" sheetId="1" r:id="rId2"/><sheet name="Note" sheetId="2" r:id="rId1"/></sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
<si><t>Data</t></si>
<si><t>Vendita</t></si>
<si><r><t>Lampada </t></r><r><rPr><b/></rPr><t xml:space="preserve">&amp; paralume</t></r></si>
<si><t>SKU/EAN</t><rPh><t>ignored</t></rPh></si>
</sst>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="D1" t="s"><v>3</v></c></row>
<row r="3"><c r="A3"><v>45413</v></c><c r="B3"><v>19.9</v></c><c r="C3" t="s"><v>2</v></c><c r="D3" t="inlineStr"><is><t>800123</t></is></c><c r="E3" t="b"><v>1</v></c><c r="F3" t="str"><f>A1</f><v>calc</v></c></row>
</sheetData></worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    #[test]
    fn test_read_workbook_with_shared_strings() {
        let bytes = build_archive(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ]);

        let sheets = read_workbook(&bytes).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Maggio");
        assert_eq!(sheets[1].name, "Note");
        assert!(sheets[1].rows.is_empty());

        let rows = &sheets[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                Cell::Text("Data".to_string()),
                Cell::Text("Vendita".to_string()),
                Cell::Empty,
                Cell::Text("SKU/EAN".to_string()),
            ]
        );
        assert!(rows[1].is_empty());
        assert_eq!(rows[2][0], Cell::Number(45413.0));
        assert_eq!(rows[2][1], Cell::Number(19.9));
        assert_eq!(rows[2][2], Cell::Text("Lampada & paralume".to_string()));
        assert_eq!(rows[2][3], Cell::Text("800123".to_string()));
        assert_eq!(rows[2][4], Cell::Bool(true));
        assert_eq!(rows[2][5], Cell::Text("calc".to_string()));
    }

    #[test]
    fn test_missing_rels_falls_back_to_sheet_position() {
        let workbook = r#"<workbook><sheets><sheet name="Solo" sheetId="1" r:id="rId9"/></sheets></workbook>"#;
        let sheet = r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>Qta</t></is></c><c><v>3</v></c></row></sheetData></worksheet>"#;
        let bytes = build_archive(&[
            ("xl/workbook.xml", workbook),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let sheets = read_workbook(&bytes).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(
            sheets[0].rows,
            vec![vec![Cell::Text("Qta".to_string()), Cell::Number(3.0)]]
        );
    }

    #[test]
    fn test_not_a_workbook() {
        let bytes = build_archive(&[("hello.txt", "hi")]);
        assert!(matches!(
            read_workbook(&bytes),
            Err(EtlError::SpreadsheetError { .. })
        ));
        assert!(matches!(read_workbook(b"plain text"), Err(EtlError::ZipError(_))));
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1").unwrap(), Some(0));
        assert_eq!(column_index("Z9").unwrap(), Some(25));
        assert_eq!(column_index("AB12").unwrap(), Some(27));
        assert_eq!(column_index("XFD1").unwrap(), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("12").unwrap(), None);
        assert!(column_index("XFE1").is_err());
        assert_eq!(row_index("AB12"), Some(12));
    }

    fn single_sheet(sheet: &str) -> Vec<u8> {
        let workbook = r#"<workbook><sheets><sheet name="Big" sheetId="1"/></sheets></workbook>"#;
        build_archive(&[("xl/workbook.xml", workbook), ("xl/worksheets/sheet1.xml", sheet)])
    }

    #[test]
    fn test_huge_references_are_rejected() {
        let long_column = single_sheet(
            r#"<worksheet><sheetData><row r="1"><c r="AAAAAAAAAAAAAAAA1"><v>1</v></c></row></sheetData></worksheet>"#,
        );
        let far_row = single_sheet(
            r#"<worksheet><sheetData><row r="4000000000"><c><v>1</v></c></row></sheetData></worksheet>"#,
        );
        let empty_far_row = single_sheet(
            r#"<worksheet><sheetData><row r="1048577"/></sheetData></worksheet>"#,
        );

        for bytes in [long_column, far_row, empty_far_row] {
            assert!(matches!(
                read_workbook(&bytes),
                Err(EtlError::SpreadsheetError { .. })
            ));
        }
    }

    #[test]
    fn test_last_row_and_column_are_accepted() {
        let sheet = single_sheet(
            r#"<worksheet><sheetData><row r="3"><c r="XFD3"><v>7</v></c></row></sheetData></worksheet>"#,
        );
        let sheets = read_workbook(&sheet).unwrap();
        let rows = &sheets[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].len(), MAX_COLUMNS);
        assert_eq!(rows[2][MAX_COLUMNS - 1], Cell::Number(7.0));
    }

    #[test]
    fn test_cell_headers_and_json() {
        assert_eq!(Cell::Text("  Qta ".to_string()).as_header(), "Qta");
        assert_eq!(Cell::Number(2024.0).as_header(), "2024");
        assert_eq!(Cell::Number(1.5).to_json(), serde_json::json!(1.5));
        assert_eq!(Cell::Error("#DIV/0!".to_string()).to_json(), serde_json::Value::Null);
        assert!(Cell::Text("   ".to_string()).is_empty());
    }
}
