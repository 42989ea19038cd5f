#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};

pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn sheet_xml(rows: &[Vec<Cell<'_>>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Text(s) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref,
                    escape(s)
                )),
                Cell::Number(n) => xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, n)),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Builds an `.xlsx` with inline strings, one part per sheet.
pub fn workbook(sheets: &[(&str, Vec<Vec<Cell<'_>>>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut sheet_list = String::new();
    let mut rels = String::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        sheet_list.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(name),
            i + 1,
            i + 1
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }

    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
            sheet_list
        )
        .as_bytes(),
    )
    .unwrap();

    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        )
        .as_bytes(),
    )
    .unwrap();

    for (i, (_, rows)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(sheet_xml(rows).as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Excel serial for 2024-05-01.
pub const MAY_FIRST_2024: f64 = 45413.0;

/// A typical monthly export: header row, then one row per sale.
pub fn sales_sheet<'a>(rows: &[(f64, &'a str, f64, f64, f64)]) -> Vec<Vec<Cell<'a>>> {
    let mut sheet = vec![vec![
        Cell::Text("Data"),
        Cell::Text("SKU/EAN"),
        Cell::Text("Prodotto"),
        Cell::Text("Qta"),
        Cell::Text("Vendita"),
        Cell::Text("Acquisto"),
        Cell::Text("C. Market"),
    ]];
    for (serial, sku, sale, purchase, commission) in rows {
        sheet.push(vec![
            Cell::Number(*serial),
            Cell::Text(sku),
            Cell::Text("Articolo"),
            Cell::Number(1.0),
            Cell::Number(*sale),
            Cell::Number(*purchase),
            Cell::Number(*commission),
        ]);
    }
    sheet
}
