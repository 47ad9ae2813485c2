// src/core/csv.rs
//
// Delimited tables: quote/CRLF tolerant reader, minimal-quoting writer.
// Files are UTF-8; a leading byte-order mark is accepted and, on write, emitted.

use std::io::{self, Write};
use std::mem::take;

pub const BOM: char = '\u{feff}';
pub const COMMA: char = ',';

/// Header plus body rows. Rows may be ragged; readers must not assume width.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self { header, rows: Vec::new() }
    }

    /// First row becomes the header. Empty text gives an empty table.
    pub fn parse(text: &str, sep: char) -> Self {
        let mut rows = parse_rows(text, sep);
        if rows.is_empty() {
            return Self::default();
        }
        let mut header = rows.remove(0);
        for h in header.iter_mut() {
            *h = h.trim().to_string();
        }
        Self { header, rows }
    }

    pub fn header_index(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.header.iter().position(|h| pred(h))
    }

    pub fn render(&self, sep: char, with_bom: bool) -> String {
        let mut buf: Vec<u8> = Vec::new();
        if with_bom {
            let mut tmp = [0u8; 4];
            buf.extend_from_slice(BOM.encode_utf8(&mut tmp).as_bytes());
        }
        let _ = write_row(&mut buf, &self.header, sep);
        for r in &self.rows {
            let _ = write_row(&mut buf, r, sep);
        }
        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
        }
    }
}

/* ---------------- Parsing ---------------- */

/// Split text into rows of fields. Blank lines are skipped; an unterminated
/// quote swallows the rest of the input into its field.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = Vec::new();
    let mut field = s!();
    let mut row: Vec<String> = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                end_row(&mut row, &mut rows);
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        end_row(&mut row, &mut rows);
    }
    rows
}

fn end_row(row: &mut Vec<String>, rows: &mut Vec<Vec<String>>) {
    if row.len() == 1 && row[0].is_empty() {
        row.clear();
    } else {
        rows.push(take(row));
    }
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_and_handles_crlf() {
        let t = Table::parse("\u{feff}category_no,2024-01-01T00:00:00Z\r\n00000001,5\r\n", COMMA);
        assert_eq!(t.header, row!["category_no", "2024-01-01T00:00:00Z"]);
        assert_eq!(t.rows, vec![row!["00000001", "5"]]);
    }

    #[test]
    fn quoted_fields_keep_separators_and_quotes() {
        let rows = parse_rows("a,\"b,\"\"c\"\"\nd\",e\n", COMMA);
        assert_eq!(rows, vec![row!["a", "b,\"c\"\nd", "e"]]);
    }

    #[test]
    fn skips_blank_lines_and_keeps_trailing_row() {
        let rows = parse_rows("a,b\n\n\nc,d", COMMA);
        assert_eq!(rows, vec![row!["a", "b"], row!["c", "d"]]);
    }

    #[test]
    fn empty_trailing_cells_survive() {
        let rows = parse_rows("k,,\n", COMMA);
        assert_eq!(rows, vec![row!["k", "", ""]]);
    }

    #[test]
    fn render_then_parse_preserves_awkward_cells() {
        let mut t = Table::new(row!["name", "note"]);
        t.rows.push(row!["x,y", "say \"hi\""]);
        let text = t.render(COMMA, true);
        assert!(text.starts_with(BOM));
        assert_eq!(Table::parse(&text, COMMA), t);
    }
}
