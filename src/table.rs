use std::path::Path;

use crate::error::{Result, ScoreError};

/// In-memory view of a delimited text file: one header row, string cells.
/// Scored documents legitimately contain commas, quotes and newlines, so
/// reading and writing follow RFC 4180 quoting.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ScoreError::Table(format!(
                    "row {i} has {} fields, expected {}",
                    row.len(),
                    headers.len()
                )));
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| {
            ScoreError::Table(format!(
                "no column named `{name}` (columns: {})",
                self.headers.join(", ")
            ))
        })
    }

    /// Cells of one named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Append a new column. The value count must match the row count.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if self.headers.iter().any(|h| h == name) {
            return Err(ScoreError::Table(format!("column `{name}` already exists")));
        }
        if values.len() != self.rows.len() {
            return Err(ScoreError::Table(format!(
                "column `{name}` has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn from_csv(text: &str) -> Result<Self> {
        let mut records = parse_csv(text)?;
        // Blank lines carry no record.
        records.retain(|r| !(r.len() == 1 && r[0].is_empty()));
        if records.is_empty() {
            return Err(ScoreError::Table("input has no header row".into()));
        }
        let headers = records.remove(0);
        Self::new(headers, records)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv(&std::fs::read_to_string(path)?)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(std::fs::write(path, self.to_csv())?)
    }
}

fn write_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains(['"', ',', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut chars = text.chars().peekable();
    let mut in_quotes = false;
    // True once the current record has any content, so a trailing newline
    // does not produce a phantom empty record.
    let mut pending = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                pending = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                pending = true;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                pending = false;
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                pending = false;
            }
            _ => {
                field.push(c);
                pending = true;
            }
        }
    }
    if in_quotes {
        return Err(ScoreError::Table("unterminated quoted field".into()));
    }
    if pending || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
