//! Assembly document parser.

use super::writer::write_atomic;
use super::{AssemblyDocument, AssemblyError, Result};
use crate::contig::{Contig, ContigId, OrientedContig, Scaffold};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A line-oriented assembly document reader.
pub struct AssemblyReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl AssemblyReader<File> {
    /// Open an assembly file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> AssemblyReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the whole document.
    ///
    /// Blank lines are skipped. Scaffold tokens that are not non-zero integers
    /// are logged and dropped; malformed header lines are fatal.
    pub fn read_document(mut self) -> Result<AssemblyDocument> {
        let mut headers: Vec<(u32, Contig, usize)> = Vec::new();
        let mut scaffolds = Vec::new();

        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                break;
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                let (order, contig) = self.parse_header(header)?;
                headers.push((order, contig, self.line_number));
            } else {
                let scaffold = self.parse_scaffold(line);
                if !scaffold.is_empty() {
                    scaffolds.push(scaffold);
                }
            }
        }

        let contigs = order_headers(headers)?;
        AssemblyDocument::new(contigs, scaffolds)
    }

    fn parse_header(&self, header: &str) -> Result<(u32, Contig)> {
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(AssemblyError::Parse {
                line: self.line_number,
                message: format!("Expected `>name order length`, got {} fields", fields.len()),
            });
        }

        // The sign of a header order carries no meaning.
        let order = fields[1]
            .parse::<i64>()
            .ok()
            .and_then(|v| u32::try_from(v.unsigned_abs()).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| AssemblyError::Parse {
                line: self.line_number,
                message: format!("Invalid contig order: '{}'", fields[1]),
            })?;

        let length: u64 = fields[2]
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| AssemblyError::Parse {
                line: self.line_number,
                message: format!("Invalid contig length: '{}'", fields[2]),
            })?;

        Ok((order, Contig::new(fields[0], length)))
    }

    fn parse_scaffold(&self, line: &str) -> Scaffold {
        let mut entries = Vec::new();
        for token in line.split_whitespace() {
            match OrientedContig::parse_signed(token) {
                Some(entry) => entries.push(entry),
                None => warn!(
                    line = self.line_number,
                    token, "skipping malformed scaffold entry"
                ),
            }
        }
        Scaffold::new(entries)
    }
}

/// Place header entries into a table indexed by order, checking that the
/// orders are exactly `1..=N`.
fn order_headers(headers: Vec<(u32, Contig, usize)>) -> Result<Vec<Contig>> {
    let count = headers.len();
    let mut slots: Vec<Option<Contig>> = vec![None; count];

    for (order, contig, line) in headers {
        let slot = match ContigId::new(order) {
            Some(id) if id.index() < count => &mut slots[id.index()],
            _ => {
                return Err(AssemblyError::Parse {
                    line,
                    message: format!("Contig order {} exceeds contig count {}", order, count),
                })
            }
        };
        if slot.is_some() {
            return Err(AssemblyError::DuplicateId(order));
        }
        *slot = Some(contig);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.ok_or(AssemblyError::MissingId(idx as u32 + 1)))
        .collect()
}

/// Read an assembly document from a file.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<AssemblyDocument> {
    AssemblyReader::from_path(path)?.read_document()
}

/// Parse an assembly document from a string (useful for testing).
pub fn parse_document(content: &str) -> Result<AssemblyDocument> {
    AssemblyReader::new(content.as_bytes()).read_document()
}

impl AssemblyDocument {
    /// Read a document from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_document(path)
    }
}

/// Default output path for [`remove_blank_lines`]: the file stem up to its
/// first `.`, suffixed with `_corrected.assembly`, in the same directory.
pub fn corrected_path(raw: &Path) -> PathBuf {
    let file_name = raw
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    raw.with_file_name(format!("{}_corrected.assembly", stem))
}

/// Copy an assembly file without its blank lines.
///
/// This works on raw text, so it also repairs files that do not parse yet.
/// Returns the path written.
pub fn remove_blank_lines(raw: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let target = output.map_or_else(|| corrected_path(raw), Path::to_path_buf);
    let reader = BufReader::new(File::open(raw)?);

    let mut kept = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            kept.push(line);
        }
    }

    write_atomic(&target, |out| {
        for line in &kept {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contig::Orientation;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_document() {
        let doc = parse_document(">A 1 100\n>B 2 50\n1 -2\n").unwrap();
        assert_eq!(doc.index().len(), 2);
        assert_eq!(doc.scaffolds().len(), 1);
        assert_eq!(doc.scaffolds()[0].entries[1].orientation, Orientation::Reverse);
    }

    #[test]
    fn test_headers_in_any_order() {
        let doc = parse_document(">B 2 50\n>A 1 100\n2 1\n").unwrap();
        let first = doc.contig(ContigId::new(1).unwrap()).unwrap();
        assert_eq!(first.name(), "A");
        assert_eq!(doc.locate_by_name("A").unwrap().span.start, 50);
    }

    #[test]
    fn test_blank_lines_and_bad_tokens_skipped() {
        let doc = parse_document(">A 1 100\n>B 2 50\n\n1 x 0\n\n2\n").unwrap();
        assert_eq!(doc.scaffolds().len(), 2);
        assert_eq!(doc.scaffolds()[0].len(), 1);
    }

    #[test]
    fn test_malformed_header() {
        let err = parse_document(">A 1\n1\n").unwrap_err();
        assert!(matches!(err, AssemblyError::Parse { line: 1, .. }));

        let err = parse_document(">A 1 zero\n1\n").unwrap_err();
        assert!(matches!(err, AssemblyError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_order_gaps_and_duplicates() {
        assert!(matches!(
            parse_document(">A 1 10\n>B 1 10\n1\n"),
            Err(AssemblyError::DuplicateId(1))
        ));
        assert!(matches!(
            parse_document(">A 1 10\n>B 3 10\n1\n"),
            Err(AssemblyError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_scaffold_reference() {
        let err = parse_document(">A 1 10\n1 2\n").unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownContig(_)));
    }

    #[test]
    fn test_contig_placed_twice() {
        let err = parse_document(">A 1 10\n>B 2 20\n1 2 1\n").unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicatePlacement(ref name) if name == "A"));

        let err = parse_document(">A 1 10\n>B 2 20\n1 2\n-1\n").unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicatePlacement(_)));
    }

    #[test]
    fn test_remove_blank_lines() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("sample.0.assembly");
        fs::write(&raw, ">A 1 10\n\n>B 2 10\n   \n1 2\n\n").unwrap();

        let written = remove_blank_lines(&raw, None).unwrap();
        assert_eq!(written, dir.path().join("sample_corrected.assembly"));
        assert_eq!(fs::read_to_string(&written).unwrap(), ">A 1 10\n>B 2 10\n1 2\n");
    }
}
