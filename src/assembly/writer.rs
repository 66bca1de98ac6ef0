//! Assembly document serialisation and atomic persistence.

use super::{AssemblyDocument, Result};
use crate::contig::{ContigId, Scaffold};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Buffered writer for the assembly text format.
///
/// Integers are formatted with itoa to avoid per-field allocation.
pub struct AssemblyWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> AssemblyWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(256 * 1024, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write one `>name order length` header line.
    pub fn write_header(&mut self, name: &str, id: ContigId, length: u64) -> io::Result<()> {
        self.writer.write_all(b">")?;
        self.writer.write_all(name.as_bytes())?;
        self.writer.write_all(b" ")?;
        self.writer.write_all(self.itoa_buf.format(id.get()).as_bytes())?;
        self.writer.write_all(b" ")?;
        self.writer.write_all(self.itoa_buf.format(length).as_bytes())?;
        self.writer.write_all(b"\n")
    }

    /// Write one scaffold line of signed orders.
    pub fn write_scaffold(&mut self, scaffold: &Scaffold) -> io::Result<()> {
        for (i, entry) in scaffold.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b" ")?;
            }
            self.writer
                .write_all(self.itoa_buf.format(entry.signed()).as_bytes())?;
        }
        self.writer.write_all(b"\n")
    }

    /// Write a whole document: headers in order, then scaffolds.
    pub fn write_document(&mut self, doc: &AssemblyDocument) -> io::Result<()> {
        for (id, contig) in doc.index().contigs() {
            self.write_header(contig.name(), id, contig.length)?;
        }
        for scaffold in doc.scaffolds() {
            self.write_scaffold(scaffold)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Serialise a document to any writer.
pub fn write_document<W: Write>(output: W, doc: &AssemblyDocument) -> io::Result<()> {
    let mut writer = AssemblyWriter::new(output);
    writer.write_document(doc)?;
    writer.flush()
}

/// Replace `path` with the bytes produced by `fill`, atomically.
///
/// The content goes to a temporary file in the same directory, which is then
/// renamed over `path`. If `fill` fails the temporary file is discarded and
/// `path` keeps its previous content.
pub fn write_atomic<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        fill(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl AssemblyDocument {
    /// Render the document in the assembly text format.
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = write_document(&mut buf, self);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Persist the document at `path`, replacing any previous file whole.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_atomic(path.as_ref(), |out| write_document(out, self))?;
        Ok(())
    }
}
