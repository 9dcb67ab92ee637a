//! JSON-lines export of the forward index.
//!
//! The stream is one header record, one record per entry in key order, and a
//! trailing summary:
//!
//! ```text
//! {"type":"header","format":"twowaykv","version":1}
//! {"type":"entry","key":"testingKey","value":4242}
//! {"type":"summary","entries":1}
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::info;
use twowaykv_storage::{Cursor, StorageEngine, Transaction};

use crate::codec::{decode_key, decode_value};
use crate::entry::Entry;
use crate::error::Result;
use crate::index::{tables, BidirectionalIndex};

/// Format name written in the header.
pub const EXPORT_FORMAT: &str = "twowaykv";

/// Current export format version.
pub const EXPORT_VERSION: u32 = 1;

/// One line of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportRecord {
    /// First line of every export.
    Header {
        /// Always [`EXPORT_FORMAT`].
        format: String,
        /// Format version.
        version: u32,
    },
    /// A stored entry.
    Entry {
        /// The entry's key.
        key: String,
        /// The entry's value.
        value: u64,
    },
    /// Last line of a complete export.
    Summary {
        /// Number of entry records written.
        entries: u64,
    },
}

/// Counters reported after an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStatistics {
    /// Entry records written.
    pub entries: u64,
    /// Bytes written, including newlines.
    pub bytes: u64,
}

/// Writes export records to an output stream, one JSON document per line.
pub struct ExportWriter<W: Write> {
    writer: W,
    statistics: ExportStatistics,
}

impl<W: Write> ExportWriter<W> {
    /// Create a new export writer.
    pub fn new(writer: W) -> Self {
        Self { writer, statistics: ExportStatistics::default() }
    }

    /// Write the header. Must be the first record.
    pub fn write_header(&mut self) -> Result<()> {
        self.write_record(&ExportRecord::Header {
            format: EXPORT_FORMAT.to_string(),
            version: EXPORT_VERSION,
        })
    }

    /// Write an entry record.
    pub fn write_entry(&mut self, entry: &Entry) -> Result<()> {
        self.write_record(&ExportRecord::Entry { key: entry.key.clone(), value: entry.value })?;
        self.statistics.entries += 1;
        Ok(())
    }

    /// Write the summary and flush the underlying writer.
    pub fn finish(mut self) -> Result<ExportStatistics> {
        self.write_record(&ExportRecord::Summary { entries: self.statistics.entries })?;
        self.writer.flush()?;
        Ok(self.statistics)
    }

    fn write_record(&mut self, record: &ExportRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.statistics.bytes += json.len() as u64 + 1;
        writeln!(self.writer, "{json}")?;
        Ok(())
    }
}

impl<E: StorageEngine> BidirectionalIndex<E> {
    /// Export every entry to `writer` from a single forward read view.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails, a stored entry is corrupt, or the
    /// writer fails.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use std::fs::File;
    /// use std::io::BufWriter;
    ///
    /// let file = BufWriter::new(File::create("twowaykv_export.jsonl")?);
    /// let stats = index.export_jsonl(file)?;
    /// println!("exported {} entries", stats.entries);
    /// ```
    pub fn export_jsonl<W: Write>(&self, writer: W) -> Result<ExportStatistics> {
        let view = self.forward().begin_read()?;
        let mut cursor = view.cursor(tables::FORWARD)?;

        let mut out = ExportWriter::new(writer);
        out.write_header()?;
        while let Some((raw_key, raw_value)) = cursor.next()? {
            let value = decode_value(&raw_value)?;
            out.write_entry(&Entry::new(decode_key(raw_key)?, value))?;
        }
        let stats = out.finish()?;

        info!(entries = stats.entries, bytes = stats.bytes, "export finished");
        Ok(stats)
    }
}
