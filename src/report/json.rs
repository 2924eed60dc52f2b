//! JSON report writer

use super::ReportRow;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, rows: &[ReportRow]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, rows)?;
    writeln!(writer)?;
    writer.flush()
}
