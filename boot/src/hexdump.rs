//! hexdump.rs — offset / hex / ASCII dump of raw bytes

use std::fmt::Write;

/// Columns used when a caller passes 0.
pub const DEFAULT_COLUMNS: usize = 16;

/// Format `data` as rows of `columns` bytes:
///
/// ```text
/// 0000  00 01 FF FF ...  ....
/// ```
///
/// Offset in 4 hex digits, bytes as uppercase hex padded to a fixed width,
/// then the printable-ASCII gutter with `.` for anything outside 0x20..0x7F.
pub fn hex_dump(data: &[u8], columns: usize) -> String {
    let columns = if columns == 0 { DEFAULT_COLUMNS } else { columns };
    let width = columns * 3;

    let mut out = String::with_capacity(data.len() * 4 + data.len() / columns * 8);
    for (row, chunk) in data.chunks(columns).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let hex = chunk
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
            .collect();
        // Writing to a String cannot fail.
        let _ = write!(out, "{:04X}  {:<width$}  {}", row * columns, hex, ascii, width = width);
    }
    out
}
