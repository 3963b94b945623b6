//! Plain hex dump for diagnostic logging

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

/// Render `bytes` 16 per line: offset, hex bytes in two groups of eight, ASCII
///
/// Non-printable bytes show as `.` in the ASCII column. The last line is
/// padded so the ASCII column stays aligned.
#[must_use]
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(BYTES_PER_LINE) * 78);

    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let _ = write!(out, "{:08x} ", line * BYTES_PER_LINE);
        for idx in 0..BYTES_PER_LINE {
            if idx == BYTES_PER_LINE / 2 {
                out.push(' ');
            }
            match chunk.get(idx) {
                Some(byte) => {
                    let _ = write!(out, " {byte:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(chunk.iter().map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }));
        out.push_str("|\n");
    }

    out
}
