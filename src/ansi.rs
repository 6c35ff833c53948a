//! ANSI Post-Processor
//!
//! Optional per-chunk filtering applied on every emission path (mirror,
//! events, capture) so a chunk has exactly one on-the-wire representation.
//! Operates on raw bytes: child output is not guaranteed to be UTF-8.

/// Controls what escapes survive on emitted chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiOptions {
    /// Keep CSI sequences (`ESC [ ... m/G/K/H/F/J`). When false they are
    /// stripped.
    pub preserve_ansi: bool,
    /// Keep control bytes other than `\t`, `\n`, `\r`. When false they are
    /// stripped.
    pub preserve_control: bool,
}

impl Default for AnsiOptions {
    fn default() -> Self {
        Self {
            preserve_ansi: true,
            preserve_control: true,
        }
    }
}

impl AnsiOptions {
    pub fn is_passthrough(&self) -> bool {
        self.preserve_ansi && self.preserve_control
    }
}

const ESC: u8 = 0x1B;

fn is_stripped_control(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F)
}

/// Length of a CSI sequence `ESC [ [0-9;]* [mGKHFJ]` starting at `start`,
/// or `None` if the bytes there are not one.
fn csi_len(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&ESC) || bytes.get(start + 1) != Some(&b'[') {
        return None;
    }
    let mut i = start + 2;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'0'..=b'9' | b';' => i += 1,
            b'm' | b'G' | b'K' | b'H' | b'F' | b'J' => return Some(i - start + 1),
            _ => return None,
        }
    }
    None
}

/// Apply the configured filtering to one chunk.
pub fn filter_chunk(bytes: &[u8], options: &AnsiOptions) -> Vec<u8> {
    if options.is_passthrough() {
        return bytes.to_vec();
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if !options.preserve_ansi {
            if let Some(len) = csi_len(bytes, i) {
                i += len;
                continue;
            }
        }
        let b = bytes[i];
        if !options.preserve_control && is_stripped_control(b) {
            // When ANSI is preserved, keep whole CSI sequences intact even
            // though ESC is a control byte.
            if options.preserve_ansi {
                if let Some(len) = csi_len(bytes, i) {
                    out.extend_from_slice(&bytes[i..i + len]);
                    i += len;
                    continue;
                }
            }
            i += 1;
            continue;
        }
        out.push(b);
        i += 1;
    }
    out
}
