//! Line classification.
//!
//! Both streams are decoded exactly once, at the boundary, into a [`Line`].
//! Everything downstream matches on the variant instead of peeking at
//! prefixes.

/// Leading character of device output that must be persisted.
pub const POINT_TAG: char = 'p';

/// Leading character of an operator command that starts a new measurement.
pub const ROTATE_TAG: char = 'r';

/// A decoded line from either stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Device output carrying point data; `payload` has the tag stripped.
    DataPoint { payload: &'a str },
    /// Operator command that opens a new result file. Holds the full line,
    /// tag included, because it is still forwarded to the device.
    Rotate(&'a str),
    /// Anything else: echoed (device) or forwarded (operator) untouched.
    Passthrough(&'a str),
}

impl<'a> Line<'a> {
    /// Decode a line of device output.
    pub fn device(raw: &'a str) -> Self {
        let text = trim_line_ending(raw);
        match text.strip_prefix(POINT_TAG) {
            Some(payload) => Line::DataPoint { payload },
            None => Line::Passthrough(text),
        }
    }

    /// Decode a line typed by the operator.
    pub fn operator(raw: &'a str) -> Self {
        let text = trim_line_ending(raw);
        if text.starts_with(ROTATE_TAG) {
            Line::Rotate(text)
        } else {
            Line::Passthrough(text)
        }
    }
}

/// Strip one trailing `\n`, then one trailing `\r`.
pub fn trim_line_ending(raw: &str) -> &str {
    let raw = raw.strip_suffix('\n').unwrap_or(raw);
    raw.strip_suffix('\r').unwrap_or(raw)
}
