// ============================================================
// Layer 4 — .npy Bitmap Parser
// ============================================================
// QuickDraw ships each category as one NumPy .npy file holding a
// 2-D uint8 array of shape (num_drawings, 784).
//
// .npy layout (little-endian):
//   magic "\x93NUMPY" | major(u8) | minor(u8)
//   | header_len (u16 for v1, u32 for v2/v3)
//   | header: ASCII Python dict literal, space/newline padded
//   | raw array data
//
// Header example:
//   {'descr': '|u1', 'fortran_order': False, 'shape': (121202, 784), }
//
// Only the subset QuickDraw uses is accepted: unsigned bytes in
// C order with a 2-D shape.
//
// Reference: https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html

use thiserror::Error;

use crate::domain::sample::BitmapArray;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("not an .npy file (bad magic bytes)")]
    BadMagic,

    #[error("unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("truncated .npy data: {0}")]
    Truncated(&'static str),

    #[error("malformed .npy header: {0}")]
    BadHeader(String),

    #[error("unsupported dtype '{0}', expected unsigned bytes ('|u1')")]
    UnsupportedDtype(String),

    #[error("Fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("expected rows of {expected} pixels, found shape {shape:?}")]
    RowWidth { expected: usize, shape: Vec<usize> },
}

/// Parsed header fields we care about.
#[derive(Debug, PartialEq, Eq)]
struct NpyHeader {
    descr:         String,
    fortran_order: bool,
    shape:         Vec<usize>,
}

/// Parse an .npy byte buffer of square `side x side` u8 bitmaps.
pub fn parse_bitmaps(bytes: &[u8], side: usize) -> Result<BitmapArray, NpyError> {
    let (header, data_start) = read_header(bytes)?;

    if !matches!(header.descr.as_str(), "|u1" | "<u1" | ">u1" | "u1") {
        return Err(NpyError::UnsupportedDtype(header.descr));
    }
    if header.fortran_order {
        return Err(NpyError::FortranOrder);
    }

    let expected = side * side;
    let rows = match header.shape.as_slice() {
        [rows, cols] if *cols == expected => *rows,
        _ => return Err(NpyError::RowWidth { expected, shape: header.shape }),
    };

    let data = &bytes[data_start..];
    let needed = rows
        .checked_mul(expected)
        .ok_or_else(|| NpyError::BadHeader(format!("row count {rows} overflows")))?;
    if data.len() < needed {
        return Err(NpyError::Truncated("array data shorter than declared shape"));
    }

    BitmapArray::new(data[..needed].to_vec(), side)
        .map_err(|e| NpyError::BadHeader(e.to_string()))
}

/// Read the preamble and header dict, returning the header and
/// the byte offset where array data begins.
fn read_header(bytes: &[u8]) -> Result<(NpyHeader, usize), NpyError> {
    if bytes.len() < 10 {
        return Err(NpyError::Truncated("preamble"));
    }
    if &bytes[..6] != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(NpyError::Truncated("preamble"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let header_end = header_start + header_len;
    if bytes.len() < header_end {
        return Err(NpyError::Truncated("header"));
    }

    let text = std::str::from_utf8(&bytes[header_start..header_end])
        .map_err(|_| NpyError::BadHeader("header is not valid UTF-8".into()))?;

    Ok((parse_header_dict(text)?, header_end))
}

fn parse_header_dict(text: &str) -> Result<NpyHeader, NpyError> {
    let descr = dict_value(text, "descr")?
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string();

    let fortran_order = match dict_value(text, "fortran_order")? {
        "True"  => true,
        "False" => false,
        other   => return Err(NpyError::BadHeader(format!("fortran_order = {other}"))),
    };

    let shape_text = dict_value(text, "shape")?;
    let shape = shape_text
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>()
            .map_err(|_| NpyError::BadHeader(format!("bad shape entry '{s}'"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader { descr, fortran_order, shape })
}

/// Extract the raw text of one value from the header dict literal.
/// Tuples are returned with their parentheses.
fn dict_value<'a>(text: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let key_pos = quoted
        .iter()
        .find_map(|k| text.find(k.as_str()).map(|p| p + k.len()))
        .ok_or_else(|| NpyError::BadHeader(format!("missing key '{key}'")))?;

    let rest = text[key_pos..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::BadHeader(format!("missing ':' after '{key}'")))?
        .trim_start();

    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find([',', '}'])
    }
    .ok_or_else(|| NpyError::BadHeader(format!("unterminated value for '{key}'")))?;

    Ok(rest[..end].trim())
}

/// Encode bitmaps as a version 1.0 .npy buffer. Used to fake
/// QuickDraw downloads in tests.
#[cfg(test)]
pub fn encode_bitmaps(arr: &BitmapArray) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '|u1', 'fortran_order': False, 'shape': ({}, {}), }}",
        arr.len(),
        arr.side() * arr.side()
    );
    // Pad so the data section starts on a 64-byte boundary
    while (10 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for i in 0..arr.len() {
        out.extend_from_slice(arr.get(i).unwrap_or_default());
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{SOURCE_PIXELS, SOURCE_SIZE};

    fn npy_with_header(header: &str, data: &[u8]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_parses_quickdraw_layout() {
        let mut pixels = vec![0u8; SOURCE_PIXELS * 2];
        pixels[SOURCE_PIXELS] = 255;
        let arr   = BitmapArray::new(pixels, SOURCE_SIZE).unwrap();
        let bytes = encode_bitmaps(&arr);

        let parsed = parse_bitmaps(&bytes, SOURCE_SIZE).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get(1).unwrap()[0], 255);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let bytes = b"NOTNUMPYFILE....".to_vec();
        assert!(matches!(parse_bitmaps(&bytes, SOURCE_SIZE), Err(NpyError::BadMagic)));
    }

    #[test]
    fn test_rejects_float_dtype() {
        let bytes = npy_with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (1, 784), }\n",
            &[0u8; 784 * 4],
        );
        assert!(matches!(
            parse_bitmaps(&bytes, SOURCE_SIZE),
            Err(NpyError::UnsupportedDtype(d)) if d == "<f4"
        ));
    }

    #[test]
    fn test_rejects_fortran_order() {
        let bytes = npy_with_header(
            "{'descr': '|u1', 'fortran_order': True, 'shape': (1, 784), }\n",
            &[0u8; 784],
        );
        assert!(matches!(parse_bitmaps(&bytes, SOURCE_SIZE), Err(NpyError::FortranOrder)));
    }

    #[test]
    fn test_rejects_wrong_row_width() {
        let bytes = npy_with_header(
            "{'descr': '|u1', 'fortran_order': False, 'shape': (2, 100), }\n",
            &[0u8; 200],
        );
        assert!(matches!(
            parse_bitmaps(&bytes, SOURCE_SIZE),
            Err(NpyError::RowWidth { expected: 784, .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_data() {
        let bytes = npy_with_header(
            "{'descr': '|u1', 'fortran_order': False, 'shape': (3, 784), }\n",
            &[0u8; 784],
        );
        assert!(matches!(parse_bitmaps(&bytes, SOURCE_SIZE), Err(NpyError::Truncated(_))));
    }

    #[test]
    fn test_rejects_row_count_that_overflows() {
        let header = format!(
            "{{'descr': '|u1', 'fortran_order': False, 'shape': ({}, 784), }}\n",
            usize::MAX,
        );
        let bytes = npy_with_header(&header, &[0u8; 784]);
        assert!(matches!(parse_bitmaps(&bytes, SOURCE_SIZE), Err(NpyError::BadHeader(_))));
    }

    #[test]
    fn test_single_element_shape_tuple() {
        let header = parse_header_dict(
            "{'descr': '|u1', 'fortran_order': False, 'shape': (784,), }",
        ).unwrap();
        assert_eq!(header.shape, vec![784]);
    }
}
