//! Byte-level spelling of PDF tokens.

use chrono::{DateTime, FixedOffset};

use crate::config::TextEncoding;

/// Format a real with at most five decimals and no trailing zeros.
pub(crate) fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Append `/name`, escaping delimiters and non-regular bytes as `#XX`.
pub(crate) fn encode_name(name: &str, out: &mut Vec<u8>) {
    out.push(b'/');
    for byte in name.bytes() {
        match byte {
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#' => {
                out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
            },
            0x21..=0x7E => out.push(byte),
            _ => out.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
        }
    }
}

/// Append a string token: literal when printable, hex otherwise.
pub(crate) fn encode_string(data: &[u8], out: &mut Vec<u8>) {
    let printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));
    if !printable {
        encode_hex_string(data, out);
        return;
    }
    out.push(b'(');
    for &byte in data {
        match byte {
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

/// Append `<HEX>`.
pub(crate) fn encode_hex_string(data: &[u8], out: &mut Vec<u8>) {
    out.push(b'<');
    for byte in data {
        out.extend_from_slice(format!("{:02X}", byte).as_bytes());
    }
    out.push(b'>');
}

/// Encode a text string for a text-valued entry.
///
/// PDFDocEncoding agrees with Latin-1 for ASCII and 0xA1..=0xFF (0xAD is
/// undefined); anything else falls back to UTF-16BE with a byte order mark.
pub(crate) fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    let single_byte = |c: char| {
        let code = c as u32;
        code < 0x80 || ((0xA1..=0xFF).contains(&code) && code != 0xAD)
    };
    if encoding == TextEncoding::PdfDoc && text.chars().all(single_byte) {
        return text.chars().map(|c| c as u32 as u8).collect();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// `D:YYYYMMDDHHmmSS+HH'mm'`
pub(crate) fn format_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "D:{}{}{:02}'{:02}'",
        date.format("%Y%m%d%H%M%S"),
        sign,
        offset / 3600,
        (offset % 3600) / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn name(n: &str) -> String {
        let mut out = Vec::new();
        encode_name(n, &mut out);
        String::from_utf8(out).unwrap()
    }

    fn string(data: &[u8]) -> String {
        let mut out = Vec::new();
        encode_string(data, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(3.0), "3");
        assert_eq!(format_real(-12.0), "-12");
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(1.234567), "1.23457");
        assert_eq!(format_real(-0.000001), "0");
        assert_eq!(format_real(f64::NAN), "0");
    }

    #[test]
    fn test_names_escape_delimiters() {
        assert_eq!(name("Type"), "/Type");
        assert_eq!(name("A B"), "/A#20B");
        assert_eq!(name("x(y)"), "/x#28y#29");
        assert_eq!(name("50%"), "/50#25");
        assert_eq!(name("#"), "/#23");
    }

    #[test]
    fn test_strings() {
        assert_eq!(string(b"Hello"), "(Hello)");
        assert_eq!(string(b"a(b)c\\"), "(a\\(b\\)c\\\\)");
        assert_eq!(string(&[0x00, 0xFF]), "<00FF>");
    }

    #[test]
    fn test_text_encoding() {
        assert_eq!(encode_text("Caf\u{e9}", TextEncoding::PdfDoc), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("A", TextEncoding::Utf16), vec![0xFE, 0xFF, 0x00, b'A']);
        let euro = encode_text("\u{20ac}", TextEncoding::PdfDoc);
        assert_eq!(euro, vec![0xFE, 0xFF, 0x20, 0xAC]);
    }

    #[test]
    fn test_format_date() {
        let tz = FixedOffset::east_opt(-(5 * 3600 + 30 * 60)).unwrap();
        let date = tz.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(format_date(&date), "D:20240309140507-05'30'");

        let utc = FixedOffset::east_opt(0).unwrap();
        let date = utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_date(&date), "D:19991231235959+00'00'");
    }
}
