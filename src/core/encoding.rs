//! Encoding Detection and Conversion
//!
//! Detects the input encoding from the byte order mark, `<` sniffing or the
//! XML declaration, and converts everything to UTF-8 before tokenizing.

use std::borrow::Cow;
use std::fmt;
use tracing::warn;

/// Character encodings understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1
    Latin1,
    /// US-ASCII
    Ascii,
    Windows1252,
}

/// Windows-1252 code points for bytes 0x80..=0x9F
const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0x008D, 0x017D, 0x008F, 0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178,
];

impl Encoding {
    /// Canonical label, as written in an XML declaration
    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
            Encoding::Windows1252 => "windows-1252",
        }
    }

    /// Resolve an encoding label (case-insensitive, common aliases accepted)
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Some(match label.as_str() {
            "utf-8" | "utf8" | "unicode-1-1-utf-8" => Encoding::Utf8,
            // Without a BOM, bare UTF-16 is taken as little endian
            "utf-16" | "utf16" | "utf-16le" | "ucs-2" => Encoding::Utf16Le,
            "utf-16be" => Encoding::Utf16Be,
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" | "iso_8859-1" => Encoding::Latin1,
            "us-ascii" | "ascii" | "ansi_x3.4-1968" => Encoding::Ascii,
            "windows-1252" | "cp1252" | "x-cp1252" => Encoding::Windows1252,
            _ => return None,
        })
    }

    /// Detect encoding from byte order mark or initial bytes
    pub fn sniff(input: &[u8]) -> Option<Self> {
        match input {
            [0xEF, 0xBB, 0xBF, ..] => Some(Encoding::Utf8),
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => Some(Encoding::Utf16Le),
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => Some(Encoding::Utf16Be),
            _ => None,
        }
    }

    /// Whether every character of `text` can be written in this encoding
    pub fn can_represent(self, text: &str) -> bool {
        match self {
            Encoding::Utf8 | Encoding::Utf16Le | Encoding::Utf16Be => true,
            Encoding::Ascii => text.is_ascii(),
            Encoding::Latin1 => text.chars().all(|c| (c as u32) <= 0xFF),
            Encoding::Windows1252 => text.chars().all(|c| {
                let cp = c as u32;
                cp < 0x80 || (0xA0..=0xFF).contains(&cp) || CP1252_HIGH.contains(&(cp as u16)) && cp > 0xFF
            }),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input converted to UTF-8
#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub encoding: Encoding,
}

/// Read `encoding="..."` from a leading XML declaration.
/// The declaration is ASCII, so this works on any ASCII-compatible input.
pub fn declared_label(input: &[u8]) -> Option<&str> {
    let input = input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input);
    if !input.starts_with(b"<?xml") {
        return None;
    }
    let end = memchr::memmem::find(input, b"?>")?;
    let decl = &input[..end];
    let at = memchr::memmem::find(decl, b"encoding")?;
    let rest = &decl[at + b"encoding".len()..];
    let eq = rest.iter().position(|&b| b == b'=')?;
    let rest = &rest[eq + 1..];
    let rest = &rest[rest.iter().take_while(|b| b.is_ascii_whitespace()).count()..];
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest[1..].iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[1..1 + close]).ok()
}

/// Convert raw input to UTF-8.
///
/// Precedence: `forced`, then the byte order mark / `<` sniffing, then the
/// declared label, then UTF-8. Undecodable bytes are an error unless
/// `lenient`, in which case they are replaced and a warning is logged.
pub fn decode(input: &[u8], forced: Option<Encoding>, lenient: bool) -> Result<Decoded<'_>, String> {
    let encoding = match forced.or_else(|| Encoding::sniff(input)) {
        Some(enc) => enc,
        None => match declared_label(input) {
            Some(label) => Encoding::from_label(label)
                .ok_or_else(|| format!("Unsupported encoding '{}'", label))?,
            None => Encoding::Utf8,
        },
    };

    let text = match encoding {
        Encoding::Utf8 => decode_utf8(input, lenient)?,
        Encoding::Utf16Le => Cow::Owned(decode_utf16(input, false, lenient)?),
        Encoding::Utf16Be => Cow::Owned(decode_utf16(input, true, lenient)?),
        Encoding::Latin1 => Cow::Owned(input.iter().map(|&b| b as char).collect()),
        Encoding::Windows1252 => Cow::Owned(input.iter().map(|&b| cp1252_char(b)).collect()),
        Encoding::Ascii => match input.iter().position(|&b| b >= 0x80) {
            None => decode_utf8(input, lenient)?,
            Some(pos) if !lenient => {
                return Err(format!("Byte 0x{:02X} at offset {} is not US-ASCII", input[pos], pos))
            }
            Some(_) => {
                warn!(encoding = "US-ASCII", "replacing non-ASCII bytes");
                Cow::Owned(
                    input
                        .iter()
                        .map(|&b| if b < 0x80 { b as char } else { char::REPLACEMENT_CHARACTER })
                        .collect(),
                )
            }
        },
    };

    Ok(Decoded { text, encoding })
}

fn decode_utf8(input: &[u8], lenient: bool) -> Result<Cow<'_, str>, String> {
    let bytes = input.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(input);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(Cow::Borrowed(text)),
        Err(e) if lenient => {
            warn!(offset = e.valid_up_to(), "invalid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(bytes))
        }
        Err(e) => Err(format!("Invalid UTF-8 at offset {}", e.valid_up_to())),
    }
}

fn decode_utf16(input: &[u8], big_endian: bool, lenient: bool) -> Result<String, String> {
    let bom: &[u8] = if big_endian { &[0xFE, 0xFF] } else { &[0xFF, 0xFE] };
    let bytes = input.strip_prefix(bom).unwrap_or(input);
    let name = if big_endian { "UTF-16BE" } else { "UTF-16LE" };

    if bytes.len() % 2 != 0 && !lenient {
        return Err(format!("Invalid {}: odd number of bytes", name));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| {
            if big_endian {
                u16::from_be_bytes([chunk[0], chunk[1]])
            } else {
                u16::from_le_bytes([chunk[0], chunk[1]])
            }
        })
        .collect();

    match String::from_utf16(&code_units) {
        Ok(text) => Ok(text),
        Err(_) if lenient => {
            warn!(encoding = name, "unpaired surrogate, decoding lossily");
            Ok(String::from_utf16_lossy(&code_units))
        }
        Err(e) => Err(format!("Invalid {}: {}", name, e)),
    }
}

#[inline]
fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => char::from_u32(CP1252_HIGH[(b - 0x80) as usize] as u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER),
        _ => b as char,
    }
}
