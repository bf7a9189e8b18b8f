// Reading the text exports from disk.

use crate::splits::*;

// Windows-1252 characters for the bytes 0x80 to 0x9F. Unassigned bytes keep their Latin-1 value.
const CP1252_HIGH: [char; 32] = [
    '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
];

fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9f => CP1252_HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

/// Decodes an export. WinSplits exports saved on Windows are often Windows-1252 rather than UTF-8.
pub fn decode_export(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!(
                "decode_export: not UTF-8 ({}), reading as Windows-1252",
                e.utf8_error()
            );
            e.into_bytes().into_iter().map(cp1252_char).collect()
        }
    }
}

pub fn read_export(path: &str) -> SplitsResult<String> {
    info!("Attempting to read export {:?}", path);
    let bytes = fs::read(path).context(OpeningInputSnafu { path })?;
    Ok(decode_export(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_kept() {
        assert_eq!(decode_export("OK Linné".as_bytes().to_vec()), "OK Linné");
    }

    #[test]
    fn windows_1252_fallback() {
        assert_eq!(decode_export(b"OK Linn\xe9\tIFK Liding\xf6".to_vec()), "OK Linné\tIFK Lidingö");
        assert_eq!(
            decode_export(b"\x93Stora \x80\x94loppet\x94 \x8a\x81".to_vec()),
            "\u{201c}Stora \u{20ac}\u{2014}loppet\u{201d} \u{160}\u{81}"
        );
    }
}
