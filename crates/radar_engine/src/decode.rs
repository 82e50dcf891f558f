use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode a fetched page into UTF-8 using: BOM -> Content-Type charset ->
/// chardetng guess. Undecodable sequences become U+FFFD; a title is still
/// better than none.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> String {
    let (text, _, _) = enc.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::decode_page;

    #[test]
    fn respects_charset_header() {
        let bytes = b"<title>caf\xe9</title>";
        let decoded = decode_page(bytes, Some("text/html; Charset=\"ISO-8859-1\""));
        assert_eq!(decoded, "<title>café</title>");
    }

    #[test]
    fn bom_wins_over_header() {
        let bytes = b"\xEF\xBB\xBFhello";
        assert_eq!(decode_page(bytes, Some("text/html; charset=latin1")), "hello");
    }
}
