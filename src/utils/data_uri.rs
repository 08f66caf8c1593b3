use base64::{engine::general_purpose::STANDARD, Engine as _};

/// `data:{mime};charset=utf-8;base64,{payload}`
pub fn encode(mime: &str, content: &str) -> String {
    format!(
        "data:{};charset=utf-8;base64,{}",
        mime,
        STANDARD.encode(content.as_bytes())
    )
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedDataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Decodes both base64 and plain percent-free data URIs. Returns None for
/// anything that is not a data URI.
pub fn decode(uri: &str) -> Option<DecodedDataUri> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mut parts = meta.split(';');
    let mime = parts
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_string();
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        STANDARD.decode(payload).ok()?
    } else {
        payload.as_bytes().to_vec()
    };

    Some(DecodedDataUri { mime, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_uri_keeps_mime_prefix() {
        let uri = encode("text/plain", "Metric,Value\n");
        assert!(uri.starts_with("data:text/plain;charset=utf-8;base64,"));
    }

    #[test]
    fn decode_reverses_encode() {
        let content = "LAPORAN SALES\nTotal: Rp 1.000";
        let decoded = decode(&encode("application/json", content)).unwrap();
        assert_eq!(decoded.mime, "application/json");
        assert_eq!(decoded.bytes, content.as_bytes());
    }

    #[test]
    fn decode_rejects_other_schemes() {
        assert!(decode("https://example.com/report.pdf").is_none());
        assert!(decode("data:text/plain;base64").is_none());
    }
}
