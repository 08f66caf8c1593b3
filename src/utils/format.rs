/// Rupiah amount with '.' thousands separators: `Rp 200.000.000`.
pub fn rupiah(amount: f64) -> String {
    format!("Rp {}", grouped(amount))
}

/// Whole-number part of `value` grouped in thousands with '.', the way
/// id-ID locale formatting prints it. Fractions are rounded.
pub fn grouped(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Lowercase, alphanumerics kept, everything else replaced by '_'.
pub fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "laporan".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(grouped(0.0), "0");
        assert_eq!(grouped(999.0), "999");
        assert_eq!(grouped(1000.0), "1.000");
        assert_eq!(grouped(200_000_000.0), "200.000.000");
        assert_eq!(grouped(-1234567.0), "-1.234.567");
    }

    #[test]
    fn rupiah_rounds_fractions() {
        assert_eq!(rupiah(1500.6), "Rp 1.501");
    }

    #[test]
    fn file_stem_sanitizes() {
        assert_eq!(file_stem("Laporan Jan 2024!"), "laporan_jan_2024_");
        assert_eq!(file_stem(""), "laporan");
    }
}
