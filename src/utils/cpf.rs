/// CPF normalization. The frontend may send the masked form
/// ("123.456.789-09") or bare digits; everything downstream (DB columns,
/// JWT claims, paystub lookups) uses the 11-digit form.
pub fn normalize_cpf(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return None;
    }

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 { Some(digits) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_digits() {
        assert_eq!(normalize_cpf("12345678909").as_deref(), Some("12345678909"));
    }

    #[test]
    fn strips_mask() {
        assert_eq!(
            normalize_cpf("123.456.789-09").as_deref(),
            Some("12345678909")
        );
        assert_eq!(normalize_cpf(" 123.456.789-09 ").as_deref(), Some("12345678909"));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(normalize_cpf("123456789"), None);
        assert_eq!(normalize_cpf("123456789012"), None);
        assert_eq!(normalize_cpf(""), None);
    }

    #[test]
    fn rejects_letters() {
        assert_eq!(normalize_cpf("123.456.789-0a"), None);
        assert_eq!(normalize_cpf("not a cpf"), None);
    }
}
