use std::sync::OnceLock;

use regex::Regex;

fn non_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d+]").expect("valid phone regex"))
}

/// Normalizes an Ethiopian mobile number to `+251XXXXXXXXX`.
///
/// Accepts `+251911234567`, `251911234567`, `0911234567` and `911234567`,
/// with any separators.
pub fn normalize(phone: &str) -> Option<String> {
    let cleaned = non_digits().replace_all(phone, "");
    let digits = cleaned.trim_start_matches('+');

    let local = if let Some(rest) = digits.strip_prefix("251") {
        rest
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else if digits.len() == 9 {
        digits
    } else {
        return None;
    };

    if local.len() != 9 || !local.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(format!("+251{local}"))
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn accepts_known_formats() {
        for raw in ["+251911234567", "251911234567", "0911234567", "911234567", "+251 91 123 4567"] {
            assert_eq!(normalize(raw).as_deref(), Some("+251911234567"), "{raw}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("12345"), None);
        assert_eq!(normalize("+25191123456"), None);
        assert_eq!(normalize("+1 555 123 4567"), None);
    }
}
