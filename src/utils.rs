use chrono::{DateTime, NaiveDate};

/// Parses a calendar day from `YYYY-MM-DD`, or from a full RFC 3339
/// timestamp by keeping its date part.
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|ts| ts.date_naive())
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// At least 8 characters, one uppercase letter and one digit.
pub fn check_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain a digit");
    }
    Ok(())
}

/// `ceil(total / limit)`, with zero items giving zero pages.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_timestamped_days() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert_eq!(parse_day("2024-03-11"), Some(day));
        assert_eq!(parse_day(" 2024-03-11 "), Some(day));
        assert_eq!(parse_day("2024-03-11T22:15:00Z"), Some(day));
        assert_eq!(parse_day("2024-03-11T01:00:00+03:00"), Some(day));
        assert_eq!(parse_day("2024-02-30"), None);
        assert_eq!(parse_day("yesterday"), None);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("yusuf@example.com"));
        assert!(!is_valid_email("yusuf.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("yusuf@example"));
        assert!(!is_valid_email("yu suf@example.com"));
    }

    #[test]
    fn password_rules() {
        assert!(check_password_strength("Sujood2024").is_ok());
        assert!(check_password_strength("Short1A").is_err());
        assert!(check_password_strength("nouppercase1").is_err());
        assert!(check_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 7), 0);
        assert_eq!(total_pages(7, 7), 1);
        assert_eq!(total_pages(10, 7), 2);
        assert_eq!(total_pages(15, 7), 3);
    }
}
