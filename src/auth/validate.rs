use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, OffsetDateTime};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn check_password(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters");
    }
    if len > MAX_PASSWORD_LEN {
        return Err("Password too long");
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD`, or an ISO timestamp whose date part is used.
pub fn parse_birth_date(raw: &str) -> Result<Date, &'static str> {
    let date_part = raw.get(..10).ok_or("dateOfBirth must be YYYY-MM-DD")?;
    if raw.len() > 10 && !raw[10..].starts_with('T') {
        return Err("dateOfBirth must be YYYY-MM-DD");
    }
    let date = Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .map_err(|_| "dateOfBirth must be YYYY-MM-DD")?;
    if date > OffsetDateTime::now_utc().date() {
        return Err("dateOfBirth cannot be in the future");
    }
    Ok(date)
}
