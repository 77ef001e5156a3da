use rand::Rng;

/// Upper bound on generate-check-insert rounds at registration.
pub const MAX_ACCOUNT_NUMBER_ATTEMPTS: usize = 10;

pub const ACCOUNT_NUMBER_LEN: usize = 12;

/// Random 12-digit account number with a non-zero leading digit.
pub fn generate_account_number<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(100_000_000_000u64..1_000_000_000_000u64)
        .to_string()
}

pub fn is_valid_account_number(s: &str) -> bool {
    s.len() == ACCOUNT_NUMBER_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// `XXXX-XXXX-1234` for display in notifications.
pub fn mask_account_number(account_number: &str) -> String {
    let tail_start = account_number.len().saturating_sub(4);
    format!("XXXX-XXXX-{}", &account_number[tail_start..])
}
