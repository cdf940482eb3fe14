//! Pure validation functions used by the detectors.
//!
//! Every function here is total and fails closed: malformed input returns
//! `false` (or `(false, 0.0)` for the graduated-confidence checksum variants
//! in [`crate::detectors::checksum`]) rather than panicking.

use sha2::{Digest, Sha256};

/// Luhn checksum (credit cards, NPI-with-prefix, ISIN's final digit).
pub fn luhn_check(digits: &[u32]) -> bool {
    if digits.len() < 2 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &digit in digits.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

fn digits_of(text: &str) -> Vec<u32> {
    text.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Validate a number using the Luhn algorithm, extracting digits from
/// arbitrary formatting first.
pub fn validate_luhn(text: &str) -> bool {
    luhn_check(&digits_of(text))
}

/// US Social Security Number structural validation: area not in
/// {000, 666, 900-999}, group and serial non-zero.
pub fn validate_ssn(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 9 {
        return false;
    }
    let area: u32 = digits[0..3].parse().unwrap_or(0);
    let group: u32 = digits[3..5].parse().unwrap_or(0);
    let serial: u32 = digits[5..9].parse().unwrap_or(0);

    if area == 0 || area == 666 || (900..=999).contains(&area) {
        return false;
    }
    if group == 0 || serial == 0 {
        return false;
    }
    true
}

/// Reasonable phone-number digit count (10-15).
pub fn validate_phone(text: &str) -> bool {
    let count = text.chars().filter(|c| c.is_ascii_digit()).count();
    (10..=15).contains(&count)
}

/// Minimal structural email validation.
pub fn validate_email(text: &str) -> bool {
    let parts: Vec<&str> = text.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    !local.is_empty() && !domain.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Dotted-quad IPv4 validation.
pub fn validate_ipv4(text: &str) -> bool {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|p| matches!(p.parse::<u32>(), Ok(n) if n <= 255))
}

fn mod97(s: &str) -> u32 {
    let mut remainder = 0u64;
    for c in s.chars() {
        if let Some(d) = c.to_digit(10) {
            remainder = (remainder * 10 + d as u64) % 97;
        }
    }
    remainder as u32
}

fn letters_to_digits(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c.is_ascii_uppercase() {
            out.push_str(&(c as u32 - 'A' as u32 + 10).to_string());
        } else {
            return None;
        }
    }
    Some(out)
}

/// IBAN mod-97 checksum: rotate first 4 chars to the end, map letters to
/// digits, resulting integer mod 97 must equal 1.
pub fn validate_iban(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_uppercase();
    if !(15..=34).contains(&cleaned.len()) {
        return false;
    }
    let rearranged = format!("{}{}", &cleaned[4..], &cleaned[0..4]);
    match letters_to_digits(&rearranged) {
        Some(numeric) => mod97(&numeric) == 1,
        None => false,
    }
}

/// NPI: Luhn with the fixed `80840` prefix prepended.
pub fn validate_npi(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return false;
    }
    validate_luhn(&format!("80840{digits}"))
}

/// CUSIP: positional weights `1,2,1,2,1,2,1,2`, check digit `(10 - sum%10)%10`.
pub fn validate_cusip(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_uppercase();
    if cleaned.len() != 9 {
        return false;
    }
    let chars: Vec<char> = cleaned.chars().collect();
    let mut sum = 0u32;
    for (i, &c) in chars[..8].iter().enumerate() {
        let mut val = if c.is_ascii_digit() {
            c.to_digit(10).unwrap()
        } else if c.is_ascii_alphabetic() {
            c as u32 - 'A' as u32 + 10
        } else {
            return false;
        };
        if i % 2 == 1 {
            val *= 2;
        }
        sum += val / 10 + val % 10;
    }
    let check = (10 - (sum % 10)) % 10;
    chars[8].to_digit(10) == Some(check)
}

/// ISIN: country-code prefix, letters mapped to digits, Luhn on the result.
pub fn validate_isin(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_uppercase();
    if cleaned.len() != 12 {
        return false;
    }
    let chars: Vec<char> = cleaned.chars().collect();
    if !chars[0].is_ascii_alphabetic() || !chars[1].is_ascii_alphabetic() {
        return false;
    }
    let numeric: String = chars
        .iter()
        .map(|&c| if c.is_ascii_digit() { c.to_string() } else { (c as u32 - 'A' as u32 + 10).to_string() })
        .collect();
    validate_luhn(&numeric)
}

/// SEDOL: 7 chars, no vowels, weighted `1,3,1,7,3,9,1`.
pub fn validate_sedol(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    if cleaned.len() != 7 || cleaned.chars().any(|c| "AEIOU".contains(c)) {
        return false;
    }
    let weights = [1u32, 3, 1, 7, 3, 9, 1];
    let chars: Vec<char> = cleaned.chars().collect();
    let mut total = 0u32;
    for (i, &c) in chars[..6].iter().enumerate() {
        let val = if c.is_ascii_digit() {
            c.to_digit(10).unwrap()
        } else if c.is_ascii_alphabetic() {
            c as u32 - 'A' as u32 + 10
        } else {
            return false;
        };
        total += val * weights[i];
    }
    let check = (10 - (total % 10)) % 10;
    chars[6].to_digit(10) == Some(check)
}

const SWIFT_DENY_LIST: &[&str] = &[
    "REFERRAL", "HOSPITAL", "TERMINAL", "NATIONAL", "REGIONAL", "MATERIAL",
    "PERSONAL", "OFFICIAL", "ORIGINAL", "CARDINAL", "APPROVAL", "TROPICAL",
    "INFORMATION", "APPLICATION", "DESCRIPTION",
];

/// SWIFT/BIC structural validation (8 or 11 chars) plus a deny-list of
/// common English words that happen to share the format.
pub fn validate_swift(text: &str) -> bool {
    let swift: String = text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    if swift.len() != 8 && swift.len() != 11 {
        return false;
    }
    if SWIFT_DENY_LIST.contains(&swift.as_str()) {
        return false;
    }
    let bytes: Vec<char> = swift.chars().collect();
    let is_alpha = |s: &[char]| s.iter().all(|c| c.is_ascii_alphabetic());
    let is_alnum = |s: &[char]| s.iter().all(|c| c.is_ascii_alphanumeric());
    if !is_alpha(&bytes[0..4]) || !is_alpha(&bytes[4..6]) {
        return false;
    }
    if !is_alnum(&bytes[6..8]) {
        return false;
    }
    if bytes.len() == 11 && !is_alnum(&bytes[8..11]) {
        return false;
    }
    true
}

/// LEI: 20-char alphanumeric, ISO 7064 mod 97-10 == 1.
pub fn validate_lei(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_uppercase();
    if cleaned.len() != 20 {
        return false;
    }
    match letters_to_digits(&cleaned) {
        Some(numeric) => mod97(&numeric) == 1,
        None => false,
    }
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Bitcoin legacy/P2SH address: Base58, starts with `1`/`3`, trailing 4
/// bytes equal `SHA256(SHA256(payload))[:4]`.
pub fn validate_bitcoin_base58(address: &str) -> bool {
    if address.len() < 25 || address.len() > 34 {
        return false;
    }
    if !address.starts_with('1') && !address.starts_with('3') {
        return false;
    }
    if !address.chars().all(|c| BASE58_ALPHABET.contains(c)) {
        return false;
    }

    let mut n: Vec<u8> = vec![0];
    for c in address.chars() {
        let digit = match BASE58_ALPHABET.find(c) {
            Some(d) => d as u32,
            None => return false,
        };
        let mut carry = digit;
        for byte in n.iter_mut() {
            let v = *byte as u32 * 58 + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            n.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    n.reverse();
    if n.len() > 25 {
        return false;
    }
    let mut data = vec![0u8; 25 - n.len()];
    data.extend_from_slice(&n);

    let (payload, checksum) = data.split_at(21);
    let hash1 = Sha256::digest(payload);
    let hash2 = Sha256::digest(hash1);
    &hash2[..4] == checksum
}

const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Bitcoin Bech32 (SegWit) address: `bc1...`, fixed charset and lengths.
pub fn validate_bitcoin_bech32(address: &str) -> bool {
    let address = address.to_lowercase();
    if !address.starts_with("bc1") {
        return false;
    }
    let data_part = &address[3..];
    if data_part.len() < 8 || !data_part.chars().all(|c| BECH32_CHARSET.contains(c)) {
        return false;
    }
    let witness_version = data_part.chars().next().unwrap();
    if witness_version != 'q' && witness_version != 'p' {
        return false;
    }
    let total_len = address.len();
    match witness_version {
        'q' => total_len == 42 || total_len == 62,
        'p' => total_len == 62,
        _ => false,
    }
}

/// Ethereum address: `0x` + 40 hex chars.
pub fn validate_ethereum(address: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    let hex_part = match lower.strip_prefix("0x") {
        Some(h) => h,
        None => return false,
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn() {
        assert!(validate_luhn("4532015112830366"));
        assert!(!validate_luhn("4532015112830367"));
    }

    #[test]
    fn test_ssn() {
        assert!(validate_ssn("123-45-6789"));
        assert!(!validate_ssn("000-12-3456"));
        assert!(!validate_ssn("666-12-3456"));
    }

    #[test]
    fn test_iban() {
        assert!(validate_iban("GB82 WEST 1234 5698 7654 32"));
        assert!(validate_iban("DE89370400440532013000"));
        assert!(!validate_iban("GB82WEST12345698765433"));
    }

    #[test]
    fn test_ipv4() {
        assert!(validate_ipv4("192.168.1.1"));
        assert!(!validate_ipv4("256.1.1.1"));
    }

    #[test]
    fn test_cusip() {
        assert!(validate_cusip("037833100"));
        assert!(!validate_cusip("037833101"));
    }

    #[test]
    fn test_isin() {
        assert!(validate_isin("US0378331005"));
    }

    #[test]
    fn test_sedol() {
        assert!(validate_sedol("0263494"));
    }

    #[test]
    fn test_swift_deny_list() {
        assert!(!validate_swift("REFERRAL"));
        assert!(validate_swift("DEUTDEFF"));
    }

    #[test]
    fn test_lei() {
        assert!(validate_lei("529900T8BM49AURSDO55"));
    }

    #[test]
    fn test_ethereum() {
        assert!(validate_ethereum("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!validate_ethereum("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeA"));
    }

    #[test]
    fn test_bitcoin_bech32() {
        assert!(validate_bitcoin_bech32("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
        assert!(!validate_bitcoin_bech32("bc1xar0srrr7"));
    }
}
