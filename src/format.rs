//! Input normalisation and display formatting.

use chrono::{DateTime, Local, Utc};

/// Digits in a complete CPF.
const CPF_DIGITS: usize = 11;
/// Longest input still formatted with the RG mask.
const RG_MAX_DIGITS: usize = 9;
/// Brazilian plates are seven characters (ABC1234 / ABC1D23).
const PLATE_LEN: usize = 7;

/// CPF groups: `XXX.XXX.XXX-XX`.
const CPF_MASK: [(usize, char); 3] = [(3, '.'), (3, '.'), (3, '-')];
/// RG groups: `XX.XXX.XXX-X`.
const RG_MASK: [(usize, char); 3] = [(2, '.'), (3, '.'), (3, '-')];

/// Format a person document as typed.
///
/// Non-digits are stripped first. Up to nine digits use the RG mask,
/// ten or eleven the CPF mask, and longer input is cut to a CPF.
pub fn format_document(value: &str) -> String {
    let mut digits: String = value.chars().filter(char::is_ascii_digit).collect();

    if digits.len() > CPF_DIGITS {
        digits.truncate(CPF_DIGITS);
    }

    if digits.len() > RG_MAX_DIGITS {
        apply_mask(&digits, &CPF_MASK)
    } else {
        apply_mask(&digits, &RG_MASK)
    }
}

/// Insert separators after each group, only when more digits follow.
fn apply_mask(digits: &str, groups: &[(usize, char)]) -> String {
    let mut out = String::with_capacity(digits.len() + groups.len());
    let mut rest = digits;

    for (len, sep) in groups {
        if rest.len() <= *len {
            break;
        }
        let (head, tail) = rest.split_at(*len);
        out.push_str(head);
        out.push(*sep);
        rest = tail;
    }

    out.push_str(rest);
    out
}

/// Free text as stored: upper-cased.
pub fn upper(value: &str) -> String {
    value.to_uppercase()
}

/// License plate as stored: upper-case alphanumerics, at most seven.
pub fn format_plate(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(PLATE_LEN)
        .collect()
}

/// Local long date-time, as shown in lists and exports (`15/10/2026, 14:03:22`).
pub fn local_datetime(value: &DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%d/%m/%Y, %H:%M:%S").to_string()
}

pub fn local_time(value: &DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%H:%M").to_string()
}

/// Localized yes/no.
pub fn yes_no(value: bool) -> &'static str {
    if value { "Sim" } else { "Não" }
}
