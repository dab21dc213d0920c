//! Module A: pure, stateless byte/char utilities over AT text (§4.3).
//!
//! Every function here rejects empty input and any other precondition
//! violation with [`TokenizerError::BadParameter`] rather than panicking —
//! these run on untrusted modem bytes, on the receiver thread, where a panic
//! would take the whole driver down.

use crate::config::PrefixPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenizerError {
    #[error("bad parameter")]
    BadParameter,
}

type Result<T> = core::result::Result<T, TokenizerError>;

fn bad_param_if(cond: bool) -> Result<()> {
    if cond {
        Err(TokenizerError::BadParameter)
    } else {
        Ok(())
    }
}

/// Strip a leading `+XXX:` prefix, leaving the tail. Fails if the line is
/// empty, does not start with the policy's leading character, or contains no
/// colon.
pub fn remove_prefix(line: &mut &str, policy: PrefixPolicy) -> Result<()> {
    bad_param_if(line.is_empty())?;
    let bytes = line.as_bytes();
    bad_param_if(!(policy.is_leading_char)(bytes[0]))?;
    let colon = line.find(':').ok_or(TokenizerError::BadParameter)?;
    *line = &line[colon + 1..];
    Ok(())
}

/// True iff `line` starts with the leading character and every byte up to
/// (not including) the first `:` is prefix-valid.
pub fn is_prefix_present(line: &str, policy: PrefixPolicy) -> bool {
    if line.is_empty() {
        return false;
    }
    let bytes = line.as_bytes();
    if !(policy.is_leading_char)(bytes[0]) {
        return false;
    }
    match line.find(':') {
        Some(colon) => bytes[..colon].iter().all(|&b| (policy.is_prefix_char)(b)),
        None => false,
    }
}

pub fn remove_leading_whitespace(line: &mut &str) -> Result<()> {
    bad_param_if(line.is_empty())?;
    *line = line.trim_start_matches([' ', '\t']);
    Ok(())
}

pub fn remove_trailing_whitespace(line: &mut &str) -> Result<()> {
    bad_param_if(line.is_empty())?;
    *line = line.trim_end_matches([' ', '\t']);
    Ok(())
}

/// Removes every whitespace byte anywhere in the string, not just at the
/// ends — modem responses sometimes pad fields with an internal space
/// (`+CSQ: 15, 99`).
pub fn remove_all_whitespace(line: &str) -> Result<String> {
    bad_param_if(line.is_empty())?;
    Ok(line.chars().filter(|c| *c != ' ' && *c != '\t').collect())
}

/// Strips exactly one leading and one trailing `"`, if both are present.
pub fn remove_outermost_double_quote(line: &str) -> Result<String> {
    bad_param_if(line.is_empty())?;
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        Ok(line[1..line.len() - 1].to_string())
    } else {
        Ok(line.to_string())
    }
}

/// Removes every `"` byte anywhere in the string.
pub fn remove_all_double_quote(line: &str) -> Result<String> {
    bad_param_if(line.is_empty())?;
    Ok(line.chars().filter(|c| *c != '"').collect())
}

/// Consumes up to the next comma, advancing `cursor` past it. If no comma is
/// present, the whole remainder becomes the token and the cursor is emptied.
pub fn get_next_token<'a>(cursor: &mut &'a str) -> Result<&'a str> {
    get_specific_next_token(cursor, ",")
}

/// Same as [`get_next_token`] with a caller-chosen delimiter.
pub fn get_specific_next_token<'a>(cursor: &mut &'a str, delim: &str) -> Result<&'a str> {
    bad_param_if(cursor.is_empty() || delim.is_empty())?;
    match cursor.find(delim) {
        Some(idx) => {
            let token = &cursor[..idx];
            *cursor = &cursor[idx + delim.len()..];
            Ok(token)
        }
        None => {
            let token = *cursor;
            *cursor = "";
            Ok(token)
        }
    }
}

/// Parses a hex string (even length, each byte two hex digits, case
/// insensitive) into `out`. `out.len()` must equal exactly half the string's
/// length.
pub fn hex_str_to_hex(line: &str, out: &mut [u8]) -> Result<()> {
    bad_param_if(line.is_empty() || out.is_empty())?;
    bad_param_if(!line.len().is_multiple_of(2))?;
    bad_param_if(line.len() / 2 != out.len())?;
    for (i, chunk) in line.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16).ok_or(TokenizerError::BadParameter)?;
        let lo = (chunk[1] as char).to_digit(16).ok_or(TokenizerError::BadParameter)?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Ok(())
}

/// True iff every byte is an ASCII digit.
pub fn is_str_digit(line: &str) -> Result<bool> {
    bad_param_if(line.is_empty())?;
    Ok(line.bytes().all(|b| b.is_ascii_digit()))
}

/// True iff `line` starts with `needle`.
pub fn str_starts_with(line: &str, needle: &str) -> Result<bool> {
    bad_param_if(line.is_empty() || needle.is_empty())?;
    Ok(line.starts_with(needle))
}

/// Strict integer parse: the entire string, in the given base, with no
/// trailing garbage.
pub fn str_to_i(line: &str, base: u32) -> Result<i32> {
    bad_param_if(line.is_empty())?;
    i32::from_str_radix(line, base).map_err(|_| TokenizerError::BadParameter)
}

/// True iff any of `keys` occurs anywhere in `line`.
pub fn check_error_code(line: &str, keys: &[&str]) -> Result<bool> {
    bad_param_if(line.is_empty() || keys.is_empty())?;
    Ok(keys.iter().any(|k| line.contains(k)))
}
