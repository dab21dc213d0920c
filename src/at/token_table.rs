//! Module B: the vendor-supplied token table and the line classifier built
//! on top of it (§3, §4.3).

use crate::config::PrefixPolicy;
use super::tokenizer;

/// A URC handler: given the raw line (including its prefix, if any), do
/// whatever the vendor module wants. Invoked outside of the response mutex.
pub type UrcHandler = Box<dyn Fn(&str) + Send + Sync>;

/// One `(prefix, handler)` entry of the URC-handler map. A `None` handler
/// means "recognized, but nothing to do" — the line is still classified as
/// a URC and not as undefined.
pub struct UrcMapEntry {
    pub prefix: &'static str,
    pub handler: Option<UrcHandler>,
}

/// Read-only, vendor-supplied classification tables (§3). Must outlive every
/// [`crate::context::CellularContext`] built against it.
pub struct TokenTable {
    pub urc_handler_map: Vec<UrcMapEntry>,
    pub success_tokens: &'static [&'static str],
    pub error_tokens: &'static [&'static str],
    pub urc_tokens_without_prefix: &'static [&'static str],
    pub extra_success_tokens: &'static [&'static str],
    pub prefix: PrefixPolicy,
}

impl TokenTable {
    /// Validates the required fields are non-empty, per §6.2: an empty or
    /// missing urc-map, success, error, or urc-without-prefix table is a
    /// hard `init` failure.
    pub fn validate(&self) -> bool {
        !self.urc_handler_map.is_empty()
            && !self.success_tokens.is_empty()
            && !self.error_tokens.is_empty()
            && !self.urc_tokens_without_prefix.is_empty()
    }

    fn find_urc_handler(&self, prefix: &str) -> Option<&UrcMapEntry> {
        self.urc_handler_map.iter().find(|e| e.prefix == prefix)
    }
}

/// The outcome of classifying one framed line against a [`TokenTable`] and
/// the currently pending command (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Matched `success_tokens` or `extra_success_tokens`.
    SuccessTerminator,
    /// Matched `error_tokens`.
    ErrorTerminator,
    /// Matched a `urc_handler_map` prefix.
    UrcWithPrefix(&'a str),
    /// Matched `urc_tokens_without_prefix`.
    BareUrc,
    /// A command is pending and this line is part of its response body.
    Intermediate,
    /// Nothing claimed this line.
    Undefined,
}

/// Classifies `line` per §4.3: urc-without-prefix, then prefixed URC, then
/// success/error terminators, then intermediate-or-undefined depending on
/// whether a command is pending and whether the line satisfies its prefix
/// constraint.
pub fn classify<'t>(
    table: &'t TokenTable,
    line: &str,
    command_pending: bool,
    required_prefix: Option<&str>,
) -> LineClass<'t> {
    if table.urc_tokens_without_prefix.contains(&line) {
        return LineClass::BareUrc;
    }

    if (table.prefix.is_leading_char)(line.as_bytes().first().copied().unwrap_or(0)) {
        if let Some(colon) = line.find(':') {
            if line.as_bytes()[..colon]
                .iter()
                .all(|&b| (table.prefix.is_prefix_char)(b))
            {
                if let Some(entry) = table.find_urc_handler(&line[..colon]) {
                    return LineClass::UrcWithPrefix(entry.prefix);
                }
            }
        }
    }

    if table.success_tokens.contains(&line) || table.extra_success_tokens.contains(&line) {
        return LineClass::SuccessTerminator;
    }

    if table.error_tokens.contains(&line) {
        return LineClass::ErrorTerminator;
    }

    if command_pending {
        match required_prefix {
            Some(prefix) => {
                if tokenizer::str_starts_with(line, prefix).unwrap_or(false) {
                    LineClass::Intermediate
                } else {
                    LineClass::Undefined
                }
            }
            None => LineClass::Intermediate,
        }
    } else {
        LineClass::Undefined
    }
}

/// Dispatches a recognized URC line to its handler, if one is registered.
/// A no-op for [`LineClass::BareUrc`] with no matching handler in the map
/// (still "recognized", just nothing to run) and for any non-URC class.
pub fn dispatch_urc(table: &TokenTable, class: LineClass<'_>, line: &str) {
    match class {
        LineClass::UrcWithPrefix(prefix) => {
            if let Some(entry) = table.find_urc_handler(prefix) {
                if let Some(handler) = &entry.handler {
                    handler(line);
                }
            }
        }
        LineClass::BareUrc => {}
        _ => {}
    }
}
