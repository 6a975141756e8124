//! Flat textual encodings for persisted bindings and favourites.
//!
//! The wire formats are concatenated bracket records with no separators
//! between them:
//!
//! - hotkeys: `[key,modifiers,deviceGuid][key,modifiers,deviceGuid]...`
//! - quick-switch hotkey: `[key,modifiers]`, or the empty string when unset
//! - favourite devices: `[deviceGuid][deviceGuid]...`
//!
//! The tokenizer yields one record at a time and fails each record in
//! isolation: a truncated or garbled record is reported as an error and
//! scanning resumes at the next `[`, so one bad entry never misaligns the
//! entries after it.

use thiserror::Error;

use crate::audio::DeviceId;
use crate::hotkey::chord::{Chord, ModifierSet, VirtualKey};

/// A single unparseable record. The surrounding load keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated record: {0:?}")]
    Unterminated(String),

    #[error("record has {found} fields, expected {expected}: {record:?}")]
    WrongArity {
        expected: usize,
        found: usize,
        record: String,
    },

    #[error("invalid number in record: {0:?}")]
    BadNumber(String),

    #[error("invalid device GUID in record: {0:?}")]
    BadGuid(String),
}

/// Iterator over `[...]` records, splitting each body on commas.
///
/// Empty records (`[]`) are skipped: an empty binding list is persisted as
/// the literal `[]`. Text between records is ignored.
struct Records<'a> {
    rest: &'a str,
}

fn records(input: &str) -> Records<'_> {
    Records { rest: input }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Vec<&'a str>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.rest.find('[')?;
            let body_and_rest = &self.rest[start + 1..];

            let close = body_and_rest.find(']');
            let next_open = body_and_rest.find('[');

            match (close, next_open) {
                // Well-formed: `]` arrives before any nested `[`.
                (Some(c), o) if o.map_or(true, |o| c < o) => {
                    let body = &body_and_rest[..c];
                    self.rest = &body_and_rest[c + 1..];
                    if body.trim().is_empty() {
                        continue;
                    }
                    return Some(Ok(body.split(',').map(str::trim).collect()));
                }
                // Truncated record: resume at the next `[` (or give up).
                (_, o) => {
                    let broken = match o {
                        Some(o) => {
                            let broken = &body_and_rest[..o];
                            self.rest = &body_and_rest[o..];
                            broken
                        }
                        None => {
                            let broken = body_and_rest;
                            self.rest = "";
                            broken
                        }
                    };
                    return Some(Err(ParseError::Unterminated(format!("[{broken}"))));
                }
            }
        }
    }
}

fn expect_arity(fields: Vec<&str>, expected: usize) -> Result<Vec<&str>, ParseError> {
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(ParseError::WrongArity {
            expected,
            found: fields.len(),
            record: fields.join(","),
        })
    }
}

fn parse_u32(field: &str) -> Result<u32, ParseError> {
    field
        .parse::<u32>()
        .map_err(|_| ParseError::BadNumber(field.to_string()))
}

fn parse_guid(field: &str) -> Result<DeviceId, ParseError> {
    DeviceId::parse_guid(field).ok_or_else(|| ParseError::BadGuid(field.to_string()))
}

/// Parse the persisted hotkeys string into `(chord, device)` pairs.
/// Each record succeeds or fails on its own.
pub fn parse_hotkeys(input: &str) -> impl Iterator<Item = Result<(Chord, DeviceId), ParseError>> + '_ {
    records(input).map(|record| {
        let fields = expect_arity(record?, 3)?;
        let key = parse_u32(fields[0])?;
        let modifiers = parse_u32(fields[1])?;
        let device = parse_guid(fields[2])?;
        Ok((
            Chord::new(VirtualKey(key), ModifierSet(modifiers)),
            device,
        ))
    })
}

/// Serialize bindings. Entries with no key or a nil device id are silently
/// dropped; an empty result is written as the literal `[]`.
pub fn encode_hotkeys<'a, I>(bindings: I) -> String
where
    I: IntoIterator<Item = (&'a Chord, &'a DeviceId)>,
{
    let mut out = String::new();
    for (chord, device) in bindings {
        if chord.is_empty() || device.is_nil() {
            continue;
        }
        out.push_str(&format!(
            "[{},{},{}]",
            chord.key.0, chord.modifiers.0, device
        ));
    }
    if out.is_empty() {
        out.push_str("[]");
    }
    out
}

/// Parse the quick-switch hotkey string. Empty or whitespace input means
/// "unset"; a malformed record is an error the caller may log and drop.
pub fn parse_quick_switch(input: &str) -> Result<Option<Chord>, ParseError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match records(input).next() {
        None => Ok(None),
        Some(record) => {
            let fields = expect_arity(record?, 2)?;
            let key = parse_u32(fields[0])?;
            let modifiers = parse_u32(fields[1])?;
            Ok(Some(Chord::new(VirtualKey(key), ModifierSet(modifiers))))
        }
    }
}

/// Serialize the quick-switch hotkey; `None` becomes the empty string.
pub fn encode_quick_switch(chord: Option<Chord>) -> String {
    match chord {
        Some(chord) => format!("[{},{}]", chord.key.0, chord.modifiers.0),
        None => String::new(),
    }
}

/// Parse the favourite-devices string.
pub fn parse_favourites(input: &str) -> impl Iterator<Item = Result<DeviceId, ParseError>> + '_ {
    records(input).map(|record| {
        let fields = expect_arity(record?, 1)?;
        parse_guid(fields[0])
    })
}

/// Serialize the favourite-devices list in rotation order.
pub fn encode_favourites<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a DeviceId>,
{
    let mut out = String::new();
    for id in ids {
        out.push_str(&format!("[{id}]"));
    }
    if out.is_empty() {
        out.push_str("[]");
    }
    out
}
