//! Character reference resolution.
//!
//! Recognizes `&name;`, `&#123;`, `&#x1F;` and the `&bsX;` escapes. Once the
//! `&` is followed by something reference-shaped, problems are reported and
//! the reference fails; the dispatch loop then keeps the `&` as text.

use crate::entities;
use crate::shared::preds::{is_control, is_noncharacter};
use crate::shared::{Parsed, Stream};

/// Where a reference appears; attribute values follow HTML's
/// ambiguous-ampersand rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharRefContext {
    Attr,
    Text,
}

const BS_ESCAPABLE: &str = "`~!@#$%^&*()-_=+[]{}\\|:'\"<>,./?";

/// Parses a reference at `start` (which must be `&`), yielding its replacement text.
pub fn parse_char_ref(s: &Stream<'_>, start: usize, context: CharRefContext) -> Parsed<String> {
    if s.byte_at(start) != Some(b'&') {
        return Parsed::Fail(start);
    }
    let i = start + 1;
    if s.starts_with_at(i, "bs") {
        return parse_bs_escape(s, start);
    }
    match s.byte_at(i) {
        Some(b) if b.is_ascii_alphanumeric() => parse_named(s, start, context),
        Some(b'#') => parse_numeric(s, start),
        _ => Parsed::Fail(start),
    }
}

fn parse_bs_escape(s: &Stream<'_>, start: usize) -> Parsed<String> {
    let Parsed::Ok(escape, semi) = s.skip_to_same_line(start + 1, ";") else {
        s.die(
            start,
            "Saw the start of an &bs...; escape, but couldn't find the ending semicolon. If this wasn't intended, escape the & with &amp;".to_string(),
        );
        return Parsed::Fail(start);
    };
    let end = semi + 1;
    let rest = &escape[2..];
    let mut chars = rest.chars();
    if let (Some(ch), None) = (chars.next(), chars.next())
        && BS_ESCAPABLE.contains(ch)
    {
        return Parsed::Ok(ch.to_string(), end);
    }
    match rest {
        "" if s.starts_with_at(start, "&bs;;") => Parsed::Ok(";".to_string(), end + 1),
        "<<" => Parsed::Ok("«".to_string(), end),
        ">>" => Parsed::Ok("»".to_string(), end),
        "->" => Parsed::Ok("→".to_string(), end),
        _ => {
            s.die(
                start,
                format!("&{escape}; isn't a valid &bs escape."),
            );
            Parsed::Fail(start)
        }
    }
}

fn parse_named(s: &Stream<'_>, start: usize, context: CharRefContext) -> Parsed<String> {
    let mut i = start + 1;
    while s.byte_at(i).is_some_and(|b| b.is_ascii_alphanumeric()) {
        i += 1;
    }
    // `<a href="?foo&bar=baz">` is fine even when `bar` names a reference.
    if s.byte_at(i) == Some(b'=') && context == CharRefContext::Attr {
        return Parsed::Fail(start);
    }
    if s.byte_at(i) != Some(b';') {
        s.die(
            start,
            format!(
                "Character reference '{}' didn't end in ;.",
                s.slice(start, i)
            ),
        );
        return Parsed::Fail(start);
    }
    let name = s.slice(start + 1, i);
    i += 1;
    match entities::lookup(name) {
        Some(text) => Parsed::Ok(text.to_string(), i),
        None => {
            s.die(
                start,
                format!("'{}' isn't a valid character reference.", s.slice(start, i)),
            );
            Parsed::Fail(start)
        }
    }
}

fn parse_numeric(s: &Stream<'_>, start: usize) -> Parsed<String> {
    let mut i = start + 2;
    let hex = matches!(s.byte_at(i), Some(b'x' | b'X'));
    if hex {
        i += 1;
    }
    let digits_start = i;
    while s.byte_at(i).is_some_and(|b| {
        if hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        }
    }) {
        i += 1;
    }
    if i == digits_start {
        s.die(
            start,
            format!(
                "Malformed numeric character reference '{}'.",
                s.slice(start, i)
            ),
        );
        return Parsed::Fail(start);
    }
    if s.byte_at(i) != Some(b';') {
        s.die(
            start,
            format!(
                "Character reference '{}' didn't end in ;.",
                s.slice(start, i)
            ),
        );
        return Parsed::Fail(start);
    }
    let radix = if hex { 16 } else { 10 };
    // Overlong digit runs saturate and land in the out-of-Unicode check.
    let cp = u32::from_str_radix(s.slice(digits_start, i), radix).unwrap_or(u32::MAX);
    i += 1;
    let text = s.slice(start, i);

    let problem = if cp == 0 {
        Some("Char refs can't resolve to null.".to_string())
    } else if cp > 0x10FFFF {
        Some(format!("Char ref '{text}' is outside of Unicode."))
    } else if (0xD800..=0xDFFF).contains(&cp) {
        Some(format!("Char ref '{text}' is a lone surrogate."))
    } else if is_noncharacter(cp) {
        Some(format!("Char ref '{text}' is a non-character."))
    } else if cp == 0x0D || is_control(cp) {
        Some(format!("Char ref '{text}' is a control character."))
    } else {
        None
    };
    if let Some(message) = problem {
        s.die(start, message);
        return Parsed::Fail(start);
    }
    match char::from_u32(cp) {
        Some(ch) => Parsed::Ok(ch.to_string(), i),
        None => Parsed::Fail(start),
    }
}

/// Writes every character of `text` as a decimal numeric reference.
pub(crate) fn numeric_refs(text: &str) -> String {
    text.chars().map(|ch| format!("&#{};", ch as u32)).collect()
}
