//! Character class predicates shared by the scanners.

/// HTML whitespace: tab, LF, FF, space.
#[inline]
pub fn is_whitespace(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\u{0C}' | ' ')
}

/// C0/C1 controls, excluding the ones HTML treats as whitespace.
pub fn is_control(cp: u32) -> bool {
    cp <= 0x08 || cp == 0x0B || (0x0D..=0x1F).contains(&cp) || (0x7F..=0x9F).contains(&cp)
}

pub fn is_noncharacter(cp: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE == 0xFFFE && cp <= 0x10FFFF)
}

pub fn is_attr_name_char(ch: char) -> bool {
    !is_whitespace(ch) && !matches!(ch, '/' | '<' | '>' | '=' | '"' | '\'' | '\0')
}

pub fn is_tagname_char(ch: char) -> bool {
    if matches!(ch, '-' | '.' | '_') || ch.is_ascii_alphanumeric() {
        return true;
    }
    let cp = ch as u32;
    match cp {
        0xB7 => true,
        0xC0..=0x1FFF => !matches!(cp, 0xD7 | 0xF7 | 0x37E),
        0x200C | 0x200D | 0x203F | 0x2040 => true,
        0x2070..=0x218F => true,
        0x2C00..=0x2FEF => true,
        0x3001..=0xD7FF => true,
        0xF900..=0xFDCF => true,
        0xFDF0..=0xFFFD => true,
        0x10000..=0xEFFFF => true,
        _ => false,
    }
}

/// `\w` in the Unicode sense: alphanumerics plus underscore.
#[inline]
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Element names that may legally use `<foo/>` self-closing syntax.
pub fn is_xmlish_tagname(name: &str) -> bool {
    name.contains(':') || XMLISH_TAGNAMES.binary_search(&name).is_ok()
}

// SVG and MathML element names, sorted.
const XMLISH_TAGNAMES: &[&str] = &[
    "animate",
    "animateMotion",
    "animateTransform",
    "annotation",
    "annotation-xml",
    "circle",
    "clipPath",
    "defs",
    "desc",
    "ellipse",
    "feBlend",
    "feColorMatrix",
    "feComponentTransfer",
    "feComposite",
    "feConvolveMatrix",
    "feDiffuseLighting",
    "feDisplacementMap",
    "feDistantLight",
    "feDropShadow",
    "feFlood",
    "feFuncA",
    "feFuncB",
    "feFuncG",
    "feFuncR",
    "feGaussianBlur",
    "feImage",
    "feMerge",
    "feMergeNode",
    "feMorphology",
    "feOffset",
    "fePointLight",
    "feSpecularLighting",
    "feSpotLight",
    "feTile",
    "feTurbulence",
    "filter",
    "foreignObject",
    "g",
    "image",
    "line",
    "linearGradient",
    "maction",
    "marker",
    "mask",
    "math",
    "merror",
    "metadata",
    "mfrac",
    "mi",
    "mmultiscripts",
    "mn",
    "mo",
    "mover",
    "mpadded",
    "mpath",
    "mphantom",
    "mprescripts",
    "mroot",
    "mrow",
    "ms",
    "mspace",
    "msqrt",
    "mstyle",
    "msub",
    "msubsup",
    "msup",
    "mtable",
    "mtd",
    "mtext",
    "mtr",
    "munder",
    "munderover",
    "path",
    "pattern",
    "polygon",
    "polyline",
    "radialGradient",
    "rect",
    "semantics",
    "set",
    "stop",
    "svg",
    "switch",
    "symbol",
    "text",
    "textPath",
    "tspan",
    "use",
    "view",
];
