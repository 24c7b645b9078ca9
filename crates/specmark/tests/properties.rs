use specmark::parser::charref::{CharRefContext, parse_char_ref};
use specmark::parser::tags::parse_start_tag;
use specmark::{Diagnostics, Node, ParseConfig, Stream, nodes_from_html, parse_text};

fn parse_closed(src: &str, config: &ParseConfig) -> (Vec<Node>, Diagnostics) {
    let diags = Diagnostics::new();
    let nodes = nodes_from_html(src, config, &diags, 1, true);
    (nodes, diags)
}

#[test]
fn plain_text_is_one_raw_text() {
    let samples = [
        "hello world",
        "several\nlines of\ntext\n",
        "tabs\tand  spaces ",
        "ünïcödé 42 (ok) {fine} = yes!",
    ];
    for src in samples {
        let (nodes, diags) = parse_closed(src, &ParseConfig::default());
        assert_eq!(nodes.len(), 1, "input {src:?}");
        assert!(matches!(&nodes[0], Node::RawText(_)), "input {src:?}");
        assert_eq!(nodes[0].to_string(), src);
        assert!(diags.is_empty());
    }
}

#[test]
fn well_formed_markup_round_trips() {
    let samples = [
        "<p>a <em>b</em></p>",
        "<div class=\"x y\">\n<span id=\"s\">t</span>\n</div>\n",
        "<ul>\n<li>one</li>\n<li>two</li>\n</ul>",
        "<p>line<br>break <img alt=\"i\" src=\"i.png\"></p>",
        "<!doctype html>\n<!-- c -->\n<p hidden>x</p>",
        "<table><tr><td>1</td></tr></table>",
    ];
    for src in samples {
        let diags = Diagnostics::new();
        let out = parse_text(src, &ParseConfig::default(), &diags, 1, true);
        assert_eq!(out, src);
        assert!(diags.is_empty(), "{src:?}: {:?}", diags.messages());
    }
}

#[test]
fn line_of_is_monotonic_from_start_line() {
    let src = "one\ntwo — three\n\nfour\n";
    let config = ParseConfig::default();
    let diags = Diagnostics::new();
    let s = Stream::new(src, &config, &diags, 7);
    assert_eq!(s.line_of(0), 7);
    let mut last = s.line_of(0);
    for (offset, _) in src.char_indices().chain([(src.len(), ' ')]) {
        let line = s.line_of(offset);
        assert!(line >= last, "line_of went backwards at {offset}");
        last = line;
    }
    assert_eq!(last, 11);
}

#[test]
fn numeric_reference_validity() {
    let config = ParseConfig::default();
    for bad in ["&#0;", "&#x110000;", "&#xD800;", "&#xD;"] {
        let diags = Diagnostics::new();
        let s = Stream::new(bad, &config, &diags, 1);
        assert!(
            parse_char_ref(&s, 0, CharRefContext::Text).is_fail(),
            "{bad} should not resolve"
        );
    }
    let diags = Diagnostics::new();
    let s = Stream::new("&#65;", &config, &diags, 1);
    assert_eq!(
        parse_char_ref(&s, 0, CharRefContext::Text).ok(),
        Some(("A".to_string(), 5))
    );
}

#[test]
fn recursive_macros_stop_with_an_error() {
    // `[A]` resolves to the lowercase entry, which calls itself.
    let config = ParseConfig::default()
        .with_macro("a", "[A]")
        .with_macro("A", "[a]");
    let (nodes, diags) = parse_closed("x [A] y", &config);
    let rendered: String = nodes.iter().map(Node::to_string).collect();
    assert_eq!(rendered, "x [A] y");
    assert_eq!(diags.error_count(), 1);
    assert!(diags.messages()[0].contains("recursed more than 10 levels deep"));
}

#[test]
fn macro_names_match_regardless_of_case() {
    let config = ParseConfig::default().with_macro("Title", "Fancy <b>Spec</b>");
    let (nodes, diags) = parse_closed("[TITLE]!", &config);
    let rendered: String = nodes.iter().map(Node::to_string).collect();
    assert_eq!(rendered, "Fancy <b>Spec</b>!");
    assert!(diags.is_empty());
}

#[test]
fn undefined_optional_macro_vanishes() {
    let (nodes, diags) = parse_closed("a[FOO?]b", &ParseConfig::default());
    let rendered: String = nodes.iter().map(Node::to_string).collect();
    assert_eq!(rendered, "ab");
    assert!(diags.is_empty());

    let (nodes, diags) = parse_closed("<p title=\"a[FOO?]b\">x</p>", &ParseConfig::default());
    let Node::StartTag(tag) = &nodes[0] else {
        panic!("expected <p>, got {:?}", nodes[0]);
    };
    assert_eq!(tag.attr("title"), Some("ab"));
    assert!(diags.is_empty());
}

fn title_of(src: &str, config: &ParseConfig) -> (Option<String>, Diagnostics) {
    let (nodes, diags) = parse_closed(src, config);
    let title = match &nodes[0] {
        Node::StartTag(tag) => tag.attr("title").map(str::to_string),
        _ => None,
    };
    (title, diags)
}

#[test]
fn attribute_macros_rescan_a_bounded_number_of_times() {
    let config = ParseConfig::default().with_macro("x", "[X]");
    let (title, diags) = title_of("<p title=\"[X]\">", &config);
    assert_eq!(title.as_deref(), Some("[X]"));
    assert_eq!(diags.error_count(), 1);
    assert!(diags.messages()[0].contains("recursed more than 10 levels deep"));

    // Replacement boundaries are kept, so halves never join into a new call.
    let config = ParseConfig::default()
        .with_macro("half", "[LE")
        .with_macro("vel", "VEL]")
        .with_macro("level", "4");
    let (title, diags) = title_of("<p title=\"[HALF][VEL]\">", &config);
    assert_eq!(title.as_deref(), Some("[LEVEL]"));
    assert!(diags.is_empty());

    let config = ParseConfig::default()
        .with_macro("outer", "v[INNER]")
        .with_macro("inner", "[LEVEL]")
        .with_macro("level", "4");
    let (title, diags) = title_of("<p title=\"[OUTER]\">", &config);
    assert_eq!(title.as_deref(), Some("v4"));
    assert!(diags.is_empty());
}

#[test]
fn self_closing_syntax() {
    let config = ParseConfig::default();
    for src in ["<br/>", "<br />"] {
        let diags = Diagnostics::new();
        let s = Stream::new(src, &config, &diags, 1);
        match parse_start_tag(&s, 0).ok() {
            Some((Node::SelfClosedTag(tag), end)) => {
                assert_eq!(tag.name(), "br");
                assert_eq!(end, src.len());
            }
            other => panic!("{src}: expected a self-closed tag, got {other:?}"),
        }
        assert!(diags.is_empty());
    }

    let diags = Diagnostics::new();
    let s = Stream::new("<div/>", &config, &diags, 1);
    assert!(parse_start_tag(&s, 0).is_fail());
    assert_eq!(diags.error_count(), 1);
    assert!(diags.messages()[0].contains("self-closing"));
    assert!(diags.messages()[0].contains("spurious /"));

    let diags = Diagnostics::new();
    let s = Stream::new("<img/>", &config, &diags, 1);
    assert!(matches!(parse_start_tag(&s, 0).ok(), Some((Node::SelfClosedTag(_), 6))));
    assert_eq!(diags.error_count(), 0);
    assert!(diags.messages()[0].contains("spurious trailing /"));
}

#[test]
fn fenced_block_becomes_one_xmp() {
    let (nodes, diags) = parse_closed("```js\nlet x = 1;\n```", &ParseConfig::default());
    assert_eq!(nodes.len(), 1);
    let Node::RawElement(el) = &nodes[0] else {
        panic!("expected a raw element, got {:?}", nodes[0]);
    };
    assert_eq!(el.tag(), "xmp");
    assert!(el.start_tag.has_class("language-js"));
    assert_eq!(el.data, "\nlet x = 1;\n");
    assert!(diags.is_empty());
}

#[test]
fn unclosed_div_with_trailing_paragraph() {
    let (nodes, diags) = parse_closed("<div><p>text", &ParseConfig::default());
    let ends: Vec<_> = nodes
        .iter()
        .filter_map(|node| match node {
            Node::EndTag(end) => Some((end.name.as_str(), end.synthetic)),
            _ => None,
        })
        .collect();
    assert_eq!(ends, vec![("p", true), ("div", true)]);
    assert_eq!(diags.len(), 1);
    assert!(diags.messages()[0].contains("<div>"));
}
