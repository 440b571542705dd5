//! HTML pretty-printer used for the formatted comparison.
//!
//! Output is one node per line, two-space indentation, attributes in name
//! order and text with whitespace runs collapsed. Preformatted elements keep
//! their content verbatim. Formatting already formatted output is a no-op.

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeData, NodeRef};

const INDENT: &str = "  ";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const VERBATIM_ELEMENTS: &[&str] = &[
    "pre", "textarea", "listing", "script", "style", "xmp", "iframe", "noembed", "noframes",
    "noscript", "plaintext",
];

// Raw text elements whose content must not be entity-escaped. The parser runs
// with scripting enabled, so <noscript> is one of them.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

pub trait HtmlFormatter {
    fn format(&self, html: &[u8]) -> Vec<u8>;
}

/// The default formatter, backed by an HTML5 parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyHtml;

impl HtmlFormatter for PrettyHtml {
    fn format(&self, html: &[u8]) -> Vec<u8> {
        format_html(html)
    }
}

pub fn format_html(html: &[u8]) -> Vec<u8> {
    let source = String::from_utf8_lossy(html);
    let document = kuchiki::parse_html().one(source.as_ref());
    let mut printer = Printer {
        out: String::with_capacity(html.len() + html.len() / 4),
        sealed: false,
    };
    for child in document.children() {
        printer.node(&child, 0);
    }
    printer.out.into_bytes()
}

struct Printer {
    out: String,
    // Everything after a <plaintext> start tag parses as its text, so once one
    // is written nothing else may follow.
    sealed: bool,
}

impl Printer {
    fn node(&mut self, node: &NodeRef, depth: usize) {
        match node.data() {
            NodeData::Doctype(doctype) => {
                self.line(depth, &format!("<!DOCTYPE {}>", doctype.name));
            }
            NodeData::Comment(text) => {
                self.line(depth, &format!("<!--{}-->", text.borrow()));
            }
            NodeData::Text(text) => {
                let collapsed = collapse_whitespace(&text.borrow());
                if !collapsed.is_empty() {
                    self.line(depth, &escape_text(&collapsed));
                }
            }
            NodeData::Element(element) => self.element(node, element, depth),
            NodeData::Document(_) | NodeData::DocumentFragment => {
                for child in node.children() {
                    self.node(&child, depth);
                }
            }
            NodeData::ProcessingInstruction(_) => {}
        }
    }

    fn element(&mut self, node: &NodeRef, element: &ElementData, depth: usize) {
        let name = element.name.local.as_ref();
        let open = open_tag(element);

        if VOID_ELEMENTS.contains(&name) {
            self.line(depth, &open);
            return;
        }

        if VERBATIM_ELEMENTS.contains(&name) {
            let mut inner = String::new();
            let mut unterminated = name == "plaintext";
            for child in node.children() {
                if write_verbatim(&child, name, &mut inner) {
                    unterminated = true;
                    break;
                }
            }
            // The parser drops one leading newline after <pre>; keep it stable.
            if matches!(name, "pre" | "textarea" | "listing") && inner.starts_with('\n') {
                inner.insert(0, '\n');
            }
            if unterminated {
                self.seal(depth, &format!("{open}{inner}"));
            } else {
                self.line(depth, &format!("{open}{inner}</{name}>"));
            }
            return;
        }

        if node.children().next().is_none() {
            self.line(depth, &format!("{open}</{name}>"));
            return;
        }

        self.line(depth, &open);
        for child in node.children() {
            self.node(&child, depth + 1);
        }
        self.line(depth, &format!("</{name}>"));
    }

    fn line(&mut self, depth: usize, text: &str) {
        if self.sealed {
            return;
        }
        self.indent(depth);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn seal(&mut self, depth: usize, text: &str) {
        if self.sealed {
            return;
        }
        self.indent(depth);
        self.out.push_str(text);
        self.sealed = true;
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }
}

/// Writes `node` unchanged. Returns true when a `<plaintext>` element was
/// written, after which the caller must stop.
fn write_verbatim(node: &NodeRef, parent: &str, out: &mut String) -> bool {
    match node.data() {
        NodeData::Text(text) => {
            if RAW_TEXT_ELEMENTS.contains(&parent) {
                out.push_str(&text.borrow());
            } else {
                out.push_str(&escape_text(&text.borrow()));
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&text.borrow());
            out.push_str("-->");
        }
        NodeData::Element(element) => {
            let name = element.name.local.as_ref();
            out.push_str(&open_tag(element));
            if VOID_ELEMENTS.contains(&name) {
                return false;
            }
            for child in node.children() {
                if write_verbatim(&child, name, out) {
                    return true;
                }
            }
            if name == "plaintext" {
                return true;
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        _ => {}
    }
    false
}

fn open_tag(element: &ElementData) -> String {
    let mut tag = String::from("<");
    tag.push_str(element.name.local.as_ref());
    let attributes = element.attributes.borrow();
    let mut attrs: Vec<(String, &str)> = attributes
        .map
        .iter()
        .map(|(name, attr)| {
            let qualified = match &attr.prefix {
                Some(prefix) => format!("{prefix}:{}", name.local),
                None => name.local.to_string(),
            };
            (qualified, attr.value.as_str())
        })
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in attrs {
        tag.push(' ');
        tag.push_str(&name);
        tag.push_str("=\"");
        tag.push_str(&escape_attribute(value));
        tag.push('"');
    }
    tag.push('>');
    tag
}

fn collapse_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            c => escaped.push(c),
        }
    }
    escaped
}
