//! A small element tree for OOXML parts.
//!
//! WordprocessingML parts are a few hundred kilobytes at most, so they are
//! read whole into [`Element`]s and walked by qualified name (`w:p`, `w:t`,
//! `r:id`). Word always writes the conventional prefixes.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Qualified name, e.g. `w:p`
    pub name: String,
    /// Attributes by qualified name
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> + 'a {
        let name = name.to_owned();
        self.elements().filter(move |e| e.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Follow a path of child names, e.g. `["w:tcPr", "w:gridSpan"]`.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Text nodes directly under this element.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Visit every descendant element depth-first, in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        for child in self.elements() {
            visit(child);
            child.walk(visit);
        }
    }
}

/// Parse a part into its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let el = start_element(&e)?;
                append(&mut stack, Node::Element(el));
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(Error::Xml("unbalanced end tag".to_string()));
                }
                if let Some(el) = stack.pop() {
                    append(&mut stack, Node::Element(el));
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if !text.is_empty() {
                    append(&mut stack, Node::Text(text.into_owned()));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append(&mut stack, Node::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(Error::Xml("unexpected end of document".to_string()));
    }
    stack
        .pop()
        .and_then(|doc| {
            doc.children.into_iter().find_map(|n| match n {
                Node::Element(e) => Some(e),
                Node::Text(_) => None,
            })
        })
        .ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Visible text of a `w:p`: its runs (including those inside hyperlinks,
/// insertions and smart tags), with tabs and line breaks.
///
/// Text boxes anchored in the paragraph are not part of its text.
pub fn paragraph_text(p: &Element) -> String {
    let mut out = String::new();
    collect_runs(p, &mut out);
    out
}

fn collect_runs(container: &Element, out: &mut String) {
    for child in container.elements() {
        match child.name.as_str() {
            "w:r" => run_text(child, out),
            "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" => collect_runs(child, out),
            _ => {}
        }
    }
}

fn run_text(run: &Element, out: &mut String) {
    for child in run.elements() {
        match child.name.as_str() {
            "w:t" => out.push_str(&child.text()),
            "w:tab" | "w:ptab" => out.push('\t'),
            "w:cr" => out.push('\n'),
            // Page and column breaks carry no text
            "w:br" => {
                if matches!(child.attr("w:type"), None | Some("textWrapping")) {
                    out.push('\n');
                }
            }
            "w:noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

/// Text of every `w:t` under an element, one entry per run, in document
/// order. With `floating_only`, only runs inside a `w:txbxContent`.
pub fn text_runs(el: &Element, floating_only: bool) -> Vec<String> {
    let mut out = Vec::new();
    collect_text_runs(el, false, floating_only, &mut out);
    out
}

fn collect_text_runs(el: &Element, in_textbox: bool, floating_only: bool, out: &mut Vec<String>) {
    for child in el.elements() {
        if child.name == "w:t" {
            if in_textbox || !floating_only {
                out.push(child.text());
            }
        } else {
            let inside = in_textbox || child.name == "w:txbxContent";
            collect_text_runs(child, inside, floating_only, out);
        }
    }
}
