//! Filtering a Cobertura report while keeping it a Cobertura report.
//!
//! The report is loaded into an owned [`Document`] tree, [`rewrite`] builds
//! a new tree in which every `<class>` filename is made project-relative and
//! every `<package>` holding a class outside the filter is left out, and the
//! result is serialized back to XML. Everything else (declaration, comments,
//! whitespace, attribute order) is carried over as read.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use tracing::{debug, info};

use crate::error::{Result, ShimError};
use crate::filter::PathFilter;
use crate::parser::{get_attr, is_blank, outside_root, xml_err};

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    /// Text, comments, CDATA and processing instructions, kept verbatim.
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    children: Vec<Node>,
    self_closing: bool,
}

impl Element {
    fn new(start: BytesStart<'static>, self_closing: bool) -> Self {
        Self {
            start,
            children: Vec::new(),
            self_closing,
        }
    }

    /// Same tag and attributes, different children.
    fn with_children(&self, children: Vec<Node>) -> Self {
        Self {
            start: self.start.clone(),
            self_closing: self.self_closing && children.is_empty(),
            children,
        }
    }

    pub fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    fn is_named(&self, name: &[u8]) -> bool {
        self.name() == name
    }

    pub fn attr(&self, key: &str) -> Result<Option<String>> {
        get_attr(&self.start, key.as_bytes(), 0)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Other(_) => None,
        })
    }

    fn collect_descendants<'a>(&'a self, name: &[u8], out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.is_named(name) {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.self_closing {
            return write_event(writer, Event::Empty(self.start.borrow()));
        }
        write_event(writer, Event::Start(self.start.borrow()))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write(writer)?,
                Node::Other(event) => write_event(writer, event)?,
            }
        }
        write_event(writer, Event::End(self.start.to_end()))
    }
}

/// A whole XML document held in memory.
#[derive(Debug, Clone)]
pub struct Document {
    prolog: Vec<Event<'static>>,
    root: Element,
    epilog: Vec<Event<'static>>,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    prolog: Vec<Event<'static>>,
    root: Option<Element>,
    epilog: Vec<Event<'static>>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node, position: usize) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }
        match node {
            Node::Other(Event::Text(ref text)) if !is_blank(text) => {
                return Err(outside_root(position));
            }
            Node::Other(Event::CData(_)) => return Err(outside_root(position)),
            Node::Element(element) => {
                if self.root.is_some() {
                    return Err(ShimError::Malformed(
                        "document has more than one root element".into(),
                    ));
                }
                self.root = Some(element);
            }
            Node::Other(event) if self.root.is_none() => self.prolog.push(event),
            Node::Other(event) => self.epilog.push(event),
        }
        Ok(())
    }

    fn finish(self) -> Result<Document> {
        if let Some(open) = self.stack.last() {
            return Err(ShimError::Malformed(format!(
                "unexpected end of document inside <{}>",
                String::from_utf8_lossy(open.name())
            )));
        }
        let root = self
            .root
            .ok_or_else(|| ShimError::Malformed("document has no root element".into()))?;
        Ok(Document {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

impl Document {
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut xml = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut tree = TreeBuilder::default();

        loop {
            let event = xml.read_event_into(&mut buf);
            let position = xml.buffer_position();
            match event {
                Err(e) => return Err(xml_err(e, position)),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => tree.stack.push(Element::new(e.into_owned(), false)),
                Ok(Event::Empty(e)) => {
                    tree.attach(Node::Element(Element::new(e.into_owned(), true)), position)?;
                }
                Ok(Event::End(e)) => {
                    let element = tree.stack.pop().ok_or_else(|| {
                        ShimError::Malformed(format!(
                            "unexpected </{}> at position {position}",
                            String::from_utf8_lossy(e.name().as_ref())
                        ))
                    })?;
                    tree.attach(Node::Element(element), position)?;
                }
                Ok(other) => tree.attach(Node::Other(other.into_owned()), position)?,
            }
            buf.clear();
        }

        tree.finish()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let input = std::fs::read(path)?;
        Self::parse(&input)
    }

    /// All elements called `name`, in document order.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let name = name.as_bytes();
        let mut out = Vec::new();
        if self.root.is_named(name) {
            out.push(&self.root);
        }
        self.root.collect_descendants(name, &mut out);
        out
    }

    /// Serialize back to UTF-8 XML text.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.prolog {
            write_event(&mut writer, event)?;
        }
        self.root.write(&mut writer)?;
        for event in &self.epilog {
            write_event(&mut writer, event)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| {
            ShimError::Malformed(format!("report is not valid UTF-8: {e}"))
        })
    }
}

fn write_event<'a>(writer: &mut Writer<Vec<u8>>, event: impl AsRef<Event<'a>>) -> Result<()> {
    writer.write_event(event).map_err(|e| xml_err(e, 0))
}

/// Build a filtered copy of `doc`.
///
/// Packages are all-or-nothing: a package is kept only if every class in it
/// passes `filter`, in which case all of its class filenames are rewritten.
/// Packages without a `<classes>` element are kept unchanged.
pub fn rewrite(doc: &Document, filter: &PathFilter) -> Result<Document> {
    let mut children = Vec::with_capacity(doc.root.children.len());
    for child in &doc.root.children {
        match child {
            Node::Element(packages) if packages.is_named(b"packages") => {
                children.push(Node::Element(rewrite_packages(packages, filter)?));
            }
            other => children.push(other.clone()),
        }
    }

    Ok(Document {
        prolog: doc.prolog.clone(),
        root: doc.root.with_children(children),
        epilog: doc.epilog.clone(),
    })
}

fn rewrite_packages(packages: &Element, filter: &PathFilter) -> Result<Element> {
    let mut children = Vec::with_capacity(packages.children.len());
    let mut skip_tail = false;

    for child in &packages.children {
        match child {
            Node::Element(package) if package.is_named(b"package") => {
                match rewrite_package(package, filter)? {
                    Some(package) => {
                        children.push(Node::Element(package));
                        skip_tail = false;
                    }
                    None => {
                        let name = package.attr("name")?.unwrap_or_default();
                        info!(package = %name, "dropping package with classes outside the filter");
                        skip_tail = true;
                    }
                }
            }
            // Indentation after a dropped package goes with it.
            Node::Other(Event::Text(text)) if skip_tail && is_blank(text) => skip_tail = false,
            other => {
                children.push(other.clone());
                skip_tail = false;
            }
        }
    }

    Ok(packages.with_children(children))
}

fn rewrite_package(package: &Element, filter: &PathFilter) -> Result<Option<Element>> {
    let mut children = Vec::with_capacity(package.children.len());
    for child in &package.children {
        match child {
            Node::Element(classes) if classes.is_named(b"classes") => {
                match rewrite_classes(classes, filter)? {
                    Some(classes) => children.push(Node::Element(classes)),
                    None => return Ok(None),
                }
            }
            other => children.push(other.clone()),
        }
    }
    Ok(Some(package.with_children(children)))
}

/// `None` as soon as one class falls outside the filter.
fn rewrite_classes(classes: &Element, filter: &PathFilter) -> Result<Option<Element>> {
    let mut children = Vec::with_capacity(classes.children.len());
    for child in &classes.children {
        match child {
            Node::Element(class) if class.is_named(b"class") => {
                let filename = class.attr("filename")?;
                let Some(name) = filename.as_deref().and_then(|f| filter.matches(f)) else {
                    debug!(filename = ?filename, "class outside filter");
                    return Ok(None);
                };
                children.push(Node::Element(Element {
                    start: with_filename(&class.start, name)?,
                    children: class.children.clone(),
                    self_closing: class.self_closing,
                }));
            }
            other => children.push(other.clone()),
        }
    }
    Ok(Some(classes.with_children(children)))
}

/// Copy of `start` with its `filename` attribute replaced in place.
///
/// Every value is unescaped and written back escaped, so attributes quoted
/// with `'` stay well-formed once re-quoted with `"`.
fn with_filename(start: &BytesStart<'static>, filename: &str) -> Result<BytesStart<'static>> {
    let mut renamed = start.clone();
    renamed.clear_attributes();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_err(e.into(), 0))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| {
            ShimError::Malformed(format!("attribute name is not valid UTF-8: {e}"))
        })?;
        if key == "filename" {
            renamed.push_attribute((key, filename));
        } else {
            let value = attr.unescape_value().map_err(|e| xml_err(e, 0))?;
            renamed.push_attribute((key, value.as_ref()));
        }
    }
    Ok(renamed)
}
