/// Streaming reader for the line coverage of a Cobertura XML report.
///
/// Only the parts of the schema needed for line coverage are looked at:
///   <coverage>
///     <packages>
///       <package name="...">
///         <classes>
///           <class filename="..." line-rate="...">
///             <lines>
///               <line number="..." hits="..."/>
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// Each `<class>` whose filename passes the [`PathFilter`] becomes one
/// [`CoverageFile`]. Several classes may share a filename; they are emitted
/// as separate records in document order.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use crate::error::{Result, ShimError};
use crate::filter::PathFilter;
use crate::model::{CoverageFile, MAX_LINE};

/// Element callbacks for a streaming walk over an XML document.
///
/// Self-closing elements are reported as a `start` immediately followed by
/// an `end`.
pub trait XmlVisitor {
    fn start(&mut self, element: &BytesStart<'_>, position: usize) -> Result<()>;
    fn end(&mut self, name: &[u8]) -> Result<()>;
}

/// Drive `visitor` over every element of the document in `reader`.
pub fn walk(reader: &mut dyn BufRead, visitor: &mut dyn XmlVisitor) -> Result<()> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = xml.read_event_into(&mut buf);
        let position = xml.buffer_position();
        match event {
            Err(e) => return Err(xml_err(e, position)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) => {
                if depth == 0 {
                    check_single_root(seen_root, position)?;
                }
                depth += 1;
                seen_root = true;
                visitor.start(e, position)?;
            }
            Ok(Event::Empty(ref e)) => {
                if depth == 0 {
                    check_single_root(seen_root, position)?;
                }
                seen_root = true;
                visitor.start(e, position)?;
                visitor.end(e.name().as_ref())?;
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                visitor.end(e.name().as_ref())?;
            }
            Ok(Event::Text(ref e)) if depth == 0 && !is_blank(e) => {
                return Err(outside_root(position));
            }
            Ok(Event::CData(_)) if depth == 0 => return Err(outside_root(position)),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ShimError::Malformed("document has no root element".into()));
    }
    if depth > 0 {
        return Err(ShimError::Malformed(format!(
            "unexpected end of document with {depth} unclosed element(s)"
        )));
    }
    Ok(())
}

enum State {
    Idle,
    InMatchedClass(CoverageFile),
}

/// Collects matching `<class>` elements into [`CoverageFile`]s.
struct ClassCollector<'a> {
    filter: &'a PathFilter,
    state: State,
    emit: &'a mut dyn FnMut(CoverageFile) -> Result<()>,
}

impl ClassCollector<'_> {
    fn open_class(&mut self, element: &BytesStart<'_>, position: usize) -> Result<()> {
        if let State::InMatchedClass(previous) = &self.state {
            debug!(name = previous.name(), "class opened before the previous one closed");
        }

        let Some(filename) = get_attr(element, b"filename", position)? else {
            debug!(position, "skipping class without filename");
            self.state = State::Idle;
            return Ok(());
        };

        self.state = match self.filter.matches(&filename) {
            Some(name) => {
                let line_rate = get_attr(element, b"line-rate", position)?.unwrap_or_default();
                debug!(filename = %filename, name, "class matched");
                State::InMatchedClass(CoverageFile::new(name, line_rate))
            }
            None => {
                debug!(filename = %filename, "class filtered out");
                State::Idle
            }
        };
        Ok(())
    }

    fn record_line(&mut self, element: &BytesStart<'_>, position: usize) -> Result<()> {
        // Lines of unmatched classes are ignored.
        let State::InMatchedClass(file) = &mut self.state else {
            return Ok(());
        };
        let number: u32 = numeric_attr(element, b"number", position)?;
        if number > MAX_LINE {
            return Err(ShimError::Data(format!(
                "<line> at position {position}: line number {number} exceeds {MAX_LINE}"
            )));
        }
        let hits: u64 = numeric_attr(element, b"hits", position)?;
        file.add_hit(number, hits);
        Ok(())
    }
}

impl XmlVisitor for ClassCollector<'_> {
    fn start(&mut self, element: &BytesStart<'_>, position: usize) -> Result<()> {
        match element.name().as_ref() {
            b"class" => self.open_class(element, position),
            b"line" => self.record_line(element, position),
            _ => Ok(()),
        }
    }

    fn end(&mut self, name: &[u8]) -> Result<()> {
        if name == b"class" {
            if let State::InMatchedClass(file) = std::mem::replace(&mut self.state, State::Idle) {
                (self.emit)(file)?;
            }
        }
        Ok(())
    }
}

/// Streaming parse — calls `emit` once per matching `</class>`.
pub fn parse_streaming(
    reader: &mut dyn BufRead,
    filter: &PathFilter,
    emit: &mut dyn FnMut(CoverageFile) -> Result<()>,
) -> Result<()> {
    let mut collector = ClassCollector {
        filter,
        state: State::Idle,
        emit,
    };
    walk(reader, &mut collector)
}

/// Parse a whole report held in memory.
#[cfg(test)]
pub(crate) fn parse(input: &[u8], filter: &PathFilter) -> Result<Vec<CoverageFile>> {
    let mut files = Vec::new();
    parse_streaming(&mut &*input, filter, &mut |file| {
        files.push(file);
        Ok(())
    })?;
    Ok(files)
}

/// Parse the report at `path` without loading it into memory first.
pub fn parse_file(path: &Path, filter: &PathFilter) -> Result<Vec<CoverageFile>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut files = Vec::new();
    parse_streaming(&mut reader, filter, &mut |file| {
        files.push(file);
        Ok(())
    })?;
    debug!(path = %path.display(), files = files.len(), "parsed coverage report");
    Ok(files)
}

fn check_single_root(seen_root: bool, position: usize) -> Result<()> {
    if seen_root {
        return Err(ShimError::Malformed(format!(
            "second root element at position {position}"
        )));
    }
    Ok(())
}

pub(crate) fn outside_root(position: usize) -> ShimError {
    ShimError::Malformed(format!("text outside the root element at position {position}"))
}

pub(crate) fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

pub(crate) fn xml_err(source: quick_xml::Error, position: usize) -> ShimError {
    ShimError::Xml { source, position }
}

/// Fetch and unescape a single attribute.
pub(crate) fn get_attr(
    element: &BytesStart<'_>,
    key: &[u8],
    position: usize,
) -> Result<Option<String>> {
    let attr = element
        .try_get_attribute(key)
        .map_err(|e| xml_err(e.into(), position))?;
    match attr {
        Some(attr) => {
            let value = attr.unescape_value().map_err(|e| xml_err(e, position))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn numeric_attr<T: std::str::FromStr>(
    element: &BytesStart<'_>,
    key: &[u8],
    position: usize,
) -> Result<T> {
    let key_name = String::from_utf8_lossy(key);
    let value = get_attr(element, key, position)?.ok_or_else(|| {
        ShimError::Data(format!(
            "<line> at position {position} has no `{key_name}` attribute"
        ))
    })?;
    value.trim().parse().map_err(|_| {
        ShimError::Data(format!(
            "<line> at position {position}: `{key_name}` is not an integer: {value:?}"
        ))
    })
}
