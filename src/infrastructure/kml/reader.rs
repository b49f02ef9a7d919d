//! Placemark extraction from KML sources
//!
//! Two strategies with identical results:
//! - whole document: the file is read and parsed into an [`Element`] tree, then
//!   placemarks are collected with one traversal;
//! - streaming: one pass over the reader events, only placemark subtrees are
//!   materialised and every event buffer is released before the next read.
//!
//! Only outermost matches are collected; a placemark nested in another one
//! travels inside its parent.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, instrument};

use crate::domain::qname::{split_qname, QualifiedName, XML_NAMESPACE};
use crate::domain::{Binding, Element, ParseStrategy, Placemark, XmlNode, PLACEMARK};
use crate::infrastructure::kml::error::{ParseError, ParseErrorKind, ParseResultExt};
use crate::infrastructure::traits::PlacemarkExtractor;

/// Filesystem-backed extractor choosing its strategy by file size.
#[derive(Debug, Clone)]
pub struct KmlExtractor {
    large_file_threshold: u64,
}

impl KmlExtractor {
    pub fn new(large_file_threshold: u64) -> Self {
        Self {
            large_file_threshold,
        }
    }

    pub fn large_file_threshold(&self) -> u64 {
        self.large_file_threshold
    }

    pub fn strategy_for(&self, path: &Path) -> Result<ParseStrategy, ParseError> {
        let size = std::fs::metadata(path).for_source(path)?.len();
        Ok(ParseStrategy::for_size(size, self.large_file_threshold))
    }
}

impl PlacemarkExtractor for KmlExtractor {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn extract(&self, path: &Path) -> Result<Vec<Placemark>, ParseError> {
        match self.strategy_for(path)? {
            ParseStrategy::Streaming => {
                info!("Processing large file {} with streaming", path.display());
                extract_streaming(path)
            }
            ParseStrategy::WholeDocument => {
                info!("Processing file {} as whole document", path.display());
                extract_whole_document(path)
            }
        }
    }

    fn count(&self, path: &Path) -> Result<usize, ParseError> {
        let file = File::open(path).for_source(path)?;
        let mut count = 0;
        stream_placemarks(BufReader::new(file), PLACEMARK, |_| count += 1).for_source(path)?;
        Ok(count)
    }
}

/// Extract with the streaming reader regardless of size.
pub fn extract_streaming(path: &Path) -> Result<Vec<Placemark>, ParseError> {
    let file = File::open(path).for_source(path)?;
    let mut placemarks = Vec::new();
    stream_placemarks(BufReader::new(file), PLACEMARK, |p| placemarks.push(p)).for_source(path)?;
    debug!("streamed {} placemarks from {}", placemarks.len(), path.display());
    Ok(placemarks)
}

/// Extract by parsing the whole document into memory regardless of size.
pub fn extract_whole_document(path: &Path) -> Result<Vec<Placemark>, ParseError> {
    let bytes = std::fs::read(path).for_source(path)?;
    let root = parse_document(bytes.as_slice()).for_source(path)?;
    let placemarks = find_all(root, PLACEMARK);
    debug!("collected {} placemarks from {}", placemarks.len(), path.display());
    Ok(placemarks)
}

/// Parse a complete document into its root element.
pub fn parse_document<R: BufRead>(input: R) -> Result<Element, ParseErrorKind> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut tree = TreeBuilder::default();
    let mut root = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| ParseErrorKind::Xml {
                position: reader.buffer_position(),
                source,
            })?;
        let position = reader.buffer_position();
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    return Err(structure(position, "content after the root element"));
                }
                tree.open(element_from(&e, position)?);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    return Err(structure(position, "content after the root element"));
                }
                tree.open(element_from(&e, position)?);
                if let Some(done) = tree.close(position)? {
                    root = Some(done);
                }
            }
            Event::End(_) => {
                if let Some(done) = tree.close(position)? {
                    root = Some(done);
                }
            }
            Event::Eof => break,
            other => {
                if tree.depth() == 0 {
                    reject_outside_root(&other, position)?;
                } else if let Some(node) = content_node(other, position)? {
                    tree.content(node);
                }
            }
        }
        buf.clear();
    }

    if tree.depth() > 0 {
        return Err(unclosed(reader.buffer_position(), tree.depth()));
    }
    root.ok_or_else(|| structure(reader.buffer_position(), "document has no root element"))
}

/// Collect every outermost element matching `target` in a parsed tree.
pub fn find_all(root: Element, target: QualifiedName) -> Vec<Placemark> {
    let mut scope = NamespaceScope::default();
    let mut found = Vec::new();
    collect_matching(root, target, &mut scope, &mut found);
    found
}

fn collect_matching(
    element: Element,
    target: QualifiedName,
    scope: &mut NamespaceScope,
    found: &mut Vec<Placemark>,
) {
    scope.push(element.declarations());
    let (prefix, local) = split_qname(&element.name);
    if target.matches(scope.resolve(prefix), local) {
        let inherited = scope.inherited();
        scope.pop();
        found.push(Placemark::rehome(element, &inherited));
        return;
    }
    for child in element.children {
        if let XmlNode::Element(child) = child {
            collect_matching(child, target, scope, found);
        }
    }
    scope.pop();
}

/// Single pass over `input`, handing each completed `target` subtree to `emit`.
///
/// Nothing outside a matching subtree is retained.
pub fn stream_placemarks<R: BufRead>(
    input: R,
    target: QualifiedName,
    mut emit: impl FnMut(Placemark),
) -> Result<(), ParseErrorKind> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut state = StreamState::new(target);

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| ParseErrorKind::Xml {
                position: reader.buffer_position(),
                source,
            })?;
        let position = reader.buffer_position();
        match event {
            Event::Start(e) => state.open(element_from(&e, position)?, position)?,
            Event::Empty(e) => {
                state.open(element_from(&e, position)?, position)?;
                if let Some(placemark) = state.close(position)? {
                    emit(placemark);
                }
            }
            Event::End(_) => {
                if let Some(placemark) = state.close(position)? {
                    emit(placemark);
                }
            }
            Event::Eof => break,
            other => {
                if state.depth == 0 {
                    reject_outside_root(&other, position)?;
                } else if state.capturing() {
                    if let Some(node) = content_node(other, position)? {
                        state.content(node);
                    }
                }
            }
        }
        buf.clear();
    }

    state.finish(reader.buffer_position())
}

struct Capture {
    tree: TreeBuilder,
    inherited: Vec<Binding>,
}

struct StreamState {
    target: QualifiedName,
    scope: NamespaceScope,
    depth: usize,
    root_closed: bool,
    seen_root: bool,
    capture: Option<Capture>,
}

impl StreamState {
    fn new(target: QualifiedName) -> Self {
        Self {
            target,
            scope: NamespaceScope::default(),
            depth: 0,
            root_closed: false,
            seen_root: false,
            capture: None,
        }
    }

    fn capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn open(&mut self, element: Element, position: usize) -> Result<(), ParseErrorKind> {
        if self.root_closed {
            return Err(structure(position, "content after the root element"));
        }
        self.seen_root = true;
        self.depth += 1;
        self.scope.push(element.declarations());

        match self.capture.as_mut() {
            Some(capture) => capture.tree.open(element),
            None => {
                let (prefix, local) = split_qname(&element.name);
                if self.target.matches(self.scope.resolve(prefix), local) {
                    let mut tree = TreeBuilder::default();
                    tree.open(element);
                    self.capture = Some(Capture {
                        tree,
                        inherited: self.scope.inherited(),
                    });
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, position: usize) -> Result<Option<Placemark>, ParseErrorKind> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| structure(position, "end tag without matching start tag"))?;
        self.scope.pop();
        if self.depth == 0 {
            self.root_closed = true;
        }

        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        match capture.tree.close(position)? {
            Some(element) => {
                let inherited = std::mem::take(&mut capture.inherited);
                self.capture = None;
                Ok(Some(Placemark::rehome(element, &inherited)))
            }
            None => Ok(None),
        }
    }

    fn content(&mut self, node: XmlNode) {
        if let Some(capture) = self.capture.as_mut() {
            capture.tree.content(node);
        }
    }

    fn finish(self, position: usize) -> Result<(), ParseErrorKind> {
        if self.depth > 0 {
            return Err(unclosed(position, self.depth));
        }
        if !self.seen_root {
            return Err(structure(position, "document has no root element"));
        }
        Ok(())
    }
}

/// Stack of open elements; a closed element is attached to its parent.
#[derive(Debug, Default)]
struct TreeBuilder {
    stack: Vec<Element>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn content(&mut self, node: XmlNode) {
        if let Some(top) = self.stack.last_mut() {
            top.push_child(node);
        }
    }

    /// Close the innermost element; returns it when it was the outermost one.
    fn close(&mut self, position: usize) -> Result<Option<Element>, ParseErrorKind> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| structure(position, "end tag without matching start tag"))?;
        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_child(XmlNode::Element(element));
                Ok(None)
            }
            None => Ok(Some(element)),
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// In-scope namespace declarations, one frame per open element.
#[derive(Debug, Default)]
struct NamespaceScope {
    frames: Vec<Vec<Binding>>,
}

impl NamespaceScope {
    fn push(&mut self, declarations: Vec<Binding>) {
        self.frames.push(declarations);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Namespace URI bound to `prefix`; `xmlns=""` unbinds the default.
    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Effective bindings of every frame except the innermost one.
    fn inherited(&self) -> Vec<Binding> {
        let outer = self.frames.len().saturating_sub(1);
        let mut bindings: Vec<Binding> = Vec::new();
        for (prefix, uri) in self.frames[..outer].iter().flatten() {
            bindings.retain(|(p, _)| p != prefix);
            if !uri.is_empty() {
                bindings.push((prefix.clone(), uri.clone()));
            }
        }
        bindings
    }
}

fn element_from(start: &BytesStart<'_>, position: usize) -> Result<Element, ParseErrorKind> {
    let name = utf8(start.name().as_ref(), position)?;
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ParseErrorKind::Xml {
            position,
            source: e.into(),
        })?;
        let key = utf8(attribute.key.as_ref(), position)?;
        let value = attribute
            .unescape_value()
            .map_err(|source| ParseErrorKind::Xml { position, source })?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

/// Convert a non-structural event into a child node. Whitespace-only text,
/// declarations, processing instructions and doctypes yield nothing.
fn content_node(event: Event<'_>, position: usize) -> Result<Option<XmlNode>, ParseErrorKind> {
    let node = match event {
        Event::Text(text) => {
            let text = text
                .unescape()
                .map_err(|source| ParseErrorKind::Xml { position, source })?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            XmlNode::Text(text.into_owned())
        }
        Event::CData(data) => XmlNode::CData(utf8(&data, position)?),
        Event::Comment(comment) => XmlNode::Comment(utf8(&comment, position)?),
        _ => return Ok(None),
    };
    Ok(Some(node))
}

/// Character data is only allowed inside the root element.
fn reject_outside_root(event: &Event<'_>, position: usize) -> Result<(), ParseErrorKind> {
    let stray = match event {
        Event::Text(text) => !text.iter().all(u8::is_ascii_whitespace),
        Event::CData(_) => true,
        _ => false,
    };
    if stray {
        return Err(structure(position, "text outside the root element"));
    }
    Ok(())
}

fn utf8(bytes: &[u8], position: usize) -> Result<String, ParseErrorKind> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| structure(position, format!("invalid UTF-8: {e}")))
}

fn structure(position: usize, message: impl Into<String>) -> ParseErrorKind {
    ParseErrorKind::Structure {
        position,
        message: message.into(),
    }
}

fn unclosed(position: usize, depth: usize) -> ParseErrorKind {
    structure(
        position,
        format!("unexpected end of document, {depth} element(s) left open"),
    )
}
