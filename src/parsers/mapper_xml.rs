//! Mapper document parsing.
//!
//! A small element tree is built from the quick-xml event stream so that
//! statements can be collected per kind in document order and their text
//! gathered from every nested dynamic element. DOCTYPE declarations are
//! skipped, never resolved.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;

use crate::core::{MapperStatement, StatementKind};
use crate::errors::{ImpactError, Result};
use crate::observability::DiagnosticSink;

#[derive(Debug)]
struct Element {
    name: String,
    id: Option<String>,
    namespace: Option<String>,
    children: Vec<Child>,
}

#[derive(Debug)]
enum Child {
    Element(usize),
    Text(String),
}

/// Arena-backed element tree of one document
#[derive(Debug, Default)]
struct Document {
    elements: Vec<Element>,
    root: Option<usize>,
}

impl Document {
    /// Elements named `name`, depth first in document order
    fn find_all(&self, name: &str) -> Vec<usize> {
        let mut found = Vec::new();
        if let Some(root) = self.root {
            self.collect(root, name, &mut found);
        }
        found
    }

    fn collect(&self, index: usize, name: &str, found: &mut Vec<usize>) {
        let element = &self.elements[index];
        if element.name == name && Some(index) != self.root {
            found.push(index);
        }
        for child in &element.children {
            if let Child::Element(child) = child {
                self.collect(*child, name, found);
            }
        }
    }

    /// Trimmed text pieces of every descendant, space-joined and collapsed
    fn text_content(&self, index: usize) -> String {
        let mut pieces = Vec::new();
        self.gather_text(index, &mut pieces);
        pieces.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn gather_text<'a>(&'a self, index: usize, pieces: &mut Vec<&'a str>) {
        for child in &self.elements[index].children {
            match child {
                Child::Text(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        pieces.push(text);
                    }
                }
                Child::Element(child) => self.gather_text(*child, pieces),
            }
        }
    }
}

/// Parse the mapper file at `path`.
///
/// A document without a `namespace` on its root yields no statements and
/// one warning through `sink`.
pub fn parse_mapper_file(
    module: &str,
    path: &Path,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<MapperStatement>> {
    let bytes = fs::read(path).map_err(|e| ImpactError::io(path, e))?;
    let contents = String::from_utf8_lossy(&bytes);
    parse_mapper_str(module, path, &contents, sink)
}

/// Parse mapper document text that was read from `path`.
pub fn parse_mapper_str(
    module: &str,
    path: &Path,
    contents: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<MapperStatement>> {
    let document = build_document(contents).map_err(|message| ImpactError::parse(path, message))?;

    let Some(root) = document.root else {
        return Err(ImpactError::parse(path, "document has no root element"));
    };
    let namespace = match document.elements[root].namespace.as_deref() {
        Some(ns) if !ns.trim().is_empty() => ns.trim().to_string(),
        _ => {
            sink.warn(&format!("No namespace found in {}", path.display()));
            return Ok(Vec::new());
        }
    };

    let mut statements = Vec::new();
    for kind in StatementKind::ALL {
        for index in document.find_all(kind.tag()) {
            let element = &document.elements[index];
            let Some(id) = element.id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            statements.push(MapperStatement {
                module: module.to_string(),
                mapper_path: path.to_path_buf(),
                namespace: namespace.clone(),
                id: id.to_string(),
                kind,
                raw_sql: document.text_content(index),
            });
        }
    }

    sink.debug(&format!(
        "Parsed {} statements from {}",
        statements.len(),
        path.display()
    ));
    Ok(statements)
}

fn build_document(contents: &str) -> std::result::Result<Document, String> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(false);

    let mut document = Document::default();
    let mut stack: Vec<usize> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let index = open_element(&mut document, &stack, e)?;
                stack.push(index);
            }
            Ok(Event::Empty(ref e)) => {
                open_element(&mut document, &stack, e)?;
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                push_text(&mut document, &stack, text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut document, &stack, text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                ));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document: unclosed elements".to_string());
    }
    Ok(document)
}

fn open_element(
    document: &mut Document,
    stack: &[usize],
    e: &BytesStart<'_>,
) -> std::result::Result<usize, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut id = None;
    let mut namespace = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| format!("Attribute error: {e}"))?;
        let key = attr.key.as_ref();
        if key == b"id" || key == b"namespace" {
            let value = attr
                .unescape_value()
                .map_err(|e| format!("Attribute value error: {e}"))?
                .into_owned();
            if key == b"id" {
                id = Some(value);
            } else {
                namespace = Some(value);
            }
        }
    }

    let index = document.elements.len();
    document.elements.push(Element {
        name,
        id,
        namespace,
        children: Vec::new(),
    });

    match stack.last() {
        Some(parent) => document.elements[*parent].children.push(Child::Element(index)),
        None if document.root.is_none() => document.root = Some(index),
        None => return Err("multiple root elements".to_string()),
    }
    Ok(index)
}

fn push_text(document: &mut Document, stack: &[usize], text: String) {
    // text outside the root (whitespace, prolog) carries nothing
    if let Some(parent) = stack.last() {
        document.elements[*parent].children.push(Child::Text(text));
    }
}
