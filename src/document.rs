//! Embedded-document codec.
//!
//! Some resources carry a rootless tag fragment as an opaque sub-field, e.g.
//! `<webAccess>0</webAccess><sshAccess>1</sshAccess><ice><mode>on</mode></ice>`.
//! This module turns such a fragment into an ordered mapping and back, and
//! patches single paths in the mapping.
//!
//! Decoding rules:
//! - an element with non-whitespace text yields that text as written;
//! - any other element yields a nested mapping of its children, so an empty
//!   element decodes to an empty mapping;
//! - attributes are ignored and duplicate siblings keep the last value.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::error::{DocumentError, DocumentParseError};
use crate::types::{json_type_name, Record};

/// Decoded embedded document: tag name to text or nested document.
pub type EmbeddedDocument = Record;

/// Default separator for [`patch`] paths.
pub const DEFAULT_DELIMITER: &str = "/";

/// Synthetic root wrapped around a fragment while parsing.
const ROOT_TAG: &str = "_fragment_root_";

/// Decode a rootless tag fragment.
///
/// An empty (or whitespace-only) fragment decodes to an empty document.
///
/// # Errors
///
/// Returns `DocumentParseError` for malformed fragments; nothing is recovered.
pub fn decode(fragment: &str) -> Result<EmbeddedDocument, DocumentParseError> {
    let wrapped = format!("<{ROOT_TAG}>{fragment}</{ROOT_TAG}>");
    let mut reader = Reader::from_str(&wrapped);

    let mut stack: Vec<Frame> = Vec::new();
    let mut document = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Frame::new(tag_name(&start)?)),
            Ok(Event::Empty(start)) => {
                let frame = Frame::new(tag_name(&start)?);
                if let Some(parent) = stack.last_mut() {
                    parent.children.insert(frame.name.clone(), frame.into_value());
                }
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|source| DocumentParseError::Xml { source })?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(end)) => {
                let name = std::str::from_utf8(end.name().as_ref())
                    .map_err(|_| DocumentParseError::InvalidName)?
                    .to_string();
                let frame = stack
                    .pop()
                    .ok_or_else(|| DocumentParseError::UnexpectedClose { found: name.clone() })?;
                if frame.name != name {
                    return Err(DocumentParseError::MismatchedTag {
                        expected: frame.name,
                        found: name,
                    });
                }
                match stack.last_mut() {
                    Some(parent) => {
                        parent.children.insert(frame.name.clone(), frame.into_value());
                    }
                    None => document = Some(frame.children),
                }
            }
            Ok(Event::Eof) => break,
            // declarations, comments, processing instructions
            Ok(_) => {}
            Err(source) => return Err(DocumentParseError::Xml { source }),
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(DocumentParseError::Unclosed { name: frame.name });
    }
    Ok(document.unwrap_or_default())
}

/// Encode a document as a single-line rootless fragment.
///
/// Nested mappings become nested elements, arrays become repeated sibling
/// elements, null and empty strings become empty elements. No XML
/// declaration is emitted and newlines are removed.
///
/// # Errors
///
/// Returns `DocumentError::InvalidTagName` for keys that are not valid tag
/// names and `DocumentError::UnsupportedValue` for arrays nested in arrays.
pub fn encode(doc: &EmbeddedDocument) -> Result<String, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    write_record(&mut writer, doc, "")?;
    let xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    Ok(xml.replace(['\n', '\r'], ""))
}

/// Set `value` at `path`, creating intermediate mappings along the way.
///
/// `path` is split on `delimiter`: `patch(&mut doc, "ice/mode", "on", "/")`
/// yields `{"ice": {"mode": "on"}}` on an empty document. An intermediate
/// null or empty string is promoted to a mapping.
///
/// # Errors
///
/// Returns `DocumentError::InvalidPath` for empty paths or segments and
/// `DocumentError::PathConflict` when an intermediate segment holds text.
pub fn patch(
    doc: &mut EmbeddedDocument,
    path: &str,
    value: impl Into<Value>,
    delimiter: &str,
) -> Result<(), DocumentError> {
    if delimiter.is_empty() || path.is_empty() {
        return Err(DocumentError::InvalidPath {
            path: path.to_string(),
        });
    }
    let segments: Vec<&str> = path.split(delimiter).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DocumentError::InvalidPath {
            path: path.to_string(),
        });
    }

    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => {
            return Err(DocumentError::InvalidPath {
                path: path.to_string(),
            })
        }
    };

    let mut current = doc;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if matches!(slot, Value::String(s) if s.is_empty()) || slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(DocumentError::PathConflict {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })
            }
        };
    }

    current.insert(leaf.to_string(), value.into());
    Ok(())
}

struct Frame {
    name: String,
    text: String,
    children: Record,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Map::new(),
        }
    }

    fn into_value(self) -> Value {
        if self.text.trim().is_empty() {
            Value::Object(self.children)
        } else {
            Value::String(self.text)
        }
    }
}

fn tag_name(start: &BytesStart<'_>) -> Result<String, DocumentParseError> {
    std::str::from_utf8(start.name().as_ref())
        .map(String::from)
        .map_err(|_| DocumentParseError::InvalidName)
}

fn write_record(
    writer: &mut Writer<Vec<u8>>,
    record: &Record,
    path: &str,
) -> Result<(), DocumentError> {
    for (name, value) in record {
        let child_path = format!("{}/{}", path, name);
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if item.is_array() {
                        return Err(DocumentError::UnsupportedValue {
                            path: format!("{}/{}", child_path, i),
                            actual: json_type_name(item),
                        });
                    }
                    write_element(writer, name, item, &child_path)?;
                }
            }
            _ => write_element(writer, name, value, &child_path)?,
        }
    }
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
    path: &str,
) -> Result<(), DocumentError> {
    if !is_valid_tag_name(name) {
        return Err(DocumentError::InvalidTagName {
            name: name.to_string(),
        });
    }

    write_event(writer, Event::Start(BytesStart::new(name)))?;
    match value {
        Value::Object(children) => write_record(writer, children, path)?,
        Value::Null => {}
        Value::String(s) => {
            if !s.is_empty() {
                write_event(writer, Event::Text(BytesText::new(s)))?;
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            let text = value.to_string();
            write_event(writer, Event::Text(BytesText::new(&text)))?;
        }
        Value::Array(_) => {
            return Err(DocumentError::UnsupportedValue {
                path: path.to_string(),
                actual: "array",
            })
        }
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DocumentError> {
    writer
        .write_event(event)
        .map_err(|source| DocumentError::Write { source })
}

fn is_valid_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}
