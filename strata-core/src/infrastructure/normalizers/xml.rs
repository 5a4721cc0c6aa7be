// strata-core/src/infrastructure/normalizers/xml.rs

// XML -> JSON document, landed as one row. Mapping rules:
//   attributes      -> "@name"
//   text + children -> "#text"
//   text only       -> plain string (null when empty)
//   repeated child  -> array, in document order

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::{DEFAULT_DOCUMENT_COLUMN, malformed, read_text};
use crate::domain::error::MalformedInputError;
use crate::domain::records::{FieldValue, NormalizedOutput, RecordSet};
use crate::ports::normalizer::Normalize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlDocumentNormalizer {
    #[serde(default = "default_column")]
    pub column: String,
}

fn default_column() -> String {
    DEFAULT_DOCUMENT_COLUMN.to_string()
}

impl Default for XmlDocumentNormalizer {
    fn default() -> Self {
        Self {
            column: default_column(),
        }
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("bad attribute on <{}>: {}", name, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = attr
                .unescape_value()
                .map_err(|e| format!("bad attribute value on <{}>: {}", name, e))?;
            fields.insert(format!("@{}", key), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

/// Parses a complete XML document into its JSON rendition.
pub fn xml_to_json(text: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {}", reader.error_position(), e))?;

        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                close(frame, &mut stack, &mut root)?;
            }
            Event::End(end) => {
                let frame = stack.pop().ok_or_else(|| {
                    format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(end.name().as_ref())
                    )
                })?;
                close(frame, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                let resolved = resolve_reference(&r)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn close(frame: Frame, stack: &mut [Frame], root: &mut Option<Value>) -> Result<(), String> {
    let (name, value) = frame.into_value();
    match stack.last_mut() {
        Some(parent) => {
            insert_child(&mut parent.fields, name, value);
            Ok(())
        }
        None if root.is_none() => {
            let mut document = Map::new();
            document.insert(name, value);
            *root = Some(Value::Object(document));
            Ok(())
        }
        None => Err(format!("second root element <{}>", name)),
    }
}

fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, String> {
    let character = reference
        .resolve_char_ref()
        .map_err(|e| format!("bad character reference: {}", e))?;
    if let Some(c) = character {
        return Ok(c.to_string());
    }
    let name = reference
        .decode()
        .map_err(|e| format!("bad entity name: {}", e))?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| format!("unknown entity '&{};'", name))
}

impl Normalize for XmlDocumentNormalizer {
    fn kind(&self) -> &'static str {
        "xml_document"
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        let text = read_text(locator)?;
        let document = xml_to_json(&text).map_err(|cause| malformed(locator, cause))?;
        let rendered =
            serde_json::to_string_pretty(&document).map_err(|e| malformed(locator, e.to_string()))?;

        let mut set = RecordSet::new(vec![self.column.clone()]);
        set.push_row(vec![FieldValue::Text(rendered)])
            .map_err(|cause| malformed(locator, cause))?;
        Ok(NormalizedOutput::Single(set))
    }
}
