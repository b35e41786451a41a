//! XML documents to source trees.
//!
//! The root element is the single top-level node. Element names keep their
//! namespace prefix verbatim (`nutFree:name`), attributes become `@name`
//! children and namespace declarations are dropped. Repeated elements with
//! the same name under one parent merge into one node flagged as an array.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use hub_model::{DocumentFormat, NodeId, SourceTree, SourceValue};

use crate::error::{IngestError, Result};

struct OpenElement {
    id: NodeId,
    text: String,
    has_child_elements: bool,
}

/// Parse XML text into a source tree.
pub fn parse_xml(content: &str) -> Result<SourceTree> {
    let mut reader = Reader::from_str(content);
    let mut tree = SourceTree::new(DocumentFormat::Xml);
    let mut open: Vec<OpenElement> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let id = open_element(&mut tree, &mut open, &start)?;
                open.push(OpenElement {
                    id,
                    text: String::new(),
                    has_child_elements: false,
                });
            }
            Event::Empty(start) => {
                let id = open_element(&mut tree, &mut open, &start)?;
                close_element(
                    &mut tree,
                    OpenElement {
                        id,
                        text: String::new(),
                        has_child_elements: false,
                    },
                )?;
            }
            Event::End(_) => {
                let element = open.pop().ok_or_else(|| IngestError::Xml {
                    message: "closing tag without matching opening tag".to_string(),
                })?;
                close_element(&mut tree, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = open.last_mut() {
                    let raw = utf8(&text)?;
                    current.text.push_str(&unescape_text(raw));
                }
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(utf8(&data)?);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(current) = open.last_mut() {
                    let name = utf8(&reference)?;
                    current.text.push_str(&unescape_text(&format!("&{name};")));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        let key = tree.node(unclosed.id)?.key.clone();
        return Err(IngestError::Xml {
            message: format!("unexpected end of document inside <{key}>"),
        });
    }
    debug!(nodes = tree.len(), "parsed XML document");
    Ok(tree)
}

fn open_element(
    tree: &mut SourceTree,
    open: &mut [OpenElement],
    start: &BytesStart<'_>,
) -> Result<NodeId> {
    let key = utf8(start.name().as_ref())?.to_string();
    let parent = match open.last_mut() {
        Some(parent) => {
            parent.has_child_elements = true;
            Some(parent.id)
        }
        None => None,
    };
    let (id, existed) = tree.insert(parent, &key)?;
    if existed {
        tree.mark_array(id)?;
    }
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| IngestError::Xml {
            message: err.to_string(),
        })?;
        let name = utf8(attribute.key.as_ref())?;
        if name == "xmlns" || name.starts_with("xmlns:") {
            continue;
        }
        let value = attribute
            .unescape_value()
            .map_err(|err| IngestError::Xml {
                message: err.to_string(),
            })?
            .into_owned();
        let (attribute_id, attribute_existed) = tree.insert(Some(id), &format!("@{name}"))?;
        if attribute_existed {
            tree.mark_array(attribute_id)?;
        }
        tree.append_value(attribute_id, SourceValue::Text(value))?;
    }
    Ok(id)
}

fn close_element(tree: &mut SourceTree, element: OpenElement) -> Result<()> {
    if element.has_child_elements {
        return Ok(());
    }
    let text = if element.text.trim().is_empty() {
        element.text
    } else {
        element.text.trim().to_string()
    };
    tree.append_value(element.id, SourceValue::Text(text))?;
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|err| IngestError::Xml {
        message: format!("invalid UTF-8: {err}"),
    })
}

fn unescape_text(raw: &str) -> Cow<'_, str> {
    match unescape(raw) {
        Ok(text) => text,
        Err(_) => Cow::Borrowed(raw),
    }
}
