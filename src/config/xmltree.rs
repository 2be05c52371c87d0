/// Minimal tree-structured document reader
///
/// This is the "configuration-file parser" collaborator from spec §1: a
/// generic reader that yields attributes on named nodes, independent of
/// what those nodes mean to the calibration engine. It exists so that
/// `calibration_config.rs` can stay a thin mapping from attribute strings to
/// the `CalibrationConfig` data model, the way the original C source used
/// `libxml2` purely for attribute access (`xmlGetProp`, `xmlHasProp`).
///
/// Grounded on `quick-xml`'s event-based reader (see
/// `examples/dropbox-dTOOL/dashflow`, which depends on the same crate).
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// One element of the document: its tag name, its attributes, and its
/// direct children, in document order.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parses an XML document into a tree of [`Node`]s rooted at the document
/// element. Only element names, attributes and nesting are retained; text
/// content is not needed by this configuration format.
pub fn parse(content: &str) -> Result<Node, String> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(node_from_bytes_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let node = node_from_bytes_start(e)?;
                push_child(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag in configuration document".to_string())?;
                push_child(&mut stack, &mut root, node);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed configuration document: {}", e)),
        }
        buf.clear();
    }

    root.ok_or_else(|| "empty configuration document".to_string())
}

fn node_from_bytes_start(e: &quick_xml::events::BytesStart) -> Result<Node, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute on <{}>: {}", name, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("bad attribute value on <{}>: {}", name, err))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(Node {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn push_child(stack: &mut Vec<Node>, root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}
