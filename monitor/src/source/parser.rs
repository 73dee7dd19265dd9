use crate::{
    error::FetchError,
    metrics::{
        ClientRecord,
        FieldValue,
        Fields,
        StreamSnapshot,
        CLIENT_FIELDS,
        STREAM_FIELDS,
    },
};
use roxmltree::{
    Document,
    Node,
};

/// Parse a stat page into one snapshot per `<stream>` element.
///
/// A document without any stream is valid and yields an empty list.
pub fn parse_document(body: &str) -> Result<Vec<StreamSnapshot>, FetchError> {
    let document = Document::parse(body)?;

    let streams = document
        .descendants()
        .filter(|node| is_element(node, "stream"))
        .filter_map(parse_stream)
        .collect();

    Ok(streams)
}

/// Pull the text of the child elements named in `names` out of `node`.
///
/// Missing children are left out of the result. When an element repeats, the first one wins.
pub fn extract_known_fields(names: &[&str], node: Node<'_, '_>) -> Fields {
    let mut fields = Fields::new();
    for child in node.children().filter(|child| child.is_element()) {
        let tag = child.tag_name().name();
        if names.contains(&tag) {
            fields
                .entry(tag.to_string())
                .or_insert_with(|| FieldValue::coerce(child.text().unwrap_or_default()));
        }
    }
    fields
}

fn parse_stream(node: Node<'_, '_>) -> Option<StreamSnapshot> {
    // The name is a key, not a value: `007` must not turn into `7`.
    let Some(name) = node.children().find(|child| is_element(child, "name")) else {
        warn!("Skipping stream element without a name");
        return None;
    };
    let name = name.text().unwrap_or_default();

    let mut fields = extract_known_fields(STREAM_FIELDS, node);
    fields.remove("name");

    let clients = node
        .children()
        .filter(|child| is_element(child, "client"))
        .map(parse_client)
        .collect();

    Some(StreamSnapshot {
        name: name.to_string(),
        fields,
        clients,
        active: has_marker(node, "active"),
        publishing: has_marker(node, "publishing"),
    })
}

fn parse_client(node: Node<'_, '_>) -> ClientRecord {
    ClientRecord {
        fields: extract_known_fields(CLIENT_FIELDS, node),
        active: has_marker(node, "active"),
        publishing: has_marker(node, "publishing"),
    }
}

/// Markers are signalled by the presence of the element, its content is irrelevant.
fn has_marker(node: Node<'_, '_>, name: &str) -> bool {
    node.children().any(|child| is_element(&child, name))
}

fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}
