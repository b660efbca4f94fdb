//! Tolerant room markup parser.
//!
//! Room documents are HTML pages rather than well-formed XML: end tags may be
//! missing or mismatched, void elements are left open, and the room itself is
//! often hidden from browsers inside a comment. The parser runs `quick-xml`
//! with end-name checks off and builds its own element tree, closing elements
//! the way an HTML parser would.
//!
//! # Recognized structure
//!
//! - `<FireBoxRoom>`: scene container (required)
//! - `<Room ...>`: room settings and placements (required)
//! - `<Assets>` / `<AssetObject id src [mtl]>`: asset declarations
//! - `<Object id [pos scale xdir ydir zdir rotation fwd]>`: placements

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::types::*;
use crate::config::PrimitiveCatalog;
use crate::settings::SceneSettings;

/// Structural errors that abort a whole import.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Could not find the FireBoxRoom tag")]
    MissingSceneContainer,

    #[error("Could not find the Room tag")]
    MissingRoom,
}

/// Result type for markup parsing.
pub type MarkupResult<T> = Result<T, MarkupError>;

const SCENE_CONTAINER: &str = "fireboxroom";
const ROOM: &str = "room";
const ASSETS: &str = "assets";
const ASSET_OBJECT: &str = "assetobject";
const OBJECT: &str = "object";

// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Room document parser bound to a primitive catalog.
pub struct MarkupParser<'a> {
    primitives: &'a PrimitiveCatalog,
}

impl<'a> MarkupParser<'a> {
    pub fn new(primitives: &'a PrimitiveCatalog) -> Self {
        Self { primitives }
    }

    /// Parse a room document.
    ///
    /// If no scene container is found, comment delimiters are stripped and
    /// the text is parsed once more before giving up.
    pub fn parse(&self, bytes: &[u8]) -> MarkupResult<RoomDocument> {
        let text = String::from_utf8_lossy(bytes);

        let mut root = parse_elements(&text);
        if root.find(SCENE_CONTAINER).is_none() {
            log::debug!("No scene container found, retrying without comments");
            root = parse_elements(&strip_comment_delimiters(&text));
        }

        let container = root.find(SCENE_CONTAINER).ok_or(MarkupError::MissingSceneContainer)?;
        let room = container.find(ROOM).ok_or(MarkupError::MissingRoom)?;

        let settings = SceneSettings::from_room(room);
        let assets = self.collect_assets(container);

        let mut placements = Vec::new();
        let mut rejected_placements = 0;
        for element in room.find_all(OBJECT) {
            match PlacementDeclaration::from_element(element) {
                Some(placement) => placements.push(placement),
                None => {
                    log::warn!("Skipping <Object> without an id");
                    rejected_placements += 1;
                }
            }
        }

        log::info!(
            "Parsed room: {} assets ({} primitives), {} objects",
            assets.len(),
            self.primitives.declarations().len(),
            placements.len()
        );

        Ok(RoomDocument {
            settings,
            assets,
            placements,
            rejected_placements,
        })
    }

    fn collect_assets(&self, container: &Element) -> Vec<AssetDeclaration> {
        let mut assets = Vec::new();

        match container.find(ASSETS) {
            Some(section) => {
                for element in section.find_all(ASSET_OBJECT) {
                    match AssetDeclaration::from_element(element) {
                        Some(asset) => assets.push(asset),
                        None => log::debug!(
                            "Ignoring asset {:?} with unsupported source {:?}",
                            element.attr("id"),
                            element.attr("src")
                        ),
                    }
                }
            }
            None => log::info!("No assets found"),
        }

        assets.extend(self.primitives.declarations().iter().cloned());
        assets
    }
}

/// Parse a room document with the given primitive catalog.
pub fn parse_room(bytes: &[u8], primitives: &PrimitiveCatalog) -> MarkupResult<RoomDocument> {
    MarkupParser::new(primitives).parse(bytes)
}

/// Remove every `<!--` and `-->` so commented-out markup becomes live.
pub fn strip_comment_delimiters(text: &str) -> String {
    text.replace("<!--", "").replace("-->", "")
}

/// Build an element tree from loosely structured markup.
///
/// Returns a synthetic `#document` root. Never fails: a syntax error stops
/// reading and whatever was built so far is kept.
pub fn parse_elements(text: &str) -> Element {
    let mut reader = Reader::from_str(text);
    reader.check_end_names(false);
    reader.trim_text(true);

    let mut stack: Vec<Element> = vec![Element::new("#document")];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let element = element_from(&start);
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    push_child(&mut stack, element);
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(start)) => push_child(&mut stack, element_from(&start)),
            Ok(Event::End(end)) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                // Close up to the nearest open element of that name; stray end tags are ignored
                if let Some(pos) = stack.iter().rposition(|e| e.name == name) {
                    if pos > 0 {
                        close_to(&mut stack, pos);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                log::warn!("Markup error at byte {}: {}", reader.buffer_position(), err);
                break;
            }
        }
    }

    close_to(&mut stack, 1);
    stack.pop().unwrap_or_else(|| Element::new("#document"))
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.html_attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            // Unknown HTML entities: keep the raw text
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        element.attributes.push((key, value));
    }
    element
}

fn push_child(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

// Pop until `stack.len() == depth`, attaching each popped element to its parent.
fn close_to(stack: &mut Vec<Element>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(element) = stack.pop() {
            push_child(stack, element);
        }
    }
}
