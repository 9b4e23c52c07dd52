// src/parse.rs

use anyhow::{Context, Result};
use quick_xml::{
    escape::unescape_with,
    events::{BytesStart, Event},
    Reader,
};
use std::{
    borrow::Cow,
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    mem,
    path::Path,
};
use tracing::{debug, warn};

use crate::{
    error::ParseError,
    model::{PriceEntry, Station},
};

const STATION: &[u8] = b"pdv";
const ADDRESS: &[u8] = b"adresse";
const CITY: &[u8] = b"ville";
const SERVICES: &[u8] = b"services";
const SERVICE: &[u8] = b"service";
const PRICE: &[u8] = b"prix";

/// Parse every top-level `<pdv>` of the document at `path`, in document order.
///
/// Fails with a [`ParseError`] (inside the anyhow chain) when the document is
/// not well-formed; any other failure is an I/O problem.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_stations<P: AsRef<Path>>(path: P) -> Result<Vec<Station>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open XML file: {:?}", path.as_ref()))?;
    let stations = parse_stations_from(BufReader::new(file))
        .with_context(|| format!("Failed to parse XML file: {:?}", path.as_ref()))?;
    debug!(stations = stations.len(), "parsed stations");
    Ok(stations)
}

/// Same as [`parse_stations`] over any buffered source. The declared encoding
/// (or BOM) is honoured, so ISO-8859-1 feeds decode correctly.
pub fn parse_stations_from<R: BufRead>(source: R) -> Result<Vec<Station>> {
    let mut reader = Reader::from_reader(source);
    let mut collector = Collector::default();
    let mut buf = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(quick_xml::Error::Io(e)) => {
                return Err(anyhow::Error::new(e).context("reading XML input"));
            }
            Err(source) => {
                return Err(ParseError::Syntax {
                    position: reader.buffer_position(),
                    source,
                }
                .into());
            }
        };
        let position = reader.buffer_position();
        let syntax = |source: quick_xml::Error| ParseError::Syntax { position, source };

        match event {
            Event::Start(e) => {
                let frame = collector.open(&reader, &e, position)?;
                collector.stack.push(frame);
            }
            Event::Empty(e) => {
                let frame = collector.open(&reader, &e, position)?;
                collector.close(frame);
            }
            Event::End(_) => {
                // quick-xml already rejects mismatched end names
                let frame = collector.stack.pop().ok_or_else(|| ParseError::Structure {
                    position,
                    reason: "unexpected closing tag".into(),
                })?;
                collector.close(frame);
            }
            Event::Text(e) => {
                let raw = reader.decoder().decode(&e).map_err(syntax)?;
                let normalized = normalize_newlines(&raw);
                let text = collector.entities.unescape(&normalized).map_err(syntax)?;
                collector.text(&text, position)?;
            }
            Event::CData(e) => {
                let raw = reader.decoder().decode(&e).map_err(syntax)?;
                collector.text(&normalize_newlines(&raw), position)?;
            }
            Event::DocType(e) => {
                let raw = reader.decoder().decode(&e).map_err(syntax)?;
                collector.entities.declare(&raw);
            }
            Event::Eof => {
                if let Some(open) = collector.stack.last() {
                    return Err(ParseError::Structure {
                        position,
                        reason: format!("unclosed element <{}>", open.name),
                    }
                    .into());
                }
                if !collector.root_closed {
                    return Err(ParseError::Structure {
                        position,
                        reason: "no element found".into(),
                    }
                    .into());
                }
                break;
            }
            // declaration, comments, processing instructions
            _ => {}
        }
        buf.clear();
    }

    Ok(collector.stations)
}

/// What an open element means for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Root,
    Station,
    Services,
    Address,
    City,
    Service,
    Ignored,
}

impl Role {
    fn captures_text(self) -> bool {
        matches!(self, Role::Address | Role::City | Role::Service)
    }
}

#[derive(Debug)]
struct Frame {
    role: Role,
    name: String,
}

#[derive(Default)]
struct Collector {
    stack: Vec<Frame>,
    root_closed: bool,
    stations: Vec<Station>,
    current: Option<StationState>,
    entities: Entities,
    /// Leading text of the element being captured.
    text: String,
    /// Set once the captured element has a child; later text is tail text.
    text_done: bool,
}

/// Station under construction, plus which "first child" lookups are taken.
#[derive(Default)]
struct StationState {
    station: Station,
    address_seen: bool,
    city_seen: bool,
    services_seen: bool,
}

impl Collector {
    fn open<R>(
        &mut self,
        reader: &Reader<R>,
        e: &BytesStart,
        position: usize,
    ) -> std::result::Result<Frame, ParseError> {
        let syntax = |source: quick_xml::Error| ParseError::Syntax { position, source };
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(syntax)?
            .into_owned();
        // decoded for every element so duplicate or broken attributes are rejected
        let attrs = Attributes::read(reader, e, &self.entities).map_err(syntax)?;
        let parent = self.stack.last().map(|f| f.role);

        let role = match parent {
            None if self.root_closed => {
                return Err(ParseError::Structure {
                    position,
                    reason: format!("<{}> after the document element", name),
                });
            }
            None => Role::Root,
            Some(Role::Root) if e.name().as_ref() == STATION => {
                self.current = Some(StationState {
                    station: Station {
                        id: attrs.get(b"id"),
                        latitude: attrs.get(b"latitude"),
                        longitude: attrs.get(b"longitude"),
                        postal_code: attrs.get(b"cp"),
                        pop: attrs.get(b"pop"),
                        ..Default::default()
                    },
                    ..Default::default()
                });
                Role::Station
            }
            Some(Role::Station) => self.station_child(e, &attrs),
            Some(Role::Services) if e.name().as_ref() == SERVICE => Role::Service,
            Some(role) => {
                if role.captures_text() {
                    self.text_done = true;
                }
                Role::Ignored
            }
        };

        if role.captures_text() {
            self.text.clear();
            self.text_done = false;
        }
        Ok(Frame { role, name })
    }

    fn station_child(&mut self, e: &BytesStart, attrs: &Attributes) -> Role {
        let Some(state) = self.current.as_mut() else {
            return Role::Ignored;
        };
        match e.name().as_ref() {
            ADDRESS if !state.address_seen => {
                state.address_seen = true;
                Role::Address
            }
            CITY if !state.city_seen => {
                state.city_seen = true;
                Role::City
            }
            SERVICES if !state.services_seen => {
                state.services_seen = true;
                Role::Services
            }
            PRICE => {
                state.station.prices.push(PriceEntry {
                    name: attrs.get(b"nom"),
                    id: attrs.get(b"id"),
                    updated_at: attrs.get(b"maj"),
                    value: attrs.get(b"valeur"),
                });
                Role::Ignored
            }
            _ => Role::Ignored,
        }
    }

    fn close(&mut self, frame: Frame) {
        match frame.role {
            Role::Root => self.root_closed = true,
            Role::Station => {
                if let Some(state) = self.current.take() {
                    if state.station.id.is_empty() {
                        warn!("station without id attribute");
                    }
                    self.stations.push(state.station);
                }
            }
            Role::Address | Role::City | Role::Service => {
                let text = mem::take(&mut self.text);
                self.text_done = true;
                let Some(state) = self.current.as_mut() else {
                    return;
                };
                match frame.role {
                    Role::Address => state.station.address = text,
                    Role::City => state.station.city = text,
                    _ if !text.is_empty() => state.station.services.push(text),
                    _ => {}
                }
            }
            Role::Services | Role::Ignored => {}
        }
    }

    fn text(&mut self, text: &str, position: usize) -> std::result::Result<(), ParseError> {
        match self.stack.last() {
            None => {
                if text
                    .chars()
                    .any(|c| !c.is_ascii_whitespace() && c != '\u{feff}')
                {
                    return Err(ParseError::Structure {
                        position,
                        reason: "text outside the document element".into(),
                    });
                }
            }
            Some(frame) if frame.role.captures_text() && !self.text_done => {
                self.text.push_str(text);
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Line-end normalization: `\r\n` and lone `\r` become `\n`.
fn normalize_newlines(raw: &str) -> Cow<'_, str> {
    if raw.contains('\r') {
        Cow::Owned(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Attribute-value normalization: literal tabs and line ends become spaces.
fn normalize_attribute(raw: &str) -> Cow<'_, str> {
    let lines = normalize_newlines(raw);
    if lines.contains(|c: char| c == '\t' || c == '\n') {
        Cow::Owned(lines.replace(|c: char| c == '\t' || c == '\n', " "))
    } else {
        lines
    }
}

/// General entities from the internal DTD subset. The five predefined
/// entities always win.
#[derive(Debug, Default)]
struct Entities(HashMap<String, String>);

impl Entities {
    fn resolve(&self, name: &str) -> Option<&str> {
        match name {
            "lt" => Some("<"),
            "gt" => Some(">"),
            "amp" => Some("&"),
            "apos" => Some("'"),
            "quot" => Some("\""),
            _ => self.0.get(name).map(String::as_str),
        }
    }

    fn unescape<'s>(&self, raw: &'s str) -> std::result::Result<Cow<'s, str>, quick_xml::Error> {
        Ok(unescape_with(raw, |name| self.resolve(name))?)
    }

    /// Record the internal `<!ENTITY name "value">` declarations of a doctype.
    /// Parameter and external entities are skipped; the first declaration of
    /// a name wins.
    fn declare(&mut self, doctype: &str) {
        let mut rest = doctype;
        while let Some(start) = rest.find("<!") {
            rest = &rest[start..];
            if let Some(after) = rest.strip_prefix("<!--") {
                rest = after.find("-->").map_or("", |end| &after[end + 3..]);
                continue;
            }
            let Some(after) = rest.strip_prefix("<!ENTITY") else {
                rest = &rest[2..];
                continue;
            };
            let after = after.trim_start();
            if after.starts_with('%') {
                rest = after;
                continue;
            }
            let name_end = after.find(char::is_whitespace).unwrap_or(after.len());
            let (name, tail) = after.split_at(name_end);
            let tail = tail.trim_start();
            rest = tail;

            let Some(quote) = tail.chars().next().filter(|c| *c == '"' || *c == '\'') else {
                continue;
            };
            let body = &tail[1..];
            let Some(end) = body.find(quote) else {
                break;
            };
            let literal = &body[..end];
            // references to entities declared later stay literal
            let value = self
                .unescape(literal)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| literal.to_string());
            if !self.0.contains_key(name) {
                debug!(name, "internal entity declared");
                self.0.insert(name.to_string(), value);
            }
            rest = &body[end + 1..];
        }
    }
}

/// Decoded attribute values of one start tag.
struct Attributes(Vec<(Vec<u8>, String)>);

impl Attributes {
    fn read<R>(
        reader: &Reader<R>,
        e: &BytesStart,
        entities: &Entities,
    ) -> std::result::Result<Self, quick_xml::Error> {
        let mut values = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let raw = reader.decoder().decode(&attr.value)?;
            // normalize literal whitespace first so `&#10;` and friends survive
            let normalized = normalize_attribute(&raw);
            let value = entities.unescape(&normalized)?.into_owned();
            values.push((attr.key.as_ref().to_vec(), value));
        }
        Ok(Self(values))
    }

    /// Raw value of `key`, empty when the attribute is absent.
    fn get(&self, key: &[u8]) -> String {
        self.0
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }
}
