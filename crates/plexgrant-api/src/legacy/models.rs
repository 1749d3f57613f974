// Legacy XML response parsing
//
// quick-xml event-pull parsing for the `<MediaContainer>` attribute style.
// Any failure -- non-XML body, broken attributes, missing required fields --
// maps to a single `XmlParse` variant carrying a body excerpt, so callers
// can tell "owner unreachable" apart from "owner answered garbage".

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{excerpt, Error};

/// One `<Section>` element from `GET /api/servers/{owner}`.
///
/// `id` is the plex.tv-side numeric identifier (the one the share endpoint
/// wants); `key` is the section key the owner's server uses. Both identify
/// the same library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub id: i64,
    pub key: String,
    pub title: String,
    /// Raw `type` attribute: "movie", "show", "artist", ...
    pub kind: String,
}

/// Parse every `<Section>` element out of a server-details XML body.
pub(crate) fn parse_sections(body: &str) -> Result<Vec<SectionRecord>, Error> {
    let mut reader = Reader::from_str(body);
    let mut sections = Vec::new();
    let mut saw_container = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.name().as_ref() {
                    b"MediaContainer" => saw_container = true,
                    b"Section" => sections.push(section_from_attrs(e, body)?),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::XmlParse {
                    message: e.to_string(),
                    excerpt: excerpt(body),
                })
            }
        }
    }

    if !saw_container {
        // An HTML error page or empty body parses "successfully" as zero
        // events; require the document root so those surface as malformed.
        return Err(Error::XmlParse {
            message: "missing MediaContainer root".into(),
            excerpt: excerpt(body),
        });
    }
    Ok(sections)
}

fn section_from_attrs(e: &BytesStart<'_>, body: &str) -> Result<SectionRecord, Error> {
    let malformed = |message: String| Error::XmlParse {
        message,
        excerpt: excerpt(body),
    };

    let mut id: Option<i64> = None;
    let mut key: Option<String> = None;
    let mut title: Option<String> = None;
    let mut kind: Option<String> = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"id" => {
                id = Some(value.parse().map_err(|_| {
                    malformed(format!("Section id is not numeric: {value:?}"))
                })?);
            }
            b"key" => key = Some(value),
            b"title" => title = Some(value),
            b"type" => kind = Some(value),
            _ => {}
        }
    }

    Ok(SectionRecord {
        id: id.ok_or_else(|| malformed("Section missing id attribute".into()))?,
        key: key.ok_or_else(|| malformed("Section missing key attribute".into()))?,
        title: title.ok_or_else(|| malformed("Section missing title attribute".into()))?,
        kind: kind.unwrap_or_default(),
    })
}
