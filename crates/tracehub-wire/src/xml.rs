//! Deserializer for the XML trace-message payload.
//!
//! One payload is one small XML document: the root element carries the
//! `pid`/`tid`/`time` attributes, its children carry the remaining fields.
//! The field mapping is fixed by the deployed client base and must not
//! change:
//!
//! | wire location                   | field     |
//! |---------------------------------|-----------|
//! | root attribute `pid`            | pid       |
//! | root attribute `tid`            | tid       |
//! | root attribute `time`           | timestamp |
//! | child `verbosity` text          | verbosity |
//! | child `type` text               | kind      |
//! | child `location` text           | path      |
//! | child `location` attr `lineno`  | lineno    |
//! | child `function` text           | function  |
//! | child `message` text            | message   |
//!
//! Decoding is pure and side-effect free. Any missing required field,
//! non-numeric numeric, or ill-formed document fails with
//! [`WireError::Malformed`].

use std::fmt::Display;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{TraceEntry, WireError};

/// Decode one complete message payload into a [`TraceEntry`].
pub fn deserialize_entry(payload: &[u8]) -> Result<TraceEntry, WireError> {
    let mut reader = Reader::from_reader(payload);

    let mut root: Option<(u32, u32, u64)> = None;
    let mut verbosity: Option<u32> = None;
    let mut kind: Option<u32> = None;
    let mut location: Option<(String, u32)> = None;
    let mut function: Option<String> = None;
    let mut message: Option<String> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => break,
            Event::Start(start) | Event::Empty(start) if root.is_none() => {
                root = Some((
                    require_attr(&start, "pid")?,
                    require_attr(&start, "tid")?,
                    require_attr(&start, "time")?,
                ));
            }
            Event::Start(start) => match start.name().as_ref() {
                b"verbosity" => {
                    let text = read_child_text(&mut reader, &start)?;
                    if verbosity.is_none() {
                        verbosity = Some(parse_uint("verbosity", &text)?);
                    }
                }
                b"type" => {
                    let text = read_child_text(&mut reader, &start)?;
                    if kind.is_none() {
                        kind = Some(parse_uint("type", &text)?);
                    }
                }
                b"location" => {
                    let lineno = require_attr(&start, "lineno")?;
                    let text = read_child_text(&mut reader, &start)?;
                    if location.is_none() {
                        location = Some((text, lineno));
                    }
                }
                b"function" => {
                    let text = read_child_text(&mut reader, &start)?;
                    if function.is_none() {
                        function = Some(text);
                    }
                }
                b"message" => {
                    let text = read_child_text(&mut reader, &start)?;
                    if message.is_none() {
                        message = Some(text);
                    }
                }
                _ => {
                    reader.read_to_end(start.name()).map_err(malformed)?;
                }
            },
            Event::Empty(start) => match start.name().as_ref() {
                b"location" => {
                    let lineno = require_attr(&start, "lineno")?;
                    if location.is_none() {
                        location = Some((String::new(), lineno));
                    }
                }
                b"function" => {
                    if function.is_none() {
                        function = Some(String::new());
                    }
                }
                b"message" => {
                    if message.is_none() {
                        message = Some(String::new());
                    }
                }
                b"verbosity" => {
                    if verbosity.is_none() {
                        verbosity = Some(parse_uint("verbosity", "")?);
                    }
                }
                b"type" => {
                    if kind.is_none() {
                        kind = Some(parse_uint("type", "")?);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    let (pid, tid, timestamp) = root.ok_or_else(|| malformed("document has no root element"))?;
    let (path, lineno) = location.ok_or_else(|| missing("location"))?;
    Ok(TraceEntry {
        pid,
        tid,
        timestamp,
        verbosity: verbosity.ok_or_else(|| missing("verbosity"))?,
        kind: kind.ok_or_else(|| missing("type"))?,
        path,
        lineno,
        function: function.ok_or_else(|| missing("function"))?,
        message: message.ok_or_else(|| missing("message"))?,
    })
}

/// Collect the text content of the element opened by `start`, consuming
/// events up to and including its end tag. Entities are unescaped; nested
/// markup is not part of any known field and fails the message.
fn read_child_text(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String, WireError> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(malformed)?),
            Event::CData(c) => {
                let raw = c.into_inner();
                text.push_str(std::str::from_utf8(&raw).map_err(malformed)?);
            }
            Event::End(end) if end.name().as_ref() == start.name().as_ref() => return Ok(text),
            Event::Start(nested) => {
                return Err(malformed(format!(
                    "unexpected element <{}> inside <{}>",
                    String::from_utf8_lossy(nested.name().as_ref()),
                    String::from_utf8_lossy(start.name().as_ref()),
                )));
            }
            Event::Eof => return Err(malformed("unexpected end of document")),
            _ => {}
        }
    }
}

fn require_attr<T: FromStr>(start: &BytesStart<'_>, name: &'static str) -> Result<T, WireError> {
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        if attr.key.as_ref() == name.as_bytes() {
            let raw = attr.unescape_value().map_err(malformed)?;
            return parse_uint(name, &raw);
        }
    }
    Err(missing(name))
}

fn parse_uint<T: FromStr>(field: &'static str, raw: &str) -> Result<T, WireError> {
    raw.trim()
        .parse()
        .map_err(|_| malformed(format!("field `{field}` is not an unsigned integer: {raw:?}")))
}

fn malformed(reason: impl Display) -> WireError {
    WireError::Malformed(reason.to_string())
}

fn missing(field: &str) -> WireError {
    malformed(format!("missing field `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> &'static [u8] {
        br#"<traceentry pid="100" tid="5" time="123456">
  <verbosity>2</verbosity>
  <type>0</type>
  <location lineno="42">/a/b.cpp</location>
  <function>foo</function>
  <message>hello</message>
</traceentry>"#
    }

    #[test]
    fn decodes_all_fields() {
        let entry = deserialize_entry(sample_message()).unwrap();
        assert_eq!(entry.pid, 100);
        assert_eq!(entry.tid, 5);
        assert_eq!(entry.timestamp, 123456);
        assert_eq!(entry.verbosity, 2);
        assert_eq!(entry.kind, 0);
        assert_eq!(entry.path, "/a/b.cpp");
        assert_eq!(entry.lineno, 42);
        assert_eq!(entry.function, "foo");
        assert_eq!(entry.message, "hello");
    }

    #[test]
    fn unescapes_entities_in_text_and_attributes() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="7">C:\src\a&amp;b.cpp</location><function>operator&lt;&lt;</function><message>say &quot;hi&quot;</message></traceentry>"#;
        let entry = deserialize_entry(payload).unwrap();
        assert_eq!(entry.path, r"C:\src\a&b.cpp");
        assert_eq!(entry.function, "operator<<");
        assert_eq!(entry.message, "say \"hi\"");
    }

    #[test]
    fn empty_message_element_is_empty_string() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message></message></traceentry>"#;
        assert_eq!(deserialize_entry(payload).unwrap().message, "");

        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message/></traceentry>"#;
        assert_eq!(deserialize_entry(payload).unwrap().message, "");
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function></traceentry>"#;
        let err = deserialize_entry(payload).unwrap_err();
        assert!(matches!(&err, WireError::Malformed(m) if m.contains("message")));
    }

    #[test]
    fn missing_root_attribute_is_malformed() {
        let payload = br#"<traceentry tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message>m</message></traceentry>"#;
        let err = deserialize_entry(payload).unwrap_err();
        assert!(matches!(&err, WireError::Malformed(m) if m.contains("pid")));
    }

    #[test]
    fn missing_lineno_attribute_is_malformed() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location>a.cpp</location><function>f</function><message>m</message></traceentry>"#;
        let err = deserialize_entry(payload).unwrap_err();
        assert!(matches!(&err, WireError::Malformed(m) if m.contains("lineno")));
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let payload = br#"<traceentry pid="abc" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message>m</message></traceentry>"#;
        let err = deserialize_entry(payload).unwrap_err();
        assert!(matches!(&err, WireError::Malformed(m) if m.contains("pid")));
    }

    #[test]
    fn whitespace_around_numeric_text_is_tolerated() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity> 3 </verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message>m</message></traceentry>"#;
        assert_eq!(deserialize_entry(payload).unwrap().verbosity, 3);
    }

    #[test]
    fn truncated_document_is_malformed() {
        let payload = &sample_message()[..40];
        assert!(matches!(
            deserialize_entry(payload),
            Err(WireError::Malformed(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            deserialize_entry(b"\x00\x01\x02 not xml at all"),
            Err(WireError::Malformed(_))
        ));
        assert!(matches!(
            deserialize_entry(b""),
            Err(WireError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_children_are_skipped() {
        let payload = br#"<traceentry pid="1" tid="2" time="3"><verbosity>0</verbosity><type>0</type><variables><variable name="x">1</variable></variables><location lineno="1">a.cpp</location><function>f</function><message>m</message></traceentry>"#;
        let entry = deserialize_entry(payload).unwrap();
        assert_eq!(entry.tid, 2);
        assert_eq!(entry.message, "m");
    }

    #[test]
    fn duplicate_child_keeps_first_occurrence() {
        let payload = br#"<traceentry pid="1" tid="1" time="1"><verbosity>0</verbosity><type>0</type><location lineno="1">a.cpp</location><function>f</function><message>first</message><message>second</message></traceentry>"#;
        assert_eq!(deserialize_entry(payload).unwrap().message, "first");
    }
}
