use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::alto::{AltoDocument, AltoError};
use crate::core::model::{AltoString, TextLine};

/// Children of a `TextLine` that carry its text and get replaced.
const TEXT_CHILDREN: [&[u8]; 3] = [b"String", b"SP", b"HYP"];

pub fn write_alto(doc: &AltoDocument) -> Result<String, AltoError> {
    let mut writer = Writer::new(Vec::new());
    let events = doc.events();

    if !events.iter().any(|event| matches!(event, Event::Decl(_))) {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
    }

    let mut lines = doc.lines.iter();
    let mut current: Option<(&TextLine, String)> = None;
    let mut skip_depth = 0usize;

    for event in events {
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) if e.local_name().as_ref() == b"TextLine" => {
                writer.write_event(event)?;
                if let Some(line) = lines.next() {
                    current = Some((line, child_name(e, "String")));
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"TextLine" => match lines.next() {
                Some(line) if !line.strings.is_empty() => {
                    writer.write_event(Event::Start(e.clone()))?;
                    write_strings(&mut writer, &child_name(e, "String"), &line.strings)?;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                }
                _ => writer.write_event(event)?,
            },
            Event::End(e) if e.local_name().as_ref() == b"TextLine" => {
                if let Some((line, name)) = current.take() {
                    write_strings(&mut writer, &name, &line.strings)?;
                }
                writer.write_event(event)?;
            }
            Event::Start(e) if current.is_some() && is_text_child(e) => skip_depth = 1,
            Event::Empty(e) if current.is_some() && is_text_child(e) => {}
            Event::Text(text) if current.is_some() && is_blank(text) => {}
            _ => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn is_text_child(e: &BytesStart) -> bool {
    TEXT_CHILDREN.contains(&e.local_name().as_ref())
}

fn is_blank(text: &BytesText) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Child element name carrying the parent's namespace prefix.
fn child_name(parent: &BytesStart, local: &str) -> String {
    match parent.name().prefix() {
        Some(prefix) => format!("{}:{local}", String::from_utf8_lossy(prefix.as_ref())),
        None => local.to_string(),
    }
}

fn write_strings<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    strings: &[AltoString],
) -> Result<(), AltoError> {
    for string in strings {
        let hpos = string.rect.hpos().to_string();
        let vpos = string.rect.vpos().to_string();
        let width = string.rect.width().to_string();
        let height = string.rect.height().to_string();

        let mut elem = BytesStart::new(name);
        elem.push_attribute(("CONTENT", string.content.as_str()));
        elem.push_attribute(("HPOS", hpos.as_str()));
        elem.push_attribute(("VPOS", vpos.as_str()));
        elem.push_attribute(("WIDTH", width.as_str()));
        elem.push_attribute(("HEIGHT", height.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use pretty_assertions::assert_eq;

    const LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#"><Tags><OtherTag ID="LT15" LABEL="default"/></Tags><Layout><Page WIDTH="500" HEIGHT="500"><TextBlock ID="b1"><TextLine ID="l1" HPOS="10" VPOS="10" WIDTH="100" HEIGHT="20"><Shape><Polygon POINTS="10 10 110 10 110 30 10 30"/></Shape>
  <String CONTENT="old" HPOS="10" VPOS="10" WIDTH="5" HEIGHT="5"><ALTERNATIVE>olde</ALTERNATIVE></String>
  <SP/>
</TextLine><TextLine ID="l2" HPOS="10" VPOS="40" WIDTH="100.0" HEIGHT="20"/></TextBlock></Page></Layout></alto>"#;

    fn string(content: &str, rect: Rect) -> AltoString {
        AltoString {
            content: content.to_string(),
            rect,
        }
    }

    #[test]
    fn unchanged_document_round_trips_outside_lines() {
        let doc = AltoDocument::parse(LAYOUT).unwrap();
        let xml = doc.to_xml().unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<OtherTag ID="LT15" LABEL="default"/>"#));
        assert!(xml.contains(r#"<TextLine ID="l2" HPOS="10" VPOS="40" WIDTH="100.0" HEIGHT="20"/>"#));
        assert!(xml.contains(r#"<String CONTENT="old" HPOS="10" VPOS="10" WIDTH="5" HEIGHT="5"/>"#));
        assert!(!xml.contains("ALTERNATIVE"));
        assert!(!xml.contains("<SP/>"));
    }

    #[test]
    fn replaces_strings_after_shape() {
        let mut doc = AltoDocument::parse(LAYOUT).unwrap();
        doc.lines[0].strings = vec![
            string("Hello", Rect::new(15, 12, 50, 28)),
            string("<&>", Rect::new(60, 12, 100, 28)),
        ];
        let xml = doc.to_xml().unwrap();
        let expected = concat!(
            r#"<TextLine ID="l1" HPOS="10" VPOS="10" WIDTH="100" HEIGHT="20">"#,
            r#"<Shape><Polygon POINTS="10 10 110 10 110 30 10 30"/></Shape>"#,
            r#"<String CONTENT="Hello" HPOS="15" VPOS="12" WIDTH="35" HEIGHT="16"/>"#,
            r#"<String CONTENT="&lt;&amp;&gt;" HPOS="60" VPOS="12" WIDTH="40" HEIGHT="16"/>"#,
            r#"</TextLine>"#,
        );
        assert!(xml.contains(expected), "{xml}");
        assert!(!xml.contains("old"));

        let reparsed = AltoDocument::parse(&xml).unwrap();
        assert_eq!(reparsed.lines[0].strings, doc.lines[0].strings);
    }

    #[test]
    fn expands_self_closing_line() {
        let mut doc = AltoDocument::parse(LAYOUT).unwrap();
        doc.lines[1].strings = vec![string("x", Rect::new(20, 45, 30, 55))];
        let xml = doc.to_xml().unwrap();
        assert!(xml.contains(concat!(
            r#"<TextLine ID="l2" HPOS="10" VPOS="40" WIDTH="100.0" HEIGHT="20">"#,
            r#"<String CONTENT="x" HPOS="20" VPOS="45" WIDTH="10" HEIGHT="10"/>"#,
            r#"</TextLine>"#
        )));
    }

    #[test]
    fn keeps_namespace_prefix() {
        let xml = r#"<ns0:alto xmlns:ns0="http://www.loc.gov/standards/alto/ns-v4#"><ns0:TextLine ID="a" HPOS="0" VPOS="0" WIDTH="9" HEIGHT="9"></ns0:TextLine></ns0:alto>"#;
        let mut doc = AltoDocument::parse(xml).unwrap();
        doc.lines[0].strings = vec![string("w", Rect::new(1, 1, 2, 2))];
        let out = doc.to_xml().unwrap();
        assert!(out.contains(r#"<ns0:String CONTENT="w" HPOS="1" VPOS="1" WIDTH="1" HEIGHT="1"/></ns0:TextLine>"#));
        assert!(out.starts_with("<?xml"));
    }
}
