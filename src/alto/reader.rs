use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::alto::{AltoDocument, AltoError};
use crate::core::geometry::Rect;
use crate::core::model::{parse_coordinate, AltoString, LineGeometry, TextLine};

pub fn read_alto(xml: &str) -> Result<AltoDocument, AltoError> {
    let mut reader = Reader::from_str(xml);
    let mut events = Vec::new();
    let mut lines = Vec::new();
    let mut current: Option<TextLine> = None;
    let mut file_name: Option<String> = None;
    let mut in_file_name = false;
    let mut page_size = None;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let self_closing = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"TextLine" => {
                        let line = read_line(e, lines.len() + 1)?;
                        if self_closing {
                            lines.push(line);
                        } else {
                            current = Some(line);
                        }
                    }
                    b"String" => {
                        if let Some(line) = current.as_mut() {
                            if let Some(string) = read_string(e)? {
                                line.strings.push(string);
                            }
                        }
                    }
                    b"Page" if page_size.is_none() => {
                        let width = attr(e, b"WIDTH")?.as_deref().and_then(parse_coordinate);
                        let height = attr(e, b"HEIGHT")?.as_deref().and_then(parse_coordinate);
                        page_size = width.zip(height);
                    }
                    b"fileName" if !self_closing => in_file_name = true,
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"TextLine" => {
                    if let Some(line) = current.take() {
                        lines.push(line);
                    }
                }
                b"fileName" => in_file_name = false,
                _ => {}
            },
            Event::Text(text) if in_file_name => {
                file_name
                    .get_or_insert_with(String::new)
                    .push_str(&text.unescape()?);
            }
            Event::Eof => break,
            _ => {}
        }
        events.push(event.into_owned());
    }

    let file_name = file_name.and_then(|name| {
        let trimmed = name.trim();
        trimmed
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
    });

    debug!(lines = lines.len(), ?file_name, "parsed ALTO layout");
    Ok(AltoDocument {
        events,
        lines,
        file_name,
        page_size,
    })
}

/// Value of the attribute with the given local name.
pub(crate) fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>, AltoError> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn read_line(e: &BytesStart, position: usize) -> Result<TextLine, AltoError> {
    Ok(TextLine {
        id: attr(e, b"ID")?,
        position,
        geometry: LineGeometry {
            hpos: attr(e, b"HPOS")?,
            vpos: attr(e, b"VPOS")?,
            width: attr(e, b"WIDTH")?,
            height: attr(e, b"HEIGHT")?,
        },
        strings: Vec::new(),
    })
}

/// Existing strings are informational only, so unreadable ones are skipped.
fn read_string(e: &BytesStart) -> Result<Option<AltoString>, AltoError> {
    let content = attr(e, b"CONTENT")?.unwrap_or_default();
    let coord = |name: &[u8]| -> Result<Option<i64>, AltoError> {
        Ok(attr(e, name)?.as_deref().and_then(parse_coordinate))
    };
    let rect = match (coord(b"HPOS")?, coord(b"VPOS")?, coord(b"WIDTH")?, coord(b"HEIGHT")?) {
        (Some(hpos), Some(vpos), Some(width), Some(height)) => {
            Rect::checked_from_extent(hpos, vpos, width, height)
        }
        _ => None,
    };
    match rect {
        Some(rect) => Ok(Some(AltoString { content, rect })),
        None => {
            debug!(%content, "ignoring existing String without geometry");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#">
  <Description>
    <sourceImageInformation>
      <fileName>uploads/doc/SM_NPQ_C01_006_1.jpg</fileName>
    </sourceImageInformation>
  </Description>
  <Layout>
    <Page WIDTH="2480" HEIGHT="3508" PHYSICAL_IMG_NR="1" ID="eSc_dummypage_">
      <PrintSpace HPOS="0" VPOS="0" WIDTH="2480" HEIGHT="3508">
        <TextBlock ID="eSc_textblock_1">
          <TextLine ID="eSc_line_3f31ece7" TAGREFS="LT15" BASELINE="1029 797 2255 780" HPOS="1026" VPOS="724" WIDTH="1229" HEIGHT="118">
            <Shape><Polygon POINTS="1026 724 2255 724 2255 842 1026 842"/></Shape>
            <String CONTENT="Par" HPOS="1030" VPOS="730" WIDTH="60" HEIGHT="40"/>
            <SP/>
            <String CONTENT="bad" HPOS="x" VPOS="730" WIDTH="60" HEIGHT="40"/>
          </TextLine>
          <TextLine ID="eSc_line_2" HPOS="1026.5" VPOS="860" WIDTH="1229" HEIGHT="118"/>
        </TextBlock>
      </PrintSpace>
    </Page>
  </Layout>
</alto>"#;

    #[test]
    fn reads_lines_in_document_order() {
        let doc = read_alto(LAYOUT).unwrap();
        let ids: Vec<_> = doc.lines.iter().map(|l| l.label()).collect();
        assert_eq!(ids, vec!["eSc_line_3f31ece7", "eSc_line_2"]);
        assert_eq!(doc.lines[1].position, 2);
        assert_eq!(doc.lines[1].geometry.hpos.as_deref(), Some("1026.5"));
    }

    #[test]
    fn reads_existing_strings() {
        let doc = read_alto(LAYOUT).unwrap();
        assert_eq!(doc.lines[0].text(), "Par");
        assert!(doc.lines[1].strings.is_empty());
    }

    #[test]
    fn reads_file_name_and_page_size() {
        let doc = read_alto(LAYOUT).unwrap();
        assert_eq!(doc.file_name.as_deref(), Some("SM_NPQ_C01_006_1.jpg"));
        assert_eq!(doc.page_size, Some((2480, 3508)));
    }

    #[test]
    fn unsegmented_page_has_no_lines() {
        let doc = read_alto(r#"<alto><Layout><Page WIDTH="1" HEIGHT="1"/></Layout></alto>"#).unwrap();
        assert!(doc.lines.is_empty());
        assert_eq!(doc.file_name, None);
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(read_alto("<alto><Layout></alto>").is_err());
    }
}
