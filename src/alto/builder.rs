use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::alto::{AltoError, ALTO_NS};
use crate::ocr::paragraphs::{page_size, paragraph_lines, ParagraphLine};
use crate::ocr::response::VisionResponse;

const TAGS: [(&str, &str, &str); 6] = [
    ("BT1", "Title", "block type Title"),
    ("BT2", "Main", "block type Main"),
    ("BT3", "Commentary", "block type Commentary"),
    ("BT4", "Illustration", "block type Illustration"),
    ("BT7", "text", "block type text"),
    ("LT7", "default", "line type"),
];

/// Builds a fresh ALTO document for a page that has not been segmented,
/// with one text block, line and string per OCR paragraph.
pub fn build_alto(file_name: &str, response: &VisionResponse) -> Result<String, AltoError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("alto");
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    root.push_attribute(("xmlns", ALTO_NS));
    root.push_attribute((
        "xsi:schemaLocation",
        "http://www.loc.gov/standards/alto/ns-v4# http://www.loc.gov/standards/alto/v4/alto-4-0.xsd",
    ));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("Description")))?;
    write_simple_element(&mut writer, "MeasurementUnit", "pixel")?;
    writer.write_event(Event::Start(BytesStart::new("sourceImageInformation")))?;
    write_simple_element(&mut writer, "fileName", file_name)?;
    writer.write_event(Event::End(BytesEnd::new("sourceImageInformation")))?;
    writer.write_event(Event::End(BytesEnd::new("Description")))?;

    writer.write_event(Event::Start(BytesStart::new("Tags")))?;
    for (id, label, description) in TAGS {
        let mut tag = BytesStart::new("OtherTag");
        tag.push_attribute(("ID", id));
        tag.push_attribute(("LABEL", label));
        tag.push_attribute(("DESCRIPTION", description));
        writer.write_event(Event::Empty(tag))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Tags")))?;

    let (width, height) = page_size(response).unwrap_or((0, 0));
    let (width, height) = (width.to_string(), height.to_string());

    writer.write_event(Event::Start(BytesStart::new("Layout")))?;
    let mut page = BytesStart::new("Page");
    page.push_attribute(("WIDTH", width.as_str()));
    page.push_attribute(("HEIGHT", height.as_str()));
    page.push_attribute(("PHYSICAL_IMG_NR", "0"));
    page.push_attribute(("ID", "eSc_dummypage_"));
    writer.write_event(Event::Start(page))?;

    let mut print_space = BytesStart::new("PrintSpace");
    print_space.push_attribute(("HPOS", "0"));
    print_space.push_attribute(("VPOS", "0"));
    print_space.push_attribute(("WIDTH", width.as_str()));
    print_space.push_attribute(("HEIGHT", height.as_str()));
    writer.write_event(Event::Start(print_space))?;

    for (idx, paragraph) in paragraph_lines(response).iter().enumerate() {
        write_block(&mut writer, idx + 1, paragraph)?;
    }

    writer.write_event(Event::End(BytesEnd::new("PrintSpace")))?;
    writer.write_event(Event::End(BytesEnd::new("Page")))?;
    writer.write_event(Event::End(BytesEnd::new("Layout")))?;
    writer.write_event(Event::End(BytesEnd::new("alto")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_simple_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), AltoError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_block<W: Write>(
    writer: &mut Writer<W>,
    number: usize,
    paragraph: &ParagraphLine,
) -> Result<(), AltoError> {
    let rect = paragraph.rect;
    let hpos = rect.hpos().to_string();
    let vpos = rect.vpos().to_string();
    let width = rect.width().to_string();
    let height = rect.height().to_string();
    let block_id = format!("text_block_{number}");
    let line_id = format!("line_{}_{}", rect.x_min, rect.y_min);
    let baseline = format!("{} {} {} {}", rect.x_min, rect.y_max, rect.x_max, rect.y_max);
    let points = paragraph
        .quad
        .vertices
        .iter()
        .filter_map(|v| Some(format!("{} {}", v.x?, v.y?)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut block = BytesStart::new("TextBlock");
    block.push_attribute(("HPOS", hpos.as_str()));
    block.push_attribute(("VPOS", vpos.as_str()));
    block.push_attribute(("WIDTH", width.as_str()));
    block.push_attribute(("HEIGHT", height.as_str()));
    block.push_attribute(("ID", block_id.as_str()));
    writer.write_event(Event::Start(block))?;

    writer.write_event(Event::Start(BytesStart::new("Shape")))?;
    let mut polygon = BytesStart::new("Polygon");
    polygon.push_attribute(("POINTS", points.as_str()));
    writer.write_event(Event::Empty(polygon))?;
    writer.write_event(Event::End(BytesEnd::new("Shape")))?;

    let mut line = BytesStart::new("TextLine");
    line.push_attribute(("ID", line_id.as_str()));
    line.push_attribute(("BASELINE", baseline.as_str()));
    line.push_attribute(("HPOS", hpos.as_str()));
    line.push_attribute(("VPOS", vpos.as_str()));
    line.push_attribute(("WIDTH", width.as_str()));
    line.push_attribute(("HEIGHT", height.as_str()));
    writer.write_event(Event::Start(line))?;

    let mut string = BytesStart::new("String");
    string.push_attribute(("CONTENT", paragraph.text.as_str()));
    string.push_attribute(("HPOS", hpos.as_str()));
    string.push_attribute(("VPOS", vpos.as_str()));
    string.push_attribute(("WIDTH", width.as_str()));
    string.push_attribute(("HEIGHT", height.as_str()));
    writer.write_event(Event::Empty(string))?;

    writer.write_event(Event::End(BytesEnd::new("TextLine")))?;
    writer.write_event(Event::End(BytesEnd::new("TextBlock")))?;
    Ok(())
}
