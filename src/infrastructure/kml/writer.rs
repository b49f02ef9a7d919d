//! Indented serialization of element trees

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::domain::{Element, XmlNode};

const INDENT_WIDTH: usize = 2;

/// Write `root` as a UTF-8 document with an XML declaration, indented.
pub fn write_document<W: Write>(root: &Element, out: W) -> Result<(), quick_xml::Error> {
    let mut writer = Writer::new_with_indent(out, b' ', INDENT_WIDTH);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

/// Serialize into an in-memory string.
pub fn to_string(root: &Element) -> Result<String, quick_xml::Error> {
    let mut buf = Vec::new();
    write_document(root, &mut buf)?;
    // the writer only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), quick_xml::Error> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            // "]]>" cannot appear inside a CDATA section
            XmlNode::CData(text) if text.contains("]]>") => {
                writer.write_event(Event::Text(BytesText::new(text)))?
            }
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KML_NAMESPACE;
    use crate::infrastructure::kml::reader::parse_document;

    fn sample() -> Element {
        let mut name = Element::new("name");
        name.push_child(XmlNode::Text("A & B <x>".into()));
        let mut description = Element::new("description");
        description.push_child(XmlNode::CData("<b>bold</b>".into()));
        let mut placemark = Element::new("Placemark").with_attribute("id", "say \"hi\"");
        placemark.push_child(XmlNode::Element(name));
        placemark.push_child(XmlNode::Element(description));
        placemark.push_child(XmlNode::Comment(" exported ".into()));
        let mut document = Element::new("Document");
        document.push_child(XmlNode::Element(placemark));
        let mut root = Element::new("kml").with_attribute("xmlns", KML_NAMESPACE);
        root.push_child(XmlNode::Element(document));
        root
    }

    #[test]
    fn given_tree_when_serialized_then_indented_with_declaration() {
        let xml = to_string(&sample()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("\n  <Document>"));
        assert!(xml.contains("\n    <Placemark id="));
        assert!(xml.contains("<name>A &amp; B &lt;x&gt;</name>"));
        assert!(xml.contains("<![CDATA[<b>bold</b>]]>"));
        assert!(xml.ends_with("</kml>\n"));
    }

    #[test]
    fn given_serialized_tree_when_parsed_back_then_identical() {
        let tree = sample();
        let xml = to_string(&tree).unwrap();
        assert_eq!(parse_document(xml.as_bytes()).unwrap(), tree);
    }

    #[test]
    fn given_cdata_with_terminator_when_serialized_then_escaped_text() {
        let mut element = Element::new("description");
        element.push_child(XmlNode::CData("a]]>b".into()));
        let xml = to_string(&element).unwrap();
        assert!(xml.contains("<description>a]]&gt;b</description>"));
    }

    #[test]
    fn given_childless_element_when_serialized_then_self_closing() {
        let xml = to_string(&Element::new("Document")).unwrap();
        assert!(xml.contains("<Document/>"));
    }
}
