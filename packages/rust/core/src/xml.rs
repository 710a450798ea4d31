//! XML serialization of a [`Document`].
//!
//! ```text
//! <conversations>
//!   <conversation id="..">
//!     <prompt>..</prompt>
//!     <response_options>
//!       <response classification="..">
//!         <text>..</text>*
//!         <feedback>..</feedback>
//!         <next_conversation_id>..</next_conversation_id>?
//! ```

use std::fmt::Display;

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sheet2xml_shared::{Conversation, Document, Response, Result, Sheet2XmlError};

const INDENT_WIDTH: usize = 2;

/// Render `doc` as a UTF-8 XML string with an XML declaration.
///
/// Without `pretty` the body is written on one line after the declaration.
pub fn to_xml(doc: &Document, pretty: bool) -> Result<String> {
    let mut writer = if pretty {
        Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH)
    } else {
        Writer::new(Vec::new())
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;
    if !pretty {
        writer.get_mut().push(b'\n');
    }

    writer
        .write_event(Event::Start(BytesStart::new("conversations")))
        .map_err(xml_error)?;
    for conversation in &doc.conversations {
        write_conversation(&mut writer, conversation)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("conversations")))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Sheet2XmlError::Xml(format!("serializer produced invalid UTF-8: {e}")))
}

fn write_conversation(writer: &mut Writer<Vec<u8>>, conversation: &Conversation) -> Result<()> {
    let start = BytesStart::new("conversation").with_attributes([("id", conversation.id.as_str())]);
    writer.write_event(Event::Start(start)).map_err(xml_error)?;

    write_text_element(writer, "prompt", &conversation.prompt)?;

    writer
        .write_event(Event::Start(BytesStart::new("response_options")))
        .map_err(xml_error)?;
    for response in &conversation.responses {
        write_response(writer, response)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("response_options")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("conversation")))
        .map_err(xml_error)
}

fn write_response(writer: &mut Writer<Vec<u8>>, response: &Response) -> Result<()> {
    let start = BytesStart::new("response")
        .with_attributes([("classification", response.classification.as_str())]);
    writer.write_event(Event::Start(start)).map_err(xml_error)?;

    for text in &response.texts {
        write_text_element(writer, "text", text)?;
    }
    write_text_element(writer, "feedback", &response.feedback)?;
    if let Some(next) = &response.next_conversation_id {
        write_text_element(writer, "next_conversation_id", next)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("response")))
        .map_err(xml_error)
}

/// `<name>text</name>`. Only `&`, `<` and `>` are escaped in text. The text
/// event is written even when empty so the indenting writer keeps open and
/// close tags on one line.
fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn xml_error(err: impl Display) -> Sheet2XmlError {
    Sheet2XmlError::Xml(err.to_string())
}
