//! S3 XML deserialization: parsing request bodies into model types.

use harbor_s3_model::types::{CompletedMultipartUpload, CompletedPart};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::XmlError;

/// Trait for deserializing S3 types from XML.
///
/// The root element has already been consumed by the caller; the implementation
/// reads child elements until the matching end tag.
pub trait S3Deserialize: Sized {
    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize S3-compatible XML into a typed value.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed or deserialization fails.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                return T::deserialize_xml(&mut reader);
            }
            Event::Eof => {
                return Err(XmlError::MissingElement("root element".to_string()));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                {
                    text.push(ch);
                    continue;
                }
                let name = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                    .ok_or_else(|| XmlError::ParseError(format!("unknown entity &{name};")))?;
                text.push_str(resolved);
            }
            Event::End(_) => {
                return Ok(text);
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Deserialize a list of items where each item is wrapped in the given element name.
fn deserialize_list<T: S3Deserialize>(
    reader: &mut Reader<&[u8]>,
    item_tag: &str,
) -> Result<Vec<T>, XmlError> {
    let mut items = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let tag_name = std::str::from_utf8(name.as_ref())
                    .map_err(|e| XmlError::ParseError(e.to_string()))?;
                if tag_name == item_tag {
                    items.push(T::deserialize_xml(reader)?);
                } else {
                    skip_element(reader)?;
                }
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF in list".to_string(),
                ));
            }
            _ => {}
        }
    }

    Ok(items)
}

impl S3Deserialize for CompletedPart {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut part_number = None;
        let mut e_tag = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = e.name();
                    let tag_name = std::str::from_utf8(name.as_ref())
                        .map_err(|e| XmlError::ParseError(e.to_string()))?;
                    match tag_name {
                        "PartNumber" => {
                            let text = read_text_content(reader)?;
                            part_number = Some(text.trim().parse::<u32>().map_err(|e| {
                                XmlError::ParseError(format!("invalid PartNumber '{text}': {e}"))
                            })?);
                        }
                        "ETag" => e_tag = Some(read_text_content(reader)?),
                        _ => skip_element(reader)?,
                    }
                }
                Event::End(_) => break,
                Event::Eof => {
                    return Err(XmlError::UnexpectedElement(
                        "unexpected EOF in CompletedPart".to_string(),
                    ));
                }
                _ => {}
            }
        }

        Ok(CompletedPart {
            part_number: part_number
                .ok_or_else(|| XmlError::MissingElement("PartNumber".to_owned()))?,
            e_tag: e_tag.ok_or_else(|| XmlError::MissingElement("ETag".to_owned()))?,
        })
    }
}

impl S3Deserialize for CompletedMultipartUpload {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let parts = deserialize_list(reader, "Part")?;
        Ok(CompletedMultipartUpload { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_deserialize_complete_multipart_upload() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <CompleteMultipartUpload xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
            <Part><PartNumber>1</PartNumber><ETag>"a54357aff0632cce46d942af68356b38"</ETag></Part>
            <Part><ETag>"0c78aef83f66abc1fa1e8477f296d394"</ETag><PartNumber>2</PartNumber></Part>
        </CompleteMultipartUpload>"#;

        let upload: CompletedMultipartUpload = from_xml(xml).expect("deserialization should succeed");
        assert_eq!(upload.parts.len(), 2);
        assert_eq!(upload.parts[0].part_number, 1);
        assert_eq!(upload.parts[0].unquoted_etag(), "a54357aff0632cce46d942af68356b38");
        assert_eq!(upload.parts[1].part_number, 2);
    }

    #[test]
    fn test_should_decode_escaped_quotes_in_etag() {
        let xml = b"<CompleteMultipartUpload><Part><PartNumber>3</PartNumber>\
            <ETag>&quot;abc&quot;</ETag></Part></CompleteMultipartUpload>";

        let upload: CompletedMultipartUpload = from_xml(xml).unwrap();
        assert_eq!(upload.parts[0].e_tag, "\"abc\"");
    }

    #[test]
    fn test_should_reject_part_without_number() {
        let xml = b"<CompleteMultipartUpload><Part><ETag>x</ETag></Part></CompleteMultipartUpload>";
        let result: Result<CompletedMultipartUpload, _> = from_xml(xml);
        assert!(matches!(result, Err(XmlError::MissingElement(ref e)) if e == "PartNumber"));
    }

    #[test]
    fn test_should_reject_non_numeric_part_number() {
        let xml = b"<CompleteMultipartUpload><Part><PartNumber>one</PartNumber>\
            <ETag>x</ETag></Part></CompleteMultipartUpload>";
        let result: Result<CompletedMultipartUpload, _> = from_xml(xml);
        assert!(matches!(result, Err(XmlError::ParseError(_))));
    }

    #[test]
    fn test_should_reject_empty_body() {
        let result: Result<CompletedMultipartUpload, _> = from_xml(b"");
        assert!(matches!(result, Err(XmlError::MissingElement(_))));
    }
}
