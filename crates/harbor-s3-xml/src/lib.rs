//! S3 XML serialization/deserialization for the Harbor gateway.
//!
//! S3 uses the RestXml protocol with `noErrorWrapping: true`.
//!
//! # Key components
//!
//! - [`S3Serialize`] trait with [`to_xml`] and [`to_xml_fragment`] for response bodies
//! - [`S3Deserialize`] trait and [`from_xml`] for request bodies
//! - [`error_to_xml`] and [`error_to_xml_fragment`] for `<Error>` documents
//!
//! The `_fragment` variants omit the XML declaration. They exist for streamed
//! responses whose declaration was already sent as a keep-alive preamble.

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{S3Deserialize, from_xml};
pub use error::{XmlError, error_to_xml, error_to_xml_fragment};
pub use serialize::{S3_NAMESPACE, S3Serialize, XML_DECLARATION, to_xml, to_xml_fragment};
