/// Namespace of the W3C error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// Namespace of the project specific error codes.
pub const XDB_ERR_NS: &str = "urn:xmldb:errors";
/// Implicitly bound `xml` prefix.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// Inline capacity of `CompactString` on 64-bit targets.
pub const INLINE_TEXT: usize = 24;
