//! Namespace-qualified element names
//!
//! KML elements are matched by (namespace URI, local name), never by the raw
//! tag text: `<Placemark>` under a default namespace and `<kml:Placemark>` are
//! the same element, while a `<Placemark>` outside the KML namespace is not.

use std::fmt;

/// KML 2.2 namespace URI.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Reserved `xml:` prefix namespace.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The element extracted from every source document.
pub const PLACEMARK: QualifiedName = QualifiedName::new(KML_NAMESPACE, "Placemark");

/// Root element of the merged document.
pub const KML_ROOT: QualifiedName = QualifiedName::new(KML_NAMESPACE, "kml");

/// Container element holding the merged placemarks.
pub const DOCUMENT: QualifiedName = QualifiedName::new(KML_NAMESPACE, "Document");

/// (namespace URI, local name) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace: &'static str,
    pub local_name: &'static str,
}

impl QualifiedName {
    pub const fn new(namespace: &'static str, local_name: &'static str) -> Self {
        Self {
            namespace,
            local_name,
        }
    }

    /// True if a resolved element name refers to this qualified name.
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        namespace == Some(self.namespace) && local_name == self.local_name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local_name)
    }
}

/// Split a raw tag name into `(prefix, local name)`.
pub fn split_qname(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    }
}

/// Namespace prefix declared by an attribute key.
///
/// `xmlns` declares the default namespace (`Some(None)`), `xmlns:p` declares
/// prefix `p` (`Some(Some("p"))`), anything else is not a declaration.
pub fn declared_prefix(attribute_key: &str) -> Option<Option<&str>> {
    if attribute_key == "xmlns" {
        Some(None)
    } else {
        attribute_key.strip_prefix("xmlns:").map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_kml_namespace_when_matching_placemark_then_true() {
        assert!(PLACEMARK.matches(Some(KML_NAMESPACE), "Placemark"));
    }

    #[test]
    fn given_other_namespace_or_none_when_matching_then_false() {
        assert!(!PLACEMARK.matches(Some("http://earth.google.com/kml/2.1"), "Placemark"));
        assert!(!PLACEMARK.matches(None, "Placemark"));
        assert!(!PLACEMARK.matches(Some(KML_NAMESPACE), "placemark"));
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("kml:Placemark"), (Some("kml"), "Placemark"));
        assert_eq!(split_qname("Placemark"), (None, "Placemark"));
    }

    #[test]
    fn test_declared_prefix() {
        assert_eq!(declared_prefix("xmlns"), Some(None));
        assert_eq!(declared_prefix("xmlns:gx"), Some(Some("gx")));
        assert_eq!(declared_prefix("id"), None);
    }

    #[test]
    fn test_display_uses_clark_notation() {
        assert_eq!(
            PLACEMARK.to_string(),
            "{http://www.opengis.net/kml/2.2}Placemark"
        );
    }
}
