//! Merged document skeleton and the append rule

use std::sync::Mutex;

use crate::domain::node::{Element, Placemark, XmlNode};
use crate::domain::qname::{DOCUMENT, KML_NAMESPACE, KML_ROOT};

/// Collects placemarks into `<kml xmlns="…"><Document>…</Document></kml>`.
///
/// `append` may be called from several worker threads at once; appends are
/// serialized so every batch lands contiguously and none is lost. There is no
/// removal: the assembler is write-only until [`finish`](Self::finish).
#[derive(Debug)]
pub struct DocumentAssembler {
    container: Mutex<Vec<XmlNode>>,
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self {
            container: Mutex::new(Vec::new()),
        }
    }

    /// Move a batch of placemarks into the container. Returns the batch size.
    pub fn append(&self, placemarks: Vec<Placemark>) -> usize {
        let count = placemarks.len();
        let mut container = self
            .container
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        container.extend(
            placemarks
                .into_iter()
                .map(|p| XmlNode::Element(p.into_element())),
        );
        count
    }

    pub fn len(&self) -> usize {
        self.container
            .lock()
            .map(|c| c.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finish(self) -> MergedDocument {
        let children = self
            .container
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut document = Element::new(DOCUMENT.local_name);
        document.children = children;

        let mut root = Element::new(KML_ROOT.local_name).with_attribute("xmlns", KML_NAMESPACE);
        root.push_child(XmlNode::Element(document));

        MergedDocument { root }
    }
}

/// Finished merge result, ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    root: Element,
}

impl MergedDocument {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn container(&self) -> Option<&Element> {
        self.root.child_elements().next()
    }

    pub fn placemarks(&self) -> impl Iterator<Item = &Element> {
        self.container()
            .into_iter()
            .flat_map(|container| container.child_elements())
    }

    pub fn placemark_count(&self) -> usize {
        self.placemarks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.placemark_count() == 0
    }
}
