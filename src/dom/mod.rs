//! Thin mutable DOM over kuchiki
//!
//! The snapshot pipeline only needs a handful of tree operations: search by
//! selector, attribute get/set/remove, text get/set, rename, remove and
//! serialize. This module keeps those in one place so the stages never touch
//! kuchiki's `RefCell`s directly.

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};

use crate::utils::resolve_url;

/// Errors raised by DOM operations
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("Serialized document is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Attributes the pipeline rewrites in place and therefore shadows first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreservableAttr {
    Src,
    Href,
    Type,
}

impl PreservableAttr {
    /// Attribute name on the element
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Href => "href",
            Self::Type => "type",
        }
    }

    /// Name of the shadow attribute holding the original value
    #[must_use]
    pub const fn shadow_name(self) -> &'static str {
        match self {
            Self::Src => "data-oneshot-orig-src",
            Self::Href => "data-oneshot-orig-href",
            Self::Type => "data-oneshot-orig-type",
        }
    }
}

impl std::fmt::Display for PreservableAttr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed HTML document
pub struct Document {
    root: NodeRef,
}

impl Document {
    /// Parse an HTML document. HTML parsing never fails; malformed markup is
    /// repaired the way browsers repair it.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
        }
    }

    /// All elements matching `selector`, in document order
    ///
    /// The matches are collected before returning so callers may rename or
    /// detach nodes while walking the list.
    pub fn select(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        let matches = self
            .root
            .select(selector)
            .map_err(|()| DomError::InvalidSelector(selector.to_string()))?;
        Ok(matches.map(|node| Element { node }).collect())
    }

    /// Serialize the whole document back to HTML
    pub fn serialize(&self) -> Result<String, DomError> {
        let mut html_output = Vec::new();
        self.root.serialize(&mut html_output)?;
        Ok(String::from_utf8(html_output)?)
    }
}

/// Handle to one element of a [`Document`]
#[derive(Clone)]
pub struct Element {
    node: NodeDataRef<ElementData>,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag_name())
            .finish_non_exhaustive()
    }
}

impl Element {
    #[must_use]
    pub fn tag_name(&self) -> String {
        self.node.name.local.to_string()
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.node
            .attributes
            .borrow()
            .get(name)
            .map(std::string::ToString::to_string)
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.node.attributes.borrow().contains(name)
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.node
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }

    pub fn remove_attr(&self, name: &str) -> Option<String> {
        self.node
            .attributes
            .borrow_mut()
            .remove(name)
            .map(|attr| attr.value)
    }

    /// Concatenated text of all descendants
    #[must_use]
    pub fn text(&self) -> String {
        self.node.as_node().text_contents()
    }

    /// Replace every child with a single text node
    pub fn set_text(&self, text: &str) {
        let node = self.node.as_node();
        let children: Vec<_> = node.children().collect();
        for child in children {
            child.detach();
        }
        node.append(NodeRef::new_text(text));
    }

    /// Detach the element (and its subtree) from the document
    pub fn remove(&self) {
        self.node.as_node().detach();
    }

    /// Replace this element with a `tag` element carrying the same attributes
    /// and children, at the same position.
    ///
    /// kuchiki element names are immutable, so the replacement is created from
    /// a parsed fragment. `tag` must be an element the HTML parser accepts
    /// outside of any special context (`style`, `div`, `span`, ...).
    pub fn rename(&self, tag: &str) -> Result<Element, DomError> {
        let fragment = kuchiki::parse_html().one(format!("<{tag}></{tag}>"));
        let replacement = fragment
            .select_first(tag)
            .map_err(|()| DomError::InvalidSelector(tag.to_string()))?;
        let new_node = replacement.as_node();
        new_node.detach();

        *replacement.attributes.borrow_mut() = self.node.attributes.borrow().clone();

        let old_node = self.node.as_node();
        let children: Vec<_> = old_node.children().collect();
        for child in children {
            new_node.append(child);
        }

        old_node.insert_before(new_node.clone());
        old_node.detach();

        Ok(Element { node: replacement })
    }

    /// Copy the current value of `attr` into its shadow attribute
    ///
    /// Only the first call has an effect: once the shadow exists it is never
    /// overwritten, so re-running a rewrite keeps the true original. Returns
    /// whether the shadow was written by this call.
    pub fn preserve_attr(&self, attr: PreservableAttr) -> bool {
        let mut attrs = self.node.attributes.borrow_mut();
        if attrs.contains(attr.shadow_name()) {
            return false;
        }
        let original = attrs.get(attr.name()).unwrap_or_default().to_string();
        attrs.insert(attr.shadow_name(), original);
        true
    }

    /// Shadow `attr`, then rewrite it to its absolute form against `base`
    ///
    /// Returns the absolute URL now held by the attribute.
    pub fn make_attr_absolute(&self, attr: PreservableAttr, base: &str) -> String {
        self.preserve_attr(attr);
        let absolute = resolve_url(&self.attr(attr.name()).unwrap_or_default(), base);
        self.set_attr(attr.name(), &absolute);
        absolute
    }

    /// Original value of `attr` as recorded in its shadow, if any
    #[must_use]
    pub fn shadowed(&self, attr: PreservableAttr) -> Option<String> {
        self.attr(attr.shadow_name())
    }
}
