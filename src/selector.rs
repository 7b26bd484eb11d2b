//! Selectors and targets: the "where" of an annotation.
//!
//! A [`Target`] bundles a source document reference with an ordered
//! list of [`Selector`]s. Selectors are a closed variant family over
//! geometric and textual locators, dispatched on input shape:
//!
//! - an `"x"` key means a bounding box: `{x, y, height, width}`
//! - a `"startOffset"` key means an XPath range:
//!   `{startContainer, endContainer, startOffset, endOffset}`
//! - any other shape is an unresolvable-shape error
//!
//! Targets have value semantics. Cloning a target duplicates every
//! selector structurally; the `source` field is a document id, so the
//! referenced document stays shared through the registry and is never
//! copied.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{json_type_name, Error, Result};
use crate::models::DocumentId;

/// A geometric or textual locator within a document's content.
///
/// Modeled as a tagged sum so serialization is an exhaustive match
/// rather than runtime type inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    /// Rectangular region in document coordinates.
    ///
    /// `height` and `width` are expected to be non-negative; this is
    /// not enforced.
    BoundingBox {
        /// X coordinate of the top-left corner.
        x: f64,
        /// Y coordinate of the top-left corner.
        y: f64,
        /// Region height.
        height: f64,
        /// Region width.
        width: f64,
    },
    /// Text-offset range between two container nodes.
    ///
    /// `start_offset <= end_offset` is expected, not enforced.
    XPathRange {
        /// XPath of the node the range starts in.
        start_container: String,
        /// XPath of the node the range ends in.
        end_container: String,
        /// Character offset within the start container.
        start_offset: u64,
        /// Character offset within the end container.
        end_offset: u64,
    },
}

impl Selector {
    /// Create a bounding box selector.
    #[must_use]
    pub fn bbox(x: f64, y: f64, height: f64, width: f64) -> Self {
        Self::BoundingBox {
            x,
            y,
            height,
            width,
        }
    }

    /// Create an XPath range selector.
    #[must_use]
    pub fn xpath_range(
        start_container: impl Into<String>,
        end_container: impl Into<String>,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self::XPathRange {
            start_container: start_container.into(),
            end_container: end_container.into(),
            start_offset,
            end_offset,
        }
    }

    /// Construct a selector from its dictionary shape.
    ///
    /// Dispatches on the presence of an `"x"` or `"startOffset"` key.
    /// Any other shape fails with [`Error::UnresolvableShape`].
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(map) = value.as_object() else {
            return Err(Error::shape(json_type_name(value)));
        };
        if map.contains_key("x") {
            Ok(Self::BoundingBox {
                x: require_f64(map, "x")?,
                y: require_f64(map, "y")?,
                height: require_f64(map, "height")?,
                width: require_f64(map, "width")?,
            })
        } else if map.contains_key("startOffset") {
            Ok(Self::XPathRange {
                start_container: require_str(map, "startContainer")?,
                end_container: require_str(map, "endContainer")?,
                start_offset: require_u64(map, "startOffset")?,
                end_offset: require_u64(map, "endOffset")?,
            })
        } else {
            Err(Error::shape("object"))
        }
    }

    /// Serialize to the dictionary shape accepted by [`Self::from_value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::BoundingBox {
                x,
                y,
                height,
                width,
            } => json!({
                "x": x,
                "y": y,
                "height": height,
                "width": width,
            }),
            Self::XPathRange {
                start_container,
                end_container,
                start_offset,
                end_offset,
            } => json!({
                "startContainer": start_container,
                "endContainer": end_container,
                "startOffset": start_offset,
                "endOffset": end_offset,
            }),
        }
    }
}

fn require_f64(map: &serde_json::Map<String, Value>, key: &str) -> Result<f64> {
    map.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::parse(format!("selector is missing numeric `{key}`")))
}

fn require_u64(map: &serde_json::Map<String, Value>, key: &str) -> Result<u64> {
    map.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::parse(format!("selector is missing integer `{key}`")))
}

fn require_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::parse(format!("selector is missing string `{key}`")))
}

/// The "where" of an annotation: a document reference plus selectors.
///
/// Owned by exactly one annotation. `Clone` performs a structural copy
/// of the selector list; `source` is an id, so the document itself is
/// shared, not duplicated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    /// Id of the document the selectors locate into.
    pub source: Option<DocumentId>,
    /// Ordered selector list. May be empty.
    pub selector: Vec<Selector>,
}

impl Target {
    /// Create a target over a document with the given selectors.
    #[must_use]
    pub fn new(source: impl Into<DocumentId>, selector: Vec<Selector>) -> Self {
        Self {
            source: Some(source.into()),
            selector,
        }
    }

    /// The empty target: no source, no selectors.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if the target has no source and no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.selector.is_empty()
    }

    /// Serialize to the wire shape
    /// `{ "source": <document-id>, "selector": [ ... ] }`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "source": self.source,
            "selector": self.selector.iter().map(Selector::to_value).collect::<Vec<_>>(),
        })
    }
}

impl crate::merge::Fill for Target {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dispatch() {
        let v = json!({"x": 1.0, "y": 2.0, "height": 3.0, "width": 4.0});
        let s = Selector::from_value(&v).unwrap();
        assert_eq!(s, Selector::bbox(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_xpath_dispatch() {
        let v = json!({
            "startContainer": "/div[1]",
            "endContainer": "/div[2]",
            "startOffset": 4,
            "endOffset": 10,
        });
        let s = Selector::from_value(&v).unwrap();
        assert_eq!(s, Selector::xpath_range("/div[1]", "/div[2]", 4, 10));
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let err = Selector::from_value(&json!({"left": 3})).unwrap_err();
        assert!(matches!(err, Error::UnresolvableShape { .. }));
        let err = Selector::from_value(&json!("bbox")).unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvableShape { type_name: "string" }
        ));
    }

    #[test]
    fn test_selector_round_trip() {
        for s in [
            Selector::bbox(0.0, 0.5, 10.0, 20.0),
            Selector::xpath_range("/p[1]", "/p[1]", 2, 9),
        ] {
            assert_eq!(Selector::from_value(&s.to_value()).unwrap(), s);
        }
    }

    #[test]
    fn test_target_clone_copies_selectors() {
        let a = Target::new("doc-1", vec![Selector::bbox(0.0, 0.0, 1.0, 1.0)]);
        let mut b = a.clone();
        if let Selector::BoundingBox { x, .. } = &mut b.selector[0] {
            *x = 99.0;
        }
        assert_eq!(a.selector[0], Selector::bbox(0.0, 0.0, 1.0, 1.0));
        assert_eq!(a.source, b.source);
    }
}
