use crate::document::Document;
use crate::mark::Mark;
use crate::point::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Resolve a pair of points against `document` and derive direction.
///
/// This is the shared normalization behind every range kind: both points
/// resolve to genuine text leaves, a half-set pair collapses onto its set
/// point, a fully-unset pair defaults to the document's first text at
/// offset 0, and an unset direction is derived from document order.
fn normalize_points(
    anchor: &Point,
    focus: &Point,
    is_backward: Option<bool>,
    document: &Document,
) -> (Point, Point, Option<bool>) {
    let mut anchor = anchor.normalized(document);
    let mut focus = focus.normalized(document);

    if !anchor.is_set() && !focus.is_set() {
        match document.get_first_text() {
            Some((path, text)) => {
                let point = Point {
                    key: Some(text.key.clone()),
                    path: Some(path),
                    offset: 0,
                };
                return (point.clone(), point, Some(false));
            }
            None => return (Point::unset(), Point::unset(), None),
        }
    }

    if !anchor.is_set() {
        anchor = focus.clone();
    } else if !focus.is_set() {
        focus = anchor.clone();
    }

    let is_backward = match is_backward {
        Some(b) => Some(b),
        None => match anchor.compare(&focus) {
            Some(Ordering::Greater) => Some(true),
            Some(_) => Some(false),
            None => None,
        },
    };

    (anchor, focus, is_backward)
}

/// A plain two-point span in the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename = "range", rename_all = "camelCase")]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_backward: Option<bool>,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self {
            anchor,
            focus,
            is_backward: None,
        }
    }

    /// A collapsed range with both points at `point`.
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
            is_backward: Some(false),
        }
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_set() && self.focus.is_set()
    }

    pub fn is_collapsed(&self) -> bool {
        (self.anchor.key.is_some() && self.anchor.key == self.focus.key
            || self.anchor.path.is_some() && self.anchor.path == self.focus.path)
            && self.anchor.offset == self.focus.offset
    }

    pub fn is_backward(&self) -> bool {
        self.is_backward.unwrap_or(false)
    }

    /// The point earlier in document order.
    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    /// The point later in document order.
    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }

    pub fn normalized(&self, document: &Document) -> Range {
        let (anchor, focus, is_backward) =
            normalize_points(&self.anchor, &self.focus, self.is_backward, document);
        Range {
            anchor,
            focus,
            is_backward,
        }
    }
}

/// The user selection: a range that also tracks UI focus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename = "selection", rename_all = "camelCase")]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_backward: Option<bool>,

    #[serde(default)]
    pub is_focused: bool,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
            is_backward: Some(false),
            is_focused: false,
        }
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_set() && self.focus.is_set()
    }

    pub fn is_collapsed(&self) -> bool {
        self.as_range().is_collapsed()
    }

    pub fn is_backward(&self) -> bool {
        self.is_backward.unwrap_or(false)
    }

    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }

    /// View this selection as a plain range.
    pub fn as_range(&self) -> Range {
        Range {
            anchor: self.anchor.clone(),
            focus: self.focus.clone(),
            is_backward: self.is_backward,
        }
    }

    pub fn normalized(&self, document: &Document) -> Selection {
        let (anchor, focus, is_backward) =
            normalize_points(&self.anchor, &self.focus, self.is_backward, document);
        Selection {
            anchor,
            focus,
            is_backward,
            is_focused: self.is_focused,
        }
    }
}

/// A decoration span: a range carrying the mark to render over it.
/// Decoration endpoints are atomic: the span does not grow from
/// insertions at its edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename = "decoration", rename_all = "camelCase")]
pub struct Decoration {
    pub anchor: Point,
    pub focus: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_backward: Option<bool>,

    pub mark: Mark,
}

impl Decoration {
    pub fn new(anchor: Point, focus: Point, mark: Mark) -> Self {
        Self {
            anchor,
            focus,
            is_backward: None,
            mark,
        }
    }

    pub fn is_set(&self) -> bool {
        self.anchor.is_set() && self.focus.is_set()
    }

    pub fn as_range(&self) -> Range {
        Range {
            anchor: self.anchor.clone(),
            focus: self.focus.clone(),
            is_backward: self.is_backward,
        }
    }

    pub fn normalized(&self, document: &Document) -> Decoration {
        let (anchor, focus, is_backward) =
            normalize_points(&self.anchor, &self.focus, self.is_backward, document);
        Decoration {
            anchor,
            focus,
            is_backward,
            mark: self.mark.clone(),
        }
    }
}

/// Partial selection properties: the payload of `set_selection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Point>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Point>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_backward: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_focused: Option<bool>,
}

impl SelectionProperties {
    pub fn is_empty(&self) -> bool {
        self.anchor.is_none()
            && self.focus.is_none()
            && self.is_backward.is_none()
            && self.is_focused.is_none()
    }

    /// Apply these properties on top of `selection`.
    pub fn applied_to(&self, selection: &Selection) -> Selection {
        Selection {
            anchor: self.anchor.clone().unwrap_or_else(|| selection.anchor.clone()),
            focus: self.focus.clone().unwrap_or_else(|| selection.focus.clone()),
            is_backward: match (&self.anchor, &self.focus) {
                // Moving either endpoint invalidates a stored direction
                // unless one is given explicitly.
                (None, None) => self.is_backward.or(selection.is_backward),
                _ => self.is_backward,
            },
            is_focused: self.is_focused.unwrap_or(selection.is_focused),
        }
    }

    /// Capture, from `selection`, the previous values of exactly the
    /// fields this properties object would overwrite.
    pub fn captured_from(&self, selection: &Selection) -> SelectionProperties {
        SelectionProperties {
            anchor: self.anchor.as_ref().map(|_| selection.anchor.clone()),
            focus: self.focus.as_ref().map(|_| selection.focus.clone()),
            is_backward: match (&self.anchor, &self.focus) {
                (None, None) => self.is_backward.and(selection.is_backward),
                _ => selection.is_backward,
            },
            is_focused: self.is_focused.map(|_| selection.is_focused),
        }
    }

    /// The same properties with any focus change dropped, so replaying
    /// history does not steal UI focus.
    pub fn without_focus(&self) -> SelectionProperties {
        SelectionProperties {
            is_focused: None,
            ..self.clone()
        }
    }
}

impl From<Range> for SelectionProperties {
    fn from(range: Range) -> Self {
        SelectionProperties {
            anchor: Some(range.anchor),
            focus: Some(range.focus),
            is_backward: range.is_backward,
            is_focused: None,
        }
    }
}
