use crate::DataMap;
use serde::{Deserialize, Serialize};

/// A formatting annotation attached to a run of text.
///
/// Marks have value semantics: two marks with equal `type` and `data`
/// are interchangeable, so leaves store a set of marks compared by
/// equality rather than identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename = "mark")]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,

    #[serde(default, skip_serializing_if = "DataMap::is_empty")]
    pub data: DataMap,
}

impl Mark {
    /// Create a mark with no data.
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            data: DataMap::new(),
        }
    }

    pub fn with_data(mark_type: impl Into<String>, data: DataMap) -> Self {
        Self {
            mark_type: mark_type.into(),
            data,
        }
    }
}

/// Partial mark properties, used by `set_mark` to update a mark in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkProperties {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mark_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
}

impl MarkProperties {
    /// Apply these properties on top of `mark`, returning the updated mark.
    pub fn applied_to(&self, mark: &Mark) -> Mark {
        Mark {
            mark_type: self
                .mark_type
                .clone()
                .unwrap_or_else(|| mark.mark_type.clone()),
            data: self.data.clone().unwrap_or_else(|| mark.data.clone()),
        }
    }

    /// Capture, from `mark`, the previous values of exactly the fields
    /// this properties object would overwrite. Applying the result to
    /// the updated mark restores the original.
    pub fn captured_from(&self, mark: &Mark) -> MarkProperties {
        MarkProperties {
            mark_type: self.mark_type.as_ref().map(|_| mark.mark_type.clone()),
            data: self.data.as_ref().map(|_| mark.data.clone()),
        }
    }
}

/// Set-insert into a mark list: marks compare by value, so a mark that
/// is already present is not added twice.
pub fn add_to_set(marks: &mut Vec<Mark>, mark: Mark) {
    if !marks.contains(&mark) {
        marks.push(mark);
    }
}

/// Set-remove from a mark list.
pub fn remove_from_set(marks: &mut Vec<Mark>, mark: &Mark) {
    marks.retain(|m| m != mark);
}

/// Order-insensitive mark set equality.
pub fn sets_equal(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().all(|m| b.contains(m))
}
