//! Detector label set
//!
//! Fixed 7-category closed set; the enum order is the model's class id order.

use serde::{Deserialize, Serialize};

/// Driver-state category emitted by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Awake,
    Distracted,
    Drowsy,
    HeadDrop,
    Phone,
    Smoking,
    Yawn,
}

/// Number of detector classes
pub const NUM_LABELS: usize = 7;

/// All labels in class-id order
pub const ALL_LABELS: [Label; NUM_LABELS] = [
    Label::Awake,
    Label::Distracted,
    Label::Drowsy,
    Label::HeadDrop,
    Label::Phone,
    Label::Smoking,
    Label::Yawn,
];

impl Label {
    /// Label from model class id
    pub fn from_index(index: usize) -> Option<Self> {
        ALL_LABELS.get(index).copied()
    }

    /// Wire/display tag, matching the model's label file
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Awake => "awake",
            Label::Distracted => "distracted",
            Label::Drowsy => "drowsy",
            Label::HeadDrop => "head drop",
            Label::Phone => "phone",
            Label::Smoking => "smoking",
            Label::Yawn => "yawn",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
