/// Marker for values compared field by field (`Money`, `CardNumber`).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
