//! Display rule shared by every field renderer.

/// How a field value is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    /// The committed value, unchanged.
    Committed,
    /// A draft value that differs from the committed one.
    Pending,
    /// Nothing to show; the placeholder text stands in.
    Placeholder,
}

impl FieldStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Pending => "pending",
            Self::Placeholder => "placeholder",
        }
    }
}

/// Rendered text and style for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub text: String,
    pub style: FieldStyle,
}

/// Choose what to display for a field.
///
/// An unchanged, non-empty committed value shows as committed; a changed,
/// non-empty draft shows as pending; anything else (including an empty value
/// that equals an empty committed value, or a draft cleared to empty) falls
/// through to the placeholder.
pub fn view<'a>(committed: &'a str, draft: &'a str, placeholder: &'a str) -> (&'a str, FieldStyle) {
    if committed == draft && !committed.is_empty() {
        (committed, FieldStyle::Committed)
    } else if committed != draft && !draft.is_empty() {
        (draft, FieldStyle::Pending)
    } else {
        (placeholder, FieldStyle::Placeholder)
    }
}
