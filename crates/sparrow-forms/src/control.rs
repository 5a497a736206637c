//! Form controls and their local state.
//!
//! [§ 4.10.2 Categories](https://html.spec.whatwg.org/multipage/forms.html#categories)
//!
//! Controls are read out of the document once. After that the control owns
//! its state (value, checkedness, selectedness, chosen files) and the tree is
//! never consulted again.

use std::fmt;
use std::path::Path;

use sparrow_dom::NodeId;

use crate::error::{FormError, Result};

/// Position of a control within its [`FormModel`](crate::FormModel), in
/// document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub usize);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of field a control is.
///
/// `input` types that only differ in presentation (`password`, `email`,
/// `number`, ...) are all [`ControlKind::Text`]; the original type is kept
/// in [`Control::input_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// Single-line text input.
    Text,
    /// `<textarea>`
    Textarea,
    /// `<input type=hidden>`
    Hidden,
    /// `<input type=checkbox>`
    Checkbox,
    /// `<input type=radio>`
    Radio,
    /// `<select>`
    Select,
    /// `<input type=file>`
    File,
    /// `<input type=submit|image>` or a submit `<button>`.
    Submit,
    /// A control of the wrapped kind that is disabled. It never contributes
    /// to submission and refuses mutation.
    Disabled(Box<ControlKind>),
}

impl ControlKind {
    /// The kind with any [`ControlKind::Disabled`] wrapper removed.
    #[must_use]
    pub fn base(&self) -> &Self {
        match self {
            Self::Disabled(inner) => inner.base(),
            other => other,
        }
    }

    /// Returns true for [`ControlKind::Disabled`].
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }

    /// Controls whose value is free text.
    #[must_use]
    pub fn is_text_like(&self) -> bool {
        matches!(self.base(), Self::Text | Self::Textarea | Self::Hidden)
    }
}

/// One `<option>` of a select control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    /// [§ 4.10.10](https://html.spec.whatwg.org/multipage/form-elements.html#concept-option-value)
    /// "The value of an option element is the value of the value content
    /// attribute, if there is one, or, if there is not, the value of the
    /// element's text IDL attribute."
    pub value: String,
    /// Text content, whitespace collapsed.
    pub text: String,
    /// Current selectedness.
    pub selected: bool,
    /// The option or its `optgroup` is disabled.
    pub disabled: bool,
}

/// A file chosen for a file control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    /// File name sent in the `filename` parameter.
    pub filename: String,
    /// MIME type sent as the part's `Content-Type`.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl FileSelection {
    /// Default part type when nothing better is known.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";

    /// An in-memory file with the default content type.
    #[must_use]
    pub fn new(filename: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: Self::DEFAULT_CONTENT_TYPE.to_string(),
            data,
        }
    }

    /// Copy of this selection with a different content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Read `path` into memory. The content type is guessed from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::FileRead`] when the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| FormError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(guess_content_type)
            .unwrap_or(Self::DEFAULT_CONTENT_TYPE);
        Ok(Self::new(&filename, data).with_content_type(content_type))
    }
}

fn guess_content_type(extension: &str) -> Option<&'static str> {
    let ty = match extension.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(ty)
}

/// A single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub(crate) kind: ControlKind,
    pub(crate) name: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) node: NodeId,
    pub(crate) form: NodeId,
    pub(crate) input_type: String,
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) multiple: bool,
    pub(crate) options: Vec<SelectOption>,
    pub(crate) files: Vec<FileSelection>,
    pub(crate) formaction: Option<String>,
    pub(crate) formmethod: Option<String>,
    pub(crate) formenctype: Option<String>,
}

impl Control {
    /// The control's kind.
    #[must_use]
    pub const fn kind(&self) -> &ControlKind {
        &self.kind
    }

    /// The `name` attribute. Unnamed controls never submit anything.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The control's element in the document it was read from.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The owning `<form>` element.
    #[must_use]
    pub const fn form(&self) -> NodeId {
        self.form
    }

    /// Lowercased `type` of an `input`, or the tag name for `select`,
    /// `textarea` and `button`.
    #[must_use]
    pub fn input_type(&self) -> &str {
        &self.input_type
    }

    /// The current value: text for text-like controls, the `value`
    /// attribute for checkboxes, radios and submit controls.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checkedness of a checkbox or radio. Always false for other kinds.
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        self.checked
    }

    /// Returns true for a disabled control.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.kind.is_disabled()
    }

    /// Returns true for a `<select multiple>`.
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Options of a select control, in document order.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Values of the currently selected options.
    #[must_use]
    pub fn selected_values(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect()
    }

    /// Files chosen for a file control.
    #[must_use]
    pub fn files(&self) -> &[FileSelection] {
        &self.files
    }

    /// A label for error messages: the name, the id, or the element type.
    pub(crate) fn describe(&self) -> String {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .map_or_else(|| format!("<{}>", self.input_type), str::to_string)
    }

    /// Fails unless this control is enabled and of the `expected` kind.
    pub(crate) fn require(&self, expected: &[ControlKind], operation: &str) -> Result<()> {
        if self.kind.is_disabled() {
            return Err(FormError::InvalidControlState(format!(
                "`{}` is disabled",
                self.describe()
            )));
        }
        if !expected.contains(&self.kind) {
            return Err(FormError::InvalidControlState(format!(
                "cannot {operation} on `{}` ({})",
                self.describe(),
                self.input_type
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_base_kind() {
        let kind = ControlKind::Disabled(Box::new(ControlKind::Checkbox));
        assert_eq!(kind.base(), &ControlKind::Checkbox);
        assert!(kind.is_disabled());
        assert!(!ControlKind::Checkbox.is_disabled());
        assert!(ControlKind::Disabled(Box::new(ControlKind::Hidden)).is_text_like());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("PNG"), Some("image/png"));
        assert_eq!(guess_content_type("bin"), None);
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = FileSelection::from_path(Path::new("/nonexistent/sparrow/upload.txt"))
            .unwrap_err();
        assert!(matches!(err, FormError::FileRead { .. }));
    }
}
