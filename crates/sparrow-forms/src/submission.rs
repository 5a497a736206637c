//! Turning a [`FormModel`] into a [`Request`].

use sparrow_common::{Method, Request};
use tracing::debug;

use crate::control::{Control, ControlId, ControlKind, FileSelection};
use crate::encoding::{
    Enctype, FormEntry, FormValue, Multipart, normalize_newlines, text_plain, urlencoded,
};
use crate::error::{FormError, Result};
use crate::model::{FormModel, parse_method};

impl FormModel {
    /// [§ 4.10.21.4 Constructing the entry list](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#constructing-the-form-data-set)
    ///
    /// The entries a submission would send, in document order. `submitter`
    /// is the submit control treated as activated; other submit controls
    /// contribute nothing.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`] for an unknown submitter and
    /// [`FormError::InvalidControlState`] when it is not an enabled submit
    /// control.
    pub fn form_data(&self, submitter: Option<ControlId>) -> Result<Vec<FormEntry>> {
        if let Some(id) = submitter {
            self.control(id)
                .ok_or_else(|| FormError::NoSuchControl(id.to_string()))?
                .require(&[ControlKind::Submit], "submit the form")?;
        }

        let mut entries = Vec::new();
        for (index, control) in self.controls.iter().enumerate() {
            match &control.kind {
                // STEP 5.1: "The field element is disabled." Skip.
                ControlKind::Disabled(_) => continue,
                ControlKind::Submit => {
                    if submitter == Some(ControlId(index)) {
                        push_submitter(&mut entries, control);
                    }
                    continue;
                }
                _ => {}
            }
            // STEP 5.3: "If the field element is not an input element whose
            // type attribute is in the Image Button state, and either the
            // field element does not have a name attribute specified, or its
            // name attribute's value is the empty string, then continue."
            let Some(name) = control.name.as_deref() else {
                continue;
            };
            match &control.kind {
                ControlKind::Checkbox | ControlKind::Radio => {
                    if control.checked {
                        entries.push(FormEntry::text(name, &control.value));
                    }
                }
                ControlKind::Select => {
                    for option in control.options.iter().filter(|o| o.selected && !o.disabled) {
                        entries.push(FormEntry::text(name, &option.value));
                    }
                }
                // "If there are no selected files, then create an entry with
                // name and a new File object with an empty name,
                // application/octet-stream as type, and an empty body"
                ControlKind::File => {
                    if control.files.is_empty() {
                        entries.push(FormEntry::file(name, FileSelection::new("", Vec::new())));
                    }
                    for file in &control.files {
                        entries.push(FormEntry::file(name, file.clone()));
                    }
                }
                // "If the field element is an input element whose type
                // attribute is in the Hidden state and name is an ASCII
                // case-insensitive match for "_charset_"": the value is the
                // submission encoding's name.
                ControlKind::Hidden if name.eq_ignore_ascii_case("_charset_") => {
                    entries.push(FormEntry::text(name, &self.charset.to_string()));
                }
                ControlKind::Text | ControlKind::Textarea | ControlKind::Hidden => {
                    entries.push(FormEntry::text(name, &control.value));
                }
                ControlKind::Disabled(_) | ControlKind::Submit => {}
            }
        }

        for entry in &mut entries {
            entry.name = normalize_newlines(&entry.name);
            if let FormValue::Text(value) = &mut entry.value {
                *value = normalize_newlines(value);
            }
        }
        Ok(entries)
    }

    /// [§ 4.10.21.3 Form submission algorithm](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#form-submission-algorithm)
    ///
    /// Build the request submitting this form. The submitter's
    /// `formaction`, `formmethod` and `formenctype` take precedence over the
    /// form's own attributes.
    ///
    /// - GET replaces the action URL's query with the urlencoded entries.
    /// - POST sends them in the body, encoded per the enctype.
    ///
    /// Names and values are encoded in [`FormModel::charset`].
    ///
    /// # Errors
    ///
    /// As [`FormModel::form_data`], plus [`FormError::InvalidAction`] when
    /// the action cannot be resolved.
    pub fn build_request(&self, submitter: Option<ControlId>) -> Result<Request> {
        let entries = self.form_data(submitter)?;
        let submitter = submitter.and_then(|id| self.control(id));

        let action = submitter
            .and_then(|s| s.formaction.as_deref())
            .or(self.action.as_deref());
        let mut url = self.resolve_action(action)?;
        let method = submitter
            .and_then(|s| s.formmethod.as_deref())
            .map_or(self.method, |value| parse_method(Some(value)));
        let enctype = submitter
            .and_then(|s| s.formenctype.as_deref())
            .map_or(self.enctype, Enctype::from_attribute);

        let request = match (method, enctype) {
            // "Mutate action URL": "Set parsed action's query component to
            // query."
            (Method::Get, _) => {
                url.set_query(Some(&urlencoded(&entries, self.charset)));
                Request::get(url)
            }
            (Method::Post, Enctype::UrlEncoded) => Request::post(
                url,
                &enctype.to_string(),
                urlencoded(&entries, self.charset).into_bytes(),
            ),
            (Method::Post, Enctype::Multipart) => {
                let multipart = Multipart::encode(&entries, self.charset);
                Request::post(url, &multipart.content_type(), multipart.body)
            }
            (Method::Post, Enctype::TextPlain) => {
                Request::post(url, &enctype.to_string(), text_plain(&entries, self.charset))
            }
        };

        debug!(
            %request,
            entries = entries.len(),
            %enctype,
            charset = %self.charset,
            "built form submission"
        );
        Ok(request)
    }
}

/// "If the field element is an input element whose type attribute is in the
/// Image Button state": append `name.x` and `name.y` (or `x` and `y`) with
/// the click coordinates, here always the origin.
fn push_submitter(entries: &mut Vec<FormEntry>, control: &Control) {
    let name = control.name.as_deref();
    if control.input_type == "image" {
        let prefix = name.map_or_else(String::new, |n| format!("{n}."));
        entries.push(FormEntry::text(&format!("{prefix}x"), "0"));
        entries.push(FormEntry::text(&format!("{prefix}y"), "0"));
    } else if let Some(name) = name {
        entries.push(FormEntry::text(name, &control.value));
    }
}
