//! Reading a `<form>` out of a document and editing its controls.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use sparrow_common::Method;
use sparrow_dom::{DomTree, NodeId};
use sparrow_html::{Charset, HtmlTree};
use tracing::debug;
use url::Url;

use crate::control::{Control, ControlId, ControlKind, FileSelection, SelectOption};
use crate::encoding::Enctype;
use crate::error::{FormError, Result};

/// A form and its controls, detached from the document it was read from.
///
/// Mutations only touch this model. Build a request with
/// [`FormModel::build_request`] to submit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormModel {
    pub(crate) node: NodeId,
    pub(crate) name: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) action: Option<String>,
    pub(crate) method: Method,
    pub(crate) enctype: Enctype,
    pub(crate) charset: Charset,
    pub(crate) document_url: Url,
    pub(crate) base_url: Url,
    pub(crate) controls: Vec<Control>,
}

impl FormModel {
    /// Read the form at `form` and every control it owns.
    ///
    /// [§ 4.10.17.3 Association of controls and forms](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#association-of-controls-and-forms)
    ///
    /// A control belongs to its nearest `<form>` ancestor unless a `form`
    /// attribute names another form by id.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::NotAForm`] if `form` is not a `<form>` element.
    pub fn from_element(tree: &HtmlTree, form: NodeId) -> Result<Self> {
        let dom = tree.dom();
        let element = dom
            .element(form)
            .filter(|e| e.is("form"))
            .ok_or(FormError::NotAForm)?;

        let controls: Vec<Control> = dom
            .find_all("*")
            .filter(|&node| dom.closest_ancestor(node, "datalist").is_none())
            .filter(|&node| form_owner(tree, node) == Some(form))
            .filter_map(|node| read_control(dom, node, form))
            .collect();

        let mut model = Self {
            node: form,
            name: element.attr("name").map(str::to_string),
            id: element.id().map(str::to_string),
            action: element.attr("action").map(str::to_string),
            method: parse_method(element.attr("method")),
            enctype: element
                .attr("enctype")
                .map_or_else(Enctype::default, Enctype::from_attribute),
            charset: pick_charset(element.attr("accept-charset"), tree.charset()),
            document_url: tree.url().clone(),
            base_url: tree.base_url(),
            controls,
        };
        model.settle_radio_groups();

        debug!(
            form = ?model.name,
            method = %model.method,
            enctype = %model.enctype,
            charset = %model.charset,
            controls = model.controls.len(),
            "read form"
        );
        Ok(model)
    }

    /// Every form in `tree`, in document order.
    #[must_use]
    pub fn all(tree: &HtmlTree) -> Vec<Self> {
        tree.find_all("form")
            .filter_map(|node| Self::from_element(tree, node).ok())
            .collect()
    }

    /// The `<form>` element.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The form's `name` attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The form's `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Submission method. Anything but `post` means GET.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Encoding of a POST body.
    #[must_use]
    pub const fn enctype(&self) -> Enctype {
        self.enctype
    }

    /// The encoding names and values are submitted in.
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// [§ 4.10.21.3 Form submission algorithm](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#form-submission-algorithm)
    ///
    /// "If action is the empty string, let action be the URL of the form
    /// document." Otherwise the action is resolved against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidAction`] when the action does not parse.
    pub fn action(&self) -> Result<Url> {
        self.resolve_action(self.action.as_deref())
    }

    pub(crate) fn resolve_action(&self, action: Option<&str>) -> Result<Url> {
        let action = action.map_or("", str::trim);
        if action.is_empty() {
            return Ok(self.document_url.clone());
        }
        sparrow_common::urls::resolve_url(action, &self.base_url)
            .map_err(|_| FormError::InvalidAction(action.to_string()))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// All controls in document order.
    #[must_use]
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// The control at `id`.
    #[must_use]
    pub fn control(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(id.0)
    }

    /// The first control named `name`.
    #[must_use]
    pub fn control_by_name(&self, name: &str) -> Option<ControlId> {
        self.position(|c| c.name() == Some(name))
    }

    /// The control whose `id` attribute is `id`.
    #[must_use]
    pub fn control_by_id(&self, id: &str) -> Option<ControlId> {
        self.position(|c| c.id() == Some(id))
    }

    /// The first submit control named `name`, or with `name` as its value
    /// (the label of an `<input type=submit>`).
    #[must_use]
    pub fn submitter_by_name(&self, name: &str) -> Option<ControlId> {
        let is_submit = |c: &Control| c.kind.base() == &ControlKind::Submit;
        self.position(|c| is_submit(c) && c.name() == Some(name))
            .or_else(|| self.position(|c| is_submit(c) && c.value() == name))
    }

    /// Submit controls in document order.
    pub fn submitters(&self) -> impl Iterator<Item = ControlId> + '_ {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.base() == &ControlKind::Submit)
            .map(|(index, _)| ControlId(index))
    }

    fn position(&self, predicate: impl Fn(&Control) -> bool) -> Option<ControlId> {
        self.controls.iter().position(predicate).map(ControlId)
    }

    fn control_mut(&mut self, id: ControlId) -> Result<&mut Control> {
        self.controls
            .get_mut(id.0)
            .ok_or_else(|| FormError::NoSuchControl(id.to_string()))
    }

    /// Non-submit controls named `name`.
    fn fields_named(&self, name: &str) -> Vec<ControlId> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.base() != &ControlKind::Submit && c.name() == Some(name))
            .map(|(index, _)| ControlId(index))
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Replace the value of a text, textarea or hidden control. For a file
    /// control `value` is a path, read immediately.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`], [`FormError::InvalidControlState`] for a
    /// disabled control or one without a free-text value, and
    /// [`FormError::FileRead`] when a file path cannot be read.
    pub fn set_value(&mut self, id: ControlId, value: &str) -> Result<()> {
        let control = self.control_mut(id)?;
        if control.kind == ControlKind::File {
            control.files = vec![FileSelection::from_path(Path::new(value))?];
            return Ok(());
        }
        control.require(
            &[ControlKind::Text, ControlKind::Textarea, ControlKind::Hidden],
            "set the value",
        )?;
        control.value = value.to_string();
        Ok(())
    }

    /// Choose an in-memory file for a file control, replacing any earlier
    /// choice.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`], or [`FormError::InvalidControlState`]
    /// unless the control is an enabled file control.
    pub fn set_file(&mut self, id: ControlId, file: FileSelection) -> Result<()> {
        let control = self.control_mut(id)?;
        control.require(&[ControlKind::File], "choose a file")?;
        control.files = vec![file];
        Ok(())
    }

    /// Check or uncheck a checkbox or radio button. Checking a radio
    /// unchecks the others of its group.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`], or [`FormError::InvalidControlState`]
    /// unless the control is an enabled checkbox or radio.
    pub fn set_checked(&mut self, id: ControlId, checked: bool) -> Result<()> {
        let control = self.control_mut(id)?;
        control.require(&[ControlKind::Checkbox, ControlKind::Radio], "set checkedness")?;
        control.checked = checked;

        // [§ 4.10.5.1.16](https://html.spec.whatwg.org/multipage/input.html#radio-button-state-(type=radio))
        // "When any of the following phenomena occur, if the element's
        // checkedness state is true after the occurrence, the checkedness
        // state of all the other elements in the same radio button group
        // must be set to false"
        if checked && control.kind == ControlKind::Radio {
            let group = control.name.clone();
            if let Some(group) = group {
                for (index, other) in self.controls.iter_mut().enumerate() {
                    if index != id.0
                        && other.kind.base() == &ControlKind::Radio
                        && other.name.as_deref() == Some(group.as_str())
                    {
                        other.checked = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Select the option whose value is `value`.
    ///
    /// For a `<select multiple>` with `multi` set, the option's selectedness
    /// is toggled and other options are left alone. Otherwise the option
    /// becomes the only selected one.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`], [`FormError::NoSuchOption`], or
    /// [`FormError::InvalidControlState`] for a disabled select, a disabled
    /// option, or a control that is not a select.
    pub fn select_option(&mut self, id: ControlId, value: &str, multi: bool) -> Result<()> {
        let control = self.control_mut(id)?;
        control.require(&[ControlKind::Select], "select an option")?;
        let index = option_index(control, value)?;

        if control.multiple && multi {
            let option = &mut control.options[index];
            option.selected = !option.selected;
        } else {
            for (i, option) in control.options.iter_mut().enumerate() {
                option.selected = i == index;
            }
        }
        Ok(())
    }

    /// Select exactly the options whose values are in `values`.
    ///
    /// # Errors
    ///
    /// As [`FormModel::select_option`], plus
    /// [`FormError::InvalidControlState`] when several values are given for
    /// a single select. Nothing changes on error.
    pub fn set_selected(&mut self, id: ControlId, values: &[&str]) -> Result<()> {
        let control = self.control_mut(id)?;
        control.require(&[ControlKind::Select], "select options")?;
        if !control.multiple && values.len() > 1 {
            return Err(FormError::InvalidControlState(format!(
                "`{}` is not a multiple select",
                control.describe()
            )));
        }
        for value in values {
            let _ = option_index(control, value)?;
        }
        for option in &mut control.options {
            option.selected = values.contains(&option.value.as_str());
        }
        Ok(())
    }

    /// Enable or disable a control.
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`].
    pub fn set_enabled(&mut self, id: ControlId, enabled: bool) -> Result<()> {
        let control = self.control_mut(id)?;
        let base = control.kind.base().clone();
        control.kind = if enabled {
            base
        } else {
            ControlKind::Disabled(Box::new(base))
        };
        Ok(())
    }

    /// The value of the field called `name`.
    ///
    /// - a radio group yields the checked button's value, `None` if none is
    ///   checked
    /// - a select yields its selected option's value, `None` if none is
    ///   selected
    /// - a checkbox yields its value when checked
    /// - a file control yields the chosen file name
    /// - text-like controls yield their value
    ///
    /// # Errors
    ///
    /// [`FormError::NoSuchControl`] when nothing is named `name`, and
    /// [`FormError::Ambiguous`] when the name is shared by controls that are
    /// not one radio group, or when several options or radios are selected.
    pub fn get_field(&self, name: &str) -> Result<Option<String>> {
        let ids = self.fields_named(name);
        let controls: Vec<&Control> = ids.iter().map(|id| &self.controls[id.0]).collect();

        match controls.as_slice() {
            [] => Err(FormError::NoSuchControl(name.to_string())),
            [control] => match control.kind.base() {
                ControlKind::Select => match control.selected_values().as_slice() {
                    [] => Ok(None),
                    [value] => Ok(Some((*value).to_string())),
                    _ => Err(FormError::Ambiguous(name.to_string())),
                },
                ControlKind::Checkbox | ControlKind::Radio => {
                    Ok(control.checked.then(|| control.value.clone()))
                }
                ControlKind::File => Ok(control.files.first().map(|f| f.filename.clone())),
                _ => Ok(Some(control.value.clone())),
            },
            many => {
                if many.iter().any(|c| c.kind.base() != &ControlKind::Radio) {
                    return Err(FormError::Ambiguous(name.to_string()));
                }
                let checked: Vec<&&Control> = many.iter().filter(|c| c.checked).collect();
                match checked.as_slice() {
                    [] => Ok(None),
                    [radio] => Ok(Some(radio.value.clone())),
                    _ => Err(FormError::Ambiguous(name.to_string())),
                }
            }
        }
    }

    /// Set the field called `name` to `value`: check the radio with that
    /// value, select the option with that value, or replace the text.
    ///
    /// # Errors
    ///
    /// As [`FormModel::get_field`] for the lookup,
    /// [`FormError::NoSuchOption`] when no radio or option has `value`, and
    /// [`FormError::InvalidControlState`] for checkboxes and disabled
    /// controls.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        let ids = self.fields_named(name);
        match ids.as_slice() {
            [] => Err(FormError::NoSuchControl(name.to_string())),
            [id] => match self.controls[id.0].kind.base().clone() {
                ControlKind::Select => self.select_option(*id, value, false),
                ControlKind::Radio => self.check_radio_with_value(name, &ids, value),
                ControlKind::Checkbox => Err(FormError::InvalidControlState(format!(
                    "`{name}` is a checkbox; use set_checked"
                ))),
                _ => self.set_value(*id, value),
            },
            many => {
                if many
                    .iter()
                    .any(|id| self.controls[id.0].kind.base() != &ControlKind::Radio)
                {
                    return Err(FormError::Ambiguous(name.to_string()));
                }
                self.check_radio_with_value(name, many, value)
            }
        }
    }

    fn check_radio_with_value(&mut self, name: &str, group: &[ControlId], value: &str) -> Result<()> {
        let target = group
            .iter()
            .copied()
            .find(|id| self.controls[id.0].value == value)
            .ok_or_else(|| FormError::NoSuchOption {
                control: name.to_string(),
                value: value.to_string(),
            })?;
        self.set_checked(target, true)
    }

    /// Within each radio group at most one button may start checked; the
    /// last one in document order wins.
    fn settle_radio_groups(&mut self) {
        let mut seen = HashSet::new();
        for control in self.controls.iter_mut().rev() {
            if control.kind.base() != &ControlKind::Radio || !control.checked {
                continue;
            }
            if let Some(name) = control.name.clone()
                && !seen.insert(name)
            {
                control.checked = false;
            }
        }
    }
}

fn option_index(control: &Control, value: &str) -> Result<usize> {
    let index = control
        .options
        .iter()
        .position(|o| o.value == value)
        .ok_or_else(|| FormError::NoSuchOption {
            control: control.describe(),
            value: value.to_string(),
        })?;
    if control.options[index].disabled {
        return Err(FormError::InvalidControlState(format!(
            "option `{value}` of `{}` is disabled",
            control.describe()
        )));
    }
    Ok(index)
}

/// [§ 4.10.18.6](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#attr-fs-method)
/// "The method attribute's invalid value default and missing value default
/// are both the GET state."
pub(crate) fn parse_method(value: Option<&str>) -> Method {
    value
        .and_then(|v| Method::from_str(v.trim()).ok())
        .unwrap_or_default()
}

/// [§ 4.10.21.3](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#picking-an-encoding-for-the-form)
/// Picking an encoding for the form.
///
/// The first `accept-charset` token naming a supported encoding, UTF-8 if
/// the attribute names none, the document's encoding without the
/// attribute. Always an output encoding.
fn pick_charset(accept_charset: Option<&str>, document: Charset) -> Charset {
    let charset = match accept_charset {
        Some(labels) => labels
            .split_ascii_whitespace()
            .find_map(Charset::from_label)
            .unwrap_or(Charset::Utf8),
        None => document,
    };
    charset.output()
}

/// [§ 4.10.17.3](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#reset-the-form-owner)
///
/// "If element has a form content attribute ... associate element with the
/// first element in tree order ... whose ID is equal to the value of
/// element's form content attribute, if it is a form element. Otherwise, if
/// element has an ancestor form element, then associate element with the
/// nearest such ancestor form element."
fn form_owner(tree: &HtmlTree, node: NodeId) -> Option<NodeId> {
    let dom = tree.dom();
    match dom.attr(node, "form") {
        Some(id) => tree
            .element_by_id(id)
            .filter(|&f| dom.tag_name(f) == Some("form")),
        None => dom.closest_ancestor(node, "form"),
    }
}

/// [§ 4.10.18.5 Enabling and disabling form controls](https://html.spec.whatwg.org/multipage/form-control-infrastructure.html#concept-fe-disabled)
///
/// "A form control is disabled if ... the element is a descendant of a
/// fieldset element whose disabled attribute is specified, and is not a
/// descendant of that fieldset element's first legend element child, if
/// any."
fn in_disabled_fieldset(dom: &DomTree, node: NodeId) -> bool {
    dom.ancestors(node).any(|ancestor| {
        let Some(fieldset) = dom.element(ancestor) else {
            return false;
        };
        if !fieldset.is("fieldset") || !fieldset.has_attr("disabled") {
            return false;
        }
        let first_legend = dom
            .children(ancestor)
            .iter()
            .copied()
            .find(|&child| dom.tag_name(child) == Some("legend"));
        !first_legend.is_some_and(|legend| dom.is_descendant_of(node, legend))
    })
}

/// Turn a listed element into a control. Returns `None` for elements that
/// are not submittable controls.
fn read_control(dom: &DomTree, node: NodeId, form: NodeId) -> Option<Control> {
    let element = dom.element(node)?;
    let attr_lower = |name: &str| element.attr(name).map(|v| v.trim().to_ascii_lowercase());

    let (kind, input_type) = match element.tag_name.as_str() {
        "input" => {
            let ty = attr_lower("type").unwrap_or_else(|| "text".to_string());
            let kind = match ty.as_str() {
                "hidden" => ControlKind::Hidden,
                "checkbox" => ControlKind::Checkbox,
                "radio" => ControlKind::Radio,
                "file" => ControlKind::File,
                "submit" | "image" => ControlKind::Submit,
                "reset" | "button" => return None,
                _ => ControlKind::Text,
            };
            (kind, ty)
        }
        "textarea" => (ControlKind::Textarea, "textarea".to_string()),
        "select" => (ControlKind::Select, "select".to_string()),
        // "The missing value default and invalid value default are the
        // Submit Button state."
        "button" => match attr_lower("type").as_deref() {
            Some("reset" | "button") => return None,
            _ => (ControlKind::Submit, "button".to_string()),
        },
        _ => return None,
    };

    let value = match kind {
        ControlKind::Textarea => dom.text_content(node),
        ControlKind::Checkbox | ControlKind::Radio => {
            element.attr("value").unwrap_or("on").to_string()
        }
        _ => element.attr("value").unwrap_or_default().to_string(),
    };
    let multiple = element.has_attr("multiple");
    let options = if kind == ControlKind::Select {
        read_options(dom, node, multiple)
    } else {
        Vec::new()
    };
    let disabled = element.has_attr("disabled") || in_disabled_fieldset(dom, node);

    Some(Control {
        checked: matches!(kind, ControlKind::Checkbox | ControlKind::Radio)
            && element.has_attr("checked"),
        kind: if disabled {
            ControlKind::Disabled(Box::new(kind))
        } else {
            kind
        },
        name: element
            .attr("name")
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        id: element.id().map(str::to_string),
        node,
        form,
        input_type,
        value,
        multiple,
        options,
        files: Vec::new(),
        formaction: element.attr("formaction").map(str::to_string),
        formmethod: element.attr("formmethod").map(str::to_string),
        formenctype: element.attr("formenctype").map(str::to_string),
    })
}

/// [§ 4.10.7 The select element](https://html.spec.whatwg.org/multipage/form-elements.html#selectedness-setting-algorithm)
///
/// "If nodes are inserted or nodes are removed ... If the select element's
/// multiple attribute is absent, and the element's display size is 1, and no
/// option elements in the select element's list of options have their
/// selectedness set to true, set the selectedness of the first option
/// element in the list of options in tree order that is not disabled, if
/// any, to true." With several selected, only the last keeps its
/// selectedness.
fn read_options(dom: &DomTree, select: NodeId, multiple: bool) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = dom
        .find_all_in(select, "option")
        .map(|node| {
            let text = dom
                .text_content(node)
                .split_ascii_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let in_disabled_group = dom
                .closest_ancestor(node, "optgroup")
                .filter(|&group| dom.is_descendant_of(group, select))
                .is_some_and(|group| dom.attr(group, "disabled").is_some());
            SelectOption {
                value: dom
                    .attr(node, "value")
                    .map_or_else(|| text.clone(), str::to_string),
                selected: dom.attr(node, "selected").is_some(),
                disabled: dom.attr(node, "disabled").is_some() || in_disabled_group,
                text,
            }
        })
        .collect();

    if !multiple {
        if let Some(last) = options.iter().rposition(|o| o.selected) {
            for (i, option) in options.iter_mut().enumerate() {
                option.selected = i == last;
            }
        } else if let Some(first) = options.iter_mut().find(|o| !o.disabled) {
            first.selected = true;
        }
    }
    options
}
