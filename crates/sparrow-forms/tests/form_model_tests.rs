//! Integration tests for reading and editing forms.

use sparrow_forms::{ControlId, ControlKind, FileSelection, FormError, FormModel};
use sparrow_html::HtmlTree;
use url::Url;

fn tree(html: &str) -> HtmlTree {
    HtmlTree::parse_str(html, Url::parse("http://example.com/app/page?x=1").unwrap())
}

fn first_form(html: &str) -> FormModel {
    FormModel::all(&tree(html)).into_iter().next().unwrap()
}

fn id_of(form: &FormModel, name: &str) -> ControlId {
    form.control_by_name(name).unwrap()
}

// ========== construction ==========

#[test]
fn test_from_element_rejects_non_form() {
    let tree = tree("<div id=d></div>");
    let div = tree.element_by_id("d").unwrap();
    assert_eq!(FormModel::from_element(&tree, div), Err(FormError::NotAForm));
}

#[test]
fn test_all_forms_in_document_order() {
    let forms = FormModel::all(&tree(
        "<form name=one></form><div><form id=two></form></div>",
    ));
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].name(), Some("one"));
    assert_eq!(forms[1].id(), Some("two"));
}

#[test]
fn test_form_attribute_reassociates_controls() {
    let tree = tree(
        "<form id=a><input name=in_a><input name=to_b form=b></form>\
         <form id=b><input name=in_b></form>\
         <input name=outside form=a><input name=orphan form=missing>",
    );
    let forms = FormModel::all(&tree);
    let names = |form: &FormModel| -> Vec<String> {
        form.controls()
            .iter()
            .filter_map(|c| c.name().map(str::to_string))
            .collect()
    };
    assert_eq!(names(&forms[0]), ["in_a", "outside"]);
    assert_eq!(names(&forms[1]), ["to_b", "in_b"]);
}

#[test]
fn test_datalist_options_are_not_controls() {
    let form = first_form(
        "<form><input name=q list=l><datalist id=l><input name=hidden_in_list>\
         <option value=x></datalist></form>",
    );
    assert_eq!(form.controls().len(), 1);
}

#[test]
fn test_action_defaults_to_document_url() {
    let form = first_form("<form action=''></form>");
    assert_eq!(form.action().unwrap().as_str(), "http://example.com/app/page?x=1");

    let form = first_form("<base href='http://other.example/base/'><form action=go></form>");
    assert_eq!(form.action().unwrap().as_str(), "http://other.example/base/go");
}

#[test]
fn test_invalid_action() {
    let form = first_form("<form action='http://[::1'></form>");
    assert!(matches!(form.action(), Err(FormError::InvalidAction(_))));
}

// ========== select ==========

#[test]
fn test_select_defaults_to_first_enabled_option() {
    let form = first_form(
        "<form><select name=s><option disabled>X<option>A<option>B</select></form>",
    );
    assert_eq!(form.get_field("s"), Ok(Some("A".to_string())));
}

#[test]
fn test_select_with_several_selected_keeps_last() {
    let form = first_form(
        "<form><select name=s><option selected>A<option selected>B</select></form>",
    );
    assert_eq!(form.get_field("s"), Ok(Some("B".to_string())));
}

#[test]
fn test_multiple_select_starts_empty() {
    let form = first_form(
        "<form><select name=s multiple><option>A<option>B</select></form>",
    );
    assert_eq!(form.get_field("s"), Ok(None));
}

#[test]
fn test_option_value_falls_back_to_text() {
    let form = first_form(
        "<form><select name=s><option value=v1>One<option>  Two\n words </select></form>",
    );
    let select = form.control(id_of(&form, "s")).unwrap();
    let values: Vec<_> = select.options().iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, ["v1", "Two words"]);
}

#[test]
fn test_select_option_exclusive_and_toggle() {
    let mut form = first_form(
        "<form><select name=s multiple><option>A<option>B<option disabled>C</select>\
         <select name=single><option>x<option>y</select></form>",
    );
    let s = id_of(&form, "s");
    form.select_option(s, "A", true).unwrap();
    form.select_option(s, "B", true).unwrap();
    assert_eq!(form.control(s).unwrap().selected_values(), ["A", "B"]);
    form.select_option(s, "A", true).unwrap();
    assert_eq!(form.control(s).unwrap().selected_values(), ["B"]);
    form.select_option(s, "A", false).unwrap();
    assert_eq!(form.control(s).unwrap().selected_values(), ["A"]);

    assert!(matches!(
        form.select_option(s, "C", true),
        Err(FormError::InvalidControlState(_))
    ));
    assert!(matches!(
        form.select_option(s, "Z", true),
        Err(FormError::NoSuchOption { .. })
    ));

    let single = id_of(&form, "single");
    form.select_option(single, "y", true).unwrap();
    assert_eq!(form.control(single).unwrap().selected_values(), ["y"]);
}

#[test]
fn test_set_selected() {
    let mut form = first_form(
        "<form><select name=s multiple><option>A<option>B<option>C</select>\
         <select name=one><option>x<option>y</select></form>",
    );
    let s = id_of(&form, "s");
    form.set_selected(s, &["A", "C"]).unwrap();
    assert_eq!(form.control(s).unwrap().selected_values(), ["A", "C"]);
    assert!(form.set_selected(s, &["A", "nope"]).is_err());
    assert_eq!(form.control(s).unwrap().selected_values(), ["A", "C"]);

    let one = id_of(&form, "one");
    assert!(matches!(
        form.set_selected(one, &["x", "y"]),
        Err(FormError::InvalidControlState(_))
    ));
}

// ========== radio and checkbox ==========

#[test]
fn test_radio_exclusivity() {
    let mut form = first_form(
        "<form><input type=radio name=r value=a checked><input type=radio name=r value=b>\
         <input type=radio name=other value=c checked></form>",
    );
    let b = ControlId(1);
    form.set_checked(b, true).unwrap();
    let checked: Vec<_> = form.controls().iter().map(|c| c.is_checked()).collect();
    assert_eq!(checked, [false, true, true]);
}

#[test]
fn test_radio_exclusivity_is_per_form() {
    let html = "<form><input type=radio name=r value=a checked></form>\
                <form><input type=radio name=r value=b checked></form>";
    let forms = FormModel::all(&tree(html));
    assert_eq!(forms[0].get_field("r"), Ok(Some("a".to_string())));
    assert_eq!(forms[1].get_field("r"), Ok(Some("b".to_string())));
}

#[test]
fn test_set_field_on_radio_group() {
    let mut form = first_form(
        "<form><input type=radio name=size value=s><input type=radio name=size value=m>\
         <input type=radio name=size value=l></form>",
    );
    assert_eq!(form.get_field("size"), Ok(None));
    form.set_field("size", "m").unwrap();
    assert_eq!(form.get_field("size"), Ok(Some("m".to_string())));
    form.set_field("size", "l").unwrap();
    assert_eq!(form.get_field("size"), Ok(Some("l".to_string())));
    assert!(matches!(
        form.set_field("size", "xl"),
        Err(FormError::NoSuchOption { .. })
    ));
}

#[test]
fn test_checkbox_refused_by_set_field() {
    let mut form = first_form("<form><input type=checkbox name=c value=yes></form>");
    assert!(matches!(
        form.set_field("c", "no"),
        Err(FormError::InvalidControlState(_))
    ));
    assert_eq!(form.get_field("c"), Ok(None));
    form.set_checked(id_of(&form, "c"), true).unwrap();
    assert_eq!(form.get_field("c"), Ok(Some("yes".to_string())));
}

#[test]
fn test_set_checked_wrong_kind() {
    let mut form = first_form("<form><input name=t></form>");
    assert!(matches!(
        form.set_checked(id_of(&form, "t"), true),
        Err(FormError::InvalidControlState(_))
    ));
}

// ========== text and lookup ==========

#[test]
fn test_set_field_text_and_textarea() {
    let mut form = first_form(
        "<form><input name=user value=old><textarea name=bio>\nfirst</textarea></form>",
    );
    assert_eq!(form.get_field("bio"), Ok(Some("first".to_string())));
    form.set_field("user", "new").unwrap();
    form.set_field("bio", "line1\nline2").unwrap();
    assert_eq!(form.get_field("user"), Ok(Some("new".to_string())));
    assert_eq!(form.get_field("bio"), Ok(Some("line1\nline2".to_string())));
}

#[test]
fn test_ambiguous_and_missing_names() {
    let mut form = first_form("<form><input name=dup><input name=dup></form>");
    assert_eq!(form.get_field("dup"), Err(FormError::Ambiguous("dup".to_string())));
    assert_eq!(
        form.set_field("nope", "x"),
        Err(FormError::NoSuchControl("nope".to_string()))
    );
}

#[test]
fn test_disabled_controls_refuse_mutation() {
    let mut form = first_form(
        "<form><input name=a disabled><select name=s disabled><option>x</select></form>",
    );
    let a = id_of(&form, "a");
    assert!(matches!(form.control(a).unwrap().kind(), ControlKind::Disabled(_)));
    assert!(matches!(
        form.set_value(a, "v"),
        Err(FormError::InvalidControlState(_))
    ));
    assert!(matches!(
        form.select_option(id_of(&form, "s"), "x", false),
        Err(FormError::InvalidControlState(_))
    ));
}

#[test]
fn test_unknown_control_id() {
    let mut form = first_form("<form><input name=a></form>");
    assert!(matches!(
        form.set_value(ControlId(9), "v"),
        Err(FormError::NoSuchControl(_))
    ));
}

#[test]
fn test_submitter_lookup() {
    let form = first_form(
        "<form><input type=submit value=Save><button name=del>Delete</button></form>",
    );
    assert_eq!(form.submitter_by_name("del"), Some(ControlId(1)));
    assert_eq!(form.submitter_by_name("Save"), Some(ControlId(0)));
    assert_eq!(form.submitters().count(), 2);
}

// ========== files ==========

#[test]
fn test_set_value_on_file_reads_path() {
    let dir = std::env::temp_dir().join(format!("sparrow-forms-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("notes.txt");
    std::fs::write(&path, b"hello file").unwrap();

    let mut form = first_form("<form><input type=file name=f></form>");
    let f = id_of(&form, "f");
    form.set_value(f, path.to_str().unwrap()).unwrap();
    let files = form.control(f).unwrap().files();
    assert_eq!(files[0].filename, "notes.txt");
    assert_eq!(files[0].content_type, "text/plain");
    assert_eq!(files[0].data, b"hello file");
    assert_eq!(form.get_field("f"), Ok(Some("notes.txt".to_string())));

    assert!(matches!(
        form.set_value(f, dir.join("missing.bin").to_str().unwrap()),
        Err(FormError::FileRead { .. })
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_set_file_requires_file_control() {
    let mut form = first_form("<form><input name=t><input type=file name=f></form>");
    let file = FileSelection::new("a.bin", vec![1, 2, 3]);
    assert!(form.set_file(id_of(&form, "t"), file.clone()).is_err());
    form.set_file(id_of(&form, "f"), file.clone()).unwrap();
    assert_eq!(form.control(id_of(&form, "f")).unwrap().files(), [file]);
}
