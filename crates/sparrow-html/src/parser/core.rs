use strum_macros::Display;
use tracing::trace;

use sparrow_dom::{Attributes, DomTree, ElementData, NodeId, NodeType};

use super::rules::{
    BUTTON_SCOPE, CLOSES_P, DEFAULT_SCOPE, DEFINITION_SCOPE, HEADINGS, IMPLIED_END_TAGS,
    LIST_ITEM_SCOPE, MAX_OPEN_ELEMENTS, RAW_TEXT_ELEMENTS, TABLE_SCOPE, TABLE_SECTION_PARTS,
    VOID_ELEMENTS, end_tag_scope, is_one_of,
};
use crate::tokenizer::{Attribute, Token};

/// [§ 13.2.4.1 The insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode)
///
/// "The insertion mode is a state variable that controls the primary operation
/// of the tree construction stage."
///
/// No `head`/`body` elements are synthesised, so the modes between "before
/// html" and "in body" collapse into these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InsertionMode {
    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    BeforeHtml,
    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    InBody,
}

/// [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
///
/// Builds a [`DomTree`] from a token stream. Never fails: every token
/// sequence produces a tree.
pub struct TreeBuilder {
    insertion_mode: InsertionMode,

    /// [§ 13.2.4.2 The stack of open elements](https://html.spec.whatwg.org/multipage/parsing.html#the-stack-of-open-elements)
    stack_of_open_elements: Vec<NodeId>,

    /// The document element, created on the first token that needs it.
    html_element: Option<NodeId>,

    /// "If the next token is a U+000A LINE FEED (LF) character token, then
    /// ignore that token and move on to the next one." Set after `pre`,
    /// `listing` and `textarea` start tags.
    ignore_next_line_feed: bool,

    tree: DomTree,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Create a tree builder with an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            insertion_mode: InsertionMode::BeforeHtml,
            stack_of_open_elements: Vec::new(),
            html_element: None,
            ignore_next_line_feed: false,
            tree: DomTree::new(),
        }
    }

    /// Feed every token and return the finished tree.
    ///
    /// The document always ends up with an `html` document element, even for
    /// empty input.
    #[must_use]
    pub fn build(mut self, tokens: Vec<Token>) -> DomTree {
        for token in tokens {
            if token.is_eof() {
                break;
            }
            self.process_token(token);
        }
        let _ = self.ensure_html_element(Attributes::new());
        trace!(nodes = self.tree.len(), "tree construction finished");
        self.tree
    }

    fn process_token(&mut self, token: Token) {
        let skip_line_feed = std::mem::take(&mut self.ignore_next_line_feed);
        match self.insertion_mode {
            InsertionMode::BeforeHtml => self.handle_before_html_mode(token),
            InsertionMode::InBody => {
                if skip_line_feed && token == (Token::Character { data: '\n' }) {
                    return;
                }
                self.handle_in_body_mode(token);
            }
        }
    }

    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    fn handle_before_html_mode(&mut self, token: Token) {
        match token {
            // "A DOCTYPE token - Parse error. Ignore the token."
            // "An end tag whose tag name is not one of "head", "body", "html",
            // "br" - Parse error. Ignore the token." All end tags are ignored
            // here; there is nothing open yet for them to close.
            Token::Doctype { .. } | Token::EndTag { .. } | Token::EndOfFile => {}
            // "A comment token - Insert a comment as the last child of the Document object."
            Token::Comment { data } => {
                let _ = self.tree.append(NodeId::ROOT, NodeType::Comment(data));
            }
            // "A character token that is ... ASCII whitespace - Ignore the token."
            Token::Character { data } if is_ascii_whitespace(data) => {}
            // "A start tag whose tag name is "html" - Create an element for the
            // token in the HTML namespace, with the Document as the intended
            // parent. Append it to the Document object. Put this element in
            // the stack of open elements."
            Token::StartTag {
                ref name,
                ref attributes,
                ..
            } if name == "html" => {
                let _ = self.ensure_html_element(collect_attributes(attributes));
                self.insertion_mode = InsertionMode::InBody;
            }
            // "Anything else - Create an html element whose node document is
            // the Document object. Append it to the Document object. Put this
            // element in the stack of open elements. Switch the insertion mode
            // to "before head", then reprocess the token."
            other => {
                let _ = self.ensure_html_element(Attributes::new());
                self.insertion_mode = InsertionMode::InBody;
                self.handle_in_body_mode(other);
            }
        }
    }

    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    fn handle_in_body_mode(&mut self, token: Token) {
        match token {
            Token::Character { data } => self.insert_character(data),
            Token::Comment { data } => {
                let parent = self.current_node();
                let _ = self.tree.append(parent, NodeType::Comment(data));
            }
            Token::Doctype { .. } | Token::EndOfFile => {}
            Token::StartTag {
                name,
                self_closing,
                attributes,
            } => self.handle_start_tag(&name, self_closing, &attributes),
            Token::EndTag { name } => self.handle_end_tag(&name),
        }
    }

    fn handle_start_tag(&mut self, name: &str, self_closing: bool, attributes: &[Attribute]) {
        // "A start tag whose tag name is "html" - Parse error. For each
        // attribute on the token, check to see if the attribute is already
        // present on the top element of the stack of open elements. If it is
        // not, add the attribute and its corresponding value to that element."
        if name == "html" {
            let html = self.ensure_html_element(Attributes::new());
            if let Some(element) = self.tree.element_mut(html) {
                for attr in attributes {
                    let _ = element.attrs.insert_if_absent(&attr.name, &attr.value);
                }
            }
            return;
        }

        if is_one_of(name, CLOSES_P) && self.has_element_in_scope("p", BUTTON_SCOPE) {
            self.close_element("p");
        }

        match name {
            // "A start tag whose tag name is "li" ... If node is an li element
            // ... Generate implied end tags, except for li elements. ... Pop
            // elements from the stack of open elements until an li element has
            // been popped from the stack."
            "li" => {
                if self.has_element_in_scope("li", LIST_ITEM_SCOPE) {
                    self.close_element("li");
                }
            }
            "dt" | "dd" => {
                for tag in ["dt", "dd"] {
                    if self.has_element_in_scope(tag, DEFINITION_SCOPE) {
                        self.close_element(tag);
                    }
                }
            }
            // "A start tag whose tag name is one of: "h1", ..., "h6" ... If
            // the current node is an HTML element whose tag name is one of
            // "h1", ..., "h6", then this is a parse error; pop the current
            // node off the stack of open elements."
            _ if is_one_of(name, HEADINGS) => {
                if self.current_node_is_one_of(HEADINGS) {
                    self.pop_current_node();
                }
            }
            // "A start tag whose tag name is "a" - If the list of active
            // formatting elements contains an a element ... act as if an end
            // tag with the tag name "a" had been seen"
            "a" => {
                if self.has_element_in_scope("a", DEFAULT_SCOPE) {
                    self.close_element("a");
                }
            }
            // "A start tag whose tag name is one of: "optgroup", "option" - If
            // the current node is an option element, then pop the current node
            // off the stack of open elements."
            "option" => {
                if self.current_node_is_one_of(&["option"]) {
                    self.pop_current_node();
                }
            }
            "optgroup" => {
                if self.current_node_is_one_of(&["option"]) {
                    self.pop_current_node();
                }
                if self.current_node_is_one_of(&["optgroup"]) {
                    self.pop_current_node();
                }
            }
            // [§ 13.2.6.4.16 "in select"](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect)
            // "A start tag whose tag name is "select" - Parse error. If the
            // stack of open elements does not have a select element in select
            // scope, ignore the token. Otherwise: Pop elements from the stack
            // of open elements until a select element has been popped."
            "select" => {
                if self.has_element_in_scope("select", DEFAULT_SCOPE) {
                    trace!("nested <select> closes the open one");
                    self.close_element("select");
                    return;
                }
            }
            // "A start tag whose tag name is one of: "input", "keygen",
            // "textarea" - Parse error. If the stack of open elements does not
            // have a select element in select scope, ignore the token.
            // Otherwise: Pop elements ... until a select element has been
            // popped ... Reprocess the token."
            "input" | "keygen" | "textarea" => {
                if self.has_element_in_scope("select", DEFAULT_SCOPE) {
                    self.close_element("select");
                }
            }
            // [§ 13.2.6.4.14 "in row"](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inrow)
            "td" | "th" => self.close_any_in_scope(&["td", "th"], TABLE_SCOPE),
            "tr" => self.close_any_in_scope(&["td", "th", "tr"], TABLE_SCOPE),
            "thead" | "tbody" | "tfoot" | "caption" | "colgroup" => {
                self.close_any_in_scope(TABLE_SECTION_PARTS, TABLE_SCOPE);
                if self.current_node_is_one_of(&["colgroup"]) {
                    self.pop_current_node();
                }
            }
            _ => {}
        }

        // "Insert an HTML element for the token. Immediately pop the current
        // node off the stack of open elements." (void elements)
        let pushes = !is_one_of(name, VOID_ELEMENTS)
            && (!self_closing || is_one_of(name, RAW_TEXT_ELEMENTS));
        if pushes && self.stack_of_open_elements.len() >= MAX_OPEN_ELEMENTS {
            trace!(tag = name, "nesting limit reached, inserting as a sibling");
            self.pop_current_node();
        }

        let element = self.insert_html_element(name, attributes);
        if pushes {
            self.stack_of_open_elements.push(element);
        }

        if matches!(name, "pre" | "listing" | "textarea") {
            self.ignore_next_line_feed = true;
        }
    }

    fn handle_end_tag(&mut self, name: &str) {
        match name {
            // The document element is never closed, and no body element is
            // implied, so these end tags carry no information.
            "html" | "body" => {}
            // "An end tag whose tag name is "br" - Parse error. Drop the
            // attributes from the token, and act as described in the next entry;
            // i.e. act as if this was a "br" start tag token with no
            // attributes"
            "br" => {
                let _ = self.insert_html_element("br", &[]);
            }
            _ => {
                let scope = end_tag_scope(name);
                if self.has_element_in_scope(name, scope) {
                    self.close_element(name);
                } else {
                    trace!(tag = name, "ignoring stray end tag");
                }
            }
        }
    }

    // =========================================================================
    // Stack of open elements
    // =========================================================================

    /// "The current node is the bottommost node in this stack of open
    /// elements." Before the html element exists, the Document.
    fn current_node(&self) -> NodeId {
        self.stack_of_open_elements
            .last()
            .copied()
            .unwrap_or(NodeId::ROOT)
    }

    fn current_node_is_one_of(&self, names: &[&str]) -> bool {
        self.tree
            .tag_name(self.current_node())
            .is_some_and(|tag| is_one_of(tag, names))
    }

    /// Pop the current node, never popping the html element.
    fn pop_current_node(&mut self) {
        if self.stack_of_open_elements.len() > 1 {
            let _ = self.stack_of_open_elements.pop();
        }
    }

    /// [§ 13.2.4.2 Has an element in the specific scope](https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-the-specific-scope)
    ///
    /// STEP 1: "Initialize node to be the current node."
    /// STEP 2: "If node is the target node, terminate in a match state."
    /// STEP 3: "Otherwise, if node is one of the element types in list,
    ///         terminate in a failure state."
    /// STEP 4: "Otherwise, set node to the previous entry in the stack of
    ///         open elements and return to step 2."
    fn has_element_in_scope(&self, target: &str, scope: &[&str]) -> bool {
        for &node in self.stack_of_open_elements.iter().rev() {
            let Some(tag) = self.tree.tag_name(node) else {
                continue;
            };
            if tag == target {
                return true;
            }
            if is_one_of(tag, scope) {
                return false;
            }
        }
        false
    }

    /// Generate implied end tags except for `name`, then pop elements until
    /// an element named `name` has been popped. Callers check scope first.
    fn close_element(&mut self, name: &str) {
        self.generate_implied_end_tags_excluding(name);
        while self.stack_of_open_elements.len() > 1 {
            let Some(node) = self.stack_of_open_elements.pop() else {
                break;
            };
            if self.tree.tag_name(node) == Some(name) {
                break;
            }
        }
    }

    /// Close the innermost of `names` that is in `scope`, repeatedly, until
    /// none remains.
    fn close_any_in_scope(&mut self, names: &[&str], scope: &[&str]) {
        while let Some(name) = names
            .iter()
            .copied()
            .find(|name| self.has_element_in_scope(name, scope))
        {
            self.close_element(name);
        }
    }

    /// [§ 13.2.6.3 Closing elements that have implied end tags](https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags)
    ///
    /// "while the current node is a dd element, a dt element, an li element,
    /// an optgroup element, an option element, a p element, ... the UA must
    /// pop the current node off the stack of open elements."
    fn generate_implied_end_tags_excluding(&mut self, exclude: &str) {
        while let Some(tag) = self.tree.tag_name(self.current_node()) {
            if tag == exclude || !is_one_of(tag, IMPLIED_END_TAGS) {
                break;
            }
            let _ = self.stack_of_open_elements.pop();
        }
    }

    // =========================================================================
    // Node insertion
    // =========================================================================

    /// Create the html element if it does not exist yet and return it.
    fn ensure_html_element(&mut self, attrs: Attributes) -> NodeId {
        if let Some(html) = self.html_element {
            return html;
        }
        let html = self
            .tree
            .append(NodeId::ROOT, NodeType::Element(ElementData::new("html", attrs)));
        self.stack_of_open_elements.push(html);
        self.html_element = Some(html);
        html
    }

    /// [§ 13.2.6.1 Insert an HTML element](https://html.spec.whatwg.org/multipage/parsing.html#insert-an-html-element)
    ///
    /// STEP 1: "Create an element for the token"
    /// STEP 2: "Append the new element to the node at the adjusted insertion
    ///         location."
    ///
    /// Pushing onto the stack of open elements is left to the caller.
    fn insert_html_element(&mut self, name: &str, attributes: &[Attribute]) -> NodeId {
        let parent = self.current_node();
        let data = ElementData::new(name, collect_attributes(attributes));
        self.tree.append(parent, NodeType::Element(data))
    }

    /// [§ 13.2.6.1 Insert a character](https://html.spec.whatwg.org/multipage/parsing.html#insert-a-character)
    fn insert_character(&mut self, c: char) {
        let parent = self.current_node();
        let mut buf = [0; 4];
        let _ = self.tree.append_text(parent, c.encode_utf8(&mut buf));
    }
}

/// Turn token attributes into an element's attribute list. Duplicates are
/// dropped, keeping the first.
fn collect_attributes(attributes: &[Attribute]) -> Attributes {
    let mut attrs = Attributes::new();
    for attr in attributes {
        if !attrs.insert_if_absent(&attr.name, &attr.value) {
            trace!(name = %attr.name, "duplicate attribute dropped");
        }
    }
    attrs
}

const fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}
