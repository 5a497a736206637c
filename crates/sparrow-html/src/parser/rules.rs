//! Element categories used by the tree builder.
//!
//! [§ 13.2.4.2 The stack of open elements](https://html.spec.whatwg.org/multipage/parsing.html#the-stack-of-open-elements)

/// [§ 13.1.2 Elements](https://html.spec.whatwg.org/multipage/syntax.html#void-elements)
///
/// "Void elements: area, base, br, col, embed, hr, img, input, link, meta,
/// source, track, wbr". `param` and `keygen` are obsolete but still void.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content the tokenizer reads as RCDATA or RAWTEXT. They are
/// always pushed, even when written self-closing, so that the tokenizer's end
/// tag closes them.
pub const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "script", "style", "textarea", "title", "xmp",
];

/// Deepest the stack of open elements may grow. At the limit, a new element
/// replaces the current node on the stack and so becomes its sibling, which
/// keeps every scope scan bounded.
pub const MAX_OPEN_ELEMENTS: usize = 512;

/// Start tags that close an open `p` element in button scope.
///
/// [§ 13.2.6.4.7](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
/// "If the stack of open elements has a p element in button scope, then
/// close a p element."
pub const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p", "pre",
    "search", "section", "summary", "table", "ul", "xmp",
];

/// `h1` through `h6`.
pub const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// [§ 13.2.6.3 Closing elements that have implied end tags](https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags)
pub const IMPLIED_END_TAGS: &[&str] = &[
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
];

/// "has an element in scope"
pub const DEFAULT_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
];

/// "has an element in button scope"
pub const BUTTON_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template", "button",
];

/// "has an element in list item scope"
pub const LIST_ITEM_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template", "ol", "ul",
];

/// Definition-list variant of list item scope, so `dt`/`dd` do not reach
/// through a nested `dl`.
pub const DEFINITION_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template", "dl",
];

/// "has an element in table scope"
pub const TABLE_SCOPE: &[&str] = &["html", "table", "template"];

/// Scope used for `</table>` itself.
pub const DOCUMENT_SCOPE: &[&str] = &["html", "template"];

/// Table parts closed by a new row group.
pub const TABLE_SECTION_PARTS: &[&str] = &["td", "th", "tr", "thead", "tbody", "tfoot", "caption"];

/// Returns true if `name` is one of `list`.
#[must_use]
pub fn is_one_of(name: &str, list: &[&str]) -> bool {
    list.contains(&name)
}

/// The scope an end tag named `name` may reach across.
#[must_use]
pub fn end_tag_scope(name: &str) -> &'static [&'static str] {
    match name {
        "table" => DOCUMENT_SCOPE,
        "tbody" | "thead" | "tfoot" | "tr" | "td" | "th" | "caption" | "colgroup" => TABLE_SCOPE,
        "li" => LIST_ITEM_SCOPE,
        "dt" | "dd" => DEFINITION_SCOPE,
        "p" => BUTTON_SCOPE,
        _ => DEFAULT_SCOPE,
    }
}
