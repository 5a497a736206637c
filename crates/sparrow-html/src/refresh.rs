//! `Refresh` header and `<meta http-equiv="refresh">` parsing.
//!
//! [§ 4.2.5.3 Pragma directives](https://html.spec.whatwg.org/multipage/semantics.html#shared-declarative-refresh-steps)

/// A parsed refresh declaration: wait `delay` seconds, then load `url`
/// (the current document again if absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refresh {
    /// Whole seconds to wait.
    pub delay: u64,
    /// Target, not yet resolved against any base.
    pub url: Option<String>,
}

/// [Shared declarative refresh steps](https://html.spec.whatwg.org/multipage/semantics.html#shared-declarative-refresh-steps)
///
/// Accepts `5`, `0; url=/next`, `0;URL='/next'` and `0, /next`. Returns
/// `None` when no leading number is present.
#[must_use]
pub fn parse_refresh(input: &str) -> Option<Refresh> {
    // STEP 2: "Skip ASCII whitespace within input given position."
    let input = input.trim_start_matches(|c: char| c.is_ascii_whitespace());

    // STEP 4: "Collect a sequence of code points that are ASCII digits"
    let digits_end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    // STEP 5: "If timeString is the empty string, then: If the code point in
    // input pointed to by position is not U+002E (.), then return."
    if digits_end == 0 && !input.starts_with('.') {
        return None;
    }
    let delay = input[..digits_end].parse().unwrap_or(0);

    // STEP 7: "Collect a sequence of code points that are ASCII digits and
    // U+002E FULL STOP characters (.)" and ignore them.
    let rest = input[digits_end..].trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');

    // STEP 9-10: skip whitespace, then one `;` or `,`, then whitespace.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let rest = rest
        .strip_prefix(';')
        .or_else(|| rest.strip_prefix(','))
        .unwrap_or(rest)
        .trim_start_matches(|c: char| c.is_ascii_whitespace());
    if rest.is_empty() {
        return Some(Refresh { delay, url: None });
    }

    // STEP 11: optional "URL" then "=".
    let mut url = rest;
    if url.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("url")) {
        let after = url[3..].trim_start_matches(|c: char| c.is_ascii_whitespace());
        if let Some(after_eq) = after.strip_prefix('=') {
            url = after_eq.trim_start_matches(|c: char| c.is_ascii_whitespace());
        }
    }

    // STEP 12: a matching quote ends the URL.
    let url = match url.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &url[1..];
            inner.find(quote).map_or(inner, |end| &inner[..end])
        }
        _ => url.trim_end_matches(|c: char| c.is_ascii_whitespace()),
    };

    Some(Refresh {
        delay,
        url: (!url.is_empty()).then(|| url.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_only() {
        assert_eq!(
            parse_refresh(" 5 "),
            Some(Refresh {
                delay: 5,
                url: None
            })
        );
    }

    #[test]
    fn test_url_forms() {
        for input in ["0; url=/next", "0;URL = '/next'", "0, /next", "0.5; url=\"/next\" "] {
            let refresh = parse_refresh(input).unwrap();
            assert_eq!(refresh.url.as_deref(), Some("/next"), "{input}");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_refresh("url=/next"), None);
        assert_eq!(parse_refresh(""), None);
    }
}
