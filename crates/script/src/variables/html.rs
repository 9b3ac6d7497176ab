//! HTML document variable type.
//!
//! A scanning extractor over page source: anchors become links, `img` tags
//! become images, `frame`/`iframe` tags become frames, `script`/`link`
//! sources become associated files, and everything outside markup becomes
//! the document text. The scan is tolerant of attribute order, quoting
//! style, and case.

use super::{
    assign_type_error, invalid_invocation, MethodSignature, Variable, VariableValue,
    TYPE_BOOLEAN, TYPE_STRING, TYPE_STRING_ARRAY,
};
use crate::error::ScriptResult;

/// A parsed HTML page.
#[derive(Debug, Default)]
pub struct HtmlDocumentVariable {
    source: String,
    links: Vec<String>,
    images: Vec<String>,
    frames: Vec<String>,
    associated_files: Vec<String>,
    text: String,
}

impl HtmlDocumentVariable {
    fn parse(&mut self, source: &str) -> bool {
        self.source = source.to_string();
        self.links.clear();
        self.images.clear();
        self.frames.clear();
        self.associated_files.clear();
        self.text.clear();

        let mut rest = source;
        let mut text = String::new();
        while let Some(open) = rest.find('<') {
            text.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];
            let Some(close) = after_open.find('>') else {
                // Unterminated tag: the document is malformed.
                return false;
            };
            let tag = &after_open[..close];
            self.collect_tag(tag);
            rest = &after_open[close + 1..];
        }
        text.push_str(rest);
        self.text = collapse_whitespace(&text);
        true
    }

    fn collect_tag(&mut self, tag: &str) {
        let tag = tag.trim_start_matches('/');
        let mut parts = tag.split_whitespace();
        let Some(name) = parts.next() else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "a" | "area" => {
                if let Some(target) = attribute_value(tag, "href") {
                    self.links.push(target);
                }
            }
            "img" => {
                if let Some(target) = attribute_value(tag, "src") {
                    self.images.push(target);
                }
            }
            "frame" | "iframe" => {
                if let Some(target) = attribute_value(tag, "src") {
                    self.frames.push(target);
                }
            }
            "script" => {
                if let Some(target) = attribute_value(tag, "src") {
                    self.associated_files.push(target);
                }
            }
            "link" => {
                if let Some(target) = attribute_value(tag, "href") {
                    self.associated_files.push(target);
                }
            }
            _ => {}
        }
    }
}

/// Extracts an attribute value from inside a tag, handling single, double,
/// and missing quotes.
fn attribute_value(tag: &str, attribute: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let mut search_from = 0;
    loop {
        let found = lower[search_from..].find(attribute)?;
        let start = search_from + found;
        // Must be a standalone attribute name followed by '='.
        let before_ok = start == 0
            || !lower.as_bytes()[start - 1].is_ascii_alphanumeric();
        let after = &tag[start + attribute.len()..];
        let after_trimmed = after.trim_start();
        if before_ok && after_trimmed.starts_with('=') {
            let value = after_trimmed[1..].trim_start();
            return Some(if let Some(stripped) = value.strip_prefix('"') {
                stripped
                    .split('"')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            } else if let Some(stripped) = value.strip_prefix('\'') {
                stripped
                    .split('\'')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            } else {
                value
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string()
            });
        }
        search_from = start + attribute.len();
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const METHODS: &[MethodSignature] = &[
    MethodSignature {
        name: "parse",
        argument_types: &[TYPE_STRING],
        return_type: Some(TYPE_BOOLEAN),
    },
    MethodSignature {
        name: "getlinks",
        argument_types: &[],
        return_type: Some(TYPE_STRING_ARRAY),
    },
    MethodSignature {
        name: "getimages",
        argument_types: &[],
        return_type: Some(TYPE_STRING_ARRAY),
    },
    MethodSignature {
        name: "getframes",
        argument_types: &[],
        return_type: Some(TYPE_STRING_ARRAY),
    },
    MethodSignature {
        name: "getassociatedfiles",
        argument_types: &[],
        return_type: Some(TYPE_STRING_ARRAY),
    },
    MethodSignature {
        name: "gettext",
        argument_types: &[],
        return_type: Some(TYPE_STRING),
    },
];

const PARSE: usize = 0;
const GET_LINKS: usize = 1;
const GET_IMAGES: usize = 2;
const GET_FRAMES: usize = 3;
const GET_ASSOCIATED_FILES: usize = 4;
const GET_TEXT: usize = 5;

impl Variable for HtmlDocumentVariable {
    fn type_name(&self) -> &'static str {
        "htmldocument"
    }

    fn method_table(&self) -> &'static [MethodSignature] {
        METHODS
    }

    fn assign(&mut self, value: &VariableValue) -> ScriptResult<()> {
        Err(assign_type_error("htmldocument", value))
    }

    fn invoke(
        &mut self,
        method_index: usize,
        arguments: &[VariableValue],
    ) -> ScriptResult<VariableValue> {
        let result = match method_index {
            PARSE => VariableValue::Boolean(self.parse(&arguments[0].display_string())),
            GET_LINKS => VariableValue::TextArray(self.links.clone()),
            GET_IMAGES => VariableValue::TextArray(self.images.clone()),
            GET_FRAMES => VariableValue::TextArray(self.frames.clone()),
            GET_ASSOCIATED_FILES => VariableValue::TextArray(self.associated_files.clone()),
            GET_TEXT => VariableValue::Text(self.text.clone()),
            other => return Err(invalid_invocation("htmldocument", other)),
        };
        Ok(result)
    }

    fn value_string(&self) -> String {
        format!(
            "htmldocument ({} links, {} images, {} frames)",
            self.links.len(),
            self.images.len(),
            self.frames.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
<head>
  <title>Index</title>
  <link rel="stylesheet" href="/style.css">
  <script src="/app.js"></script>
</head>
<body>
  <h1>Welcome</h1>
  <a href="/first.html">First</a>
  <A HREF='/second.html'>Second</A>
  <img src=/logo.png alt="logo">
  <iframe src="/embedded.html"></iframe>
  Plain   text here.
</body>
</html>"#;

    fn parsed() -> HtmlDocumentVariable {
        let mut document = HtmlDocumentVariable::default();
        let result = document
            .invoke(PARSE, &[VariableValue::Text(PAGE.into())])
            .unwrap();
        assert_eq!(result, VariableValue::Boolean(true));
        document
    }

    #[test]
    fn test_links_extraction() {
        let mut document = parsed();
        assert_eq!(
            document.invoke(GET_LINKS, &[]).unwrap(),
            VariableValue::TextArray(vec!["/first.html".into(), "/second.html".into()])
        );
    }

    #[test]
    fn test_images_and_frames() {
        let mut document = parsed();
        assert_eq!(
            document.invoke(GET_IMAGES, &[]).unwrap(),
            VariableValue::TextArray(vec!["/logo.png".into()])
        );
        assert_eq!(
            document.invoke(GET_FRAMES, &[]).unwrap(),
            VariableValue::TextArray(vec!["/embedded.html".into()])
        );
    }

    #[test]
    fn test_associated_files() {
        let mut document = parsed();
        assert_eq!(
            document.invoke(GET_ASSOCIATED_FILES, &[]).unwrap(),
            VariableValue::TextArray(vec!["/style.css".into(), "/app.js".into()])
        );
    }

    #[test]
    fn test_text_is_collapsed() {
        let mut document = parsed();
        let VariableValue::Text(text) = document.invoke(GET_TEXT, &[]).unwrap() else {
            panic!("gettext did not return text");
        };
        assert!(text.contains("Welcome"));
        assert!(text.contains("Plain text here."));
        assert!(!text.contains("<"));
    }

    #[test]
    fn test_unterminated_tag_fails() {
        let mut document = HtmlDocumentVariable::default();
        assert_eq!(
            document
                .invoke(PARSE, &[VariableValue::Text("<a href=\"x".into())])
                .unwrap(),
            VariableValue::Boolean(false)
        );
    }
}
