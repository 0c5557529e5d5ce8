//! Field tag grammar.
//!
//! A tag is a comma-separated token list, for example
//! `"svc|svc-extra"`, `"omit"` or `"env=PG_DB,default=postgres,required"`.
//! Commas inside brackets, braces or quotes belong to the token, so
//! `"default=[a, b]"` is a single directive.

/// A parsed field tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Logical file names, in declaration order.
    pub names: Vec<String>,
    pub omit: bool,
    pub env: Option<String>,
    pub default: Option<String>,
    pub required: bool,
}

impl Tag {
    pub fn parse(raw: &str) -> Self {
        let mut tag = Tag::default();

        for token in tokens(raw) {
            match token {
                "omit" | "-" => tag.omit = true,
                "required" => tag.required = true,
                _ => match token.split_once('=') {
                    Some(("env", name)) => tag.env = Some(name.trim().to_string()),
                    Some(("default", value)) => tag.default = Some(value.to_string()),
                    Some(_) => {}
                    None => tag.names.extend(
                        token
                            .split('|')
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(String::from),
                    ),
                },
            }
        }
        tag
    }

    /// The loading directive for a toolbox field called `field_name`.
    pub fn directive(&self, field_name: &str) -> ConfigDirective {
        let names = if self.names.is_empty() {
            vec![field_name.to_string()]
        } else {
            self.names.clone()
        };
        ConfigDirective {
            names,
            omit: self.omit,
        }
    }

    /// Whether the tag carries any value directive.
    pub fn has_directives(&self) -> bool {
        self.env.is_some() || self.default.is_some() || self.required
    }
}

/// Splits on top-level commas only.
fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '{') => depth += 1,
            (None, ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);

    parts.into_iter().map(str::trim).filter(|t| !t.is_empty())
}

/// How the toolbox engine loads one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDirective {
    pub names: Vec<String>,
    pub omit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let tag = Tag::parse("svc|svc-extra");
        assert_eq!(tag.names, ["svc", "svc-extra"]);
        assert!(!tag.omit);
    }

    #[test]
    fn test_parse_omit() {
        assert!(Tag::parse("omit").omit);
        assert!(Tag::parse("-").omit);
    }

    #[test]
    fn test_parse_directives() {
        let tag = Tag::parse("env=PG_DB,default=postgres,required");
        assert_eq!(tag.env.as_deref(), Some("PG_DB"));
        assert_eq!(tag.default.as_deref(), Some("postgres"));
        assert!(tag.required);
        assert!(tag.names.is_empty());
        assert!(tag.has_directives());
    }

    #[test]
    fn test_default_sequence_and_mapping_fragments() {
        let tag = Tag::parse("default=[a, b],required");
        assert_eq!(tag.default.as_deref(), Some("[a, b]"));
        assert!(tag.required);
        assert!(tag.names.is_empty());

        let tag = Tag::parse("env=LIMITS, default={k: v, n: 1}");
        assert_eq!(tag.env.as_deref(), Some("LIMITS"));
        assert_eq!(tag.default.as_deref(), Some("{k: v, n: 1}"));
        assert!(tag.names.is_empty());
    }

    #[test]
    fn test_default_quoted_comma() {
        let tag = Tag::parse(r#"default="a, b",svc"#);
        assert_eq!(tag.default.as_deref(), Some(r#""a, b""#));
        assert_eq!(tag.names, ["svc"]);
    }

    #[test]
    fn test_default_keeps_equals_in_value() {
        let tag = Tag::parse("default=a=b");
        assert_eq!(tag.default.as_deref(), Some("a=b"));
    }

    #[test]
    fn test_unknown_key_value_is_ignored() {
        let tag = Tag::parse("svc,flavor=spicy");
        assert_eq!(tag, Tag::parse("svc"));
    }

    #[test]
    fn test_directive_defaults_to_field_name() {
        assert_eq!(Tag::parse("").directive("cache").names, ["cache"]);
        assert_eq!(
            Tag::parse("redis|memcache").directive("cache").names,
            ["redis", "memcache"]
        );
    }
}
