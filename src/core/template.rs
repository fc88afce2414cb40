/// Text templates — resolution from the `output` tree and `{name}` substitution.
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::ConfigStore;
use crate::core::outcome::{Soft, SoftFailure};
use crate::schema::value::ConfigValue;

/// Root of the template tree inside the configuration.
const OUTPUT_ROOT: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("no value supplied for placeholder '{0}'")]
    MissingArgument(String),
    #[error("positional placeholder '{{{0}}}' has no value")]
    Positional(String),
    #[error("nested braces are not allowed")]
    NestedBrace,
    #[error("unclosed brace")]
    UnclosedBrace,
    #[error("unmatched closing brace")]
    UnmatchedClose,
    #[error("unknown conversion '!{0}'")]
    InvalidConversion(String),
    #[error("invalid format spec '{0}'")]
    InvalidSpec(String),
}

/// Substitute named values into `{name}` placeholders.
///
/// Syntax:
/// - `{name}` → the value supplied for `name`
/// - `{name!conv}` → `!s` leaves the value as is, `!r` and `!a` quote it
/// - `{name:spec}` → spec is `[[fill]align][0][width][.precision][s]` with
///   align one of `<` (default), `>`, `^`; a leading `0` pads with zeros
/// - `{{` / `}}` → literal braces
/// - `{}` or `{0}` → error, there are no positional values
pub fn format_template<K, V>(template: &str, values: &HashMap<K, V>) -> Result<String, FormatError>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(FormatError::UnmatchedClose),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(FormatError::NestedBrace),
                        Some(ch) => field.push(ch),
                        None => return Err(FormatError::UnclosedBrace),
                    }
                }
                let (head, spec) = match field.split_once(':') {
                    Some((head, spec)) => (head, Some(FormatSpec::parse(spec)?)),
                    None => (field.as_str(), None),
                };
                let (name, conversion) = match head.split_once('!') {
                    Some((name, conversion)) => (name, Some(conversion)),
                    None => (head, None),
                };
                if name.is_empty() || name.chars().all(|ch| ch.is_ascii_digit()) {
                    return Err(FormatError::Positional(name.to_string()));
                }
                let value = values
                    .get(name)
                    .ok_or_else(|| FormatError::MissingArgument(name.to_string()))?;
                let value = convert(value.as_ref(), conversion)?;
                match spec {
                    Some(spec) => spec.write(&value, &mut out),
                    None => out.push_str(&value),
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn convert<'a>(value: &'a str, conversion: Option<&str>) -> Result<Cow<'a, str>, FormatError> {
    match conversion {
        None | Some("s") => Ok(Cow::Borrowed(value)),
        Some("r") | Some("a") => Ok(Cow::Owned(format!("'{}'", value))),
        Some(other) => Err(FormatError::InvalidConversion(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        }
    }
}

/// Padding and truncation for one placeholder. Widths count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatSpec {
    fill: char,
    align: Align,
    width: usize,
    precision: Option<usize>,
}

impl FormatSpec {
    fn parse(spec: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::InvalidSpec(spec.to_string());
        let chars: Vec<char> = spec.chars().collect();
        let mut pos = 0;

        let (mut fill, mut align) = (None, None);
        if let Some(a) = chars.get(1).copied().and_then(Align::from_char) {
            fill = Some(chars[0]);
            align = Some(a);
            pos = 2;
        } else if let Some(a) = chars.first().copied().and_then(Align::from_char) {
            align = Some(a);
            pos = 1;
        }

        if chars.get(pos) == Some(&'0') {
            fill.get_or_insert('0');
            pos += 1;
        }
        let width = take_number(&chars, &mut pos).map_err(|_| invalid())?.unwrap_or(0);
        let precision = if chars.get(pos) == Some(&'.') {
            pos += 1;
            Some(take_number(&chars, &mut pos).map_err(|_| invalid())?.ok_or_else(invalid)?)
        } else {
            None
        };
        if chars.get(pos) == Some(&'s') {
            pos += 1;
        }
        if pos != chars.len() {
            return Err(invalid());
        }

        Ok(Self {
            fill: fill.unwrap_or(' '),
            align: align.unwrap_or(Align::Left),
            width,
            precision,
        })
    }

    fn write(&self, value: &str, out: &mut String) {
        let kept: Cow<'_, str> = match self.precision {
            Some(max) => Cow::Owned(value.chars().take(max).collect()),
            None => Cow::Borrowed(value),
        };
        let pad = self.width.saturating_sub(kept.chars().count());
        let (left, right) = match self.align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };
        out.extend(std::iter::repeat(self.fill).take(left));
        out.push_str(&kept);
        out.extend(std::iter::repeat(self.fill).take(right));
    }
}

/// Consume a run of ASCII digits starting at `pos`.
fn take_number(chars: &[char], pos: &mut usize) -> Result<Option<usize>, std::num::ParseIntError> {
    let start = *pos;
    while chars.get(*pos).map_or(false, |ch| ch.is_ascii_digit()) {
        *pos += 1;
    }
    if start == *pos {
        return Ok(None);
    }
    chars[start..*pos].iter().collect::<String>().parse().map(Some)
}

/// Looks up text templates under `output.<key>` and fills them in.
///
/// A missing or non-string template renders as the empty string; a template
/// whose placeholders cannot be filled renders verbatim.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    store: Arc<ConfigStore>,
}

impl TemplateResolver {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    /// The raw template text, if one is configured.
    pub fn template(&self, key: &str) -> Soft<String> {
        let full_key = format!("{}.{}", OUTPUT_ROOT, key);
        match self.store.lookup(&full_key) {
            Ok(ConfigValue::String(text)) => Soft::Clean(text),
            Ok(other) => Soft::degraded(
                String::new(),
                SoftFailure::TypeMismatch {
                    key: full_key,
                    expected: "string",
                    found: other.type_name(),
                },
            ),
            Err(reason) => Soft::degraded(String::new(), reason),
        }
    }

    pub fn render<K, V>(&self, key: &str, substitutions: &HashMap<K, V>) -> String
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        self.render_checked(key, substitutions).into_value()
    }

    pub fn render_checked<K, V>(&self, key: &str, substitutions: &HashMap<K, V>) -> Soft<String>
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        let template = match self.template(key) {
            Soft::Clean(text) => text,
            degraded => return degraded,
        };
        match format_template(&template, substitutions) {
            Ok(text) => Soft::Clean(text),
            Err(e) => Soft::degraded(
                template,
                SoftFailure::TemplateSubstitution {
                    key: key.to_string(),
                    detail: e.to_string(),
                },
            ),
        }
    }

    /// Render a template that takes no substitutions.
    pub fn render_plain(&self, key: &str) -> String {
        self.render(key, &HashMap::<&str, &str>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
        pairs.iter().copied().collect()
    }

    fn resolver(tree: serde_json::Value) -> TemplateResolver {
        TemplateResolver::new(Arc::new(ConfigStore::with_config(
            ConfigValue::Null,
            ConfigValue::from(tree),
        )))
    }

    #[test]
    fn format_named_placeholders() {
        let out = format_template(
            "{name} rolled {roll}.",
            &values(&[("name", "Harvey"), ("roll", "42")]),
        )
        .unwrap();
        assert_eq!(out, "Harvey rolled 42.");
    }

    #[test]
    fn format_escaped_braces_and_spec() {
        let out = format_template("{{x}} = {x:>3}", &values(&[("x", "7")])).unwrap();
        assert_eq!(out, "{x} =   7");
    }

    #[test]
    fn format_spec_width_fill_and_precision() {
        let v = values(&[("x", "7"), ("name", "Harvey")]);
        assert_eq!(format_template("[{x:3}]", &v).unwrap(), "[7  ]");
        assert_eq!(format_template("[{x:<3}]", &v).unwrap(), "[7  ]");
        assert_eq!(format_template("[{x:*^4}]", &v).unwrap(), "[*7**]");
        assert_eq!(format_template("[{x:03}]", &v).unwrap(), "[700]");
        assert_eq!(format_template("[{x:>03}]", &v).unwrap(), "[007]");
        assert_eq!(format_template("[{name:.3}]", &v).unwrap(), "[Har]");
        assert_eq!(format_template("[{name:>5.2s}]", &v).unwrap(), "[   Ha]");
        assert_eq!(format_template("[{name:2}]", &v).unwrap(), "[Harvey]");
        assert_eq!(format_template("[{x:}]", &v).unwrap(), "[7]");
    }

    #[test]
    fn format_conversions() {
        let v = values(&[("x", "7")]);
        assert_eq!(format_template("{x!s}", &v).unwrap(), "7");
        assert_eq!(format_template("{x!r:>5}", &v).unwrap(), "  '7'");
        assert_eq!(
            format_template("{x!q}", &v),
            Err(FormatError::InvalidConversion("q".to_string()))
        );
    }

    #[test]
    fn invalid_spec_renders_raw_template() {
        let v = values(&[("x", "7")]);
        assert_eq!(
            format_template("{x:d}", &v),
            Err(FormatError::InvalidSpec("d".to_string()))
        );
        assert!(matches!(format_template("{x:5.}", &v), Err(FormatError::InvalidSpec(_))));
        // Spec syntax is checked before the value is looked up.
        assert!(matches!(
            format_template("{missing:+}", &values(&[])),
            Err(FormatError::InvalidSpec(_))
        ));

        let r = resolver(json!({"output": {"row": "{x:,}"}}));
        assert_eq!(r.render("row", &v), "{x:,}");
    }

    #[test]
    fn format_errors() {
        let empty = values(&[]);
        assert_eq!(
            format_template("{who}", &empty),
            Err(FormatError::MissingArgument("who".to_string()))
        );
        assert!(matches!(format_template("{}", &empty), Err(FormatError::Positional(_))));
        assert!(matches!(format_template("{0}", &empty), Err(FormatError::Positional(_))));
        assert_eq!(format_template("a {b", &empty), Err(FormatError::UnclosedBrace));
        assert_eq!(format_template("a } b", &empty), Err(FormatError::UnmatchedClose));
        assert_eq!(format_template("{a{b}}", &empty), Err(FormatError::NestedBrace));
    }

    #[test]
    fn render_substitutes_values() {
        let r = resolver(json!({"output": {"dice": {"normal": "{name}: {result}"}}}));
        let out = r.render("dice.normal", &values(&[("name", "Ann"), ("result", "50")]));
        assert_eq!(out, "Ann: 50");
    }

    #[test]
    fn render_missing_key_is_empty() {
        let r = resolver(json!({"output": {}}));
        let soft = r.render_checked("no.such.key", &values(&[]));
        assert_eq!(soft.value(), "");
        assert!(matches!(soft.reason(), Some(SoftFailure::MissingKey { .. })));
    }

    #[test]
    fn render_non_string_is_empty() {
        let r = resolver(json!({"output": {"count": 3}}));
        assert_eq!(r.render_plain("count"), "");
    }

    #[test]
    fn render_under_supplied_returns_raw_template() {
        let r = resolver(json!({"output": {"greet": "Hello {name}"}}));
        let soft = r.render_checked("greet", &values(&[]));
        assert_eq!(soft.value(), "Hello {name}");
        assert!(matches!(
            soft.reason(),
            Some(SoftFailure::TemplateSubstitution { .. })
        ));
    }

    #[test]
    fn render_through_items_and_default() {
        let r = resolver(json!({
            "output": {"type": "object", "items": {
                "san": {"type": "object", "items": {
                    "check": {"type": "object", "items": {
                        "success": {"type": "string", "default": "ok"}
                    }}
                }}
            }}
        }));
        assert_eq!(r.render_plain("san.check.success"), "ok");
    }

    #[test]
    fn render_null_default_is_empty() {
        let r = resolver(json!({"output": {"greet": {"type": "string", "default": null}}}));
        let soft = r.render_checked("greet", &values(&[]));
        assert_eq!(soft.value(), "");
        assert!(matches!(soft.reason(), Some(SoftFailure::MissingKey { .. })));
    }

    #[test]
    fn render_uninitialized_is_empty() {
        let r = TemplateResolver::new(Arc::new(ConfigStore::new()));
        let soft = r.render_checked("san.check.success", &values(&[]));
        assert_eq!(soft.value(), "");
        assert_eq!(soft.reason(), Some(&SoftFailure::Uninitialized));
    }
}
