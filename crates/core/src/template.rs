//! Template placeholders, substitution maps, and section predicates.
//!
//! A placeholder is a `${identifier}` marker inside a command's raw
//! parameter text. Detection happens once, at command construction, via a
//! pattern test; the text is not parsed any deeper. Substitution at
//! render/stringify time is keyed by the **entire raw placeholder-bearing
//! text**, not by the identifier — a miss falls back to the literal text
//! unchanged, so an unbound placeholder stays visible as `${...}` in the
//! output.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::graphic::ImageAsset;

// ── Placeholder detection ───────────────────────────────────────────────

/// Extract the placeholder identifier from raw parameter text, if any.
///
/// Greedy: the identifier spans from the first `${` to the last `}`, and
/// must be at least one character long.
pub(crate) fn placeholder_id(text: &str) -> Option<&str> {
    let start = text.find("${")?;
    let end = text.rfind('}')?;
    (end > start + 2).then(|| &text[start + 2..end])
}

/// Whether raw parameter text contains a placeholder.
pub(crate) fn has_placeholder(text: &str) -> bool {
    placeholder_id(text).is_some()
}

/// Wrap an identifier in placeholder syntax (`id` → `${id}`).
fn placeholder_literal(id: &str) -> String {
    format!("${{{id}}}")
}

// ── Template field descriptors ──────────────────────────────────────────

/// The value kind a template field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Free-form text.
    Text,
    /// A numeric value (print quantity, print width).
    Number,
    /// An encoded graphic (`^GF` payload).
    Image,
}

/// One distinct placeholder discovered in a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateField {
    /// The placeholder identifier (the text between `${` and `}`).
    pub id: String,
    /// The expected value kind.
    pub kind: TemplateKind,
}

// ── Template values ─────────────────────────────────────────────────────

/// A value bound to a placeholder identifier.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    /// Text substitution.
    Text(String),
    /// Numeric substitution, rendered in decimal.
    Number(i64),
    /// An encoded image reference.
    Image(ImageAsset),
}

impl TemplateValue {
    /// String comparison used by section predicates. Image values never
    /// compare equal to anything.
    fn eq_str(&self, rhs: &str) -> bool {
        match self {
            TemplateValue::Text(s) => s == rhs,
            TemplateValue::Number(n) => n.to_string() == rhs,
            TemplateValue::Image(_) => false,
        }
    }
}

/// The flat key → value map supplied by the caller at render/stringify time.
///
/// Keys are placeholder identifiers (without the `${}` wrapper).
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    values: BTreeMap<String, TemplateValue>,
}

impl TemplateValues {
    /// Create an empty value map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a text value.
    pub fn set_text(&mut self, id: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(id.into(), TemplateValue::Text(value.into()));
        self
    }

    /// Bind a numeric value.
    pub fn set_number(&mut self, id: impl Into<String>, value: i64) -> &mut Self {
        self.values.insert(id.into(), TemplateValue::Number(value));
        self
    }

    /// Bind an image value.
    pub fn set_image(&mut self, id: impl Into<String>, asset: ImageAsset) -> &mut Self {
        self.values.insert(id.into(), TemplateValue::Image(asset));
        self
    }

    /// Look up a bound value by identifier.
    pub fn get(&self, id: &str) -> Option<&TemplateValue> {
        self.values.get(id)
    }

    /// Iterate over all bound values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ── Substitution maps ───────────────────────────────────────────────────

/// A registered image substitution: the content hash used for bitmap-cache
/// lookup plus the encoded payload for on-demand decoding and stringify.
#[derive(Debug, Clone)]
pub(crate) struct ImageRef {
    pub(crate) hash: u32,
    pub(crate) encoded: String,
}

/// Render/stringify-scoped substitution tables, keyed by placeholder
/// literal (`${id}`), i.e. by the entire raw text of a templated command.
#[derive(Debug, Default)]
pub(crate) struct Substitutions {
    text: BTreeMap<String, String>,
    images: BTreeMap<String, ImageRef>,
}

impl Substitutions {
    /// Build the substitution tables for a render pass: image values map to
    /// their content hash so the interpreter can resolve cached bitmaps.
    pub(crate) fn for_render(values: &TemplateValues) -> Self {
        let mut subs = Substitutions::default();
        for (id, value) in values.iter() {
            let literal = placeholder_literal(id);
            match value {
                TemplateValue::Text(s) => {
                    subs.text.insert(literal, s.clone());
                }
                TemplateValue::Number(n) => {
                    subs.text.insert(literal, n.to_string());
                }
                TemplateValue::Image(asset) => {
                    subs.images.insert(
                        literal,
                        ImageRef {
                            hash: asset.content_hash(),
                            encoded: asset.encoded().to_string(),
                        },
                    );
                }
            }
        }
        subs
    }

    /// Build the substitution tables for stringification: image values map
    /// to their encoded payload text.
    pub(crate) fn for_stringify(values: &TemplateValues) -> Self {
        let mut subs = Substitutions::default();
        for (id, value) in values.iter() {
            let literal = placeholder_literal(id);
            match value {
                TemplateValue::Text(s) => {
                    subs.text.insert(literal, s.clone());
                }
                TemplateValue::Number(n) => {
                    subs.text.insert(literal, n.to_string());
                }
                TemplateValue::Image(asset) => {
                    subs.text.insert(literal, asset.encoded().to_string());
                }
            }
        }
        subs
    }

    /// Resolve raw command text: exact-match lookup, literal fallback.
    pub(crate) fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.text.get(raw).map_or(raw, String::as_str)
    }

    /// Resolve a templated image command's raw text to its registration.
    pub(crate) fn image(&self, raw: &str) -> Option<&ImageRef> {
        self.images.get(raw)
    }
}

// ── Section predicates ──────────────────────────────────────────────────

/// A section predicate, evaluated against the externally supplied
/// key → value map.
///
/// Mini-language:
/// - `true` / `false` — constant match;
/// - `@name` — true iff `name` is bound;
/// - `@name=value` — string equality against the bound value;
/// - `!name` — true iff `name` is not bound.
///
/// Anything else logs a warning and always matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    op: ExprOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExprOp {
    Always,
    Never,
    Present(String),
    Absent(String),
    Equals(String, String),
}

impl Expression {
    /// Parse a predicate source string. Never fails: an unparseable
    /// predicate degrades to always-match.
    pub fn parse(src: &str) -> Self {
        let (lhs, rhs) = match src.split_once('=') {
            Some((l, r)) => (l.trim(), Some(r.trim())),
            None => (src.trim(), None),
        };
        let op = if lhs == "true" {
            ExprOp::Always
        } else if lhs == "false" {
            ExprOp::Never
        } else if let Some(name) = lhs.strip_prefix('@') {
            match rhs {
                Some(value) if !value.is_empty() => {
                    ExprOp::Equals(name.to_string(), value.to_string())
                }
                _ => ExprOp::Present(name.to_string()),
            }
        } else if let Some(name) = lhs.strip_prefix('!') {
            ExprOp::Absent(name.to_string())
        } else {
            warn!(predicate = src, "expression couldn't be parsed");
            ExprOp::Always
        };
        Expression { op }
    }

    /// Evaluate the predicate against the supplied values.
    pub fn matches(&self, values: &TemplateValues) -> bool {
        match &self.op {
            ExprOp::Always => true,
            ExprOp::Never => false,
            ExprOp::Present(name) => values.get(name).is_some(),
            ExprOp::Absent(name) => values.get(name).is_none(),
            ExprOp::Equals(name, rhs) => values.get(name).is_some_and(|v| v.eq_str(rhs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Placeholder detection ───────────────────────────────────────────

    #[test]
    fn detects_placeholder() {
        assert_eq!(placeholder_id("${name}"), Some("name"));
        assert_eq!(placeholder_id("prefix ${name} suffix"), Some("name"));
        assert!(has_placeholder("1,2,${w}"));
    }

    #[test]
    fn rejects_empty_or_unclosed() {
        assert_eq!(placeholder_id("${}"), None);
        assert_eq!(placeholder_id("${open"), None);
        assert_eq!(placeholder_id("plain"), None);
        assert_eq!(placeholder_id("$name}"), None);
    }

    #[test]
    fn greedy_to_last_brace() {
        // Matches the construction-time pattern test: first `${`, last `}`.
        assert_eq!(placeholder_id("${a},${b}"), Some("a},${b"));
    }

    // ── Substitution lookup ─────────────────────────────────────────────

    #[test]
    fn resolve_is_keyed_by_entire_raw_text() {
        let mut values = TemplateValues::new();
        values.set_text("name", "Acme");
        let subs = Substitutions::for_render(&values);
        assert_eq!(subs.resolve("${name}"), "Acme");
        // The identifier alone is not a key.
        assert_eq!(subs.resolve("name"), "name");
        // Extra text around the placeholder misses and falls back.
        assert_eq!(subs.resolve("x${name}y"), "x${name}y");
    }

    #[test]
    fn unbound_placeholder_falls_back_to_literal() {
        let subs = Substitutions::for_render(&TemplateValues::new());
        assert_eq!(subs.resolve("${missing}"), "${missing}");
    }

    #[test]
    fn numbers_substitute_in_decimal() {
        let mut values = TemplateValues::new();
        values.set_number("qty", 5);
        let subs = Substitutions::for_render(&values);
        assert_eq!(subs.resolve("${qty}"), "5");
    }

    #[test]
    fn stringify_maps_images_to_encoded_text() {
        let mut values = TemplateValues::new();
        values.set_image("logo", ImageAsset::new("A,8,8,1,ff:::::::"));
        let subs = Substitutions::for_stringify(&values);
        assert_eq!(subs.resolve("${logo}"), "A,8,8,1,ff:::::::");
        let render = Substitutions::for_render(&values);
        assert!(render.image("${logo}").is_some());
    }

    // ── Predicates ──────────────────────────────────────────────────────

    fn qty5() -> TemplateValues {
        let mut v = TemplateValues::new();
        v.set_text("qty", "5");
        v
    }

    #[test]
    fn literal_true_false() {
        assert!(Expression::parse("true").matches(&TemplateValues::new()));
        assert!(!Expression::parse("false").matches(&TemplateValues::new()));
    }

    #[test]
    fn presence_and_absence() {
        assert!(Expression::parse("@qty").matches(&qty5()));
        assert!(!Expression::parse("@qty").matches(&TemplateValues::new()));
        assert!(!Expression::parse("!qty").matches(&qty5()));
        assert!(Expression::parse("!qty").matches(&TemplateValues::new()));
    }

    #[test]
    fn equality_compares_strings() {
        let expr = Expression::parse("@qty=5");
        assert!(expr.matches(&qty5()));
        let mut four = TemplateValues::new();
        four.set_text("qty", "4");
        assert!(!expr.matches(&four));
        assert!(!expr.matches(&TemplateValues::new()));
    }

    #[test]
    fn equality_against_number_value() {
        let mut v = TemplateValues::new();
        v.set_number("qty", 5);
        assert!(Expression::parse("@qty=5").matches(&v));
    }

    #[test]
    fn unparseable_always_matches() {
        assert!(Expression::parse("banana?").matches(&TemplateValues::new()));
    }
}
