//! `${VAR}` substitution in KiCad paths.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

/// Path variables available for substitution, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    vars: IndexMap<String, String>,
}

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{[^}]*\}").ok())
        .as_ref()
}

impl TemplateVars {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Returns the value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variables are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replaces `${NAME}` tokens in `path`, one variable at a time in
    /// insertion order.
    ///
    /// A value may itself contain a token for a later variable, which is
    /// then replaced too. Unknown tokens are left as they are.
    #[must_use]
    pub fn expand(&self, path: &str) -> String {
        let mut expanded = path.to_string();
        for (name, value) in self.iter() {
            if !expanded.contains("${") {
                break;
            }
            expanded = expanded.replace(&format!("${{{name}}}"), value);
        }

        if let Some(pattern) = token_pattern() {
            for token in pattern.find_iter(&expanded) {
                tracing::debug!(path, token = token.as_str(), "Unresolved path variable");
            }
        }
        expanded
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        vars.extend(iter);
        vars
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for TemplateVars {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tokens_unchanged() {
        let vars = TemplateVars::new();
        assert_eq!(vars.expand("/a/b/c.step"), "/a/b/c.step");
    }

    #[test]
    fn known_token_replaced() {
        let vars: TemplateVars = [("KICAD8_3DMODEL_DIR", "/usr/share/kicad/3dmodels")]
            .into_iter()
            .collect();
        assert_eq!(
            vars.expand("${KICAD8_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0603.wrl"),
            "/usr/share/kicad/3dmodels/Resistor_SMD.3dshapes/R_0603.wrl"
        );
    }

    #[test]
    fn unknown_token_left_verbatim() {
        let vars: TemplateVars = [("A", "x")].into_iter().collect();
        assert_eq!(vars.expand("${A}/${B}/${A}"), "x/${B}/x");
    }

    #[test]
    fn value_expanded_by_later_variable() {
        let vars: TemplateVars = [("A", "${B}/a"), ("B", "y")].into_iter().collect();
        assert_eq!(vars.expand("${A}"), "y/a");
    }

    #[test]
    fn value_not_expanded_by_earlier_variable() {
        let vars: TemplateVars = [("B", "y"), ("A", "${B}/a")].into_iter().collect();
        assert_eq!(vars.expand("${A}"), "${B}/a");
    }

    #[test]
    fn later_insert_overrides() {
        let mut vars = TemplateVars::new();
        vars.insert("A", "1");
        vars.insert("A", "2");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("A"), Some("2"));
    }
}
