//! Ordered-source field resolution over JSON documents.

use serde_json::Value;

/// Resolves canonical fields from an ordered list of JSON sources.
///
/// Sources are consulted in order and, within a source, candidate paths in
/// order. The first present value wins. `null` and `""` count as absent.
#[derive(Debug, Clone)]
pub struct FieldResolver<'a> {
    sources: Vec<&'a Value>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(sources: Vec<&'a Value>) -> Self {
        Self { sources }
    }

    /// Every present value for the candidate paths, in precedence order.
    fn candidates(&self, paths: &[&str]) -> Vec<&'a Value> {
        let mut found = Vec::new();
        for &source in &self.sources {
            for path in paths {
                if let Some(value) = lookup(source, path).filter(|v| is_present(v)) {
                    found.push(value);
                }
            }
        }
        found
    }

    /// First present value for any of the candidate paths.
    pub fn resolve(&self, paths: &[&str]) -> Option<&'a Value> {
        self.candidates(paths).into_iter().next()
    }

    /// Alias of [`resolve`](Self::resolve) returning an owned value.
    pub fn value(&self, paths: &[&str]) -> Option<Value> {
        self.resolve(paths).cloned()
    }

    /// First present value rendered as a string. Numbers and booleans are
    /// stringified; objects and arrays are skipped.
    pub fn string(&self, paths: &[&str]) -> Option<String> {
        self.candidates(paths).into_iter().find_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// First present value usable as an integer (number or numeric string).
    pub fn integer(&self, paths: &[&str]) -> Option<i64> {
        self.candidates(paths).into_iter().find_map(|value| match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// First present array, or an empty list.
    pub fn list(&self, paths: &[&str]) -> Vec<Value> {
        self.candidates(paths)
            .into_iter()
            .find_map(|value| value.as_array().cloned())
            .unwrap_or_default()
    }
}

/// Follow a dotted path (`location.file`) through nested objects.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
