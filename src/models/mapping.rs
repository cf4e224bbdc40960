use thiserror::Error;

/// Errors raised while building a [`PrinterMapping`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Printer mapping contains an empty prefix (printer: {0})")]
    EmptyPrefix(String),

    #[error("Printer mapping contains no entries")]
    Empty,
}

/// A single `prefix -> printer` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    pub prefix: String,
    pub printer: String,
}

/// Ordered table mapping filename prefixes to printer names.
///
/// Rules are kept sorted longest-prefix-first, so the first rule that matches
/// a filename is also the most specific one. Two distinct prefixes of equal
/// length can never both match the same filename, which makes the lookup
/// deterministic regardless of the order the rules were declared in.
///
/// Prefixes are compared as case-sensitive literal string prefixes; no
/// wildcard or pattern syntax is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterMapping {
    rules: Vec<PrefixRule>,
}

impl PrinterMapping {
    /// Build a mapping from `(prefix, printer)` pairs.
    ///
    /// # Errors
    /// Returns [`MappingError::EmptyPrefix`] if any prefix is empty.
    pub fn new<I, P, N>(entries: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        let mut rules = Vec::new();
        for (prefix, printer) in entries {
            let prefix = prefix.into();
            let printer = printer.into();
            if prefix.is_empty() {
                return Err(MappingError::EmptyPrefix(printer));
            }
            rules.push(PrefixRule { prefix, printer });
        }

        // Stable sort keeps declaration order among equal lengths for diagnostics
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self { rules })
    }

    /// Resolve the printer for `filename`, see [`resolve`].
    pub fn resolve(&self, filename: &str) -> Option<&str> {
        resolve(filename, self)
    }

    /// Rules in match order (longest prefix first).
    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Map a filename to its target printer.
///
/// Returns the printer of the longest prefix that `filename` starts with, or
/// `None` when no prefix matches. Pure: performs no I/O.
pub fn resolve<'a>(filename: &str, mapping: &'a PrinterMapping) -> Option<&'a str> {
    mapping
        .rules
        .iter()
        .find(|rule| filename.starts_with(rule.prefix.as_str()))
        .map(|rule| rule.printer.as_str())
}
