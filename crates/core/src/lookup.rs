//! Category code to value substitution

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Highest category code a table can hold
pub const MAX_CATEGORY: usize = u16::MAX as usize;

/// Dense mapping from raster category codes to substitute values.
///
/// Codes without an entry, and raw values that are not integral codes in
/// `0..=65535`, resolve to the table's default instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    values: Vec<Option<f64>>,
    default: f64,
}

impl LookupTable {
    /// Empty table; every code resolves to `default`
    pub fn new(default: f64) -> Self {
        Self {
            values: Vec::new(),
            default,
        }
    }

    /// Table from `(code, value)` pairs; later pairs override earlier ones
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u16, f64)>, default: f64) -> Self {
        let mut table = Self::new(default);
        for (code, value) in pairs {
            table.insert(code, value);
        }
        table
    }

    pub fn insert(&mut self, code: u16, value: f64) {
        let idx = code as usize;
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    /// Value for a category code, if the table has one
    pub fn get(&self, code: u16) -> Option<f64> {
        self.values.get(code as usize).copied().flatten()
    }

    /// Substitute for a raw raster value
    #[inline]
    pub fn resolve(&self, raw: f64) -> f64 {
        if raw.fract() != 0.0 || !(0.0..=MAX_CATEGORY as f64).contains(&raw) {
            return self.default;
        }
        self.get(raw as u16).unwrap_or(self.default)
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn set_default(&mut self, default: f64) {
        self.default = default;
    }

    /// Number of codes with an entry
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Parse table text: one `code value` pair per line, separated by
    /// whitespace or a comma. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str, default: f64, source: &Path) -> Result<Self> {
        let mut table = Self::new(default);

        for (i, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let err = |reason: String| Error::LookupTable {
                path: source.to_path_buf(),
                line: i + 1,
                reason,
            };

            let mut fields = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty());
            let (Some(code), Some(value)) = (fields.next(), fields.next()) else {
                return Err(err(format!("expected `code value`, found `{line}`")));
            };
            let code: u16 = code
                .parse()
                .map_err(|_| err(format!("`{code}` is not a category code in 0..=65535")))?;
            let value: f64 = value
                .parse()
                .map_err(|_| err(format!("`{value}` is not a number")))?;

            table.insert(code, value);
        }

        Ok(table)
    }

    /// Read a table file
    pub fn read(path: impl AsRef<Path>, default: f64) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::LookupTable {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        })?;
        let table = Self::parse(&text, default, path)?;
        debug!(path = %path.display(), entries = table.len(), "lookup table loaded");
        Ok(table)
    }
}
