use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use crate::error::LabelError;

/// Address to symbol-name table, built once and then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: HashMap<u64, String>,
}
::static_assertions::assert_impl_all!(LabelMap: Send, Sync);

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Address 0 is the "no value" marker and never has a label.
    pub fn resolve(&self, address: u64) -> Option<&str> {
        if address == 0 {
            return None;
        }
        self.labels.get(&address).map(String::as_str)
    }

    /// Sorted by address, for stable printing.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        let mut entries: Vec<(u64, &str)> = self
            .labels
            .iter()
            .map(|(address, name)| (*address, name.as_str()))
            .collect();
        entries.sort_unstable_by_key(|(address, _)| *address);
        entries.into_iter()
    }

    /// Parses `<address> <name>` lines. Addresses are hex with an optional `0x` prefix;
    /// blank lines and `#` comments are skipped.
    pub fn from_reader<R: Read>(input: R) -> Result<Self, LabelError> {
        let mut labels = HashMap::new();
        for (i, line) in BufReader::new(input).lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (address_text, name) = match line.split_once(char::is_whitespace) {
                Some((address, name)) if !name.trim().is_empty() => (address, name.trim()),
                _ => return Err(LabelError::MissingName { line: line_no }),
            };
            let digits = address_text
                .strip_prefix("0x")
                .or_else(|| address_text.strip_prefix("0X"))
                .unwrap_or(address_text);
            let address =
                u64::from_str_radix(digits, 16).map_err(|_| LabelError::InvalidAddress {
                    line: line_no,
                    text: address_text.to_string(),
                })?;
            if address == 0 {
                return Err(LabelError::ZeroAddress { line: line_no });
            }
            if labels.insert(address, name.to_string()).is_some() {
                return Err(LabelError::Duplicate {
                    line: line_no,
                    address,
                });
            }
        }
        ::tracing::debug!(count = labels.len(), "loaded labels");
        Ok(LabelMap { labels })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl FromIterator<(u64, String)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (u64, String)>>(iter: T) -> Self {
        LabelMap {
            labels: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(u64, &'a str)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (u64, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(address, name)| (address, name.to_string()))
            .collect()
    }
}

/// Lookup that tolerates a missing table.
pub fn resolve_label(address: u64, labels: Option<&LabelMap>) -> Option<&str> {
    labels.and_then(|labels| labels.resolve(address))
}
