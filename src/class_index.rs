//! Mapping between class labels and their position in the model output.
//!
//! The file is written at training time with one `label: index` entry per line
//! and read once when the service starts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, LookupError};

#[derive(Debug, Clone)]
pub struct ClassIndexMap {
    // labels[i] is the label for output position i
    labels: Vec<String>,
    by_label: HashMap<String, usize>,
}

impl ClassIndexMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ClassIndexIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut by_label = HashMap::new();
        let mut by_index: HashMap<usize, String> = HashMap::new();

        for (n, raw) in text.lines().enumerate() {
            let line_no = n + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let malformed = || ConfigError::MalformedLine {
                line: line_no,
                content: raw.to_string(),
            };
            let (label, index) = line.rsplit_once(':').ok_or_else(malformed)?;
            let label = label.trim();
            if label.is_empty() {
                return Err(malformed());
            }
            let index: usize = index.trim().parse().map_err(|_| malformed())?;

            if by_label.contains_key(label) {
                return Err(ConfigError::DuplicateLabel {
                    line: line_no,
                    label: label.to_string(),
                });
            }
            if by_index.contains_key(&index) {
                return Err(ConfigError::DuplicateIndex {
                    line: line_no,
                    index,
                });
            }
            by_label.insert(label.to_string(), index);
            by_index.insert(index, label.to_string());
        }

        if by_index.is_empty() {
            return Err(ConfigError::EmptyClassIndex);
        }

        let len = by_index.len();
        let mut labels = Vec::with_capacity(len);
        for i in 0..len {
            let label = by_index
                .remove(&i)
                .ok_or(ConfigError::NonContiguous { len, missing: i })?;
            labels.push(label);
        }

        Ok(ClassIndexMap { labels, by_label })
    }

    pub fn label_for(&self, index: usize) -> Result<&str, LookupError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(LookupError {
                index,
                len: self.labels.len(),
            })
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in output order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
