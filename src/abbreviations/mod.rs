use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Shorthand book names (`GEN`, `1JN`, ...) mapped to the text searched for
/// instead. Keys are stored uppercased.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    entries: HashMap<String, String>,
}

impl AbbreviationTable {
    /// Reads a two-column CSV file. A missing file yields an empty table.
    pub fn load(path: &Path) -> Self {
        match std::fs::File::open(path) {
            Ok(file) => {
                let table = Self::from_reader(file);
                log::info!(
                    "Loaded {} abbreviations from {}",
                    table.len(),
                    path.display()
                );
                table
            }
            Err(e) => {
                log::warn!("Could not open abbreviations {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping abbreviation row {}: {}", idx + 1, e);
                    continue;
                }
            };
            let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_uppercase(), value.trim().to_string());
        }

        Self { entries }
    }

    /// Looks up an already-uppercased token.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AbbreviationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| {
                let (key, value): (String, String) = (k.into(), v.into());
                (key.trim().to_uppercase(), value.trim().to_string())
            })
            .collect();
        Self { entries }
    }
}
