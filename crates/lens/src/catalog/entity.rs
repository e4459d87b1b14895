//! The entity catalog: an immutable, in-memory index of canonical reference
//! records, loaded once from CSV.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CatalogLoadError;

/// One canonical reference row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// Short, ticker-like code. May be empty, in which case it is not indexed.
    pub code: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// What to do when two rows share a code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateCodePolicy {
    /// Fail the load.
    #[default]
    Reject,
    /// Keep the later row, logging a warning.
    LastWriteWins,
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    cik_str: Option<String>,
    symbol: Option<String>,
    name: Option<String>,
    slug: Option<String>,
    #[serde(default)]
    metadata_json: Option<String>,
}

impl CatalogRow {
    fn into_entity(self, row: usize) -> Result<Entity, CatalogLoadError> {
        let id = required(self.cik_str, row, "cik_str")?;
        let name = required(self.name, row, "name")?;
        let code = self.symbol.unwrap_or_default();
        let slug = self.slug.unwrap_or_default();

        let attributes = match self.metadata_json.as_deref().map(str::trim) {
            None | Some("") => serde_json::Map::new(),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| CatalogLoadError::InvalidMetadata { row, source: e })?,
        };

        Ok(Entity {
            id,
            code,
            name,
            slug,
            attributes,
        })
    }
}

// Empty CSV fields deserialize to `None`.
fn required(
    value: Option<String>,
    row: usize,
    field: &'static str,
) -> Result<String, CatalogLoadError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CatalogLoadError::MissingField { row, field }),
    }
}

const REQUIRED_COLUMNS: [&str; 4] = ["cik_str", "symbol", "name", "slug"];

/// Read-only views over the loaded entities.
#[derive(Debug)]
pub struct Catalog {
    entities: Vec<Entity>,
    by_code: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(
        path: P,
        policy: DuplicateCodePolicy,
    ) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| CatalogLoadError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let catalog = Self::from_reader(file, policy)?;
        debug!("Loaded {} entities from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        policy: DuplicateCodePolicy,
    ) -> Result<Self, CatalogLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if let Some(column) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|h| h.trim() == **column))
        {
            return Err(CatalogLoadError::MissingColumn { column: *column });
        }

        let mut entities = Vec::new();
        for (index, result) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let row = index + 1;
            entities.push(result?.into_entity(row)?);
        }

        Self::from_entities(entities, policy)
    }

    /// Builds the indexes. Rows are numbered from 1 in load order.
    pub fn from_entities(
        entities: Vec<Entity>,
        policy: DuplicateCodePolicy,
    ) -> Result<Self, CatalogLoadError> {
        let mut by_code: HashMap<String, usize> = HashMap::with_capacity(entities.len());
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(entities.len());

        for (index, entity) in entities.iter().enumerate() {
            if !entity.code.is_empty() {
                let key = entity.code.to_uppercase();
                if let Some(previous) = by_code.insert(key.clone(), index) {
                    match policy {
                        DuplicateCodePolicy::Reject => {
                            return Err(CatalogLoadError::DuplicateCode {
                                code: key,
                                first_row: previous + 1,
                                row: index + 1,
                            });
                        }
                        DuplicateCodePolicy::LastWriteWins => {
                            warn!(
                                "Duplicate code '{}' on rows {} and {}; keeping row {}",
                                key,
                                previous + 1,
                                index + 1,
                                index + 1
                            );
                        }
                    }
                }
            }

            if let Some(previous) = by_name.insert(entity.name.to_uppercase(), index) {
                warn!(
                    "Duplicate name '{}' on rows {} and {}; keeping row {}",
                    entity.name,
                    previous + 1,
                    index + 1,
                    index + 1
                );
            }
        }

        Ok(Self {
            entities,
            by_code,
            by_name,
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in load order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Looks up by code, ignoring case.
    pub fn by_code(&self, code: &str) -> Option<&Entity> {
        self.by_code
            .get(&code.to_uppercase())
            .map(|&i| &self.entities[i])
    }

    /// Looks up by exact display name, ignoring case.
    pub fn by_name(&self, name: &str) -> Option<&Entity> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|&i| &self.entities[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
cik_str,symbol,name,slug,metadata_json
320193,AAPL,Apple Inc.,apple,\"{\"\"sector\"\": \"\"Technology\"\"}\"
789019,MSFT,Microsoft Corporation,microsoft,
1652044,GOOGL,Alphabet Inc.,alphabet,{}
";

    #[test]
    fn test_load_builds_all_views() {
        let catalog = Catalog::from_reader(CSV.as_bytes(), DuplicateCodePolicy::Reject).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entities()[1].name, "Microsoft Corporation");
        assert_eq!(catalog.by_code("aapl").unwrap().id, "320193");
        assert_eq!(catalog.by_name("apple inc.").unwrap().slug, "apple");
        assert_eq!(
            catalog.by_code("AAPL").unwrap().attributes["sector"],
            serde_json::json!("Technology")
        );
        assert!(catalog.by_code("MSFT").unwrap().attributes.is_empty());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let csv = "cik_str,symbol,slug\n1,AAA,aaa\n";
        let err = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            CatalogLoadError::MissingColumn { column: "name" }
        ));
    }

    #[test]
    fn test_blank_id_is_missing() {
        let csv = "cik_str,symbol,name,slug\n1,AAA,Alpha,alpha\n ,BBB,Beta,beta\n";
        let err = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            CatalogLoadError::MissingField {
                row: 2,
                field: "cik_str"
            }
        ));
    }

    #[test]
    fn test_short_row_is_missing_name() {
        let csv = "cik_str,symbol,name,slug\n1,AAA,Alpha,alpha\n2,BBB\n";
        let err = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            CatalogLoadError::MissingField {
                row: 2,
                field: "name"
            }
        ));
    }

    #[test]
    fn test_invalid_metadata_json() {
        let csv = "cik_str,symbol,name,slug,metadata_json\n1,AAA,Alpha,alpha,not-json\n";
        let err = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::Reject).unwrap_err();
        assert!(matches!(err, CatalogLoadError::InvalidMetadata { row: 1, .. }));
    }

    #[test]
    fn test_duplicate_code_rejected_by_default() {
        let csv = "cik_str,symbol,name,slug\n1,AAA,Alpha,alpha\n2,aaa,Alpha Two,alpha-two\n";
        let err = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::default()).unwrap_err();
        match err {
            CatalogLoadError::DuplicateCode {
                code,
                first_row,
                row,
            } => {
                assert_eq!(code, "AAA");
                assert_eq!(first_row, 1);
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_code_last_write_wins() {
        let csv = "cik_str,symbol,name,slug\n1,AAA,Alpha,alpha\n2,AAA,Alpha Two,alpha-two\n";
        let catalog =
            Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::LastWriteWins).unwrap();
        assert_eq!(catalog.by_code("AAA").unwrap().id, "2");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_empty_code_not_indexed() {
        let csv = "cik_str,symbol,name,slug\n1,,Alpha,alpha\n2,,Beta,beta\n";
        let catalog = Catalog::from_reader(csv.as_bytes(), DuplicateCodePolicy::Reject).unwrap();
        assert!(catalog.by_code("").is_none());
        assert_eq!(catalog.by_name("beta").unwrap().id, "2");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load("/nonexistent/catalog.csv", DuplicateCodePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, CatalogLoadError::ReadFile { .. }));
    }
}
