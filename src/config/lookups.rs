use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_unique_keys, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub account: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

/// Ordered key → label mapping. Unknown keys resolve to the empty label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl LookupTable {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        for (key, label) in pairs {
            let key = key.into();
            let label = label.into();
            match table.index.get(&key) {
                Some(&idx) => table.entries[idx].1 = label,
                None => {
                    table.index.insert(key.clone(), table.entries.len());
                    table.entries.push((key, label));
                }
            }
        }
        table
    }

    pub fn resolve(&self, key: &str) -> &str {
        self.index
            .get(key)
            .map(|&idx| self.entries[idx].1.as_str())
            .unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both hand-maintained mappings, in the shape they take in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookups {
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryEntry>,
    #[serde(default = "default_companies")]
    pub companies: Vec<Company>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies_file: Option<String>,
}

impl Default for Lookups {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            companies: default_companies(),
            categories_file: None,
            companies_file: None,
        }
    }
}

impl Lookups {
    pub fn category_table(&self) -> LookupTable {
        LookupTable::new(
            self.categories
                .iter()
                .map(|e| (e.account.clone(), e.label.clone())),
        )
    }

    pub fn company_ids(&self) -> Vec<i64> {
        self.companies.iter().map(|c| c.id).collect()
    }

    /// Override files must be CSV.
    pub fn validate_files(&self) -> Result<()> {
        let files: Vec<String> = self
            .categories_file
            .iter()
            .chain(self.companies_file.iter())
            .cloned()
            .collect();
        validate_file_extensions("lookups", &files, &["csv"])
    }

    /// Replaces inline tables with the contents of the configured CSV files.
    pub fn load_files(&mut self) -> Result<()> {
        self.validate_files()?;
        if let Some(path) = self.categories_file.clone() {
            self.categories = read_categories_csv(&path)?;
            tracing::info!(
                "📂 Loaded {} category mappings from {}",
                self.categories.len(),
                path
            );
        }
        if let Some(path) = self.companies_file.clone() {
            self.companies = read_companies_csv(&path)?;
            tracing::info!("📂 Loaded {} companies from {}", self.companies.len(), path);
        }
        Ok(())
    }
}

impl Validate for Lookups {
    fn validate(&self) -> Result<()> {
        self.validate_files()?;

        validate_unique_keys(
            "lookups.categories",
            self.categories.iter().map(|e| e.account.as_str()),
        )?;
        validate_unique_keys("lookups.companies", self.companies.iter().map(|c| c.id))?;
        for company in &self.companies {
            validate_non_empty_string("lookups.companies.name", &company.name)?;
        }
        Ok(())
    }
}

/// Header row required; first column is the key, second the label.
pub fn read_categories_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CategoryEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_path(path)?;
    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        entries.push(CategoryEntry {
            account: record.get(0).unwrap_or_default().to_string(),
            label: record.get(1).unwrap_or_default().to_string(),
        });
    }
    Ok(entries)
}

pub fn read_companies_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Company>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_path(path)?;
    let mut companies = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_id = record.get(0).unwrap_or_default();
        let id = raw_id
            .parse()
            .map_err(|_| crate::utils::error::ReportError::InvalidConfigValueError {
                field: format!("lookups.companies_file line {}", line + 2),
                value: raw_id.to_string(),
                reason: "Company id must be an integer".to_string(),
            })?;
        companies.push(Company {
            id,
            name: record.get(1).unwrap_or_default().to_string(),
        });
    }
    Ok(companies)
}

pub fn default_categories() -> Vec<CategoryEntry> {
    [
        ("-", "Outras saídas"),
        ("47 - CAIXA TESOURARIA | BALSAS", "Saídas"),
        ("66 - CAIXA TESOURARIA | FORMOSA", "Saídas"),
        ("58 - CAIXA TESOURARIA | ARAGUAINA II", "Saídas"),
        ("55 - CAIXA TESOURARIA | ARAGUAINA I", "Saídas"),
        ("SALARIO PESSOAL", "Outras saídas"),
    ]
    .into_iter()
    .map(|(account, label)| CategoryEntry {
        account: account.to_string(),
        label: label.to_string(),
    })
    .collect()
}

pub fn default_companies() -> Vec<Company> {
    [(58, "Araguaína II"), (66, "Balsas II"), (55, "Araguaína I")]
        .into_iter()
        .map(|(id, name)| Company {
            id,
            name: name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_unknown_key_resolves_to_empty_label() {
        let table = Lookups::default().category_table();
        assert_eq!(table.resolve("47 - CAIXA TESOURARIA | BALSAS"), "Saídas");
        assert_eq!(table.resolve("NAO EXISTE"), "");
        assert_eq!(table.resolve(""), "");
    }

    #[test]
    fn test_table_keeps_insertion_order() {
        let table = LookupTable::new([("b", "2"), ("a", "1"), ("c", "3")]);
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_default_companies_in_declared_order() {
        let lookups = Lookups::default();
        assert_eq!(lookups.company_ids(), vec![58, 66, 55]);
        assert_eq!(lookups.companies[1].name, "Balsas II");
        assert!(lookups.validate().is_ok());
    }

    #[test]
    fn test_duplicate_company_rejected() {
        let mut lookups = Lookups::default();
        lookups.companies.push(Company {
            id: 58,
            name: "Outra".to_string(),
        });
        assert!(lookups.validate().is_err());
    }

    #[test]
    fn test_load_files_replaces_inline_tables() {
        let mut categories = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(categories, "conta,de_para").unwrap();
        writeln!(categories, "\"10 - FORNECEDORES\", Saídas").unwrap();
        writeln!(categories, "-,Outras saídas").unwrap();

        let mut companies = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(companies, "id,nome").unwrap();
        writeln!(companies, "7,Loja Centro").unwrap();

        let mut lookups = Lookups {
            categories_file: Some(categories.path().to_string_lossy().to_string()),
            companies_file: Some(companies.path().to_string_lossy().to_string()),
            ..Lookups::default()
        };
        lookups.load_files().unwrap();

        assert_eq!(lookups.categories.len(), 2);
        assert_eq!(lookups.category_table().resolve("10 - FORNECEDORES"), "Saídas");
        assert_eq!(lookups.company_ids(), vec![7]);
        assert!(lookups.validate().is_ok());
    }

    #[test]
    fn test_non_csv_lookup_file_is_refused_before_reading() {
        let mut lookups = Lookups {
            categories_file: Some("/nao/existe/de_para.txt".to_string()),
            ..Lookups::default()
        };

        let err = lookups.load_files().unwrap_err();

        assert!(matches!(
            err,
            crate::utils::error::ReportError::InvalidConfigValueError { ref field, .. } if field == "lookups"
        ));
        assert_eq!(lookups.categories, default_categories());
    }

    #[test]
    fn test_non_integer_company_id_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,nome").unwrap();
        writeln!(file, "abc,Loja").unwrap();
        assert!(read_companies_csv(file.path()).is_err());
    }
}
