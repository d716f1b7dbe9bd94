use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DonorId;
use crate::error::ValidatorError;
use crate::fields::{TrackedField, default_tracked_fields};
use crate::search::{DEFAULT_ELASTICSEARCH_URL, DEFAULT_PAGE_SIZE};

pub const DEFAULT_CONFIG_FILE: &str = "song-validator.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub elasticsearch_url: Option<String>,
    /// Index mapping used when `index` has to create the index.
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
    /// Aggregation bundle sent along with every donor search.
    #[serde(default)]
    pub aggregations_file: Option<PathBuf>,
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Dotted document paths (or bare field names) compared across analyses.
    #[serde(default)]
    pub tracked_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub elasticsearch_url: String,
    pub mapping: Value,
    pub aggregations: Option<Value>,
    pub page_size: usize,
    pub tracked_fields: Vec<TrackedField>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            elasticsearch_url: DEFAULT_ELASTICSEARCH_URL.to_string(),
            mapping: Value::Object(Default::default()),
            aggregations: None,
            page_size: DEFAULT_PAGE_SIZE,
            tracked_fields: default_tracked_fields(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `song-validator.json` from the current directory when it
    /// exists. Without either, defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ValidatorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default(), None);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ValidatorError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ValidatorError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, config_path.parent())
    }

    /// Relative file references are taken relative to `base_dir`.
    pub fn resolve_config(
        config: Config,
        base_dir: Option<&Path>,
    ) -> Result<ResolvedConfig, ValidatorError> {
        let defaults = ResolvedConfig::default();

        let tracked_fields = match config.tracked_fields {
            Some(paths) => {
                let mut fields = Vec::with_capacity(paths.len());
                for path in &paths {
                    let field: TrackedField = path.parse()?;
                    if !fields.contains(&field) {
                        fields.push(field);
                    }
                }
                fields
            }
            None => defaults.tracked_fields,
        };
        if let Some(missing) = TrackedField::PAIRING
            .into_iter()
            .find(|field| !tracked_fields.contains(field))
        {
            return Err(ValidatorError::MissingPairingField(missing.name()));
        }

        let mapping = match &config.mapping_file {
            Some(file) => load_json(&relative_to(base_dir, file))?,
            None => defaults.mapping,
        };
        let aggregations = config
            .aggregations_file
            .as_ref()
            .map(|file| load_json(&relative_to(base_dir, file)))
            .transpose()?;

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            elasticsearch_url: config
                .elasticsearch_url
                .unwrap_or(defaults.elasticsearch_url),
            mapping,
            aggregations,
            page_size: config.page_size.unwrap_or(defaults.page_size),
            tracked_fields,
        })
    }
}

pub fn load_json(path: &Path) -> Result<Value, ValidatorError> {
    let content =
        fs::read_to_string(path).map_err(|_| ValidatorError::ConfigRead(path.to_path_buf()))?;
    serde_json::from_str(&content)
        .map_err(|err| ValidatorError::ConfigParse(format!("{}: {err}", path.display())))
}

fn relative_to(base_dir: Option<&Path>, file: &Path) -> PathBuf {
    match base_dir {
        Some(base) if file.is_relative() => base.join(file),
        _ => file.to_path_buf(),
    }
}

/// Where the donors of a validation run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonorSelection {
    Explicit(Vec<DonorId>),
    /// Every donor of the program, as listed by the index.
    Program,
}

impl DonorSelection {
    pub fn resolve(
        donor_ids: &[String],
        donor_file: Option<&Path>,
    ) -> Result<DonorSelection, ValidatorError> {
        match (donor_ids.is_empty(), donor_file) {
            (false, Some(_)) => Err(ValidatorError::ConflictingDonorSources),
            (false, None) => Ok(DonorSelection::Explicit(parse_donor_ids(
                donor_ids.iter().map(String::as_str),
            )?)),
            (true, Some(file)) => {
                let content = fs::read_to_string(file)
                    .map_err(|_| ValidatorError::DonorFileRead(file.to_path_buf()))?;
                Ok(DonorSelection::Explicit(parse_donor_ids(
                    content.lines().filter(|line| !line.trim().is_empty()),
                )?))
            }
            (true, None) => Ok(DonorSelection::Program),
        }
    }
}

fn parse_donor_ids<'a>(
    values: impl Iterator<Item = &'a str>,
) -> Result<Vec<DonorId>, ValidatorError> {
    let mut donors: Vec<DonorId> = Vec::new();
    for value in values {
        let donor: DonorId = value.parse()?;
        if !donors.contains(&donor) {
            donors.push(donor);
        }
    }
    Ok(donors)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_without_config() {
        let resolved = ConfigLoader::resolve_config(Config::default(), None).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.elasticsearch_url, "http://localhost:9200");
        assert_eq!(resolved.page_size, 10_000);
        assert_eq!(resolved.tracked_fields, TrackedField::ALL.to_vec());
        assert!(resolved.aggregations.is_none());
    }

    #[test]
    fn tracked_fields_are_parsed_and_deduplicated() {
        let config = Config {
            tracked_fields: Some(vec![
                "samples.submitterSampleId".to_string(),
                "samples.donor.donorId".to_string(),
                "donorId".to_string(),
                "tumourNormalDesignation".to_string(),
            ]),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config, None).unwrap();
        assert_eq!(
            resolved.tracked_fields,
            vec![
                TrackedField::SubmitterSampleId,
                TrackedField::DonorId,
                TrackedField::TumourNormalDesignation,
            ]
        );
    }

    #[test]
    fn unknown_tracked_field_aborts() {
        let config = Config {
            tracked_fields: Some(vec!["samples.a.b.c".to_string()]),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config, None).unwrap_err();
        assert_matches!(err, ValidatorError::UnknownFieldPath(_));
    }

    #[test]
    fn donor_ids_and_file_conflict() {
        let err = DonorSelection::resolve(&["DO1".to_string()], Some(Path::new("donors.txt")))
            .unwrap_err();
        assert_matches!(err, ValidatorError::ConflictingDonorSources);
    }

    #[test]
    fn donor_file_skips_blank_lines() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("donors.txt");
        fs::write(&file, "DO1\n\n  DO2 \nDO1\n").unwrap();
        let selection = DonorSelection::resolve(&[], Some(&file)).unwrap();
        assert_eq!(
            selection,
            DonorSelection::Explicit(vec!["DO1".parse().unwrap(), "DO2".parse().unwrap()])
        );
        assert_eq!(DonorSelection::resolve(&[], None).unwrap(), DonorSelection::Program);
    }
}
