//! The persisted CSV dataset: the only contract with the modeling job.

use crate::models::{AgencyRecord, AgencyRow};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Column order of the dataset. Downstream jobs reference these by name.
pub const DATASET_COLUMNS: [&str; 10] = [
    "country",
    "source",
    "name",
    "website",
    "location_city",
    "clutch_rating",
    "min_project_size_usd",
    "employees",
    "services",
    "is_wp_specialist",
];

pub fn write_dataset(path: &Path, records: &[AgencyRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    // Written explicitly so an empty run still produces the header row.
    writer.write_record(DATASET_COLUMNS)?;
    for record in records {
        writer
            .serialize(AgencyRow::from(record))
            .with_context(|| format!("write row for {}", record.name))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {:?}", records.len(), path);
    Ok(records.len())
}

pub fn read_dataset(path: &Path) -> Result<Vec<AgencyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<AgencyRow>().enumerate() {
        match row {
            Ok(row) => records.push(AgencyRecord::from(row)),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryCode;

    fn record(name: &str, website: Option<&str>) -> AgencyRecord {
        AgencyRecord {
            country: CountryCode::Au,
            source: "clutch.co".into(),
            name: name.into(),
            website: website.map(str::to_string),
            location_city: "Sydney, Australia".into(),
            clutch_rating: 4.9,
            min_project_size_usd: 5_000,
            employees: 29,
            services: vec!["Web Development".into(), "WordPress, Custom".into()],
            is_wp_specialist: true,
        }
    }

    #[test]
    fn test_header_matches_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw/partners.csv");
        write_dataset(&path, &[record("Koala Web", Some("https://koala.example"))]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, DATASET_COLUMNS.join(","));
        assert!(text.contains("AU,clutch.co,Koala Web,https://koala.example,"));
    }

    #[test]
    fn test_empty_run_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_dataset(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), DATASET_COLUMNS.join(","));
        assert!(read_dataset(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_back_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partners.csv");
        let records = vec![record("Koala Web", None), record("Wombat Works", Some("https://w.example"))];
        write_dataset(&path, &records).unwrap();

        let back = read_dataset(&path).unwrap();
        assert_eq!(back, records);
    }
}
