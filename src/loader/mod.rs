//! CSV loader for the enriched partner table consumed by the modeling job.

use crate::models::EnrichedPartner;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns the modeling job cannot run without.
pub const REQUIRED_COLUMNS: [&str; 4] = ["employees", "clutch_rating", "revenue_usd", "kaycore_fit_score"];

/// Parse the enriched CSV. Malformed rows are logged and skipped; a missing
/// feature column fails the whole load.
pub fn load_enriched(path: &Path) -> Result<Vec<EnrichedPartner>> {
    debug!("Loading enriched partners from {:?}", path);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            bail!("{:?} is missing required column `{}`", path, column);
        }
    }

    let mut partners = Vec::new();
    for (i, result) in reader.deserialize::<EnrichedPartner>().enumerate() {
        match result {
            Ok(p) => partners.push(p),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    info!("{} partners loaded from {:?}", partners.len(), path);
    Ok(partners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_loads_enriched_rows_and_skips_bad_ones() {
        let f = write_tmp(
            "country,source,name,website,location_city,clutch_rating,min_project_size_usd,employees,services,is_wp_specialist,kaycore_fit_score,revenue_usd\n\
             US,clutch.co,Acme,https://acme.example,Austin,4.8,10000,29,WordPress,true,8,450000\n\
             UK,clutch.co,Broken,,London,not-a-number,0,5,,false,3,1000\n\
             SA,clutch.co,Braai Dev,,Cape Town,4.2,0,5,,false,6.5,120000\n",
        );
        let partners = load_enriched(f.path()).unwrap();
        assert_eq!(partners.len(), 2);
        assert_eq!(partners[0].name, "Acme");
        assert_eq!(partners[0].revenue_usd, 450_000.0);
        assert_eq!(partners[1].website, None);
        assert_eq!(partners[1].kaycore_fit_score, 6.5);
    }

    #[test]
    fn test_missing_feature_column_is_an_error() {
        let f = write_tmp("country,name,employees,clutch_rating,revenue_usd\nUS,Acme,5,4.0,1\n");
        let err = load_enriched(f.path()).unwrap_err();
        assert!(err.to_string().contains("kaycore_fit_score"));
    }
}
