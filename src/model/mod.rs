//! Partnership-fit modeling job.
//!
//! Reads the enriched partner table, labels each row with the fixed
//! success rule, fits a nearest-centroid classifier on standardized
//! features, reports holdout accuracy, saves the model as JSON, then
//! segments every partner with k-means and writes the final table.

use crate::config::ModelConfig;
use crate::loader::load_enriched;
use crate::models::{ClusteredPartner, EnrichedPartner};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const FEATURES: [&str; 4] = ["employees", "clutch_rating", "revenue_usd", "kaycore_fit_score"];

const MIN_FIT_SCORE: f64 = 7.0;
const MIN_REVENUE_USD: f64 = 300_000.0;
const KMEANS_MAX_ITER: usize = 100;

type Features = [f64; 4];

pub fn is_success(p: &EnrichedPartner) -> bool {
    p.kaycore_fit_score >= MIN_FIT_SCORE && p.revenue_usd >= MIN_REVENUE_USD
}

fn features(p: &EnrichedPartner) -> Features {
    [
        f64::from(p.employees),
        p.clutch_rating,
        p.revenue_usd,
        p.kaycore_fit_score,
    ]
}

fn squared_distance(a: &Features, b: &Features) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

// ── Scaling ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scaler {
    pub mean: Features,
    pub std: Features,
}

impl Scaler {
    pub fn fit(rows: &[Features]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; 4];
        let mut std = [0.0; 4];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        // constant columns scale by 1 so they contribute nothing
        for s in std.iter_mut() {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Self { mean, std }
    }

    pub fn transform(&self, row: &Features) -> Features {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = (row[i] - self.mean[i]) / self.std[i];
        }
        out
    }
}

// ── Classifier ────────────────────────────────────────────────────────────────

/// Nearest-centroid classifier over standardized features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerClassifier {
    pub features: Vec<String>,
    pub scaler: Scaler,
    /// Centroid per label; `None` when training had no example of it.
    pub negative: Option<Features>,
    pub positive: Option<Features>,
}

impl PartnerClassifier {
    pub fn fit(rows: &[Features], labels: &[bool]) -> Self {
        let scaler = Scaler::fit(rows);
        let centroid = |want: bool| -> Option<Features> {
            let members: Vec<Features> = rows
                .iter()
                .zip(labels)
                .filter(|(_, l)| **l == want)
                .map(|(r, _)| scaler.transform(r))
                .collect();
            mean_of(&members)
        };

        Self {
            features: FEATURES.iter().map(|f| f.to_string()).collect(),
            negative: centroid(false),
            positive: centroid(true),
            scaler,
        }
    }

    pub fn predict(&self, row: &Features) -> bool {
        let x = self.scaler.transform(row);
        match (&self.negative, &self.positive) {
            (Some(neg), Some(pos)) => squared_distance(&x, pos) < squared_distance(&x, neg),
            (None, Some(_)) => true,
            _ => false,
        }
    }

    pub fn accuracy(&self, rows: &[Features], labels: &[bool]) -> Option<f64> {
        if rows.is_empty() {
            return None;
        }
        let correct = rows
            .iter()
            .zip(labels)
            .filter(|(r, l)| self.predict(r) == **l)
            .count();
        Some(correct as f64 / rows.len() as f64)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write model {:?}", path))?;
        Ok(())
    }
}

fn mean_of(rows: &[Features]) -> Option<Features> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let mut mean = [0.0; 4];
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    Some(mean)
}

// ── Clustering ────────────────────────────────────────────────────────────────

/// Deterministic k-means: farthest-point seeding from the first row, then
/// Lloyd iterations until assignments settle.
pub fn kmeans(rows: &[Features], k: usize) -> Vec<usize> {
    if rows.is_empty() || k == 0 {
        return vec![0; rows.len()];
    }
    let k = k.min(rows.len());

    let mut centroids = vec![rows[0]];
    while centroids.len() < k {
        let next = rows
            .iter()
            .max_by(|a, b| {
                nearest(a, &centroids)
                    .1
                    .total_cmp(&nearest(b, &centroids).1)
            })
            .copied()
            .unwrap_or(rows[0]);
        centroids.push(next);
    }

    let mut assignment = vec![usize::MAX; rows.len()];
    for _ in 0..KMEANS_MAX_ITER {
        let next: Vec<usize> = rows.iter().map(|r| nearest(r, &centroids).0).collect();
        if next == assignment {
            break;
        }
        assignment = next;

        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<Features> = rows
                .iter()
                .zip(&assignment)
                .filter(|(_, a)| **a == c)
                .map(|(r, _)| *r)
                .collect();
            if let Some(m) = mean_of(&members) {
                *centroid = m;
            }
        }
    }
    assignment
}

fn nearest(row: &Features, centroids: &[Features]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(row, c)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, 0.0))
}

// ── Job ───────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ModelReport {
    pub rows: usize,
    pub positives: usize,
    pub holdout_accuracy: Option<f64>,
    pub cluster_sizes: Vec<usize>,
}

pub fn train_partner_model(cfg: &ModelConfig) -> Result<ModelReport> {
    let partners = load_enriched(&cfg.enriched_csv)?;
    if partners.is_empty() {
        bail!("{:?} contains no usable rows", cfg.enriched_csv);
    }

    let rows: Vec<Features> = partners.iter().map(features).collect();
    let labels: Vec<bool> = partners.iter().map(is_success).collect();

    // Every n-th row is held out.
    let every = cfg.holdout_every.max(2);
    let (mut train_x, mut train_y, mut test_x, mut test_y) = (vec![], vec![], vec![], vec![]);
    for (i, (x, y)) in rows.iter().zip(&labels).enumerate() {
        if i % every == every - 1 {
            test_x.push(*x);
            test_y.push(*y);
        } else {
            train_x.push(*x);
            train_y.push(*y);
        }
    }

    let model = PartnerClassifier::fit(&train_x, &train_y);
    let holdout_accuracy = model.accuracy(&test_x, &test_y);
    match holdout_accuracy {
        Some(acc) => info!("Model accuracy: {:.3} on {} holdout rows", acc, test_x.len()),
        None => info!("Too few rows for a holdout split, accuracy not measured"),
    }
    model.save(&cfg.model_path)?;
    info!("Model saved to {:?}", cfg.model_path);

    let scaler = Scaler::fit(&rows);
    let scaled: Vec<Features> = rows.iter().map(|r| scaler.transform(r)).collect();
    let clusters = kmeans(&scaled, cfg.clusters);

    let mut cluster_sizes = vec![0; cfg.clusters.max(1)];
    for c in &clusters {
        cluster_sizes[*c] += 1;
    }

    let table: Vec<ClusteredPartner> = partners
        .into_iter()
        .zip(labels.iter().zip(&clusters))
        .map(|(p, (success, cluster))| ClusteredPartner {
            country: p.country,
            source: p.source,
            name: p.name,
            website: p.website,
            location_city: p.location_city,
            clutch_rating: p.clutch_rating,
            min_project_size_usd: p.min_project_size_usd,
            employees: p.employees,
            services: p.services,
            is_wp_specialist: p.is_wp_specialist,
            kaycore_fit_score: p.kaycore_fit_score,
            revenue_usd: p.revenue_usd,
            success: u8::from(*success),
            cluster: *cluster,
        })
        .collect();
    write_clustered(&cfg.clustered_csv, &table)?;
    info!("{} rows written to {:?}", table.len(), cfg.clustered_csv);

    Ok(ModelReport {
        rows: table.len(),
        positives: labels.iter().filter(|l| **l).count(),
        holdout_accuracy,
        cluster_sizes,
    })
}

fn write_clustered(path: &Path, rows: &[ClusteredPartner]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
