//! Demo dataset: pharmaceutical shipments and an in-memory backend.

use crate::driver::{DataSource, Page};
use crate::filter::FilterState;
use crate::suggest::Searchable;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Manufactured,
    InTransit,
    AtPharmacy,
    Recalled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Manufactured,
        ShipmentStatus::InTransit,
        ShipmentStatus::AtPharmacy,
        ShipmentStatus::Recalled,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ShipmentStatus::Manufactured => "manufactured",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::AtPharmacy => "at_pharmacy",
            ShipmentStatus::Recalled => "recalled",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.key() == key)
    }

    /// Cycle used by the demo's status selector; `None` is "all".
    pub fn next(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::ALL[0]),
            Some(status) => {
                let idx = Self::ALL.iter().position(|s| *s == status).unwrap_or(0);
                Self::ALL.get(idx + 1).copied()
            }
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShipmentStatus::Manufactured => "Manufactured",
            ShipmentStatus::InTransit => "In transit",
            ShipmentStatus::AtPharmacy => "At pharmacy",
            ShipmentStatus::Recalled => "Recalled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub drug: String,
    pub batch_code: String,
    pub holder: String,
    pub status: ShipmentStatus,
}

impl Searchable for Shipment {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.drug.as_str(), self.batch_code.as_str(), self.holder.as_str()]
    }

    fn search_text(&self) -> String {
        self.drug.clone()
    }
}

const DRUGS: &[&str] = &[
    "Amoxicillin 500mg",
    "Amlodipine 5mg",
    "Atorvastatin 20mg",
    "Azithromycin 250mg",
    "Cetirizine 10mg",
    "Ibuprofen 400mg",
    "Insulin glargine",
    "Lisinopril 10mg",
    "Metformin 850mg",
    "Omeprazole 20mg",
    "Paracetamol 500mg",
    "Salbutamol inhaler",
];

const HOLDERS: &[&str] = &[
    "Nordic Pharma Works",
    "Baltic Cold Chain",
    "Helsinki Central Pharmacy",
    "Tampere Health Depot",
];

/// Deterministic sample catalogue.
pub fn sample_shipments() -> Vec<Shipment> {
    (0..48)
        .map(|i| {
            let drug = DRUGS[i % DRUGS.len()];
            let prefix: String = drug.chars().filter(|c| c.is_ascii_alphabetic()).take(3).collect();
            Shipment {
                id: format!("SHP-{:04}", 1000 + i),
                drug: drug.to_string(),
                batch_code: format!("{}-{:03}", prefix.to_uppercase(), 100 + i * 7),
                holder: HOLDERS[i % HOLDERS.len()].to_string(),
                status: ShipmentStatus::ALL[(i / 3) % ShipmentStatus::ALL.len()],
            }
        })
        .collect()
}

/// Filters the sample catalogue with simulated network latency.
pub struct InMemorySource {
    shipments: Vec<Shipment>,
    page_size: usize,
    latency: Duration,
    jitter: Duration,
}

impl InMemorySource {
    pub fn new(shipments: Vec<Shipment>) -> Self {
        Self {
            shipments,
            page_size: 10,
            latency: Duration::from_millis(400),
            jitter: Duration::from_millis(800),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_latency(mut self, latency: Duration, jitter: Duration) -> Self {
        self.latency = latency;
        self.jitter = jitter;
        self
    }

    /// The filtering itself, without latency.
    pub fn query(&self, filter: &FilterState) -> Page<Shipment> {
        let needle = filter.get("search").map(|s| s.trim().to_lowercase());
        let status = filter.get("status");

        let matching: Vec<&Shipment> = self
            .shipments
            .iter()
            .filter(|s| status.is_none_or(|st| s.status.key() == st))
            .filter(|s| match &needle {
                Some(needle) if !needle.is_empty() => s
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
                _ => true,
            })
            .collect();

        let start = (filter.page() as usize - 1) * self.page_size;
        Page {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip(start)
                .take(self.page_size)
                .cloned()
                .collect(),
        }
    }

    fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.latency;
        }
        let mut rng = rand::thread_rng();
        self.latency + Duration::from_millis(rng.gen_range(0..=jitter_ms))
    }
}

#[async_trait]
impl DataSource<Shipment> for InMemorySource {
    async fn fetch(&self, filter: &FilterState) -> Result<Page<Shipment>> {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.query(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_searchable_by_batch_code() {
        let source = InMemorySource::new(sample_shipments());
        let page = source.query(&FilterState::new().with("search", "ibu-"));
        assert!(page.total > 0);
        assert!(page.items.iter().all(|s| s.drug.starts_with("Ibuprofen")));
    }

    #[test]
    fn test_status_and_paging() {
        let source = InMemorySource::new(sample_shipments()).with_page_size(5);
        let filter = FilterState::new().with("status", "recalled");
        let first = source.query(&filter);
        assert_eq!(first.total, 12);
        assert_eq!(first.items.len(), 5);

        let last = source.query(&filter.with_page(3));
        assert_eq!(last.items.len(), 2);
        assert!(last.items.iter().all(|s| s.status == ShipmentStatus::Recalled));
    }

    #[test]
    fn test_status_cycle_returns_to_all() {
        let mut current = None;
        for _ in 0..ShipmentStatus::ALL.len() {
            current = ShipmentStatus::next(current);
            assert!(current.is_some());
        }
        assert_eq!(ShipmentStatus::next(current), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_latency() {
        let source = InMemorySource::new(sample_shipments())
            .with_latency(Duration::from_millis(300), Duration::ZERO);
        let started = tokio::time::Instant::now();
        let page = source.fetch(&FilterState::new()).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
