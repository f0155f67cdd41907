// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read access to the `areas` reference collection.

use crate::catalog::SegmentCatalog;
use crate::db::{collections, Filter, SharedStore};
use crate::error::AppError;
use crate::models::TrailArea;

#[derive(Clone)]
pub struct AreasRepository {
    store: SharedStore,
}

impl AreasRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// All trail areas.
    pub async fn get_trail_areas(&self) -> Result<Vec<TrailArea>, AppError> {
        self.store
            .find_many(collections::AREAS, &Filter::all())
            .await?
            .iter()
            .map(|doc| doc.parse::<TrailArea>())
            .collect()
    }

    /// Catalog trail areas with no matching document, in catalog order.
    ///
    /// Missing areas only produce a warning; snapshots still record the
    /// catalog's area name.
    pub async fn missing_catalog_areas(
        &self,
        catalog: &SegmentCatalog,
    ) -> Result<Vec<String>, AppError> {
        let known = self.get_trail_areas().await?;
        let missing: Vec<String> = catalog
            .areas()
            .iter()
            .map(|a| a.trail_area.clone())
            .filter(|name| !known.iter().any(|k| &k.name == name))
            .collect();

        for name in &missing {
            tracing::warn!(trail_area = %name, "Catalog trail area has no areas document");
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{to_fields, InMemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    fn area(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "s_name": name.to_lowercase(),
            "description": "",
            "local_riders": [{"name": "Pau", "strava_id": "123"}],
            "instagram": []
        })
    }

    #[tokio::test]
    async fn test_reports_missing_areas() {
        let store = InMemoryStore::new();
        store.seed(collections::AREAS, to_fields(&area("Montseny")).unwrap());
        let repo = AreasRepository::new(Arc::new(store));

        let catalog = SegmentCatalog::load_from_json(
            r#"{"areas": [
                {"trail_area": "Montseny", "segments": [{"id": 1}]},
                {"trail_area": "Collserola", "segments": [{"id": 2}]}
            ]}"#,
        )
        .unwrap();

        let areas = repo.get_trail_areas().await.unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].local_riders[0].strava_id, "123");
        assert_eq!(
            repo.missing_catalog_areas(&catalog).await.unwrap(),
            vec!["Collserola".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_area_is_an_error() {
        let store = InMemoryStore::new();
        store.seed(collections::AREAS, to_fields(&json!({"name": 3})).unwrap());
        let repo = AreasRepository::new(Arc::new(store));

        let err = repo.get_trail_areas().await.unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }
}
