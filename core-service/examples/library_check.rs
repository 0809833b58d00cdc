//! Library check demonstration
//!
//! Syncs one show from a JSON catalog, scans its folder and prints what the
//! reconciler found.
//!
//! Run with:
//! ```bash
//! cargo run -p core-service --example library_check -- catalog.json /tv/Lost 4
//! ```
//!
//! `catalog.json` holds an array of cached series records.

use anyhow::{bail, Context};
use async_trait::async_trait;
use core_library::{CachedMediaRecord, MediaId, MediaKind};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat};
use core_scan::{ActionItem, Library, ScanSelection, TrackedShow};
use core_service::CoreService;
use core_sync::{ChangedIds, MetadataProvider, ProviderError, ProviderResult};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: library_check <catalog.json> <show folder> <show id>";

/// Serves records from memory and reports all of them as changed.
struct CatalogProvider {
    kind: MediaKind,
    records: HashMap<MediaId, CachedMediaRecord>,
}

impl CatalogProvider {
    fn new(kind: MediaKind, records: Vec<CachedMediaRecord>) -> Self {
        Self {
            kind,
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

#[async_trait]
impl MetadataProvider for CatalogProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn fetch_by_id(&self, id: MediaId) -> ProviderResult<CachedMediaRecord> {
        self.records.get(&id).cloned().ok_or(ProviderError::NotFound(id))
    }

    async fn fetch_changed_ids(&self, _since: i64) -> ProviderResult<ChangedIds> {
        let now = chrono::Utc::now().timestamp();
        Ok(ChangedIds::new(self.records.keys().copied().collect(), now))
    }

    async fn search(&self, text: &str) -> ProviderResult<Vec<CachedMediaRecord>> {
        Ok(self
            .records
            .values()
            .filter(|r| r.name_matches(text))
            .cloned()
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let (Some(catalog), Some(folder), Some(id)) = (args.next(), args.next(), args.next()) else {
        bail!(USAGE);
    };
    let id = MediaId(id.parse().context("show id must be a number")?);

    let bytes = tokio::fs::read(&catalog)
        .await
        .with_context(|| format!("reading {}", catalog))?;
    let records: Vec<CachedMediaRecord> = serde_json::from_slice(&bytes)?;

    let config = CoreConfig::builder()
        .data_dir(env::temp_dir().join("medialib-library-check"))
        .build()?;
    init_logging(config.logging_config().with_format(LogFormat::Compact))?;

    let core = CoreService::start(
        config,
        Arc::new(CatalogProvider::new(MediaKind::Movie, Vec::new())),
        Arc::new(CatalogProvider::new(MediaKind::Series, records)),
    )
    .await?;

    let report = core.synchronize(MediaKind::Series, &[id]).await?;
    info!(committed = report.committed, "Sync finished");

    let library = Library::new().with_show(TrackedShow::new(id, folder));
    let outcome = core.scan(&library, ScanSelection::All).await?;

    for item in outcome.actions.iter() {
        match item {
            ActionItem::Missing(m) => {
                println!("missing  S{:02}E{:02} {}", m.season, m.episode, m.expected_path.display())
            }
            ActionItem::RenameCandidate(r) => {
                println!("rename   {} -> {}", r.from.display(), r.to.display())
            }
            ActionItem::WriteMetadata(w) => println!("metadata {}", w.target_file.display()),
        }
    }
    for issue in &outcome.issues {
        println!("issue    {}: {}", issue.show, issue.message);
    }

    core.shutdown().await?;
    Ok(())
}
