use vmindex_config::{Config, StoreBackend};
use vmindex_core::{Match, MetadataValue};
use vmindex_pipeline::QueryService;

/// Input parameters for the Search command strategy.
#[derive(Debug, Clone)]
pub struct SearchInput {
    pub query: String,
    pub top_k: usize,
    /// Overrides the configured collection
    pub collection: Option<String>,
    /// Overrides the configured backend
    pub store: Option<StoreBackend>,
}

/// Strategy for querying an indexed collection.
#[derive(Debug, Clone, Copy)]
pub struct SearchStrategy;

impl super::CommandStrategy for SearchStrategy {
    type Input = SearchInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let backend = searchable_backend(&config, input.store)?;
        let backends = super::build_backends(&config, Some(backend))?;
        let collection = input
            .collection
            .unwrap_or_else(|| config.store.collection.clone());

        let service = QueryService::new(backends.embedder, backends.store).with_call_timeout(
            std::time::Duration::from_secs(config.pipeline.call_timeout_secs),
        );
        let matches = service
            .search(&collection, &input.query, input.top_k)
            .await?;

        print_matches(&input.query, &matches);
        Ok(())
    }
}

/// Resolve the backend to search, refusing the in-memory store: it only
/// holds records for the `ingest` run that wrote them.
fn searchable_backend(
    config: &Config,
    store_override: Option<StoreBackend>,
) -> anyhow::Result<StoreBackend> {
    let backend = store_override.unwrap_or(config.store.backend);
    if backend == StoreBackend::Memory {
        anyhow::bail!(
            "The memory store only lives for a single run; use 'vmindex ingest --query <text>' \
             to search it, or switch to the chroma backend"
        );
    }
    Ok(backend)
}

const PREVIEW_CHARS: usize = 120;

pub(super) fn print_matches(query: &str, matches: &[Match]) {
    println!("Search results for: \"{query}\"");
    if matches.is_empty() {
        println!("  (no matches)");
        return;
    }

    for (rank, m) in matches.iter().enumerate() {
        println!();
        println!("{}. {} (score {:.3})", rank + 1, m.id, m.score);
        let name = field(m, "from_name");
        let company = field(m, "from_company");
        match (name, company) {
            (Some(name), Some(company)) => println!("   From: {name} ({company})"),
            (Some(name), None) => println!("   From: {name}"),
            (None, Some(company)) => println!("   From: {company}"),
            (None, None) => {}
        }
        if let Some(phone) = field(m, "phone") {
            println!("   Phone: {phone}");
        }
        println!("   {}", preview(&m.document));
    }
}

fn field<'a>(m: &'a Match, key: &str) -> Option<&'a str> {
    match m.metadata.get(key)? {
        MetadataValue::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_cannot_be_searched() {
        let mut config = Config::default();
        let err = searchable_backend(&config, Some(StoreBackend::Memory))
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("ingest --query"));

        config.store.backend = StoreBackend::Memory;
        assert!(searchable_backend(&config, None).is_err());
        assert_eq!(
            searchable_backend(&config, Some(StoreBackend::Chroma)).ok(),
            Some(StoreBackend::Chroma)
        );
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let long = "é".repeat(200);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
