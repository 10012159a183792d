//! Orchestrator
//!
//! Drives one scrape → cluster → summarize → deliver cycle, and the
//! outer loop that repeats it every `cycle_interval`. Each stage is
//! idempotent against its own persisted state: re-running a cycle never
//! reprocesses a URL already in the ledger, never re-embeds an article
//! already in the embedding cache, and never re-creates a group that
//! already exists on disk.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::cluster::{self, Candidate};
use crate::pipeline::delivery::DeliveryClient;
use crate::pipeline::embedding::{Encoder, EmbeddingCache};
use crate::pipeline::extractor;
use crate::pipeline::fetcher::HttpFetcher;
use crate::pipeline::group_store::GroupStore;
use crate::pipeline::ledger::UrlLedger;
use crate::pipeline::registry::{self, Source};
use crate::pipeline::store::{ArticleStore, RawArticle};
use crate::pipeline::summarizer::SummarizerAdapter;

pub struct Orchestrator {
    config: AppConfig,
    fetcher: HttpFetcher,
    ledger: UrlLedger,
    store: ArticleStore,
    group_store: GroupStore,
    embedding_cache: EmbeddingCache,
    encoder: Encoder,
    summarizer: SummarizerAdapter,
    delivery: DeliveryClient,
}

fn embedding_text(title: &str, content: &str) -> String {
    format!("{}. {}. {}", title, title, content)
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        summarizer: SummarizerAdapter,
        delivery: DeliveryClient,
    ) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.ingestion.fetch_timeout);
        // Spec §6: the ledger lives alongside RawArticles, as
        // `pulled_articles/{safe_source}_urls.txt`, not its own directory.
        let ledger = UrlLedger::new(config.paths.pulled_articles_dir());
        let store = ArticleStore::new(config.paths.pulled_articles_dir());
        let group_store = GroupStore::new(config.paths.grouped_articles_dir());
        let embedding_cache = EmbeddingCache::load(config.paths.embedding_cache_file())?;
        let encoder = Encoder::new(config.encoder.clone());

        Ok(Self {
            config,
            fetcher,
            ledger,
            store,
            group_store,
            embedding_cache,
            encoder,
            summarizer,
            delivery,
        })
    }

    /// Run cycles forever, sleeping `cycle_interval` between each.
    pub async fn run_forever(&self) {
        let mut ticker = interval(self.config.orchestrator.cycle_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "pipeline cycle failed");
            }
        }
    }

    pub async fn run_once(&self) -> Result<()> {
        info!("starting pipeline cycle");
        self.reset_new_articles_log()?;
        let new_paths = self.ingest_all_sources().await?;
        self.cluster_pending(new_paths).await?;
        self.summarize_and_deliver().await?;
        info!("pipeline cycle complete");
        Ok(())
    }

    /// Truncate the per-cycle ephemeral new-articles log at the start of
    /// every cycle (spec §4.11 step 2).
    fn reset_new_articles_log(&self) -> Result<()> {
        let path = self.config.paths.new_articles_log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| crate::error::PipelineError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(&path, b"").map_err(|source| crate::error::PipelineError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    async fn ingest_all_sources(&self) -> Result<Vec<PathBuf>> {
        let sources = registry::default_sources();
        let mut new_paths = Vec::new();

        for source in &sources {
            match self.ingest_source(source).await {
                Ok(mut paths) => new_paths.append(&mut paths),
                Err(e) => warn!(source = source.slug, error = %e, "source ingestion failed"),
            }
        }

        Ok(new_paths)
    }

    async fn ingest_source(&self, source: &Source) -> Result<Vec<PathBuf>> {
        let candidates = crate::pipeline::listing::discover(&self.fetcher, source, &self.config.ingestion).await;
        let fresh = self.ledger.new_urls(source.slug, &candidates)?;

        if fresh.is_empty() {
            self.log_scraper_activity(source.slug, 0)?;
            return Ok(Vec::new());
        }

        let outcomes = self
            .fetcher
            .fetch_many(fresh, self.config.ingestion.per_source_concurrency)
            .await;

        let mut saved_paths = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(html) => {
                    let extracted = extractor::extract(source, &outcome.url, &html);
                    let article: RawArticle = extracted.into();
                    let path = self.store.save(&article)?;
                    self.ledger.append(source.slug, &outcome.url)?;
                    saved_paths.push(path);
                }
                Err(e) => {
                    // Spec §7: still write a RawArticle so the failure is
                    // visible on disk, but deliberately skip the ledger
                    // append (open question (a)) so the next cycle retries
                    // this URL instead of treating it as permanently seen.
                    warn!(url = outcome.url, error = %e, "article fetch failed");
                    let extracted = extractor::network_error(source, &outcome.url, &e.to_string());
                    let article: RawArticle = extracted.into();
                    let path = self.store.save(&article)?;
                    saved_paths.push(path);
                }
            }
        }

        self.log_scraper_activity(source.slug, saved_paths.len())?;
        self.append_new_articles_log(&saved_paths)?;
        Ok(saved_paths)
    }

    fn log_scraper_activity(&self, source_slug: &str, saved_count: usize) -> Result<()> {
        let path = self.config.paths.scraper_log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| crate::error::PipelineError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| crate::error::PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
        writeln!(file, "{},{},{}", chrono::Utc::now().to_rfc3339(), source_slug, saved_count).map_err(
            |source| crate::error::PipelineError::Io {
                path: path.display().to_string(),
                source,
            },
        )?;
        Ok(())
    }

    fn append_new_articles_log(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let path = self.config.paths.new_articles_log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| crate::error::PipelineError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| crate::error::PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
        for p in paths {
            writeln!(file, "{}", p.display()).map_err(|source| crate::error::PipelineError::Io {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    async fn embed_raw_article(&self, article: &RawArticle) -> Result<Vec<f32>> {
        if let Some(cached) = self.embedding_cache.get(&article.id).await {
            return Ok(cached);
        }
        let text = embedding_text(&article.title, &article.content);
        let embeddings = self
            .encoder
            .embed_batch(&[text], self.config.clustering.encode_batch_size)
            .await?;
        let embedding = embeddings.into_iter().next().unwrap_or_default();
        self.embedding_cache.insert(article.id.clone(), embedding.clone()).await;
        Ok(embedding)
    }

    async fn cluster_pending(&self, _new_paths: Vec<PathBuf>) -> Result<()> {
        let existing_group_ids = self.group_store.existing_group_ids()?;

        if existing_group_ids.is_empty() {
            self.cluster_initial_pass().await?;
        } else {
            self.cluster_incremental_pass().await?;
        }

        self.embedding_cache.persist().await?;
        Ok(())
    }

    async fn cluster_initial_pass(&self) -> Result<()> {
        let all_articles = self.store.load_all()?;
        let mut candidates = Vec::new();
        let mut paths = HashMap::new();

        for article in all_articles {
            let path = self.store.path_for(&article);
            if word_count(&article.content) < self.config.clustering.min_word_count {
                self.group_store.move_to_unmatched(&path)?;
                continue;
            }
            let embedding = self.embed_raw_article(&article).await?;
            paths.insert(article.id.clone(), path);
            candidates.push(Candidate {
                id: article.id.clone(),
                embedding,
                text: embedding_text(&article.title, &article.content),
            });
        }

        let result = cluster::cluster_initial(
            &candidates,
            self.config.clustering.tau_match,
            self.config.clustering.tau_internal,
        );

        let mut next_id = self.group_store.next_group_id()?;
        for members in result.new_groups {
            for member_id in &members {
                if let Some(path) = paths.get(member_id) {
                    self.group_store.move_to_group(path, next_id)?;
                }
            }
            next_id += 1;
        }
        for member_id in result.unmatched {
            if let Some(path) = paths.get(&member_id) {
                self.group_store.move_to_unmatched(path)?;
            }
        }

        Ok(())
    }

    async fn cluster_incremental_pass(&self) -> Result<()> {
        let existing_groups = self.group_store.load_all_groups()?;
        let mut group_embeddings: HashMap<u32, Vec<Vec<f32>>> = HashMap::new();
        for (group_id, members) in &existing_groups {
            let mut embeddings = Vec::new();
            for (_, article) in members {
                embeddings.push(self.embed_raw_article(article).await?);
            }
            group_embeddings.insert(*group_id, embeddings);
        }

        let unmatched_on_disk = self.group_store.load_still_unmatched()?;
        let mut candidates = Vec::new();
        let mut paths = HashMap::new();

        for (path, article) in unmatched_on_disk {
            if word_count(&article.content) < self.config.clustering.min_word_count {
                continue;
            }
            let embedding = self.embed_raw_article(&article).await?;
            paths.insert(article.id.clone(), path);
            candidates.push(Candidate {
                id: article.id.clone(),
                embedding,
                text: embedding_text(&article.title, &article.content),
            });
        }

        let result = cluster::cluster_incremental(&candidates, &group_embeddings, self.config.clustering.tau_match);

        for (member_id, group_id) in result.matched_existing {
            if let Some(path) = paths.get(&member_id) {
                self.group_store.move_to_group(path, group_id)?;
            }
        }

        let mut next_id = self.group_store.next_group_id()?;
        for members in result.new_groups {
            for member_id in &members {
                if let Some(path) = paths.get(member_id) {
                    self.group_store.move_to_group(path, next_id)?;
                }
            }
            next_id += 1;
        }

        for member_id in result.unmatched {
            if let Some(path) = paths.get(&member_id) {
                self.group_store.move_to_unmatched(path)?;
            }
        }

        Ok(())
    }

    async fn summarize_and_deliver(&self) -> Result<()> {
        let groups = self.group_store.load_all_groups()?;
        for (group_id, members) in groups {
            if self.group_store.is_objectified(group_id) {
                continue;
            }
            let articles: Vec<RawArticle> = members.into_iter().map(|(_, a)| a).collect();
            let Some(objectified) = self.summarizer.objectify_cluster(&articles).await else {
                continue;
            };
            self.write_objectified_record(&objectified)?;
            info!(group_id, "delivering objectified cluster");
            self.delivery.deliver(&objectified, None).await;
            self.group_store.mark_objectified(group_id)?;
        }
        Ok(())
    }

    /// Write `objectified_jsons/article_{YYYYMMDD_HHMMSS}_{rand6}/article.json`
    /// alongside delivery, per the external interface layout (spec §6).
    fn write_objectified_record(
        &self,
        article: &crate::pipeline::summarizer::ObjectifiedArticle,
    ) -> Result<()> {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let suffix: String = (0..6)
            .map(|_| {
                let charset = b"abcdefghijklmnopqrstuvwxyz0123456789";
                let idx = rand::random::<usize>() % charset.len();
                charset[idx] as char
            })
            .collect();
        let dir = self
            .config
            .paths
            .objectified_dir()
            .join(format!("article_{}_{}", timestamp, suffix));
        std::fs::create_dir_all(&dir).map_err(|source| crate::error::PipelineError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = dir.join("article.json");
        let file = std::fs::File::create(&path).map_err(|source| crate::error::PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::to_writer_pretty(file, article)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ClusteringConfig, DeliveryConfig, EncoderConfig, Environment, IngestionConfig,
        OrchestratorConfig, PathsConfig, SummarizerConfig,
    };
    use crate::pipeline::summarizer::{HttpLlmClient, KeyPool};
    use tempfile::tempdir;

    #[test]
    fn embedding_text_repeats_title_then_content() {
        let text = embedding_text("Title", "Body");
        assert_eq!(text, "Title. Title. Body");
    }

    #[test]
    fn word_count_counts_whitespace_separated_tokens() {
        assert_eq!(word_count("bir iki üç"), 3);
        assert_eq!(word_count(""), 0);
    }

    fn test_orchestrator(base_dir: PathBuf) -> Orchestrator {
        let config = AppConfig {
            environment: Environment::Development,
            paths: PathsConfig { base_dir },
            clustering: ClusteringConfig {
                tau_match: 0.75,
                tau_internal: 0.70,
                min_word_count: 50,
                encode_batch_size: 32,
            },
            ingestion: IngestionConfig {
                max_listing_candidates: 300,
                max_pages: 10,
                stagnation_threshold: 6,
                per_source_concurrency: 8,
                max_in_flight_sockets: 64,
                fetch_timeout: Duration::from_secs(10),
            },
            encoder: EncoderConfig {
                model_name: "paraphrase-multilingual-MiniLM-L12-v2".to_string(),
                max_text_length: 2000,
            },
            summarizer: SummarizerConfig {
                api_keys: vec![],
                max_retries: 3,
                backoff_schedule: vec![Duration::from_millis(1)],
            },
            orchestrator: OrchestratorConfig {
                cycle_interval: Duration::from_secs(900),
            },
            delivery: DeliveryConfig { insert_url: None },
        };
        let summarizer = SummarizerAdapter::new(
            Box::new(HttpLlmClient::new("http://127.0.0.1:1/".to_string())),
            KeyPool::new(vec![]),
            config.summarizer.clone(),
        );
        let delivery = DeliveryClient::new(None);
        Orchestrator::new(config, summarizer, delivery).unwrap()
    }

    #[tokio::test]
    async fn reset_new_articles_log_truncates_existing_content() {
        let dir = tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path().to_path_buf());
        let log_path = orchestrator.config.paths.new_articles_log_file();
        std::fs::create_dir_all(log_path.parent().unwrap()).unwrap();
        std::fs::write(&log_path, b"stale entry\n").unwrap();

        orchestrator.reset_new_articles_log().unwrap();

        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
    }

    #[tokio::test]
    async fn summarize_and_deliver_skips_already_objectified_groups() {
        let dir = tempdir().unwrap();
        let orchestrator = test_orchestrator(dir.path().to_path_buf());

        let group_dir = orchestrator.group_store.group_dir(1);
        std::fs::create_dir_all(&group_dir).unwrap();
        let article = RawArticle {
            id: "a".to_string(),
            title: "T".to_string(),
            content: "some content".to_string(),
            url: "https://example.com/1".to_string(),
            source: "ntv".to_string(),
            genre: "gundem".to_string(),
            article_date: "2026-07-27".to_string(),
            request_date: "2026-07-27".to_string(),
            image: None,
            is_empty: false,
            error: None,
        };
        std::fs::write(
            group_dir.join("a.json"),
            serde_json::to_string(&article).unwrap(),
        )
        .unwrap();

        orchestrator.group_store.mark_objectified(1).unwrap();
        orchestrator.summarize_and_deliver().await.unwrap();

        let objectified_root = orchestrator.config.paths.objectified_dir();
        assert!(!objectified_root.exists() || std::fs::read_dir(&objectified_root).unwrap().count() == 0);
    }
}
