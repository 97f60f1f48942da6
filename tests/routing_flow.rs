//! End-to-end routing flows over the engine with in-memory collaborators.
//!
//! No network, no Qdrant, no SQLite file: the knowledge store, gap store,
//! forum provider, fingerprints, and queue are all test doubles wired in
//! through `RivetEngine::with_parts`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rivet::config::RivetConfig;
use rivet::coverage::CoverageLevel;
use rivet::engine::RivetEngine;
use rivet::errors::{Result, RivetError};
use rivet::gaps::{GapStats, GapStore, KBGapRecord, PriorityBranch};
use rivet::knowledge::{KnowledgeStore, RetrievedDoc, SearchFilter};
use rivet::research::{
    FingerprintStore, ForumProvider, ForumResult, IngestionQueue, QueuedSource, SearchScope,
    SourceType,
};
use rivet::router::{AgentKind, Route};
use rivet::types::{Channel, Request};

struct StaticKnowledge {
    docs: Vec<RetrievedDoc>,
    searches: AtomicUsize,
}

impl StaticKnowledge {
    fn with_docs(count: usize) -> Self {
        let docs = (0..count)
            .map(|i| RetrievedDoc {
                atom_id: format!("atom-{}", i),
                title: format!("Fault reference {}", i),
                summary: format!("Procedure {} clears the fault after verifying wiring.", i),
                content: String::new(),
                similarity: 0.8 - i as f32 * 0.05,
                vendor: None,
                equipment_type: None,
                source: Some(format!("https://kb.example.com/atom-{}", i)),
                page_number: None,
            })
            .collect();
        Self {
            docs,
            searches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KnowledgeStore for StaticKnowledge {
    async fn semantic_search(
        &self,
        _query: &str,
        _filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.clone();
        docs.truncate(top_k);
        Ok(docs)
    }

    async fn keyword_search(
        &self,
        _query: &str,
        _filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.clone();
        docs.truncate(top_k);
        Ok(docs)
    }
}

#[derive(Default)]
struct MemGaps {
    records: Mutex<Vec<KBGapRecord>>,
}

#[async_trait]
impl GapStore for MemGaps {
    async fn find_unresolved(
        &self,
        query: &str,
        window_start_ts: i64,
    ) -> Result<Option<KBGapRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|r| !r.resolved && r.query == query && r.last_asked_at >= window_start_ts)
            .cloned())
    }

    async fn insert(&self, record: &KBGapRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn touch(&self, id: &str, asked_at: i64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            record.frequency += 1;
            record.last_asked_at = asked_at;
        }
        Ok(())
    }

    async fn mark_resolved(&self, id: &str, atom_ids: &[String], resolved_at: i64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.resolved = true;
                record.resolution_atom_ids = atom_ids.to_vec();
                record.resolved_at = Some(resolved_at);
                Ok(())
            }
            None => Err(RivetError::InvalidRequest(format!("no gap {}", id))),
        }
    }

    async fn top_gaps(&self, limit: usize, include_resolved: bool) -> Result<Vec<KBGapRecord>> {
        let mut records: Vec<KBGapRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| include_resolved || !r.resolved)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then(b.last_asked_at.cmp(&a.last_asked_at))
        });
        records.truncate(limit);
        Ok(records)
    }

    async fn stats(&self) -> Result<GapStats> {
        let records = self.records.lock().unwrap();
        let total = records.len() as i64;
        let resolved = records.iter().filter(|r| r.resolved).count() as i64;
        Ok(GapStats {
            total,
            resolved,
            unresolved: total - resolved,
            resolution_rate: if total > 0 {
                resolved as f64 / total as f64
            } else {
                0.0
            },
            avg_frequency: 0.0,
            avg_resolution_hours: None,
        })
    }
}

struct CannedProvider;

#[async_trait]
impl ForumProvider for CannedProvider {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn weight(&self) -> f32 {
        1.0
    }

    async fn search(
        &self,
        _query: &str,
        _scope: &SearchScope,
        _limit: usize,
    ) -> Result<Vec<ForumResult>> {
        Ok(vec![ForumResult {
            source_type: SourceType::StackOverflow,
            url: "https://stackoverflow.com/questions/42".to_string(),
            title: "How to clear an overvoltage trip".to_string(),
            content: "Measure the DC bus before resetting.".to_string(),
            score: 12,
            metadata: serde_json::Value::Null,
        }])
    }
}

#[derive(Default)]
struct MemFingerprints {
    seen: Mutex<std::collections::HashSet<String>>,
}

#[async_trait]
impl FingerprintStore for MemFingerprints {
    async fn try_claim(&self, url: &str, _source_type: &str) -> Result<bool> {
        Ok(self.seen.lock().unwrap().insert(url.to_string()))
    }

    async fn contains(&self, url: &str) -> Result<bool> {
        Ok(self.seen.lock().unwrap().contains(url))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.seen.lock().unwrap().len() as i64)
    }
}

#[derive(Default)]
struct MemQueue {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl IngestionQueue for MemQueue {
    async fn enqueue(&self, source: &ForumResult) -> Result<String> {
        let mut urls = self.urls.lock().unwrap();
        urls.push(source.url.clone());
        Ok(format!("q-{}", urls.len()))
    }

    async fn pending(&self, limit: usize) -> Result<Vec<QueuedSource>> {
        let urls = self.urls.lock().unwrap();
        Ok(urls
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, url)| QueuedSource {
                id: format!("q-{}", i),
                url: url.clone(),
                source_type: "stackoverflow".to_string(),
                title: String::new(),
                score: 0,
                status: "pending".to_string(),
                queued_at: 0,
            })
            .collect())
    }

    async fn pending_count(&self) -> Result<i64> {
        Ok(self.urls.lock().unwrap().len() as i64)
    }
}

struct Harness {
    engine: RivetEngine,
    knowledge: Arc<StaticKnowledge>,
    gap_store: Arc<MemGaps>,
    queue: Arc<MemQueue>,
}

fn harness(doc_count: usize) -> Harness {
    let knowledge = Arc::new(StaticKnowledge::with_docs(doc_count));
    let gap_store = Arc::new(MemGaps::default());
    let queue = Arc::new(MemQueue::default());
    let providers: Vec<Arc<dyn ForumProvider>> = vec![Arc::new(CannedProvider)];

    let engine = RivetEngine::with_parts(
        RivetConfig::default(),
        knowledge.clone(),
        gap_store.clone(),
        providers,
        Arc::new(MemFingerprints::default()),
        queue.clone(),
    )
    .unwrap();

    Harness {
        engine,
        knowledge,
        gap_store,
        queue,
    }
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let h = harness(0);
    let request = Request::new("u1", "   ", Channel::Api);
    let result = h.engine.handle(&request).await;
    assert!(matches!(result, Err(RivetError::InvalidRequest(_))));
}

#[tokio::test]
async fn vague_question_clarifies_without_knowledge_work() {
    let h = harness(6);
    let request = Request::new("u1", "it's broken", Channel::Chat);
    let response = h.engine.handle(&request).await.unwrap();

    assert_eq!(response.route_taken, Route::Clarify);
    assert!(!response.suggested_actions.is_empty());
    assert!(!response.kb_enrichment_triggered);
    assert!(!response.research_triggered);
    assert_eq!(h.knowledge.searches.load(Ordering::SeqCst), 0);
    assert!(h.gap_store.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn strong_coverage_answers_directly() {
    let h = harness(6);
    let request = Request::new(
        "u1",
        "Siemens G120 VFD tripping on fault F30005 at startup",
        Channel::Chat,
    );
    let response = h.engine.handle(&request).await.unwrap();

    assert_eq!(response.route_taken, Route::Direct);
    assert_eq!(response.trace.coverage, CoverageLevel::Strong);
    assert!(!response.kb_enrichment_triggered);
    assert!(!response.research_triggered);
    assert!(!response.citations.is_empty());
    assert!(response.trace.gap_id.is_none());
    assert!(response.links.iter().any(|l| l.contains("siemens")));

    h.engine.shutdown().await;
    assert!(h.queue.urls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn thin_coverage_answers_and_enriches_in_background() {
    let h = harness(3);
    let request = Request::new(
        "u1",
        "Siemens G120 VFD tripping on fault F30005 at startup",
        Channel::Chat,
    );
    let response = h.engine.handle(&request).await.unwrap();

    assert_eq!(response.route_taken, Route::Enrich);
    assert_eq!(response.trace.coverage, CoverageLevel::Thin);
    assert!(response.kb_enrichment_triggered);
    assert!(!response.research_triggered);
    assert!(response.trace.gap_id.is_some());
    assert_eq!(
        response.trace.priority_branch,
        Some(PriorityBranch::FaultKeyword)
    );

    h.engine.shutdown().await;
    assert_eq!(
        *h.queue.urls.lock().unwrap(),
        ["https://stackoverflow.com/questions/42"]
    );
}

#[tokio::test]
async fn no_coverage_researches_and_acknowledges() {
    let h = harness(0);
    let request = Request::new(
        "u1",
        "Siemens G120 VFD tripping on fault F30005 at startup",
        Channel::Chat,
    );
    let response = h.engine.handle(&request).await.unwrap();

    assert_eq!(response.route_taken, Route::Research);
    assert_eq!(response.trace.coverage, CoverageLevel::None);
    assert!(response.research_triggered);
    assert!(!response.kb_enrichment_triggered);
    assert!(response.text.contains("researching"));
    assert!(response.text.contains("30 minutes"));
    assert!((response.confidence - 0.2).abs() < f32::EPSILON);
    assert!(response.trace.gap_id.is_some());

    h.engine.shutdown().await;
    assert_eq!(h.queue.urls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn safety_question_gets_safety_agent_and_branch() {
    let h = harness(0);
    let request = Request::new(
        "u1",
        "Siemens safety relay e-stop not resetting",
        Channel::Voice,
    );
    let response = h.engine.handle(&request).await.unwrap();

    assert_eq!(response.route_taken, Route::Research);
    assert_eq!(response.trace.agent, AgentKind::Safety);
    assert_eq!(
        response.trace.priority_branch,
        Some(PriorityBranch::SafetyKeyword)
    );
    assert!(!response.safety_warnings.is_empty());

    h.engine.shutdown().await;
}

#[tokio::test]
async fn repeat_question_bumps_one_gap_record() {
    let h = harness(0);
    let request = Request::new("u1", "Fanuc servo drive alarm 401 on axis 2", Channel::Api);
    h.engine.handle(&request).await.unwrap();
    h.engine.handle(&request).await.unwrap();
    h.engine.shutdown().await;

    let records = h.gap_store.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frequency, 2);

    // The second run saw every URL already fingerprinted, so only the
    // first run queued anything.
    assert_eq!(h.queue.urls.lock().unwrap().len(), 1);
}
