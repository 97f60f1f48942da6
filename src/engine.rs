//! Request orchestration
//!
//! One engine per process, constructed explicitly at startup via `init` and
//! drained via `shutdown`. `handle` walks the fixed decision order for each
//! request: intent, clarity gate, coverage probe, route, agent, draft,
//! synthesis. The Enrich and Research routes additionally log a knowledge
//! gap and spawn a background research run before the answer returns.
//!
//! Apart from an empty question, `handle` does not fail: every collaborator
//! failure mid-request degrades to a lower-confidence answer instead of an
//! error.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RivetConfig;
use crate::coverage::{CoverageEvaluator, CoverageLevel, CoverageReport};
use crate::errors::{Result, RivetError};
use crate::gaps::{
    GapDetector, GapLogger, GapStore, IngestionTrigger, PriorityBranch, SqliteGapStore,
};
use crate::intent::{
    AnswerVerdict, ConfidenceScorer, HeuristicConfidenceScorer, IntentExtractor,
    KeywordIntentExtractor, VerdictAction,
};
use crate::knowledge::{
    HashingEmbedder, KnowledgeStore, QdrantKnowledgeStore, RetrievedDoc, SearchFilter,
};
use crate::research::{
    FingerprintStore, ForumProvider, IngestionQueue, QueuedSource, RedditProvider,
    ResearchPipeline, ResearchResult, SqliteFingerprintStore, SqliteIngestionQueue,
    StackExchangeProvider,
};
use crate::retrieval::{HybridRetriever, LexicalCrossEncoder, Reranker};
use crate::router::{agent_for, AgentKind, Route, Router};
use crate::storage;
use crate::synthesis::ResponseSynthesizer;
use crate::types::{Intent, Request, RivetResponse, RouteTrace};

/// Reported confidence for answers drafted without knowledge-base support
const RESEARCH_ANSWER_CONFIDENCE: f32 = 0.2;

/// TCP connect timeout for the shared forum HTTP client
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// The routing and research engine, one instance per process
pub struct RivetEngine {
    config: RivetConfig,
    extractor: Arc<dyn IntentExtractor>,
    evaluator: CoverageEvaluator,
    reranker: Reranker,
    scorer: Arc<dyn ConfidenceScorer>,
    router: Router,
    synthesizer: ResponseSynthesizer,
    detector: GapDetector,
    gap_logger: Arc<GapLogger>,
    pipeline: Arc<ResearchPipeline>,
    queue: Arc<dyn IngestionQueue>,
    /// Handles of in-flight background research runs, drained by `shutdown`
    research_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RivetEngine {
    /// Connect the production collaborators and assemble the engine.
    ///
    /// This is the only fatal error path in the system: a bad configuration
    /// or unreachable store fails here, before any request is handled.
    pub async fn init(config: RivetConfig) -> Result<Self> {
        config.validate()?;

        let pool = storage::connect(&config.storage).await?;
        storage::migrate(&pool).await?;

        let embedder = Arc::new(HashingEmbedder::new(config.knowledge.vector_size as usize));
        let knowledge: Arc<dyn KnowledgeStore> =
            Arc::new(QdrantKnowledgeStore::connect(&config.knowledge, embedder).await?);

        let client = reqwest::Client::builder()
            .user_agent(&config.research.user_agent)
            .timeout(Duration::from_secs(config.research.provider_timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        let providers: Vec<Arc<dyn ForumProvider>> = vec![
            Arc::new(StackExchangeProvider::new(
                client.clone(),
                config.research.stackexchange_site.clone(),
            )),
            Arc::new(RedditProvider::new(client)),
        ];

        let gap_store = Arc::new(SqliteGapStore::new(pool.clone()));
        let fingerprints = Arc::new(SqliteFingerprintStore::new(pool.clone()));
        let queue = Arc::new(SqliteIngestionQueue::new(pool));

        Self::with_parts(config, knowledge, gap_store, providers, fingerprints, queue)
    }

    /// Assemble the engine from pre-built collaborators.
    ///
    /// `init` is the production path; this constructor exists for embedders
    /// and tests that bring their own stores and providers.
    pub fn with_parts(
        config: RivetConfig,
        knowledge: Arc<dyn KnowledgeStore>,
        gap_store: Arc<dyn GapStore>,
        providers: Vec<Arc<dyn ForumProvider>>,
        fingerprints: Arc<dyn FingerprintStore>,
        queue: Arc<dyn IngestionQueue>,
    ) -> Result<Self> {
        config.validate()?;

        let retriever = Arc::new(HybridRetriever::new(knowledge));
        let evaluator = CoverageEvaluator::new(retriever, config.coverage.clone());
        let gap_logger = Arc::new(GapLogger::new(gap_store, config.gaps.dedup_window_days));
        let pipeline = Arc::new(ResearchPipeline::new(
            providers,
            fingerprints,
            Arc::clone(&queue),
            config.research.clone(),
        ));

        Ok(Self {
            extractor: Arc::new(KeywordIntentExtractor::new()?),
            evaluator,
            reranker: Reranker::new(Arc::new(LexicalCrossEncoder)),
            scorer: Arc::new(HeuristicConfidenceScorer::new()),
            router: Router::new(config.routing.clone()),
            synthesizer: ResponseSynthesizer::new(config.synthesis.clone()),
            detector: GapDetector::new()?,
            gap_logger,
            pipeline,
            queue,
            research_tasks: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Handle one question end to end.
    ///
    /// The only error is an empty question; everything past that point
    /// degrades instead of failing.
    pub async fn handle(&self, request: &Request) -> Result<RivetResponse> {
        let query = request.combined_text();
        if query.trim().is_empty() {
            return Err(RivetError::InvalidRequest(
                "question text is empty".to_string(),
            ));
        }

        let intent = self.extractor.extract(&query).await?;
        debug!(
            vendor = intent.vendor.display_name(),
            equipment = intent.equipment_type.display_name(),
            confidence = intent.confidence,
            "intent extracted"
        );

        // Clarity gate before any retrieval: a vague question costs no
        // knowledge-base work.
        if self.router.needs_clarification(&intent) {
            info!(confidence = intent.confidence, "clarifying instead of routing");
            return Ok(clarify_response(&intent, &query));
        }

        let filter = SearchFilter::from_intent(&intent);
        let report = self.evaluator.evaluate(&query, &filter).await;
        let route = self.router.decide(&intent, report.level);
        let agent = AgentKind::select(&intent, &query);
        info!(
            route = route.display_name(),
            coverage = report.level.display_name(),
            agent = %agent.description(),
            docs = report.docs.len(),
            "request routed"
        );

        let response = match route {
            Route::Direct | Route::Enrich => {
                self.answer(&query, &request.user_id, &intent, &filter, report, route, agent)
                    .await
            }
            Route::Research => {
                self.research_answer(&query, &request.user_id, &intent, &filter, report, agent)
                    .await
            }
            // decide() cannot clarify once the gate above has passed
            Route::Clarify => clarify_response(&intent, &query),
        };

        Ok(response)
    }

    /// Direct and Enrich routes: answer from the store, and on Enrich also
    /// log a gap and start background research to thicken the coverage.
    #[allow(clippy::too_many_arguments)]
    async fn answer(
        &self,
        query: &str,
        user_id: &str,
        intent: &Intent,
        filter: &SearchFilter,
        report: CoverageReport,
        route: Route,
        agent: AgentKind,
    ) -> RivetResponse {
        let CoverageReport { level, docs } = report;
        let docs_found = docs.len();

        let docs = self
            .reranker
            .rerank(query, docs, self.router.answer_top_k())
            .await;
        let verdict = self.assess(query, &docs).await;
        let draft = self.draft(agent, intent, &docs, query).await;
        let synthesized = self.synthesizer.synthesize(&draft, &docs, intent, level);

        let enrich = route == Route::Enrich;
        let (priority_branch, gap_id) = if enrich {
            self.record_gap(intent, level, query, filter, user_id).await
        } else {
            (None, None)
        };

        let mut suggested_actions = Vec::new();
        if verdict.action == VerdictAction::Escalate {
            suggested_actions.push(
                "Escalate to the vendor's technical support if this is holding up production."
                    .to_string(),
            );
        }

        RivetResponse {
            text: synthesized.text,
            confidence: verdict.confidence,
            route_taken: route,
            citations: synthesized.citations,
            safety_warnings: synthesized.safety_warnings,
            suggested_actions,
            links: portal_links(intent),
            kb_enrichment_triggered: enrich,
            research_triggered: false,
            trace: RouteTrace {
                coverage: level,
                docs_found,
                route,
                agent,
                intent_confidence: intent.confidence,
                priority_branch,
                gap_id,
            },
        }
    }

    /// Research route: a best-effort draft with whatever the probe found,
    /// a fixed low confidence, and an explicit notice that research is
    /// running in the background.
    async fn research_answer(
        &self,
        query: &str,
        user_id: &str,
        intent: &Intent,
        filter: &SearchFilter,
        report: CoverageReport,
        agent: AgentKind,
    ) -> RivetResponse {
        let CoverageReport { level, docs } = report;
        let docs_found = docs.len();

        let docs = self
            .reranker
            .rerank(query, docs, self.router.answer_top_k())
            .await;
        let draft = self.draft(agent, intent, &docs, query).await;
        let synthesized = self.synthesizer.synthesize(&draft, &docs, intent, level);

        let (priority_branch, gap_id) = self.record_gap(intent, level, query, filter, user_id).await;

        let eta = self.config.research.eta_minutes;
        let text = format!(
            "{}\n\nI don't have verified material on this yet, so treat the above as general \
             guidance. I'm researching vendor and community sources now; ask again in about \
             {} minutes for a sourced answer.",
            synthesized.text, eta
        );

        RivetResponse {
            text,
            confidence: RESEARCH_ANSWER_CONFIDENCE,
            route_taken: Route::Research,
            citations: synthesized.citations,
            safety_warnings: synthesized.safety_warnings,
            suggested_actions: vec![format!("Ask again in about {} minutes.", eta)],
            links: portal_links(intent),
            kb_enrichment_triggered: false,
            research_triggered: true,
            trace: RouteTrace {
                coverage: level,
                docs_found,
                route: Route::Research,
                agent,
                intent_confidence: intent.confidence,
                priority_branch,
                gap_id,
            },
        }
    }

    /// Answer-quality verdict, degraded to a cautious midpoint if the
    /// scorer itself fails.
    async fn assess(&self, query: &str, docs: &[RetrievedDoc]) -> AnswerVerdict {
        match self.scorer.assess(query, docs).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "confidence scoring failed, answering with caution");
                AnswerVerdict {
                    confidence: 0.5,
                    action: VerdictAction::AnswerWithCaution,
                }
            }
        }
    }

    /// Draft from the selected agent, degraded to a short fallback if the
    /// agent fails.
    async fn draft(
        &self,
        agent: AgentKind,
        intent: &Intent,
        docs: &[RetrievedDoc],
        query: &str,
    ) -> String {
        match agent_for(agent).draft(intent, docs, query).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "agent draft failed, using fallback text");
                "I could not put together a detailed answer just now. Check the equipment \
                 manufacturer's documentation and try asking again."
                    .to_string()
            }
        }
    }

    /// Gap bookkeeping for the Enrich and Research routes: detect, log,
    /// and kick off a background research run. Returns the priority branch
    /// and logged gap id for the trace.
    async fn record_gap(
        &self,
        intent: &Intent,
        coverage: CoverageLevel,
        query: &str,
        filter: &SearchFilter,
        user_id: &str,
    ) -> (Option<PriorityBranch>, Option<String>) {
        let trigger = match self.detector.analyze(intent, coverage, query) {
            Some(trigger) => trigger,
            None => return (None, None),
        };

        let branch = trigger.priority_branch;
        let gap_id = self.gap_logger.log(query, intent, filter, user_id).await;
        self.spawn_research(trigger, intent.clone(), query.to_string());
        (Some(branch), gap_id)
    }

    /// Fire-and-forget research run. The handle is retained so `shutdown`
    /// can wait for runs still in flight.
    fn spawn_research(&self, trigger: IngestionTrigger, intent: Intent, query: String) {
        let pipeline = Arc::clone(&self.pipeline);
        let handle = tokio::spawn(async move {
            info!(
                trigger_id = %trigger.trigger_id,
                priority = trigger.priority.display_name(),
                sources = trigger.sources_to_try.len(),
                "research run starting"
            );
            let result = pipeline.run(&intent, &query).await;
            info!(
                trigger_id = %trigger.trigger_id,
                status = ?result.status,
                found = result.sources_found,
                queued = result.sources_queued,
                "research run finished"
            );
        });

        // A poisoned registry only loses shutdown tracking; the detached
        // run itself keeps going.
        if let Ok(mut tasks) = self.research_tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle);
        }
    }

    /// Run one research pass in the foreground and return its result.
    pub async fn research_now(&self, query: &str) -> Result<ResearchResult> {
        let intent = self.extractor.extract(query).await?;
        Ok(self.pipeline.run(&intent, query).await)
    }

    /// Oldest pending ingestion-queue entries, for the research command's
    /// summary output.
    pub async fn pending_sources(&self, limit: usize) -> Result<Vec<QueuedSource>> {
        self.queue.pending(limit).await
    }

    /// Wait for in-flight research runs to finish. Called once at process
    /// exit, after the last request.
    pub async fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = match self.research_tasks.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(_) => return,
        };
        if tasks.is_empty() {
            return;
        }

        info!(in_flight = tasks.len(), "waiting for research runs to finish");
        for task in tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "research task ended abnormally");
                }
            }
        }
    }

    /// Gap log access for the maintenance commands.
    pub fn gaps(&self) -> &GapLogger {
        &self.gap_logger
    }

    pub fn config(&self) -> &RivetConfig {
        &self.config
    }
}

/// Clarification response: one question per missing intent field, no
/// knowledge-base work done.
fn clarify_response(intent: &Intent, query: &str) -> RivetResponse {
    let mut questions = Vec::new();
    if intent.vendor.is_generic() {
        questions.push("Which manufacturer built the equipment?".to_string());
    }
    if !intent.equipment_type.is_known() {
        questions.push("What kind of equipment is it (drive, PLC, safety relay, HMI)?".to_string());
    }
    if intent.symptom.trim().is_empty() {
        questions.push("What is the machine doing, or failing to do, right now?".to_string());
    }
    if intent.fault_codes.is_empty() {
        questions.push("Is a fault code shown on the display or HMI?".to_string());
    }
    if questions.is_empty() {
        questions.push("Can you describe the problem in more detail?".to_string());
    }

    let text = format!(
        "I need a little more detail to give a useful answer.\n\n{}",
        questions
            .iter()
            .map(|q| format!("- {}", q))
            .collect::<Vec<_>>()
            .join("\n")
    );

    RivetResponse {
        text,
        confidence: intent.confidence,
        route_taken: Route::Clarify,
        citations: Vec::new(),
        safety_warnings: Vec::new(),
        suggested_actions: questions,
        links: Vec::new(),
        kb_enrichment_triggered: false,
        research_triggered: false,
        trace: RouteTrace {
            // no probe ran, so there is no coverage to report
            coverage: CoverageLevel::None,
            docs_found: 0,
            route: Route::Clarify,
            agent: AgentKind::select(intent, query),
            intent_confidence: intent.confidence,
            priority_branch: None,
            gap_id: None,
        },
    }
}

/// Official documentation portal for the identified vendor, when known
fn portal_links(intent: &Intent) -> Vec<String> {
    intent
        .vendor
        .portal_host()
        .map(|host| vec![format!("https://{}/", host)])
        .unwrap_or_default()
}
