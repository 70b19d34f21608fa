//! The generation pipeline: prompts in, proposals out.
//!
//! [`GenerationPipeline`] is the production [`EventProposer`]. It renders
//! a prompt from the state snapshot, calls the LLM backend under its own
//! generation mutex (never the state lock), parses the reply, and
//! validates the attribution. Every failure on that path is absorbed into
//! the fixed fallback proposal; the synchronization engine never sees a
//! generation error.
//!
//! Backend calls are serialized by the generation mutex so a slow cycle
//! and a burst of interventions cannot stampede the API. The mutex is
//! held only for the HTTP round-trips, and commits happen strictly after
//! it is released.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{info, warn};

use boardroom_core::config::SimulationConfig;
use boardroom_core::propose::EventProposer;
use boardroom_types::{
    CompanyState, Delta, EventDraft, Executive, FeedPersona, InterventionKind, Proposal,
    Reaction, find_executive,
};

use crate::error::PipelineError;
use crate::llm::{BackendSettings, LlmBackend};
use crate::news::{Headline, NewsSource, RssNewsSource};
use crate::parse;
use crate::prompt::{PromptEngine, RenderedPrompt};
use crate::retry::RetryPolicy;

/// Percentage of audit interventions resolved by the routine branch
/// without consulting the backend.
const AUDIT_ROUTINE_PERCENT: u8 = 40;

/// How many executives are asked to comment on one event.
const COMMENTARY_PANEL: usize = 3;

/// How many bystander personas post about one event.
const FEED_SAMPLE: usize = 3;

/// Percentage chance each rival executive account joins the feed pile-on.
const VIP_CHIME_IN_PERCENT: u8 = 25;

/// How many fresh headlines are candidates for seeding.
const HEADLINE_POOL: usize = 5;

/// The actor all interventions are attributed to.
const INTERVENTION_PROPOSER: &str = "The Voice Above";

/// Behavior knobs that do not carry credentials.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Company display name used in prompts.
    pub company_name: String,
    /// Whether cycles may seed from a headline at all.
    pub news_enabled: bool,
    /// Percentage of cycles (0-100) that try a news-seeded event.
    pub news_percent: u8,
}

/// The production event proposer backed by an LLM.
pub struct GenerationPipeline<N> {
    backend: LlmBackend,
    prompts: PromptEngine,
    news: Option<N>,
    retry: RetryPolicy,
    executives: Vec<Executive>,
    feed_personas: Vec<FeedPersona>,
    settings: PipelineSettings,
    /// Serializes backend access. Never acquired while the state lock is
    /// held; the commit path starts only after this is released.
    generation_lock: Mutex<()>,
}

impl GenerationPipeline<RssNewsSource> {
    /// Assemble the full production pipeline from configuration.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, PipelineError> {
        let settings = BackendSettings::from_config(&config.llm)?;
        let backend = LlmBackend::from_settings(&settings)?;
        let prompts = PromptEngine::new(&config.llm.templates_dir)?;
        let news = if config.news.enabled {
            Some(RssNewsSource::new(
                config.news.feed_url.clone(),
                std::time::Duration::from_secs(config.news.timeout_secs),
            )?)
        } else {
            None
        };

        Ok(Self::new(
            backend,
            prompts,
            news,
            RetryPolicy {
                max_attempts: config.llm.max_attempts,
                backoff: std::time::Duration::from_millis(config.llm.backoff_ms),
            },
            config.executives.clone(),
            config.feed_personas.clone(),
            PipelineSettings {
                company_name: config.company.name.clone(),
                news_enabled: config.news.enabled,
                news_percent: config.news.percent,
            },
        ))
    }
}

impl<N: NewsSource> GenerationPipeline<N> {
    /// Assemble a pipeline from already-built parts.
    pub fn new(
        backend: LlmBackend,
        prompts: PromptEngine,
        news: Option<N>,
        retry: RetryPolicy,
        executives: Vec<Executive>,
        feed_personas: Vec<FeedPersona>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            backend,
            prompts,
            news,
            retry,
            executives,
            feed_personas,
            settings,
            generation_lock: Mutex::new(()),
        }
    }

    /// Call the backend with retries, serialized by the generation mutex.
    async fn generate(&self, prompt: &RenderedPrompt) -> Result<String, PipelineError> {
        let _held = self.generation_lock.lock().await;
        self.retry.run(|| self.backend.complete(prompt)).await
    }

    /// Decide whether this cycle seeds from a headline, and fetch one.
    async fn seed_headline(&self) -> Option<Headline> {
        if !self.settings.news_enabled || !roll_percent(self.settings.news_percent) {
            return None;
        }
        let source = self.news.as_ref()?;
        match source.latest().await {
            Ok(headlines) => pick_headline(headlines),
            Err(e) => {
                warn!(error = %e, "news fetch failed, generating an internal event");
                None
            }
        }
    }

    /// The prompt context shared by all generation tasks.
    fn context(
        &self,
        snapshot: &CompanyState,
        headline: Option<&Headline>,
    ) -> serde_json::Value {
        serde_json::json!({
            "company": self.settings.company_name,
            "resources": snapshot.resources,
            "reputation": snapshot.reputation,
            "rating": snapshot.rating,
            "executives": self.executives,
            "headline": headline,
        })
    }

    /// Run one prompt through generate-and-parse into a draft.
    async fn draft_from_prompt(
        &self,
        prompt: &RenderedPrompt,
    ) -> Result<EventDraft, PipelineError> {
        let raw = self.generate(prompt).await?;
        parse::parse_event_payload(&raw)
    }

    /// Replace an off-roster proposer with the default executive.
    fn validate_proposer(&self, draft: &mut EventDraft) {
        if find_executive(&self.executives, &draft.proposer).is_none() {
            let substitute = self
                .executives
                .first()
                .map_or_else(|| INTERVENTION_PROPOSER.to_owned(), |e| e.name.clone());
            warn!(
                claimed = %draft.proposer,
                substitute = %substitute,
                "proposer not on the roster, re-attributing"
            );
            draft.proposer = substitute;
        }
    }

    /// The fixed no-op draft a failed cycle degrades to.
    fn fallback_cycle_draft(&self) -> EventDraft {
        EventDraft {
            title: String::from("A quiet day"),
            description: String::from(
                "Nothing notable happens. Overhead accrues and everyone worries a little.",
            ),
            proposer: self
                .executives
                .first()
                .map_or_else(|| INTERVENTION_PROPOSER.to_owned(), |e| e.name.clone()),
            source_url: None,
            changes: Delta::from([
                (String::from("funds"), -10),
                (String::from("risk"), -5),
            ]),
        }
    }

    /// The fixed no-op draft a failed intervention degrades to.
    fn fallback_intervention_draft(kind: InterventionKind) -> EventDraft {
        let (title, description) = match kind {
            InterventionKind::Rumor => (
                "The rumor fails to spread",
                "The whisper campaign dies in a muted group chat.",
            ),
            InterventionKind::Audit => (
                "The audit stalls in committee",
                "Paperwork is requested about the paperwork.",
            ),
            InterventionKind::Edict => (
                "The edict is quietly ignored",
                "Middle management nods and changes nothing.",
            ),
        };
        EventDraft {
            title: title.to_owned(),
            description: description.to_owned(),
            proposer: INTERVENTION_PROPOSER.to_owned(),
            source_url: None,
            changes: Delta::new(),
        }
    }

    /// The deterministic routine-audit result taken on a share of audits.
    fn routine_audit_draft() -> EventDraft {
        EventDraft {
            title: String::from("Routine audit finds nothing actionable"),
            description: String::from(
                "The books balance. Several receipts are framed as a warning.",
            ),
            proposer: INTERVENTION_PROPOSER.to_owned(),
            source_url: None,
            changes: Delta::from([(String::from("risk"), -5)]),
        }
    }
}

impl<N: NewsSource> EventProposer for GenerationPipeline<N> {
    async fn propose_cycle(&self, snapshot: &CompanyState) -> Proposal {
        let headline = self.seed_headline().await;
        let context = self.context(snapshot, headline.as_ref());

        let prompt = match self.prompts.render_event(&context) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "event prompt render failed, using fallback");
                return Proposal::Fallback(self.fallback_cycle_draft());
            }
        };

        match self.draft_from_prompt(&prompt).await {
            Ok(mut draft) => {
                draft.source_url = headline.map(|h| h.link);
                self.validate_proposer(&mut draft);
                info!(title = %draft.title, proposer = %draft.proposer, "cycle event drafted");
                Proposal::Drafted(draft)
            }
            Err(e) => {
                warn!(error = %e, "cycle generation failed, using fallback");
                Proposal::Fallback(self.fallback_cycle_draft())
            }
        }
    }

    async fn propose_intervention(
        &self,
        kind: InterventionKind,
        snapshot: &CompanyState,
    ) -> Proposal {
        if kind == InterventionKind::Audit && roll_percent(AUDIT_ROUTINE_PERCENT) {
            info!("audit resolved by the routine branch");
            return Proposal::Drafted(Self::routine_audit_draft());
        }

        let context = self.context(snapshot, None);
        let prompt = match self.prompts.render_intervention(kind, &context) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, kind = kind.as_str(), "intervention prompt render failed");
                return Proposal::Fallback(Self::fallback_intervention_draft(kind));
            }
        };

        match self.draft_from_prompt(&prompt).await {
            Ok(mut draft) => {
                // Interventions come from outside the org chart.
                draft.proposer = INTERVENTION_PROPOSER.to_owned();
                info!(title = %draft.title, kind = kind.as_str(), "intervention drafted");
                Proposal::Drafted(draft)
            }
            Err(e) => {
                warn!(error = %e, kind = kind.as_str(), "intervention generation failed");
                Proposal::Fallback(Self::fallback_intervention_draft(kind))
            }
        }
    }

    async fn commentary(&self, draft: &EventDraft) -> BTreeMap<String, String> {
        let panel = sample_executives(&self.executives, COMMENTARY_PANEL);
        if panel.is_empty() {
            return BTreeMap::new();
        }

        let context = serde_json::json!({
            "company": self.settings.company_name,
            "event": draft,
            "executives": panel,
        });

        let result = match self.prompts.render_commentary(&context) {
            Ok(prompt) => self.generate(&prompt).await.and_then(|raw| {
                parse::parse_commentary(&raw)
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(comments) => comments
                .into_iter()
                .filter(|(name, _)| find_executive(&self.executives, name).is_some())
                .collect(),
            Err(e) => {
                warn!(error = %e, "commentary generation failed, using placeholders");
                panel
                    .iter()
                    .map(|e| (e.name.clone(), String::from("...")))
                    .collect()
            }
        }
    }

    async fn reactions(
        &self,
        draft: &EventDraft,
        comments: &BTreeMap<String, String>,
    ) -> Vec<Reaction> {
        let cast = sample_personas(&self.feed_personas);
        if cast.is_empty() {
            return Vec::new();
        }

        let context = serde_json::json!({
            "company": self.settings.company_name,
            "event": draft,
            "comments": comments,
            "personas": cast,
        });

        let result = match self.prompts.render_reaction(&context) {
            Ok(prompt) => self.generate(&prompt).await.and_then(|raw| {
                parse::parse_reactions(&raw)
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(parsed) => {
                let stamp = Utc::now().format("%H:%M").to_string();
                parsed
                    .into_iter()
                    .map(|r| {
                        let known = self
                            .feed_personas
                            .iter()
                            .find(|p| p.handle == r.handle || p.name == r.name);
                        Reaction {
                            name: known.map_or(r.name, |p| p.name.clone()),
                            handle: known.map_or(r.handle, |p| p.handle.clone()),
                            content: r.content,
                            is_vip: known.is_some_and(|p| p.is_vip),
                            timestamp: stamp.clone(),
                        }
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "reaction generation failed, skipping the feed");
                Vec::new()
            }
        }
    }
}

/// Roll a percentage chance. Scoped so the thread-local RNG never lives
/// across an await point.
fn roll_percent(percent: u8) -> bool {
    rand::rng().random_range(0..100_u8) < percent
}

/// Pick one headline at random from the freshest candidates.
fn pick_headline(headlines: Vec<Headline>) -> Option<Headline> {
    let pool: Vec<Headline> = headlines.into_iter().take(HEADLINE_POOL).collect();
    let mut rng = rand::rng();
    pool.choose(&mut rng).cloned()
}

/// Sample up to `count` executives for the commentary panel.
fn sample_executives(roster: &[Executive], count: usize) -> Vec<Executive> {
    let mut rng = rand::rng();
    roster.choose_multiple(&mut rng, count).cloned().collect()
}

/// Assemble the feed cast: a few bystanders, plus each rival executive
/// account with a small chance of chiming in.
fn sample_personas(personas: &[FeedPersona]) -> Vec<FeedPersona> {
    let bystanders: Vec<FeedPersona> =
        personas.iter().filter(|p| !p.is_vip).cloned().collect();
    let mut rng = rand::rng();
    let mut cast: Vec<FeedPersona> = bystanders
        .choose_multiple(&mut rng, FEED_SAMPLE)
        .cloned()
        .collect();

    for vip in personas.iter().filter(|p| p.is_vip) {
        if rng.random_range(0..100_u8) < VIP_CHIME_IN_PERCENT {
            cast.push(vip.clone());
        }
    }

    cast
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::llm::{BackendSettings, BackendType};

    use super::*;

    fn write_templates(dir: &std::path::Path) {
        std::fs::write(dir.join("situation.j2"), "Company {{ company }}.").unwrap();
        for name in ["event", "rumor", "audit", "edict", "commentary", "reaction"] {
            std::fs::write(dir.join(format!("{name}.j2")), format!("Task {name}."))
                .unwrap();
        }
    }

    fn temp_templates(tag: &str) -> PathBuf {
        let unique = format!(
            "boardroom_pipeline_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).unwrap();
        write_templates(&dir);
        dir
    }

    /// A news source with canned headlines.
    struct StubNews;

    impl NewsSource for StubNews {
        async fn latest(&self) -> Result<Vec<Headline>, PipelineError> {
            Ok(vec![Headline {
                title: String::from("Local company does thing"),
                link: String::from("https://example.com/thing"),
            }])
        }
    }

    /// A pipeline whose backend points at a dead port, so every
    /// generation attempt fails fast and the fallback branch is taken.
    fn dead_backend_pipeline(tag: &str) -> GenerationPipeline<StubNews> {
        let dir = temp_templates(tag);
        let backend = LlmBackend::from_settings(&BackendSettings {
            backend_type: BackendType::OpenAi,
            api_url: String::from("http://127.0.0.1:1"),
            api_key: String::from("test"),
            model: String::from("test-model"),
            request_timeout: Duration::from_millis(200),
        })
        .unwrap();

        GenerationPipeline::new(
            backend,
            PromptEngine::new(&dir).unwrap(),
            Some(StubNews),
            RetryPolicy {
                max_attempts: 1,
                backoff: Duration::ZERO,
            },
            boardroom_core::config::default_executives(),
            boardroom_core::config::default_feed_personas(),
            PipelineSettings {
                company_name: String::from("Wei Holdings"),
                news_enabled: false,
                news_percent: 0,
            },
        )
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_cycle_fallback() {
        let pipeline = dead_backend_pipeline("cycle_fallback");
        let proposal = pipeline.propose_cycle(&CompanyState::default()).await;

        assert!(proposal.is_fallback());
        let draft = proposal.into_draft();
        assert_eq!(draft.title, "A quiet day");
        assert_eq!(draft.changes.get("funds"), Some(&-10));
        assert_eq!(draft.changes.get("risk"), Some(&-5));
        assert_eq!(draft.proposer, "Cao Cao");
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_intervention_fallback() {
        let pipeline = dead_backend_pipeline("intervention_fallback");
        let proposal = pipeline
            .propose_intervention(InterventionKind::Rumor, &CompanyState::default())
            .await;

        assert!(proposal.is_fallback());
        let draft = proposal.into_draft();
        assert_eq!(draft.proposer, "The Voice Above");
        assert!(draft.changes.is_empty());
    }

    #[tokio::test]
    async fn failed_commentary_yields_placeholders_for_the_panel() {
        let pipeline = dead_backend_pipeline("commentary_fallback");
        let draft = GenerationPipeline::<StubNews>::routine_audit_draft();

        let comments = pipeline.commentary(&draft).await;
        assert_eq!(comments.len(), COMMENTARY_PANEL);
        assert!(comments.values().all(|c| c == "..."));
        // Placeholders are attributed to roster members only.
        assert!(comments
            .keys()
            .all(|name| find_executive(&pipeline.executives, name).is_some()));
    }

    #[tokio::test]
    async fn failed_reactions_leave_the_feed_untouched() {
        let pipeline = dead_backend_pipeline("reaction_fallback");
        let draft = GenerationPipeline::<StubNews>::routine_audit_draft();

        let reactions = pipeline.reactions(&draft, &BTreeMap::new()).await;
        assert!(reactions.is_empty());
    }

    #[test]
    fn validate_proposer_substitutes_unknown_names() {
        let pipeline = dead_backend_pipeline("validate");
        let mut draft = EventDraft {
            title: String::from("Coup attempt"),
            description: String::new(),
            proposer: String::from("Liu Bei"),
            source_url: None,
            changes: Delta::new(),
        };
        pipeline.validate_proposer(&mut draft);
        assert_eq!(draft.proposer, "Cao Cao");

        draft.proposer = String::from("Sima Yi");
        pipeline.validate_proposer(&mut draft);
        assert_eq!(draft.proposer, "Sima Yi");
    }

    #[test]
    fn routine_audit_draft_is_a_noop_risk_release() {
        let draft = GenerationPipeline::<StubNews>::routine_audit_draft();
        assert_eq!(draft.proposer, "The Voice Above");
        assert_eq!(draft.changes.get("risk"), Some(&-5));
    }

    #[test]
    fn persona_sampling_never_exceeds_the_cast() {
        let personas = boardroom_core::config::default_feed_personas();
        let vips = personas.iter().filter(|p| p.is_vip).count();
        for _ in 0..20 {
            let cast = sample_personas(&personas);
            assert!(cast.len() <= FEED_SAMPLE.saturating_add(vips));
        }
    }

    #[test]
    fn roll_percent_extremes() {
        assert!(!roll_percent(0));
        assert!(roll_percent(100));
    }

    #[test]
    fn headline_pick_comes_from_the_pool() {
        let headlines: Vec<Headline> = (0..10)
            .map(|i| Headline {
                title: format!("headline {i}"),
                link: format!("https://example.com/{i}"),
            })
            .collect();
        let eligible: Vec<String> = headlines
            .iter()
            .take(HEADLINE_POOL)
            .map(|h| h.title.clone())
            .collect();

        for _ in 0..20 {
            let picked = pick_headline(headlines.clone()).unwrap();
            assert!(eligible.contains(&picked.title));
        }
        assert!(pick_headline(Vec::new()).is_none());
    }
}
