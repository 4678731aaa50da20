//! Phase-aware fan-out/fan-in orchestrator — the crate's centrepiece.
//!
//! The execution plan follows two patterns:
//!
//! - Supporting agents run concurrently via `tokio::spawn`, one task per
//!   agent, joined before synthesis begins.
//! - The Knowledge agent's output feeds into the next stage's input, since
//!   retrieved snippets need to land in the shared context before any other
//!   agent (including the primary) is invoked.
//!
//! Partial agent failures degrade the run instead of failing it outright: a
//! failed supporting agent still leaves a placeholder interaction behind so
//! the synthesis step and the caller both see that the call was attempted.

use crate::core::agent::{Agent, AgentResponse};
use crate::core::context_builder::{ContextBuilder, ContextInput};
use crate::core::error::CoreError;
use crate::core::event::{EventHandler, EventSink};
use crate::core::integration_agent::IntegrationAgent;
use crate::core::intent_gate::{self, Intent};
use crate::core::knowledge_agent::KnowledgeAgent;
use crate::core::metrics::MetricsCollector;
use crate::core::provider_registry::ProviderRegistry;
use crate::core::response_cache::ResponseCache;
use crate::core::types::{AgentRole, Interaction, ModelTier, RequestContext, ResponseMetadata, StreamEvent};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One request submitted to [`Coordinator::handle`].
#[derive(Debug, Clone, Default)]
pub struct CoordinatorRequest {
    pub query: String,
    pub explicit_role: Option<AgentRole>,
    pub context: ContextInput,
}

/// Final synthesised outcome of a [`Coordinator::handle`] call.
#[derive(Debug, Clone)]
pub struct CoordinatorResponse {
    pub content: String,
    pub interactions: Vec<Interaction>,
    pub metadata: ResponseMetadata,
}

/// Cooperative cancellation flag threaded through a single run. Checked
/// between stages; never interrupts an in-flight provider call.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Phase-to-primary-role mapping consulted before falling back to keyword scoring.
fn phase_primary_role(phase_id: &str) -> Option<AgentRole> {
    match phase_id {
        "ideation" => Some(AgentRole::Ideation),
        "requirements" => Some(AgentRole::Requirements),
        "validation" => Some(AgentRole::Validation),
        "strategy" => Some(AgentRole::Strategy),
        "scoring" => Some(AgentRole::Scoring),
        "export" => Some(AgentRole::Export),
        "market_research" => Some(AgentRole::Research),
        "analysis" => Some(AgentRole::Analysis),
        _ => None,
    }
}

/// Design has no single obvious owner: score Ideation, Requirements, and
/// Research against the query and route to whichever candidate matches best.
fn design_tie_break(query: &str) -> AgentRole {
    const CANDIDATES: [AgentRole; 3] = [AgentRole::Ideation, AgentRole::Requirements, AgentRole::Research];
    let mut best = (AgentRole::Ideation, -1.0f32);
    for (role, keywords) in keyword_table() {
        if !CANDIDATES.contains(role) {
            continue;
        }
        let score = score_keyword_match(query, keywords);
        if score > best.1 {
            best = (*role, score);
        }
    }
    best.0
}

const KEYWORD_CONFIDENCE_FLOOR: f32 = 0.3;

fn keyword_table() -> &'static [(AgentRole, &'static [&'static str])] {
    &[
        (AgentRole::Ideation, &["brainstorm", "idea", "ideate", "concept"]),
        (AgentRole::Research, &["research", "competit", "market", "trend", "benchmark"]),
        (
            AgentRole::Analysis,
            &["analyze", "analysis", "tradeoff", "compare", "evaluate", "swot", "feasibility", "risk"],
        ),
        (AgentRole::Validation, &["validate", "feasible", "risk", "assumption"]),
        (AgentRole::Strategy, &["strategy", "roadmap", "priorit", "positioning"]),
        (AgentRole::Requirements, &["requirement", "spec", "acceptance criteria", "user story"]),
        (AgentRole::Summary, &["summarize", "summary", "recap"]),
        (AgentRole::Scoring, &["score", "rank", "impact", "effort"]),
        (AgentRole::Export, &["export", "download", "report", "pdf", "prd", "document"]),
        (
            AgentRole::Integration,
            &["jira", "github", "ticket", "issue", "repo", "wiki", "confluence", "publish"],
        ),
    ]
}

fn score_keyword_match(query: &str, keywords: &[&str]) -> f32 {
    let lower = query.to_lowercase();
    let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count();
    if keywords.is_empty() {
        0.0
    } else {
        hits as f32 / keywords.len() as f32
    }
}

/// Choose the primary agent: explicit role wins, then phase mapping (Design
/// goes through [`design_tie_break`] instead of a fixed mapping), then
/// keyword scoring against a 0.3 confidence floor, defaulting to Ideation.
fn select_primary_role(request: &CoordinatorRequest) -> AgentRole {
    if let Some(role) = request.explicit_role {
        return role;
    }
    if let Some(phase_id) = &request.context.phase_id {
        if phase_id == "design" {
            return design_tie_break(&request.query);
        }
        if let Some(role) = phase_primary_role(phase_id) {
            return role;
        }
    }
    let mut best: Option<(AgentRole, f32)> = None;
    for (role, keywords) in keyword_table() {
        let score = score_keyword_match(&request.query, keywords);
        if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((*role, score));
        }
    }
    match best {
        Some((role, score)) if score >= KEYWORD_CONFIDENCE_FLOOR => role,
        _ => AgentRole::Ideation,
    }
}

/// Supporting agents: Knowledge always runs unless it is itself primary.
/// Other roles are added by keyword heuristics. Ideation is excluded from
/// that heuristic entirely outside an ideation-like phase, regardless of
/// what the primary role is — a non-ideation response should never pick up
/// brainstorming filler as a supporting contribution.
fn select_supporting_roles(request: &CoordinatorRequest, primary: AgentRole) -> Vec<AgentRole> {
    let mut roles = Vec::new();
    if primary != AgentRole::Knowledge {
        roles.push(AgentRole::Knowledge);
    }

    let ideation_like_phase = request.context.phase_id.as_deref() == Some("ideation");

    for (role, keywords) in keyword_table() {
        if *role == primary || *role == AgentRole::Knowledge {
            continue;
        }
        if *role == AgentRole::Ideation && !ideation_like_phase {
            continue;
        }
        if score_keyword_match(&request.query, keywords) >= KEYWORD_CONFIDENCE_FLOOR {
            roles.push(*role);
        }
    }
    roles
}

fn build_agent_standalone(
    provider_registry: &ProviderRegistry,
    cache: &Arc<ResponseCache>,
    metrics: &Arc<MetricsCollector>,
    config: &crate::core::config::CoreConfig,
    system_prompts: &HashMap<AgentRole, String>,
    role: AgentRole,
    tier: ModelTier,
) -> Result<Agent, CoreError> {
    let client = provider_registry.get_client(tier)?;
    let prompt = system_prompts
        .get(&role)
        .cloned()
        .unwrap_or_else(|| format!("You help with the {} aspect of product management.", role));
    Ok(Agent::new(
        role,
        client,
        tier,
        prompt,
        Arc::clone(cache),
        Arc::clone(metrics),
        config.clone(),
    ))
}

/// Run one supporting (non-Integration, non-Knowledge) agent to completion,
/// wrapping it in `AgentStart`/`AgentComplete`/`Error` events with
/// `internal: true`. Spawned as an independent `tokio::spawn` task per role.
async fn run_supporting_agent(
    role: AgentRole,
    provider_registry: Arc<ProviderRegistry>,
    cache: Arc<ResponseCache>,
    metrics: Arc<MetricsCollector>,
    config: crate::core::config::CoreConfig,
    system_prompts: Arc<HashMap<AgentRole, String>>,
    query: String,
    context: RequestContext,
    sink: EventSink,
) -> (AgentRole, Result<AgentResponse, CoreError>) {
    sink.emit(StreamEvent::AgentStart {
        seq: sink.next_seq(),
        agent: role,
        query: query.clone(),
        progress: 0.2,
        internal: true,
        timestamp: Utc::now(),
    })
    .await;

    let agent = match build_agent_standalone(&provider_registry, &cache, &metrics, &config, &system_prompts, role, ModelTier::Fast) {
        Ok(agent) => agent,
        Err(err) => {
            sink.emit(StreamEvent::Error {
                seq: sink.next_seq(),
                error: err.to_string(),
                agent: Some(role),
                error_type: "supporting_build_failure".into(),
                timestamp: Utc::now(),
            })
            .await;
            return (role, Err(err));
        }
    };

    let result = agent.process(&query, &context).await;
    emit_supporting_outcome(&sink, role, &result).await;
    (role, result)
}

/// Same wrapping as [`run_supporting_agent`], specialised for the Integration
/// role since it routes through [`IntegrationAgent::process`] instead of a
/// bare [`Agent`].
async fn run_integration_agent(
    integration_agent: Arc<IntegrationAgent>,
    query: String,
    context: RequestContext,
    sink: EventSink,
) -> (AgentRole, Result<AgentResponse, CoreError>) {
    sink.emit(StreamEvent::AgentStart {
        seq: sink.next_seq(),
        agent: AgentRole::Integration,
        query: query.clone(),
        progress: 0.2,
        internal: true,
        timestamp: Utc::now(),
    })
    .await;

    let result = integration_agent.process(&query, &context).await;
    emit_supporting_outcome(&sink, AgentRole::Integration, &result).await;
    (AgentRole::Integration, result)
}

async fn emit_supporting_outcome(sink: &EventSink, role: AgentRole, result: &Result<AgentResponse, CoreError>) {
    match result {
        Ok(response) => {
            sink.emit(StreamEvent::AgentComplete {
                seq: sink.next_seq(),
                agent: role,
                response: response.content.clone(),
                metadata: response.metadata.clone(),
                internal: true,
                timestamp: Utc::now(),
            })
            .await;
        }
        Err(err) => {
            sink.emit(StreamEvent::Error {
                seq: sink.next_seq(),
                error: err.to_string(),
                agent: Some(role),
                error_type: "supporting_failure".into(),
                timestamp: Utc::now(),
            })
            .await;
        }
    }
}

/// Fan-out/fan-in orchestrator owning the registry, cache, metrics, and the
/// per-role agent factory.
pub struct Coordinator {
    provider_registry: Arc<ProviderRegistry>,
    cache: Arc<ResponseCache>,
    metrics: Arc<MetricsCollector>,
    config: crate::core::config::CoreConfig,
    context_builder: ContextBuilder,
    knowledge_agent: KnowledgeAgent,
    integration_agent: Arc<IntegrationAgent>,
    system_prompts: Arc<HashMap<AgentRole, String>>,
}

impl Coordinator {
    pub fn new(
        provider_registry: Arc<ProviderRegistry>,
        cache: Arc<ResponseCache>,
        metrics: Arc<MetricsCollector>,
        config: crate::core::config::CoreConfig,
        context_builder: ContextBuilder,
        knowledge_agent: KnowledgeAgent,
        integration_agent: IntegrationAgent,
        system_prompts: HashMap<AgentRole, String>,
    ) -> Self {
        Coordinator {
            provider_registry,
            cache,
            metrics,
            config,
            context_builder,
            knowledge_agent,
            integration_agent: Arc::new(integration_agent),
            system_prompts: Arc::new(system_prompts),
        }
    }

    fn build_agent(&self, role: AgentRole, tier: ModelTier) -> Result<Agent, CoreError> {
        build_agent_standalone(
            &self.provider_registry,
            &self.cache,
            &self.metrics,
            &self.config,
            &self.system_prompts,
            role,
            tier,
        )
    }

    /// Fast path for a form field the user is actively editing: route
    /// straight to the field's owning agent at Fast tier, skipping knowledge
    /// retrieval, supporting fan-out, and tier escalation entirely. Used when
    /// `request.context.current_field` is set — a field-level help request is
    /// cheap and latency-sensitive, not a full synthesis turn.
    async fn handle_form_field_help(
        &self,
        request: &CoordinatorRequest,
        sink: &EventSink,
    ) -> Result<CoordinatorResponse, CoreError> {
        let primary_role = select_primary_role(request);
        let context = self.context_builder.build(request.context.clone()).await;
        let agent = self.build_agent(primary_role, ModelTier::Fast)?;
        let response = agent.process_with_sink(&request.query, &context, sink, false).await?;

        sink.emit(StreamEvent::Complete {
            seq: sink.next_seq(),
            response: response.content.clone(),
            interactions: Vec::new(),
            metadata: response.metadata.clone(),
            timestamp: Utc::now(),
        })
        .await;

        Ok(CoordinatorResponse {
            content: response.content,
            interactions: Vec::new(),
            metadata: response.metadata,
        })
    }

    /// Run the full pipeline for `request`, emitting [`StreamEvent`]s to
    /// `handler` as it progresses. Pass `Arc::new(NullEventHandler)` for a
    /// plain request/response call site.
    pub async fn handle(
        &self,
        request: CoordinatorRequest,
        handler: Arc<dyn EventHandler>,
        cancellation: &CancellationToken,
    ) -> Result<CoordinatorResponse, CoreError> {
        let sink = EventSink::new(handler);

        match intent_gate::classify(&request.query, &request.context.conversation_history) {
            Intent::Empty => {
                return Err(CoreError::InvalidRequest("empty message".into()));
            }
            Intent::Negative | Intent::Positive => {
                let content = short_circuit_reply(&request.query, request.context.phase_name.as_deref());
                sink.emit(StreamEvent::Complete {
                    seq: sink.next_seq(),
                    response: content.clone(),
                    interactions: Vec::new(),
                    metadata: ResponseMetadata::default(),
                    timestamp: Utc::now(),
                })
                .await;
                return Ok(CoordinatorResponse {
                    content,
                    interactions: Vec::new(),
                    metadata: ResponseMetadata::default(),
                });
            }
            Intent::Question | Intent::InfoRequest | Intent::Neutral => {}
        }

        if cancellation.is_cancelled() {
            return Err(CoreError::CancelledByClient);
        }

        if request.context.current_field.is_some() {
            return self.handle_form_field_help(&request, &sink).await;
        }

        let primary_role = select_primary_role(&request);
        let supporting_roles = select_supporting_roles(&request, primary_role);

        sink.emit(StreamEvent::Progress {
            seq: sink.next_seq(),
            progress: 0.05,
            message: format!("routing to {}", primary_role),
            timestamp: Utc::now(),
        })
        .await;

        let mut context = self.context_builder.build(request.context.clone()).await;
        let mut interactions = Vec::new();

        if supporting_roles.contains(&AgentRole::Knowledge) {
            if cancellation.is_cancelled() {
                return Err(CoreError::CancelledByClient);
            }
            sink.emit(StreamEvent::AgentStart {
                seq: sink.next_seq(),
                agent: AgentRole::Knowledge,
                query: request.query.clone(),
                progress: 0.1,
                internal: true,
                timestamp: Utc::now(),
            })
            .await;
            match self.knowledge_agent.process(&request.query, &context).await {
                Ok((response, snippets)) => {
                    if !response.metadata.partial {
                        context.knowledge_snippets = snippets;
                        sink.emit(StreamEvent::AgentComplete {
                            seq: sink.next_seq(),
                            agent: AgentRole::Knowledge,
                            response: response.content.clone(),
                            metadata: response.metadata.clone(),
                            internal: true,
                            timestamp: Utc::now(),
                        })
                        .await;
                        interactions.push(Interaction {
                            from_role: None,
                            to_role: AgentRole::Knowledge,
                            query: request.query.clone(),
                            response: response.content.clone(),
                            metadata: response.metadata,
                            timestamp: Utc::now(),
                        });
                    }
                }
                Err(err) => {
                    log::warn!("knowledge agent failed, continuing without it: {}", err);
                    sink.emit(StreamEvent::Error {
                        seq: sink.next_seq(),
                        error: err.to_string(),
                        agent: Some(AgentRole::Knowledge),
                        error_type: "supporting_failure".into(),
                        timestamp: Utc::now(),
                    })
                    .await;
                    interactions.push(placeholder_interaction(AgentRole::Knowledge, &request.query, &err));
                }
            }
        }

        sink.emit(StreamEvent::Progress {
            seq: sink.next_seq(),
            progress: 0.2,
            message: "running supporting agents".into(),
            timestamp: Utc::now(),
        })
        .await;

        let remaining: Vec<AgentRole> = supporting_roles
            .into_iter()
            .filter(|r| *r != AgentRole::Knowledge)
            .collect();

        if !remaining.is_empty() && !cancellation.is_cancelled() {
            let mut tasks = Vec::with_capacity(remaining.len());
            for role in remaining {
                let query = request.query.clone();
                let context_clone = context.clone();
                let sink_clone = sink.clone();
                if role == AgentRole::Integration {
                    let integration_agent = Arc::clone(&self.integration_agent);
                    tasks.push(tokio::spawn(run_integration_agent(
                        integration_agent,
                        query,
                        context_clone,
                        sink_clone,
                    )));
                    continue;
                }
                let provider_registry = Arc::clone(&self.provider_registry);
                let cache = Arc::clone(&self.cache);
                let metrics = Arc::clone(&self.metrics);
                let config = self.config.clone();
                let system_prompts = Arc::clone(&self.system_prompts);
                tasks.push(tokio::spawn(run_supporting_agent(
                    role,
                    provider_registry,
                    cache,
                    metrics,
                    config,
                    system_prompts,
                    query,
                    context_clone,
                    sink_clone,
                )));
            }

            for task in tasks {
                match task.await {
                    Ok((role, Ok(response))) if !response.metadata.partial => {
                        interactions.push(Interaction {
                            from_role: None,
                            to_role: role,
                            query: request.query.clone(),
                            response: response.content,
                            metadata: response.metadata,
                            timestamp: Utc::now(),
                        });
                    }
                    Ok((role, Ok(_))) => {
                        log::info!("supporting agent '{}' skipped (no contribution)", role);
                    }
                    Ok((role, Err(err))) => {
                        log::error!("supporting agent '{}' failed: {}", role, err);
                        interactions.push(placeholder_interaction(role, &request.query, &err));
                    }
                    Err(join_err) => {
                        log::error!("supporting agent task panicked: {}", join_err);
                    }
                }
            }
        }

        for interaction in &interactions {
            sink.emit(StreamEvent::Interaction {
                seq: sink.next_seq(),
                interaction: interaction.clone(),
                timestamp: Utc::now(),
            })
            .await;
        }

        if cancellation.is_cancelled() {
            return Err(CoreError::CancelledByClient);
        }

        let primary_tier = escalate_for_primary(self.config.model_tier);
        let primary_agent = self.build_agent(primary_role, primary_tier)?;

        let synthesis_query = render_synthesis_query(&request.query, &interactions);
        let primary_response = match primary_agent.process_with_sink(&synthesis_query, &context, &sink, false).await {
            Ok(response) => response,
            Err(err) => {
                sink.emit(StreamEvent::Error {
                    seq: sink.next_seq(),
                    error: err.to_string(),
                    agent: Some(primary_role),
                    error_type: "primary_failure".into(),
                    timestamp: Utc::now(),
                })
                .await;
                return Err(CoreError::PartialSynthesis {
                    agent: primary_role,
                    cause: err.to_string(),
                });
            }
        };

        sink.emit(StreamEvent::Complete {
            seq: sink.next_seq(),
            response: primary_response.content.clone(),
            interactions: interactions.clone(),
            metadata: primary_response.metadata.clone(),
            timestamp: Utc::now(),
        })
        .await;

        Ok(CoordinatorResponse {
            content: primary_response.content,
            interactions,
            metadata: primary_response.metadata,
        })
    }
}

/// Build the interaction recorded when a supporting agent errors out instead
/// of returning a response, so the synthesis step and the caller both see
/// that the call was attempted rather than silently missing.
fn placeholder_interaction(role: AgentRole, query: &str, err: &CoreError) -> Interaction {
    Interaction {
        from_role: None,
        to_role: role,
        query: query.to_string(),
        response: format!("[{} unavailable: {}]", role, err),
        metadata: ResponseMetadata {
            partial: true,
            rag_context: Some(format!("failed: {}", err)),
            ..Default::default()
        },
        timestamp: Utc::now(),
    }
}

/// Fast tier is escalated to Standard for primary synthesis only; supporting
/// agents always stay on Fast to keep fan-out latency low.
fn escalate_for_primary(tier: ModelTier) -> ModelTier {
    match tier {
        ModelTier::Fast => ModelTier::Standard,
        other => other,
    }
}

fn render_synthesis_query(query: &str, interactions: &[Interaction]) -> String {
    if interactions.is_empty() {
        return query.to_string();
    }
    let mut rendered = String::new();
    for interaction in interactions {
        rendered.push_str(&format!("[{}]: {}\n", interaction.to_role, interaction.response));
    }
    rendered.push_str("---\n");
    rendered.push_str(query);
    rendered
}

/// Trivial-turn reply, templated by the current phase so a bare "yes"/"no"
/// doesn't read as a generic chatbot acknowledgement. Falls back to a
/// phase-agnostic template when no phase name is available.
fn short_circuit_reply(query: &str, phase_name: Option<&str>) -> String {
    match intent_gate::classify(query, &[]) {
        Intent::Negative => match phase_name {
            Some(phase) => format!("Understood, let's hold off on that for {}.", phase),
            None => "Understood, let's hold off on that.".to_string(),
        },
        Intent::Positive => match phase_name {
            Some(phase) => format!("Great, let's continue with {}.", phase),
            None => "Great, let's continue.".to_string(),
        },
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_role_wins_over_everything() {
        let request = CoordinatorRequest {
            query: "research competitors".into(),
            explicit_role: Some(AgentRole::Export),
            context: ContextInput::default(),
        };
        assert_eq!(select_primary_role(&request), AgentRole::Export);
    }

    #[test]
    fn phase_mapping_used_when_no_explicit_role() {
        let request = CoordinatorRequest {
            query: "anything".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("validation".into()),
                ..Default::default()
            },
        };
        assert_eq!(select_primary_role(&request), AgentRole::Validation);
    }

    #[test]
    fn market_research_and_analysis_phase_mappings() {
        let research_request = CoordinatorRequest {
            query: "anything".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("market_research".into()),
                ..Default::default()
            },
        };
        assert_eq!(select_primary_role(&research_request), AgentRole::Research);

        let analysis_request = CoordinatorRequest {
            query: "anything".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("analysis".into()),
                ..Default::default()
            },
        };
        assert_eq!(select_primary_role(&analysis_request), AgentRole::Analysis);
    }

    #[test]
    fn design_phase_picks_best_of_three_candidates() {
        let request = CoordinatorRequest {
            query: "what are the acceptance criteria and user story for this".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("design".into()),
                ..Default::default()
            },
        };
        assert_eq!(select_primary_role(&request), AgentRole::Requirements);
    }

    #[test]
    fn keyword_scoring_falls_back_to_ideation_below_floor() {
        let request = CoordinatorRequest {
            query: "what should we build next".into(),
            explicit_role: None,
            context: ContextInput::default(),
        };
        assert_eq!(select_primary_role(&request), AgentRole::Ideation);
    }

    #[test]
    fn keyword_scoring_picks_matching_role() {
        let request = CoordinatorRequest {
            query: "research research research competitor".into(),
            explicit_role: None,
            context: ContextInput::default(),
        };
        assert_eq!(select_primary_role(&request), AgentRole::Research);
    }

    #[test]
    fn knowledge_always_supports_non_knowledge_primary() {
        let request = CoordinatorRequest {
            query: "summarize this".into(),
            explicit_role: Some(AgentRole::Summary),
            context: ContextInput::default(),
        };
        let supporting = select_supporting_roles(&request, AgentRole::Summary);
        assert!(supporting.contains(&AgentRole::Knowledge));
    }

    #[test]
    fn non_ideation_phase_excludes_ideation_as_supporting() {
        let request = CoordinatorRequest {
            query: "research competitor pricing, maybe brainstorm an idea too".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("validation".into()),
                ..Default::default()
            },
        };
        let supporting = select_supporting_roles(&request, AgentRole::Validation);
        assert!(!supporting.contains(&AgentRole::Ideation));
    }

    #[test]
    fn ideation_phase_allows_ideation_as_supporting() {
        let request = CoordinatorRequest {
            query: "brainstorm an idea while validating feasibility".into(),
            explicit_role: None,
            context: ContextInput {
                phase_id: Some("ideation".into()),
                ..Default::default()
            },
        };
        let supporting = select_supporting_roles(&request, AgentRole::Validation);
        assert!(supporting.contains(&AgentRole::Ideation));
    }

    #[test]
    fn escalation_only_applies_to_fast_tier() {
        assert_eq!(escalate_for_primary(ModelTier::Fast), ModelTier::Standard);
        assert_eq!(escalate_for_primary(ModelTier::Premium), ModelTier::Premium);
    }

    #[test]
    fn cancellation_token_reports_state() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn short_circuit_reply_names_the_phase() {
        let reply = short_circuit_reply("no", Some("Requirements"));
        assert!(reply.contains("Requirements"));
    }

    #[test]
    fn short_circuit_reply_falls_back_without_phase() {
        let reply = short_circuit_reply("yes", None);
        assert_eq!(reply, "Great, let's continue.");
    }
}
