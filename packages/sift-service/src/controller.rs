//! The round-based retrieval loop.
//!
//! Each round searches the enabled sources, runs the merge pipeline, filters the batch for
//! relevance, enriches the head of the accepted set and asks whether it is sufficient. When the
//! round budget runs out the controller returns what it has, and only an entirely empty run moves
//! on to the relaxed retry and then to the curated fallback.

use std::{collections::HashSet, mem, time::Duration};

use futures::future;
use serde::Serialize;
use tokio::time;
use tracing::Instrument;
use uuid::Uuid;

use sift_config::Config;
use sift_domain::{
	ResultItem, RetrievalPlan, SearchQuery, TargetScript, TimeWindow, fallback,
	pipeline::{self, PipelineOptions, PipelineStats},
	summary,
};

use crate::{
	Providers, SiftService, SourceKind,
	enricher::{self, EnrichStats},
	judge::{self, JudgeMode, Sufficiency},
	planner::{self, PlanSource},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	Satisfied,
	Exhausted,
	Relaxed,
	CuratedFallback,
}
impl Outcome {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Satisfied => "satisfied",
			Self::Exhausted => "exhausted",
			Self::Relaxed => "relaxed",
			Self::CuratedFallback => "curated_fallback",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelaxationLevel {
	#[default]
	None,
	TimeAndFilterRelaxed,
	CuratedFallback,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
	pub rounds: u32,
	pub raw_web: usize,
	pub raw_local: usize,
	pub raw_feed: usize,
	pub raw_total: usize,
	pub language_kept: usize,
	pub language_fallbacks: usize,
	pub deduped: usize,
	pub domain_kept: usize,
	pub judged: usize,
	pub accepted: usize,
	pub rejected: usize,
	pub relax_used: bool,
	pub relax_final: usize,
	pub curated_used: bool,
	pub fetch_success: usize,
	pub fetch_fail: usize,
	pub planner: PlanSource,
	pub filter_oracle_calls: usize,
	pub filter_rule_calls: usize,
	pub judge_oracle_calls: usize,
	pub judge_rule_calls: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
	pub run_id: Uuid,
	pub topic: String,
	pub plan: RetrievalPlan,
	pub items: Vec<ResultItem>,
	pub synthesis: String,
	pub outcome: Outcome,
	pub relaxation_level: RelaxationLevel,
	pub counters: Counters,
}

/// Controller states. `Searching` covers one full search, filter and judge round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
	Searching,
	Exhausted,
	RelaxedRetry,
	CuratedFallback,
}
impl State {
	fn as_str(self) -> &'static str {
		match self {
			Self::Searching => "searching",
			Self::Exhausted => "exhausted",
			Self::RelaxedRetry => "relaxed_retry",
			Self::CuratedFallback => "curated_fallback",
		}
	}
}

#[derive(Debug, Default)]
struct IterationState {
	round: u32,
	/// Grows across rounds and never shrinks.
	accepted: Vec<ResultItem>,
	accepted_urls: HashSet<String>,
	satisfied: bool,
	relaxation_level: RelaxationLevel,
}

struct Finish {
	items: Vec<ResultItem>,
	outcome: Outcome,
	/// Set when the sufficiency judge already produced the synthesis.
	synthesis: Option<String>,
}

struct Run<'a> {
	cfg: &'a Config,
	providers: &'a Providers,
	query: SearchQuery,
	plan: RetrievalPlan,
	state: IterationState,
	/// Every pipeline output across rounds, used when nothing was accepted.
	gathered: Vec<ResultItem>,
	counters: Counters,
}
impl Run<'_> {
	async fn drive(&mut self) -> Finish {
		let max_rounds = self.cfg.iteration.max_rounds;
		let mut state = State::Searching;

		loop {
			let next = match state {
				State::Searching => {
					if let Some(verdict) = self.round().await {
						self.state.satisfied = verdict.satisfied;

						if self.state.satisfied {
							return Finish {
								items: mem::take(&mut self.state.accepted),
								outcome: Outcome::Satisfied,
								synthesis: Some(verdict.synthesis),
							};
						}
					}

					if self.state.round >= max_rounds { State::Exhausted } else { State::Searching }
				},
				State::Exhausted => {
					if !self.state.accepted.is_empty() {
						return Finish {
							items: mem::take(&mut self.state.accepted),
							outcome: Outcome::Exhausted,
							synthesis: None,
						};
					}

					let gathered = pipeline::dedup_by_url(mem::take(&mut self.gathered));

					if !gathered.is_empty() {
						return Finish {
							items: gathered,
							outcome: Outcome::Exhausted,
							synthesis: None,
						};
					}

					State::RelaxedRetry
				},
				State::RelaxedRetry => {
					let items = self.relaxed_retry().await;

					if !items.is_empty() {
						return Finish { items, outcome: Outcome::Relaxed, synthesis: None };
					}

					State::CuratedFallback
				},
				State::CuratedFallback => {
					self.state.relaxation_level = RelaxationLevel::CuratedFallback;
					self.counters.curated_used = true;

					return Finish {
						items: fallback::curated_items(self.query.topic()),
						outcome: Outcome::CuratedFallback,
						synthesis: None,
					};
				},
			};

			if next != state {
				tracing::info!(from = state.as_str(), to = next.as_str(), "State transition.");
			}

			state = next;
		}
	}

	/// One search, filter and judge pass. Returns `None` when nothing has been accepted yet, in
	/// which case the sufficiency judge is not consulted.
	async fn round(&mut self) -> Option<Sufficiency> {
		self.state.round += 1;
		self.counters.rounds = self.state.round;

		let round = self.state.round;
		let sources = self.enabled_sources();
		let quota = self.round_quota();
		let topic = self.query.topic().to_string();

		tracing::info!(round, quota, sources = ?sources, "Round started.");

		let raw = self.fan_out(&sources, &topic, quota, self.plan.time_window).await;
		let language = if self.cfg.search.language_filter {
			TargetScript::from_name(&self.cfg.search.script)
		} else {
			None
		};
		let output = pipeline::process(
			raw,
			&PipelineOptions {
				language,
				allow_domains: &self.cfg.search.allow_domains,
				deny_domains: &self.cfg.search.deny_domains,
				domain_weights: &self.cfg.search.domain_weights,
				keywords: &self.plan.keywords,
			},
		);

		self.record_pipeline(&output.stats);
		self.gathered.extend(output.items.iter().cloned());

		let candidates = output.items.len();
		let verdict = judge::filter_batch(
			self.cfg,
			self.providers.completion.as_ref(),
			&self.query,
			&self.plan.keywords,
			output.items,
		)
		.await;

		if candidates > 0 {
			match verdict.mode {
				JudgeMode::Oracle => self.counters.filter_oracle_calls += 1,
				JudgeMode::Rule => self.counters.filter_rule_calls += 1,
			}
		}

		self.counters.judged += candidates;
		self.counters.rejected += verdict.rejected.len();

		for item in verdict.accepted {
			if self.state.accepted_urls.insert(item.url.clone()) {
				self.state.accepted.push(item);
			}
		}

		self.counters.accepted = self.state.accepted.len();

		debug_assert!(
			self.state.accepted.iter().all(|item| !item.url.is_empty()),
			"accepted item without URL"
		);
		tracing::info!(round, candidates, accepted = self.counters.accepted, "Batch filtered.");

		if self.state.accepted.is_empty() {
			return None;
		}

		if self.cfg.enrichment.enabled {
			let stats = enricher::enrich(
				self.cfg,
				self.providers.fetcher.as_ref(),
				&mut self.state.accepted,
				self.cfg.enrichment.top_k as usize,
			)
			.await;

			self.record_enrichment(stats);
		}

		let verdict = judge::judge_sufficiency(
			self.cfg,
			self.providers.completion.as_ref(),
			&self.query,
			&self.state.accepted,
		)
		.await;

		match verdict.mode {
			JudgeMode::Oracle => self.counters.judge_oracle_calls += 1,
			JudgeMode::Rule => self.counters.judge_rule_calls += 1,
		}

		tracing::info!(round, satisfied = verdict.satisfied, mode = ?verdict.mode, "Round judged.");

		Some(verdict)
	}

	/// Longest time window, no language or domain filtering, the topic plus fixed variants.
	/// The batch skips the relevance filter.
	async fn relaxed_retry(&mut self) -> Vec<ResultItem> {
		self.state.relaxation_level = RelaxationLevel::TimeAndFilterRelaxed;
		self.counters.relax_used = true;

		let sources = self.relaxed_sources();
		let quota = self.plan.quota;
		let mut raw = Vec::new();

		for query in fallback::relaxation_queries(self.query.topic()) {
			raw.extend(self.fan_out(&sources, &query, quota, TimeWindow::longest()).await);
		}

		let mut items = pipeline::process(
			raw,
			&PipelineOptions {
				language: None,
				allow_domains: &[],
				deny_domains: &[],
				domain_weights: &self.cfg.search.domain_weights,
				keywords: &self.plan.keywords,
			},
		)
		.items;

		items.truncate(quota as usize);

		self.counters.relax_final = items.len();

		items
	}

	/// Queries every source concurrently and concatenates in [`SourceKind::ALL`] order.
	async fn fan_out(
		&mut self,
		sources: &[SourceKind],
		query: &str,
		quota: u32,
		time_window: TimeWindow,
	) -> Vec<ResultItem> {
		let cfg = self.cfg;
		let providers = self.providers;
		let searches = sources
			.iter()
			.map(|kind| search_source(cfg, providers, *kind, query, quota, time_window));
		let batches = future::join_all(searches).await;
		let mut merged = Vec::new();

		for (kind, batch) in sources.iter().zip(batches) {
			match kind {
				SourceKind::Web => self.counters.raw_web += batch.len(),
				SourceKind::Local => self.counters.raw_local += batch.len(),
				SourceKind::Feed => self.counters.raw_feed += batch.len(),
			}

			self.counters.raw_total += batch.len();

			merged.extend(batch);
		}

		merged
	}

	fn enabled_sources(&self) -> Vec<SourceKind> {
		let plan = &self.plan;
		let feeds_configured = !self.cfg.sources.feeds.is_empty();

		SourceKind::ALL
			.into_iter()
			.filter(|kind| match kind {
				SourceKind::Web => plan.enable_web_search && !plan.domestic_only,
				SourceKind::Local => plan.enable_local_search,
				SourceKind::Feed => plan.enable_feed_search && feeds_configured,
			})
			.collect()
	}

	/// The enabled sources plus the feeds whenever any are configured.
	fn relaxed_sources(&self) -> Vec<SourceKind> {
		let enabled = self.enabled_sources();
		let feeds_configured = !self.cfg.sources.feeds.is_empty();

		SourceKind::ALL
			.into_iter()
			.filter(|kind| {
				enabled.contains(kind) || (*kind == SourceKind::Feed && feeds_configured)
			})
			.collect()
	}

	fn round_quota(&self) -> u32 {
		self.plan.quota.min(self.cfg.iteration.iter_size)
	}

	fn record_pipeline(&mut self, stats: &PipelineStats) {
		self.counters.language_kept += stats.language_kept;
		self.counters.deduped += stats.deduped;
		self.counters.domain_kept += stats.domain_kept;

		if stats.language_fallback {
			self.counters.language_fallbacks += 1;

			tracing::warn!(input = stats.input, "Language filter removed every item; bypassed.");
		}

		tracing::debug!(
			input = stats.input,
			language_kept = stats.language_kept,
			deduped = stats.deduped,
			domain_kept = stats.domain_kept,
			"Pipeline finished."
		);
	}

	fn record_enrichment(&mut self, stats: EnrichStats) {
		self.counters.fetch_success += stats.success;
		self.counters.fetch_fail += stats.fail;
	}
}

impl SiftService {
	/// Runs the retrieval loop for `topic`. Never fails and never returns an empty item list.
	pub async fn run(&self, topic: &str) -> RunReport {
		let run_id = Uuid::new_v4();
		let span = tracing::info_span!("run", %run_id, topic);

		self.run_with_id(run_id, topic).instrument(span).await
	}

	async fn run_with_id(&self, run_id: Uuid, topic: &str) -> RunReport {
		let cfg = &self.cfg;
		let query = SearchQuery::new(topic);
		let (plan, planner_source) =
			planner::plan(cfg, self.providers.completion.as_ref(), &query).await;

		tracing::info!(
			planner = ?planner_source,
			time_window = %plan.time_window,
			quota = plan.quota,
			keywords = plan.keywords.len(),
			"Plan ready."
		);

		let mut run = Run {
			cfg,
			providers: &self.providers,
			query,
			plan,
			state: IterationState::default(),
			gathered: Vec::new(),
			counters: Counters { planner: planner_source, ..Default::default() },
		};
		let Finish { mut items, outcome, synthesis } = run.drive().await;

		pipeline::sort_by_score(&mut items);
		items.truncate(run.plan.quota as usize);

		if outcome != Outcome::Satisfied && cfg.enrichment.enabled {
			let stats = enricher::enrich(
				cfg,
				self.providers.fetcher.as_ref(),
				&mut items,
				cfg.enrichment.top_k as usize,
			)
			.await;

			run.record_enrichment(stats);
		}

		let synthesis = match (synthesis, outcome) {
			(Some(text), _) => text,
			(None, Outcome::Exhausted) => format!(
				"达到最大轮次({})仍未满足需求。返回当前{}条较相关材料的初步汇总，建议继续检索或调整问题。",
				cfg.iteration.max_rounds,
				items.len()
			),
			(None, _) => summary::summarize(&items, run.query.topic()),
		};

		debug_assert!(!items.is_empty(), "run finished without items");
		tracing::info!(
			outcome = outcome.as_str(),
			rounds = run.counters.rounds,
			items = items.len(),
			"Run finished."
		);

		RunReport {
			run_id,
			topic: run.query.topic().to_string(),
			plan: run.plan,
			items,
			synthesis,
			outcome,
			relaxation_level: run.state.relaxation_level,
			counters: run.counters,
		}
	}
}

/// Calls one source under the configured ceiling. Errors and timeouts become an empty batch.
async fn search_source(
	cfg: &Config,
	providers: &Providers,
	kind: SourceKind,
	query: &str,
	quota: u32,
	time_window: TimeWindow,
) -> Vec<ResultItem> {
	let timeout = Duration::from_millis(cfg.sources.timeout_ms);
	let search = providers.source(kind).search(&cfg.sources, query, quota, time_window);

	match time::timeout(timeout, search).await {
		Ok(Ok(items)) => items,
		Ok(Err(err)) => {
			tracing::warn!(error = %err, source = kind.as_str(), "Source search failed.");

			Vec::new()
		},
		Err(_) => {
			tracing::warn!(
				source = kind.as_str(),
				timeout_ms = cfg.sources.timeout_ms,
				"Source search timed out."
			);

			Vec::new()
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn outcome_serializes_in_snake_case() {
		let json = serde_json::to_value(Outcome::CuratedFallback).expect("serialize");

		assert_eq!(json, "curated_fallback");
		assert_eq!(Outcome::CuratedFallback.as_str(), "curated_fallback");
	}

	#[test]
	fn relaxation_level_serializes_in_screaming_case() {
		let json = serde_json::to_value(RelaxationLevel::TimeAndFilterRelaxed).expect("serialize");

		assert_eq!(json, "TIME_AND_FILTER_RELAXED");
	}
}
