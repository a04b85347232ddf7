//! Clarification engine
//!
//! Plans a single turn against copies of the session's order and
//! clarification queue. The session itself is never touched here; the
//! pipeline commits a [`TurnPlan`] only after the escalation gate has decided
//! the turn is answered locally.
//!
//! The dialogue state is derived from the queue head:
//!
//! | head                   | state                   |
//! |------------------------|-------------------------|
//! | none                   | `NoPending`             |
//! | continuation prompt    | `AwaitingContinuation`  |
//! | any other question     | `AwaitingClarification` |

use std::sync::Arc;

use kiosk_agent_config::{DialogueMessages, EngineConfig};
use kiosk_agent_core::{
    categories, ClarificationQueue, ClassificationResult, DialogueSession, Error, FallbackItem,
    FallbackResult, Intent, MenuCatalog, OptionsSchema, OrderItem, OrderState, Result,
    SemanticResponseMatcher, TemplateKind, TurnResponse,
};
use kiosk_agent_text_processing::{
    detect_response_cue, extract_options, OrderCandidate, OrderExtractor, ResponseCue,
};

/// Where the conversation stands before a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    NoPending,
    AwaitingContinuation,
    AwaitingClarification {
        /// Menu item the head question is about
        item: Option<String>,
        /// Order line the head question is about
        line: Option<usize>,
        /// Option category the head question asks for
        category: Option<String>,
    },
}

/// What a pending question refers to in the current order
#[derive(Debug, Clone, PartialEq, Eq)]
enum QuestionTarget {
    /// A specific order line; `category` is `None` when the wording names
    /// no known category
    Line {
        index: usize,
        category: Option<String>,
    },
    /// Every line of the item already has the category
    Answered,
    /// The item is no longer on the order
    Orphaned,
    Unknown,
}

/// Order, queue and response to commit for a local turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnPlan {
    pub order: OrderState,
    pub clarifications: ClarificationQueue,
    pub response: TurnResponse,
}

/// Result of planning a turn
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The engine has an answer. `semantic_hit` marks answers taken from a
    /// response template that matched the utterance.
    Handled { plan: TurnPlan, semantic_hit: bool },
    /// An order or option turn from which no change could be derived
    Miss(Error),
    /// Nothing local knows how to answer
    Unrecognized,
}

impl EngineOutcome {
    pub fn is_semantic_hit(&self) -> bool {
        matches!(
            self,
            EngineOutcome::Handled {
                semantic_hit: true,
                ..
            }
        )
    }

    pub fn into_plan(self) -> Option<TurnPlan> {
        match self {
            EngineOutcome::Handled { plan, .. } => Some(plan),
            _ => None,
        }
    }

    fn handled(plan: TurnPlan) -> Self {
        EngineOutcome::Handled {
            plan,
            semantic_hit: false,
        }
    }
}

/// Working copies for one turn
struct Draft {
    order: OrderState,
    queue: ClarificationQueue,
}

impl Draft {
    fn of(session: &DialogueSession) -> Self {
        Self {
            order: session.order.clone(),
            queue: session.clarifications.clone(),
        }
    }
}

pub struct ClarificationEngine {
    extractor: Arc<OrderExtractor>,
    catalog: Arc<dyn MenuCatalog>,
    matcher: Arc<dyn SemanticResponseMatcher>,
    messages: DialogueMessages,
    verify_threshold: f32,
}

impl ClarificationEngine {
    pub fn new(
        extractor: Arc<OrderExtractor>,
        matcher: Arc<dyn SemanticResponseMatcher>,
        messages: DialogueMessages,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            catalog: Arc::clone(extractor.catalog()),
            extractor,
            matcher,
            messages,
            verify_threshold: engine.verify_match_threshold,
        }
    }

    pub fn messages(&self) -> &DialogueMessages {
        &self.messages
    }

    /// State implied by the session's queue head
    pub fn state(&self, session: &DialogueSession) -> DialogueState {
        self.state_of(&session.clarifications, &session.order)
    }

    fn state_of(&self, queue: &ClarificationQueue, order: &OrderState) -> DialogueState {
        let Some(head) = queue.head() else {
            return DialogueState::NoPending;
        };
        if self.messages.is_continuation_prompt(head) {
            return DialogueState::AwaitingContinuation;
        }
        match self.target_of(head, order) {
            QuestionTarget::Line { index, category } => DialogueState::AwaitingClarification {
                item: order.items.get(index).map(|line| line.name.clone()),
                line: Some(index),
                category,
            },
            _ => DialogueState::AwaitingClarification {
                item: self.question_item(head),
                line: None,
                category: self.cue_category(head),
            },
        }
    }

    /// Plan a turn without mutating the session
    pub fn plan_turn(
        &self,
        session: &DialogueSession,
        text: &str,
        classification: &ClassificationResult,
    ) -> EngineOutcome {
        let mut draft = Draft::of(session);
        let state = self.state_of(&draft.queue, &draft.order);
        let intent = classification.intent;
        tracing::debug!(
            session_id = %session.id,
            state = ?state,
            intent = %intent,
            confidence = classification.confidence,
            "Planning turn"
        );

        match intent {
            Intent::Greeting => {
                let default = &self.messages.greeting;
                return self.conversational(draft, text, TemplateKind::Greeting, default);
            },
            Intent::Farewell => {
                let default = &self.messages.farewell;
                return self.conversational(draft, text, TemplateKind::Farewell, default);
            },
            _ => {},
        }

        if state == DialogueState::AwaitingContinuation {
            if intent == Intent::Order {
                if let Ok(candidate) = self.extractor.extract_order(text) {
                    return self.with_new_item(draft, candidate);
                }
            }
            match detect_response_cue(text) {
                Some(ResponseCue::Affirmative) => return self.continue_ordering(draft),
                Some(ResponseCue::Negative) => return self.complete_order(draft),
                None => {},
            }
        }

        match intent {
            Intent::Order => {
                let miss = match self.extractor.extract_order(text) {
                    Ok(candidate) => return self.with_new_item(draft, candidate),
                    Err(e) => e,
                };
                match self.apply_option_change(&mut draft, text, &state) {
                    Ok(()) => {
                        EngineOutcome::handled(self.finish(draft, &self.messages.option_applied))
                    },
                    Err(_) => EngineOutcome::Miss(miss),
                }
            },
            Intent::OptionSelection => match self.apply_option_change(&mut draft, text, &state) {
                Ok(()) => {
                    EngineOutcome::handled(self.finish(draft, &self.messages.option_applied))
                },
                Err(miss) => match self.extractor.extract_order(text) {
                    Ok(candidate) => self.with_new_item(draft, candidate),
                    Err(_) => EngineOutcome::Miss(miss),
                },
            },
            _ => {
                if matches!(state, DialogueState::AwaitingClarification { .. })
                    && self.apply_option_change(&mut draft, text, &state).is_ok()
                {
                    return EngineOutcome::handled(
                        self.finish(draft, &self.messages.option_applied),
                    );
                }
                self.casual(draft, text)
            },
        }
    }

    /// Fold a fallback result into the session's order and queue
    pub fn merge_fallback(&self, session: &DialogueSession, result: &FallbackResult) -> TurnPlan {
        let mut draft = Draft::of(session);

        if !result.is_order_related {
            let reply = result
                .casual_reply
                .clone()
                .unwrap_or_else(|| self.messages.casual.clone());
            return self.present(draft, reply);
        }

        let items: Vec<OrderItem> = result
            .items
            .iter()
            .filter_map(|item| self.verified_item(item))
            .collect();
        if items.is_empty() {
            if !result.items.is_empty() {
                tracing::warn!(
                    session_id = %session.id,
                    proposed = result.items.len(),
                    "No fallback item matched the catalog; keeping current order"
                );
            }
        } else {
            draft.order.replace_items(items);
        }
        if !result.special_requests.trim().is_empty() {
            draft.order.special_requests = result.special_requests.trim().to_string();
        }
        if result.total_price != draft.order.total_price {
            tracing::debug!(
                reported = result.total_price,
                computed = draft.order.total_price,
                "Fallback total differs from catalog total"
            );
        }

        let head_is_prompt = draft
            .queue
            .head()
            .map(|head| self.messages.is_continuation_prompt(head));
        match head_is_prompt {
            Some(true) => {
                draft.queue.dismiss_head();
            },
            Some(false) => {
                draft.queue.resolve_head();
            },
            None => {},
        }
        self.prune_pending(&mut draft);

        let proposed: Vec<&String> = result
            .clarification_items
            .iter()
            .filter(|q| !self.messages.is_continuation_prompt(q))
            .collect();
        if proposed.is_empty() {
            self.enqueue_missing(&mut draft);
        } else {
            for question in proposed {
                draft.queue.enqueue(question.trim());
            }
        }

        self.finish(draft, &self.messages.item_added)
    }

    fn with_new_item(&self, mut draft: Draft, candidate: OrderCandidate) -> EngineOutcome {
        match self.add_item(&mut draft, candidate) {
            Ok(()) => EngineOutcome::handled(self.finish(draft, &self.messages.item_added)),
            Err(e) => EngineOutcome::Miss(e),
        }
    }

    fn add_item(&self, draft: &mut Draft, candidate: OrderCandidate) -> Result<()> {
        let schema = self.catalog.options_schema(&candidate.menu_name)?;
        let options = applicable(candidate.options, &schema);

        if draft
            .queue
            .head()
            .is_some_and(|head| self.messages.is_continuation_prompt(head))
        {
            draft.queue.dismiss_head();
        }

        let item = OrderItem::new(candidate.menu_name, candidate.quantity, options, &schema);
        let missing = clarification_order(&item.missing_required_options);
        tracing::debug!(
            item = %item.name,
            quantity = item.quantity,
            options = ?item.options,
            missing = ?missing,
            "Adding order item"
        );
        let index = draft.order.add_item(item);

        for category in &missing {
            self.ask(draft, index, category);
        }
        Ok(())
    }

    /// Merge the options named in `text` into one existing item
    fn apply_option_change(
        &self,
        draft: &mut Draft,
        text: &str,
        state: &DialogueState,
    ) -> Result<()> {
        let change = self.extractor.extract_option_change(text)?;

        // Answers go to the line the head question is about, so repeated
        // lines of one item are filled in queue order.
        let head_line = match state {
            DialogueState::AwaitingClarification { line, .. } => {
                line.filter(|&index| index < draft.order.items.len())
            },
            _ => None,
        };
        let named_line = change.menu_name.as_deref().and_then(|name| {
            head_line
                .filter(|&index| draft.order.items[index].name == name)
                .or_else(|| self.first_open_line(&draft.order, name, &change.options))
                .or_else(|| draft.order.find_last(name))
        });
        let index = named_line
            .or(head_line)
            .or_else(|| draft.order.last_index())
            .ok_or_else(|| Error::ExtractionMiss(format!("no item to apply options to: {}", text)))?;

        let name = draft.order.items[index].name.clone();
        let schema = self.catalog.options_schema(&name)?;
        let options = applicable(change.options, &schema);
        if options.is_empty() {
            return Err(Error::ExtractionMiss(format!(
                "options in '{}' do not apply to {}",
                text, name
            )));
        }

        draft.order.apply_options(index, &options, &schema);
        tracing::debug!(item = %name, options = ?options, "Applied options");

        self.prune_pending(draft);
        if let Some(item) = draft.order.items.get(index) {
            for category in clarification_order(&item.missing_required_options) {
                self.ask(draft, index, &category);
            }
        }
        Ok(())
    }

    /// Earliest line of `name` still missing a category that `options` fill
    fn first_open_line(&self, order: &OrderState, name: &str, options: &[String]) -> Option<usize> {
        let schema = self.catalog.options_schema(name).ok()?;
        let wanted: Vec<&str> = options
            .iter()
            .filter_map(|option| schema.category_of(option))
            .collect();
        order.items.iter().position(|line| {
            line.name == name
                && line
                    .missing_required_options
                    .iter()
                    .any(|category| wanted.contains(&category.as_str()))
        })
    }

    /// Queue the question for `category` of line `index` unless a pending
    /// question already covers it. A line whose own wording was answered
    /// before (the order changed under it) is asked with the next free
    /// ordinal.
    fn ask(&self, draft: &mut Draft, index: usize, category: &str) {
        if self.is_asked(draft, index, category) {
            return;
        }
        let Some(line) = draft.order.items.get(index) else {
            return;
        };
        let templates = &self.messages.clarifications;
        let question = (line_ordinal(&draft.order, index)..)
            .map(|ordinal| templates.render_line(&line.name, ordinal, category))
            .find(|question| !draft.queue.is_resolved(question));
        if let Some(question) = question {
            draft.queue.enqueue(question);
        }
    }

    fn is_asked(&self, draft: &Draft, index: usize, category: &str) -> bool {
        draft.queue.pending().any(|question| {
            matches!(
                self.target_of(question, &draft.order),
                QuestionTarget::Line { index: i, category: Some(ref c) } if i == index && c == category
            )
        })
    }

    /// Resolve pending questions whose line has its category now; discard
    /// questions about items no longer ordered
    fn prune_pending(&self, draft: &mut Draft) {
        let mut satisfied = Vec::new();
        let mut orphaned = Vec::new();
        for question in draft.queue.pending() {
            if self.messages.is_continuation_prompt(question) {
                continue;
            }
            match self.target_of(question, &draft.order) {
                QuestionTarget::Line {
                    index,
                    category: Some(category),
                } if !draft.order.items[index]
                    .missing_required_options
                    .contains(&category) =>
                {
                    satisfied.push(question.to_string());
                },
                QuestionTarget::Answered => satisfied.push(question.to_string()),
                QuestionTarget::Orphaned => orphaned.push(question.to_string()),
                _ => {},
            }
        }

        for question in satisfied {
            draft.queue.resolve(&question);
        }
        for question in orphaned {
            draft.queue.discard(&question);
        }
    }

    fn enqueue_missing(&self, draft: &mut Draft) {
        for index in 0..draft.order.items.len() {
            for category in clarification_order(&draft.order.items[index].missing_required_options)
            {
                self.ask(draft, index, &category);
            }
        }
    }

    /// Response for a mutating turn: the head question when one is pending,
    /// else `success` with the continuation prompt queued.
    ///
    /// An order with unanswered required options always leaves a question
    /// at the head.
    fn finish(&self, mut draft: Draft, success: &str) -> TurnPlan {
        if draft.order.has_missing_options() {
            self.enqueue_missing(&mut draft);
            let prompt_first = draft
                .queue
                .head()
                .is_some_and(|head| self.messages.is_continuation_prompt(head));
            let question_waiting = draft
                .queue
                .pending()
                .any(|question| !self.messages.is_continuation_prompt(question));
            if prompt_first && question_waiting {
                draft.queue.dismiss_head();
            }
        }
        if draft.queue.is_empty() {
            draft.queue.enqueue(self.messages.continuation_prompt.clone());
        }
        let head = draft.queue.head().map(str::to_string);
        let message = match head.as_deref() {
            Some(question) if !self.messages.is_continuation_prompt(question) => {
                question.to_string()
            },
            _ => success.to_string(),
        };
        let response =
            TurnResponse::new(draft.order.clone(), message).with_clarification(head.as_deref());
        TurnPlan {
            order: draft.order,
            clarifications: draft.queue,
            response,
        }
    }

    /// Conversational reply that leaves the queue alone and repeats its head
    fn present(&self, draft: Draft, reply: String) -> TurnPlan {
        let head = draft.queue.head().map(str::to_string);
        let message = match head.as_deref() {
            Some(question) => format!("{} {}", reply.trim_end(), question),
            None => reply,
        };
        let response = TurnResponse::new(draft.order.clone(), message)
            .with_clarification(head.as_deref())
            .casual();
        TurnPlan {
            order: draft.order,
            clarifications: draft.queue,
            response,
        }
    }

    fn conversational(
        &self,
        draft: Draft,
        text: &str,
        kind: TemplateKind,
        default: &str,
    ) -> EngineOutcome {
        let hit = self.matcher.find_similar(text, Some(kind));
        let semantic_hit = hit.is_some();
        let reply = hit
            .or_else(|| self.matcher.random_by_type(kind))
            .map(|template| template.text)
            .unwrap_or_else(|| default.to_string());
        EngineOutcome::Handled {
            plan: self.present(draft, reply),
            semantic_hit,
        }
    }

    fn casual(&self, draft: Draft, text: &str) -> EngineOutcome {
        match self.matcher.find_similar(text, None) {
            Some(template) => {
                tracing::debug!(kind = %template.kind, score = ?template.score, "Template reply");
                EngineOutcome::Handled {
                    plan: self.present(draft, template.text),
                    semantic_hit: true,
                }
            },
            None => EngineOutcome::Unrecognized,
        }
    }

    fn continue_ordering(&self, mut draft: Draft) -> EngineOutcome {
        draft.queue.dismiss_head();
        let mut response = TurnResponse::new(draft.order.clone(), &self.messages.ask_next_item)
            .with_clarification(draft.queue.head());
        response.asking_for_more_items = true;
        EngineOutcome::handled(TurnPlan {
            order: draft.order,
            clarifications: draft.queue,
            response,
        })
    }

    fn complete_order(&self, mut draft: Draft) -> EngineOutcome {
        draft.queue.dismiss_head();
        let mut response = TurnResponse::new(draft.order.clone(), &self.messages.order_complete)
            .with_clarification(draft.queue.head());
        response.order_complete = true;
        EngineOutcome::handled(TurnPlan {
            order: draft.order,
            clarifications: draft.queue,
            response,
        })
    }

    /// Catalog-verified order line from a fallback item
    fn verified_item(&self, proposed: &FallbackItem) -> Option<OrderItem> {
        let name = match self.catalog.lookup(&proposed.name) {
            Ok(item) => item.name,
            Err(_) => match self.catalog.lookup_fuzzy(&proposed.name) {
                Ok(m) if m.score >= self.verify_threshold => m.name,
                _ => {
                    tracing::debug!(name = %proposed.name, "Dropping unknown fallback item");
                    return None;
                },
            },
        };
        let schema = self.catalog.options_schema(&name).ok()?;

        let mut options = Vec::new();
        for option in &proposed.options {
            if schema.category_of(option).is_some() {
                options.push(option.clone());
            } else {
                options.extend(extract_options(option));
            }
        }
        let options = applicable(options, &schema);
        Some(OrderItem::new(name, proposed.quantity.max(1), options, &schema))
    }

    /// Longest menu name contained in a question
    fn question_item(&self, question: &str) -> Option<String> {
        self.catalog
            .names()
            .into_iter()
            .filter(|name| question.contains(name.as_str()))
            .max_by_key(|name| name.chars().count())
    }

    fn cue_category(&self, question: &str) -> Option<String> {
        self.messages
            .clarifications
            .category_of(question)
            .map(str::to_string)
    }

    /// Resolve a question to an order line.
    ///
    /// Questions rendered here match one line's wording exactly. Anything
    /// else (fallback wording, or a line renumbered since it was asked) goes
    /// to the earliest line of the named item still missing the category.
    fn target_of(&self, question: &str, order: &OrderState) -> QuestionTarget {
        let question = question.trim();
        let templates = &self.messages.clarifications;
        for (index, line) in order.items.iter().enumerate() {
            let Ok(schema) = self.catalog.options_schema(&line.name) else {
                continue;
            };
            let ordinal = line_ordinal(order, index);
            if let Some(group) = schema
                .groups()
                .find(|group| templates.render_line(&line.name, ordinal, &group.category) == question)
            {
                return QuestionTarget::Line {
                    index,
                    category: Some(group.category.clone()),
                };
            };
        }

        let Some(item) = self.question_item(question) else {
            return QuestionTarget::Unknown;
        };
        let lines: Vec<usize> = order
            .items
            .iter()
            .enumerate()
            .filter(|(_, line)| line.name == item)
            .map(|(index, _)| index)
            .collect();
        let Some(&last) = lines.last() else {
            return QuestionTarget::Orphaned;
        };
        match self.cue_category(question) {
            Some(category) => lines
                .iter()
                .copied()
                .find(|&index| order.items[index].missing_required_options.contains(&category))
                .map_or(QuestionTarget::Answered, |index| QuestionTarget::Line {
                    index,
                    category: Some(category),
                }),
            None => QuestionTarget::Line {
                index: lines
                    .iter()
                    .copied()
                    .find(|&index| !order.items[index].is_complete())
                    .unwrap_or(last),
                category: None,
            },
        }
    }
}

/// 1-based position of line `index` among the lines with the same name
fn line_ordinal(order: &OrderState, index: usize) -> usize {
    let name = &order.items[index].name;
    order.items[..index]
        .iter()
        .filter(|line| &line.name == name)
        .count()
        + 1
}

/// Options the schema knows, deduplicated
fn applicable(options: Vec<String>, schema: &OptionsSchema) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for option in options {
        if schema.category_of(&option).is_some() && !kept.contains(&option) {
            kept.push(option);
        }
    }
    kept
}

/// Missing categories in asking order: temperature, size, then the rest in
/// schema order
fn clarification_order(missing: &[String]) -> Vec<String> {
    let mut ordered = missing.to_vec();
    ordered.sort_by_key(|category| {
        categories::CLARIFICATION_PRIORITY
            .iter()
            .position(|c| c == category)
            .unwrap_or(categories::CLARIFICATION_PRIORITY.len())
    });
    ordered
}
