//! Conversation history — an append-only list of turns shared by one session.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::pii::redact_pii;

/// Appended to content cut to fit the context budget.
pub const TRUNCATION_MARKER: &str = "…[truncated]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// A tool request as issued by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned id; the matching tool turn carries the same id.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocation>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_call: None,
            is_error: false,
            at: Utc::now(),
        }
    }

    /// Size used against the model's context budget. A tool result is sent
    /// with its call id only, so its call does not count again.
    pub fn char_len(&self) -> usize {
        let call = match (&self.role, &self.tool_call) {
            (Role::Agent, Some(c)) => c.name.len() + c.arguments.to_string().len(),
            _ => 0,
        };
        self.content.chars().count() + call
    }
}

/// Ordered turns of one analysis session. Turns are only ever appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends inbound user text. Redaction always runs here, so no caller can
    /// bypass it.
    pub fn push_user(&mut self, text: &str) -> &ConversationTurn {
        self.push(ConversationTurn::new(Role::User, redact_pii(text)))
    }

    pub fn push_agent_text(&mut self, text: impl Into<String>) -> &ConversationTurn {
        self.push(ConversationTurn::new(Role::Agent, text.into()))
    }

    pub fn push_tool_call(
        &mut self,
        preamble: Option<String>,
        call: ToolInvocation,
    ) -> &ConversationTurn {
        let mut turn = ConversationTurn::new(Role::Agent, preamble.unwrap_or_default());
        turn.tool_call = Some(call);
        self.push(turn)
    }

    /// Records the outcome of `call`. `is_error` marks a failed or rejected call.
    pub fn push_tool_result(
        &mut self,
        call: &ToolInvocation,
        content: impl Into<String>,
        is_error: bool,
    ) -> &ConversationTurn {
        let mut turn = ConversationTurn::new(Role::Tool, content.into());
        turn.tool_call = Some(call.clone());
        turn.is_error = is_error;
        self.push(turn)
    }

    fn push(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns appended at or after `index`.
    pub fn since(&self, index: usize) -> &[ConversationTurn] {
        &self.turns[index.min(self.turns.len())..]
    }

    /// Selects the turns sent to the model; their total `char_len` stays within
    /// `max_chars` unless the kept tool names alone are larger.
    ///
    /// The current instruction (the latest user turn) and the newest turn are
    /// always kept. Earlier runs are dropped whole, oldest first, then older
    /// turns of the current run; a tool call and its result are dropped
    /// together so the provider never sees an orphaned result. If the kept
    /// turns are still too large their content is truncated, tool results
    /// first and the instruction last.
    pub fn window(&self, max_chars: usize) -> Vec<ConversationTurn> {
        let total = total_chars(&self.turns);
        if total <= max_chars {
            return self.turns.clone();
        }

        let last = self.turns.len() - 1;
        let anchor = self
            .turns
            .iter()
            .rposition(|t| t.role == Role::User)
            .unwrap_or(0);
        let mut budget = total;

        // Earlier runs, one whole run at a time.
        let mut head = 0;
        while budget > max_chars && head < anchor {
            let next = self.turns[head + 1..anchor]
                .iter()
                .position(|t| t.role == Role::User)
                .map_or(anchor, |i| head + 1 + i);
            budget -= total_chars(&self.turns[head..next]);
            head = next;
        }

        let mut cut = anchor + 1;
        while budget > max_chars && cut < last {
            let is_call =
                self.turns[cut].role == Role::Agent && self.turns[cut].tool_call.is_some();
            let width = if is_call && self.turns[cut + 1].role == Role::Tool {
                2
            } else {
                1
            };
            // Never drop the newest turn, nor the call it answers.
            if cut + width > last {
                break;
            }
            budget -= total_chars(&self.turns[cut..cut + width]);
            cut += width;
        }

        let mut window = Vec::with_capacity(anchor + 1 - head + self.turns.len() - cut);
        window.extend_from_slice(&self.turns[head..=anchor]);
        window.extend_from_slice(&self.turns[cut..]);

        if budget > max_chars {
            let excess = budget - max_chars;
            debug!(excess, "Truncating kept turns to fit the context budget");
            let left = shrink_to_fit(&mut window, excess);
            if left > 0 {
                warn!(left, max_chars, "Conversation exceeds context budget after truncation");
            }
        }
        window
    }
}

fn total_chars(turns: &[ConversationTurn]) -> usize {
    turns.iter().map(ConversationTurn::char_len).sum()
}

/// Cuts up to `excess` characters out of `window` and returns what could not
/// be cut. Content goes first (tool results, then agent text, then user text,
/// largest turn first); tool arguments go last.
fn shrink_to_fit(window: &mut [ConversationTurn], mut excess: usize) -> usize {
    for role in [Role::Tool, Role::Agent, Role::User] {
        let mut order: Vec<usize> = (0..window.len())
            .filter(|&i| window[i].role == role)
            .collect();
        order.sort_by_key(|&i| Reverse(window[i].content.chars().count()));
        for i in order {
            if excess == 0 {
                return 0;
            }
            excess -= truncate_content(&mut window[i], excess);
        }
    }

    for turn in window.iter_mut() {
        if excess == 0 {
            break;
        }
        if let Some(call) = turn.tool_call.as_mut() {
            let before = call.arguments.to_string().len();
            if before > 2 {
                call.arguments = Value::Object(Map::new());
                excess = excess.saturating_sub(before - 2);
            }
        }
    }
    excess
}

/// Removes at least `excess` characters from the turn's content when it can,
/// marking the cut. Returns the number of characters removed.
fn truncate_content(turn: &mut ConversationTurn, excess: usize) -> usize {
    let len = turn.content.chars().count();
    if len == 0 {
        return 0;
    }
    let keep = len.saturating_sub(excess);
    let marker = TRUNCATION_MARKER.chars().count();
    let mut cut: String = if keep > marker {
        turn.content.chars().take(keep - marker).collect()
    } else {
        turn.content.chars().take(keep).collect()
    };
    if keep > marker {
        cut.push_str(TRUNCATION_MARKER);
    }
    let removed = len - cut.chars().count();
    turn.content = cut;
    removed
}
