// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Output-text extraction from runner responses
//!
//! The runner's response shape depends on what executed the task (a shell
//! wrapper, an LLM gateway, a file tool), so the human-readable result is
//! recovered by duck typing: an ordered rule table tried in priority order,
//! first match wins.

use serde_json::Value;

struct ExtractionRule {
    #[allow(dead_code)]
    name: &'static str,
    extract: fn(&Value) -> Option<Value>,
}

/// Tried in order; chat-completion shapes win over flat fields so that an
/// LLM body carrying both `choices` and a generic `result` field yields the
/// message text.
const RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "chat_completion",
        extract: chat_completion_content,
    },
    ExtractionRule {
        name: "output",
        extract: output_field,
    },
    ExtractionRule {
        name: "content",
        extract: content_field,
    },
    ExtractionRule {
        name: "message",
        extract: message_field,
    },
    ExtractionRule {
        name: "result",
        extract: result_field,
    },
];

fn output_field(body: &Value) -> Option<Value> {
    field(body, "output")
}

fn content_field(body: &Value) -> Option<Value> {
    field(body, "content")
}

fn message_field(body: &Value) -> Option<Value> {
    field(body, "message")
}

fn result_field(body: &Value) -> Option<Value> {
    field(body, "result")
}

/// Best-effort extraction of a human-readable result from a runner response.
///
/// Non-string matches are stringified; returns `None` when no rule matches.
pub fn extract_output_text(body: &Value) -> Option<String> {
    RULES
        .iter()
        .find_map(|rule| (rule.extract)(body))
        .map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
}

fn field(body: &Value, key: &str) -> Option<Value> {
    body.get(key).filter(|value| !value.is_null()).cloned()
}

/// `choices[0].message.content`, the OpenAI-style chat completion shape
fn chat_completion_content(body: &Value) -> Option<Value> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")
        .filter(|value| !value.is_null())
        .cloned()
}
