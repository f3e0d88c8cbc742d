//! Per-operation content extraction from streamed records

use serde_json::Value;

/// Which API operation a streamed record belongs to.
///
/// Determines which field of the record carries the incremental fragment
/// and whether status-line semantics apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Generate,
    Chat,
    CreateModel,
    Pull,
    Push,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Chat => "chat",
            Self::CreateModel => "create",
            Self::Pull => "pull",
            Self::Push => "push",
        }
    }
}

/// Structured-output mode requested for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    #[default]
    None,
    /// `format: "json"`
    Json,
    /// `format: {...}` inline JSON schema
    Schema,
}

/// Extract the content fragment of one streamed record.
///
/// Never fails: a record without the expected field yields an empty
/// fragment, and structured-output reformatting falls back to the raw text
/// when the fragment is not yet a complete JSON document. Status fragments
/// carry a trailing line separator so successive status lines render
/// separately.
pub fn extract(kind: OperationKind, mode: FormatMode, record: &Value) -> String {
    match kind {
        OperationKind::Generate => {
            reformat(record["response"].as_str().unwrap_or_default(), mode)
        }
        OperationKind::Chat => reformat(
            record["message"]["content"].as_str().unwrap_or_default(),
            mode,
        ),
        OperationKind::CreateModel | OperationKind::Pull | OperationKind::Push => {
            match record["status"].as_str() {
                Some(status) if !status.is_empty() => format!("{status}\n"),
                _ => String::new(),
            }
        }
    }
}

/// Pretty-print a fragment that already forms a complete JSON document.
///
/// Partial fragments are expected mid-stream and pass through unchanged.
fn reformat(fragment: &str, mode: FormatMode) -> String {
    if fragment.is_empty() || mode == FormatMode::None {
        return fragment.to_string();
    }

    match serde_json::from_str::<Value>(fragment) {
        Ok(doc) => match serde_json::to_string_pretty(&doc) {
            Ok(pretty) => format!("{pretty}\n"),
            Err(_) => fragment.to_string(),
        },
        Err(_) => fragment.to_string(),
    }
}
