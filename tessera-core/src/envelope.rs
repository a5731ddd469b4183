//! Remote response envelopes.
//!
//! Remotes answer in one of two shapes:
//!
//! ```text
//! wrapped: {"template": {"html": "...", "css": "...", "meta": {...}}}
//! flat:    {"markup": "...", "style": "...", "metadata": {...}}
//! ```
//!
//! `metadata` may arrive as a JSON object or as a pre-serialized string.
//! Both shapes decode once into [`TemplateBundle`]; publishing always
//! encodes the flat shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;
use crate::types::TemplateBundle;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BundleEnvelope {
    Wrapped { template: WrappedTemplate },
    Flat(FlatTemplate),
}

#[derive(Debug, Deserialize)]
pub struct WrappedTemplate {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlatTemplate {
    pub markup: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl BundleEnvelope {
    pub fn into_bundle(self) -> TemplateBundle {
        match self {
            BundleEnvelope::Wrapped { template } => TemplateBundle {
                markup: template.html,
                style: template.css,
                metadata: metadata_text(template.meta),
            },
            BundleEnvelope::Flat(flat) => TemplateBundle {
                markup: flat.markup,
                style: flat.style,
                metadata: metadata_text(flat.metadata),
            },
        }
    }
}

/// Decode a remote response body into the canonical bundle.
pub fn decode(body: &str) -> Result<TemplateBundle, RemoteError> {
    let envelope: BundleEnvelope = serde_json::from_str(body)?;
    Ok(envelope.into_bundle())
}

/// Encode a bundle for publishing (flat shape).
///
/// Metadata is always sent as a string so the remote stores exactly the
/// bytes that are on disk.
pub fn encode(bundle: &TemplateBundle) -> Result<String, RemoteError> {
    let metadata = if bundle.metadata.is_empty() {
        None
    } else {
        Some(Value::String(bundle.metadata.clone()))
    };
    let flat = FlatTemplate {
        markup: bundle.markup.clone(),
        style: bundle.style.clone(),
        metadata,
    };
    Ok(serde_json::to_string_pretty(&flat)?)
}

fn metadata_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => {
            let mut text = serde_json::to_string_pretty(&other).unwrap_or_default();
            text.push('\n');
            text
        }
    }
}
