//! Product references submitted with a render job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single render input: one product and its model source.
///
/// The queue treats this as an opaque payload except for `glb_link`, which is
/// required at enqueue time and collected into the job's manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    /// Dashboard-side product id, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable product name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    /// URL of the GLB model to render
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glb_link: Option<String>,
}

impl ProductRef {
    /// Construct a reference carrying only a GLB URL.
    pub fn with_glb(glb_link: impl Into<String>) -> Self {
        Self {
            glb_link: Some(glb_link.into()),
            ..Self::default()
        }
    }

    /// The GLB URL, if present and non-empty.
    pub fn glb_link(&self) -> Option<&str> {
        self.glb_link.as_deref().filter(|s| !s.is_empty())
    }

    /// Best available label for error messages.
    pub fn label(&self) -> &str {
        self.product_name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}
