//! oEmbed photo records and the object URI rewrite.
//!
//! Only the fields the rewrite needs are typed; every other field of the
//! record is carried through untouched and in its original order.

use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{JsonCodec, Record, Rewrite};
use crate::template::{UriTemplate, object_id};

/// Template used when no other is configured.
pub const DEFAULT_OBJECT_URI_TEMPLATE: &str = "sfom://id/{id}";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub object_uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Photo {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.url)
    }
}

pub type PhotoCodec = JsonCodec<Photo>;

/// Replaces `object_uri` with a template expansion keyed by the object's id.
///
/// The id is the last path segment of the current `object_uri`.
#[derive(Clone, Debug)]
pub struct ObjectUriRewrite {
    template: UriTemplate,
}

impl ObjectUriRewrite {
    #[must_use]
    pub fn new(template: UriTemplate) -> Self {
        Self { template }
    }

    /// # Errors
    /// Fails when `template` is not a valid URI template.
    pub fn from_template(template: &str) -> Result<Self> {
        let template = UriTemplate::parse(template)
            .with_context(|| format!("parse object URI template {template:?}"))?;
        Ok(Self::new(template))
    }

    #[must_use]
    pub fn template(&self) -> &UriTemplate {
        &self.template
    }
}

impl Default for ObjectUriRewrite {
    fn default() -> Self {
        // The default template is a constant and always parses.
        Self::from_template(DEFAULT_OBJECT_URI_TEMPLATE)
            .unwrap_or_else(|e| panic!("default object URI template: {e:#}"))
    }
}

impl Rewrite<Photo> for ObjectUriRewrite {
    fn rewrite(&self, record: &mut Photo) -> Result<()> {
        let id = object_id(&record.object_uri)?;
        let values = HashMap::from([("id", id.as_str())]);
        record.object_uri = self.template.expand(&values);
        Ok(())
    }
}
