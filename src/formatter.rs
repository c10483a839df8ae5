use crate::error::RecordError;
use crate::metric_data::{MetricTags, Unit};
use crate::record::{Field, Record, Tag};
use std::sync::Arc;

pub type ContextNameFormatter = Arc<dyn Fn(&[String], &str) -> String + Send + Sync>;
pub type MetricNameFormatter = Arc<dyn Fn(&str, &str, &Unit, &MetricTags) -> String + Send + Sync>;
pub type KeyFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Normalises identifiers (names, tag keys, field keys) before records are
/// batched. Tag values and field values are never touched.
#[derive(Clone)]
pub struct Formatter {
    pub context_name_formatter: Option<ContextNameFormatter>,
    pub metric_name_formatter: Option<MetricNameFormatter>,
    pub tag_key_formatter: Option<KeyFormatter>,
    pub field_key_formatter: Option<KeyFormatter>,
    pub lowercase: bool,
    /// Substitute for spaces in identifiers; `Some("")` removes them.
    pub replace_space: Option<String>,
}

impl Formatter {
    /// A formatter that leaves everything as it is.
    pub fn passthrough() -> Self {
        Formatter {
            context_name_formatter: None,
            metric_name_formatter: None,
            tag_key_formatter: None,
            field_key_formatter: None,
            lowercase: false,
            replace_space: None,
        }
    }

    pub fn with_context_formatter(
        mut self,
        formatter: impl Fn(&[String], &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.context_name_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_metric_formatter(
        mut self,
        formatter: impl Fn(&str, &str, &Unit, &MetricTags) -> String + Send + Sync + 'static,
    ) -> Self {
        self.metric_name_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_tag_formatter(mut self, formatter: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.tag_key_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_field_formatter(
        mut self,
        formatter: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.field_key_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_replace_space(mut self, replace_space: Option<&str>) -> Self {
        self.replace_space = replace_space.map(str::to_string);
        self
    }

    pub fn format_context_name(&self, context_stack: &[String], context_name: &str) -> String {
        let name = match self.context_name_formatter.as_ref() {
            Some(formatter) => formatter(context_stack, context_name),
            None => context_name.to_string(),
        };
        self.format_identifier(&name)
    }

    pub fn format_metric_name(&self, context: &str, name: &str, unit: &Unit, tags: &MetricTags) -> String {
        let name = match self.metric_name_formatter.as_ref() {
            Some(formatter) => formatter(context, name, unit, tags),
            None => name.to_string(),
        };
        self.format_identifier(&name)
    }

    pub fn format_tag_key(&self, key: &str) -> String {
        let key = match self.tag_key_formatter.as_ref() {
            Some(formatter) => formatter(key),
            None => key.to_string(),
        };
        self.format_identifier(&key)
    }

    pub fn format_field_key(&self, key: &str) -> String {
        let key = match self.field_key_formatter.as_ref() {
            Some(formatter) => formatter(key),
            None => key.to_string(),
        };
        self.format_identifier(&key)
    }

    /// Applies space replacement, then lowercasing.
    pub fn format_identifier(&self, identifier: &str) -> String {
        let replaced = match self.replace_space.as_deref() {
            Some(substitute) => identifier.replace(' ', substitute),
            None => identifier.to_string(),
        };
        if self.lowercase {
            replaced.to_lowercase()
        } else {
            replaced
        }
    }

    #[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
    pub fn format_record(&self, mut record: Record) -> Result<Record, RecordError> {
        // Rebuilds tags and fields so a hook producing an empty key is rejected.
        // Keys that collide after formatting keep only their first tag.

        record.name = self.format_identifier(&record.name);
        let mut tags: Vec<Tag> = Vec::with_capacity(record.tags.len());
        for tag in record.tags.iter() {
            let tag = Tag::new(self.format_tag_key(tag.key()), tag.value())?;
            if !tags.iter().any(|t| t.key() == tag.key()) {
                tags.push(tag);
            }
        }
        record.tags = tags;
        record.fields = record
            .fields
            .iter()
            .map(|f| Field::new(self.format_field_key(f.key()), f.value().clone()))
            .collect::<Result<Vec<Field>, RecordError>>()?;
        Ok(record)
    }
}

impl Default for Formatter {
    /// Lowercase identifiers, spaces become underscores, contexts are joined with '.'
    /// and metric names are prefixed with their context.
    fn default() -> Self {
        Formatter::passthrough()
            .with_lowercase(true)
            .with_replace_space(Some("_"))
            .with_context_formatter(|stack, name| {
                stack
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(name))
                    .filter(|s| !s.trim().is_empty())
                    .collect::<Vec<&str>>()
                    .join(".")
            })
            .with_metric_formatter(|context, name, _unit, _tags| {
                if context.trim().is_empty() {
                    name.to_string()
                } else {
                    format!("{}.{}", context, name)
                }
            })
    }
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter
            .debug_struct("Formatter")
            .field("lowercase", &self.lowercase)
            .field("replace_space", &self.replace_space)
            .field("context_name_formatter", &self.context_name_formatter.is_some())
            .field("metric_name_formatter", &self.metric_name_formatter.is_some())
            .field("tag_key_formatter", &self.tag_key_formatter.is_some())
            .field("field_key_formatter", &self.field_key_formatter.is_some())
            .finish()
    }
}
