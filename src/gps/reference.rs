use std::fmt;

use super::GpsError;
use super::node::{Context, NodeId};

const WILDCARD: &str = "*";
const SEGMENT_COUNT: usize = 5;

/// One positional selector of a reference.
///
/// `Exact("")` is a legal selector and is distinct from `Any`: it is the slot
/// that context substitution fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Any,
    Exact(String),
}

impl Selector {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selector::Any => true,
            Selector::Exact(expected) => expected == value,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selector::Exact(s) if s.is_empty())
    }

    fn parse(segment: &str) -> Option<Self> {
        if segment == WILDCARD {
            return Some(Selector::Any);
        }
        segment
            .chars()
            .all(is_segment_char)
            .then(|| Selector::Exact(segment.to_string()))
    }

    fn fill(&mut self, default: Option<&String>) {
        if let Some(value) = default {
            if self.is_empty() {
                *self = Selector::Exact(value.clone());
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Any => f.write_str(WILDCARD),
            Selector::Exact(value) => f.write_str(value),
        }
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.')
}

fn is_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// A parsed `project:environment:configuration:type:name[#resource[.attribute]]`
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub project: Selector,
    pub environment: Selector,
    pub configuration: Selector,
    pub node_type: Selector,
    pub name: Selector,
    pub resource: Option<String>,
    pub attribute: Option<String>,
}

impl Reference {
    /// Parses a strict node reference: the type is concrete and the name is
    /// never empty.
    pub fn parse(text: &str) -> Result<Self, GpsError> {
        let reference = Self::parse_query(text)?;
        reference.ensure_addressable()?;
        Ok(reference)
    }

    /// Parses the lexical form only. Any selector may be `*` or empty; this is
    /// what bulk queries use.
    pub fn parse_query(text: &str) -> Result<Self, GpsError> {
        let (path, suffix) = match text.split_once('#') {
            Some((path, suffix)) => (path, Some(suffix)),
            None => (text, None),
        };

        let segments: Vec<&str> = path.split(':').collect();
        if segments.len() != SEGMENT_COUNT {
            return Err(GpsError::syntax(
                text,
                format!(
                    "expected {} ':'-separated segments, found {}",
                    SEGMENT_COUNT,
                    segments.len()
                ),
            ));
        }

        let mut selectors = Vec::with_capacity(SEGMENT_COUNT);
        for (position, segment) in segments.iter().enumerate() {
            let selector = Selector::parse(segment).ok_or_else(|| {
                GpsError::syntax(
                    text,
                    format!("segment {} '{}' has illegal characters", position + 1, segment),
                )
            })?;
            selectors.push(selector);
        }

        let (resource, attribute) = match suffix {
            Some(suffix) => parse_suffix(text, suffix)?,
            None => (None, None),
        };

        let mut selectors = selectors.into_iter();
        let mut next = || selectors.next().unwrap_or(Selector::Any);
        Ok(Self {
            project: next(),
            environment: next(),
            configuration: next(),
            node_type: next(),
            name: next(),
            resource,
            attribute,
        })
    }

    /// Checks the constraints a reference to a concrete node must satisfy.
    /// Runs after context substitution, so an empty name may still be filled
    /// in from `node_name`.
    pub fn ensure_addressable(&self) -> Result<(), GpsError> {
        match &self.node_type {
            Selector::Any => {
                return Err(GpsError::syntax(
                    &self.to_string(),
                    "the type segment cannot be '*'",
                ));
            }
            Selector::Exact(t) if t.is_empty() => {
                return Err(GpsError::syntax(
                    &self.to_string(),
                    "the type segment cannot be empty",
                ));
            }
            Selector::Exact(_) => {}
        }
        if self.name.is_empty() {
            return Err(GpsError::syntax(
                &self.to_string(),
                "the name segment cannot be empty",
            ));
        }
        Ok(())
    }

    /// Fills empty (never `*`) selectors from the context. The type is never
    /// defaulted.
    pub fn with_context(mut self, context: &Context) -> Self {
        self.project.fill(context.project.as_ref());
        self.environment.fill(context.environment.as_ref());
        self.configuration.fill(context.configuration.as_ref());
        self.name.fill(context.node_name.as_ref());
        self
    }

    pub fn matches(&self, id: &NodeId) -> bool {
        self.project.matches(&id.project)
            && self.environment.matches(&id.environment)
            && self.configuration.matches(&id.configuration)
            && self.node_type.matches(&id.node_type)
            && self.name.matches(&id.name)
    }
}

fn parse_suffix(
    text: &str,
    suffix: &str,
) -> Result<(Option<String>, Option<String>), GpsError> {
    let mut parts = suffix.split('.');
    let resource = parts.next().unwrap_or_default();
    let attribute = parts.next();

    if parts.next().is_some() {
        return Err(GpsError::syntax(
            text,
            "nested attribute paths are not supported",
        ));
    }
    if !is_token(resource) {
        return Err(GpsError::syntax(
            text,
            format!("'{}' is not a valid resource name", resource),
        ));
    }
    if let Some(attribute) = attribute {
        if !is_token(attribute) {
            return Err(GpsError::syntax(
                text,
                format!("'{}' is not a valid attribute name", attribute),
            ));
        }
    }

    Ok((Some(resource.to_string()), attribute.map(str::to_string)))
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.project, self.environment, self.configuration, self.node_type, self.name
        )?;
        if let Some(resource) = &self.resource {
            write!(f, "#{}", resource)?;
            if let Some(attribute) = &self.attribute {
                write!(f, ".{}", attribute)?;
            }
        }
        Ok(())
    }
}

/// Whether a declared string value is a reference to another node's resource.
///
/// Only strict references carrying a `#resource` suffix qualify, so plain
/// colon-delimited values such as ARNs pass through untouched.
pub fn is_node_reference(text: &str) -> bool {
    Reference::parse(text).is_ok_and(|r| r.resource.is_some())
}
