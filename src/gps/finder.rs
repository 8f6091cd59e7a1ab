use super::node::{Context, NodeLike};
use super::reference::Reference;
use super::GpsError;

/// Resolves references against a fixed set of nodes.
///
/// `find_all` only fails on syntax; it returns an empty list when nothing
/// matches. `find` and `dereference` add the exactly-one / at-least-one
/// discipline needed when a declared reference must resolve to a concrete id.
#[derive(Debug, Clone)]
pub struct Finder<N> {
    nodes: Vec<N>,
    context: Context,
}

impl<N: NodeLike> Finder<N> {
    pub fn new(nodes: Vec<N>) -> Self {
        Self::with_context(nodes, Context::default())
    }

    pub fn with_context(nodes: Vec<N>, context: Context) -> Self {
        Self { nodes, context }
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Every node matching `text`, in node order.
    pub fn find_all(&self, text: &str) -> Result<Vec<&N>, GpsError> {
        self.find_all_in(text, &self.context)
    }

    pub fn find_all_in(&self, text: &str, context: &Context) -> Result<Vec<&N>, GpsError> {
        let reference = Reference::parse_query(text)?.with_context(context);
        Ok(self.matching(&reference))
    }

    /// The single node matching `text`.
    pub fn find(&self, text: &str) -> Result<&N, GpsError> {
        let mut matches = self.find_all(text)?;
        match matches.len() {
            0 => Err(GpsError::NotFound {
                reference: text.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(GpsError::NotUnique {
                reference: text.to_string(),
                count,
            }),
        }
    }

    /// Resolves `text`'s `#resource[.attribute]` suffix against every matching
    /// node, in node order.
    pub fn dereference(&self, text: &str) -> Result<Vec<String>, GpsError> {
        self.dereference_in(text, &self.context)
    }

    pub fn dereference_in(&self, text: &str, context: &Context) -> Result<Vec<String>, GpsError> {
        let reference = Reference::parse_query(text)?.with_context(context);
        reference.ensure_addressable()?;

        let resource = reference
            .resource
            .as_deref()
            .ok_or_else(|| GpsError::MissingResource {
                reference: text.to_string(),
            })?;

        let candidates = self.matching(&reference);
        if candidates.is_empty() {
            return Err(GpsError::NotFound {
                reference: text.to_string(),
            });
        }

        tracing::debug!(
            reference = text,
            candidates = candidates.len(),
            "dereferencing"
        );

        candidates
            .into_iter()
            .map(|node| {
                node.reference(resource, reference.attribute.as_deref())
                    .ok_or_else(|| GpsError::BadReference {
                        reference: text.to_string(),
                        node: node.identity().to_string(),
                        resource: resource.to_string(),
                    })
            })
            .collect()
    }

    fn matching(&self, reference: &Reference) -> Vec<&N> {
        self.nodes
            .iter()
            .filter(|node| reference.matches(node.identity()))
            .collect()
    }
}
