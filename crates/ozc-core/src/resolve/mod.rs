//! The Reference Resolver: dereferences `$ref`s across documents into a
//! flat registry of named types, breaks cycles, infers discriminator tags,
//! and assigns final names.

pub mod cache;
pub mod cycles;
pub mod discriminator;
pub mod lower;
pub mod pointer;
pub mod rename;

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::ResolveError;
use crate::ir::{NamedType, SchemaNode, TypeRegistry};
use crate::load::{DocumentLoader, Location};
use crate::normalize;
use crate::parse::{self, schema::SchemaOrRef};
use cache::DocumentCache;
use discriminator::TypeLookup;
use pointer::RefTarget;

/// Longest `$ref → $ref → ...` chain followed before giving up.
const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug)]
struct Entry {
    target: RefTarget,
    raw_name: String,
    description: Option<String>,
    state: EntryState,
}

#[derive(Debug)]
enum EntryState {
    Pending,
    Lowered(SchemaNode),
    Failed(ResolveError),
}

impl Entry {
    fn node(&self) -> Option<&SchemaNode> {
        match &self.state {
            EntryState::Lowered(node) => Some(node),
            _ => None,
        }
    }
}

/// Collects named types while schemas are lowered, then builds the final
/// registry in [`Resolver::finish`].
pub struct Resolver<'l> {
    loader: &'l dyn DocumentLoader,
    root: Location,
    cache: DocumentCache,
    entries: IndexMap<String, Entry>,
    queue: VecDeque<String>,
    diagnostics: Diagnostics,
}

impl<'l> Resolver<'l> {
    /// Start resolving from an already normalized root document. External
    /// documents it references are fetched up front.
    pub fn new(root: Location, document: Value, loader: &'l dyn DocumentLoader) -> Self {
        let mut cache = DocumentCache::new();
        cache.insert(root.clone(), document);
        cache.prefetch(loader, &root);
        Self {
            loader,
            root,
            cache,
            entries: IndexMap::new(),
            queue: VecDeque::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn root(&self) -> &Location {
        &self.root
    }

    /// Register every schema under the root's `components.schemas`, and
    /// everything they reference.
    pub fn register_components(&mut self) {
        let names: Vec<String> = self
            .cache
            .get(&self.root)
            .and_then(|doc| doc.pointer("/components/schemas"))
            .and_then(Value::as_object)
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default();
        for name in names {
            self.enqueue(pointer::component_target(&self.root, &name));
        }
        self.drain();
    }

    /// Lower a schema that is not itself a named type (a parameter or body
    /// schema). Types it references are registered. Also returns a message
    /// for every discriminator that was dropped or could not be inferred.
    pub fn lower_inline(
        &mut self,
        schema: &SchemaOrRef,
        base: &Location,
    ) -> Result<(SchemaNode, Vec<String>), ResolveError> {
        let lowered = lower::lower(schema, base)?;
        for target in lowered.targets.into_values() {
            self.enqueue(target);
        }
        self.drain();
        let mut node = lowered.node;
        let mut problems = lowered.ignored;
        problems.extend(
            discriminator::infer_all(&mut node, &Lookup(&self.entries))
                .into_iter()
                .map(|problem| format!("{problem}; compiled as an untagged union")),
        );
        Ok((node, problems))
    }

    /// Fetch the raw value a non-schema `$ref` (parameter, response, request
    /// body) points at, and the document it lives in.
    pub fn resolve_value(
        &mut self,
        base: &Location,
        reference: &str,
    ) -> Result<(Location, Value), ResolveError> {
        let target = RefTarget::parse(base, reference)?;
        let document = self.cache.ensure(self.loader, &target.location)?;
        let value = pointer::lookup(document, &target.pointer)
            .cloned()
            .ok_or_else(|| ResolveError::RefTargetNotFound(reference.to_string()))?;
        Ok((target.location, value))
    }

    fn enqueue(&mut self, target: RefTarget) {
        let key = target.key();
        if self.entries.contains_key(&key) {
            return;
        }
        self.entries.insert(
            key.clone(),
            Entry {
                raw_name: target.raw_name(),
                target,
                description: None,
                state: EntryState::Pending,
            },
        );
        self.queue.push_back(key);
    }

    fn drain(&mut self) {
        while let Some(key) = self.queue.pop_front() {
            let Some((target, raw_name)) = self
                .entries
                .get(&key)
                .map(|e| (e.target.clone(), e.raw_name.clone()))
            else {
                continue;
            };
            log::debug!("resolving {key}");
            let (state, description) = match self.lower_target(&target) {
                Ok((lowered, description)) => {
                    for next in lowered.targets.into_values() {
                        self.enqueue(next);
                    }
                    for message in lowered.ignored {
                        self.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::Discriminator,
                            raw_name.clone(),
                            message,
                        ));
                    }
                    (EntryState::Lowered(lowered.node), description)
                }
                Err(err) => (EntryState::Failed(err), None),
            };
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.state = state;
                entry.description = description;
            }
        }
    }

    fn lower_target(
        &mut self,
        target: &RefTarget,
    ) -> Result<(lower::Lowered, Option<String>), ResolveError> {
        let document = self.cache.ensure(self.loader, &target.location)?;
        let mut value = pointer::lookup(document, &target.pointer)
            .cloned()
            .ok_or_else(|| ResolveError::RefTargetNotFound(target.key()))?;
        if target.location != self.root {
            normalize::normalize_fragment(&mut value);
        }
        let schema = parse::schema_from_value(&value)
            .map_err(|e| ResolveError::NotASchema(target.key(), e.to_string()))?;
        let description = match &schema {
            SchemaOrRef::Schema(s) => s.description.clone(),
            _ => None,
        };
        Ok((lower::lower(&schema, &target.location)?, description))
    }

    /// Build the final registry: resolve aliases, drop failed types and their
    /// dependents, infer discriminators, mark cycle edges, and rename.
    pub fn finish(mut self) -> Resolution {
        self.drain();
        self.resolve_aliases();
        let dropped = self.drop_failed();
        self.infer_discriminators(&dropped);

        let live: Vec<&String> = self
            .entries
            .keys()
            .filter(|k| !dropped.contains(k.as_str()))
            .collect();

        let graph: IndexMap<String, IndexSet<String>> = live
            .iter()
            .filter_map(|key| {
                let node = self.entries[key.as_str()].node()?;
                Some((key.to_string(), node.references()))
            })
            .collect();
        let components = cycles::strongly_connected(&graph);

        let names = rename::assign_names(
            live.iter()
                .map(|key| (key.as_str(), self.entries[key.as_str()].raw_name.as_str())),
            &mut self.diagnostics,
        );

        let mut registry = TypeRegistry::new();
        for key in &live {
            let entry = &self.entries[key.as_str()];
            let Some(node) = entry.node() else {
                continue;
            };
            let mut node = node.clone();
            node.for_each_reference_mut(&mut |r| {
                r.deferred = components.is_cycle_edge(key, &r.target);
            });
            if rename::rewrite_references(&mut node, &names).is_err() {
                continue;
            }
            registry.insert(NamedType {
                name: names[key.as_str()].clone(),
                key: key.to_string(),
                description: entry.description.clone(),
                node,
                cyclic: components.cyclic.contains(key.as_str()),
            });
        }
        log::debug!(
            "resolved {} named type(s) from {} document(s)",
            registry.len(),
            self.cache.len()
        );

        let dropped = dropped
            .into_iter()
            .map(|key| {
                let raw = self.entries[key.as_str()].raw_name.clone();
                (key, raw)
            })
            .collect();
        Resolution {
            registry,
            names,
            dropped,
            diagnostics: self.diagnostics,
        }
    }

    /// Replace reference roots (`X: {$ref: Y}`) with the node they lead to.
    fn resolve_aliases(&mut self) {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in keys {
            let mut current = match self.entries[&key].node() {
                Some(SchemaNode::Reference(r)) => r.target.clone(),
                _ => continue,
            };
            let mut resolved = None;
            for _ in 0..MAX_ALIAS_DEPTH {
                match self.entries.get(&current).and_then(Entry::node) {
                    Some(SchemaNode::Reference(r)) => current = r.target.clone(),
                    Some(node) => {
                        resolved = Some(node.clone());
                        break;
                    }
                    // A failed or unknown target; dropped below as a dependency.
                    None => break,
                }
            }
            let reached_failure = !matches!(
                self.entries.get(&current).map(|e| &e.state),
                Some(EntryState::Lowered(_))
            );
            let Some(entry) = self.entries.get_mut(&key) else {
                continue;
            };
            match resolved {
                Some(node) => entry.state = EntryState::Lowered(node),
                None if reached_failure => {}
                None => entry.state = EntryState::Failed(ResolveError::Circular(entry.raw_name.clone())),
            }
        }
    }

    /// Failed types, plus everything that transitively depends on one.
    fn drop_failed(&mut self) -> IndexSet<String> {
        let mut dropped = IndexSet::new();
        for (key, entry) in &self.entries {
            if let EntryState::Failed(err) = &entry.state {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Resolution,
                    entry.raw_name.clone(),
                    err.to_string(),
                ));
                dropped.insert(key.clone());
            }
        }

        loop {
            let mut newly = Vec::new();
            for (key, entry) in &self.entries {
                if dropped.contains(key) {
                    continue;
                }
                let Some(node) = entry.node() else {
                    continue;
                };
                let missing = node
                    .references()
                    .into_iter()
                    .find(|target| dropped.contains(target) || !self.entries.contains_key(target));
                if let Some(target) = missing {
                    let dependency = self
                        .entries
                        .get(&target)
                        .map_or(target.clone(), |e| e.raw_name.clone());
                    newly.push((key.clone(), entry.raw_name.clone(), dependency));
                }
            }
            if newly.is_empty() {
                break;
            }
            for (key, raw_name, dependency) in newly {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SkippedDependency,
                    raw_name,
                    format!("skipped because `{dependency}` was skipped"),
                ));
                dropped.insert(key);
            }
        }
        dropped
    }

    fn infer_discriminators(&mut self, dropped: &IndexSet<String>) {
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|k| !dropped.contains(k.as_str()))
            .cloned()
            .collect();
        for key in keys {
            let Some(mut node) = self.entries[&key].node().cloned() else {
                continue;
            };
            let problems = discriminator::infer_all(&mut node, &Lookup(&self.entries));
            let entry = &mut self.entries[&key];
            for problem in problems {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Discriminator,
                    entry.raw_name.clone(),
                    format!("{problem}; compiled as an untagged union"),
                ));
            }
            entry.state = EntryState::Lowered(node);
        }
    }
}

struct Lookup<'a>(&'a IndexMap<String, Entry>);

impl TypeLookup for Lookup<'_> {
    fn node(&self, key: &str) -> Option<&SchemaNode> {
        self.0.get(key).and_then(Entry::node)
    }

    fn raw_name(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|e| e.raw_name.as_str())
    }
}

/// The outcome of resolution: the read-only registry plus what it takes
/// to finish nodes lowered outside of it.
#[derive(Debug)]
pub struct Resolution {
    pub registry: TypeRegistry,
    /// Registry key → final name.
    names: HashMap<String, String>,
    /// Registry key → raw name, for every skipped type.
    dropped: HashMap<String, String>,
    pub diagnostics: Diagnostics,
}

impl Resolution {
    /// Rewrite an inline node's references to final names. Fails with the
    /// raw name of the first skipped type it depends on.
    pub fn finalize(&self, node: &mut SchemaNode) -> Result<(), String> {
        rename::rewrite_references(node, &self.names)
            .map_err(|key| self.dropped.get(&key).cloned().unwrap_or(key))
    }

    /// Final name of the component schema `name`, if it survived.
    pub fn component_name(&self, root: &Location, name: &str) -> Option<&str> {
        let key = pointer::component_target(root, name).key();
        self.names.get(&key).map(String::as_str)
    }

    pub fn skipped(&self) -> HashSet<&str> {
        self.dropped.values().map(String::as_str).collect()
    }
}
