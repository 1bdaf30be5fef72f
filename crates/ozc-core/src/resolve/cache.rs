use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde_json::Value;

use crate::error::ResolveError;
use crate::load::{DocumentLoader, Location, parse_document_text};
use crate::normalize::{self, walk};

/// Parsed documents by absolute location. Each location is parsed at most
/// once; when two fetches of the same location race, the first stored
/// result is kept and later ones are discarded.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<Location, Value>,
    failures: HashMap<Location, String>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: Location, document: Value) {
        self.documents.entry(location).or_insert(document);
    }

    pub fn get(&self, location: &Location) -> Option<&Value> {
        self.documents.get(location)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn is_known(&self, location: &Location) -> bool {
        self.documents.contains_key(location) || self.failures.contains_key(location)
    }

    /// Fetch every document reachable through `$ref`s from `from`,
    /// breadth-first. Each wave of new locations is fetched in parallel.
    pub fn prefetch(&mut self, loader: &dyn DocumentLoader, from: &Location) {
        let mut frontier = self.unseen_references(from);
        while !frontier.is_empty() {
            log::debug!("fetching {} external document(s)", frontier.len());
            let fetched: Vec<(Location, Result<Value, String>)> = frontier
                .into_par_iter()
                .map(|location| {
                    let result = fetch(loader, &location);
                    (location, result)
                })
                .collect();

            let mut next = BTreeSet::new();
            for (location, result) in fetched {
                match result {
                    Ok(document) => {
                        self.insert(location.clone(), document);
                        next.extend(self.unseen_references(&location));
                    }
                    Err(message) => {
                        log::debug!("failed to fetch {location}: {message}");
                        self.failures.entry(location).or_insert(message);
                    }
                }
            }
            frontier = next.into_iter().filter(|l| !self.is_known(l)).collect();
        }
    }

    /// The document at `location`, fetching it now if prefetch did not.
    pub fn ensure(
        &mut self,
        loader: &dyn DocumentLoader,
        location: &Location,
    ) -> Result<&Value, ResolveError> {
        if !self.is_known(location) {
            match fetch(loader, location) {
                Ok(document) => self.insert(location.clone(), document),
                Err(message) => {
                    self.failures.insert(location.clone(), message);
                }
            }
        }
        if let Some(message) = self.failures.get(location) {
            return Err(ResolveError::Fetch {
                location: location.to_string(),
                message: message.clone(),
            });
        }
        self.documents
            .get(location)
            .ok_or_else(|| ResolveError::RefTargetNotFound(location.to_string()))
    }

    /// Locations of other documents referenced from `location` that have not
    /// been fetched or attempted yet.
    fn unseen_references(&self, location: &Location) -> Vec<Location> {
        let Some(document) = self.documents.get(location) else {
            return Vec::new();
        };
        let mut out = BTreeSet::new();
        for reference in walk::collect_refs(document) {
            let document_part = reference.split_once('#').map_or(reference, |(doc, _)| doc);
            if document_part.is_empty() {
                continue;
            }
            if let Ok(target) = location.join(document_part)
                && &target != location
                && !self.is_known(&target)
            {
                out.insert(target);
            }
        }
        out.into_iter().collect()
    }
}

fn fetch(loader: &dyn DocumentLoader, location: &Location) -> Result<Value, String> {
    let text = loader.load(location).map_err(|e| e.to_string())?;
    let document = parse_document_text(&text, location).map_err(|e| e.to_string())?;
    Ok(normalize::normalize_external(document))
}
