//! Deterministic control-inheritance resolution
//!
//! For every target object, computes the set of modern controls declared for
//! the object itself or for any ancestor, walking `parent_id` pointers with
//! an instance-owned memo so shared ancestors are only walked once. A cycle
//! or a dangling parent reference is a fatal configuration error: the run
//! must halt before any AI calls are issued.

use crate::catalog::types::{Control, TargetObject, PROCESS_BUCKET_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Fatal hierarchy configuration errors.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("target-object hierarchy contains a cycle: {path}")]
    Cycle { path: String },

    #[error("target object '{child}' references nonexistent parent {parent}")]
    DanglingParent { child: String, parent: Uuid },

    #[error("target object '{name}' uses the reserved nil identifier")]
    ReservedIdentifier { name: String },
}

/// The resolved applied-control sets, keyed by target-object id. The nil
/// UUID keys the process-level bucket of untagged controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedControls {
    pub by_target: BTreeMap<Uuid, BTreeSet<String>>,
}

impl AppliedControls {
    /// Applicable controls for one target object. Missing ids yield an
    /// empty set; the caller decides whether that is noteworthy.
    pub fn for_target(&self, id: Uuid) -> BTreeSet<String> {
        self.by_target.get(&id).cloned().unwrap_or_default()
    }

    /// The process-level bucket of controls without any target-object tag.
    pub fn process_bucket(&self) -> BTreeSet<String> {
        self.for_target(PROCESS_BUCKET_ID)
    }
}

/// Resolver over one immutable snapshot of the hierarchy and control list.
/// The memo is owned by the instance, so independent runs and tests never
/// share cache state.
pub struct HierarchyResolver {
    objects: HashMap<Uuid, TargetObject>,
    declared: HashMap<String, BTreeSet<String>>,
    untagged: BTreeSet<String>,
    memo: HashMap<Uuid, BTreeSet<String>>,
}

impl HierarchyResolver {
    pub fn new(objects: &[TargetObject], controls: &[Control]) -> Result<Self, HierarchyError> {
        for object in objects {
            if object.id == PROCESS_BUCKET_ID {
                return Err(HierarchyError::ReservedIdentifier {
                    name: object.name.clone(),
                });
            }
        }

        let mut declared: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut untagged = BTreeSet::new();
        for control in controls {
            if control.target_objects.is_empty() {
                untagged.insert(control.id.clone());
                continue;
            }
            for name in &control.target_objects {
                declared
                    .entry(name.clone())
                    .or_default()
                    .insert(control.id.clone());
            }
        }

        Ok(Self {
            objects: objects.iter().map(|o| (o.id, o.clone())).collect(),
            declared,
            untagged,
            memo: HashMap::new(),
        })
    }

    /// Resolves the applied-control set for every target object plus the
    /// process-level bucket.
    pub fn resolve_all(mut self) -> Result<AppliedControls, HierarchyError> {
        let mut ids: Vec<Uuid> = self.objects.keys().copied().collect();
        ids.sort();

        let mut by_target = BTreeMap::new();
        for id in ids {
            let set = self.resolve(id)?;
            by_target.insert(id, set);
        }
        by_target.insert(PROCESS_BUCKET_ID, self.untagged.clone());

        info!(
            "Resolved applied controls for {} target objects ({} process-level controls)",
            by_target.len() - 1,
            self.untagged.len()
        );
        Ok(AppliedControls { by_target })
    }

    /// Resolves one target object by walking the ancestor chain upward until
    /// a root, a memoized ancestor, a cycle, or a dangling parent is hit,
    /// then folding the inherited sets back down into the memo.
    pub fn resolve(&mut self, id: Uuid) -> Result<BTreeSet<String>, HierarchyError> {
        if let Some(cached) = self.memo.get(&id) {
            return Ok(cached.clone());
        }

        let mut chain: Vec<Uuid> = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut inherited: BTreeSet<String> = BTreeSet::new();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            if let Some(cached) = self.memo.get(&current) {
                inherited = cached.clone();
                break;
            }
            if !seen.insert(current) {
                return Err(HierarchyError::Cycle {
                    path: self.describe_chain(&chain, current),
                });
            }
            let object = match self.objects.get(&current) {
                Some(object) => object,
                None => {
                    let child = chain
                        .last()
                        .and_then(|id| self.objects.get(id))
                        .map(|o| o.name.clone())
                        .unwrap_or_else(|| current.to_string());
                    return Err(HierarchyError::DanglingParent {
                        child,
                        parent: current,
                    });
                }
            };
            chain.push(current);
            cursor = object.parent_id;
        }

        for &current in chain.iter().rev() {
            let name = &self.objects[&current].name;
            let mut set = inherited.clone();
            if let Some(own) = self.declared.get(name) {
                set.extend(own.iter().cloned());
            }
            debug!(
                "Applied controls for '{}': {} (inherited {})",
                name,
                set.len(),
                inherited.len()
            );
            self.memo.insert(current, set.clone());
            inherited = set;
        }

        Ok(inherited)
    }

    fn describe_chain(&self, chain: &[Uuid], repeated: Uuid) -> String {
        chain
            .iter()
            .chain(std::iter::once(&repeated))
            .map(|id| {
                self.objects
                    .get(id)
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: u128, name: &str, parent: Option<u128>) -> TargetObject {
        TargetObject {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            definition: String::new(),
            parent_id: parent.map(Uuid::from_u128),
        }
    }

    fn control(id: &str, tags: &[&str]) -> Control {
        Control {
            id: id.to_string(),
            title: id.to_string(),
            statement: String::new(),
            parameters: Vec::new(),
            target_objects: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn four_level_hierarchy_unions_ancestor_controls() {
        // Root -> Infrastructure -> Server -> Web Server, with overlapping tags.
        let objects = vec![
            target(1, "Root", None),
            target(2, "Infrastructure", Some(1)),
            target(3, "Server", Some(2)),
            target(4, "Web Server", Some(3)),
        ];
        let controls = vec![
            control("C.1", &["Root"]),
            control("C.2", &["Infrastructure", "Server"]),
            control("C.3", &["Server"]),
            control("C.4", &["Web Server"]),
            control("C.5", &[]),
        ];

        let resolver = HierarchyResolver::new(&objects, &controls).unwrap();
        let applied = resolver.resolve_all().unwrap();

        assert_eq!(applied.for_target(Uuid::from_u128(1)), set(&["C.1"]));
        assert_eq!(
            applied.for_target(Uuid::from_u128(3)),
            set(&["C.1", "C.2", "C.3"])
        );
        assert_eq!(
            applied.for_target(Uuid::from_u128(4)),
            set(&["C.1", "C.2", "C.3", "C.4"])
        );
        assert_eq!(applied.process_bucket(), set(&["C.5"]));
    }

    #[test]
    fn overlapping_tags_are_deduplicated() {
        let objects = vec![target(1, "A", None), target(2, "B", Some(1))];
        let controls = vec![control("C.1", &["A", "B"])];

        let resolver = HierarchyResolver::new(&objects, &controls).unwrap();
        let applied = resolver.resolve_all().unwrap();
        assert_eq!(applied.for_target(Uuid::from_u128(2)), set(&["C.1"]));
    }

    #[test]
    fn cycle_is_fatal_and_produces_no_sets() {
        let objects = vec![target(1, "A", Some(2)), target(2, "B", Some(1))];
        let resolver = HierarchyResolver::new(&objects, &[]).unwrap();
        let err = resolver.resolve_all().unwrap_err();
        match err {
            HierarchyError::Cycle { path } => {
                assert!(path.contains("A"));
                assert!(path.contains("B"));
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn dangling_parent_names_the_child_and_the_reference() {
        let objects = vec![target(1, "Orphan", Some(99))];
        let mut resolver = HierarchyResolver::new(&objects, &[]).unwrap();
        let err = resolver.resolve(Uuid::from_u128(1)).unwrap_err();
        match err {
            HierarchyError::DanglingParent { child, parent } => {
                assert_eq!(child, "Orphan");
                assert_eq!(parent, Uuid::from_u128(99));
            }
            other => panic!("expected dangling parent error, got {other}"),
        }
    }

    #[test]
    fn nil_target_object_id_is_rejected() {
        let objects = vec![TargetObject {
            id: PROCESS_BUCKET_ID,
            name: "Bad".to_string(),
            definition: String::new(),
            parent_id: None,
        }];
        assert!(matches!(
            HierarchyResolver::new(&objects, &[]),
            Err(HierarchyError::ReservedIdentifier { .. })
        ));
    }

    #[test]
    fn shared_ancestors_are_memoized() {
        let objects = vec![
            target(1, "Root", None),
            target(2, "Left", Some(1)),
            target(3, "Right", Some(1)),
        ];
        let controls = vec![control("C.1", &["Root"])];

        let mut resolver = HierarchyResolver::new(&objects, &controls).unwrap();
        resolver.resolve(Uuid::from_u128(2)).unwrap();
        assert!(resolver.memo.contains_key(&Uuid::from_u128(1)));

        let right = resolver.resolve(Uuid::from_u128(3)).unwrap();
        assert_eq!(right, set(&["C.1"]));
    }
}
