// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource ownership expressed as a dependency graph.
//!
//! The registry maps identifiers to resources and records directed edges
//! `dependent → dependency` twice, once in a forward map and once in a reverse map.
//! A resource lives as long as something depends on it: removing a resource drops
//! its outgoing edges, and every dependency left with no dependent is removed in
//! turn.
//!
//! Cycles are not supported. Members of a cycle always have a dependent, so
//! removing something outside the cycle never reclaims them.

use crate::guid::Guid;
use std::collections::{HashMap, HashSet};

/// A resource store with dependency-driven lifetimes.
#[derive(Debug)]
pub struct ResourceRegistry<R> {
    resources: HashMap<Guid, R>,
    dependencies: HashMap<Guid, HashSet<Guid>>,
    dependents: HashMap<Guid, HashSet<Guid>>,
}

impl<R> Default for ResourceRegistry<R> {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            dependencies: HashMap::new(),
            dependents: HashMap::new(),
        }
    }
}

impl<R> ResourceRegistry<R> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `resource` under `id`. An existing resource with the same id is
    /// replaced and returned; its edges are kept.
    pub fn add(&mut self, id: Guid, resource: R) -> Option<R> {
        let previous = self.resources.insert(id, resource);
        if previous.is_some() {
            log::warn!("Resource {id} was registered twice; the last one wins");
        }
        previous
    }

    /// Records that `owner` depends on `dependency`. Adding an edge twice has no effect.
    pub fn add_dependency(&mut self, owner: Guid, dependency: Guid) {
        self.dependencies.entry(owner).or_default().insert(dependency);
        self.dependents.entry(dependency).or_default().insert(owner);
    }

    /// Removes `owner` and every dependency nobody else depends on any more.
    ///
    /// Returns the removed resources in removal order (`owner` first) so the caller
    /// can release whatever they hold. An unknown id removes nothing, though dangling
    /// edges naming it are dropped.
    pub fn remove(&mut self, owner: Guid) -> Vec<(Guid, R)> {
        let mut removed = Vec::new();
        self.remove_into(owner, &mut removed);
        removed
    }

    fn remove_into(&mut self, owner: Guid, removed: &mut Vec<(Guid, R)>) {
        if let Some(resource) = self.resources.remove(&owner) {
            removed.push((owner, resource));
        }

        // Edges are detached before recursing so a revisit of `owner` finds nothing.
        let dependencies = self.dependencies.remove(&owner).unwrap_or_default();
        let dependents = self.dependents.remove(&owner).unwrap_or_default();

        for dependent in dependents {
            if let Some(set) = self.dependencies.get_mut(&dependent) {
                set.remove(&owner);
                if set.is_empty() {
                    self.dependencies.remove(&dependent);
                }
            }
        }

        let mut dependencies: Vec<Guid> = dependencies.into_iter().collect();
        dependencies.sort();
        for dependency in dependencies {
            let orphaned = match self.dependents.get_mut(&dependency) {
                Some(set) => {
                    set.remove(&owner);
                    set.is_empty()
                }
                None => true,
            };
            if orphaned {
                self.dependents.remove(&dependency);
                self.remove_into(dependency, removed);
            }
        }
    }

    /// Removes every resource and edge.
    pub fn clear(&mut self) -> Vec<(Guid, R)> {
        self.dependencies.clear();
        self.dependents.clear();
        self.resources.drain().collect()
    }

    /// Borrows a resource. `None` on an unknown id.
    pub fn get(&self, id: &Guid) -> Option<&R> {
        self.resources.get(id)
    }

    /// Mutably borrows a resource. `None` on an unknown id.
    pub fn get_mut(&mut self, id: &Guid) -> Option<&mut R> {
        self.resources.get_mut(id)
    }

    /// Returns `true` if a resource is registered under `id`.
    pub fn contains(&self, id: &Guid) -> bool {
        self.resources.contains_key(id)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Ids `owner` depends on.
    pub fn dependencies_of(&self, owner: &Guid) -> impl Iterator<Item = Guid> + '_ {
        self.dependencies.get(owner).into_iter().flatten().copied()
    }

    /// Ids that depend on `dependency`.
    pub fn dependents_of(&self, dependency: &Guid) -> impl Iterator<Item = Guid> + '_ {
        self.dependents.get(dependency).into_iter().flatten().copied()
    }

    /// Iterates over every registered resource.
    pub fn iter(&self) -> impl Iterator<Item = (&Guid, &R)> {
        self.resources.iter()
    }

    #[cfg(test)]
    fn edges_mirrored(&self) -> bool {
        let forward = self
            .dependencies
            .iter()
            .all(|(o, deps)| deps.iter().all(|d| self.dependents.get(d).is_some_and(|s| s.contains(o))));
        let reverse = self
            .dependents
            .iter()
            .all(|(d, owners)| owners.iter().all(|o| self.dependencies.get(o).is_some_and(|s| s.contains(d))));
        forward && reverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<const N: usize>() -> [Guid; N] {
        std::array::from_fn(|_| Guid::new())
    }

    fn removed_ids(removed: &[(Guid, &str)]) -> HashSet<Guid> {
        removed.iter().map(|(id, _)| *id).collect()
    }

    #[test]
    fn add_and_get() {
        let mut registry = ResourceRegistry::new();
        let [a] = ids();
        assert!(registry.get(&a).is_none());
        registry.add(a, "a");
        assert_eq!(registry.get(&a), Some(&"a"));
        assert_eq!(registry.add(a, "b"), Some("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut registry: ResourceRegistry<&str> = ResourceRegistry::new();
        let [a, b] = ids();
        registry.add_dependency(a, b);
        registry.add_dependency(a, b);
        assert_eq!(registry.dependencies_of(&a).count(), 1);
        assert_eq!(registry.dependents_of(&b).count(), 1);
        assert!(registry.edges_mirrored());
    }

    #[test]
    fn remove_cascades_to_sole_dependencies() {
        let mut registry = ResourceRegistry::new();
        let [geometry, vb, ib] = ids();
        registry.add(geometry, "geometry");
        registry.add(vb, "vb");
        registry.add(ib, "ib");
        registry.add_dependency(geometry, vb);
        registry.add_dependency(geometry, ib);

        let removed = registry.remove(geometry);
        assert_eq!(removed[0].0, geometry);
        assert_eq!(removed_ids(&removed), HashSet::from([geometry, vb, ib]));
        assert!(registry.is_empty());
        assert!(registry.edges_mirrored());
    }

    #[test]
    fn shared_dependency_survives() {
        let mut registry = ResourceRegistry::new();
        let [g1, g2, shared, own] = ids();
        for (id, name) in [(g1, "g1"), (g2, "g2"), (shared, "shared"), (own, "own")] {
            registry.add(id, name);
        }
        registry.add_dependency(g1, shared);
        registry.add_dependency(g1, own);
        registry.add_dependency(g2, shared);

        let removed = registry.remove(g1);
        assert_eq!(removed_ids(&removed), HashSet::from([g1, own]));
        assert!(registry.contains(&shared));
        assert_eq!(registry.dependents_of(&shared).collect::<Vec<_>>(), vec![g2]);

        let removed = registry.remove(g2);
        assert_eq!(removed_ids(&removed), HashSet::from([g2, shared]));
        assert!(registry.is_empty());
    }

    #[test]
    fn cascade_is_transitive() {
        let mut registry = ResourceRegistry::new();
        let [fb, tex, leaf] = ids();
        registry.add(fb, "fb");
        registry.add(tex, "tex");
        registry.add(leaf, "leaf");
        registry.add_dependency(fb, tex);
        registry.add_dependency(tex, leaf);

        assert_eq!(registry.remove(fb).len(), 3);
    }

    #[test]
    fn removing_a_dependency_detaches_its_dependents() {
        let mut registry = ResourceRegistry::new();
        let [program, code] = ids();
        registry.add(program, "program");
        registry.add(code, "code");
        registry.add_dependency(program, code);

        let removed = registry.remove(code);
        assert_eq!(removed_ids(&removed), HashSet::from([code]));
        assert!(registry.contains(&program));
        assert_eq!(registry.dependencies_of(&program).count(), 0);
        assert!(registry.edges_mirrored());
    }

    #[test]
    fn dangling_edge_to_unregistered_id_is_a_no_op() {
        let mut registry = ResourceRegistry::new();
        let [owner, ghost] = ids();
        registry.add(owner, "owner");
        registry.add_dependency(owner, ghost);

        let removed = registry.remove(owner);
        assert_eq!(removed_ids(&removed), HashSet::from([owner]));
        assert!(registry.dependents_of(&ghost).next().is_none());
        assert!(registry.remove(ghost).is_empty());
    }

    #[test]
    fn cycle_members_are_leaked() {
        let mut registry = ResourceRegistry::new();
        let [root, a, b] = ids();
        registry.add(root, "root");
        registry.add(a, "a");
        registry.add(b, "b");
        registry.add_dependency(root, a);
        registry.add_dependency(a, b);
        registry.add_dependency(b, a);

        let removed = registry.remove(root);
        assert_eq!(removed_ids(&removed), HashSet::from([root]));
        assert!(registry.contains(&a) && registry.contains(&b));
    }

    #[test]
    fn clear_drops_everything() {
        let mut registry = ResourceRegistry::new();
        let [a, b] = ids();
        registry.add(a, 1);
        registry.add(b, 2);
        registry.add_dependency(a, b);
        assert_eq!(registry.clear().len(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.dependencies_of(&a).count(), 0);
    }
}
