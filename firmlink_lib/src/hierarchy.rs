//! Parent/child structure over entities.
//!
//! Parent references come from upstream data and are not guaranteed to be
//! acyclic. `Hierarchy::build` keeps only links to known entities, cuts every
//! link on a cycle, and assigns each entity a depth level so parents can be
//! resolved before their children.

use std::collections::HashMap;

use crate::types::Entity;

#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    /// Effective parent position per entity position.
    parents: Vec<Option<usize>>,
    /// Entity positions per depth, heaviest first within a level.
    levels: Vec<Vec<usize>>,
    dropped_unknown: usize,
    dropped_cyclic: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

impl Hierarchy {
    /// Build from entities with unique ids.
    pub fn build(entities: &[Entity]) -> Self {
        let positions: HashMap<&str, usize> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();

        let mut dropped_unknown = 0;
        let mut parents: Vec<Option<usize>> = entities
            .iter()
            .map(|e| {
                let parent = e.parent_id.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
                match positions.get(parent) {
                    Some(&idx) => Some(idx),
                    None => {
                        tracing::warn!("Entity {} has unknown parent {}; link dropped", e.id, parent);
                        dropped_unknown += 1;
                        None
                    }
                }
            })
            .collect();

        // Visit in id order so the outcome never depends on input order.
        let mut order: Vec<usize> = (0..entities.len()).collect();
        order.sort_by(|&a, &b| entities[a].id.cmp(&entities[b].id));

        let mut marks = vec![Mark::Unvisited; entities.len()];
        let mut dropped_cyclic = 0;
        for &start in &order {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            let mut path: Vec<usize> = Vec::new();
            let mut node = Some(start);
            while let Some(current) = node {
                match marks[current] {
                    Mark::Done => break,
                    Mark::OnPath => {
                        let Some(cycle_start) = path.iter().position(|&n| n == current) else {
                            break;
                        };
                        for &member in &path[cycle_start..] {
                            tracing::warn!(
                                "Entity {} is on a parent cycle; link dropped",
                                entities[member].id
                            );
                            parents[member] = None;
                            dropped_cyclic += 1;
                        }
                        break;
                    }
                    Mark::Unvisited => {
                        marks[current] = Mark::OnPath;
                        path.push(current);
                        node = parents[current];
                    }
                }
            }
            for n in path {
                marks[n] = Mark::Done;
            }
        }

        let mut depth: Vec<Option<usize>> = vec![None; entities.len()];
        for i in 0..entities.len() {
            let mut chain = Vec::new();
            let mut node = i;
            let base = loop {
                if let Some(d) = depth[node] {
                    break d + 1;
                }
                chain.push(node);
                match parents[node] {
                    Some(p) => node = p,
                    None => break 0,
                }
            };
            for (offset, n) in chain.into_iter().rev().enumerate() {
                depth[n] = Some(base + offset);
            }
        }

        let max_depth = depth.iter().flatten().copied().max().unwrap_or(0);
        let mut levels: Vec<Vec<usize>> = vec![Vec::new(); if entities.is_empty() { 0 } else { max_depth + 1 }];
        for (i, d) in depth.iter().enumerate() {
            if let Some(d) = d {
                levels[*d].push(i);
            }
        }
        for level in &mut levels {
            level.sort_by(|&a, &b| {
                entities[b]
                    .weight
                    .total_cmp(&entities[a].weight)
                    .then_with(|| entities[a].id.cmp(&entities[b].id))
            });
        }

        Self {
            parents,
            levels,
            dropped_unknown,
            dropped_cyclic,
        }
    }

    pub fn parent_of(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Links dropped because the parent was unknown or on a cycle.
    pub fn dropped_links(&self) -> usize {
        self.dropped_unknown + self.dropped_cyclic
    }

    pub fn dropped_cyclic(&self) -> usize {
        self.dropped_cyclic
    }
}
