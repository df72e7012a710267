//! Mate dependency graph over an arena of parts

use std::collections::HashMap;

use crate::part::Part;

use super::{ReferenceError, ResolveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Parts indexed by declaration position, with the single mate edge of each
#[derive(Debug)]
pub(super) struct MateGraph<'a> {
    pub parts: &'a [Part],
    /// Index of the part each part mates to (None for unmated parts)
    pub targets: Vec<Option<usize>>,
}

impl<'a> MateGraph<'a> {
    /// Build the graph, checking every mate reference
    pub fn build(parts: &'a [Part]) -> Result<Self, ResolveError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if index.insert(part.name.as_str(), i).is_some() {
                return Err(ResolveError::DuplicatePart(part.name.clone()));
            }
        }

        let mut targets = Vec::with_capacity(parts.len());
        for part in parts {
            let Some(mate) = part.mate() else {
                targets.push(None);
                continue;
            };

            if part.anchor(&mate.my_anchor).is_none() {
                return Err(ReferenceError::MissingAnchor {
                    part: part.name.clone(),
                    anchor: mate.my_anchor.clone(),
                }
                .into());
            }

            let target = *index.get(mate.to_part.as_str()).ok_or_else(|| {
                ReferenceError::UnknownPart {
                    part: part.name.clone(),
                    to_part: mate.to_part.clone(),
                }
            })?;

            if parts[target].anchor(&mate.to_anchor).is_none() {
                return Err(ReferenceError::UnknownAnchor {
                    part: part.name.clone(),
                    to_part: mate.to_part.clone(),
                    to_anchor: mate.to_anchor.clone(),
                }
                .into());
            }

            targets.push(Some(target));
        }

        Ok(Self { parts, targets })
    }

    /// Dependency order: every part comes after the part it mates to.
    ///
    /// Parts are visited in declaration order; each walk follows the single
    /// mate edge until it reaches a resolved part or closes a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>, ResolveError> {
        let mut marks = vec![Mark::Unvisited; self.parts.len()];
        let mut order = Vec::with_capacity(self.parts.len());

        for start in 0..self.parts.len() {
            let mut chain: Vec<usize> = Vec::new();
            let mut current = Some(start);

            while let Some(idx) = current {
                match marks[idx] {
                    Mark::Done => break,
                    Mark::InProgress => {
                        let begin = chain.iter().position(|&i| i == idx).unwrap_or(0);
                        let mut path: Vec<String> = chain[begin..]
                            .iter()
                            .map(|&i| self.parts[i].name.clone())
                            .collect();
                        path.push(self.parts[idx].name.clone());
                        return Err(ResolveError::Cycle { path });
                    }
                    Mark::Unvisited => {
                        marks[idx] = Mark::InProgress;
                        chain.push(idx);
                        current = self.targets[idx];
                    }
                }
            }

            for &idx in chain.iter().rev() {
                marks[idx] = Mark::Done;
                order.push(idx);
            }
        }

        Ok(order)
    }
}
