//! Index-based knowledge graph handle.
//!
//! Samplers never see entity names: a [`KnowledgeGraph`] is the set of facts
//! already mapped to dense ids, stored as three parallel arrays plus the
//! per-entity known-positive maps the learned sampler filters against.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// A (head, relation, tail) fact over dense ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fact {
    pub head: u32,
    pub relation: u32,
    pub tail: u32,
}

impl Fact {
    pub fn new(head: u32, relation: u32, tail: u32) -> Self {
        Self {
            head,
            relation,
            tail,
        }
    }
}

impl From<(u32, u32, u32)> for Fact {
    fn from((head, relation, tail): (u32, u32, u32)) -> Self {
        Self::new(head, relation, tail)
    }
}

/// Immutable graph snapshot consumed by the samplers.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    n_ent: usize,
    n_rel: usize,
    head_idx: Vec<u32>,
    tail_idx: Vec<u32>,
    relations: Vec<u32>,
    /// head -> tails it is known to precede
    pos_tails: HashMap<u32, HashSet<u32>>,
    /// tail -> heads it is known to follow
    pos_heads: HashMap<u32, HashSet<u32>>,
}

impl KnowledgeGraph {
    /// Build a graph over a fixed vocabulary.
    ///
    /// `n_ent` and `n_rel` are the sizes of the whole vocabulary (shared by
    /// train, validation and test splits), not just the ids used here.
    pub fn new<I, F>(n_ent: usize, n_rel: usize, facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Fact>,
    {
        let mut kg = Self {
            n_ent,
            n_rel,
            ..Default::default()
        };

        for fact in facts {
            let fact = fact.into();
            for id in [fact.head, fact.tail] {
                if id as usize >= n_ent {
                    return Err(Error::EntityOutOfRange { id, n_ent });
                }
            }
            if fact.relation as usize >= n_rel {
                return Err(Error::RelationOutOfRange {
                    id: fact.relation,
                    n_rel,
                });
            }

            kg.head_idx.push(fact.head);
            kg.tail_idx.push(fact.tail);
            kg.relations.push(fact.relation);
            kg.pos_tails.entry(fact.head).or_default().insert(fact.tail);
            kg.pos_heads.entry(fact.tail).or_default().insert(fact.head);
        }

        Ok(kg)
    }

    /// Build a graph whose vocabulary is inferred as `max id + 1`.
    pub fn from_facts<I, F>(facts: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fact>,
    {
        let facts: Vec<Fact> = facts.into_iter().map(Into::into).collect();
        let n_ent = facts
            .iter()
            .map(|f| f.head.max(f.tail) as usize + 1)
            .max()
            .unwrap_or(0);
        let n_rel = facts
            .iter()
            .map(|f| f.relation as usize + 1)
            .max()
            .unwrap_or(0);

        // ids are within the inferred bounds by construction
        Self::new(n_ent, n_rel, facts).unwrap_or_default()
    }

    pub fn n_ent(&self) -> usize {
        self.n_ent
    }

    pub fn n_rel(&self) -> usize {
        self.n_rel
    }

    pub fn n_facts(&self) -> usize {
        self.head_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head_idx.is_empty()
    }

    pub fn head_idx(&self) -> &[u32] {
        &self.head_idx
    }

    pub fn tail_idx(&self) -> &[u32] {
        &self.tail_idx
    }

    pub fn relations(&self) -> &[u32] {
        &self.relations
    }

    /// Iterate facts in storage order.
    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.head_idx
            .iter()
            .zip(&self.tail_idx)
            .zip(&self.relations)
            .map(|((&h, &t), &r)| Fact::new(h, r, t))
    }

    /// Tails known to follow `head` under any relation.
    pub fn known_tails(&self, head: u32) -> Option<&HashSet<u32>> {
        self.pos_tails.get(&head)
    }

    /// Heads known to precede `tail` under any relation.
    pub fn known_heads(&self, tail: u32) -> Option<&HashSet<u32>> {
        self.pos_heads.get(&tail)
    }
}

/// Which graph of a train/validation/test triple to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "main" | "train" => Ok(Self::Train),
            "val" | "validation" => Ok(Self::Validation),
            "test" => Ok(Self::Test),
            other => Err(Error::InvalidSplit(other.to_string())),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}
