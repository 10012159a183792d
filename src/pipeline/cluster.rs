//! Clustering Engine
//!
//! Groups semantically similar articles by cosine similarity over their
//! embeddings. Two modes: an initial union-find pass over a fresh batch
//! with no prior groups, and an incremental pass that matches new
//! candidates against already-persisted groups (or forms new ones among
//! themselves) without touching groups it doesn't need to.

use std::collections::HashMap;

use crate::pipeline::embedding::cosine_similarity;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
}

#[derive(Debug, Default, Clone)]
pub struct ClusterResult {
    /// Candidate id -> existing group id it was attached to.
    pub matched_existing: Vec<(String, u32)>,
    /// Freshly formed groups, each a list of candidate ids (len >= 2).
    pub new_groups: Vec<Vec<String>>,
    /// Candidate ids that matched nothing.
    pub unmatched: Vec<String>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let (root_x, root_y) = (self.find(x), self.find(y));
        if root_x != root_y {
            self.parent[root_y] = root_x;
        }
    }
}

/// Cluster a fresh batch of candidates with no prior groups. Pairwise
/// similarity above `tau_match` unions two articles; a resulting cluster
/// is only accepted if every internal pair meets `tau_internal`, and only
/// if it has at least two members.
pub fn cluster_initial(candidates: &[Candidate], tau_match: f32, tau_internal: f32) -> ClusterResult {
    let n = candidates.len();
    let mut uf = UnionFind::new(n);

    for i in 0..n {
        for j in (i + 1)..n {
            let sim = cosine_similarity(&candidates[i].embedding, &candidates[j].embedding);
            if sim >= tau_match {
                uf.union(i, j);
            }
        }
    }

    let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        clusters.entry(root).or_default().push(i);
    }

    let mut new_groups = Vec::new();
    let mut unmatched = Vec::new();

    for members in clusters.values() {
        if members.len() < 2 {
            unmatched.push(candidates[members[0]].id.clone());
            continue;
        }

        let min_internal = min_pairwise_similarity(candidates, members);
        if min_internal < tau_internal {
            for &idx in members {
                unmatched.push(candidates[idx].id.clone());
            }
            continue;
        }

        new_groups.push(members.iter().map(|&idx| candidates[idx].id.clone()).collect());
    }

    ClusterResult {
        matched_existing: Vec::new(),
        new_groups,
        unmatched,
    }
}

fn min_pairwise_similarity(candidates: &[Candidate], members: &[usize]) -> f32 {
    let mut min = f32::MAX;
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            let sim = cosine_similarity(&candidates[a].embedding, &candidates[b].embedding);
            if sim < min {
                min = sim;
            }
        }
    }
    min
}

/// Match new candidates against already-persisted groups (keyed by group id
/// to the embeddings of their current members), attaching a candidate to
/// the group whose *minimum* similarity to all its members is highest and
/// clears `tau_match`. Candidates that match nothing are then matched
/// pairwise against each other, forming new groups of size >= 2. An exact
/// text match never forms a pairwise match — it is treated as a duplicate,
/// not corroborating evidence.
pub fn cluster_incremental(
    candidates: &[Candidate],
    existing_groups: &HashMap<u32, Vec<Vec<f32>>>,
    tau_match: f32,
) -> ClusterResult {
    let n = candidates.len();
    let mut matched_existing = Vec::new();
    let mut matched = vec![false; n];

    let mut group_ids: Vec<u32> = existing_groups.keys().copied().collect();
    group_ids.sort_unstable();

    for (idx, candidate) in candidates.iter().enumerate() {
        let mut best_group = None;
        let mut best_similarity = 0.0f32;

        for &group_id in &group_ids {
            let members = &existing_groups[&group_id];
            if members.is_empty() {
                continue;
            }
            let min_sim = members
                .iter()
                .map(|emb| cosine_similarity(&candidate.embedding, emb))
                .fold(f32::MAX, f32::min);
            // Strict `>` plus ascending group-id scan order: the first
            // group to reach a given similarity keeps it on ties, so the
            // smallest group id wins (spec §9 open question (c)).
            if min_sim > best_similarity {
                best_similarity = min_sim;
                best_group = Some(group_id);
            }
        }

        if let Some(group_id) = best_group {
            if best_similarity >= tau_match {
                matched_existing.push((candidate.id.clone(), group_id));
                matched[idx] = true;
            }
        }
    }

    let mut new_groups = Vec::new();
    for i in 0..n {
        if matched[i] {
            continue;
        }
        for j in (i + 1)..n {
            if matched[j] {
                continue;
            }
            if candidates[i].text.trim() == candidates[j].text.trim() {
                continue;
            }
            let sim = cosine_similarity(&candidates[i].embedding, &candidates[j].embedding);
            if sim >= tau_match {
                new_groups.push(vec![candidates[i].id.clone(), candidates[j].id.clone()]);
                matched[i] = true;
                matched[j] = true;
                break;
            }
        }
    }

    let unmatched = (0..n)
        .filter(|&i| !matched[i])
        .map(|i| candidates[i].id.clone())
        .collect();

    ClusterResult {
        matched_existing,
        new_groups,
        unmatched,
    }
}
