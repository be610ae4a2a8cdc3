use crate::core::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum gain for a split, relative to the parent node score
const MIN_RELATIVE_GAIN: f64 = 1e-9;

/// Growth constraints for a single regression tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf weights; 0 gives plain mean leaves
    pub l2_regularization: f64,
    /// Caps the leaf count and turns growth best-first (leaf-wise)
    pub max_leaves: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            l2_regularization: 0.0,
            max_leaves: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART regression tree over [`FeatureVector`] rows, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct FrontierNode {
    node: usize,
    depth: usize,
    split: Option<SplitCandidate>,
}

impl RegressionTree {
    /// Fit a tree on the rows selected by `indices` (duplicates allowed).
    ///
    /// Nodes are expanded best-gain first. Without `max_leaves` every
    /// splittable node is eventually expanded, which yields the same tree as
    /// depth-wise growth.
    pub fn fit(x: &[FeatureVector], y: &[f64], indices: &[usize], params: &TreeParams) -> Self {
        let mut tree = RegressionTree {
            nodes: vec![Node::Leaf {
                value: leaf_value(y, indices, params.l2_regularization),
            }],
        };

        let root_split = if params.max_depth > 0 {
            best_split(x, y, indices, params)
        } else {
            None
        };
        let mut frontier = vec![FrontierNode {
            node: 0,
            depth: 0,
            split: root_split,
        }];
        let mut leaves = 1;

        loop {
            if params.max_leaves.is_some_and(|max| leaves >= max) {
                break;
            }

            let next = frontier
                .iter()
                .enumerate()
                .filter_map(|(i, f)| f.split.as_ref().map(|s| (i, s.gain)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i);

            let Some(pos) = next else { break };
            let entry = frontier.swap_remove(pos);
            let Some(split) = entry.split else { continue };

            let left = tree.push_leaf(leaf_value(y, &split.left, params.l2_regularization));
            let right = tree.push_leaf(leaf_value(y, &split.right, params.l2_regularization));
            tree.nodes[entry.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            leaves += 1;

            let depth = entry.depth + 1;
            for (node, rows) in [(left, split.left), (right, split.right)] {
                let split = if depth < params.max_depth {
                    best_split(x, y, &rows, params)
                } else {
                    None
                };
                frontier.push(FrontierNode { node, depth, split });
            }
        }

        tree
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        self.nodes.push(Node::Leaf { value });
        self.nodes.len() - 1
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if features.0[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Leaf weight minimizing squared error with an L2 penalty: sum / (n + lambda)
fn leaf_value(y: &[f64], indices: &[usize], lambda: f64) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    sum / (indices.len() as f64 + lambda)
}

#[inline]
fn node_score(sum: f64, count: usize, lambda: f64) -> f64 {
    sum * sum / (count as f64 + lambda)
}

fn best_split(
    x: &[FeatureVector],
    y: &[f64],
    indices: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < params.min_samples_split.max(2) || n < 2 * params.min_samples_leaf.max(1) {
        return None;
    }

    let lambda = params.l2_regularization;
    let total: f64 = indices.iter().map(|&i| y[i]).sum();
    let parent = node_score(total, n, lambda);
    let min_gain = MIN_RELATIVE_GAIN * parent.abs().max(1.0);

    // (feature, threshold, gain)
    let mut best: Option<(usize, f64, f64)> = None;
    let mut sorted = indices.to_vec();

    for feature in 0..FEATURE_COUNT {
        sorted.sort_by(|&a, &b| {
            x[a].0[feature]
                .partial_cmp(&x[b].0[feature])
                .unwrap_or(Ordering::Equal)
        });

        let mut sum_left = 0.0;
        for k in 0..n - 1 {
            sum_left += y[sorted[k]];
            let here = x[sorted[k]].0[feature];
            let next = x[sorted[k + 1]].0[feature];
            if here == next {
                continue;
            }

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }

            let gain = node_score(sum_left, n_left, lambda)
                + node_score(total - sum_left, n_right, lambda)
                - parent;

            if gain > min_gain && best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, (here + next) / 2.0, gain));
            }
        }
    }

    let (feature, threshold, gain) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[i].0[feature] <= threshold);

    Some(SplitCandidate {
        feature,
        threshold,
        gain,
        left,
        right,
    })
}
