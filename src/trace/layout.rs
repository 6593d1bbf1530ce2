//! Layout engine: assigns each display span a row and an indentation depth.
//!
//! Spans live in a flat arena addressed by index. Parent links are resolved
//! once, then a single depth-first pass hands out rows and depths, so each
//! span is visited exactly once whatever the tree height.

use crate::core::{LayoutSpan, TraceSpan};
use ahash::AHashMap;
use smallvec::SmallVec;

type Children = SmallVec<[usize; 4]>;

/// Place spans on the waterfall.
///
/// Root-level spans are visited in ascending start time; each claims the
/// next row and is followed by its whole subtree (children in input order),
/// so a subtree always occupies a contiguous block of rows below its parent.
/// A span whose parent is missing, or that only hangs off a parent cycle,
/// is promoted to root level. The result is ordered by row.
pub fn layout(spans: &[TraceSpan]) -> Vec<LayoutSpan> {
    let count = spans.len();
    let mut by_id: AHashMap<&str, usize> = AHashMap::with_capacity(count);
    for (index, span) in spans.iter().enumerate() {
        by_id.entry(span.span_id.as_str()).or_insert(index);
    }

    let parents: Vec<Option<usize>> = spans
        .iter()
        .enumerate()
        .map(|(index, span)| {
            span.parent_id
                .as_deref()
                .and_then(|id| by_id.get(id).copied())
                .filter(|&parent| parent != index)
        })
        .collect();

    let mut children: Vec<Children> = vec![Children::new(); count];
    for (index, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(index);
        }
    }

    let mut roots: Vec<usize> = (0..count).filter(|&i| parents[i].is_none()).collect();
    roots.sort_by_key(|&i| spans[i].start_time);

    let mut placer = RowPlacer {
        spans,
        children: &children,
        visited: vec![false; count],
        placed: Vec::with_capacity(count),
        stack: Vec::new(),
    };
    for root in roots {
        placer.visit(root);
    }

    if placer.placed.len() < count {
        // Whatever is left is only reachable through a parent cycle.
        let mut stranded: Vec<usize> = (0..count).filter(|&i| !placer.visited[i]).collect();
        tracing::warn!(spans = stranded.len(), "Cyclic parent references, promoting to root level");
        stranded.sort_by_key(|&i| spans[i].start_time);
        for index in stranded {
            placer.visit(index);
        }
    }

    tracing::debug!(rows = placer.placed.len(), "Laid out spans");
    placer.placed
}

struct RowPlacer<'a> {
    spans: &'a [TraceSpan],
    children: &'a [Children],
    visited: Vec<bool>,
    placed: Vec<LayoutSpan>,
    stack: Vec<(usize, usize)>,
}

impl RowPlacer<'_> {
    /// Pre-order walk from `start`, which is placed at depth 0.
    fn visit(&mut self, start: usize) {
        if self.visited[start] {
            return;
        }
        self.stack.push((start, 0));
        while let Some((index, depth)) = self.stack.pop() {
            if self.visited[index] {
                continue;
            }
            self.visited[index] = true;
            self.placed.push(LayoutSpan {
                span: self.spans[index].clone(),
                row: self.placed.len(),
                depth,
            });
            for &child in self.children[index].iter().rev() {
                if !self.visited[child] {
                    self.stack.push((child, depth + 1));
                }
            }
        }
    }
}
