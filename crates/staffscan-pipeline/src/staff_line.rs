//! Staff-line detection by longest-path search over row segments.
//!
//! # Algorithm overview
//!
//! 1. **Segmentation:** every row is cut into gap-tolerant ink segments
//!    (see [`crate::segment`]).
//! 2. **Graph:** segment `a` has an edge to segment `b` on an adjacent row
//!    when `b` is connected to `a` and ends further right. Edges always
//!    increase the end column, so the graph is a DAG and descending end
//!    column is a reverse topological order.
//! 3. **Longest path:** visiting segments in that order, each segment
//!    adopts the successor whose chain reaches furthest right, inheriting
//!    its destination and component. A segment without successors is a
//!    chain terminal and opens a new component. The chosen successor of
//!    every segment is kept in a table indexed by node, so chains can be
//!    walked later without recursion.
//! 4. **Assembly:** segments whose weight is within `weight_ratio` of the
//!    heaviest are kept; the heaviest segment of each component is walked
//!    along its chain to form one [`StaffLine`].
//! 5. **Merge:** lines whose boxes are at most one empty row apart and
//!    overlap horizontally are aggregated, joining the rows of thick lines.

use std::cmp::Reverse;
use std::collections::HashSet;

use log::{debug, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::binary::BinaryImage;
use crate::segment::{Segment, discontinuity_threshold, segment_rows};
use crate::types::{Point, Rect};

/// One detected horizontal line, as a chain of row segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffLine {
    /// Segments along the line, chain order first, aggregated lines after.
    pub segments: Vec<Segment>,
    /// Leftmost point of the line.
    pub start: Point,
    /// Rightmost point of the line.
    pub end: Point,
    /// Thickness in rows (height of the bounding box).
    pub line_width: u32,
    /// Box around every segment.
    pub bounding_rect: Rect,
}

impl StaffLine {
    /// Build a line from its segments; `None` if there are none.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        let first = segments.first()?;
        let mut line = Self {
            start: first.start,
            end: first.end,
            line_width: 1,
            bounding_rect: first.bounding_rect(),
            segments,
        };
        line.refresh_geometry();
        Some(line)
    }

    fn refresh_geometry(&mut self) {
        for s in &self.segments {
            self.bounding_rect = self.bounding_rect.union(&s.bounding_rect());
            if s.start.x < self.start.x {
                self.start = s.start;
            }
            if s.end.x > self.end.x {
                self.end = s.end;
            }
        }
        self.line_width = self.bounding_rect.height();
    }

    /// Topmost row.
    #[must_use]
    pub const fn top(&self) -> u32 {
        self.bounding_rect.top
    }

    /// Bottom row.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.bounding_rect.bottom
    }

    /// Whether `other` sits above or below this line with at most one
    /// empty row between them, sharing at least one column.
    #[must_use]
    pub const fn is_adjacent(&self, other: &Self) -> bool {
        other.top() <= self.bottom() + 2
            && self.top() <= other.bottom() + 2
            && self.bounding_rect.overlaps_horizontally(&other.bounding_rect)
    }

    /// Absorb `other`'s segments and widen the line to cover them.
    pub fn aggregate(&mut self, other: Self) {
        self.segments.extend(other.segments);
        self.refresh_geometry();
    }

    /// Every pixel covered by the line's segments.
    pub fn pixels(&self) -> impl Iterator<Item = Point> + '_ {
        self.segments
            .iter()
            .flat_map(|s| (s.start.x..=s.end.x).map(move |x| Point::new(x, s.row())))
    }
}

/// Segment graph with longest-path results.
#[derive(Debug, Clone)]
pub struct SegmentSearch {
    graph: DiGraph<Segment, ()>,
    next: Vec<Option<NodeIndex>>,
    component_count: usize,
}

impl SegmentSearch {
    /// Segment `image` with discontinuity threshold `gap` and run the
    /// longest-path search.
    #[must_use]
    pub fn run(image: &BinaryImage, gap: u32) -> Self {
        let mut graph: DiGraph<Segment, ()> = DiGraph::new();
        let rows: Vec<Vec<NodeIndex>> = segment_rows(image, gap)
            .into_iter()
            .map(|row| row.into_iter().map(|s| graph.add_node(s)).collect())
            .collect();

        for (y, row) in rows.iter().enumerate() {
            let neighbours = [y.checked_sub(1), Some(y + 1)];
            for &from in row {
                for adjacent in neighbours.iter().flatten().filter_map(|&ny| rows.get(ny)) {
                    for &to in adjacent {
                        if graph[from].leads_to(&graph[to], gap) {
                            graph.add_edge(from, to, ());
                        }
                    }
                }
            }
        }

        let mut order: Vec<NodeIndex> = graph.node_indices().collect();
        order.sort_by_key(|&n| Reverse(graph[n].end.x));

        let mut next = vec![None; graph.node_count()];
        let mut component_count = 0;
        for node in order {
            let best = graph
                .neighbors(node)
                .max_by_key(|&t| (graph[t].destination.x, Reverse(t.index())));
            if let Some(succ) = best {
                let (destination, component) = (graph[succ].destination, graph[succ].component);
                let segment = &mut graph[node];
                segment.destination = destination;
                segment.component = component;
                next[node.index()] = Some(succ);
            } else {
                let segment = &mut graph[node];
                segment.destination = segment.end;
                segment.component = Some(component_count);
                component_count += 1;
            }
        }

        Self {
            graph,
            next,
            component_count,
        }
    }

    /// All segments with their search results.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.graph.node_weights()
    }

    /// Number of segments in the graph.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of chain terminals (distinct components).
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.component_count
    }

    /// The heaviest segment weight, or 0 for an empty graph.
    #[must_use]
    pub fn max_weight(&self) -> u32 {
        self.segments().map(Segment::weight).max().unwrap_or(0)
    }

    /// Segments along the best chain starting at `head`.
    fn chain(&self, head: NodeIndex) -> Vec<Segment> {
        let mut chain = Vec::new();
        let mut current = Some(head);
        while let Some(node) = current {
            chain.push(self.graph[node]);
            current = self.next[node.index()];
        }
        chain
    }

    /// Keep segments within `weight_ratio` of the heaviest and build one
    /// line per component from its heaviest segment's chain.
    #[must_use]
    pub fn assemble_lines(&self, weight_ratio: f64) -> Vec<StaffLine> {
        let mut ranked: Vec<NodeIndex> = self.graph.node_indices().collect();
        ranked.sort_by_key(|&n| (Reverse(self.graph[n].weight()), n.index()));
        let Some(&heaviest) = ranked.first() else {
            return Vec::new();
        };
        let cutoff = weight_ratio * f64::from(self.graph[heaviest].weight());

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for node in ranked {
            let segment = &self.graph[node];
            if f64::from(segment.weight()) < cutoff {
                break;
            }
            let Some(component) = segment.component else {
                continue;
            };
            if !seen.insert(component) {
                continue;
            }
            if let Some(line) = StaffLine::from_segments(self.chain(node)) {
                lines.push(line);
            }
        }
        lines
    }
}

/// Aggregate vertically adjacent lines, returning them sorted by top row.
#[must_use]
pub fn merge_adjacent(mut lines: Vec<StaffLine>) -> Vec<StaffLine> {
    lines.sort_by_key(|l| (l.top(), l.bounding_rect.left));
    let mut merged: Vec<StaffLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(target) = merged.iter_mut().rev().find(|m| m.is_adjacent(&line)) {
            target.aggregate(line);
        } else {
            merged.push(line);
        }
    }
    merged.sort_by_key(|l| (l.top(), l.bounding_rect.left));
    merged
}

/// Outcome of [`detect_staff_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDetection {
    /// Detected lines, sorted by top row.
    pub lines: Vec<StaffLine>,
    /// Number of row segments searched.
    pub segment_count: usize,
    /// Number of chain components.
    pub component_count: usize,
    /// Lines assembled before merging adjacent ones.
    pub unmerged_count: usize,
}

/// Detect horizontal staff lines in a deskewed binary page.
///
/// An empty result is logged, not an error.
#[must_use]
pub fn detect_staff_lines(image: &BinaryImage, weight_ratio: f64) -> LineDetection {
    let gap = discontinuity_threshold(image.width());
    let search = SegmentSearch::run(image, gap);
    let assembled = search.assemble_lines(weight_ratio);
    let unmerged_count = assembled.len();
    let lines = merge_adjacent(assembled);

    if lines.is_empty() {
        warn!("no staff lines detected");
    } else {
        debug!(
            "staff lines: {} segments, {} components, max weight {}, {unmerged_count} chains -> {} lines",
            search.segment_count(),
            search.component_count(),
            search.max_weight(),
            lines.len()
        );
    }

    LineDetection {
        lines,
        segment_count: search.segment_count(),
        component_count: search.component_count(),
        unmerged_count,
    }
}
