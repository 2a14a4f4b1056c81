//! Deterministic shelf packer.
//!
//! Sprites are placed largest-first. Each one starts at the origin and is
//! pushed right past whatever it collides with, wrapping down by `alignment`
//! whenever it would cross the right edge. The first sprite that cannot fit
//! vertically ends the pass: it and everything sorted after it are dropped.
//!
//! Placement is a pure function of the size list, the atlas size and the
//! alignment, so repacking an unchanged sprite set reproduces the same atlas.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Integer rectangle used while packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl PackRect {
    /// Rectangle with its top-left corner at `(x, y)`.
    #[inline]
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap: shared edges do not count, zero-area rects never overlap.
    #[inline]
    pub fn overlaps(&self, other: &PackRect) -> bool {
        if self.w == 0 || self.h == 0 || other.w == 0 || other.h == 0 {
            return false;
        }
        let (ax1, ay1) = (self.x as u64 + self.w as u64, self.y as u64 + self.h as u64);
        let (bx1, by1) = (other.x as u64 + other.w as u64, other.y as u64 + other.h as u64);
        (self.x as u64) < bx1 && (other.x as u64) < ax1 && (self.y as u64) < by1 && (other.y as u64) < ay1
    }

    #[inline]
    fn fits(&self, atlas_size: u32) -> bool {
        self.x as u64 + self.w as u64 <= atlas_size as u64
            && self.y as u64 + self.h as u64 <= atlas_size as u64
    }
}

/// Result of a packing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    /// Position per input index. `(0, 0)` for dropped entries.
    pub positions: Vec<(u32, u32)>,
    /// Input indices that did not fit.
    pub dropped: BTreeSet<usize>,
    /// Input indices in placement order (largest first).
    pub order: Vec<usize>,
}

impl Packing {
    /// True when nothing was dropped.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Placed input indices, in placement order.
    pub fn placed(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied().filter(|i| !self.dropped.contains(i))
    }
}

/// Placement order: area descending, then width, then height, then input index.
pub fn sort_order(sizes: &[(u32, u32)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    // Stable sort keeps input order for full ties.
    order.sort_by(|&a, &b| compare_sizes(sizes[a], sizes[b]));
    order
}

fn compare_sizes((aw, ah): (u32, u32), (bw, bh): (u32, u32)) -> Ordering {
    let area_a = aw as u64 * ah as u64;
    let area_b = bw as u64 * bh as u64;
    area_b
        .cmp(&area_a)
        .then_with(|| bw.cmp(&aw))
        .then_with(|| bh.cmp(&ah))
}

/// Assigns a position to every `(width, height)` in `sizes` inside a square
/// canvas of `atlas_size` pixels.
///
/// Never fails: sprites that do not fit are reported in [`Packing::dropped`].
/// An `alignment` of zero behaves like one. Alignments larger than the atlas
/// are honoured as-is, which drops everything after the first row.
pub fn pack(sizes: &[(u32, u32)], atlas_size: u32, alignment: u32) -> Packing {
    let step = alignment.max(1);
    let order = sort_order(sizes);

    let mut positions = vec![(0, 0); sizes.len()];
    let mut dropped = BTreeSet::new();
    let mut placed: Vec<PackRect> = Vec::with_capacity(sizes.len());

    for (rank, &index) in order.iter().enumerate() {
        let (w, h) = sizes[index];
        let candidate = settle(PackRect::new(0, 0, w, h), &placed, atlas_size, step);

        if !candidate.fits(atlas_size) {
            dropped.extend(order[rank..].iter().copied());
            log::debug!(
                "sprite #{} ({}x{}) does not fit, dropping {} sprite(s)",
                index,
                w,
                h,
                order.len() - rank
            );
            break;
        }

        log::debug!("sprite #{} ({}x{}) at ({}, {})", index, w, h, candidate.x, candidate.y);
        positions[index] = (candidate.x, candidate.y);
        placed.push(candidate);
    }

    Packing {
        positions,
        dropped,
        order,
    }
}

/// Moves `candidate` until it overlaps none of `placed`.
fn settle(mut candidate: PackRect, placed: &[PackRect], atlas_size: u32, step: u32) -> PackRect {
    'scan: loop {
        for other in placed {
            while candidate.overlaps(other) {
                candidate.x += other.w;
                if candidate.x as u64 + candidate.w as u64 > atlas_size as u64 {
                    candidate.x = 0;
                    candidate.y += step;
                    continue 'scan;
                }
            }
        }
        // A shift past one rect can land on an earlier one; only a clean
        // full pass is final.
        if placed.iter().all(|other| !candidate.overlaps(other)) {
            return candidate;
        }
    }
}
