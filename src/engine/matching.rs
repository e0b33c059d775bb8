//! Box-to-track assignment for re-seeding.

use ndarray::Array2;

use crate::tracker::{Rect, iou_batch};

/// Cost used to pad the assignment matrix to a square.
const PAD_COST: f64 = 1e6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// `(track_index, box_index)` pairs.
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_boxes: Vec<usize>,
}

/// `1 - IoU` cost matrix between current tracks and incoming boxes.
pub fn iou_distance(track_boxes: &[Rect], boxes: &[Rect]) -> Array2<f32> {
    iou_batch(track_boxes, boxes).mapv(|iou| 1.0 - iou)
}

/// Minimum-cost one-to-one assignment (LAPJV); pairs costing more than
/// `thresh` are left unmatched.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> Assignment {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return Assignment {
            matches: Vec::new(),
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_boxes: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PAD_COST);
    for ((i, j), cost) in cost_matrix.indexed_iter() {
        padded[[i, j]] = f64::from(*cost);
    }

    let mut assignment = Assignment::default();
    let mut box_free = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
                if col < num_cols && cost_matrix[[row, col]] <= thresh {
                    assignment.matches.push((row, col));
                    box_free[col] = false;
                } else {
                    assignment.unmatched_tracks.push(row);
                }
            }
        }
        Err(_) => assignment.unmatched_tracks = (0..num_rows).collect(),
    }

    assignment.unmatched_boxes = box_free
        .iter()
        .enumerate()
        .filter_map(|(i, &free)| free.then_some(i))
        .collect();
    assignment
}
