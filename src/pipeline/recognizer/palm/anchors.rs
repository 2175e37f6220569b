/// Anchor count of the MediaPipe palm detector at 192x192 input.
pub const NUM_ANCHORS: usize = 2016;

const STRIDES: [u32; 4] = [8, 16, 16, 16];
const ANCHOR_OFFSET: f32 = 0.5;

/// SSD anchor centres in normalized input coordinates, in the order the
/// detector emits its boxes.
///
/// Consecutive layers sharing a stride are merged into one grid. Each layer
/// contributes two anchors per cell (aspect ratio 1 plus the interpolated
/// scale); anchor sizes are fixed so only centres are kept.
pub fn generate_anchors(input_size: u32) -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    let mut layer = 0;
    while layer < STRIDES.len() {
        let stride = STRIDES[layer];
        let mut per_cell = 0;
        while layer < STRIDES.len() && STRIDES[layer] == stride {
            per_cell += 2;
            layer += 1;
        }

        let grid = input_size.div_ceil(stride);
        for y in 0..grid {
            let cy = (y as f32 + ANCHOR_OFFSET) / grid as f32;
            for x in 0..grid {
                let cx = (x as f32 + ANCHOR_OFFSET) / grid as f32;
                anchors.extend(std::iter::repeat_n([cx, cy], per_cell));
            }
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_input_yields_2016_anchors() {
        assert_eq!(generate_anchors(192).len(), NUM_ANCHORS);
    }

    #[test]
    fn anchors_follow_grid_order() {
        let anchors = generate_anchors(192);
        let first_cell = 0.5 / 24.0;
        assert_eq!(anchors[0], [first_cell, first_cell]);
        assert_eq!(anchors[1], [first_cell, first_cell]);
        assert_eq!(anchors[2], [1.5 / 24.0, first_cell]);

        // Coarse grid starts after 24 * 24 * 2 fine anchors, six per cell.
        let coarse = &anchors[1152..];
        assert_eq!(coarse[0], [0.5 / 12.0, 0.5 / 12.0]);
        assert_eq!(coarse[5], [0.5 / 12.0, 0.5 / 12.0]);
        assert_eq!(coarse[6], [1.5 / 12.0, 0.5 / 12.0]);
        assert_eq!(*anchors.last().unwrap(), [11.5 / 12.0, 11.5 / 12.0]);
    }
}
