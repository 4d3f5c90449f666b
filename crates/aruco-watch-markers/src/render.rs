use crate::Dictionary;
use aruco_watch_core::GrayImage;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("marker id {id} is outside the dictionary (0..{len})")]
    UnknownId { id: u32, len: usize },
    #[error("cell size must be at least one pixel")]
    ZeroCellSize,
}

/// Render marker `id` as a grayscale image with a one-cell black border and a
/// white quiet zone of `quiet_zone_cells` around it.
///
/// The image side is `(marker_size + 2 + 2 * quiet_zone_cells) * cell_px` and
/// the marker's top-left pixel sits at `quiet_zone_cells * cell_px`.
pub fn render_marker(
    dict: Dictionary,
    id: u32,
    cell_px: usize,
    quiet_zone_cells: usize,
) -> Result<GrayImage, RenderError> {
    if cell_px == 0 {
        return Err(RenderError::ZeroCellSize);
    }
    let code = dict.code(id).ok_or(RenderError::UnknownId {
        id,
        len: dict.len(),
    })?;

    let n = dict.marker_size;
    let cells = n + 2 + 2 * quiet_zone_cells;
    let side = cells * cell_px;
    let mut img = GrayImage::filled(side, side, 255);

    for cy in 0..n + 2 {
        for cx in 0..n + 2 {
            let inner = (1..=n).contains(&cx) && (1..=n).contains(&cy);
            let black = !inner || dict.bit(code, cx - 1, cy - 1);
            if !black {
                continue;
            }
            let x0 = (cx + quiet_zone_cells) * cell_px;
            let y0 = (cy + quiet_zone_cells) * cell_px;
            for y in y0..y0 + cell_px {
                for x in x0..x0 + cell_px {
                    img.set(x, y, 0);
                }
            }
        }
    }

    Ok(img)
}
