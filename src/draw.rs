use crate::error::Result;
use crate::logging::DRAW;
use crate::table::ComposTable;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::info;

const PALETTE: &[[u8; 3]] = &[
    [230, 25, 75],
    [60, 180, 75],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [0, 128, 128],
    [170, 110, 40],
    [128, 0, 0],
    [0, 0, 128],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStyle {
    Outline,
    Fill,
}

/// Colors each distinct value of `attr`; rows whose value is `-1` or empty
/// are not drawn. Values get palette colors in order of first appearance.
pub fn render(image: &RgbImage, table: &ComposTable, attr: &str, style: DrawStyle) -> RgbImage {
    let mut board = image.clone();
    let mut colors: IndexMap<String, Rgb<u8>> = IndexMap::new();

    for (row, compo) in table.iter().enumerate() {
        let value = table.cell(row, attr);
        if value.is_empty() || value == "-1" {
            continue;
        }
        let next = colors.len();
        let color = *colors
            .entry(value)
            .or_insert_with(|| Rgb(PALETTE[next % PALETTE.len()]));

        let (width, height) = (compo.bbox.width(), compo.bbox.height());
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = PixelRect::at(compo.bbox.column_min, compo.bbox.row_min)
            .of_size(width as u32, height as u32);
        match style {
            DrawStyle::Outline => draw_hollow_rect_mut(&mut board, rect, color),
            DrawStyle::Fill => draw_filled_rect_mut(&mut board, rect, color),
        }
    }
    board
}

/// Draws component outlines colored by `attr` into `<out_dir>/<name>.png`.
pub fn visualize(image: &RgbImage, table: &ComposTable, attr: &str, name: &str, out_dir: &Path) -> Result<PathBuf> {
    save(render(image, table, attr, DrawStyle::Outline), name, out_dir)
}

/// Like [`visualize`] with filled boxes.
pub fn visualize_fill(image: &RgbImage, table: &ComposTable, attr: &str, name: &str, out_dir: &Path) -> Result<PathBuf> {
    save(render(image, table, attr, DrawStyle::Fill), name, out_dir)
}

fn save(board: RgbImage, name: &str, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{name}.png"));
    board.save(&path)?;
    info!(target: DRAW, path = %path.display(), "Saved visualization");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Rect;
    use crate::table::Component;

    #[test]
    fn unlabelled_rows_are_not_drawn() {
        let mut labelled = Component::new(1, "Icon", Rect::new(2, 2, 8, 8));
        labelled.labels.list_item = Some(0);
        let plain = Component::new(2, "Icon", Rect::new(12, 2, 18, 8));
        let mut table = ComposTable::new(vec![labelled, plain]).unwrap();
        table.advance_stage(crate::table::Stage::Listed);

        let image = RgbImage::new(20, 10);
        let board = render(&image, &table, "list_item", DrawStyle::Fill);

        assert_eq!(board.get_pixel(5, 5), &Rgb(PALETTE[0]));
        assert_eq!(board.get_pixel(15, 5), &Rgb([0, 0, 0]));
        assert_eq!(board.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}
