//! Tile generation for the progressive scheduler.
//!
//! The image is divided into a regular grid of square tiles; border
//! tiles are clipped to the image bounds. Each tile is one work item.

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 64;

/// A rectangular block of pixels processed as one work item.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    /// Position in the enqueue order; also keys the tile's random
    /// stream.
    pub index: usize,
}

/// Samples computed for one tile, row-major, three floats per pixel.
pub struct TileResult {
    pub tile: Tile,
    pub samples: Vec<f32>,
}

/// Generate the tile grid for an image, row-major.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut index = 0;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            tiles.push(Tile {
                x,
                y,
                w: tile_size.min(width - x),
                h: tile_size.min(height - y),
                index,
            });
            index += 1;
            x += tile_size;
        }
        y += tile_size;
    }

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fit() {
        let tiles = generate_tiles(128, 128, 64);
        assert_eq!(tiles.len(), 4);

        let total: u32 = tiles.iter().map(|t| t.w * t.h).sum();
        assert_eq!(total, 128 * 128);
    }

    #[test]
    fn test_border_tiles_are_clipped() {
        let tiles = generate_tiles(100, 70, 64);
        assert_eq!(tiles.len(), 4);

        let total: u32 = tiles.iter().map(|t| t.w * t.h).sum();
        assert_eq!(total, 100 * 70);

        // The bottom-right tile is the clipped remainder.
        let last = tiles.last().unwrap();
        assert_eq!((last.w, last.h), (36, 6));
    }

    #[test]
    fn test_small_image_single_tile() {
        let tiles = generate_tiles(8, 8, 64);
        assert_eq!(tiles.len(), 1);
        assert_eq!((tiles[0].w, tiles[0].h), (8, 8));
    }

    #[test]
    fn test_indices_are_sequential() {
        let tiles = generate_tiles(192, 128, 64);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.index, i);
        }
    }
}
