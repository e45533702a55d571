use glam::{uvec2, UVec2, Vec4};

use crate::{ProbeBordersPassParams, TexelsMut};

/// Returns the texel that should be copied into given texel of a probe tile
/// so that bilinear filtering stays continuous across the octahedral seams,
/// or `None` if given texel doesn't belong to the border.
///
/// Coordinates are tile-local, border included (`0 ..= resolution + 1`).
pub fn border_source(texel: UVec2, resolution: u32) -> Option<UVec2> {
    let n = resolution;
    let last = n + 1;

    match (texel.x, texel.y) {
        (0, 0) => Some(uvec2(n, n)),
        (x, 0) if x == last => Some(uvec2(1, n)),
        (0, y) if y == last => Some(uvec2(n, 1)),
        (x, y) if x == last && y == last => Some(uvec2(1, 1)),
        (x, y) if x > last || y > last => None,
        (x, 0) => Some(uvec2(last - x, 1)),
        (x, y) if y == last => Some(uvec2(last - x, n)),
        (0, y) => Some(uvec2(1, last - y)),
        (x, y) if x == last => Some(uvec2(n, last - y)),
        _ => None,
    }
}

/// Fills top and bottom border rows of given tile, corners included.
///
/// `thread.x` walks through the row (`0 ..= resolution + 1`), `thread.y`
/// picks the row (`0` for top, `1` for bottom).
pub fn update_border_rows(
    params: &ProbeBordersPassParams,
    tile_idx: u32,
    thread: UVec2,
    atlas: &mut TexelsMut<Vec4>,
) {
    let last = params.resolution + 1;

    if thread.x > last || thread.y > 1 {
        return;
    }

    copy_border_texel(
        params,
        tile_idx,
        uvec2(thread.x, thread.y * last),
        atlas,
    );
}

/// Fills left and right border columns of given tile, corners excluded.
///
/// `thread.x` picks the column (`0` for left, `1` for right), `thread.y`
/// walks through the column (`0 .. resolution`).
pub fn update_border_columns(
    params: &ProbeBordersPassParams,
    tile_idx: u32,
    thread: UVec2,
    atlas: &mut TexelsMut<Vec4>,
) {
    let last = params.resolution + 1;

    if thread.x > 1 || thread.y >= params.resolution {
        return;
    }

    copy_border_texel(
        params,
        tile_idx,
        uvec2(thread.x * last, thread.y + 1),
        atlas,
    );
}

fn copy_border_texel(
    params: &ProbeBordersPassParams,
    tile_idx: u32,
    texel: UVec2,
    atlas: &mut TexelsMut<Vec4>,
) {
    if tile_idx >= params.tiles_count {
        return;
    }

    let Some(src) = border_source(texel, params.resolution) else {
        return;
    };

    let tile_size = params.resolution + 2;
    let tiles_per_row = atlas.size().x / tile_size;

    let origin =
        uvec2(tile_idx % tiles_per_row, tile_idx / tiles_per_row) * tile_size;

    let val = atlas.read(origin + src);

    atlas.write(origin + texel, val);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RES: u32 = 6;

    #[test]
    fn border_source() {
        // Edges
        assert_eq!(Some(uvec2(1, 4)), super::border_source(uvec2(0, 3), RES));
        assert_eq!(Some(uvec2(6, 4)), super::border_source(uvec2(7, 3), RES));
        assert_eq!(Some(uvec2(5, 1)), super::border_source(uvec2(2, 0), RES));
        assert_eq!(Some(uvec2(5, 6)), super::border_source(uvec2(2, 7), RES));

        // Corners
        assert_eq!(Some(uvec2(6, 6)), super::border_source(uvec2(0, 0), RES));
        assert_eq!(Some(uvec2(1, 6)), super::border_source(uvec2(7, 0), RES));
        assert_eq!(Some(uvec2(6, 1)), super::border_source(uvec2(0, 7), RES));
        assert_eq!(Some(uvec2(1, 1)), super::border_source(uvec2(7, 7), RES));

        // Interior and outside
        assert_eq!(None, super::border_source(uvec2(3, 3), RES));
        assert_eq!(None, super::border_source(uvec2(8, 0), RES));
    }

    #[test]
    fn update_borders() {
        let tile_size = RES + 2;
        let size = uvec2(2 * tile_size, tile_size);

        // Every interior texel holds its own position and tile index
        let mut data: Vec<_> = (0..size.x * size.y)
            .map(|idx| {
                let pos = uvec2(idx % size.x, idx / size.x);
                let local = pos % tile_size;
                let tile = pos.x / tile_size;

                let is_interior = local.x >= 1
                    && local.y >= 1
                    && local.x <= RES
                    && local.y <= RES;

                if is_interior {
                    Vec4::new(local.x as f32, local.y as f32, tile as f32, 1.0)
                } else {
                    Vec4::ZERO
                }
            })
            .collect();

        let params = ProbeBordersPassParams {
            resolution: RES,
            tiles_count: 2,
            ..Default::default()
        };

        let mut atlas = TexelsMut::new(&mut data, size);

        for tile_idx in 0..2 {
            for y in 0..2 {
                for x in 0..tile_size {
                    update_border_rows(&params, tile_idx, uvec2(x, y), &mut atlas);
                }
            }

            for y in 0..RES {
                for x in 0..2 {
                    update_border_columns(&params, tile_idx, uvec2(x, y), &mut atlas);
                }
            }
        }

        let read = |tile: u32, x: u32, y: u32| {
            let val = data[((y * size.x) + tile * tile_size + x) as usize];

            assert_eq!(tile as f32, val.z);
            assert_eq!(1.0, val.w);

            uvec2(val.x as u32, val.y as u32)
        };

        for tile in 0..2 {
            assert_eq!(uvec2(1, 4), read(tile, 0, 3));
            assert_eq!(uvec2(6, 6), read(tile, 0, 0));
            assert_eq!(uvec2(1, 6), read(tile, 7, 0));
            assert_eq!(uvec2(6, 1), read(tile, 0, 7));
            assert_eq!(uvec2(1, 1), read(tile, 7, 7));

            for i in 1..=RES {
                assert_eq!(uvec2(RES + 1 - i, 1), read(tile, i, 0));
                assert_eq!(uvec2(RES + 1 - i, RES), read(tile, i, RES + 1));
                assert_eq!(uvec2(1, RES + 1 - i), read(tile, 0, i));
                assert_eq!(uvec2(RES, RES + 1 - i), read(tile, RES + 1, i));
            }
        }
    }
}
