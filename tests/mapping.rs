#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for panel wiring and the pixel mapper.

use matrix_envoy::led2d::layout::{LedLayout, PixelMapper, Rotation};
use matrix_envoy::{Error, MATRIX_HEIGHT, MATRIX_LEN, MATRIX_WIDTH};

type MatrixMapper = PixelMapper<MATRIX_LEN, MATRIX_WIDTH, MATRIX_HEIGHT>;

fn matrix_mapper() -> MatrixMapper {
    MatrixMapper::for_rotation(Rotation::Rotate270).unwrap()
}

#[test]
fn mapper_covers_every_led_once() {
    let mapper = matrix_mapper();
    let mut seen = [false; MATRIX_LEN];
    for row in 0..MATRIX_HEIGHT {
        for col in 0..MATRIX_WIDTH {
            let index = mapper.map_to_physical_index(row, col).unwrap();
            assert!(index < MATRIX_LEN, "({row}, {col}) -> {index}");
            assert!(!seen[index], "LED {index} mapped twice");
            seen[index] = true;
        }
    }
    assert!(seen.iter().all(|hit| *hit));
}

#[test]
fn mapper_follows_the_right_edge_serpentine() {
    let mapper = matrix_mapper();
    for row in 0..MATRIX_HEIGHT {
        for col in 0..MATRIX_WIDTH {
            let block = (MATRIX_WIDTH - 1 - col) * MATRIX_HEIGHT;
            let expected = if col % 2 == 0 {
                block + row
            } else {
                block + (MATRIX_HEIGHT - 1 - row)
            };
            assert_eq!(mapper.map_to_physical_index(row, col).unwrap(), expected);
        }
    }
    // corners
    assert_eq!(mapper.map_to_physical_index(0, 0).unwrap(), 248);
    assert_eq!(mapper.map_to_physical_index(7, 0).unwrap(), 255);
    assert_eq!(mapper.map_to_physical_index(7, 31).unwrap(), 0);
    assert_eq!(mapper.map_to_physical_index(0, 31).unwrap(), 7);
}

#[test]
fn mapper_rejects_out_of_range_coordinates() {
    let mapper = matrix_mapper();
    assert!(matches!(
        mapper.map_to_physical_index(MATRIX_HEIGHT, 0),
        Err(Error::OutOfBounds)
    ));
    assert!(matches!(
        mapper.map_to_physical_index(0, MATRIX_WIDTH),
        Err(Error::OutOfBounds)
    ));
}

#[test]
fn only_the_mounted_rotation_has_a_table() {
    for rotation in [Rotation::Rotate0, Rotation::Rotate90, Rotation::Rotate180] {
        assert!(matches!(
            MatrixMapper::for_rotation(rotation),
            Err(Error::UnsupportedRotation(r)) if r == rotation
        ));
    }
    assert_eq!(Rotation::default(), Rotation::Rotate270);
}

#[test]
fn xy_to_index_inverts_index_to_xy() {
    const SERPENTINE: LedLayout<6, 3, 2> = LedLayout::serpentine_row_major();
    let by_xy = SERPENTINE.xy_to_index();
    for (led_index, (x, y)) in SERPENTINE.index_to_xy().iter().enumerate() {
        let cell = usize::from(*y) * 3 + usize::from(*x);
        assert_eq!(usize::from(by_xy[cell]), led_index);
    }
}

#[test]
fn serpentine_transforms_match_expected() {
    const SERPENTINE: LedLayout<6, 3, 2> = LedLayout::serpentine_row_major();
    assert_eq!(
        *SERPENTINE.index_to_xy(),
        [(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1)]
    );

    assert_eq!(
        *SERPENTINE.rotate_cw().index_to_xy(),
        [(1, 0), (1, 1), (1, 2), (0, 2), (0, 1), (0, 0)]
    );
    assert_eq!(
        *SERPENTINE.rotate_ccw().index_to_xy(),
        [(0, 2), (0, 1), (0, 0), (1, 0), (1, 1), (1, 2)]
    );
    assert_eq!(
        *SERPENTINE.flip_v().index_to_xy(),
        [(0, 1), (1, 1), (2, 1), (2, 0), (1, 0), (0, 0)]
    );
}

#[test]
fn quarter_turns_undo_each_other() {
    const SERPENTINE: LedLayout<6, 3, 2> = LedLayout::serpentine_row_major();
    assert!(SERPENTINE.rotate_cw().rotate_ccw().equals(&SERPENTINE));
    assert!(SERPENTINE.flip_v().flip_v().equals(&SERPENTINE));
}

#[test]
fn mounted_panel_starts_in_the_bottom_right_corner() {
    let layout = Rotation::Rotate270
        .led_layout::<MATRIX_LEN, MATRIX_WIDTH, MATRIX_HEIGHT>()
        .unwrap();
    let xy = layout.index_to_xy();
    assert_eq!(xy[0], (31, 7));
    assert_eq!(xy[7], (31, 0));
    assert_eq!(xy[8], (30, 0));
    assert_eq!(xy[255], (0, 7));
}

#[test]
#[should_panic(expected = "duplicate (x, y) in mapping")]
fn new_panics_on_duplicate_cell() {
    let _ = LedLayout::<3, 3, 1>::new([(0, 0), (1, 0), (1, 0)]);
}

#[test]
#[should_panic(expected = "W*H must equal N")]
fn new_panics_on_mismatched_dimensions() {
    let _ = LedLayout::<5, 3, 2>::new([(0, 0), (1, 0), (2, 0), (0, 1), (1, 1)]);
}
