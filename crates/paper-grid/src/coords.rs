//! Translation between absolute board slots and paginated views.
//!
//! The board is always 12 columns wide. A device profile only decides how
//! many of those columns are shown per page, so every supported profile must
//! divide the board width evenly; the assertion below enforces that at
//! compile time.

use std::ops::Range;

use paper_types::models::{Coordinate, DeviceProfile, PagedCoordinate};

use crate::bounds::{BOARD_HEIGHT, BOARD_WIDTH};

const _: () = {
    let mut i = 0;
    while i < DeviceProfile::ALL.len() {
        assert!(BOARD_WIDTH % DeviceProfile::ALL[i].columns_per_page() == 0);
        i += 1;
    }
};

/// Number of pages the board splits into for `profile`.
pub const fn page_count(profile: DeviceProfile) -> u8 {
    BOARD_WIDTH / profile.columns_per_page()
}

/// Paged position to absolute slot. `page` is 1-based and must be at least 1;
/// use [`try_to_absolute`] for untrusted input.
pub fn to_absolute(page: u8, col: u8, row: u8, profile: DeviceProfile) -> Coordinate {
    let columns = profile.columns_per_page();
    Coordinate::new((page - 1) * columns + col, row)
}

/// Absolute slot to the page, column and row it is drawn at.
pub fn to_paged(coord: Coordinate, profile: DeviceProfile) -> PagedCoordinate {
    let columns = profile.columns_per_page();
    PagedCoordinate {
        page: coord.x / columns + 1,
        col: coord.x % columns,
        row: coord.y,
    }
}

/// Like [`to_absolute`] but rejects positions that do not exist for `profile`.
pub fn try_to_absolute(
    page: u8,
    col: u8,
    row: u8,
    profile: DeviceProfile,
) -> Option<Coordinate> {
    if page == 0 || page > page_count(profile) {
        return None;
    }
    if col >= profile.columns_per_page() || row >= BOARD_HEIGHT {
        return None;
    }
    Some(to_absolute(page, col, row, profile))
}

/// Absolute `x` values drawn on `page`, or `None` if the page does not exist.
pub fn page_columns(page: u8, profile: DeviceProfile) -> Option<Range<u8>> {
    if page == 0 || page > page_count(profile) {
        return None;
    }
    let columns = profile.columns_per_page();
    let start = (page - 1) * columns;
    Some(start..start + columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::all_coordinates;

    #[test]
    fn desktop_example() {
        let paged = to_paged(Coordinate::new(7, 3), DeviceProfile::Desktop);
        assert_eq!(paged, PagedCoordinate { page: 2, col: 1, row: 3 });
        assert_eq!(
            to_absolute(2, 1, 3, DeviceProfile::Desktop),
            Coordinate::new(7, 3)
        );
    }

    #[test]
    fn mobile_splits_into_three_pages() {
        assert_eq!(page_count(DeviceProfile::Mobile), 3);
        assert_eq!(page_count(DeviceProfile::Desktop), 2);
        let paged = to_paged(Coordinate::new(11, 9), DeviceProfile::Mobile);
        assert_eq!(paged, PagedCoordinate { page: 3, col: 3, row: 9 });
    }

    #[test]
    fn absolute_round_trips_for_every_slot() {
        for profile in DeviceProfile::ALL {
            for coord in all_coordinates() {
                let p = to_paged(coord, profile);
                assert_eq!(to_absolute(p.page, p.col, p.row, profile), coord);
            }
        }
    }

    #[test]
    fn paged_round_trips_for_every_position() {
        for profile in DeviceProfile::ALL {
            for page in 1..=page_count(profile) {
                for col in 0..profile.columns_per_page() {
                    for row in 0..BOARD_HEIGHT {
                        let coord = to_absolute(page, col, row, profile);
                        assert_eq!(to_paged(coord, profile), PagedCoordinate { page, col, row });
                    }
                }
            }
        }
    }

    #[test]
    fn checked_conversion_rejects_positions_off_the_profile() {
        let profile = DeviceProfile::Mobile;
        assert_eq!(try_to_absolute(0, 0, 0, profile), None);
        assert_eq!(try_to_absolute(4, 0, 0, profile), None);
        assert_eq!(try_to_absolute(1, 4, 0, profile), None);
        assert_eq!(try_to_absolute(1, 0, 10, profile), None);
        assert_eq!(try_to_absolute(3, 3, 9, profile), Some(Coordinate::new(11, 9)));
    }

    #[test]
    fn page_columns_cover_the_board_without_overlap() {
        for profile in DeviceProfile::ALL {
            let mut covered = Vec::new();
            for page in 1..=page_count(profile) {
                covered.extend(page_columns(page, profile).unwrap());
            }
            assert_eq!(covered, (0..BOARD_WIDTH).collect::<Vec<_>>());
            assert_eq!(page_columns(page_count(profile) + 1, profile), None);
        }
    }
}
