//! Property tests over generated datasets
//!
//! Builds random datasets and checks the map-construction contract: any
//! map that builds has every entry's indices inside strip bounds, and any
//! dataset with an out-of-range index is rejected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tipout_core::{BinMap, BinRow, MapError};

const COLORS: [&str; 6] = ["Orange", "White", "Blue", "Green", "Red", "Purple"];

fn random_rows(rng: &mut StdRng, strip_len: u16, allow_out_of_range: bool) -> Vec<BinRow> {
    let num_rows = rng.gen_range(1..20);
    (0..num_rows)
        .map(|i| {
            let num_indices = rng.gen_range(1..6);
            let bound = if allow_out_of_range {
                strip_len * 2
            } else {
                strip_len
            };
            let indices: Vec<String> = (0..num_indices)
                .map(|_| rng.gen_range(0..bound).to_string())
                .collect();
            BinRow {
                code: format!("SKU-{:03}-{}", i, (rng.gen_range(0..26_u8) + b'A') as char),
                bin_id: format!("B{}", i),
                led_indices: indices.join(","),
                color: COLORS[rng.gen_range(0..COLORS.len())].to_string(),
            }
        })
        .collect()
}

#[test]
fn test_built_maps_always_have_indices_in_bounds() {
    let mut rng = StdRng::seed_from_u64(0x7190_0417);
    for _ in 0..200 {
        let strip_len = rng.gen_range(8..200);
        let rows = random_rows(&mut rng, strip_len, true);

        match BinMap::build(&rows, &[], strip_len) {
            Ok(map) => {
                for entry in map.entries() {
                    assert!(!entry.led_indices.is_empty());
                    assert!(
                        entry.led_indices.iter().all(|&i| i < strip_len),
                        "entry {:?} escaped strip bounds {}",
                        entry,
                        strip_len
                    );
                }
            }
            Err(e) => {
                // The only violation this generator can produce is an
                // out-of-range index
                assert!(
                    matches!(e, MapError::IndexOutOfRange { .. }),
                    "unexpected error: {}",
                    e
                );
            }
        }
    }
}

#[test]
fn test_in_bounds_datasets_always_build() {
    let mut rng = StdRng::seed_from_u64(0x51AB_BEEF);
    for _ in 0..200 {
        let strip_len = rng.gen_range(8..200);
        let rows = random_rows(&mut rng, strip_len, false);

        let map = BinMap::build(&rows, &[], strip_len)
            .unwrap_or_else(|e| panic!("valid dataset rejected: {}", e));
        assert_eq!(map.stats().num_bins, rows.len());
    }
}
