//! Run-length text codec for voxel volumes.
//!
//! A volume serializes to `id0,len0,id1,len1,...`: decimal block ids and
//! uppercase hexadecimal run lengths, comma separated, no trailing comma.
//! Runs follow the volume's scan order (X outer, Y middle, Z fastest),
//! which is also its linear memory layout. The final open run is always
//! emitted, so `decode(encode(v)) == v` for every volume.

use crate::persistence::{PersistenceError, PersistenceResult};
use crate::world::voxel::{BlockId, VoxelVolume};
use std::fmt::Write;

/// Encode a volume into the run-length token text. A volume with no
/// cells encodes to the empty string.
pub fn encode(volume: &VoxelVolume) -> String {
    encode_cells(volume.as_slice())
}

fn encode_cells(cells: &[u8]) -> String {
    let mut current = match cells.first() {
        Some(&cell) => cell,
        None => return String::new(),
    };
    // Worst case alternates ids every cell; start with a modest guess.
    let mut out = String::with_capacity(cells.len() / 4);

    let mut run: usize = 0;
    for &cell in cells {
        if cell != current {
            push_run(&mut out, current, run);
            current = cell;
            run = 1;
        } else {
            run += 1;
        }
    }
    push_run(&mut out, current, run);
    out
}

fn push_run(out: &mut String, id: u8, len: usize) {
    if !out.is_empty() {
        out.push(',');
    }
    // Writing to a String cannot fail
    let _ = write!(out, "{},{:X}", id, len);
}

/// Decode run-length token text into a volume of the given dimensions.
///
/// Runs of id `0` are skipped rather than written; the destination starts
/// zero-initialized. Decoding stops once `width*height*depth` cells are
/// accounted for. Input that ends early leaves the remainder empty; any
/// other inconsistency is a corruption error for the whole record.
pub fn decode(text: &str, width: i32, height: i32, depth: i32) -> PersistenceResult<VoxelVolume> {
    let mut volume = VoxelVolume::new(width, height, depth);
    let total = volume.volume();
    if text.is_empty() {
        return Ok(volume);
    }

    let mut filled: usize = 0;
    let mut tokens = text.split(',');
    while let Some(id_token) = tokens.next() {
        let len_token = tokens
            .next()
            .ok_or_else(|| PersistenceError::CorruptedData(format!("dangling id token '{}'", id_token)))?;
        let id: u8 = id_token
            .parse()
            .map_err(|_| PersistenceError::CorruptedData(format!("bad block id '{}'", id_token)))?;
        let len = usize::from_str_radix(len_token, 16)
            .map_err(|_| PersistenceError::CorruptedData(format!("bad run length '{}'", len_token)))?;
        if len == 0 {
            return Err(PersistenceError::CorruptedData(format!(
                "zero-length run for id {}",
                id
            )));
        }
        if filled + len > total {
            return Err(PersistenceError::CorruptedData(format!(
                "runs cover {} cells but the volume holds {}",
                filled + len,
                total
            )));
        }
        if id != 0 {
            volume.fill_run(filled, len, BlockId(id));
        }
        filled += len;
        if filled == total {
            if tokens.next().is_some() {
                return Err(PersistenceError::CorruptedData(
                    "tokens remain after the volume is full".to_string(),
                ));
            }
            break;
        }
    }

    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[u8]) -> VoxelVolume {
        let mut v = VoxelVolume::new(1, values.len() as i32, 1);
        for (y, &val) in values.iter().enumerate() {
            v.set(0, y as i32, 0, BlockId(val));
        }
        v
    }

    #[test]
    fn four_solid_voxels_encode_to_one_run() {
        let v = column(&[1, 1, 1, 1]);
        assert_eq!(encode(&v), "1,4");
        let back = decode("1,4", 1, 4, 1).expect("decode failed");
        assert_eq!(back, v);
    }

    #[test]
    fn final_run_is_emitted_even_when_it_opens_on_the_last_cell() {
        // The last cell differs from its predecessor; its run must still
        // appear in the output.
        let v = column(&[0, 0, 0, 1]);
        assert_eq!(encode(&v), "0,3,1,1");
        assert_eq!(decode("0,3,1,1", 1, 4, 1).expect("decode failed"), v);
    }

    #[test]
    fn run_lengths_are_uppercase_hex() {
        let v = column(&[2; 31]);
        assert_eq!(encode(&v), "2,1F");
        // Lowercase input still decodes
        assert_eq!(decode("2,1f", 1, 31, 1).expect("decode failed"), v);
    }

    #[test]
    fn empty_volume_round_trips() {
        let v = VoxelVolume::new(4, 16, 4);
        let text = encode(&v);
        assert_eq!(text, "0,100");
        let back = decode(&text, 4, 16, 4).expect("decode failed");
        assert!(back.is_all_empty());
    }

    #[test]
    fn mixed_volume_round_trips() {
        let mut v = VoxelVolume::new(4, 8, 4);
        // Deterministic speckle pattern crossing several run boundaries
        for x in 0..4 {
            for y in 0..8 {
                for z in 0..4 {
                    let h = (x * 31 + y * 7 + z * 3) % 5;
                    if h < 2 {
                        v.set(x, y, z, BlockId(1 + (h as u8)));
                    }
                }
            }
        }
        let text = encode(&v);
        let back = decode(&text, 4, 8, 4).expect("decode failed");
        assert_eq!(back, v);
    }

    #[test]
    fn boundary_cells_round_trip() {
        let mut v = VoxelVolume::new(3, 3, 3);
        v.set(0, 0, 0, BlockId(5));
        v.set(2, 2, 2, BlockId(9));
        let back = decode(&encode(&v), 3, 3, 3).expect("decode failed");
        assert_eq!(back, v);
    }

    #[test]
    fn short_input_leaves_remainder_empty() {
        let v = decode("1,2", 1, 4, 1).expect("decode failed");
        assert_eq!(v, column(&[1, 1, 0, 0]));
    }

    #[test]
    fn empty_input_decodes_to_empty_volume() {
        let v = decode("", 2, 2, 2).expect("decode failed");
        assert!(v.is_all_empty());
    }

    #[test]
    fn zero_cell_input_encodes_to_nothing() {
        assert_eq!(encode_cells(&[]), "");
    }

    #[test]
    fn dangling_id_token_is_corruption() {
        assert!(matches!(
            decode("1,2,3", 1, 4, 1),
            Err(PersistenceError::CorruptedData(_))
        ));
    }

    #[test]
    fn unparsable_tokens_are_corruption() {
        assert!(matches!(decode("x,4", 1, 4, 1), Err(PersistenceError::CorruptedData(_))));
        assert!(matches!(decode("1,G", 1, 4, 1), Err(PersistenceError::CorruptedData(_))));
        // Ids are a single byte
        assert!(matches!(decode("256,4", 1, 4, 1), Err(PersistenceError::CorruptedData(_))));
    }

    #[test]
    fn overlong_run_is_corruption() {
        assert!(matches!(decode("1,5", 1, 4, 1), Err(PersistenceError::CorruptedData(_))));
        assert!(matches!(decode("0,FFFF", 2, 2, 2), Err(PersistenceError::CorruptedData(_))));
    }

    #[test]
    fn trailing_tokens_after_full_volume_are_corruption() {
        assert!(matches!(
            decode("1,4,2,1", 1, 4, 1),
            Err(PersistenceError::CorruptedData(_))
        ));
    }

    #[test]
    fn zero_length_run_is_corruption() {
        assert!(matches!(decode("1,0", 1, 4, 1), Err(PersistenceError::CorruptedData(_))));
    }
}
