use arrayvec::ArrayVec;

#[cfg(test)]
use pretty_assertions::assert_eq;

use crate::MAX_INPUT;

/// FNC4 regime for one input position.
///
/// Characters in `0x80..=0xFF` need the FNC4 escape: either a single FNC4
/// shift for an isolated character, or a latched extended region entered
/// and left with doubled FNC4. Normal characters inside a latched region
/// can in turn shift out per character instead of paying two pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FState {
    LatchNormal,
    ShiftNormal,
    LatchExt,
    ShiftExt,
}

/// Plan the FNC4 regime for every position.
pub(crate) fn plan(data: &[u16]) -> ArrayVec<FState, MAX_INPUT> {
    let mut fset: ArrayVec<FState, MAX_INPUT> = data
        .iter()
        .map(|&c| {
            // FNC placeholders sit above 0xFF and stay in the normal set.
            if (0x80..=0xFF).contains(&c) {
                FState::ShiftExt
            } else {
                FState::LatchNormal
            }
        })
        .collect();

    // Runs of five or more extended characters latch; so does a run of
    // three or more that touches the end of the input (ISO 15417 Annex E
    // note 3).
    let mut run = 0;
    for i in 0..fset.len() {
        if fset[i] == FState::ShiftExt {
            run += 1;
        } else {
            run = 0;
        }
        if run >= 5 {
            for state in &mut fset[i + 1 - 5..=i] {
                *state = FState::LatchExt;
            }
        }
        if run >= 3 && i == fset.len() - 1 {
            for state in &mut fset[i + 1 - 3..=i] {
                *state = FState::LatchExt;
            }
        }
    }

    // A short return to the normal set inside a latched extended region is
    // cheaper as per-character shifts than as a latch out and back in. The
    // thresholds mirror the ones above: five mid-input, three at the end.
    let mut i = 1;
    while i < fset.len() {
        if fset[i - 1] == FState::LatchExt && fset[i] == FState::LatchNormal {
            let mut j = i;
            while j < fset.len() && fset[j] == FState::LatchNormal {
                j += 1;
            }
            let len = j - i;
            let reaches_end = j == fset.len();
            if (reaches_end && len < 3) || (!reaches_end && len < 5) {
                for state in &mut fset[i..j] {
                    *state = FState::ShiftNormal;
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }

    fset
}

#[cfg(test)]
fn states(runs: &[(u16, usize)]) -> ArrayVec<FState, MAX_INPUT> {
    let mut data = crate::std::vec::Vec::new();
    for &(c, n) in runs {
        data.extend(core::iter::repeat(c).take(n));
    }
    plan(&data)
}

#[test]
fn test_plain_input_stays_normal() {
    let fset = states(&[(b'A' as u16, 4)]);
    assert!(fset.iter().all(|&f| f == FState::LatchNormal));
}

#[test]
fn test_isolated_extended_characters_shift() {
    let fset = states(&[(b'A' as u16, 1), (0xC1, 1), (b'B' as u16, 1)]);
    assert_eq!(
        &fset[..],
        &[FState::LatchNormal, FState::ShiftExt, FState::LatchNormal]
    );
}

#[test]
fn test_run_of_five_latches() {
    let fset = states(&[(0xC1, 5), (b'A' as u16, 5)]);
    assert!(fset[..5].iter().all(|&f| f == FState::LatchExt));
    assert!(fset[5..].iter().all(|&f| f == FState::LatchNormal));

    // A longer run keeps latching past the fifth character.
    let fset = states(&[(0xC1, 7)]);
    assert!(fset.iter().all(|&f| f == FState::LatchExt));
}

#[test]
fn test_tail_run_of_three_latches() {
    let fset = states(&[(b'A' as u16, 1), (0xC1, 3)]);
    assert_eq!(fset[0], FState::LatchNormal);
    assert!(fset[1..].iter().all(|&f| f == FState::LatchExt));

    // With four, the first extended character is left as a shift.
    let fset = states(&[(b'A' as u16, 1), (0xC1, 4)]);
    assert_eq!(fset[1], FState::ShiftExt);
    assert!(fset[2..].iter().all(|&f| f == FState::LatchExt));
}

#[test]
fn test_short_normal_run_inside_latch_becomes_shifts() {
    let fset = states(&[(0xC1, 5), (b'A' as u16, 2), (0xC1, 5)]);
    assert!(fset[..5].iter().all(|&f| f == FState::LatchExt));
    assert_eq!(&fset[5..7], &[FState::ShiftNormal, FState::ShiftNormal]);
    assert!(fset[7..].iter().all(|&f| f == FState::LatchExt));
}

#[test]
fn test_long_normal_run_inside_latch_stays_latched() {
    let fset = states(&[(0xC1, 5), (b'A' as u16, 5), (0xC1, 5)]);
    assert!(fset[5..10].iter().all(|&f| f == FState::LatchNormal));
}

#[test]
fn test_trailing_normal_run_thresholds() {
    // Two trailing normal characters shift out.
    let fset = states(&[(0xC1, 5), (b'A' as u16, 2)]);
    assert_eq!(&fset[5..], &[FState::ShiftNormal, FState::ShiftNormal]);

    // Three latch back to the normal set.
    let fset = states(&[(0xC1, 5), (b'A' as u16, 3)]);
    assert!(fset[5..].iter().all(|&f| f == FState::LatchNormal));
}

#[test]
fn test_fnc_placeholders_are_not_extended() {
    let fset = states(&[(crate::normalize::FNC1, 1), (crate::normalize::FNC4, 1)]);
    assert!(fset.iter().all(|&f| f == FState::LatchNormal));
}
