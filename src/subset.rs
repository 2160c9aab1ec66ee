//! Subset selection per ISO 15417 Annex E.
//!
//! Every position is first classified into the subsets that could carry
//! it, the classification is compressed into runs, and the runs are then
//! resolved front to back using the Annex E reduction rules. Odd digit
//! counts in subset C blocks and leading shifts are repaired afterwards,
//! and the projected symbol count is checked against the 80 symbol limit.

use arrayvec::ArrayVec;

#[cfg(test)]
use pretty_assertions::assert_eq;

use crate::extended::FState;
use crate::normalize::{FNC1, FNC2, FNC3, FNC4};
use crate::MAX_INPUT;

/// Subsets a single character could be encoded in, before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Candidate {
    /// Only subset A (control characters and their extended twins).
    ShiftA,
    /// Only subset B (lowercase range and its extended twin).
    ShiftB,
    /// Subset A or B.
    AOrB,
    /// Subset A, B or C (digits and FNC1).
    AOrBOrC,
}

/// Final encoding decision for a single position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Subset {
    ShiftA,
    LatchA,
    ShiftB,
    LatchB,
    LatchC,
}

fn candidate(c: u16, suppress_c: bool) -> Candidate {
    let candidate = match c {
        0..=31 => Candidate::ShiftA,
        48..=57 => Candidate::AOrBOrC,
        32..=95 => Candidate::AOrB,
        96..=127 => Candidate::ShiftB,
        128..=159 => Candidate::ShiftA,
        160..=223 => Candidate::AOrB,
        FNC1 => Candidate::AOrBOrC,
        FNC2 | FNC3 | FNC4 => Candidate::AOrB,
        _ => Candidate::ShiftB,
    };
    if suppress_c && candidate == Candidate::AOrBOrC {
        Candidate::AOrB
    } else {
        candidate
    }
}

fn is_digit(c: u16) -> bool {
    (48..=57).contains(&c)
}

/// Decide the subset for every position.
pub(crate) fn plan(data: &[u16], suppress_c: bool) -> ArrayVec<Subset, MAX_INPUT> {
    let mut runs: ArrayVec<(Candidate, usize), MAX_INPUT> = ArrayVec::new();
    for &c in data {
        let candidate = candidate(c, suppress_c);
        match runs.last_mut() {
            Some((last, len)) if *last == candidate => *len += 1,
            _ => runs.push((candidate, 1)),
        }
    }

    let mut reduced = reduce(&runs);
    merge(&mut reduced);

    let mut set: ArrayVec<Subset, MAX_INPUT> = ArrayVec::new();
    for &(subset, len) in &reduced {
        for _ in 0..len {
            set.push(subset);
        }
    }

    resolve_odd_c(data, &mut set);

    // A leading shift has no set to shift out of; promote the whole run
    // to the corresponding latch so a start code exists.
    if set.first() == Some(&Subset::ShiftA) {
        for subset in set.iter_mut() {
            if *subset != Subset::ShiftA {
                break;
            }
            *subset = Subset::LatchA;
        }
    }
    if set.first() == Some(&Subset::ShiftB) {
        for subset in set.iter_mut() {
            if *subset != Subset::ShiftB {
                break;
            }
            *subset = Subset::LatchB;
        }
    }

    set
}

/// Resolve each run against its already resolved predecessor and its
/// unresolved successor (ISO 15417 Annex E).
fn reduce(runs: &[(Candidate, usize)]) -> ArrayVec<(Subset, usize), MAX_INPUT> {
    let mut out: ArrayVec<(Subset, usize), MAX_INPUT> = ArrayVec::new();
    for (i, &(candidate, len)) in runs.iter().enumerate() {
        let next = runs.get(i + 1).map(|&(c, _)| c);
        let subset = match out.last() {
            None => resolve_first(candidate, len, runs.len() == 1, next),
            Some(&(prev, _)) => resolve_rest(candidate, len, prev, next),
        };
        out.push((subset, len));
    }
    out
}

fn resolve_first(
    candidate: Candidate,
    len: usize,
    only_run: bool,
    next: Option<Candidate>,
) -> Subset {
    match candidate {
        Candidate::AOrBOrC if (only_run && len == 2) || len >= 4 => Subset::LatchC,
        Candidate::AOrBOrC | Candidate::AOrB => {
            if next == Some(Candidate::ShiftA) {
                Subset::LatchA
            } else {
                Subset::LatchB
            }
        }
        Candidate::ShiftA => Subset::LatchA,
        Candidate::ShiftB => Subset::ShiftB,
    }
}

fn resolve_rest(candidate: Candidate, len: usize, prev: Subset, next: Option<Candidate>) -> Subset {
    match candidate {
        Candidate::AOrBOrC if len >= 4 => Subset::LatchC,
        Candidate::AOrBOrC | Candidate::AOrB => match (prev, next) {
            (Subset::LatchA, _) => Subset::LatchA,
            (Subset::LatchB, _) => Subset::LatchB,
            (_, Some(Candidate::ShiftA)) => Subset::LatchA,
            (_, Some(Candidate::ShiftB)) => Subset::LatchB,
            _ => Subset::LatchB,
        },
        Candidate::ShiftA => {
            if len > 1
                || matches!(prev, Subset::LatchA | Subset::LatchC)
                || next == Some(Candidate::AOrB)
            {
                Subset::LatchA
            } else {
                Subset::ShiftA
            }
        }
        Candidate::ShiftB => {
            if len > 1
                || matches!(prev, Subset::LatchB | Subset::LatchC)
                || next == Some(Candidate::AOrB)
            {
                Subset::LatchB
            } else {
                Subset::ShiftB
            }
        }
    }
}

fn merge(runs: &mut ArrayVec<(Subset, usize), MAX_INPUT>) {
    let mut i = 1;
    while i < runs.len() {
        if runs[i - 1].0 == runs[i].0 {
            runs[i - 1].1 += runs[i].1;
            runs.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Subset C packs two digits per codeword, so every C block must span an
/// even number of digits (FNC1 is encoded standalone and does not count).
/// An odd block gives up one digit to a neighbouring subset.
fn resolve_odd_c(data: &[u16], set: &mut [Subset]) {
    let mut start = 0;
    while start < set.len() {
        if set[start] != Subset::LatchC {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < set.len() && set[end] == Subset::LatchC {
            end += 1;
        }
        let digits = (start..end).filter(|&i| is_digit(data[i])).count();
        if digits % 2 == 1 {
            if start == 0 {
                // First block: the last digit moves out, matching the
                // following block if there is one in A or B.
                let index = (start..end).rev().find(|&i| is_digit(data[i])).unwrap();
                set[index] = match set.get(index + 1) {
                    Some(&subset) if subset != Subset::LatchC => subset,
                    _ => Subset::LatchB,
                };
            } else {
                // Later block: the first digit moves out, matching the
                // preceding block if it is in A or B.
                let index = (start..end).find(|&i| is_digit(data[i])).unwrap();
                set[index] = if set[index - 1] != Subset::LatchC {
                    set[index - 1]
                } else {
                    Subset::LatchB
                };
            }
        }
        start = end;
    }
}

/// Projected symbol count in half codeword units, start code included,
/// check digit and stop excluded.
pub(crate) fn projected_units(data: &[u16], set: &[Subset], fset: &[FState]) -> usize {
    let mut units = 0;
    let mut last_latch = None;
    for i in 0..data.len() {
        if matches!(set[i], Subset::ShiftA | Subset::ShiftB) {
            units += 2;
        }
        if matches!(fset[i], FState::ShiftExt | FState::ShiftNormal) {
            units += 2;
        }
        if matches!(set[i], Subset::LatchA | Subset::LatchB | Subset::LatchC)
            && last_latch != Some(set[i])
        {
            last_latch = Some(set[i]);
            units += 2;
        }
        // Entering or leaving a latched extended region costs a double
        // FNC4.
        if i == 0 {
            if fset[0] == FState::LatchExt {
                units += 4;
            }
        } else {
            if fset[i] == FState::LatchExt && fset[i - 1] != FState::LatchExt {
                units += 4;
            }
            if fset[i] != FState::LatchExt && fset[i - 1] == FState::LatchExt {
                units += 4;
            }
        }
        if set[i] == Subset::LatchC {
            units += if data[i] == FNC1 { 2 } else { 1 };
        } else {
            units += 2;
        }
    }
    units
}

#[cfg(test)]
fn plan_str(content: &str) -> ArrayVec<Subset, MAX_INPUT> {
    let data: crate::std::vec::Vec<u16> = content.chars().map(|c| c as u16).collect();
    plan(&data, false)
}

#[test]
fn test_letters_latch_b() {
    assert!(plan_str("Code").iter().all(|&s| s == Subset::LatchB));
}

#[test]
fn test_control_characters_latch_a() {
    assert!(plan_str("\x01\x02").iter().all(|&s| s == Subset::LatchA));
}

#[test]
fn test_upper_before_control_latches_a() {
    // AOrB followed by an A-only run resolves to A for both.
    assert!(plan_str("AB\x01").iter().all(|&s| s == Subset::LatchA));
}

#[test]
fn test_two_digit_input_latches_c() {
    assert!(plan_str("12").iter().all(|&s| s == Subset::LatchC));
}

#[test]
fn test_short_digit_input_stays_b() {
    assert!(plan_str("7").iter().all(|&s| s == Subset::LatchB));
    assert!(plan_str("123").iter().all(|&s| s == Subset::LatchB));
}

#[test]
fn test_single_control_shifts_inside_b() {
    let set = plan_str("ab\x01cd");
    assert_eq!(
        &set[..],
        &[
            Subset::LatchB,
            Subset::LatchB,
            Subset::ShiftA,
            Subset::LatchB,
            Subset::LatchB,
        ]
    );
}

#[test]
fn test_single_lowercase_shifts_inside_a() {
    let set = plan_str("\x01\x02a\x03");
    assert_eq!(
        &set[..],
        &[
            Subset::LatchA,
            Subset::LatchA,
            Subset::ShiftB,
            Subset::ShiftA,
        ]
    );
}

#[test]
fn test_odd_first_block_gives_up_last_digit() {
    let set = plan_str("12345");
    assert_eq!(
        &set[..],
        &[
            Subset::LatchC,
            Subset::LatchC,
            Subset::LatchC,
            Subset::LatchC,
            Subset::LatchB,
        ]
    );
}

#[test]
fn test_odd_later_block_gives_up_first_digit() {
    let set = plan_str("ABC12345");
    assert_eq!(&set[..4], &[Subset::LatchB; 4]);
    assert!(set[4..].iter().all(|&s| s == Subset::LatchC));
}

#[test]
fn test_fnc1_does_not_count_as_digit() {
    let mut data: crate::std::vec::Vec<u16> = "1234".chars().map(|c| c as u16).collect();
    data.insert(0, FNC1);
    let set = plan(&data, false);
    assert!(set.iter().all(|&s| s == Subset::LatchC));
}

#[test]
fn test_leading_shift_run_promoted_to_latch() {
    // A lone lowercase run at the start has nothing to shift out of.
    let set = plan_str("ab");
    assert!(set.iter().all(|&s| s == Subset::LatchB));
}

#[test]
fn test_subset_c_suppression() {
    let data: crate::std::vec::Vec<u16> = "123456".chars().map(|c| c as u16).collect();
    let set = plan(&data, true);
    assert!(set.iter().all(|&s| s == Subset::LatchB));
}

#[test]
fn test_projected_units_counts_digit_pairs() {
    let data: crate::std::vec::Vec<u16> = "123456".chars().map(|c| c as u16).collect();
    let set = plan(&data, false);
    let fset = crate::extended::plan(&data);
    // Start code plus three digit pairs.
    assert_eq!(projected_units(&data, &set, &fset), 8);
}

#[test]
fn test_projected_units_counts_extended_latches() {
    let data: crate::std::vec::Vec<u16> = core::iter::repeat(0xC1).take(5).collect();
    let set = plan(&data, false);
    let fset = crate::extended::plan(&data);
    // Start code, double FNC4, five characters.
    assert_eq!(projected_units(&data, &set, &fset), 2 + 4 + 10);
}
