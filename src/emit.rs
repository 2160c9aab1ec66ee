use core::fmt::Write as _;

use crate::std::string::String;
use crate::std::vec::Vec;

#[cfg(test)]
use pretty_assertions::assert_eq;

use crate::extended::FState;
use crate::normalize::{FNC1, FNC2, FNC3, FNC4};
use crate::subset::Subset;
use crate::{
    CompositeMode, DataType, EncodingError, CODE_FNC1, CODE_FNC2, CODE_FNC3, FNC4_IN_A, FNC4_IN_B,
    SHIFT, START_A, START_B, START_C, SWITCH_A, SWITCH_B, SWITCH_C,
};

/// Bar/space patterns for the codewords 0 to 105 plus the stop pattern,
/// most significant bit first. The regular patterns are eleven modules
/// wide, the stop pattern thirteen.
pub(crate) const PATTERNS: [u16; 107] = [
    0x6cc, 0x66c, 0x666, 0x498, 0x48c, 0x44c, 0x4c8, 0x4c4, 0x464, 0x648, 0x644, 0x624, 0x59c,
    0x4dc, 0x4ce, 0x5cc, 0x4ec, 0x4e6, 0x672, 0x65c, 0x64e, 0x6e4, 0x674, 0x76e, 0x74c, 0x72c,
    0x726, 0x764, 0x734, 0x732, 0x6d8, 0x6c6, 0x636, 0x518, 0x458, 0x446, 0x588, 0x468, 0x462,
    0x688, 0x628, 0x622, 0x5b8, 0x58e, 0x46e, 0x5d8, 0x5c6, 0x476, 0x776, 0x68e, 0x62e, 0x6e8,
    0x6e2, 0x6ee, 0x758, 0x746, 0x716, 0x768, 0x762, 0x71a, 0x77a, 0x642, 0x78a, 0x530, 0x50c,
    0x4b0, 0x486, 0x42c, 0x426, 0x590, 0x584, 0x4d0, 0x4c2, 0x434, 0x432, 0x612, 0x650, 0x7ba,
    0x614, 0x47a, 0x53c, 0x4bc, 0x49e, 0x5e4, 0x4f4, 0x4f2, 0x7a4, 0x794, 0x792, 0x6de, 0x6f6,
    0x7b6, 0x578, 0x51e, 0x45e, 0x5e8, 0x5e2, 0x7a8, 0x7a2, 0x5de, 0x5ee, 0x75e, 0x7ae, 0x684,
    0x690, 0x69c, 0x18eb,
];

/// Materialize the module width string for a row of codeword values.
pub(crate) fn pattern_row(values: &[u8]) -> String {
    let mut row = String::with_capacity(values.len() * 6 + 1);
    for &value in values {
        push_widths(PATTERNS[value as usize], &mut row);
    }
    row
}

fn push_widths(pattern: u16, row: &mut String) {
    let bits = 16 - pattern.leading_zeros();
    let mut width = 0u8;
    let mut last = true;
    for i in (0..bits).rev() {
        let bar = pattern & (1 << i) != 0;
        if bar == last {
            width += 1;
        } else {
            row.push((b'0' + width) as char);
            last = bar;
            width = 1;
        }
    }
    row.push((b'0' + width) as char);
}

/// The latched code set of the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Set {
    A,
    B,
    C,
}

fn latch_target(subset: Subset) -> Option<Set> {
    match subset {
        Subset::LatchA => Some(Set::A),
        Subset::LatchB => Some(Set::B),
        Subset::LatchC => Some(Set::C),
        Subset::ShiftA | Subset::ShiftB => None,
    }
}

/// The set a position's data codeword is taken from, shifts included.
fn data_set(subset: Subset) -> Set {
    match subset {
        Subset::ShiftA | Subset::LatchA => Set::A,
        Subset::ShiftB | Subset::LatchB => Set::B,
        Subset::LatchC => Set::C,
    }
}

/// FNC4 codeword for the current set. There is none in subset C.
fn fnc4(current: Set) -> Option<u8> {
    match current {
        Set::A => Some(FNC4_IN_A),
        Set::B => Some(FNC4_IN_B),
        Set::C => None,
    }
}

struct Out {
    values: Vec<u8>,
    trace: String,
}

impl Out {
    fn push(&mut self, value: u8, label: &str) {
        self.values.push(value);
        self.trace.push_str(label);
        self.trace.push(' ');
    }

    fn push_data(&mut self, value: u8) {
        self.values.push(value);
        let _ = write!(self.trace, "{} ", value);
    }

    fn push_fnc4_pair(&mut self, current: Set) -> Result<(), EncodingError> {
        let code = fnc4(current).ok_or(EncodingError::Invariant(
            "extended latch transition under subset C",
        ))?;
        self.push(code, "FNC4");
        self.push(code, "FNC4");
        Ok(())
    }
}

/// Walk the annotated input once and emit start code, latches, shifts,
/// function codewords and data codewords, plus the linkage flag for
/// composite symbols. Check digit and stop are appended by the caller.
pub(crate) fn emit(
    data: &[u16],
    set: &[Subset],
    fset: &[FState],
    data_type: DataType,
    reader_init: bool,
    composite: CompositeMode,
) -> Result<(Vec<u8>, String), EncodingError> {
    let mut out = Out {
        values: Vec::with_capacity(data.len() + 8),
        trace: String::from("Encoding: "),
    };

    let start = set.first().copied().unwrap_or(Subset::LatchB);
    let Some(mut current) = latch_target(start) else {
        return Err(EncodingError::Invariant(
            "input begins with an unresolved shift",
        ));
    };

    if reader_init {
        match current {
            Set::A => {
                out.push(START_A, "STARTA");
                out.push(CODE_FNC3, "FNC3");
            }
            Set::B => {
                out.push(START_B, "STARTB");
                out.push(CODE_FNC3, "FNC3");
            }
            Set::C => {
                // There is no reader initialisation form of Start C:
                // start in B, program the reader, then latch to C.
                out.push(START_B, "STARTB");
                out.push(CODE_FNC3, "FNC3");
                out.push(SWITCH_C, "CODEC");
            }
        }
    } else {
        match current {
            Set::A => out.push(START_A, "STARTA"),
            Set::B => out.push(START_B, "STARTB"),
            Set::C => out.push(START_C, "STARTC"),
        }
    }

    if data_type == DataType::Gs1 {
        out.push(CODE_FNC1, "FNC1");
    }

    let mut extended = false;
    if fset.first() == Some(&FState::LatchExt) {
        out.push_fnc4_pair(current)?;
        extended = true;
    }

    let mut read = 0;
    while read < data.len() {
        let subset = set[read];

        if read != 0 {
            // An extended region ending on a subset C position cancels in
            // the outgoing set, before the latch: FNC4 does not exist in C.
            if extended
                && fset[read] == FState::LatchNormal
                && latch_target(subset) == Some(Set::C)
                && current != Set::C
            {
                out.push_fnc4_pair(current)?;
                extended = false;
            }

            if let Some(target) = latch_target(subset) {
                if target != current {
                    match target {
                        Set::A => out.push(SWITCH_A, "CODEA"),
                        Set::B => out.push(SWITCH_B, "CODEB"),
                        Set::C => out.push(SWITCH_C, "CODEC"),
                    }
                    current = target;
                }
            }

            if fset[read] == FState::LatchExt && !extended {
                out.push_fnc4_pair(current)?;
                extended = true;
            } else if fset[read] == FState::LatchNormal && extended {
                out.push_fnc4_pair(current)?;
                extended = false;
            }
        }

        // A single FNC4 shift, only where it toggles the regime.
        match fset[read] {
            FState::ShiftExt if !extended => {
                let code = fnc4(current).ok_or(EncodingError::Invariant(
                    "extended character planned for subset C",
                ))?;
                out.push(code, "FNC4");
            }
            FState::ShiftNormal if extended => {
                // No shift for digits packed into subset C; the extended
                // latch persists across the C stretch.
                if let Some(code) = fnc4(current) {
                    out.push(code, "FNC4");
                }
            }
            _ => {}
        }

        match subset {
            Subset::ShiftA if current != Set::A => out.push(SHIFT, "SHFT"),
            Subset::ShiftB if current != Set::B => out.push(SHIFT, "SHFT"),
            _ => {}
        }

        let c = data[read];
        match data_set(subset) {
            Set::A => {
                match c {
                    FNC1 => out.push(CODE_FNC1, "FNC1"),
                    FNC2 => out.push(CODE_FNC2, "FNC2"),
                    FNC3 => out.push(CODE_FNC3, "FNC3"),
                    FNC4 => out.push(FNC4_IN_A, "FNC4"),
                    0..=31 => out.push_data(c as u8 + 64),
                    32..=95 => out.push_data(c as u8 - 32),
                    128..=159 => out.push_data((c - 128) as u8 + 64),
                    160..=255 => out.push_data((c - 160) as u8),
                    _ => {
                        return Err(EncodingError::Invariant(
                            "character not encodable in subset A",
                        ))
                    }
                }
                read += 1;
            }
            Set::B => {
                match c {
                    FNC1 => out.push(CODE_FNC1, "FNC1"),
                    FNC2 => out.push(CODE_FNC2, "FNC2"),
                    FNC3 => out.push(CODE_FNC3, "FNC3"),
                    FNC4 => out.push(FNC4_IN_B, "FNC4"),
                    32..=127 => out.push_data(c as u8 - 32),
                    160..=255 => out.push_data((c - 160) as u8),
                    _ => {
                        return Err(EncodingError::Invariant(
                            "character not encodable in subset B",
                        ))
                    }
                }
                read += 1;
            }
            Set::C => {
                if c == FNC1 {
                    out.push(CODE_FNC1, "FNC1");
                    read += 1;
                } else {
                    match (c, data.get(read + 1).copied()) {
                        (48..=57, Some(d @ 48..=57)) => {
                            out.push_data((10 * (c - 48) + (d - 48)) as u8);
                            read += 2;
                        }
                        _ => {
                            return Err(EncodingError::Invariant(
                                "unpairable digit in subset C",
                            ))
                        }
                    }
                }
            }
        }
    }

    let flag = match composite {
        CompositeMode::Off => None,
        // Linkage flags per ISO/IEC 24723 section 7.4, selected by the
        // latched set at the end of the data.
        CompositeMode::CcA | CompositeMode::CcB => Some(match current {
            Set::A => 100,
            Set::B => 99,
            Set::C => 101,
        }),
        CompositeMode::CcC => Some(match current {
            Set::A => 99,
            Set::B => 101,
            Set::C => 100,
        }),
    };
    if let Some(flag) = flag {
        out.values.push(flag);
        let _ = write!(out.trace, "\nLinkage flag: {}", flag);
    }

    Ok((out.values, out.trace))
}

#[test]
fn test_pattern_widths() {
    let mut row = String::new();
    push_widths(PATTERNS[0], &mut row);
    assert_eq!(row, "212222");

    let row = pattern_row(&[START_A, START_B, START_C]);
    assert_eq!(row, "211412211214211232");

    let mut stop = String::new();
    push_widths(PATTERNS[106], &mut stop);
    assert_eq!(stop, "2331112");
}

#[test]
fn test_pattern_module_counts() {
    for pattern in &PATTERNS[..106] {
        let mut row = String::new();
        push_widths(*pattern, &mut row);
        assert_eq!(row.len(), 6);
        let modules: u32 = row.bytes().map(|b| (b - b'0') as u32).sum();
        assert_eq!(modules, 11);
    }
    let mut row = String::new();
    push_widths(PATTERNS[106], &mut row);
    assert_eq!(row.len(), 7);
    let modules: u32 = row.bytes().map(|b| (b - b'0') as u32).sum();
    assert_eq!(modules, 13);
}

#[test]
fn test_gs1_preamble_follows_reader_init_block() {
    let code = crate::Code128::builder()
        .with_data_type(DataType::Gs1)
        .with_reader_init(true)
        .encode("12")
        .unwrap();
    assert_eq!(code.codewords()[..5], [104, 96, 99, 102, 12]);
}

#[test]
fn test_extended_region_cancels_before_subset_c() {
    let mut content: String = core::iter::repeat('\u{C1}').take(5).collect();
    content.push_str("123456");
    let code = crate::Code128::encode(&content).unwrap();
    assert_eq!(
        code.codewords()[..14],
        [104, 100, 100, 33, 33, 33, 33, 33, 100, 100, 99, 12, 34, 56]
    );
}

#[test]
fn test_no_shift_emitted_when_set_already_matches() {
    let code = crate::Code128::encode("\x01\x02a\x03").unwrap();
    assert_eq!(code.codewords()[..6], [103, 65, 66, 98, 65, 67]);
}

#[test]
fn test_fnc1_between_digits_is_standalone_in_c() {
    let mut content = String::from("12");
    content.push(crate::FNC1);
    content.push_str("34");
    let code = crate::Code128::encode(&content).unwrap();
    assert_eq!(code.codewords()[..4], [105, 12, 102, 34]);
}

#[test]
fn test_unpairable_digit_group_is_rejected() {
    let mut content = String::from("123");
    content.push(crate::FNC1);
    content.push_str("456");
    assert!(matches!(
        crate::Code128::encode(&content),
        Err(EncodingError::Invariant(_))
    ));
}
