//! This crate implements encoding of Code 128 linear barcodes as defined
//! in ISO/IEC 15417:2007, including GS1-128 mode and the linkage flag
//! used when the code is the linear component of a composite symbol.
//!
//! Subset selection follows the heuristic rules of ISO 15417 Annex E,
//! including numeric compression into subset C and FNC4 planning for the
//! extended (`0x80` to `0xFF`) range. The full ISO/IEC 8859-1 (Latin 1)
//! range can be encoded; characters outside it are rejected.
//!
//! ## Example
//!
//! ```rust
//! use barcode128::Code128;
//!
//! let code = Code128::encode("AIM")?;
//! assert_eq!(code.codewords(), &[104, 33, 41, 45, 45, 106]);
//! assert_eq!(code.readable(), "AIM");
//! # Ok::<(), barcode128::EncodingError>(())
//! ```
//!
//! For GS1-128, application identifiers can be written in bracket
//! notation; `[` becomes FNC1:
//!
//! ```rust
//! use barcode128::{Code128, DataType};
//!
//! let code = Code128::builder()
//!     .with_data_type(DataType::Gs1)
//!     .encode("[01]12345678901231")?;
//! assert_eq!(code.codewords()[0], 105);
//! # Ok::<(), barcode128::EncodingError>(())
//! ```
//!
//! ## Output contract
//!
//! The encoder produces one row of module widths per symbol row (two rows
//! when a composite separator is required). Each row is a string of digits;
//! the digit at an even index is the width of a bar, at an odd index the
//! width of a space. Painting bars, quiet zones and the human readable
//! line is left to the renderer.
#![no_std]

#[cfg(not(feature = "std"))]
extern crate alloc as std;
#[cfg(feature = "std")]
extern crate std;

use core::fmt::Write as _;

use std::string::String;
use std::vec;
use std::vec::Vec;

#[cfg(feature = "std")]
use thiserror::Error;

#[cfg(test)]
use pretty_assertions::assert_eq;

mod emit;
mod extended;
mod normalize;
mod subset;

/// The function 1 command character.
///
/// Can be used in data passed to the encoder in order to insert a
/// function 1 command. The placeholder is not a valid ISO 8859-1
/// character, so it cannot conflict with ordinary Code 128 data.
pub const FNC1: char = '\u{0101}';

/// The function 2 command character, see [FNC1].
pub const FNC2: char = '\u{0113}';

/// The function 3 command character, see [FNC1].
pub const FNC3: char = '\u{012B}';

/// The function 4 command character, see [FNC1].
pub const FNC4: char = '\u{014D}';

const SHIFT: u8 = 98;
const SWITCH_C: u8 = 99;
const SWITCH_B: u8 = 100;
const SWITCH_A: u8 = 101;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const STOP: u8 = 106;

const CODE_FNC1: u8 = 102;
const CODE_FNC2: u8 = 97;
const CODE_FNC3: u8 = 96;
// FNC4 shares its codeword value with the opposite code-set latch; the
// decoder disambiguates by context. Distinct names keep the call sites
// honest about which of the two is meant.
const FNC4_IN_A: u8 = 101;
const FNC4_IN_B: u8 = 100;

/// Maximum number of input positions after normalization.
pub(crate) const MAX_INPUT: usize = 170;

/// Maximum number of symbols, start included, check and stop excluded.
const MAX_SYMBOLS: usize = 80;

fn checksum(symbols: impl Iterator<Item = u8>) -> u8 {
    (symbols
        .enumerate()
        .map(|(i, idx)| (i.max(1) as u64) * idx as u64)
        .sum::<u64>()
        % 103) as u8
}

/// Interpretation of the input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    /// Plain ISO 8859-1 data, possibly containing FNC placeholders.
    #[default]
    Generic,
    /// GS1-128: `[` translates to FNC1 and a leading FNC1 is emitted
    /// after the start code. Application identifier syntax is not
    /// validated.
    Gs1,
    /// Like [Generic](Self::Generic), but the readable line is wrapped
    /// in `*` delimiters.
    Hibc,
}

/// Type of the 2D component when the code is part of a composite symbol.
///
/// Anything other than [Off](Self::Off) appends the matching linkage flag
/// codeword and adds a separator row to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    #[default]
    Off,
    CcA,
    CcB,
    CcC,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum EncodingError {
    /// A character is neither ISO 8859-1 nor an FNC placeholder.
    #[cfg_attr(
        feature = "std",
        error("character {0:?} cannot be encoded in ISO 8859-1")
    )]
    Character(char),
    /// The input exceeds 170 characters, or needs more than 80 symbols.
    #[cfg_attr(feature = "std", error("input data too long"))]
    TooLong,
    /// An internal planner or emitter invariant was violated. This is a
    /// bug in the encoder, not in the input.
    #[cfg_attr(feature = "std", error("encoder invariant violated: {0}"))]
    Invariant(&'static str),
}

/// An encoded Code 128 symbol.
///
/// The struct holds everything the rendering side needs: the module width
/// [patterns](Self::patterns) with their [row heights](Self::row_heights)
/// and the [readable](Self::readable) text line, plus the raw
/// [codewords](Self::codewords) for callers that post-process the symbol
/// (for example a composite assembler).
#[derive(Debug, Clone, PartialEq)]
pub struct Code128 {
    codewords: Vec<u8>,
    patterns: Vec<String>,
    row_heights: Vec<i32>,
    readable: String,
    trace: String,
}

impl Code128 {
    /// Encode the string as Code 128 with default options.
    ///
    /// See the [module documentation](crate) for hints on charsets, and
    /// [builder](Self::builder) for GS1, reader initialisation, composite
    /// linkage and subset C suppression.
    pub fn encode(content: &str) -> Result<Self, EncodingError> {
        Code128Builder::default().encode(content)
    }

    /// Get a builder for encoding with more control.
    pub fn builder() -> Code128Builder {
        Code128Builder::default()
    }

    /// The emitted codeword values, from the start code through check
    /// digit and stop.
    pub fn codewords(&self) -> &[u8] {
        &self.codewords
    }

    /// Module width strings, one per row.
    ///
    /// A digit at an even index is a bar width, at an odd index a space
    /// width. Without composite linkage there is exactly one row; with it,
    /// a one module high separator row precedes the bar code row.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Row heights in module units, parallel to [patterns](Self::patterns).
    ///
    /// `-1` leaves the height to the renderer.
    pub fn row_heights(&self) -> &[i32] {
        &self.row_heights
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.patterns.len()
    }

    /// The human readable line: the input with FNC placeholders removed,
    /// wrapped in `*` for HIBC, empty for GS1.
    pub fn readable(&self) -> &str {
        &self.readable
    }

    /// Human readable record of the emitted symbols, for debugging.
    ///
    /// The format is not stable; do not parse it.
    pub fn trace(&self) -> &str {
        &self.trace
    }
}

/// Builder for encoding a Code 128 with more control.
#[derive(Debug, Clone, Default)]
pub struct Code128Builder {
    data_type: DataType,
    reader_init: bool,
    composite: CompositeMode,
    suppress_subset_c: bool,
}

impl Code128Builder {
    /// How the input data should be interpreted.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Emit FNC3 directly after the start code to program the reader.
    pub fn with_reader_init(mut self, reader_init: bool) -> Self {
        self.reader_init = reader_init;
        self
    }

    /// Mark the symbol as the linear component of a composite symbol.
    pub fn with_composite(mut self, mode: CompositeMode) -> Self {
        self.composite = mode;
        self
    }

    /// Never use subset C; digits are encoded in subset B instead.
    pub fn with_subset_c_suppressed(mut self, suppressed: bool) -> Self {
        self.suppress_subset_c = suppressed;
        self
    }

    /// Encode the string as Code 128.
    pub fn encode(self, content: &str) -> Result<Code128, EncodingError> {
        let data = normalize::normalize(content, self.data_type)?;
        let fset = extended::plan(&data);
        let set = subset::plan(&data, self.suppress_subset_c);
        if subset::projected_units(&data, &set, &fset) > 2 * MAX_SYMBOLS {
            return Err(EncodingError::TooLong);
        }

        let (mut codewords, mut trace) = emit::emit(
            &data,
            &set,
            &fset,
            self.data_type,
            self.reader_init,
            self.composite,
        )?;
        let check = checksum(codewords.iter().copied());
        let _ = write!(
            trace,
            "\nData Codewords: {}\nCheck Digit: {}\n",
            codewords.len(),
            check
        );
        codewords.push(check);
        codewords.push(STOP);

        let row = emit::pattern_row(&codewords);
        let (patterns, row_heights) = if self.composite == CompositeMode::Off {
            (vec![row], vec![-1])
        } else {
            // Separator row between the linear and the 2D component.
            let mut separator = String::with_capacity(row.len() + 1);
            separator.push('0');
            separator.push_str(&row);
            (vec![separator, row], vec![1, -1])
        };

        let readable = match self.data_type {
            DataType::Gs1 => String::new(),
            data_type => {
                let mut readable = String::with_capacity(content.len() + 2);
                if data_type == DataType::Hibc {
                    readable.push('*');
                }
                readable.extend(
                    content
                        .chars()
                        .filter(|c| !matches!(*c, FNC1 | FNC2 | FNC3 | FNC4)),
                );
                if data_type == DataType::Hibc {
                    readable.push('*');
                }
                readable
            }
        };

        Ok(Code128 {
            codewords,
            patterns,
            row_heights,
            readable,
            trace,
        })
    }
}

#[test]
fn test_simple_subset_b() {
    let code = Code128::encode("AIM").unwrap();
    assert_eq!(code.codewords(), &[104, 33, 41, 45, 45, 106]);
    assert_eq!(code.row_count(), 1);
    assert_eq!(code.row_heights(), &[-1]);
    assert_eq!(code.readable(), "AIM");
}

#[test]
fn test_subset_c_pairs() {
    let code = Code128::encode("1234").unwrap();
    assert_eq!(code.codewords(), &[105, 12, 34, 82, 106]);
}

#[test]
fn test_odd_digit_moves_to_subset_b() {
    let code = Code128::encode("12345").unwrap();
    assert_eq!(code.codewords(), &[105, 12, 34, 100, 21, 54, 106]);
}

#[test]
fn test_gs1_bracket_translation() {
    let code = Code128::builder()
        .with_data_type(DataType::Gs1)
        .encode("[01]12345678901231")
        .unwrap();
    assert_eq!(
        code.codewords(),
        &[105, 102, 102, 1, 12, 34, 56, 78, 90, 12, 31, 77, 106]
    );
    assert_eq!(code.readable(), "");
}

#[test]
fn test_gs1_without_brackets() {
    let code = Code128::builder()
        .with_data_type(DataType::Gs1)
        .encode("1234567890")
        .unwrap();
    assert_eq!(code.codewords(), &[105, 102, 12, 34, 56, 78, 90, 45, 106]);
}

#[test]
fn test_reader_init() {
    let code = Code128::builder()
        .with_reader_init(true)
        .encode("AB")
        .unwrap();
    assert_eq!(code.codewords(), &[104, 96, 33, 34, 59, 106]);
}

#[test]
fn test_reader_init_numeric_starts_in_b() {
    let code = Code128::builder()
        .with_reader_init(true)
        .encode("123456")
        .unwrap();
    assert_eq!(code.codewords()[..3], [104, 96, 99]);
}

#[test]
fn test_extended_latch() {
    let content: String = core::iter::repeat('\u{C1}').take(6).collect();
    let code = Code128::encode(&content).unwrap();
    assert_eq!(
        code.codewords(),
        &[104, 100, 100, 33, 33, 33, 33, 33, 33, 51, 106]
    );
}

#[test]
fn test_single_extended_shift() {
    // One extended character shifts instead of latching.
    let code = Code128::encode("A\u{C1}B").unwrap();
    assert_eq!(code.codewords()[..5], [104, 33, 100, 33, 34]);
}

#[test]
fn test_empty_input() {
    let code = Code128::encode("").unwrap();
    assert_eq!(code.codewords(), &[104, 1, 106]);
    assert_eq!(code.readable(), "");
}

#[test]
fn test_subset_c_suppression() {
    let code = Code128::builder()
        .with_subset_c_suppressed(true)
        .encode("1234")
        .unwrap();
    assert_eq!(code.codewords(), &[104, 17, 18, 19, 20, 88, 106]);
}

#[test]
fn test_composite_linkage_and_separator_row() {
    let code = Code128::builder()
        .with_composite(CompositeMode::CcA)
        .encode("1234")
        .unwrap();
    assert_eq!(code.codewords(), &[105, 12, 34, 101, 76, 106]);
    assert_eq!(code.row_count(), 2);
    assert_eq!(code.row_heights(), &[1, -1]);
    assert!(code.patterns()[0].starts_with('0'));
    assert_eq!(code.patterns()[0][1..], code.patterns()[1]);
}

#[test]
fn test_composite_ccc_linkage_flag() {
    let code = Code128::builder()
        .with_composite(CompositeMode::CcC)
        .encode("AIM")
        .unwrap();
    // Ends latched in B: CC-C linkage flag is 101.
    assert_eq!(code.codewords()[4], 101);
}

#[test]
fn test_hibc_readable() {
    let code = Code128::builder()
        .with_data_type(DataType::Hibc)
        .encode("A99912345")
        .unwrap();
    assert_eq!(code.readable(), "*A99912345*");
}

#[test]
fn test_fnc_placeholders_stripped_from_readable() {
    let mut content = String::from("AB");
    content.insert(1, FNC2);
    let code = Code128::encode(&content).unwrap();
    assert_eq!(code.readable(), "AB");
    assert_eq!(code.codewords(), &[104, 33, 97, 34, 21, 106]);
}

#[test]
fn test_invalid_character() {
    assert_eq!(
        Code128::encode("price: 10\u{20AC}"),
        Err(EncodingError::Character('\u{20AC}'))
    );
}

#[test]
fn test_input_length_bounds() {
    let long: String = core::iter::repeat('7').take(171).collect();
    assert_eq!(Code128::encode(&long), Err(EncodingError::TooLong));

    // 158 digits project to 80 symbols, 160 digits to 81.
    let digits: String = core::iter::repeat('5').take(158).collect();
    assert!(Code128::encode(&digits).is_ok());
    let digits: String = core::iter::repeat('5').take(160).collect();
    assert_eq!(Code128::encode(&digits), Err(EncodingError::TooLong));

    // 170 positions of subset B data exceed 80 symbols.
    let wide: String = core::iter::repeat('W').take(170).collect();
    assert_eq!(Code128::encode(&wide), Err(EncodingError::TooLong));
}

#[test]
fn test_codeword_framing_invariants() {
    for content in ["", "AIM", "1234", "12345", "a\u{0}Z09", "\u{C1}\u{C1}"] {
        let code = Code128::encode(content).unwrap();
        let values = code.codewords();
        assert!(matches!(values[0], START_A | START_B | START_C));
        assert_eq!(*values.last().unwrap(), STOP);
        let check = values[values.len() - 2];
        assert_eq!(checksum(values[..values.len() - 2].iter().copied()), check);
    }
}

#[test]
fn test_encoding_is_deterministic() {
    let a = Code128::encode("Code 128 <3").unwrap();
    let b = Code128::encode("Code 128 <3").unwrap();
    assert_eq!(a.codewords(), b.codewords());
    assert_eq!(a.patterns(), b.patterns());
}

#[test]
fn test_trace_mentions_check_digit() {
    let code = Code128::encode("AIM").unwrap();
    assert!(code.trace().starts_with("Encoding: STARTB"));
    assert!(code.trace().contains("Check Digit: 45"));
}
