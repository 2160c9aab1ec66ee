use crate::std::vec::Vec;

#[cfg(test)]
use pretty_assertions::assert_eq;

use crate::{DataType, EncodingError, MAX_INPUT};

// FNC placeholders travel through the pipeline as code points above the
// ISO 8859-1 range, so they can never collide with data characters.
pub(crate) const FNC1: u16 = crate::FNC1 as u16;
pub(crate) const FNC2: u16 = crate::FNC2 as u16;
pub(crate) const FNC3: u16 = crate::FNC3 as u16;
pub(crate) const FNC4: u16 = crate::FNC4 as u16;

/// Map the content to ISO 8859-1 code points plus FNC placeholders.
///
/// In GS1 mode `[` becomes FNC1 and `]` is dropped; the brackets are
/// application identifier syntax, not payload.
pub(crate) fn normalize(content: &str, data_type: DataType) -> Result<Vec<u16>, EncodingError> {
    let mut data = Vec::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '[' if data_type == DataType::Gs1 => data.push(FNC1),
            ']' if data_type == DataType::Gs1 => (),
            crate::FNC1 | crate::FNC2 | crate::FNC3 | crate::FNC4 => data.push(c as u16),
            c if (c as u32) <= 0xFF => data.push(c as u16),
            c => return Err(EncodingError::Character(c)),
        }
    }
    if data.len() > MAX_INPUT {
        return Err(EncodingError::TooLong);
    }
    Ok(data)
}

#[test]
fn test_latin1_passthrough() {
    let data = normalize("A å\u{FF}", DataType::Generic).unwrap();
    assert_eq!(data, [65, 32, 229, 255]);
}

#[test]
fn test_fnc_placeholders() {
    let mut content = crate::std::string::String::from("1");
    content.push(crate::FNC1);
    content.push(crate::FNC4);
    let data = normalize(&content, DataType::Generic).unwrap();
    assert_eq!(data, [49, FNC1, FNC4]);
}

#[test]
fn test_gs1_brackets() {
    let data = normalize("[01]99", DataType::Gs1).unwrap();
    assert_eq!(data, [FNC1, 48, 49, 57, 57]);
    // Outside GS1 mode brackets are ordinary data.
    let data = normalize("[01]", DataType::Generic).unwrap();
    assert_eq!(data, [91, 48, 49, 93]);
}

#[test]
fn test_rejects_characters_outside_latin1() {
    assert_eq!(
        normalize("\u{0100}", DataType::Generic),
        Err(EncodingError::Character('\u{0100}'))
    );
    assert_eq!(
        normalize("☃", DataType::Generic),
        Err(EncodingError::Character('☃'))
    );
}

#[test]
fn test_length_limit() {
    let content: crate::std::string::String = core::iter::repeat('x').take(MAX_INPUT).collect();
    assert!(normalize(&content, DataType::Generic).is_ok());
    let content: crate::std::string::String = core::iter::repeat('x').take(MAX_INPUT + 1).collect();
    assert_eq!(
        normalize(&content, DataType::Generic),
        Err(EncodingError::TooLong)
    );
}
