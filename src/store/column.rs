//! Type-specialized dense value columns
//!
//! Slots past the end of a column read as the default value; the column
//! grows only when a slot is first written.

use ordered_float::OrderedFloat;

use crate::core::value::PropertyValue;

const WORD_BITS: usize = 64;

#[derive(Debug, Clone)]
pub(crate) enum ValueColumn {
    Bool {
        words: Vec<u64>,
        default: bool,
    },
    Int {
        values: Vec<i64>,
        default: i64,
    },
    Real {
        values: Vec<f64>,
        default: f64,
    },
    Enum {
        values: Vec<u32>,
        default: u32,
    },
    /// `None` stands for the default, so growth doesn't clone strings
    Text {
        values: Vec<Option<String>>,
        default: String,
    },
}

impl ValueColumn {
    pub fn new(default: &PropertyValue) -> Self {
        match default {
            PropertyValue::Bool(default) => ValueColumn::Bool {
                words: Vec::new(),
                default: *default,
            },
            PropertyValue::Int(default) => ValueColumn::Int {
                values: Vec::new(),
                default: *default,
            },
            PropertyValue::Real(default) => ValueColumn::Real {
                values: Vec::new(),
                default: default.0,
            },
            PropertyValue::Enum(default) => ValueColumn::Enum {
                values: Vec::new(),
                default: *default,
            },
            PropertyValue::Text(default) => ValueColumn::Text {
                values: Vec::new(),
                default: default.clone(),
            },
        }
    }

    pub fn get(&self, slot: usize) -> PropertyValue {
        match self {
            ValueColumn::Bool { words, default } => {
                let bit = words
                    .get(slot / WORD_BITS)
                    .map(|word| word & (1 << (slot % WORD_BITS)) != 0);
                PropertyValue::Bool(bit.unwrap_or(*default))
            }
            ValueColumn::Int { values, default } => {
                PropertyValue::Int(values.get(slot).copied().unwrap_or(*default))
            }
            ValueColumn::Real { values, default } => {
                PropertyValue::Real(OrderedFloat(values.get(slot).copied().unwrap_or(*default)))
            }
            ValueColumn::Enum { values, default } => {
                PropertyValue::Enum(values.get(slot).copied().unwrap_or(*default))
            }
            ValueColumn::Text { values, default } => {
                let text = values.get(slot).and_then(Option::as_ref).unwrap_or(default);
                PropertyValue::Text(text.clone())
            }
        }
    }

    /// Writes a value already checked against the column's type.
    ///
    /// Returns false on a type mismatch without touching the column.
    pub fn set(&mut self, slot: usize, value: &PropertyValue) -> bool {
        match (self, value) {
            (ValueColumn::Bool { words, default }, PropertyValue::Bool(value)) => {
                let word = slot / WORD_BITS;
                if words.len() <= word {
                    let fill = if *default { u64::MAX } else { 0 };
                    words.resize(word + 1, fill);
                }
                let mask = 1u64 << (slot % WORD_BITS);
                if *value {
                    words[word] |= mask;
                } else {
                    words[word] &= !mask;
                }
            }
            (ValueColumn::Int { values, default }, PropertyValue::Int(value)) => {
                grow(values, slot, *default);
                values[slot] = *value;
            }
            (ValueColumn::Real { values, default }, PropertyValue::Real(value)) => {
                grow(values, slot, *default);
                values[slot] = value.0;
            }
            (ValueColumn::Enum { values, default }, PropertyValue::Enum(value)) => {
                grow(values, slot, *default);
                values[slot] = *value;
            }
            (ValueColumn::Text { values, default }, PropertyValue::Text(value)) => {
                if values.len() <= slot {
                    values.resize(slot + 1, None);
                }
                values[slot] = if value == default { None } else { Some(value.clone()) };
            }
            _ => return false,
        }
        true
    }

    /// Puts the slot back to the default value
    pub fn reset(&mut self, slot: usize) {
        match self {
            ValueColumn::Bool { words, default } => {
                if let Some(word) = words.get_mut(slot / WORD_BITS) {
                    let mask = 1u64 << (slot % WORD_BITS);
                    if *default {
                        *word |= mask;
                    } else {
                        *word &= !mask;
                    }
                }
            }
            ValueColumn::Int { values, default } => reset(values, slot, *default),
            ValueColumn::Real { values, default } => reset(values, slot, *default),
            ValueColumn::Enum { values, default } => reset(values, slot, *default),
            ValueColumn::Text { values, .. } => {
                if let Some(value) = values.get_mut(slot) {
                    *value = None;
                }
            }
        }
    }
}

#[inline]
fn grow<T: Copy>(values: &mut Vec<T>, slot: usize, default: T) {
    if values.len() <= slot {
        values.resize(slot + 1, default);
    }
}

#[inline]
fn reset<T: Copy>(values: &mut [T], slot: usize, default: T) {
    if let Some(value) = values.get_mut(slot) {
        *value = default;
    }
}
