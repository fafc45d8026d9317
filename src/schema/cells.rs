//! A1-style cell references.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub col: u32,
}

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

impl CellRef {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().replace('$', "");
        let split = text.find(|ch: char| ch.is_ascii_digit())?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return None;
        }
        if !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        let mut col: u32 = 0;
        for ch in letters.chars() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 || row > MAX_ROWS || col > MAX_COLS {
            return None;
        }
        Some(Self { row, col })
    }

    pub fn absolute(&self) -> String {
        format!("${}${}", column_letters(self.col), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Accepts `A1:D5` or a single cell. Corners are normalised.
    pub fn parse(text: &str) -> Option<Self> {
        let (first, second) = match text.split_once(':') {
            Some((a, b)) => (CellRef::parse(a)?, CellRef::parse(b)?),
            None => {
                let cell = CellRef::parse(text)?;
                (cell, cell)
            }
        };
        Some(Self {
            start: CellRef {
                row: first.row.min(second.row),
                col: first.col.min(second.col),
            },
            end: CellRef {
                row: first.row.max(second.row),
                col: first.col.max(second.col),
            },
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}
