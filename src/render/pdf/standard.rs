//! Metrics for the standard PDF faces, per 1000 units of font size.
//!
//! Widths cover printable ASCII. Italic and oblique variants share the
//! upright tables and Latin-1 bytes above 126 use an average width.

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333,
    389, 584, 278, 333, 278, 278, 556, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 278, 278, 584, 584,
    584, 556, 1015, 667, 667, 722, 722, 667, 611, 778,
    722, 278, 500, 667, 556, 833, 722, 778, 667, 778,
    722, 667, 611, 722, 667, 944, 667, 667, 611, 278,
    278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
    500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333,
    389, 584, 278, 333, 278, 278, 556, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 333, 333, 584, 584,
    584, 611, 975, 722, 722, 722, 722, 667, 611, 778,
    722, 278, 556, 722, 611, 833, 722, 778, 667, 778,
    722, 667, 611, 722, 667, 944, 667, 667, 611, 333,
    278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556,
    500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333,
    500, 564, 250, 333, 250, 278, 500, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 278, 278, 564, 564,
    564, 444, 921, 722, 667, 667, 722, 611, 556, 722,
    722, 333, 389, 722, 611, 889, 722, 722, 556, 722,
    667, 556, 611, 722, 722, 944, 722, 722, 611, 333,
    278, 333, 469, 500, 333, 444, 500, 444, 500, 444,
    333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500,
    444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333,
    500, 570, 250, 333, 250, 278, 500, 500, 500, 500,
    500, 500, 500, 500, 500, 500, 333, 333, 570, 570,
    570, 500, 930, 722, 667, 722, 722, 667, 611, 778,
    778, 389, 500, 778, 667, 944, 722, 778, 611, 778,
    722, 556, 667, 722, 722, 1000, 722, 722, 667, 333,
    278, 333, 581, 500, 333, 500, 556, 444, 556, 444,
    333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500,
    444, 394, 220, 394, 520,
];

#[derive(Debug, Clone, Copy)]
pub struct StandardMetrics {
    ascii: Option<&'static [u16; 95]>,
    fallback: u16,
    pub ascent: f32,
    pub descent: f32,
}

impl StandardMetrics {
    pub fn for_face(name: &str) -> Self {
        let bold = name.contains("Bold");
        if name.starts_with("Courier") {
            return Self {
                ascii: None,
                fallback: 600,
                ascent: 629.0,
                descent: -157.0,
            };
        }
        if name.starts_with("Times") {
            return Self {
                ascii: Some(if bold { &TIMES_BOLD } else { &TIMES_ROMAN }),
                fallback: 500,
                ascent: 683.0,
                descent: -217.0,
            };
        }
        Self {
            ascii: Some(if bold { &HELVETICA_BOLD } else { &HELVETICA }),
            fallback: 556,
            ascent: 718.0,
            descent: -207.0,
        }
    }

    pub fn width(&self, byte: u8) -> f32 {
        let width = match (self.ascii, byte) {
            (Some(table), 32..=126) => table[usize::from(byte - 32)],
            _ => self.fallback,
        };
        f32::from(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let metrics = StandardMetrics::for_face("Helvetica");
        assert_eq!(metrics.width(b' '), 278.0);
        assert_eq!(metrics.width(b'W'), 944.0);
        assert_eq!(metrics.width(b'i'), 222.0);
        assert_eq!(metrics.width(0xE9), 556.0);
    }

    #[test]
    fn variants_pick_their_tables() {
        assert_eq!(StandardMetrics::for_face("Helvetica-BoldOblique").width(b'b'), 611.0);
        assert_eq!(StandardMetrics::for_face("Times-Italic").width(b'a'), 444.0);
        assert_eq!(StandardMetrics::for_face("Times-Bold").width(b'%'), 1000.0);
        assert_eq!(StandardMetrics::for_face("Courier-Bold").width(b'i'), 600.0);
    }
}
