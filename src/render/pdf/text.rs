//! Text handling for the PDF composer: WinAnsi encoding for simple fonts and
//! the small inline markup language paragraphs may carry.

/// Characters for bytes 0x80..=0x9F; the other bytes map to Latin-1.
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

pub fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

pub fn char_to_winansi(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&mapped| mapped == ch && mapped != '\u{FFFD}')
            .and_then(|index| u8::try_from(index + 0x80).ok()),
    }
}

/// Encodes for a WinAnsi font. Unmappable characters become `?`.
pub fn to_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| char_to_winansi(ch).unwrap_or(b'?'))
        .collect()
}

/// A PDF text string for the document information dictionary: plain bytes
/// when the text is ASCII, UTF-16BE with a byte order mark otherwise.
pub fn info_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub style: Style,
}

/// A run of text without whitespace, possibly spanning style changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(Word),
    /// Collapsed whitespace; the style is that of the text it sat in.
    Space(Style),
    Break,
}

/// Splits paragraph markup into words, spaces and forced breaks.
///
/// `<b>`, `<i>` and `<u>` nest, `<br/>` forces a line break and `&amp;`,
/// `&lt;`, `&gt;`, `&quot;` and `&apos;` are decoded. Anything else that
/// looks like a tag is kept as literal text. Whitespace runs collapse to a
/// single space.
pub fn tokenize(markup: &str, base: Style) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut depth = [0usize; 3];
    let mut current: Option<Word> = None;
    let style_of = |depth: &[usize; 3]| Style {
        bold: base.bold || depth[0] > 0,
        italic: base.italic || depth[1] > 0,
        underline: base.underline || depth[2] > 0,
    };

    let mut rest = markup;
    while let Some(ch) = rest.chars().next() {
        if ch == '<'
            && let Some((tag, consumed)) = parse_tag(rest)
        {
            match tag {
                Tag::Open(slot) => depth[slot] += 1,
                Tag::Close(slot) => depth[slot] = depth[slot].saturating_sub(1),
                Tag::Break => {
                    flush_word(&mut current, &mut tokens);
                    tokens.push(Token::Break);
                }
            }
            rest = &rest[consumed..];
            continue;
        }

        let style = style_of(&depth);
        if ch.is_whitespace() {
            flush_word(&mut current, &mut tokens);
            if !matches!(tokens.last(), Some(Token::Space(_)) | Some(Token::Break) | None) {
                tokens.push(Token::Space(style));
            }
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        let (decoded, consumed) = if ch == '&' {
            decode_entity(rest).unwrap_or(('&', 1))
        } else {
            (ch, ch.len_utf8())
        };
        push_char(&mut current, decoded, style);
        rest = &rest[consumed..];
    }
    flush_word(&mut current, &mut tokens);
    while matches!(tokens.last(), Some(Token::Space(_))) {
        tokens.pop();
    }
    tokens
}

/// Tokens for text without markup. Newlines force breaks.
pub fn plain(text: &str, style: Style) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            tokens.push(Token::Break);
        }
        for (position, word) in line.split_whitespace().enumerate() {
            if position > 0 {
                tokens.push(Token::Space(style));
            }
            tokens.push(Token::Word(Word {
                fragments: vec![Fragment {
                    text: word.to_string(),
                    style,
                }],
            }));
        }
    }
    tokens
}

enum Tag {
    Open(usize),
    Close(usize),
    Break,
}

fn parse_tag(input: &str) -> Option<(Tag, usize)> {
    let end = input.find('>')?;
    let inner = input[1..end].trim();
    let tag = match inner.to_ascii_lowercase().as_str() {
        "b" | "strong" => Tag::Open(0),
        "/b" | "/strong" => Tag::Close(0),
        "i" | "em" => Tag::Open(1),
        "/i" | "/em" => Tag::Close(1),
        "u" => Tag::Open(2),
        "/u" => Tag::Close(2),
        "br" | "br/" | "br /" => Tag::Break,
        _ => return None,
    };
    Some((tag, end + 1))
}

fn decode_entity(input: &str) -> Option<(char, usize)> {
    let end = input.find(';')?;
    let ch = match &input[1..end] {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{A0}',
        _ => return None,
    };
    Some((ch, end + 1))
}

fn push_char(current: &mut Option<Word>, ch: char, style: Style) {
    let word = current.get_or_insert_with(|| Word {
        fragments: Vec::new(),
    });
    match word.fragments.last_mut() {
        Some(fragment) if fragment.style == style => fragment.text.push(ch),
        _ => word.fragments.push(Fragment {
            text: ch.to_string(),
            style,
        }),
    }
}

fn flush_word(current: &mut Option<Word>, tokens: &mut Vec<Token>) {
    if let Some(word) = current.take() {
        tokens.push(Token::Word(word));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter_map(|token| match token {
                Token::Word(word) => Some(
                    word.fragments
                        .iter()
                        .map(|fragment| fragment.text.as_str())
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn winansi_round_trips_special_characters() {
        assert_eq!(winansi_to_char(0x80), '€');
        assert_eq!(char_to_winansi('€'), Some(0x80));
        assert_eq!(char_to_winansi('é'), Some(0xE9));
        assert_eq!(to_winansi("a—b"), vec![b'a', 0x97, b'b']);
        assert_eq!(to_winansi("한"), vec![b'?']);
    }

    #[test]
    fn info_strings_switch_to_utf16_for_non_ascii() {
        assert_eq!(info_string("Plan"), b"Plan".to_vec());
        assert_eq!(info_string("é"), vec![0xFE, 0xFF, 0x00, 0xE9]);
    }

    #[test]
    fn inline_tags_set_fragment_styles() {
        let tokens = tokenize("plain <b>bold <i>both</i></b> x<u>y</u>", Style::default());
        assert_eq!(words(&tokens), vec!["plain", "bold", "both", "xy"]);
        let Token::Word(both) = &tokens[4] else {
            panic!("expected word, got {:?}", tokens[4]);
        };
        assert!(both.fragments[0].style.bold && both.fragments[0].style.italic);
        let Token::Word(xy) = &tokens[6] else {
            panic!("expected word");
        };
        assert_eq!(xy.fragments.len(), 2);
        assert!(xy.fragments[1].style.underline);
    }

    #[test]
    fn whitespace_collapses_and_breaks_split_lines() {
        let tokens = tokenize("  a \n\t b<br/>c  ", Style::default());
        assert_eq!(
            tokens.iter().filter(|t| matches!(t, Token::Space(_))).count(),
            1
        );
        assert!(tokens.contains(&Token::Break));
        assert_eq!(words(&tokens), vec!["a", "b", "c"]);
    }

    #[test]
    fn entities_decode_and_unknown_tags_stay_literal() {
        let tokens = tokenize("a &amp; b <font>x</font> &bogus;", Style::default());
        assert_eq!(
            words(&tokens),
            vec!["a", "&", "b", "<font>x</font>", "&bogus;"]
        );
    }

    #[test]
    fn base_style_applies_everywhere() {
        let base = Style {
            bold: true,
            ..Style::default()
        };
        let tokens = tokenize("x", base);
        let Token::Word(word) = &tokens[0] else {
            panic!("expected word");
        };
        assert!(word.fragments[0].style.bold);
    }
}
