//! CGA character generator data and color palette.
//!
//! The glyph set is the IBM PC 8x8 code page 437 font: 256 characters, one
//! byte per scanline, MSB = leftmost pixel. Glyph data indexed as
//! `character * 8 + row`.

/// The 16 CGA colors as 0x00RRGGBB.
pub const CGA_PALETTE: [u32; 16] = [
    0x000000, // black
    0x0000AA, // blue
    0x00AA00, // green
    0x00AAAA, // cyan
    0xAA0000, // red
    0xAA00AA, // magenta
    0xAA5500, // brown
    0xAAAAAA, // light gray
    0x555555, // dark gray
    0x5555FF, // light blue
    0x55FF55, // light green
    0x55FFFF, // light cyan
    0xFF5555, // light red
    0xFF55FF, // light magenta
    0xFFFF55, // yellow
    0xFFFFFF, // white
];

/// One scanline of a glyph.
#[inline]
pub fn glyph_row(ch: u8, row: usize) -> u8 {
    CGA_FONT[ch as usize * 8 + (row & 7)]
}

#[rustfmt::skip]
pub const CGA_FONT: [u8; 2048] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x00
    0x7E, 0x81, 0xA5, 0x81, 0xBD, 0x99, 0x81, 0x7E, // 0x01
    0x7E, 0xFF, 0xDB, 0xFF, 0xC3, 0xE7, 0xFF, 0x7E, // 0x02
    0x6C, 0xFE, 0xFE, 0xFE, 0x7C, 0x38, 0x10, 0x00, // 0x03
    0x10, 0x38, 0x7C, 0xFE, 0x7C, 0x38, 0x10, 0x00, // 0x04
    0x38, 0x7C, 0x38, 0xFE, 0xFE, 0x7C, 0x38, 0x7C, // 0x05
    0x10, 0x10, 0x38, 0x7C, 0xFE, 0x7C, 0x38, 0x7C, // 0x06
    0x00, 0x00, 0x18, 0x3C, 0x3C, 0x18, 0x00, 0x00, // 0x07
    0xFF, 0xFF, 0xE7, 0xC3, 0xC3, 0xE7, 0xFF, 0xFF, // 0x08
    0x00, 0x3C, 0x66, 0x42, 0x42, 0x66, 0x3C, 0x00, // 0x09
    0xFF, 0xC3, 0x99, 0xBD, 0xBD, 0x99, 0xC3, 0xFF, // 0x0A
    0x0F, 0x07, 0x0F, 0x7D, 0xCC, 0xCC, 0xCC, 0x78, // 0x0B
    0x3C, 0x66, 0x66, 0x66, 0x3C, 0x18, 0x7E, 0x18, // 0x0C
    0x3F, 0x33, 0x3F, 0x30, 0x30, 0x70, 0xF0, 0xE0, // 0x0D
    0x7F, 0x63, 0x7F, 0x63, 0x63, 0x67, 0xE6, 0xC0, // 0x0E
    0x99, 0x5A, 0x3C, 0xE7, 0xE7, 0x3C, 0x5A, 0x99, // 0x0F
    0x80, 0xE0, 0xF8, 0xFE, 0xF8, 0xE0, 0x80, 0x00, // 0x10
    0x02, 0x0E, 0x3E, 0xFE, 0x3E, 0x0E, 0x02, 0x00, // 0x11
    0x18, 0x3C, 0x7E, 0x18, 0x18, 0x7E, 0x3C, 0x18, // 0x12
    0x66, 0x66, 0x66, 0x66, 0x66, 0x00, 0x66, 0x00, // 0x13
    0x7F, 0xDB, 0xDB, 0x7B, 0x1B, 0x1B, 0x1B, 0x00, // 0x14
    0x3E, 0x63, 0x38, 0x6C, 0x6C, 0x38, 0xCC, 0x78, // 0x15
    0x00, 0x00, 0x00, 0x00, 0x7E, 0x7E, 0x7E, 0x00, // 0x16
    0x18, 0x3C, 0x7E, 0x18, 0x7E, 0x3C, 0x18, 0xFF, // 0x17
    0x18, 0x3C, 0x7E, 0x18, 0x18, 0x18, 0x18, 0x00, // 0x18
    0x18, 0x18, 0x18, 0x18, 0x7E, 0x3C, 0x18, 0x00, // 0x19
    0x18, 0x0C, 0xFE, 0x0C, 0x18, 0x00, 0x00, 0x00, // 0x1A
    0x30, 0x60, 0xFE, 0x60, 0x30, 0x00, 0x00, 0x00, // 0x1B
    0x00, 0xC0, 0xC0, 0xC0, 0xFE, 0x00, 0x00, 0x00, // 0x1C
    0x24, 0x66, 0xFF, 0x66, 0x24, 0x00, 0x00, 0x00, // 0x1D
    0x18, 0x3C, 0x7E, 0xFF, 0xFF, 0x00, 0x00, 0x00, // 0x1E
    0xFF, 0xFF, 0x7E, 0x3C, 0x18, 0x00, 0x00, 0x00, // 0x1F
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x20 ' '
    0x30, 0x78, 0x78, 0x30, 0x30, 0x00, 0x30, 0x00, // 0x21 '!'
    0x6C, 0x6C, 0x6C, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x22 '"'
    0x6C, 0x6C, 0xFE, 0x6C, 0xFE, 0x6C, 0x6C, 0x00, // 0x23 '#'
    0x30, 0x7C, 0xC0, 0x78, 0x0C, 0xF8, 0x30, 0x00, // 0x24 '$'
    0x00, 0xC6, 0xCC, 0x18, 0x30, 0x66, 0xC6, 0x00, // 0x25 '%'
    0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00, // 0x26 '&'
    0x60, 0x60, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x27 '''
    0x18, 0x30, 0x60, 0x60, 0x60, 0x30, 0x18, 0x00, // 0x28 '('
    0x60, 0x30, 0x18, 0x18, 0x18, 0x30, 0x60, 0x00, // 0x29 ')'
    0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00, // 0x2A '*'
    0x00, 0x30, 0x30, 0xFC, 0x30, 0x30, 0x00, 0x00, // 0x2B '+'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x60, // 0x2C ','
    0x00, 0x00, 0x00, 0xFC, 0x00, 0x00, 0x00, 0x00, // 0x2D '-'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x00, // 0x2E '.'
    0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0x80, 0x00, // 0x2F '/'
    0x7C, 0xC6, 0xCE, 0xDE, 0xF6, 0xE6, 0x7C, 0x00, // 0x30 '0'
    0x30, 0x70, 0x30, 0x30, 0x30, 0x30, 0xFC, 0x00, // 0x31 '1'
    0x78, 0xCC, 0x0C, 0x38, 0x60, 0xCC, 0xFC, 0x00, // 0x32 '2'
    0x78, 0xCC, 0x0C, 0x38, 0x0C, 0xCC, 0x78, 0x00, // 0x33 '3'
    0x1C, 0x3C, 0x6C, 0xCC, 0xFE, 0x0C, 0x1E, 0x00, // 0x34 '4'
    0xFC, 0xC0, 0xF8, 0x0C, 0x0C, 0xCC, 0x78, 0x00, // 0x35 '5'
    0x38, 0x60, 0xC0, 0xF8, 0xCC, 0xCC, 0x78, 0x00, // 0x36 '6'
    0xFC, 0xCC, 0x0C, 0x18, 0x30, 0x30, 0x30, 0x00, // 0x37 '7'
    0x78, 0xCC, 0xCC, 0x78, 0xCC, 0xCC, 0x78, 0x00, // 0x38 '8'
    0x78, 0xCC, 0xCC, 0x7C, 0x0C, 0x18, 0x70, 0x00, // 0x39 '9'
    0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x00, // 0x3A ':'
    0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x60, // 0x3B ';'
    0x18, 0x30, 0x60, 0xC0, 0x60, 0x30, 0x18, 0x00, // 0x3C '<'
    0x00, 0x00, 0xFC, 0x00, 0x00, 0xFC, 0x00, 0x00, // 0x3D '='
    0x60, 0x30, 0x18, 0x0C, 0x18, 0x30, 0x60, 0x00, // 0x3E '>'
    0x78, 0xCC, 0x0C, 0x18, 0x30, 0x00, 0x30, 0x00, // 0x3F '?'
    0x7C, 0xC6, 0xDE, 0xDE, 0xDE, 0xC0, 0x78, 0x00, // 0x40 '@'
    0x30, 0x78, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0x00, // 0x41 'A'
    0xFC, 0x66, 0x66, 0x7C, 0x66, 0x66, 0xFC, 0x00, // 0x42 'B'
    0x3C, 0x66, 0xC0, 0xC0, 0xC0, 0x66, 0x3C, 0x00, // 0x43 'C'
    0xF8, 0x6C, 0x66, 0x66, 0x66, 0x6C, 0xF8, 0x00, // 0x44 'D'
    0xFE, 0x62, 0x68, 0x78, 0x68, 0x62, 0xFE, 0x00, // 0x45 'E'
    0xFE, 0x62, 0x68, 0x78, 0x68, 0x60, 0xF0, 0x00, // 0x46 'F'
    0x3C, 0x66, 0xC0, 0xC0, 0xCE, 0x66, 0x3E, 0x00, // 0x47 'G'
    0xCC, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0xCC, 0x00, // 0x48 'H'
    0x78, 0x30, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x49 'I'
    0x1E, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78, 0x00, // 0x4A 'J'
    0xE6, 0x66, 0x6C, 0x78, 0x6C, 0x66, 0xE6, 0x00, // 0x4B 'K'
    0xF0, 0x60, 0x60, 0x60, 0x62, 0x66, 0xFE, 0x00, // 0x4C 'L'
    0xC6, 0xEE, 0xFE, 0xFE, 0xD6, 0xC6, 0xC6, 0x00, // 0x4D 'M'
    0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00, // 0x4E 'N'
    0x38, 0x6C, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00, // 0x4F 'O'
    0xFC, 0x66, 0x66, 0x7C, 0x60, 0x60, 0xF0, 0x00, // 0x50 'P'
    0x78, 0xCC, 0xCC, 0xCC, 0xDC, 0x78, 0x1C, 0x00, // 0x51 'Q'
    0xFC, 0x66, 0x66, 0x7C, 0x6C, 0x66, 0xE6, 0x00, // 0x52 'R'
    0x78, 0xCC, 0xE0, 0x70, 0x1C, 0xCC, 0x78, 0x00, // 0x53 'S'
    0xFC, 0xB4, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x54 'T'
    0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xFC, 0x00, // 0x55 'U'
    0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x00, // 0x56 'V'
    0xC6, 0xC6, 0xC6, 0xD6, 0xFE, 0xEE, 0xC6, 0x00, // 0x57 'W'
    0xC6, 0xC6, 0x6C, 0x38, 0x38, 0x6C, 0xC6, 0x00, // 0x58 'X'
    0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x30, 0x78, 0x00, // 0x59 'Y'
    0xFE, 0xC6, 0x8C, 0x18, 0x32, 0x66, 0xFE, 0x00, // 0x5A 'Z'
    0x78, 0x60, 0x60, 0x60, 0x60, 0x60, 0x78, 0x00, // 0x5B '['
    0xC0, 0x60, 0x30, 0x18, 0x0C, 0x06, 0x02, 0x00, // 0x5C '\'
    0x78, 0x18, 0x18, 0x18, 0x18, 0x18, 0x78, 0x00, // 0x5D ']'
    0x10, 0x38, 0x6C, 0xC6, 0x00, 0x00, 0x00, 0x00, // 0x5E '^'
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, // 0x5F '_'
    0x30, 0x30, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x60 '`'
    0x00, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x76, 0x00, // 0x61 'a'
    0xE0, 0x60, 0x60, 0x7C, 0x66, 0x66, 0xDC, 0x00, // 0x62 'b'
    0x00, 0x00, 0x78, 0xCC, 0xC0, 0xCC, 0x78, 0x00, // 0x63 'c'
    0x1C, 0x0C, 0x0C, 0x7C, 0xCC, 0xCC, 0x76, 0x00, // 0x64 'd'
    0x00, 0x00, 0x78, 0xCC, 0xFC, 0xC0, 0x78, 0x00, // 0x65 'e'
    0x38, 0x6C, 0x60, 0xF0, 0x60, 0x60, 0xF0, 0x00, // 0x66 'f'
    0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8, // 0x67 'g'
    0xE0, 0x60, 0x6C, 0x76, 0x66, 0x66, 0xE6, 0x00, // 0x68 'h'
    0x30, 0x00, 0x70, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x69 'i'
    0x0C, 0x00, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78, // 0x6A 'j'
    0xE0, 0x60, 0x66, 0x6C, 0x78, 0x6C, 0xE6, 0x00, // 0x6B 'k'
    0x70, 0x30, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x6C 'l'
    0x00, 0x00, 0xCC, 0xFE, 0xFE, 0xD6, 0xC6, 0x00, // 0x6D 'm'
    0x00, 0x00, 0xF8, 0xCC, 0xCC, 0xCC, 0xCC, 0x00, // 0x6E 'n'
    0x00, 0x00, 0x78, 0xCC, 0xCC, 0xCC, 0x78, 0x00, // 0x6F 'o'
    0x00, 0x00, 0xDC, 0x66, 0x66, 0x7C, 0x60, 0xF0, // 0x70 'p'
    0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0x1E, // 0x71 'q'
    0x00, 0x00, 0xDC, 0x76, 0x66, 0x60, 0xF0, 0x00, // 0x72 'r'
    0x00, 0x00, 0x7C, 0xC0, 0x78, 0x0C, 0xF8, 0x00, // 0x73 's'
    0x10, 0x30, 0x7C, 0x30, 0x30, 0x34, 0x18, 0x00, // 0x74 't'
    0x00, 0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0x76, 0x00, // 0x75 'u'
    0x00, 0x00, 0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x00, // 0x76 'v'
    0x00, 0x00, 0xC6, 0xD6, 0xFE, 0xFE, 0x6C, 0x00, // 0x77 'w'
    0x00, 0x00, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0x00, // 0x78 'x'
    0x00, 0x00, 0xCC, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8, // 0x79 'y'
    0x00, 0x00, 0xFC, 0x98, 0x30, 0x64, 0xFC, 0x00, // 0x7A 'z'
    0x1C, 0x30, 0x30, 0xE0, 0x30, 0x30, 0x1C, 0x00, // 0x7B '{'
    0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00, // 0x7C '|'
    0xE0, 0x30, 0x30, 0x1C, 0x30, 0x30, 0xE0, 0x00, // 0x7D '}'
    0x76, 0xDC, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0x7E '~'
    0x00, 0x10, 0x38, 0x6C, 0xC6, 0xC6, 0xFE, 0x00, // 0x7F
    0x78, 0xCC, 0xC0, 0xCC, 0x78, 0x18, 0x0C, 0x78, // 0x80
    0x00, 0xCC, 0x00, 0xCC, 0xCC, 0xCC, 0x7E, 0x00, // 0x81
    0x1C, 0x00, 0x78, 0xCC, 0xFC, 0xC0, 0x78, 0x00, // 0x82
    0x7E, 0xC3, 0x3C, 0x06, 0x3E, 0x66, 0x3F, 0x00, // 0x83
    0xCC, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x7E, 0x00, // 0x84
    0xE0, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x7E, 0x00, // 0x85
    0x30, 0x30, 0x78, 0x0C, 0x7C, 0xCC, 0x7E, 0x00, // 0x86
    0x00, 0x00, 0x78, 0xC0, 0xC0, 0x78, 0x0C, 0x38, // 0x87
    0x7E, 0xC3, 0x3C, 0x66, 0x7E, 0x60, 0x3C, 0x00, // 0x88
    0xCC, 0x00, 0x78, 0xCC, 0xFC, 0xC0, 0x78, 0x00, // 0x89
    0xE0, 0x00, 0x78, 0xCC, 0xFC, 0xC0, 0x78, 0x00, // 0x8A
    0xCC, 0x00, 0x70, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x8B
    0x7C, 0xC6, 0x38, 0x18, 0x18, 0x18, 0x3C, 0x00, // 0x8C
    0xE0, 0x00, 0x70, 0x30, 0x30, 0x30, 0x78, 0x00, // 0x8D
    0xC6, 0x38, 0x6C, 0xC6, 0xFE, 0xC6, 0xC6, 0x00, // 0x8E
    0x30, 0x30, 0x00, 0x78, 0xCC, 0xFC, 0xCC, 0x00, // 0x8F
    0x1C, 0x00, 0xFC, 0x60, 0x78, 0x60, 0xFC, 0x00, // 0x90
    0x00, 0x00, 0x7F, 0x0C, 0x7F, 0xCC, 0x7F, 0x00, // 0x91
    0x3E, 0x6C, 0xCC, 0xFE, 0xCC, 0xCC, 0xCE, 0x00, // 0x92
    0x78, 0xCC, 0x00, 0x78, 0xCC, 0xCC, 0x78, 0x00, // 0x93
    0x00, 0xCC, 0x00, 0x78, 0xCC, 0xCC, 0x78, 0x00, // 0x94
    0x00, 0xE0, 0x00, 0x78, 0xCC, 0xCC, 0x78, 0x00, // 0x95
    0x78, 0xCC, 0x00, 0xCC, 0xCC, 0xCC, 0x7E, 0x00, // 0x96
    0x00, 0xE0, 0x00, 0xCC, 0xCC, 0xCC, 0x7E, 0x00, // 0x97
    0x00, 0xCC, 0x00, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8, // 0x98
    0xC3, 0x18, 0x3C, 0x66, 0x66, 0x3C, 0x18, 0x00, // 0x99
    0xCC, 0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0x78, 0x00, // 0x9A
    0x18, 0x18, 0x7E, 0xC0, 0xC0, 0x7E, 0x18, 0x18, // 0x9B
    0x38, 0x6C, 0x64, 0xF0, 0x60, 0xE6, 0xFC, 0x00, // 0x9C
    0xCC, 0xCC, 0x78, 0xFC, 0x30, 0xFC, 0x30, 0x30, // 0x9D
    0xF8, 0xCC, 0xCC, 0xFA, 0xC6, 0xCF, 0xC6, 0xC7, // 0x9E
    0x0E, 0x1B, 0x18, 0x3C, 0x18, 0x18, 0xD8, 0x70, // 0x9F
    0x1C, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x7E, 0x00, // 0xA0
    0x38, 0x00, 0x70, 0x30, 0x30, 0x30, 0x78, 0x00, // 0xA1
    0x00, 0x1C, 0x00, 0x78, 0xCC, 0xCC, 0x78, 0x00, // 0xA2
    0x00, 0x1C, 0x00, 0xCC, 0xCC, 0xCC, 0x7E, 0x00, // 0xA3
    0x00, 0xF8, 0x00, 0xF8, 0xCC, 0xCC, 0xCC, 0x00, // 0xA4
    0xFC, 0x00, 0xCC, 0xEC, 0xFC, 0xDC, 0xCC, 0x00, // 0xA5
    0x3C, 0x6C, 0x6C, 0x3E, 0x00, 0x7E, 0x00, 0x00, // 0xA6
    0x38, 0x6C, 0x6C, 0x38, 0x00, 0x7C, 0x00, 0x00, // 0xA7
    0x30, 0x00, 0x30, 0x60, 0xC0, 0xCC, 0x78, 0x00, // 0xA8
    0x00, 0x00, 0x00, 0xFC, 0xC0, 0xC0, 0x00, 0x00, // 0xA9
    0x00, 0x00, 0x00, 0xFC, 0x0C, 0x0C, 0x00, 0x00, // 0xAA
    0xC3, 0xC6, 0xCC, 0xDE, 0x33, 0x66, 0xCC, 0x0F, // 0xAB
    0xC3, 0xC6, 0xCC, 0xC3, 0x37, 0x6F, 0xCF, 0x03, // 0xAC
    0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x18, 0x00, // 0xAD
    0x00, 0x33, 0x66, 0xCC, 0x66, 0x33, 0x00, 0x00, // 0xAE
    0x00, 0xCC, 0x66, 0x33, 0x66, 0xCC, 0x00, 0x00, // 0xAF
    0x22, 0x88, 0x22, 0x88, 0x22, 0x88, 0x22, 0x88, // 0xB0
    0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, // 0xB1
    0xDB, 0x77, 0xDB, 0xEE, 0xDB, 0x77, 0xDB, 0xEE, // 0xB2
    0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, // 0xB3
    0x18, 0x18, 0x18, 0x18, 0xF8, 0x18, 0x18, 0x18, // 0xB4
    0x18, 0x18, 0xF8, 0x18, 0xF8, 0x18, 0x18, 0x18, // 0xB5
    0x36, 0x36, 0x36, 0x36, 0xF6, 0x36, 0x36, 0x36, // 0xB6
    0x00, 0x00, 0x00, 0x00, 0xFE, 0x36, 0x36, 0x36, // 0xB7
    0x00, 0x00, 0xF8, 0x18, 0xF8, 0x18, 0x18, 0x18, // 0xB8
    0x36, 0x36, 0xF6, 0x06, 0xF6, 0x36, 0x36, 0x36, // 0xB9
    0x36, 0x36, 0x36, 0x36, 0x36, 0x36, 0x36, 0x36, // 0xBA
    0x00, 0x00, 0xFE, 0x06, 0xF6, 0x36, 0x36, 0x36, // 0xBB
    0x36, 0x36, 0xF6, 0x06, 0xFE, 0x00, 0x00, 0x00, // 0xBC
    0x36, 0x36, 0x36, 0x36, 0xFE, 0x00, 0x00, 0x00, // 0xBD
    0x18, 0x18, 0xF8, 0x18, 0xF8, 0x00, 0x00, 0x00, // 0xBE
    0x00, 0x00, 0x00, 0x00, 0xF8, 0x18, 0x18, 0x18, // 0xBF
    0x18, 0x18, 0x18, 0x18, 0x1F, 0x00, 0x00, 0x00, // 0xC0
    0x18, 0x18, 0x18, 0x18, 0xFF, 0x00, 0x00, 0x00, // 0xC1
    0x00, 0x00, 0x00, 0x00, 0xFF, 0x18, 0x18, 0x18, // 0xC2
    0x18, 0x18, 0x18, 0x18, 0x1F, 0x18, 0x18, 0x18, // 0xC3
    0x00, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00, // 0xC4
    0x18, 0x18, 0x18, 0x18, 0xFF, 0x18, 0x18, 0x18, // 0xC5
    0x18, 0x18, 0x1F, 0x18, 0x1F, 0x18, 0x18, 0x18, // 0xC6
    0x36, 0x36, 0x36, 0x36, 0x37, 0x36, 0x36, 0x36, // 0xC7
    0x36, 0x36, 0x37, 0x30, 0x3F, 0x00, 0x00, 0x00, // 0xC8
    0x00, 0x00, 0x3F, 0x30, 0x37, 0x36, 0x36, 0x36, // 0xC9
    0x36, 0x36, 0xF7, 0x00, 0xFF, 0x00, 0x00, 0x00, // 0xCA
    0x00, 0x00, 0xFF, 0x00, 0xF7, 0x36, 0x36, 0x36, // 0xCB
    0x36, 0x36, 0x37, 0x30, 0x37, 0x36, 0x36, 0x36, // 0xCC
    0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, // 0xCD
    0x36, 0x36, 0xF7, 0x00, 0xF7, 0x36, 0x36, 0x36, // 0xCE
    0x18, 0x18, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, // 0xCF
    0x36, 0x36, 0x36, 0x36, 0xFF, 0x00, 0x00, 0x00, // 0xD0
    0x00, 0x00, 0xFF, 0x00, 0xFF, 0x18, 0x18, 0x18, // 0xD1
    0x00, 0x00, 0x00, 0x00, 0xFF, 0x36, 0x36, 0x36, // 0xD2
    0x36, 0x36, 0x36, 0x36, 0x3F, 0x00, 0x00, 0x00, // 0xD3
    0x18, 0x18, 0x1F, 0x18, 0x1F, 0x00, 0x00, 0x00, // 0xD4
    0x00, 0x00, 0x1F, 0x18, 0x1F, 0x18, 0x18, 0x18, // 0xD5
    0x00, 0x00, 0x00, 0x00, 0x3F, 0x36, 0x36, 0x36, // 0xD6
    0x36, 0x36, 0x36, 0x36, 0xFF, 0x36, 0x36, 0x36, // 0xD7
    0x18, 0x18, 0xFF, 0x18, 0xFF, 0x18, 0x18, 0x18, // 0xD8
    0x18, 0x18, 0x18, 0x18, 0xF8, 0x00, 0x00, 0x00, // 0xD9
    0x00, 0x00, 0x00, 0x00, 0x1F, 0x18, 0x18, 0x18, // 0xDA
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // 0xDB
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, // 0xDC
    0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, // 0xDD
    0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, 0x0F, // 0xDE
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, // 0xDF
    0x00, 0x00, 0x76, 0xDC, 0xC8, 0xDC, 0x76, 0x00, // 0xE0
    0x00, 0x78, 0xCC, 0xF8, 0xCC, 0xF8, 0xC0, 0xC0, // 0xE1
    0x00, 0xFC, 0xCC, 0xC0, 0xC0, 0xC0, 0xC0, 0x00, // 0xE2
    0x00, 0xFE, 0x6C, 0x6C, 0x6C, 0x6C, 0x6C, 0x00, // 0xE3
    0xFC, 0xC6, 0x60, 0x30, 0x60, 0xC6, 0xFC, 0x00, // 0xE4
    0x00, 0x00, 0x7E, 0xD8, 0xD8, 0xD8, 0x70, 0x00, // 0xE5
    0x00, 0x66, 0x66, 0x66, 0x66, 0x7C, 0x60, 0xC0, // 0xE6
    0x00, 0x76, 0xDC, 0x18, 0x18, 0x18, 0x18, 0x00, // 0xE7
    0xFC, 0x30, 0x78, 0xCC, 0xCC, 0x78, 0x30, 0xFC, // 0xE8
    0x38, 0x6C, 0xC6, 0xFE, 0xC6, 0x6C, 0x38, 0x00, // 0xE9
    0x38, 0x6C, 0xC6, 0xC6, 0x6C, 0x6C, 0xEE, 0x00, // 0xEA
    0x1C, 0x30, 0x18, 0x7C, 0xCC, 0xCC, 0x78, 0x00, // 0xEB
    0x00, 0x00, 0x7E, 0xDB, 0xDB, 0x7E, 0x00, 0x00, // 0xEC
    0x06, 0x0C, 0x7E, 0xDB, 0xDB, 0x7E, 0x60, 0xC0, // 0xED
    0x38, 0x60, 0xC0, 0xF8, 0xC0, 0x60, 0x38, 0x00, // 0xEE
    0x78, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0x00, // 0xEF
    0x00, 0xFC, 0x00, 0xFC, 0x00, 0xFC, 0x00, 0x00, // 0xF0
    0x30, 0x30, 0xFC, 0x30, 0x30, 0x00, 0xFC, 0x00, // 0xF1
    0x60, 0x30, 0x18, 0x30, 0x60, 0x00, 0xFC, 0x00, // 0xF2
    0x18, 0x30, 0x60, 0x30, 0x18, 0x00, 0xFC, 0x00, // 0xF3
    0x0E, 0x1B, 0x1B, 0x18, 0x18, 0x18, 0x18, 0x18, // 0xF4
    0x18, 0x18, 0x18, 0x18, 0x18, 0xD8, 0xD8, 0x70, // 0xF5
    0x30, 0x30, 0x00, 0xFC, 0x00, 0x30, 0x30, 0x00, // 0xF6
    0x00, 0x76, 0xDC, 0x00, 0x76, 0xDC, 0x00, 0x00, // 0xF7
    0x38, 0x6C, 0x6C, 0x38, 0x00, 0x00, 0x00, 0x00, // 0xF8
    0x00, 0x00, 0x00, 0x18, 0x18, 0x00, 0x00, 0x00, // 0xF9
    0x00, 0x00, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, // 0xFA
    0x0F, 0x0C, 0x0C, 0x0C, 0xEC, 0x6C, 0x3C, 0x1C, // 0xFB
    0x78, 0x6C, 0x6C, 0x6C, 0x6C, 0x00, 0x00, 0x00, // 0xFC
    0x70, 0x18, 0x30, 0x60, 0x78, 0x00, 0x00, 0x00, // 0xFD
    0x00, 0x00, 0x3C, 0x3C, 0x3C, 0x3C, 0x00, 0x00, // 0xFE
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 0xFF
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_character_has_eight_rows() {
        assert_eq!(CGA_FONT.len(), 256 * 8);
    }

    #[test]
    fn space_is_blank_and_block_is_solid() {
        for row in 0..8 {
            assert_eq!(glyph_row(0x20, row), 0x00);
            assert_eq!(glyph_row(0xDB, row), 0xFF);
        }
    }

    #[test]
    fn printable_ascii_has_content() {
        for ch in 0x21..=0x7Eu8 {
            let non_blank = (0..8).any(|row| glyph_row(ch, row) != 0);
            assert!(non_blank, "glyph {:#04X} should not be blank", ch);
        }
    }

    #[test]
    fn palette_covers_sixteen_colors() {
        assert_eq!(CGA_PALETTE[0], 0x000000);
        assert_eq!(CGA_PALETTE[15], 0xFFFFFF);
        assert_eq!(CGA_PALETTE.len(), 16);
    }
}
