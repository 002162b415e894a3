#![allow(dead_code)]

pub mod command;
pub mod fixtures;
pub mod pack_builder;

// Helper function to create hexdump representation
pub fn to_hexdump(data: &[u8]) -> String {
    let mut result = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        result.push_str(&format!("{:08x}: ", i * 16));

        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                result.push(' ');
            }
            result.push_str(&format!("{:02x} ", byte));
        }

        // Pad if less than 16 bytes
        for j in chunk.len()..16 {
            if j == 8 {
                result.push(' ');
            }
            result.push_str("   ");
        }

        result.push_str(" |");
        for byte in chunk {
            if byte.is_ascii_graphic() {
                result.push(*byte as char);
            } else {
                result.push('.');
            }
        }
        result.push_str("|\n");
    }
    result
}

// Macro to compare decoded objects with hexdump output on failure
#[macro_export]
macro_rules! assert_bytes_eq {
    ($actual:expr, $expected:expr) => {
        if $actual != $expected {
            pretty_assertions::assert_eq!(
                common::to_hexdump($actual),
                common::to_hexdump($expected),
                "\n=== DECODED CONTENTS DIFFER ===\nactual ({} bytes) vs expected ({} bytes)",
                $actual.len(),
                $expected.len()
            );
        }
    };
}
