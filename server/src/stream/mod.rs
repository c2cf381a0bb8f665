pub mod scratch;
pub mod trim;

// the 28-byte bgzf end-of-file block that terminates every valid bam file.
// body blocks have theirs trimmed off; the ticket's footer descriptor serves
// exactly one copy for the reassembled file
pub const BGZF_EOF: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02,
    0x00, 0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgzf_eof_block() {
        assert_eq!(BGZF_EOF.len(), 28);

        // gzip magic, then the BC extra field marking a bgzf block
        assert_eq!(&BGZF_EOF[0..2], &[0x1f, 0x8b]);
        assert_eq!(&BGZF_EOF[12..14], &[0x42, 0x43]);
    }
}
