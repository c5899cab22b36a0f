//! Integration tests for the fieldauth-core register layout.
//!
//! These tests drive the public API the same way the master does during a
//! run: parse operator input, plan the challenge bursts, and encode every
//! value into the registers that go on the wire.  They pin the exact register
//! images for the reference handshake so an accidental codec change shows up
//! as a diff here rather than as a failed authentication in the field.

use fieldauth_core::{
    parse_challenge, parse_master_hmac, parse_timestamp,
    protocol::{
        burst::{burst_count, plan_bursts},
        codec::{decode_slave_hmac, encode_master_hmac, encode_timestamp},
    },
    Mode, WordOrder, CHALLENGE_LEN, HMAC_LEN, MAX_WRITE_REGISTERS,
};

fn reference_challenge_input() -> String {
    (0..256).map(|n| n.to_string()).collect::<Vec<_>>().join(",")
}

#[test]
fn test_reference_challenge_splits_into_modbus_sized_bursts() {
    // Arrange
    let challenge = parse_challenge(&reference_challenge_input()).expect("challenge");

    // Act
    let bursts: Vec<_> = plan_bursts(challenge.as_words(), MAX_WRITE_REGISTERS).collect();

    // Assert – ceil(256 / 123) = 3 bursts: 123 + 123 + 10
    assert_eq!(bursts.len(), burst_count(CHALLENGE_LEN, MAX_WRITE_REGISTERS));
    assert_eq!(
        bursts.iter().map(|b| b.words.len()).collect::<Vec<_>>(),
        vec![123, 123, 10]
    );
    assert_eq!(bursts[0].words[0], 0);
    assert_eq!(bursts[1].words[0], 123);
    assert_eq!(bursts[2].words, &[246, 247, 248, 249, 250, 251, 252, 253, 254, 255]);
}

#[test]
fn test_reference_timestamp_register_image() {
    // Arrange
    let ts = parse_timestamp("1700000000").expect("timestamp");

    // Act
    let low_first = encode_timestamp(ts.0, WordOrder::LowWordFirst);
    let high_first = encode_timestamp(ts.0, WordOrder::HighWordFirst);

    // Assert
    assert_eq!(low_first, [0xF100, 0x6553]);
    assert_eq!(high_first, [0x6553, 0xF100]);
}

#[test]
fn test_zero_master_hmac_encodes_to_thirty_two_zero_registers() {
    let hmac = parse_master_hmac(&"00".repeat(HMAC_LEN)).expect("hmac");
    assert_eq!(encode_master_hmac(&hmac), vec![0u16; HMAC_LEN]);
}

#[test]
fn test_hmac_survives_master_to_slave_register_path() {
    // Arrange – a slave that echoes whatever the master wrote
    let input = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    let master = parse_master_hmac(input).expect("hmac");

    // Act
    let registers = encode_master_hmac(&master);
    let echoed = decode_slave_hmac(&registers).expect("decode");

    // Assert
    assert_eq!(echoed.as_bytes(), master.as_bytes());
    assert_eq!(echoed.to_hex(), input);
}

#[test]
fn test_mode_sequence_coil_patterns() {
    let patterns: Vec<[bool; 4]> = Mode::SEQUENCE.iter().map(|m| m.bits()).collect();
    assert_eq!(
        patterns,
        vec![
            [false, false, false, false],
            [false, false, false, true],
            [false, false, true, false],
            [false, false, true, true],
            [false, true, false, false],
        ]
    );
}
