// tests/property/roundtrip_test.rs

//! Round-trips through each protocol layer.

use proptest::prelude::*;
use scriptorium::core::protocol::{Message, MessageCipher, WireProtocol};

const DELIMITER: &str = "~sp~";

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_cipher_roundtrip(plaintext in ".{0,512}") {
        let cipher = MessageCipher::default();
        let sealed = cipher.encrypt(&plaintext);
        prop_assert!(!sealed.contains('\n'));
        prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_cipher_is_deterministic(plaintext in ".{0,128}") {
        let cipher = MessageCipher::default();
        prop_assert_eq!(cipher.encrypt(&plaintext), cipher.encrypt(&plaintext));
    }

    #[test]
    fn test_message_roundtrip(
        command in "[a-z_]{0,16}",
        args in prop::collection::vec("[^~]{0,24}", 0..6),
    ) {
        let message = Message::with_args(command, args);
        let parsed = Message::parse(&message.serialize(DELIMITER), DELIMITER);
        prop_assert_eq!(parsed, message);
    }

    #[test]
    fn test_seal_open_roundtrip(
        command in "[a-z]{1,16}",
        args in prop::collection::vec("[^~]{0,64}", 0..4),
    ) {
        let wire = WireProtocol::default();
        let message = Message::with_args(command, args);
        prop_assert_eq!(wire.open(&wire.seal(&message)).unwrap(), message);
    }

    #[test]
    fn test_tampered_ciphertext_never_panics(garbage in ".{0,256}") {
        let wire = WireProtocol::default();
        let _ = wire.open(&garbage);
    }
}
