use anyhow::Result;
use keel_xrpl_connector::address::{resolve_signing_address, Address, ACCOUNT_ID_LEN};
use keel_xrpl_connector::error::AddressError;

const GENESIS_PUBLIC_KEY: &str =
    "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";
const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

/// Check-encodes `payload` under `version` with the ledger alphabet.
fn encode_with_version(payload: &[u8], version: u8) -> String {
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check_version(version)
        .into_string()
}

#[test]
fn test_derives_address_from_public_key() -> Result<()> {
    let public_key = hex::decode(GENESIS_PUBLIC_KEY)?;
    let address = Address::from_public_key(&public_key);

    assert_eq!(address.as_str(), GENESIS_ADDRESS);
    assert_eq!(address.account_id().len(), ACCOUNT_ID_LEN);

    println!("✅ Test passed: public key derives the expected classic address.");
    Ok(())
}

#[test]
fn test_well_known_account_id_encodings() {
    let zero = Address::from_account_id([0u8; ACCOUNT_ID_LEN]);
    assert_eq!(zero.as_str(), "rrrrrrrrrrrrrrrrrrrrrhoLvTp");

    let mut one_id = [0u8; ACCOUNT_ID_LEN];
    one_id[ACCOUNT_ID_LEN - 1] = 1;
    let one = Address::from_account_id(one_id);
    assert_eq!(one.as_str(), "rrrrrrrrrrrrrrrrrrrrBZbvji");
}

#[test]
fn test_parse_roundtrip() -> Result<()> {
    let address: Address = GENESIS_ADDRESS.parse()?;
    assert_eq!(address.to_string(), GENESIS_ADDRESS);

    let rebuilt = Address::from_account_id(*address.account_id());
    assert_eq!(rebuilt, address);
    Ok(())
}

#[test]
fn test_rejects_malformed_input() {
    // Last character changed: still alphabet-valid, checksum broken.
    assert_eq!(
        "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTr".parse::<Address>(),
        Err(AddressError::Checksum)
    );

    // '0' is not part of the ledger's base58 alphabet.
    assert_eq!("r0".parse::<Address>(), Err(AddressError::Encoding));

    // Too short to even carry a checksum.
    assert_eq!("r".parse::<Address>(), Err(AddressError::Checksum));
}

#[test]
fn test_rejects_wrong_version_byte() {
    // A family-seed style version over an otherwise valid payload.
    let seedish = encode_with_version(&[7u8; 16], 0x21);
    assert_eq!(seedish.parse::<Address>(), Err(AddressError::Version(0x21)));
}

#[test]
fn test_rejects_wrong_payload_length() {
    // The version byte survives decoding, so 19 payload bytes decode to 20.
    let short = encode_with_version(&[7u8; 19], 0);
    assert_eq!(short.parse::<Address>(), Err(AddressError::Length(20)));

    let long = encode_with_version(&[7u8; 21], 0);
    assert_eq!(long.parse::<Address>(), Err(AddressError::Length(22)));
}

#[test]
fn test_is_valid_is_purely_syntactic() {
    assert!(Address::is_valid(GENESIS_ADDRESS));
    assert!(Address::is_valid("rrrrrrrrrrrrrrrrrrrrrhoLvTp"));

    // A family seed shares the alphabet but not the version byte.
    assert!(!Address::is_valid("snoPBrXtMeMyMHUVTgbuqAfg1SUTb"));
    assert!(!Address::is_valid("not an address"));
    assert!(!Address::is_valid(""));
}

#[test]
fn test_resolves_signing_keys_in_both_forms() -> Result<()> {
    // A hex public key resolves through the account-ID derivation.
    let from_key = resolve_signing_address(GENESIS_PUBLIC_KEY)?;
    assert_eq!(from_key.as_str(), GENESIS_ADDRESS);

    // Hex digits are accepted in either case.
    let lowercase = resolve_signing_address(&GENESIS_PUBLIC_KEY.to_lowercase())?;
    assert_eq!(lowercase, from_key);

    // A classic address passes through unchanged.
    let from_address = resolve_signing_address(GENESIS_ADDRESS)?;
    assert_eq!(from_address.as_str(), GENESIS_ADDRESS);

    println!("✅ Test passed: signing keys resolve in both accepted forms.");
    Ok(())
}

#[test]
fn test_resolve_rejects_other_formats() {
    for input in ["", "ABC", "not hex at all", "zz11", "sn0PBrXtMeMyMHUVTgbuqAfg1SUTb"] {
        assert_eq!(
            resolve_signing_address(input),
            Err(AddressError::PublicKeyFormat),
            "input {:?} should be rejected",
            input
        );
    }
}

#[test]
fn test_serializes_as_the_classic_string() -> Result<()> {
    let address: Address = GENESIS_ADDRESS.parse()?;
    let json = serde_json::to_string(&address)?;
    assert_eq!(json, format!("\"{}\"", GENESIS_ADDRESS));

    let back: Address = serde_json::from_str(&json)?;
    assert_eq!(back, address);

    assert!(serde_json::from_str::<Address>("\"rNotAnAddress\"").is_err());
    Ok(())
}
