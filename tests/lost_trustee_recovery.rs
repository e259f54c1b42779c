//! Scenario 6 (spec.md §8): `n=3, k=2`; after trustee 0's private key
//! material is destroyed, trustees 1 and 2 still jointly decrypt every
//! vote, and any single trustee alone is short of the threshold.

mod common;

use votecrypto::keys::PublicKey;
use votecrypto::threshold::ThresholdDecryptionCombinator;
use votecrypto::PvError;

#[test]
fn two_of_three_decrypt_after_losing_trustee_zero() {
    let (cs, mut rng) = common::test_cryptosystem(1006);
    let (_trustee_keys, _fps, key_pairs) = common::run_dkg(&cs, 3, 2, &mut rng);

    let threshold_public = key_pairs[0].public.clone();
    let voting_key = PublicKey::from_element(&cs, threshold_public.y().clone()).unwrap();

    // Trustee 0's key pair is simply never consulted again below,
    // simulating destruction of its private key material.
    let surviving = [&key_pairs[1], &key_pairs[2]];

    for i in 0..5 {
        let ballot = format!("Dummy vote #{i}");
        let ct = voting_key.encrypt_text(&ballot, &mut rng);

        let mut combinator = ThresholdDecryptionCombinator::new(threshold_public.clone(), ct.clone());
        for kp in &surviving {
            let pd = kp.private.generate_partial_decryption(&ct, &mut rng).unwrap();
            combinator.add_partial_decryption(pd).unwrap();
        }
        let bytes = combinator.decrypt_to_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), ballot);
    }

    let ct = voting_key.encrypt_text("Dummy vote #lonely", &mut rng);
    let mut lone_combinator = ThresholdDecryptionCombinator::new(threshold_public.clone(), ct.clone());
    let pd = key_pairs[1].private.generate_partial_decryption(&ct, &mut rng).unwrap();
    lone_combinator.add_partial_decryption(pd).unwrap();
    let result = lone_combinator.decrypt_to_bytes();
    assert!(matches!(result, Err(PvError::NotEnoughShares { have: 1, k: 2 })));
}
